//! DocSight Web Server
//!
//! Axum-based REST API for the DocSight document analytics backend.
//!
//! Security features:
//! - Session tokens or service API keys (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Upload size limits
//! - Activity logging for uploads, deletions, summaries, and chat
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use docsight_core::ai::{AIClient, CompletionBackend};
use docsight_core::auth::verify_token;
use docsight_core::config::AnalyticsSettings;
use docsight_core::db::Database;

mod handlers;

/// Default upload limit (100 MB)
pub const MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

/// Authorization header for session tokens and API keys
const AUTHORIZATION_HEADER: &str = "authorization";

/// Identity used for callers authenticated by API key
pub const API_KEY_IDENTITY: &str = "api-key";

/// Identity used when authentication is disabled
pub const LOCAL_DEV_IDENTITY: &str = "local-dev";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// API keys for service authentication
    /// Format: "Bearer <key>" in Authorization header
    pub api_keys: Vec<String>,
    /// HS256 secret for session tokens; register and login are disabled without it
    pub jwt_secret: Option<String>,
    /// Largest accepted request body
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
            jwt_secret: None,
            max_upload_bytes: MAX_UPLOAD_SIZE,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub analytics: AnalyticsSettings,
    /// Completion backend; `None` when no AI integration is configured
    pub ai: Option<AIClient>,
}

/// How a caller was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Session,
    ApiKey,
    None,
}

/// The authenticated caller, placed in request extensions by the auth middleware
///
/// `owner` is the key documents are stored under: the account email for
/// session users, `api-key` for service keys, `local-dev` with auth disabled.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub owner: String,
    pub method: AuthMethod,
    pub user_id: Option<i64>,
}

impl CallerIdentity {
    fn local_dev() -> Self {
        Self {
            owner: LOCAL_DEV_IDENTITY.to_string(),
            method: AuthMethod::None,
            user_id: None,
        }
    }

    fn api_key() -> Self {
        Self {
            owner: API_KEY_IDENTITY.to_string(),
            method: AuthMethod::ApiKey,
            user_id: None,
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| docsight_core::Error::AuthRequired.into())
    }
}

/// Authentication middleware - resolves the caller from a session token or API key
///
/// Bearer values are tried as a session token first (when a secret is
/// configured), then as an API key. API keys are compared in constant time.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        request.extensions_mut().insert(CallerIdentity::local_dev());
        return next.run(request).await;
    }

    let bearer = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    if let Some(token) = bearer {
        if let Some(secret) = &state.config.jwt_secret {
            match verify_token(&token, secret) {
                Ok(claims) => {
                    debug!(user = %claims.email, path = %request.uri().path(), "Authenticated via session token");
                    request.extensions_mut().insert(CallerIdentity {
                        owner: claims.email,
                        method: AuthMethod::Session,
                        user_id: claims.sub.parse().ok(),
                    });
                    return next.run(request).await;
                }
                Err(e) => debug!(error = %e, "Bearer value is not a valid session token"),
            }
        }

        if validate_api_key(&token, &state.config.api_keys) {
            info!(user = API_KEY_IDENTITY, path = %request.uri().path(), "Authenticated via API key");
            request.extensions_mut().insert(CallerIdentity::api_key());
            return next.run(request).await;
        }
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    AppError::from(docsight_core::Error::AuthRequired).into_response()
}

/// Validate an API key against the configured keys using constant-time comparison
/// to prevent timing attacks.
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Parse a comma-separated list of API keys, ignoring blanks
pub fn parse_api_keys(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
///
/// The completion backend is read from the environment once, here.
pub fn create_router(
    db: Database,
    static_dir: Option<&str>,
    config: ServerConfig,
    analytics: AnalyticsSettings,
) -> Router {
    let ai = AIClient::from_env();
    match &ai {
        Some(client) => info!(
            backend = client.kind(),
            model = client.model(),
            "AI backend configured"
        ),
        None => info!("AI backend not configured (set GEMINI_API_KEY or AI_BACKEND to enable analytics)"),
    }

    let state = Arc::new(AppState {
        db,
        config,
        analytics,
        ai,
    });
    create_router_with_state(state, static_dir)
}

/// Create the application router around prepared state (for testing)
pub fn create_router_with_state(state: Arc<AppState>, static_dir: Option<&str>) -> Router {
    let config = state.config.clone();

    let public_routes = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login));

    let protected_routes = Router::new()
        // Auth
        .route("/auth/profile", get(handlers::profile))
        // Documents
        .route("/documents", get(handlers::list_documents))
        .route("/documents/upload", post(handlers::upload_document))
        .route(
            "/documents/:id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        // Search
        .route("/search", get(handlers::search_documents))
        // Analytics
        .route("/analytics/summary", get(handlers::get_summary))
        .route("/analytics/usage", get(handlers::get_usage))
        // Chat
        .route(
            "/chat/sessions",
            get(handlers::list_chat_sessions).post(handlers::create_chat_session),
        )
        .route("/chat/sessions/:id/messages", get(handlers::list_chat_messages))
        .route("/chat/send", post(handlers::send_chat_message))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes.merge(protected_routes);

    // Build CORS layer
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    // CSP: restrict scripts to same-origin, allow inline styles, allow blob: for chart images
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
    analytics: AnalyticsSettings,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("Authentication disabled - do not expose to network!");
    } else if config.jwt_secret.is_none() && config.api_keys.is_empty() {
        warn!("No DOCSIGHT_JWT_SECRET or DOCSIGHT_API_KEYS set - every protected request will be rejected");
    }

    let app = create_router(db, static_dir, config, analytics);
    check_ai_connection().await;

    let addr = format!("{}:{}", host, port);
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection() {
    if let Some(client) = AIClient::from_env() {
        if client.health_check().await {
            info!(host = client.host(), model = client.model(), "AI backend connected");
        } else {
            warn!(host = client.host(), model = client.model(), "AI backend configured but not responding");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
///
/// Bodies are `{ "msg": ... }`, plus `details` for unusable AI responses.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    details: Option<String>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            details: None,
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn from_core(err: docsight_core::Error) -> Self {
        use docsight_core::Error;

        match err {
            Error::AuthRequired => Self::new(StatusCode::UNAUTHORIZED, "Authentication required"),
            Error::Unauthorized(msg) => Self::new(StatusCode::UNAUTHORIZED, &msg),
            Error::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, &msg),
            Error::InvalidData(msg) => Self::new(StatusCode::BAD_REQUEST, &msg),
            Error::Conflict(msg) => Self::new(StatusCode::CONFLICT, &msg),
            Error::ConfigurationMissing(msg) => Self::new(StatusCode::SERVICE_UNAVAILABLE, &msg),
            Error::AiParse { raw, .. } => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "AI responded but the response was unusable".to_string(),
                details: Some(raw),
                internal: None,
            },
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                // Keep full error for logging
                details: None,
                internal: Some(other.into()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = match self.details {
            Some(details) => serde_json::json!({ "msg": self.message, "details": details }),
            None => serde_json::json!({ "msg": self.message }),
        };

        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        match err.downcast::<docsight_core::Error>() {
            Ok(core) => Self::from_core(core),
            Err(err) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An internal error occurred".to_string(),
                details: None,
                internal: Some(err),
            },
        }
    }
}
