//! Activity log operations

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::ActivityEntry;

impl Database {
    /// Record something an owner did
    pub fn log_activity(
        &self,
        owner: &str,
        action: &str,
        resource_type: Option<&str>,
        resource_id: Option<i64>,
        details: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO activity_log (owner, action, resource_type, resource_id, details)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![owner, action, resource_type, resource_id, details],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Most recent activity for one owner
    pub fn list_activity(&self, owner: &str, limit: i64) -> Result<Vec<ActivityEntry>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, timestamp, owner, action, resource_type, resource_id, details
            FROM activity_log
            WHERE owner = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let entries = stmt
            .query_map(params![owner, limit], |row| {
                let timestamp: String = row.get(1)?;
                Ok(ActivityEntry {
                    id: row.get(0)?,
                    timestamp: parse_datetime(&timestamp),
                    owner: row.get(2)?,
                    action: row.get(3)?,
                    resource_type: row.get(4)?,
                    resource_id: row.get(5)?,
                    details: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}
