//! Partitioning documents by type tag

use crate::models::{Document, DocumentType};

/// Documents split into the three buckets the summary cares about
///
/// Reviews, general documents, and documents whose stored tag was not
/// recognised land in none of the buckets.
#[derive(Debug, Default)]
pub struct ClassifiedDocuments<'a> {
    pub bills: Vec<&'a Document>,
    pub feedbacks: Vec<&'a Document>,
    pub revenues: Vec<&'a Document>,
}

impl<'a> ClassifiedDocuments<'a> {
    pub fn classify(documents: &'a [Document]) -> Self {
        let mut classified = Self::default();
        for doc in documents {
            match doc.doc_type {
                Some(DocumentType::Bill) => classified.bills.push(doc),
                Some(DocumentType::Feedback) => classified.feedbacks.push(doc),
                Some(DocumentType::Revenue) => classified.revenues.push(doc),
                _ => {}
            }
        }
        classified
    }

    pub fn is_empty(&self) -> bool {
        self.bills.is_empty() && self.feedbacks.is_empty() && self.revenues.is_empty()
    }
}
