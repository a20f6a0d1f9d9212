//! Read-only post-run audit of the collection.
//!
//! The validator observes and reports; it never repairs. An inconsistent
//! embedding-length distribution is flagged for operator attention.

use crate::error::Result;
use crate::store::{DocumentStore, ReplicaSetSummary};
use std::fmt;

/// Shape facts about one sampled document.
#[derive(Debug, Clone)]
pub struct SampleCheck {
    pub id_is_hash_shaped: bool,
    pub text_chars: usize,
    pub embedding_len: usize,
    pub preview: String,
}

/// Everything the audit observed about the live collection.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub total_documents: u64,
    pub expected_dimension: usize,
    pub sample: Option<SampleCheck>,
    /// Sorted `(embedding length, document count)` pairs.
    pub dimension_distribution: Vec<(i64, u64)>,
    pub missing_text: u64,
    pub missing_embedding: u64,
    pub replica_set: Option<ReplicaSetSummary>,
}

impl ValidationReport {
    /// True when every stored embedding has the one expected length.
    pub fn dimensions_consistent(&self) -> bool {
        matches!(
            self.dimension_distribution.as_slice(),
            [(dimension, _)] if *dimension == self.expected_dimension as i64
        )
    }

    pub fn required_fields_present(&self) -> bool {
        self.missing_text == 0 && self.missing_embedding == 0
    }

    pub fn is_healthy(&self) -> bool {
        self.total_documents > 0
            && self.dimensions_consistent()
            && self.required_fields_present()
            && self
                .sample
                .as_ref()
                .is_some_and(|sample| sample.id_is_hash_shaped && sample.embedding_len > 0)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "COLLECTION VALIDATION")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "total documents:   {}", self.total_documents)?;

        match &self.sample {
            Some(sample) => {
                writeln!(
                    f,
                    "sample: id hash-shaped = {}, text chars = {}, embedding length = {}",
                    sample.id_is_hash_shaped, sample.text_chars, sample.embedding_len
                )?;
                writeln!(f, "sample preview:    {}...", sample.preview)?;
            }
            None => writeln!(f, "sample:            collection is empty")?,
        }

        if self.dimensions_consistent() {
            writeln!(
                f,
                "embeddings:        all {} dimensions",
                self.expected_dimension
            )?;
        } else {
            writeln!(f, "embeddings:        INCONSISTENT dimensions detected")?;
            for (dimension, count) in &self.dimension_distribution {
                writeln!(f, "  - {count} documents with {dimension} dimensions")?;
            }
        }

        if self.required_fields_present() {
            writeln!(f, "required fields:   all present")?;
        } else {
            writeln!(
                f,
                "required fields:   {} missing text, {} missing embedding",
                self.missing_text, self.missing_embedding
            )?;
        }

        match &self.replica_set {
            Some(summary) => {
                writeln!(
                    f,
                    "replica set:       '{}' with {} members ({} primary)",
                    summary.set_name,
                    summary.members.len(),
                    summary.primary_count()
                )?;
            }
            None => writeln!(f, "replica set:       not a replica set member")?,
        }

        writeln!(f, "healthy:           {}", self.is_healthy())?;
        write!(f, "{rule}")
    }
}

/// Audit the live collection: sample shape, embedding-length distribution,
/// required-field presence, and replica set state.
pub async fn validate_collection(
    store: &DocumentStore,
    expected_dimension: usize,
) -> Result<ValidationReport> {
    let total_documents = store.count().await?;
    if total_documents == 0 {
        tracing::warn!("collection is empty, nothing to validate");
    }

    let sample = store.sample().await?.map(|document| SampleCheck {
        id_is_hash_shaped: is_hash_shaped(&document.id),
        text_chars: document.text.chars().count(),
        embedding_len: document.embedding.len(),
        preview: document
            .text
            .split_whitespace()
            .take(10)
            .collect::<Vec<_>>()
            .join(" "),
    });

    let dimension_distribution = store.embedding_dimensions().await?;
    let missing_text = store.missing_field_count("text").await?;
    let missing_embedding = store.missing_field_count("embedding").await?;
    let replica_set = store.replica_set_status().await?;

    let report = ValidationReport {
        total_documents,
        expected_dimension,
        sample,
        dimension_distribution,
        missing_text,
        missing_embedding,
        replica_set,
    };

    if !report.dimensions_consistent() && total_documents > 0 {
        tracing::warn!(
            distribution = ?report.dimension_distribution,
            expected = expected_dimension,
            "embedding dimensions are inconsistent"
        );
    }

    Ok(report)
}

/// 64 lowercase hex chars, the shape of a SHA-256 content hash.
fn is_hash_shaped(id: &str) -> bool {
    id.len() == 64
        && id
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::content_hash;

    fn report_with(distribution: Vec<(i64, u64)>) -> ValidationReport {
        ValidationReport {
            total_documents: distribution.iter().map(|(_, count)| count).sum(),
            expected_dimension: 384,
            sample: Some(SampleCheck {
                id_is_hash_shaped: true,
                text_chars: 120,
                embedding_len: 384,
                preview: "we the people".to_string(),
            }),
            dimension_distribution: distribution,
            missing_text: 0,
            missing_embedding: 0,
            replica_set: None,
        }
    }

    #[test]
    fn single_expected_dimension_is_consistent() {
        let report = report_with(vec![(384, 10)]);
        assert!(report.dimensions_consistent());
        assert!(report.is_healthy());
    }

    #[test]
    fn mixed_dimensions_are_flagged() {
        let report = report_with(vec![(128, 2), (384, 8)]);
        assert!(!report.dimensions_consistent());
        assert!(!report.is_healthy());
        assert!(report.to_string().contains("INCONSISTENT"));
    }

    #[test]
    fn single_wrong_dimension_is_flagged() {
        let report = report_with(vec![(512, 10)]);
        assert!(!report.dimensions_consistent());
    }

    #[test]
    fn empty_collection_is_not_healthy() {
        let mut report = report_with(vec![]);
        report.sample = None;
        assert_eq!(report.total_documents, 0);
        assert!(!report.is_healthy());
        assert!(report.to_string().contains("collection is empty"));
    }

    #[test]
    fn missing_fields_are_flagged() {
        let mut report = report_with(vec![(384, 10)]);
        report.missing_embedding = 3;
        assert!(!report.required_fields_present());
        assert!(!report.is_healthy());
    }

    #[test]
    fn hash_shape_check_accepts_real_hashes() {
        assert!(is_hash_shaped(&content_hash("any speech")));
        assert!(!is_hash_shaped("not-a-hash"));
        assert!(!is_hash_shaped(&content_hash("x").to_uppercase()));
    }
}
