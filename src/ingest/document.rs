//! The persisted document shape and its content-derived identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How many leading words the metadata preview keeps.
const PREVIEW_WORDS: usize = 10;

/// SHA-256 content hash of a document's full text, as 64 lowercase hex chars.
///
/// This is the document's identity: equal text always produces the same hash,
/// and the store's primary-key constraint turns a repeated hash into a
/// rejected duplicate insert.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)
}

/// A document as persisted in the store.
///
/// Wire shape: `{ _id, text, embedding }` plus an optional `metadata`
/// object consumers must not depend on. The hash serves as `_id` so the
/// store's uniqueness constraint enforces content-level deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

impl StoredDocument {
    /// Assemble a document from its already-computed parts. Identity is
    /// always derived here, never supplied by the caller.
    pub fn assemble(source_name: &str, text: String, embedding: Vec<f32>) -> Self {
        let id = content_hash(&text);
        let metadata = DocumentMetadata::derive(source_name, &text);
        Self {
            id,
            text,
            embedding,
            metadata: Some(metadata),
        }
    }
}

/// Informational fields derived purely from the source file name and text.
/// Never used for identity or lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source_file: String,
    pub processed_at: DateTime<Utc>,
    pub text_chars: usize,
    pub preview: String,
}

impl DocumentMetadata {
    pub fn derive(source_name: &str, text: &str) -> Self {
        Self {
            source_file: source_name.to_string(),
            processed_at: Utc::now(),
            text_chars: text.chars().count(),
            preview: preview_words(text, PREVIEW_WORDS),
        }
    }
}

fn preview_words(text: &str, count: usize) -> String {
    text.split_whitespace()
        .take(count)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn hash_is_deterministic() {
        let text = "Four score and seven years ago";
        assert_eq!(content_hash(text), content_hash(text));
    }

    #[test]
    fn hash_is_64_lowercase_hex_chars() {
        let hash = content_hash("anything");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn distinct_texts_hash_differently() {
        assert_ne!(content_hash("first speech"), content_hash("second speech"));
    }

    #[test]
    fn hash_matches_known_vector() {
        // sha256 of the empty string, a fixed reference value.
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn assemble_derives_id_and_metadata() {
        let text = indoc! {"
            Citizens of the republic, we gather today
            to remember what was promised.
        "};
        let document = StoredDocument::assemble("speech_001.txt", text.to_string(), vec![0.0; 4]);

        assert_eq!(document.id, content_hash(text));
        let metadata = document.metadata.expect("metadata present");
        assert_eq!(metadata.source_file, "speech_001.txt");
        assert_eq!(metadata.text_chars, text.chars().count());
        assert_eq!(
            metadata.preview,
            "Citizens of the republic, we gather today to remember what"
        );
    }

    #[test]
    fn preview_is_shorter_for_short_texts() {
        assert_eq!(preview_words("only three words", 10), "only three words");
        assert_eq!(preview_words("", 10), "");
    }

    #[test]
    fn bson_shape_matches_wire_contract() {
        let document = StoredDocument {
            id: content_hash("hello"),
            text: "hello".to_string(),
            embedding: vec![0.25, -0.5],
            metadata: None,
        };

        let bson = mongodb::bson::to_document(&document).expect("serialize to bson");
        assert!(bson.contains_key("_id"));
        assert!(bson.contains_key("text"));
        assert!(bson.contains_key("embedding"));
        // Optional metadata is omitted entirely when absent.
        assert!(!bson.contains_key("metadata"));
        assert_eq!(bson.get_str("_id").expect("_id is a string").len(), 64);
    }
}
