//! Categorical encoder with an out-of-vocabulary fallback
//!
//! Codes follow label-encoder semantics: a value's code is its index in the
//! sorted class list learned during training. Values never seen during
//! training are mapped to the fallback code instead of failing the request.

use crate::error::{ScoringError, ScoringResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Fields encoded before scaling, in no particular order
pub const CATEGORICAL_FIELDS: [&str; 4] = ["merchant", "category", "gender", "job"];

/// Code used for unseen values unless configured otherwise
pub const DEFAULT_FALLBACK_CODE: i64 = 0;

/// On-disk form of the encoder table (`encoders.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderArtifact {
    /// Training run that produced this table
    pub bundle_version: String,
    /// Field name -> class list, index = code
    pub fields: HashMap<String, Vec<String>>,
}

/// Vocabulary learned for one categorical field
#[derive(Debug, Clone, Default)]
struct FieldVocabulary {
    codes: HashMap<String, i64>,
}

impl FieldVocabulary {
    fn from_classes(field: &str, classes: Vec<String>) -> ScoringResult<Self> {
        let mut codes = HashMap::with_capacity(classes.len());
        for (index, class) in classes.into_iter().enumerate() {
            if codes.insert(class.clone(), index as i64).is_some() {
                return Err(ScoringError::Configuration(format!(
                    "encoder field '{}' lists class '{}' more than once",
                    field, class
                )));
            }
        }
        Ok(Self { codes })
    }
}

/// Read-only lookup table shared by all scoring requests
#[derive(Debug, Clone)]
pub struct EncoderTable {
    bundle_version: String,
    fields: HashMap<String, FieldVocabulary>,
    fallback_code: i64,
}

impl EncoderTable {
    /// Build a table from its artifact form
    pub fn from_artifact(artifact: EncoderArtifact, fallback_code: i64) -> ScoringResult<Self> {
        let mut fields = HashMap::with_capacity(artifact.fields.len());
        for (field, classes) in artifact.fields {
            let vocabulary = FieldVocabulary::from_classes(&field, classes)?;
            fields.insert(field, vocabulary);
        }

        let table = Self {
            bundle_version: artifact.bundle_version,
            fields,
            fallback_code,
        };

        for field in table.missing_fields() {
            warn!(
                field = %field,
                fallback_code = fallback_code,
                "Encoder table has no vocabulary for field, every value will use the fallback code"
            );
        }

        Ok(table)
    }

    /// Convenience constructor from `(field, classes)` pairs
    pub fn from_classes<I, C>(bundle_version: &str, fields: I, fallback_code: i64) -> ScoringResult<Self>
    where
        I: IntoIterator<Item = (&'static str, C)>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(name, classes)| {
                (
                    name.to_string(),
                    classes.into_iter().map(Into::into).collect(),
                )
            })
            .collect();

        Self::from_artifact(
            EncoderArtifact {
                bundle_version: bundle_version.to_string(),
                fields,
            },
            fallback_code,
        )
    }

    /// Encode a categorical value. Never fails: unseen values and unknown
    /// fields yield the fallback code.
    pub fn encode(&self, field: &str, value: &str) -> i64 {
        self.fields
            .get(field)
            .and_then(|vocabulary| vocabulary.codes.get(value))
            .copied()
            .unwrap_or(self.fallback_code)
    }

    /// Whether `value` was seen during training for `field`
    pub fn is_known(&self, field: &str, value: &str) -> bool {
        self.fields
            .get(field)
            .is_some_and(|vocabulary| vocabulary.codes.contains_key(value))
    }

    /// Number of known classes for a field
    pub fn vocabulary_size(&self, field: &str) -> usize {
        self.fields.get(field).map_or(0, |v| v.codes.len())
    }

    /// Categorical fields the table has no vocabulary for
    pub fn missing_fields(&self) -> Vec<&'static str> {
        CATEGORICAL_FIELDS
            .iter()
            .copied()
            .filter(|field| !self.fields.contains_key(*field))
            .collect()
    }

    pub fn fallback_code(&self) -> i64 {
        self.fallback_code
    }

    pub fn bundle_version(&self) -> &str {
        &self.bundle_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EncoderTable {
        EncoderTable::from_classes(
            "v1",
            [
                ("merchant", vec!["fraud_merchant_0", "merchant_1", "merchant_2"]),
                ("category", vec!["entertainment", "grocery_pos", "travel"]),
                ("gender", vec!["F", "M"]),
                ("job", vec!["Job_1", "Job_2"]),
            ],
            DEFAULT_FALLBACK_CODE,
        )
        .unwrap()
    }

    #[test]
    fn test_known_values_use_learned_codes() {
        let table = table();
        assert_eq!(table.encode("merchant", "merchant_2"), 2);
        assert_eq!(table.encode("category", "grocery_pos"), 1);
        assert_eq!(table.encode("gender", "M"), 1);
        assert_eq!(table.encode("job", "Job_1"), 0);
    }

    #[test]
    fn test_encoding_is_idempotent() {
        let table = table();
        let first = table.encode("category", "travel");
        let second = table.encode("category", "travel");
        assert_eq!(first, second);
        assert_eq!(first, 2);
    }

    #[test]
    fn test_unseen_value_uses_fallback() {
        let table = table();
        assert!(!table.is_known("merchant", "merchant_unknown_999"));
        assert_eq!(table.encode("merchant", "merchant_unknown_999"), 0);
        assert_eq!(table.encode("gender", ""), 0);
    }

    #[test]
    fn test_unknown_field_uses_fallback() {
        let table = table();
        assert_eq!(table.encode("state", "TX"), 0);
    }

    #[test]
    fn test_configurable_fallback_sentinel() {
        let table = EncoderTable::from_classes("v1", [("gender", vec!["F", "M"])], -1).unwrap();
        assert_eq!(table.encode("gender", "X"), -1);
        assert_eq!(table.encode("gender", "F"), 0);
        assert_eq!(table.missing_fields(), vec!["merchant", "category", "job"]);
    }

    #[test]
    fn test_duplicate_class_is_rejected() {
        let result = EncoderTable::from_classes("v1", [("gender", vec!["F", "F"])], 0);
        assert!(matches!(result, Err(ScoringError::Configuration(_))));
    }

    #[test]
    fn test_artifact_parsing() {
        let json = r#"{
            "bundle_version": "2024-06-01",
            "fields": {"gender": ["F", "M"], "category": ["home", "travel"]}
        }"#;
        let artifact: EncoderArtifact = serde_json::from_str(json).unwrap();
        let table = EncoderTable::from_artifact(artifact, 0).unwrap();

        assert_eq!(table.bundle_version(), "2024-06-01");
        assert_eq!(table.vocabulary_size("category"), 2);
        assert_eq!(table.encode("category", "travel"), 1);
    }
}
