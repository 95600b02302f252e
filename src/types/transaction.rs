//! Card transaction as submitted for scoring

use crate::error::{ScoringError, ScoringResult};
use serde::{Deserialize, Serialize};

/// A single card transaction to be scored for fraud risk.
///
/// Field names follow the training dataset columns so that producers can
/// post rows from it unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Transaction date/time as reported by the source, if any
    #[serde(default)]
    pub trans_date_trans_time: Option<String>,

    /// Merchant name
    pub merchant: String,

    /// Merchant category (e.g. grocery_pos, shopping_net)
    pub category: String,

    /// Transaction amount
    pub amt: f64,

    /// Cardholder gender
    pub gender: String,

    /// Cardholder state (stored, not a model feature)
    pub state: String,

    /// Cardholder job
    pub job: String,

    /// Population of the cardholder's city
    pub city_pop: u64,

    /// Cardholder latitude
    pub lat: f64,

    /// Cardholder longitude
    pub long: f64,

    /// Merchant latitude
    pub merch_lat: f64,

    /// Merchant longitude
    pub merch_lon: f64,
}

impl RawTransaction {
    /// Decode a JSON payload. Type errors and missing fields name the
    /// offending field.
    pub fn from_json(payload: &[u8]) -> ScoringResult<Self> {
        let mut de = serde_json::Deserializer::from_slice(payload);
        let transaction: Self = serde_path_to_error::deserialize(&mut de).map_err(decode_error)?;
        de.end()
            .map_err(|e| ScoringError::invalid(PAYLOAD_FIELD, e.to_string()))?;
        Ok(transaction)
    }

    /// Create a transaction with the given merchant details and a nearby
    /// merchant location.
    pub fn new(merchant: &str, category: &str, amt: f64) -> Self {
        Self {
            trans_date_trans_time: None,
            merchant: merchant.to_string(),
            category: category.to_string(),
            amt,
            gender: "F".to_string(),
            state: "TX".to_string(),
            job: "Job_1".to_string(),
            city_pop: 10_000,
            lat: 35.0,
            long: -95.0,
            merch_lat: 35.01,
            merch_lon: -95.01,
        }
    }

    /// Reject malformed input before it reaches the pipeline.
    pub fn validate(&self) -> ScoringResult<()> {
        let required = [
            ("merchant", &self.merchant),
            ("category", &self.category),
            ("gender", &self.gender),
            ("state", &self.state),
            ("job", &self.job),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ScoringError::invalid(field, "must not be empty"));
            }
        }

        if !self.amt.is_finite() || self.amt < 0.0 {
            return Err(ScoringError::invalid(
                "amt",
                format!("must be a non-negative number, got {}", self.amt),
            ));
        }

        check_coordinate("lat", self.lat, 90.0)?;
        check_coordinate("long", self.long, 180.0)?;
        check_coordinate("merch_lat", self.merch_lat, 90.0)?;
        check_coordinate("merch_lon", self.merch_lon, 180.0)?;

        Ok(())
    }
}

/// Reported when the failure is not tied to a single field
const PAYLOAD_FIELD: &str = "payload";

fn decode_error(err: serde_path_to_error::Error<serde_json::Error>) -> ScoringError {
    let path = err.path().to_string();
    let reason = err.into_inner().to_string();

    // Missing fields are reported against the enclosing object
    let field = if path == "." {
        missing_field(&reason).unwrap_or(PAYLOAD_FIELD).to_string()
    } else {
        path
    };
    ScoringError::invalid(field, reason)
}

fn missing_field(reason: &str) -> Option<&str> {
    reason
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
}

/// Dollar amount as shown in reports and alerts; whole amounts keep `.0`
pub fn format_amount(amt: f64) -> String {
    format!("${:?}", amt)
}

fn check_coordinate(field: &'static str, value: f64, bound: f64) -> ScoringResult<()> {
    if !value.is_finite() || value.abs() > bound {
        return Err(ScoringError::invalid(
            field,
            format!("must be within [-{bound}, {bound}], got {value}"),
        ));
    }
    Ok(())
}
