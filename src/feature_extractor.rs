//! Feature extraction for fraud model inference.
//!
//! This module turns a raw transaction into the feature vector the model was
//! trained on. Feature order is defined once in [`FEATURE_LAYOUT`] and is
//! checked against the scaler when the artifact bundle is loaded.

use crate::models::encoder::EncoderTable;
use crate::types::transaction::RawTransaction;

/// Feature names in the exact order the scaler and model expect them
pub const FEATURE_LAYOUT: [&str; FEATURE_COUNT] = [
    "merchant",  // 0: encoded
    "category",  // 1: encoded
    "amt",       // 2
    "gender",    // 3: encoded
    "city_pop",  // 4
    "job",       // 5: encoded
    "merch_lat", // 6
    "merch_lon", // 7
    "lat",       // 8
    "long",      // 9
    "dist",      // 10: derived
];

/// Total number of features
pub const FEATURE_COUNT: usize = 11;

/// Planar distance between cardholder and merchant coordinates.
///
/// Not a geodesic distance: the model was trained on this exact formula and
/// the serving value has to match it bit for bit.
pub fn distance(lat: f64, long: f64, merch_lat: f64, merch_lon: f64) -> f64 {
    ((lat - merch_lat).powi(2) + (long - merch_lon).powi(2)).sqrt()
}

/// Encoded, unscaled features of one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub merchant: i64,
    pub category: i64,
    pub amt: f64,
    pub gender: i64,
    pub city_pop: u64,
    pub job: i64,
    pub merch_lat: f64,
    pub merch_lon: f64,
    pub lat: f64,
    pub long: f64,
    pub dist: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_LAYOUT`] order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.merchant as f64,
            self.category as f64,
            self.amt,
            self.gender as f64,
            self.city_pop as f64,
            self.job as f64,
            self.merch_lat,
            self.merch_lon,
            self.lat,
            self.long,
            self.dist,
        ]
    }

    /// `(name, value)` pairs, mostly for debug logging
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        FEATURE_LAYOUT.iter().copied().zip(self.to_array()).collect()
    }
}

/// Feature extractor that transforms transactions into model input features.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Derive the distance feature and encode the categorical fields.
    pub fn extract(&self, tx: &RawTransaction, encoder: &EncoderTable) -> FeatureVector {
        FeatureVector {
            merchant: encoder.encode("merchant", &tx.merchant),
            category: encoder.encode("category", &tx.category),
            amt: tx.amt,
            gender: encoder.encode("gender", &tx.gender),
            city_pop: tx.city_pop,
            job: encoder.encode("job", &tx.job),
            merch_lat: tx.merch_lat,
            merch_lon: tx.merch_lon,
            lat: tx.lat,
            long: tx.long,
            dist: distance(tx.lat, tx.long, tx.merch_lat, tx.merch_lon),
        }
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names in model order.
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_LAYOUT
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
