//! Geocode client for single-address lookups
//!
//! This module defines the [`Geocoder`] seam used by the pipeline and the
//! classification of provider responses into the fixed [`GeocodeOutcome`]
//! taxonomy. The HTTP implementation lives in [`google`].
//!
//! # Outcome Classification
//!
//! | Condition | Outcome |
//! |---|---|
//! | empty / whitespace address | `EmptyAddress` (no call) |
//! | absent, placeholder or too-short credential | `KeyMissing` (no call) |
//! | at least one candidate | `Success` from the first candidate |
//! | `ZERO_RESULTS` | `NotFound` |
//! | `OVER_QUERY_LIMIT` | `RateLimited` |
//! | any other status | `ApiError` |
//! | timeout, connection error, unparseable non-2xx | `TransportError` |
//!
//! Clients never retry; a failed record keeps its placeholder coordinates.

pub mod google;

pub use google::GoogleGeocoder;

use crate::Result;
use crate::app::models::GeocodeOutcome;
use crate::constants::{MIN_API_KEY_LEN, PLACEHOLDER_API_KEYS, status};
use serde::Deserialize;
use std::future::Future;

/// One external lookup per call
///
/// `Err` signals an unexpected client failure; callers downgrade it to
/// [`GeocodeOutcome::TransportError`] for the record being processed.
pub trait Geocoder {
    fn lookup(&self, address: &str) -> impl Future<Output = Result<GeocodeOutcome>> + Send;
}

/// Provider response body
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeCandidate>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeCandidate {
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    pub location: Location,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// Map a decoded provider response onto the outcome taxonomy
pub fn classify_response(response: &GeocodeResponse) -> GeocodeOutcome {
    if let Some(best) = response.results.first() {
        return GeocodeOutcome::Success {
            lat: best.geometry.location.lat,
            lon: best.geometry.location.lng,
        };
    }

    match response.status.as_str() {
        // An OK status without candidates carries nothing usable either
        status::ZERO_RESULTS | status::OK => GeocodeOutcome::NotFound,
        status::OVER_QUERY_LIMIT => GeocodeOutcome::RateLimited,
        other => GeocodeOutcome::ApiError {
            detail: match &response.error_message {
                Some(message) => format!("{}: {}", other, message),
                None => other.to_string(),
            },
        },
    }
}

/// Whether a credential is worth sending to the service
pub fn credential_is_usable(api_key: &str) -> bool {
    let key = api_key.trim();
    !key.is_empty()
        && key.len() >= MIN_API_KEY_LEN
        && !PLACEHOLDER_API_KEYS
            .iter()
            .any(|placeholder| key.eq_ignore_ascii_case(placeholder))
}
