//! HTTP geocoder for JSON geocoding endpoints
//!
//! Issues `GET {endpoint}?address=..&key=..` and classifies the response.
//! The credential is only exposed when building the query string.

use super::{GeocodeResponse, Geocoder, classify_response, credential_is_usable};
use crate::app::models::GeocodeOutcome;
use crate::config::GeocoderConfig;
use crate::constants::{CLIENT_USER_AGENT, ERROR_BODY_EXCERPT_LEN};
use crate::{Error, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, trace};

/// Geocoder backed by a `reqwest` client
#[derive(Debug)]
pub struct GoogleGeocoder {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl GoogleGeocoder {
    /// Build the HTTP client from validated configuration
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(CLIENT_USER_AGENT)
            .build()
            .map_err(|e| Error::http("Failed to build HTTP client", e))?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
            api_key: config.api_key,
        })
    }

    /// Credential if it passes the sanity check
    fn usable_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| credential_is_usable(key))
    }

    pub fn has_usable_key(&self) -> bool {
        self.usable_key().is_some()
    }
}

impl Geocoder for GoogleGeocoder {
    async fn lookup(&self, address: &str) -> Result<GeocodeOutcome> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(GeocodeOutcome::EmptyAddress);
        }

        let Some(api_key) = self.usable_key() else {
            return Ok(GeocodeOutcome::KeyMissing);
        };

        debug!("Geocoding address: {}", address);

        let response = match self
            .client
            .get(&self.endpoint)
            .query(&[("address", address), ("key", api_key.trim())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Ok(GeocodeOutcome::TransportError {
                    detail: describe_transport_error(e),
                });
            }
        };

        let http_status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(GeocodeOutcome::TransportError {
                    detail: describe_transport_error(e),
                });
            }
        };
        trace!("Geocoding response ({}): {}", http_status, body);

        match serde_json::from_str::<GeocodeResponse>(&body) {
            Ok(parsed) => Ok(classify_response(&parsed)),
            Err(_) if !http_status.is_success() => Ok(GeocodeOutcome::TransportError {
                detail: format!("HTTP {}: {}", http_status.as_u16(), excerpt(&body)),
            }),
            Err(e) => Err(Error::decode(format!(
                "Unparseable geocoding response ({}): {}",
                e,
                excerpt(&body)
            ))),
        }
    }
}

fn describe_transport_error(error: reqwest::Error) -> String {
    // reqwest embeds the full URL, including the key, in its Display output
    let error = error.without_url();
    if error.is_timeout() {
        format!("request timed out: {}", error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= ERROR_BODY_EXCERPT_LEN {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(ERROR_BODY_EXCERPT_LEN).collect();
        format!("{}...", cut)
    }
}
