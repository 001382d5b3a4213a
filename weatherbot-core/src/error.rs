//! Error types for each remote boundary of the pipeline.
//!
//! None of these reach the HTTP caller: [`crate::WeatherChat`] turns every
//! one of them into a safe reply.

use thiserror::Error;

/// Failures talking to the text-completion service.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Completion request timed out")]
    Timeout,

    #[error("Failed to send completion request: {0}")]
    Transport(String),

    #[error("Completion request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse completion response: {0}")]
    Parse(String),

    #[error("Completion response contained no content")]
    Empty,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_decode() {
            LlmError::Parse(e.to_string())
        } else {
            LlmError::Transport(e.to_string())
        }
    }
}

/// Failures fetching observations from the forecast service.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Forecast request timed out")]
    Timeout,

    #[error("Failed to send forecast request: {0}")]
    Transport(String),

    #[error("Forecast request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse forecast response: {0}")]
    Parse(String),

    #[error("Forecast response is missing requested values: {}", .0.join(", "))]
    Incomplete(Vec<String>),

    #[error("No weather parameters requested")]
    NothingRequested,
}

impl From<reqwest::Error> for ForecastError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ForecastError::Timeout
        } else if e.is_decode() {
            ForecastError::Parse(e.to_string())
        } else {
            ForecastError::Transport(e.to_string())
        }
    }
}

/// Failures looking up a place name.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding request timed out")]
    Timeout,

    #[error("Failed to send geocoding request: {0}")]
    Transport(String),

    #[error("Geocoding request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse geocoding response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GeocodeError::Timeout
        } else if e.is_decode() {
            GeocodeError::Parse(e.to_string())
        } else {
            GeocodeError::Transport(e.to_string())
        }
    }
}

/// Why a weather query could not be pinned to coordinates.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("No location given")]
    Missing,

    #[error("Could not find coordinates for '{0}'")]
    Unresolved(String),

    #[error("Geocoding '{name}' failed: {source}")]
    Geocode {
        name: String,
        #[source]
        source: GeocodeError,
    },
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("oops"), "oops");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 203);
    }

    #[test]
    fn incomplete_lists_variables() {
        let err = ForecastError::Incomplete(vec!["temperature_2m".into(), "cloud_cover".into()]);
        assert_eq!(
            err.to_string(),
            "Forecast response is missing requested values: temperature_2m, cloud_cover"
        );
    }
}
