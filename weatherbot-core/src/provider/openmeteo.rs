use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use crate::{
    Config,
    error::{ForecastError, truncate_body},
    model::{Coordinates, WeatherObservation, WeatherParameter},
};

use super::ForecastProvider;

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    endpoint: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, ForecastError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, http })
    }

    pub fn from_config(config: &Config) -> Result<Self, ForecastError> {
        Self::new(config.forecast.endpoint.clone(), config.forecast_timeout())
    }
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    #[serde(default)]
    current: Option<Map<String, Value>>,
    #[serde(default)]
    current_units: Map<String, Value>,
}

#[async_trait]
impl ForecastProvider for OpenMeteoProvider {
    async fn current(
        &self,
        location: &str,
        coordinates: Coordinates,
        parameters: &BTreeSet<WeatherParameter>,
    ) -> Result<WeatherObservation, ForecastError> {
        if parameters.is_empty() {
            return Err(ForecastError::NothingRequested);
        }

        let current = current_query(parameters);

        let res = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("latitude", coordinates.latitude.to_string()),
                ("longitude", coordinates.longitude.to_string()),
                ("current", current),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ForecastError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: OmForecastResponse =
            serde_json::from_str(&body).map_err(|e| ForecastError::Parse(e.to_string()))?;

        let observation = observation_from(location, parsed, parameters)?;
        tracing::debug!(
            location,
            values = observation.data.len(),
            "Fetched current weather from Open-Meteo"
        );

        Ok(observation)
    }
}

/// Comma-separated `current=` value in a stable order.
fn current_query(parameters: &BTreeSet<WeatherParameter>) -> String {
    parameters.iter().map(WeatherParameter::as_str).collect::<Vec<_>>().join(",")
}

fn observation_from(
    location: &str,
    parsed: OmForecastResponse,
    parameters: &BTreeSet<WeatherParameter>,
) -> Result<WeatherObservation, ForecastError> {
    let current = parsed.current.unwrap_or_default();

    let mut data = BTreeMap::new();
    let mut missing = Vec::new();

    for param in parameters {
        let variable = param.as_str();
        match current.get(variable).and_then(Value::as_f64) {
            Some(value) if value.is_finite() => {
                data.insert(variable.to_string(), value);
            }
            _ => missing.push(variable.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(ForecastError::Incomplete(missing));
    }

    let units = parsed
        .current_units
        .into_iter()
        .filter(|(k, _)| data.contains_key(k))
        .filter_map(|(k, v)| v.as_str().map(|u| (k, u.to_string())))
        .collect();

    let observed_at = current
        .get("time")
        .and_then(Value::as_str)
        .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M").ok());

    Ok(WeatherObservation {
        location: location.to_string(),
        data,
        units,
        observed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> OmForecastResponse {
        serde_json::from_str(json).expect("fixture should parse")
    }

    #[test]
    fn current_query_is_sorted_and_deduplicated() {
        let params = BTreeSet::from([
            WeatherParameter::Humidity,
            WeatherParameter::Temperature,
            WeatherParameter::Humidity,
        ]);
        assert_eq!(current_query(&params), "temperature_2m,relative_humidity_2m");
    }

    #[test]
    fn observation_keeps_only_requested_values_and_units() {
        let parsed = parse(
            r#"{
                "current_units": {"time": "iso8601", "interval": "seconds",
                                  "temperature_2m": "°C", "relative_humidity_2m": "%"},
                "current": {"time": "2026-10-15T12:00", "interval": 900,
                            "temperature_2m": 28.4, "relative_humidity_2m": 54}
            }"#,
        );
        let params = BTreeSet::from([WeatherParameter::Temperature, WeatherParameter::Humidity]);

        let obs = observation_from("Delhi", parsed, &params).unwrap();

        assert_eq!(obs.location, "Delhi");
        assert_eq!(obs.data.len(), 2);
        assert_eq!(obs.data["temperature_2m"], 28.4);
        assert_eq!(obs.data["relative_humidity_2m"], 54.0);
        assert_eq!(obs.units.len(), 2);
        assert_eq!(obs.units["temperature_2m"], "°C");
        assert_eq!(
            obs.observed_at,
            NaiveDateTime::parse_from_str("2026-10-15T12:00", "%Y-%m-%dT%H:%M").ok()
        );
    }

    #[test]
    fn missing_value_is_incomplete() {
        let parsed = parse(r#"{"current": {"temperature_2m": 28.4, "cloud_cover": null}}"#);
        let params = BTreeSet::from([WeatherParameter::Temperature, WeatherParameter::CloudCover]);

        let err = observation_from("Delhi", parsed, &params).unwrap_err();
        assert!(matches!(err, ForecastError::Incomplete(ref v) if v == &["cloud_cover"]));
    }

    #[test]
    fn absent_current_block_is_incomplete() {
        let parsed = parse(r#"{"latitude": 28.625}"#);
        let params = BTreeSet::from([WeatherParameter::Temperature]);

        let err = observation_from("Delhi", parsed, &params).unwrap_err();
        assert!(matches!(err, ForecastError::Incomplete(_)));
    }
}
