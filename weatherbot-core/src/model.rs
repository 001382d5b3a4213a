use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, collections::BTreeSet, convert::TryFrom, fmt};

/// A measurement the user can ask about, keyed by the forecast variable it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherParameter {
    Temperature,
    Humidity,
    Precipitation,
    WindSpeed,
    WeatherCode,
    Pressure,
    CloudCover,
}

impl WeatherParameter {
    /// Open-Meteo `current` variable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherParameter::Temperature => "temperature_2m",
            WeatherParameter::Humidity => "relative_humidity_2m",
            WeatherParameter::Precipitation => "precipitation",
            WeatherParameter::WindSpeed => "wind_speed_10m",
            WeatherParameter::WeatherCode => "weather_code",
            WeatherParameter::Pressure => "pressure_msl",
            WeatherParameter::CloudCover => "cloud_cover",
        }
    }

    /// Human-readable label used in template replies.
    pub fn label(&self) -> &'static str {
        match self {
            WeatherParameter::Temperature => "temperature",
            WeatherParameter::Humidity => "relative humidity",
            WeatherParameter::Precipitation => "precipitation",
            WeatherParameter::WindSpeed => "wind speed",
            WeatherParameter::WeatherCode => "weather code",
            WeatherParameter::Pressure => "sea-level pressure",
            WeatherParameter::CloudCover => "cloud cover",
        }
    }

    /// Unit Open-Meteo reports by default, used when the response omits `current_units`.
    pub fn default_unit(&self) -> &'static str {
        match self {
            WeatherParameter::Temperature => "°C",
            WeatherParameter::Humidity | WeatherParameter::CloudCover => "%",
            WeatherParameter::Precipitation => "mm",
            WeatherParameter::WindSpeed => "km/h",
            WeatherParameter::WeatherCode => "wmo code",
            WeatherParameter::Pressure => "hPa",
        }
    }

    pub const fn all() -> &'static [WeatherParameter] {
        &[
            WeatherParameter::Temperature,
            WeatherParameter::Humidity,
            WeatherParameter::Precipitation,
            WeatherParameter::WindSpeed,
            WeatherParameter::WeatherCode,
            WeatherParameter::Pressure,
            WeatherParameter::CloudCover,
        ]
    }

    /// Look up a parameter by forecast variable name.
    pub fn from_variable(variable: &str) -> Option<Self> {
        Self::all().iter().copied().find(|p| p.as_str() == variable)
    }
}

impl fmt::Display for WeatherParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WeatherParameter {
    type Error = anyhow::Error;

    /// Accepts the user-facing names the intent prompt advertises, a few
    /// aliases, and the forecast variable names themselves.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase().replace([' ', '-'], "_");

        let param = match lower.as_str() {
            "temperature" | "temp" => WeatherParameter::Temperature,
            "humidity" | "relative_humidity" => WeatherParameter::Humidity,
            "precipitation" | "rain" => WeatherParameter::Precipitation,
            "wind_speed" | "wind" => WeatherParameter::WindSpeed,
            "weather" | "weather_code" | "conditions" => WeatherParameter::WeatherCode,
            "pressure" => WeatherParameter::Pressure,
            "cloud_cover" | "clouds" | "cloudiness" => WeatherParameter::CloudCover,
            other => WeatherParameter::from_variable(other).ok_or_else(|| {
                anyhow::anyhow!("Unknown weather parameter '{value}'.")
            })?,
        };

        Ok(param)
    }
}

/// Structured reading of a user message, as produced by the intent extractor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntentResult {
    pub is_weather_query: bool,
    pub location: Option<String>,
    pub parameters: BTreeSet<WeatherParameter>,
    pub timeframe: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl IntentResult {
    pub fn not_weather() -> Self {
        Self::default()
    }
}

/// A validated point on the globe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Returns `None` unless both values are finite and within WGS84 bounds.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Current values fetched for one location, keyed by forecast variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub location: String,
    pub data: BTreeMap<String, f64>,
    #[serde(default)]
    pub units: BTreeMap<String, String>,
    #[serde(default)]
    pub observed_at: Option<NaiveDateTime>,
}

impl WeatherObservation {
    /// Unit reported by the forecast service, falling back to the parameter default.
    pub fn unit_for(&self, variable: &str) -> Option<&str> {
        self.units.get(variable).map(String::as_str).or_else(|| {
            WeatherParameter::from_variable(variable).map(|p| p.default_unit())
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

impl ChatResponse {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_variable_roundtrip() {
        for param in WeatherParameter::all() {
            let parsed = WeatherParameter::try_from(param.as_str()).expect("variable should parse");
            assert_eq!(*param, parsed);
        }
    }

    #[test]
    fn parameter_aliases() {
        assert_eq!(WeatherParameter::try_from("Wind").unwrap(), WeatherParameter::WindSpeed);
        assert_eq!(WeatherParameter::try_from("wind speed").unwrap(), WeatherParameter::WindSpeed);
        assert_eq!(WeatherParameter::try_from("clouds").unwrap(), WeatherParameter::CloudCover);
        assert_eq!(WeatherParameter::try_from("HUMIDITY").unwrap(), WeatherParameter::Humidity);
        assert_eq!(WeatherParameter::try_from("weather").unwrap(), WeatherParameter::WeatherCode);
    }

    #[test]
    fn unknown_parameter_error() {
        let err = WeatherParameter::try_from("pollen").unwrap_err();
        assert!(err.to_string().contains("Unknown weather parameter"));
    }

    #[test]
    fn coordinates_reject_out_of_range() {
        assert!(Coordinates::new(28.6139, 77.2090).is_some());
        assert!(Coordinates::new(91.0, 0.0).is_none());
        assert!(Coordinates::new(0.0, -181.0).is_none());
        assert!(Coordinates::new(f64::NAN, 10.0).is_none());
    }

    #[test]
    fn unit_for_prefers_reported_units() {
        let mut obs = WeatherObservation {
            location: "Delhi".into(),
            data: BTreeMap::from([("temperature_2m".to_string(), 28.4)]),
            units: BTreeMap::new(),
            observed_at: None,
        };
        assert_eq!(obs.unit_for("temperature_2m"), Some("°C"));

        obs.units.insert("temperature_2m".into(), "°F".into());
        assert_eq!(obs.unit_for("temperature_2m"), Some("°F"));
        assert_eq!(obs.unit_for("snow_depth"), None);
    }
}
