//! Classifies a message as a weather query and extracts its location and parameters.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::{collections::BTreeSet, convert::TryFrom, sync::Arc};

use crate::{
    llm::{ChatMessage, CompletionClient},
    model::{IntentResult, WeatherParameter},
};

const INTENT_PROMPT: &str = r#"You are a weather query analyzer. Your task is to determine if the user's message is asking about weather and extract relevant information.

You must respond with ONLY valid JSON in this exact format:

For weather queries:
{
  "is_weather_query": true,
  "location": "City Name",
  "parameters": ["temperature", "humidity"],
  "timeframe": "current",
  "latitude": 28.6139,
  "longitude": 77.2090
}

For non-weather queries:
{
  "is_weather_query": false
}

Important rules:
1. Extract the city/location name from the query
2. Determine what weather parameters the user wants, choosing from: temperature, humidity, precipitation, wind_speed, weather, pressure, cloud_cover
3. Provide accurate latitude and longitude for the location; use null if you are not sure where it is
4. If no specific parameters are mentioned, default to ["temperature"]
5. Timeframe should always be "current" for now
6. Return ONLY the JSON, no other text or explanation"#;

#[derive(Debug, Deserialize)]
struct RawIntent {
    is_weather_query: bool,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    parameters: Option<OneOrMany>,
    #[serde(default)]
    timeframe: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Accepts `28.6`, `"28.6"` or `null`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Pull the outermost `{ ... }` out of a completion that may carry extra prose
/// or code fences, then parse it. Returns `None` for anything malformed.
pub fn parse_intent(content: &str) -> Option<IntentResult> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }

    let raw: RawIntent = match serde_json::from_str(&content[start..=end]) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!("Intent JSON did not parse: {e}");
            return None;
        }
    };

    if !raw.is_weather_query {
        return Some(IntentResult::not_weather());
    }

    let names = match raw.parameters {
        Some(OneOrMany::One(name)) => vec![name],
        Some(OneOrMany::Many(names)) => names,
        None => Vec::new(),
    };

    let mut parameters: BTreeSet<WeatherParameter> = BTreeSet::new();
    for name in &names {
        match WeatherParameter::try_from(name.as_str()) {
            Ok(p) => {
                parameters.insert(p);
            }
            Err(e) => tracing::debug!("Dropping parameter: {e}"),
        }
    }
    if parameters.is_empty() {
        parameters.insert(WeatherParameter::Temperature);
    }

    let location = raw.location.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());

    Some(IntentResult {
        is_weather_query: true,
        location,
        parameters,
        timeframe: raw.timeframe,
        latitude: raw.latitude,
        longitude: raw.longitude,
    })
}

#[derive(Debug, Clone)]
pub struct IntentExtractor {
    llm: Arc<dyn CompletionClient>,
}

impl IntentExtractor {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self { llm }
    }

    /// Never fails: upstream or parse errors classify the message as non-weather.
    pub async fn extract(&self, message: &str) -> IntentResult {
        let messages = [ChatMessage::system(INTENT_PROMPT), ChatMessage::user(message)];

        let content = match self.llm.complete(&messages).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Intent extraction failed, treating as conversation: {e}");
                return IntentResult::not_weather();
            }
        };

        match parse_intent(&content) {
            Some(intent) => intent,
            None => {
                tracing::warn!(
                    "Intent extraction returned malformed output, treating as conversation"
                );
                IntentResult::not_weather()
            }
        }
    }
}
