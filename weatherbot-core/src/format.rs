//! Turns observations into prose, and answers non-weather messages.
//!
//! Every reply that leaves this module is checked against the data it was
//! built from: a weather reply may only contain numbers present in the
//! observation, and a conversational reply may not contain weather figures
//! at all. Replies that fail the check are replaced by a template.

use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::{
    llm::{ChatMessage, CompletionClient},
    model::{WeatherObservation, WeatherParameter},
};

const FORMAT_PROMPT: &str = "You are a friendly weather assistant. Format the provided weather data into a natural, conversational response.

Rules:
1. Use ONLY the data provided - do not make up or hallucinate information
2. Include units properly (°C, %, mm, etc.)
3. Write every number exactly as it appears in the data, without rounding or converting
4. Keep the response concise and friendly
5. Mention the location clearly
6. Do not mention any figure that is not in the data";

const CONVERSE_PROMPT: &str = "You are a helpful assistant. Answer the user's question naturally and concisely. \
You have no access to live weather data: never state temperatures, humidity, wind speeds or other weather figures. \
If the user seems to want the weather, ask which place they mean.";

pub const CONVERSE_FALLBACK: &str =
    "I'm sorry, I couldn't process your request at the moment. Please try again.";

const NO_FIGURES_REPLY: &str = "I can only share weather figures I've looked up. \
Ask me about the weather in a specific place and I'll fetch the latest observations.";

#[derive(Debug, Clone)]
pub struct ResponseFormatter {
    llm: Arc<dyn CompletionClient>,
}

impl ResponseFormatter {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self { llm }
    }

    /// Conversational reply for an observation. Falls back to
    /// [`template_reply`] if the model fails or strays from the data.
    pub async fn format(&self, observation: &WeatherObservation) -> String {
        let messages =
            [ChatMessage::system(FORMAT_PROMPT), ChatMessage::user(format_prompt(observation))];

        match self.llm.complete(&messages).await {
            Ok(reply) if is_grounded(&reply, observation) => reply,
            Ok(reply) => {
                tracing::warn!(
                    location = %observation.location,
                    "Formatted reply contained figures not in the observation, using template"
                );
                tracing::debug!(reply = %reply, "Rejected reply");
                template_reply(observation)
            }
            Err(e) => {
                tracing::warn!("Response formatting failed, using template: {e}");
                template_reply(observation)
            }
        }
    }

    /// Reply to a message that is not a weather query.
    pub async fn converse(&self, message: &str) -> String {
        let messages = [ChatMessage::system(CONVERSE_PROMPT), ChatMessage::user(message)];

        match self.llm.complete(&messages).await {
            Ok(reply) if mentions_weather_figures(&reply) => {
                tracing::warn!("Conversational reply quoted weather figures, replacing it");
                NO_FIGURES_REPLY.to_string()
            }
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Conversational reply failed: {e}");
                CONVERSE_FALLBACK.to_string()
            }
        }
    }
}

fn format_prompt(observation: &WeatherObservation) -> String {
    let data = serde_json::to_string_pretty(&observation.data).unwrap_or_default();
    let units = serde_json::to_string_pretty(&observation.units).unwrap_or_default();

    let mut prompt = format!(
        "Location: {}\n\nWeather Data: {data}\n\nUnits: {units}\n",
        observation.location
    );

    if let Some(code) = observation.data.get(WeatherParameter::WeatherCode.as_str()) {
        if let Some(desc) = wmo_description(*code) {
            prompt.push_str(&format!(
                "\nWeather code {code} means: {desc}. Describe the conditions in words instead of quoting the code.\n"
            ));
        }
    }

    prompt.push_str("\nFormat this into a natural conversational response.");
    prompt
}

/// Deterministic reply built only from the observation.
pub fn template_reply(observation: &WeatherObservation) -> String {
    let parts: Vec<String> = observation
        .data
        .iter()
        .map(|(variable, value)| {
            let param = WeatherParameter::from_variable(variable);

            if param == Some(WeatherParameter::WeatherCode) {
                if let Some(desc) = wmo_description(*value) {
                    return format!("conditions {}", desc.to_lowercase());
                }
            }

            let label = param.map(|p| p.label()).unwrap_or(variable.as_str());
            match observation.unit_for(variable) {
                Some("%") => format!("{label} {value}%"),
                Some(unit) if !unit.is_empty() => format!("{label} {value} {unit}"),
                _ => format!("{label} {value}"),
            }
        })
        .collect();

    if parts.is_empty() {
        return format!(
            "I couldn't find any current weather data for {}.",
            observation.location
        );
    }

    format!("Current weather in {}: {}.", observation.location, parts.join(", "))
}

/// Every number in `reply`, sign included, equals a value in the observation
/// or appears in the location name.
pub fn is_grounded(reply: &str, observation: &WeatherObservation) -> bool {
    let location_numbers: Vec<f64> =
        scan_numbers(&observation.location).into_iter().map(|n| n.value).collect();

    scan_numbers(reply).into_iter().all(|n| {
        observation.data.values().any(|v| *v == n.value) || location_numbers.contains(&n.value)
    })
}

/// Decimal numbers with an optional sign. The first branch takes
/// comma-grouped thousands such as "1,013.2".
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-−]?\d{1,3}(?:,\d{3})+(?:\.\d+)?|[-−]?\d+(?:\.\d+)?")
        .expect("number pattern is valid")
});

/// A weather unit at the start of the text that follows a number.
static WEATHER_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:°|º|%|degrees?\b|deg\b|celsius\b|fahrenheit\b|[cf]\b|km/h|kmh\b|kph\b|mph\b|m/s\b|hpa\b|mbar\b|mb\b|mm\b|knots?\b|percent\b)",
    )
    .expect("unit pattern is valid")
});

/// True when a number is directly followed by a weather unit, e.g. "25°C",
/// "77 F", "12 km/h" or "60 percent".
pub fn mentions_weather_figures(reply: &str) -> bool {
    scan_numbers(reply).into_iter().any(|n| WEATHER_UNIT.is_match(&reply[n.end..]))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NumberToken {
    value: f64,
    /// Byte offset just past the last character of the number.
    end: usize,
}

/// Numbers in `text`. A hyphen glued to a preceding word or digit, as in
/// "COVID-19" or "2024-25", is a dash and not a minus sign.
fn scan_numbers(text: &str) -> Vec<NumberToken> {
    NUMBER
        .find_iter(text)
        .filter_map(|m| {
            let mut raw = m.as_str().replace(',', "").replace('−', "-");

            let glued = text[..m.start()].chars().next_back().is_some_and(char::is_alphanumeric);
            if glued && raw.starts_with('-') {
                raw.remove(0);
            }

            raw.parse::<f64>().ok().map(|value| NumberToken {
                value,
                end: m.end(),
            })
        })
        .collect()
}

/// WMO weather interpretation codes as used by Open-Meteo.
pub fn wmo_description(code: f64) -> Option<&'static str> {
    if code.fract() != 0.0 {
        return None;
    }

    let desc = match code as i64 {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 => "Light rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 | 67 => "Freezing rain",
        71 | 73 | 75 | 77 => "Snow",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => return None,
    };

    Some(desc)
}
