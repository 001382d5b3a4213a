//! Core library for the weather chatbot.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Clients for the completion, forecast and geocoding services
//! - The classify → resolve → fetch → format pipeline ([`WeatherChat`])
//! - Shared domain models (intents, observations, chat messages)
//!
//! It is used by `weatherbot-server`, but can also be reused by other binaries or services.

pub mod chat;
pub mod config;
pub mod error;
pub mod format;
pub mod geocode;
pub mod intent;
pub mod llm;
pub mod model;
pub mod provider;

pub use chat::WeatherChat;
pub use config::Config;
pub use error::{ForecastError, GeocodeError, LlmError, LocationError};
pub use geocode::{Geocoder, GeocodedPlace, LocationResolver, OpenMeteoGeocoder};
pub use llm::{ChatMessage, CompletionClient, OpenAiCompatClient, Role};
pub use model::{
    ChatRequest, ChatResponse, Coordinates, IntentResult, WeatherObservation, WeatherParameter,
};
pub use provider::{ForecastProvider, OpenMeteoProvider};
