//! The request pipeline: classify, resolve, fetch, format.

use std::sync::Arc;

use crate::{
    Config,
    error::LocationError,
    format::ResponseFormatter,
    geocode::{Geocoder, LocationResolver, OpenMeteoGeocoder},
    intent::IntentExtractor,
    llm::{CompletionClient, OpenAiCompatClient},
    model::{ChatRequest, ChatResponse},
    provider::{ForecastProvider, OpenMeteoProvider},
};

pub const EMPTY_MESSAGE_REPLY: &str =
    "Please send a message, for example \"What's the temperature in Delhi?\"";

const CLARIFY_LOCATION_REPLY: &str = "I couldn't determine the location coordinates. \
Could you please be more specific about the location?";

fn forecast_unavailable_reply(location: &str) -> String {
    format!(
        "I'm sorry, I couldn't fetch the weather data for {location} at the moment. \
         Please try again later."
    )
}

/// Answers one message at a time. Holds no per-request state, so a single
/// instance is shared by every request.
#[derive(Debug, Clone)]
pub struct WeatherChat {
    intents: IntentExtractor,
    locations: LocationResolver,
    forecast: Arc<dyn ForecastProvider>,
    formatter: ResponseFormatter,
}

impl WeatherChat {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        forecast: Arc<dyn ForecastProvider>,
        geocoder: Option<Arc<dyn Geocoder>>,
    ) -> Self {
        Self {
            intents: IntentExtractor::new(llm.clone()),
            locations: LocationResolver::new(geocoder),
            forecast,
            formatter: ResponseFormatter::new(llm),
        }
    }

    /// Wire up the HTTP-backed clients described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let llm: Arc<dyn CompletionClient> = Arc::new(OpenAiCompatClient::from_config(config)?);
        let forecast: Arc<dyn ForecastProvider> = Arc::new(OpenMeteoProvider::from_config(config)?);
        let geocoder = OpenMeteoGeocoder::from_config(config)?
            .map(|g| Arc::new(g) as Arc<dyn Geocoder>);

        Ok(Self::new(llm, forecast, geocoder))
    }

    /// Run the pipeline. Every upstream failure becomes a safe reply.
    pub async fn respond(&self, request: &ChatRequest) -> ChatResponse {
        let message = request.message.trim();
        if message.is_empty() {
            return ChatResponse::new(EMPTY_MESSAGE_REPLY);
        }

        let intent = self.intents.extract(message).await;
        if !intent.is_weather_query {
            tracing::info!("Handling message as conversation");
            return ChatResponse::new(self.formatter.converse(message).await);
        }

        tracing::info!(
            location = intent.location.as_deref().unwrap_or("<none>"),
            parameters = ?intent.parameters,
            "Weather query detected"
        );

        let (location, coordinates) = match self.locations.resolve(&intent).await {
            Ok(resolved) => resolved,
            Err(e) => {
                match &e {
                    LocationError::Geocode { .. } => tracing::warn!("{e}"),
                    _ => tracing::info!("Asking user to clarify location: {e}"),
                }
                return ChatResponse::new(CLARIFY_LOCATION_REPLY);
            }
        };

        let observation =
            match self.forecast.current(&location, coordinates, &intent.parameters).await {
                Ok(observation) => observation,
                Err(e) => {
                    tracing::warn!(
                        location = %location,
                        %coordinates,
                        "Forecast fetch failed: {e}"
                    );
                    return ChatResponse::new(forecast_unavailable_reply(&location));
                }
            };

        ChatResponse::new(self.formatter.format(&observation).await)
    }
}
