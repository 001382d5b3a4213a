//! Turns an [`IntentResult`] into a place name and validated coordinates.
//!
//! Coordinates supplied by the intent extractor win when they are valid.
//! Otherwise an optional forward geocoder (Open-Meteo's free search API, no
//! key required) is asked for the best match of the place name.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, sync::Arc, time::Duration};

use crate::{
    Config,
    error::{GeocodeError, LocationError, truncate_body},
    model::{Coordinates, IntentResult},
};

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub name: String,
    pub country: Option<String>,
    pub coordinates: Coordinates,
}

impl GeocodedPlace {
    pub fn display_name(&self) -> String {
        match &self.country {
            Some(country) if !country.is_empty() && country != &self.name => {
                format!("{}, {}", self.name, country)
            }
            _ => self.name.clone(),
        }
    }
}

/// Forward geocoding: place name to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// `Ok(None)` means the lookup worked but nothing matched.
    async fn search(&self, name: &str) -> Result<Option<GeocodedPlace>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct OmSearchResponse {
    #[serde(default)]
    results: Vec<OmSearchResult>,
}

#[derive(Debug, Deserialize)]
struct OmSearchResult {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoder {
    endpoint: String,
    http: Client,
}

impl OpenMeteoGeocoder {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, GeocodeError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, http })
    }

    /// `None` when geocoding is switched off in the config.
    pub fn from_config(config: &Config) -> Result<Option<Self>, GeocodeError> {
        if !config.geocoding.enabled {
            return Ok(None);
        }
        Self::new(config.geocoding.endpoint.clone(), config.geocoding_timeout()).map(Some)
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    async fn search(&self, name: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
        let res = self
            .http
            .get(&self.endpoint)
            .query(&[("name", name), ("count", "1"), ("format", "json")])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: OmSearchResponse =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

        let place = parsed.results.into_iter().find_map(|r| {
            Coordinates::new(r.latitude, r.longitude).map(|coordinates| GeocodedPlace {
                name: r.name,
                country: r.country,
                coordinates,
            })
        });

        Ok(place)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocationResolver {
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl LocationResolver {
    pub fn new(geocoder: Option<Arc<dyn Geocoder>>) -> Self {
        Self { geocoder }
    }

    /// Returns the name to show the user alongside the coordinates to query.
    pub async fn resolve(
        &self,
        intent: &IntentResult,
    ) -> Result<(String, Coordinates), LocationError> {
        let name = intent.location.clone();

        if let Some(coords) = intent_coordinates(intent) {
            let label = name.unwrap_or_else(|| coords.to_string());
            return Ok((label, coords));
        }

        let Some(name) = name else {
            return Err(LocationError::Missing);
        };

        let Some(geocoder) = &self.geocoder else {
            return Err(LocationError::Unresolved(name));
        };

        tracing::debug!(location = %name, "No usable coordinates from intent, geocoding");

        match geocoder.search(&name).await {
            Ok(Some(place)) => Ok((place.display_name(), place.coordinates)),
            Ok(None) => Err(LocationError::Unresolved(name)),
            Err(source) => Err(LocationError::Geocode { name, source }),
        }
    }
}

/// Valid coordinates from the intent, if any. `(0, 0)` is treated as a
/// placeholder rather than a real answer.
fn intent_coordinates(intent: &IntentResult) -> Option<Coordinates> {
    let coords = Coordinates::new(intent.latitude?, intent.longitude?)?;
    if coords.latitude == 0.0 && coords.longitude == 0.0 {
        return None;
    }
    Some(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeGeocoder {
        place: Option<GeocodedPlace>,
        fail: bool,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn search(&self, name: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
            self.queries.lock().unwrap().push(name.to_string());
            if self.fail {
                return Err(GeocodeError::Timeout);
            }
            Ok(self.place.clone())
        }
    }

    fn weather_intent(location: Option<&str>, lat: Option<f64>, lon: Option<f64>) -> IntentResult {
        IntentResult {
            is_weather_query: true,
            location: location.map(str::to_string),
            latitude: lat,
            longitude: lon,
            ..IntentResult::default()
        }
    }

    fn paris() -> GeocodedPlace {
        GeocodedPlace {
            name: "Paris".into(),
            country: Some("France".into()),
            coordinates: Coordinates::new(48.8534, 2.3488).unwrap(),
        }
    }

    #[tokio::test]
    async fn uses_intent_coordinates_without_geocoding() {
        let geocoder = Arc::new(FakeGeocoder {
            place: Some(paris()),
            ..Default::default()
        });
        let resolver = LocationResolver::new(Some(geocoder.clone()));

        let (name, coords) = resolver
            .resolve(&weather_intent(Some("Delhi"), Some(28.6139), Some(77.209)))
            .await
            .unwrap();

        assert_eq!(name, "Delhi");
        assert_eq!(coords, Coordinates::new(28.6139, 77.209).unwrap());
        assert!(geocoder.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn coordinates_without_name_are_labelled_by_position() {
        let resolver = LocationResolver::default();
        let (name, _) = resolver
            .resolve(&weather_intent(None, Some(10.0), Some(20.0)))
            .await
            .unwrap();
        assert_eq!(name, "10.0000, 20.0000");
    }

    #[tokio::test]
    async fn geocodes_when_coordinates_invalid() {
        let geocoder = Arc::new(FakeGeocoder {
            place: Some(paris()),
            ..Default::default()
        });
        let resolver = LocationResolver::new(Some(geocoder.clone()));

        let (name, coords) = resolver
            .resolve(&weather_intent(Some("Paris"), Some(0.0), Some(0.0)))
            .await
            .unwrap();

        assert_eq!(name, "Paris, France");
        assert_eq!(coords.latitude, 48.8534);
        assert_eq!(geocoder.queries.lock().unwrap().as_slice(), ["Paris"]);
    }

    #[tokio::test]
    async fn missing_location_and_coordinates() {
        let resolver = LocationResolver::default();
        let err = resolver.resolve(&weather_intent(None, None, None)).await.unwrap_err();
        assert!(matches!(err, LocationError::Missing));
    }

    #[tokio::test]
    async fn unresolved_without_geocoder() {
        let resolver = LocationResolver::default();
        let err = resolver
            .resolve(&weather_intent(Some("Springfield"), Some(200.0), None))
            .await
            .unwrap_err();
        assert!(matches!(err, LocationError::Unresolved(name) if name == "Springfield"));
    }

    #[tokio::test]
    async fn no_match_and_geocoder_failure() {
        let empty = LocationResolver::new(Some(Arc::new(FakeGeocoder::default())));
        let err = empty
            .resolve(&weather_intent(Some("Atlantis"), None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, LocationError::Unresolved(_)));

        let failing = LocationResolver::new(Some(Arc::new(FakeGeocoder {
            fail: true,
            ..Default::default()
        })));
        let err = failing
            .resolve(&weather_intent(Some("Atlantis"), None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, LocationError::Geocode { .. }));
    }

    #[test]
    fn display_name_skips_redundant_country() {
        let mut place = paris();
        assert_eq!(place.display_name(), "Paris, France");

        place.name = "Singapore".into();
        place.country = Some("Singapore".into());
        assert_eq!(place.display_name(), "Singapore");
    }
}
