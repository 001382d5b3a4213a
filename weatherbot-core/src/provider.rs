use async_trait::async_trait;
use std::{collections::BTreeSet, fmt::Debug};

use crate::{
    error::ForecastError,
    model::{Coordinates, WeatherObservation, WeatherParameter},
};

pub mod openmeteo;

pub use openmeteo::OpenMeteoProvider;

/// Source of current weather observations.
///
/// Implementations must request exactly `parameters` and fail with
/// [`ForecastError::Incomplete`] rather than return a partial observation.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    async fn current(
        &self,
        location: &str,
        coordinates: Coordinates,
        parameters: &BTreeSet<WeatherParameter>,
    ) -> Result<WeatherObservation, ForecastError>;
}
