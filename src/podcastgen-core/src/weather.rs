//! Weather lookup used by weather-aware intros.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{Language, WeatherConfig};
use crate::error::PodcastError;

/// Today's forecast for a location.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub min_temp: f64,
    pub max_temp: f64,
    pub description: String,
    /// Provider condition code (OpenWeather numbering).
    pub code: u32,
}

/// Coarse weather category selecting the intro pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCategory {
    Thunderstorm,
    Drizzle,
    Rain,
    Snow,
    Atmosphere,
    Clear,
    Clouds,
    Unknown,
}

impl WeatherCategory {
    pub fn from_code(code: u32) -> Self {
        match code {
            200..=299 => WeatherCategory::Thunderstorm,
            300..=399 => WeatherCategory::Drizzle,
            500..=599 => WeatherCategory::Rain,
            600..=699 => WeatherCategory::Snow,
            700..=799 => WeatherCategory::Atmosphere,
            800 => WeatherCategory::Clear,
            801..=899 => WeatherCategory::Clouds,
            _ => WeatherCategory::Unknown,
        }
    }

    /// Pool key in the intro templates. Unknown codes use `default`.
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCategory::Thunderstorm => "thunderstorm",
            WeatherCategory::Drizzle => "drizzle",
            WeatherCategory::Rain => "rain",
            WeatherCategory::Snow => "snow",
            WeatherCategory::Atmosphere => "atmosphere",
            WeatherCategory::Clear => "clear",
            WeatherCategory::Clouds => "clouds",
            WeatherCategory::Unknown => "default",
        }
    }
}

/// Geocoding and forecast provider.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Resolve a city name to `(lat, lon)`.
    async fn city_to_lat_lon(&self, city: &str) -> Result<(f64, f64), PodcastError>;

    async fn forecast(
        &self,
        lat: f64,
        lon: f64,
        language: Language,
    ) -> Result<Forecast, PodcastError>;
}

/// OpenWeather HTTP client.
pub struct OpenWeatherClient {
    http: reqwest::Client,
    config: WeatherConfig,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GeoEntry {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    weather: Vec<WeatherCondition>,
    main: WeatherMain,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    id: u32,
    description: String,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp_min: f64,
    temp_max: f64,
}

impl OpenWeatherClient {
    pub fn new(config: WeatherConfig, api_key: impl Into<String>) -> Result<Self, PodcastError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PodcastError::Weather(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn city_to_lat_lon(&self, city: &str) -> Result<(f64, f64), PodcastError> {
        let url = format!("{}/geo/1.0/direct", self.config.api_base);
        let entries: Vec<GeoEntry> = self
            .http
            .get(url)
            .query(&[("q", city), ("limit", "1"), ("appid", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        entries
            .first()
            .map(|e| (e.lat, e.lon))
            .ok_or_else(|| PodcastError::Weather(format!("Unknown city '{}'", city)))
    }

    async fn forecast(
        &self,
        lat: f64,
        lon: f64,
        language: Language,
    ) -> Result<Forecast, PodcastError> {
        let url = format!("{}/data/2.5/weather", self.config.api_base);
        let lat = lat.to_string();
        let lon = lon.to_string();
        let response: WeatherResponse = self
            .http
            .get(url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("units", self.config.units.as_str()),
                ("lang", language.code()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let condition = response
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| PodcastError::Weather("Response has no weather conditions".to_string()))?;

        Ok(Forecast {
            min_temp: response.main.temp_min,
            max_temp: response.main.temp_max,
            description: condition.description,
            code: condition.id,
        })
    }
}
