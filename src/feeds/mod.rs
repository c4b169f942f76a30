pub mod crypto;
pub mod fallback;
pub mod news;
pub mod rates;
pub mod retry;
pub mod weather;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct FeedMessage {
    pub widget_id: String,
    pub data: FeedData,
}

#[derive(Debug, Clone)]
pub enum FeedData {
    Weather(WeatherReport),
    Rates(Vec<CurrencyRate>),
    Crypto(Vec<CoinPrice>),
    News(NewsBulletin),
    Loading,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub location_name: String,
    pub label_note: String,
    pub location_status: LocationStatus,
    pub temperature_c: f64,
    pub windspeed_kmh: f64,
    pub condition: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationStatus {
    On,
    Off,
}

impl std::fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationStatus::On => write!(f, "On"),
            LocationStatus::Off => write!(f, "Off"),
        }
    }
}

/// One unit of `code` expressed in the quote currency.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyRate {
    pub code: String,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoinPrice {
    pub id: String,
    pub symbol: String,
    pub price: f64,
    pub change_24h: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsBulletin {
    pub source: String,
    pub home: String,
    pub headlines: Vec<String>,
}

/// Failure taxonomy shared by every fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("empty feed")]
    EmptyPayload,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("geolocation unavailable: {0}")]
    Geolocation(String),
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self) -> Result<FeedData>;
}
