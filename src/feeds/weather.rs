use super::retry::ResilientClient;
use super::{FeedData, FeedFetcher, FetchError, LocationStatus, WeatherReport};
use crate::config::GeoPoint;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

const FORECAST_API: &str = "https://api.open-meteo.com/v1/forecast";
const REVERSE_GEOCODE_API: &str = "https://geocode.maps.co/reverse";
const IP_LOCATION_API: &str = "https://ipapi.co/json/";

/// Where the report should be for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationMode {
    /// The configured default location.
    Default,
    /// Look the machine up, falling back to the default on failure.
    Current,
}

/// Base URLs of the three services a weather report is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherEndpoints {
    pub forecast: String,
    pub reverse_geocode: String,
    pub ip_location: String,
}

impl Default for WeatherEndpoints {
    fn default() -> Self {
        Self {
            forecast: FORECAST_API.to_string(),
            reverse_geocode: REVERSE_GEOCODE_API.to_string(),
            ip_location: IP_LOCATION_API.to_string(),
        }
    }
}

pub struct WeatherFetcher {
    default_location: GeoPoint,
    mode: LocationMode,
    endpoints: WeatherEndpoints,
    client: ResilientClient,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
    weathercode: u32,
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeResponse {
    address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpLocationResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
}

impl WeatherFetcher {
    pub fn new(default_location: GeoPoint, mode: LocationMode, client: ResilientClient) -> Self {
        Self {
            default_location,
            mode,
            endpoints: WeatherEndpoints::default(),
            client,
        }
    }

    pub fn with_endpoints(mut self, endpoints: WeatherEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    async fn locate(&self) -> Result<GeoPoint, FetchError> {
        let response: IpLocationResponse = self
            .client
            .get_json(&self.endpoints.ip_location)
            .await
            .map_err(|e| FetchError::Geolocation(e.to_string()))?;

        match (response.latitude, response.longitude) {
            (Some(latitude), Some(longitude)) => Ok(GeoPoint {
                name: response.city.unwrap_or_else(|| "Current location".to_string()),
                latitude,
                longitude,
            }),
            _ => Err(FetchError::Geolocation(
                "lookup returned no coordinates".to_string(),
            )),
        }
    }

    async fn current_weather(&self, point: &GeoPoint) -> Result<CurrentWeather, FetchError> {
        let url = format!(
            "{}?latitude={}&longitude={}&current_weather=true",
            self.endpoints.forecast, point.latitude, point.longitude
        );
        let response: ForecastResponse = self.client.get_json(&url).await?;
        Ok(response.current_weather)
    }

    /// Never fails: an unreachable geocoder yields "Unknown Area".
    async fn place_name(&self, point: &GeoPoint) -> String {
        let url = format!(
            "{}?lat={}&lon={}",
            self.endpoints.reverse_geocode, point.latitude, point.longitude
        );
        match self.client.get_json::<ReverseGeocodeResponse>(&url).await {
            Ok(response) => pick_place_name(response.address.as_ref()),
            Err(e) => {
                tracing::debug!("Reverse geocoding failed: {}", e);
                UNKNOWN_AREA.to_string()
            }
        }
    }
}

const UNKNOWN_AREA: &str = "Unknown Area";

fn pick_place_name(address: Option<&Address>) -> String {
    address
        .and_then(|a| {
            [&a.city, &a.town, &a.village, &a.state, &a.country]
                .into_iter()
                .flatten()
                .find(|name| !name.trim().is_empty())
                .cloned()
        })
        .unwrap_or_else(|| UNKNOWN_AREA.to_string())
}

/// WMO weather interpretation code to text.
pub fn describe_weather_code(code: u32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown condition",
    }
}

#[async_trait]
impl FeedFetcher for WeatherFetcher {
    async fn fetch(&self) -> Result<FeedData> {
        let (point, label_note, location_status) = match self.mode {
            LocationMode::Default => (
                self.default_location.clone(),
                "(Default)".to_string(),
                LocationStatus::Off,
            ),
            LocationMode::Current => match self.locate().await {
                Ok(point) => (point, "(Current location)".to_string(), LocationStatus::On),
                Err(e) => {
                    tracing::warn!("Geolocation denied or failed: {}", e);
                    (
                        self.default_location.clone(),
                        format!("(Location denied — showing {})", self.default_location.name),
                        LocationStatus::Off,
                    )
                }
            },
        };

        let (weather, location_name) =
            futures::future::join(self.current_weather(&point), self.place_name(&point)).await;
        let weather = weather?;

        Ok(FeedData::Weather(WeatherReport {
            location_name,
            label_note,
            location_status,
            temperature_c: weather.temperature,
            windspeed_kmh: weather.windspeed,
            condition: describe_weather_code(weather.weathercode).to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::retry::tests::serve;
    use crate::feeds::retry::RetryPolicy;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[test]
    fn test_describe_weather_code() {
        assert_eq!(describe_weather_code(0), "Clear sky");
        assert_eq!(describe_weather_code(63), "Moderate rain");
        assert_eq!(describe_weather_code(99), "Thunderstorm with heavy hail");
        assert_eq!(describe_weather_code(4), "Unknown condition");
    }

    #[test]
    fn test_place_name_prefers_city_then_smaller_units() {
        let response: ReverseGeocodeResponse = serde_json::from_str(
            r#"{"address":{"village":"San Roque","state":"Rizal","country":"Philippines"}}"#,
        )
        .unwrap();
        assert_eq!(pick_place_name(response.address.as_ref()), "San Roque");

        let response: ReverseGeocodeResponse = serde_json::from_str(
            r#"{"address":{"city":"Manila","town":"Ermita","country":"Philippines"}}"#,
        )
        .unwrap();
        assert_eq!(pick_place_name(response.address.as_ref()), "Manila");
    }

    #[test]
    fn test_place_name_unknown() {
        let response: ReverseGeocodeResponse = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        assert_eq!(pick_place_name(response.address.as_ref()), "Unknown Area");
        assert_eq!(
            pick_place_name(Some(&Address::default())),
            "Unknown Area"
        );
    }

    #[test]
    fn test_forecast_payload_decodes() {
        let response: ForecastResponse = serde_json::from_str(
            r#"{"latitude":14.6,"longitude":120.98,"current_weather":{"temperature":31.2,"windspeed":9.4,"winddirection":80,"weathercode":2,"time":"2025-10-15T06:00"}}"#,
        )
        .unwrap();
        assert_eq!(response.current_weather.temperature, 31.2);
        assert_eq!(response.current_weather.weathercode, 2);
    }

    fn local_fetcher(mode: LocationMode, endpoints: WeatherEndpoints) -> WeatherFetcher {
        WeatherFetcher::new(
            GeoPoint::default(),
            mode,
            ResilientClient::new(RetryPolicy::new(1, Duration::ZERO)),
        )
        .with_endpoints(endpoints)
    }

    const FORECAST: &str = r#"{"current_weather":{"temperature":30.5,"windspeed":12.0,"weathercode":61}}"#;

    #[tokio::test]
    async fn test_denied_location_falls_back_to_default() {
        let (ip_location, ip_hits) = serve(vec![(500, "{}".to_string())]).await;
        let (forecast, _) = serve(vec![(200, FORECAST.to_string())]).await;
        let (reverse_geocode, _) =
            serve(vec![(200, r#"{"address":{"city":"Manila"}}"#.to_string())]).await;

        let fetcher = local_fetcher(
            LocationMode::Current,
            WeatherEndpoints {
                forecast,
                reverse_geocode,
                ip_location,
            },
        );

        match fetcher.fetch().await.unwrap() {
            FeedData::Weather(report) => {
                assert_eq!(report.location_name, "Manila");
                assert_eq!(report.label_note, "(Location denied — showing Manila)");
                assert_eq!(report.location_status, LocationStatus::Off);
                assert_eq!(report.condition, "Slight rain");
            }
            other => panic!("unexpected data: {:?}", other),
        }
        assert_eq!(ip_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_located_report_is_marked_on() {
        let (ip_location, _) = serve(vec![(
            200,
            r#"{"latitude":10.3,"longitude":123.9,"city":"Cebu City"}"#.to_string(),
        )])
        .await;
        let (forecast, _) = serve(vec![(200, FORECAST.to_string())]).await;
        let (reverse_geocode, _) = serve(vec![(503, "{}".to_string())]).await;

        let fetcher = local_fetcher(
            LocationMode::Current,
            WeatherEndpoints {
                forecast,
                reverse_geocode,
                ip_location,
            },
        );

        match fetcher.fetch().await.unwrap() {
            FeedData::Weather(report) => {
                assert_eq!(report.location_name, "Unknown Area");
                assert_eq!(report.label_note, "(Current location)");
                assert_eq!(report.location_status, LocationStatus::On);
            }
            other => panic!("unexpected data: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forecast_failure_is_an_error() {
        let (forecast, _) = serve(vec![(500, "{}".to_string())]).await;
        let (reverse_geocode, _) = serve(vec![(200, "{}".to_string())]).await;

        let fetcher = local_fetcher(
            LocationMode::Default,
            WeatherEndpoints {
                forecast,
                reverse_geocode,
                ip_location: "http://127.0.0.1:9/".to_string(),
            },
        );

        assert!(fetcher.fetch().await.is_err());
    }
}
