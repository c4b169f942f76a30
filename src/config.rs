use crate::feeds::news::ALLORIGINS_PROXY;
use crate::feeds::retry::RetryPolicy;
use anyhow::{Context, Result};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pages: Vec<String>,
    pub general: GeneralConfig,
    pub theme: ThemeConfig,
    pub retry: RetryConfig,
    pub weather: WeatherConfig,
    pub world_clock: WorldClockConfig,
    pub currency: RatesConfig,
    #[serde(deserialize_with = "forex_section")]
    pub forex: RatesConfig,
    pub crypto: CryptoConfig,
    #[serde(deserialize_with = "markets_section")]
    pub markets: CryptoConfig,
    pub local_news: NewsConfig,
    #[serde(deserialize_with = "world_news_section")]
    pub world_news: NewsConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// UI redraw and animation tick
    pub tick_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Five whitespace-separated colors used in dark mode:
    /// background, text, primary, secondary, panel background
    pub dark_colors: String,
    /// Where the dark-mode flag is stored; defaults to the config dir
    pub preference_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub enabled: bool,
    pub title: String,
    pub position: Position,
    pub page: usize,
    pub refresh_secs: u64,
    pub default_location: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityZone {
    pub name: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldClockConfig {
    pub enabled: bool,
    pub title: String,
    pub position: Position,
    pub page: usize,
    pub cities: Vec<CityZone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyEntry {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    pub enabled: bool,
    pub title: String,
    pub position: Position,
    pub page: usize,
    pub refresh_secs: u64,
    /// Currency the API quotes its rates against
    pub base: String,
    /// Currency the displayed values are expressed in
    pub quote: String,
    pub currencies: Vec<CurrencyEntry>,
    pub decimals: usize,
    pub unavailable_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinEntry {
    pub id: String,
    pub symbol: String,
}

/// Which CoinGecko endpoint a crypto widget reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoApi {
    /// `simple/price`: labels come from the configured symbols
    SimplePrice,
    /// `coins/markets`: labels are the coin names from the response
    Markets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    pub enabled: bool,
    pub title: String,
    pub position: Position,
    pub page: usize,
    pub refresh_secs: u64,
    pub api: CryptoApi,
    pub vs_currency: String,
    pub coins: Vec<CoinEntry>,
    pub decimals: usize,
    pub unavailable_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSource {
    pub name: String,
    pub url: String,
    pub home: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub enabled: bool,
    pub title: String,
    pub position: Position,
    pub page: usize,
    pub refresh_secs: u64,
    /// Tried in order; the first feed with items wins
    pub sources: Vec<NewsSource>,
    pub proxy: String,
    pub max_items: usize,
    pub loading_message: String,
    pub unavailable_message: String,
    pub fallback_note: String,
    /// Marquee speed in columns per second
    pub scroll_speed: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pages: vec![
                "Dashboard".to_string(),
                "Markets".to_string(),
                "News".to_string(),
            ],
            general: GeneralConfig::default(),
            theme: ThemeConfig::default(),
            retry: RetryConfig::default(),
            weather: WeatherConfig::default(),
            world_clock: WorldClockConfig::default(),
            currency: RatesConfig::default(),
            forex: RatesConfig::forex(),
            crypto: CryptoConfig::default(),
            markets: CryptoConfig::markets(),
            local_news: NewsConfig::default(),
            world_news: NewsConfig::world(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { tick_ms: 100 }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            dark_colors: "#1A1A1A #F5F5F5 #FFFFFF #3A3F44 #242424".to_string(),
            preference_file: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            delay_ms: policy.delay.as_millis() as u64,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self {
            name: "Manila".to_string(),
            latitude: 14.60,
            longitude: 120.98,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "Weather".to_string(),
            position: Position { row: 0, col: 0 },
            page: 0,
            refresh_secs: 900,
            default_location: GeoPoint::default(),
        }
    }
}

fn city(name: &str, timezone: &str) -> CityZone {
    CityZone {
        name: name.to_string(),
        timezone: timezone.to_string(),
    }
}

impl Default for WorldClockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "World Clock".to_string(),
            position: Position { row: 0, col: 1 },
            page: 0,
            cities: vec![
                city("New York", "America/New_York"),
                city("London", "Europe/London"),
                city("Berlin", "Europe/Berlin"),
                city("Beijing", "Asia/Shanghai"),
                city("Tokyo", "Asia/Tokyo"),
            ],
        }
    }
}

fn currency(code: &str, label: &str) -> CurrencyEntry {
    CurrencyEntry {
        code: code.to_string(),
        label: label.to_string(),
    }
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "Global Currency".to_string(),
            position: Position { row: 1, col: 0 },
            page: 0,
            refresh_secs: 300,
            base: "PHP".to_string(),
            quote: "PHP".to_string(),
            currencies: vec![
                currency("USD", "US Dollar"),
                currency("GBP", "British Pound"),
                currency("EUR", "Euro"),
                currency("CNY", "Chinese Yuan"),
                currency("JPY", "Japanese Yen"),
            ],
            decimals: 2,
            unavailable_message: "Currency data unavailable.".to_string(),
        }
    }
}

impl RatesConfig {
    /// The markets page forex table: USD-quoted rates converted to pesos.
    pub fn forex() -> Self {
        Self {
            title: "Forex (PHP)".to_string(),
            position: Position { row: 0, col: 1 },
            page: 1,
            base: "USD".to_string(),
            currencies: ["USD", "EUR", "CNY", "AUD", "JPY", "CHF", "CAD"]
                .iter()
                .map(|code| currency(code, code))
                .collect(),
            decimals: 4,
            unavailable_message: "Failed to load forex rates. Please try again later.".to_string(),
            ..Self::default()
        }
    }
}

fn coin(id: &str, symbol: &str) -> CoinEntry {
    CoinEntry {
        id: id.to_string(),
        symbol: symbol.to_string(),
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "Crypto Market".to_string(),
            position: Position { row: 1, col: 1 },
            page: 0,
            refresh_secs: 300,
            api: CryptoApi::SimplePrice,
            vs_currency: "php".to_string(),
            coins: vec![
                coin("bitcoin", "BTC"),
                coin("tether-gold", "XAUT"),
                coin("binancecoin", "BNB"),
                coin("ethereum", "ETH"),
                coin("ripple", "XRP"),
            ],
            decimals: 2,
            unavailable_message: "Crypto data unavailable.".to_string(),
        }
    }
}

impl CryptoConfig {
    /// The markets page table, ranked from `coins/markets`.
    pub fn markets() -> Self {
        Self {
            title: "Crypto Prices (PHP)".to_string(),
            position: Position { row: 0, col: 0 },
            page: 1,
            api: CryptoApi::Markets,
            coins: vec![
                coin("bitcoin", "BTC"),
                coin("ethereum", "ETH"),
                coin("tether", "USDT"),
                coin("ripple", "XRP"),
                coin("binancecoin", "BNB"),
                coin("solana", "SOL"),
                coin("dogecoin", "DOGE"),
            ],
            unavailable_message: "Failed to load crypto prices. Please try again later.".to_string(),
            ..Self::default()
        }
    }
}

fn news_source(name: &str, url: &str, home: &str) -> NewsSource {
    NewsSource {
        name: name.to_string(),
        url: url.to_string(),
        home: home.to_string(),
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "Local News".to_string(),
            position: Position { row: 0, col: 0 },
            page: 2,
            refresh_secs: 900,
            sources: vec![
                news_source(
                    "Philstar",
                    "https://www.philstar.com/rss/headlines",
                    "https://www.philstar.com",
                ),
                news_source(
                    "Inquirer.net",
                    "https://www.inquirer.net/fullfeed",
                    "https://www.inquirer.net",
                ),
                news_source(
                    "ABS-CBN",
                    "https://news.abs-cbn.com/rss/latest.xml",
                    "https://news.abs-cbn.com",
                ),
                news_source(
                    "GMA News",
                    "https://www.gmanetwork.com/news/rss/latest/",
                    "https://www.gmanetwork.com/news/",
                ),
            ],
            proxy: ALLORIGINS_PROXY.to_string(),
            max_items: 5,
            loading_message: "Fetching local news...".to_string(),
            unavailable_message: "Local news unavailable. Please try again later.".to_string(),
            fallback_note: "Powered by PH News RSS • via AllOrigins".to_string(),
            scroll_speed: 10,
        }
    }
}

impl NewsConfig {
    pub fn world() -> Self {
        Self {
            title: "World News".to_string(),
            position: Position { row: 1, col: 0 },
            sources: vec![news_source(
                "BBC News",
                "https://feeds.bbci.co.uk/news/world/rss.xml",
                "https://www.bbc.com/news",
            )],
            loading_message: "Fetching world news...".to_string(),
            unavailable_message: "World news unavailable. Please try again later.".to_string(),
            fallback_note: "Powered by BBC News • via AllOrigins".to_string(),
            ..Self::default()
        }
    }
}

/// Deserialize a section as overrides on top of `preset`, so a partial table
/// keeps the preset's values for every key it leaves out.
fn overlay<'de, D, T>(deserializer: D, preset: T) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Serialize + DeserializeOwned,
{
    let overrides = toml::Table::deserialize(deserializer)?;
    let mut merged = match toml::Value::try_from(preset).map_err(D::Error::custom)? {
        toml::Value::Table(table) => table,
        _ => return Err(D::Error::custom("section preset is not a table")),
    };
    merged.extend(overrides);
    toml::Value::Table(merged)
        .try_into()
        .map_err(D::Error::custom)
}

fn forex_section<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<RatesConfig, D::Error> {
    overlay(d, RatesConfig::forex())
}

fn markets_section<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<CryptoConfig, D::Error> {
    overlay(d, CryptoConfig::markets())
}

fn world_news_section<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<NewsConfig, D::Error> {
    overlay(d, NewsConfig::world())
}

impl Config {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("homedash")
            .join("config.toml")
    }

    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            tracing::info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Write the default configuration, refusing to clobber an existing file.
    pub fn write_default(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("{} already exists", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    pub fn page_title(&self, page: usize) -> &str {
        self.pages.get(page).map(String::as_str).unwrap_or("Page")
    }

    pub fn page_count(&self) -> usize {
        self.pages.len().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_widget() {
        let config = Config::default();
        assert_eq!(config.local_news.sources.len(), 4);
        assert_eq!(config.local_news.sources[0].name, "Philstar");
        assert_eq!(config.world_news.sources[0].home, "https://www.bbc.com/news");
        assert_eq!(config.currency.base, "PHP");
        assert_eq!(config.forex.base, "USD");
        assert_eq!(config.forex.decimals, 4);
        assert_eq!(config.crypto.coins.len(), 5);
        assert_eq!(config.retry.policy(), RetryPolicy::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            pages = ["Home"]

            [retry]
            max_attempts = 5

            [weather]
            refresh_secs = 60
            default_location = { name = "Cebu", latitude = 10.3, longitude = 123.9 }
            "#,
        )
        .unwrap();

        assert_eq!(config.pages, vec!["Home"]);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay_ms, 2000);
        assert_eq!(config.weather.refresh_secs, 60);
        assert_eq!(config.weather.default_location.name, "Cebu");
        assert_eq!(config.weather.title, "Weather");
    }

    #[test]
    fn test_partial_preset_sections_keep_their_presets() {
        let config: Config = toml::from_str(
            r#"
            [forex]
            refresh_secs = 60

            [markets]
            decimals = 3

            [world_news]
            max_items = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.forex.refresh_secs, 60);
        assert_eq!(config.forex.title, "Forex (PHP)");
        assert_eq!(config.forex.base, "USD");
        assert_eq!(config.forex.page, 1);

        assert_eq!(config.markets.decimals, 3);
        assert_eq!(config.markets.api, CryptoApi::Markets);
        assert_eq!(config.markets.coins.len(), 7);

        assert_eq!(config.world_news.max_items, 3);
        assert_eq!(config.world_news.title, "World News");
        assert_eq!(config.world_news.sources[0].name, "BBC News");

        // Untouched sections still get their own defaults
        assert_eq!(config.currency.title, "Global Currency");
        assert_eq!(config.crypto.api, CryptoApi::SimplePrice);
    }

    #[test]
    fn test_dashboard_and_markets_crypto_presets() {
        let config = Config::default();
        assert_eq!((config.crypto.page, config.crypto.coins.len()), (0, 5));
        assert_eq!(config.crypto.coins[1].id, "tether-gold");
        assert_eq!((config.markets.page, config.markets.coins.len()), (1, 7));
        assert_eq!(config.markets.coins[6].id, "dogecoin");
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.crypto.coins, Config::default().crypto.coins);
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::write_default(&path).unwrap();
        assert!(Config::load(&path).is_ok());
        assert!(Config::write_default(&path).is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.page_count(), 3);
        assert_eq!(config.page_title(1), "Markets");
        assert_eq!(config.page_title(9), "Page");
    }
}
