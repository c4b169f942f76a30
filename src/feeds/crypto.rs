use super::retry::ResilientClient;
use super::{CoinPrice, FeedData, FeedFetcher, FetchError};
use crate::config::{CoinEntry, CryptoApi};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

pub struct CryptoFetcher {
    coins: Vec<CoinEntry>,
    vs_currency: String,
    api: CryptoApi,
    api_base: String,
    client: ResilientClient,
}

/// One coin in the `simple/price` response, e.g. `{"php": 5.1e6, "php_24h_change": -1.2}`.
pub type SimplePriceResponse = HashMap<String, HashMap<String, Option<f64>>>;

/// One row of the `coins/markets` response.
#[derive(Debug, Deserialize)]
pub struct MarketCoin {
    pub id: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
}

impl CryptoFetcher {
    pub fn new(
        coins: Vec<CoinEntry>,
        vs_currency: String,
        api: CryptoApi,
        client: ResilientClient,
    ) -> Self {
        Self {
            coins,
            vs_currency,
            api,
            api_base: COINGECKO_API_BASE.to_string(),
            client,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn url(&self) -> String {
        let ids: Vec<&str> = self.coins.iter().map(|c| c.id.as_str()).collect();
        let ids = urlencoding::encode(&ids.join(",")).into_owned();
        let base = self.api_base.trim_end_matches('/');

        match self.api {
            CryptoApi::SimplePrice => format!(
                "{}/simple/price?ids={}&vs_currencies={}&include_24hr_change=true",
                base, ids, self.vs_currency
            ),
            CryptoApi::Markets => format!(
                "{}/coins/markets?vs_currency={}&ids={}&order=market_cap_desc&per_page=100&page=1&sparkline=false&price_change_percentage=24h",
                base, self.vs_currency, ids
            ),
        }
    }
}

fn sort_descending(prices: &mut [CoinPrice]) {
    prices.sort_by(|a, b| b.price.total_cmp(&a.price));
}

/// Pair configured coins with their prices, most expensive first.
///
/// A coin absent from the payload is priced at 0. The sort is stable, so
/// equal prices keep their configured order.
pub fn rank_prices(
    coins: &[CoinEntry],
    payload: &SimplePriceResponse,
    vs_currency: &str,
) -> Vec<CoinPrice> {
    let change_key = format!("{}_24h_change", vs_currency);

    let mut priced: Vec<CoinPrice> = coins
        .iter()
        .map(|coin| {
            let quote = payload.get(&coin.id);
            CoinPrice {
                id: coin.id.clone(),
                symbol: coin.symbol.clone(),
                price: quote
                    .and_then(|q| q.get(vs_currency).copied().flatten())
                    .unwrap_or(0.0),
                change_24h: quote.and_then(|q| q.get(&change_key).copied().flatten()),
            }
        })
        .collect();

    sort_descending(&mut priced);
    priced
}

/// Market rows labelled by their upper-cased coin name, most expensive first.
pub fn rank_markets(rows: Vec<MarketCoin>) -> Result<Vec<CoinPrice>, FetchError> {
    if rows.is_empty() {
        return Err(FetchError::EmptyPayload);
    }

    let mut priced: Vec<CoinPrice> = rows
        .into_iter()
        .map(|row| CoinPrice {
            id: row.id,
            symbol: row.name.to_uppercase(),
            price: row.current_price.unwrap_or(0.0),
            change_24h: row.price_change_percentage_24h,
        })
        .collect();

    sort_descending(&mut priced);
    Ok(priced)
}

#[async_trait]
impl FeedFetcher for CryptoFetcher {
    async fn fetch(&self) -> Result<FeedData> {
        let prices = match self.api {
            CryptoApi::SimplePrice => {
                let payload: SimplePriceResponse = self.client.get_json(&self.url()).await?;
                rank_prices(&self.coins, &payload, &self.vs_currency)
            }
            CryptoApi::Markets => {
                let rows: Vec<MarketCoin> = self.client.get_json(&self.url()).await?;
                rank_markets(rows)?
            }
        };
        tracing::debug!("Loaded {} coin prices", prices.len());

        Ok(FeedData::Crypto(prices))
    }
}
