use super::retry::ResilientClient;
use super::{CurrencyRate, FeedData, FeedFetcher, FetchError};
use crate::config::CurrencyEntry;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

pub const EXCHANGE_RATE_API_BASE: &str = "https://open.er-api.com/v6/latest";

/// Exchange rates for a list of currencies, each expressed in `quote` units.
pub struct RatesFetcher {
    base: String,
    quote: String,
    currencies: Vec<CurrencyEntry>,
    api_base: String,
    client: ResilientClient,
}

#[derive(Debug, Deserialize)]
pub struct RatesResponse {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub rates: HashMap<String, f64>,
}

impl RatesFetcher {
    pub fn new(
        base: String,
        quote: String,
        currencies: Vec<CurrencyEntry>,
        client: ResilientClient,
    ) -> Self {
        Self {
            base,
            quote,
            currencies,
            api_base: EXCHANGE_RATE_API_BASE.to_string(),
            client,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn url(&self) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), self.base)
    }
}

/// Price of one unit of each currency in `quote`.
///
/// Rates are quoted against the payload's base currency, so the value is the
/// reciprocal of the currency's rate scaled by the quote's rate. Currencies
/// missing from the payload (or with a zero rate) are skipped.
pub fn convert_rates(
    rates: &HashMap<String, f64>,
    currencies: &[CurrencyEntry],
    quote: &str,
) -> Result<Vec<CurrencyRate>, FetchError> {
    let quote_rate = rates
        .get(quote)
        .copied()
        .filter(|r| r.is_finite() && *r > 0.0)
        .ok_or_else(|| FetchError::InvalidPayload(format!("no {} rate in response", quote)))?;

    Ok(currencies
        .iter()
        .filter_map(|c| {
            let rate = rates.get(&c.code).copied().filter(|r| *r > 0.0)?;
            Some(CurrencyRate {
                code: c.code.clone(),
                label: c.label.clone(),
                value: (1.0 / rate) * quote_rate,
            })
        })
        .collect())
}

#[async_trait]
impl FeedFetcher for RatesFetcher {
    async fn fetch(&self) -> Result<FeedData> {
        let response: RatesResponse = self.client.get_json(&self.url()).await?;

        let failed = response.result.as_deref().is_some_and(|r| r != "success");
        if failed || response.rates.is_empty() {
            return Err(FetchError::InvalidPayload("exchange rate API did not succeed".into()).into());
        }

        let rates = convert_rates(&response.rates, &self.currencies, &self.quote)?;
        tracing::debug!("Loaded {} exchange rates against {}", rates.len(), self.base);

        Ok(FeedData::Rates(rates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::retry::tests::serve;
    use crate::feeds::retry::RetryPolicy;
    use crate::format::format_number;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn local_fetcher(api_base: String) -> RatesFetcher {
        RatesFetcher::new(
            "PHP".to_string(),
            "PHP".to_string(),
            vec![entry("USD", "US Dollar")],
            ResilientClient::new(RetryPolicy::new(1, Duration::ZERO)),
        )
        .with_api_base(api_base)
    }

    fn entry(code: &str, label: &str) -> CurrencyEntry {
        CurrencyEntry {
            code: code.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_usd_in_php_from_usd_based_payload() {
        let response: RatesResponse =
            serde_json::from_str(r#"{"rates":{"PHP":56,"USD":1}}"#).unwrap();
        let rates = convert_rates(&response.rates, &[entry("USD", "US Dollar")], "PHP").unwrap();

        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].code, "USD");
        assert_eq!(format_number(rates[0].value, 2, 2), "56.00");
    }

    #[test]
    fn test_php_based_payload_inverts_rates() {
        let response: RatesResponse = serde_json::from_str(
            r#"{"result":"success","rates":{"PHP":1,"USD":0.02,"JPY":2.5}}"#,
        )
        .unwrap();
        let rates = convert_rates(
            &response.rates,
            &[entry("USD", "US Dollar"), entry("JPY", "Japanese Yen")],
            "PHP",
        )
        .unwrap();

        assert_eq!(format_number(rates[0].value, 2, 2), "50.00");
        assert_eq!(format_number(rates[1].value, 2, 2), "0.40");
    }

    #[test]
    fn test_missing_codes_are_skipped_in_order() {
        let mut map = HashMap::new();
        map.insert("PHP".to_string(), 58.0);
        map.insert("EUR".to_string(), 0.5);
        map.insert("CNY".to_string(), 0.0);

        let rates = convert_rates(
            &map,
            &[entry("GBP", "British Pound"), entry("EUR", "Euro"), entry("CNY", "Yuan")],
            "PHP",
        )
        .unwrap();

        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].label, "Euro");
        assert_eq!(rates[0].value, 116.0);
    }

    #[test]
    fn test_missing_quote_is_invalid() {
        let mut map = HashMap::new();
        map.insert("USD".to_string(), 1.0);
        let err = convert_rates(&map, &[entry("USD", "US Dollar")], "PHP").unwrap_err();
        assert!(matches!(err, FetchError::InvalidPayload(_)));
    }

    #[test]
    fn test_url_uses_base_currency() {
        let fetcher = local_fetcher("http://127.0.0.1:9/".to_string());
        assert_eq!(fetcher.url(), "http://127.0.0.1:9/PHP");
    }

    #[tokio::test]
    async fn test_fetch_converts_successful_payload() {
        let (base, hits) = serve(vec![(
            200,
            r#"{"result":"success","rates":{"PHP":1,"USD":0.0178}}"#.to_string(),
        )])
        .await;

        let data = local_fetcher(base).fetch().await.unwrap();
        match data {
            FeedData::Rates(rates) => {
                assert_eq!(rates[0].code, "USD");
                assert_eq!(format_number(rates[0].value, 2, 2), "56.18");
            }
            other => panic!("unexpected data: {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_rejects_unsuccessful_result() {
        let (base, _hits) = serve(vec![(200, r#"{"result":"error"}"#.to_string())]).await;
        let err = local_fetcher(base).fetch().await.unwrap_err();
        assert!(err.to_string().contains("did not succeed"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_empty_rates() {
        let (base, _hits) =
            serve(vec![(200, r#"{"result":"success","rates":{}}"#.to_string())]).await;
        assert!(local_fetcher(base).fetch().await.is_err());
    }
}
