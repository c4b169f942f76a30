use super::fallback::{first_success, Source};
use super::retry::ResilientClient;
use super::{FeedData, FeedFetcher, FetchError, NewsBulletin};
use crate::config::NewsSource;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

pub const ALLORIGINS_PROXY: &str = "https://api.allorigins.win/get?url=";

/// Fetches RSS feeds through a CORS-style JSON proxy, trying each source in
/// order until one yields at least one item.
pub struct NewsFetcher {
    sources: Vec<NewsSource>,
    proxy: String,
    max_items: usize,
    client: ResilientClient,
}

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    contents: Option<String>,
}

impl Source for NewsSource {
    fn name(&self) -> &str {
        &self.name
    }
}

impl NewsFetcher {
    pub fn new(
        sources: Vec<NewsSource>,
        proxy: String,
        max_items: usize,
        client: ResilientClient,
    ) -> Self {
        Self {
            sources,
            proxy,
            max_items,
            client,
        }
    }

    fn proxied_url(&self, feed_url: &str) -> String {
        format!("{}{}", self.proxy, urlencoding::encode(feed_url))
    }

    async fn load_source(&self, source: &NewsSource) -> Result<Vec<String>, FetchError> {
        let response: ProxyResponse = self.client.get_json(&self.proxied_url(&source.url)).await?;
        let contents = response
            .contents
            .ok_or_else(|| FetchError::InvalidPayload("proxy returned no contents".into()))?;
        parse_headlines(&contents, self.max_items)
    }
}

/// Titles of the first `max_items` entries of an RSS/Atom document.
pub fn parse_headlines(xml: &str, max_items: usize) -> Result<Vec<String>, FetchError> {
    let feed = feed_rs::parser::parse(xml.as_bytes())
        .map_err(|e| FetchError::InvalidPayload(format!("unparseable feed: {}", e)))?;

    let headlines: Vec<String> = feed
        .entries
        .into_iter()
        .take(max_items)
        .map(|entry| {
            entry
                .title
                .map(|t| t.content.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string())
        })
        .collect();

    if headlines.is_empty() {
        return Err(FetchError::EmptyPayload);
    }

    Ok(headlines)
}

/// `News#1 : first • News#2 : second........`
pub fn format_ticker(headlines: &[String]) -> String {
    let joined = headlines
        .iter()
        .enumerate()
        .map(|(i, title)| format!("News#{} : {}", i + 1, title))
        .collect::<Vec<_>>()
        .join(" • ");
    format!("{}........", joined)
}

#[async_trait]
impl FeedFetcher for NewsFetcher {
    async fn fetch(&self) -> Result<FeedData> {
        let (source, headlines) =
            first_success(&self.sources, |source| self.load_source(source)).await?;

        Ok(FeedData::News(NewsBulletin {
            source: source.name.clone(),
            home: source.home.clone(),
            headlines,
        }))
    }
}
