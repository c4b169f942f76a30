use crate::config::CryptoConfig;
use crate::feeds::crypto::CryptoFetcher;
use crate::feeds::retry::ResilientClient;
use crate::feeds::{CoinPrice, FeedData, FeedFetcher};
use crate::format::{format_change, format_peso};
use crate::theme::Palette;
use crate::ui::widgets::{refresh_every, widget_block, FeedWidget};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Cell, Paragraph, Row, Table},
    Frame,
};
use std::time::Duration;

pub struct CryptoWidget {
    id: String,
    config: CryptoConfig,
    coins: Vec<CoinPrice>,
    loading: bool,
    error: Option<String>,
}

impl CryptoWidget {
    /// `key` is the config section the widget was built from.
    pub fn new(key: &str, config: CryptoConfig) -> Self {
        Self {
            id: format!("crypto-{}", key),
            config,
            coins: Vec::new(),
            loading: true,
            error: None,
        }
    }

    /// `(symbol, price, 24h change)` in display order.
    pub fn rows(&self) -> Vec<(String, String, String)> {
        self.coins
            .iter()
            .map(|coin| {
                (
                    coin.symbol.clone(),
                    format_peso(coin.price, self.config.decimals),
                    format_change(coin.change_24h),
                )
            })
            .collect()
    }
}

fn change_color(change: Option<f64>) -> Color {
    match change {
        Some(v) if v >= 0.0 => Color::Green,
        Some(_) => Color::Red,
        None => Color::DarkGray,
    }
}

impl FeedWidget for CryptoWidget {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn title(&self) -> &str {
        &self.config.title
    }

    fn position(&self) -> (usize, usize) {
        (self.config.position.row, self.config.position.col)
    }

    fn page(&self) -> usize {
        self.config.page
    }

    fn render(&self, frame: &mut Frame, area: Rect, selected: bool, palette: &Palette) {
        let block = widget_block(format!(" {} ", self.config.title), selected, palette);
        let text_style = Style::default().fg(palette.text);

        let placeholder = if self.loading {
            Some("Loading...")
        } else if self.error.is_some() || self.coins.is_empty() {
            Some(self.config.unavailable_message.as_str())
        } else {
            None
        };

        if let Some(message) = placeholder {
            let paragraph = Paragraph::new(Span::styled(message, text_style)).block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let header = Row::new(vec!["Coin", "Price", "24h"]).style(
            Style::default()
                .fg(palette.primary)
                .add_modifier(Modifier::BOLD),
        );

        let rows: Vec<Row> = self
            .coins
            .iter()
            .zip(self.rows())
            .map(|(coin, (symbol, price, change))| {
                Row::new(vec![
                    Cell::from(symbol).style(text_style.add_modifier(Modifier::BOLD)),
                    Cell::from(price).style(text_style),
                    Cell::from(change).style(Style::default().fg(change_color(coin.change_24h))),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Min(16),
                Constraint::Length(9),
            ],
        )
        .header(header)
        .block(block);

        frame.render_widget(table, area);
    }

    fn update_data(&mut self, data: FeedData) {
        self.loading = false;
        match data {
            FeedData::Crypto(coins) => {
                self.coins = coins;
                self.error = None;
            }
            FeedData::Error(e) => {
                self.coins.clear();
                self.error = Some(e);
            }
            FeedData::Loading => {
                self.loading = true;
            }
            _ => {}
        }
    }

    fn create_fetcher(&self, client: &ResilientClient) -> Option<Box<dyn FeedFetcher>> {
        Some(Box::new(CryptoFetcher::new(
            self.config.coins.clone(),
            self.config.vs_currency.clone(),
            self.config.api,
            client.clone(),
        )))
    }

    fn refresh_interval(&self) -> Option<Duration> {
        refresh_every(self.config.refresh_secs)
    }
}
