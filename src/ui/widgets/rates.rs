use crate::config::RatesConfig;
use crate::feeds::rates::RatesFetcher;
use crate::feeds::retry::ResilientClient;
use crate::feeds::{CurrencyRate, FeedData, FeedFetcher};
use crate::format::{format_number, PESO};
use crate::theme::Palette;
use crate::ui::widgets::{refresh_every, widget_block, FeedWidget};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState},
    Frame,
};
use std::time::Duration;

/// Currency conversion table. Serves both the currency box and the forex table.
pub struct RatesWidget {
    id: String,
    config: RatesConfig,
    rates: Vec<CurrencyRate>,
    loading: bool,
    error: Option<String>,
    scroll_state: ListState,
}

impl RatesWidget {
    /// `key` is the config section the widget was built from.
    pub fn new(key: &str, config: RatesConfig) -> Self {
        let mut scroll_state = ListState::default();
        scroll_state.select(Some(0));

        Self {
            id: format!("rates-{}", key),
            config,
            rates: Vec::new(),
            loading: true,
            error: None,
            scroll_state,
        }
    }

    fn value_text(&self, rate: &CurrencyRate) -> String {
        let symbol = if self.config.quote.eq_ignore_ascii_case("PHP") {
            PESO
        } else {
            ""
        };
        format!(
            "{}{}",
            symbol,
            format_number(rate.value, self.config.decimals, self.config.decimals)
        )
    }

    /// `US Dollar (USD)`, or just the code when no separate label is configured.
    fn name_text(rate: &CurrencyRate) -> String {
        if rate.label == rate.code {
            rate.code.clone()
        } else {
            format!("{} ({})", rate.label, rate.code)
        }
    }

    pub fn rows(&self) -> Vec<(String, String)> {
        self.rates
            .iter()
            .map(|rate| (Self::name_text(rate), self.value_text(rate)))
            .collect()
    }
}

impl FeedWidget for RatesWidget {
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

        if self.loading {
            let loading_text = List::new(vec![ListItem::new("Loading...")])
                .block(block)
                .style(text_style);
            frame.render_widget(loading_text, area);
            return;
        }

        if self.error.is_some() || self.rates.is_empty() {
            let error_text = List::new(vec![ListItem::new(
                self.config.unavailable_message.as_str(),
            )])
            .block(block)
            .style(text_style);
            frame.render_widget(error_text, area);
            return;
        }

        let items: Vec<ListItem> = self
            .rows()
            .into_iter()
            .map(|(name, value)| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{}: ", name),
                        Style::default()
                            .fg(palette.primary)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(value, text_style),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(palette.secondary));

        let mut state = self.scroll_state.clone();
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn update_data(&mut self, data: FeedData) {
        self.loading = false;
        match data {
            FeedData::Rates(rates) => {
                self.rates = rates;
                self.error = None;
            }
            FeedData::Error(e) => {
                self.rates.clear();
                self.error = Some(e);
            }
            FeedData::Loading => {
                self.loading = true;
            }
            _ => {}
        }
    }

    fn create_fetcher(&self, client: &ResilientClient) -> Option<Box<dyn FeedFetcher>> {
        Some(Box::new(RatesFetcher::new(
            self.config.base.clone(),
            self.config.quote.clone(),
            self.config.currencies.clone(),
            client.clone(),
        )))
    }

    fn refresh_interval(&self) -> Option<Duration> {
        refresh_every(self.config.refresh_secs)
    }

    fn scroll_up(&mut self) {
        if let Some(selected) = self.scroll_state.selected() {
            if selected > 0 {
                self.scroll_state.select(Some(selected - 1));
            }
        }
    }

    fn scroll_down(&mut self) {
        if let Some(selected) = self.scroll_state.selected() {
            if selected < self.rates.len().saturating_sub(1) {
                self.scroll_state.select(Some(selected + 1));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::widgets::test_support::{contains, render_to_lines};

    fn rate(code: &str, label: &str, value: f64) -> CurrencyRate {
        CurrencyRate {
            code: code.to_string(),
            label: label.to_string(),
            value,
        }
    }

    #[test]
    fn test_currency_rows() {
        let mut widget = RatesWidget::new("currency", RatesConfig::default());
        widget.update_data(FeedData::Rates(vec![
            rate("USD", "US Dollar", 56.0),
            rate("JPY", "Japanese Yen", 0.3712),
        ]));

        assert_eq!(
            widget.rows(),
            vec![
                ("US Dollar (USD)".to_string(), "₱56.00".to_string()),
                ("Japanese Yen (JPY)".to_string(), "₱0.37".to_string()),
            ]
        );
    }

    #[test]
    fn test_forex_rows_use_four_decimals() {
        let mut widget = RatesWidget::new("forex", RatesConfig::forex());
        widget.update_data(FeedData::Rates(vec![rate("EUR", "EUR", 1234.5)]));
        assert_eq!(
            widget.rows(),
            vec![("EUR".to_string(), "₱1,234.5000".to_string())]
        );
    }

    #[test]
    fn test_unavailable_after_error_and_loading_on_refresh() {
        let mut widget = RatesWidget::new("currency", RatesConfig::default());
        assert!(contains(&render_to_lines(&widget, 40, 6), "Loading..."));

        widget.update_data(FeedData::Error("HTTP 502".to_string()));
        assert!(contains(
            &render_to_lines(&widget, 40, 6),
            "Currency data unavailable."
        ));

        widget.update_data(FeedData::Loading);
        assert!(contains(&render_to_lines(&widget, 40, 6), "Loading..."));
    }

    #[test]
    fn test_scroll_stays_in_bounds() {
        let mut widget = RatesWidget::new("currency", RatesConfig::default());
        widget.update_data(FeedData::Rates(vec![rate("USD", "US Dollar", 56.0)]));
        widget.scroll_down();
        widget.scroll_up();
        widget.scroll_up();
        assert_eq!(widget.scroll_state.selected(), Some(0));
    }
}
