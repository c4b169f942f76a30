use crate::config::NewsConfig;
use crate::feeds::news::{format_ticker, NewsFetcher};
use crate::feeds::retry::ResilientClient;
use crate::feeds::{FeedData, FeedFetcher, NewsBulletin};
use crate::theme::Palette;
use crate::ui::widgets::{refresh_every, widget_block, FeedWidget};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::any::Any;
use std::cell::Cell;
use std::time::Duration;

/// How long the ticker rests at the end before snapping back.
const END_PAUSE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq)]
enum MarqueePhase {
    Idle,
    Scrolling,
    Holding(Duration),
}

/// Horizontal scroll state for a one-line ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct Marquee {
    offset: f64,
    distance: u16,
    phase: MarqueePhase,
}

impl Default for Marquee {
    fn default() -> Self {
        Self {
            offset: 0.0,
            distance: 0,
            phase: MarqueePhase::Idle,
        }
    }
}

impl Marquee {
    /// Start scrolling; does nothing when the text already fits or a scroll is running.
    pub fn start(&mut self, text_width: u16, viewport_width: u16) -> bool {
        if self.is_active() || text_width <= viewport_width {
            return false;
        }
        self.distance = text_width - viewport_width;
        self.offset = 0.0;
        self.phase = MarqueePhase::Scrolling;
        true
    }

    /// Advance by `elapsed` at `speed` columns per second.
    pub fn advance(&mut self, elapsed: Duration, speed: u16) {
        match self.phase {
            MarqueePhase::Idle => {}
            MarqueePhase::Scrolling => {
                self.offset += elapsed.as_secs_f64() * f64::from(speed);
                if self.offset >= f64::from(self.distance) {
                    self.offset = f64::from(self.distance);
                    self.phase = MarqueePhase::Holding(END_PAUSE);
                }
            }
            MarqueePhase::Holding(remaining) => {
                if elapsed >= remaining {
                    self.reset();
                } else {
                    self.phase = MarqueePhase::Holding(remaining - elapsed);
                }
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn offset(&self) -> u16 {
        self.offset.floor() as u16
    }

    pub fn is_active(&self) -> bool {
        self.phase != MarqueePhase::Idle
    }
}

pub struct NewsWidget {
    id: String,
    config: NewsConfig,
    bulletin: Option<NewsBulletin>,
    ticker_text: String,
    loading: bool,
    error: Option<String>,
    marquee: Marquee,
    /// Width of the ticker line at the last render
    viewport: Cell<u16>,
}

impl NewsWidget {
    /// `key` is the config section the widget was built from.
    pub fn new(key: &str, config: NewsConfig) -> Self {
        Self {
            id: format!("news-{}", key),
            config,
            bulletin: None,
            ticker_text: String::new(),
            loading: true,
            error: None,
            marquee: Marquee::default(),
            viewport: Cell::new(0),
        }
    }

    /// Ticker line as currently displayed (placeholder, headlines or failure text).
    pub fn ticker_text(&self) -> &str {
        if self.loading {
            &self.config.loading_message
        } else if self.bulletin.is_some() {
            &self.ticker_text
        } else {
            &self.config.unavailable_message
        }
    }

    pub fn note(&self) -> String {
        match &self.bulletin {
            Some(bulletin) if !self.loading => {
                format!("Powered by {} • via AllOrigins", bulletin.source)
            }
            _ => self.config.fallback_note.clone(),
        }
    }

    pub fn marquee(&self) -> &Marquee {
        &self.marquee
    }
}

impl FeedWidget for NewsWidget {
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
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        self.viewport.set(chunks[0].width);

        let ticker = Paragraph::new(Line::from(Span::styled(
            self.ticker_text().to_string(),
            Style::default().fg(palette.text),
        )))
        .scroll((0, self.marquee.offset()));
        frame.render_widget(ticker, chunks[0]);

        let note = Paragraph::new(Span::styled(
            self.note(),
            Style::default()
                .fg(palette.secondary)
                .add_modifier(Modifier::ITALIC),
        ));
        frame.render_widget(note, chunks[2]);

        // The read indicator takes the secondary color while a scroll runs
        let indicator_style = if self.marquee.is_active() {
            Style::default().fg(palette.secondary)
        } else {
            Style::default().fg(palette.primary)
        };
        let help = Paragraph::new(Line::from(vec![
            Span::styled("▶ Enter: read", indicator_style),
            Span::styled(
                " | r: refresh | o: open source",
                Style::default().fg(palette.secondary),
            ),
        ]));
        frame.render_widget(help, chunks[3]);
    }

    fn update_data(&mut self, data: FeedData) {
        self.loading = false;
        self.marquee.reset();
        match data {
            FeedData::News(bulletin) => {
                self.ticker_text = format_ticker(&bulletin.headlines);
                self.bulletin = Some(bulletin);
                self.error = None;
            }
            FeedData::Error(e) => {
                self.bulletin = None;
                self.error = Some(e);
            }
            FeedData::Loading => {
                self.loading = true;
            }
            _ => {}
        }
    }

    fn create_fetcher(&self, client: &ResilientClient) -> Option<Box<dyn FeedFetcher>> {
        Some(Box::new(NewsFetcher::new(
            self.config.sources.clone(),
            self.config.proxy.clone(),
            self.config.max_items,
            client.clone(),
        )))
    }

    fn refresh_interval(&self) -> Option<Duration> {
        refresh_every(self.config.refresh_secs)
    }

    fn tick(&mut self, elapsed: Duration) {
        self.marquee.advance(elapsed, self.config.scroll_speed);
    }

    fn activate(&mut self) {
        let text_width = Line::from(self.ticker_text()).width() as u16;
        self.marquee.start(text_width, self.viewport.get());
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }

    fn link_url(&self) -> Option<String> {
        if self.loading {
            return None;
        }
        self.bulletin.as_ref().map(|b| b.home.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::widgets::test_support::{contains, render_to_lines};

    fn bulletin(source: &str, headlines: &[&str]) -> NewsBulletin {
        NewsBulletin {
            source: source.to_string(),
            home: format!("https://{}.example", source.to_lowercase()),
            headlines: headlines.iter().map(|h| h.to_string()).collect(),
        }
    }

    #[test]
    fn test_marquee_ignores_text_that_fits() {
        let mut marquee = Marquee::default();
        assert!(!marquee.start(20, 20));
        assert!(!marquee.is_active());
    }

    #[test]
    fn test_marquee_scrolls_holds_and_resets() {
        let mut marquee = Marquee::default();
        assert!(marquee.start(50, 30));
        assert!(!marquee.start(50, 30));

        marquee.advance(Duration::from_secs(1), 10);
        assert_eq!(marquee.offset(), 10);

        marquee.advance(Duration::from_secs(5), 10);
        assert_eq!(marquee.offset(), 20);
        assert!(marquee.is_active());

        marquee.advance(Duration::from_secs(2), 10);
        assert_eq!(marquee.offset(), 20);

        marquee.advance(Duration::from_millis(1500), 10);
        assert_eq!(marquee.offset(), 0);
        assert!(!marquee.is_active());
    }

    #[test]
    fn test_loading_success_and_note() {
        let mut widget = NewsWidget::new("local_news", NewsConfig::default());
        assert_eq!(widget.ticker_text(), "Fetching local news...");
        assert_eq!(widget.link_url(), None);

        widget.update_data(FeedData::News(bulletin("Inquirer.net", &["One", "Two"])));
        assert_eq!(widget.ticker_text(), "News#1 : One • News#2 : Two........");
        assert_eq!(widget.note(), "Powered by Inquirer.net • via AllOrigins");
        assert_eq!(
            widget.link_url(),
            Some("https://inquirer.net.example".to_string())
        );
    }

    #[test]
    fn test_total_failure_shows_unavailable_and_drops_link() {
        let mut widget = NewsWidget::new("local_news", NewsConfig::default());
        widget.update_data(FeedData::News(bulletin("Philstar", &["One"])));
        widget.update_data(FeedData::Error("all sources failed".to_string()));

        assert_eq!(
            widget.ticker_text(),
            "Local news unavailable. Please try again later."
        );
        assert_eq!(widget.note(), "Powered by PH News RSS • via AllOrigins");
        assert_eq!(widget.link_url(), None);

        let lines = render_to_lines(&widget, 60, 7);
        assert!(contains(&lines, "Local news unavailable."));
    }

    #[test]
    fn test_activate_scrolls_only_after_render_measures_width() {
        let mut widget = NewsWidget::new("world_news", NewsConfig::world());
        widget.update_data(FeedData::News(bulletin(
            "BBC News",
            &["A very long headline that certainly overflows a narrow box"],
        )));

        render_to_lines(&widget, 30, 7);
        widget.activate();
        assert!(widget.marquee().is_active());

        widget.tick(Duration::from_secs(1));
        assert_eq!(widget.marquee().offset(), 10);

        widget.update_data(FeedData::Loading);
        assert!(!widget.marquee().is_active());
    }
}
