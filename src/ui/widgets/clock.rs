use crate::config::{CityZone, WorldClockConfig};
use crate::feeds::retry::ResilientClient;
use crate::feeds::{FeedData, FeedFetcher};
use crate::format::format_12h;
use crate::theme::Palette;
use crate::ui::widgets::{widget_block, FeedWidget};
use jiff::{tz::TimeZone, Timestamp};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::any::Any;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorldClock {
    id: String,
    title: String,
    position: (usize, usize),
    page: usize,
    cities: Vec<(String, TimeZone)>,
}

impl WorldClock {
    pub fn new(config: WorldClockConfig) -> Self {
        let cities = config
            .cities
            .iter()
            .filter_map(|CityZone { name, timezone }| match TimeZone::get(timezone) {
                Ok(tz) => Some((name.clone(), tz)),
                Err(e) => {
                    tracing::warn!("Skipping {}: unknown time zone {}: {}", name, timezone, e);
                    None
                }
            })
            .collect();

        Self {
            id: format!(
                "world-clock-{}-{}",
                config.position.row, config.position.col
            ),
            title: config.title,
            position: (config.position.row, config.position.col),
            page: config.page,
            cities,
        }
    }

    pub fn city_names(&self) -> Vec<&str> {
        self.cities.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// `(city, "h:mm:ss AM")` for every configured zone at `now`.
    pub fn times_at(&self, now: Timestamp) -> Vec<(String, String)> {
        self.cities
            .iter()
            .map(|(name, tz)| {
                let zoned = now.to_zoned(tz.clone());
                let time = format_12h(
                    zoned.hour() as u32,
                    zoned.minute() as u32,
                    zoned.second() as u32,
                );
                (name.clone(), time)
            })
            .collect()
    }
}

impl FeedWidget for WorldClock {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn position(&self) -> (usize, usize) {
        self.position
    }

    fn page(&self) -> usize {
        self.page
    }

    fn render(&self, frame: &mut Frame, area: Rect, selected: bool, palette: &Palette) {
        let block = widget_block(format!(" {} ", self.title), selected, palette);

        // Rendered from the system clock on every frame
        let lines: Vec<Line> = self
            .times_at(Timestamp::now())
            .into_iter()
            .map(|(city, time)| {
                Line::from(vec![
                    Span::styled(
                        format!("{:<10}", format!("{}:", city)),
                        Style::default()
                            .fg(palette.primary)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(time, Style::default().fg(palette.text)),
                ])
            })
            .collect();

        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Left);
        frame.render_widget(paragraph, area);
    }

    fn update_data(&mut self, _data: FeedData) {
        // Clock doesn't need external data updates
    }

    fn create_fetcher(&self, _client: &ResilientClient) -> Option<Box<dyn FeedFetcher>> {
        None
    }

    fn refresh_interval(&self) -> Option<Duration> {
        None
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}
