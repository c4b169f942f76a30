use crate::config::{GeoPoint, WeatherConfig};
use crate::feeds::retry::ResilientClient;
use crate::feeds::weather::{LocationMode, WeatherFetcher};
use crate::feeds::{FeedData, FeedFetcher, WeatherReport};
use crate::theme::Palette;
use crate::ui::widgets::{refresh_every, widget_block, FeedWidget};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};
use std::any::Any;
use std::time::Duration;

const UNAVAILABLE: &str = "Unable to load weather data.";

pub struct WeatherWidget {
    config: WeatherConfig,
    report: Option<WeatherReport>,
    mode: LocationMode,
    loading: bool,
    error: Option<String>,
}

impl WeatherWidget {
    pub fn new(config: WeatherConfig) -> Self {
        Self {
            config,
            report: None,
            mode: LocationMode::Default,
            loading: true,
            error: None,
        }
    }

    /// Switch to the machine's own location for this and later refreshes.
    pub fn use_current_location(&mut self) {
        self.mode = LocationMode::Current;
    }

    pub fn mode(&self) -> LocationMode {
        self.mode
    }

    pub fn default_location(&self) -> &GeoPoint {
        &self.config.default_location
    }

    fn report_lines(report: &WeatherReport) -> Vec<(&'static str, String)> {
        vec![
            (
                "Location",
                format!("{} {}", report.location_name, report.label_note),
            ),
            ("Location Status", report.location_status.to_string()),
            ("Temperature", format!("{}°C", report.temperature_c)),
            ("Wind", format!("{} km/h", report.windspeed_kmh)),
            ("Condition", report.condition.clone()),
        ]
    }
}

impl FeedWidget for WeatherWidget {
    fn id(&self) -> String {
        format!(
            "weather-{}-{}",
            self.config.position.row, self.config.position.col
        )
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

        let mut lines: Vec<Line> = if self.loading {
            vec![Line::from(Span::styled("Fetching weather...", text_style))]
        } else if self.error.is_some() {
            vec![Line::from(Span::styled(UNAVAILABLE, text_style))]
        } else if let Some(report) = &self.report {
            Self::report_lines(report)
                .into_iter()
                .map(|(label, value)| {
                    Line::from(vec![
                        Span::styled(
                            format!("{}: ", label),
                            Style::default()
                                .fg(palette.primary)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(value, text_style),
                    ])
                })
                .collect()
        } else {
            vec![Line::from(Span::styled(UNAVAILABLE, text_style))]
        };

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "l: use my location | r: refresh",
            Style::default().fg(palette.secondary),
        )));

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn update_data(&mut self, data: FeedData) {
        self.loading = false;
        match data {
            FeedData::Weather(report) => {
                self.report = Some(report);
                self.error = None;
            }
            FeedData::Error(e) => {
                self.error = Some(e);
            }
            FeedData::Loading => {
                self.loading = true;
            }
            _ => {}
        }
    }

    fn create_fetcher(&self, client: &ResilientClient) -> Option<Box<dyn FeedFetcher>> {
        Some(Box::new(WeatherFetcher::new(
            self.config.default_location.clone(),
            self.mode,
            client.clone(),
        )))
    }

    fn refresh_interval(&self) -> Option<Duration> {
        refresh_every(self.config.refresh_secs)
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}
