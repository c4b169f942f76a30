pub mod clock;
pub mod crypto;
pub mod news;
pub mod rates;
pub mod weather;

use crate::feeds::retry::ResilientClient;
use crate::feeds::{FeedData, FeedFetcher};
use crate::theme::Palette;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders},
    Frame,
};
use std::any::Any;
use std::time::Duration;

pub trait FeedWidget: Send {
    fn id(&self) -> String;
    fn title(&self) -> &str;
    fn position(&self) -> (usize, usize);
    fn page(&self) -> usize;
    fn render(&self, frame: &mut Frame, area: Rect, selected: bool, palette: &Palette);
    fn update_data(&mut self, data: FeedData);

    /// `None` for widgets that never touch the network.
    fn create_fetcher(&self, client: &ResilientClient) -> Option<Box<dyn FeedFetcher>>;

    /// How often the app refetches; `None` means only on startup and on demand.
    fn refresh_interval(&self) -> Option<Duration>;

    /// Called on every UI tick with the time since the previous one.
    fn tick(&mut self, _elapsed: Duration) {}

    /// Enter on the selected widget.
    fn activate(&mut self) {}

    fn scroll_up(&mut self) {}
    fn scroll_down(&mut self) {}

    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    /// Page the `o` key opens in the browser.
    fn link_url(&self) -> Option<String> {
        None
    }
}

pub(crate) fn widget_block<'a>(title: String, selected: bool, palette: &Palette) -> Block<'a> {
    let border_style = if selected {
        Style::default()
            .fg(palette.primary)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.secondary)
    };

    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
        .style(Style::default().bg(palette.panel).fg(palette.text))
}

pub(crate) fn refresh_every(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
