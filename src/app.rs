use crate::config::Config;
use crate::feeds::retry::ResilientClient;
use crate::feeds::{FeedData, FeedMessage};
use crate::theme::Theme;
use crate::ui;
use crate::ui::widgets::{
    clock::WorldClock, crypto::CryptoWidget, news::NewsWidget, rates::RatesWidget,
    weather::WeatherWidget, FeedWidget,
};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{backend::Backend, Terminal};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

pub struct App {
    config: Config,
    widgets: Vec<Box<dyn FeedWidget>>,
    selected: usize,
    page: usize,
    theme: Theme,
    client: ResilientClient,
    tx: mpsc::UnboundedSender<FeedMessage>,
    rx: mpsc::UnboundedReceiver<FeedMessage>,
    next_refresh: HashMap<String, Instant>,
    status: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, theme: Theme) -> Self {
        let widgets = Self::build_widgets(&config);
        let client = ResilientClient::new(config.retry.policy());
        let (tx, rx) = mpsc::unbounded_channel();

        let mut app = Self {
            config,
            widgets,
            selected: 0,
            page: 0,
            theme,
            client,
            tx,
            rx,
            next_refresh: HashMap::new(),
            status: None,
            should_quit: false,
        };
        app.select_first_on_page();
        app
    }

    pub fn build_widgets(config: &Config) -> Vec<Box<dyn FeedWidget>> {
        let mut widgets: Vec<Box<dyn FeedWidget>> = Vec::new();

        if config.weather.enabled {
            widgets.push(Box::new(WeatherWidget::new(config.weather.clone())));
        }
        if config.world_clock.enabled {
            widgets.push(Box::new(WorldClock::new(config.world_clock.clone())));
        }
        if config.currency.enabled {
            widgets.push(Box::new(RatesWidget::new("currency", config.currency.clone())));
        }
        if config.crypto.enabled {
            widgets.push(Box::new(CryptoWidget::new("crypto", config.crypto.clone())));
        }
        if config.markets.enabled {
            widgets.push(Box::new(CryptoWidget::new("markets", config.markets.clone())));
        }
        if config.forex.enabled {
            widgets.push(Box::new(RatesWidget::new("forex", config.forex.clone())));
        }
        if config.local_news.enabled {
            widgets.push(Box::new(NewsWidget::new("local_news", config.local_news.clone())));
        }
        if config.world_news.enabled {
            widgets.push(Box::new(NewsWidget::new("world_news", config.world_news.clone())));
        }

        widgets
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn widgets(&self) -> &[Box<dyn FeedWidget>] {
        &self.widgets
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Indices of the widgets shown on the current page, in row/col order.
    pub fn visible_widgets(&self) -> Vec<usize> {
        let mut visible: Vec<usize> = self
            .widgets
            .iter()
            .enumerate()
            .filter(|(_, w)| w.page() == self.page)
            .map(|(i, _)| i)
            .collect();
        visible.sort_by_key(|&i| self.widgets[i].position());
        visible
    }

    fn select_first_on_page(&mut self) {
        if let Some(&first) = self.visible_widgets().first() {
            self.selected = first;
        }
    }

    pub fn goto_page(&mut self, page: usize) {
        if page < self.config.page_count() && page != self.page {
            self.page = page;
            self.select_first_on_page();
        }
    }

    pub fn next_page(&mut self) {
        let count = self.config.page_count();
        self.goto_page((self.page + 1) % count);
    }

    pub fn prev_page(&mut self) {
        let count = self.config.page_count();
        self.goto_page((self.page + count - 1) % count);
    }

    pub fn select_next(&mut self) {
        let visible = self.visible_widgets();
        if visible.is_empty() {
            return;
        }
        let pos = visible.iter().position(|&i| i == self.selected);
        let next = match pos {
            Some(p) => visible[(p + 1) % visible.len()],
            None => visible[0],
        };
        self.selected = next;
    }

    pub fn select_prev(&mut self) {
        let visible = self.visible_widgets();
        if visible.is_empty() {
            return;
        }
        let pos = visible.iter().position(|&i| i == self.selected);
        let prev = match pos {
            Some(p) => visible[(p + visible.len() - 1) % visible.len()],
            None => visible[0],
        };
        self.selected = prev;
    }

    fn selected_widget_mut(&mut self) -> Option<&mut Box<dyn FeedWidget>> {
        if self.visible_widgets().contains(&self.selected) {
            self.widgets.get_mut(self.selected)
        } else {
            None
        }
    }

    /// Show the loading placeholder and start a fetch for one widget.
    ///
    /// An in-flight fetch for the same widget is not cancelled; whichever
    /// finishes last wins.
    pub fn refresh_widget(&mut self, index: usize) {
        let Some(widget) = self.widgets.get_mut(index) else {
            return;
        };
        let Some(fetcher) = widget.create_fetcher(&self.client) else {
            return;
        };

        let widget_id = widget.id();
        widget.update_data(FeedData::Loading);

        if let Some(interval) = widget.refresh_interval() {
            self.next_refresh
                .insert(widget_id.clone(), Instant::now() + interval);
        }

        let tx = self.tx.clone();
        tokio::spawn(async move {
            let data = match fetcher.fetch().await {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!("Fetch failed for {}: {:#}", widget_id, e);
                    FeedData::Error(e.to_string())
                }
            };
            let _ = tx.send(FeedMessage { widget_id, data });
        });
    }

    pub fn refresh_all(&mut self) {
        for index in 0..self.widgets.len() {
            self.refresh_widget(index);
        }
    }

    /// Widgets whose refresh interval has elapsed at `now`.
    pub fn due_widgets(&self, now: Instant) -> Vec<usize> {
        self.widgets
            .iter()
            .enumerate()
            .filter(|(_, w)| w.refresh_interval().is_some())
            .filter(|(_, w)| {
                self.next_refresh
                    .get(&w.id())
                    .is_some_and(|due| *due <= now)
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn handle_message(&mut self, message: FeedMessage) {
        match self
            .widgets
            .iter_mut()
            .find(|w| w.id() == message.widget_id)
        {
            Some(widget) => widget.update_data(message.data),
            None => tracing::debug!("Dropping data for unknown widget {}", message.widget_id),
        }
    }

    fn drain_messages(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            self.handle_message(message);
        }
    }

    pub fn tick(&mut self, elapsed: Duration) {
        for widget in &mut self.widgets {
            widget.tick(elapsed);
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme.toggle();
        tracing::info!(
            "Switched to {} mode",
            if self.theme.is_dark() { "dark" } else { "light" }
        );
    }

    fn locate(&mut self) {
        let index = self.selected;
        let Some(widget) = self.selected_widget_mut() else {
            return;
        };
        match widget
            .as_any_mut()
            .and_then(|any| any.downcast_mut::<WeatherWidget>())
        {
            Some(weather) => {
                weather.use_current_location();
                self.refresh_widget(index);
            }
            None => self.status = Some("Location lookup is only available on the weather widget".to_string()),
        }
    }

    fn open_link(&mut self) {
        let Some(widget) = self.selected_widget_mut() else {
            return;
        };
        let is_news = widget
            .as_any()
            .is_some_and(|any| any.is::<NewsWidget>());

        match widget.link_url() {
            Some(url) => {
                if let Err(e) = open::that(&url) {
                    tracing::warn!("Failed to open {}: {}", url, e);
                    self.status = Some(format!("Failed to open {}", url));
                }
            }
            None if is_news => {
                self.status = Some("No news source available to open.".to_string());
            }
            None => {
                self.status = Some("Nothing to open for this widget".to_string());
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // A status message lasts until the next keypress
        self.status = None;

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Tab | KeyCode::Right => self.select_next(),
            KeyCode::BackTab | KeyCode::Left => self.select_prev(),
            KeyCode::Char(']') => self.next_page(),
            KeyCode::Char('[') => self.prev_page(),
            KeyCode::Char(c @ '1'..='9') => {
                let page = c.to_digit(10).unwrap_or(1) as usize - 1;
                self.goto_page(page);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(widget) = self.selected_widget_mut() {
                    widget.scroll_up();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(widget) = self.selected_widget_mut() {
                    widget.scroll_down();
                }
            }
            KeyCode::Enter => {
                if let Some(widget) = self.selected_widget_mut() {
                    widget.activate();
                }
            }
            KeyCode::Char('r') => self.refresh_widget(self.selected),
            KeyCode::Char('R') => self.refresh_all(),
            KeyCode::Char('d') => self.toggle_theme(),
            KeyCode::Char('l') => self.locate(),
            KeyCode::Char('o') => self.open_link(),
            _ => {}
        }
    }

    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let tick_rate = Duration::from_millis(self.config.general.tick_ms.max(10));
        let mut last_tick = Instant::now();

        self.refresh_all();

        loop {
            self.drain_messages();
            terminal.draw(|frame| ui::draw(frame, self))?;

            let timeout = tick_rate.saturating_sub(last_tick.elapsed());
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }

            if self.should_quit {
                return Ok(());
            }

            let elapsed = last_tick.elapsed();
            if elapsed >= tick_rate {
                self.tick(elapsed);
                last_tick = Instant::now();

                for index in self.due_widgets(last_tick) {
                    self.refresh_widget(index);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::{CurrencyRate, NewsBulletin};
    use crate::theme::PreferenceStore;
    use crossterm::event::KeyEventState;

    fn app_in(dir: &tempfile::TempDir) -> App {
        let store = PreferenceStore::new(dir.path().join("preferences.json"));
        let config = Config::default();
        let theme = Theme::load(&config.theme.dark_colors, store);
        App::new(config, theme)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn titles_on_page(app: &App) -> Vec<String> {
        app.visible_widgets()
            .into_iter()
            .map(|i| app.widgets()[i].title().to_string())
            .collect()
    }

    #[test]
    fn test_default_pages_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);

        assert_eq!(
            titles_on_page(&app),
            vec!["Weather", "World Clock", "Global Currency", "Crypto Market"]
        );
        app.goto_page(1);
        assert_eq!(
            titles_on_page(&app),
            vec!["Crypto Prices (PHP)", "Forex (PHP)"]
        );
        app.next_page();
        assert_eq!(titles_on_page(&app), vec!["Local News", "World News"]);
        app.next_page();
        assert_eq!(app.page(), 0);
        app.prev_page();
        assert_eq!(app.page(), 2);
    }

    #[test]
    fn test_selection_cycles_within_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);

        let first = app.selected_index();
        assert_eq!(app.widgets()[first].title(), "Weather");

        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.widgets()[app.selected_index()].title(), "World Clock");
        app.handle_key(press(KeyCode::BackTab));
        app.handle_key(press(KeyCode::BackTab));
        assert_eq!(app.widgets()[app.selected_index()].title(), "Crypto Market");

        app.handle_key(press(KeyCode::Char('2')));
        assert_eq!(
            app.widgets()[app.selected_index()].title(),
            "Crypto Prices (PHP)"
        );
        app.handle_key(press(KeyCode::Char('9')));
        assert_eq!(app.page(), 1);
    }

    #[test]
    fn test_messages_route_by_widget_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        app.goto_page(2);

        let local_id = app.widgets()[app.visible_widgets()[0]].id();
        app.handle_message(FeedMessage {
            widget_id: local_id,
            data: FeedData::News(NewsBulletin {
                source: "GMA News".to_string(),
                home: "https://www.gmanetwork.com/news/".to_string(),
                headlines: vec!["Headline".to_string()],
            }),
        });

        let urls: Vec<Option<String>> = app
            .visible_widgets()
            .into_iter()
            .map(|i| app.widgets()[i].link_url())
            .collect();
        assert_eq!(
            urls,
            vec![Some("https://www.gmanetwork.com/news/".to_string()), None]
        );

        // Unknown ids are ignored
        app.handle_message(FeedMessage {
            widget_id: "nope".to_string(),
            data: FeedData::Rates(vec![CurrencyRate {
                code: "USD".to_string(),
                label: "US Dollar".to_string(),
                value: 56.0,
            }]),
        });
    }

    #[test]
    fn test_open_without_source_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        app.goto_page(2);

        app.handle_key(press(KeyCode::Char('o')));
        assert_eq!(app.status(), Some("No news source available to open."));

        app.handle_key(press(KeyCode::Down));
        assert_eq!(app.status(), None);
    }

    #[test]
    fn test_partial_sections_keep_widget_ids_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("preferences.json"));
        let config: Config = toml::from_str(
            r#"
            [forex]
            refresh_secs = 60

            [world_news]
            max_items = 3
            "#,
        )
        .unwrap();
        let theme = Theme::load(&config.theme.dark_colors, store);
        let mut app = App::new(config, theme);

        let mut ids: Vec<String> = app.widgets().iter().map(|w| w.id()).collect();
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);

        let forex = app
            .widgets()
            .iter()
            .position(|w| w.title() == "Forex (PHP)")
            .unwrap();
        app.handle_message(FeedMessage {
            widget_id: "rates-forex".to_string(),
            data: FeedData::Rates(vec![CurrencyRate {
                code: "EUR".to_string(),
                label: "EUR".to_string(),
                value: 63.5,
            }]),
        });
        assert_eq!(app.widgets()[forex].page(), 1);

        app.goto_page(1);
        let titles = titles_on_page(&app);
        assert!(titles.contains(&"Forex (PHP)".to_string()));
        app.goto_page(2);
        assert_eq!(titles_on_page(&app), vec!["Local News", "World News"]);
    }

    #[test]
    fn test_theme_toggle_persists_across_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        assert!(!app.theme().is_dark());

        app.handle_key(press(KeyCode::Char('d')));
        assert!(app.theme().is_dark());
        drop(app);

        let app = app_in(&dir);
        assert!(app.theme().is_dark());
    }

    #[tokio::test]
    async fn test_refresh_shows_placeholder_and_schedules_next() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        let currency = app
            .widgets()
            .iter()
            .position(|w| w.title() == "Global Currency")
            .unwrap();

        app.handle_message(FeedMessage {
            widget_id: app.widgets()[currency].id(),
            data: FeedData::Error("down".to_string()),
        });
        app.refresh_widget(currency);

        let now = Instant::now();
        assert!(app.due_widgets(now).is_empty());
        assert_eq!(
            app.due_widgets(now + Duration::from_secs(301)),
            vec![currency]
        );
    }

    #[test]
    fn test_quit_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        assert!(!app.should_quit());
        app.handle_key(KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        });
        assert!(app.should_quit());
    }
}
