use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

use crate::chart::ChartSeries;
use crate::coordinator::{Coordinator, RegionRequest, SelectionOutcome};
use crate::gateway::{Gateway, GatewayError};
use crate::map::{MapRenderer, Marker};
use crate::model::{CounterSnapshot, Metric, RegionSelection, Timeline};

/// How long a transient notice stays on screen
const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Completion of a background fetch, delivered to the event loop
pub enum Message {
    Started(Result<Coordinator, GatewayError>),
    RegionFetched(RegionRequest, Result<CounterSnapshot, GatewayError>),
    HistoryFetched(Result<Timeline, GatewayError>),
}

/// Dashboard lifecycle
pub enum Phase {
    /// Waiting for the startup fetches; `error` is set once they failed
    Initializing { error: Option<GatewayError> },
    Ready(Coordinator),
}

pub enum ChartData {
    Loading,
    Loaded(Timeline),
    Failed(String),
}

/// Short-lived status line message
pub struct Notice {
    pub text: String,
    expires_at: Instant,
}

/// Region selector popup with type-to-filter
#[derive(Default)]
pub struct Picker {
    pub query: String,
    pub cursor: usize,
}

/// Selector entry: (display name, selection value)
pub type PickerEntry<'a> = (&'a str, &'a str);

/// Application state
pub struct App {
    pub phase: Phase,
    pub chart: ChartData,
    pub picker: Option<Picker>,
    pub notice: Option<Notice>,
    /// Region whose snapshot is currently being fetched
    pub loading: Option<RegionSelection>,
    pub map_renderer: MapRenderer,
    pub should_quit: bool,
    gateway: Arc<dyn Gateway>,
    tx: UnboundedSender<Message>,
    history_days: u32,
}

impl App {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        map_renderer: MapRenderer,
        history_days: u32,
    ) -> (Self, UnboundedReceiver<Message>) {
        let (tx, rx) = unbounded_channel();
        let app = Self {
            phase: Phase::Initializing { error: None },
            chart: ChartData::Loading,
            picker: None,
            notice: None,
            loading: None,
            map_renderer,
            should_quit: false,
            gateway,
            tx,
            history_days,
        };
        (app, rx)
    }

    /// Kick off the startup fetches and the chart history.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.phase = Phase::Initializing { error: None };
        self.spawn_startup();
        self.spawn_history();
    }

    /// Retry startup after a failure; ignored while a startup is in flight
    pub fn retry(&mut self) {
        if matches!(self.phase, Phase::Initializing { error: Some(_) }) {
            info!("retrying startup");
            self.start();
        }
    }

    fn spawn_startup(&self) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = Coordinator::start(gateway.as_ref()).await;
            // receiver only goes away on shutdown
            let _ = tx.send(Message::Started(result));
        });
    }

    fn spawn_history(&mut self) {
        self.chart = ChartData::Loading;
        let gateway = Arc::clone(&self.gateway);
        let tx = self.tx.clone();
        let days = self.history_days;
        tokio::spawn(async move {
            let result = gateway.fetch_history(days).await;
            let _ = tx.send(Message::HistoryFetched(result));
        });
    }

    pub fn coordinator(&self) -> Option<&Coordinator> {
        match &self.phase {
            Phase::Ready(coordinator) => Some(coordinator),
            Phase::Initializing { .. } => None,
        }
    }

    /// Apply one background completion
    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::Started(Ok(coordinator)) => {
                info!("dashboard ready");
                self.phase = Phase::Ready(coordinator);
            }
            Message::Started(Err(e)) => {
                error!(error = %e, "startup failed");
                self.phase = Phase::Initializing { error: Some(e) };
            }
            Message::RegionFetched(request, result) => self.complete_region(request, result),
            Message::HistoryFetched(Ok(timeline)) => self.chart = ChartData::Loaded(timeline),
            Message::HistoryFetched(Err(e)) => {
                warn!(error = %e, "history unavailable");
                self.chart = ChartData::Failed(e.to_string());
            }
        }
    }

    fn complete_region(
        &mut self,
        request: RegionRequest,
        result: Result<CounterSnapshot, GatewayError>,
    ) {
        let Phase::Ready(coordinator) = &mut self.phase else {
            return;
        };
        let selection = request.selection().clone();
        match coordinator.complete_region_selection(request, result) {
            Ok(SelectionOutcome::Applied) => self.loading = None,
            Ok(SelectionOutcome::Superseded) => {}
            Err(e) => {
                self.loading = None;
                self.notify(format!("Could not load {selection}: {e}"));
            }
        }
    }

    /// Issue a region selection; the snapshot is fetched in the background
    pub fn select_region(&mut self, selection: RegionSelection) {
        let Phase::Ready(coordinator) = &mut self.phase else {
            return;
        };
        let request = coordinator.begin_region_selection(selection.clone());
        self.loading = Some(selection);

        let gateway = Arc::clone(&self.gateway);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = request.fetch(gateway.as_ref()).await;
            let _ = tx.send(Message::RegionFetched(request, result));
        });
    }

    pub fn select_metric(&mut self, metric: Metric) {
        if let Phase::Ready(coordinator) = &mut self.phase {
            coordinator.select_metric(metric);
        }
    }

    pub fn cycle_metric(&mut self) {
        if let Some(metric) = self.coordinator().map(|c| c.selected_metric().next()) {
            self.select_metric(metric);
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn notify(&mut self, text: String) {
        self.notice = Some(Notice {
            text,
            expires_at: Instant::now() + NOTICE_TTL,
        });
    }

    /// Drop expired notices
    pub fn tick(&mut self, now: Instant) {
        if self.notice.as_ref().is_some_and(|n| now >= n.expires_at) {
            self.notice = None;
        }
    }

    /// Region circles for the active metric, selected region flagged
    pub fn markers(&self) -> Vec<Marker> {
        let Some(coordinator) = self.coordinator() else {
            return Vec::new();
        };
        let metric = coordinator.selected_metric();
        let selected = coordinator.selected_region().as_value();
        coordinator
            .regions()
            .iter()
            .map(|record| Marker::for_region(record, metric, record.iso_code == selected))
            .collect()
    }

    /// Daily new values of the active metric, once history is loaded
    pub fn chart_series(&self) -> Option<ChartSeries> {
        let ChartData::Loaded(timeline) = &self.chart else {
            return None;
        };
        let metric = self.coordinator().map(Coordinator::selected_metric).unwrap_or_default();
        Some(ChartSeries::daily_new(timeline, metric))
    }

    pub fn open_picker(&mut self) {
        if self.coordinator().is_some() {
            self.picker = Some(Picker::default());
        }
    }

    pub fn close_picker(&mut self) {
        self.picker = None;
    }

    /// Entries matching the picker query; "Worldwide" is always offered first
    pub fn picker_entries(&self) -> Vec<PickerEntry<'_>> {
        let (Some(coordinator), Some(picker)) = (self.coordinator(), self.picker.as_ref()) else {
            return Vec::new();
        };
        let query = picker.query.to_lowercase();
        let hit = |name: &str| query.is_empty() || name.to_lowercase().contains(&query);

        std::iter::once(("Worldwide", RegionSelection::WORLDWIDE))
            .chain(
                coordinator
                    .region_options()
                    .iter()
                    .map(|o| (o.display_name.as_str(), o.selection_value.as_str())),
            )
            .filter(|&(name, value)| hit(name) || value.eq_ignore_ascii_case(&query))
            .collect()
    }

    pub fn picker_input(&mut self, ch: char) {
        if let Some(picker) = self.picker.as_mut() {
            picker.query.push(ch);
            picker.cursor = 0;
        }
    }

    pub fn picker_backspace(&mut self) {
        if let Some(picker) = self.picker.as_mut() {
            picker.query.pop();
            picker.cursor = 0;
        }
    }

    pub fn picker_move(&mut self, delta: isize) {
        let len = self.picker_entries().len();
        if let Some(picker) = self.picker.as_mut() {
            picker.cursor = picker
                .cursor
                .saturating_add_signed(delta)
                .min(len.saturating_sub(1));
        }
    }

    /// Select the highlighted entry and close the picker
    pub fn picker_confirm(&mut self) {
        let Some(cursor) = self.picker.as_ref().map(|p| p.cursor) else {
            return;
        };
        let chosen = self
            .picker_entries()
            .get(cursor)
            .map(|(_, value)| RegionSelection::from_value(value));
        self.picker = None;
        if let Some(selection) = chosen {
            self.select_region(selection);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::tests::{ready, snapshot};
    use crate::gateway::MockGateway;
    use crate::rank::tests::record;

    fn app_with(gateway: MockGateway) -> (App, UnboundedReceiver<Message>) {
        App::new(Arc::new(gateway), MapRenderer::new(), 30)
    }

    fn ready_app(gateway: MockGateway) -> (App, UnboundedReceiver<Message>) {
        let (mut app, rx) = app_with(gateway);
        app.handle_message(Message::Started(Ok(ready())));
        (app, rx)
    }

    #[tokio::test]
    async fn test_startup_reaches_ready() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_global_snapshot()
            .returning(|| Ok(snapshot(100, None)));
        gateway
            .expect_fetch_all_regions()
            .returning(|| Ok(vec![record("AA", 1)]));
        gateway
            .expect_fetch_history()
            .returning(|_| Ok(Timeline::default()));

        let (mut app, mut rx) = app_with(gateway);
        app.start();
        for _ in 0..2 {
            let message = rx.recv().await.expect("background task reports");
            app.handle_message(message);
        }

        assert!(app.coordinator().is_some());
        assert!(matches!(app.chart, ChartData::Loaded(_)));
    }

    #[tokio::test]
    async fn test_startup_failure_stays_initializing_until_retry() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_global_snapshot()
            .returning(|| Err(GatewayError::network("offline")));
        gateway
            .expect_fetch_all_regions()
            .returning(|| Ok(vec![record("AA", 1)]));
        gateway
            .expect_fetch_history()
            .returning(|_| Err(GatewayError::network("offline")));

        let (mut app, mut rx) = app_with(gateway);
        app.start();
        for _ in 0..2 {
            let message = rx.recv().await.expect("background task reports");
            app.handle_message(message);
        }

        assert!(matches!(
            app.phase,
            Phase::Initializing { error: Some(GatewayError::Network { .. }) }
        ));
        assert!(matches!(app.chart, ChartData::Failed(_)));

        // metric and region commands are ignored until ready
        app.select_metric(Metric::Deaths);
        app.select_region(RegionSelection::Worldwide);
        assert!(app.loading.is_none());

        app.retry();
        assert!(matches!(app.phase, Phase::Initializing { error: None }));
    }

    #[tokio::test]
    async fn test_latest_region_wins_regardless_of_arrival_order() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_region_snapshot()
            .returning(|code| match code {
                "AA" => Ok(snapshot(10, Some((1.0, 1.0)))),
                _ => Ok(snapshot(300, Some((2.0, 2.0)))),
            });

        let (mut app, mut rx) = ready_app(gateway);
        app.select_region(RegionSelection::Region("AA".to_owned()));
        app.select_region(RegionSelection::Region("BB".to_owned()));

        let mut messages = vec![
            rx.recv().await.expect("first response"),
            rx.recv().await.expect("second response"),
        ];
        // deliver the newer request first, the superseded one last
        messages.sort_by_key(|m| match m {
            Message::RegionFetched(request, _) => std::cmp::Reverse(request.token()),
            _ => std::cmp::Reverse(0),
        });
        for message in messages {
            app.handle_message(message);
        }

        let coordinator = app.coordinator().expect("ready");
        assert_eq!(coordinator.selected_region().as_value(), "BB");
        assert_eq!(coordinator.active_snapshot().cases, 300);
        assert!(app.loading.is_none());
    }

    #[tokio::test]
    async fn test_failed_region_selection_raises_notice() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_region_snapshot()
            .returning(|code| Err(GatewayError::unknown_region(code)));

        let (mut app, mut rx) = ready_app(gateway);
        app.select_region(RegionSelection::Region("ZZ".to_owned()));
        let message = rx.recv().await.expect("response");
        app.handle_message(message);

        let notice = app.notice.as_ref().expect("notice raised");
        assert!(notice.text.contains("ZZ"));
        assert_eq!(
            app.coordinator().map(|c| c.selected_region().clone()),
            Some(RegionSelection::Worldwide)
        );

        app.tick(Instant::now() + NOTICE_TTL);
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_metric_selection_is_local() {
        let (mut app, mut rx) = ready_app(MockGateway::new());
        app.cycle_metric();
        assert_eq!(app.coordinator().map(Coordinator::selected_metric), Some(Metric::Recovered));
        app.select_metric(Metric::Deaths);
        assert_eq!(app.coordinator().map(Coordinator::selected_metric), Some(Metric::Deaths));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_picker_filtering_and_navigation() {
        let (mut app, _rx) = ready_app(MockGateway::new());
        app.open_picker();
        assert_eq!(app.picker_entries().len(), 4);
        assert_eq!(app.picker_entries()[0], ("Worldwide", "worldwide"));

        for ch in "bb".chars() {
            app.picker_input(ch);
        }
        assert_eq!(app.picker_entries(), vec![("Country BB", "BB")]);

        app.picker_move(5);
        assert_eq!(app.picker.as_ref().map(|p| p.cursor), Some(0));
        app.picker_backspace();
        app.picker_backspace();
        app.picker_move(2);
        assert_eq!(app.picker.as_ref().map(|p| p.cursor), Some(2));
        app.picker_move(-10);
        assert_eq!(app.picker.as_ref().map(|p| p.cursor), Some(0));

        app.close_picker();
        assert!(app.picker_entries().is_empty());
    }

    #[test]
    fn test_markers_follow_metric_and_selection() {
        let (mut app, _rx) = ready_app(MockGateway::new());
        let markers = app.markers();
        assert_eq!(markers.len(), 3);
        assert!(markers.iter().all(|m| !m.selected));

        let cases_radius = markers[1].radius_deg;
        app.select_metric(Metric::Deaths);
        assert!(app.markers()[1].radius_deg != cases_radius);
    }

    #[test]
    fn test_chart_series_uses_selected_metric() {
        let (mut app, _rx) = ready_app(MockGateway::new());
        assert!(app.chart_series().is_none());

        app.handle_message(Message::HistoryFetched(Ok(Timeline::default())));
        app.select_metric(Metric::Recovered);
        assert_eq!(app.chart_series().map(|s| s.metric), Some(Metric::Recovered));
    }
}
