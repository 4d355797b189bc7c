//! Owner of the dashboard view state.
//!
//! All state changes go through three transitions: startup (which produces the
//! [`Coordinator`] itself), region selection and metric selection. Region
//! selection is split into `begin`/`fetch`/`complete` so the network call can
//! run away from the state owner; every request carries a token and only the
//! most recently issued one may be applied.

use tracing::{debug, info, warn};

use crate::catalog::build_catalog;
use crate::format::format_stat;
use crate::gateway::{Gateway, GatewayError};
use crate::model::{CounterSnapshot, MapFocus, Metric, RegionOption, RegionRecord, RegionSelection};
use crate::rank::{rank, RankedTable};

/// Selected region, its counters and the map focus derived from them.
///
/// Always replaced as a whole so the three never disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub region: RegionSelection,
    pub snapshot: CounterSnapshot,
    pub focus: MapFocus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub scope: Scope,
    pub metric: Metric,
    /// All-regions snapshot in service order (map markers)
    pub regions: Vec<RegionRecord>,
    pub region_options: Vec<RegionOption>,
    pub ranked_table: RankedTable,
}

/// One row of the summary table as handed to the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow<'a> {
    pub flag_url: &'a str,
    pub iso_code: &'a str,
    pub country: &'a str,
    pub cases: String,
}

/// An issued region selection awaiting its snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRequest {
    token: u64,
    selection: RegionSelection,
}

impl RegionRequest {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn selection(&self) -> &RegionSelection {
        &self.selection
    }

    /// Fetch the snapshot for this request's scope.
    pub async fn fetch<G: Gateway + ?Sized>(
        &self,
        gateway: &G,
    ) -> Result<CounterSnapshot, GatewayError> {
        match &self.selection {
            RegionSelection::Worldwide => gateway.fetch_global_snapshot().await,
            RegionSelection::Region(code) => gateway.fetch_region_snapshot(code).await,
        }
    }
}

/// What happened to a completed region request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    Applied,
    /// A newer request was issued; this completion was dropped.
    Superseded,
}

pub struct Coordinator {
    state: ViewState,
    last_issued: u64,
}

impl Coordinator {
    /// Run the startup transition: fetch the global snapshot and every region
    /// concurrently. Any failure aborts startup without producing state.
    pub async fn start<G: Gateway + ?Sized>(gateway: &G) -> Result<Self, GatewayError> {
        let (global, regions) =
            tokio::try_join!(gateway.fetch_global_snapshot(), gateway.fetch_all_regions())?;
        info!(regions = regions.len(), "startup data loaded");
        Ok(Self::from_startup(global, regions))
    }

    /// Build the initial worldwide state from the two startup payloads.
    pub fn from_startup(global: CounterSnapshot, regions: Vec<RegionRecord>) -> Self {
        let region_options = build_catalog(&regions);
        let ranked_table = rank(&regions);
        Self {
            state: ViewState {
                scope: Scope {
                    region: RegionSelection::Worldwide,
                    snapshot: global,
                    focus: MapFocus::worldwide(),
                },
                metric: Metric::default(),
                regions,
                region_options,
                ranked_table,
            },
            last_issued: 0,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn selected_region(&self) -> &RegionSelection {
        &self.state.scope.region
    }

    pub fn selected_metric(&self) -> Metric {
        self.state.metric
    }

    pub fn active_snapshot(&self) -> &CounterSnapshot {
        &self.state.scope.snapshot
    }

    pub fn map_focus(&self) -> MapFocus {
        self.state.scope.focus
    }

    pub fn regions(&self) -> &[RegionRecord] {
        &self.state.regions
    }

    pub fn region_options(&self) -> &[RegionOption] {
        &self.state.region_options
    }

    pub fn ranked_table(&self) -> &[RegionRecord] {
        &self.state.ranked_table
    }

    /// Ranked table rows with the case count formatted for display
    pub fn table_rows(&self) -> impl Iterator<Item = TableRow<'_>> {
        self.state.ranked_table.iter().map(|record| TableRow {
            flag_url: &record.country_info.flag_url,
            iso_code: &record.iso_code,
            country: &record.country,
            cases: format_stat(Some(record.cases)),
        })
    }

    /// Display name of the selected region
    pub fn selected_region_name(&self) -> &str {
        match &self.state.scope.region {
            RegionSelection::Worldwide => "Worldwide",
            RegionSelection::Region(code) => self
                .state
                .region_options
                .iter()
                .find(|option| &option.selection_value == code)
                .map(|option| option.display_name.as_str())
                .unwrap_or(code),
        }
    }

    /// Issue a region selection. Any request issued earlier becomes stale.
    pub fn begin_region_selection(&mut self, selection: RegionSelection) -> RegionRequest {
        self.last_issued += 1;
        debug!(token = self.last_issued, region = %selection, "region selection issued");
        RegionRequest {
            token: self.last_issued,
            selection,
        }
    }

    /// Apply the result of a region request.
    ///
    /// Stale completions are dropped whether they succeeded or failed. A
    /// failure of the latest request leaves the state untouched and is
    /// returned to the caller.
    pub fn complete_region_selection(
        &mut self,
        request: RegionRequest,
        result: Result<CounterSnapshot, GatewayError>,
    ) -> Result<SelectionOutcome, GatewayError> {
        if request.token != self.last_issued {
            debug!(
                token = request.token,
                latest = self.last_issued,
                region = %request.selection,
                "stale region response dropped"
            );
            return Ok(SelectionOutcome::Superseded);
        }

        let snapshot = result.inspect_err(|e| {
            warn!(region = %request.selection, error = %e, "region selection failed");
        })?;
        let focus = match &request.selection {
            RegionSelection::Worldwide => MapFocus::worldwide(),
            RegionSelection::Region(code) => {
                let (lat, long) = snapshot.coordinates.ok_or_else(|| {
                    GatewayError::malformed(format!("region {code}: snapshot has no coordinates"))
                })?;
                MapFocus::region(lat, long)
            }
        };

        info!(region = %request.selection, "region selection applied");
        self.state.scope = Scope {
            region: request.selection,
            snapshot,
            focus,
        };
        Ok(SelectionOutcome::Applied)
    }

    /// Issue, fetch and apply a region selection in one call.
    pub async fn select_region<G: Gateway + ?Sized>(
        &mut self,
        gateway: &G,
        selection: RegionSelection,
    ) -> Result<SelectionOutcome, GatewayError> {
        let request = self.begin_region_selection(selection);
        let result = request.fetch(gateway).await;
        self.complete_region_selection(request, result)
    }

    /// Switch the metric shown by the map and chart. Never touches the network.
    pub fn select_metric(&mut self, metric: Metric) {
        self.state.metric = metric;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use crate::rank::tests::record;

    pub(crate) fn snapshot(cases: u64, coordinates: Option<(f64, f64)>) -> CounterSnapshot {
        CounterSnapshot {
            today_cases: (cases / 10) as i64,
            cases,
            today_recovered: 1,
            recovered: cases / 2,
            today_deaths: 0,
            deaths: cases / 100,
            coordinates,
        }
    }

    pub(crate) fn ready() -> Coordinator {
        Coordinator::from_startup(
            snapshot(1_000_000, None),
            vec![record("AA", 10), record("BB", 300), record("CC", 20)],
        )
    }

    fn region(code: &str) -> RegionSelection {
        RegionSelection::Region(code.to_owned())
    }

    #[tokio::test]
    async fn test_startup_builds_worldwide_state() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_global_snapshot()
            .times(1)
            .returning(|| Ok(snapshot(500, None)));
        gateway
            .expect_fetch_all_regions()
            .times(1)
            .returning(|| Ok(vec![record("AA", 1), record("BB", 2)]));

        let coordinator = Coordinator::start(&gateway).await.expect("startup succeeds");

        assert_eq!(coordinator.selected_region(), &RegionSelection::Worldwide);
        assert_eq!(coordinator.selected_metric(), Metric::Cases);
        assert_eq!(coordinator.map_focus(), MapFocus { center: (29.0, 40.0), zoom: 1.8 });
        assert_eq!(coordinator.active_snapshot(), &snapshot(500, None));
        assert_eq!(coordinator.region_options().len(), 2);
        assert_eq!(coordinator.ranked_table()[0].iso_code, "BB");
        assert_eq!(coordinator.regions()[0].iso_code, "AA");
    }

    #[tokio::test]
    async fn test_startup_fails_when_either_fetch_fails() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_global_snapshot()
            .returning(|| Ok(snapshot(500, None)));
        gateway
            .expect_fetch_all_regions()
            .returning(|| Err(GatewayError::network("connection refused")));

        let error = Coordinator::start(&gateway).await.err();
        assert_eq!(error, Some(GatewayError::network("connection refused")));

        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_global_snapshot()
            .returning(|| Err(GatewayError::malformed("missing field `cases`")));
        gateway
            .expect_fetch_all_regions()
            .returning(|| Ok(vec![record("AA", 1)]));
        assert!(matches!(
            Coordinator::start(&gateway).await,
            Err(GatewayError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_select_region_applies_snapshot_and_focus() {
        let mocked = snapshot(42, Some((10.0, 20.0)));
        let expected = mocked.clone();
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_region_snapshot()
            .times(1)
            .returning(move |code| {
                assert_eq!(code, "XYZ");
                Ok(mocked.clone())
            });

        let mut coordinator = ready();
        let outcome = coordinator.select_region(&gateway, region("XYZ")).await;

        assert_eq!(outcome, Ok(SelectionOutcome::Applied));
        assert_eq!(coordinator.selected_region(), &region("XYZ"));
        assert_eq!(coordinator.map_focus().center, (10.0, 20.0));
        assert_eq!(coordinator.map_focus().zoom, 4.2);
        assert_eq!(coordinator.active_snapshot(), &expected);
    }

    #[tokio::test]
    async fn test_select_worldwide_uses_global_snapshot_and_preset() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_region_snapshot()
            .returning(|_| Ok(snapshot(42, Some((10.0, 20.0)))));
        gateway
            .expect_fetch_global_snapshot()
            .times(1)
            .returning(|| Ok(snapshot(2_000_000, None)));

        let mut coordinator = ready();
        coordinator
            .select_region(&gateway, region("BB"))
            .await
            .expect("region selection succeeds");
        coordinator
            .select_region(&gateway, RegionSelection::Worldwide)
            .await
            .expect("worldwide selection succeeds");

        assert_eq!(coordinator.selected_region(), &RegionSelection::Worldwide);
        assert_eq!(coordinator.map_focus(), MapFocus::worldwide());
        assert_eq!(coordinator.active_snapshot().cases, 2_000_000);
    }

    #[tokio::test]
    async fn test_failed_selection_leaves_state_unchanged() {
        for failure in [
            GatewayError::unknown_region("XYZ"),
            GatewayError::network("timed out"),
            GatewayError::malformed("missing field `cases`"),
        ] {
            let mut gateway = MockGateway::new();
            let returned = failure.clone();
            gateway
                .expect_fetch_region_snapshot()
                .returning(move |_| Err(returned.clone()));

            let mut coordinator = ready();
            let before = coordinator.state().clone();
            let outcome = coordinator.select_region(&gateway, region("XYZ")).await;

            assert_eq!(outcome, Err(failure));
            assert_eq!(coordinator.state(), &before);
        }
    }

    #[test]
    fn test_region_snapshot_without_coordinates_is_rejected() {
        let mut coordinator = ready();
        let before = coordinator.state().clone();
        let request = coordinator.begin_region_selection(region("AA"));

        let outcome = coordinator.complete_region_selection(request, Ok(snapshot(5, None)));

        assert!(matches!(outcome, Err(GatewayError::MalformedResponse { .. })));
        assert_eq!(coordinator.state(), &before);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut coordinator = ready();
        let request_a = coordinator.begin_region_selection(region("AA"));
        let request_b = coordinator.begin_region_selection(region("BB"));
        assert!(request_b.token() > request_a.token());

        let applied =
            coordinator.complete_region_selection(request_b, Ok(snapshot(300, Some((1.0, 2.0)))));
        let stale =
            coordinator.complete_region_selection(request_a, Ok(snapshot(10, Some((3.0, 4.0)))));

        assert_eq!(applied, Ok(SelectionOutcome::Applied));
        assert_eq!(stale, Ok(SelectionOutcome::Superseded));
        assert_eq!(coordinator.selected_region(), &region("BB"));
        assert_eq!(coordinator.active_snapshot().cases, 300);
        assert_eq!(coordinator.map_focus().center, (1.0, 2.0));
    }

    #[test]
    fn test_stale_failure_is_not_surfaced() {
        let mut coordinator = ready();
        let request_a = coordinator.begin_region_selection(region("AA"));
        let _request_b = coordinator.begin_region_selection(region("BB"));

        let outcome =
            coordinator.complete_region_selection(request_a, Err(GatewayError::network("reset")));
        assert_eq!(outcome, Ok(SelectionOutcome::Superseded));
        assert_eq!(coordinator.selected_region(), &RegionSelection::Worldwide);
    }

    #[tokio::test]
    async fn test_out_of_order_fetches_resolve_to_latest_selection() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_region_snapshot()
            .returning(|code| match code {
                "AA" => Ok(snapshot(10, Some((1.0, 1.0)))),
                _ => Ok(snapshot(300, Some((2.0, 2.0)))),
            });

        let mut coordinator = ready();
        let request_a = coordinator.begin_region_selection(region("AA"));
        let request_b = coordinator.begin_region_selection(region("BB"));

        // B's response arrives first, A's last
        let result_b = request_b.fetch(&gateway).await;
        coordinator
            .complete_region_selection(request_b, result_b)
            .expect("latest selection applies");
        let result_a = request_a.fetch(&gateway).await;
        coordinator
            .complete_region_selection(request_a, result_a)
            .expect("stale selection is ignored");

        assert_eq!(coordinator.selected_region(), &region("BB"));
        assert_eq!(coordinator.active_snapshot().cases, 300);
    }

    #[test]
    fn test_select_metric_only_changes_metric() {
        let mut coordinator = ready();
        let before = coordinator.state().clone();

        coordinator.select_metric(Metric::Deaths);

        assert_eq!(coordinator.selected_metric(), Metric::Deaths);
        assert_eq!(coordinator.state().scope, before.scope);
        assert_eq!(coordinator.ranked_table(), before.ranked_table.as_slice());
    }

    #[tokio::test]
    async fn test_region_selection_never_rebuilds_table_or_options() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_region_snapshot()
            .returning(|_| Ok(snapshot(999_999_999, Some((5.0, 5.0)))));
        gateway.expect_fetch_all_regions().never();

        let mut coordinator = ready();
        let options = coordinator.region_options().to_vec();
        let table = coordinator.ranked_table().to_vec();
        coordinator
            .select_region(&gateway, region("AA"))
            .await
            .expect("selection succeeds");

        assert_eq!(coordinator.region_options(), options.as_slice());
        assert_eq!(coordinator.ranked_table(), table.as_slice());
    }

    #[test]
    fn test_table_rows_and_region_name() {
        let mut coordinator = ready();
        let rows: Vec<_> = coordinator.table_rows().collect();
        assert_eq!(rows[0].country, "Country BB");
        assert_eq!(rows[0].cases, "300");
        assert!(rows[0].flag_url.ends_with("bb.png"));
        assert_eq!(coordinator.selected_region_name(), "Worldwide");

        let request = coordinator.begin_region_selection(region("CC"));
        coordinator
            .complete_region_selection(request, Ok(snapshot(20, Some((0.0, 0.0)))))
            .expect("selection applies");
        assert_eq!(coordinator.selected_region_name(), "Country CC");
    }
}
