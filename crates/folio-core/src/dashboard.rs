//! The owned state behind every folio view.
//!
//! A [`Dashboard`] holds the full project list, its facet index, the current
//! query, the cached display order, and the open detail view. Loads go
//! through a ticket protocol: [`Dashboard::begin_load`] hands out a
//! [`LoadTicket`], and [`Dashboard::finish_load`] applies a result only when
//! its ticket is still the newest. A stale completion changes nothing.

use crate::error::FolioError;
use crate::facets::FacetIndex;
use crate::model::Project;
use crate::navigator::DetailNavigator;
use crate::normalize::{IDENTITY_COLUMN, Normalizer};
use crate::provider::{DataProvider, ProviderEvent, sample_projects};
use crate::query::{QueryPatch, QueryResult, QueryState, clamp_page, filter_and_sort};
use crate::resolve::resolve_text;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Label reported as the source when the sample set is shown.
pub const SAMPLE_SOURCE: &str = "sample";

/// Where the dashboard is in its load cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready { source: String },
}

/// Proof of a started load. Only the newest ticket can be finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    source: String,
}

impl LoadTicket {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// What [`Dashboard::finish_load`] did with a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Provider data was applied.
    Loaded { count: usize },
    /// The load failed and the sample set was applied instead.
    Fallback { reason: FolioError },
    /// The load failed with an error that says nothing about the data
    /// source; the current projects were kept.
    Rejected { reason: FolioError },
    /// A newer load was started; nothing changed.
    Superseded,
}

/// The open detail view with its neighbors in the context list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView<'a> {
    pub project: &'a Project,
    /// 1-based position within the context list.
    pub position: usize,
    pub total: usize,
    pub previous: Option<&'a Project>,
    pub next: Option<&'a Project>,
}

impl DetailView<'_> {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    normalizer: Normalizer,
    projects: Vec<Project>,
    facets: FacetIndex,
    query: QueryState,
    /// Indices into `projects` in display order for the current query.
    order: Vec<usize>,
    /// Cursor over indices into `projects`.
    navigator: DetailNavigator<usize>,
    status: LoadStatus,
    notice: Option<String>,
    generation: u64,
    /// Label of the data currently shown.
    source: Option<String>,
    /// Description of the provider last loaded from, reused for host
    /// table-change reloads.
    provider_source: Option<String>,
    sample: bool,
    filter_passes: u64,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            normalizer: Normalizer::default(),
            projects: Vec::new(),
            facets: FacetIndex::default(),
            query: QueryState::default(),
            order: Vec::new(),
            navigator: DetailNavigator::new(),
            status: LoadStatus::Idle,
            notice: None,
            generation: 0,
            source: None,
            provider_source: None,
            sample: false,
            filter_passes: 0,
        }
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Start from a given query (for example a configured sort).
    #[must_use]
    pub fn with_query_state(mut self, query: QueryState) -> Self {
        self.query = query;
        self.refilter();
        self
    }

    // -- Load protocol -------------------------------------------------------

    /// Start a load from `source` and mark the dashboard as loading.
    pub fn begin_load(&mut self, source: impl Into<String>) -> LoadTicket {
        self.generation += 1;
        self.status = LoadStatus::Loading;
        let ticket = LoadTicket {
            generation: self.generation,
            source: source.into(),
        };
        debug!(generation = ticket.generation, source = %ticket.source, "load started");
        ticket
    }

    /// Apply a fetched payload, or recover from a failed fetch with the
    /// sample set. Stale tickets are ignored.
    ///
    /// Only adapter and payload failures fall back to the sample set. Any
    /// other error keeps the current projects; with nothing loaded yet the
    /// sample set is shown anyway so the dashboard always ends up `Ready`.
    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<Value, FolioError>,
    ) -> LoadOutcome {
        if ticket.generation != self.generation {
            debug!(
                generation = ticket.generation,
                latest = self.generation,
                "discarding superseded load"
            );
            return LoadOutcome::Superseded;
        }

        let normalized = result.and_then(|payload| {
            self.normalizer
                .normalize(&payload)
                .map_err(FolioError::from)
        });

        match normalized {
            Ok(projects) => {
                let count = projects.len();
                info!(source = %ticket.source, count, "projects loaded");
                self.notice = None;
                self.replace_projects(projects, ticket.source.clone(), false);
                LoadOutcome::Loaded { count }
            }
            Err(reason) if !reason.is_recoverable_load_failure() && self.source.is_some() => {
                warn!(source = %ticket.source, error = %reason, "load rejected, keeping current projects");
                self.status = LoadStatus::Ready {
                    source: self.source.clone().unwrap_or_default(),
                };
                LoadOutcome::Rejected { reason }
            }
            Err(reason) => {
                warn!(source = %ticket.source, error = %reason, "load failed, showing sample data");
                self.notice = Some(fallback_notice(&reason));
                self.replace_projects(sample_projects(), SAMPLE_SOURCE.to_string(), true);
                LoadOutcome::Fallback { reason }
            }
        }
    }

    /// Run the full handshake against `provider` under one ticket. `None`
    /// means no provider is attached.
    pub fn load(&mut self, provider: Option<&mut dyn DataProvider>) -> LoadOutcome {
        self.provider_source = provider.as_ref().map(|p| p.describe());
        let source = self
            .provider_source
            .clone()
            .unwrap_or_else(|| "none".to_string());
        let ticket = self.begin_load(source);
        let result = match provider {
            None => Err(FolioError::AdapterUnavailable),
            Some(p) => p.ready().and_then(|()| p.fetch_table()),
        };
        self.finish_load(&ticket, result)
    }

    /// Reload from scratch. Same as [`Dashboard::load`].
    pub fn refresh(&mut self, provider: Option<&mut dyn DataProvider>) -> LoadOutcome {
        debug!("refresh requested");
        self.load(provider)
    }

    /// The host reported new table contents.
    pub fn on_table_changed(&mut self, payload: Value) -> LoadOutcome {
        let source = self
            .provider_source
            .clone()
            .unwrap_or_else(|| "host".to_string());
        let ticket = self.begin_load(source);
        self.finish_load(&ticket, Ok(payload))
    }

    /// The host selected a record: open its detail view.
    ///
    /// The project opens within the current filtered list when it is there,
    /// and on its own otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`FolioError::ProjectNotFound`] when the record's identity is
    /// missing or unknown.
    pub fn on_selection_changed(&mut self, record: &Value) -> Result<(), FolioError> {
        let id = resolve_text(record, IDENTITY_COLUMN)
            .ok_or_else(|| FolioError::ProjectNotFound("<no identity>".to_string()))?;
        self.open_detail(&id)
    }

    /// Drain and apply provider events. Returns how many were handled.
    pub fn poll(&mut self, provider: &mut dyn DataProvider) -> usize {
        let events = provider.poll_events();
        let count = events.len();
        for event in events {
            match event {
                ProviderEvent::TableChanged(payload) => {
                    self.on_table_changed(payload);
                }
                ProviderEvent::SelectionChanged(record) => {
                    if let Err(err) = self.on_selection_changed(&record) {
                        debug!(error = %err, "ignoring selection");
                    }
                }
            }
        }
        count
    }

    // -- Query ---------------------------------------------------------------

    #[must_use]
    pub const fn query_state(&self) -> &QueryState {
        &self.query
    }

    /// Merge `patch` into the query. Search, facet or sort changes recompute
    /// the order and return to page 1; page-only changes reuse the order.
    pub fn set_query_state(&mut self, patch: QueryPatch) {
        if self.query.merge(patch) {
            self.refilter();
        }
        self.query.page = clamp_page(self.query.page, self.order.len());
    }

    /// Reset search and facets. The sort is kept.
    pub fn clear_query(&mut self) {
        let sort = self.query.sort;
        self.query = QueryState {
            sort,
            ..QueryState::default()
        };
        self.refilter();
    }

    /// The current page of the filtered, sorted list.
    #[must_use]
    pub fn visible_projects(&self) -> QueryResult<'_> {
        QueryResult::from_order(&self.projects, &self.order, self.query.page)
    }

    #[must_use]
    pub const fn facet_options(&self) -> &FacetIndex {
        &self.facets
    }

    /// Every loaded project, in source order.
    #[must_use]
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    #[must_use]
    pub fn project(&self, project_number: &str) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.project_number == project_number)
    }

    // -- Detail --------------------------------------------------------------

    /// Open the detail view for `project_number`.
    ///
    /// # Errors
    ///
    /// Returns [`FolioError::ProjectNotFound`] for an unknown identity.
    pub fn open_detail(&mut self, project_number: &str) -> Result<(), FolioError> {
        let in_order = self
            .order
            .iter()
            .position(|&i| self.projects[i].project_number == project_number);
        if let Some(position) = in_order {
            self.navigator.open(self.order.clone(), position);
            return Ok(());
        }

        let index = self
            .projects
            .iter()
            .position(|p| p.project_number == project_number)
            .ok_or_else(|| FolioError::ProjectNotFound(project_number.to_string()))?;
        self.navigator.open(vec![index], 0);
        Ok(())
    }

    pub fn close_detail(&mut self) {
        self.navigator.close();
    }

    /// Step to the next project. Returns `false` at the end.
    pub fn next_detail(&mut self) -> bool {
        self.navigator.next()
    }

    /// Step to the previous project. Returns `false` at the start.
    pub fn previous_detail(&mut self) -> bool {
        self.navigator.previous()
    }

    #[must_use]
    pub fn detail(&self) -> Option<DetailView<'_>> {
        let project = self.navigator.current().map(|&i| &self.projects[i])?;
        Some(DetailView {
            project,
            position: self.navigator.position().unwrap_or(1),
            total: self.navigator.total(),
            previous: self.navigator.peek_previous().map(|&i| &self.projects[i]),
            next: self.navigator.peek_next().map(|&i| &self.projects[i]),
        })
    }

    // -- Status --------------------------------------------------------------

    #[must_use]
    pub const fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Informational message, set when the sample set replaced a failed load.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Whether the sample set is showing.
    #[must_use]
    pub const fn is_sample(&self) -> bool {
        self.sample
    }

    // -- Internals -----------------------------------------------------------

    fn replace_projects(&mut self, projects: Vec<Project>, source: String, sample: bool) {
        self.projects = projects;
        self.sample = sample;
        self.facets = FacetIndex::build(&self.projects);
        self.navigator.close();
        self.query.page = 1;
        self.refilter();
        self.status = LoadStatus::Ready {
            source: source.clone(),
        };
        self.source = Some(source);
    }

    fn refilter(&mut self) {
        self.order = filter_and_sort(&self.projects, &self.query);
        self.filter_passes += 1;
        debug!(matches = self.order.len(), pass = self.filter_passes, "query applied");
    }

    /// How many times the display order has been recomputed.
    #[must_use]
    pub const fn filter_passes(&self) -> u64 {
        self.filter_passes
    }
}

fn fallback_notice(reason: &FolioError) -> String {
    match reason {
        FolioError::AdapterUnavailable => {
            "No data source attached; showing sample projects.".to_string()
        }
        other => format!("Could not load projects ({other}); showing sample projects."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facets::Facet;
    use crate::provider::StaticProvider;
    use crate::query::SortKey;
    use serde_json::json;

    fn rows(n: usize) -> Value {
        Value::Array(
            (1..=n)
                .map(|i| {
                    json!({
                        "Project_Number": format!("P{i:02}"),
                        "Projects": format!("Project {i:02}"),
                        "Client": if i % 2 == 0 { "Even Co" } else { "Odd Ltd" },
                        "year": if i <= 5 { "2023" } else { "2022" }
                    })
                })
                .collect(),
        )
    }

    fn loaded(n: usize) -> Dashboard {
        let mut dash = Dashboard::new();
        let mut provider = StaticProvider::new(rows(n));
        assert_eq!(dash.load(Some(&mut provider)), LoadOutcome::Loaded { count: n });
        dash
    }

    #[test]
    fn starts_idle_and_empty() {
        let dash = Dashboard::new();
        assert_eq!(dash.status(), &LoadStatus::Idle);
        assert_eq!(dash.visible_projects().total_count, 0);
        assert!(dash.detail().is_none());
    }

    #[test]
    fn no_provider_falls_back_to_sample() {
        let mut dash = Dashboard::new();
        let outcome = dash.load(None);
        assert_eq!(
            outcome,
            LoadOutcome::Fallback {
                reason: FolioError::AdapterUnavailable
            }
        );
        assert_eq!(dash.visible_projects().projects.len(), 3);
        assert!(dash.is_sample());
        assert!(dash.notice().is_some());
        assert_eq!(
            dash.status(),
            &LoadStatus::Ready {
                source: SAMPLE_SOURCE.to_string()
            }
        );
    }

    #[test]
    fn handshake_failure_falls_back() {
        let mut dash = Dashboard::new();
        let mut provider = StaticProvider::unreachable("refused");
        assert!(matches!(
            dash.load(Some(&mut provider)),
            LoadOutcome::Fallback {
                reason: FolioError::AdapterConnect(_)
            }
        ));
        assert_eq!(dash.projects().len(), 3);
    }

    #[test]
    fn unrecognized_payload_falls_back() {
        let mut dash = Dashboard::new();
        let mut provider = StaticProvider::new(json!({ "count": 0 }));
        assert!(matches!(
            dash.load(Some(&mut provider)),
            LoadOutcome::Fallback {
                reason: FolioError::Normalization(_)
            }
        ));
        assert!(dash.is_sample());
    }

    #[test]
    fn successful_load_clears_notice() {
        let mut dash = Dashboard::new();
        dash.load(None);
        assert!(dash.notice().is_some());

        let mut provider = StaticProvider::new(rows(4));
        dash.refresh(Some(&mut provider));
        assert!(dash.notice().is_none());
        assert!(!dash.is_sample());
        assert_eq!(
            dash.status(),
            &LoadStatus::Ready {
                source: "in-memory".to_string()
            }
        );
    }

    #[test]
    fn table_change_after_fallback_is_not_sample_data() {
        let mut dash = Dashboard::new();
        dash.load(None);
        assert!(dash.is_sample());

        assert_eq!(dash.on_table_changed(rows(2)), LoadOutcome::Loaded { count: 2 });
        assert!(!dash.is_sample());
        assert!(dash.notice().is_none());
        assert_eq!(
            dash.status(),
            &LoadStatus::Ready {
                source: "host".to_string()
            }
        );
    }

    #[test]
    fn table_change_keeps_provider_label_after_failed_load() {
        let mut dash = Dashboard::new();
        let mut provider = StaticProvider::new(json!("not a table"));
        assert!(matches!(
            dash.load(Some(&mut provider)),
            LoadOutcome::Fallback { .. }
        ));
        assert!(dash.is_sample());

        dash.on_table_changed(rows(3));
        assert!(!dash.is_sample());
        assert_eq!(
            dash.status(),
            &LoadStatus::Ready {
                source: "in-memory".to_string()
            }
        );
    }

    #[test]
    fn non_load_error_keeps_current_projects() {
        let mut dash = loaded(4);
        let ticket = dash.begin_load("host");
        let outcome = dash.finish_load(&ticket, Err(FolioError::ProjectNotFound("P9".into())));

        assert_eq!(
            outcome,
            LoadOutcome::Rejected {
                reason: FolioError::ProjectNotFound("P9".into())
            }
        );
        assert_eq!(dash.projects().len(), 4);
        assert!(!dash.is_sample());
        assert!(dash.notice().is_none());
        assert_eq!(
            dash.status(),
            &LoadStatus::Ready {
                source: "in-memory".to_string()
            }
        );
    }

    #[test]
    fn non_load_error_with_nothing_loaded_shows_sample() {
        let mut dash = Dashboard::new();
        let ticket = dash.begin_load("host");
        assert!(matches!(
            dash.finish_load(&ticket, Err(FolioError::InvalidSortKey("x".into()))),
            LoadOutcome::Fallback { .. }
        ));
        assert!(dash.is_sample());
        assert_eq!(dash.projects().len(), 3);
    }

    #[test]
    fn superseded_ticket_changes_nothing() {
        let mut dash = Dashboard::new();
        let stale = dash.begin_load("first");
        let fresh = dash.begin_load("second");
        assert!(fresh.generation() > stale.generation());

        assert_eq!(dash.finish_load(&stale, Ok(rows(7))), LoadOutcome::Superseded);
        assert_eq!(dash.status(), &LoadStatus::Loading);
        assert!(dash.projects().is_empty());

        assert_eq!(
            dash.finish_load(&fresh, Ok(rows(2))),
            LoadOutcome::Loaded { count: 2 }
        );
        assert_eq!(dash.projects().len(), 2);
    }

    #[test]
    fn page_only_changes_reuse_the_order() {
        let mut dash = loaded(20);
        let passes = dash.filter_passes();

        dash.set_query_state(QueryPatch::page(2));
        assert_eq!(dash.filter_passes(), passes);
        assert_eq!(dash.visible_projects().page_number, 2);

        dash.set_query_state(QueryPatch::search("project"));
        assert_eq!(dash.filter_passes(), passes + 1);
        assert_eq!(dash.query_state().page, 1);
    }

    #[test]
    fn page_is_clamped_to_available_pages() {
        let mut dash = loaded(20);
        dash.set_query_state(QueryPatch::page(99));
        assert_eq!(dash.query_state().page, 3);
        assert_eq!(dash.visible_projects().projects.len(), 2);
    }

    #[test]
    fn query_survives_reload_but_page_resets() {
        let mut dash = loaded(20);
        dash.set_query_state(QueryPatch::default().with_facet(Facet::Year, ["2022"]));
        dash.set_query_state(QueryPatch::page(2));

        let mut provider = StaticProvider::new(rows(20));
        dash.refresh(Some(&mut provider));
        assert_eq!(dash.query_state().page, 1);
        assert!(dash.query_state().facets.years.contains("2022"));
        assert_eq!(dash.visible_projects().total_count, 15);
    }

    #[test]
    fn clear_query_keeps_sort() {
        let mut dash = loaded(6);
        dash.set_query_state(QueryPatch::search("01").with_sort(SortKey::Client));
        assert_eq!(dash.visible_projects().total_count, 1);

        dash.clear_query();
        assert_eq!(dash.visible_projects().total_count, 6);
        assert_eq!(dash.query_state().sort, SortKey::Client);
    }

    #[test]
    fn facet_options_cover_the_full_set() {
        let mut dash = loaded(6);
        dash.set_query_state(QueryPatch::default().with_facet(Facet::Client, ["Odd Ltd"]));
        assert_eq!(dash.facet_options().clients, vec!["Even Co", "Odd Ltd"]);
    }

    #[test]
    fn detail_navigation_follows_filtered_order() {
        let mut dash = loaded(6);
        dash.set_query_state(QueryPatch::default().with_facet(Facet::Client, ["Even Co"]));
        dash.open_detail("P04").unwrap();

        let view = dash.detail().unwrap();
        assert_eq!(view.project.project_number, "P04");
        assert_eq!((view.position, view.total), (2, 3));
        assert_eq!(view.previous.map(|p| p.project_number.as_str()), Some("P02"));
        assert_eq!(view.next.map(|p| p.project_number.as_str()), Some("P06"));

        assert!(dash.next_detail());
        assert!(!dash.next_detail());
        assert_eq!(dash.detail().unwrap().project.project_number, "P06");
        assert!(dash.previous_detail());

        dash.close_detail();
        assert!(dash.detail().is_none());
    }

    #[test]
    fn project_outside_filter_opens_standalone() {
        let mut dash = loaded(6);
        dash.set_query_state(QueryPatch::default().with_facet(Facet::Client, ["Even Co"]));
        dash.open_detail("P01").unwrap();

        let view = dash.detail().unwrap();
        assert_eq!((view.position, view.total), (1, 1));
        assert!(!view.has_previous() && !view.has_next());
    }

    #[test]
    fn unknown_project_is_an_error() {
        let mut dash = loaded(3);
        assert_eq!(
            dash.open_detail("nope"),
            Err(FolioError::ProjectNotFound("nope".into()))
        );
    }

    #[test]
    fn selection_event_opens_detail() {
        let mut dash = loaded(3);
        dash.on_selection_changed(&json!({ "id": 9, "fields": { "Project_Number": "P02" } }))
            .unwrap();
        assert_eq!(dash.detail().unwrap().project.project_number, "P02");

        assert!(dash.on_selection_changed(&json!({ "id": 9 })).is_err());
    }

    #[test]
    fn table_change_reloads_and_closes_detail() {
        let mut dash = loaded(3);
        dash.open_detail("P01").unwrap();

        assert_eq!(
            dash.on_table_changed(rows(5)),
            LoadOutcome::Loaded { count: 5 }
        );
        assert!(dash.detail().is_none());
        assert_eq!(dash.projects().len(), 5);
    }

    #[test]
    fn poll_dispatches_provider_events() {
        let mut dash = loaded(3);
        let mut provider = StaticProvider::new(rows(3));
        provider.push_event(ProviderEvent::TableChanged(rows(4)));
        provider.push_event(ProviderEvent::SelectionChanged(
            json!({ "Project_Number": "P04" }),
        ));

        assert_eq!(dash.poll(&mut provider), 2);
        assert_eq!(dash.projects().len(), 4);
        assert_eq!(dash.detail().unwrap().project.project_number, "P04");
    }

    #[test]
    fn configured_sort_applies_from_the_start() {
        let mut dash = Dashboard::new().with_query_state(QueryState {
            sort: SortKey::Client,
            ..QueryState::default()
        });
        let mut provider = StaticProvider::new(rows(4));
        dash.load(Some(&mut provider));
        let first = dash.visible_projects().projects[0].client.clone();
        assert_eq!(first.as_deref(), Some("Even Co"));
    }
}
