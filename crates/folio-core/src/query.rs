//! In-memory filter, sort, and paging pipeline.
//!
//! [`apply`] is pure: given the full project list and a [`QueryState`] it
//! returns the visible page. The [`crate::dashboard::Dashboard`] splits the
//! same steps so that page-only changes reuse the cached ordering.

use crate::error::FolioError;
use crate::facets::Facet;
use crate::model::Project;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Projects per page.
pub const PAGE_SIZE: usize = 9;

// ---------------------------------------------------------------------------
// Sort keys
// ---------------------------------------------------------------------------

/// Attribute the visible list is ordered by (always ascending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    ProjectNumber,
    #[default]
    Name,
    Client,
    Category,
    Year,
    Country,
    Deliverables,
}

impl SortKey {
    pub const ALL: [Self; 7] = [
        Self::ProjectNumber,
        Self::Name,
        Self::Client,
        Self::Category,
        Self::Year,
        Self::Country,
        Self::Deliverables,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Self::ProjectNumber => "project_number",
            Self::Name => "name",
            Self::Client => "client",
            Self::Category => "category",
            Self::Year => "year",
            Self::Country => "country",
            Self::Deliverables => "deliverables",
        }
    }

    /// The project's value for this key, if any.
    #[must_use]
    pub fn value_of(self, project: &Project) -> Option<&str> {
        match self {
            Self::ProjectNumber => Some(project.project_number.as_str()),
            Self::Name => project.name.as_deref(),
            Self::Client => project.client.as_deref(),
            Self::Category => project.category.as_deref(),
            Self::Year => project.year.as_deref(),
            Self::Country => project.location.country.as_deref(),
            Self::Deliverables => project.deliverables_summary.as_deref(),
        }
    }

    /// Next key in [`SortKey::ALL`], wrapping around.
    #[must_use]
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "project_number" | "number" | "id" => Ok(Self::ProjectNumber),
            "name" | "projects" | "project" | "title" => Ok(Self::Name),
            "client" => Ok(Self::Client),
            "category" => Ok(Self::Category),
            "year" => Ok(Self::Year),
            "country" => Ok(Self::Country),
            "deliverables" | "deliverable" => Ok(Self::Deliverables),
            _ => Err(FolioError::InvalidSortKey(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Query state
// ---------------------------------------------------------------------------

/// Allowed values per facet. An empty set leaves that facet unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetSelection {
    pub clients: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub deliverables: BTreeSet<String>,
    pub years: BTreeSet<String>,
    pub countries: BTreeSet<String>,
}

impl FacetSelection {
    #[must_use]
    pub const fn get(&self, facet: Facet) -> &BTreeSet<String> {
        match facet {
            Facet::Client => &self.clients,
            Facet::Category => &self.categories,
            Facet::Deliverable => &self.deliverables,
            Facet::Year => &self.years,
            Facet::Country => &self.countries,
        }
    }

    pub const fn get_mut(&mut self, facet: Facet) -> &mut BTreeSet<String> {
        match facet {
            Facet::Client => &mut self.clients,
            Facet::Category => &mut self.categories,
            Facet::Deliverable => &mut self.deliverables,
            Facet::Year => &mut self.years,
            Facet::Country => &mut self.countries,
        }
    }

    /// Flip one value in or out of a facet's selection.
    pub fn toggle(&mut self, facet: Facet, value: &str) {
        let selected = self.get_mut(facet);
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        Facet::ALL.into_iter().all(|facet| self.get(facet).is_empty())
    }

    /// Whether `project` passes every facet.
    #[must_use]
    pub fn admits(&self, project: &Project) -> bool {
        Facet::ALL.into_iter().all(|facet| {
            let selected = self.get(facet);
            selected.is_empty()
                || facet
                    .value_of(project)
                    .is_some_and(|value| selected.contains(value))
        })
    }
}

/// Everything the user has asked of the list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    /// Free-text search, matched case-insensitively.
    pub search: String,
    pub facets: FacetSelection,
    pub sort: SortKey,
    /// 1-based page number.
    pub page: usize,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            search: String::new(),
            facets: FacetSelection::default(),
            sort: SortKey::default(),
            page: 1,
        }
    }
}

impl QueryState {
    /// Returns true if no search or facet restriction is active.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.search.is_empty() && self.facets.is_empty()
    }

    /// Returns true if the project satisfies the search term and every facet.
    #[must_use]
    pub fn matches(&self, project: &Project) -> bool {
        matches_search(project, &self.search) && self.facets.admits(project)
    }

    /// Apply a partial update. Returns `true` when anything other than the
    /// page changed, in which case the page is reset to 1.
    pub fn merge(&mut self, patch: QueryPatch) -> bool {
        let mut refilter = false;

        if let Some(search) = patch.search {
            refilter |= search != self.search;
            self.search = search;
        }
        for (facet, values) in patch.facets {
            let selected = self.facets.get_mut(facet);
            refilter |= *selected != values;
            *selected = values;
        }
        if let Some(sort) = patch.sort {
            refilter |= sort != self.sort;
            self.sort = sort;
        }

        if refilter {
            self.page = 1;
        } else if let Some(page) = patch.page {
            self.page = page.max(1);
        }
        refilter
    }
}

/// A partial [`QueryState`] update. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPatch {
    pub search: Option<String>,
    pub facets: Vec<(Facet, BTreeSet<String>)>,
    pub sort: Option<SortKey>,
    pub page: Option<usize>,
}

impl QueryPatch {
    #[must_use]
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn page(page: usize) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sort(sort: SortKey) -> Self {
        Self {
            sort: Some(sort),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_facet<I, S>(mut self, facet: Facet, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facets
            .push((facet, values.into_iter().map(Into::into).collect()));
        self
    }

    #[must_use]
    pub const fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = Some(sort);
        self
    }

    #[must_use]
    pub const fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

fn matches_search(project: &Project, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    [
        project.name.as_deref(),
        project.client.as_deref(),
        project.deliverables_summary.as_deref(),
        Some(project.project_number.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|haystack| haystack.to_lowercase().contains(&needle))
}

/// Present values first in lexical order, then missing values.
fn compare_present_first(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Indices into `all` of the matching projects, in display order.
///
/// The sort is stable, so ties (including missing-vs-missing) keep their
/// input order.
#[must_use]
pub fn filter_and_sort(all: &[Project], state: &QueryState) -> Vec<usize> {
    let mut order: Vec<usize> = all
        .iter()
        .enumerate()
        .filter(|(_, project)| state.matches(project))
        .map(|(index, _)| index)
        .collect();
    order.sort_by(|&a, &b| {
        compare_present_first(state.sort.value_of(&all[a]), state.sort.value_of(&all[b]))
    });
    order
}

/// `ceil(count / PAGE_SIZE)`.
#[must_use]
pub const fn total_pages(count: usize) -> usize {
    count.div_ceil(PAGE_SIZE)
}

/// Clamp a requested page into `1..=max(total_pages, 1)`.
#[must_use]
pub fn clamp_page(page: usize, count: usize) -> usize {
    page.clamp(1, total_pages(count).max(1))
}

/// Index range of `page` within a list of `count` items.
#[must_use]
pub fn page_bounds(page: usize, count: usize) -> Range<usize> {
    let start = (page.max(1) - 1).saturating_mul(PAGE_SIZE).min(count);
    let end = start.saturating_add(PAGE_SIZE).min(count);
    start..end
}

/// One page of results plus the counts needed to render paging controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult<'a> {
    pub projects: Vec<&'a Project>,
    /// Matching projects across all pages.
    pub total_count: usize,
    pub total_pages: usize,
    /// 1-based page actually shown (after clamping).
    pub page_number: usize,
    pub page_size: usize,
}

impl<'a> QueryResult<'a> {
    /// Build a page from a precomputed display order.
    #[must_use]
    pub fn from_order(all: &'a [Project], order: &[usize], page: usize) -> Self {
        let page = clamp_page(page, order.len());
        let projects = order[page_bounds(page, order.len())]
            .iter()
            .map(|&index| &all[index])
            .collect();
        Self {
            projects,
            total_count: order.len(),
            total_pages: total_pages(order.len()),
            page_number: page,
            page_size: PAGE_SIZE,
        }
    }

    /// 1-based position of the first project on this page (0 when empty).
    #[must_use]
    pub fn first_position(&self) -> usize {
        if self.projects.is_empty() {
            0
        } else {
            (self.page_number - 1) * self.page_size + 1
        }
    }

    /// 1-based position of the last project on this page (0 when empty).
    #[must_use]
    pub fn last_position(&self) -> usize {
        if self.projects.is_empty() {
            0
        } else {
            self.first_position() + self.projects.len() - 1
        }
    }

    #[must_use]
    pub const fn has_previous_page(&self) -> bool {
        self.page_number > 1
    }

    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.page_number < self.total_pages
    }

    /// `"Showing 1-9 of 20 projects"`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Showing {}-{} of {} projects",
            self.first_position(),
            self.last_position(),
            self.total_count
        )
    }
}

/// Filter, sort, and page `all` according to `state`.
#[must_use]
pub fn apply<'a>(all: &'a [Project], state: &QueryState) -> QueryResult<'a> {
    let order = filter_and_sort(all, state);
    QueryResult::from_order(all, &order, state.page)
}
