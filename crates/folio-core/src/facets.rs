//! Filterable project attributes and their distinct values.

use crate::model::Project;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One user-selectable filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Client,
    Category,
    Deliverable,
    Year,
    Country,
}

impl Facet {
    pub const ALL: [Self; 5] = [
        Self::Client,
        Self::Category,
        Self::Deliverable,
        Self::Year,
        Self::Country,
    ];

    /// The project's value for this facet, if any.
    #[must_use]
    pub fn value_of(self, project: &Project) -> Option<&str> {
        match self {
            Self::Client => project.client.as_deref(),
            Self::Category => project.category.as_deref(),
            Self::Deliverable => project.deliverables_summary.as_deref(),
            Self::Year => project.year.as_deref(),
            Self::Country => project.location.country.as_deref(),
        }
    }

    /// Plural heading used by facet pickers.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Client => "clients",
            Self::Category => "categories",
            Self::Deliverable => "deliverables",
            Self::Year => "years",
            Self::Country => "countries",
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Category => "category",
            Self::Deliverable => "deliverable",
            Self::Year => "year",
            Self::Country => "country",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sorted distinct values per facet across the full project set.
///
/// Built from the complete list, never from a filtered subset, so the
/// options stay stable while the user narrows the view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetIndex {
    pub clients: Vec<String>,
    pub categories: Vec<String>,
    pub deliverables: Vec<String>,
    pub years: Vec<String>,
    pub countries: Vec<String>,
}

impl FacetIndex {
    #[must_use]
    pub fn build(projects: &[Project]) -> Self {
        let distinct = |facet: Facet| -> Vec<String> {
            projects
                .iter()
                .filter_map(|project| facet.value_of(project))
                .filter(|value| !value.is_empty())
                .collect::<BTreeSet<&str>>()
                .into_iter()
                .map(str::to_string)
                .collect()
        };

        Self {
            clients: distinct(Facet::Client),
            categories: distinct(Facet::Category),
            deliverables: distinct(Facet::Deliverable),
            years: distinct(Facet::Year),
            countries: distinct(Facet::Country),
        }
    }

    #[must_use]
    pub fn options(&self, facet: Facet) -> &[String] {
        match facet {
            Facet::Client => &self.clients,
            Facet::Category => &self.categories,
            Facet::Deliverable => &self.deliverables,
            Facet::Year => &self.years,
            Facet::Country => &self.countries,
        }
    }

    /// Options of `facet` whose text contains `term`, ignoring case. An
    /// empty term keeps every option.
    #[must_use]
    pub fn matching(&self, facet: Facet, term: &str) -> Vec<&str> {
        let needle = term.to_lowercase();
        self.options(facet)
            .iter()
            .filter(|value| value.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        Facet::ALL
            .into_iter()
            .all(|facet| self.options(facet).is_empty())
    }
}
