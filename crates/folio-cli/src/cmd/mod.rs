pub mod browse;
pub mod completions;
pub mod facets;
pub mod list;
pub mod show;

use crate::output::OutputMode;
use anyhow::Result;
use clap::Args;
use folio_core::config::ProjectConfig;
use folio_core::{Dashboard, DataProvider, Facet, FileProvider, QueryPatch, QueryState, SortKey};
use std::path::PathBuf;
use tracing::debug;

/// Everything a command needs from the global flags and config files.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: ProjectConfig,
    /// Payload file, from `--source` or `[source] path`.
    pub source: Option<PathBuf>,
    pub output: OutputMode,
}

impl AppContext {
    /// A dashboard configured from the project config, not yet loaded.
    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new()
            .with_normalizer(self.config.normalize.normalizer())
            .with_query_state(QueryState {
                sort: self.config.view.sort,
                ..QueryState::default()
            })
    }

    pub fn provider(&self) -> Option<FileProvider> {
        self.source.as_ref().map(FileProvider::new)
    }

    /// Build a dashboard, load it once and apply `query`.
    pub fn load(&self, query: &QueryArgs) -> Result<Dashboard> {
        let mut dashboard = self.dashboard();
        let mut provider = self.provider();
        let outcome = dashboard.load(provider.as_mut().map(|p| p as &mut dyn DataProvider));
        debug!(?outcome, "initial load");
        dashboard.set_query_state(query.to_patch());
        Ok(dashboard)
    }
}

/// Search, facet and sort flags shared by `list`, `show` and `browse`.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Case-insensitive text matched against name, client, deliverables and number.
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only projects for this client (repeatable).
    #[arg(long = "client", value_name = "CLIENT")]
    pub clients: Vec<String>,

    /// Only projects in this category (repeatable).
    #[arg(long = "category", value_name = "CATEGORY")]
    pub categories: Vec<String>,

    /// Only projects with this deliverables summary (repeatable).
    #[arg(long = "deliverable", value_name = "DELIVERABLE")]
    pub deliverables: Vec<String>,

    /// Only projects from this year (repeatable).
    #[arg(long = "year", value_name = "YEAR")]
    pub years: Vec<String>,

    /// Only projects in this country (repeatable).
    #[arg(long = "country", value_name = "COUNTRY")]
    pub countries: Vec<String>,

    /// Sort key: project_number, name, client, category, year, country, deliverables.
    #[arg(long, value_name = "KEY")]
    pub sort: Option<SortKey>,
}

impl QueryArgs {
    pub fn to_patch(&self) -> QueryPatch {
        let mut patch = QueryPatch {
            search: self.search.clone(),
            sort: self.sort,
            ..QueryPatch::default()
        };
        for (facet, values) in [
            (Facet::Client, &self.clients),
            (Facet::Category, &self.categories),
            (Facet::Deliverable, &self.deliverables),
            (Facet::Year, &self.years),
            (Facet::Country, &self.countries),
        ] {
            if !values.is_empty() {
                patch = patch.with_facet(facet, values.iter().cloned());
            }
        }
        patch
    }
}
