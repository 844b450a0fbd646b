//! folio-core: a read-only project portfolio over loosely shaped table data.
//!
//! Raw payloads from a [`provider::DataProvider`] are decoded by
//! [`normalize`] into [`model::Project`] records, then filtered, sorted and
//! paged by [`query`]. The [`dashboard::Dashboard`] owns all of that state
//! and is what front ends talk to.
//!
//! # Conventions
//!
//! - **Errors**: typed [`error::FolioError`] in the library, `anyhow` at the
//!   config boundary.
//! - **Logging**: `tracing` macros only; subscribers are the caller's job.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod facets;
pub mod model;
pub mod navigator;
pub mod normalize;
pub mod provider;
pub mod query;
pub mod resolve;

pub use dashboard::{Dashboard, DetailView, LoadOutcome, LoadStatus, LoadTicket};
pub use error::{ErrorCode, FolioError, NormalizationError};
pub use facets::{Facet, FacetIndex};
pub use model::{Link, LinkKind, Location, Project, TeamRole};
pub use normalize::{Normalizer, PayloadShape};
pub use provider::{DataProvider, FileProvider, ProviderEvent, StaticProvider};
pub use query::{FacetSelection, PAGE_SIZE, QueryPatch, QueryResult, QueryState, SortKey};
