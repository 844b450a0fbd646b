//! Terminal user interface (TUI) for folio.
//!
//! ## Entry points
//!
//! - [`browse::run_browse_tui`]: interactive project list with search, facet
//!   filters, paging and a detail pane.

pub mod browse;
