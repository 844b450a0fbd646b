//! `folio browse`: the interactive terminal browser.

use super::{AppContext, QueryArgs};
use crate::tui::browse::run_browse_tui;
use anyhow::Result;
use clap::Args;
use folio_core::{DataProvider, QueryPatch};
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct BrowseArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Page to open on.
    #[arg(short, long, default_value = "1")]
    pub page: usize,
}

pub fn run_browse(args: &BrowseArgs, ctx: &AppContext) -> Result<()> {
    let mut dashboard = ctx.dashboard();
    let mut provider: Option<Box<dyn DataProvider>> = ctx
        .provider()
        .map(|p| Box::new(p) as Box<dyn DataProvider>);

    let outcome = dashboard.load(provider.as_mut().map(|p| &mut **p as &mut dyn DataProvider));
    info!(?outcome, "browser loaded");
    dashboard.set_query_state(args.query.to_patch());
    dashboard.set_query_state(QueryPatch::page(args.page));

    run_browse_tui(dashboard, provider)
}
