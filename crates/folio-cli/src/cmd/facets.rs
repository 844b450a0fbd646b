//! `folio facets`: the distinct filter values across the whole project set.

use super::{AppContext, QueryArgs};
use crate::output::{pretty_section, render_mode, render_notice};
use anyhow::Result;
use folio_core::{Facet, FacetIndex};
use std::io::Write;

pub fn run_facets(ctx: &AppContext) -> Result<()> {
    let dashboard = ctx.load(&QueryArgs::default())?;
    render_notice(ctx.output, dashboard.notice());
    render_mode(
        ctx.output,
        dashboard.facet_options(),
        render_facets_text,
        render_facets_human,
    )
}

fn render_facets_text(index: &FacetIndex, w: &mut dyn Write) -> std::io::Result<()> {
    for facet in Facet::ALL {
        for value in index.options(facet) {
            writeln!(w, "{facet}\t{value}")?;
        }
    }
    Ok(())
}

fn render_facets_human(index: &FacetIndex, w: &mut dyn Write) -> std::io::Result<()> {
    for (i, facet) in Facet::ALL.into_iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        let options = index.options(facet);
        pretty_section(w, &format!("{} ({})", capitalize(facet.plural()), options.len()))?;
        if options.is_empty() {
            writeln!(w, "(none)")?;
        }
        for value in options {
            writeln!(w, "  {value}")?;
        }
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
