//! `folio list`: one page of the filtered, sorted project list.

use super::{AppContext, QueryArgs};
use crate::output::{pretty_rule, pretty_section, render_mode, render_notice};
use anyhow::Result;
use clap::Args;
use folio_core::{Project, QueryPatch, QueryResult};
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Page to show (1-based, clamped to the available pages).
    #[arg(short, long, default_value = "1")]
    pub page: usize,
}

#[derive(Serialize)]
struct ListReport<'a> {
    #[serde(flatten)]
    result: QueryResult<'a>,
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'a str>,
}

pub fn run_list(args: &ListArgs, ctx: &AppContext) -> Result<()> {
    let mut dashboard = ctx.load(&args.query)?;
    dashboard.set_query_state(QueryPatch::page(args.page));

    render_notice(ctx.output, dashboard.notice());
    let result = dashboard.visible_projects();
    let report = ListReport {
        summary: result.summary(),
        result,
        notice: dashboard.notice(),
    };

    render_mode(ctx.output, &report, render_list_text, render_list_human)
}

fn cell(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn render_list_text(report: &ListReport<'_>, w: &mut dyn Write) -> std::io::Result<()> {
    if !report.result.projects.is_empty() {
        writeln!(w, "project_number\tname\tclient\tyear\tcountry")?;
    }
    for project in &report.result.projects {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            project.project_number,
            cell(project.name.as_deref()),
            cell(project.client.as_deref()),
            cell(project.year.as_deref()),
            cell(project.location.country.as_deref()),
        )?;
    }
    writeln!(w, "{}", report.summary)
}

fn render_list_human(report: &ListReport<'_>, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(
        w,
        &format!(
            "Projects (page {} of {})",
            report.result.page_number,
            report.result.total_pages.max(1)
        ),
    )?;
    if report.result.projects.is_empty() {
        writeln!(w, "No projects match the current filters.")?;
    }
    for project in &report.result.projects {
        render_row(project, w)?;
    }
    pretty_rule(w)?;
    writeln!(w, "{}", report.summary)
}

fn render_row(project: &Project, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "{:<10} {:<32} {:<22} {:<6} {}",
        project.project_number,
        truncate(project.display_name(), 32),
        truncate(cell(project.client.as_deref()), 22),
        cell(project.year.as_deref()),
        cell(project.location.country.as_deref()),
    )
}

/// Cut `s` to at most `width` characters, marking the cut with `~`.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use folio_core::provider::sample_projects;
    use folio_core::query::{QueryState, apply};

    #[test]
    fn list_args_defaults() {
        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: ListArgs,
        }
        let w = Wrapper::parse_from(["test"]);
        assert_eq!(w.args.page, 1);
        assert!(w.args.query.search.is_none());
        assert!(w.args.query.years.is_empty());
    }

    #[test]
    fn truncate_marks_long_values() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd~");
    }

    #[test]
    fn text_rows_are_tab_separated() {
        let projects = sample_projects();
        let result = apply(&projects, &QueryState::default());
        let report = ListReport {
            summary: result.summary(),
            result,
            notice: None,
        };
        let mut buf = Vec::new();
        render_list_text(&report, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "project_number\tname\tclient\tyear\tcountry");
        assert_eq!(lines[1], "P003\tBrand Identity\tGlobal Ventures\t2022\tUK");
        assert_eq!(lines[4], "Showing 1-3 of 3 projects");
    }

    #[test]
    fn pretty_output_reports_empty_pages() {
        let result = apply(&[], &QueryState::default());
        let report = ListReport {
            summary: result.summary(),
            result,
            notice: None,
        };
        let mut buf = Vec::new();
        render_list_human(&report, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.starts_with("Projects (page 1 of 1)"));
        assert!(out.contains("No projects match"));
    }
}
