//! `folio show`: full detail for one project, with its neighbors in the
//! filtered list.

use super::{AppContext, QueryArgs};
use crate::output::{
    CliError, pretty_kv, pretty_rule, pretty_section, render_error, render_mode, render_notice,
};
use anyhow::Result;
use clap::Args;
use folio_core::{DetailView, Project};
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Project number to show.
    pub project_number: String,

    #[command(flatten)]
    pub query: QueryArgs,
}

#[derive(Serialize)]
struct ShowReport<'a> {
    project: &'a Project,
    position: usize,
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<&'a str>,
}

impl<'a> From<DetailView<'a>> for ShowReport<'a> {
    fn from(view: DetailView<'a>) -> Self {
        Self {
            project: view.project,
            position: view.position,
            total: view.total,
            previous: view.previous.map(|p| p.project_number.as_str()),
            next: view.next.map(|p| p.project_number.as_str()),
        }
    }
}

pub fn run_show(args: &ShowArgs, ctx: &AppContext) -> Result<()> {
    let mut dashboard = ctx.load(&args.query)?;
    render_notice(ctx.output, dashboard.notice());

    if let Err(err) = dashboard.open_detail(&args.project_number) {
        render_error(ctx.output, &CliError::from(&err))?;
        anyhow::bail!("{err}");
    }
    let Some(view) = dashboard.detail() else {
        anyhow::bail!("detail view did not open for {}", args.project_number);
    };

    render_mode(
        ctx.output,
        &ShowReport::from(view),
        render_show_text,
        render_show_human,
    )
}

fn or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.unwrap_or(fallback)
}

fn render_show_human(report: &ShowReport<'_>, w: &mut dyn Write) -> std::io::Result<()> {
    let project = report.project;
    pretty_section(w, &format!("Project {}", project.project_number))?;
    writeln!(w, "{}", project.display_name())?;
    pretty_rule(w)?;
    pretty_kv(w, "client", or(project.client.as_deref(), "Unknown Client"))?;
    pretty_kv(w, "category", or(project.category.as_deref(), "N/A"))?;
    pretty_kv(w, "year", or(project.year.as_deref(), "N/A"))?;
    pretty_kv(w, "deliverables", or(project.deliverables_summary.as_deref(), "N/A"))?;
    pretty_kv(
        w,
        "location",
        project
            .location
            .display_line()
            .unwrap_or_else(|| "Location unknown".to_string()),
    )?;
    if let Some((lat, lon)) = project.location.coordinates() {
        pretty_kv(w, "coordinates", format!("{lat:.4}, {lon:.4}"))?;
    }

    if !project.team.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Team")?;
        for (role, name) in project.team_members() {
            pretty_kv(w, role.label(), name)?;
        }
    }

    if let Some(ref html) = project.deliverables_detail_html {
        writeln!(w)?;
        pretty_section(w, "Deliverables")?;
        for line in html_to_lines(html) {
            writeln!(w, "{line}")?;
        }
    }

    writeln!(w)?;
    pretty_section(w, "Notes")?;
    writeln!(w, "{}", or(project.notes.as_deref(), "No notes available"))?;

    if !project.links.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Links")?;
        for link in &project.links {
            writeln!(w, "{}  {}", link.label, link.url)?;
        }
    }

    writeln!(w)?;
    pretty_rule(w)?;
    writeln!(
        w,
        "{} of {}   prev: {}   next: {}",
        report.position,
        report.total,
        report.previous.unwrap_or("-"),
        report.next.unwrap_or("-")
    )
}

fn render_show_text(report: &ShowReport<'_>, w: &mut dyn Write) -> std::io::Result<()> {
    let project = report.project;
    writeln!(w, "project_number: {}", project.project_number)?;
    writeln!(w, "name: {}", project.display_name())?;
    writeln!(w, "client: {}", or(project.client.as_deref(), "Unknown Client"))?;
    writeln!(w, "category: {}", or(project.category.as_deref(), "N/A"))?;
    writeln!(w, "year: {}", or(project.year.as_deref(), "N/A"))?;
    writeln!(
        w,
        "location: {}",
        project
            .location
            .display_line()
            .unwrap_or_else(|| "Location unknown".to_string())
    )?;
    for (role, name) in project.team_members() {
        writeln!(w, "team.{role}: {name}")?;
    }
    for link in &project.links {
        writeln!(w, "link: {}", link.url)?;
    }
    writeln!(w, "position: {}/{}", report.position, report.total)?;
    if let Some(previous) = report.previous {
        writeln!(w, "previous: {previous}")?;
    }
    if let Some(next) = report.next {
        writeln!(w, "next: {next}")?;
    }
    Ok(())
}

/// Flatten a small HTML fragment into display lines. List items become
/// `- ` bullets; every other tag is dropped.
fn html_to_lines(html: &str) -> Vec<String> {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        text.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('>') else {
            rest = &rest[start..];
            break;
        };
        let tag = rest[start + 1..start + end].trim().to_ascii_lowercase();
        if tag == "li" || tag.starts_with("li ") {
            text.push_str("\n- ");
        } else if matches!(tag.as_str(), "br" | "br/" | "br /" | "/p" | "/li" | "/ul" | "/ol") {
            text.push('\n');
        }
        rest = &rest[start + end + 1..];
    }
    text.push_str(rest);

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != "-")
        .map(str::to_string)
        .collect()
}
