#![forbid(unsafe_code)]

mod cmd;
mod output;
mod tui;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::AppContext;
use folio_core::FolioError;
use folio_core::config::{self, ProjectConfig};
use output::{CliError, OutputMode};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "folio: browse a portfolio of projects from a table source",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Payload file to read projects from (JSON table, records or wrapper).
    #[arg(long, global = true, value_name = "PATH")]
    source: Option<PathBuf>,

    /// Project config file (default: .folio/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "List projects",
        long_about = "List one page of projects after search, facet filters and sort are applied.",
        after_help = "EXAMPLES:\n    # First page of every project\n    folio list\n\n    # 2023 projects in the UK, by client\n    folio list --year 2023 --country UK --sort client\n\n    # Second page as JSON\n    folio list --page 2 --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one project",
        long_about = "Show the full detail of one project, with its neighbors in the filtered list.",
        after_help = "EXAMPLES:\n    # Show a project\n    folio show P002\n\n    # Neighbors come from the filtered, sorted list\n    folio show P002 --year 2023 --sort client"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "List filter values",
        long_about = "List the distinct client, category, deliverable, year and country values.",
        after_help = "EXAMPLES:\n    # Every facet\n    folio facets\n\n    # Machine-readable\n    folio facets --format json"
    )]
    Facets,

    #[command(
        next_help_heading = "Interactive",
        about = "Browse projects in the terminal",
        long_about = "Open the interactive browser. Changes to the source file are picked up while it runs.",
        after_help = "EXAMPLES:\n    # Browse the configured source\n    folio browse\n\n    # Start from a filtered view\n    folio browse --source projects.json --search brand"
    )]
    Browse(cmd::browse::BrowseArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        long_about = "Generate shell completion scripts for bash, zsh, fish and others.",
        after_help = "EXAMPLES:\n    # Bash\n    folio completions bash > ~/.local/share/bash-completion/completions/folio"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FOLIO_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "folio=debug,info"
        } else {
            "folio=info,warn"
        })
    });

    let format = env::var("FOLIO_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Project config from `--config` or the project root, with failures
/// reported as [`FolioError::ConfigParse`].
fn load_project_config(cli: &Cli, project_root: &Path) -> Result<ProjectConfig, FolioError> {
    match cli.config {
        Some(ref path) => config::load_config_file(path),
        None => config::load_project_config(project_root),
    }
    .map_err(|err| FolioError::ConfigParse(format!("{err:#}")))
}

fn build_context(cli: &Cli) -> anyhow::Result<AppContext> {
    let project_root = env::current_dir()?;

    let user = config::load_user_config().unwrap_or_else(|err| {
        warn!("ignoring user config: {err:#}");
        config::UserConfig::default()
    });
    let output = output::resolve_output_mode(cli.format, cli.json, user.output.as_deref());

    let config = match load_project_config(cli, &project_root) {
        Ok(config) => config,
        Err(err) => {
            output::render_error(output, &CliError::from(&err))?;
            anyhow::bail!("{err}");
        }
    };

    let source = cli
        .source
        .clone()
        .or_else(|| config.source_path(&project_root));
    debug!(?source, ?output, "resolved context");

    Ok(AppContext {
        config,
        source,
        output,
    })
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    if let Commands::Completions(ref args) = cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let ctx = build_context(&cli)?;
    match cli.command {
        Commands::List(ref args) => cmd::list::run_list(args, &ctx),
        Commands::Show(ref args) => cmd::show::run_show(args, &ctx),
        Commands::Facets => cmd::facets::run_facets(&ctx),
        Commands::Browse(ref args) => cmd::browse::run_browse(args, &ctx),
        Commands::Completions(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_before_subcommand() {
        let cli = Cli::parse_from(["folio", "--json", "list"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::List(_)));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["folio", "facets", "--source", "p.json", "--format", "text"]);
        assert_eq!(cli.source, Some(PathBuf::from("p.json")));
        assert_eq!(cli.format, Some(OutputMode::Text));
        assert!(matches!(cli.command, Commands::Facets));
    }

    #[test]
    fn show_takes_project_number() {
        let cli = Cli::parse_from(["folio", "show", "P002"]);
        let Commands::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.project_number, "P002");
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["folio", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Bash,
            })
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["folio", "list"],
            vec!["folio", "list", "--page", "2", "--year", "2023"],
            vec!["folio", "show", "x"],
            vec!["folio", "facets"],
            vec!["folio", "browse", "--search", "brand"],
            vec!["folio", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(
                result.is_ok(),
                "Failed to parse: {:?} ({:?})",
                args,
                result.err()
            );
        }
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["folio", "--format", "yaml", "list"]).is_err());
    }

    #[test]
    fn broken_config_file_is_a_config_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(&path, "[view\nsort = ").unwrap();

        let cli = Cli::parse_from(["folio", "--config", path.to_str().unwrap(), "list"]);
        let err = load_project_config(&cli, dir.path()).unwrap_err();
        assert!(matches!(err, FolioError::ConfigParse(_)));
        assert_eq!(err.error_code().code(), "E3001");
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from(["folio", "list"]);
        let config = load_project_config(&cli, dir.path()).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
