use crate::normalize::{DEFAULT_ANCHOR_COLUMNS, Normalizer};
use crate::query::SortKey;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Project config file, relative to the project root.
pub const PROJECT_CONFIG_PATH: &str = ".folio/config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Payload file. Relative paths resolve against the project root.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub sort: SortKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeConfig {
    #[serde(default = "default_anchor_columns")]
    pub anchor_columns: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            anchor_columns: default_anchor_columns(),
        }
    }
}

impl NormalizeConfig {
    #[must_use]
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::with_anchor_columns(self.anchor_columns.clone())
    }
}

impl ProjectConfig {
    /// The configured source path, resolved against `root`.
    #[must_use]
    pub fn source_path(&self, root: &Path) -> Option<PathBuf> {
        self.source.path.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                root.join(path)
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// Load `.folio/config.toml` under `project_root`, or defaults when absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PROJECT_CONFIG_PATH);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }
    load_config_file(&path)
}

/// Load a project config from an explicit path. The file must exist.
///
/// # Errors
///
/// Fails when the file cannot be read or parsed.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load `<config_dir>/folio/config.toml`, or defaults when absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("folio/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Canonical output mode name, accepting legacy aliases.
#[must_use]
pub fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" | "plain" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

/// Pick the output mode when no explicit CLI flag was given.
///
/// Precedence: `FORMAT` env, user config, then pretty on a terminal and
/// text otherwise. Unrecognized values are skipped.
#[must_use]
pub fn resolve_output(env_format: Option<&str>, user_output: Option<&str>) -> &'static str {
    resolve_output_inner(env_format, user_output, std::io::stdout().is_terminal())
}

fn resolve_output_inner(
    env_format: Option<&str>,
    user_output: Option<&str>,
    is_tty: bool,
) -> &'static str {
    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode;
    }
    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode;
    }
    if is_tty { "pretty" } else { "text" }
}

fn default_anchor_columns() -> Vec<String> {
    DEFAULT_ANCHOR_COLUMNS.map(str::to_string).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn make_temp_dir(label: &str) -> std::path::PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "folio-config-test-{label}-{}-{id}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("temp dir must be created");
        dir
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = make_temp_dir("project-default");
        let cfg = load_project_config(&root).expect("load should succeed");
        assert_eq!(cfg.source.path, None);
        assert_eq!(cfg.view.sort, SortKey::Name);
        assert_eq!(
            cfg.normalize.anchor_columns,
            vec!["id", "Project_Number", "Projects"]
        );
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn project_config_parses_all_sections() {
        let root = make_temp_dir("project-full");
        std::fs::create_dir_all(root.join(".folio")).expect("create .folio");
        std::fs::write(
            root.join(PROJECT_CONFIG_PATH),
            r#"
[source]
path = "data/projects.json"

[view]
sort = "client"

[normalize]
anchor_columns = ["Code"]
"#,
        )
        .expect("write config");

        let cfg = load_project_config(&root).expect("load should succeed");
        assert_eq!(cfg.view.sort, SortKey::Client);
        assert_eq!(cfg.normalize.anchor_columns, vec!["Code"]);
        assert_eq!(
            cfg.source_path(&root),
            Some(root.join("data/projects.json"))
        );
        assert_eq!(cfg.normalize.normalizer().anchor_columns(), ["Code"]);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let cfg: ProjectConfig = toml::from_str("[view]\n").expect("parse");
        assert_eq!(cfg.view.sort, SortKey::Name);
        assert_eq!(cfg.normalize, NormalizeConfig::default());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let root = make_temp_dir("project-bad");
        std::fs::create_dir_all(root.join(".folio")).expect("create .folio");
        std::fs::write(root.join(PROJECT_CONFIG_PATH), "[view]\nsort = 42\n")
            .expect("write config");

        let err = load_project_config(&root).expect_err("parse should fail");
        assert!(format!("{err:#}").contains("Failed to parse"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn absolute_source_path_is_kept() {
        let cfg = ProjectConfig {
            source: SourceConfig {
                path: Some(PathBuf::from("/srv/projects.json")),
            },
            ..ProjectConfig::default()
        };
        assert_eq!(
            cfg.source_path(Path::new("/home/someone")),
            Some(PathBuf::from("/srv/projects.json"))
        );
    }

    #[test]
    fn env_beats_user_config() {
        assert_eq!(resolve_output_inner(Some("json"), Some("pretty"), true), "json");
    }

    #[test]
    fn legacy_aliases_are_normalized() {
        assert_eq!(resolve_output_inner(None, Some("human"), false), "pretty");
        assert_eq!(resolve_output_inner(Some("table"), None, true), "text");
    }

    #[test]
    fn unknown_values_fall_through_to_tty_detection() {
        assert_eq!(resolve_output_inner(Some("yaml"), Some("xml"), true), "pretty");
        assert_eq!(resolve_output_inner(None, None, false), "text");
    }

    #[test]
    fn user_config_parses_output() {
        let cfg: UserConfig = toml::from_str("output = \"json\"\n").expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
    }
}
