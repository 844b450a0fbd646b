//! Data provider adapters and the built-in sample dataset.
//!
//! A provider hands the dashboard a raw table payload and, optionally,
//! host-side events. Loading is a two-step handshake: [`DataProvider::ready`]
//! then [`DataProvider::fetch_table`]. Failures in either step are reported
//! as [`FolioError`] and recovered by the dashboard.

use crate::error::{FolioError, NormalizationError};
use crate::model::Project;
use crate::normalize::normalize;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// A notification pushed by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// The host selected a record; carries the raw record.
    SelectionChanged(Value),
    /// The table contents changed; carries the fresh payload.
    TableChanged(Value),
}

/// Source of raw project payloads.
pub trait DataProvider {
    /// Short description for status lines, such as a file path.
    fn describe(&self) -> String;

    /// Connection handshake.
    ///
    /// # Errors
    ///
    /// Returns [`FolioError::AdapterConnect`] when the source cannot be
    /// reached.
    fn ready(&mut self) -> Result<(), FolioError>;

    /// Fetch the full table payload.
    ///
    /// # Errors
    ///
    /// Returns [`FolioError::AdapterConnect`] when the read fails and
    /// [`FolioError::Normalization`] when the payload is not JSON.
    fn fetch_table(&mut self) -> Result<Value, FolioError>;

    /// Drain pending host events. Providers without events return nothing.
    fn poll_events(&mut self) -> Vec<ProviderEvent> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// File provider
// ---------------------------------------------------------------------------

/// Reads a JSON payload from disk and reports edits as table changes.
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl FileProvider {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_modified: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    fn read_payload(&self) -> Result<Value, FolioError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            FolioError::AdapterConnect(format!("{}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| NormalizationError::InvalidJson(e.to_string()).into())
    }
}

impl DataProvider for FileProvider {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn ready(&mut self) -> Result<(), FolioError> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(FolioError::AdapterConnect(format!(
                "{} is not a file",
                self.path.display()
            ))),
            Err(e) => Err(FolioError::AdapterConnect(format!(
                "{}: {e}",
                self.path.display()
            ))),
        }
    }

    fn fetch_table(&mut self) -> Result<Value, FolioError> {
        self.last_modified = self.modified();
        self.read_payload()
    }

    fn poll_events(&mut self) -> Vec<ProviderEvent> {
        let Some(seen) = self.last_modified else {
            return Vec::new();
        };
        let current = self.modified();
        if current.is_none() || current == Some(seen) {
            return Vec::new();
        }
        self.last_modified = current;

        match self.read_payload() {
            Ok(payload) => {
                debug!(path = %self.path.display(), "payload file changed");
                vec![ProviderEvent::TableChanged(payload)]
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring unreadable payload change");
                Vec::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Static provider
// ---------------------------------------------------------------------------

/// Serves a payload held in memory, with an optional scripted event queue.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    payload: Value,
    failure: Option<String>,
    events: VecDeque<ProviderEvent>,
}

impl StaticProvider {
    #[must_use]
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            failure: None,
            events: VecDeque::new(),
        }
    }

    /// A provider whose handshake always fails with `reason`.
    #[must_use]
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            payload: Value::Null,
            failure: Some(reason.into()),
            events: VecDeque::new(),
        }
    }

    /// Queue an event for the next [`DataProvider::poll_events`].
    pub fn push_event(&mut self, event: ProviderEvent) {
        self.events.push_back(event);
    }
}

impl DataProvider for StaticProvider {
    fn describe(&self) -> String {
        "in-memory".to_string()
    }

    fn ready(&mut self) -> Result<(), FolioError> {
        self.failure
            .as_ref()
            .map_or(Ok(()), |reason| Err(FolioError::AdapterConnect(reason.clone())))
    }

    fn fetch_table(&mut self) -> Result<Value, FolioError> {
        self.ready()?;
        Ok(self.payload.clone())
    }

    fn poll_events(&mut self) -> Vec<ProviderEvent> {
        self.events.drain(..).collect()
    }
}

// ---------------------------------------------------------------------------
// Sample dataset
// ---------------------------------------------------------------------------

/// Raw rows of the illustrative dataset shown when no provider is usable.
#[must_use]
pub fn sample_payload() -> Value {
    json!([
        {
            "Project_Number": "P001",
            "Projects": "Website Redesign",
            "DELIVERABLES": "Website",
            "RECAPDELIVERABLES": "<ul><li>Full site redesign</li><li>Mobile optimization</li></ul>",
            "year": "2023",
            "NOTES": "Complete overhaul of existing website with modern design",
            "Client": "ACME Corp",
            "Category": "Digital",
            "ThreeD": "John Doe",
            "PM": "Jane Smith",
            "Developer": "Bob Johnson",
            "City": "New York",
            "Country": "USA",
            "Primary domain": "https://example.com",
            "Marketing_Slides": "https://slides.example.com/p1"
        },
        {
            "Project_Number": "P002",
            "Projects": "Marketing Campaign",
            "DELIVERABLES": "Video, Social",
            "RECAPDELIVERABLES": "<ul><li>60s commercial</li><li>Social media assets</li></ul>",
            "year": "2023",
            "NOTES": "Q4 marketing campaign for new product launch",
            "Client": "TechStart Inc",
            "Category": "Marketing",
            "CD": "Sarah Williams",
            "DP": "Michael Brown",
            "Editor": "Lisa Davis",
            "City": "San Francisco",
            "Country": "USA",
            "films_by_project": "https://videos.example.com/p2"
        },
        {
            "Project_Number": "P003",
            "Projects": "Brand Identity",
            "DELIVERABLES": "Brand Guide",
            "RECAPDELIVERABLES": "<ul><li>Logo design</li><li>Brand guidelines</li><li>Asset library</li></ul>",
            "year": "2022",
            "NOTES": "Complete brand refresh",
            "Client": "Global Ventures",
            "Category": "Branding",
            "Creative": "David Lee",
            "Brand": "Jessica Moore",
            "Design": "Kevin Wilson",
            "City": "London",
            "Country": "UK",
            "Marketing_Slides": "https://slides.example.com/p3"
        }
    ])
}

/// The sample dataset, normalized.
#[must_use]
pub fn sample_projects() -> Vec<Project> {
    normalize(&sample_payload()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinkKind, TeamRole};
    use std::time::Duration;

    #[test]
    fn sample_set_has_three_projects() {
        let projects = sample_projects();
        let ids: Vec<&str> = projects
            .iter()
            .map(|p| p.project_number.as_str())
            .collect();
        assert_eq!(ids, vec!["P001", "P002", "P003"]);

        let first = &projects[0];
        assert_eq!(first.name.as_deref(), Some("Website Redesign"));
        assert_eq!(first.client.as_deref(), Some("ACME Corp"));
        assert_eq!(first.year.as_deref(), Some("2023"));
        assert_eq!(first.location.country.as_deref(), Some("USA"));
        assert_eq!(first.team.get(&TeamRole::ThreeD).map(String::as_str), Some("John Doe"));
        assert_eq!(first.links[0].kind, LinkKind::PrimaryDomain);

        assert_eq!(projects[2].location.country.as_deref(), Some("UK"));
    }

    #[test]
    fn static_provider_serves_payload_and_events() {
        let mut provider = StaticProvider::new(json!([{ "Project_Number": "X1" }]));
        provider.ready().unwrap();
        assert_eq!(provider.fetch_table().unwrap(), json!([{ "Project_Number": "X1" }]));

        provider.push_event(ProviderEvent::SelectionChanged(json!({ "Project_Number": "X1" })));
        assert_eq!(provider.poll_events().len(), 1);
        assert!(provider.poll_events().is_empty());
    }

    #[test]
    fn unreachable_provider_fails_handshake() {
        let mut provider = StaticProvider::unreachable("socket closed");
        assert_eq!(
            provider.ready(),
            Err(FolioError::AdapterConnect("socket closed".into()))
        );
        assert!(provider.fetch_table().is_err());
    }

    #[test]
    fn missing_file_fails_handshake() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = FileProvider::new(dir.path().join("absent.json"));
        assert!(matches!(provider.ready(), Err(FolioError::AdapterConnect(_))));
    }

    #[test]
    fn invalid_json_is_a_normalization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let mut provider = FileProvider::new(&path);
        provider.ready().unwrap();
        assert!(matches!(
            provider.fetch_table(),
            Err(FolioError::Normalization(NormalizationError::InvalidJson(_)))
        ));
    }

    #[test]
    fn file_provider_reads_payload_and_stays_quiet_until_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        fs::write(&path, r#"[{"Project_Number":"F1"}]"#).unwrap();

        let mut provider = FileProvider::new(&path);
        assert!(provider.poll_events().is_empty());

        provider.ready().unwrap();
        let payload = provider.fetch_table().unwrap();
        assert_eq!(payload, json!([{ "Project_Number": "F1" }]));
        assert!(provider.poll_events().is_empty());
        assert_eq!(provider.describe(), path.display().to_string());
    }

    fn rewrite(path: &Path, content: &str, seconds_ahead: u64) {
        fs::write(path, content).unwrap();
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(seconds_ahead))
            .unwrap();
    }

    #[test]
    fn file_change_emits_one_table_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        fs::write(&path, r#"[{"Project_Number":"F1"}]"#).unwrap();

        let mut provider = FileProvider::new(&path);
        provider.ready().unwrap();
        provider.fetch_table().unwrap();

        rewrite(&path, r#"[{"Project_Number":"F1"},{"Project_Number":"F2"}]"#, 10);
        let events = provider.poll_events();
        assert_eq!(
            events,
            vec![ProviderEvent::TableChanged(json!([
                { "Project_Number": "F1" },
                { "Project_Number": "F2" }
            ]))]
        );
        assert!(provider.poll_events().is_empty());
    }

    #[test]
    fn unreadable_change_is_skipped_until_fixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        fs::write(&path, r#"[{"Project_Number":"F1"}]"#).unwrap();

        let mut provider = FileProvider::new(&path);
        provider.fetch_table().unwrap();

        rewrite(&path, "{ half written", 10);
        assert!(provider.poll_events().is_empty());
        assert!(provider.poll_events().is_empty());

        rewrite(&path, r#"[{"Project_Number":"F3"}]"#, 20);
        assert_eq!(
            provider.poll_events(),
            vec![ProviderEvent::TableChanged(json!([{ "Project_Number": "F3" }]))]
        );
    }
}
