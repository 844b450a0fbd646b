//! Payload decoding and projection into [`Project`] records.
//!
//! A provider payload comes in one of four shapes. [`PayloadShape::detect`]
//! tries each as a fallible parse, in priority order, and keeps the first
//! that fits:
//!
//! ```text
//! Columnar   { "id": [1, 2], "Client": ["A", "B"], ... }
//! Rows       [ { "Client": "A" }, { "Client": "B" } ]
//! Wrapped    { "records": [ ... ] }   or   { "data": [ ... ] }
//! Scanned    { "anything": [ ... ] }  (first non-empty array property)
//! ```
//!
//! Each decoded row then goes through the field resolver once per canonical
//! column. Rows without an identity get a positional `P<n>` fallback.

use crate::error::NormalizationError;
use crate::model::{Link, LinkKind, Location, Project, TeamRole};
use crate::resolve::{resolve_number, resolve_text};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::debug;

/// Column names that mark a payload as columnar when they hold an array.
pub const DEFAULT_ANCHOR_COLUMNS: [&str; 3] = ["id", "Project_Number", "Projects"];

/// Source column for the project identity.
pub const IDENTITY_COLUMN: &str = "Project_Number";

const WRAPPER_KEYS: [&str; 2] = ["records", "data"];

/// Link columns in display order. `Neoshare` is the legacy spelling of the
/// `Neoshare_URL` column.
const LINK_COLUMNS: [(LinkKind, &[&str], &str); 7] = [
    (LinkKind::PrimaryDomain, &["Primary domain"], ""),
    (LinkKind::Website, &["Website_URL"], "Website"),
    (LinkKind::Vimeo, &["Vimeo_URL"], "Vimeo"),
    (LinkKind::YouTube, &["YouTube_URL"], "YouTube"),
    (LinkKind::Neoshare, &["Neoshare_URL", "Neoshare"], "Neoshare"),
    (LinkKind::MarketingSlides, &["Marketing_Slides"], "Marketing Slides"),
    (LinkKind::Films, &["films_by_project"], "Films"),
];

const ADDITIONAL_LINKS_COLUMN: &str = "Additional_Links";

/// The record layout detected in a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadShape<'a> {
    /// Parallel arrays keyed by column name.
    Columnar {
        columns: &'a Map<String, Value>,
        row_count: usize,
    },
    /// The payload is the row sequence.
    Rows(&'a [Value]),
    /// Rows held under a well-known wrapper key.
    Wrapped {
        key: &'static str,
        rows: &'a [Value],
    },
    /// Rows found in the first non-empty array property.
    Scanned { key: &'a str, rows: &'a [Value] },
}

impl<'a> PayloadShape<'a> {
    /// Decode `payload`, trying every known shape in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizationError::UnrecognizedShape`] when no shape fits.
    pub fn detect<S: AsRef<str>>(
        payload: &'a Value,
        anchors: &[S],
    ) -> Result<Self, NormalizationError> {
        Self::try_columnar(payload, anchors)
            .or_else(|| Self::try_rows(payload))
            .or_else(|| Self::try_wrapped(payload))
            .or_else(|| Self::try_scanned(payload))
            .ok_or(NormalizationError::UnrecognizedShape {
                found: json_type(payload),
            })
    }

    fn try_columnar<S: AsRef<str>>(payload: &'a Value, anchors: &[S]) -> Option<Self> {
        let columns = payload.as_object()?;
        let row_count = anchors
            .iter()
            .find_map(|anchor| columns.get(anchor.as_ref()).and_then(Value::as_array))?
            .len();
        Some(Self::Columnar { columns, row_count })
    }

    fn try_rows(payload: &'a Value) -> Option<Self> {
        payload.as_array().map(|rows| Self::Rows(rows))
    }

    fn try_wrapped(payload: &'a Value) -> Option<Self> {
        let obj = payload.as_object()?;
        WRAPPER_KEYS.into_iter().find_map(|key| {
            obj.get(key)
                .and_then(Value::as_array)
                .map(|rows| Self::Wrapped { key, rows })
        })
    }

    fn try_scanned(payload: &'a Value) -> Option<Self> {
        payload.as_object()?.iter().find_map(|(key, value)| {
            value
                .as_array()
                .filter(|rows| !rows.is_empty())
                .map(|rows| Self::Scanned {
                    key: key.as_str(),
                    rows,
                })
        })
    }

    /// Short name of the shape, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Columnar { .. } => "columnar",
            Self::Rows(_) => "rows",
            Self::Wrapped { .. } => "wrapped",
            Self::Scanned { .. } => "scanned",
        }
    }

    /// Number of rows the shape will yield.
    #[must_use]
    pub fn row_count(&self) -> usize {
        match *self {
            Self::Columnar { row_count, .. } => row_count,
            Self::Rows(rows) | Self::Wrapped { rows, .. } | Self::Scanned { rows, .. } => {
                rows.len()
            }
        }
    }

    /// Materialize the row records. Columnar rows are assembled on the fly;
    /// every other shape borrows from the payload.
    #[must_use]
    pub fn rows(&self) -> Vec<Cow<'a, Value>> {
        match *self {
            Self::Columnar { columns, row_count } => (0..row_count)
                .map(|index| Cow::Owned(columnar_row(columns, index)))
                .collect(),
            Self::Rows(rows) | Self::Wrapped { rows, .. } | Self::Scanned { rows, .. } => {
                rows.iter().map(Cow::Borrowed).collect()
            }
        }
    }
}

fn columnar_row(columns: &Map<String, Value>, index: usize) -> Value {
    let row: Map<String, Value> = columns
        .iter()
        .filter_map(|(key, column)| {
            column
                .as_array()
                .and_then(|cells| cells.get(index))
                .map(|cell| (key.clone(), cell.clone()))
        })
        .collect();
    Value::Object(row)
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Converts raw payloads into project lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    anchor_columns: Vec<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            anchor_columns: DEFAULT_ANCHOR_COLUMNS.map(str::to_string).to_vec(),
        }
    }
}

impl Normalizer {
    /// Use a custom set of columnar anchor columns. An empty list falls back
    /// to [`DEFAULT_ANCHOR_COLUMNS`].
    #[must_use]
    pub fn with_anchor_columns(anchor_columns: Vec<String>) -> Self {
        if anchor_columns.is_empty() {
            Self::default()
        } else {
            Self { anchor_columns }
        }
    }

    #[must_use]
    pub fn anchor_columns(&self) -> &[String] {
        &self.anchor_columns
    }

    /// Decode `payload` and project every row.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizationError`] when the payload has no recognizable
    /// record shape.
    pub fn normalize(&self, payload: &Value) -> Result<Vec<Project>, NormalizationError> {
        let shape = PayloadShape::detect(payload, &self.anchor_columns)?;
        debug!(
            shape = shape.name(),
            rows = shape.row_count(),
            "decoded payload"
        );

        Ok(shape
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| project_from_row(row, index + 1))
            .collect())
    }
}

/// Normalize with the default anchor columns.
///
/// # Errors
///
/// See [`Normalizer::normalize`].
pub fn normalize(payload: &Value) -> Result<Vec<Project>, NormalizationError> {
    Normalizer::default().normalize(payload)
}

/// Build one project from a row record. `position` is 1-based and only used
/// for the identity fallback.
#[must_use]
pub fn project_from_row(row: &Value, position: usize) -> Project {
    let project_number =
        resolve_text(row, IDENTITY_COLUMN).unwrap_or_else(|| format!("P{position}"));

    let team: BTreeMap<TeamRole, String> = TeamRole::ALL
        .into_iter()
        .filter_map(|role| resolve_text(row, role.source_column()).map(|name| (role, name)))
        .collect();

    Project {
        project_number,
        name: resolve_text(row, "Projects"),
        client: resolve_text(row, "Client"),
        category: resolve_text(row, "Category"),
        year: resolve_text(row, "year"),
        notes: resolve_text(row, "NOTES"),
        deliverables_summary: resolve_text(row, "DELIVERABLES"),
        deliverables_detail_html: resolve_text(row, "RECAPDELIVERABLES"),
        team,
        location: Location {
            city: resolve_text(row, "City"),
            state: resolve_text(row, "State"),
            country: resolve_text(row, "Country"),
            address: resolve_text(row, "Address"),
            latitude: resolve_number(row, "Latitude"),
            longitude: resolve_number(row, "Longitude"),
        },
        links: links_from_row(row),
    }
}

fn links_from_row(row: &Value) -> Vec<Link> {
    let mut links: Vec<Link> = LINK_COLUMNS
        .iter()
        .filter_map(|(kind, columns, label)| {
            let url = columns.iter().find_map(|column| resolve_text(row, column))?;
            let label = if label.is_empty() {
                url.clone()
            } else {
                (*label).to_string()
            };
            Some(Link {
                kind: *kind,
                label,
                url,
            })
        })
        .collect();

    if let Some(raw) = resolve_text(row, ADDITIONAL_LINKS_COLUMN) {
        links.extend(additional_links(&raw));
    }
    links
}

/// Split a free-form link cell on commas and newlines.
#[must_use]
pub fn additional_links(raw: &str) -> Vec<Link> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let url = if entry.starts_with("http") {
                entry.to_string()
            } else {
                format!("https://{entry}")
            };
            let label = url::Url::parse(&url)
                .ok()
                .and_then(|parsed| parsed.host_str().map(str::to_string))
                .unwrap_or_else(|| entry.to_string());
            Link {
                kind: LinkKind::Additional,
                label,
                url,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn columnar_takes_priority_over_wrappers() {
        let payload = json!({
            "id": [1, 2],
            "Client": ["A", "B"],
            "records": [{ "Client": "ignored" }]
        });
        let shape = PayloadShape::detect(&payload, &DEFAULT_ANCHOR_COLUMNS).unwrap();
        assert_eq!(shape.name(), "columnar");
        assert_eq!(shape.row_count(), 2);
    }

    #[test]
    fn columnar_rows_pick_index_from_every_array() {
        let payload = json!({
            "id": [1, 2, 3],
            "Client": ["A", "B", "C"],
            "Country": ["UK", "FR"],
            "tableId": "Projects"
        });
        let projects = normalize(&payload).unwrap();
        assert_eq!(projects.len(), 3);
        assert_eq!(projects[1].client.as_deref(), Some("B"));
        assert_eq!(projects[1].location.country.as_deref(), Some("FR"));
        assert_eq!(projects[2].location.country, None);
        assert_eq!(projects[0].project_number, "P1");
    }

    #[test]
    fn wrapped_records_preferred_over_data() {
        let payload = json!({
            "data": [{ "Project_Number": "D1" }],
            "records": [{ "Project_Number": "R1" }, { "Project_Number": "R2" }]
        });
        let shape = PayloadShape::detect(&payload, &DEFAULT_ANCHOR_COLUMNS).unwrap();
        assert!(matches!(shape, PayloadShape::Wrapped { key: "records", .. }));
        assert_eq!(normalize(&payload).unwrap().len(), 2);
    }

    #[test]
    fn scan_takes_first_non_empty_array_in_payload_order() {
        let payload = json!({
            "empty": [],
            "zrows": [{ "Project_Number": "Z1" }],
            "arows": [{ "Project_Number": "A1" }]
        });
        let shape = PayloadShape::detect(&payload, &DEFAULT_ANCHOR_COLUMNS).unwrap();
        assert_eq!(
            shape,
            PayloadShape::Scanned {
                key: "zrows",
                rows: payload["zrows"].as_array().unwrap()
            }
        );
    }

    #[test]
    fn unrecognized_shapes_are_errors() {
        assert_eq!(
            normalize(&json!({ "tableId": "x", "empty": [] })),
            Err(NormalizationError::UnrecognizedShape { found: "object" })
        );
        assert_eq!(
            normalize(&json!("rows")),
            Err(NormalizationError::UnrecognizedShape { found: "string" })
        );
    }

    #[test]
    fn empty_direct_array_is_an_empty_project_list() {
        assert_eq!(normalize(&json!([])).unwrap(), Vec::new());
    }

    #[test]
    fn custom_anchor_columns() {
        let payload = json!({ "Name": ["a", "b"], "Client": ["x", "y"] });

        // Without a matching anchor the scan picks up the bare `Name` strings.
        let scanned = normalize(&payload).unwrap();
        assert_eq!(scanned.len(), 2);
        assert!(scanned.iter().all(|p| p.client.is_none()));

        let normalizer = Normalizer::with_anchor_columns(vec!["Name".into()]);
        let projects = normalizer.normalize(&payload).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1].client.as_deref(), Some("y"));
    }

    #[test]
    fn project_fields_are_mapped() {
        let row = json!({
            "Project_Number": "P001",
            "Projects": "Website Redesign",
            "DELIVERABLES": "Website",
            "RECAPDELIVERABLES": "<ul><li>Full site</li></ul>",
            "year": 2023,
            "NOTES": "Overhaul",
            "Client": "ACME Corp",
            "Category": "Digital",
            "ThreeD": "John Doe",
            "PM": "Jane Smith",
            "Sales": "  ",
            "City": "New York",
            "Country": "USA",
            "Latitude": 40.7,
            "Longitude": "-74.0"
        });
        let project = project_from_row(&row, 1);
        assert_eq!(project.project_number, "P001");
        assert_eq!(project.display_name(), "Website Redesign");
        assert_eq!(project.year.as_deref(), Some("2023"));
        assert_eq!(project.deliverables_summary.as_deref(), Some("Website"));
        assert_eq!(project.team.len(), 2);
        assert_eq!(project.team[&TeamRole::ThreeD], "John Doe");
        assert!(!project.team.contains_key(&TeamRole::Sales));
        assert_eq!(project.location.coordinates(), Some((40.7, -74.0)));
    }

    #[test]
    fn links_follow_display_order_and_labels() {
        let row = json!({
            "Marketing_Slides": "https://slides.example.com/p1",
            "Primary domain": "https://example.com",
            "Neoshare": "https://neo.example.com/legacy"
        });
        let links = links_from_row(&row);
        let kinds: Vec<LinkKind> = links.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LinkKind::PrimaryDomain,
                LinkKind::Neoshare,
                LinkKind::MarketingSlides
            ]
        );
        assert_eq!(links[0].label, "https://example.com");
        assert_eq!(links[1].label, "Neoshare");
    }

    #[test]
    fn neoshare_url_column_beats_legacy_column() {
        let row = json!({
            "Neoshare_URL": "https://neo.example.com/new",
            "Neoshare": "https://neo.example.com/legacy"
        });
        let links = links_from_row(&row);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://neo.example.com/new");
    }

    #[test]
    fn additional_links_are_split_and_labelled_by_host() {
        let links = additional_links("example.org/a, https://cdn.example.net/x\n\n ,");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://example.org/a");
        assert_eq!(links[0].label, "example.org");
        assert_eq!(links[1].label, "cdn.example.net");
        assert!(links.iter().all(|l| l.kind == LinkKind::Additional));
    }
}
