use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

/// Team roles, declared in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TeamRole {
    Sales,
    Pm,
    Developer,
    Design,
    ThreeD,
    Cd,
    Ad,
    Creative,
    Brand,
    Dp,
    Editor,
    Vfx,
    Mograph,
}

impl TeamRole {
    pub const ALL: [Self; 13] = [
        Self::Sales,
        Self::Pm,
        Self::Developer,
        Self::Design,
        Self::ThreeD,
        Self::Cd,
        Self::Ad,
        Self::Creative,
        Self::Brand,
        Self::Dp,
        Self::Editor,
        Self::Vfx,
        Self::Mograph,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Pm => "pm",
            Self::Developer => "developer",
            Self::Design => "design",
            Self::ThreeD => "threeD",
            Self::Cd => "cd",
            Self::Ad => "ad",
            Self::Creative => "creative",
            Self::Brand => "brand",
            Self::Dp => "dp",
            Self::Editor => "editor",
            Self::Vfx => "vfx",
            Self::Mograph => "mograph",
        }
    }

    /// Column name the role is read from in source records.
    #[must_use]
    pub const fn source_column(self) -> &'static str {
        match self {
            Self::Sales => "Sales",
            Self::Pm => "PM",
            Self::Developer => "Developer",
            Self::Design => "Design",
            Self::ThreeD => "ThreeD",
            Self::Cd => "CD",
            Self::Ad => "AD",
            Self::Creative => "Creative",
            Self::Brand => "Brand",
            Self::Dp => "DP",
            Self::Editor => "Editor",
            Self::Vfx => "VFX",
            Self::Mograph => "Mograph",
        }
    }

    /// Upper-case label shown next to the person's name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sales => "SALES",
            Self::Pm => "PM",
            Self::Developer => "DEVELOPER",
            Self::Design => "DESIGNER",
            Self::ThreeD => "3D",
            Self::Cd => "CD",
            Self::Ad => "AD",
            Self::Creative => "CREATIVE",
            Self::Brand => "BRAND",
            Self::Dp => "DP",
            Self::Editor => "EDITOR",
            Self::Vfx => "VFX",
            Self::Mograph => "MOGRAPH",
        }
    }
}

/// Kinds of outbound link a project can carry, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    PrimaryDomain,
    Website,
    Vimeo,
    YouTube,
    Neoshare,
    MarketingSlides,
    Films,
    Additional,
}

impl LinkKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryDomain => "primary_domain",
            Self::Website => "website",
            Self::Vimeo => "vimeo",
            Self::YouTube => "you_tube",
            Self::Neoshare => "neoshare",
            Self::MarketingSlides => "marketing_slides",
            Self::Films => "films",
            Self::Additional => "additional",
        }
    }
}

/// One named URL attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub kind: LinkKind,
    pub label: String,
    pub url: String,
}

/// Where the project took place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Location {
    /// `"City, State, Country"` with blank parts skipped, or `None` when
    /// nothing is known.
    #[must_use]
    pub fn display_line(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.city, &self.state, &self.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// The canonical flat project record.
///
/// Built once per load cycle by [`crate::normalize`] and treated as an
/// immutable value afterwards. Every text attribute other than the identity
/// is optional; blank source values are stored as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables_detail_html: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub team: BTreeMap<TeamRole, String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Project {
    /// An otherwise empty project carrying only its identity.
    #[must_use]
    pub fn new(project_number: impl Into<String>) -> Self {
        Self {
            project_number: project_number.into(),
            name: None,
            client: None,
            category: None,
            year: None,
            notes: None,
            deliverables_summary: None,
            deliverables_detail_html: None,
            team: BTreeMap::new(),
            location: Location::default(),
            links: Vec::new(),
        }
    }

    /// Team members in display order, with their role labels.
    pub fn team_members(&self) -> impl Iterator<Item = (TeamRole, &str)> {
        self.team.iter().map(|(role, name)| (*role, name.as_str()))
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Untitled Project")
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| {
                role.as_str().eq_ignore_ascii_case(&normalized)
                    || role.source_column().eq_ignore_ascii_case(&normalized)
                    || role.label().eq_ignore_ascii_case(&normalized)
            })
            .ok_or_else(|| ParseEnumError {
                expected: "team role",
                got: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{Location, Project, TeamRole};
    use std::str::FromStr;

    #[test]
    fn team_role_json_uses_camel_case() {
        assert_eq!(
            serde_json::to_string(&TeamRole::ThreeD).unwrap(),
            "\"threeD\""
        );
        assert_eq!(serde_json::to_string(&TeamRole::Pm).unwrap(), "\"pm\"");
        assert_eq!(
            serde_json::from_str::<TeamRole>("\"mograph\"").unwrap(),
            TeamRole::Mograph
        );
    }

    #[test]
    fn team_role_parses_column_label_and_key() {
        assert_eq!(TeamRole::from_str("ThreeD").unwrap(), TeamRole::ThreeD);
        assert_eq!(TeamRole::from_str("3d").unwrap(), TeamRole::ThreeD);
        assert_eq!(TeamRole::from_str("designer").unwrap(), TeamRole::Design);
        assert_eq!(TeamRole::from_str(" vfx ").unwrap(), TeamRole::Vfx);
        assert!(TeamRole::from_str("gaffer").is_err());
    }

    #[test]
    fn team_iterates_in_display_order() {
        let mut project = Project::new("P1");
        project.team.insert(TeamRole::Mograph, "Mo".into());
        project.team.insert(TeamRole::Sales, "Sal".into());
        project.team.insert(TeamRole::ThreeD, "Tri".into());

        let labels: Vec<&str> = project.team_members().map(|(r, _)| r.label()).collect();
        assert_eq!(labels, vec!["SALES", "3D", "MOGRAPH"]);
    }

    #[test]
    fn location_line_skips_blank_parts() {
        let location = Location {
            city: Some("London".into()),
            country: Some("UK".into()),
            ..Location::default()
        };
        assert_eq!(location.display_line().as_deref(), Some("London, UK"));
        assert_eq!(Location::default().display_line(), None);
    }

    #[test]
    fn coordinates_need_both_axes() {
        let mut location = Location {
            latitude: Some(51.5),
            ..Location::default()
        };
        assert_eq!(location.coordinates(), None);
        location.longitude = Some(-0.12);
        assert_eq!(location.coordinates(), Some((51.5, -0.12)));
    }

    #[test]
    fn empty_optional_fields_are_not_serialized() {
        let json = serde_json::to_value(Project::new("P7")).unwrap();
        assert_eq!(json["project_number"], "P7");
        assert!(json.get("name").is_none());
        assert!(json.get("team").is_none());
        assert!(json.get("links").is_none());
    }
}
