pub mod project;

pub use project::{Link, LinkKind, Location, ParseEnumError, Project, TeamRole};
