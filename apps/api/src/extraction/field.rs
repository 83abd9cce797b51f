//! Field identifiers and the extraction policy bound to each one.

use std::fmt;

use serde::{Serialize, Serializer};

/// A named category of information pulled out of a resume.
///
/// The five well-known fields carry built-in default patterns. Any other name
/// supplied through a request override becomes `Custom` and is extracted with
/// the generic join-all policy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Phone,
    Email,
    Degree,
    School,
    Custom(String),
}

/// How a field's pattern is applied to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Match the uploaded filename, not the body; keep the captured portion
    /// of the first match.
    FilenameCapture,
    /// First match in the body with space/dash separators removed.
    FirstMatchStripped,
    /// All body matches, narrowed to institution-tagged segments.
    InstitutionFiltered,
    /// All body matches joined with the separator, duplicates kept.
    JoinAll,
}

impl Field {
    pub const WELL_KNOWN: [Field; 5] = [
        Field::Name,
        Field::Phone,
        Field::Email,
        Field::Degree,
        Field::School,
    ];

    pub fn parse(name: &str) -> Field {
        match name.trim() {
            "name" => Field::Name,
            "phone" => Field::Phone,
            "email" => Field::Email,
            "degree" => Field::Degree,
            "school" => Field::School,
            other => Field::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Field::Name => "name",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::Degree => "degree",
            Field::School => "school",
            Field::Custom(name) => name,
        }
    }

    pub fn policy(&self) -> FieldPolicy {
        match self {
            Field::Name => FieldPolicy::FilenameCapture,
            Field::Phone => FieldPolicy::FirstMatchStripped,
            Field::School => FieldPolicy::InstitutionFiltered,
            Field::Email | Field::Degree | Field::Custom(_) => FieldPolicy::JoinAll,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_known_names() {
        for field in Field::WELL_KNOWN {
            assert_eq!(Field::parse(field.as_str()), field);
        }
    }

    #[test]
    fn test_parse_unknown_name_is_custom() {
        assert_eq!(
            Field::parse("birthday"),
            Field::Custom("birthday".to_string())
        );
        assert_eq!(Field::parse(" company ").as_str(), "company");
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(Field::parse("School"), Field::Custom("School".to_string()));
    }

    #[test]
    fn test_policy_dispatch() {
        assert_eq!(Field::Name.policy(), FieldPolicy::FilenameCapture);
        assert_eq!(Field::Phone.policy(), FieldPolicy::FirstMatchStripped);
        assert_eq!(Field::School.policy(), FieldPolicy::InstitutionFiltered);
        assert_eq!(Field::Email.policy(), FieldPolicy::JoinAll);
        assert_eq!(Field::Degree.policy(), FieldPolicy::JoinAll);
        assert_eq!(
            Field::Custom("title".to_string()).policy(),
            FieldPolicy::JoinAll
        );
    }

    #[test]
    fn test_field_serializes_as_wire_name() {
        let json = serde_json::to_string(&Field::Custom("title".to_string())).unwrap();
        assert_eq!(json, r#""title""#);
        assert_eq!(serde_json::to_string(&Field::School).unwrap(), r#""school""#);
    }
}
