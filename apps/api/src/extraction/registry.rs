//! Pattern Registry — per-request mapping from field to compiled pattern.
//!
//! Seeded with the built-in defaults, then overlaid with caller overrides.
//! An override replaces the default for its field; an override that fails to
//! compile is reported and the prior entry stays in place.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::extraction::field::Field;

/// Prefix carried by override keys on the wire, e.g. `exp-school`.
pub const OVERRIDE_PREFIX: &str = "exp-";

/// Compiled-program ceiling for caller-supplied patterns.
const OVERRIDE_SIZE_LIMIT: usize = 1 << 20;

const DEFAULT_NAME: &str = r"([^\s]+)的简历";
const DEFAULT_EMAIL: &str = r"(?i)[a-z0-9]+@[a-z0-9]+(\.[a-z]+)?";
const DEFAULT_PHONE: &str = r"(\+\d+)?(1[0-9]{10}|([0-9]{3,}[ -][0-9]{3,}[ -][0-9]{3,}))";
const DEFAULT_DEGREE: &str = r"(大专|专科|本科|学士|硕士|研究生|博士|博士后)";
const DEFAULT_SCHOOL: &str = r"\p{Han}{2,}(学校|大学|学院)";

/// Resume-suffix pattern applied to the uploaded filename. The name field
/// always uses it; an `exp-name` override has no effect on extraction.
pub static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(DEFAULT_NAME).unwrap());

fn default_pattern(field: &Field) -> Option<&'static str> {
    match field {
        Field::Name => Some(DEFAULT_NAME),
        Field::Phone => Some(DEFAULT_PHONE),
        Field::Email => Some(DEFAULT_EMAIL),
        Field::Degree => Some(DEFAULT_DEGREE),
        Field::School => Some(DEFAULT_SCHOOL),
        Field::Custom(_) => None,
    }
}

static DEFAULT_PATTERNS: LazyLock<Vec<(Field, Regex)>> = LazyLock::new(|| {
    Field::WELL_KNOWN
        .into_iter()
        .filter_map(|field| default_pattern(&field).map(|pattern| (field, pattern)))
        .map(|(field, pattern)| {
            let regex = Regex::new(pattern)
                .unwrap_or_else(|e| panic!("Failed to compile default pattern '{pattern}': {e}"));
            (field, regex)
        })
        .collect()
});

/// A caller-supplied pattern that did not compile.
#[derive(Debug, Clone, Error, Serialize)]
#[error("invalid pattern for field '{field}': {message}")]
pub struct PatternError {
    pub field: Field,
    pub pattern: String,
    pub message: String,
}

/// Mapping from field to the pattern used to extract it.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: BTreeMap<Field, Regex>,
}

/// Result of building a registry: the registry itself plus one error per
/// rejected override.
#[derive(Debug)]
pub struct RegistryBuild {
    pub registry: PatternRegistry,
    pub errors: Vec<PatternError>,
}

impl PatternRegistry {
    /// Registry holding only the built-in defaults.
    pub fn defaults() -> Self {
        PatternRegistry {
            patterns: DEFAULT_PATTERNS.iter().cloned().collect(),
        }
    }

    #[cfg(test)]
    pub fn get(&self, field: &Field) -> Option<&Regex> {
        self.patterns.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Field, &Regex)> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Replaces (never merges) the pattern for `field`.
    pub fn insert(&mut self, field: Field, regex: Regex) {
        self.patterns.insert(field, regex);
    }
}

/// Builds the registry for one request.
///
/// `overrides` maps field name (prefix already stripped) to raw pattern.
/// Entries are applied in key order so identical overrides always produce
/// an identical registry.
pub fn build_registry(overrides: &BTreeMap<String, String>) -> RegistryBuild {
    let mut registry = PatternRegistry::defaults();
    let mut errors = Vec::new();

    for (name, raw) in overrides {
        let field = Field::parse(name);
        match compile_override(raw) {
            Ok(regex) => {
                debug!(field = %field, pattern = %raw, "Applied pattern override");
                registry.insert(field, regex);
            }
            Err(e) => {
                warn!(field = %field, pattern = %raw, "Rejected pattern override: {e}");
                errors.push(PatternError {
                    field,
                    pattern: raw.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    debug!(
        fields = registry.len(),
        rejected = errors.len(),
        "Pattern registry built"
    );
    RegistryBuild { registry, errors }
}

fn compile_override(raw: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(raw)
        .size_limit(OVERRIDE_SIZE_LIMIT)
        .build()
}

/// Strips the override prefix from a wire key, returning the field name.
pub fn strip_override_prefix(key: &str) -> Option<&str> {
    key.strip_prefix(OVERRIDE_PREFIX)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Collects override entries from raw `(key, value)` pairs.
///
/// Only keys carrying the override prefix are kept; blank values are ignored.
/// A repeated field keeps the last value seen.
pub fn collect_overrides<I, K, V>(pairs: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut overrides = BTreeMap::new();
    for (key, value) in pairs {
        let value = value.as_ref();
        if value.trim().is_empty() {
            continue;
        }
        if let Some(name) = strip_override_prefix(key.as_ref()) {
            overrides.insert(name.to_string(), value.to_string());
        }
    }
    overrides
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_cover_well_known_fields() {
        let registry = PatternRegistry::defaults();
        assert_eq!(registry.len(), 5);
        for field in Field::WELL_KNOWN {
            assert!(registry.get(&field).is_some(), "missing default for {field}");
        }
    }

    #[test]
    fn test_default_patterns_match_expected_shapes() {
        let registry = PatternRegistry::defaults();
        let phone = registry.get(&Field::Phone).unwrap();
        assert_eq!(
            phone.find("电话: 138 1234 5678").map(|m| m.as_str()),
            Some("138 1234 5678")
        );
        let email = registry.get(&Field::Email).unwrap();
        assert!(email.is_match("Contact: ZhangSan@example.com"));
        let school = registry.get(&Field::School).unwrap();
        assert!(school.is_match("毕业于清华大学"));
        assert!(!school.is_match("大学"));
    }

    #[test]
    fn test_override_replaces_only_its_field() {
        let build = build_registry(&overrides(&[("school", r"\p{Han}+学堂")]));
        assert!(build.errors.is_empty());
        let defaults = PatternRegistry::defaults();

        let school = build.registry.get(&Field::School).unwrap();
        assert_eq!(school.as_str(), r"\p{Han}+学堂");
        for field in [Field::Name, Field::Phone, Field::Email, Field::Degree] {
            assert_eq!(
                build.registry.get(&field).unwrap().as_str(),
                defaults.get(&field).unwrap().as_str()
            );
        }
    }

    #[test]
    fn test_malformed_override_keeps_default() {
        let build = build_registry(&overrides(&[("degree", "(本科|硕士"), ("phone", r"\d{11}")]));

        assert_eq!(build.errors.len(), 1);
        let err = &build.errors[0];
        assert_eq!(err.field, Field::Degree);
        assert_eq!(err.pattern, "(本科|硕士");
        assert!(err.to_string().contains("degree"));

        assert_eq!(
            build.registry.get(&Field::Degree).unwrap().as_str(),
            DEFAULT_DEGREE
        );
        assert_eq!(build.registry.get(&Field::Phone).unwrap().as_str(), r"\d{11}");
    }

    #[test]
    fn test_custom_field_is_added() {
        let build = build_registry(&overrides(&[("title", "(工程师|经理)")]));
        assert!(build.errors.is_empty());
        assert_eq!(build.registry.len(), 6);
        assert!(build
            .registry
            .get(&Field::Custom("title".to_string()))
            .is_some());
    }

    #[test]
    fn test_malformed_custom_field_is_not_added() {
        let build = build_registry(&overrides(&[("company", "[")]));
        assert_eq!(build.errors.len(), 1);
        assert_eq!(build.registry.len(), 5);
    }

    #[test]
    fn test_oversized_override_is_rejected() {
        let build = build_registry(&overrides(&[("school", r"(\w{100}){100}")]));
        assert_eq!(build.errors.len(), 1);
        assert_eq!(
            build.registry.get(&Field::School).unwrap().as_str(),
            DEFAULT_SCHOOL
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let input = overrides(&[("title", "经理"), ("email", r"\S+@\S+"), ("degree", "(")]);
        let a = build_registry(&input);
        let b = build_registry(&input);
        let patterns = |r: &PatternRegistry| {
            r.iter()
                .map(|(f, p)| (f.to_string(), p.as_str().to_string()))
                .collect::<Vec<_>>()
        };
        assert_eq!(patterns(&a.registry), patterns(&b.registry));
        assert_eq!(a.errors.len(), b.errors.len());
    }

    #[test]
    fn test_collect_overrides_strips_prefix_and_skips_blanks() {
        let collected = collect_overrides([
            ("exp-school", "大学"),
            ("exp-degree", "   "),
            ("readability", "1"),
            ("exp-", "x"),
            ("exp-title", "经理"),
        ]);
        assert_eq!(collected.len(), 2);
        assert_eq!(collected.get("school").map(String::as_str), Some("大学"));
        assert_eq!(collected.get("title").map(String::as_str), Some("经理"));
    }

    #[test]
    fn test_collect_overrides_last_writer_wins() {
        let collected = collect_overrides([("exp-phone", r"\d+"), ("exp-phone", r"1\d{10}")]);
        assert_eq!(collected.get("phone").map(String::as_str), Some(r"1\d{10}"));
    }
}
