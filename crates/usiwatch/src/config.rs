use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed filter configuration: {0}")]
    Malformed(#[from] serde_yaml::Error),
    #[error("Config file {0} is empty")]
    Empty(PathBuf),
    #[error("Unsupported output file '{0}': YAML or JSON output supported only")]
    UnsupportedOutput(PathBuf),
}

/// A filter value as written in the config file. Numbers are kept verbatim
/// so that `id: 12345` means the same as `id: "12345"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Text(String),
    Number(serde_yaml::Number),
}

impl Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::Text(s) => write!(f, "{}", s),
            FilterValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Search filters before resolution. Every key may be missing or null.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFilters {
    #[serde(default)]
    pub semester: Option<FilterValue>,
    #[serde(default)]
    pub discipline: Option<FilterValue>,
    #[serde(default)]
    pub course: Option<FilterValue>,
    #[serde(default)]
    pub instructor: Option<FilterValue>,
    #[serde(default)]
    pub id: Option<FilterValue>,
    #[serde(default, alias = "day")]
    pub weekday: Option<FilterValue>,
    #[serde(default)]
    pub after: Option<FilterValue>,
    #[serde(default)]
    pub until: Option<FilterValue>,
    #[serde(default, alias = "place")]
    pub location: Option<FilterValue>,
}

impl RawFilters {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Resolved search filters: every field present, no raw spaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterConfig {
    pub semester: String,
    pub discipline: String,
    pub course: String,
    pub instructor: String,
    pub id: String,
    pub weekday: String,
    pub after: String,
    pub until: String,
    pub location: String,
}

/// Semester code for `date`: the year followed by `S` for February through
/// August and `W` otherwise.
pub fn semester_code(date: NaiveDate) -> String {
    let season = if (2..9).contains(&date.month()) {
        'S'
    } else {
        'W'
    };
    format!("{:04}{}", date.year(), season)
}

fn encode(value: Option<FilterValue>) -> String {
    value
        .map(|v| v.to_string().replace(' ', "+"))
        .unwrap_or_default()
}

impl FilterConfig {
    pub fn resolve(raw: RawFilters, today: NaiveDate) -> Self {
        let semester = raw
            .semester
            .unwrap_or_else(|| FilterValue::Text(semester_code(today)));

        Self {
            semester: encode(Some(semester)),
            discipline: encode(raw.discipline),
            course: encode(raw.course),
            instructor: encode(raw.instructor),
            id: encode(raw.id),
            weekday: encode(raw.weekday),
            after: encode(raw.after),
            until: encode(raw.until),
            location: encode(raw.location),
        }
    }

    /// Reads a YAML (or JSON) filter file and resolves it against `today`.
    pub fn load(path: &Path, today: NaiveDate) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if content.trim().is_empty() {
            return Err(ConfigError::Empty(path.to_path_buf()));
        }

        let raw = RawFilters::from_yaml(&content)?;
        let filters = Self::resolve(raw, today);
        log::debug!("Resolved filters: {:?}", filters);
        Ok(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_semester_code_boundaries() {
        assert_eq!(semester_code(date(2026, 1, 31)), "2026W");
        assert_eq!(semester_code(date(2026, 2, 1)), "2026S");
        assert_eq!(semester_code(date(2026, 8, 31)), "2026S");
        assert_eq!(semester_code(date(2026, 9, 1)), "2026W");
        assert_eq!(semester_code(date(2026, 12, 24)), "2026W");
    }

    #[test]
    fn test_resolve_defaults_semester_and_empties() {
        let filters = FilterConfig::resolve(RawFilters::default(), date(2026, 10, 18));

        assert_eq!(filters.semester, "2026W");
        assert_eq!(filters.discipline, "");
        assert_eq!(filters.course, "");
        assert_eq!(filters.location, "");
    }

    #[test]
    fn test_resolve_replaces_spaces() {
        let raw = RawFilters::from_yaml(
            r#"
semester: 2026S
course: Volleyball Anfänger Kurs
instructor: Maria Huber
id:
"#,
        )
        .expect("Failed to parse filters");

        let filters = FilterConfig::resolve(raw, date(2026, 10, 18));

        assert_eq!(filters.semester, "2026S");
        assert_eq!(filters.course, "Volleyball+Anfänger+Kurs");
        assert_eq!(filters.instructor, "Maria+Huber");
        assert_eq!(filters.id, "");
        assert!(!filters.course.contains(' '));
    }

    #[test]
    fn test_resolve_keeps_explicit_empty_semester() {
        let raw = RawFilters::from_yaml("semester: ''").expect("Failed to parse filters");
        let filters = FilterConfig::resolve(raw, date(2026, 3, 1));
        assert_eq!(filters.semester, "");
    }

    #[test]
    fn test_numbers_and_legacy_aliases() {
        let raw = RawFilters::from_yaml(
            r#"
id: 12345
day: Mo
place: USZ Halle 1
after: "18:00"
"#,
        )
        .expect("Failed to parse filters");

        let filters = FilterConfig::resolve(raw, date(2026, 5, 1));

        assert_eq!(filters.id, "12345");
        assert_eq!(filters.weekday, "Mo");
        assert_eq!(filters.location, "USZ+Halle+1");
        assert_eq!(filters.after, "18:00");
    }

    #[test]
    fn test_json_config_is_accepted() {
        let raw = RawFilters::from_yaml(r#"{"semester": null, "course": "Yoga"}"#)
            .expect("Failed to parse filters");
        let filters = FilterConfig::resolve(raw, date(2026, 2, 14));
        assert_eq!(filters.semester, "2026S");
        assert_eq!(filters.course, "Yoga");
    }

    #[test]
    fn test_unknown_key_is_malformed() {
        let err = RawFilters::from_yaml("sport: Tennis").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn test_non_scalar_value_is_malformed() {
        let err = RawFilters::from_yaml("course: [Yoga, Pilates]").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn test_load_fails_on_missing_and_empty_files() {
        let missing = FilterConfig::load(Path::new("fixtures/does-not-exist.yml"), date(2026, 1, 1));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let empty = FilterConfig::load(Path::new("fixtures/empty.yml"), date(2026, 1, 1));
        assert!(matches!(empty, Err(ConfigError::Empty(_))));
    }

    #[test]
    fn test_load_fixture_config() {
        let filters = FilterConfig::load(Path::new("fixtures/config.yml"), date(2026, 10, 18))
            .expect("Failed to load fixture config");

        assert_eq!(filters.semester, "2026W");
        assert_eq!(filters.course, "Volleyball");
        assert_eq!(filters.weekday, "");
        assert_eq!(filters.location, "");
    }
}
