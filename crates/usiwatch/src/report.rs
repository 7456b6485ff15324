use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SubsecRound, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::config::ConfigError;
use crate::types::VacancyEntry;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to serialize report to JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to serialize report to YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Current UTC time truncated to whole seconds.
pub fn capture_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Yaml,
}

impl ReportFormat {
    /// Picks the format from the extension of the output file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(ReportFormat::Json),
            Some("yml") | Some("yaml") => Ok(ReportFormat::Yaml),
            _ => Err(ConfigError::UnsupportedOutput(path.to_path_buf())),
        }
    }
}

/// Free slots per course that still has capacity, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacancyReport {
    pub captured_at: DateTime<Utc>,
    entries: Vec<(String, u32)>,
}

impl VacancyReport {
    /// Builds the file report. Fully booked courses are left out.
    pub fn from_entries(entries: &[VacancyEntry], captured_at: DateTime<Utc>) -> Self {
        let mut report = Self {
            captured_at,
            entries: Vec::new(),
        };

        for entry in entries {
            if entry.fully_booked {
                log::debug!("Skipping fully booked course {}", entry.course_key);
                continue;
            }
            report.insert(&entry.course_key, entry.free_count);
        }

        report
    }

    fn insert(&mut self, key: &str, count: u32) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => {
                log::warn!("Course {} listed more than once, keeping last count", key);
                *existing = count;
            }
            None => self.entries.push((key.to_string(), count)),
        }
    }

    pub fn get(&self, key: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, count)| *count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, ReportError> {
        Ok(match format {
            ReportFormat::Json => serde_json::to_string_pretty(self)?,
            ReportFormat::Yaml => serde_yaml::to_string(self)?,
        })
    }

    /// Renders the whole report before touching `path`, so a failed
    /// serialisation never leaves a partial file behind.
    pub fn write(&self, path: &Path, format: ReportFormat) -> Result<(), ReportError> {
        let content = self.render(format)?;
        fs::write(path, content).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Wrote {} course(s) to {}", self.len(), path.display());
        Ok(())
    }
}

impl Serialize for VacancyReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}
