//! Time-series sink: writes one point per course to an InfluxDB 1.x server
//! through its HTTP API.
//!
//! Every run appends points stamped with the capture time, so the database
//! accumulates a history of free slots per course. Fully booked courses are
//! written as well (with their marker stripped), unlike in the file report.

use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Serialize, Serializer};

use crate::types::VacancyEntry;

pub const MEASUREMENT: &str = "free";

#[derive(Debug, thiserror::Error)]
pub enum InfluxError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid InfluxDB address: {0}")]
    InvalidAddress(String),
}

/// Connection settings of the time-series sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: String,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8086,
            user: None,
            password: None,
            database: "usi".to_string(),
        }
    }
}

impl InfluxConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn serialize_seconds<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointTags {
    pub course: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointFields {
    pub value: u32,
}

/// One measurement of free slots for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Point {
    pub measurement: &'static str,
    pub tags: PointTags,
    pub fields: PointFields,
    #[serde(serialize_with = "serialize_seconds")]
    pub time: DateTime<Utc>,
}

fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Point {
    pub fn new(course: &str, value: u32, time: DateTime<Utc>) -> Self {
        Self {
            measurement: MEASUREMENT,
            tags: PointTags {
                course: course.to_string(),
            },
            fields: PointFields { value },
            time,
        }
    }

    /// Line protocol with an integer field and a timestamp in seconds.
    pub fn to_line_protocol(&self) -> String {
        format!(
            "{},course={} value={}i {}",
            self.measurement,
            escape_tag(&self.tags.course),
            self.fields.value,
            self.time.timestamp()
        )
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} course={} value={}",
            self.time.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.measurement,
            self.tags.course,
            self.fields.value
        )
    }
}

/// One point per entry, fully booked courses included.
pub fn points_from_entries(entries: &[VacancyEntry], time: DateTime<Utc>) -> Vec<Point> {
    entries
        .iter()
        .map(|e| Point::new(&e.course_key, e.free_count, time))
        .collect()
}

/// Handle to the time-series database. Created once per process and passed
/// to whatever writes points.
#[derive(Debug, Clone)]
pub struct InfluxClient {
    client: Client,
    base_url: Url,
    config: InfluxConfig,
}

impl InfluxClient {
    /// Connects to the server and creates the configured database if it
    /// does not exist yet.
    pub async fn connect(config: InfluxConfig) -> Result<Self, InfluxError> {
        let base_url = Url::parse(&config.base_url())
            .map_err(|e| InfluxError::InvalidAddress(format!("{}: {}", config.base_url(), e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        let influx = Self {
            client,
            base_url,
            config,
        };
        influx.create_database().await?;
        Ok(influx)
    }

    pub fn database(&self) -> &str {
        &self.config.database
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url.query_pairs_mut().extend_pairs(params);
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.user {
            Some(user) => request.basic_auth(user, self.config.password.as_ref()),
            None => request,
        }
    }

    async fn create_database(&self) -> Result<(), InfluxError> {
        let statement = format!(
            "CREATE DATABASE \"{}\"",
            self.config.database.replace('"', "\\\"")
        );
        let url = self.endpoint("/query", &[("q", statement.as_str())]);
        log::debug!("Ensuring database {} exists", self.config.database);

        self.authorize(self.client.post(url))
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?;
        Ok(())
    }

    /// Appends `points` to the database. Existing points are never replaced.
    pub async fn write_points(&self, points: &[Point]) -> Result<(), InfluxError> {
        if points.is_empty() {
            log::info!("No points to write");
            return Ok(());
        }

        let body = points
            .iter()
            .map(Point::to_line_protocol)
            .collect::<Vec<_>>()
            .join("\n");
        let url = self.endpoint(
            "/write",
            &[("db", self.config.database.as_str()), ("precision", "s")],
        );

        self.authorize(self.client.post(url))
            .body(body)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?;

        log::info!(
            "Wrote {} point(s) to database {}",
            points.len(),
            self.config.database
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_line_protocol() {
        let point = Point::new("101", 5, time());
        assert_eq!(point.to_line_protocol(), "free,course=101 value=5i 1792312200");
    }

    #[test]
    fn test_line_protocol_escapes_tag_value() {
        let point = Point::new("A 1,b=c", 0, time());
        assert_eq!(
            point.to_line_protocol(),
            r"free,course=A\ 1\,b\=c value=0i 1792312200"
        );
    }

    #[test]
    fn test_point_json_schema() {
        let value = serde_json::to_value(Point::new("102", 0, time())).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "measurement": "free",
                "tags": {"course": "102"},
                "fields": {"value": 0},
                "time": "2026-10-18T08:30:00Z"
            })
        );
    }

    #[test]
    fn test_points_keep_fully_booked_courses() {
        let entries = vec![
            VacancyEntry {
                course_key: "101".to_string(),
                free_count: 5,
                fully_booked: false,
            },
            VacancyEntry {
                course_key: "102".to_string(),
                free_count: 0,
                fully_booked: true,
            },
        ];

        let points = points_from_entries(&entries, time());

        assert_eq!(points.len(), 2);
        assert_eq!(points[0], Point::new("101", 5, time()));
        assert_eq!(points[1], Point::new("102", 0, time()));
    }

    #[test]
    fn test_default_config() {
        let config = InfluxConfig::default();
        assert_eq!(config.base_url(), "http://localhost:8086");
        assert_eq!(config.database, "usi");
    }
}
