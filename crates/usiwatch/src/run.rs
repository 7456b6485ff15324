use std::path::Path;

use crate::config::{ConfigError, FilterConfig};
use crate::influx::{InfluxClient, InfluxError, points_from_entries};
use crate::report::{ReportError, ReportFormat, VacancyReport, capture_timestamp};
use crate::scraper::{ScraperError, WebScraper};
use crate::vacancy::{VacancyError, extract_vacancies};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Invalid args: {0}")]
    Config(#[from] ConfigError),
    #[error("Error fetching courses: {0}")]
    Scraper(#[from] ScraperError),
    #[error("Error extracting free slots: {0}")]
    Vacancy(#[from] VacancyError),
    #[error("Error writing report: {0}")]
    Report(#[from] ReportError),
    #[error("Error writing to InfluxDB: {0}")]
    Influx(#[from] InfluxError),
}

/// One reporting run: fetch the courses matching `filters`, write the file
/// report to `output` and, when a client is given, append the points to
/// InfluxDB.
///
/// The output extension is checked before the portal is contacted, and the
/// file is only written once every count has been extracted.
pub async fn report_vacancies(
    scraper: &WebScraper,
    filters: &FilterConfig,
    output: &Path,
    influx: Option<&InfluxClient>,
) -> Result<VacancyReport, RunError> {
    let format = ReportFormat::from_path(output)?;

    let courses = scraper.fetch_courses(filters).await?;
    let captured_at = capture_timestamp();
    let entries = extract_vacancies(&courses)?;

    let report = VacancyReport::from_entries(&entries, captured_at);
    report.write(output, format)?;

    if let Some(influx) = influx {
        let points = points_from_entries(&entries, captured_at);
        for point in &points {
            log::debug!("{}", point);
        }
        influx.write_points(&points).await?;
    }

    Ok(report)
}
