use crate::config::FilterConfig;
use crate::parser::{ParseError, parse_course_table};
use crate::types::CourseRecord;

use reqwest::Client;
use std::time::Duration;

pub const SEARCH_PATH: &str = "/usiweb/myusi.kurse";

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
}

/// Course search URL for `filters`. The parameters always appear in the same
/// order so equal filters give byte-identical URLs.
pub fn build_query_url(base_url: &str, filters: &FilterConfig) -> String {
    format!(
        "{}{}?suche_in=go\
         &sem_id_in={}\
         &sp_id_in={}\
         &kursbez_in={}\
         &kursleiter_in={}\
         &kursnr_in={}\
         &wt_in={}\
         &uhrzeit_von_in={}\
         &uhrzeit_bis_in={}\
         &suche_kursstaette_id_in={}",
        base_url.trim_end_matches('/'),
        SEARCH_PATH,
        filters.semester,
        filters.discipline,
        filters.course,
        filters.instructor,
        filters.id,
        filters.weekday,
        filters.after,
        filters.until,
        filters.location,
    )
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    base_url: String,
}

impl WebScraper {
    pub fn new() -> Result<Self, ScraperError> {
        Self::with_base_url(crate::BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn query_url(&self, filters: &FilterConfig) -> String {
        build_query_url(&self.base_url, filters)
    }

    pub async fn fetch_search_page(&self, filters: &FilterConfig) -> Result<String, ScraperError> {
        let url = self.query_url(filters);
        log::info!("Fetching course list for semester {}...", filters.semester);
        log::debug!("GET {}", url);
        self.get_html(&url).await
    }

    pub async fn fetch_courses(
        &self,
        filters: &FilterConfig,
    ) -> Result<Vec<CourseRecord>, ScraperError> {
        let html = self.fetch_search_page(filters).await?;
        let courses = parse_course_table(&html)?;
        log::info!("Found {} course(s)", courses.len());
        Ok(courses)
    }

    async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}
