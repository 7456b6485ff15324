pub mod config;
pub mod influx;
pub mod parser;
pub mod report;
pub mod run;
pub mod scraper;
pub mod types;
pub mod utils;
pub mod vacancy;

pub use config::{ConfigError, FilterConfig};
pub use influx::{InfluxClient, InfluxConfig};
pub use report::{ReportFormat, VacancyReport};
pub use run::{RunError, report_vacancies};
pub use scraper::{ScraperError, WebScraper};

pub(crate) const BASE_URL: &str = "https://usionline.uni-graz.at";
