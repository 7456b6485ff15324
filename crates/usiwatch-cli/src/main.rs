use std::path::PathBuf;
use std::process;

use chrono::Local;
use clap::{Args, Parser, ValueEnum};
use log::LevelFilter;
use usiwatch::influx::{InfluxClient, InfluxConfig};
use usiwatch::report::ReportFormat;
use usiwatch::scraper::WebScraper;
use usiwatch::utils::CourseStats;
use usiwatch::{FilterConfig, report_vacancies};

#[derive(Parser)]
#[command(name = "usiwatch")]
#[command(about = "Reports free slots of USI Graz sports courses", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(short, long, help = "Print the parsed course table and exit")]
    debug: bool,

    #[arg(
        short = 'f',
        long = "format",
        value_enum,
        default_value = "text",
        help = "Output format of the course table printed with --debug"
    )]
    format: OutputFormat,

    #[arg(
        long,
        default_value = "config.yml",
        help = "YAML or JSON file with the search filters"
    )]
    input: PathBuf,

    #[arg(
        long,
        default_value = "free.json",
        help = "YAML or JSON report file, chosen by extension"
    )]
    output: PathBuf,

    #[arg(long, help = "Base URL of the USI portal")]
    base_url: Option<String>,

    #[arg(long, help = "Additionally write the free slots to InfluxDB")]
    influx: bool,

    #[command(flatten)]
    influx_args: InfluxArgs,
}

#[derive(Args)]
struct InfluxArgs {
    #[arg(long, env = "INFLUX_HOST", default_value = "localhost", help = "InfluxDB host")]
    influx_host: String,

    #[arg(long, env = "INFLUX_PORT", default_value_t = 8086, help = "InfluxDB port")]
    influx_port: u16,

    #[arg(long, env = "INFLUX_USER", help = "InfluxDB user")]
    influx_user: Option<String>,

    #[arg(
        long,
        env = "INFLUX_PASSWORD",
        hide_env_values = true,
        help = "InfluxDB password"
    )]
    influx_password: Option<String>,

    #[arg(long, env = "INFLUX_DATABASE", default_value = "usi", help = "InfluxDB database")]
    influx_database: String,
}

impl From<InfluxArgs> for InfluxConfig {
    fn from(args: InfluxArgs) -> Self {
        InfluxConfig {
            host: args.influx_host,
            port: args.influx_port,
            user: args.influx_user,
            password: args.influx_password,
            database: args.influx_database,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    // Checked before InfluxDB is contacted; the run checks it again before fetching.
    if !cli.debug
        && let Err(e) = ReportFormat::from_path(&cli.output)
    {
        log::error!("Invalid args: {e}");
        process::exit(1);
    }

    let filters = FilterConfig::load(&cli.input, Local::now().date_naive()).unwrap_or_else(|e| {
        log::error!("Error loading filters: {}", e);
        process::exit(1);
    });

    let influx = if cli.influx && !cli.debug {
        let config = InfluxConfig::from(cli.influx_args);
        log::info!("Connecting to InfluxDB at {}...", config.base_url());
        Some(InfluxClient::connect(config).await.unwrap_or_else(|e| {
            log::error!("Error connecting to InfluxDB: {}", e);
            process::exit(1);
        }))
    } else {
        None
    };

    let scraper = match &cli.base_url {
        Some(url) => WebScraper::with_base_url(url),
        None => WebScraper::new(),
    }
    .unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    if !cli.debug {
        report_vacancies(&scraper, &filters, &cli.output, influx.as_ref())
            .await
            .unwrap_or_else(|e| {
                log::error!("{}", e);
                process::exit(1);
            });
        return;
    }

    let courses = scraper.fetch_courses(&filters).await.unwrap_or_else(|e| {
        log::error!("Error fetching courses: {}", e);
        process::exit(1);
    });

    match cli.format {
        OutputFormat::Json => serialize_json(&courses),
        OutputFormat::Text => {
            if courses.is_empty() {
                println!("No courses to display.");
            } else {
                for (i, course) in courses.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, course);
                }
                print!("{}", CourseStats::from_course_records(&courses));
            }
        }
    }
}
