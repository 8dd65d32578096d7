use anyhow::{anyhow, bail, Error};
use clap::Parser;
use slog::{error, info, o, Drain, Level, Logger};
use std::{env, fs, path::Path};
use time::{
    format_description::FormatItem, macros::format_description, OffsetDateTime, PrimitiveDateTime,
};

pub const DEFAULT_API_URL: &str =
    "https://sensor-data.windbornesystems.com/api/v1/super_observations.json";

const TIME_ARG_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]:[minute]");

#[derive(Parser, Clone, Debug)]
#[command(
    author,
    version,
    about = "Retrieves WindBorne sounding observations and writes them out as UASDC segment files.\n\
             Observations are broken up into time buckets as specified by --bucket-hours, with one\n\
             output file per mission per bucket."
)]
pub struct Cli {
    /// Starting and ending times to retrieve obs, UTC. Format: YYYY-mm-dd_HH:MM
    /// Ending time is optional, with current time used as default
    #[arg(num_args = 1..=2, required = true, value_name = "YYYY-mm-dd_HH:MM")]
    pub times: Vec<String>,

    /// Number of hours of observations to accumulate into a file before opening the next file
    #[arg(short, long, default_value_t = 6.0)]
    pub bucket_hours: f64,

    /// WindBorne API client id
    #[arg(long, env = "WB_CLIENT_ID", hide_env_values = true)]
    pub client_id: String,

    /// WindBorne API key
    #[arg(long, env = "WB_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Super-observations endpoint to query
    #[arg(long, env = "WB_API_URL")]
    pub base_url: Option<String>,

    /// Directory to write segment files into
    #[arg(short, long, env = "WB_UASDC_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "WB_UASDC_LEVEL")]
    pub level: Option<String>,
}

impl Cli {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn data_dir(&self) -> String {
        self.data_dir.clone().unwrap_or_else(|| ".".to_string())
    }

    /// Bucket width in whole seconds; rejects non-positive widths.
    pub fn bucket_seconds(&self) -> Result<i64, Error> {
        let seconds = (self.bucket_hours * 3600.0).round() as i64;
        if self.bucket_hours <= 0.0 || seconds <= 0 {
            bail!("bucket width must be a positive number of hours");
        }
        Ok(seconds)
    }

    /// The requested [starttime, endtime] in UTC epoch seconds. A single
    /// time argument means "from then until now".
    pub fn time_range(&self) -> Result<(i64, i64), Error> {
        match self.times.as_slice() {
            [start] => Ok((
                parse_time_arg(start)?,
                OffsetDateTime::now_utc().unix_timestamp(),
            )),
            [start, end] => Ok((parse_time_arg(start)?, parse_time_arg(end)?)),
            _ => bail!("one or two time arguments are needed"),
        }
    }
}

pub fn parse_time_arg(value: &str) -> Result<i64, Error> {
    let parsed = PrimitiveDateTime::parse(value, TIME_ARG_FORMAT)
        .map_err(|e| anyhow!("error parsing time '{}': {}", value, e))?;
    Ok(parsed.assume_utc().unix_timestamp())
}

pub fn setup_logger(cli: &Cli) -> Logger {
    let log_level = if let Some(level) = cli.level.as_ref() {
        match level.to_lowercase().as_str() {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "info" => Level::Info,
            "warn" => Level::Warning,
            "error" => Level::Error,
            _ => Level::Info,
        }
    } else {
        let rust_log = env::var("RUST_LOG").unwrap_or_default();
        match rust_log.to_lowercase().as_str() {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "info" => Level::Info,
            "warn" => Level::Warning,
            "error" => Level::Error,
            _ => Level::Info,
        }
    };

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(log_level).fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

pub fn create_folder(root_path: &str, logger: &Logger) {
    let path = Path::new(root_path);

    if !path.exists() || !path.is_dir() {
        if let Err(err) = fs::create_dir_all(path) {
            error!(logger, "error creating folder: {}", err);
        } else {
            info!(logger, "folder created: {}", root_path);
        }
    }
}
