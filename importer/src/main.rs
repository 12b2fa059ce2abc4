use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use pretty_env_logger::env_logger::{Target, WriteStyle};

use csv2influx::config::{
    parse_separator, parse_tag_columns, DEFAULT_BATCH_SIZE, DEFAULT_DATABASE, DEFAULT_MEASUREMENT,
    DEFAULT_SERVER, DEFAULT_TIMESTAMP_COLUMN, DEFAULT_TIMESTAMP_FORMAT,
};
use csv2influx::{ImportConfig, ImportSummary, Importer, InfluxBackend, InfluxConfig, RetryPolicy};

/// Import a CSV file into InfluxDB, one point per row
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a CSV file with an initial header row
    csv_file: PathBuf,

    /// InfluxDB server address
    #[arg(short, long, default_value = DEFAULT_SERVER)]
    server: String,

    /// Database name
    #[arg(short, long, default_value = DEFAULT_DATABASE)]
    database: String,

    /// Measurement name
    #[arg(short, long, default_value = DEFAULT_MEASUREMENT)]
    measurement: String,

    /// Batch insert size
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Separator-delimited list of columns to use as tags instead of fields
    #[arg(long, default_value = "")]
    tag_columns: String,

    /// Header name of the column to use as the timestamp
    #[arg(long = "timestamp-column", visible_alias = "ts", default_value = DEFAULT_TIMESTAMP_COLUMN)]
    timestamp_column: String,

    /// strftime-style format used to parse all timestamp values
    #[arg(long = "timestamp-format", visible_alias = "tf", default_value = DEFAULT_TIMESTAMP_FORMAT)]
    timestamp_format: String,

    /// Disable automatic creation of the database
    #[arg(long)]
    no_auto_create: bool,

    /// Input separator character
    #[arg(short = 'F', long, default_value = ",")]
    separator: String,

    /// Delay before the first write retry, in milliseconds
    #[arg(long, default_value_t = 100)]
    retry_initial_ms: u64,

    /// Upper bound on the delay between write retries, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    retry_max_ms: u64,

    /// Factor applied to the retry delay after each failed write
    #[arg(long, default_value_t = 2.0)]
    retry_multiplier: f64,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn import_config(&self) -> Result<ImportConfig> {
        let separator = parse_separator(&self.separator)?;
        Ok(ImportConfig {
            measurement: self.measurement.clone(),
            batch_size: self.batch_size,
            separator,
            tag_columns: parse_tag_columns(&self.tag_columns, separator),
            timestamp_column: self.timestamp_column.clone(),
            timestamp_format: self.timestamp_format.clone(),
            retry: RetryPolicy {
                initial_delay: Duration::from_millis(self.retry_initial_ms),
                max_delay: Duration::from_millis(self.retry_max_ms),
                multiplier: self.retry_multiplier,
            },
        })
    }

    fn influx_config(&self) -> InfluxConfig {
        InfluxConfig {
            server: self.server.clone(),
            database: self.database.clone(),
            auto_create: !self.no_auto_create,
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    setup_logging(&args)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .thread_name("importer")
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    match runtime.block_on(import(&args)) {
        Ok(summary) => {
            if summary.rows_skipped > 0 {
                info!("Skipped {} rows", summary.rows_skipped);
            }
            info!("Done (wrote {} points)", summary.points_written);
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

async fn import(args: &Cli) -> Result<ImportSummary> {
    let importer = Importer::new(args.import_config()?)?;
    let influx = args.influx_config();

    let mut backend = InfluxBackend::new(&influx);
    backend.ensure_database(influx.auto_create).await?;

    info!(
        "Importing {} into {}/{} as '{}'",
        args.csv_file.display(),
        influx.server,
        influx.database,
        importer.config().measurement
    );
    let summary = importer.run(&args.csv_file, &mut backend).await?;
    Ok(summary)
}

// Console logging always; a copy goes to --log-file when given.
fn setup_logging(args: &Cli) -> Result<()> {
    let level = if args.verbose { "debug" } else { "info" };
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());

    let console = pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .build();

    let Some(path) = &args.log_file else {
        let max_level = console.filter();
        log::set_boxed_logger(Box::new(console))?;
        log::set_max_level(max_level);
        return Ok(());
    };

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let file = pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .write_style(WriteStyle::Never)
        .target(Target::Pipe(Box::new(log_file)))
        .build();

    let max_level = console.filter().max(file.filter());
    log::set_boxed_logger(Box::new(LogDispatcher { console, file }))?;
    log::set_max_level(max_level);

    Ok(())
}

// Forwards every record to both the console and the log file
struct LogDispatcher {
    console: pretty_env_logger::env_logger::Logger,
    file: pretty_env_logger::env_logger::Logger,
}

impl log::Log for LogDispatcher {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.console.enabled(metadata) || self.file.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        self.console.log(record);
        self.file.log(record);
    }

    fn flush(&self) {
        self.console.flush();
        self.file.flush();
    }
}
