use std::path::Path;

use log::{info, warn};

use crate::backend::BatchWriter;
use crate::batch::BatchAccumulator;
use crate::classify::ColumnLayout;
use crate::config::ImportConfig;
use crate::convert::PointConverter;
use crate::error::Result;
use crate::infer::{infer_schema, Schema, ValuePatterns, INFERENCE_WINDOW};
use crate::reader;
use crate::timestamp::TimestampFormat;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows_read: u64,
    pub points_written: u64,
    pub rows_skipped: u64,
    pub batches: u64,
}

pub struct Importer {
    config: ImportConfig,
    patterns: ValuePatterns,
}

impl Importer {
    /// Validate `config` and compile its timestamp layout.
    pub fn new(config: ImportConfig) -> Result<Self> {
        config.validate()?;
        let patterns = ValuePatterns::new(TimestampFormat::new(&config.timestamp_format)?)?;
        Ok(Self { config, patterns })
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// First pass: read the header, assign roles and freeze field kinds from
    /// the leading rows.
    pub fn infer(&self, path: &Path) -> Result<Schema> {
        let mut input = reader::open(path, self.config.separator)?;
        let headers = reader::read_header(&mut input)?;
        let layout = ColumnLayout::classify(
            &headers,
            &self.config.timestamp_column,
            &self.config.tag_columns,
        )?;
        infer_schema(input.records(), layout, &self.patterns, INFERENCE_WINDOW)
    }

    /// Import `path` into `writer`. Fatal errors stop the run before the
    /// streaming pass; rows that cannot become points are logged and skipped.
    pub async fn run<W: BatchWriter>(&self, path: &Path, writer: W) -> Result<ImportSummary> {
        let schema = self.infer(path)?;
        for line in schema.describe() {
            info!("{}", line);
        }

        let converter = PointConverter::new(
            self.config.measurement.clone(),
            schema,
            self.patterns.clone(),
        );
        let mut batches =
            BatchAccumulator::new(writer, self.config.batch_size, self.config.retry.clone());
        let mut summary = ImportSummary::default();

        // Second pass from the top
        let mut input = reader::open(path, self.config.separator)?;
        for record in input.records() {
            let record = record?;
            summary.rows_read += 1;
            match converter.convert(summary.rows_read, &record) {
                Ok(point) => batches.append(point).await,
                Err(e) => {
                    warn!("{}", e);
                    summary.rows_skipped += 1;
                }
            }
        }
        batches.flush().await;

        summary.points_written = batches.total();
        summary.batches = batches.batches();
        Ok(summary)
    }
}
