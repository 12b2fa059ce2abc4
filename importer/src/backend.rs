use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use influxdb::{Client, ReadQuery, Timestamp, WriteQuery};
use log::{debug, info};
use serde::Deserialize;

use crate::config::InfluxConfig;
use crate::convert::{FieldValue, Point};

/// Accepts batches of points. Every error is treated as transient.
#[async_trait]
pub trait BatchWriter: Send {
    async fn write_batch(&mut self, points: &[Point]) -> Result<()>;
}

#[async_trait]
impl<T: BatchWriter + ?Sized> BatchWriter for &mut T {
    async fn write_batch(&mut self, points: &[Point]) -> Result<()> {
        (**self).write_batch(points).await
    }
}

/// InfluxDB 1.x backend using the HTTP API.
pub struct InfluxBackend {
    client: Client,
    database: String,
}

impl InfluxBackend {
    pub fn new(config: &InfluxConfig) -> Self {
        Self {
            client: Client::new(config.server.clone(), config.database.clone()),
            database: config.database.clone(),
        }
    }

    /// Names returned by `SHOW DATABASES`.
    pub async fn databases(&self) -> Result<Vec<String>> {
        let raw = self
            .client
            .query(ReadQuery::new("SHOW DATABASES"))
            .await
            .context("Invalid server address")?;
        parse_database_names(&raw)
    }

    /// Make sure the target database exists, creating it when allowed.
    pub async fn ensure_database(&self, auto_create: bool) -> Result<()> {
        let existing = self.databases().await?;
        if existing.iter().any(|name| *name == self.database) {
            debug!("database '{}' exists", self.database);
            return Ok(());
        }
        if !auto_create {
            bail!("Database '{}' does not exist", self.database);
        }

        let create = format!("CREATE DATABASE \"{}\"", self.database.replace('"', "\\\""));
        self.client
            .query(ReadQuery::new(create))
            .await
            .context("Failed to create database")?;
        info!("Created database '{}'", self.database);
        Ok(())
    }
}

#[async_trait]
impl BatchWriter for InfluxBackend {
    async fn write_batch(&mut self, points: &[Point]) -> Result<()> {
        // Points reach here stamped; unstamped ones share one instant
        let now = Utc::now();
        let queries: Vec<WriteQuery> = points.iter().map(|p| to_write_query(p, now)).collect();
        self.client.query(queries).await?;
        Ok(())
    }
}

fn to_write_query(point: &Point, now: DateTime<Utc>) -> WriteQuery {
    let ts = point.timestamp.unwrap_or(now);
    // unsigned, so pre-epoch instants clamp to 0
    let ts = match ts.timestamp_nanos_opt() {
        Some(nanos) => Timestamp::Nanoseconds(u128::try_from(nanos).unwrap_or(0)),
        None => Timestamp::Seconds(u128::try_from(ts.timestamp()).unwrap_or(0)),
    };

    let mut query = WriteQuery::new(ts, point.measurement.as_str());
    for (key, value) in &point.tags {
        query = query.add_tag(key.as_str(), value.as_str());
    }
    for (key, value) in &point.fields {
        query = match value {
            FieldValue::Integer(v) => query.add_field(key.as_str(), *v),
            FieldValue::Float(v) => query.add_field(key.as_str(), *v),
            FieldValue::Boolean(v) => query.add_field(key.as_str(), *v),
            FieldValue::String(v) => query.add_field(key.as_str(), v.as_str()),
            FieldValue::Timestamp(v) => query.add_field(key.as_str(), v.to_rfc3339()),
        };
    }
    query
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn parse_database_names(raw: &str) -> Result<Vec<String>> {
    let response: QueryResponse =
        serde_json::from_str(raw).context("Unexpected SHOW DATABASES response")?;

    let mut names = Vec::new();
    for result in response.results {
        if let Some(error) = result.error {
            bail!("SHOW DATABASES failed: {}", error);
        }
        for series in result.series {
            for row in series.values {
                if let Some(name) = row.first().and_then(|v| v.as_str()) {
                    names.push(name.to_string());
                }
            }
        }
    }
    Ok(names)
}
