//! InfluxDB 2.x query executor over the HTTP API.
//!
//! Connection settings are read from a config file with an `[influx2]`
//! section:
//!
//! ```toml
//! [influx2]
//! url = "http://localhost:8086"
//! org = "my-org"
//! token = "..."
//! timeout = 10000     # milliseconds, optional
//! verify_ssl = true   # optional
//! ```

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::load_config;
use crate::error::{ExtractError, Result};
use crate::executor::QueryExecutor;
use crate::table::{Cell, Table};

/// Columns InfluxDB adds to every CSV result that carry no data.
const BOOKKEEPING_COLUMNS: [&str; 3] = ["", "result", "table"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfluxConfig {
    pub url: String,
    pub org: String,
    pub token: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout: u64,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_verify_ssl() -> bool {
    true
}

#[derive(Deserialize)]
struct InfluxConfigFile {
    influx2: InfluxConfig,
}

impl InfluxConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file: InfluxConfigFile = load_config(path)?.parse()?;
        Ok(file.influx2)
    }
}

/// Blocking InfluxDB client.
#[derive(Debug, Clone)]
pub struct InfluxClient {
    config: InfluxConfig,
    http: Client,
}

impl InfluxClient {
    pub fn new(config: InfluxConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| ExtractError::ConnectionFailure(format!("HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(InfluxConfig::from_path(path)?)
    }

    /// Build a client from `path` and check that the server answers.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let client = Self::from_config_file(path)?;

        if client.ping() {
            info!(
                config_path = %path.display(),
                "Connected to InfluxDB at url:{}, org:{}",
                client.config.url,
                client.config.org
            );
            Ok(client)
        } else {
            error!(config_path = %path.display(), "Could not connect to InfluxDB");
            Err(ExtractError::ConnectionFailure(format!(
                "Could not connect to InfluxDB at {}",
                client.config.url
            )))
        }
    }

    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    /// `GET /ping`; any success status means reachable.
    pub fn ping(&self) -> bool {
        match self.http.get(self.endpoint("ping")).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Ping failed");
                false
            }
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }
}

impl QueryExecutor for InfluxClient {
    fn describe(&self) -> String {
        format!("InfluxDB(url:{}, org:{})", self.config.url, self.config.org)
    }

    fn query_table(&self, flux: &str) -> Result<Option<Table>> {
        let response = self
            .http
            .post(self.endpoint("api/v2/query"))
            .query(&[("org", self.config.org.as_str())])
            .header(AUTHORIZATION, format!("Token {}", self.config.token))
            .header(ACCEPT, "application/csv")
            .header(CONTENT_TYPE, "application/vnd.flux")
            .body(flux.to_string())
            .send()
            .map_err(|e| ExtractError::ConnectionFailure(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ExtractError::QueryFailure(format!("Reading response: {}", e)))?;

        if !status.is_success() {
            return Err(ExtractError::QueryFailure(format!(
                "HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        parse_annotated_csv(&body)
    }
}

/// Parse an InfluxDB CSV response into one table.
///
/// Annotation rows (`#datatype`, `#group`, `#default`) are skipped. Blank lines
/// separate tables, each with its own header; tables are concatenated over the
/// union of their columns. The bookkeeping columns (unnamed, `result`,
/// `table`) are removed. Returns `None` when the body holds no table.
///
/// Records shorter than their header are padded with empty cells; longer
/// records are a [`ExtractError::QueryFailure`].
pub fn parse_annotated_csv(body: &str) -> Result<Option<Table>> {
    let normalized = body.replace("\r\n", "\n");
    let mut combined: Option<Table> = None;

    for block in normalized.split("\n\n").filter(|b| !b.trim().is_empty()) {
        let Some(table) = parse_block(block)? else {
            continue;
        };
        match combined.as_mut() {
            Some(existing) => existing.concat(table),
            None => combined = Some(table),
        }
    }

    if let Some(table) = combined.as_mut() {
        table.drop_columns(&BOOKKEEPING_COLUMNS);
    }
    Ok(combined)
}

fn parse_block(block: &str) -> Result<Option<Table>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(block.as_bytes());

    let mut table: Option<Table> = None;

    for record in reader.records() {
        let record =
            record.map_err(|e| ExtractError::QueryFailure(format!("Malformed CSV: {}", e)))?;
        if record.get(0).is_some_and(|first| first.starts_with('#')) {
            continue;
        }

        let Some(t) = table.as_mut() else {
            // First non-annotation row is the header.
            table = Some(Table::new(record.iter().map(str::to_string).collect()));
            continue;
        };

        if record.iter().eq(t.columns().iter().map(String::as_str)) {
            continue;
        }
        if record.len() > t.column_count() {
            return Err(ExtractError::QueryFailure(format!(
                "Malformed CSV: record has {} fields, header has {}",
                record.len(),
                t.column_count()
            )));
        }
        let mut row: Vec<Cell> = record
            .iter()
            .map(|f| (!f.is_empty()).then(|| f.to_string()))
            .collect();
        row.resize(t.column_count(), None);
        t.push_row(row)?;
    }

    Ok(table)
}
