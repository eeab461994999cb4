//! Configuration loading.
//!
//! [`load_config`] decodes JSON, YAML and TOML files into a single
//! `serde_json::Value` tree so the typed sections below deserialize the same
//! way whatever the file format. Files with any other extension come back as
//! raw bytes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dst::{DstRule, DstTable};
use crate::error::{ExtractError, Result};
use crate::offset::RelativeOffset;
use crate::parse::DEFAULT_TIME_FORMAT;

/// Filter that matches every measurement.
pub const DEFAULT_FILTER: &str = r#"r["_measurement"] =~ /.*/"#;

/// A decoded configuration file.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigDocument {
    Structured(serde_json::Value),
    Raw(Vec<u8>),
}

impl ConfigDocument {
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            ConfigDocument::Structured(value) => Some(value),
            ConfigDocument::Raw(_) => None,
        }
    }

    /// Deserialize the whole document into `T`.
    pub fn parse<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        let value = self.as_value().ok_or_else(|| {
            ExtractError::ConfigParse("Config file has no structured format".to_string())
        })?;
        T::deserialize(value).map_err(|e| ExtractError::ConfigParse(e.to_string()))
    }
}

/// Load a configuration file, decoding it according to its extension.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigDocument> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ExtractError::ConfigNotFound(path.to_path_buf()));
    }

    let read_text = || {
        fs::read_to_string(path).map_err(|e| {
            ExtractError::ConfigParse(format!("Failed to read '{}': {}", path.display(), e))
        })
    };
    let decode_error =
        |e: &dyn std::fmt::Display| ExtractError::ConfigParse(format!("{}: {}", path.display(), e));

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let document = match extension.as_deref() {
        Some("json") => ConfigDocument::Structured(
            serde_json::from_str(&read_text()?).map_err(|e| decode_error(&e))?,
        ),
        Some("yaml") | Some("yml") => ConfigDocument::Structured(
            serde_yaml::from_str(&read_text()?).map_err(|e| decode_error(&e))?,
        ),
        Some("toml") => {
            let table: toml::Table = toml::from_str(&read_text()?).map_err(|e| decode_error(&e))?;
            ConfigDocument::Structured(toml_to_json(toml::Value::Table(table)))
        }
        _ => ConfigDocument::Raw(fs::read(path).map_err(|e| decode_error(&e))?),
    };

    debug!(path = %path.display(), "Loaded config");
    Ok(document)
}

/// TOML datetimes become their RFC 3339 text so they read like quoted
/// timestamps from the other formats.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}

/// Aggregation applied before results are returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Flux aggregate function, e.g. `mean` or `last`.
    #[serde(alias = "fn")]
    pub function: String,
    /// Flux duration literal, e.g. `1m`.
    pub every: String,
}

/// Everything needed to query one window from one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub bucket: String,
    pub time_format: String,
    #[serde(alias = "delta_time_start")]
    pub start_offset: RelativeOffset,
    #[serde(alias = "delta_time_end")]
    pub end_offset: RelativeOffset,
    /// Whole-hour offset of the local-equivalent time from UTC.
    pub tz_offset: i64,
    /// Flux predicate body, used as `filter(fn: (r) => <filter>)`.
    pub filter: String,
    pub columns_to_drop: Vec<String>,
    /// Tag whose values become columns.
    pub pivot_column: String,
    pub aggregate: Option<Aggregate>,
    pub sort_keys: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            start_offset: RelativeOffset::zero(),
            end_offset: RelativeOffset::zero(),
            tz_offset: 0,
            filter: DEFAULT_FILTER.to_string(),
            columns_to_drop: Vec::new(),
            pivot_column: "id".to_string(),
            aggregate: None,
            sort_keys: vec!["_time".to_string(), "_measurement".to_string()],
        }
    }
}

impl ExtractionConfig {
    /// The same query shape over one whole day starting at the reference time.
    pub fn for_day(&self, tz_offset: i64) -> Self {
        Self {
            start_offset: RelativeOffset::zero(),
            end_offset: RelativeOffset::from_hours(24),
            tz_offset,
            ..self.clone()
        }
    }
}

/// Where and when results are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub base_dir: PathBuf,
    /// File name prefix; the ISO date and `.csv` are appended.
    pub prefix: String,
    /// Results with fewer rows are discarded.
    pub min_rows: usize,
    /// Column used as the primary ordering key of written files.
    pub time_column: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data"),
            prefix: "extract_".to_string(),
            min_rows: crate::extract::DEFAULT_MIN_ROWS,
            time_column: "_time".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DstConfig {
    /// Offset for years without a rule.
    pub fallback_offset: i64,
    pub rules: Vec<DstRule>,
}

impl Default for DstConfig {
    fn default() -> Self {
        Self {
            fallback_offset: -8,
            rules: vec![DstRule::pacific_2024()],
        }
    }
}

impl DstConfig {
    pub fn to_table(&self) -> DstTable {
        DstTable::new(self.rules.iter().copied(), self.fallback_offset)
    }
}

/// Application configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub query: ExtractionConfig,
    pub output: OutputConfig,
    pub dst: DstConfig,
}

impl AppConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        load_config(path)?.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let err = load_config("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ExtractError::ConfigNotFound(_)));
    }

    #[test]
    fn loads_each_structured_format() {
        let dir = tempfile::tempdir().unwrap();
        let json = write_file(dir.path(), "a.json", r#"{"query": {"bucket": "b"}}"#);
        let yaml = write_file(dir.path(), "a.yaml", "query:\n  bucket: b\n");
        let toml = write_file(dir.path(), "a.toml", "[query]\nbucket = \"b\"\n");

        for path in [json, yaml, toml] {
            let doc = load_config(&path).unwrap();
            let value = doc.as_value().unwrap();
            assert_eq!(value["query"]["bucket"], "b", "{}", path.display());
        }
    }

    #[test]
    fn unknown_extension_is_raw() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "notes.txt", "hello");
        assert_eq!(
            load_config(&path).unwrap(),
            ConfigDocument::Raw(b"hello".to_vec())
        );
    }

    #[test]
    fn malformed_file_is_config_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bad.json", "{not json");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ExtractError::ConfigParse(_)));
    }

    #[test]
    fn extraction_defaults() {
        let config: ExtractionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.time_format, DEFAULT_TIME_FORMAT);
        assert_eq!(config.start_offset, RelativeOffset::zero());
        assert_eq!(config.end_offset, RelativeOffset::zero());
        assert_eq!(config.tz_offset, 0);
        assert_eq!(config.filter, DEFAULT_FILTER);
        assert_eq!(config.pivot_column, "id");
        assert_eq!(config.sort_keys, vec!["_time", "_measurement"]);
        assert!(config.aggregate.is_none());
    }

    #[test]
    fn extraction_from_toml_with_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "application.toml",
            r#"
[query]
bucket = "sensors"
delta_time_start = [0, -2, 0, 0]
delta_time_end = { hours = 1 }
tz_offset = -8
columns_to_drop = ["result", "table"]

[query.aggregate]
fn = "mean"
every = "1m"

[output]
base_dir = "out"
min_rows = 20

[dst]
fallback_offset = 0
"#,
        );

        let config = AppConfig::from_path(&path).unwrap();
        assert_eq!(config.query.bucket, "sensors");
        assert_eq!(config.query.start_offset, RelativeOffset::from_hours(-2));
        assert_eq!(config.query.end_offset, RelativeOffset::from_hours(1));
        assert_eq!(config.query.tz_offset, -8);
        assert_eq!(config.query.columns_to_drop, vec!["result", "table"]);
        assert_eq!(
            config.query.aggregate,
            Some(Aggregate {
                function: "mean".into(),
                every: "1m".into()
            })
        );
        assert_eq!(config.output.base_dir, PathBuf::from("out"));
        assert_eq!(config.output.min_rows, 20);
        assert_eq!(config.output.prefix, "extract_");
        assert_eq!(config.dst.fallback_offset, 0);
        assert_eq!(config.dst.rules, vec![DstRule::pacific_2024()]);
    }

    #[test]
    fn dst_rules_from_toml_datetimes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "application.toml",
            r#"
[dst]
fallback_offset = -8

[[dst.rules]]
year = 2025
start = 2025-03-09T02:00:00
end = 2025-11-02T01:00:00

[[dst.rules]]
year = 2026
start = "2026-03-08T02:00:00"
end = "2026-11-01T01:00:00"
standard_offset = 0
daylight_offset = 1
"#,
        );

        let doc = load_config(&path).unwrap();
        assert_eq!(
            doc.as_value().unwrap()["dst"]["rules"][0]["start"],
            "2025-03-09T02:00:00"
        );

        let config: AppConfig = doc.parse().unwrap();
        let rules = &config.dst.rules;
        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules[0].start,
            chrono::NaiveDate::from_ymd_opt(2025, 3, 9)
                .unwrap()
                .and_hms_opt(2, 0, 0)
                .unwrap()
        );
        assert_eq!(rules[0].daylight_offset, -7);
        assert_eq!(rules[1].daylight_offset, 1);

        let table = config.dst.to_table();
        let summer = chrono::NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(table.offset_for(summer), -7);
    }

    #[test]
    fn toml_scalars_keep_their_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "a.toml",
            "n = 3
x = 1.5
flag = true
day = 2024-05-16
list = [1, 2]
",
        );
        let doc = load_config(&path).unwrap();
        let value = doc.as_value().unwrap();
        assert_eq!(value["n"], 3);
        assert_eq!(value["x"], 1.5);
        assert_eq!(value["flag"], true);
        assert_eq!(value["day"], "2024-05-16");
        assert_eq!(value["list"], serde_json::json!([1, 2]));
    }

    #[test]
    fn app_config_from_raw_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "application.conf", "query=1");
        let err = AppConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, ExtractError::ConfigParse(_)));
    }

    #[test]
    fn for_day_overrides_window_only() {
        let base = ExtractionConfig {
            bucket: "b".into(),
            start_offset: RelativeOffset::from_hours(-2),
            columns_to_drop: vec!["x".into()],
            ..ExtractionConfig::default()
        };
        let day = base.for_day(-7);
        assert_eq!(day.start_offset, RelativeOffset::zero());
        assert_eq!(day.end_offset, RelativeOffset::from_hours(24));
        assert_eq!(day.tz_offset, -7);
        assert_eq!(day.bucket, "b");
        assert_eq!(day.columns_to_drop, vec!["x"]);
    }
}
