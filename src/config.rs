//! Pipeline configuration.
//!
//! Everything that used to be a fixed constant (endpoint, headers, query
//! type, output location) lives here and is handed to the pipeline
//! explicitly. Defaults reproduce the `quarterIssuance` query against
//! cn-abs.com; any field can be overridden from a YAML file named by the
//! `ISSUANCE_CONFIG` environment variable.

use serde::Deserialize;
use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

use crate::error::{Error, Result};

/// Environment variable holding the path of an optional YAML config file.
pub const CONFIG_ENV: &str = "ISSUANCE_CONFIG";

const DEFAULT_ENDPOINT: &str = "https://v1.cn-abs.com/ajax/ChartMarketHandler.ashx";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub output: OutputConfig,
    pub chart: ChartConfig,
}

/// What to POST, where, and how long to wait for it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub endpoint: Url,
    /// Sent on every request. `Content-Type` comes from the form encoder.
    pub headers: BTreeMap<String, String>,
    /// Form-encoded request body.
    pub form: BTreeMap<String, String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// File stem shared by the CSV, Parquet and chart outputs.
    pub base_name: String,
    /// Also write `<base_name>.parquet`.
    pub parquet: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ChartConfig {
    pub enabled: bool,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend_title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let headers = [
            ("Accept", "application/json, text/javascript, */*; q=0.01"),
            ("Accept-Language", "zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7"),
            ("Origin", "https://v1.cn-abs.com"),
            ("Referer", "https://v1.cn-abs.com/"),
            ("X-Requested-With", "XMLHttpRequest"),
            (
                "User-Agent",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36",
            ),
        ];
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint should parse"),
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            form: BTreeMap::from([("type".to_string(), "quarterIssuance".to_string())]),
            timeout_secs: 30,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            base_name: "quarter_issuance".to_string(),
            parquet: false,
        }
    }
}

impl OutputConfig {
    pub fn csv_path(&self) -> PathBuf {
        self.path_with_extension("csv")
    }

    pub fn parquet_path(&self) -> PathBuf {
        self.path_with_extension("parquet")
    }

    pub fn chart_path(&self) -> PathBuf {
        self.path_with_extension("svg")
    }

    fn path_with_extension(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.base_name, ext))
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "Statistics of the amount of products issued by quarter in the last four years"
                .to_string(),
            x_label: "Year".to_string(),
            y_label: "Value".to_string(),
            legend_title: "Quarter".to_string(),
            width: 1000,
            height: 600,
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML document; missing sections and fields take their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Self =
            serde_yaml::from_str(text).map_err(|e| Error::Config(format!("parsing YAML: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }

    /// Load from the file named by `ISSUANCE_CONFIG`, or fall back to defaults.
    pub fn from_env() -> Result<Self> {
        match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.output.base_name.trim().is_empty() {
            return Err(Error::Config("output.base_name must not be empty".into()));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(Error::Config("fetch.timeout_secs must be positive".into()));
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(Error::Config("chart dimensions must be positive".into()));
        }
        Ok(())
    }
}
