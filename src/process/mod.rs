// src/process/mod.rs
//! Response reshaping: raw series → parsed map → year × quarter table.

pub mod parse;
pub mod pivot;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

pub use parse::{parse, parse_response};
pub use pivot::{pivot, PivotTable};

/// The X value of a point: usually a calendar year, sometimes a text label.
///
/// Numbers order numerically and sort before labels; labels order
/// lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Year {
    Number(i64),
    Label(String),
}

impl Year {
    /// Interpret a text field: integers become `Number`, anything else a `Label`.
    pub fn from_field(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => Year::Number(n),
            Err(_) => Year::Label(trimmed.to_string()),
        }
    }

    /// Re-read a label through [`Year::from_field`], so `"2020"` and `2020`
    /// name the same year and a year's text form identifies it uniquely.
    pub fn normalize(self) -> Self {
        match self {
            Year::Label(s) => Year::from_field(&s),
            number => number,
        }
    }
}

impl Ord for Year {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Year::Number(a), Year::Number(b)) => a.cmp(b),
            (Year::Label(a), Year::Label(b)) => a.cmp(b),
            (Year::Number(_), Year::Label(_)) => Ordering::Less,
            (Year::Label(_), Year::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Year {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Year::Number(n) => write!(f, "{n}"),
            Year::Label(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Year {
    fn from(n: i64) -> Self {
        Year::Number(n)
    }
}

impl From<&str> for Year {
    fn from(s: &str) -> Self {
        Year::Label(s.to_string())
    }
}

/// One `{X, Y}` point as sent by the server. Fields are optional here so
/// their absence can be reported precisely by [`parse`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSeriesPoint {
    #[serde(rename = "X", default)]
    pub x: Option<Year>,
    #[serde(rename = "Y", default)]
    pub y: Option<f64>,
}

/// One quarter's series across years.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSeries {
    #[serde(rename = "SeriesName", default)]
    pub series_name: Option<String>,
    #[serde(rename = "Points", default)]
    pub points: Option<Vec<RawSeriesPoint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedObservation {
    pub year: Year,
    pub value: f64,
}

/// Series label → observations, in order of first appearance.
pub type ParsedSeriesMap = IndexMap<String, Vec<ParsedObservation>>;
