// src/process/pivot.rs

use std::{
    collections::{btree_map::Entry, BTreeMap, BTreeSet},
    fmt,
};
use tracing::{debug, instrument};

use super::{ParsedSeriesMap, Year};
use crate::error::{Error, Result};

/// A year × quarter grid. Rows are sorted years, columns are quarter labels
/// in order of first appearance. Absent cells are `None`, never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotTable {
    years: Vec<Year>,
    quarters: Vec<String>,
    /// Row-major, `years.len()` rows of `quarters.len()` cells.
    cells: Vec<Vec<Option<f64>>>,
}

impl PivotTable {
    pub(crate) fn from_parts(
        years: Vec<Year>,
        quarters: Vec<String>,
        cells: Vec<Vec<Option<f64>>>,
    ) -> Self {
        debug_assert_eq!(cells.len(), years.len());
        debug_assert!(cells.iter().all(|r| r.len() == quarters.len()));
        Self {
            years,
            quarters,
            cells,
        }
    }

    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn quarters(&self) -> &[String] {
        &self.quarters
    }

    pub fn row(&self, idx: usize) -> Option<&[Option<f64>]> {
        self.cells.get(idx).map(Vec::as_slice)
    }

    /// `(year, cells)` pairs in row order.
    pub fn rows(&self) -> impl Iterator<Item = (&Year, &[Option<f64>])> {
        self.years.iter().zip(self.cells.iter().map(Vec::as_slice))
    }

    pub fn get(&self, year: &Year, quarter: &str) -> Option<f64> {
        let r = self.years.binary_search(&year.clone().normalize()).ok()?;
        let c = self.quarters.iter().position(|q| q == quarter)?;
        self.cells[r][c]
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn populated_cells(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    pub fn max_value(&self) -> Option<f64> {
        self.cells
            .iter()
            .flatten()
            .flatten()
            .copied()
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
    }
}

/// Render like a data-frame print: `Year` index column, one right-aligned
/// column per quarter, `NaN` for absent cells.
impl fmt::Display for PivotTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year_labels: Vec<String> = self.years.iter().map(ToString::to_string).collect();
        let year_width = year_labels
            .iter()
            .map(|s| s.chars().count())
            .chain(std::iter::once("Year".len()))
            .max()
            .unwrap_or(4);

        let rendered: Vec<Vec<String>> = self
            .cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.map_or_else(|| "NaN".to_string(), |v| v.to_string()))
                    .collect()
            })
            .collect();
        let widths: Vec<usize> = self
            .quarters
            .iter()
            .enumerate()
            .map(|(c, q)| {
                rendered
                    .iter()
                    .map(|row| row[c].chars().count())
                    .chain(std::iter::once(q.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:<year_width$}", "Year")?;
        for (q, w) in self.quarters.iter().zip(&widths) {
            write!(f, "  {q:>w$}")?;
        }
        for (label, row) in year_labels.iter().zip(&rendered) {
            write!(f, "\n{label:<year_width$}")?;
            for (cell, w) in row.iter().zip(&widths) {
                write!(f, "  {cell:>w$}")?;
            }
        }
        Ok(())
    }
}

/// Pivot `quarter → [(year, value)]` into a year × quarter table.
///
/// Years are normalized first, so a numeric label and the matching number
/// share a row. The same (year, quarter) supplied twice is accepted only if both values
/// agree; otherwise the pivot is ambiguous and fails with `DuplicateCell`.
/// Quarters with no observations produce no column.
#[instrument(level = "debug", skip(data), fields(series = data.len()))]
pub fn pivot(data: &ParsedSeriesMap) -> Result<PivotTable> {
    let mut quarters: Vec<String> = Vec::with_capacity(data.len());
    let mut years: BTreeSet<Year> = BTreeSet::new();
    // (year, column) → value
    let mut values: BTreeMap<(Year, usize), f64> = BTreeMap::new();

    for (quarter, observations) in data {
        if observations.is_empty() {
            debug!(%quarter, "series has no observations; no column");
            continue;
        }
        let col = quarters.len();
        quarters.push(quarter.clone());

        for obs in observations {
            let year = obs.year.clone().normalize();
            years.insert(year.clone());
            match values.entry((year.clone(), col)) {
                Entry::Vacant(slot) => {
                    slot.insert(obs.value);
                }
                Entry::Occupied(existing) if *existing.get() == obs.value => {}
                Entry::Occupied(existing) => {
                    return Err(Error::DuplicateCell {
                        year,
                        quarter: quarter.clone(),
                        first: *existing.get(),
                        second: obs.value,
                    });
                }
            }
        }
    }

    let years: Vec<Year> = years.into_iter().collect();
    let mut cells = vec![vec![None; quarters.len()]; years.len()];
    for ((year, col), value) in values {
        // every key's year was inserted into `years` above
        if let Ok(row) = years.binary_search(&year) {
            cells[row][col] = Some(value);
        }
    }

    debug!(
        rows = years.len(),
        columns = quarters.len(),
        "pivoted series"
    );
    Ok(PivotTable::from_parts(years, quarters, cells))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ParsedObservation;

    fn y(n: i64) -> Year {
        Year::Number(n)
    }

    fn obs(year: i64, value: f64) -> ParsedObservation {
        ParsedObservation {
            year: y(year),
            value,
        }
    }

    fn label_obs(year: &str, value: f64) -> ParsedObservation {
        ParsedObservation {
            year: Year::from(year),
            value,
        }
    }

    fn example() -> ParsedSeriesMap {
        let mut m = ParsedSeriesMap::new();
        m.insert("Q1".into(), vec![obs(2020, 100.0), obs(2021, 150.0)]);
        m.insert("Q2".into(), vec![obs(2020, 80.0)]);
        m
    }

    #[test]
    fn pivots_worked_example() {
        let t = pivot(&example()).unwrap();
        assert_eq!(t.years(), &[Year::Number(2020), Year::Number(2021)]);
        assert_eq!(t.quarters(), &["Q1".to_string(), "Q2".to_string()]);
        assert_eq!(t.get(&y(2020), "Q1"), Some(100.0));
        assert_eq!(t.get(&y(2020), "Q2"), Some(80.0));
        assert_eq!(t.get(&y(2021), "Q1"), Some(150.0));
        assert_eq!(t.get(&y(2021), "Q2"), None);
        assert_eq!(t.row(1), Some(&[Some(150.0), None][..]));
        assert_eq!(t.populated_cells(), 3);
        assert_eq!(t.max_value(), Some(150.0));
    }

    #[test]
    fn missing_cells_are_none_not_zero() {
        let mut m = ParsedSeriesMap::new();
        m.insert("Q1".into(), vec![obs(2019, 0.0)]);
        m.insert("Q4".into(), vec![obs(2022, 5.0)]);
        let t = pivot(&m).unwrap();

        assert_eq!(t.get(&y(2019), "Q1"), Some(0.0));
        assert_eq!(t.get(&y(2019), "Q4"), None);
        assert_eq!(t.get(&y(2022), "Q1"), None);
        assert_eq!(t.get(&y(2030), "Q1"), None);
        assert_eq!(t.get(&y(2019), "Q9"), None);
    }

    #[test]
    fn years_sorted_and_columns_keep_first_appearance() {
        let mut m = ParsedSeriesMap::new();
        m.insert("Q3".into(), vec![obs(2022, 1.0), obs(2019, 2.0)]);
        m.insert("Q1".into(), vec![obs(2021, 3.0)]);
        m.insert("Q2".into(), vec![obs(2020, 4.0)]);
        let t = pivot(&m).unwrap();

        assert_eq!(t.years(), &[y(2019), y(2020), y(2021), y(2022)]);
        assert_eq!(t.quarters(), &["Q3", "Q1", "Q2"]);
    }

    #[test]
    fn label_years_sort_lexicographically() {
        let mut m = ParsedSeriesMap::new();
        m.insert(
            "Q1".into(),
            vec![
                label_obs("2021H1", 1.0),
                label_obs("2019H2", 2.0),
                label_obs("2020H1", 3.0),
                obs(2022, 4.0),
            ],
        );
        let t = pivot(&m).unwrap();
        assert_eq!(
            t.years(),
            &[
                y(2022),
                Year::from("2019H2"),
                Year::from("2020H1"),
                Year::from("2021H1")
            ]
        );
    }

    #[test]
    fn numeric_labels_share_a_row_with_numbers() {
        let mut m = ParsedSeriesMap::new();
        m.insert("Q1".into(), vec![label_obs("2020", 1.0), label_obs("999", 2.0)]);
        m.insert("Q2".into(), vec![obs(2020, 3.0)]);
        let t = pivot(&m).unwrap();

        assert_eq!(t.years(), &[y(999), y(2020)]);
        assert_eq!(t.get(&Year::from("2020"), "Q1"), Some(1.0));
        assert_eq!(t.get(&y(2020), "Q2"), Some(3.0));

        let mut m = ParsedSeriesMap::new();
        m.insert("Q1".into(), vec![label_obs("2020", 1.0), obs(2020, 5.0)]);
        assert!(matches!(
            pivot(&m),
            Err(Error::DuplicateCell { year: Year::Number(2020), .. })
        ));
    }

    #[test]
    fn deterministic() {
        let m = example();
        let a = pivot(&m).unwrap();
        for _ in 0..5 {
            assert_eq!(pivot(&m).unwrap(), a);
        }
    }

    #[test]
    fn conflicting_duplicate_is_rejected() {
        let mut m = ParsedSeriesMap::new();
        m.insert("Q1".into(), vec![obs(2020, 100.0), obs(2020, 120.0)]);
        match pivot(&m).unwrap_err() {
            Error::DuplicateCell {
                year,
                quarter,
                first,
                second,
            } => {
                assert_eq!(year, Year::Number(2020));
                assert_eq!(quarter, "Q1");
                assert_eq!(first, 100.0);
                assert_eq!(second, 120.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn agreeing_duplicate_is_accepted() {
        let mut m = ParsedSeriesMap::new();
        m.insert("Q1".into(), vec![obs(2020, 100.0), obs(2020, 100.0)]);
        let t = pivot(&m).unwrap();
        assert_eq!(t.years().len(), 1);
        assert_eq!(t.get(&y(2020), "Q1"), Some(100.0));
    }

    #[test]
    fn empty_series_and_empty_map() {
        let t = pivot(&ParsedSeriesMap::new()).unwrap();
        assert!(t.is_empty());
        assert!(t.quarters().is_empty());
        assert_eq!(t.max_value(), None);

        let mut m = ParsedSeriesMap::new();
        m.insert("Q1".into(), vec![]);
        m.insert("Q2".into(), vec![obs(2020, 1.0)]);
        let t = pivot(&m).unwrap();
        assert_eq!(t.quarters(), &["Q2"]);
    }

    #[test]
    fn display_matches_frame_layout() {
        let t = pivot(&example()).unwrap();
        let text = t.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["Year   Q1   Q2", "2020  100   80", "2021  150  NaN"]);
    }
}
