use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SierraError};
use crate::stats;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the input table
// ---------------------------------------------------------------------------

/// A dynamically-typed table cell mirroring common CSV / JSON / Parquet dtypes.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl CellValue {
    /// Guess a cell's type from its textual form.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Number(f);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::Text(s.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the raw loaded rows
// ---------------------------------------------------------------------------

/// One input row: column name → cell.
pub type Record = BTreeMap<String, CellValue>;

/// A loaded table with named columns, before any column is interpreted.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Column names in source order.
    pub column_names: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(column_names: Vec<String>, records: Vec<Record>) -> Self {
        Self {
            column_names,
            records,
        }
    }

    /// Build a table whose columns are the union of the records' keys,
    /// in first-seen order.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut column_names: Vec<String> = Vec::new();
        for rec in &records {
            for col in rec.keys() {
                if !column_names.contains(col) {
                    column_names.push(col.clone());
                }
            }
        }
        Self::new(column_names, records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_names.iter().any(|c| c == name)
    }

    /// Read a column as numbers. Null / absent cells become NaN; any other
    /// non-numeric cell is an error naming the row.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        if !self.has_column(name) {
            return Err(SierraError::MissingColumn {
                column: name.to_string(),
                available: self.column_names.join(", "),
            });
        }
        self.records
            .iter()
            .enumerate()
            .map(|(row, rec)| match rec.get(name) {
                Some(CellValue::Number(v)) => Ok(*v),
                Some(CellValue::Null) | None => Ok(f64::NAN),
                Some(other) => Err(SierraError::InvalidValue {
                    column: name.to_string(),
                    row,
                    value: other.to_string(),
                }),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ColumnMapping – which columns hold time / estimate / limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub time: String,
    pub estimate: String,
    pub lower: String,
    pub upper: String,
}

impl ColumnMapping {
    pub fn new(time: &str, estimate: &str, lower: &str, upper: &str) -> Self {
        Self {
            time: time.to_string(),
            estimate: estimate.to_string(),
            lower: lower.to_string(),
            upper: upper.to_string(),
        }
    }

    /// `t`, `RD`, `RD_LCL`, `RD_UCL`.
    pub fn difference() -> Self {
        Self::new("t", "RD", "RD_LCL", "RD_UCL")
    }

    /// `t`, `RR`, `RR_LCL`, `RR_UCL`.
    pub fn ratio() -> Self {
        Self::new("t", "RR", "RR_LCL", "RR_UCL")
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::difference()
    }
}

// ---------------------------------------------------------------------------
// Observation / ObservationSeries
// ---------------------------------------------------------------------------

/// One time point with its estimate and reported confidence limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub time: f64,
    pub estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl Observation {
    pub fn new(time: f64, estimate: f64, lower_bound: f64, upper_bound: f64) -> Self {
        Self {
            time,
            estimate,
            lower_bound,
            upper_bound,
        }
    }

    /// Standard deviation implied by the reported 95 % upper limit.
    pub fn scale(&self) -> f64 {
        stats::implied_scale(self.estimate, self.upper_bound)
    }

    fn bounds_ordered(&self) -> bool {
        let vals = [self.lower_bound, self.estimate, self.upper_bound];
        if vals.iter().any(|v| !v.is_finite()) {
            return true;
        }
        self.lower_bound <= self.estimate && self.estimate <= self.upper_bound
    }
}

/// Time-ordered observations. Times are finite, non-negative and strictly
/// increasing; the series is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSeries {
    observations: Vec<Observation>,
}

impl ObservationSeries {
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        if observations.is_empty() {
            return Err(SierraError::Series("no observations".into()));
        }
        for (i, obs) in observations.iter().enumerate() {
            if !obs.time.is_finite() || obs.time < 0.0 {
                return Err(SierraError::Series(format!(
                    "row {i}: time {} must be finite and non-negative",
                    obs.time
                )));
            }
        }
        if let Some(i) = observations
            .windows(2)
            .position(|w| w[1].time <= w[0].time)
        {
            return Err(SierraError::Series(format!(
                "row {}: time {} does not increase past {}",
                i + 1,
                observations[i + 1].time,
                observations[i].time
            )));
        }

        let unordered = observations.iter().filter(|o| !o.bounds_ordered()).count();
        if unordered > 0 {
            log::warn!("{unordered} observations have limits that do not bracket the estimate");
        }

        Ok(Self { observations })
    }

    /// Build a series from the mapped columns of a table, sorted by time.
    pub fn from_table(table: &Table, columns: &ColumnMapping) -> Result<Self> {
        let time = table.numeric_column(&columns.time)?;
        let estimate = table.numeric_column(&columns.estimate)?;
        let lower = table.numeric_column(&columns.lower)?;
        let upper = table.numeric_column(&columns.upper)?;

        let mut observations: Vec<Observation> = (0..table.len())
            .map(|i| Observation::new(time[i], estimate[i], lower[i], upper[i]))
            .collect();

        if observations
            .windows(2)
            .any(|w| w[1].time.total_cmp(&w[0].time).is_lt())
        {
            log::debug!("sorting {} rows by '{}'", observations.len(), columns.time);
            observations.sort_by(|a, b| a.time.total_cmp(&b.time));
        }

        Self::new(observations)
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn max_time(&self) -> f64 {
        self.observations.last().map_or(0.0, |o| o.time)
    }

    /// Consecutive pairs: each observation with the time of the next one.
    /// The final observation has no successor and is not yielded.
    pub fn steps(&self) -> impl Iterator<Item = (&Observation, f64)> {
        self.observations.windows(2).map(|w| (&w[0], w[1].time))
    }

    /// Largest finite |limit| over all reported limits, optionally after
    /// a transform (e.g. `ln` for ratio axes).
    pub fn max_abs_limit(&self, transform: impl Fn(f64) -> f64) -> Option<f64> {
        self.observations
            .iter()
            .flat_map(|o| [o.lower_bound, o.upper_bound])
            .map(transform)
            .filter(|v| v.is_finite())
            .map(f64::abs)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, CellValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn table() -> Table {
        Table::from_records(vec![
            record(&[
                ("t", CellValue::Number(7.0)),
                ("RD", CellValue::Number(-0.01)),
                ("RD_LCL", CellValue::Number(-0.03)),
                ("RD_UCL", CellValue::Number(0.01)),
            ]),
            record(&[
                ("t", CellValue::Number(0.0)),
                ("RD", CellValue::Number(0.0)),
                ("RD_LCL", CellValue::Null),
                ("RD_UCL", CellValue::Null),
            ]),
        ])
    }

    #[test]
    fn parses_cells() {
        assert_eq!(CellValue::parse(""), CellValue::Null);
        assert_eq!(CellValue::parse(" 1.5 "), CellValue::Number(1.5));
        assert_eq!(CellValue::parse("true"), CellValue::Bool(true));
        assert_eq!(CellValue::parse("abc"), CellValue::Text("abc".into()));
        assert!(CellValue::parse("NaN").as_f64().unwrap().is_nan());
    }

    #[test]
    fn series_from_table_sorts_by_time() {
        let series = ObservationSeries::from_table(&table(), &ColumnMapping::difference()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.observations()[0].time, 0.0);
        assert!(series.observations()[0].upper_bound.is_nan());
        assert_eq!(series.max_time(), 7.0);
    }

    #[test]
    fn missing_column_names_the_column() {
        let err = ObservationSeries::from_table(&table(), &ColumnMapping::ratio()).unwrap_err();
        match err {
            SierraError::MissingColumn { column, available } => {
                assert_eq!(column, "RR");
                assert!(available.contains("RD_UCL"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn text_cell_in_mapped_column_is_rejected() {
        let mut t = table();
        t.records[0].insert("RD".into(), CellValue::Text("n/a".into()));
        let err = ObservationSeries::from_table(&t, &ColumnMapping::difference()).unwrap_err();
        assert!(matches!(err, SierraError::InvalidValue { row: 0, .. }));
    }

    #[test]
    fn rejects_duplicate_and_negative_times() {
        let dup = vec![
            Observation::new(1.0, 0.0, -1.0, 1.0),
            Observation::new(1.0, 0.0, -1.0, 1.0),
        ];
        assert!(ObservationSeries::new(dup).is_err());
        let neg = vec![Observation::new(-1.0, 0.0, -1.0, 1.0)];
        assert!(ObservationSeries::new(neg).is_err());
        assert!(ObservationSeries::new(Vec::new()).is_err());
    }

    #[test]
    fn steps_skip_the_final_observation() {
        let series = ObservationSeries::new(vec![
            Observation::new(0.0, 0.0, -1.0, 1.0),
            Observation::new(1.0, 0.1, -1.0, 1.0),
            Observation::new(3.0, 0.2, -1.0, 1.0),
        ])
        .unwrap();
        let steps: Vec<(f64, f64)> = series.steps().map(|(o, next)| (o.time, next)).collect();
        assert_eq!(steps, vec![(0.0, 1.0), (1.0, 3.0)]);
    }

    #[test]
    fn max_abs_limit_ignores_undefined_values() {
        let series = ObservationSeries::from_table(&table(), &ColumnMapping::difference()).unwrap();
        assert_eq!(series.max_abs_limit(|v| v), Some(0.03));
        assert_eq!(series.max_abs_limit(f64::ln), Some(0.01f64.ln().abs()));
    }
}
