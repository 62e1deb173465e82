//! Historical index fixings.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use tenor_core::Date;

use crate::error::{ModelError, ModelResult};

#[derive(Debug, Deserialize)]
struct FixingRecord {
    index: String,
    date: String,
    value: f64,
}

/// Store of published fixings per index.
#[derive(Debug, Clone, Default)]
pub struct FixingStore {
    series: HashMap<String, BTreeMap<Date, f64>>,
}

impl FixingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fixing, replacing any previous value for that date.
    pub fn insert(&mut self, index: &str, date: Date, value: f64) {
        self.series
            .entry(index.trim().to_uppercase())
            .or_default()
            .insert(date, value);
    }

    /// The fixing of `index` on `date`.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` when no fixing was published for that date.
    pub fn get(&self, index: &str, date: Date) -> ModelResult<f64> {
        self.series
            .get(&index.trim().to_uppercase())
            .and_then(|s| s.get(&date))
            .copied()
            .ok_or_else(|| ModelError::data(format!("missing fixing for {index} on {date}")))
    }

    /// Fixings of `index` dated in `[start, end)`.
    pub fn range(&self, index: &str, start: Date, end: Date) -> Vec<(Date, f64)> {
        if end <= start {
            return Vec::new();
        }
        self.series
            .get(&index.trim().to_uppercase())
            .map(|s| s.range(start..end).map(|(d, v)| (*d, *v)).collect())
            .unwrap_or_default()
    }

    /// Total number of fixings across indices.
    pub fn len(&self) -> usize {
        self.series.values().map(BTreeMap::len).sum()
    }

    /// True when no fixings are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads `index,date,value` rows from CSV.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` for malformed rows or dates.
    pub fn from_csv_reader<R: Read>(reader: R) -> ModelResult<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut store = Self::new();
        for result in reader.deserialize() {
            let record: FixingRecord =
                result.map_err(|e| ModelError::data(format!("invalid fixing row: {e}")))?;
            let date = Date::parse(&record.date)?;
            store.insert(&record.index, date, record.value);
        }
        Ok(store)
    }

    /// Reads fixings from a CSV file.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` if the file cannot be read or parsed.
    pub fn load_csv(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| ModelError::data(format!("cannot open {}: {e}", path.display())))?;
        Self::from_csv_reader(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd(y, m, day).unwrap()
    }

    #[test]
    fn test_csv_and_range() {
        let text = "index,date,value\nSOFR-1B,2025-01-02,0.0431\nsofr-1b,2025-01-03,0.0433\n";
        let store = FixingStore::from_csv_reader(text.as_bytes()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("SOFR-1B", d(2025, 1, 3)).unwrap(), 0.0433);
        assert_eq!(store.range("SOFR-1B", d(2025, 1, 2), d(2025, 1, 3)).len(), 1);
        assert!(store.range("SOFR-1B", d(2025, 1, 3), d(2025, 1, 3)).is_empty());
    }

    #[test]
    fn test_missing_fixing_is_data_error() {
        let store = FixingStore::new();
        assert!(matches!(
            store.get("ESTR-1B", d(2025, 1, 2)),
            Err(ModelError::Data { .. })
        ));
    }

    #[test]
    fn test_bad_date_rejected() {
        let text = "index,date,value\nSOFR-1B,not-a-date,0.04\n";
        assert!(FixingStore::from_csv_reader(text.as_bytes()).is_err());
    }
}
