//! Market data, indices, fixings and data conventions.
//!
//! A [`DataCollection`] holds every quote set a model calibrates to, keyed
//! by `(data_type, data_convention)`. Keys are case-insensitive and unique.

mod conventions;
mod fixings;
mod indices;

pub use conventions::{ConventionKind, DataConvention, DataConventionRegistry};
pub use fixings::FixingStore;
pub use indices::{IndexDefinition, IndexRegistry};

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

fn normalize(key: &str) -> String {
    key.trim().to_uppercase()
}

/// One-dimensional quote set: labelled axis points and their values.
///
/// Axis labels are tenors (`"2Y"`) for swaps and `"start x end"` date pairs
/// for futures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data1D {
    /// Quote type, e.g. `PAR RATE` or `PRICE`.
    pub data_type: String,
    /// Data convention that turns each point into an instrument.
    pub data_convention: String,
    /// Axis labels.
    pub axis: Vec<String>,
    /// Quotes, one per label.
    pub values: Vec<f64>,
}

impl Data1D {
    /// Creates a 1-D dataset.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` if the axis and values differ in length or a quote
    /// is not finite.
    pub fn new(
        data_type: impl Into<String>,
        data_convention: impl Into<String>,
        axis: Vec<String>,
        values: Vec<f64>,
    ) -> ModelResult<Self> {
        let data = Self {
            data_type: data_type.into(),
            data_convention: data_convention.into(),
            axis,
            values,
        };
        data.check()?;
        Ok(data)
    }

    fn check(&self) -> ModelResult<()> {
        if self.axis.len() != self.values.len() {
            return Err(ModelError::data(format!(
                "{} {}: axis has {} points but {} values",
                self.data_type,
                self.data_convention,
                self.axis.len(),
                self.values.len()
            )));
        }
        if let Some(pos) = self.values.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::data(format!(
                "{} {}: non-finite quote at '{}'",
                self.data_type, self.data_convention, self.axis[pos]
            )));
        }
        Ok(())
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the set has no points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(label, quote)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> {
        self.axis.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}

/// Two-dimensional quote set on numeric axes, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data2D {
    /// Quote type, e.g. `normalvol` or `corr`.
    pub data_type: String,
    /// Data convention, usually the index name.
    pub data_convention: String,
    /// Row axis (expiry in years).
    pub axis1: Vec<f64>,
    /// Column axis (tenor in years).
    pub axis2: Vec<f64>,
    /// `axis1.len()` rows of `axis2.len()` values.
    pub values: Vec<Vec<f64>>,
}

impl Data2D {
    /// Creates a 2-D dataset.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` if the grid shape does not match the axes.
    pub fn new(
        data_type: impl Into<String>,
        data_convention: impl Into<String>,
        axis1: Vec<f64>,
        axis2: Vec<f64>,
        values: Vec<Vec<f64>>,
    ) -> ModelResult<Self> {
        let data = Self {
            data_type: data_type.into(),
            data_convention: data_convention.into(),
            axis1,
            axis2,
            values,
        };
        data.check()?;
        Ok(data)
    }

    fn check(&self) -> ModelResult<()> {
        if self.values.len() != self.axis1.len() {
            return Err(ModelError::data(format!(
                "{} {}: {} rows for {} row-axis points",
                self.data_type,
                self.data_convention,
                self.values.len(),
                self.axis1.len()
            )));
        }
        if let Some(row) = self.values.iter().position(|r| r.len() != self.axis2.len()) {
            return Err(ModelError::data(format!(
                "{} {}: row {row} has {} values for {} column-axis points",
                self.data_type,
                self.data_convention,
                self.values[row].len(),
                self.axis2.len()
            )));
        }
        Ok(())
    }
}

/// A dataset of either shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketData {
    /// Labelled 1-D quotes.
    OneD(Data1D),
    /// Gridded 2-D quotes.
    TwoD(Data2D),
}

impl MarketData {
    /// The `(data_type, data_convention)` pair.
    pub fn key(&self) -> (&str, &str) {
        match self {
            MarketData::OneD(d) => (&d.data_type, &d.data_convention),
            MarketData::TwoD(d) => (&d.data_type, &d.data_convention),
        }
    }
}

/// A flat quote row as it appears in a CSV file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRow {
    /// Quote type.
    pub data_type: String,
    /// Data convention.
    pub data_convention: String,
    /// Axis label.
    pub axis: String,
    /// Quote.
    pub value: f64,
}

/// Repository of market datasets keyed by `(data_type, data_convention)`.
#[derive(Debug, Clone, Default)]
pub struct DataCollection {
    entries: HashMap<(String, String), MarketData>,
    order: Vec<(String, String)>,
}

impl DataCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dataset.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` if the key is already present.
    pub fn insert(&mut self, data: MarketData) -> ModelResult<()> {
        let (data_type, convention) = data.key();
        let key = (normalize(data_type), normalize(convention));
        if self.entries.contains_key(&key) {
            return Err(ModelError::data(format!(
                "duplicate market dataset ({}, {})",
                key.0, key.1
            )));
        }
        self.order.push(key.clone());
        self.entries.insert(key, data);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, data: MarketData) -> ModelResult<Self> {
        self.insert(data)?;
        Ok(self)
    }

    /// Looks up a dataset.
    pub fn get(&self, data_type: &str, data_convention: &str) -> Option<&MarketData> {
        self.entries
            .get(&(normalize(data_type), normalize(data_convention)))
    }

    /// Looks up a 2-D dataset.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` if it is missing or one-dimensional.
    pub fn get_2d(&self, data_type: &str, data_convention: &str) -> ModelResult<&Data2D> {
        match self.get(data_type, data_convention) {
            Some(MarketData::TwoD(d)) => Ok(d),
            Some(MarketData::OneD(_)) => Err(ModelError::data(format!(
                "market dataset ({data_type}, {data_convention}) is not two-dimensional"
            ))),
            None => Err(ModelError::data(format!(
                "missing market dataset ({data_type}, {data_convention})"
            ))),
        }
    }

    /// Every 1-D dataset whose convention is in `conventions`, in insertion
    /// order.
    pub fn one_d_by_conventions(&self, conventions: &[String]) -> Vec<&Data1D> {
        let wanted: Vec<String> = conventions.iter().map(|c| normalize(c)).collect();
        self.order
            .iter()
            .filter(|(_, conv)| wanted.contains(conv))
            .filter_map(|key| match self.entries.get(key) {
                Some(MarketData::OneD(d)) => Some(d),
                _ => None,
            })
            .collect()
    }

    /// Conventions of every stored 1-D dataset.
    pub fn available_conventions(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|key| match self.entries.get(key) {
                Some(MarketData::OneD(d)) => Some(d.data_convention.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of datasets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Groups flat quote rows into 1-D datasets, keeping row order within
    /// each group.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` for non-finite quotes.
    pub fn from_quote_rows(rows: impl IntoIterator<Item = QuoteRow>) -> ModelResult<Self> {
        let mut grouped: Vec<Data1D> = Vec::new();
        let mut slots: HashMap<(String, String), usize> = HashMap::new();

        for row in rows {
            let key = (normalize(&row.data_type), normalize(&row.data_convention));
            let slot = *slots.entry(key).or_insert_with(|| {
                grouped.push(Data1D {
                    data_type: row.data_type.clone(),
                    data_convention: row.data_convention.clone(),
                    axis: Vec::new(),
                    values: Vec::new(),
                });
                grouped.len() - 1
            });
            grouped[slot].axis.push(row.axis);
            grouped[slot].values.push(row.value);
        }

        let mut collection = Self::new();
        for data in grouped {
            data.check()?;
            collection.insert(MarketData::OneD(data))?;
        }
        Ok(collection)
    }

    /// Reads quote rows (`data_type,data_convention,axis,value`) from CSV.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` on malformed records.
    pub fn from_csv_reader<R: Read>(reader: R) -> ModelResult<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<QuoteRow>, _>>()
            .map_err(|e| ModelError::data(format!("invalid quote row: {e}")))?;
        Self::from_quote_rows(rows)
    }

    /// Reads quote rows from a CSV file.
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
