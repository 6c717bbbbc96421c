use ndarray::{Array1, Array2};
use std::path::{Path, PathBuf};

use super::aggregator::find_candidates;
use super::container::ContainerFormat;
use super::error::{SeriesError, TableError};
use super::series::{DatasetName, SeriesValues, TimeSeries};

/// timestamp, temperature, bx, by, bz
pub const MEASUREMENT_COLUMNS: usize = 5;

/// The columns of one or more text measurement files.
///
/// Rows whose timestamp is not strictly positive (including the placeholder row
/// written at creation) are never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementTable {
    pub timestamps: Vec<f64>,
    pub temperature: Vec<f64>,
    pub bx: Vec<f64>,
    pub by: Vec<f64>,
    pub bz: Vec<f64>,
}

impl MeasurementTable {
    /// Parse a whitespace separated measurement file, skipping `#` comment lines
    pub fn read_table_file(path: &Path) -> Result<Self, TableError> {
        let contents = std::fs::read_to_string(path)?;
        let mut table = Self::default();
        for (line_idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let row = line
                .split_whitespace()
                .map(|entry| entry.parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|_| TableError::ParsingError(path.to_path_buf(), line_idx + 1))?;
            if row.len() < MEASUREMENT_COLUMNS {
                return Err(TableError::ShortRow(
                    path.to_path_buf(),
                    line_idx + 1,
                    row.len(),
                ));
            }
            if row[0] > 0.0 {
                table.push_row(&row);
            }
        }
        Ok(table)
    }

    fn push_row(&mut self, row: &[f64]) {
        self.timestamps.push(row[0]);
        self.temperature.push(row[1]);
        self.bx.push(row[2]);
        self.by.push(row[3]);
        self.bz.push(row[4]);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn extend(&mut self, other: MeasurementTable) {
        self.timestamps.extend(other.timestamps);
        self.temperature.extend(other.temperature);
        self.bx.extend(other.bx);
        self.by.extend(other.by);
        self.bz.extend(other.bz);
    }

    /// Reorder every column by timestamp. Ties keep their current order.
    pub fn sort_by_timestamp(self) -> Self {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| self.timestamps[a].total_cmp(&self.timestamps[b]));
        let pick = |column: &[f64]| order.iter().map(|&i| column[i]).collect::<Vec<f64>>();
        Self {
            timestamps: pick(&self.timestamps),
            temperature: pick(&self.temperature),
            bx: pick(&self.bx),
            by: pick(&self.by),
            bz: pick(&self.bz),
        }
    }

    pub fn temperature_series(&self) -> Result<TimeSeries, SeriesError> {
        TimeSeries::new(
            Array1::from(self.timestamps.clone()),
            SeriesValues::Temperature(Array1::from(self.temperature.clone())),
        )
    }

    pub fn magnetic_series(&self) -> Result<TimeSeries, SeriesError> {
        let mut field = Array2::<f64>::zeros((self.len(), 3));
        for (row, ((x, y), z)) in self.bx.iter().zip(&self.by).zip(&self.bz).enumerate() {
            field[[row, 0]] = *x;
            field[[row, 1]] = *y;
            field[[row, 2]] = *z;
        }
        TimeSeries::new(
            Array1::from(self.timestamps.clone()),
            SeriesValues::MagneticField(field),
        )
    }
}

/// Read and merge every text measurement file in `dir`, ordered by timestamp
pub fn read_tables(dir: &Path) -> Result<MeasurementTable, TableError> {
    let candidates: Vec<PathBuf> =
        find_candidates(dir, DatasetName::Measurements, ContainerFormat::Text)?;
    if candidates.is_empty() {
        return Err(TableError::NoMatchingFiles(dir.to_path_buf()));
    }
    let mut table = MeasurementTable::default();
    for path in candidates.iter() {
        let part = MeasurementTable::read_table_file(path)?;
        log::debug!(
            "Read {} measurement rows from {}",
            part.len(),
            path.to_string_lossy()
        );
        table.extend(part);
    }
    Ok(table.sort_by_timestamp())
}
