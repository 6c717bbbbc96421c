use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::error::CurveError;
use super::schema::{header_cell, DEFAULT_WIDTH};
use super::series::{SeriesValues, TimeSeries};
use super::writer::encode_row;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// How a raw series is turned into something worth plotting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveOptions {
    pub filter_kernel: usize,
    pub derivative: bool,
    pub derivative_bound: f64,
}

impl Default for CurveOptions {
    fn default() -> Self {
        Self {
            filter_kernel: 15,
            derivative: false,
            derivative_bound: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurveColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// A prepared curve: elapsed hours on the x axis and one or more y columns
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub label: String,
    pub hours: Vec<f64>,
    pub columns: Vec<CurveColumn>,
}

impl Curve {
    /// Median filtered temperature (or its rate of change per hour)
    pub fn temperature(
        series: &TimeSeries,
        label: &str,
        options: &CurveOptions,
    ) -> Result<Self, CurveError> {
        let temps = match series.values() {
            SeriesValues::Temperature(t) => t.to_vec(),
            other => return Err(CurveError::WrongValues("temperature", other.kind_name())),
        };
        let hours = hours_since_start(&series.timestamps().to_vec())?;
        let filtered = median_filter(&temps, options.filter_kernel)?;

        let column = if options.derivative {
            CurveColumn {
                name: String::from("dtemperature_dt"),
                values: clip(&gradient(&hours, &filtered), options.derivative_bound),
            }
        } else {
            CurveColumn {
                name: String::from("temperature"),
                values: filtered,
            }
        };

        Ok(Self {
            label: label.to_string(),
            hours,
            columns: vec![column],
        })
    }

    /// Field components relative to the first sample, plus the squared magnitude
    pub fn magnetic(
        series: &TimeSeries,
        label: &str,
        options: &CurveOptions,
    ) -> Result<Self, CurveError> {
        let field = match series.values() {
            SeriesValues::MagneticField(f) => f,
            other => return Err(CurveError::WrongValues("magnetic_field", other.kind_name())),
        };
        let hours = hours_since_start(&series.timestamps().to_vec())?;

        let bx = subtract_baseline(&field.column(0).to_vec());
        let by = subtract_baseline(&field.column(1).to_vec());
        let bz = subtract_baseline(&field.column(2).to_vec());
        let b2 = magnitude_squared(&bx, &by, &bz);

        let mut columns = Vec::with_capacity(4);
        for (name, values) in [("bx", bx), ("by", by), ("bz", bz), ("b2", b2)] {
            let filtered = median_filter(&values, options.filter_kernel)?;
            if options.derivative {
                columns.push(CurveColumn {
                    name: format!("d{name}_dt"),
                    values: clip(&gradient(&hours, &filtered), options.derivative_bound),
                });
            } else {
                columns.push(CurveColumn {
                    name: name.to_string(),
                    values: filtered,
                });
            }
        }

        Ok(Self {
            label: label.to_string(),
            hours,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    /// Write the curve as a text table, in the same layout as a measurement file
    pub fn write(&self, path: &Path) -> Result<(), CurveError> {
        for column in self.columns.iter() {
            if column.values.len() != self.hours.len() {
                return Err(CurveError::ColumnLength(
                    column.name.clone(),
                    column.values.len(),
                    self.hours.len(),
                ));
            }
        }

        let mut file = BufWriter::new(File::create(path)?);
        let mut header = header_cell("hours", DEFAULT_WIDTH);
        for column in self.columns.iter() {
            header.push_str(&header_cell(&column.name, DEFAULT_WIDTH));
        }
        writeln!(file, "# {}", self.label)?;
        writeln!(file, "# {header}")?;

        let mut row = Vec::with_capacity(self.columns.len() + 1);
        for (idx, hour) in self.hours.iter().enumerate() {
            row.clear();
            row.push(*hour);
            row.extend(self.columns.iter().map(|c| c.values[idx]));
            writeln!(file, "{}", encode_row(&row))?;
        }
        file.flush()?;
        Ok(())
    }
}

/// Sliding median with zero padding at both ends, so the output has the input length.
///
/// The kernel must be odd.
pub fn median_filter(values: &[f64], kernel: usize) -> Result<Vec<f64>, CurveError> {
    if kernel == 0 || kernel % 2 == 0 {
        return Err(CurveError::BadKernel(kernel));
    }
    let half = kernel / 2;
    let mut window = Vec::with_capacity(kernel);
    let mut filtered = Vec::with_capacity(values.len());
    for center in 0..values.len() {
        window.clear();
        for offset in 0..kernel {
            let pos = center + offset;
            // pos indexes the zero padded signal
            if pos < half || pos - half >= values.len() {
                window.push(0.0);
            } else {
                window.push(values[pos - half]);
            }
        }
        window.sort_by(|a, b| a.total_cmp(b));
        filtered.push(window[half]);
    }
    Ok(filtered)
}

pub fn hours_since_start(timestamps: &[f64]) -> Result<Vec<f64>, CurveError> {
    let start = timestamps.first().ok_or(CurveError::EmptySeries)?;
    Ok(timestamps
        .iter()
        .map(|t| (t - start) / SECONDS_PER_HOUR)
        .collect())
}

pub fn subtract_baseline(values: &[f64]) -> Vec<f64> {
    match values.first() {
        Some(base) => values.iter().map(|v| v - base).collect(),
        None => vec![],
    }
}

pub fn magnitude_squared(x: &[f64], y: &[f64], z: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(y)
        .zip(z)
        .map(|((a, b), c)| a * a + b * b + c * c)
        .collect()
}

/// dy/dx with second order central differences inside and one sided differences
/// at the ends. Coincident x values give a zero slope.
pub fn gradient(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return vec![0.0; n];
    }
    let slope = |i: usize, j: usize| {
        let dx = x[j] - x[i];
        if dx == 0.0 {
            0.0
        } else {
            (y[j] - y[i]) / dx
        }
    };

    let mut grad = Vec::with_capacity(n);
    grad.push(slope(0, 1));
    for i in 1..n - 1 {
        let hd = x[i] - x[i - 1];
        let hs = x[i + 1] - x[i];
        if hd == 0.0 || hs == 0.0 {
            grad.push(slope(i - 1, i + 1));
            continue;
        }
        let a = -hs / (hd * (hd + hs));
        let b = (hs - hd) / (hd * hs);
        let c = hd / (hs * (hd + hs));
        grad.push(a * y[i - 1] + b * y[i] + c * y[i + 1]);
    }
    grad.push(slope(n - 2, n - 1));
    grad
}

fn clip(values: &[f64], bound: f64) -> Vec<f64> {
    values.iter().map(|v| v.clamp(-bound, bound)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};
    use tempfile::tempdir;

    #[test]
    fn test_median_filter_zero_padded() {
        let filtered = median_filter(&[3.0, 1.0, 2.0, 5.0, 4.0], 3).unwrap();
        assert_eq!(filtered, vec![1.0, 2.0, 2.0, 4.0, 4.0]);
        assert_eq!(median_filter(&[7.0, 7.0], 1).unwrap(), vec![7.0, 7.0]);
        // Kernel longer than the signal still works
        assert_eq!(median_filter(&[5.0, 6.0], 5).unwrap(), vec![0.0, 0.0]);
        assert!(matches!(
            median_filter(&[1.0], 4),
            Err(CurveError::BadKernel(4))
        ));
    }

    #[test]
    fn test_gradient() {
        let x = [0.0, 1.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        for g in gradient(&x, &y) {
            assert!((g - 2.0).abs() < 1e-12);
        }
        assert_eq!(gradient(&[1.0], &[1.0]), vec![0.0]);
    }

    #[test]
    fn test_temperature_curve() {
        let series = TimeSeries::new(
            arr1(&[3600.0, 5400.0, 7200.0]),
            SeriesValues::Temperature(arr1(&[20.0, 21.0, 22.0])),
        )
        .unwrap();
        let options = CurveOptions {
            filter_kernel: 1,
            ..CurveOptions::default()
        };
        let curve = Curve::temperature(&series, "camel", &options).unwrap();
        assert_eq!(curve.hours, vec![0.0, 0.5, 1.0]);
        assert_eq!(curve.columns[0].values, vec![20.0, 21.0, 22.0]);

        let derivative = Curve::temperature(
            &series,
            "camel",
            &CurveOptions {
                derivative: true,
                derivative_bound: 1.5,
                ..options
            },
        )
        .unwrap();
        assert_eq!(derivative.columns[0].name, "dtemperature_dt");
        assert_eq!(derivative.columns[0].values, vec![1.5, 1.5, 1.5]);
    }

    #[test]
    fn test_magnetic_curve_baseline() {
        let series = TimeSeries::new(
            arr1(&[10.0, 20.0]),
            SeriesValues::MagneticField(arr2(&[[5.0, 1.0, -2.0], [6.0, 3.0, -2.0]])),
        )
        .unwrap();
        let options = CurveOptions {
            filter_kernel: 1,
            ..CurveOptions::default()
        };
        let curve = Curve::magnetic(&series, "petrel", &options).unwrap();
        let names: Vec<&str> = curve.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["bx", "by", "bz", "b2"]);
        assert_eq!(curve.columns[0].values, vec![0.0, 1.0]);
        assert_eq!(curve.columns[1].values, vec![0.0, 2.0]);
        assert_eq!(curve.columns[3].values, vec![0.0, 5.0]);

        assert!(matches!(
            Curve::temperature(&series, "petrel", &options),
            Err(CurveError::WrongValues("temperature", "magnetic_field"))
        ));
    }

    #[test]
    fn test_write_curve() {
        let dir = tempdir().unwrap();
        let curve = Curve {
            label: String::from("axolotl"),
            hours: vec![0.0, 1.0],
            columns: vec![CurveColumn {
                name: String::from("temperature"),
                values: vec![20.0, 21.0],
            }],
        };
        let path = dir.path().join("temperature.txt");
        curve.write(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "# axolotl");
        assert_eq!(lines[1], format!("# {:>18}{:>18}", "hours", "temperature"));
        assert_eq!(
            lines[3],
            "1.000000000000000000e+00 2.100000000000000000e+01"
        );
    }

    #[test]
    fn test_short_column_is_an_error() {
        let dir = tempdir().unwrap();
        let curve = Curve {
            label: String::from("camel"),
            hours: vec![0.0, 1.0, 2.0],
            columns: vec![CurveColumn {
                name: String::from("bx"),
                values: vec![1.0],
            }],
        };
        let path = dir.path().join("magnetometry.txt");
        assert!(matches!(
            curve.write(&path),
            Err(CurveError::ColumnLength(name, 1, 3)) if name == "bx"
        ));
        assert!(!path.exists());
    }
}
