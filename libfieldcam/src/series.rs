use ndarray::{concatenate, Array1, Array2, Array4, ArrayView1, Axis};
use std::fmt::Display;
use std::str::FromStr;

use super::error::SeriesError;

/// The named fields a reader may ask a container for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subset {
    Exposure,
    Temperature,
    MagneticField,
}

impl Subset {
    /// Name of the container field holding this subset
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Exposure => "exposure",
            Self::Temperature => "temperature",
            Self::MagneticField => "magnetic_field",
        }
    }
}

impl FromStr for Subset {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exposure" => Ok(Self::Exposure),
            "temperature" => Ok(Self::Temperature),
            "magnetic_field" => Ok(Self::MagneticField),
            _ => Err(SeriesError::InvalidSubset(s.to_string())),
        }
    }
}

impl Display for Subset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

/// The logical datasets stored in an acquisition directory.
///
/// Files are only told apart by this marker appearing somewhere in their name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetName {
    Exposures,
    Measurements,
}

impl DatasetName {
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Exposures => "exposures",
            Self::Measurements => "measurements",
        }
    }
}

impl FromStr for DatasetName {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exposures" => Ok(Self::Exposures),
            "measurements" => Ok(Self::Measurements),
            _ => Err(SeriesError::InvalidDataset(s.to_string())),
        }
    }
}

impl Display for DatasetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.marker())
    }
}

/// The record half of a TimeSeries. Axis 0 is always the record axis.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValues {
    /// Frames as [count, height, width, 3]
    Exposure(Array4<u8>),
    Temperature(Array1<f64>),
    /// Field components as [count, 3] (bx, by, bz)
    MagneticField(Array2<f64>),
}

impl SeriesValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Exposure(a) => a.len_of(Axis(0)),
            Self::Temperature(a) => a.len(),
            Self::MagneticField(a) => a.len_of(Axis(0)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Exposure(_) => "exposure",
            Self::Temperature(_) => "temperature",
            Self::MagneticField(_) => "magnetic_field",
        }
    }

    /// Gather records by index along the record axis
    pub fn select(&self, indices: &[usize]) -> Self {
        match self {
            Self::Exposure(a) => Self::Exposure(a.select(Axis(0), indices)),
            Self::Temperature(a) => Self::Temperature(a.select(Axis(0), indices)),
            Self::MagneticField(a) => Self::MagneticField(a.select(Axis(0), indices)),
        }
    }

    fn concatenate(parts: &[&SeriesValues]) -> Result<Self, SeriesError> {
        let first = parts.first().ok_or(SeriesError::NothingToConcatenate)?;
        match first {
            Self::Exposure(head) => {
                let mut views = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        Self::Exposure(a) => {
                            if a.shape()[1..] != head.shape()[1..] {
                                return Err(SeriesError::MismatchedFrameShape(
                                    head.shape()[1..].to_vec(),
                                    a.shape()[1..].to_vec(),
                                ));
                            }
                            views.push(a.view())
                        }
                        other => {
                            return Err(SeriesError::MismatchedValues(
                                first.kind_name(),
                                other.kind_name(),
                            ))
                        }
                    }
                }
                Ok(Self::Exposure(concatenate(Axis(0), &views).map_err(
                    |_| SeriesError::MismatchedValues(first.kind_name(), first.kind_name()),
                )?))
            }
            Self::Temperature(_) => {
                let mut views = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        Self::Temperature(a) => views.push(a.view()),
                        other => {
                            return Err(SeriesError::MismatchedValues(
                                first.kind_name(),
                                other.kind_name(),
                            ))
                        }
                    }
                }
                Ok(Self::Temperature(concatenate(Axis(0), &views).map_err(
                    |_| SeriesError::MismatchedValues(first.kind_name(), first.kind_name()),
                )?))
            }
            Self::MagneticField(_) => {
                let mut views = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        Self::MagneticField(a) => views.push(a.view()),
                        other => {
                            return Err(SeriesError::MismatchedValues(
                                first.kind_name(),
                                other.kind_name(),
                            ))
                        }
                    }
                }
                Ok(Self::MagneticField(concatenate(Axis(0), &views).map_err(
                    |_| SeriesError::MismatchedValues(first.kind_name(), first.kind_name()),
                )?))
            }
        }
    }
}

/// Timestamps (epoch seconds) paired index-for-index with their records.
///
/// The two halves always have the same length. Series produced by the accessor
/// only contain strictly positive timestamps, and series produced by the
/// aggregator are additionally sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Array1<f64>,
    values: SeriesValues,
}

impl TimeSeries {
    pub fn new(timestamps: Array1<f64>, values: SeriesValues) -> Result<Self, SeriesError> {
        if timestamps.len() != values.len() {
            return Err(SeriesError::LengthMismatch(timestamps.len(), values.len()));
        }
        Ok(Self { timestamps, values })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> ArrayView1<'_, f64> {
        self.timestamps.view()
    }

    pub fn values(&self) -> &SeriesValues {
        &self.values
    }

    pub fn into_parts(self) -> (Array1<f64>, SeriesValues) {
        (self.timestamps, self.values)
    }

    /// Drop every record whose timestamp is not strictly positive.
    ///
    /// Survivors keep their relative order.
    pub fn mask_positive(self) -> Self {
        let keep: Vec<usize> = self
            .timestamps
            .iter()
            .enumerate()
            .filter(|(_, t)| **t > 0.0)
            .map(|(idx, _)| idx)
            .collect();
        if keep.len() == self.len() {
            return self;
        }
        Self {
            timestamps: self.timestamps.select(Axis(0), &keep),
            values: self.values.select(&keep),
        }
    }

    /// Join series end to end, preserving the order within each part
    pub fn concatenate(parts: &[TimeSeries]) -> Result<Self, SeriesError> {
        if parts.is_empty() {
            return Err(SeriesError::NothingToConcatenate);
        }
        let stamps: Vec<ArrayView1<f64>> = parts.iter().map(|p| p.timestamps.view()).collect();
        let timestamps = concatenate(Axis(0), &stamps)
            .map_err(|_| SeriesError::NothingToConcatenate)?;
        let values: Vec<&SeriesValues> = parts.iter().map(|p| &p.values).collect();
        let values = SeriesValues::concatenate(&values)?;
        Self::new(timestamps, values)
    }

    /// Reorder both halves so timestamps are non-decreasing.
    ///
    /// The sort is stable: records sharing a timestamp keep their current order.
    pub fn sort_by_timestamp(self) -> Self {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| self.timestamps[a].total_cmp(&self.timestamps[b]));
        if order.iter().enumerate().all(|(pos, idx)| pos == *idx) {
            return self;
        }
        Self {
            timestamps: self.timestamps.select(Axis(0), &order),
            values: self.values.select(&order),
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.timestamps
            .windows(2)
            .into_iter()
            .all(|pair| pair[0] <= pair[1])
    }

    pub fn first_timestamp(&self) -> Option<f64> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.timestamps.last().copied()
    }
}

/// Render epoch seconds as a UTC date and time, for humans reading logs
pub fn format_epoch(seconds: f64) -> String {
    match time::OffsetDateTime::from_unix_timestamp_nanos((seconds * 1e9) as i128) {
        Ok(dt) => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
            dt.year(),
            dt.month() as u8,
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        ),
        Err(_) => format!("{seconds} s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array4};

    fn temps(stamps: &[f64], values: &[f64]) -> TimeSeries {
        TimeSeries::new(
            arr1(stamps),
            SeriesValues::Temperature(arr1(values)),
        )
        .unwrap()
    }

    #[test]
    fn test_format_epoch() {
        assert_eq!(format_epoch(1717246800.0), "2024-06-01 13:00:00 UTC");
        assert_eq!(format_epoch(f64::MAX), format!("{} s", f64::MAX));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("exposure".parse::<Subset>().unwrap(), Subset::Exposure);
        assert_eq!(
            "magnetic_field".parse::<Subset>().unwrap(),
            Subset::MagneticField
        );
        assert!(matches!(
            "humidity".parse::<Subset>(),
            Err(SeriesError::InvalidSubset(_))
        ));
        assert_eq!(
            "measurements".parse::<DatasetName>().unwrap(),
            DatasetName::Measurements
        );
        assert!("images".parse::<DatasetName>().is_err());
    }

    #[test]
    fn test_length_mismatch() {
        let result = TimeSeries::new(
            arr1(&[1.0, 2.0]),
            SeriesValues::Temperature(arr1(&[20.0])),
        );
        assert!(matches!(result, Err(SeriesError::LengthMismatch(2, 1))));
    }

    #[test]
    fn test_mask_positive_keeps_order() {
        let series = temps(&[0.0, 5.0, -1.0, 3.0, 0.0, 9.0], &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let masked = series.mask_positive();
        assert_eq!(masked.timestamps(), arr1(&[5.0, 3.0, 9.0]));
        assert_eq!(
            *masked.values(),
            SeriesValues::Temperature(arr1(&[1.0, 3.0, 5.0]))
        );
    }

    #[test]
    fn test_mask_drops_exposure_frames() {
        let mut frames = Array4::<u8>::zeros((3, 2, 2, 3));
        frames[[1, 0, 0, 0]] = 200;
        let series = TimeSeries::new(
            arr1(&[0.0, 12.5, -3.0]),
            SeriesValues::Exposure(frames),
        )
        .unwrap()
        .mask_positive();
        assert_eq!(series.len(), 1);
        match series.values() {
            SeriesValues::Exposure(a) => {
                assert_eq!(a.shape(), &[1, 2, 2, 3]);
                assert_eq!(a[[0, 0, 0, 0]], 200);
            }
            other => panic!("unexpected values {}", other.kind_name()),
        }
    }

    #[test]
    fn test_concatenate_and_sort() {
        let a = temps(&[300.0, 310.0], &[3.0, 3.1]);
        let b = temps(&[100.0, 110.0], &[1.0, 1.1]);
        let c = temps(&[], &[]);
        let joined = TimeSeries::concatenate(&[a, c, b]).unwrap();
        assert_eq!(joined.timestamps(), arr1(&[300.0, 310.0, 100.0, 110.0]));
        assert!(!joined.is_sorted());
        let sorted = joined.sort_by_timestamp();
        assert!(sorted.is_sorted());
        assert_eq!(sorted.timestamps(), arr1(&[100.0, 110.0, 300.0, 310.0]));
        assert_eq!(
            *sorted.values(),
            SeriesValues::Temperature(arr1(&[1.0, 1.1, 3.0, 3.1]))
        );
    }

    #[test]
    fn test_sort_ties_keep_order() {
        let series = TimeSeries::new(
            arr1(&[2.0, 1.0, 2.0, 1.0]),
            SeriesValues::MagneticField(arr2(&[
                [0.0, 0.0, 1.0],
                [0.0, 0.0, 2.0],
                [0.0, 0.0, 3.0],
                [0.0, 0.0, 4.0],
            ])),
        )
        .unwrap()
        .sort_by_timestamp();
        match series.values() {
            SeriesValues::MagneticField(a) => {
                let bz: Vec<f64> = a.column(2).to_vec();
                assert_eq!(bz, vec![2.0, 4.0, 1.0, 3.0]);
            }
            other => panic!("unexpected values {}", other.kind_name()),
        }
    }

    #[test]
    fn test_concatenate_mismatched() {
        let a = temps(&[1.0], &[1.0]);
        let b = TimeSeries::new(
            arr1(&[2.0]),
            SeriesValues::MagneticField(arr2(&[[1.0, 2.0, 3.0]])),
        )
        .unwrap();
        assert!(matches!(
            TimeSeries::concatenate(&[a, b]),
            Err(SeriesError::MismatchedValues("temperature", "magnetic_field"))
        ));
        assert!(matches!(
            TimeSeries::concatenate(&[]),
            Err(SeriesError::NothingToConcatenate)
        ));
    }

    #[test]
    fn test_concatenate_frame_shapes() {
        let a = TimeSeries::new(
            arr1(&[1.0]),
            SeriesValues::Exposure(Array4::zeros((1, 4, 4, 3))),
        )
        .unwrap();
        let b = TimeSeries::new(
            arr1(&[2.0]),
            SeriesValues::Exposure(Array4::zeros((1, 8, 4, 3))),
        )
        .unwrap();
        assert!(matches!(
            TimeSeries::concatenate(&[a, b]),
            Err(SeriesError::MismatchedFrameShape(_, _))
        ));
    }
}
