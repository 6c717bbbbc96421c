use std::path::PathBuf;
use thiserror::Error;

use super::container::ContainerFormat;
use super::status::ReadStatus;

/// The coarse taxonomy every library error maps onto.
///
/// Callers that only care about *why* an operation failed (rather than which
/// component failed) can match on this instead of the individual error enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    UnsupportedFormat,
    NotImplemented,
    NotFound,
    Io,
    Container,
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Unsupported container format for file {0:?}; expected .hdf5, .h5 or .txt")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("Invalid subset {0}; must be one of exposure, temperature or magnetic_field")]
    InvalidSubset(String),
    #[error("Invalid dataset name {0}; must be one of exposures or measurements")]
    InvalidDataset(String),
    #[error("TimeSeries has {0} timestamps but {1} values")]
    LengthMismatch(usize, usize),
    #[error("Cannot concatenate {0} values with {1} values")]
    MismatchedValues(&'static str, &'static str),
    #[error("Cannot concatenate exposures with different frame shapes: {0:?} and {1:?}")]
    MismatchedFrameShape(Vec<usize>, Vec<usize>),
    #[error("Cannot concatenate an empty list of series")]
    NothingToConcatenate,
}

impl SeriesError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

#[derive(Debug, Error)]
pub enum AccessorError {
    #[error("Accessor failed due to container error: {0}")]
    Format(#[from] ContainerError),
    #[error("Accessor does not support reading {0} containers yet")]
    NotImplemented(ContainerFormat),
    #[error("Accessor failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Accessor failed due to series error: {0}")]
    SeriesError(#[from] SeriesError),
    #[error("Accessor found a malformed {0} field with shape {1:?}")]
    BadFieldShape(String, Vec<usize>),
}

impl AccessorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Format(_) => ErrorKind::UnsupportedFormat,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
            Self::HDF5Error(_) | Self::BadFieldShape(_, _) => ErrorKind::Container,
            Self::SeriesError(e) => e.kind(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("Aggregator did not find any {dataset} files in directory {path:?}")]
    NoMatchingFiles { path: PathBuf, dataset: String },
    #[error("Aggregator requires a subset when reading measurements")]
    MissingSubset,
    #[error("Aggregator failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Aggregator failed due to Accessor error: {0}")]
    AccessorError(#[from] AccessorError),
    #[error("Aggregator failed due to series error: {0}")]
    SeriesError(#[from] SeriesError),
    #[error("Aggregator failed due to Reporter error: {0}")]
    ReporterError(#[from] ReporterError),
}

impl AggregatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoMatchingFiles { .. } => ErrorKind::NotFound,
            Self::MissingSubset => ErrorKind::InvalidArgument,
            Self::IOError(_) => ErrorKind::Io,
            Self::AccessorError(e) => e.kind(),
            Self::SeriesError(e) => e.kind(),
            Self::ReporterError(_) => ErrorKind::Io,
        }
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema must declare at least one field")]
    Empty,
    #[error("Schema field name {0:?} is empty or contains whitespace")]
    BadName(String),
    #[error("Schema declares field {0} more than once")]
    DuplicateField(String),
    #[error("Schema must declare a scalar f64 timestamp field")]
    MissingTimestamp,
    #[error("Schema field {0} has an invalid shape {1:?} for its element type")]
    BadShape(String, Vec<usize>),
    #[error("Schema field {0} is not scalar and cannot be stored in a text container")]
    NonScalarTextField(String),
    #[error("Schema capacity must be at least 1")]
    ZeroCapacity,
    #[error("Schema failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Schema failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

impl SchemaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IOError(_) => ErrorKind::Io,
            _ => ErrorKind::InvalidArgument,
        }
    }
}

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Writer failed due to container error: {0}")]
    Format(#[from] ContainerError),
    #[error("Writer failed due to schema error: {0}")]
    SchemaError(#[from] SchemaError),
    #[error("Writer failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Writer failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Writer was given a row of {0} values for a file with {1} columns")]
    RowLength(usize, usize),
    #[error("Writer found no header line in text container {0:?}")]
    MissingHeader(PathBuf),
    #[error("Writer cannot append a {0} record to {1:?}")]
    RecordMismatch(&'static str, PathBuf),
    #[error("Writer needs a record index to write into binary container {0:?}")]
    MissingIndex(PathBuf),
    #[error("Writer was given an {0}x{1}x{2} frame for field {3}; expected {4:?}")]
    FrameShape(usize, usize, usize, String, Vec<usize>),
}

impl WriterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Format(_) => ErrorKind::UnsupportedFormat,
            Self::SchemaError(e) => e.kind(),
            Self::HDF5Error(_) => ErrorKind::Container,
            Self::IOError(_) => ErrorKind::Io,
            Self::MissingHeader(_) => ErrorKind::Container,
            Self::RowLength(..)
            | Self::RecordMismatch(..)
            | Self::MissingIndex(_)
            | Self::FrameShape(..) => ErrorKind::InvalidArgument,
        }
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Table failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Table failed to parse a number on line {1} of {0:?}")]
    ParsingError(PathBuf, usize),
    #[error("Table row on line {1} of {0:?} has {2} columns; expected at least {min}", min=super::table::MEASUREMENT_COLUMNS)]
    ShortRow(PathBuf, usize, usize),
    #[error("Table did not find any measurement files in directory {0:?}")]
    NoMatchingFiles(PathBuf),
    #[error("Table failed while searching for files: {0}")]
    AggregatorError(#[from] AggregatorError),
}

impl TableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IOError(_) => ErrorKind::Io,
            Self::ParsingError(..) | Self::ShortRow(..) => ErrorKind::Container,
            Self::NoMatchingFiles(_) => ErrorKind::NotFound,
            Self::AggregatorError(e) => e.kind(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CurveError {
    #[error("Median filter kernel must be odd and positive, got {0}")]
    BadKernel(usize),
    #[error("Cannot prepare a curve from an empty series")]
    EmptySeries,
    #[error("Curve expected {0} values but the series holds {1} values")]
    WrongValues(&'static str, &'static str),
    #[error("Curve column {0} has {1} values for {2} points")]
    ColumnLength(String, usize, usize),
    #[error("Curve failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

impl CurveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IOError(_) => ErrorKind::Io,
            _ => ErrorKind::InvalidArgument,
        }
    }
}

#[derive(Debug, Error)]
pub enum TimelapseError {
    #[error("Timelapse failed due to Accessor error: {0}")]
    AccessorError(#[from] AccessorError),
    #[error("Timelapse failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Timelapse failed due to image error: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("Timelapse failed due to Reporter error: {0}")]
    ReporterError(#[from] ReporterError),
    #[error("Timelapse expected exposure values but the series holds {0} values")]
    WrongValues(&'static str),
    #[error("Cannot make a timelapse from an empty series")]
    EmptySeries,
    #[error("Timelapse frame rate must be positive, got {0}")]
    BadFrameRate(u32),
    #[error("Timelapse frame height must be positive")]
    BadHeight,
    #[error("Timelapse found a frame with shape {0:?}; expected [height, width, 3]")]
    BadFrame(Vec<usize>),
}

impl TimelapseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AccessorError(e) => e.kind(),
            Self::IOError(_) | Self::ReporterError(_) => ErrorKind::Io,
            Self::ImageError(_) | Self::BadFrame(_) => ErrorKind::Container,
            Self::WrongValues(_) | Self::EmptySeries | Self::BadFrameRate(_) | Self::BadHeight => {
                ErrorKind::InvalidArgument
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum KmlError {
    #[error("Could not open camera table because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Kml failed to parse camera table: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Kml failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

impl KmlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadFilePath(_) => ErrorKind::NotFound,
            Self::CsvError(_) => ErrorKind::InvalidArgument,
            Self::IOError(_) => ErrorKind::Io,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has an invalid filter kernel {0}; it must be odd and positive")]
    BadFilterKernel(usize),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadFilePath(_) => ErrorKind::NotFound,
            Self::IOError(_) => ErrorKind::Io,
            Self::ParsingError(_) | Self::BadFilterKernel(_) => ErrorKind::InvalidArgument,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("Reporter failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<ReadStatus>),
}
