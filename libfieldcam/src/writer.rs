use hdf5::File;
use ndarray::{s, Array1, Array3, ArrayView1};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::container::ContainerFormat;
use super::error::{SchemaError, WriterError};
use super::schema::{ElementType, Schema};

const VERSION_SEPARATOR: &str = "_v";
const COMMENT_MARKER: &str = "# ";

/// A single value destined for one field of one record
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(f64),
    Vector(Array1<f64>),
    Frame(Array3<u8>),
}

/// Field name to value, for the random-access binary form
pub type FieldRecord = BTreeMap<String, FieldValue>;

/// What a caller hands to [`append`]
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Fields(FieldRecord),
    Row(Vec<f64>),
}

/// Create a new container at `path` (or a versioned sibling of it) with a fixed schema.
///
/// An existing file is never overwritten. If `path` is taken, `_v1`, `_v2`, ... is
/// inserted before the extension until a free name is found. Returns the path that
/// was actually created.
pub fn create(path: &Path, schema: &Schema) -> Result<PathBuf, WriterError> {
    let format = ContainerFormat::from_path(path)?;
    schema.validate(format)?;

    let mut version = 0;
    let (target, container) = loop {
        let target = if version == 0 {
            path.to_path_buf()
        } else {
            versioned_path(path, version)
        };
        // Another writer may claim the name between the check and the create
        if !target.exists() {
            if let Some(container) = open_exclusive(&target, format)? {
                break (target, container);
            }
        }
        version += 1;
    };
    if version > 0 {
        log::warn!(
            "{} already exists, creating {} instead",
            path.to_string_lossy(),
            target.to_string_lossy()
        );
    }

    match container {
        NewContainer::Hdf5(file) => init_hdf5(&file, schema)?,
        NewContainer::Text(file) => init_text(file, schema)?,
    }
    log::info!(
        "Created {} container {} with {} fields",
        format,
        target.to_string_lossy(),
        schema.fields.len()
    );
    Ok(target)
}

/// Insert a version suffix between the file stem and its extension
pub fn versioned_path(path: &Path, version: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!(
            "{stem}{VERSION_SEPARATOR}{version}.{}",
            ext.to_string_lossy()
        ),
        None => format!("{stem}{VERSION_SEPARATOR}{version}"),
    };
    path.with_file_name(name)
}

enum NewContainer {
    Hdf5(File),
    Text(std::fs::File),
}

/// Create `path` only if nothing is there yet. Returns None when the name is taken.
fn open_exclusive(
    path: &Path,
    format: ContainerFormat,
) -> Result<Option<NewContainer>, WriterError> {
    match format {
        ContainerFormat::Hdf5 => match File::create_excl(path) {
            Ok(file) => Ok(Some(NewContainer::Hdf5(file))),
            Err(_) if path.exists() => Ok(None),
            Err(e) => Err(e.into()),
        },
        ContainerFormat::Text => match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => Ok(Some(NewContainer::Text(file))),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        },
    }
}

fn init_hdf5(file: &File, schema: &Schema) -> Result<(), WriterError> {
    let capacity = schema.capacity;
    for field in schema.fields.iter() {
        let name = field.name.as_str();
        match (field.dtype, field.shape.as_slice()) {
            (ElementType::F64, []) => {
                file.new_dataset::<f64>().shape(capacity).create(name)?;
            }
            (ElementType::F64, [len]) => {
                file.new_dataset::<f64>()
                    .shape((capacity, *len))
                    .create(name)?;
            }
            // One chunk per frame so a single exposure can be touched on its own
            (ElementType::U8, [h, w, c]) => {
                file.new_dataset::<u8>()
                    .shape((capacity, *h, *w, *c))
                    .chunk([1, *h, *w, *c])
                    .create(name)?;
            }
            _ => {
                return Err(SchemaError::BadShape(field.name.clone(), field.shape.clone()).into())
            }
        }
    }
    Ok(())
}

fn init_text(mut file: std::fs::File, schema: &Schema) -> Result<(), WriterError> {
    writeln!(file, "{COMMENT_MARKER}{}", schema.header_line())?;
    writeln!(file, "{}", encode_row(&vec![0.0; schema.fields.len()]))?;
    Ok(())
}

/// Write one record at `index` of a binary container.
///
/// Only the fields present in `record` are touched. Writing past the capacity
/// the container was created with fails in the HDF5 layer.
pub fn write_record(path: &Path, index: usize, record: &FieldRecord) -> Result<(), WriterError> {
    if ContainerFormat::from_path(path)? != ContainerFormat::Hdf5 {
        return Err(WriterError::RecordMismatch("field", path.to_path_buf()));
    }
    let file = File::open_rw(path)?;
    for (name, value) in record.iter() {
        let dataset = file.dataset(name)?;
        match value {
            FieldValue::Scalar(v) => {
                dataset.write_slice(ArrayView1::from(std::slice::from_ref(v)), s![index..index + 1])?
            }
            FieldValue::Vector(v) => dataset.write_slice(v.view(), s![index, ..])?,
            FieldValue::Frame(frame) => {
                let expected = dataset.shape()[1..].to_vec();
                if frame.shape() != expected.as_slice() {
                    let (h, w, c) = frame.dim();
                    return Err(WriterError::FrameShape(h, w, c, name.clone(), expected));
                }
                dataset.write_slice(frame.view(), s![index, .., .., ..])?
            }
        }
    }
    Ok(())
}

/// Append one row to a text container.
///
/// The row must have exactly as many values as the header has columns.
pub fn append_row(path: &Path, row: &[f64]) -> Result<(), WriterError> {
    if ContainerFormat::from_path(path)? != ContainerFormat::Text {
        return Err(WriterError::RecordMismatch("row", path.to_path_buf()));
    }
    let columns = header_columns(path)?;
    if row.len() != columns {
        return Err(WriterError::RowLength(row.len(), columns));
    }
    let mut file = OpenOptions::new().append(true).open(path)?;
    writeln!(file, "{}", encode_row(row))?;
    Ok(())
}

/// Append a record, picking the binary or text form from the path suffix.
///
/// Binary containers need an index; text containers are append-only and
/// ignore it.
pub fn append(path: &Path, record: &Record, index: Option<usize>) -> Result<(), WriterError> {
    match (ContainerFormat::from_path(path)?, record) {
        (ContainerFormat::Hdf5, Record::Fields(fields)) => match index {
            Some(idx) => write_record(path, idx, fields),
            None => Err(WriterError::MissingIndex(path.to_path_buf())),
        },
        (ContainerFormat::Text, Record::Row(row)) => append_row(path, row),
        (ContainerFormat::Hdf5, Record::Row(_)) => {
            Err(WriterError::RecordMismatch("row", path.to_path_buf()))
        }
        (ContainerFormat::Text, Record::Fields(_)) => {
            Err(WriterError::RecordMismatch("field", path.to_path_buf()))
        }
    }
}

fn header_columns(path: &Path) -> Result<usize, WriterError> {
    let mut reader = BufReader::new(std::fs::File::open(path)?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    match line.strip_prefix('#') {
        Some(header) => Ok(header.split_whitespace().count()),
        None => Err(WriterError::MissingHeader(path.to_path_buf())),
    }
}

/// Encode a row the way the acquisition system's text files are written:
/// 18 digit scientific notation with a signed two digit exponent
pub fn encode_row(row: &[f64]) -> String {
    row.iter()
        .map(|v| encode_value(*v))
        .collect::<Vec<String>>()
        .join(" ")
}

fn encode_value(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string().to_lowercase();
    }
    let formatted = format!("{value:.18e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.abs())
        }
        None => formatted,
    }
}
