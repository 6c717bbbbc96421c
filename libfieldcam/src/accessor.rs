use hdf5::File;
use ndarray::{stack, Array2, Axis, Ix4};
use std::path::Path;

use super::container::ContainerFormat;
use super::error::AccessorError;
use super::series::{SeriesValues, Subset, TimeSeries};

pub const TIMESTAMP_NAME: &str = "timestamp";
pub const FIELD_COMPONENT_NAMES: [&str; 3] = ["bx", "by", "bz"];
const COLOR_CHANNELS: usize = 3;

/// Read one subset of a single container, dropping unwritten slots.
///
/// The whole subset is materialized; there is no partial or streaming read. The
/// returned series holds only records with a strictly positive timestamp, in the
/// order they are stored in the file. Plain text containers are recognized but
/// cannot be read through this path.
pub fn read_file(path: &Path, subset: Subset) -> Result<TimeSeries, AccessorError> {
    match ContainerFormat::from_path(path)? {
        ContainerFormat::Hdf5 => read_hdf5(path, subset),
        ContainerFormat::Text => Err(AccessorError::NotImplemented(ContainerFormat::Text)),
    }
}

/// Same as [`read_file`], for callers holding the subset as a string
pub fn read_file_named(path: &Path, subset: &str) -> Result<TimeSeries, AccessorError> {
    read_file(path, subset.parse()?)
}

fn read_hdf5(path: &Path, subset: Subset) -> Result<TimeSeries, AccessorError> {
    let file = File::open(path)?;
    let timestamps = file.dataset(TIMESTAMP_NAME)?.read_1d::<f64>()?;
    let values = match subset {
        Subset::Exposure => {
            let frames = file.dataset(subset.field_name())?.read::<u8, Ix4>()?;
            if frames.shape()[3] != COLOR_CHANNELS {
                return Err(AccessorError::BadFieldShape(
                    subset.to_string(),
                    frames.shape().to_vec(),
                ));
            }
            SeriesValues::Exposure(frames)
        }
        Subset::Temperature => {
            SeriesValues::Temperature(file.dataset(subset.field_name())?.read_1d::<f64>()?)
        }
        Subset::MagneticField => SeriesValues::MagneticField(read_magnetic_field(&file)?),
    };
    drop(file);

    let total = timestamps.len();
    let series = TimeSeries::new(timestamps, values)?.mask_positive();
    log::debug!(
        "Read {} of {} {} records from {}",
        series.len(),
        total,
        subset,
        path.to_string_lossy()
    );
    Ok(series)
}

/// Field vectors are either stored whole as [n, 3] or as one dataset per component
fn read_magnetic_field(file: &File) -> Result<Array2<f64>, AccessorError> {
    let name = Subset::MagneticField.field_name();
    if file.link_exists(name) {
        let field = file.dataset(name)?.read_2d::<f64>()?;
        if field.ncols() != FIELD_COMPONENT_NAMES.len() {
            return Err(AccessorError::BadFieldShape(
                name.to_string(),
                field.shape().to_vec(),
            ));
        }
        return Ok(field);
    }

    let mut components = Vec::with_capacity(FIELD_COMPONENT_NAMES.len());
    for component in FIELD_COMPONENT_NAMES {
        components.push(file.dataset(component)?.read_1d::<f64>()?);
    }
    let views: Vec<_> = components.iter().map(|c| c.view()).collect();
    stack(Axis(1), &views).map_err(|_| {
        AccessorError::BadFieldShape(
            name.to_string(),
            components.iter().map(|c| c.len()).collect(),
        )
    })
}
