use std::path::{Path, PathBuf};

use super::accessor::read_file;
use super::container::ContainerFormat;
use super::error::AggregatorError;
use super::series::{DatasetName, Subset, TimeSeries};
use super::status::{ReadStatus, Reporter};

/// Collect every container in `dir` belonging to a logical dataset.
///
/// A candidate is an immediate child whose name carries one of the format's
/// suffixes and contains the dataset marker. The returned list is in whatever order the
/// filesystem enumerates it; nothing downstream may rely on that order.
pub fn find_candidates(
    dir: &Path,
    dataset: DatasetName,
    format: ContainerFormat,
) -> Result<Vec<PathBuf>, AggregatorError> {
    let mut file_list: Vec<PathBuf> = Vec::new();
    for item in dir.read_dir()? {
        let item_path = item?.path();
        let name = match item_path.file_name() {
            Some(n) => n.to_string_lossy().to_string(),
            None => continue,
        };
        if format.matches(&item_path) && name.contains(dataset.marker()) {
            file_list.push(item_path);
        }
    }
    Ok(file_list)
}

/// Read every HDF5 container of a dataset in `dir` into one time ordered series.
///
/// `exposures` always reads the exposure subset. `measurements` requires a
/// subset. Fails with a NotFound error if no candidate exists, and with the
/// first accessor error if any candidate cannot be read.
pub fn read_files(
    dir: &Path,
    dataset: DatasetName,
    subset: Option<Subset>,
    reporter: &dyn Reporter,
) -> Result<TimeSeries, AggregatorError> {
    read_files_with_format(dir, dataset, subset, ContainerFormat::Hdf5, reporter)
}

pub fn read_files_with_format(
    dir: &Path,
    dataset: DatasetName,
    subset: Option<Subset>,
    format: ContainerFormat,
    reporter: &dyn Reporter,
) -> Result<TimeSeries, AggregatorError> {
    let subset = match dataset {
        DatasetName::Exposures => Subset::Exposure,
        DatasetName::Measurements => subset.ok_or(AggregatorError::MissingSubset)?,
    };

    let candidates = find_candidates(dir, dataset, format)?;
    if candidates.is_empty() {
        return Err(AggregatorError::NoMatchingFiles {
            path: dir.to_path_buf(),
            dataset: dataset.to_string(),
        });
    }

    let total_bytes = candidates
        .iter()
        .filter_map(|path| path.metadata().ok())
        .fold(0, |sum, meta| sum + meta.len());
    reporter.note(&format!(
        "Found {} {} files ({}) in {}",
        candidates.len(),
        dataset,
        human_bytes::human_bytes(total_bytes as f64),
        dir.to_string_lossy()
    ));

    read_candidates(&candidates, subset, reporter)
}

/// Read the given containers and merge them by timestamp.
///
/// The result depends only on the set of files, never on the order of `paths`,
/// except for records sharing a timestamp which keep the order they were read in.
pub fn read_candidates(
    paths: &[PathBuf],
    subset: Subset,
    reporter: &dyn Reporter,
) -> Result<TimeSeries, AggregatorError> {
    let mut parts = Vec::with_capacity(paths.len());
    for (idx, path) in paths.iter().enumerate() {
        let part = read_file(path, subset)?;
        reporter.report(ReadStatus::new(idx, paths.len(), path.clone(), part.len()))?;
        parts.push(part);
    }

    let series = TimeSeries::concatenate(&parts)?.sort_by_timestamp();
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::Schema;
    use crate::series::SeriesValues;
    use crate::status::NullReporter;
    use crate::writer::{create, write_record, FieldRecord, FieldValue};
    use ndarray::{Array1, Array3};
    use std::sync::mpsc;
    use tempfile::tempdir;

    /// Write `count` evenly spaced samples in [start, stop] with temperature = timestamp / 10
    fn write_hour(dir: &Path, name: &str, start: f64, stop: f64, count: usize) -> PathBuf {
        let path = create(
            &dir.join(name),
            &Schema::measurements().with_capacity(count + 2),
        )
        .unwrap();
        let step = (stop - start) / (count - 1) as f64;
        for i in 0..count {
            let ts = start + step * i as f64;
            let mut record = FieldRecord::new();
            record.insert("timestamp".to_string(), FieldValue::Scalar(ts));
            record.insert("temperature".to_string(), FieldValue::Scalar(ts / 10.0));
            // Leave slot 0 unwritten
            write_record(&path, i + 1, &record).unwrap();
        }
        path
    }

    #[test]
    fn test_three_hours_any_order() {
        let dir = tempdir().unwrap();
        write_hour(dir.path(), "2024-06-01_10_measurements.hdf5", 100.0, 199.0, 10);
        write_hour(dir.path(), "2024-06-01_12_measurements.hdf5", 300.0, 399.0, 10);
        write_hour(dir.path(), "2024-06-01_11_measurements.hdf5", 200.0, 299.0, 10);
        // Not candidates
        std::fs::write(dir.path().join("2024-06-01_10_measurements.txt"), "# x\n").unwrap();
        std::fs::write(dir.path().join("notes.hdf5"), "").unwrap();

        let series = read_files(
            dir.path(),
            DatasetName::Measurements,
            Some(Subset::Temperature),
            &NullReporter,
        )
        .unwrap();
        assert_eq!(series.len(), 30);
        assert_eq!(series.first_timestamp(), Some(100.0));
        assert_eq!(series.last_timestamp(), Some(399.0));
        assert!(series
            .timestamps()
            .windows(2)
            .into_iter()
            .all(|pair| pair[0] < pair[1]));
        match series.values() {
            SeriesValues::Temperature(t) => {
                let expected: Array1<f64> = series.timestamps().mapv(|ts| ts / 10.0);
                assert_eq!(*t, expected);
            }
            other => panic!("unexpected values {}", other.kind_name()),
        }
    }

    /// Write one 2x2 frame per timestamp, marking pixel (0, 0, 0) with the timestamp
    fn write_frames(dir: &Path, name: &str, stamps: &[f64]) -> PathBuf {
        let path = create(
            &dir.join(name),
            &Schema::exposures(2, 2).with_capacity(stamps.len() + 1),
        )
        .unwrap();
        for (i, ts) in stamps.iter().enumerate() {
            let mut frame = Array3::<u8>::zeros((2, 2, 3));
            frame[[0, 0, 0]] = *ts as u8;
            frame[[1, 1, 2]] = 255;
            let mut record = FieldRecord::new();
            record.insert("timestamp".to_string(), FieldValue::Scalar(*ts));
            record.insert("exposure".to_string(), FieldValue::Frame(frame));
            write_record(&path, i, &record).unwrap();
        }
        path
    }

    #[test]
    fn test_exposure_frames_follow_timestamps() {
        let dir = tempdir().unwrap();
        write_frames(dir.path(), "13_exposures.hdf5", &[40.0, 10.0]);
        write_frames(dir.path(), "14_exposures.h5", &[50.0, 20.0]);
        write_frames(dir.path(), "15_exposures.hdf5", &[30.0, 60.0]);
        write_hour(dir.path(), "13_measurements.hdf5", 1.0, 10.0, 10);

        let mut found = find_candidates(dir.path(), DatasetName::Exposures, ContainerFormat::Hdf5)
            .unwrap();
        found.sort();
        assert_eq!(found.len(), 3);
        assert_eq!(found[1], dir.path().join("14_exposures.h5"));

        // The subset is ignored for exposures
        let series = read_files(
            dir.path(),
            DatasetName::Exposures,
            Some(Subset::Temperature),
            &NullReporter,
        )
        .unwrap();
        assert_eq!(
            series.timestamps().to_vec(),
            vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]
        );
        match series.values() {
            SeriesValues::Exposure(frames) => {
                assert_eq!(frames.shape(), &[6, 2, 2, 3]);
                for (i, ts) in series.timestamps().iter().enumerate() {
                    assert_eq!(frames[[i, 0, 0, 0]], *ts as u8);
                    assert_eq!(frames[[i, 1, 1, 2]], 255);
                }
            }
            other => panic!("unexpected values {}", other.kind_name()),
        }
    }

    #[test]
    fn test_short_binary_suffix_is_a_candidate() {
        let dir = tempdir().unwrap();
        write_hour(dir.path(), "10_measurements.h5", 100.0, 190.0, 10);
        let series = read_files(
            dir.path(),
            DatasetName::Measurements,
            Some(Subset::Temperature),
            &NullReporter,
        )
        .unwrap();
        assert_eq!(series.len(), 10);
    }

    #[test]
    fn test_enumeration_order_does_not_matter() {
        let dir = tempdir().unwrap();
        let a = write_hour(dir.path(), "a_measurements.hdf5", 100.0, 190.0, 10);
        let b = write_hour(dir.path(), "b_measurements.hdf5", 300.0, 390.0, 10);
        let c = write_hour(dir.path(), "c_measurements.hdf5", 200.0, 290.0, 10);

        let reference = read_candidates(
            &[a.clone(), b.clone(), c.clone()],
            Subset::Temperature,
            &NullReporter,
        )
        .unwrap();
        for order in [
            vec![b.clone(), a.clone(), c.clone()],
            vec![c.clone(), b.clone(), a.clone()],
            vec![c.clone(), a.clone(), b.clone()],
        ] {
            let shuffled = read_candidates(&order, Subset::Temperature, &NullReporter).unwrap();
            assert_eq!(shuffled, reference);
        }
        assert!(reference.is_sorted());
    }

    #[test]
    fn test_no_candidates() {
        let dir = tempdir().unwrap();
        write_hour(dir.path(), "13_measurements.hdf5", 1.0, 10.0, 10);
        let err = read_files(dir.path(), DatasetName::Exposures, None, &NullReporter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_measurements_need_subset() {
        let dir = tempdir().unwrap();
        let err =
            read_files(dir.path(), DatasetName::Measurements, None, &NullReporter).unwrap_err();
        assert!(matches!(err, AggregatorError::MissingSubset));
    }

    #[test]
    fn test_empty_file_contributes_nothing() {
        let dir = tempdir().unwrap();
        write_hour(dir.path(), "10_measurements.hdf5", 100.0, 190.0, 10);
        create(
            &dir.path().join("11_measurements.hdf5"),
            &Schema::measurements().with_capacity(5),
        )
        .unwrap();

        let (tx, rx) = mpsc::channel::<ReadStatus>();
        let series = read_files(
            dir.path(),
            DatasetName::Measurements,
            Some(Subset::Temperature),
            &tx,
        )
        .unwrap();
        assert_eq!(series.len(), 10);

        let mut counts: Vec<usize> = rx.try_iter().map(|s| s.records).collect();
        counts.sort();
        assert_eq!(counts, vec![0, 10]);
    }

    #[test]
    fn test_text_dataset_not_readable() {
        let dir = tempdir().unwrap();
        create(
            &dir.path().join("13_measurements.txt"),
            &Schema::measurements(),
        )
        .unwrap();
        let err = read_files_with_format(
            dir.path(),
            DatasetName::Measurements,
            Some(Subset::Temperature),
            ContainerFormat::Text,
            &NullReporter,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
    }
}
