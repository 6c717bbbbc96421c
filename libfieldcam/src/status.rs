use std::path::PathBuf;
use std::sync::mpsc::Sender;

use super::error::ReporterError;

/// A progress message emitted while a dataset is being read.
#[derive(Debug, Clone, Default)]
pub struct ReadStatus {
    pub progress: f32,
    pub file_index: usize,
    pub file_count: usize,
    pub path: PathBuf,
    pub records: usize,
}

impl ReadStatus {
    pub fn new(file_index: usize, file_count: usize, path: PathBuf, records: usize) -> Self {
        let progress = if file_count == 0 {
            1.0
        } else {
            (file_index + 1) as f32 / file_count as f32
        };
        Self {
            progress,
            file_index,
            file_count,
            path,
            records,
        }
    }
}

/// The reporting capability handed to the reading and writing components.
///
/// Components never reach for a global logger to report progress; whoever owns
/// the operation decides where the messages go.
pub trait Reporter {
    fn report(&self, status: ReadStatus) -> Result<(), ReporterError>;

    fn note(&self, message: &str) {
        log::info!("{message}");
    }
}

/// Forwards every status to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, status: ReadStatus) -> Result<(), ReporterError> {
        log::info!(
            "Read {} records from {} ({}/{})",
            status.records,
            status.path.to_string_lossy(),
            status.file_index + 1,
            status.file_count
        );
        Ok(())
    }
}

/// Discards everything, for callers that do not want any feedback
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _status: ReadStatus) -> Result<(), ReporterError> {
        Ok(())
    }

    fn note(&self, _message: &str) {}
}

/// Hands statuses to another thread, typically one driving a progress display
impl Reporter for Sender<ReadStatus> {
    fn report(&self, status: ReadStatus) -> Result<(), ReporterError> {
        self.send(status)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_progress_fraction() {
        let status = ReadStatus::new(1, 4, PathBuf::from("a.hdf5"), 10);
        assert_eq!(status.progress, 0.5);
        let last = ReadStatus::new(3, 4, PathBuf::from("d.hdf5"), 10);
        assert_eq!(last.progress, 1.0);
    }

    #[test]
    fn test_channel_reporter() {
        let (tx, rx) = mpsc::channel::<ReadStatus>();
        tx.report(ReadStatus::new(0, 2, PathBuf::from("a.hdf5"), 7))
            .unwrap();
        let got = rx.recv().unwrap();
        assert_eq!(got.records, 7);
        assert_eq!(got.file_count, 2);
    }

    #[test]
    fn test_channel_reporter_disconnected() {
        let (tx, rx) = mpsc::channel::<ReadStatus>();
        drop(rx);
        assert!(tx.report(ReadStatus::default()).is_err());
    }
}
