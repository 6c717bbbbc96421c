use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::{resize, FilterType};
use image::{Delay, DynamicImage, Frame, RgbImage};
use ndarray::{ArrayView3, Axis};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::accessor::read_file;
use super::error::TimelapseError;
use super::series::{SeriesValues, Subset, TimeSeries};
use super::status::{ReadStatus, Reporter};

/// Subdirectory of the output path that collects timelapses
pub const TIMELAPSE_DIRECTORY: &str = "timelapses";
pub const DEFAULT_FPS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelapseOptions {
    pub fps: u32,
    /// Scale every frame to this many rows, keeping the aspect ratio
    pub height: Option<u32>,
}

impl Default for TimelapseOptions {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            height: None,
        }
    }
}

/// Turn one exposure frame ([height, width, 3]) into an RGB image
pub fn frame_to_image(frame: ArrayView3<'_, u8>) -> Result<RgbImage, TimelapseError> {
    let (height, width, channels) = frame.dim();
    let pixels: Vec<u8> = frame.iter().copied().collect();
    RgbImage::from_raw(width as u32, height as u32, pixels)
        .ok_or(TimelapseError::BadFrame(vec![height, width, channels]))
}

fn scale_to_height(image: &RgbImage, height: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    let width = ((w as f64 * height as f64 / h as f64).round() as u32).max(1);
    resize(image, width, height, FilterType::Triangle)
}

/// Encode the frames of an exposure series, in series order, as a looping GIF.
/// Returns the number of frames written.
pub fn write_timelapse(
    series: &TimeSeries,
    out_path: &Path,
    options: &TimelapseOptions,
) -> Result<usize, TimelapseError> {
    if options.fps == 0 {
        return Err(TimelapseError::BadFrameRate(options.fps));
    }
    if options.height == Some(0) {
        return Err(TimelapseError::BadHeight);
    }
    let frames = match series.values() {
        SeriesValues::Exposure(f) => f,
        other => return Err(TimelapseError::WrongValues(other.kind_name())),
    };
    if series.is_empty() {
        return Err(TimelapseError::EmptySeries);
    }

    let delay = Delay::from_numer_denom_ms(1000, options.fps);
    let mut writer = BufWriter::new(File::create(out_path)?);
    {
        let mut encoder = GifEncoder::new(&mut writer);
        encoder.set_repeat(Repeat::Infinite)?;
        for frame in frames.axis_iter(Axis(0)) {
            let mut image = frame_to_image(frame)?;
            if let Some(height) = options.height {
                image = scale_to_height(&image, height);
            }
            let rgba = DynamicImage::ImageRgb8(image).to_rgba8();
            encoder.encode_frame(Frame::from_parts(rgba, 0, 0, delay))?;
        }
    }
    writer.flush()?;
    Ok(series.len())
}

/// Build a timelapse from one exposures container in `dir`.
///
/// Frames are ordered by timestamp. The result lands in
/// `<output_dir>/timelapses/<file stem>.gif`; the directory is created if needed.
pub fn make_timelapse(
    dir: &Path,
    name: &str,
    output_dir: &Path,
    options: &TimelapseOptions,
    reporter: &dyn Reporter,
) -> Result<PathBuf, TimelapseError> {
    let path = dir.join(name);
    let series = read_file(&path, Subset::Exposure)?.sort_by_timestamp();
    reporter.report(ReadStatus::new(0, 1, path.clone(), series.len()))?;

    let timelapse_dir = output_dir.join(TIMELAPSE_DIRECTORY);
    std::fs::create_dir_all(&timelapse_dir)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let out_path = timelapse_dir.join(format!("{stem}.gif"));

    let count = write_timelapse(&series, &out_path, options)?;
    log::info!(
        "Wrote {} frames at {} fps to {}",
        count,
        options.fps,
        out_path.to_string_lossy()
    );
    Ok(out_path)
}
