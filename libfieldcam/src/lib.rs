//! # fieldcam
//!
//! fieldcam is the data pipeline for the autonomous field cameras, written in Rust. Each
//! camera writes hourly containers of exposures (RGB frames) and environmental
//! measurements (temperature and a three axis magnetometer). This library reads those
//! containers back, merges a directory of them into a single time ordered series, writes
//! new containers, and prepares the curves and camera maps used to look at a deployment.
//!
//! ## Installation
//!
//! Currently the only method of install is from source.
//!
//! ### HDF5
//!
//! Before building fieldcam, HDF5 must be installed. Typically this will be installed using
//! a package manager (homebrew, apt, etc), and the Rust libraries will auto detect the
//! location of the HDF install. If HDF5 lives in a custom location, write the following
//! snippet into the file `.cargo/config.toml` in the repository:
//!
//! ```toml
//! [env]
//! HDF5_DIR="/path/to/my/hdf5/install/"
//!
//! [build]
//! rustflags="-C link-args=-Wl,-rpath,/path/to/my/hdf5/install/lib"
//! ```
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./fieldcam_cli` from the top
//! level repository. See the `fieldcam_cli` README for the available commands.
//!
//! ## Configuration
//!
//! The CLI is driven by a YAML file. `fieldcam_cli new -p fieldcam.yml` writes the
//! defaults:
//!
//! ```yml
//! filter_kernel: 15
//! output_path: .
//! cameras:
//! - camel
//! - hedgehogigrade
//! - petrel
//! - axolotl
//! derivative_bound: 10.0
//! format: hdf5
//! ```
//!
//! Missing keys fall back to their defaults. `filter_kernel` must be odd.
//!
//! ## Data Layout
//!
//! An acquisition directory holds any number of containers. A container belongs to the
//! `exposures` or `measurements` dataset when that word appears in its file name, and its
//! format is given by the suffix (`.hdf5`/`.h5` or `.txt`).
//!
//! ```text
//! 2024-06-01_13_measurements.hdf5
//! |---- timestamp(dset) - [capacity] f64, epoch seconds, 0 for unwritten slots
//! |---- temperature(dset) - [capacity] f64
//! |---- bx, by, bz(dset) - [capacity] f64
//! 2024-06-01_13_exposures.hdf5
//! |---- timestamp(dset) - [capacity] f64
//! |---- exposure(dset) - [capacity, height, width, 3] u8
//! ```
//!
//! Text containers hold one `# ` prefixed header line of right justified field names
//! followed by whitespace separated rows.
//!
//! Records with a non-positive timestamp are never returned by a reader, so unwritten
//! slots of a pre-allocated container are invisible.
pub mod accessor;
pub mod aggregator;
pub mod config;
pub mod container;
pub mod curve;
pub mod error;
pub mod kml;
pub mod schema;
pub mod series;
pub mod status;
pub mod table;
pub mod timelapse;
pub mod writer;
