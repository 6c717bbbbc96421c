use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::error::KmlError;

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// One deployed camera, as listed in the deployment spreadsheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    #[serde(alias = "Camera", alias = "camera", alias = "Name")]
    pub name: String,
    #[serde(alias = "Latitude", alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "Longitude", alias = "lon")]
    pub longitude: f64,
    #[serde(alias = "Altitude", alias = "alt")]
    pub altitude: f64,
    #[serde(alias = "Notes", alias = "note", default)]
    pub notes: String,
    #[serde(alias = "Deployed", alias = "deployment_time", default)]
    pub deployed: String,
}

/// Read the camera table. Headers may be capitalized (`Camera`, `Latitude`, ...) or not.
pub fn read_cameras(path: &Path) -> Result<Vec<Camera>, KmlError> {
    if !path.exists() {
        return Err(KmlError::BadFilePath(path.to_path_buf()));
    }
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path)?;
    let mut cameras = Vec::new();
    for row in reader.deserialize::<Camera>() {
        cameras.push(row?);
    }
    Ok(cameras)
}

/// Render a KML document with one absolute-altitude placemark per camera
pub fn to_kml(document_name: &str, cameras: &[Camera]) -> String {
    let mut kml = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(kml, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    let _ = writeln!(kml, "<kml xmlns=\"{KML_NAMESPACE}\">");
    let _ = writeln!(kml, "  <Document>");
    let _ = writeln!(kml, "    <name>{}</name>", escape(document_name));
    for camera in cameras {
        let _ = writeln!(kml, "    <Placemark>");
        let _ = writeln!(kml, "      <name>{}</name>", escape(&camera.name));
        let _ = writeln!(
            kml,
            "      <description>{}</description>",
            escape(&describe(camera))
        );
        let _ = writeln!(kml, "      <Point>");
        let _ = writeln!(kml, "        <altitudeMode>absolute</altitudeMode>");
        let _ = writeln!(
            kml,
            "        <coordinates>{},{},{}</coordinates>",
            camera.longitude, camera.latitude, camera.altitude
        );
        let _ = writeln!(kml, "      </Point>");
        let _ = writeln!(kml, "    </Placemark>");
    }
    let _ = writeln!(kml, "  </Document>");
    let _ = writeln!(kml, "</kml>");
    kml
}

/// Convert a camera table to KML. Without an explicit output the KML lands
/// next to the table with a .kml suffix. Returns the path written.
pub fn write_kml(csv_path: &Path, output: Option<&Path>) -> Result<PathBuf, KmlError> {
    let cameras = read_cameras(csv_path)?;
    let out_path = match output {
        Some(p) => p.to_path_buf(),
        None => csv_path.with_extension("kml"),
    };
    let document_name = csv_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    std::fs::write(&out_path, to_kml(&document_name, &cameras))?;
    log::info!(
        "Wrote {} placemarks to {}",
        cameras.len(),
        out_path.to_string_lossy()
    );
    Ok(out_path)
}

fn describe(camera: &Camera) -> String {
    match (camera.notes.is_empty(), camera.deployed.is_empty()) {
        (true, true) => String::new(),
        (false, true) => camera.notes.clone(),
        (true, false) => format!("Deployed: {}", camera.deployed),
        (false, false) => format!("{}\nDeployed: {}", camera.notes, camera.deployed),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
