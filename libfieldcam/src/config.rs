use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::container::ContainerFormat;
use super::curve::CurveOptions;
use super::error::ConfigError;

/// Structure representing the tool configuration. Contains output and curve settings.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub filter_kernel: usize,
    pub output_path: PathBuf,
    pub cameras: Vec<String>,
    pub derivative_bound: f64,
    pub format: ContainerFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter_kernel: 15,
            output_path: PathBuf::from("."),
            cameras: ["camel", "hedgehogigrade", "petrel", "axolotl"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            derivative_bound: 10.0,
            format: ContainerFormat::Hdf5,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        let config = serde_yaml::from_str::<Self>(&yaml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration as a template to edit
    pub fn write_template(path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(&Self::default())?;
        let mut file = File::create(path)?;
        file.write_all(yaml_str.as_bytes())?;
        Ok(())
    }

    /// The median filter needs an odd, non-zero kernel
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filter_kernel == 0 || self.filter_kernel % 2 == 0 {
            return Err(ConfigError::BadFilterKernel(self.filter_kernel));
        }
        Ok(())
    }

    pub fn curve_options(&self, derivative: bool) -> CurveOptions {
        CurveOptions {
            filter_kernel: self.filter_kernel,
            derivative,
            derivative_bound: self.derivative_bound,
        }
    }

    /// Get the path to an output file, creating the output directory if needed
    pub fn get_output_file(&self, name: &str) -> Result<PathBuf, ConfigError> {
        std::fs::create_dir_all(&self.output_path)?;
        Ok(self.output_path.join(name))
    }

    /// Get the directory holding one camera's data, if it exists
    pub fn get_camera_directory(
        &self,
        data_path: &Path,
        camera: &str,
    ) -> Result<PathBuf, ConfigError> {
        let camera_dir = data_path.join(camera);
        if camera_dir.exists() {
            Ok(camera_dir)
        } else {
            Err(ConfigError::BadFilePath(camera_dir))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_template_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fieldcam.yml");
        Config::write_template(&path).unwrap();
        let config = Config::read_config_file(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fieldcam.yml");
        std::fs::write(&path, "filter_kernel: 17\nformat: txt\n").unwrap();
        let config = Config::read_config_file(&path).unwrap();
        assert_eq!(config.filter_kernel, 17);
        assert_eq!(config.format, ContainerFormat::Text);
        assert_eq!(config.cameras.len(), 4);
    }

    #[test]
    fn test_bad_kernel_and_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fieldcam.yml");
        std::fs::write(&path, "filter_kernel: 16\n").unwrap();
        assert!(matches!(
            Config::read_config_file(&path),
            Err(ConfigError::BadFilterKernel(16))
        ));
        assert!(matches!(
            Config::read_config_file(&dir.path().join("missing.yml")),
            Err(ConfigError::BadFilePath(_))
        ));
    }

    #[test]
    fn test_output_directory_created_twice() {
        let dir = tempdir().unwrap();
        let config = Config {
            output_path: dir.path().join("plots"),
            ..Config::default()
        };
        let first = config.get_output_file("temperature.txt").unwrap();
        let second = config.get_output_file("temperature.txt").unwrap();
        assert_eq!(first, second);
        assert!(dir.path().join("plots").is_dir());
    }
}
