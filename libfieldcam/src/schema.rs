use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::accessor::{FIELD_COMPONENT_NAMES, TIMESTAMP_NAME};
use super::container::ContainerFormat;
use super::error::SchemaError;

/// Column width used by the acquisition system for text containers
pub const DEFAULT_WIDTH: usize = 18;
/// One record per second for an hour
pub const DEFAULT_CAPACITY: usize = 3600;
const COLOR_CHANNELS: usize = 3;

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    F64,
    U8,
}

/// A single named, typed field of a container.
///
/// `shape` is the shape of one record: empty for scalars, `[n]` for vectors and
/// `[height, width, 3]` for image frames. `width` only matters for text
/// containers, where it sets the header column width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    pub dtype: ElementType,
    #[serde(default)]
    pub shape: Vec<usize>,
    #[serde(default)]
    pub width: Option<usize>,
}

impl FieldSpec {
    pub fn scalar(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dtype: ElementType::F64,
            shape: vec![],
            width: None,
        }
    }

    pub fn vector(name: &str, len: usize) -> Self {
        Self {
            name: name.to_string(),
            dtype: ElementType::F64,
            shape: vec![len],
            width: None,
        }
    }

    pub fn image(name: &str, height: usize, width: usize) -> Self {
        Self {
            name: name.to_string(),
            dtype: ElementType::U8,
            shape: vec![height, width, COLOR_CHANNELS],
            width: None,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn display_width(&self) -> usize {
        self.width.unwrap_or(DEFAULT_WIDTH)
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn is_image(&self) -> bool {
        self.dtype == ElementType::U8
    }

    fn check_shape(&self) -> Result<(), SchemaError> {
        let valid = match (self.dtype, self.shape.as_slice()) {
            (ElementType::F64, []) => true,
            (ElementType::F64, [len]) => *len > 0,
            (ElementType::U8, [h, w, c]) => *h > 0 && *w > 0 && *c == COLOR_CHANNELS,
            _ => false,
        };
        if valid {
            Ok(())
        } else {
            Err(SchemaError::BadShape(self.name.clone(), self.shape.clone()))
        }
    }
}

/// The fixed field layout of a container, decided once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    pub fields: Vec<FieldSpec>,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// The hourly scalar measurement layout: timestamp, temperature, bx, by, bz
    pub fn measurements() -> Self {
        let mut fields = vec![
            FieldSpec::scalar(TIMESTAMP_NAME).with_width(DEFAULT_WIDTH),
            FieldSpec::scalar("temperature").with_width(DEFAULT_WIDTH),
        ];
        for component in FIELD_COMPONENT_NAMES {
            fields.push(FieldSpec::scalar(component).with_width(DEFAULT_WIDTH));
        }
        Self::new(fields)
    }

    /// The hourly camera layout: timestamp plus one frame per record
    pub fn exposures(height: usize, width: usize) -> Self {
        Self::new(vec![
            FieldSpec::scalar(TIMESTAMP_NAME),
            FieldSpec::image("exposure", height, width),
        ])
    }

    /// Load a schema from YAML. Unknown keys are rejected.
    pub fn read_schema_file(path: &Path) -> Result<Self, SchemaError> {
        let yaml_str = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the schema can be materialized in a container of the given format
    pub fn validate(&self, format: ContainerFormat) -> Result<(), SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::Empty);
        }
        if format == ContainerFormat::Hdf5 && self.capacity == 0 {
            return Err(SchemaError::ZeroCapacity);
        }

        let mut seen = FxHashSet::default();
        for field in &self.fields {
            if field.name.is_empty() || field.name.chars().any(char::is_whitespace) {
                return Err(SchemaError::BadName(field.name.clone()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            field.check_shape()?;
            if format == ContainerFormat::Text && !field.is_scalar() {
                return Err(SchemaError::NonScalarTextField(field.name.clone()));
            }
        }

        match self.field(TIMESTAMP_NAME) {
            Some(ts) if ts.dtype == ElementType::F64 && ts.is_scalar() => Ok(()),
            _ => Err(SchemaError::MissingTimestamp),
        }
    }

    /// Header of a text container, without the leading comment marker
    pub fn header_line(&self) -> String {
        self.fields
            .iter()
            .map(|f| header_cell(&f.name, f.display_width()))
            .collect()
    }
}

/// One right justified header column. There is always at least one space in
/// front of the name so adjacent columns never run together.
pub fn header_cell(name: &str, width: usize) -> String {
    format!(" {:>w$}", name, w = width.saturating_sub(1))
}
