//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Zi.
//! The Zi project belongs to the Dunimd project team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Host Value Module
//!
//! This module provides the host-side data model: the values a host
//! application hands to the gateway and receives back from it.
//!
//! ## Value Kinds
//!
//! - **Primitives**: integers, doubles, text, booleans, files and colors. These
//!   never need an adapter.
//! - **DoubleVector**: a flat vector of doubles (feature vectors, kernels).
//! - **Image**: an n-dimensional image with a pixel type and optional
//!   descriptive metadata.
//! - **Table**: a measurement table with named numeric columns.
//!
//! ## Usage Example
//!
//! ```rust
//! use ijgate::value::{IjHostValue, IjImage, IjPixelType};
//!
//! let image = IjImage::new(vec![2, 2], vec![0.0, 1.0, 2.0, 3.0], IjPixelType::UnsignedByte)?;
//! let value = IjHostValue::Image(image);
//! assert!(!value.host_type().is_primitive_representable());
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{IjError, Result};

/// Pixel types understood by both sides of the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IjPixelType {
    UnsignedByte,
    UnsignedShort,
    Float,
    Double,
}

impl IjPixelType {
    /// Bits per pixel in the foreign representation.
    pub fn bit_depth(&self) -> u8 {
        match self {
            IjPixelType::UnsignedByte => 8,
            IjPixelType::UnsignedShort => 16,
            IjPixelType::Float => 32,
            IjPixelType::Double => 64,
        }
    }

    /// Maps a foreign bit depth back onto a pixel type.
    pub fn from_bit_depth(bits: u8) -> Option<Self> {
        match bits {
            8 => Some(IjPixelType::UnsignedByte),
            16 => Some(IjPixelType::UnsignedShort),
            32 => Some(IjPixelType::Float),
            64 => Some(IjPixelType::Double),
            _ => None,
        }
    }

    /// Coerces a sample into the value range of this type.
    ///
    /// Integer types round to the nearest value and saturate at their bounds.
    pub fn coerce(&self, sample: f64) -> f64 {
        match self {
            IjPixelType::UnsignedByte => sample.round().clamp(0.0, u8::MAX as f64),
            IjPixelType::UnsignedShort => sample.round().clamp(0.0, u16::MAX as f64),
            IjPixelType::Float => sample as f32 as f64,
            IjPixelType::Double => sample,
        }
    }
}

/// RGB color as produced by color pickers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IjColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl IjColor {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        IjColor { red, green, blue }
    }
}

/// Descriptive metadata that travels with a host image but has no place in
/// the foreign representation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IjImageMetadata {
    /// Human readable image name.
    pub name: Option<String>,
    /// Axis labels, one per dimension (e.g. "X", "Y", "Time").
    pub axes: Vec<String>,
    /// Physical calibration per axis.
    pub calibration: Vec<f64>,
    /// Where the image came from (file, upstream node, ...).
    pub source: Option<String>,
}

/// N-dimensional image in the host representation.
///
/// Pixels are stored in row-major order with the first dimension varying
/// fastest, the same layout the foreign runtime uses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IjImage {
    dims: Vec<usize>,
    pixels: Vec<f64>,
    pixel_type: IjPixelType,
    metadata: Option<IjImageMetadata>,
}

impl IjImage {
    /// Creates an image, checking that the pixel count matches the dimensions.
    pub fn new(dims: Vec<usize>, pixels: Vec<f64>, pixel_type: IjPixelType) -> Result<Self> {
        if dims.is_empty() {
            return Err(IjError::conversion("image must have at least one dimension"));
        }
        let expected: usize = dims.iter().product();
        if expected != pixels.len() {
            return Err(IjError::conversion(format!(
                "image dimensions {:?} require {} pixels, got {}",
                dims,
                expected,
                pixels.len()
            )));
        }
        Ok(IjImage {
            dims,
            pixels,
            pixel_type,
            metadata: None,
        })
    }

    /// Creates an image filled with a constant value.
    pub fn filled(dims: Vec<usize>, value: f64, pixel_type: IjPixelType) -> Result<Self> {
        let count = dims.iter().product();
        IjImage::new(dims, vec![pixel_type.coerce(value); count], pixel_type)
    }

    pub fn with_metadata(mut self, metadata: IjImageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn set_metadata(&mut self, metadata: Option<IjImageMetadata>) {
        self.metadata = metadata;
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn num_dimensions(&self) -> usize {
        self.dims.len()
    }

    pub fn pixels(&self) -> &[f64] {
        &self.pixels
    }

    pub fn pixel_type(&self) -> IjPixelType {
        self.pixel_type
    }

    pub fn metadata(&self) -> Option<&IjImageMetadata> {
        self.metadata.as_ref()
    }

    /// Equality that ignores metadata, which the foreign form cannot carry.
    pub fn same_content(&self, other: &IjImage) -> bool {
        self.dims == other.dims && self.pixel_type == other.pixel_type && self.pixels == other.pixels
    }
}

/// Measurement table produced as a side output of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IjTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl IjTable {
    pub fn new() -> Self {
        IjTable::default()
    }

    /// Appends an empty row and returns its index.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(vec![f64::NAN; self.columns.len()]);
        self.rows.len() - 1
    }

    /// Sets a value in the last row, creating the column and the row when
    /// needed.
    pub fn set_value(&mut self, column: &str, value: f64) {
        if self.rows.is_empty() {
            self.add_row();
        }
        let index = match self.columns.iter().position(|c| c == column) {
            Some(index) => index,
            None => {
                self.columns.push(column.to_string());
                for row in &mut self.rows {
                    row.push(f64::NAN);
                }
                self.columns.len() - 1
            }
        };
        if let Some(row) = self.rows.last_mut() {
            row[index] = value;
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.get(index)).copied()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.rows.clear();
    }
}

/// Type tags for host values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IjHostType {
    Integer,
    Double,
    Text,
    Boolean,
    File,
    Color,
    DoubleVector,
    Image,
    Table,
}

impl IjHostType {
    /// Host types simple enough to be entered in a generated dialog and
    /// passed to the foreign runtime without an adapter.
    pub fn is_primitive_representable(&self) -> bool {
        matches!(
            self,
            IjHostType::Integer
                | IjHostType::Double
                | IjHostType::Text
                | IjHostType::Boolean
                | IjHostType::File
                | IjHostType::Color
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IjHostType::Integer => "integer",
            IjHostType::Double => "double",
            IjHostType::Text => "text",
            IjHostType::Boolean => "boolean",
            IjHostType::File => "file",
            IjHostType::Color => "color",
            IjHostType::DoubleVector => "double-vector",
            IjHostType::Image => "image",
            IjHostType::Table => "table",
        }
    }
}

impl fmt::Display for IjHostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value handed over by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IjHostValue {
    Integer(i64),
    Double(f64),
    Text(String),
    Boolean(bool),
    File(PathBuf),
    Color(IjColor),
    DoubleVector(Vec<f64>),
    Image(IjImage),
    Table(IjTable),
}

impl IjHostValue {
    pub fn host_type(&self) -> IjHostType {
        match self {
            IjHostValue::Integer(_) => IjHostType::Integer,
            IjHostValue::Double(_) => IjHostType::Double,
            IjHostValue::Text(_) => IjHostType::Text,
            IjHostValue::Boolean(_) => IjHostType::Boolean,
            IjHostValue::File(_) => IjHostType::File,
            IjHostValue::Color(_) => IjHostType::Color,
            IjHostValue::DoubleVector(_) => IjHostType::DoubleVector,
            IjHostValue::Image(_) => IjHostType::Image,
            IjHostValue::Table(_) => IjHostType::Table,
        }
    }

    pub fn as_image(&self) -> Option<&IjImage> {
        match self {
            IjHostValue::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn into_image(self) -> Option<IjImage> {
        match self {
            IjHostValue::Image(image) => Some(image),
            _ => None,
        }
    }
}

impl From<IjImage> for IjHostValue {
    fn from(image: IjImage) -> Self {
        IjHostValue::Image(image)
    }
}
