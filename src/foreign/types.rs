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

//! # Foreign Types Module
//!
//! Type tags and values of the foreign toolkit.
//!
//! The foreign toolkit has an open type hierarchy. Instead of walking it, a
//! foreign type is described by its own tag plus the flat list of supertype
//! tags it can be used as. Assignability is a membership test on that list.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::value::{IjColor, IjPixelType, IjTable};

/// Foreign tags that a generated parameter dialog can always represent.
pub const PRIMITIVE_TYPE_NAMES: &[&str] = &[
    "number", "byte", "short", "int", "long", "float", "double", "string", "char", "boolean",
    "file", "color",
];

/// Foreign type tag with its supertypes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IjForeignType {
    name: String,
    supertypes: Vec<String>,
}

impl IjForeignType {
    pub fn new(name: impl Into<String>) -> Self {
        IjForeignType {
            name: name.into(),
            supertypes: Vec::new(),
        }
    }

    pub fn with_supertype(mut self, supertype: impl Into<String>) -> Self {
        let supertype = supertype.into();
        if supertype != self.name && !self.supertypes.contains(&supertype) {
            self.supertypes.push(supertype);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supertypes(&self) -> &[String] {
        &self.supertypes
    }

    /// True when a value of this type can be used where `target` is declared.
    pub fn is_assignable_to(&self, target: &str) -> bool {
        self.name == target || self.supertypes.iter().any(|s| s == target)
    }

    // Well-known foreign types.

    pub fn int() -> Self {
        IjForeignType::new("int").with_supertype("number")
    }

    pub fn long() -> Self {
        IjForeignType::new("long").with_supertype("number")
    }

    pub fn short() -> Self {
        IjForeignType::new("short").with_supertype("number")
    }

    pub fn byte() -> Self {
        IjForeignType::new("byte").with_supertype("number")
    }

    pub fn float() -> Self {
        IjForeignType::new("float").with_supertype("number")
    }

    pub fn double() -> Self {
        IjForeignType::new("double").with_supertype("number")
    }

    pub fn string() -> Self {
        IjForeignType::new("string")
    }

    pub fn char() -> Self {
        IjForeignType::new("char")
    }

    pub fn boolean() -> Self {
        IjForeignType::new("boolean")
    }

    pub fn file() -> Self {
        IjForeignType::new("file")
    }

    pub fn color() -> Self {
        IjForeignType::new("color")
    }

    pub fn float_array() -> Self {
        IjForeignType::new("float[]")
    }

    pub fn double_array() -> Self {
        IjForeignType::new("double[]")
    }

    /// Typed n-dimensional dataset.
    pub fn dataset() -> Self {
        IjForeignType::new("dataset")
            .with_supertype("image")
            .with_supertype("interval")
    }

    /// Window-backed image of the scripting layer.
    pub fn image_plus() -> Self {
        IjForeignType::new("image-plus").with_supertype("image")
    }

    pub fn results_table() -> Self {
        IjForeignType::new("results-table").with_supertype("table")
    }
}

impl fmt::Display for IjForeignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Image in the foreign representation: always five axes
/// (x, y, channel, z, time), a title, and a bit depth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IjForeignImage {
    pub title: String,
    pub dims: [usize; 5],
    pub pixels: Vec<f64>,
    pub bit_depth: u8,
}

impl IjForeignImage {
    pub fn pixel_count(&self) -> usize {
        self.dims.iter().product()
    }
}

/// Value living inside the foreign environment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IjForeignValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    File(PathBuf),
    Color(IjColor),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    Image(IjForeignImage),
    Table(IjTable),
    /// Name of an implementation picked from the runtime's object catalog.
    Choice(String),
}

impl IjForeignValue {
    /// The foreign type the value intrinsically has.
    pub fn foreign_type(&self) -> IjForeignType {
        match self {
            IjForeignValue::Int(_) => IjForeignType::long(),
            IjForeignValue::Float(_) => IjForeignType::double(),
            IjForeignValue::Text(_) => IjForeignType::string(),
            IjForeignValue::Bool(_) => IjForeignType::boolean(),
            IjForeignValue::File(_) => IjForeignType::file(),
            IjForeignValue::Color(_) => IjForeignType::color(),
            IjForeignValue::FloatArray(_) => IjForeignType::float_array(),
            IjForeignValue::DoubleArray(_) => IjForeignType::double_array(),
            IjForeignValue::Image(_) => IjForeignType::image_plus(),
            IjForeignValue::Table(_) => IjForeignType::results_table(),
            IjForeignValue::Choice(_) => IjForeignType::string(),
        }
    }

    /// Pixel type derived from the value's own representation, if it has one.
    pub fn intrinsic_pixel_type(&self) -> Option<IjPixelType> {
        match self {
            IjForeignValue::Image(image) => IjPixelType::from_bit_depth(image.bit_depth),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&IjForeignImage> {
        match self {
            IjForeignValue::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut IjForeignImage> {
        match self {
            IjForeignValue::Image(image) => Some(image),
            _ => None,
        }
    }
}
