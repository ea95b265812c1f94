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

//! Built-in adapters and primitive conversion.

use crate::adapter::registry::{IjInputAdapter, IjOutputAdapter, IjOutputHints, IjTypeAdapterRegistry};
use crate::errors::{IjError, Result};
use crate::foreign::types::{IjForeignImage, IjForeignType, IjForeignValue};
use crate::value::{IjHostType, IjHostValue, IjImage, IjPixelType};

const INTEGER_TAGS: &[&str] = &["byte", "short", "int", "long"];
const REAL_TAGS: &[&str] = &["float", "double", "number"];

/// Registers the built-in adapters. Specific image types come before the
/// general `image` tag so that lookups prefer them.
pub fn register_defaults(registry: &mut IjTypeAdapterRegistry) {
    registry.register_input_adapter(
        IjForeignType::dataset(),
        IjInputAdapter::new("image-to-dataset", IjHostType::Image, image_to_foreign),
    );
    registry.register_input_adapter(
        IjForeignType::new("image"),
        IjInputAdapter::new("image-to-image", IjHostType::Image, image_to_foreign),
    );
    registry.register_input_adapter(
        IjForeignType::float_array(),
        IjInputAdapter::new("vector-to-float-array", IjHostType::DoubleVector, vector_to_float_array),
    );
    registry.register_input_adapter(
        IjForeignType::double_array(),
        IjInputAdapter::new("vector-to-double-array", IjHostType::DoubleVector, vector_to_double_array),
    );
    registry.register_input_adapter(
        IjForeignType::new("table"),
        IjInputAdapter::new("table-to-results", IjHostType::Table, table_to_foreign),
    );

    registry.register_output_adapter(
        IjForeignType::new("image"),
        IjOutputAdapter::new("image-to-host", IjHostType::Image, foreign_to_image),
    );
    registry.register_output_adapter(
        IjForeignType::float_array(),
        IjOutputAdapter::new("float-array-to-vector", IjHostType::DoubleVector, array_to_vector),
    );
    registry.register_output_adapter(
        IjForeignType::double_array(),
        IjOutputAdapter::new("double-array-to-vector", IjHostType::DoubleVector, array_to_vector),
    );
    registry.register_output_adapter(
        IjForeignType::new("table"),
        IjOutputAdapter::new("results-to-table", IjHostType::Table, foreign_to_table),
    );
    registry.register_output_adapter(
        IjForeignType::new("number"),
        IjOutputAdapter::new("number-to-host", IjHostType::Double, scalar_to_host),
    );
    registry.register_output_adapter(
        IjForeignType::string(),
        IjOutputAdapter::new("string-to-host", IjHostType::Text, scalar_to_host),
    );
    registry.register_output_adapter(
        IjForeignType::boolean(),
        IjOutputAdapter::new("boolean-to-host", IjHostType::Boolean, scalar_to_host),
    );
}

fn mismatch(value: &IjHostValue, target: &IjForeignType) -> IjError {
    IjError::conversion(format!(
        "cannot pass a {} value as foreign type '{}'",
        value.host_type(),
        target
    ))
}

fn is_any(target: &IjForeignType, tags: &[&str]) -> bool {
    tags.iter().any(|tag| target.is_assignable_to(tag))
}

/// Converts a primitive host value into the declared primitive foreign type.
pub fn convert_primitive(value: &IjHostValue, target: &IjForeignType) -> Result<IjForeignValue> {
    if is_any(target, INTEGER_TAGS) {
        return match value {
            IjHostValue::Integer(i) => Ok(IjForeignValue::Int(*i)),
            IjHostValue::Double(d) if d.fract() == 0.0 && d.is_finite() => Ok(IjForeignValue::Int(*d as i64)),
            _ => Err(mismatch(value, target)),
        };
    }
    if is_any(target, REAL_TAGS) {
        return match value {
            IjHostValue::Integer(i) => Ok(IjForeignValue::Float(*i as f64)),
            IjHostValue::Double(d) => Ok(IjForeignValue::Float(*d)),
            _ => Err(mismatch(value, target)),
        };
    }
    if target.is_assignable_to("char") {
        return match value {
            IjHostValue::Text(text) if text.chars().count() == 1 => Ok(IjForeignValue::Text(text.clone())),
            _ => Err(mismatch(value, target)),
        };
    }
    if target.is_assignable_to("string") {
        return match value {
            IjHostValue::Text(text) => Ok(IjForeignValue::Text(text.clone())),
            _ => Err(mismatch(value, target)),
        };
    }
    if target.is_assignable_to("boolean") {
        return match value {
            IjHostValue::Boolean(b) => Ok(IjForeignValue::Bool(*b)),
            _ => Err(mismatch(value, target)),
        };
    }
    if target.is_assignable_to("file") {
        return match value {
            IjHostValue::File(path) => Ok(IjForeignValue::File(path.clone())),
            IjHostValue::Text(text) => Ok(IjForeignValue::File(text.into())),
            _ => Err(mismatch(value, target)),
        };
    }
    if target.is_assignable_to("color") {
        return match value {
            IjHostValue::Color(color) => Ok(IjForeignValue::Color(*color)),
            _ => Err(mismatch(value, target)),
        };
    }
    Err(mismatch(value, target))
}

/// Natural foreign type of a primitive host value, used when no foreign type
/// is declared.
pub(crate) fn natural_foreign_type(host_type: IjHostType) -> Option<IjForeignType> {
    match host_type {
        IjHostType::Integer => Some(IjForeignType::long()),
        IjHostType::Double => Some(IjForeignType::double()),
        IjHostType::Text => Some(IjForeignType::string()),
        IjHostType::Boolean => Some(IjForeignType::boolean()),
        IjHostType::File => Some(IjForeignType::file()),
        IjHostType::Color => Some(IjForeignType::color()),
        _ => None,
    }
}

fn image_to_foreign(value: &IjHostValue, target: &IjForeignType) -> Result<IjForeignValue> {
    let image = value.as_image().ok_or_else(|| mismatch(value, target))?;
    if image.num_dimensions() > 5 {
        return Err(IjError::conversion(format!(
            "foreign images have at most 5 dimensions, got {}",
            image.num_dimensions()
        )));
    }
    let mut dims = [1usize; 5];
    for (axis, size) in image.dims().iter().enumerate() {
        dims[axis] = *size;
    }
    Ok(IjForeignValue::Image(IjForeignImage {
        title: String::new(),
        dims,
        pixels: image.pixels().to_vec(),
        bit_depth: image.pixel_type().bit_depth(),
    }))
}

/// Converts a foreign image back. With an `ndim` hint the result keeps
/// exactly that many leading axes (extra axes are cut to their first plane);
/// without one, trailing singleton axes beyond the second are dropped.
fn foreign_to_image(value: &IjForeignValue, hints: &IjOutputHints) -> Result<IjHostValue> {
    let image = value
        .as_image()
        .ok_or_else(|| IjError::conversion("expected a foreign image"))?;
    if image.pixels.len() != image.pixel_count() {
        return Err(IjError::conversion(format!(
            "foreign image '{}' has {} pixels for dimensions {:?}",
            image.title,
            image.pixels.len(),
            image.dims
        )));
    }
    let pixel_type = hints
        .pixel_type
        .or_else(|| IjPixelType::from_bit_depth(image.bit_depth))
        .ok_or_else(|| IjError::conversion(format!("unsupported bit depth {}", image.bit_depth)))?;

    let dims: Vec<usize> = match hints.ndim {
        Some(ndim) => (0..ndim.max(1))
            .map(|axis| image.dims.get(axis).copied().unwrap_or(1))
            .collect(),
        None => {
            let mut dims = image.dims.to_vec();
            while dims.len() > 2 && dims.last() == Some(&1) {
                dims.pop();
            }
            dims
        }
    };
    let count: usize = dims.iter().product();
    let pixels = image
        .pixels
        .iter()
        .take(count)
        .map(|p| pixel_type.coerce(*p))
        .collect();
    Ok(IjHostValue::Image(IjImage::new(dims, pixels, pixel_type)?))
}

fn vector_to_float_array(value: &IjHostValue, target: &IjForeignType) -> Result<IjForeignValue> {
    match value {
        IjHostValue::DoubleVector(values) => Ok(IjForeignValue::FloatArray(values.iter().map(|v| *v as f32).collect())),
        _ => Err(mismatch(value, target)),
    }
}

fn vector_to_double_array(value: &IjHostValue, target: &IjForeignType) -> Result<IjForeignValue> {
    match value {
        IjHostValue::DoubleVector(values) => Ok(IjForeignValue::DoubleArray(values.clone())),
        _ => Err(mismatch(value, target)),
    }
}

fn table_to_foreign(value: &IjHostValue, target: &IjForeignType) -> Result<IjForeignValue> {
    match value {
        IjHostValue::Table(table) => Ok(IjForeignValue::Table(table.clone())),
        _ => Err(mismatch(value, target)),
    }
}

fn array_to_vector(value: &IjForeignValue, _hints: &IjOutputHints) -> Result<IjHostValue> {
    match value {
        IjForeignValue::FloatArray(values) => Ok(IjHostValue::DoubleVector(values.iter().map(|v| *v as f64).collect())),
        IjForeignValue::DoubleArray(values) => Ok(IjHostValue::DoubleVector(values.clone())),
        other => Err(IjError::conversion(format!("expected an array, got {}", other.foreign_type()))),
    }
}

fn foreign_to_table(value: &IjForeignValue, _hints: &IjOutputHints) -> Result<IjHostValue> {
    match value {
        IjForeignValue::Table(table) => Ok(IjHostValue::Table(table.clone())),
        other => Err(IjError::conversion(format!("expected a table, got {}", other.foreign_type()))),
    }
}

fn scalar_to_host(value: &IjForeignValue, _hints: &IjOutputHints) -> Result<IjHostValue> {
    match value {
        IjForeignValue::Int(i) => Ok(IjHostValue::Integer(*i)),
        IjForeignValue::Float(f) => Ok(IjHostValue::Double(*f)),
        IjForeignValue::Text(text) | IjForeignValue::Choice(text) => Ok(IjHostValue::Text(text.clone())),
        IjForeignValue::Bool(b) => Ok(IjHostValue::Boolean(*b)),
        other => Err(IjError::conversion(format!("expected a scalar, got {}", other.foreign_type()))),
    }
}
