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

//! # Type Adapter Registry Module
//!
//! This module maps foreign parameter types to converters between host and
//! foreign values.
//!
//! ## Lookup Rules
//!
//! - An adapter is registered for a declared foreign type.
//! - A queried type matches when it is assignable to the declared type
//!   (same tag, or the declared tag is one of its supertypes).
//! - The first match in registration order wins. Register specific adapters
//!   before general ones.
//!
//! The table is append-only. Build it once at startup, then share it behind
//! an `Arc`.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::foreign::runtime::is_runtime_service;
use crate::foreign::types::{IjForeignType, IjForeignValue, PRIMITIVE_TYPE_NAMES};
use crate::value::{IjHostType, IjHostValue, IjPixelType};

/// Direction of an adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IjAdapterDirection {
    /// Host value to foreign value.
    Input,
    /// Foreign value to host value.
    Output,
}

/// Converts a host value into the declared foreign type.
pub type IjInputConvertFn = fn(&IjHostValue, &IjForeignType) -> Result<IjForeignValue>;

/// Converts a foreign value back into a host value.
pub type IjOutputConvertFn = fn(&IjForeignValue, &IjOutputHints) -> Result<IjHostValue>;

/// Shape hints for output conversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IjOutputHints {
    /// Number of dimensions the result must have. Set when the result is a
    /// modified staged input.
    pub ndim: Option<usize>,
    /// Pixel type of the result. Falls back to the foreign value's own type.
    pub pixel_type: Option<IjPixelType>,
}

/// Host-to-foreign converter.
#[derive(Clone, Debug)]
pub struct IjInputAdapter {
    pub name: String,
    pub host_type: IjHostType,
    /// Whether the host UI may also render an adapted parameter as a dialog
    /// field instead of a column.
    pub dialog_capable: bool,
    pub convert: IjInputConvertFn,
}

impl IjInputAdapter {
    pub fn new(name: impl Into<String>, host_type: IjHostType, convert: IjInputConvertFn) -> Self {
        IjInputAdapter {
            name: name.into(),
            host_type,
            dialog_capable: false,
            convert,
        }
    }

    pub fn dialog_capable(mut self) -> Self {
        self.dialog_capable = true;
        self
    }

    pub fn direction(&self) -> IjAdapterDirection {
        IjAdapterDirection::Input
    }
}

/// Foreign-to-host converter.
#[derive(Clone, Debug)]
pub struct IjOutputAdapter {
    pub name: String,
    pub host_type: IjHostType,
    pub convert: IjOutputConvertFn,
}

impl IjOutputAdapter {
    pub fn new(name: impl Into<String>, host_type: IjHostType, convert: IjOutputConvertFn) -> Self {
        IjOutputAdapter {
            name: name.into(),
            host_type,
            convert,
        }
    }

    pub fn direction(&self) -> IjAdapterDirection {
        IjAdapterDirection::Output
    }
}

#[derive(Clone, Debug)]
struct IjAdapterEntry<A> {
    foreign_type: IjForeignType,
    adapter: A,
}

/// Registry of input and output adapters.
#[derive(Clone, Debug, Default)]
pub struct IjTypeAdapterRegistry {
    inputs: Vec<IjAdapterEntry<IjInputAdapter>>,
    outputs: Vec<IjAdapterEntry<IjOutputAdapter>>,
    service_types: Vec<IjForeignType>,
}

impl IjTypeAdapterRegistry {
    #[allow(non_snake_case)]
    pub fn new() -> Self {
        IjTypeAdapterRegistry::default()
    }

    /// Registry preloaded with the built-in adapters.
    pub fn with_defaults() -> Self {
        let mut registry = IjTypeAdapterRegistry::new();
        super::builtin::register_defaults(&mut registry);
        registry
    }

    pub fn register_input_adapter(&mut self, foreign_type: IjForeignType, adapter: IjInputAdapter) {
        log::debug!(
            "adapter.register.input: input adapter registered - adapter={}, foreign_type={}, host_type={}, position={}",
            adapter.name,
            foreign_type,
            adapter.host_type,
            self.inputs.len()
        );
        self.inputs.push(IjAdapterEntry { foreign_type, adapter });
    }

    pub fn register_output_adapter(&mut self, foreign_type: IjForeignType, adapter: IjOutputAdapter) {
        log::debug!(
            "adapter.register.output: output adapter registered - adapter={}, foreign_type={}, host_type={}, position={}",
            adapter.name,
            foreign_type,
            adapter.host_type,
            self.outputs.len()
        );
        self.outputs.push(IjAdapterEntry { foreign_type, adapter });
    }

    /// Declares a foreign service type the runtime injects into units.
    /// Inputs of this type need no host value.
    pub fn register_service_type(&mut self, service: IjForeignType) {
        if !self.service_types.contains(&service) {
            self.service_types.push(service);
        }
    }

    pub fn find_input_adapter(&self, foreign_type: &IjForeignType) -> Option<&IjInputAdapter> {
        self.inputs
            .iter()
            .find(|entry| foreign_type.is_assignable_to(entry.foreign_type.name()))
            .map(|entry| &entry.adapter)
    }

    pub fn find_output_adapter(&self, foreign_type: &IjForeignType) -> Option<&IjOutputAdapter> {
        self.outputs
            .iter()
            .find(|entry| foreign_type.is_assignable_to(entry.foreign_type.name()))
            .map(|entry| &entry.adapter)
    }

    /// First input adapter that accepts the given host type, with the foreign
    /// type it was registered for. Used when no foreign type is declared, as
    /// for script inputs.
    pub fn find_input_adapter_for_host(&self, host_type: IjHostType) -> Option<(&IjForeignType, &IjInputAdapter)> {
        self.inputs
            .iter()
            .find(|entry| entry.adapter.host_type == host_type)
            .map(|entry| (&entry.foreign_type, &entry.adapter))
    }

    /// True when a generated dialog can represent the type without an adapter.
    pub fn is_primitive_representable(&self, foreign_type: &IjForeignType) -> bool {
        PRIMITIVE_TYPE_NAMES
            .iter()
            .any(|name| foreign_type.is_assignable_to(name))
    }

    pub fn is_service_type(&self, foreign_type: &IjForeignType) -> bool {
        self.service_types
            .iter()
            .any(|service| foreign_type.is_assignable_to(service.name()))
    }

    /// Primitive, injected service, or adapted input.
    pub fn supports_input(&self, foreign_type: &IjForeignType) -> bool {
        self.is_primitive_representable(foreign_type)
            || self.is_service_type(foreign_type)
            || self.find_input_adapter(foreign_type).is_some()
            || is_runtime_service(foreign_type)
    }

    pub fn supports_output(&self, foreign_type: &IjForeignType) -> bool {
        self.find_output_adapter(foreign_type).is_some()
    }

    pub fn service_types(&self) -> &[IjForeignType] {
        &self.service_types
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }
}
