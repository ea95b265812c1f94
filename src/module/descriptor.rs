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

use serde::{Deserialize, Serialize};

use crate::foreign::runtime::IjUnitKind;
use crate::foreign::types::IjForeignType;

/// How a supported parameter is satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IjParameterSupport {
    /// Entered directly, no adapter needed.
    Primitive,
    /// Converted by a type adapter.
    Adapted,
    /// Injected by the foreign runtime.
    Service,
    /// One of the implementations listed in the runtime's object catalog.
    MultipleChoice,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IjParameter {
    name: String,
    foreign_type: IjForeignType,
    required: bool,
    support: IjParameterSupport,
}

impl IjParameter {
    pub(crate) fn new(
        name: impl Into<String>,
        foreign_type: IjForeignType,
        required: bool,
        support: IjParameterSupport,
    ) -> Self {
        IjParameter {
            name: name.into(),
            foreign_type,
            required,
            support,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn foreign_type(&self) -> &IjForeignType {
        &self.foreign_type
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn support(&self) -> IjParameterSupport {
        self.support
    }
}

/// Metadata of a unit that passed discovery. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IjModuleDescriptor {
    identity: String,
    title: String,
    kind: IjUnitKind,
    inputs: Vec<IjParameter>,
    outputs: Vec<IjParameter>,
    headless: bool,
    dynamic: bool,
}

impl IjModuleDescriptor {
    pub(crate) fn new(
        identity: String,
        title: String,
        kind: IjUnitKind,
        inputs: Vec<IjParameter>,
        outputs: Vec<IjParameter>,
    ) -> Self {
        IjModuleDescriptor {
            identity,
            title,
            kind,
            inputs,
            outputs,
            headless: true,
            dynamic: false,
        }
    }

    /// Stable delegate name of the unit.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> IjUnitKind {
        self.kind
    }

    pub fn inputs(&self) -> &[IjParameter] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[IjParameter] {
        &self.outputs
    }

    pub fn input(&self, name: &str) -> Option<&IjParameter> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&IjParameter> {
        self.outputs.iter().find(|p| p.name == name)
    }

    pub fn headless(&self) -> bool {
        self.headless
    }

    pub fn dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn parameter_count(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }
}
