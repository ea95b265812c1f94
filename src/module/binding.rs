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

/// How the host binds one input parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IjBinding {
    /// Entered in a generated dialog field.
    Dialog,
    /// Taken from a host data column through an adapter.
    Column,
    /// Primitive with an adapter: either a dialog field or a column.
    DialogOrColumn,
    /// Supplied by the foreign runtime, nothing to bind.
    Injected,
    /// Picked from the listed implementations.
    Choice(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IjBindingPlan {
    identity: String,
    entries: Vec<(String, IjBinding)>,
}

impl IjBindingPlan {
    pub(crate) fn new(identity: &str) -> Self {
        IjBindingPlan {
            identity: identity.to_string(),
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, parameter: &str, binding: IjBinding) {
        self.entries.push((parameter.to_string(), binding));
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn entries(&self) -> &[(String, IjBinding)] {
        &self.entries
    }

    pub fn binding(&self, parameter: &str) -> Option<&IjBinding> {
        self.entries
            .iter()
            .find(|(name, _)| name == parameter)
            .map(|(_, binding)| binding)
    }

    /// Parameters the host can bind to a data column.
    pub fn column_parameters(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, binding)| matches!(binding, IjBinding::Column | IjBinding::DialogOrColumn))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
