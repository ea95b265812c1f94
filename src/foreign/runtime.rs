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

//! # Foreign Runtime Module
//!
//! This module defines the surface of the foreign toolkit that the bridge
//! depends on.
//!
//! ## Core Concepts
//!
//! - **IjForeignRuntime**: the live, stateful foreign environment. It holds a
//!   registry of live objects, a results table and interpreter state, and it
//!   offers no concurrency protection of its own.
//! - **IjRawUnitInfo**: what the runtime reports about one invocable unit
//!   before any filtering.
//! - **IjServiceSet**: the services a runtime instance is created with; the
//!   set depends on whether the runtime runs headless or interactive.
//!
//! Run primitives return the produced object explicitly (`IjRunOutcome`), so
//! result inference never depends on ambient "current window" state.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::foreign::types::{IjForeignType, IjForeignValue};
use crate::value::IjTable;

/// Core services needed to discover and run units without a user interface.
pub const HEADLESS_SERVICES: &[&str] = &[
    "module",
    "plugin",
    "widget",
    "autoscale",
    "app",
    "data-type",
    "ui",
];

/// Additional services of an interactive runtime. Units depending on them do
/// no harm when run from the gateway.
pub const GUI_SERVICES: &[&str] = &[
    "menu",
    "tool",
    "event",
    "object",
    "singleton",
    "dataset-service",
    "image-utility",
    "image-io",
];

/// True when the type names one of the runtime's own services, headless or
/// interactive. The runtime injects these itself, so units taking them stay
/// callable from the gateway.
pub fn is_runtime_service(foreign_type: &IjForeignType) -> bool {
    HEADLESS_SERVICES
        .iter()
        .chain(GUI_SERVICES)
        .any(|service| foreign_type.is_assignable_to(service))
}

/// Handle of an object registered in the foreign environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IjObjectId(pub u64);

impl fmt::Display for IjObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Live object of the foreign environment.
#[derive(Clone, Debug, PartialEq)]
pub struct IjForeignObject {
    pub id: IjObjectId,
    pub title: String,
    pub value: IjForeignValue,
}

/// Declared type of a raw parameter. Resolution may fail when the runtime
/// cannot load the type's definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IjTypeRef {
    Resolved(IjForeignType),
    Unresolved { type_name: String, reason: String },
}

/// Parameter as reported by the foreign runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IjRawParameter {
    pub name: String,
    pub type_ref: IjTypeRef,
    pub required: bool,
}

impl IjRawParameter {
    pub fn new(name: impl Into<String>, ty: IjForeignType) -> Self {
        IjRawParameter {
            name: name.into(),
            type_ref: IjTypeRef::Resolved(ty),
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn unresolved(name: impl Into<String>, type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        IjRawParameter {
            name: name.into(),
            type_ref: IjTypeRef::Unresolved {
                type_name: type_name.into(),
                reason: reason.into(),
            },
            required: true,
        }
    }
}

/// Kind of invocable unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IjUnitKind {
    /// Structured module with typed parameters.
    Command,
    /// Free-form script.
    Script,
}

/// Unit description reported by the foreign runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IjRawUnitInfo {
    /// Stable delegate name.
    pub identity: String,
    pub title: String,
    pub kind: IjUnitKind,
    pub can_run_headless: bool,
    /// Whether the parameter set is generated at runtime. `None` when the
    /// runtime could not determine it.
    pub dynamic: Option<bool>,
    pub inputs: Vec<IjRawParameter>,
    pub outputs: Vec<IjRawParameter>,
}

impl IjRawUnitInfo {
    /// A headless, static command with no parameters yet.
    pub fn command(identity: impl Into<String>, title: impl Into<String>) -> Self {
        IjRawUnitInfo {
            identity: identity.into(),
            title: title.into(),
            kind: IjUnitKind::Command,
            can_run_headless: true,
            dynamic: Some(false),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, parameter: IjRawParameter) -> Self {
        self.inputs.push(parameter);
        self
    }

    pub fn output(mut self, parameter: IjRawParameter) -> Self {
        self.outputs.push(parameter);
        self
    }

    pub fn headless(mut self, can_run_headless: bool) -> Self {
        self.can_run_headless = can_run_headless;
        self
    }

    pub fn dynamic(mut self, dynamic: Option<bool>) -> Self {
        self.dynamic = dynamic;
        self
    }
}

/// What a run produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IjRunOutcome {
    /// Object the run reports as its result, if any.
    pub produced: Option<IjObjectId>,
    /// Declared module outputs by parameter name.
    pub outputs: BTreeMap<String, IjForeignValue>,
}

impl IjRunOutcome {
    pub fn produced(id: IjObjectId) -> Self {
        IjRunOutcome {
            produced: Some(id),
            outputs: BTreeMap::new(),
        }
    }
}

/// Mode the foreign runtime is created in. Fixed for the process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IjRuntimeMode {
    Headless,
    Interactive,
}

impl Default for IjRuntimeMode {
    fn default() -> Self {
        IjRuntimeMode::Headless
    }
}

/// Services and properties a runtime instance is created with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IjServiceSet {
    pub mode: IjRuntimeMode,
    pub services: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

impl IjServiceSet {
    /// Adapter service types first, then the headless core, then the
    /// interactive extras when not headless.
    pub fn for_mode(mode: IjRuntimeMode, adapter_services: &[IjForeignType]) -> Self {
        let mut services: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !services.iter().any(|s| s == name) {
                services.push(name.to_string());
            }
        };
        for service in adapter_services {
            push(service.name());
        }
        for service in HEADLESS_SERVICES {
            push(service);
        }
        if mode == IjRuntimeMode::Interactive {
            for service in GUI_SERVICES {
                push(service);
            }
        }
        IjServiceSet {
            mode,
            services,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn contains(&self, service: &str) -> bool {
        self.services.iter().any(|s| s == service)
    }
}

/// The live foreign environment.
///
/// Implementations are not expected to be thread-safe; the gateway owns the
/// only instance and serializes every access.
pub trait IjForeignRuntime: Send + fmt::Debug {
    /// Version string of the foreign toolkit.
    fn version(&self) -> String;

    /// All invocable units, unfiltered.
    fn list_available_units(&self) -> Result<Vec<IjRawUnitInfo>>;

    /// Names of concrete implementations registered in the object catalog
    /// for a multiple-choice type.
    fn catalog_implementations(&self, ty: &IjForeignType) -> Vec<String>;

    /// Registers an object under the given title and returns its handle.
    fn register_object(&mut self, title: &str, value: IjForeignValue) -> Result<IjObjectId>;

    fn object(&self, id: IjObjectId) -> Option<&IjForeignObject>;

    fn remove_object(&mut self, id: IjObjectId) -> Result<()>;

    fn live_objects(&self) -> Vec<IjObjectId>;

    /// Empties the shared results table.
    fn reset_results(&mut self);

    /// Snapshot of the shared results table.
    fn results(&self) -> IjTable;

    /// Runs a structured module. `inputs` maps parameter names to staged
    /// objects.
    fn run_module(&mut self, identity: &str, inputs: &BTreeMap<String, IjObjectId>) -> Result<IjRunOutcome>;

    /// Runs literal script text.
    fn run_script(&mut self, code: &str, args: &str) -> Result<IjRunOutcome>;
}
