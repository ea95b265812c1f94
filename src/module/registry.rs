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

//! # Module Registry Module
//!
//! Discovers the foreign units that can be driven from the host and indexes
//! them by identity.
//!
//! ## Discovery Rules
//!
//! A candidate is kept only when:
//!
//! - it can run headless;
//! - its parameter set is static (an undeterminable status counts as dynamic);
//! - every input is primitive, adapted, an injected service, or a
//!   multiple-choice type with at least one catalog implementation;
//! - every output has an output adapter;
//! - it declares at least one parameter.
//!
//! Each candidate is inspected on its own. A failure while inspecting one
//! unit rejects that unit and discovery moves on. The registry is immutable
//! once built.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapter::registry::IjTypeAdapterRegistry;
use crate::errors::{IjError, Result};
use crate::foreign::runtime::{is_runtime_service, IjForeignRuntime, IjRawParameter, IjRawUnitInfo, IjTypeRef};
use crate::foreign::types::IjForeignType;
use crate::module::binding::{IjBinding, IjBindingPlan};
use crate::module::descriptor::{IjModuleDescriptor, IjParameter, IjParameterSupport};

/// Why a candidate unit was left out.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum IjRejection {
    #[error("unit requires an interactive environment")]
    NotHeadless,

    #[error("unit generates its parameters at runtime")]
    Dynamic,

    #[error("dynamic status could not be determined: {0}")]
    DynamicUnknown(String),

    #[error("input '{parameter}' of type '{type_name}' cannot be supplied")]
    UnsupportedInput { parameter: String, type_name: String },

    #[error("output '{parameter}' of type '{type_name}' cannot be converted back")]
    UnsupportedOutput { parameter: String, type_name: String },

    #[error("unit declares no parameters")]
    NoParameters,

    #[error("inspection failed: {0}")]
    InspectionFailed(String),
}

impl IjRejection {
    /// Rejections caused by a broken candidate rather than by filtering.
    pub fn is_failure(&self) -> bool {
        matches!(self, IjRejection::DynamicUnknown(_) | IjRejection::InspectionFailed(_))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum IjDiscoveryOutcome {
    Supported(IjModuleDescriptor),
    Rejected { identity: String, reason: IjRejection },
}

impl IjDiscoveryOutcome {
    pub fn is_supported(&self) -> bool {
        matches!(self, IjDiscoveryOutcome::Supported(_))
    }
}

/// Supported units of one foreign runtime, indexed by identity.
#[derive(Debug)]
pub struct IjModuleRegistry {
    adapters: Arc<IjTypeAdapterRegistry>,
    runtime_version: String,
    modules: Vec<Arc<IjModuleDescriptor>>,
    index: HashMap<String, usize>,
    choices: BTreeMap<String, Vec<String>>,
    rejections: Vec<(String, IjRejection)>,
}

impl IjModuleRegistry {
    /// Lists every unit of the runtime once and keeps the supported ones.
    pub fn discover(runtime: &dyn IjForeignRuntime, adapters: Arc<IjTypeAdapterRegistry>) -> Result<Self> {
        let runtime_version = runtime.version();
        let candidates = runtime
            .list_available_units()
            .map_err(|e| IjError::Discovery(format!("cannot list foreign units: {}", e)))?;

        let mut registry = IjModuleRegistry {
            adapters,
            runtime_version,
            modules: Vec::new(),
            index: HashMap::new(),
            choices: BTreeMap::new(),
            rejections: Vec::new(),
        };

        let total = candidates.len();
        for candidate in &candidates {
            match Self::inspect(candidate, runtime, &registry.adapters, &mut registry.choices) {
                IjDiscoveryOutcome::Supported(descriptor) => registry.insert(descriptor),
                IjDiscoveryOutcome::Rejected { identity, reason } => {
                    if reason.is_failure() {
                        log::warn!(
                            "registry.discover.rejected: candidate could not be inspected - identity={}, reason={}",
                            identity,
                            reason
                        );
                    } else {
                        log::debug!(
                            "registry.discover.rejected: candidate filtered out - identity={}, reason={}",
                            identity,
                            reason
                        );
                    }
                    registry.rejections.push((identity, reason));
                }
            }
        }

        log::info!(
            "registry.discover.done: discovery finished - runtime_version={}, candidates={}, supported={}, rejected={}",
            registry.runtime_version,
            total,
            registry.modules.len(),
            registry.rejections.len()
        );
        Ok(registry)
    }

    fn insert(&mut self, descriptor: IjModuleDescriptor) {
        if self.index.contains_key(descriptor.identity()) {
            log::warn!(
                "registry.discover.duplicate: duplicate identity ignored, keeping first - identity={}",
                descriptor.identity()
            );
            return;
        }
        self.index
            .insert(descriptor.identity().to_string(), self.modules.len());
        self.modules.push(Arc::new(descriptor));
    }

    /// Applies the discovery rules to one candidate. Catalog implementations
    /// found for multiple-choice inputs are recorded in `choices`.
    pub fn inspect(
        candidate: &IjRawUnitInfo,
        runtime: &dyn IjForeignRuntime,
        adapters: &IjTypeAdapterRegistry,
        choices: &mut BTreeMap<String, Vec<String>>,
    ) -> IjDiscoveryOutcome {
        let reject = |reason: IjRejection| IjDiscoveryOutcome::Rejected {
            identity: candidate.identity.clone(),
            reason,
        };

        if candidate.identity.trim().is_empty() {
            log::error!("registry.discover.malformed: candidate without identity - title={}", candidate.title);
            return reject(IjRejection::InspectionFailed("empty identity".to_string()));
        }
        if !candidate.can_run_headless {
            return reject(IjRejection::NotHeadless);
        }
        match candidate.dynamic {
            Some(false) => {}
            Some(true) => return reject(IjRejection::Dynamic),
            None => {
                return reject(IjRejection::DynamicUnknown(
                    "unit definition could not be loaded".to_string(),
                ))
            }
        }
        if candidate.inputs.is_empty() && candidate.outputs.is_empty() {
            return reject(IjRejection::NoParameters);
        }

        let mut inputs = Vec::with_capacity(candidate.inputs.len());
        for raw in &candidate.inputs {
            let ty = match resolve(raw) {
                Ok(ty) => ty,
                Err(reason) => return reject(reason),
            };
            let support = if adapters.is_primitive_representable(ty) {
                IjParameterSupport::Primitive
            } else if adapters.is_service_type(ty) {
                IjParameterSupport::Service
            } else if adapters.find_input_adapter(ty).is_some() {
                IjParameterSupport::Adapted
            } else if is_runtime_service(ty) {
                IjParameterSupport::Service
            } else {
                let implementations = runtime.catalog_implementations(ty);
                if implementations.is_empty() {
                    return reject(IjRejection::UnsupportedInput {
                        parameter: raw.name.clone(),
                        type_name: ty.name().to_string(),
                    });
                }
                choices.insert(ty.name().to_string(), implementations);
                IjParameterSupport::MultipleChoice
            };
            inputs.push(IjParameter::new(raw.name.clone(), ty.clone(), raw.required, support));
        }

        let mut outputs = Vec::with_capacity(candidate.outputs.len());
        for raw in &candidate.outputs {
            let ty = match resolve(raw) {
                Ok(ty) => ty,
                Err(reason) => return reject(reason),
            };
            if !adapters.supports_output(ty) {
                return reject(IjRejection::UnsupportedOutput {
                    parameter: raw.name.clone(),
                    type_name: ty.name().to_string(),
                });
            }
            outputs.push(IjParameter::new(
                raw.name.clone(),
                ty.clone(),
                raw.required,
                IjParameterSupport::Adapted,
            ));
        }

        IjDiscoveryOutcome::Supported(IjModuleDescriptor::new(
            candidate.identity.clone(),
            candidate.title.clone(),
            candidate.kind,
            inputs,
            outputs,
        ))
    }

    /// Supported units in discovery order.
    pub fn supported_units(&self) -> &[Arc<IjModuleDescriptor>] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains_key(identity)
    }

    /// Resolves a unit saved by an earlier session. Only the identity is
    /// used; the version is carried into the error for diagnostics.
    pub fn module(&self, version: &str, identity: &str) -> Result<Arc<IjModuleDescriptor>> {
        self.index
            .get(identity)
            .map(|position| Arc::clone(&self.modules[*position]))
            .ok_or_else(|| IjError::UnitUnavailable {
                identity: identity.to_string(),
                version: version.to_string(),
            })
    }

    pub fn is_input_type_supported(&self, foreign_type: &IjForeignType) -> bool {
        self.adapters.supports_input(foreign_type) || self.choices.contains_key(foreign_type.name())
    }

    /// Catalog implementations recorded for a multiple-choice type.
    pub fn choices(&self, foreign_type: &IjForeignType) -> Option<&[String]> {
        self.choices.get(foreign_type.name()).map(|v| v.as_slice())
    }

    pub fn rejections(&self) -> &[(String, IjRejection)] {
        &self.rejections
    }

    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    pub fn adapters(&self) -> &Arc<IjTypeAdapterRegistry> {
        &self.adapters
    }

    /// Digest over the supported descriptor set. Equal for two discoveries
    /// over the same unit set.
    pub fn fingerprint(&self) -> String {
        let descriptors: Vec<&IjModuleDescriptor> = self.modules.iter().map(|d| d.as_ref()).collect();
        let bytes = serde_json::to_vec(&descriptors).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }

    /// How a host UI binds each input of the descriptor.
    pub fn binding_plan(&self, descriptor: &IjModuleDescriptor) -> IjBindingPlan {
        let mut plan = IjBindingPlan::new(descriptor.identity());
        for parameter in descriptor.inputs() {
            let binding = match parameter.support() {
                IjParameterSupport::Primitive => {
                    if self.adapters.find_input_adapter(parameter.foreign_type()).is_some() {
                        IjBinding::DialogOrColumn
                    } else {
                        IjBinding::Dialog
                    }
                }
                IjParameterSupport::Adapted => match self.adapters.find_input_adapter(parameter.foreign_type()) {
                    Some(adapter) if adapter.dialog_capable => IjBinding::DialogOrColumn,
                    _ => IjBinding::Column,
                },
                IjParameterSupport::Service => IjBinding::Injected,
                IjParameterSupport::MultipleChoice => IjBinding::Choice(
                    self.choices(parameter.foreign_type())
                        .map(|c| c.to_vec())
                        .unwrap_or_default(),
                ),
            };
            plan.push(parameter.name(), binding);
        }
        plan
    }
}

fn resolve(raw: &IjRawParameter) -> std::result::Result<&IjForeignType, IjRejection> {
    match &raw.type_ref {
        IjTypeRef::Resolved(ty) => Ok(ty),
        IjTypeRef::Unresolved { type_name, reason } => Err(IjRejection::InspectionFailed(format!(
            "type '{}' of parameter '{}' cannot be resolved: {}",
            type_name, raw.name, reason
        ))),
    }
}
