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

//! # Execution Gateway Module
//!
//! The gateway owns the single foreign runtime and runs units against it one
//! at a time.
//!
//! ## Execution Protocol
//!
//! 1. Convert every host input. Nothing touches the foreign environment
//!    before all inputs converted.
//! 2. Take the execution permit.
//! 3. Sweep objects left behind by an earlier run, then stage the converted
//!    inputs under their parameter names.
//! 4. Reset the shared results table and run the unit.
//! 5. Convert the produced object (or the declared outputs) back to host
//!    values. A produced image whose title matches a staged input keeps that
//!    input's dimensionality and metadata.
//! 6. Remove every staged object, then every other live object. This step
//!    runs on success, failure, timeout and panic.
//! 7. Release the permit.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::adapter::builtin::{convert_primitive, natural_foreign_type};
use crate::adapter::registry::{IjOutputHints, IjTypeAdapterRegistry};
use crate::config::{IjGatewayConfig, BATCH_MODE_PROPERTY, LOG_LEVEL_PROPERTY};
use crate::errors::{IjError, Result};
use crate::foreign::runtime::{IjForeignRuntime, IjObjectId, IjRunOutcome, IjRuntimeMode, IjServiceSet};
use crate::foreign::types::{IjForeignType, IjForeignValue};
use crate::gateway::gate::{IjExecutionGate, IjGateRefusal};
use crate::gateway::request::{IjExecutionRequest, IjExecutionResult, IjExecutionTarget};
use crate::module::binding::IjBindingPlan;
use crate::module::descriptor::{IjModuleDescriptor, IjParameterSupport};
use crate::module::registry::IjModuleRegistry;
use crate::value::{IjHostValue, IjImageMetadata};

/// A staged or leftover object that could not be removed after a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IjTeardownWarning {
    pub unit: String,
    pub object: IjObjectId,
    pub title: String,
    pub message: String,
}

impl fmt::Display for IjTeardownWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not remove '{}' ({}) after '{}': {}",
            self.title, self.object, self.unit, self.message
        )
    }
}

/// Converted input, ready to be staged.
#[derive(Debug)]
struct IjPreparedInput {
    name: String,
    value: IjForeignValue,
    ndim: Option<usize>,
    metadata: Option<IjImageMetadata>,
}

pub struct IjGateway {
    config: IjGatewayConfig,
    adapters: Arc<IjTypeAdapterRegistry>,
    registry: IjModuleRegistry,
    gate: IjExecutionGate,
    runtime: Mutex<Box<dyn IjForeignRuntime>>,
    warnings: Mutex<Vec<IjTeardownWarning>>,
}

impl fmt::Debug for IjGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IjGateway")
            .field("mode", &self.config.mode)
            .field("runtime_version", &self.registry.runtime_version())
            .field("units", &self.registry.len())
            .finish()
    }
}

impl IjGateway {
    /// Creates the foreign runtime through `factory` and runs discovery once.
    pub fn new<F>(config: IjGatewayConfig, adapters: IjTypeAdapterRegistry, factory: F) -> Result<Self>
    where
        F: FnOnce(&IjServiceSet) -> Result<Box<dyn IjForeignRuntime>>,
    {
        config.validate()?;
        let adapters = Arc::new(adapters);
        let services = IjServiceSet::for_mode(config.mode, adapters.service_types())
            .with_property(LOG_LEVEL_PROPERTY, config.foreign_log_level.as_str())
            .with_property(BATCH_MODE_PROPERTY, config.batch_mode.to_string());

        log::info!(
            "gateway.init.start: creating foreign runtime - mode={:?}, services={}",
            config.mode,
            services.services.len()
        );
        let runtime = factory(&services)?;
        let registry = IjModuleRegistry::discover(runtime.as_ref(), Arc::clone(&adapters))?;
        log::info!(
            "gateway.init.done: gateway ready - runtime_version={}, units={}, fingerprint={}",
            registry.runtime_version(),
            registry.len(),
            registry.fingerprint()
        );

        Ok(IjGateway {
            config,
            adapters,
            registry,
            gate: IjExecutionGate::new(),
            runtime: Mutex::new(runtime),
            warnings: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &IjGatewayConfig {
        &self.config
    }

    pub fn mode(&self) -> IjRuntimeMode {
        self.config.mode
    }

    pub fn registry(&self) -> &IjModuleRegistry {
        &self.registry
    }

    pub fn adapters(&self) -> &Arc<IjTypeAdapterRegistry> {
        &self.adapters
    }

    pub fn supported_units(&self) -> &[Arc<IjModuleDescriptor>] {
        self.registry.supported_units()
    }

    pub fn is_input_type_supported(&self, foreign_type: &IjForeignType) -> bool {
        self.registry.is_input_type_supported(foreign_type)
    }

    pub fn module(&self, version: &str, identity: &str) -> Result<Arc<IjModuleDescriptor>> {
        self.registry.module(version, identity)
    }

    pub fn binding_plan(&self, descriptor: &IjModuleDescriptor) -> IjBindingPlan {
        self.registry.binding_plan(descriptor)
    }

    /// True while an execution holds the foreign environment.
    pub fn is_busy(&self) -> bool {
        self.gate.is_held()
    }

    /// Teardown warnings collected since the last call.
    pub fn take_teardown_warnings(&self) -> Vec<IjTeardownWarning> {
        std::mem::take(&mut *self.warnings.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of objects currently live in the foreign environment. Takes the
    /// permit, so it waits for a running execution.
    pub fn live_object_count(&self) -> Result<usize> {
        let _permit = self
            .gate
            .acquire(None)
            .map_err(|_| IjError::EnvironmentBusy("live object count requested during an execution".to_string()))?;
        let runtime = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(runtime.live_objects().len())
    }

    /// Runs literal script text with the given named inputs.
    pub fn run_script(&self, code: &str, inputs: BTreeMap<String, IjHostValue>) -> Result<IjExecutionResult> {
        let mut request = IjExecutionRequest::script(code);
        request.inputs = inputs;
        self.execute(request)
    }

    pub fn execute(&self, request: IjExecutionRequest) -> Result<IjExecutionResult> {
        let unit = request.unit_name().to_string();
        let started = Instant::now();
        let budget = request.deadline.or_else(|| self.config.execution_timeout());
        // A budget past the representable range means no deadline.
        let deadline = budget.and_then(|budget| started.checked_add(budget));
        let timeout = || IjError::Timeout {
            unit: unit.clone(),
            deadline_ms: budget.map(|b| b.as_millis() as u64).unwrap_or_default(),
        };

        let prepared = self.prepare_inputs(&request)?;

        let _permit = self.gate.acquire(deadline).map_err(|refusal| match refusal {
            IjGateRefusal::Reentrant => IjError::EnvironmentBusy(format!(
                "'{}' was started while this thread already runs a unit",
                unit
            )),
            IjGateRefusal::TimedOut => timeout(),
        })?;
        log::info!(
            "gateway.execute.start: execution started - unit={}, inputs={}, waited_ms={}",
            unit,
            prepared.len(),
            started.elapsed().as_millis()
        );

        let mut runtime = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        let mut staging = IjStaging {
            runtime: &mut **runtime,
            unit: &unit,
            staged: Vec::new(),
            sweep: self.config.sweep_foreign_objects,
            warnings: &self.warnings,
        };
        staging.sweep_leftovers();

        let mut staged_ids = BTreeMap::new();
        for input in &prepared {
            let id = staging.stage(&input.name, input.value.clone())?;
            staged_ids.insert(input.name.clone(), id);
        }
        staging.runtime.reset_results();

        if expired(deadline) {
            return Err(timeout());
        }

        let outcome = match &request.target {
            IjExecutionTarget::Module(descriptor) => staging.runtime.run_module(descriptor.identity(), &staged_ids),
            IjExecutionTarget::Script { code, arguments } => staging.runtime.run_script(code, arguments),
        };
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!("gateway.execute.failed: foreign run raised - unit={}, error={}", unit, err);
                return Err(IjError::execution(unit.as_str(), foreign_message(err)));
            }
        };

        if expired(deadline) {
            log::warn!(
                "gateway.execute.timeout: run finished after its deadline - unit={}, elapsed_ms={}",
                unit,
                started.elapsed().as_millis()
            );
            return Err(timeout());
        }

        let result = self.harvest(&*staging.runtime, &request, &outcome, &prepared)?;
        drop(staging);

        log::info!(
            "gateway.execute.done: execution finished - unit={}, primary={}, outputs={}, elapsed_ms={}",
            unit,
            result.primary.is_some(),
            result.outputs.len(),
            started.elapsed().as_millis()
        );
        Ok(result)
    }

    fn prepare_inputs(&self, request: &IjExecutionRequest) -> Result<Vec<IjPreparedInput>> {
        if let Some(name) = request.inputs.keys().find(|name| name.trim().is_empty()) {
            return Err(IjError::invalid_request(format!("input name '{}' is empty", name)));
        }
        match &request.target {
            IjExecutionTarget::Module(descriptor) => self.prepare_module_inputs(descriptor, &request.inputs),
            IjExecutionTarget::Script { .. } => request
                .inputs
                .iter()
                .map(|(name, value)| self.prepare_script_input(name, value))
                .collect(),
        }
    }

    fn prepare_module_inputs(
        &self,
        descriptor: &IjModuleDescriptor,
        inputs: &BTreeMap<String, IjHostValue>,
    ) -> Result<Vec<IjPreparedInput>> {
        if let Some(name) = inputs.keys().find(|name| descriptor.input(name).is_none()) {
            return Err(IjError::invalid_request(format!(
                "'{}' has no input named '{}'",
                descriptor.identity(),
                name
            )));
        }

        let mut prepared = Vec::with_capacity(inputs.len());
        for parameter in descriptor.inputs() {
            let name = parameter.name();
            let ty = parameter.foreign_type();
            if parameter.support() == IjParameterSupport::Service {
                continue;
            }
            let value = match inputs.get(name) {
                Some(value) => value,
                None if parameter.required() => {
                    return Err(IjError::invalid_request(format!(
                        "required input '{}' of '{}' is missing",
                        name,
                        descriptor.identity()
                    )))
                }
                None => continue,
            };

            let foreign = match parameter.support() {
                IjParameterSupport::Primitive if value.host_type().is_primitive_representable() => {
                    convert_primitive(value, ty).map_err(|_| IjError::unsupported_type(name, value.host_type().as_str()))?
                }
                IjParameterSupport::Primitive | IjParameterSupport::Adapted => {
                    let adapter = self
                        .adapters
                        .find_input_adapter(ty)
                        .filter(|adapter| adapter.host_type == value.host_type())
                        .ok_or_else(|| IjError::unsupported_type(name, value.host_type().as_str()))?;
                    (adapter.convert)(value, ty)?
                }
                IjParameterSupport::MultipleChoice => {
                    let choices = self.registry.choices(ty).unwrap_or_default();
                    match value {
                        IjHostValue::Text(choice) if choices.iter().any(|c| c == choice) => {
                            IjForeignValue::Choice(choice.clone())
                        }
                        _ => {
                            return Err(IjError::invalid_request(format!(
                                "input '{}' must be one of [{}]",
                                name,
                                choices.join(", ")
                            )))
                        }
                    }
                }
                IjParameterSupport::Service => continue,
            };
            prepared.push(prepared_input(name, value, foreign));
        }
        Ok(prepared)
    }

    fn prepare_script_input(&self, name: &str, value: &IjHostValue) -> Result<IjPreparedInput> {
        let host_type = value.host_type();
        let foreign = match natural_foreign_type(host_type) {
            Some(ty) => convert_primitive(value, &ty)?,
            None => {
                let (ty, adapter) = self
                    .adapters
                    .find_input_adapter_for_host(host_type)
                    .ok_or_else(|| IjError::unsupported_type(name, host_type.as_str()))?;
                (adapter.convert)(value, ty)?
            }
        };
        Ok(prepared_input(name, value, foreign))
    }

    fn harvest(
        &self,
        runtime: &dyn IjForeignRuntime,
        request: &IjExecutionRequest,
        outcome: &IjRunOutcome,
        prepared: &[IjPreparedInput],
    ) -> Result<IjExecutionResult> {
        let results = runtime.results();
        let mut result = IjExecutionResult {
            table: if results.is_empty() { None } else { Some(results) },
            ..IjExecutionResult::default()
        };

        if let Some(id) = outcome.produced {
            let object = runtime.object(id).ok_or_else(|| {
                IjError::execution(request.unit_name(), format!("produced object {} is no longer live", id))
            })?;
            let origin = prepared.iter().find(|input| input.name == object.title);
            let hints = IjOutputHints {
                ndim: origin.and_then(|input| input.ndim),
                pixel_type: request.result_type,
            };
            log::debug!(
                "gateway.execute.result: produced object resolved - unit={}, title={}, matched_input={}",
                request.unit_name(),
                object.title,
                origin.is_some()
            );
            let mut primary = self.convert_output(request.unit_name(), &object.title, &object.value, &hints)?;
            if let (Some(input), IjHostValue::Image(image)) = (origin, &mut primary) {
                image.set_metadata(input.metadata.clone());
            }
            result.result_type = request.result_type.or_else(|| object.value.intrinsic_pixel_type());
            result.primary = Some(primary);
        }

        let hints = IjOutputHints {
            ndim: None,
            pixel_type: request.result_type,
        };
        let declared: Vec<&str> = match &request.target {
            IjExecutionTarget::Module(descriptor) => descriptor.outputs().iter().map(|p| p.name()).collect(),
            IjExecutionTarget::Script { .. } => outcome.outputs.keys().map(|k| k.as_str()).collect(),
        };
        for name in declared {
            let Some(value) = outcome.outputs.get(name) else {
                log::debug!(
                    "gateway.execute.output: declared output not set by run - unit={}, output={}",
                    request.unit_name(),
                    name
                );
                continue;
            };
            let converted = self.convert_output(request.unit_name(), name, value, &hints)?;
            if result.primary.is_none() {
                result.result_type = request.result_type.or_else(|| value.intrinsic_pixel_type());
                result.primary = Some(converted.clone());
            }
            result.outputs.insert(name.to_string(), converted);
        }
        Ok(result)
    }

    /// Converts one produced value. A value the adapter cannot represent is
    /// a failure of the run, not of the caller's request.
    fn convert_output(
        &self,
        unit: &str,
        name: &str,
        value: &IjForeignValue,
        hints: &IjOutputHints,
    ) -> Result<IjHostValue> {
        let ty = value.foreign_type();
        let adapter = self
            .adapters
            .find_output_adapter(&ty)
            .ok_or_else(|| IjError::unsupported_type(name, ty.name()))?;
        (adapter.convert)(value, hints).map_err(|err| match err {
            IjError::Conversion(message) => {
                log::warn!(
                    "gateway.execute.harvest_failed: produced value not convertible - unit={}, output={}, error={}",
                    unit,
                    name,
                    message
                );
                IjError::execution(unit, format!("output '{}': {}", name, message))
            }
            other => other,
        })
    }
}

fn prepared_input(name: &str, host: &IjHostValue, value: IjForeignValue) -> IjPreparedInput {
    let image = host.as_image();
    IjPreparedInput {
        name: name.to_string(),
        value,
        ndim: image.map(|image| image.num_dimensions()),
        metadata: image.and_then(|image| image.metadata().cloned()),
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.map(|d| Instant::now() >= d).unwrap_or(false)
}

fn foreign_message(err: IjError) -> String {
    match err {
        IjError::Runtime(message) => message,
        other => other.to_string(),
    }
}

/// Staged objects of one execution. Dropping it removes them, whatever path
/// left the execution.
struct IjStaging<'a> {
    runtime: &'a mut dyn IjForeignRuntime,
    unit: &'a str,
    staged: Vec<IjObjectId>,
    sweep: bool,
    warnings: &'a Mutex<Vec<IjTeardownWarning>>,
}

impl IjStaging<'_> {
    fn stage(&mut self, name: &str, value: IjForeignValue) -> Result<IjObjectId> {
        let id = self.runtime.register_object(name, value)?;
        log::debug!("gateway.stage: input staged - unit={}, title={}, object={}", self.unit, name, id);
        self.staged.push(id);
        Ok(id)
    }

    fn sweep_leftovers(&mut self) {
        let leftovers = self.runtime.live_objects();
        if leftovers.is_empty() {
            return;
        }
        log::warn!(
            "gateway.stage.leftovers: foreign environment not clean before staging - unit={}, objects={}",
            self.unit,
            leftovers.len()
        );
        for id in leftovers {
            self.remove(id);
        }
    }

    fn remove(&mut self, id: IjObjectId) {
        let title = match self.runtime.object(id) {
            Some(object) => object.title.clone(),
            None => return,
        };
        if let Err(err) = self.runtime.remove_object(id) {
            let warning = IjTeardownWarning {
                unit: self.unit.to_string(),
                object: id,
                title,
                message: err.to_string(),
            };
            log::warn!(
                "gateway.teardown.warning: {} - unit={}, object={}",
                warning,
                self.unit,
                id
            );
            self.warnings
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(warning);
        }
    }
}

impl Drop for IjStaging<'_> {
    fn drop(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        for id in staged {
            self.remove(id);
        }
        if self.sweep {
            for id in self.runtime.live_objects() {
                self.remove(id);
            }
        }
        log::debug!(
            "gateway.teardown.done: foreign environment cleaned - unit={}, remaining={}",
            self.unit,
            self.runtime.live_objects().len()
        );
    }
}
