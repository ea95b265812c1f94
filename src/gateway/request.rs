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

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::module::descriptor::IjModuleDescriptor;
use crate::value::{IjHostValue, IjImage, IjPixelType, IjTable};

/// What a request runs.
#[derive(Clone, Debug)]
pub enum IjExecutionTarget {
    Module(Arc<IjModuleDescriptor>),
    Script { code: String, arguments: String },
}

#[derive(Clone, Debug)]
pub struct IjExecutionRequest {
    pub target: IjExecutionTarget,
    /// Host values by parameter name. For scripts the name is also the title
    /// the value is staged under.
    pub inputs: BTreeMap<String, IjHostValue>,
    /// Desired pixel type of an image result.
    pub result_type: Option<IjPixelType>,
    /// Time budget measured from the call to `execute`.
    pub deadline: Option<Duration>,
}

impl IjExecutionRequest {
    pub fn module(descriptor: Arc<IjModuleDescriptor>) -> Self {
        IjExecutionRequest {
            target: IjExecutionTarget::Module(descriptor),
            inputs: BTreeMap::new(),
            result_type: None,
            deadline: None,
        }
    }

    pub fn script(code: impl Into<String>) -> Self {
        IjExecutionRequest {
            target: IjExecutionTarget::Script {
                code: code.into(),
                arguments: String::new(),
            },
            inputs: BTreeMap::new(),
            result_type: None,
            deadline: None,
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<IjHostValue>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    pub fn with_result_type(mut self, pixel_type: IjPixelType) -> Self {
        self.result_type = Some(pixel_type);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Argument string handed to a script. Ignored for modules.
    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        if let IjExecutionTarget::Script { arguments: args, .. } = &mut self.target {
            *args = arguments.into();
        }
        self
    }

    /// Name used in logs and errors.
    pub fn unit_name(&self) -> &str {
        match &self.target {
            IjExecutionTarget::Module(descriptor) => descriptor.identity(),
            IjExecutionTarget::Script { .. } => "<script>",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IjExecutionResult {
    /// The produced object, or the first declared output of a module.
    pub primary: Option<IjHostValue>,
    /// Declared module outputs by name.
    pub outputs: BTreeMap<String, IjHostValue>,
    /// Measurements the run wrote to the shared results table.
    pub table: Option<IjTable>,
    pub result_type: Option<IjPixelType>,
}

impl IjExecutionResult {
    pub fn image(&self) -> Option<&IjImage> {
        self.primary.as_ref().and_then(|v| v.as_image())
    }

    pub fn output(&self, name: &str) -> Option<&IjHostValue> {
        self.outputs.get(name)
    }
}
