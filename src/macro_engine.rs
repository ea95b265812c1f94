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

//! # Macro Engine Module
//!
//! Runs literal macro text against named host images through the gateway.
//! Each image is staged under its name, so the macro can select it by title.
//! The result is the image current when the macro ends; when its title
//! matches a staged image it keeps that image's dimensionality and metadata.

use std::collections::BTreeMap;

use crate::errors::Result;
use crate::gateway::engine::IjGateway;
use crate::gateway::request::IjExecutionRequest;
use crate::value::{IjHostValue, IjImage, IjPixelType, IjTable};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IjMacro {
    code: String,
    arguments: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IjMacroOutput {
    pub primary: Option<IjHostValue>,
    /// Measurements written by the macro.
    pub table: Option<IjTable>,
    pub result_type: Option<IjPixelType>,
}

impl IjMacroOutput {
    pub fn image(&self) -> Option<&IjImage> {
        self.primary.as_ref().and_then(|v| v.as_image())
    }

    pub fn into_image(self) -> Option<IjImage> {
        self.primary.and_then(|v| v.into_image())
    }
}

impl IjMacro {
    #[allow(non_snake_case)]
    pub fn new(code: impl Into<String>) -> Self {
        IjMacro {
            code: code.into(),
            arguments: String::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = arguments.into();
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Runs the macro with arbitrary named inputs.
    pub fn run(
        &self,
        gateway: &IjGateway,
        inputs: BTreeMap<String, IjHostValue>,
        desired: Option<IjPixelType>,
    ) -> Result<IjMacroOutput> {
        let mut request = IjExecutionRequest::script(self.code.as_str()).with_arguments(self.arguments.as_str());
        request.inputs = inputs;
        request.result_type = desired;

        log::debug!(
            "macro.run: running macro - inputs={}, lines={}",
            request.inputs.len(),
            self.code.lines().count()
        );
        let result = gateway.execute(request)?;
        Ok(IjMacroOutput {
            primary: result.primary,
            table: result.table,
            result_type: result.result_type,
        })
    }

    /// Runs the macro on one image, staged under the configured default name.
    pub fn run_on(&self, gateway: &IjGateway, image: IjImage, desired: Option<IjPixelType>) -> Result<IjMacroOutput> {
        let name = gateway.config().default_input_name.clone();
        self.run_on_images(gateway, vec![(name, image)], desired)
    }

    pub fn run_on_images(
        &self,
        gateway: &IjGateway,
        images: Vec<(String, IjImage)>,
        desired: Option<IjPixelType>,
    ) -> Result<IjMacroOutput> {
        let inputs = images
            .into_iter()
            .map(|(name, image)| (name, IjHostValue::Image(image)))
            .collect();
        self.run(gateway, inputs, desired)
    }
}
