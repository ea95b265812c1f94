//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Zi.
//! The Zi project belongs to the Dunimd project team.

#[path = "../common/mod.rs"]
mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use ijgate::module::*;
use ijgate::{
    IjError, IjExecutionRequest, IjForeignType, IjForeignValue, IjGateway, IjGatewayConfig, IjHostType, IjHostValue,
    IjInProcessRuntime, IjInputAdapter, IjModuleCall, IjPixelType, IjRawParameter, IjRawUnitInfo, IjRuntimeMode,
    IjServiceSet,
};

fn headless_services() -> IjServiceSet {
    IjServiceSet::for_mode(IjRuntimeMode::Headless, &[])
}

fn discover() -> IjModuleRegistry {
    let runtime = common::sample_runtime(&headless_services());
    IjModuleRegistry::discover(&runtime, Arc::new(common::adapters())).unwrap()
}

fn identities(registry: &IjModuleRegistry) -> Vec<String> {
    registry
        .supported_units()
        .iter()
        .map(|d| d.identity().to_string())
        .collect()
}

#[test]
fn test_discovery_keeps_only_supported_units() {
    let registry = discover();
    assert_eq!(identities(&registry), common::SUPPORTED);

    let adapters = common::adapters();
    for descriptor in registry.supported_units() {
        assert!(descriptor.headless());
        assert!(!descriptor.dynamic());
        assert!(descriptor.parameter_count() > 0);
        for input in descriptor.inputs() {
            assert!(registry.is_input_type_supported(input.foreign_type()));
        }
        for output in descriptor.outputs() {
            assert!(adapters.supports_output(output.foreign_type()));
        }
    }
}

#[test]
fn test_rejections_carry_reasons() {
    let registry = discover();
    let reasons: BTreeMap<&str, &IjRejection> = registry
        .rejections()
        .iter()
        .map(|(identity, reason)| (identity.as_str(), reason))
        .collect();

    assert_eq!(reasons["paint-tool"], &IjRejection::NotHeadless);
    assert_eq!(reasons["dynamic-filter"], &IjRejection::Dynamic);
    assert!(matches!(reasons["broken-class"], IjRejection::DynamicUnknown(_)));
    assert_eq!(
        reasons["roi-manager"],
        &IjRejection::UnsupportedInput {
            parameter: "roi".to_string(),
            type_name: "roi".to_string(),
        }
    );
    assert!(matches!(reasons["overlay"], IjRejection::UnsupportedOutput { .. }));
    assert_eq!(reasons["about"], &IjRejection::NoParameters);
    assert!(matches!(reasons["missing-plugin"], IjRejection::InspectionFailed(_)));
    assert!(reasons["missing-plugin"].is_failure());
    assert!(!reasons["paint-tool"].is_failure());
    assert_eq!(reasons.len(), 7);
}

#[test]
fn test_duplicate_identity_keeps_first() {
    let registry = discover();
    let threshold = registry.module("any", "threshold").unwrap();
    assert_eq!(threshold.title(), "Threshold");
    assert_eq!(threshold.inputs().len(), 2);
}

#[test]
fn test_discovery_is_idempotent() {
    let runtime = common::sample_runtime(&headless_services());
    let adapters = Arc::new(common::adapters());
    let first = IjModuleRegistry::discover(&runtime, Arc::clone(&adapters)).unwrap();
    let second = IjModuleRegistry::discover(&runtime, adapters).unwrap();

    assert_eq!(identities(&first), identities(&second));
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.fingerprint().len(), 64);
    assert_eq!(first.runtime_version(), common::RUNTIME_VERSION);
}

#[test]
fn test_fingerprint_changes_with_unit_set() {
    let mut runtime = common::sample_runtime(&headless_services());
    let before = IjModuleRegistry::discover(&runtime, Arc::new(common::adapters())).unwrap();
    runtime.register_unit(
        IjRawUnitInfo::command("gamma", "Gamma").input(IjRawParameter::new("gamma", IjForeignType::double())),
        None,
    );
    let after = IjModuleRegistry::discover(&runtime, Arc::new(common::adapters())).unwrap();
    assert_ne!(before.fingerprint(), after.fingerprint());
    assert!(after.contains("gamma"));
}

#[test]
fn test_module_resolution_by_identity() {
    let registry = discover();
    let descriptor = registry.module("1.0.0", "measure-mean").unwrap();
    assert_eq!(descriptor.identity(), "measure-mean");
    assert_eq!(descriptor.outputs()[0].name(), "mean");

    let err = registry.module("1.0.0", "paint-tool").unwrap_err();
    assert_eq!(
        err,
        IjError::UnitUnavailable {
            identity: "paint-tool".to_string(),
            version: "1.0.0".to_string(),
        }
    );
    assert!(err.is_configuration_failure());
}

#[test]
fn test_input_type_support_query() {
    let registry = discover();
    assert!(registry.is_input_type_supported(&IjForeignType::dataset()));
    assert!(registry.is_input_type_supported(&IjForeignType::double()));
    assert!(registry.is_input_type_supported(&IjForeignType::new(common::SERVICE_TYPE)));
    assert!(registry.is_input_type_supported(&IjForeignType::new(common::METHOD_TYPE)));
    assert!(!registry.is_input_type_supported(&IjForeignType::new("roi")));
    assert_eq!(
        registry.choices(&IjForeignType::new(common::METHOD_TYPE)).unwrap(),
        &["Otsu".to_string(), "Huang".to_string()]
    );
}

#[test]
fn test_parameter_support_classification() {
    let registry = discover();
    let add = registry.module("", "add-constant").unwrap();
    assert_eq!(add.input("ops").unwrap().support(), IjParameterSupport::Service);
    assert_eq!(add.input("image").unwrap().support(), IjParameterSupport::Adapted);
    assert_eq!(add.input("value").unwrap().support(), IjParameterSupport::Primitive);
    assert!(!add.input("value").unwrap().required());

    let pick = registry.module("", "pick-method").unwrap();
    assert_eq!(pick.input("method").unwrap().support(), IjParameterSupport::MultipleChoice);
}

#[test]
fn test_binding_plan() {
    let registry = discover();
    let plan = registry.binding_plan(&registry.module("", "add-constant").unwrap());
    assert_eq!(plan.identity(), "add-constant");
    assert_eq!(plan.binding("ops"), Some(&IjBinding::Injected));
    assert_eq!(plan.binding("image"), Some(&IjBinding::Column));
    assert_eq!(plan.binding("value"), Some(&IjBinding::Dialog));
    assert_eq!(plan.column_parameters(), vec!["image"]);

    let plan = registry.binding_plan(&registry.module("", "pick-method").unwrap());
    assert_eq!(
        plan.binding("method"),
        Some(&IjBinding::Choice(vec!["Otsu".to_string(), "Huang".to_string()]))
    );
}

fn text_to_roi(value: &IjHostValue, _ty: &IjForeignType) -> ijgate::Result<IjForeignValue> {
    match value {
        IjHostValue::Text(text) => Ok(IjForeignValue::Text(text.clone())),
        _ => Err(IjError::conversion("expected roi text")),
    }
}

#[test]
fn test_dialog_capable_adapter_allows_dialog_binding() {
    let mut adapters = common::adapters();
    adapters.register_input_adapter(
        IjForeignType::new("roi"),
        IjInputAdapter::new("text-to-roi", IjHostType::Text, text_to_roi).dialog_capable(),
    );
    let runtime = common::sample_runtime(&headless_services());
    let registry = IjModuleRegistry::discover(&runtime, Arc::new(adapters)).unwrap();

    let plan = registry.binding_plan(&registry.module("", "roi-manager").unwrap());
    assert_eq!(plan.binding("roi"), Some(&IjBinding::DialogOrColumn));
    assert_eq!(plan.column_parameters(), vec!["roi"]);

    let plan = registry.binding_plan(&registry.module("", "threshold").unwrap());
    assert_eq!(plan.binding("image"), Some(&IjBinding::Column));
}

#[test]
fn test_inspect_single_candidate() {
    let runtime = common::sample_runtime(&headless_services());
    let adapters = common::adapters();
    let mut choices = BTreeMap::new();

    let candidate = IjRawUnitInfo::command("blur", "Blur")
        .input(IjRawParameter::new("image", IjForeignType::dataset()))
        .input(IjRawParameter::new("sigma", IjForeignType::float()))
        .output(IjRawParameter::new("result", IjForeignType::dataset()));
    match IjModuleRegistry::inspect(&candidate, &runtime, &adapters, &mut choices) {
        IjDiscoveryOutcome::Supported(descriptor) => {
            assert_eq!(descriptor.identity(), "blur");
            assert_eq!(descriptor.inputs().len(), 2);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let interactive = candidate.clone().headless(false);
    let outcome = IjModuleRegistry::inspect(&interactive, &runtime, &adapters, &mut choices);
    assert!(!outcome.is_supported());
    assert_eq!(
        outcome,
        IjDiscoveryOutcome::Rejected {
            identity: "blur".to_string(),
            reason: IjRejection::NotHeadless,
        }
    );
    assert!(choices.is_empty());
}

#[test]
fn test_gateway_passes_service_set_to_factory() {
    let mut seen = None;
    let gateway = IjGateway::new(
        IjGatewayConfig::default().mode(IjRuntimeMode::Interactive).foreign_log_level("warn"),
        common::adapters(),
        |services| {
            seen = Some(services.clone());
            Ok(Box::new(common::sample_runtime(services)))
        },
    )
    .unwrap();

    let services = seen.unwrap();
    assert_eq!(services.services[0], common::SERVICE_TYPE);
    assert!(services.contains("module"));
    assert!(services.contains("menu"));
    assert_eq!(services.properties.get("log-level").map(String::as_str), Some("warn"));
    assert_eq!(services.properties.get("batch-mode").map(String::as_str), Some("true"));
    assert_eq!(gateway.supported_units().len(), common::SUPPORTED.len());
}

#[test]
fn test_discovery_failure_is_reported() {
    let err = IjGateway::new(IjGatewayConfig::default(), common::adapters(), |_| {
        Err(IjError::runtime("runtime failed to start"))
    })
    .unwrap_err();
    assert_eq!(err, IjError::runtime("runtime failed to start"));
}

fn copy_image(call: &IjModuleCall) -> ijgate::Result<BTreeMap<String, IjForeignValue>> {
    let image = call
        .inputs
        .get("image")
        .cloned()
        .ok_or_else(|| IjError::runtime("missing image input"))?;
    Ok(BTreeMap::from([("result".to_string(), image)]))
}

#[test]
fn test_runtime_service_inputs_are_injected() {
    let gateway = IjGateway::new(
        IjGatewayConfig::default().mode(IjRuntimeMode::Interactive),
        common::adapters(),
        |services| {
            let mut runtime = IjInProcessRuntime::with_services(common::RUNTIME_VERSION, services.clone());
            runtime.register_unit(
                IjRawUnitInfo::command("with-ui", "With UI")
                    .input(IjRawParameter::new("ui", IjForeignType::new("ui")))
                    .input(IjRawParameter::new("image", IjForeignType::dataset()))
                    .output(IjRawParameter::new("result", IjForeignType::dataset())),
                Some(copy_image),
            );
            Ok(Box::new(runtime))
        },
    )
    .unwrap();

    assert!(gateway.registry().rejections().is_empty());
    let unit = gateway.module("", "with-ui").unwrap();
    assert_eq!(unit.input("ui").unwrap().support(), IjParameterSupport::Service);
    assert_eq!(unit.input("image").unwrap().support(), IjParameterSupport::Adapted);
    assert!(gateway.is_input_type_supported(&IjForeignType::new("menu")));
    assert_eq!(gateway.binding_plan(&unit).binding("ui"), Some(&IjBinding::Injected));

    let image = common::image_2d(2, 2, IjPixelType::UnsignedByte);
    let result = gateway
        .execute(IjExecutionRequest::module(unit).with_input("image", image.clone()))
        .unwrap();
    assert!(result.image().unwrap().same_content(&image));
}
