//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Zi.
//! The Zi project belongs to the Dunimd project team.

#[path = "../common/mod.rs"]
mod common;

use std::collections::BTreeMap;

use ijgate::{
    IjError, IjExecutionRequest, IjGateway, IjGatewayConfig, IjHostValue, IjImage, IjImageMetadata, IjPixelType,
    IjTable, IjTypeAdapterRegistry,
};

fn assert_clean(gateway: &IjGateway) {
    assert_eq!(gateway.live_object_count().unwrap(), 0);
}

#[test]
fn test_module_output_becomes_primary() {
    let gateway = common::gateway();
    let threshold = gateway.module("1.0", "threshold").unwrap();
    let image = IjImage::new(vec![2, 2], vec![10.0, 120.0, 200.0, 90.0], IjPixelType::UnsignedByte).unwrap();

    let result = gateway
        .execute(
            IjExecutionRequest::module(threshold)
                .with_input("image", image)
                .with_input("level", IjHostValue::Integer(100)),
        )
        .unwrap();

    let mask = result.image().unwrap();
    assert_eq!(mask.dims(), &[2, 2]);
    assert_eq!(mask.pixels(), &[0.0, 255.0, 255.0, 0.0]);
    assert_eq!(result.result_type, Some(IjPixelType::UnsignedByte));
    assert!(result.output("mask").is_some());
    assert!(result.table.is_none());
    assert_clean(&gateway);
}

#[test]
fn test_scalar_and_choice_outputs() {
    let gateway = common::gateway();
    let image = IjImage::new(vec![2, 1], vec![2.0, 4.0], IjPixelType::Float).unwrap();
    let result = gateway
        .execute(IjExecutionRequest::module(gateway.module("", "measure-mean").unwrap()).with_input("image", image))
        .unwrap();
    assert_eq!(result.primary, Some(IjHostValue::Double(3.0)));
    assert_eq!(result.result_type, None);

    let result = gateway
        .execute(
            IjExecutionRequest::module(gateway.module("", "pick-method").unwrap())
                .with_input("method", IjHostValue::Text("Huang".to_string())),
        )
        .unwrap();
    assert_eq!(result.output("used"), Some(&IjHostValue::Text("Huang".to_string())));
    assert_clean(&gateway);
}

#[test]
fn test_service_inputs_are_injected_and_optional_inputs_skipped() {
    let gateway = common::gateway();
    let add = gateway.module("", "add-constant").unwrap();
    let image = IjImage::new(vec![2], vec![1.0, 2.0], IjPixelType::Double).unwrap();

    let result = gateway
        .execute(IjExecutionRequest::module(add.clone()).with_input("image", image.clone()))
        .unwrap();
    assert_eq!(result.image().unwrap().pixels(), &[1.0, 2.0]);

    let result = gateway
        .execute(
            IjExecutionRequest::module(add)
                .with_input("image", image)
                .with_input("value", IjHostValue::Double(0.5)),
        )
        .unwrap();
    assert_eq!(result.image().unwrap().pixels(), &[1.5, 2.5]);
}

#[test]
fn test_invalid_requests_fail_before_staging() {
    let gateway = common::gateway();
    let threshold = gateway.module("", "threshold").unwrap();
    let image = common::image_2d(2, 2, IjPixelType::UnsignedByte);

    let missing = gateway
        .execute(IjExecutionRequest::module(threshold.clone()).with_input("image", image.clone()))
        .unwrap_err();
    assert!(matches!(missing, IjError::InvalidRequest { .. }));

    let unknown = gateway
        .execute(
            IjExecutionRequest::module(threshold.clone())
                .with_input("image", image.clone())
                .with_input("level", IjHostValue::Double(1.0))
                .with_input("radius", IjHostValue::Double(1.0)),
        )
        .unwrap_err();
    assert!(matches!(unknown, IjError::InvalidRequest { .. }));

    let choice = gateway
        .execute(
            IjExecutionRequest::module(gateway.module("", "pick-method").unwrap())
                .with_input("method", IjHostValue::Text("Li".to_string())),
        )
        .unwrap_err();
    assert!(matches!(choice, IjError::InvalidRequest { .. }));

    let empty_name = gateway
        .execute(IjExecutionRequest::script("").with_input("", image))
        .unwrap_err();
    assert!(matches!(empty_name, IjError::InvalidRequest { .. }));
    assert_clean(&gateway);
}

#[test]
fn test_unsupported_input_type_is_rejected() {
    let gateway = common::gateway();
    let threshold = gateway.module("", "threshold").unwrap();

    let err = gateway
        .execute(
            IjExecutionRequest::module(threshold)
                .with_input("image", IjHostValue::Table(IjTable::new()))
                .with_input("level", IjHostValue::Double(1.0)),
        )
        .unwrap_err();
    assert_eq!(err, IjError::unsupported_type("image", "table"));

    let bare = IjGateway::new(IjGatewayConfig::default(), IjTypeAdapterRegistry::new(), |services| {
        Ok(Box::new(common::sample_runtime(services)))
    })
    .unwrap();
    let err = bare
        .execute(IjExecutionRequest::script("invert").with_input("A", common::image_2d(2, 2, IjPixelType::UnsignedByte)))
        .unwrap_err();
    assert_eq!(err, IjError::unsupported_type("A", "image"));
    assert_clean(&bare);
}

#[test]
fn test_foreign_failure_is_reported_and_environment_recovers() {
    let gateway = common::gateway();
    let image = common::image_2d(3, 3, IjPixelType::UnsignedByte);

    let err = gateway
        .execute(IjExecutionRequest::module(gateway.module("", "always-fails").unwrap()).with_input("image", image.clone()))
        .unwrap_err();
    assert_eq!(err, IjError::execution("always-fails", "out of memory"));
    assert_clean(&gateway);

    let err = gateway
        .execute(IjExecutionRequest::script("duplicate B\nfail boom").with_input("A", image.clone()))
        .unwrap_err();
    assert_eq!(err, IjError::execution("<script>", "boom"));
    assert_clean(&gateway);

    let result = gateway
        .execute(IjExecutionRequest::script("invert").with_input("A", image.clone()))
        .unwrap();
    assert_eq!(result.image().unwrap().pixels()[0], 255.0 - image.pixels()[0]);
    assert_clean(&gateway);
}

#[test]
fn test_result_inherits_matched_input_shape_and_metadata() {
    let gateway = common::gateway();
    let metadata = IjImageMetadata {
        name: Some("cells".to_string()),
        axes: vec!["X".to_string(), "Y".to_string(), "Z".to_string()],
        calibration: vec![0.5, 0.5, 2.0],
        source: None,
    };
    let image = IjImage::filled(vec![2, 2, 3], 5.0, IjPixelType::UnsignedShort)
        .unwrap()
        .with_metadata(metadata.clone());

    let result = gateway
        .execute(IjExecutionRequest::script("select A\nadd 1").with_input("A", image))
        .unwrap();
    let out = result.image().unwrap();
    assert_eq!(out.dims(), &[2, 2, 3]);
    assert_eq!(out.metadata(), Some(&metadata));
    assert!(out.pixels().iter().all(|p| *p == 6.0));
    assert_eq!(result.result_type, Some(IjPixelType::UnsignedShort));
}

#[test]
fn test_matched_result_keeps_exact_dimension_count() {
    let gateway = common::gateway();
    let image = common::image_2d(2, 2, IjPixelType::UnsignedByte);
    let result = gateway
        .execute(IjExecutionRequest::script("stack 3").with_input("A", image.clone()))
        .unwrap();
    assert!(result.image().unwrap().same_content(&image));
}

#[test]
fn test_unmatched_result_is_converted_as_new_image() {
    let gateway = common::gateway();
    let image = common::image_2d(2, 2, IjPixelType::UnsignedByte)
        .with_metadata(IjImageMetadata { name: Some("input".to_string()), ..IjImageMetadata::default() });

    let result = gateway
        .execute(IjExecutionRequest::script("new C 3 2 16\nadd 7").with_input("A", image))
        .unwrap();
    let out = result.image().unwrap();
    assert_eq!(out.dims(), &[3, 2]);
    assert_eq!(out.pixel_type(), IjPixelType::UnsignedShort);
    assert!(out.metadata().is_none());
    assert!(out.pixels().iter().all(|p| *p == 7.0));
    assert_clean(&gateway);
}

#[test]
fn test_result_type_hint_overrides_intrinsic_type() {
    let gateway = common::gateway();
    let image = IjImage::new(vec![2, 1], vec![1.0, 2.0], IjPixelType::UnsignedByte).unwrap();
    let result = gateway
        .execute(
            IjExecutionRequest::script("multiply 0.5")
                .with_input("A", image)
                .with_result_type(IjPixelType::Float),
        )
        .unwrap();
    let out = result.image().unwrap();
    assert_eq!(out.pixel_type(), IjPixelType::Float);
    assert_eq!(out.pixels(), &[0.5, 1.0]);
    assert_eq!(result.result_type, Some(IjPixelType::Float));
}

#[test]
fn test_measurements_are_returned_and_reset() {
    let gateway = common::gateway();
    let image = IjImage::new(vec![2, 1], vec![2.0, 6.0], IjPixelType::UnsignedByte).unwrap();

    let result = gateway
        .execute(IjExecutionRequest::script("measure").with_input("A", image.clone()))
        .unwrap();
    let table = result.table.unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.value(0, "Mean"), Some(4.0));

    let result = gateway
        .execute(IjExecutionRequest::script("set-result Area 9").with_input("A", image))
        .unwrap();
    let table = result.table.unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.value(0, "Area"), Some(9.0));
}

#[test]
fn test_closed_result_yields_no_primary() {
    let gateway = common::gateway();
    let result = gateway
        .run_script(
            "close",
            BTreeMap::from([(
                "A".to_string(),
                IjHostValue::Image(common::image_2d(2, 2, IjPixelType::UnsignedByte)),
            )]),
        )
        .unwrap();
    assert!(result.primary.is_none());
    assert_clean(&gateway);
}

#[test]
fn test_primitive_script_inputs_are_staged() {
    let gateway = common::gateway();
    let result = gateway
        .execute(IjExecutionRequest::script("").with_input("count", IjHostValue::Integer(3)))
        .unwrap();
    assert!(result.primary.is_none());
    assert_clean(&gateway);
}

#[test]
fn test_teardown_failures_are_warnings() {
    let gateway = common::gateway_with_locked(&["B"]);
    let image = common::image_2d(2, 2, IjPixelType::UnsignedByte);

    let result = gateway
        .execute(IjExecutionRequest::script("duplicate B\ninvert").with_input("A", image.clone()))
        .unwrap();
    assert!(result.image().is_some());

    let warnings = gateway.take_teardown_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].title, "B");
    assert_eq!(warnings[0].unit, "<script>");
    assert_eq!(gateway.live_object_count().unwrap(), 1);
    assert!(gateway.take_teardown_warnings().is_empty());

    let result = gateway
        .execute(IjExecutionRequest::script("select A\ninvert").with_input("A", image))
        .unwrap();
    assert!(result.image().is_some());
    assert_eq!(gateway.live_object_count().unwrap(), 1);
}

#[test]
fn test_staged_objects_removed_without_sweep() {
    let gateway = common::gateway_with(IjGatewayConfig::default().sweep_foreign_objects(false));
    let image = common::image_2d(2, 2, IjPixelType::UnsignedByte);

    gateway
        .execute(IjExecutionRequest::script("duplicate B").with_input("A", image.clone()))
        .unwrap();
    assert_eq!(gateway.live_object_count().unwrap(), 1);

    // Leftovers are swept before the next run stages anything.
    let result = gateway
        .execute(IjExecutionRequest::script("").with_input("A", image.clone()))
        .unwrap();
    assert!(result.image().unwrap().same_content(&image));
    assert_eq!(gateway.live_object_count().unwrap(), 0);
}

#[test]
fn test_unconvertible_result_is_an_execution_failure() {
    let gateway = common::gateway();
    let image = common::image_2d(2, 2, IjPixelType::UnsignedByte);

    let err = gateway
        .execute(IjExecutionRequest::script("new C 2 2 7").with_input("A", image.clone()))
        .unwrap_err();
    assert_eq!(err, IjError::execution("<script>", "output 'C': unsupported bit depth 7"));
    assert_clean(&gateway);

    let result = gateway
        .execute(
            IjExecutionRequest::script("new C 2 2 7")
                .with_input("A", image)
                .with_result_type(IjPixelType::Float),
        )
        .unwrap();
    assert_eq!(result.image().unwrap().pixel_type(), IjPixelType::Float);
}
