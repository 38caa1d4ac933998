//! Model to measurement through the public entry point.

use std::f64::consts::{FRAC_PI_2, PI};

use qlower::{
    Alloc, AllocQubits, Arg, BackendClass, CompileError, ErrorKind, Expr, InterfaceState, Model,
    ParameterValues, PauliExpr, RuntimeError, Support, Target, Value,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn feature_map() -> Model {
    Model::builder(AllocQubits::new(2).with_option("initial_state", json!("10")))
        .input("x", Alloc::input(1))
        .assign("%0", Expr::call("mul", [Arg::Constant(1.57), Arg::load("x")]))
        .assign("%1", Expr::call("sin", [Arg::load("%0")]))
        .quantum("rx", Support::target_only(vec![0]), vec![Arg::load("%1")])
        .quantum("not", Support::new(vec![1], vec![0]).unwrap(), vec![])
        .build()
        .unwrap()
}

fn x(value: f64) -> ParameterValues {
    [("x".to_string(), Value::Scalar(value))].into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_digital_round_trip() {
    let interface = qlower::compile(&feature_map(), "digital", None).unwrap();
    assert_eq!(interface.engine_name(), "statevector");

    let histogram = interface.sample(&x(FRAC_PI_2), 2000, None).unwrap();
    assert_eq!(histogram.total(), 2000);
    assert_eq!(histogram.most_frequent().map(|(k, _)| k), Some("11"));
    assert_eq!(interface.state(), InterfaceState::Executed);
}

#[test]
fn test_compile_is_deterministic() {
    let model = feature_map();
    let a = qlower::compile(&model, "digital", None).unwrap();
    let b = qlower::compile(&model, "digital", None).unwrap();
    assert_eq!(a.program(), b.program());
    assert_eq!(a.info().inputs, vec!["x".to_string()]);
}

#[test]
fn test_unknown_backend_and_device() {
    let err = qlower::compile(&feature_map(), "photonic", None).unwrap_err();
    assert!(matches!(err, CompileError::UnknownBackend(ref b) if b == "photonic"));

    let err = qlower::compile(&feature_map(), "analog", Some("nowhere")).unwrap_err();
    assert!(matches!(err, CompileError::UnknownDevice { .. }));
}

#[test]
fn test_analog_opcode_rejected_on_digital() {
    let model = Model::builder(AllocQubits::new(1))
        .quantum(
            "dyn_pulse",
            Support::all(),
            vec![
                Arg::Constant(0.5),
                Arg::Constant(1.0),
                Arg::Constant(0.0),
                Arg::Constant(0.0),
            ],
        )
        .build()
        .unwrap();
    let err = qlower::compile(&model, "digital", None).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedOpcode { ref opcode, .. } if opcode == "dyn_pulse"));
}

#[test]
fn test_unknown_parameter_rejected() {
    let mut interface = qlower::compile(&feature_map(), "digital", None).unwrap();
    let err = interface
        .set_parameters([("y".to_string(), Value::Scalar(1.0))].into())
        .unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownParameter(ref names) if names == &["y"]));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(interface.fixed_parameters().is_empty());

    interface.set_parameters(x(FRAC_PI_2)).unwrap();
    assert_eq!(interface.state(), InterfaceState::Parameterized);
    let histogram = interface.sample(&ParameterValues::new(), 500, None).unwrap();
    assert_eq!(histogram.total(), 500);
}

#[test]
fn test_expectation_needs_observable() {
    let mut interface = qlower::compile(&feature_map(), "digital", None).unwrap();
    let err = interface.expectation(&x(0.0), None, None).unwrap_err();
    assert!(matches!(err, RuntimeError::ObservableRequired));

    // x = 0 leaves "10" untouched before the CNOT flips qubit 1.
    interface.set_observable(Box::new("Z0 + Z1".parse::<PauliExpr>().unwrap()));
    let value = interface.expectation(&x(0.0), None, None).unwrap();
    assert!((value.as_scalar().unwrap() + 2.0).abs() < 1e-9);
}

#[test]
fn test_expectations_over_several_observables() {
    let interface = qlower::compile(&feature_map(), "digital", None).unwrap();
    let sum: PauliExpr = "Z0 + Z1".parse().unwrap();
    let z0 = PauliExpr::z(0);
    let zz: PauliExpr = "Z0*Z1".parse().unwrap();

    let value = interface
        .expectations(&x(0.0), &[&sum, &z0, &zz], None)
        .unwrap();
    assert!(value.approx_eq(&Value::Array(vec![-2.0, -1.0, 1.0]), 1e-9));
}

#[test]
fn test_array_for_scalar_input_is_rejected() {
    let interface = qlower::compile(&feature_map(), "digital", None).unwrap();
    let inputs: ParameterValues = [("x".to_string(), Value::Array(vec![0.0, PI]))].into();
    let err = interface.run(&inputs, None).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Compile(CompileError::InputShapeMismatch { expected: 1, got: 2, .. })
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(interface.state(), InterfaceState::Compiled);
}

#[test]
fn test_info_reports_engine_limits() {
    let digital = qlower::compile(&feature_map(), "digital", None).unwrap();
    assert_eq!(digital.info().engine_max_qubits, Some(qlower::DEFAULT_MAX_QUBITS));

    let model = Model::builder(AllocQubits::new(1)).build().unwrap();
    let analog = qlower::compile(&model, "analog", Some("fresnel1")).unwrap();
    assert_eq!(analog.info().engine_max_qubits, Some(qlower::DEFAULT_MAX_ATOMS));
}

#[test]
fn test_qpu_target_not_implemented() {
    let mut interface = qlower::compile(&feature_map(), "digital", None).unwrap();
    interface.set_target(Target::Qpu);
    let err = interface.run(&x(0.0), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
}

#[test]
fn test_analog_pi_pulse() {
    let model = Model::builder(AllocQubits::new(1))
        .quantum("rx", Support::all(), vec![Arg::Constant(PI)])
        .build()
        .unwrap();
    for device in [None, Some("fresnel1")] {
        let interface = qlower::compile(&model, "analog", device).unwrap();
        assert_eq!(interface.engine_name(), "pulse");
        let state = interface.run(&ParameterValues::new(), None).unwrap();
        assert_eq!(state.most_likely().0, "1");
    }
}

#[test]
fn test_engine_for_class() {
    assert_eq!(qlower::engine_for(BackendClass::Digital).name(), "statevector");
    assert_eq!(qlower::engine_for(BackendClass::Analog).name(), "pulse");
}
