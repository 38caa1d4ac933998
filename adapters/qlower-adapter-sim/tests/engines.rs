//! Engine behaviour on compiled programs.

use std::f64::consts::{FRAC_PI_2, PI};

use proptest::prelude::*;
use qlower_adapter_sim::{PauliExpr, PulseEngine, StatevectorEngine};
use qlower_compile::{
    Circuit, CompileError, CompiledArtifact, GateOp, GateParam, NativeGate, NativeProgram,
    NativeRegister, QubitRegister, resolve,
};
use qlower_ir::{Alloc, AllocQubits, Arg, Expr, Model, ParameterValues, Support, Value};
use qlower_runtime::{Engine, EngineError, QuantumState};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `%0 = mul(1.57, x); %1 = sin(%0); RX(0, %1); NOT(1 | 0)` starting from "10".
fn feature_map_model() -> Model {
    Model::builder(AllocQubits::new(2).with_option("initial_state", json!("10")))
        .input("x", Alloc::input(1))
        .assign("%0", Expr::call("mul", [Arg::Constant(1.57), Arg::load("x")]))
        .assign("%1", Expr::call("sin", [Arg::load("%0")]))
        .quantum("rx", Support::target_only(vec![0]), vec![Arg::load("%1")])
        .quantum("not", Support::new(vec![1], vec![0]).unwrap(), vec![])
        .build()
        .unwrap()
}

fn evaluate(artifact: &CompiledArtifact, inputs: &[(&str, f64)]) -> ParameterValues {
    let inputs: ParameterValues = inputs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::Scalar(*v)))
        .collect();
    artifact
        .embedding()
        .evaluate(&ParameterValues::new(), &inputs)
        .unwrap()
}

fn probability(state: &QuantumState, bitstring: &str) -> f64 {
    state.amplitude(bitstring).unwrap().norm_sqr()
}

fn analog(model: &Model) -> CompiledArtifact {
    resolve("analog", None).unwrap().compile(model).unwrap()
}

// ---------------------------------------------------------------------------
// Statevector engine
// ---------------------------------------------------------------------------

#[test]
fn test_feature_map_concentrates_on_11() {
    let artifact = resolve("digital", None)
        .unwrap()
        .compile(&feature_map_model())
        .unwrap();
    let values = evaluate(&artifact, &[("x", FRAC_PI_2)]);
    let engine = StatevectorEngine::new();

    let state = engine
        .run(artifact.program(), artifact.register(), None, &values)
        .unwrap();
    let angle = (1.57 * FRAC_PI_2).sin();
    assert!((probability(&state, "11") - (angle / 2.0).cos().powi(2)).abs() < 1e-9);
    assert_eq!(state.most_likely().0, "11");

    let hist = engine
        .sample(artifact.program(), artifact.register(), None, &values, 2000)
        .unwrap();
    assert_eq!(hist.total(), 2000);
    assert_eq!(hist.most_frequent().map(|(k, _)| k), Some("11"));
}

#[test]
fn test_digital_expectation() {
    let artifact = resolve("digital", None)
        .unwrap()
        .compile(&feature_map_model())
        .unwrap();
    let values = evaluate(&artifact, &[("x", FRAC_PI_2)]);
    let engine = StatevectorEngine::new();
    let angle = (1.57 * FRAC_PI_2).sin();

    let zz: PauliExpr = "Z0*Z1".parse().unwrap();
    let z0 = PauliExpr::z(0);
    let run = |obs: &PauliExpr| {
        engine
            .expectation(artifact.program(), artifact.register(), None, &values, obs)
            .unwrap()
            .as_scalar()
            .unwrap()
    };
    assert!((run(&zz) - 1.0).abs() < 1e-9);
    assert!((run(&z0) + angle.cos()).abs() < 1e-9);

    let bare = PauliExpr::Symbol("Z".into());
    assert!((run(&bare) - 1.0).abs() < 1e-9);
}

#[test]
fn test_digital_expectations_keep_order() {
    let artifact = resolve("digital", None)
        .unwrap()
        .compile(&feature_map_model())
        .unwrap();
    let values = evaluate(&artifact, &[("x", FRAC_PI_2)]);
    let engine = StatevectorEngine::new();
    let angle = (1.57 * FRAC_PI_2).sin();

    let zz: PauliExpr = "Z0*Z1".parse().unwrap();
    let z0 = PauliExpr::z(0);
    let n1 = PauliExpr::op("N", vec![1]);
    let value = engine
        .expectations(
            artifact.program(),
            artifact.register(),
            None,
            &values,
            &[&zz, &z0, &n1],
        )
        .unwrap();
    let Value::Array(items) = value else {
        panic!("expected one value per observable");
    };
    assert_eq!(items.len(), 3);
    assert!((items[0] - 1.0).abs() < 1e-9);
    assert!((items[1] + angle.cos()).abs() < 1e-9);
    assert!((items[2] - (1.0 + angle.cos()) / 2.0).abs() < 1e-9);

    let err = engine
        .expectations(
            artifact.program(),
            artifact.register(),
            None,
            &values,
            &[&zz, &PauliExpr::z(5)],
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedObservable(_)));
}

#[test]
fn test_analog_expectations_share_one_run() {
    let model = Model::builder(AllocQubits::new(1))
        .quantum("rx", Support::all(), vec![Arg::Constant(PI)])
        .build()
        .unwrap();
    let artifact = analog(&model);
    let values = evaluate(&artifact, &[]);
    let value = PulseEngine::new()
        .expectations(
            artifact.program(),
            artifact.register(),
            None,
            &values,
            &[&PauliExpr::z(0), &PauliExpr::op("N", vec![0])],
        )
        .unwrap();
    let Value::Array(items) = value else {
        panic!("expected one value per observable");
    };
    assert!((items[0] + 1.0).abs() < 1e-3);
    assert!((items[1] - 1.0).abs() < 1e-3);
}

#[test]
fn test_explicit_initial_state_overrides_register() {
    let artifact = resolve("digital", None)
        .unwrap()
        .compile(&feature_map_model())
        .unwrap();
    let values = evaluate(&artifact, &[("x", 0.0)]);
    let start = QuantumState::basis("00").unwrap();
    let state = StatevectorEngine::new()
        .run(artifact.program(), artifact.register(), Some(&start), &values)
        .unwrap();
    assert!((probability(&state, "00") - 1.0).abs() < 1e-9);

    let wrong = QuantumState::zero(3);
    assert!(matches!(
        StatevectorEngine::new().run(artifact.program(), artifact.register(), Some(&wrong), &values),
        Err(EngineError::StateDimensionMismatch { expected: 4, got: 8 })
    ));
}

#[test]
fn test_unbound_symbol_is_binding_error() {
    let artifact = resolve("digital", None)
        .unwrap()
        .compile(&feature_map_model())
        .unwrap();
    let err = StatevectorEngine::new()
        .run(
            artifact.program(),
            artifact.register(),
            None,
            &ParameterValues::new(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Binding(CompileError::UnboundVariable(name)) if name == "%1"
    ));
}

#[test]
fn test_qubit_limit() {
    let model = Model::builder(AllocQubits::new(4)).build().unwrap();
    let artifact = resolve("digital", None).unwrap().compile(&model).unwrap();
    let err = StatevectorEngine::with_max_qubits(3)
        .run(
            artifact.program(),
            artifact.register(),
            None,
            &ParameterValues::new(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::TooManyQubits { num_qubits: 4, max: 3 }));
}

#[test]
fn test_unknown_operator_in_observable() {
    let artifact = resolve("digital", None)
        .unwrap()
        .compile(&feature_map_model())
        .unwrap();
    let values = evaluate(&artifact, &[("x", 0.0)]);
    let err = StatevectorEngine::new()
        .expectation(
            artifact.program(),
            artifact.register(),
            None,
            &values,
            &PauliExpr::op("Q", vec![0]),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedObservable(_)));

    let err = StatevectorEngine::new()
        .expectation(
            artifact.program(),
            artifact.register(),
            None,
            &values,
            &PauliExpr::z(5),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedObservable(msg) if msg.contains("qubit 5")));
}

fn arb_circuit() -> impl Strategy<Value = Circuit> {
    let gates = prop::sample::select(vec![
        NativeGate::H,
        NativeGate::X,
        NativeGate::Y,
        NativeGate::S,
        NativeGate::T,
        NativeGate::Rx,
        NativeGate::Ry,
        NativeGate::Rz,
        NativeGate::Phase,
    ]);
    prop::collection::vec((gates, 0_usize..3, any::<bool>(), -PI..PI), 1..20).prop_map(|ops| {
        Circuit {
            num_qubits: 3,
            initial_state: None,
            ops: ops
                .into_iter()
                .map(|(gate, q, controlled, angle)| GateOp {
                    gate,
                    control: if controlled { vec![(q + 1) % 3] } else { vec![] },
                    target: vec![q],
                    param: gate.is_parametric().then_some(GateParam::Constant(angle)),
                })
                .collect(),
        }
    })
}

proptest! {
    #[test]
    fn prop_statevector_preserves_norm(circuit in arb_circuit()) {
        let register = NativeRegister::Qubits(QubitRegister { num_qubits: 3, initial_state: None });
        let state = StatevectorEngine::new()
            .run(&NativeProgram::Circuit(circuit), &register, None, &ParameterValues::new())
            .unwrap();
        prop_assert!(state.is_normalized());
    }
}

// ---------------------------------------------------------------------------
// Pulse engine
// ---------------------------------------------------------------------------

#[test]
fn test_single_atom_pi_pulse_excites() {
    let model = Model::builder(AllocQubits::new(1))
        .quantum("rx", Support::all(), vec![Arg::Constant(PI)])
        .build()
        .unwrap();
    let artifact = analog(&model);
    let values = evaluate(&artifact, &[]);
    let state = PulseEngine::new()
        .run(artifact.program(), artifact.register(), None, &values)
        .unwrap();
    assert!(state.is_normalized());
    assert!(probability(&state, "1") > 0.999);
}

#[test]
fn test_half_rotation_expectation() {
    let model = Model::builder(AllocQubits::new(1))
        .quantum("rx", Support::all(), vec![Arg::Constant(FRAC_PI_2)])
        .build()
        .unwrap();
    let artifact = analog(&model);
    let values = evaluate(&artifact, &[]);
    let z = PulseEngine::new()
        .expectation(
            artifact.program(),
            artifact.register(),
            None,
            &values,
            &PauliExpr::z(0),
        )
        .unwrap()
        .as_scalar()
        .unwrap();
    assert!(z.abs() < 1e-3);
}

#[test]
fn test_symbolic_pulse_needs_values() {
    let model = Model::builder(AllocQubits::new(1))
        .input("t", Alloc::input(1))
        .quantum(
            "dyn_pulse",
            Support::all(),
            vec![
                Arg::load("t"),
                Arg::Constant(1.0),
                Arg::Constant(0.0),
                Arg::Constant(0.0),
            ],
        )
        .build()
        .unwrap();
    let artifact = analog(&model);
    let err = PulseEngine::new()
        .run(
            artifact.program(),
            artifact.register(),
            None,
            &ParameterValues::new(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Binding(_)));

    // dyn_pulse(0.5) with unit amplitude is a π rotation.
    let values = evaluate(&artifact, &[("t", 0.5)]);
    let state = PulseEngine::new()
        .run(artifact.program(), artifact.register(), None, &values)
        .unwrap();
    assert!(probability(&state, "1") > 0.999);
}

#[test]
fn test_close_atoms_are_blockaded() {
    let model = Model::builder(AllocQubits::new(2))
        .quantum("rx", Support::all(), vec![Arg::Constant(PI)])
        .build()
        .unwrap();
    let artifact = analog(&model);
    let values = evaluate(&artifact, &[]);
    let state = PulseEngine::new()
        .run(artifact.program(), artifact.register(), None, &values)
        .unwrap();
    assert!(state.is_normalized());
    assert!(probability(&state, "11") < 0.25);
}

#[test]
fn test_engines_reject_foreign_programs() {
    let model = Model::builder(AllocQubits::new(1)).build().unwrap();
    let pulse = analog(&model);
    let digital = resolve("digital", None).unwrap().compile(&model).unwrap();
    let empty = ParameterValues::new();

    assert!(matches!(
        StatevectorEngine::new().run(pulse.program(), pulse.register(), None, &empty),
        Err(EngineError::UnsupportedProgram { program: "pulse", .. })
    ));
    assert!(matches!(
        PulseEngine::new().run(digital.program(), digital.register(), None, &empty),
        Err(EngineError::UnsupportedProgram { program: "circuit", .. })
    ));
}
