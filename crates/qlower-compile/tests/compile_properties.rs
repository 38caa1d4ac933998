//! End-to-end compilation behaviour across backends and devices.

use proptest::prelude::*;
use qlower_compile::{
    CompatibilityWarning, CompileError, ErrorKind, NativeProgram, NativeRegister, resolve,
};
use qlower_ir::{Alloc, AllocQubits, Arg, Expr, GridType, Model, ParameterValues, Support, Value};
use serde_json::json;

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Random digital model: a chain of assignments feeding rotations and CNOTs.
fn arb_digital_model() -> impl Strategy<Value = Model> {
    (2_usize..=4).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec((0_usize..3, 0..n, -3.0_f64..3.0), 1..=8),
        )
            .prop_map(|(n, ops)| {
                let mut builder = Model::builder(AllocQubits::new(n)).input("x", Alloc::input(1));
                for (i, (kind, q, c)) in ops.into_iter().enumerate() {
                    let var = format!("%{i}");
                    builder = builder.assign(
                        var.as_str(),
                        Expr::call("mul", [Arg::Constant(c), Arg::load("x")]),
                    );
                    builder = match kind {
                        0 => builder.quantum(
                            "rx",
                            Support::target_only(vec![q]),
                            vec![Arg::load(var.as_str())],
                        ),
                        1 => builder.quantum(
                            "rz",
                            Support::target_only(vec![q]),
                            vec![Arg::Constant(c)],
                        ),
                        _ => builder.quantum(
                            "cnot",
                            Support::new(vec![(q + 1) % n], vec![q]).unwrap(),
                            vec![],
                        ),
                    };
                }
                builder.build().unwrap()
            })
    })
}

proptest! {
    #[test]
    fn prop_compile_is_deterministic(model in arb_digital_model()) {
        let dialect = resolve("digital", None).unwrap();
        let a = dialect.compile(&model).unwrap();
        let b = dialect.compile(&model).unwrap();
        prop_assert_eq!(a.program(), b.program());
        prop_assert_eq!(
            a.embedding().keys().collect::<Vec<_>>(),
            b.embedding().keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn prop_embedding_is_pure(model in arb_digital_model(), x in -2.0_f64..2.0) {
        let artifact = resolve("digital", None).unwrap().compile(&model).unwrap();
        let inputs: ParameterValues = [("x".to_string(), Value::Scalar(x))].into();
        let first = artifact.embedding().evaluate(&ParameterValues::new(), &inputs).unwrap();
        let second = artifact.embedding().evaluate(&ParameterValues::new(), &inputs).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_geometry_idempotent_on_default_grid(n in 1_usize..=25) {
        let dialect = resolve("analog", Some("analog-device")).unwrap();
        let plain = Model::builder(AllocQubits::new(n)).build().unwrap();
        let explicit = Model::builder(
            AllocQubits::new(n)
                .with_grid_type(GridType::Triangular)
                .with_grid_scale(1.0),
        )
        .build()
        .unwrap();

        let a = dialect.compile(&plain).unwrap();
        let b = dialect.compile(&explicit).unwrap();
        prop_assert_eq!(a.register(), b.register());
        prop_assert!(b.warnings().is_empty());
    }
}

// ---------------------------------------------------------------------------
// Register resolution
// ---------------------------------------------------------------------------

#[test]
fn test_layout_overflow_reports_capacity() {
    let model = Model::builder(AllocQubits::new(26)).build().unwrap();
    let err = resolve("analog", None).unwrap().compile(&model).unwrap_err();
    assert!(matches!(
        err,
        CompileError::LayoutOverflow { requested: 26, available: 25, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_empty_register_on_every_backend() {
    let model = Model::builder(AllocQubits::new(0)).build().unwrap();
    for (backend, device) in [("digital", None), ("analog", None), ("analog", Some("fresnel1"))] {
        assert!(matches!(
            resolve(backend, device).unwrap().compile(&model),
            Err(CompileError::EmptyRegister)
        ));
    }
}

#[test]
fn test_atoms_never_share_a_trap() {
    let model = Model::builder(
        AllocQubits::new(3)
            .with_coords(vec![(0, 0), (0, 0), (1, 0)])
            .with_grid_type(GridType::Square),
    )
    .build()
    .unwrap();
    let artifact = resolve("analog", None).unwrap().compile(&model).unwrap();
    let NativeRegister::Atoms(layout) = artifact.register() else {
        panic!("expected an atom register");
    };
    let mut ids = layout.trap_ids.clone();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

// ---------------------------------------------------------------------------
// Compatibility warnings
// ---------------------------------------------------------------------------

#[test]
fn test_fresnel1_clamps_scale_and_flags_directive() {
    let model = Model::builder(AllocQubits::new(2).with_grid_scale(2.0))
        .directive("enable_digital_analog", json!(true))
        .build()
        .unwrap();
    let artifact = resolve("analog", Some("fresnel1"))
        .unwrap()
        .compile(&model)
        .unwrap();

    let warnings = artifact.warnings();
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().any(|w| matches!(
        w,
        CompatibilityWarning::GridScaleOutOfRange { requested, applied, .. }
            if *requested == 2.0 && *applied == 1.0
    )));
    assert!(warnings.iter().any(|w| matches!(
        w,
        CompatibilityWarning::UnsupportedDirective { directive, consequence, .. }
            if directive == "enable_digital_analog" && consequence.contains("fixed grid")
    )));

    let NativeRegister::Atoms(layout) = artifact.register() else {
        panic!("expected an atom register");
    };
    assert_eq!(layout.grid_scale, 1.0);
}

#[test]
fn test_false_directive_is_not_flagged() {
    let model = Model::builder(AllocQubits::new(2))
        .directive("enable_digital_analog", json!(false))
        .build()
        .unwrap();
    let artifact = resolve("analog", Some("fresnel1"))
        .unwrap()
        .compile(&model)
        .unwrap();
    assert!(artifact.warnings().is_empty());
}

// ---------------------------------------------------------------------------
// Lowering
// ---------------------------------------------------------------------------

#[test]
fn test_digital_defers_symbols_by_name() {
    let model = Model::builder(AllocQubits::new(2))
        .input("x", Alloc::input(1))
        .assign("%0", Expr::call("mul", [Arg::Constant(1.57), Arg::load("x")]))
        .assign("%1", Expr::call("sin", [Arg::load("%0")]))
        .quantum("rx", Support::target_only(vec![0]), vec![Arg::load("%1")])
        .quantum("not", Support::new(vec![1], vec![0]).unwrap(), vec![])
        .build()
        .unwrap();
    let artifact = resolve("digital", None).unwrap().compile(&model).unwrap();
    let NativeProgram::Circuit(circuit) = artifact.program() else {
        panic!("expected a circuit");
    };
    assert_eq!(circuit.symbols().into_iter().collect::<Vec<_>>(), vec!["%1"]);
    assert_eq!(circuit.ops[1].qubits(), vec![0, 1]);
}

#[test]
fn test_unsupported_opcode_is_configuration_error() {
    let model = Model::builder(AllocQubits::new(1))
        .quantum("dyn_wait", Support::all(), vec![Arg::Constant(1.0)])
        .build()
        .unwrap();
    let err = resolve("digital", None).unwrap().compile(&model).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    assert!(resolve("analog", None).unwrap().compile(&model).is_ok());
}

#[test]
fn test_backend_natives_are_scoped() {
    let model = Model::builder(AllocQubits::new(1))
        .input("x", Alloc::input(1))
        .assign("%0", Expr::call("sigmoid", [Arg::load("x")]))
        .build()
        .unwrap();
    assert!(resolve("digital", None).unwrap().compile(&model).is_ok());
    assert!(matches!(
        resolve("analog", None).unwrap().compile(&model),
        Err(CompileError::UnknownOperator(op)) if op == "sigmoid"
    ));
}

#[test]
fn test_analog_sequence_serializes() {
    let model = Model::builder(AllocQubits::new(2))
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
    let artifact = resolve("analog", None).unwrap().compile(&model).unwrap();
    let doc = serde_json::to_value(artifact.program()).unwrap();
    assert_eq!(doc["kind"], "pulse");
    assert_eq!(doc["device"], "analog-device");
    assert_eq!(doc["ops"][0]["op"], "pulse");
}
