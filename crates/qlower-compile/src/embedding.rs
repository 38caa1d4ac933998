//! Parameter embedding: SSA assignments compiled into evaluator closures.
//!
//! The builder walks the model's [`Assign`](qlower_ir::Assign) instructions
//! in program order and turns each into an [`EvalFn`]. Evaluating the table
//! threads every result into the environment read by later entries, so the
//! whole table is a single linear pass over the SSA chain.
//!
//! Name resolution inside a closure reads the environment first (caller
//! inputs, then results computed earlier in the chain) and falls back to
//! the trainable buffer. Caller inputs take precedence over computed
//! results; models cannot assign to an input name, so the two never
//! collide in practice.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use qlower_ir::{Alloc, Arg, Expr, Model, ParameterValues, Value};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::{CompileError, CompileResult};

/// Evaluator for one SSA variable: `(trainable, inputs) -> value`.
pub type EvalFn =
    Box<dyn Fn(&ParameterValues, &ParameterValues) -> CompileResult<Value> + Send + Sync>;

/// Native implementation of an operator.
pub type OpFn = fn(&[Value]) -> CompileResult<Value>;

/// Number of arguments an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` arguments.
    Exactly(usize),
    /// `n` or more arguments.
    AtLeast(usize),
}

impl Arity {
    /// Check whether `n` arguments are accepted.
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(k) => write!(f, "{k}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

/// A named operator usable in assignments.
#[derive(Debug, Clone, Copy)]
pub struct Operator {
    /// Operator name.
    pub name: &'static str,
    /// Accepted argument count.
    pub arity: Arity,
    /// Implementation.
    pub apply: OpFn,
}

impl Operator {
    /// Create an operator.
    pub const fn new(name: &'static str, arity: Arity, apply: OpFn) -> Self {
        Self { name, arity, apply }
    }
}

/// A lookup table of operators.
#[derive(Debug, Default)]
pub struct FunctionTable {
    ops: FxHashMap<&'static str, Operator>,
}

impl FunctionTable {
    /// Build a table from a list of operators.
    pub fn new(ops: &[Operator]) -> Self {
        Self {
            ops: ops.iter().map(|op| (op.name, *op)).collect(),
        }
    }

    /// Look up an operator.
    pub fn get(&self, name: &str) -> Option<&Operator> {
        self.ops.get(name)
    }

    /// Sorted operator names.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.ops.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn fold(args: &[Value], f: fn(&Value, &Value) -> qlower_ir::IrResult<Value>) -> CompileResult<Value> {
    let (first, rest) = args.split_first().ok_or_else(|| CompileError::InvalidArity {
        op: "reduce".into(),
        expected: Arity::AtLeast(1).to_string(),
        got: 0,
    })?;
    rest.iter()
        .try_fold(first.clone(), |acc, v| f(&acc, v).map_err(CompileError::from))
}

fn op_add(args: &[Value]) -> CompileResult<Value> {
    fold(args, Value::add)
}

fn op_mul(args: &[Value]) -> CompileResult<Value> {
    fold(args, Value::mul)
}

fn op_pow(args: &[Value]) -> CompileResult<Value> {
    fold(args, Value::pow)
}

fn op_sub(args: &[Value]) -> CompileResult<Value> {
    Ok(args[0].zip_with(&args[1], |a, b| a - b)?)
}

fn op_div(args: &[Value]) -> CompileResult<Value> {
    Ok(args[0].zip_with(&args[1], |a, b| a / b)?)
}

fn op_neg(args: &[Value]) -> CompileResult<Value> {
    Ok(args[0].map(|v| -v))
}

macro_rules! unary_ops {
    ($($fn_name:ident => $f:expr),* $(,)?) => {
        $(
            fn $fn_name(args: &[Value]) -> CompileResult<Value> {
                Ok(args[0].map($f))
            }
        )*
    };
}

unary_ops! {
    op_sin => f64::sin,
    op_cos => f64::cos,
    op_tan => f64::tan,
    op_asin => f64::asin,
    op_acos => f64::acos,
    op_atan => f64::atan,
    op_sinh => f64::sinh,
    op_cosh => f64::cosh,
    op_tanh => f64::tanh,
    op_exp => f64::exp,
    op_log => f64::ln,
    op_sqrt => f64::sqrt,
    op_abs => f64::abs,
}

/// Operators available on every backend.
pub static BUILTINS: LazyLock<FunctionTable> = LazyLock::new(|| {
    FunctionTable::new(&[
        Operator::new("add", Arity::AtLeast(1), op_add),
        Operator::new("mul", Arity::AtLeast(1), op_mul),
        Operator::new("pow", Arity::AtLeast(1), op_pow),
        Operator::new("sub", Arity::Exactly(2), op_sub),
        Operator::new("div", Arity::Exactly(2), op_div),
        Operator::new("neg", Arity::Exactly(1), op_neg),
        Operator::new("sin", Arity::Exactly(1), op_sin),
        Operator::new("cos", Arity::Exactly(1), op_cos),
        Operator::new("tan", Arity::Exactly(1), op_tan),
        Operator::new("asin", Arity::Exactly(1), op_asin),
        Operator::new("acos", Arity::Exactly(1), op_acos),
        Operator::new("atan", Arity::Exactly(1), op_atan),
        Operator::new("sinh", Arity::Exactly(1), op_sinh),
        Operator::new("cosh", Arity::Exactly(1), op_cosh),
        Operator::new("tanh", Arity::Exactly(1), op_tanh),
        Operator::new("exp", Arity::Exactly(1), op_exp),
        Operator::new("log", Arity::Exactly(1), op_log),
        Operator::new("sqrt", Arity::Exactly(1), op_sqrt),
        Operator::new("abs", Arity::Exactly(1), op_abs),
    ])
});

fn lookup<'a>(
    name: &str,
    trainable: &'a ParameterValues,
    inputs: &'a ParameterValues,
) -> CompileResult<&'a Value> {
    inputs
        .get(name)
        .or_else(|| trainable.get(name))
        .ok_or_else(|| CompileError::UnboundVariable(name.to_string()))
}

fn resolve_arg(
    arg: &Arg,
    trainable: &ParameterValues,
    inputs: &ParameterValues,
) -> CompileResult<Value> {
    match arg {
        Arg::Constant(v) => Ok(Value::Scalar(*v)),
        Arg::Load(name) => lookup(name, trainable, inputs).cloned(),
    }
}

fn boxed(
    f: impl Fn(&ParameterValues, &ParameterValues) -> CompileResult<Value> + Send + Sync + 'static,
) -> EvalFn {
    Box::new(f)
}

fn compile_expr(expr: &Expr, natives: &'static FunctionTable) -> CompileResult<EvalFn> {
    match expr {
        Expr::Constant(v) => {
            let v = *v;
            Ok(boxed(move |_, _| Ok(Value::Scalar(v))))
        }
        Expr::Load(name) => {
            let name = name.clone();
            Ok(boxed(move |trainable, inputs| {
                lookup(&name, trainable, inputs).cloned()
            }))
        }
        Expr::Call { op, args } => {
            let operator = *BUILTINS
                .get(op)
                .or_else(|| natives.get(op))
                .ok_or_else(|| CompileError::UnknownOperator(op.clone()))?;
            if !operator.arity.accepts(args.len()) {
                return Err(CompileError::InvalidArity {
                    op: op.clone(),
                    expected: operator.arity.to_string(),
                    got: args.len(),
                });
            }
            let args = args.clone();
            Ok(boxed(move |trainable, inputs| {
                let values = args
                    .iter()
                    .map(|a| resolve_arg(a, trainable, inputs))
                    .collect::<CompileResult<Vec<_>>>()?;
                (operator.apply)(&values)
            }))
        }
    }
}

/// Ordered table of SSA evaluators for one model.
pub struct Embedding {
    table: Vec<(String, EvalFn)>,
    declared: BTreeMap<String, Alloc>,
}

impl Embedding {
    /// Compile the assignments of `model`, resolving operators against the
    /// builtins first and `natives` second.
    pub fn build(model: &Model, natives: &'static FunctionTable) -> CompileResult<Self> {
        let mut bound: BTreeSet<&str> = model.inputs().keys().map(String::as_str).collect();
        let mut table = Vec::new();

        for assign in model.assignments() {
            if let Some(name) = assign.value.loads().into_iter().find(|n| !bound.contains(n)) {
                return Err(CompileError::UnboundVariable(name.to_string()));
            }
            table.push((assign.variable.clone(), compile_expr(&assign.value, natives)?));
            bound.insert(assign.variable.as_str());
        }

        debug!("Built embedding with {} entries", table.len());
        Ok(Self {
            table,
            declared: model.inputs().clone(),
        })
    }

    /// Assigned variable names in evaluation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.table.iter().map(|(k, _)| k.as_str())
    }

    /// Number of SSA entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check whether the model has no assignments.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Declared parameters.
    pub fn declared(&self) -> &BTreeMap<String, Alloc> {
        &self.declared
    }

    /// Names the caller must supply on every evaluation.
    pub fn fparams(&self) -> Vec<&str> {
        self.declared
            .iter()
            .filter(|(_, a)| !a.is_trainable)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Names of trainable parameters.
    pub fn vparams(&self) -> Vec<&str> {
        self.declared
            .iter()
            .filter(|(_, a)| a.is_trainable)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Check whether `name` is a declared parameter or an assigned variable.
    pub fn knows(&self, name: &str) -> bool {
        self.declared.contains_key(name) || self.table.iter().any(|(k, _)| k == name)
    }

    /// Evaluate every entry for the given trainable values and caller inputs.
    ///
    /// `inputs` must hold exactly the non-trainable parameters. The result
    /// holds the inputs, every assigned variable and the trainable values.
    pub fn evaluate(
        &self,
        trainable: &ParameterValues,
        inputs: &ParameterValues,
    ) -> CompileResult<ParameterValues> {
        self.check_inputs(inputs)?;

        let mut env = inputs.clone();
        for (name, eval) in &self.table {
            let value = eval(trainable, &env)?;
            trace!("{} = {}", name, value);
            env.entry(name.clone()).or_insert(value);
        }
        for (name, value) in trainable {
            env.entry(name.clone()).or_insert_with(|| value.clone());
        }
        Ok(env)
    }

    fn check_inputs(&self, inputs: &ParameterValues) -> CompileResult<()> {
        let expected: BTreeSet<&str> = self.fparams().into_iter().collect();
        let given: BTreeSet<&str> = inputs.keys().map(String::as_str).collect();
        if expected != given {
            return Err(CompileError::MissingOrExtraInputs {
                missing: expected.difference(&given).map(|s| s.to_string()).collect(),
                extra: given.difference(&expected).map(|s| s.to_string()).collect(),
            });
        }
        for (name, value) in inputs {
            if let Some(alloc) = self.declared.get(name) {
                if value.len() != alloc.size {
                    return Err(CompileError::InputShapeMismatch {
                        name: name.clone(),
                        expected: alloc.size,
                        got: value.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embedding")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .field("declared", &self.declared)
            .finish()
    }
}

/// Builds the embedding for a model.
pub trait EmbeddingBuilder: Send + Sync {
    /// Compile the model's assignments.
    fn build(&self, model: &Model) -> CompileResult<Embedding>;
}

/// Embedding builder backed by the builtins and a backend function table.
#[derive(Debug, Clone, Copy)]
pub struct StandardEmbedding {
    natives: &'static FunctionTable,
}

impl StandardEmbedding {
    /// Create a builder falling back to `natives`.
    pub fn new(natives: &'static FunctionTable) -> Self {
        Self { natives }
    }
}

impl EmbeddingBuilder for StandardEmbedding {
    fn build(&self, model: &Model) -> CompileResult<Embedding> {
        Embedding::build(model, self.natives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlower_ir::AllocQubits;

    static NO_NATIVES: LazyLock<FunctionTable> = LazyLock::new(FunctionTable::default);

    fn rotation_model() -> Model {
        Model::builder(AllocQubits::new(2))
            .input("x", Alloc::input(1))
            .input("theta", Alloc::trainable(1))
            .assign("%0", Expr::call("mul", [Arg::Constant(1.57), Arg::load("x")]))
            .assign("%1", Expr::call("sin", [Arg::load("%0")]))
            .assign("%2", Expr::call("add", [Arg::load("%1"), Arg::load("theta")]))
            .build()
            .unwrap()
    }

    fn values(pairs: &[(&str, f64)]) -> ParameterValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Scalar(*v)))
            .collect()
    }

    #[test]
    fn test_keys_in_program_order() {
        let emb = Embedding::build(&rotation_model(), &NO_NATIVES).unwrap();
        assert_eq!(emb.keys().collect::<Vec<_>>(), vec!["%0", "%1", "%2"]);
        assert_eq!(emb.fparams(), vec!["x"]);
        assert_eq!(emb.vparams(), vec!["theta"]);
    }

    #[test]
    fn test_evaluate_threads_results() {
        let emb = Embedding::build(&rotation_model(), &NO_NATIVES).unwrap();
        let out = emb
            .evaluate(&values(&[("theta", 0.5)]), &values(&[("x", 2.0)]))
            .unwrap();
        let expected = (1.57_f64 * 2.0).sin();
        assert!(out["%1"].approx_eq(&Value::Scalar(expected), 1e-12));
        assert!(out["%2"].approx_eq(&Value::Scalar(expected + 0.5), 1e-12));
        assert_eq!(out["theta"], Value::Scalar(0.5));
    }

    #[test]
    fn test_missing_or_extra_inputs() {
        let emb = Embedding::build(&rotation_model(), &NO_NATIVES).unwrap();
        let err = emb
            .evaluate(&values(&[("theta", 0.5)]), &values(&[("y", 1.0)]))
            .unwrap_err();
        match err {
            CompileError::MissingOrExtraInputs { missing, extra } => {
                assert_eq!(missing, vec!["x".to_string()]);
                assert_eq!(extra, vec!["y".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_operator() {
        let model = Model::builder(AllocQubits::new(1))
            .assign("%0", Expr::call("frobnicate", [Arg::Constant(1.0)]))
            .build()
            .unwrap();
        assert!(matches!(
            Embedding::build(&model, &NO_NATIVES),
            Err(CompileError::UnknownOperator(op)) if op == "frobnicate"
        ));
    }

    #[test]
    fn test_unbound_variable_at_build() {
        let model = Model::builder(AllocQubits::new(1))
            .assign("%0", Expr::call("sin", [Arg::load("nope")]))
            .build()
            .unwrap();
        assert!(matches!(
            Embedding::build(&model, &NO_NATIVES),
            Err(CompileError::UnboundVariable(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_forward_reference_is_unbound() {
        let model = Model::builder(AllocQubits::new(1))
            .assign("%0", Expr::Load("%1".into()))
            .assign("%1", Expr::Constant(1.0))
            .build()
            .unwrap();
        assert!(matches!(
            Embedding::build(&model, &NO_NATIVES),
            Err(CompileError::UnboundVariable(_))
        ));
    }

    #[test]
    fn test_arity_checked() {
        let model = Model::builder(AllocQubits::new(1))
            .assign("%0", Expr::call("sin", [Arg::Constant(1.0), Arg::Constant(2.0)]))
            .build()
            .unwrap();
        assert!(matches!(
            Embedding::build(&model, &NO_NATIVES),
            Err(CompileError::InvalidArity { .. })
        ));
    }

    #[test]
    fn test_array_inputs_broadcast() {
        let model = Model::builder(AllocQubits::new(1))
            .input("amp", Alloc::input(3))
            .assign("%0", Expr::call("mul", [Arg::Constant(2.0), Arg::load("amp")]))
            .build()
            .unwrap();
        let emb = Embedding::build(&model, &NO_NATIVES).unwrap();
        let inputs: ParameterValues =
            [("amp".to_string(), Value::Array(vec![1.0, 2.0, 3.0]))].into();
        let out = emb.evaluate(&ParameterValues::new(), &inputs).unwrap();
        assert_eq!(out["%0"], Value::Array(vec![2.0, 4.0, 6.0]));

        let short: ParameterValues = [("amp".to_string(), Value::Array(vec![1.0]))].into();
        assert!(matches!(
            emb.evaluate(&ParameterValues::new(), &short),
            Err(CompileError::InputShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_scalar_input_rejects_arrays() {
        let emb = Embedding::build(&rotation_model(), &NO_NATIVES).unwrap();
        let pair: ParameterValues = [("x".to_string(), Value::Array(vec![0.0, 3.14159]))].into();
        assert!(matches!(
            emb.evaluate(&values(&[("theta", 0.0)]), &pair),
            Err(CompileError::InputShapeMismatch { ref name, expected: 1, got: 2 }) if name == "x"
        ));

        let single: ParameterValues = [("x".to_string(), Value::Array(vec![0.5]))].into();
        assert!(emb.evaluate(&values(&[("theta", 0.0)]), &single).is_ok());
    }

    #[test]
    fn test_pow_reduces_left() {
        let out = op_pow(&[Value::Scalar(2.0), Value::Scalar(3.0), Value::Scalar(2.0)]).unwrap();
        assert_eq!(out, Value::Scalar(64.0));
    }
}
