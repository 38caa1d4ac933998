//! Lowering of quantum instructions to backend-native programs.
//!
//! Each backend class owns an opcode table. Lowering walks the model's
//! quantum instructions in order, skips assignments (those belong to the
//! embedding) and emits one native operation per instruction.

pub mod analog;
pub mod digital;
pub mod pulse;

use qlower_ir::{Arg, Model, QuInstruct};
use serde::Serialize;

use crate::embedding::Embedding;
use crate::error::{CompileError, CompileResult};
use crate::register::NativeRegister;

pub use analog::AnalogLowering;
pub use digital::{Circuit, DigitalLowering, GateOp, GateParam, NativeGate};
pub use pulse::{BuiltSequence, PulseSequence};

/// A backend-native executable program.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NativeProgram {
    /// Gate circuit for a digital simulator.
    Circuit(Circuit),
    /// Timed pulse sequence for an analog device.
    Pulse(PulseSequence),
}

impl NativeProgram {
    /// The gate circuit, if this is a digital program.
    pub fn as_circuit(&self) -> Option<&Circuit> {
        match self {
            NativeProgram::Circuit(c) => Some(c),
            NativeProgram::Pulse(_) => None,
        }
    }

    /// The pulse sequence, if this is an analog program.
    pub fn as_pulse(&self) -> Option<&PulseSequence> {
        match self {
            NativeProgram::Pulse(p) => Some(p),
            NativeProgram::Circuit(_) => None,
        }
    }

    /// Number of native operations.
    pub fn len(&self) -> usize {
        match self {
            NativeProgram::Circuit(c) => c.ops.len(),
            NativeProgram::Pulse(p) => p.ops.len(),
        }
    }

    /// Check whether the program is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lowers a model's quantum instructions against a resolved register.
pub trait InstructionLowering: Send + Sync {
    /// Produce the native program.
    fn lower(
        &self,
        model: &Model,
        register: &NativeRegister,
        embedding: &Embedding,
    ) -> CompileResult<NativeProgram>;
}

/// Reject instructions carrying more than `max` arguments.
pub(crate) fn check_max_args(inst: &QuInstruct, max: usize) -> CompileResult<()> {
    if inst.args.len() > max {
        return Err(CompileError::TooManyArgs {
            opcode: inst.opcode.clone(),
            max,
            got: inst.args.len(),
        });
    }
    Ok(())
}

/// Argument at `index`, or `MissingArgument`.
pub(crate) fn required_arg<'a>(
    inst: &'a QuInstruct,
    index: usize,
    argument: &'static str,
) -> CompileResult<&'a Arg> {
    inst.args
        .get(index)
        .ok_or_else(|| CompileError::MissingArgument {
            opcode: inst.opcode.clone(),
            argument,
        })
}

/// Check that a loaded name is known to the embedding.
pub(crate) fn check_bound(arg: &Arg, embedding: &Embedding) -> CompileResult<()> {
    match arg.name() {
        Some(name) if !embedding.knows(name) => {
            Err(CompileError::UnboundVariable(name.to_string()))
        }
        _ => Ok(()),
    }
}
