//! Lowering to pulse sequences for analog neutral-atom devices.
//!
//! Instruction arguments are dimensionless. Each pulse function converts
//! them into device units using the global channel limits: durations are
//! scaled by `1000·2π/max_amp` (ns), amplitudes by `max_amp` and detunings
//! by `max_abs_detuning`. Symbolic arguments become variable handles on the
//! sequence and are bound once per run in [`PulseSequence::build`].

use std::f64::consts::PI;
use std::sync::LazyLock;

use qlower_ir::{Arg, Model, QuInstruct, Value};
use tracing::{debug, instrument};

use super::pulse::{
    DetuningMap, Duration, Protocol, PulseParam, PulseSequence, SequenceOp, Waveform,
};
use super::{InstructionLowering, NativeProgram, check_bound, check_max_args, required_arg};
use crate::device::{DeviceSettings, LOCAL_SHIFTS, LOCAL_TARGETS};
use crate::embedding::{Arity, Embedding, FunctionTable, Operator};
use crate::error::{CompileError, CompileResult};
use crate::register::NativeRegister;

const COMMON_OPCODES: &[&str] = &[
    "rx",
    "ry",
    "x",
    "not",
    "h",
    "dyn_pulse",
    "dyn_wait",
    "local_pulse",
    "apply_local_shifts",
];

fn op_arctan2(args: &[Value]) -> CompileResult<Value> {
    Ok(args[0].zip_with(&args[1], f64::atan2)?)
}

fn op_hypot(args: &[Value]) -> CompileResult<Value> {
    Ok(args[0].zip_with(&args[1], f64::hypot)?)
}

/// Functions the analog backend adds to the builtins.
pub static NATIVE_FUNCTIONS: LazyLock<FunctionTable> = LazyLock::new(|| {
    FunctionTable::new(&[
        Operator::new("arctan2", Arity::Exactly(2), op_arctan2),
        Operator::new("hypot", Arity::Exactly(2), op_hypot),
    ])
});

/// Lowering for one analog device.
#[derive(Debug, Clone, Copy)]
pub struct AnalogLowering {
    device: &'static DeviceSettings,
}

impl AnalogLowering {
    /// Create a lowering targeting `device`.
    pub fn new(device: &'static DeviceSettings) -> Self {
        Self { device }
    }

    /// Opcodes accepted on this device, sorted.
    pub fn supported_opcodes(&self) -> Vec<&'static str> {
        let mut names = COMMON_OPCODES.to_vec();
        if self.device.supports_time_modulation {
            names.push("piecewise_pulse");
        }
        names.sort_unstable();
        names
    }

    fn check_time_modulation(&self, model: &Model) -> CompileResult<()> {
        if self.device.supports_time_modulation {
            return Ok(());
        }
        match model.inputs().iter().find(|(_, a)| a.is_time_modulated()) {
            Some((name, _)) => Err(CompileError::TimeModulatedInput {
                name: name.clone(),
                device: self.device.name_short.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl InstructionLowering for AnalogLowering {
    #[instrument(skip_all, fields(device = self.device.name_short))]
    fn lower(
        &self,
        model: &Model,
        register: &NativeRegister,
        embedding: &Embedding,
    ) -> CompileResult<NativeProgram> {
        let NativeRegister::Atoms(layout) = register else {
            return Err(CompileError::IncompatibleRegister {
                backend: "analog".into(),
                found: "qubit",
            });
        };
        self.check_time_modulation(model)?;

        let mut seq = PulseSequence::new(self.device, layout.clone());
        if let Some(map) = detuning_map(model, layout.num_qubits())? {
            debug!("Configured detuning map on targets {:?}", map.targets);
            seq.config_detuning_map(map);
        }

        let mut builder = PulseBuilder {
            device: self.device,
            embedding,
            seq,
        };
        for inst in model.quantum_instructions() {
            builder.add(inst)?;
        }

        debug!(
            "Lowered {} sequence operations over {} variables",
            builder.seq.ops.len(),
            builder.seq.variables.len()
        );
        Ok(NativeProgram::Pulse(builder.seq))
    }
}

/// Detuning map from the `local_targets` / `local_shifts` directives.
fn detuning_map(model: &Model, num_qubits: usize) -> CompileResult<Option<DetuningMap>> {
    let Some(raw_targets) = model.directive(LOCAL_TARGETS) else {
        return Ok(None);
    };

    let invalid = |directive: &str, reason: &str| CompileError::InvalidDirective {
        directive: directive.to_string(),
        reason: reason.to_string(),
    };

    let targets = raw_targets
        .as_array()
        .ok_or_else(|| invalid(LOCAL_TARGETS, "expected a list of qubit indices"))?
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|q| usize::try_from(q).ok())
                .filter(|&q| q < num_qubits)
                .ok_or_else(|| invalid(LOCAL_TARGETS, "qubit index out of range"))
        })
        .collect::<CompileResult<Vec<_>>>()?;

    let weights = match model.directive(LOCAL_SHIFTS) {
        None => vec![1.0; targets.len()],
        Some(raw_shifts) => {
            let shifts = raw_shifts
                .as_array()
                .ok_or_else(|| invalid(LOCAL_SHIFTS, "expected a list of numbers"))?;
            if shifts.len() != targets.len() {
                return Err(invalid(LOCAL_SHIFTS, "length differs from local_targets"));
            }
            shifts
                .iter()
                .map(|s| {
                    s.as_f64()
                        .map(|s| s / (2.0 * PI))
                        .ok_or_else(|| invalid(LOCAL_SHIFTS, "expected a list of numbers"))
                })
                .collect::<CompileResult<Vec<_>>>()?
        }
    };

    for (&qubit, &weight) in targets.iter().zip(&weights) {
        if !(0.0..=1.0).contains(&weight) {
            return Err(CompileError::InvalidDetuningWeight { qubit, weight });
        }
    }

    Ok(Some(DetuningMap { targets, weights }))
}

/// Accumulates sequence operations for one model.
struct PulseBuilder<'a> {
    device: &'static DeviceSettings,
    embedding: &'a Embedding,
    seq: PulseSequence,
}

impl PulseBuilder<'_> {
    fn max_amp(&self) -> f64 {
        self.device.global.amplitude()
    }

    fn max_abs_detuning(&self) -> f64 {
        self.device.global.detuning()
    }

    /// Duration scale shared by dynamic pulses (ns per unit).
    fn time_scale(&self) -> f64 {
        1000.0 * 2.0 * PI / self.max_amp()
    }

    fn add(&mut self, inst: &QuInstruct) -> CompileResult<()> {
        match inst.opcode.as_str() {
            "rx" => self.rotation(inst, 0.0),
            "ry" => self.rotation(inst, PI / 2.0),
            "x" | "not" => {
                check_max_args(inst, 0)?;
                self.rotation_pulse(PulseParam::constant(PI), 0.0);
                Ok(())
            }
            "h" => self.hadamard(inst),
            "dyn_pulse" => self.dyn_pulse(inst),
            "piecewise_pulse" if self.device.supports_time_modulation => {
                self.piecewise_pulse(inst)
            }
            "dyn_wait" => self.dyn_wait(inst),
            "local_pulse" => self.local_pulse(inst),
            "apply_local_shifts" => self.apply_local_shifts(inst),
            _ => Err(CompileError::UnsupportedOpcode {
                backend: self.device.name_short.to_string(),
                opcode: inst.opcode.clone(),
            }),
        }
    }

    /// Pulse parameter for `arg`, declaring its variable on the sequence.
    fn param(&mut self, arg: &Arg) -> CompileResult<PulseParam> {
        check_bound(arg, self.embedding)?;
        Ok(match arg {
            Arg::Constant(v) => PulseParam::constant(*v),
            Arg::Load(name) => {
                self.seq.declare_variable(name);
                PulseParam::variable(name.as_str())
            }
        })
    }

    /// Element `index` of an array argument; constants broadcast.
    fn item(&mut self, arg: &Arg, index: usize) -> CompileResult<PulseParam> {
        check_bound(arg, self.embedding)?;
        Ok(match arg {
            Arg::Constant(v) => PulseParam::constant(*v),
            Arg::Load(name) => {
                self.seq.declare_variable(name);
                PulseParam::item(name.as_str(), index)
            }
        })
    }

    fn constant_pulse(
        &mut self,
        duration: PulseParam,
        amplitude: PulseParam,
        detuning: PulseParam,
        phase: PulseParam,
    ) {
        self.seq.add(SequenceOp::Pulse {
            duration,
            amplitude: Waveform::constant(amplitude),
            detuning: Waveform::constant(detuning),
            phase,
            post_phase_shift: 0.0,
        });
    }

    fn rotation_pulse(&mut self, angle: PulseParam, phase: f64) {
        let max_amp = self.max_amp();
        self.constant_pulse(
            angle.scaled(1000.0 / max_amp),
            PulseParam::constant(max_amp),
            PulseParam::constant(0.0),
            PulseParam::constant(phase),
        );
    }

    fn rotation(&mut self, inst: &QuInstruct, phase: f64) -> CompileResult<()> {
        check_max_args(inst, 1)?;
        let angle = self.param(required_arg(inst, 0, "angle")?)?;
        self.rotation_pulse(angle, phase);
        Ok(())
    }

    fn hadamard(&mut self, inst: &QuInstruct) -> CompileResult<()> {
        check_max_args(inst, 1)?;
        let max_amp = self.max_amp();

        if self.device.global.eom {
            let duration = match inst.args.first() {
                Some(arg) => self.param(arg)?,
                None => PulseParam::constant(1.0),
            };
            self.seq.add(SequenceOp::Pulse {
                duration: duration.scaled(self.time_scale()),
                amplitude: Waveform::constant(PulseParam::constant(max_amp)),
                detuning: Waveform::constant(PulseParam::constant(PI)),
                phase: PulseParam::constant(PI / 2.0),
                post_phase_shift: PI,
            });
        } else {
            // Fixed calibrated pi/2 pulse; a duration argument is accepted but unused.
            if let Some(arg) = inst.args.first() {
                check_bound(arg, self.embedding)?;
            }
            self.seq.add(SequenceOp::Pulse {
                duration: PulseParam::constant(1000.0),
                amplitude: Waveform::Blackman {
                    area: PulseParam::constant(PI / 2.0),
                },
                detuning: Waveform::constant(PulseParam::constant(0.0)),
                phase: PulseParam::constant(PI / 2.0),
                post_phase_shift: PI,
            });
        }
        Ok(())
    }

    fn dyn_pulse(&mut self, inst: &QuInstruct) -> CompileResult<()> {
        check_max_args(inst, 4)?;
        let duration = self.param(required_arg(inst, 0, "duration")?)?;
        let amplitude = self.param(required_arg(inst, 1, "amplitude")?)?;
        let detuning = self.param(required_arg(inst, 2, "detuning")?)?;
        let phase = self.param(required_arg(inst, 3, "phase")?)?;

        let (time_scale, max_amp, max_det) =
            (self.time_scale(), self.max_amp(), self.max_abs_detuning());
        self.constant_pulse(
            duration.scaled(time_scale),
            amplitude.scaled(max_amp),
            detuning.scaled(max_det),
            phase,
        );
        Ok(())
    }

    /// One ramp segment per duration element; amplitude and detuning hold
    /// one more element than there are segments.
    fn piecewise_pulse(&mut self, inst: &QuInstruct) -> CompileResult<()> {
        check_max_args(inst, 4)?;
        let duration = required_arg(inst, 0, "duration")?;
        let amplitude = required_arg(inst, 1, "amplitude")?;
        let detuning = required_arg(inst, 2, "detuning")?;
        let phase = self.param(required_arg(inst, 3, "phase")?)?;

        let segments = duration
            .name()
            .and_then(|n| self.embedding.declared().get(n))
            .map_or(1, |alloc| alloc.size);

        let (time_scale, max_amp, max_det) =
            (self.time_scale(), self.max_amp(), self.max_abs_detuning());
        for i in 0..segments {
            let seg_duration = if segments == 1 {
                self.param(duration)?
            } else {
                self.item(duration, i)?
            };
            let amp = Waveform::Ramp {
                start: self.item(amplitude, i)?.scaled(max_amp),
                stop: self.item(amplitude, i + 1)?.scaled(max_amp),
            };
            let det = Waveform::Ramp {
                start: self.item(detuning, i)?.scaled(max_det),
                stop: self.item(detuning, i + 1)?.scaled(max_det),
            };
            self.seq.add(SequenceOp::Pulse {
                duration: seg_duration.scaled(time_scale),
                amplitude: amp,
                detuning: det,
                phase: phase.clone(),
                post_phase_shift: 0.0,
            });
        }
        Ok(())
    }

    fn dyn_wait(&mut self, inst: &QuInstruct) -> CompileResult<()> {
        check_max_args(inst, 1)?;
        let duration = self.param(required_arg(inst, 0, "duration")?)?;
        let time_scale = self.time_scale();
        self.seq.add(SequenceOp::Delay {
            duration: duration.scaled(time_scale),
        });
        Ok(())
    }

    fn local_pulse(&mut self, inst: &QuInstruct) -> CompileResult<()> {
        check_max_args(inst, 3)?;
        self.require_detuning_map(inst)?;

        let concurrent = match inst.args.get(2) {
            None => false,
            Some(Arg::Constant(v)) => *v != 0.0,
            Some(Arg::Load(_)) => {
                return Err(CompileError::ConstantRequired {
                    opcode: inst.opcode.clone(),
                    argument: "concurrent",
                });
            }
        };

        let duration_arg = required_arg(inst, 0, "duration")?;
        let duration = if duration_arg.is_fill() {
            if !concurrent {
                return Err(CompileError::InvalidFillUsage {
                    opcode: inst.opcode.clone(),
                });
            }
            Duration::Fill
        } else {
            let time_scale = self.time_scale();
            Duration::Value(self.param(duration_arg)?.scaled(time_scale))
        };
        let detuning = self.param(required_arg(inst, 1, "detuning")?)?;

        let max_det = self.max_abs_detuning();
        self.seq.add(SequenceOp::LocalDetuning {
            duration,
            detuning: detuning.scaled(-max_det),
            protocol: if concurrent {
                Protocol::NoDelay
            } else {
                Protocol::MinDelay
            },
        });
        Ok(())
    }

    fn apply_local_shifts(&mut self, inst: &QuInstruct) -> CompileResult<()> {
        check_max_args(inst, 0)?;
        self.require_detuning_map(inst)?;
        let max_det = self.max_abs_detuning();
        self.seq.add(SequenceOp::LocalDetuning {
            duration: Duration::Value(PulseParam::constant(1000.0 * 2.0 * PI / max_det)),
            detuning: PulseParam::constant(-max_det),
            protocol: Protocol::MinDelay,
        });
        Ok(())
    }

    fn require_detuning_map(&self, inst: &QuInstruct) -> CompileResult<()> {
        if self.seq.detuning_map.is_none() {
            return Err(CompileError::MissingDetuningMap {
                opcode: inst.opcode.clone(),
            });
        }
        Ok(())
    }
}
