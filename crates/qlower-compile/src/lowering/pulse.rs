//! Pulse sequences for analog neutral-atom devices.
//!
//! A [`PulseSequence`] is what the analog lowering produces: an ordered list
//! of channel operations whose numeric arguments may still point at declared
//! variables. [`PulseSequence::build`] binds those variables once against the
//! evaluated embedding and schedules the operations on a timeline, yielding a
//! [`BuiltSequence`] the engine can integrate.
//!
//! Times are in ns, amplitudes and detunings in rad/µs.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use qlower_ir::{ParameterValues, Value};
use serde::Serialize;
use tracing::trace;

use crate::device::{DMM_CHANNEL, DeviceSettings, GLOBAL_CHANNEL};
use crate::error::{CompileError, CompileResult};
use crate::register::NativeLayout;

/// Where a pulse parameter takes its value from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSource {
    /// Literal number.
    Constant(f64),
    /// Declared variable, optionally one element of it.
    Variable {
        /// Variable name.
        name: String,
        /// Element index for array variables.
        index: Option<usize>,
    },
}

/// A numeric pulse argument: a source times a unit-conversion factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseParam {
    /// Raw value source.
    pub source: ParamSource,
    /// Multiplier applied after resolution.
    pub factor: f64,
}

impl PulseParam {
    /// A literal value.
    pub fn constant(value: f64) -> Self {
        Self {
            source: ParamSource::Constant(value),
            factor: 1.0,
        }
    }

    /// A whole (scalar) variable.
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            source: ParamSource::Variable {
                name: name.into(),
                index: None,
            },
            factor: 1.0,
        }
    }

    /// One element of an array variable.
    pub fn item(name: impl Into<String>, index: usize) -> Self {
        Self {
            source: ParamSource::Variable {
                name: name.into(),
                index: Some(index),
            },
            factor: 1.0,
        }
    }

    /// Multiply the conversion factor by `factor`.
    #[must_use]
    pub fn scaled(mut self, factor: f64) -> Self {
        self.factor *= factor;
        self
    }

    /// Name of the variable read, if any.
    pub fn variable_name(&self) -> Option<&str> {
        match &self.source {
            ParamSource::Variable { name, .. } => Some(name),
            ParamSource::Constant(_) => None,
        }
    }

    /// Bind against evaluated values.
    pub fn resolve(&self, values: &ParameterValues) -> CompileResult<f64> {
        let raw = match &self.source {
            ParamSource::Constant(v) => *v,
            ParamSource::Variable { name, index } => {
                let value = values
                    .get(name)
                    .ok_or_else(|| CompileError::UnboundVariable(name.clone()))?;
                match (index, value) {
                    (Some(i), _) => value.get(*i).ok_or_else(|| CompileError::IndexOutOfRange {
                        name: name.clone(),
                        index: *i,
                        len: value.len(),
                    })?,
                    (None, Value::Scalar(v)) => *v,
                    (None, Value::Array(items)) if items.len() == 1 => items[0],
                    (None, Value::Array(_)) => {
                        return Err(CompileError::NonScalarArgument(name.clone()));
                    }
                }
            }
        };
        Ok(raw * self.factor)
    }
}

/// Shape of a channel quantity over one pulse.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Waveform {
    /// Constant value.
    Constant {
        /// The value.
        value: PulseParam,
    },
    /// Linear ramp.
    Ramp {
        /// Value at the start.
        start: PulseParam,
        /// Value at the end.
        stop: PulseParam,
    },
    /// Blackman window with a given integral (rad).
    Blackman {
        /// Pulse area.
        area: PulseParam,
    },
}

impl Waveform {
    /// Constant waveform.
    pub fn constant(value: PulseParam) -> Self {
        Waveform::Constant { value }
    }

    fn build(&self, values: &ParameterValues) -> CompileResult<BuiltWaveform> {
        Ok(match self {
            Waveform::Constant { value } => BuiltWaveform::Constant {
                value: value.resolve(values)?,
            },
            Waveform::Ramp { start, stop } => BuiltWaveform::Ramp {
                start: start.resolve(values)?,
                stop: stop.resolve(values)?,
            },
            Waveform::Blackman { area } => BuiltWaveform::Blackman {
                area: area.resolve(values)?,
            },
        })
    }
}

/// A waveform with every parameter bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum BuiltWaveform {
    /// Constant value.
    Constant {
        /// The value.
        value: f64,
    },
    /// Linear ramp.
    Ramp {
        /// Value at the start.
        start: f64,
        /// Value at the end.
        stop: f64,
    },
    /// Blackman window.
    Blackman {
        /// Pulse area (rad).
        area: f64,
    },
}

impl BuiltWaveform {
    /// Value `t` ns into a pulse lasting `duration` ns.
    pub fn sample(&self, t: f64, duration: f64) -> f64 {
        let x = if duration > 0.0 {
            (t / duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        match *self {
            BuiltWaveform::Constant { value } => value,
            BuiltWaveform::Ramp { start, stop } => start + (stop - start) * x,
            BuiltWaveform::Blackman { area } => {
                if duration <= 0.0 {
                    return 0.0;
                }
                // The window integrates to 0.42 * T.
                let window = 0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos();
                area / (0.42 * duration / 1000.0) * window
            }
        }
    }
}

/// Length of a local detuning pulse.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Duration {
    /// Stretch until the global channel's end.
    Fill,
    /// Explicit length (ns).
    Value(PulseParam),
}

/// How a channel operation waits for the other channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    /// Start once every channel addressing the same atoms is free.
    MinDelay,
    /// Start as soon as this channel is free.
    NoDelay,
}

/// One channel operation, not yet scheduled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SequenceOp {
    /// Pulse on the global Rydberg channel.
    Pulse {
        /// Length (ns).
        duration: PulseParam,
        /// Rabi frequency waveform.
        amplitude: Waveform,
        /// Detuning waveform.
        detuning: Waveform,
        /// Phase (rad).
        phase: PulseParam,
        /// Phase added to every later global pulse (rad).
        post_phase_shift: f64,
    },
    /// Idle time on the global channel.
    Delay {
        /// Length (ns).
        duration: PulseParam,
    },
    /// Detuning on the detuning-modulation channel, weighted per atom.
    LocalDetuning {
        /// Length.
        duration: Duration,
        /// Detuning (rad/µs).
        detuning: PulseParam,
        /// Scheduling protocol.
        protocol: Protocol,
    },
}

/// Per-atom weights of the detuning-modulation channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetuningMap {
    /// Addressed qubits.
    pub targets: Vec<usize>,
    /// Weight of each target, in `[0, 1]`.
    pub weights: Vec<f64>,
}

impl DetuningMap {
    /// Weight of every qubit, zero for qubits not addressed.
    pub fn weights_for(&self, num_qubits: usize) -> Vec<f64> {
        let mut weights = vec![0.0; num_qubits];
        for (&q, &w) in self.targets.iter().zip(&self.weights) {
            if let Some(slot) = weights.get_mut(q) {
                *slot = w;
            }
        }
        weights
    }
}

/// Drive channel of a scheduled pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChannelId {
    /// Global Rydberg channel.
    #[serde(rename = "rydberg_global")]
    Global,
    /// Detuning-modulation channel.
    #[serde(rename = "dmm_0")]
    Dmm,
}

impl ChannelId {
    /// Device channel name.
    pub fn name(&self) -> &'static str {
        match self {
            ChannelId::Global => GLOBAL_CHANNEL,
            ChannelId::Dmm => DMM_CHANNEL,
        }
    }
}

/// A pulse placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedPulse {
    /// Channel.
    pub channel: ChannelId,
    /// Start time (ns).
    pub start: f64,
    /// Length (ns).
    pub duration: f64,
    /// Rabi frequency (rad/µs).
    pub amplitude: BuiltWaveform,
    /// Detuning (rad/µs).
    pub detuning: BuiltWaveform,
    /// Phase (rad), including accumulated phase shifts.
    pub phase: f64,
}

impl TimedPulse {
    /// End time (ns).
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    fn is_active(&self, t: f64) -> bool {
        self.start <= t && t < self.end()
    }
}

/// Channel values at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Drive {
    /// Global Rabi frequency (rad/µs).
    pub amplitude: f64,
    /// Global detuning (rad/µs).
    pub detuning: f64,
    /// Global phase (rad).
    pub phase: f64,
    /// Detuning-modulation value before per-atom weighting (rad/µs).
    pub local_detuning: f64,
}

/// A sequence with bound parameters and a schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuiltSequence {
    /// Scheduled pulses.
    pub pulses: Vec<TimedPulse>,
    /// End of the last operation (ns).
    pub total_duration: f64,
    /// Atom positions (µm).
    pub coords: Vec<(f64, f64)>,
    /// Detuning-modulation weight per atom.
    pub dmm_weights: Vec<f64>,
    /// Interaction coefficient C6 (rad·µm⁶/µs).
    pub interaction_coeff: f64,
}

impl BuiltSequence {
    /// Number of atoms.
    pub fn num_qubits(&self) -> usize {
        self.coords.len()
    }

    /// Channel values at time `t` (ns).
    pub fn drive_at(&self, t: f64) -> Drive {
        let mut drive = Drive::default();
        for pulse in self.pulses.iter().filter(|p| p.is_active(t)) {
            let local_t = t - pulse.start;
            match pulse.channel {
                ChannelId::Global => {
                    drive.amplitude = pulse.amplitude.sample(local_t, pulse.duration);
                    drive.detuning = pulse.detuning.sample(local_t, pulse.duration);
                    drive.phase = pulse.phase;
                }
                ChannelId::Dmm => {
                    drive.local_detuning = pulse.detuning.sample(local_t, pulse.duration);
                }
            }
        }
        drive
    }

    /// End of the last pulse on `channel` (ns).
    pub fn channel_end(&self, channel: ChannelId) -> f64 {
        self.pulses
            .iter()
            .filter(|p| p.channel == channel)
            .map(TimedPulse::end)
            .fold(0.0, f64::max)
    }
}

/// An unscheduled pulse program on one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseSequence {
    /// Registry name of the device.
    pub device: String,
    /// Atom placement.
    pub layout: NativeLayout,
    /// Whether the global channel plays in EOM mode.
    pub eom: bool,
    /// Weights of the detuning-modulation channel, once configured.
    pub detuning_map: Option<DetuningMap>,
    /// Variables the operations read.
    pub variables: BTreeSet<String>,
    /// Operations in program order.
    pub ops: Vec<SequenceOp>,
    /// Interaction coefficient C6 (rad·µm⁶/µs).
    pub interaction_coeff: f64,
}

impl PulseSequence {
    /// Empty sequence on `device`.
    pub fn new(device: &DeviceSettings, layout: NativeLayout) -> Self {
        Self {
            device: device.name_short.to_string(),
            layout,
            eom: device.global.eom,
            detuning_map: None,
            variables: BTreeSet::new(),
            ops: Vec::new(),
            interaction_coeff: device.interaction_coeff,
        }
    }

    /// Configure the detuning-modulation channel.
    pub fn config_detuning_map(&mut self, map: DetuningMap) {
        self.detuning_map = Some(map);
    }

    /// Declare a variable read by later operations.
    pub fn declare_variable(&mut self, name: &str) {
        if !self.variables.contains(name) {
            self.variables.insert(name.to_string());
        }
    }

    /// Append an operation.
    pub fn add(&mut self, op: SequenceOp) {
        self.ops.push(op);
    }

    /// Bind every variable against `values` and schedule the operations.
    pub fn build(&self, values: &ParameterValues) -> CompileResult<BuiltSequence> {
        if let Some(missing) = self.variables.iter().find(|v| !values.contains_key(*v)) {
            return Err(CompileError::UnboundVariable(missing.clone()));
        }

        let mut pulses = Vec::with_capacity(self.ops.len());
        let mut t_global = 0.0_f64;
        let mut t_dmm = 0.0_f64;
        let mut phase_ref = 0.0;

        for op in &self.ops {
            match op {
                SequenceOp::Pulse {
                    duration,
                    amplitude,
                    detuning,
                    phase,
                    post_phase_shift,
                } => {
                    let duration = checked_duration(duration.resolve(values)?)?;
                    let start = t_global.max(t_dmm);
                    pulses.push(TimedPulse {
                        channel: ChannelId::Global,
                        start,
                        duration,
                        amplitude: amplitude.build(values)?,
                        detuning: detuning.build(values)?,
                        phase: phase.resolve(values)? + phase_ref,
                    });
                    phase_ref += post_phase_shift;
                    t_global = start + duration;
                }
                SequenceOp::Delay { duration } => {
                    t_global += checked_duration(duration.resolve(values)?)?;
                }
                SequenceOp::LocalDetuning {
                    duration,
                    detuning,
                    protocol,
                } => {
                    if self.detuning_map.is_none() {
                        return Err(CompileError::MissingDetuningMap {
                            opcode: "local_detuning".into(),
                        });
                    }
                    let start = match protocol {
                        Protocol::MinDelay => t_global.max(t_dmm),
                        Protocol::NoDelay => t_dmm,
                    };
                    let duration = match duration {
                        Duration::Fill => t_global - start,
                        Duration::Value(d) => checked_duration(d.resolve(values)?)?,
                    };
                    if duration <= 0.0 {
                        trace!("Skipping empty local detuning at {} ns", start);
                        continue;
                    }
                    pulses.push(TimedPulse {
                        channel: ChannelId::Dmm,
                        start,
                        duration,
                        amplitude: BuiltWaveform::Constant { value: 0.0 },
                        detuning: BuiltWaveform::Constant {
                            value: detuning.resolve(values)?,
                        },
                        phase: 0.0,
                    });
                    t_dmm = start + duration;
                }
            }
        }

        let num_qubits = self.layout.num_qubits();
        Ok(BuiltSequence {
            pulses,
            total_duration: t_global.max(t_dmm),
            coords: self.layout.coords.clone(),
            dmm_weights: self
                .detuning_map
                .as_ref()
                .map_or_else(|| vec![0.0; num_qubits], |m| m.weights_for(num_qubits)),
            interaction_coeff: self.interaction_coeff,
        })
    }
}

fn checked_duration(duration: f64) -> CompileResult<f64> {
    if duration < 0.0 || duration.is_nan() {
        return Err(CompileError::InvalidDuration(duration));
    }
    Ok(duration)
}
