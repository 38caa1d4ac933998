//! Physical device settings and calibrated trap layouts.
//!
//! Devices are process-wide immutable tables built on first use. A device
//! describes what the register resolver may accept (grid types, scale range,
//! directives), where atoms can physically sit (one calibrated layout per
//! grid type) and the limits of its drive channels.

use std::f64::consts::PI;
use std::sync::LazyLock;

use qlower_ir::GridType;
use serde::Serialize;

/// Amplitude used when a channel does not publish a limit (rad/µs).
pub const DEFAULT_AMPLITUDE: f64 = 4.0 * PI;

/// Detuning used when a channel does not publish a limit (rad/µs).
pub const DEFAULT_DETUNING: f64 = 10.0 * PI;

/// Name of the global Rydberg channel.
pub const GLOBAL_CHANNEL: &str = "rydberg_global";

/// Name of the local detuning-modulation channel.
pub const DMM_CHANNEL: &str = "dmm_0";

/// Directive naming the locally addressed qubits.
pub const LOCAL_TARGETS: &str = "local_targets";

/// Directive carrying per-target detuning shifts.
pub const LOCAL_SHIFTS: &str = "local_shifts";

/// Directive switching on digital-analog mode.
pub const ENABLE_DIGITAL_ANALOG: &str = "enable_digital_analog";

/// Standard trap spacing of the calibrated layouts (µm).
const TRAP_SPACING: f64 = 5.0;

/// Van der Waals coefficient for the n = 60 Rydberg level (rad·µm⁶/µs).
const C6_N60: f64 = 865_723.02;

/// Limits of the global Rydberg channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelLimits {
    /// Maximum Rabi frequency (rad/µs), if bounded.
    pub max_amp: Option<f64>,
    /// Maximum absolute detuning (rad/µs), if bounded.
    pub max_abs_detuning: Option<f64>,
    /// Clock period (ns).
    pub clock_period: u32,
    /// Shortest pulse (ns).
    pub min_duration: u32,
    /// Whether pulses are played in EOM mode.
    pub eom: bool,
}

impl ChannelLimits {
    /// Maximum amplitude, or [`DEFAULT_AMPLITUDE`] when unbounded.
    pub fn amplitude(&self) -> f64 {
        self.max_amp.unwrap_or(DEFAULT_AMPLITUDE)
    }

    /// Maximum absolute detuning, or [`DEFAULT_DETUNING`] when unbounded.
    pub fn detuning(&self) -> f64 {
        self.max_abs_detuning.unwrap_or(DEFAULT_DETUNING)
    }
}

/// Limits of the detuning-modulation channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DmmLimits {
    /// Most negative detuning applied to one atom (rad/µs).
    pub bottom_detuning: f64,
    /// Most negative detuning summed over all atoms (rad/µs).
    pub total_bottom_detuning: Option<f64>,
}

/// A calibrated set of trap positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrapLayout {
    grid_type: GridType,
    spacing: f64,
    traps: Vec<(f64, f64)>,
}

impl TrapLayout {
    /// `n` traps on a centred line.
    pub fn line(n: usize, spacing: f64) -> Self {
        let half = (n / 2) as f64;
        let traps = (0..n)
            .map(|i| ((i as f64 - half) * spacing, 0.0))
            .collect();
        Self {
            grid_type: GridType::Linear,
            spacing,
            traps,
        }
    }

    /// A centred `side` x `side` square lattice.
    pub fn square(side: usize, spacing: f64) -> Self {
        let half = (side / 2) as f64;
        let mut traps = Vec::with_capacity(side * side);
        for row in 0..side {
            for col in 0..side {
                traps.push(((col as f64 - half) * spacing, (row as f64 - half) * spacing));
            }
        }
        Self {
            grid_type: GridType::Square,
            spacing,
            traps,
        }
    }

    /// A hexagon-shaped triangular lattice with `rings` rings around the centre.
    ///
    /// Holds `1 + 3 * rings * (rings + 1)` traps, ordered row by row.
    pub fn triangular(rings: i32, spacing: f64) -> Self {
        let height = 3f64.sqrt() / 2.0;
        let mut traps = Vec::new();
        for r in -rings..=rings {
            for q in -rings..=rings {
                if (q + r).abs() > rings {
                    continue;
                }
                let x = (f64::from(q) + 0.5 * f64::from(r)) * spacing;
                let y = f64::from(r) * height * spacing;
                traps.push((x, y));
            }
        }
        Self {
            grid_type: GridType::Triangular,
            spacing,
            traps,
        }
    }

    /// Lattice family.
    pub fn grid_type(&self) -> GridType {
        self.grid_type
    }

    /// Nearest-neighbour distance (µm).
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Trap coordinates (µm), indexed by trap id.
    pub fn traps(&self) -> &[(f64, f64)] {
        &self.traps
    }

    /// Number of traps.
    pub fn len(&self) -> usize {
        self.traps.len()
    }

    /// Check whether the layout has no traps.
    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }
}

/// Settings of one physical device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSettings {
    /// Display name.
    pub name: &'static str,
    /// Registry name.
    pub name_short: &'static str,
    /// Grid types the device can lay out.
    pub available_grid_types: &'static [GridType],
    /// Grid type used when the model does not choose one.
    pub default_grid_type: GridType,
    /// Accepted `(min, max)` grid scale.
    pub grid_scale_range: (f64, f64),
    /// Directives the device honours.
    pub available_directives: &'static [&'static str],
    /// Expected behaviour when a given directive is not honoured.
    pub directive_advisories: &'static [(&'static str, &'static str)],
    /// Calibrated layouts, one per available grid type.
    pub calibrated_layouts: Vec<TrapLayout>,
    /// Maximum number of atoms in a register.
    pub max_atom_num: usize,
    /// Global Rydberg channel limits.
    pub global: ChannelLimits,
    /// Detuning-modulation channel, if any.
    pub dmm: Option<DmmLimits>,
    /// Interaction coefficient C6 (rad·µm⁶/µs).
    pub interaction_coeff: f64,
    /// Whether array-valued parameters may drive pulses.
    pub supports_time_modulation: bool,
}

impl DeviceSettings {
    /// Check whether `grid_type` is available.
    pub fn supports_grid_type(&self, grid_type: GridType) -> bool {
        self.available_grid_types.contains(&grid_type)
    }

    /// Check whether `scale` lies inside the grid scale range.
    pub fn scale_in_range(&self, scale: f64) -> bool {
        self.grid_scale_range.0 <= scale && scale <= self.grid_scale_range.1
    }

    /// Check whether a directive is honoured.
    pub fn supports_directive(&self, directive: &str) -> bool {
        self.available_directives.contains(&directive)
    }

    /// Description of what happens when `directive` is ignored.
    pub fn advisory(&self, directive: &str) -> String {
        self.directive_advisories
            .iter()
            .find(|(name, _)| *name == directive)
            .map_or_else(
                || "the directive is ignored".to_string(),
                |(_, text)| (*text).to_string(),
            )
    }

    /// Calibrated layout for a grid type.
    pub fn calibrated_layout(&self, grid_type: GridType) -> Option<&TrapLayout> {
        self.calibrated_layouts
            .iter()
            .find(|l| l.grid_type() == grid_type)
    }

    /// Number of qubits a layout of `grid_type` can hold.
    pub fn capacity(&self, grid_type: GridType) -> usize {
        self.calibrated_layout(grid_type)
            .map_or(0, |l| l.len().min(self.max_atom_num))
    }
}

fn analog_global_channel(eom: bool) -> ChannelLimits {
    ChannelLimits {
        max_amp: Some(2.0 * PI * 2.0),
        max_abs_detuning: Some(2.0 * PI * 20.0),
        clock_period: 4,
        min_duration: 16,
        eom,
    }
}

/// General-purpose analog neutral-atom device.
pub static ANALOG_DEVICE: LazyLock<DeviceSettings> = LazyLock::new(|| DeviceSettings {
    name: "AnalogDevice",
    name_short: "analog-device",
    available_grid_types: &[GridType::Linear, GridType::Triangular, GridType::Square],
    default_grid_type: GridType::Triangular,
    grid_scale_range: (1.0, 10.0),
    available_directives: &[LOCAL_TARGETS, LOCAL_SHIFTS],
    directive_advisories: &[(
        ENABLE_DIGITAL_ANALOG,
        "the device has no digital channels; digital operations will be played as analog pulses",
    )],
    calibrated_layouts: vec![
        TrapLayout::line(25, TRAP_SPACING),
        TrapLayout::square(7, TRAP_SPACING),
        TrapLayout::triangular(4, TRAP_SPACING),
    ],
    max_atom_num: 25,
    global: analog_global_channel(false),
    dmm: Some(DmmLimits {
        bottom_detuning: -2.0 * PI * 20.0,
        total_bottom_detuning: None,
    }),
    interaction_coeff: C6_N60,
    supports_time_modulation: true,
});

/// Fresnel-1: fixed triangular grid, EOM-mode global channel.
pub static FRESNEL1: LazyLock<DeviceSettings> = LazyLock::new(|| DeviceSettings {
    name: "Fresnel-1",
    name_short: "fresnel1",
    available_grid_types: &[GridType::Triangular],
    default_grid_type: GridType::Triangular,
    grid_scale_range: (1.0, 1.0),
    available_directives: &[LOCAL_TARGETS, LOCAL_SHIFTS],
    directive_advisories: &[(
        ENABLE_DIGITAL_ANALOG,
        "Fresnel-1 uses a fixed grid and does not have digital channels; digital operations \
         using atomic distance-based strategies may not behave as expected",
    )],
    calibrated_layouts: vec![TrapLayout::triangular(4, TRAP_SPACING)],
    max_atom_num: 25,
    global: analog_global_channel(true),
    dmm: Some(DmmLimits {
        bottom_detuning: -2.0 * PI * 20.0,
        total_bottom_detuning: Some(-2.0 * PI * 2000.0),
    }),
    interaction_coeff: C6_N60,
    supports_time_modulation: false,
});
