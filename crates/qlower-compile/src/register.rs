//! Register resolution: from abstract qubit positions to a native register.
//!
//! Digital backends only need a qubit count and an optional initial basis
//! state. Analog backends place atoms: the model coordinates are transformed
//! according to the grid type, scaled to the device trap spacing and snapped
//! onto the device's calibrated trap layout.

use qlower_ir::{GridType, INITIAL_STATE, Model};
use serde::Serialize;
use tracing::debug;

use crate::device::DeviceSettings;
use crate::error::{CompileError, CompileResult};
use crate::warning::CompatibilityWarning;

/// Row-major matrix mapping grid units onto a triangular lattice.
const TRIANGULAR_TRANSFORM: [[f64; 2]; 2] = [[1.0, 0.0], [0.5, 0.866_025_403_784_438_6]];

/// Register of a gate-based backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QubitRegister {
    /// Number of qubits.
    pub num_qubits: usize,
    /// Initial basis state, qubit 0 first.
    pub initial_state: Option<String>,
}

/// Atom placement on a device's calibrated layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeLayout {
    /// Registry name of the device.
    pub device: String,
    /// Grid type actually used.
    pub grid_type: GridType,
    /// Grid scale actually used.
    pub grid_scale: f64,
    /// Trap id assigned to each qubit.
    pub trap_ids: Vec<usize>,
    /// Physical position of each qubit (µm).
    pub coords: Vec<(f64, f64)>,
}

impl NativeLayout {
    /// Number of atoms.
    pub fn num_qubits(&self) -> usize {
        self.coords.len()
    }

    /// Distance between two atoms (µm).
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        let (xa, ya) = self.coords[a];
        let (xb, yb) = self.coords[b];
        (xa - xb).hypot(ya - yb)
    }
}

/// A backend-native register.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NativeRegister {
    /// Plain qubits.
    Qubits(QubitRegister),
    /// Atoms on a calibrated layout.
    Atoms(NativeLayout),
}

impl NativeRegister {
    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        match self {
            NativeRegister::Qubits(r) => r.num_qubits,
            NativeRegister::Atoms(l) => l.num_qubits(),
        }
    }

    /// The atom layout, for analog registers.
    pub fn layout(&self) -> Option<&NativeLayout> {
        match self {
            NativeRegister::Atoms(l) => Some(l),
            NativeRegister::Qubits(_) => None,
        }
    }
}

/// Turns a model's register description into a native register.
pub trait RegisterResolver: Send + Sync {
    /// Resolve the register, appending advisories to `warnings`.
    fn resolve(
        &self,
        model: &Model,
        warnings: &mut Vec<CompatibilityWarning>,
    ) -> CompileResult<NativeRegister>;
}

/// Resolver for gate-based backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct QubitRegisterResolver;

impl RegisterResolver for QubitRegisterResolver {
    fn resolve(
        &self,
        model: &Model,
        _warnings: &mut Vec<CompatibilityWarning>,
    ) -> CompileResult<NativeRegister> {
        let num_qubits = model.num_qubits();
        if num_qubits == 0 {
            return Err(CompileError::EmptyRegister);
        }

        let invalid = |state: String| CompileError::InvalidInitialState { state, num_qubits };
        let initial_state = match model.register().options.get(INITIAL_STATE) {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(state)) => {
                if state.len() != num_qubits || !state.chars().all(|c| c == '0' || c == '1') {
                    return Err(invalid(state.clone()));
                }
                Some(state.clone())
            }
            Some(other) => return Err(invalid(other.to_string())),
        };

        Ok(NativeRegister::Qubits(QubitRegister {
            num_qubits,
            initial_state,
        }))
    }
}

/// Resolver placing atoms on a device's calibrated layout.
#[derive(Debug, Clone, Copy)]
pub struct GeometryResolver {
    device: &'static DeviceSettings,
}

impl GeometryResolver {
    /// Create a resolver for `device`.
    pub fn new(device: &'static DeviceSettings) -> Self {
        Self { device }
    }

    /// Resolve the model's register into an atom layout.
    pub fn resolve_layout(
        &self,
        model: &Model,
        warnings: &mut Vec<CompatibilityWarning>,
    ) -> CompileResult<NativeLayout> {
        let device = self.device;
        let register = model.register();
        let num_qubits = register.num_qubits;
        if num_qubits == 0 {
            return Err(CompileError::EmptyRegister);
        }

        let grid_type = match register.grid_type {
            Some(requested) if !device.supports_grid_type(requested) => {
                CompatibilityWarning::UnsupportedGridType {
                    device: device.name.to_string(),
                    requested,
                    fallback: device.default_grid_type,
                }
                .emit(warnings);
                device.default_grid_type
            }
            Some(requested) => requested,
            None => device.default_grid_type,
        };

        let (min, max) = device.grid_scale_range;
        let grid_scale = if device.scale_in_range(register.grid_scale) {
            register.grid_scale
        } else {
            let applied = register.grid_scale.clamp(min, max);
            CompatibilityWarning::GridScaleOutOfRange {
                device: device.name.to_string(),
                requested: register.grid_scale,
                applied,
                range: (min, max),
            }
            .emit(warnings);
            applied
        };

        for directive in model.active_directives() {
            if !device.supports_directive(directive) {
                CompatibilityWarning::UnsupportedDirective {
                    device: device.name.to_string(),
                    directive: directive.to_string(),
                    consequence: device.advisory(directive),
                }
                .emit(warnings);
            }
        }

        let available = device.capacity(grid_type);
        let layout = match device.calibrated_layout(grid_type) {
            Some(layout) if num_qubits <= available => layout,
            _ => {
                return Err(CompileError::LayoutOverflow {
                    device: device.name_short.to_string(),
                    requested: num_qubits,
                    available,
                });
            }
        };

        let targets: Vec<(f64, f64)> = register
            .coordinates()
            .into_iter()
            .map(|c| {
                let (x, y) = transform(c, grid_type, grid_scale);
                (x * layout.spacing(), y * layout.spacing())
            })
            .collect();

        let trap_ids = snap_to_traps(&targets, layout.traps());
        let coords = trap_ids.iter().map(|&id| layout.traps()[id]).collect();
        debug!(
            "Placed {} atoms on {} {} layout: traps {:?}",
            num_qubits, device.name, grid_type, trap_ids
        );

        Ok(NativeLayout {
            device: device.name_short.to_string(),
            grid_type,
            grid_scale,
            trap_ids,
            coords,
        })
    }
}

impl RegisterResolver for GeometryResolver {
    fn resolve(
        &self,
        model: &Model,
        warnings: &mut Vec<CompatibilityWarning>,
    ) -> CompileResult<NativeRegister> {
        self.resolve_layout(model, warnings)
            .map(NativeRegister::Atoms)
    }
}

/// Map grid units to lattice units.
fn transform((x, y): (f64, f64), grid_type: GridType, scale: f64) -> (f64, f64) {
    match grid_type {
        GridType::Linear => (x, y),
        GridType::Square => (x * scale, y * scale),
        GridType::Triangular => {
            let (x, y) = (x * scale, y * scale);
            let m = TRIANGULAR_TRANSFORM;
            (x * m[0][0] + y * m[1][0], x * m[0][1] + y * m[1][1])
        }
    }
}

/// Greedy nearest-free-trap assignment in input order.
///
/// Ties resolve to the lower trap id. The caller guarantees there are at
/// least as many traps as targets.
fn snap_to_traps(targets: &[(f64, f64)], traps: &[(f64, f64)]) -> Vec<usize> {
    let mut taken = vec![false; traps.len()];
    let mut ids = Vec::with_capacity(targets.len());
    for &(tx, ty) in targets {
        let mut best: Option<(usize, f64)> = None;
        for (id, &(x, y)) in traps.iter().enumerate() {
            if taken[id] {
                continue;
            }
            let d = (x - tx).powi(2) + (y - ty).powi(2);
            if best.is_none_or(|(_, bd)| d < bd - 1e-9) {
                best = Some((id, d));
            }
        }
        if let Some((id, _)) = best {
            taken[id] = true;
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ANALOG_DEVICE, FRESNEL1};
    use qlower_ir::AllocQubits;

    fn model(register: AllocQubits) -> Model {
        Model::builder(register).build().unwrap()
    }

    #[test]
    fn test_triangular_transform() {
        let (x, y) = transform((1.0, 1.0), GridType::Triangular, 1.0);
        assert!((x - 1.5).abs() < 1e-12);
        assert!((y - 0.866_025_403_784_438_6).abs() < 1e-12);
    }

    #[test]
    fn test_linear_ignores_scale() {
        assert_eq!(transform((2.0, 0.0), GridType::Linear, 3.0), (2.0, 0.0));
        assert_eq!(transform((2.0, 1.0), GridType::Square, 3.0), (6.0, 3.0));
    }

    #[test]
    fn test_snap_never_reuses_trap() {
        let traps = vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)];
        let ids = snap_to_traps(&[(0.1, 0.0), (0.2, 0.0)], &traps);
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_qubit_register_initial_state() {
        let reg = AllocQubits::new(2).with_option("initial_state", serde_json::json!("10"));
        let native = QubitRegisterResolver
            .resolve(&model(reg), &mut Vec::new())
            .unwrap();
        assert_eq!(
            native,
            NativeRegister::Qubits(QubitRegister {
                num_qubits: 2,
                initial_state: Some("10".into())
            })
        );

        let bad = AllocQubits::new(2).with_option("initial_state", serde_json::json!("1x"));
        assert!(matches!(
            QubitRegisterResolver.resolve(&model(bad), &mut Vec::new()),
            Err(CompileError::InvalidInitialState { .. })
        ));
    }

    #[test]
    fn test_non_string_initial_state_is_rejected() {
        for option in [serde_json::json!(10), serde_json::json!([1, 0]), serde_json::json!(true)] {
            let reg = AllocQubits::new(2).with_option("initial_state", option.clone());
            let err = QubitRegisterResolver
                .resolve(&model(reg), &mut Vec::new())
                .unwrap_err();
            assert!(matches!(
                err,
                CompileError::InvalidInitialState { ref state, num_qubits: 2 } if *state == option.to_string()
            ));
        }

        let unset = AllocQubits::new(2).with_option("initial_state", serde_json::Value::Null);
        let native = QubitRegisterResolver
            .resolve(&model(unset), &mut Vec::new())
            .unwrap();
        assert_eq!(
            native,
            NativeRegister::Qubits(QubitRegister {
                num_qubits: 2,
                initial_state: None
            })
        );
    }

    #[test]
    fn test_empty_register() {
        let resolver = GeometryResolver::new(&FRESNEL1);
        let err = resolver
            .resolve_layout(&model(AllocQubits::new(0)), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, CompileError::EmptyRegister));
    }

    #[test]
    fn test_default_line_lands_on_row() {
        let resolver = GeometryResolver::new(&ANALOG_DEVICE);
        let layout = resolver
            .resolve_layout(&model(AllocQubits::new(3)), &mut Vec::new())
            .unwrap();
        assert_eq!(layout.grid_type, GridType::Triangular);
        assert_eq!(layout.coords, vec![(-5.0, 0.0), (0.0, 0.0), (5.0, 0.0)]);
        assert!((layout.distance(0, 1) - 5.0).abs() < 1e-9);
    }
}
