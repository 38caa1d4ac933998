//! Register description: qubit count and layout hints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Key of the register option selecting the initial basis state.
pub const INITIAL_STATE: &str = "initial_state";

/// Lattice family of a register layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridType {
    /// Atoms along one line.
    Linear,
    /// Atoms on a square lattice.
    Square,
    /// Atoms on a triangular lattice.
    Triangular,
}

impl GridType {
    /// Lowercase name of the grid type.
    pub fn name(&self) -> &'static str {
        match self {
            GridType::Linear => "linear",
            GridType::Square => "square",
            GridType::Triangular => "triangular",
        }
    }
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Abstract qubit positions, in grid units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QubitPositions {
    /// Two-dimensional integer coordinates.
    Coords(Vec<(i32, i32)>),
    /// Positions along a line.
    Indices(Vec<usize>),
}

impl Default for QubitPositions {
    fn default() -> Self {
        QubitPositions::Coords(Vec::new())
    }
}

impl QubitPositions {
    /// Number of positions given.
    pub fn len(&self) -> usize {
        match self {
            QubitPositions::Coords(c) => c.len(),
            QubitPositions::Indices(i) => i.len(),
        }
    }

    /// Check whether no positions were given.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn default_grid_scale() -> f64 {
    1.0
}

/// Register allocation: qubit count, positions and grid metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocQubits {
    /// Logical qubit count.
    pub num_qubits: usize,
    /// Optional position hints; empty means "lay out on a line".
    #[serde(default)]
    pub qubit_positions: QubitPositions,
    /// Requested grid type; `None` lets the device decide.
    #[serde(default)]
    pub grid_type: Option<GridType>,
    /// Multiplier on the device's standard spacing.
    #[serde(default = "default_grid_scale")]
    pub grid_scale: f64,
    /// Free-form backend options such as `initial_state`.
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl AllocQubits {
    /// Register of `num_qubits` with no layout hints.
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            qubit_positions: QubitPositions::default(),
            grid_type: None,
            grid_scale: default_grid_scale(),
            options: serde_json::Map::new(),
        }
    }

    /// Set explicit coordinates.
    #[must_use]
    pub fn with_coords(mut self, coords: Vec<(i32, i32)>) -> Self {
        self.qubit_positions = QubitPositions::Coords(coords);
        self
    }

    /// Set positions along a line.
    #[must_use]
    pub fn with_indices(mut self, indices: Vec<usize>) -> Self {
        self.qubit_positions = QubitPositions::Indices(indices);
        self
    }

    /// Request a grid type.
    #[must_use]
    pub fn with_grid_type(mut self, grid_type: GridType) -> Self {
        self.grid_type = Some(grid_type);
        self
    }

    /// Set the grid scale.
    #[must_use]
    pub fn with_grid_scale(mut self, scale: f64) -> Self {
        self.grid_scale = scale;
        self
    }

    /// Set a register option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Requested initial basis state, as a bitstring with qubit 0 first.
    ///
    /// `None` when the option is unset or not a string.
    pub fn initial_state(&self) -> Option<&str> {
        self.options.get(INITIAL_STATE).and_then(|v| v.as_str())
    }

    /// Coordinates in grid units, one per qubit.
    ///
    /// Without explicit positions the qubits are centred on a line:
    /// qubit `p` sits at `(p - n/2, 0)` with integer division.
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        match &self.qubit_positions {
            QubitPositions::Coords(coords) if !coords.is_empty() => coords
                .iter()
                .map(|&(x, y)| (f64::from(x), f64::from(y)))
                .collect(),
            QubitPositions::Indices(indices) if !indices.is_empty() => {
                indices.iter().map(|&i| (i as f64, 0.0)).collect()
            }
            _ => {
                let half = (self.num_qubits / 2) as f64;
                (0..self.num_qubits).map(|p| (p as f64 - half, 0.0)).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_coordinates_centred() {
        let reg = AllocQubits::new(4);
        assert_eq!(
            reg.coordinates(),
            vec![(-2.0, 0.0), (-1.0, 0.0), (0.0, 0.0), (1.0, 0.0)]
        );
    }

    #[test]
    fn test_indices_on_line() {
        let reg = AllocQubits::new(2).with_indices(vec![0, 3]);
        assert_eq!(reg.coordinates(), vec![(0.0, 0.0), (3.0, 0.0)]);
    }

    #[test]
    fn test_initial_state_option() {
        let reg = AllocQubits::new(2).with_option(INITIAL_STATE, serde_json::json!("10"));
        assert_eq!(reg.initial_state(), Some("10"));
    }

    #[test]
    fn test_register_defaults_from_json() {
        let reg: AllocQubits = serde_json::from_str(r#"{"num_qubits": 3}"#).unwrap();
        assert_eq!(reg.grid_scale, 1.0);
        assert!(reg.qubit_positions.is_empty());
        assert_eq!(reg.grid_type, None);
    }

    #[test]
    fn test_grid_type_names() {
        let g: GridType = serde_json::from_str(r#""triangular""#).unwrap();
        assert_eq!(g, GridType::Triangular);
        assert_eq!(GridType::Square.to_string(), "square");
    }
}
