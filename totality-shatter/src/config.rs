use crate::error::ConfigError;

use serde::{Deserialize, Serialize};

/// Material parameters of one lattice.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeParams {
    pub density: f32,
    pub max_cracks: usize,
    pub max_force_push: f32,
    pub max_force_pull: f32,
    pub max_force_shift: f32,
    pub max_torque_twist: f32,
    pub max_torque_bend: f32,
    /// Multiplier applied to the strength of faces next to a fresh crack.
    pub crack_weaken: f32,
}

impl Default for LatticeParams {
    fn default() -> Self {
        Self {
            density: 1.,
            max_cracks: 4,
            max_force_push: 0.01,
            max_force_pull: 0.01,
            max_force_shift: 0.01,
            max_torque_twist: 0.01,
            max_torque_bend: 0.01,
            crack_weaken: 0.4,
        }
    }
}

/// Partial update for [`LatticeParams`]; `None` leaves the current value alone.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsPatch {
    pub density: Option<f32>,
    pub max_cracks: Option<usize>,
    pub max_force_push: Option<f32>,
    pub max_force_pull: Option<f32>,
    pub max_force_shift: Option<f32>,
    pub max_torque_twist: Option<f32>,
    pub max_torque_bend: Option<f32>,
    pub crack_weaken: Option<f32>,
}

/// Tuning knobs of the lattice algorithms.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Grid cells allotted per tetrahedron when sizing the spatial grid.
    pub grid_cell_factor: f32,
    /// Cosine limit between a crack face and a neighbouring fin face for the crack to spread.
    pub fin_alignment: f32,
    pub crack_queue_capacity: usize,
    /// Total work budget of one solve, divided among the coupled faces.
    pub max_iters: usize,
    /// Convergence tolerance as a fraction of the per-step gravity velocity.
    pub residual_fraction: f32,
    /// Lower bound of the convergence tolerance, used when gravity is weak or absent.
    pub min_residual: f32,
    pub max_cg_step: f64,
    /// Removed fraction of tetrahedra above which the array is compacted.
    pub defragment_threshold: f32,
    /// Strength margin gained by a face whose crack geometry could not be cut.
    pub reinforce_factor: f32,
    pub min_chunk_tets: usize,
    pub id_mat: i32,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            grid_cell_factor: 4.,
            fin_alignment: 0.75,
            crack_queue_capacity: 32,
            max_iters: 100_000,
            residual_fraction: 0.05,
            min_residual: 1e-6,
            max_cg_step: 50.,
            defragment_threshold: 0.7,
            reinforce_factor: 1.5,
            min_chunk_tets: 2,
            id_mat: 0,
        }
    }
}

impl LatticeConfig {
    pub fn from_json(src: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(src)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid_cell_factor > 0.) {
            return Err(ConfigError::Invalid {
                field: "grid_cell_factor",
                reason: "must be positive",
            });
        }
        if !(0. ..=1.).contains(&self.fin_alignment) {
            return Err(ConfigError::Invalid {
                field: "fin_alignment",
                reason: "must be a cosine in [0, 1]",
            });
        }
        if self.crack_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "crack_queue_capacity",
                reason: "must hold at least the seed face",
            });
        }
        if !(0. ..=1.).contains(&self.defragment_threshold) {
            return Err(ConfigError::Invalid {
                field: "defragment_threshold",
                reason: "must be a fraction in [0, 1]",
            });
        }
        if !(self.reinforce_factor >= 1.) {
            return Err(ConfigError::Invalid {
                field: "reinforce_factor",
                reason: "must not weaken the face",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = LatticeConfig::from_json(r#"{ "crack_queue_capacity": 8, "id_mat": 3 }"#).unwrap();
        assert_eq!(cfg.crack_queue_capacity, 8);
        assert_eq!(cfg.id_mat, 3);
        assert_eq!(cfg.fin_alignment, LatticeConfig::default().fin_alignment);
    }

    #[test]
    fn rejects_out_of_range_values() {
        match LatticeConfig::from_json(r#"{ "fin_alignment": 1.5 }"#) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "fin_alignment"),
            other => panic!("expected a validation error, got {:?}", other),
        }
        assert!(matches!(
            LatticeConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn params_round_trip_through_json() {
        let params = LatticeParams {
            max_cracks: 9,
            ..Default::default()
        };
        let text = serde_json::to_string(&params).unwrap();
        let back: LatticeParams = serde_json::from_str(&text).unwrap();
        assert_eq!(back, params);
    }
}
