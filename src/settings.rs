use crate::error::Result;
use nalgebra_glm as glm;
use serde::{Deserialize, Serialize};

pub const CONFY_APP_NAME: &str = "mdlx";
const CONFY_EXPORT_NAME: &str = "export";

pub const MIN_SCALE: f32 = 0.01;
pub const MAX_SCALE: f32 = 1000.0;
pub const MIN_TOLERANCE: f32 = 0.001;

/// A signed coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
    NegX,
    NegY,
    NegZ,
}

impl Axis {
    pub fn vector(self) -> glm::Vec3 {
        match self {
            Axis::X => glm::vec3(1.0, 0.0, 0.0),
            Axis::Y => glm::vec3(0.0, 1.0, 0.0),
            Axis::Z => glm::vec3(0.0, 0.0, 1.0),
            Axis::NegX => glm::vec3(-1.0, 0.0, 0.0),
            Axis::NegY => glm::vec3(0.0, -1.0, 0.0),
            Axis::NegZ => glm::vec3(0.0, 0.0, -1.0),
        }
    }

    fn index(self) -> usize {
        match self {
            Axis::X | Axis::NegX => 0,
            Axis::Y | Axis::NegY => 1,
            Axis::Z | Axis::NegZ => 2,
        }
    }

    pub fn is_parallel(self, other: Axis) -> bool {
        self.index() == other.index()
    }
}

/// Export options. Persisted between sessions with confy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Target forward axis; the source convention is forward +Y, up +Z
    pub axis_forward: Axis,
    pub axis_up: Axis,
    pub global_scale: f32,
    /// Write four weighted bones per vertex instead of matrix groups
    pub use_skinweights: bool,
    pub optimize_animation: bool,
    pub optimize_tolerance: f32,
    pub mdl_version: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            axis_forward: Axis::Y,
            axis_up: Axis::Z,
            global_scale: 1.0,
            use_skinweights: false,
            optimize_animation: false,
            optimize_tolerance: 0.05,
            mdl_version: 800,
        }
    }
}

impl ExportSettings {
    pub fn load() -> Self {
        match confy::load::<Self>(CONFY_APP_NAME, CONFY_EXPORT_NAME) {
            Ok(settings) => settings.sanitized(),
            Err(e) => {
                log::warn!("could not load export settings, using defaults: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        confy::store(CONFY_APP_NAME, CONFY_EXPORT_NAME, self)?;
        Ok(())
    }

    /// Clamps numeric ranges and replaces unusable values with defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.global_scale.is_finite() {
            self.global_scale = defaults.global_scale;
        }
        self.global_scale = self.global_scale.clamp(MIN_SCALE, MAX_SCALE);
        if !self.optimize_tolerance.is_finite() {
            self.optimize_tolerance = defaults.optimize_tolerance;
        }
        self.optimize_tolerance = self.optimize_tolerance.max(MIN_TOLERANCE);
        if !crate::model::is_supported_version(self.mdl_version) {
            log::warn!(
                "unsupported export version {}, using {}",
                self.mdl_version,
                defaults.mdl_version
            );
            self.mdl_version = defaults.mdl_version;
        }
        if self.axis_forward.is_parallel(self.axis_up) {
            log::warn!(
                "forward {:?} and up {:?} share an axis, using the default orientation",
                self.axis_forward,
                self.axis_up
            );
            self.axis_forward = defaults.axis_forward;
            self.axis_up = defaults.axis_up;
        }
        self
    }

    /// Axis conversion from forward +Y / up +Z to the configured axes,
    /// followed by the uniform scale.
    pub fn global_matrix(&self) -> glm::Mat4 {
        let settings = self.clone().sanitized();
        let source = glm::Mat3::from_columns(&[
            Axis::Y.vector(),
            Axis::Z.vector(),
            Axis::Y.vector().cross(&Axis::Z.vector()),
        ]);
        let forward = settings.axis_forward.vector();
        let up = settings.axis_up.vector();
        let target = glm::Mat3::from_columns(&[forward, up, forward.cross(&up)]);
        // Orthonormal, so the transpose inverts
        let rotation = target * source.transpose();
        let s = settings.global_scale;
        glm::mat3_to_mat4(&rotation) * glm::scaling(&glm::vec3(s, s, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::transform_point;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn default_orientation_only_scales() {
        let settings = ExportSettings {
            global_scale: 2.0,
            ..Default::default()
        };
        let m = settings.global_matrix();
        assert!(close(transform_point(&m, [1.0, 2.0, 3.0]), [2.0, 4.0, 6.0]));
    }

    #[test]
    fn forward_axis_is_remapped() {
        let settings = ExportSettings {
            axis_forward: Axis::NegZ,
            axis_up: Axis::Y,
            ..Default::default()
        };
        let m = settings.global_matrix();
        assert!(close(transform_point(&m, [0.0, 1.0, 0.0]), [0.0, 0.0, -1.0]));
        assert!(close(transform_point(&m, [0.0, 0.0, 1.0]), [0.0, 1.0, 0.0]));
        assert!(close(transform_point(&m, [1.0, 0.0, 0.0]), [1.0, 0.0, 0.0]));
    }

    #[test]
    fn sanitize_clamps_and_resets() {
        let settings = ExportSettings {
            global_scale: 5000.0,
            optimize_tolerance: 0.0,
            mdl_version: 700,
            axis_forward: Axis::X,
            axis_up: Axis::NegX,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.global_scale, MAX_SCALE);
        assert_eq!(settings.optimize_tolerance, MIN_TOLERANCE);
        assert_eq!(settings.mdl_version, 800);
        assert_eq!((settings.axis_forward, settings.axis_up), (Axis::Y, Axis::Z));
    }
}
