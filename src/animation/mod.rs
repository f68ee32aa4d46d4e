// Animation curve engine: keyed tracks, evaluation, change of basis and
// keyframe reduction.

pub mod interpolation;
pub mod optimize;
pub mod transform;
pub mod types;

pub use interpolation::*;
pub use transform::{rotation_of, transform_point, transform_quat, transform_scale, transform_vector};
pub use types::*;
