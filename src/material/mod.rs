mod filter_mode;
mod flags;
mod material;

pub use filter_mode::*;
pub use flags::*;
pub use material::*;
