//! MDL text output.

mod format;
mod serializer;
mod writer;

pub use format::{Float, Vector, PRECISION};
pub use serializer::save;
pub use writer::MdlWriter;
