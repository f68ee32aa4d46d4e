//! Warcraft III model library: MDX import, an in-memory model, MDL text and
//! MDX binary output, and a builder for exporting host scenes.

pub mod animation;
pub mod builder;
pub mod error;
pub mod material;
pub mod mdl;
pub mod model;
pub mod parser;
pub mod settings;
pub mod writer;

pub use builder::ModelBuilder;
pub use error::{MdlError, Result};
pub use model::Model;
pub use settings::ExportSettings;

/// Decodes MDX bytes. Recoverable problems are logged and the affected
/// entities dropped; use [`parser::load`] to inspect them.
pub fn load_mdx(bytes: &[u8]) -> Result<Model> {
    let loaded = parser::load(bytes)?;
    for e in &loaded.errors {
        log::warn!("{e}");
    }
    Ok(loaded.model)
}

/// Encodes a model as MDX.
pub fn save_mdx(model: &Model) -> Result<Vec<u8>> {
    writer::save(model)
}

/// Serializes a model as MDL text.
pub fn save_mdl(model: &Model) -> Result<String> {
    mdl::save(model)
}
