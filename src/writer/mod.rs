mod chunk_writer;
pub mod mdx;

pub use chunk_writer::ChunkWriter;
pub use mdx::save;
