use crate::error::Result;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

/// Little-endian byte sink with size-prefixed framing.
#[derive(Debug, Default)]
pub struct ChunkWriter {
    buf: Vec<u8>,
}

impl ChunkWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.buf.write_u8(v)?;
        Ok(())
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.buf.write_u16::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.buf.write_u32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.buf.write_i32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.buf.write_f32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_f32s(&mut self, values: &[f32]) -> Result<()> {
        for v in values {
            self.write_f32(*v)?;
        }
        Ok(())
    }

    pub fn write_u32s(&mut self, values: &[u32]) -> Result<()> {
        for v in values {
            self.write_u32(*v)?;
        }
        Ok(())
    }

    pub fn write_tag(&mut self, tag: [u8; 4]) -> Result<()> {
        self.buf.extend_from_slice(&tag);
        Ok(())
    }

    /// Writes `s` NUL-padded to exactly `width` bytes. Longer strings are
    /// cut so the field still ends in a NUL.
    pub fn write_cstring(&mut self, s: &str, width: usize) -> Result<()> {
        let bytes = s.as_bytes();
        let len = bytes.len().min(width.saturating_sub(1));
        if len < bytes.len() {
            log::warn!("'{s}' truncated to {len} bytes");
        }
        self.buf.extend_from_slice(&bytes[..len]);
        self.buf.resize(self.buf.len() + (width - len), 0);
        Ok(())
    }

    fn patch_u32(&mut self, at: usize, v: u32) {
        LittleEndian::write_u32(&mut self.buf[at..at + 4], v);
    }

    /// Writes `tag`, a size placeholder, then the body; the size excludes
    /// the eight header bytes.
    pub fn chunk(
        &mut self,
        tag: [u8; 4],
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.write_tag(tag)?;
        let at = self.buf.len();
        self.write_u32(0)?;
        body(self)?;
        let size = self.buf.len() - at - 4;
        self.patch_u32(at, size as u32);
        Ok(())
    }

    /// Writes a record whose leading u32 size counts itself.
    pub fn inclusive(&mut self, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let at = self.buf.len();
        self.write_u32(0)?;
        body(self)?;
        let size = self.buf.len() - at;
        self.patch_u32(at, size as u32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ChunkReader;

    #[test]
    fn chunk_size_excludes_header() {
        let mut w = ChunkWriter::new();
        w.chunk(*b"GLBS", |w| {
            w.write_u32(270)?;
            w.write_u32(1000)
        })
        .unwrap();
        let bytes = w.into_inner();
        assert_eq!(&bytes[..4], b"GLBS");
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 8);
        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn inclusive_record_reads_back() {
        let mut w = ChunkWriter::new();
        w.inclusive(|w| w.write_f32(0.5)).unwrap();
        let bytes = w.into_inner();
        let mut r = ChunkReader::new(&bytes);
        let mut record = r.inclusive_record().unwrap();
        assert_eq!(record.read_f32().unwrap(), 0.5);
        assert!(r.is_empty());
    }

    #[test]
    fn cstring_is_padded_and_terminated() {
        let mut w = ChunkWriter::new();
        w.write_cstring("Bone_Root", 16).unwrap();
        w.write_cstring("ABCDEFGH", 4).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), 20);
        let mut r = ChunkReader::new(&bytes);
        assert_eq!(r.read_cstring(16).unwrap(), "Bone_Root");
        assert_eq!(r.read_cstring(4).unwrap(), "ABC");
    }
}
