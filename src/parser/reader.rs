use crate::error::{MdlError, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Little-endian cursor over an immutable byte buffer.
///
/// Every read either consumes exactly the bytes it decodes or fails with
/// `TruncatedInput` and leaves the cursor untouched.
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(MdlError::TruncatedInput {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_f32s<const N: usize>(&mut self) -> Result<[f32; N]> {
        let bytes = self.take(4 * N)?;
        let mut out = [0.0f32; N];
        LittleEndian::read_f32_into(bytes, &mut out);
        Ok(out)
    }

    pub fn read_u32s<const N: usize>(&mut self) -> Result<[u32; N]> {
        let bytes = self.take(4 * N)?;
        let mut out = [0u32; N];
        LittleEndian::read_u32_into(bytes, &mut out);
        Ok(out)
    }

    /// Reads a four-byte chunk identifier.
    pub fn read_tag(&mut self) -> Result<[u8; 4]> {
        let bytes = self.take(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Next tag without consuming it.
    pub fn peek_tag(&self) -> Option<[u8; 4]> {
        self.clone().read_tag().ok()
    }

    /// Reads a fixed-width, NUL-padded string field. The whole field is
    /// consumed; the string ends at the first NUL.
    pub fn read_cstring(&mut self, width: usize) -> Result<String> {
        let bytes = self.take(width)?;
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Splits off the next `n` bytes as their own reader.
    pub fn sub(&mut self, n: usize) -> Result<ChunkReader<'a>> {
        Ok(ChunkReader::new(self.take(n)?))
    }

    /// Splits off a record whose leading u32 size counts itself.
    pub fn inclusive_record(&mut self) -> Result<ChunkReader<'a>> {
        let size = self.read_u32()? as usize;
        if size < 4 {
            return Err(MdlError::invariant(format!(
                "record size {size} is smaller than its own header"
            )));
        }
        self.sub(size - 4)
    }

    /// The unread rest of the buffer, consuming it.
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.pos..];
        self.pos = self.data.len();
        bytes
    }
}

pub fn tag_name(tag: &[u8; 4]) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_values() {
        let bytes = [0x01, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x80, 0x3f];
        let mut r = ChunkReader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 1);
        assert_eq!(r.read_i32().unwrap(), -1);
        assert_eq!(r.read_f32().unwrap(), 1.0);
        assert!(r.is_empty());
    }

    #[test]
    fn truncated_read_keeps_cursor() {
        let mut r = ChunkReader::new(&[1, 2, 3]);
        let err = r.read_u32().unwrap_err();
        assert!(matches!(
            err,
            MdlError::TruncatedInput {
                needed: 4,
                remaining: 3
            }
        ));
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_u8().unwrap(), 1);
    }

    #[test]
    fn cstring_consumes_whole_field() {
        let mut field = b"Stand".to_vec();
        field.resize(80, 0);
        field.extend_from_slice(&7u32.to_le_bytes());
        let mut r = ChunkReader::new(&field);
        assert_eq!(r.read_cstring(80).unwrap(), "Stand");
        assert_eq!(r.read_u32().unwrap(), 7);
    }

    #[test]
    fn cstring_without_terminator_uses_width() {
        let mut r = ChunkReader::new(b"ABCDEF");
        assert_eq!(r.read_cstring(4).unwrap(), "ABCD");
        assert_eq!(r.remaining(), 2);
    }

    #[test]
    fn inclusive_record_counts_its_size_field() {
        let mut bytes = 12u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[9; 8]);
        bytes.push(42);
        let mut r = ChunkReader::new(&bytes);
        let record = r.inclusive_record().unwrap();
        assert_eq!(record.remaining(), 8);
        assert_eq!(r.read_u8().unwrap(), 42);
    }
}
