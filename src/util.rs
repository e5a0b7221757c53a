use crate::error::{FormatError, Result};
use log::warn;

/// Default cap on NUL-terminated strings in debug sections
pub const MAX_STRING_LEN: usize = 8192;

/// A forward/backward seekable little-endian cursor over an in-memory resource
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub fn at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Move to an absolute offset. Seeking past the end is allowed; reads will fail.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }

    /// Bytes from the current position to the end
    pub fn rest(&self) -> &'a [u8] {
        self.bytes.get(self.pos..).unwrap_or(&[])
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(FormatError::UnexpectedEof {
                offset: self.pos,
                wanted: n - self.remaining(),
            }),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Peek a u32 without moving the cursor
    pub fn peek_u32_at(&self, pos: usize) -> Option<u32> {
        let b = self.bytes.get(pos..pos.checked_add(4)?)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a NUL-terminated string of at most `max` bytes.
    ///
    /// When no terminator shows up within `max` bytes the string is cut
    /// there and the cursor is left just after the last byte taken.
    pub fn read_cstring(&mut self, max: usize) -> Result<String> {
        let start = self.pos;
        let mut buf = Vec::new();
        loop {
            if buf.len() >= max {
                warn!(
                    "string at ${:04x} exceeds {} bytes, truncating",
                    start, max
                );
                break;
            }
            let ch = self.read_u8()?;
            if ch == 0 {
                break;
            }
            buf.push(ch);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Require `n` zero bytes
    pub fn expect_zeros(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            let offset = self.pos;
            let value = self.read_u8()?;
            if value != 0 {
                return Err(FormatError::NonZeroPadding { offset, value });
            }
        }
        Ok(())
    }

    /// Round the cursor up to the next multiple of `align`
    pub fn align_to(&mut self, align: usize) {
        self.pos += (align - self.pos % align) % align;
    }
}

/// Sign-extend `x` using its `bit`th bit
pub fn sign_extend(x: u32, bit: u32) -> i32 {
    let shift = 31 - bit;
    ((x << shift) as i32) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_reads() {
        let bytes = [0x78, 0x56, 0x34, 0x12, 0xcd, 0xab, 0x7f];
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 0x12345678);
        assert_eq!(r.read_u16().unwrap(), 0xabcd);
        assert_eq!(r.read_u8().unwrap(), 0x7f);
        assert!(r.at_end());
        assert_eq!(
            r.read_u8(),
            Err(FormatError::UnexpectedEof { offset: 7, wanted: 1 })
        );
    }

    #[test]
    fn test_cstring_limits() {
        let bytes = b"main.scr\0abcdef";
        let mut r = ByteReader::new(bytes);
        assert_eq!(r.read_cstring(MAX_STRING_LEN).unwrap(), "main.scr");
        assert_eq!(r.position(), 9);
        assert_eq!(r.read_cstring(3).unwrap(), "abc");
        assert_eq!(r.position(), 12);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0x3f, 6), 63);
        assert_eq!(sign_extend(0x40, 6), -64);
        assert_eq!(sign_extend(0x7f, 6), -1);
        assert_eq!(sign_extend(0x8000, 15), -32768);
        assert_eq!(sign_extend(0x1234, 15), 0x1234);
    }

    #[test]
    fn test_alignment() {
        let bytes = [0u8; 16];
        let mut r = ByteReader::new(&bytes);
        r.seek(5);
        r.align_to(4);
        assert_eq!(r.position(), 8);
        r.align_to(4);
        assert_eq!(r.position(), 8);
    }
}
