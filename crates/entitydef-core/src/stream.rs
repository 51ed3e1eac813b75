//! Binary wire streams
//!
//! Fixed-width numbers are little-endian. Lengths and counts use a packed
//! integer: one byte for values below 255, otherwise `0xFF` followed by
//! three little-endian bytes.

/// Largest value a packed integer can carry
pub const MAX_PACKED_INT: u32 = 0x00FF_FFFF;

const PACKED_ESCAPE: u8 = 0xFF;

/// An append-only output stream
#[derive(Debug, Default, Clone)]
pub struct BinaryOStream {
    data: Vec<u8>,
}

macro_rules! write_le {
    ($($name:ident: $ty:ty),+ $(,)?) => {
        $(
            pub fn $name(&mut self, value: $ty) {
                self.data.extend_from_slice(&value.to_le_bytes());
            }
        )+
    };
}

impl BinaryOStream {
    pub fn new() -> Self {
        Self::default()
    }

    write_le!(
        write_u8: u8,
        write_u16: u16,
        write_u32: u32,
        write_u64: u64,
        write_i8: i8,
        write_i16: i16,
        write_i32: i32,
        write_i64: i64,
        write_f32: f32,
        write_f64: f64,
    );

    /// Write a packed integer. Fails for values above `MAX_PACKED_INT`.
    pub fn write_packed_int(&mut self, value: u32) -> bool {
        if value < PACKED_ESCAPE as u32 {
            self.data.push(value as u8);
            true
        } else if value <= MAX_PACKED_INT {
            self.data.push(PACKED_ESCAPE);
            self.data.extend_from_slice(&value.to_le_bytes()[..3]);
            true
        } else {
            log::error!("BinaryOStream: value {} too large for a packed integer", value);
            false
        }
    }

    /// Write a packed length followed by the raw bytes
    pub fn write_blob(&mut self, bytes: &[u8]) -> bool {
        let Ok(len) = u32::try_from(bytes.len()) else {
            return false;
        };
        if !self.write_packed_int(len) {
            return false;
        }
        self.data.extend_from_slice(bytes);
        true
    }

    /// Write raw bytes with no length prefix
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

/// A read cursor over borrowed bytes.
///
/// Reads past the end return `None` and set a sticky error flag that
/// stays set for the rest of the stream's life.
#[derive(Debug, Clone)]
pub struct BinaryIStream<'a> {
    data: &'a [u8],
    pos: usize,
    error: bool,
}

macro_rules! read_le {
    ($($name:ident: $ty:ty),+ $(,)?) => {
        $(
            pub fn $name(&mut self) -> Option<$ty> {
                const N: usize = std::mem::size_of::<$ty>();
                let bytes = self.retrieve(N)?;
                let mut buf = [0u8; N];
                buf.copy_from_slice(bytes);
                Some(<$ty>::from_le_bytes(buf))
            }
        )+
    };
}

impl<'a> BinaryIStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            error: false,
        }
    }

    read_le!(
        read_u8: u8,
        read_u16: u16,
        read_u32: u32,
        read_u64: u64,
        read_i8: i8,
        read_i16: i16,
        read_i32: i32,
        read_i64: i64,
        read_f32: f32,
        read_f64: f64,
    );

    pub fn read_packed_int(&mut self) -> Option<u32> {
        let first = self.read_u8()?;
        if first != PACKED_ESCAPE {
            return Some(first as u32);
        }
        let bytes = self.retrieve(3)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]))
    }

    /// Read a packed length and that many bytes
    pub fn read_blob(&mut self) -> Option<&'a [u8]> {
        let len = self.read_packed_int()? as usize;
        self.retrieve(len)
    }

    /// Hand out the next `len` bytes, advancing past them
    pub fn retrieve(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.error || self.remaining_length() < len {
            self.error = true;
            return None;
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Some(bytes)
    }

    pub fn remaining_length(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn error(&self) -> bool {
        self.error
    }

    pub fn set_error(&mut self) {
        self.error = true;
    }

    /// True once every byte has been consumed without error
    pub fn is_finished(&self) -> bool {
        !self.error && self.remaining_length() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_little_endian() {
        let mut out = BinaryOStream::new();
        out.write_i32(5);
        out.write_u16(0x0102);
        assert_eq!(out.data(), &[5, 0, 0, 0, 0x02, 0x01]);

        let mut input = BinaryIStream::new(out.data());
        assert_eq!(input.read_i32(), Some(5));
        assert_eq!(input.read_u16(), Some(0x0102));
        assert!(input.is_finished());
    }

    #[test]
    fn test_packed_int_forms() {
        let mut out = BinaryOStream::new();
        assert!(out.write_packed_int(254));
        assert!(out.write_packed_int(255));
        assert!(out.write_packed_int(MAX_PACKED_INT));
        assert!(!out.write_packed_int(MAX_PACKED_INT + 1));
        assert_eq!(out.data(), &[254, 0xFF, 255, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);

        let mut input = BinaryIStream::new(out.data());
        assert_eq!(input.read_packed_int(), Some(254));
        assert_eq!(input.read_packed_int(), Some(255));
        assert_eq!(input.read_packed_int(), Some(MAX_PACKED_INT));
        assert!(input.is_finished());
    }

    #[test]
    fn test_blob() {
        let mut out = BinaryOStream::new();
        assert!(out.write_blob(b"hi"));
        assert_eq!(out.data(), &[2, b'h', b'i']);
        let mut input = BinaryIStream::new(out.data());
        assert_eq!(input.read_blob(), Some(&b"hi"[..]));
    }

    #[test]
    fn test_underflow_is_sticky() {
        let bytes = [1u8, 2];
        let mut input = BinaryIStream::new(&bytes);
        assert_eq!(input.read_u32(), None);
        assert!(input.error());
        // Enough bytes remain for a u8, but the stream has already failed
        assert_eq!(input.read_u8(), None);
        assert!(!input.is_finished());
    }

    #[test]
    fn test_truncated_blob() {
        let bytes = [5u8, b'a', b'b'];
        let mut input = BinaryIStream::new(&bytes);
        assert!(input.read_blob().is_none());
        assert!(input.error());
    }
}
