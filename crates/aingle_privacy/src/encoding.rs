//! Bounded byte reader and writer for proof encodings
//!
//! Points are 32-byte compressed Ristretto encodings, scalars 32-byte
//! canonical little-endian. Multi-byte integers are big-endian.

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};

use crate::error::{PrivacyError, Result};

/// Size of a compressed point
pub const POINT_SIZE: usize = 32;

/// Size of an encoded scalar
pub const SCALAR_SIZE: usize = 32;

/// Cursor over an encoded proof
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `bytes`
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Take the next `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(PrivacyError::Decode(format!(
                "truncated input at offset {}: need {} bytes, have {}",
                self.offset,
                len,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a big-endian `u16`
    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a big-endian `u64`
    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_be_bytes(buf))
    }

    /// Read and decompress a point
    pub fn read_point(&mut self) -> Result<RistrettoPoint> {
        let offset = self.offset;
        let bytes = self.read_bytes(POINT_SIZE)?;
        decompress(bytes).map_err(|_| {
            PrivacyError::Decode(format!("invalid point at offset {}", offset))
        })
    }

    /// Read a canonical scalar
    pub fn read_scalar(&mut self) -> Result<Scalar> {
        let offset = self.offset;
        let mut buf = [0u8; SCALAR_SIZE];
        buf.copy_from_slice(self.read_bytes(SCALAR_SIZE)?);
        Option::from(Scalar::from_canonical_bytes(buf)).ok_or_else(|| {
            PrivacyError::Decode(format!("non-canonical scalar at offset {}", offset))
        })
    }

    /// Read `n` points
    pub fn read_points(&mut self, n: usize) -> Result<Vec<RistrettoPoint>> {
        (0..n).map(|_| self.read_point()).collect()
    }

    /// Read `n` scalars
    pub fn read_scalars(&mut self, n: usize) -> Result<Vec<Scalar>> {
        (0..n).map(|_| self.read_scalar()).collect()
    }

    /// Read a block prefixed by a one-byte length
    pub fn read_u8_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u8()? as usize;
        self.read_bytes(len)
    }

    /// Read a block prefixed by a two-byte length
    pub fn read_u16_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u16()? as usize;
        self.read_bytes(len)
    }

    /// Fail if any bytes are left over
    pub fn finish(self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(PrivacyError::Decode(format!(
                "{} trailing bytes",
                self.remaining()
            )));
        }
        Ok(())
    }
}

/// Growable output buffer
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer with reserved capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Append one byte
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Append a big-endian `u16`
    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Append a big-endian `u64`
    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Append raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a compressed point
    pub fn write_point(&mut self, point: &RistrettoPoint) {
        self.buf.extend_from_slice(point.compress().as_bytes());
    }

    /// Append a scalar
    pub fn write_scalar(&mut self, scalar: &Scalar) {
        self.buf.extend_from_slice(scalar.as_bytes());
    }

    /// Append points in order
    pub fn write_points(&mut self, points: &[RistrettoPoint]) {
        for point in points {
            self.write_point(point);
        }
    }

    /// Append scalars in order
    pub fn write_scalars(&mut self, scalars: &[Scalar]) {
        for scalar in scalars {
            self.write_scalar(scalar);
        }
    }

    /// Append a block with a one-byte length prefix
    pub fn write_u8_prefixed(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u8::try_from(bytes.len()).map_err(|_| {
            PrivacyError::InvalidInput(format!("block of {} bytes exceeds u8 prefix", bytes.len()))
        })?;
        self.write_u8(len);
        self.write_bytes(bytes);
        Ok(())
    }

    /// Append a block with a two-byte length prefix
    pub fn write_u16_prefixed(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u16::try_from(bytes.len()).map_err(|_| {
            PrivacyError::InvalidInput(format!("block of {} bytes exceeds u16 prefix", bytes.len()))
        })?;
        self.write_u16(len);
        self.write_bytes(bytes);
        Ok(())
    }

    /// Encoded length so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing was written
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take the buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Decompress a 32-byte point encoding
pub fn decompress(bytes: &[u8]) -> Result<RistrettoPoint> {
    CompressedRistretto::from_slice(bytes)
        .map_err(|e| PrivacyError::Decode(e.to_string()))?
        .decompress()
        .ok_or_else(|| PrivacyError::Decode("point decompression failed".into()))
}

/// Count as a single byte, rejecting lists that do not fit
pub fn count_u8(len: usize, what: &str) -> Result<u8> {
    u8::try_from(len)
        .map_err(|_| PrivacyError::InvalidInput(format!("too many {}: {}", what, len)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;

    #[test]
    fn test_reader_writer_roundtrip() {
        let p = RISTRETTO_BASEPOINT_POINT * Scalar::from(9u64);
        let s = Scalar::from(1234u64);

        let mut w = ByteWriter::new();
        w.write_u8(7);
        w.write_u16(513);
        w.write_u64(u64::MAX - 1);
        w.write_point(&p);
        w.write_scalar(&s);
        w.write_u8_prefixed(b"abc").unwrap();
        let bytes = w.into_bytes();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u16().unwrap(), 513);
        assert_eq!(r.read_u64().unwrap(), u64::MAX - 1);
        assert_eq!(r.read_point().unwrap(), p);
        assert_eq!(r.read_scalar().unwrap(), s);
        assert_eq!(r.read_u8_prefixed().unwrap(), b"abc");
        assert!(r.finish().is_ok());
    }

    #[test]
    fn test_u16_is_big_endian() {
        let mut w = ByteWriter::new();
        w.write_u16(0x0102);
        assert_eq!(w.into_bytes(), vec![1, 2]);
    }

    #[test]
    fn test_truncated_input() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        assert!(matches!(r.read_u64(), Err(PrivacyError::Decode(_))));
    }

    #[test]
    fn test_invalid_point() {
        let bytes = [0xffu8; 32];
        let mut r = ByteReader::new(&bytes);
        assert!(matches!(r.read_point(), Err(PrivacyError::Decode(_))));
    }

    #[test]
    fn test_non_canonical_scalar() {
        let bytes = [0xffu8; 32];
        let mut r = ByteReader::new(&bytes);
        assert!(matches!(r.read_scalar(), Err(PrivacyError::Decode(_))));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut r = ByteReader::new(&[1, 2]);
        r.read_u8().unwrap();
        assert!(r.finish().is_err());
    }

    #[test]
    fn test_prefix_overflow() {
        let mut w = ByteWriter::new();
        assert!(w.write_u8_prefixed(&[0u8; 256]).is_err());
        assert!(w.write_u16_prefixed(&[0u8; 256]).is_ok());
    }
}
