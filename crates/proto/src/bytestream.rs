//! Little-endian cursor primitives for wire data.
//!
//! Every integer on the wire is little-endian. Reads are bounds-checked and
//! return `None` past the end instead of panicking, so packet parsers can
//! bail out with `?` on truncated frames.

/// Bounds-checked reader over a borrowed byte slice.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Wrap a slice for reading from the start.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read offset from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unread portion of the slice.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Number of unread bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Take the next `len` bytes, or `None` if fewer remain.
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining_len() < len {
            return None;
        }

        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Some(slice)
    }

    /// Advance past `len` bytes without looking at them.
    pub fn skip(&mut self, len: usize) -> bool {
        if self.remaining_len() < len {
            return false;
        }

        self.pos += len;
        true
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Option<u8> {
        let bytes = self.read_bytes(1)?;
        Some(bytes[0])
    }

    /// Read a little-endian `u16`.
    pub fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.read_bytes(2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.read_bytes(4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian `i32`.
    pub fn read_i32(&mut self) -> Option<i32> {
        self.read_u32().map(|v| v as i32)
    }

    /// Read a little-endian `f32`.
    pub fn read_f32(&mut self) -> Option<f32> {
        self.read_u32().map(f32::from_bits)
    }

    /// Read a string prefixed with a `u16` length.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; names in the item
    /// database are plain bytes with no encoding guarantee.
    pub fn read_string_u16(&mut self) -> Option<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a string prefixed with a `u32` length.
    pub fn read_string_u32(&mut self) -> Option<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Growable little-endian byte sink.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty writer with `cap` bytes reserved.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// View of the accumulated bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer, returning the accumulated bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Append a little-endian `u16`.
    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian `f32`.
    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a string with a `u16` length prefix.
    pub fn write_string_u16(&mut self, value: &str) {
        self.write_u16(value.len() as u16);
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Append a string with a `u32` length prefix.
    pub fn write_string_u32(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.buf.extend_from_slice(value.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_read_integers() {
        let data = [0x01, 0x02, 0x03, 0x04, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = ByteReader::new(&data);

        assert_eq!(reader.read_u32(), Some(0x04030201));
        assert_eq!(reader.read_i32(), Some(-1));
        assert_eq!(reader.read_u8(), None);
    }

    #[test]
    fn test_read_past_end() {
        let mut reader = ByteReader::new(&[0x01]);
        assert_eq!(reader.read_u32(), None);
        // A failed read must not consume anything.
        assert_eq!(reader.read_u8(), Some(0x01));
    }

    #[test]
    fn test_string_u32_roundtrip() {
        let mut writer = ByteWriter::new();
        writer.write_string_u32("OnSendToServer");

        let buf = writer.into_inner();
        let mut reader = ByteReader::new(&buf);
        assert_eq!(reader.read_string_u32().expect("string"), "OnSendToServer");
        assert_eq!(reader.remaining_len(), 0);
    }

    #[test]
    fn test_truncated_string_fails() {
        let mut writer = ByteWriter::new();
        writer.write_string_u16("growtopia");

        let buf = writer.into_inner();
        let mut reader = ByteReader::new(&buf[..buf.len() - 1]);
        assert_eq!(reader.read_string_u16(), None);
    }

    #[test]
    fn test_skip() {
        let mut reader = ByteReader::new(&[1, 2, 3, 4]);
        assert!(reader.skip(3));
        assert_eq!(reader.remaining(), &[4]);
        assert!(!reader.skip(2));
    }

    proptest! {
        #[test]
        fn prop_scalar_roundtrip(a: u32, b: i32, c: u16, d: u8) {
            let mut writer = ByteWriter::new();
            writer.write_u32(a);
            writer.write_i32(b);
            writer.write_u16(c);
            writer.write_u8(d);

            let buf = writer.into_inner();
            let mut reader = ByteReader::new(&buf);
            prop_assert_eq!(reader.read_u32(), Some(a));
            prop_assert_eq!(reader.read_i32(), Some(b));
            prop_assert_eq!(reader.read_u16(), Some(c));
            prop_assert_eq!(reader.read_u8(), Some(d));
            prop_assert_eq!(reader.remaining_len(), 0);
        }

        #[test]
        fn prop_string_roundtrip(s in "[ -~]{0,64}") {
            let mut writer = ByteWriter::new();
            writer.write_string_u16(&s);
            writer.write_string_u32(&s);

            let buf = writer.into_inner();
            let mut reader = ByteReader::new(&buf);
            prop_assert_eq!(reader.read_string_u16(), Some(s.clone()));
            prop_assert_eq!(reader.read_string_u32(), Some(s));
        }
    }
}
