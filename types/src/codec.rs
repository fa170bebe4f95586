//! Length-prefixed helpers shared by the wire types.

use bytes::{Buf, BufMut, Bytes};
use commonware_codec::{Error, ReadExt, Write};

/// Write a string as length-prefixed UTF-8 bytes.
pub fn write_string(s: &str, writer: &mut impl BufMut) {
    write_bytes(s.as_bytes(), writer);
}

/// Read a length-prefixed UTF-8 string of at most `max_len` bytes.
pub fn read_string(reader: &mut impl Buf, max_len: usize) -> Result<String, Error> {
    let bytes = read_bytes(reader, max_len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::Invalid("String", "invalid UTF-8"))
}

pub fn string_encode_size(s: &str) -> usize {
    4 + s.len()
}

/// Write raw bytes with a `u32` length prefix.
pub fn write_bytes(bytes: &[u8], writer: &mut impl BufMut) {
    (bytes.len() as u32).write(writer);
    writer.put_slice(bytes);
}

/// Read `u32`-prefixed raw bytes of at most `max_len` bytes.
pub fn read_bytes(reader: &mut impl Buf, max_len: usize) -> Result<Bytes, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid("Bytes", "too long"));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    Ok(reader.copy_to_bytes(len))
}

/// Read a `u32` item count, rejecting counts above `max`.
pub fn read_len(reader: &mut impl Buf, max: usize, context: &'static str) -> Result<usize, Error> {
    let len = u32::read(reader)? as usize;
    if len > max {
        return Err(Error::Invalid(context, "too many items"));
    }
    Ok(len)
}

pub fn write_u128(value: u128, writer: &mut impl BufMut) {
    writer.put_u128(value);
}

pub fn read_u128(reader: &mut impl Buf) -> Result<u128, Error> {
    if reader.remaining() < 16 {
        return Err(Error::EndOfBuffer);
    }
    Ok(reader.get_u128())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn read_string_rejects_too_long() {
        let mut buf = BytesMut::new();
        write_string("hello", &mut buf);

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 4).expect_err("should reject too-long string");
        assert!(matches!(err, Error::Invalid("Bytes", "too long")));
    }

    #[test]
    fn read_bytes_rejects_truncated_buffers() {
        let mut buf = BytesMut::new();
        (3u32).write(&mut buf);
        buf.extend_from_slice(b"ab");

        let mut reader = buf.as_ref();
        let err = read_bytes(&mut reader, 10).expect_err("should reject truncated buffer");
        assert!(matches!(err, Error::EndOfBuffer));
    }

    #[test]
    fn read_string_rejects_invalid_utf8() {
        let mut buf = BytesMut::new();
        write_bytes(&[0xff, 0xff], &mut buf);

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 10).expect_err("should reject invalid UTF-8");
        assert!(matches!(err, Error::Invalid("String", "invalid UTF-8")));
    }

    #[test]
    fn read_len_enforces_bound() {
        let mut buf = BytesMut::new();
        (9u32).write(&mut buf);

        let mut reader = buf.as_ref();
        let err = read_len(&mut reader, 8, "Coins").expect_err("should reject count");
        assert!(matches!(err, Error::Invalid("Coins", "too many items")));
    }

    #[test]
    fn u128_requires_sixteen_bytes() {
        let mut reader: &[u8] = &[0u8; 15];
        assert!(matches!(read_u128(&mut reader), Err(Error::EndOfBuffer)));

        let mut buf = BytesMut::new();
        write_u128(u128::MAX - 7, &mut buf);
        let mut reader = buf.as_ref();
        assert_eq!(read_u128(&mut reader).unwrap(), u128::MAX - 7);
    }
}
