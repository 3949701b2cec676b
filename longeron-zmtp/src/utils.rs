use bytes::{BufMut, Bytes, BytesMut};

/// ZMTP v2 wire flag bits
pub const WIRE_MORE: u8 = 0x01;
pub const WIRE_LARGE: u8 = 0x02;
pub const WIRE_COMMAND: u8 = 0x04;

/// Encode a complete v2 frame (flags byte + size header + body).
///
/// Bodies of up to 255 bytes take the one-byte size form; larger bodies
/// use the eight-byte big-endian form. The `LARGE` bit is forced to match
/// the chosen header, whatever the caller passed in `flags`.
#[must_use]
pub fn encode_frame(flags: u8, body: &[u8]) -> Bytes {
    let len = body.len();
    let header_len = if len <= 255 { 2 } else { 9 };
    let mut out = BytesMut::with_capacity(header_len + len);

    if len <= 255 {
        out.put_u8(flags & !WIRE_LARGE);
        out.put_u8(len as u8);
    } else {
        out.put_u8(flags | WIRE_LARGE);
        out.put_u64(len as u64);
    }

    out.extend_from_slice(body);
    out.freeze()
}

/// Append one metadata property to a command body.
///
/// Grammar: 1 byte name length, name, 4 bytes value length (BE), value.
#[inline]
pub fn put_property(dst: &mut impl BufMut, name: &str, value: &[u8]) {
    let name_bytes = name.as_bytes();
    debug_assert!(name_bytes.len() <= 255);

    dst.put_u8(name_bytes.len() as u8);
    dst.put_slice(name_bytes);

    dst.put_u32(value.len() as u32);
    dst.put_slice(value);
}
