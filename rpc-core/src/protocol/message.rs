// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::io::{Read, Write};

use log::*;

use crate::error::FramingError;

/// First byte of every frame. A frame whose first byte differs is rejected outright.
pub const MAGIC: u8 = 0x06;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    Request = 0,
    Response = 1,
}

impl TryFrom<u8> for MsgType {
    type Error = FramingError;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        match b {
            0 => Ok(Self::Request),
            1 => Ok(Self::Response),
            other => Err(FramingError::UnknownMsgType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressType {
    None = 0,
    Gzip = 1,
}

impl TryFrom<u8> for CompressType {
    type Error = FramingError;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        match b {
            0 => Ok(Self::None),
            1 => Ok(Self::Gzip),
            other => Err(FramingError::UnknownCompressType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SerializeType {
    Binary = 0,
    Json = 1,
}

impl TryFrom<u8> for SerializeType {
    type Error = FramingError;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        match b {
            0 => Ok(Self::Binary),
            1 => Ok(Self::Json),
            other => Err(FramingError::UnknownSerializeType(other)),
        }
    }
}

/// Fixed 5-byte header that precedes every frame's length-prefixed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: u8,
    pub version: u8,
    pub msg_type: MsgType,
    pub compress_type: CompressType,
    pub serialize_type: SerializeType,
}

impl Header {
    pub fn request(serialize_type: SerializeType) -> Self {
        Self {
            magic: MAGIC,
            version: 1,
            msg_type: MsgType::Request,
            compress_type: CompressType::None,
            serialize_type,
        }
    }

    pub fn response(serialize_type: SerializeType) -> Self {
        Self {
            magic: MAGIC,
            version: 1,
            msg_type: MsgType::Response,
            compress_type: CompressType::None,
            serialize_type,
        }
    }

    fn to_bytes(self) -> [u8; 5] {
        [
            self.magic,
            self.version,
            self.msg_type as u8,
            self.compress_type as u8,
            self.serialize_type as u8,
        ]
    }

    fn from_bytes(buf: [u8; 5]) -> Result<Self, FramingError> {
        if buf[0] != MAGIC {
            return Err(FramingError::BadMagic(buf[0]));
        }

        Ok(Self {
            magic: buf[0],
            version: buf[1],
            msg_type: MsgType::try_from(buf[2])?,
            compress_type: CompressType::try_from(buf[3])?,
            serialize_type: SerializeType::try_from(buf[4])?,
        })
    }
}

/// A single framed RPC message: header plus the length-prefixed class/method/payload body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    pub header: Header,
    pub service_class: String,
    pub service_method: String,
    pub payload: Vec<u8>,
}

impl WireMessage {
    /// A request frame with empty class/method/payload, ready for the caller to fill in.
    pub fn new_request(serialize_type: SerializeType) -> Self {
        Self {
            header: Header::request(serialize_type),
            service_class: String::new(),
            service_method: String::new(),
            payload: Vec::new(),
        }
    }

    pub fn new_response(serialize_type: SerializeType) -> Self {
        Self {
            header: Header::response(serialize_type),
            service_class: String::new(),
            service_method: String::new(),
            payload: Vec::new(),
        }
    }

    fn body_len(&self) -> usize {
        4 + self.service_class.len() + 4 + self.service_method.len() + 4 + self.payload.len()
    }

    /// Serializes the header then the length-prefixed body, in the order defined by the wire
    /// format, into `writer`. The whole frame is built in memory first so that a short write
    /// leaves the stream in a clearly-failed state rather than a half-written frame.
    pub fn send<W: Write>(&self, writer: &mut W) -> Result<(), FramingError> {
        let body_len = self.body_len();
        let mut buf = Vec::with_capacity(5 + 4 + body_len);

        buf.extend_from_slice(&self.header.to_bytes());
        buf.extend_from_slice(&(body_len as u32).to_be_bytes());

        write_field(&mut buf, self.service_class.as_bytes());
        write_field(&mut buf, self.service_method.as_bytes());
        write_field(&mut buf, &self.payload);

        writer.write_all(&buf)?;
        trace!(
            "sent frame: class={} method={} payload={}B",
            self.service_class,
            self.service_method,
            self.payload.len()
        );

        Ok(())
    }

    /// Reads exactly one frame from `reader`: 5 header bytes, a 4-byte body length, then exactly
    /// that many body bytes in a single bulk read, which are then split into the three
    /// length-prefixed fields.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, FramingError> {
        let mut header_buf = [0u8; 5];
        reader.read_exact(&mut header_buf)?;
        let header = Header::from_bytes(header_buf)?;

        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf)?;
        let body_len = u32::from_be_bytes(len_buf);

        let mut body = vec![0u8; body_len as usize];
        reader.read_exact(&mut body)?;

        let mut offset = 0usize;
        let service_class = read_field_string(&body, &mut offset, body_len)?;
        let service_method = read_field_string(&body, &mut offset, body_len)?;
        let payload = read_field_bytes(&body, &mut offset, body_len)?;

        if offset != body.len() {
            return Err(FramingError::TrailingBytes {
                body_len,
                consumed: offset as u32,
            });
        }

        Ok(Self {
            header,
            service_class,
            service_method,
            payload,
        })
    }
}

fn write_field(buf: &mut Vec<u8>, field: &[u8]) {
    buf.extend_from_slice(&(field.len() as u32).to_be_bytes());
    buf.extend_from_slice(field);
}

fn read_field_bytes(
    body: &[u8],
    offset: &mut usize,
    body_len: u32,
) -> Result<Vec<u8>, FramingError> {
    if body.len() < *offset + 4 {
        return Err(FramingError::ShortRead {
            expected: *offset + 4,
            got: body.len(),
        });
    }

    let mut len_buf = [0u8; 4];
    len_buf.copy_from_slice(&body[*offset..*offset + 4]);
    let field_len = u32::from_be_bytes(len_buf);
    *offset += 4;

    let remaining = body_len.saturating_sub(*offset as u32);
    if field_len > remaining {
        return Err(FramingError::LengthPrefixOverflow {
            field_len,
            remaining,
        });
    }

    let end = *offset + field_len as usize;
    if end > body.len() {
        return Err(FramingError::ShortRead {
            expected: end,
            got: body.len(),
        });
    }

    let field = body[*offset..end].to_vec();
    *offset = end;

    Ok(field)
}

fn read_field_string(
    body: &[u8],
    offset: &mut usize,
    body_len: u32,
) -> Result<String, FramingError> {
    let bytes = read_field_bytes(body, offset, body_len)?;
    String::from_utf8(bytes).map_err(|e| FramingError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        e,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WireMessage {
        WireMessage {
            header: Header::request(SerializeType::Binary),
            service_class: "UserService.User".into(),
            service_method: "GetUserByID".into(),
            payload: vec![1, 2, 3, 4, 5],
        }
    }

    #[test]
    fn round_trip() {
        let msg = sample();
        let mut buf = Vec::new();
        msg.send(&mut buf).unwrap();

        let read_back = WireMessage::read(&mut buf.as_slice()).unwrap();
        assert_eq!(msg, read_back);
    }

    #[test]
    fn bad_magic_rejected() {
        let msg = sample();
        let mut buf = Vec::new();
        msg.send(&mut buf).unwrap();
        buf[0] = 0x00;

        let err = WireMessage::read(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, FramingError::BadMagic(0)));
    }

    #[test]
    fn oversized_length_prefix_is_frame_error() {
        let msg = sample();
        let mut buf = Vec::new();
        msg.send(&mut buf).unwrap();

        // The first length prefix (service_class) sits right after the 5-byte header and the
        // 4-byte body length.
        let prefix_offset = 5 + 4;
        buf[prefix_offset..prefix_offset + 4].copy_from_slice(&u32::MAX.to_be_bytes());

        let err = WireMessage::read(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            FramingError::LengthPrefixOverflow { .. } | FramingError::ShortRead { .. }
        ));
    }

    #[test]
    fn short_read_is_an_error() {
        let msg = sample();
        let mut buf = Vec::new();
        msg.send(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);

        assert!(WireMessage::read(&mut buf.as_slice()).is_err());
    }
}
