// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! FastCGI 1.0 record framing.
//!
//! Every record is an 8-byte header followed by `content_length` bytes of
//! content and `padding_length` bytes of padding. Multi-byte integers are
//! big-endian.

use crate::error::ScrapeError;

/// Protocol version carried in every header.
pub const FCGI_VERSION_1: u8 = 1;

/// Size of a record header in bytes.
pub const HEADER_LEN: usize = 8;

/// Largest content a single record can carry.
pub const MAX_CONTENT_LEN: usize = u16::MAX as usize;

/// Responder role for BEGIN_REQUEST.
pub const ROLE_RESPONDER: u16 = 1;

/// BEGIN_REQUEST flag asking the backend to keep the connection open.
const FLAG_KEEP_CONN: u8 = 1;

/// Record types defined by the FastCGI specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    BeginRequest = 1,
    AbortRequest = 2,
    EndRequest = 3,
    Params = 4,
    Stdin = 5,
    Stdout = 6,
    Stderr = 7,
    Data = 8,
    GetValues = 9,
    GetValuesResult = 10,
    UnknownType = 11,
}

impl TryFrom<u8> for RecordType {
    type Error = ScrapeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let record_type = match value {
            1 => RecordType::BeginRequest,
            2 => RecordType::AbortRequest,
            3 => RecordType::EndRequest,
            4 => RecordType::Params,
            5 => RecordType::Stdin,
            6 => RecordType::Stdout,
            7 => RecordType::Stderr,
            8 => RecordType::Data,
            9 => RecordType::GetValues,
            10 => RecordType::GetValuesResult,
            11 => RecordType::UnknownType,
            other => {
                return Err(ScrapeError::transport(format!(
                    "unknown record type {}",
                    other
                )))
            }
        };
        Ok(record_type)
    }
}

/// Protocol-level outcome reported in END_REQUEST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolStatus {
    RequestComplete,
    CantMpxConn,
    Overloaded,
    UnknownRole,
    Other(u8),
}

impl From<ProtocolStatus> for u8 {
    fn from(status: ProtocolStatus) -> Self {
        match status {
            ProtocolStatus::RequestComplete => 0,
            ProtocolStatus::CantMpxConn => 1,
            ProtocolStatus::Overloaded => 2,
            ProtocolStatus::UnknownRole => 3,
            ProtocolStatus::Other(other) => other,
        }
    }
}

impl From<u8> for ProtocolStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => ProtocolStatus::RequestComplete,
            1 => ProtocolStatus::CantMpxConn,
            2 => ProtocolStatus::Overloaded,
            3 => ProtocolStatus::UnknownRole,
            other => ProtocolStatus::Other(other),
        }
    }
}

/// Decoded record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub record_type: RecordType,
    pub request_id: u16,
    pub content_length: u16,
    pub padding_length: u8,
}

impl RecordHeader {
    /// Header for `content_len` bytes, padded to an 8-byte boundary.
    pub(crate) fn new(record_type: RecordType, request_id: u16, content_len: usize) -> Self {
        debug_assert!(content_len <= MAX_CONTENT_LEN);
        let content_length = content_len as u16;
        Self {
            record_type,
            request_id,
            content_length,
            padding_length: ((8 - content_len % 8) % 8) as u8,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let id = self.request_id.to_be_bytes();
        let len = self.content_length.to_be_bytes();
        [
            FCGI_VERSION_1,
            self.record_type as u8,
            id[0],
            id[1],
            len[0],
            len[1],
            self.padding_length,
            0,
        ]
    }

    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, ScrapeError> {
        if bytes[0] != FCGI_VERSION_1 {
            return Err(ScrapeError::transport(format!(
                "unsupported FastCGI version {}",
                bytes[0]
            )));
        }

        Ok(Self {
            record_type: RecordType::try_from(bytes[1])?,
            request_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            content_length: u16::from_be_bytes([bytes[4], bytes[5]]),
            padding_length: bytes[6],
        })
    }

    /// Bytes following the header: content plus padding.
    pub fn body_len(&self) -> usize {
        self.content_length as usize + self.padding_length as usize
    }
}

/// Append one record. `content` must fit in a single record; public callers
/// go through [`write_stream`], which splits it.
pub(crate) fn write_record(buf: &mut Vec<u8>, record_type: RecordType, request_id: u16, content: &[u8]) {
    let header = RecordHeader::new(record_type, request_id, content.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(content);
    buf.resize(buf.len() + header.padding_length as usize, 0);
}

/// Append a stream: the content split into maximal records, then the
/// empty record that closes the stream.
pub fn write_stream(buf: &mut Vec<u8>, record_type: RecordType, request_id: u16, content: &[u8]) {
    for chunk in content.chunks(MAX_CONTENT_LEN) {
        write_record(buf, record_type, request_id, chunk);
    }
    write_record(buf, record_type, request_id, &[]);
}

/// Append a BEGIN_REQUEST record.
pub fn write_begin_request(buf: &mut Vec<u8>, request_id: u16, role: u16, keep_conn: bool) {
    let role = role.to_be_bytes();
    let flags = if keep_conn { FLAG_KEEP_CONN } else { 0 };
    let body = [role[0], role[1], flags, 0, 0, 0, 0, 0];
    write_record(buf, RecordType::BeginRequest, request_id, &body);
}

/// Append an END_REQUEST record.
pub fn write_end_request(
    buf: &mut Vec<u8>,
    request_id: u16,
    app_status: u32,
    protocol_status: ProtocolStatus,
) {
    let app = app_status.to_be_bytes();
    let body = [app[0], app[1], app[2], app[3], protocol_status.into(), 0, 0, 0];
    write_record(buf, RecordType::EndRequest, request_id, &body);
}

/// Encode name/value pairs for a PARAMS stream.
pub fn encode_params<'a, I>(pairs: I) -> Vec<u8>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut buf = Vec::new();
    for (name, value) in pairs {
        encode_length(&mut buf, name.len());
        encode_length(&mut buf, value.len());
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(value.as_bytes());
    }
    buf
}

/// Lengths below 128 take one byte, longer ones four with the top bit set.
fn encode_length(buf: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        buf.push(len as u8);
    } else {
        let len = (len as u32) | 0x8000_0000;
        buf.extend_from_slice(&len.to_be_bytes());
    }
}

/// Body of an END_REQUEST record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndRequest {
    pub app_status: u32,
    pub protocol_status: ProtocolStatus,
}

impl EndRequest {
    pub fn decode(content: &[u8]) -> Result<Self, ScrapeError> {
        if content.len() < 8 {
            return Err(ScrapeError::transport(format!(
                "END_REQUEST body too short: {} bytes",
                content.len()
            )));
        }

        Ok(Self {
            app_status: u32::from_be_bytes([content[0], content[1], content[2], content[3]]),
            protocol_status: ProtocolStatus::from(content[4]),
        })
    }
}
