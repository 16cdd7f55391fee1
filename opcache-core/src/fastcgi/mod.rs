// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Minimal FastCGI client for talking to PHP-FPM.
//!
//! One request per connection, responder role only. The connection is
//! opened fresh for every fetch and closed by the backend when the request
//! completes.

mod client;
mod record;
mod response;

pub use client::FastCgiClient;
pub use record::{
    write_end_request, write_stream, ProtocolStatus, RecordHeader, RecordType, HEADER_LEN,
};
pub use response::CgiResponse;
