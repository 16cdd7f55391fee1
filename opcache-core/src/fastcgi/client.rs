// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! FastCGI request/response exchange.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};

use super::record::{
    encode_params, write_begin_request, write_stream, EndRequest, ProtocolStatus, RecordHeader,
    RecordType, HEADER_LEN, ROLE_RESPONDER,
};
use super::response::CgiResponse;
use crate::error::ScrapeError;
use crate::types::{Endpoint, ScriptPath};

/// Only one request is ever in flight per connection.
const REQUEST_ID: u16 = 1;

/// Stateless FastCGI client. Every call opens and closes its own connection.
#[derive(Debug, Clone)]
pub struct FastCgiClient {
    endpoint: Endpoint,
    timeout: Option<Duration>,
}

impl FastCgiClient {
    /// Create a client without a timeout.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            timeout: None,
        }
    }

    /// Bound the whole connect + exchange. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Execute `script` on the backend and return its response body with the
    /// CGI headers stripped.
    ///
    /// # Errors
    /// [`ScrapeError::Connection`] when the backend cannot be reached,
    /// [`ScrapeError::Transport`] when the exchange fails, is truncated, or
    /// exceeds the configured timeout.
    pub async fn fetch(&self, script: &ScriptPath) -> Result<Vec<u8>, ScrapeError> {
        let response = self.get(script).await?;

        if response.status != 200 {
            tracing::debug!(
                endpoint = %self.endpoint,
                status = response.status,
                content_type = response.header("content-type"),
                "Backend returned non-200 status"
            );
        }

        Ok(response.body)
    }

    /// Execute `script` and return the full CGI response.
    pub async fn get(&self, script: &ScriptPath) -> Result<CgiResponse, ScrapeError> {
        let exchange = self.exchange(script);

        let stdout = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| {
                    ScrapeError::transport(format!(
                        "no response from {} within {}ms",
                        self.endpoint,
                        limit.as_millis()
                    ))
                })??,
            None => exchange.await?,
        };

        Ok(CgiResponse::from_stdout(stdout))
    }

    async fn exchange(&self, script: &ScriptPath) -> Result<Vec<u8>, ScrapeError> {
        let request = build_request(script);

        match &self.endpoint {
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr)
                    .await
                    .map_err(|e| self.connection_error(e))?;
                stream.set_nodelay(true).ok();
                round_trip(stream, &request).await
            }
            Endpoint::Unix(path) => {
                let stream = UnixStream::connect(path)
                    .await
                    .map_err(|e| self.connection_error(e))?;
                round_trip(stream, &request).await
            }
        }
    }

    fn connection_error(&self, e: std::io::Error) -> ScrapeError {
        ScrapeError::Connection {
            endpoint: self.endpoint.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Serialize the full request: BEGIN_REQUEST, PARAMS stream, empty STDIN.
fn build_request(script: &ScriptPath) -> Vec<u8> {
    let script_filename = script.as_path().to_string_lossy().into_owned();
    let script_name = script
        .as_path()
        .file_name()
        .map(|name| format!("/{}", name.to_string_lossy()))
        .unwrap_or_else(|| script_filename.clone());

    let params = encode_params([
        ("SCRIPT_FILENAME", script_filename.as_str()),
        ("SCRIPT_NAME", script_name.as_str()),
        ("REQUEST_METHOD", "GET"),
        ("CONTENT_LENGTH", "0"),
        ("SERVER_PROTOCOL", "HTTP/1.1"),
        ("GATEWAY_INTERFACE", "FastCGI/1.0"),
    ]);

    let mut buf = Vec::with_capacity(params.len() + 64);
    write_begin_request(&mut buf, REQUEST_ID, ROLE_RESPONDER, false);
    write_stream(&mut buf, RecordType::Params, REQUEST_ID, &params);
    write_stream(&mut buf, RecordType::Stdin, REQUEST_ID, &[]);
    buf
}

/// Send the request and collect STDOUT until END_REQUEST.
async fn round_trip<S>(mut stream: S, request: &[u8]) -> Result<Vec<u8>, ScrapeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(request)
        .await
        .map_err(|e| ScrapeError::transport(format!("write failed: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| ScrapeError::transport(format!("flush failed: {}", e)))?;

    let mut stdout = Vec::new();

    loop {
        let mut raw = [0u8; HEADER_LEN];
        stream.read_exact(&mut raw).await.map_err(read_error)?;
        let header = RecordHeader::decode(&raw)?;

        let mut content = vec![0u8; header.body_len()];
        stream.read_exact(&mut content).await.map_err(read_error)?;
        content.truncate(header.content_length as usize);

        if header.request_id != REQUEST_ID {
            tracing::debug!(
                request_id = header.request_id,
                "Skipping record for foreign request"
            );
            continue;
        }

        match header.record_type {
            RecordType::Stdout => stdout.extend_from_slice(&content),
            RecordType::Stderr => {
                if !content.is_empty() {
                    tracing::warn!(
                        stderr = %String::from_utf8_lossy(&content).trim_end(),
                        "FastCGI backend wrote to stderr"
                    );
                }
            }
            RecordType::EndRequest => {
                let end = EndRequest::decode(&content)?;
                if end.protocol_status != ProtocolStatus::RequestComplete {
                    return Err(ScrapeError::transport(format!(
                        "request rejected by backend: {:?}",
                        end.protocol_status
                    )));
                }
                return Ok(stdout);
            }
            other => {
                tracing::debug!(record_type = ?other, "Ignoring unexpected record");
            }
        }
    }
}

fn read_error(e: std::io::Error) -> ScrapeError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ScrapeError::transport("connection closed before END_REQUEST")
    } else {
        ScrapeError::transport(format!("read failed: {}", e))
    }
}
