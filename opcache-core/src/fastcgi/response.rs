// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CGI response splitting.
//!
//! PHP-FPM writes a CGI header block (`X-Powered-By`, `Content-type`, an
//! optional `Status`) before the script output on STDOUT.

/// Status assumed when the backend sends no `Status:` header.
const DEFAULT_STATUS: u16 = 200;

/// Script output split into CGI headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CgiResponse {
    /// Split raw STDOUT content. Output without a header terminator, or
    /// whose first line is not a header, is returned entirely as body.
    pub fn from_stdout(stdout: Vec<u8>) -> Self {
        let Some((head_len, sep_len)) = find_header_end(&stdout) else {
            return Self::body_only(stdout);
        };

        let parsed: Option<Vec<(String, String)>> = {
            let head = String::from_utf8_lossy(&stdout[..head_len]);
            let headers = head
                .lines()
                .map(|line| match line.split_once(':') {
                    Some((name, value)) if is_header_name(name) => {
                        Some((name.to_string(), value.trim().to_string()))
                    }
                    _ => None,
                })
                .collect();
            headers
        };
        let Some(headers) = parsed else {
            return Self::body_only(stdout);
        };

        let status = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("status"))
            .and_then(|(_, value)| value.split_whitespace().next())
            .and_then(|code| code.parse().ok())
            .unwrap_or(DEFAULT_STATUS);

        let body = stdout[head_len + sep_len..].to_vec();

        Self {
            status,
            headers,
            body,
        }
    }

    fn body_only(body: Vec<u8>) -> Self {
        Self {
            status: DEFAULT_STATUS,
            headers: Vec::new(),
            body,
        }
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Position and length of the blank line ending the header block.
fn find_header_end(data: &[u8]) -> Option<(usize, usize)> {
    let crlf = find(data, b"\r\n\r\n").map(|pos| (pos, 4));
    let lf = find(data, b"\n\n").map(|pos| (pos, 2));

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn is_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_php_fpm_output() {
        let stdout = b"X-Powered-By: PHP/8.3.4\r\nContent-type: text/html; charset=UTF-8\r\n\r\n{\"opcache_enabled\":true}".to_vec();
        let response = CgiResponse::from_stdout(stdout);

        assert_eq!(response.status, 200);
        assert_eq!(response.header("content-type"), Some("text/html; charset=UTF-8"));
        assert_eq!(response.body, b"{\"opcache_enabled\":true}");
    }

    #[test]
    fn test_status_header() {
        let stdout = b"Status: 404 Not Found\nContent-type: text/html\n\nFile not found.\n".to_vec();
        let response = CgiResponse::from_stdout(stdout);

        assert_eq!(response.status, 404);
        assert_eq!(response.body, b"File not found.\n");
    }

    #[test]
    fn test_no_headers() {
        let response = CgiResponse::from_stdout(b"{\"cache_full\":false}".to_vec());
        assert_eq!(response.status, 200);
        assert!(response.headers.is_empty());
        assert_eq!(response.body, b"{\"cache_full\":false}");
    }

    #[test]
    fn test_body_with_blank_line_but_no_headers() {
        let stdout = b"{\"a\": 1}\n\n".to_vec();
        let response = CgiResponse::from_stdout(stdout.clone());
        assert!(response.headers.is_empty());
        assert_eq!(response.body, stdout);
    }

    #[test]
    fn test_body_keeps_inner_blank_lines() {
        let stdout = b"Content-type: text/plain\r\n\r\nline one\r\n\r\nline two".to_vec();
        let response = CgiResponse::from_stdout(stdout);
        assert_eq!(response.body, b"line one\r\n\r\nline two");
    }

    #[test]
    fn test_empty_output() {
        let response = CgiResponse::from_stdout(Vec::new());
        assert!(response.body.is_empty());
    }
}
