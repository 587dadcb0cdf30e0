use std::collections::HashMap;
use std::io::{BufRead, Read};

use crate::error::HttpError;
use crate::multipart::{boundary_from_content_type, parse_multipart};
use crate::urlencoded::{parse_urlencoded, percent_decode};

/// A header block larger than this causes the request to be rejected with
/// `BadRequest` before any body is read.
pub const MAX_HEADER_BYTES: usize = 16 * 1024;

/// The content type a part is stored under when the multipart part itself
/// did not declare one.
const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// A file uploaded through a `multipart/form-data` part that carried a
/// `filename` attribute.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A parsed HTTP request. Route parameters are filled in by the router
/// after parsing, not by [`RequestParser`] itself.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub version: String,
    headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub body: Vec<u8>,
    pub form_fields: HashMap<String, String>,
    pub upload_files: HashMap<String, UploadedFile>,
    pub params: HashMap<String, String>,
}

impl Request {
    /// Looks up a header case-insensitively, though the map itself is keyed
    /// by the name exactly as it arrived on the wire. When a header was
    /// repeated, the last occurrence on the wire wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The raw body decoded as UTF-8, lossily. Useful for request bodies
    /// that were neither form-urlencoded nor multipart.
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Reads and parses an HTTP/1.1 request from a buffered stream.
pub struct RequestParser;

impl RequestParser {
    /// Parses a request line, headers, and (if `Content-Length` is present)
    /// a body out of `reader`. Enforces [`MAX_HEADER_BYTES`] on the
    /// request-line-plus-headers block.
    pub fn parse<R: BufRead>(reader: &mut R) -> Result<Request, HttpError> {
        let mut header_bytes = 0usize;

        let request_line = read_line_capped(reader, &mut header_bytes)?
            .ok_or_else(|| HttpError::BadRequest("connection closed before request line".into()))?;
        let (method, raw_target, version) = parse_request_line(&request_line)?;

        let mut headers: HashMap<String, String> = HashMap::new();
        loop {
            let line = read_line_capped(reader, &mut header_bytes)?
                .ok_or_else(|| HttpError::BadRequest("connection closed while reading headers".into()))?;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| HttpError::BadRequest(format!("malformed header line: {line}")))?;
            headers.insert(name.trim().to_string(), value.trim().to_string());
        }

        let (path, query) = split_target(&raw_target);

        let cookies = find_header(&headers, "cookie")
            .map(parse_cookies)
            .unwrap_or_default();

        let body = match find_header(&headers, "content-length") {
            Some(raw) => {
                let len: usize = raw
                    .parse()
                    .map_err(|_| HttpError::BadRequest(format!("invalid content-length: {raw}")))?;
                let mut buf = vec![0u8; len];
                reader
                    .read_exact(&mut buf)
                    .map_err(|e| HttpError::BadRequest(format!("short request body: {e}")))?;
                buf
            }
            None => Vec::new(),
        };

        let (form_fields, upload_files) = decode_body(find_header(&headers, "content-type"), &body)?;

        Ok(Request {
            method,
            path,
            query,
            version,
            headers,
            cookies,
            body,
            form_fields,
            upload_files,
            params: HashMap::new(),
        })
    }
}

/// Decodes the request body according to its `Content-Type`, producing the
/// form fields and uploaded files the handler sees. Any other content type
/// (including none) leaves both maps empty; the raw body remains available
/// on [`Request::body`]/[`Request::body_text`].
fn decode_body(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<(HashMap<String, String>, HashMap<String, UploadedFile>), HttpError> {
    let Some(content_type) = content_type else {
        return Ok((HashMap::new(), HashMap::new()));
    };
    let kind = content_type.split(';').next().unwrap_or("").trim();

    if kind.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        let body = String::from_utf8_lossy(body);
        let mut fields = HashMap::new();
        for (key, value) in parse_urlencoded(&body) {
            fields.insert(key, value);
        }
        return Ok((fields, HashMap::new()));
    }

    if kind.eq_ignore_ascii_case("multipart/form-data") {
        let boundary = boundary_from_content_type(content_type)?;
        let mut fields = HashMap::new();
        let mut files = HashMap::new();
        for field in parse_multipart(body, &boundary) {
            match field.filename {
                Some(filename) => {
                    files.insert(
                        field.name,
                        UploadedFile {
                            filename,
                            content_type: field
                                .content_type
                                .unwrap_or_else(|| DEFAULT_UPLOAD_CONTENT_TYPE.to_string()),
                            data: field.data,
                        },
                    );
                }
                None => {
                    fields.insert(field.name, String::from_utf8_lossy(&field.data).into_owned());
                }
            }
        }
        return Ok((fields, files));
    }

    Ok((HashMap::new(), HashMap::new()))
}

fn read_line_capped<R: BufRead>(
    reader: &mut R,
    budget: &mut usize,
) -> Result<Option<String>, HttpError> {
    let mut raw = Vec::new();
    let read = reader
        .read_until(b'\n', &mut raw)
        .map_err(|e| HttpError::BadRequest(format!("failed to read request: {e}")))?;
    if read == 0 {
        return Ok(None);
    }
    *budget += read;
    if *budget > MAX_HEADER_BYTES {
        return Err(HttpError::BadRequest("request headers exceed size limit".into()));
    }
    while raw.last() == Some(&b'\n') || raw.last() == Some(&b'\r') {
        raw.pop();
    }
    String::from_utf8(raw)
        .map(Some)
        .map_err(|_| HttpError::BadRequest("request line is not valid UTF-8".into()))
}

fn parse_request_line(line: &str) -> Result<(String, String, String), HttpError> {
    let mut parts = line.split(' ');
    let method = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HttpError::BadRequest("missing method".into()))?;
    let target = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HttpError::BadRequest("missing request target".into()))?;
    let version = parts.next().unwrap_or("HTTP/1.1");
    Ok((method.to_string(), target.to_string(), version.to_string()))
}

fn split_target(target: &str) -> (String, Vec<(String, String)>) {
    match target.split_once('?') {
        Some((path, query)) => (percent_decode(path), parse_urlencoded(query)),
        None => (percent_decode(target), Vec::new()),
    }
}

/// Looks up a header by name, case-insensitively, in a map keyed by the
/// names exactly as they arrived on the wire.
fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn parse_cookies(raw: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for pair in raw.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        if let Some((name, value)) = pair.split_once('=') {
            out.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    out
}
