use crate::error::HttpError;

/// One part of a decoded `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct MultipartField {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Extracts the `boundary` parameter from a `Content-Type` header value.
/// Returns `BadRequest` if the header is not `multipart/form-data` or is
/// missing a boundary.
pub fn boundary_from_content_type(content_type: &str) -> Result<String, HttpError> {
    let mut parts = content_type.split(';');
    let kind = parts.next().unwrap_or("").trim();
    if !kind.eq_ignore_ascii_case("multipart/form-data") {
        return Err(HttpError::BadRequest(format!(
            "expected multipart/form-data, got {kind}"
        )));
    }
    for param in parts {
        let param = param.trim();
        if let Some(value) = param.strip_prefix("boundary=") {
            let value = value.trim_matches('"');
            if value.is_empty() {
                return Err(HttpError::BadRequest("empty multipart boundary".into()));
            }
            return Ok(value.to_string());
        }
    }
    Err(HttpError::BadRequest(
        "multipart/form-data body missing boundary parameter".into(),
    ))
}

/// Splits a `multipart/form-data` body into its fields given the boundary
/// extracted from the `Content-Type` header. A part that is missing its
/// `name` attribute or its header/body separator is not fatal to the whole
/// request: it is skipped and a warning is logged, per the ingestion rules.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Vec<MultipartField> {
    let delimiter = format!("--{boundary}").into_bytes();
    let mut fields = Vec::new();

    for chunk in split_on_delimiter(body, &delimiter) {
        let chunk = trim_crlf_prefix(chunk);
        if chunk.is_empty() || chunk.starts_with(b"--") {
            continue;
        }
        let chunk = strip_trailing_crlf(chunk);
        match parse_field(chunk) {
            Ok(field) => fields.push(field),
            Err(err) => log::warn!("skipping malformed multipart part: {err}"),
        }
    }

    fields
}

fn split_on_delimiter<'a>(body: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut rest = body;
    while let Some(pos) = find(rest, delimiter) {
        if pos > 0 {
            parts.push(&rest[..pos]);
        }
        rest = &rest[pos + delimiter.len()..];
    }
    parts.push(rest);
    parts
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn trim_crlf_prefix(chunk: &[u8]) -> &[u8] {
    chunk.strip_prefix(b"\r\n").unwrap_or(chunk)
}

fn strip_trailing_crlf(chunk: &[u8]) -> &[u8] {
    chunk.strip_suffix(b"\r\n").unwrap_or(chunk)
}

fn parse_field(chunk: &[u8]) -> Result<MultipartField, HttpError> {
    let separator = b"\r\n\r\n";
    let header_end = find(chunk, separator)
        .ok_or_else(|| HttpError::BadRequest("multipart part missing header/body separator".into()))?;
    let header_block = std::str::from_utf8(&chunk[..header_end])
        .map_err(|_| HttpError::BadRequest("multipart part headers are not valid UTF-8".into()))?;
    let data = chunk[header_end + separator.len()..].to_vec();

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    for line in header_block.split("\r\n") {
        let (header_name, value) = line
            .split_once(':')
            .ok_or_else(|| HttpError::BadRequest(format!("malformed multipart header: {line}")))?;
        let value = value.trim();
        match header_name.trim().to_ascii_lowercase().as_str() {
            "content-disposition" => {
                name = extract_disposition_param(value, "name");
                filename = extract_disposition_param(value, "filename");
            }
            "content-type" => content_type = Some(value.to_string()),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| HttpError::BadRequest("multipart part missing name".into()))?;
    Ok(MultipartField {
        name,
        filename,
        content_type,
        data,
    })
}

fn extract_disposition_param(value: &str, key: &str) -> Option<String> {
    for segment in value.split(';') {
        let segment = segment.trim();
        if let Some(rest) = segment.strip_prefix(key) {
            if let Some(rest) = rest.strip_prefix('=') {
                return Some(rest.trim_matches('"').to_string());
            }
        }
    }
    None
}
