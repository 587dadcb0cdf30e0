//! End-to-end scenarios spanning routing, static fallback, and request/
//! response round-tripping without a real socket.

use std::fs;
use std::io::BufReader;
use std::sync::Arc;

use kestrel_http::{Request, RequestParser, Response, Router, StaticServer};

fn parse(raw: &str) -> Request {
    let mut reader = BufReader::new(raw.as_bytes());
    RequestParser::parse(&mut reader).unwrap()
}

#[test]
fn first_registered_route_wins_over_a_later_more_specific_one() {
    let mut router = Router::new();
    router.add_route(
        "GET",
        "/api/user/{id}",
        Arc::new(|req: &Request| Response::ok(format!("dynamic:{}", req.params["id"]))),
    );
    router.add_route(
        "GET",
        "/api/user",
        Arc::new(|_req: &Request| Response::ok("listing")),
    );

    let (handler, params) = router.route("GET", "/api/user/42").unwrap();
    let response = handler(&parse("GET /api/user/42 HTTP/1.1\r\n\r\n"));
    assert_eq!(params.get("id").map(String::as_str), Some("42"));
    assert_eq!(response.body, b"dynamic:42");
}

#[test]
fn unmatched_path_falls_through_router_to_static_to_404() {
    let dir = std::env::temp_dir().join(format!(
        "kestrel-http-scenario-{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("present.txt"), b"served").unwrap();

    let router = Router::new();
    let static_server = StaticServer::new(&dir, false);

    // A route miss that resolves to a real static file is served.
    assert!(router.route("GET", "/present.txt").is_none());
    let served = static_server.serve("/present.txt").unwrap();
    assert_eq!(served.body, b"served");

    // A route miss with no static match and no route falls all the way
    // through to the caller's 404, exactly as the router/static split
    // leaves it (no route, no public_dir hit, no SPA fallback configured).
    assert!(router.route("GET", "/absent.txt").is_none());
    assert!(static_server.serve("/absent.txt").is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn request_round_trips_method_and_path_through_a_bodyless_request() {
    let raw = "GET /reports/2026?format=csv HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let request = parse(raw);
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/reports/2026");
    assert_eq!(request.query_param("format"), Some("csv"));
}

#[test]
fn serialized_response_headers_reparse_to_the_same_map_modulo_order() {
    let response = Response::ok("hi")
        .with_header("X-Trace", "abc123")
        .with_header("X-Second", "xyz");
    let mut buf = Vec::new();
    response.write_to(&mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();

    // Reuse the request header grammar (`Name: value\r\n` lines up to a
    // blank line) to reparse the serialized header block directly, proving
    // the two share one wire format regardless of header iteration order.
    let header_block = text
        .split("\r\n\r\n")
        .next()
        .unwrap()
        .splitn(2, "\r\n")
        .nth(1)
        .unwrap();
    let synthetic = format!("GET / HTTP/1.1\r\n{header_block}\r\n\r\nhi");
    let reparsed = parse(&synthetic);
    assert_eq!(reparsed.header("content-length"), Some("2"));
    assert_eq!(reparsed.header("x-trace"), Some("abc123"));
    assert_eq!(reparsed.header("x-second"), Some("xyz"));
}

#[test]
fn url_encoded_and_multipart_requests_populate_independent_fields() {
    let urlencoded = parse(&format!(
        "POST /a HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\nname=Alice%20Liddell&age=7",
        "name=Alice%20Liddell&age=7".len()
    ));
    assert_eq!(
        urlencoded.form_fields.get("name").map(String::as_str),
        Some("Alice Liddell")
    );

    let body = concat!(
        "--X\r\n",
        "Content-Disposition: form-data; name=\"description\"\r\n",
        "\r\n",
        "hello\r\n",
        "--X\r\n",
        "Content-Disposition: form-data; name=\"myFile\"; filename=\"a.txt\"\r\n",
        "\r\n",
        "abc\r\n",
        "--X--\r\n",
    );
    let multipart = parse(&format!(
        "POST /b HTTP/1.1\r\nContent-Type: multipart/form-data; boundary=X\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    ));
    assert_eq!(
        multipart.form_fields.get("description").map(String::as_str),
        Some("hello")
    );
    assert_eq!(multipart.upload_files["myFile"].filename, "a.txt");

    // The two requests' decoded maps are independent: urlencoded has no
    // upload files and multipart has no "name"/"age" fields.
    assert!(urlencoded.upload_files.is_empty());
    assert!(!multipart.form_fields.contains_key("name"));
}
