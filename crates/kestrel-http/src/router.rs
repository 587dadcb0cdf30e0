use std::collections::HashMap;
use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;

/// A route handler: takes the matched request (route parameters already
/// filled in) and produces a response.
pub type Handler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

struct Route {
    method: String,
    segments: Vec<Segment>,
    handler: Handler,
}

/// Matches requests against registered `(method, path-pattern)` routes in
/// the order they were added; the first pattern that matches wins. Patterns
/// use `{name}` to capture a single path segment.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registers a handler for `method` and `pattern`, e.g. `"GET"`,
    /// `"/users/{id}"`.
    pub fn add_route(&mut self, method: &str, pattern: &str, handler: Handler) {
        let segments = compile_pattern(pattern);
        self.routes.push(Route {
            method: method.to_ascii_uppercase(),
            segments,
            handler,
        });
    }

    /// Finds the first registered route matching `method` and `path`,
    /// returning its handler and the path parameters it captured.
    pub fn route(&self, method: &str, path: &str) -> Option<(Handler, HashMap<String, String>)> {
        let method = method.to_ascii_uppercase();
        let path_segments: Vec<&str> = split_path(path);
        for route in &self.routes {
            if route.method != method {
                continue;
            }
            if let Some(params) = match_segments(&route.segments, &path_segments) {
                return Some((Arc::clone(&route.handler), params));
            }
        }
        None
    }
}

fn compile_pattern(pattern: &str) -> Vec<Segment> {
    split_path(pattern)
        .into_iter()
        .map(|part| {
            if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Segment::Param(name.to_string())
            } else {
                Segment::Literal(part.to_string())
            }
        })
        .collect()
}

/// Splits on `/` without discarding empty segments, so a pattern like
/// `/{id}` (`["", "{id}"]`) can still anchor against the path `/` (`["",
/// ""]`) and capture an empty value there, per a `{name}` placeholder
/// matching `[^/]*` (zero or more characters) rather than one-or-more.
fn split_path(path: &str) -> Vec<&str> {
    path.split('/').collect()
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> Option<HashMap<String, String>> {
    if pattern.len() != path.len() {
        return None;
    }
    let mut params = HashMap::new();
    for (segment, actual) in pattern.iter().zip(path.iter()) {
        match segment {
            Segment::Literal(expected) => {
                if expected != actual {
                    return None;
                }
            }
            Segment::Param(name) => {
                if !actual.is_empty() {
                    params.insert(name.clone(), actual.to_string());
                }
            }
        }
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(body: &'static str) -> Handler {
        Arc::new(move |_req| Response::ok(body))
    }

    #[test]
    fn matches_literal_path() {
        let mut router = Router::new();
        router.add_route("GET", "/health", handler("ok"));
        let (_, params) = router.route("GET", "/health").unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn captures_named_parameters() {
        let mut router = Router::new();
        router.add_route("GET", "/users/{id}/posts/{slug}", handler("post"));
        let (_, params) = router.route("GET", "/users/42/posts/hello-world").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert_eq!(params.get("slug").map(String::as_str), Some("hello-world"));
    }

    #[test]
    fn first_registered_match_wins() {
        let mut router = Router::new();
        router.add_route("GET", "/users/{id}", handler("dynamic"));
        router.add_route("GET", "/users/me", handler("me"));
        // The dynamic route was registered first, so it wins even though
        // "/users/me" also matches literally.
        let (handler, params) = router.route("GET", "/users/me").unwrap();
        let response = handler(&dummy_request());
        assert_eq!(response.body, b"dynamic");
        assert_eq!(params.get("id").map(String::as_str), Some("me"));
    }

    #[test]
    fn empty_capture_is_omitted_but_still_matches() {
        let mut router = Router::new();
        router.add_route("GET", "/{id}", handler("item"));
        let (_, params) = router.route("GET", "/123").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("123"));

        let (_, params) = router.route("GET", "/").unwrap();
        assert!(!params.contains_key("id"));
    }

    #[test]
    fn no_match_returns_none() {
        let router = Router::new();
        assert!(router.route("GET", "/missing").is_none());
    }

    #[test]
    fn method_mismatch_does_not_match() {
        let mut router = Router::new();
        router.add_route("POST", "/submit", handler("posted"));
        assert!(router.route("GET", "/submit").is_none());
    }

    fn dummy_request() -> Request {
        use std::io::BufReader;
        let mut reader = BufReader::new("GET / HTTP/1.1\r\n\r\n".as_bytes());
        crate::request::RequestParser::parse(&mut reader).unwrap()
    }
}
