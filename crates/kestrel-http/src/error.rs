/// Errors produced while parsing requests, routing, and serving them.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The request could not be parsed, or was malformed in a way the
    /// caller is responsible for (oversized headers, a multipart body
    /// missing its boundary, an unparseable request line).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No route, static file, or SPA fallback matched the request.
    #[error("not found")]
    NotFound,

    /// A handler failed, or a response could not be written back.
    #[error("internal error: {0}")]
    Internal(String),

    /// The server or one of its collaborators could not start up: the
    /// listening socket could not be bound, a configuration file could not
    /// be read or parsed, or a dynamic handler module failed to load.
    #[error("startup failed: {0}")]
    Startup(String),
}
