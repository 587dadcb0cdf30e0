//! An HTTP/1.1 server core: request parsing (headers, cookies,
//! URL-encoded and multipart bodies), `{name}`-placeholder routing, static
//! file serving with optional single-page-app fallback, dynamically loaded
//! handlers, and a dotenv-shaped configuration reader. One request per
//! connection; no TLS, keep-alive, or pipelining.

mod config;
mod dynamic;
mod error;
mod multipart;
mod request;
mod response;
mod router;
mod server;
mod static_server;
mod urlencoded;

pub use config::{load_config, Config};
pub use dynamic::{DynamicHandlerFn, DynamicRegistry, Handler as DynamicHandler};
pub use error::HttpError;
pub use request::{Request, RequestParser, UploadedFile, MAX_HEADER_BYTES};
pub use response::Response;
pub use router::{Handler, Router};
pub use server::{ErrorPages, HttpServer};
pub use static_server::StaticServer;
