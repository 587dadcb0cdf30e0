use std::collections::HashMap;
use std::io::{BufReader, BufWriter};
use std::mem;
use std::net::{IpAddr, Ipv4Addr, TcpStream};
use std::os::unix::io::{FromRawFd, RawFd};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use kestrel_core::TaskPool;

use crate::config::Config;
use crate::error::HttpError;
use crate::request::{Request, RequestParser};
use crate::response::Response;
use crate::router::Router;
use crate::static_server::StaticServer;

/// Maps an HTTP status code to an on-disk file served in its place. If the
/// file is missing at serve time, a synthesized plain-text body is used
/// instead; the mapping is never required to be complete.
pub type ErrorPages = HashMap<u16, PathBuf>;

/// Binds a router, an optional static file server, error pages, and a
/// shared [`Config`] to a listening socket. One accepted connection serves
/// exactly one request: no keep-alive, no pipelining, no TLS.
pub struct HttpServer {
    host: String,
    port: u16,
    router: Router,
    static_server: Option<StaticServer>,
    error_pages: ErrorPages,
    config: Arc<Config>,
    pool: Arc<TaskPool>,
    listen_fd: AtomicI32,
    running: AtomicBool,
    on_error: Box<dyn Fn(&str) + Send + Sync>,
}

impl HttpServer {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        workers: usize,
        router: Router,
        static_server: Option<StaticServer>,
        error_pages: ErrorPages,
        config: Arc<Config>,
        on_error: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            router,
            static_server,
            error_pages,
            config,
            pool: Arc::new(TaskPool::new(workers)),
            listen_fd: AtomicI32::new(-1),
            running: AtomicBool::new(false),
            on_error: Box::new(on_error),
        }
    }

    /// Binds, listens (backlog 10), and submits the accept loop onto this
    /// server's own task pool. Each accepted connection is handled inline
    /// within that single accept task, matching the reference behavior: the
    /// accept loop does not fan connections out to other workers itself.
    /// Returns immediately once the listening socket is up; failures to
    /// bind/listen are reported through the error callback and leave the
    /// server not started.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let fd = match bind_and_listen(&self.host, self.port) {
            Ok(fd) => fd,
            Err(err) => {
                (self.on_error)(&format!("failed to start server: {err}"));
                self.running.store(false, Ordering::SeqCst);
                return;
            }
        };
        self.listen_fd.store(fd, Ordering::SeqCst);

        let server = Arc::clone(self);
        let _ = self.pool.submit(move || server.accept_loop(fd));
    }

    fn accept_loop(&self, fd: RawFd) {
        loop {
            let client_fd = unsafe { libc::accept(fd, std::ptr::null_mut(), std::ptr::null_mut()) };
            if client_fd < 0 {
                if !self.running.load(Ordering::SeqCst) {
                    return;
                }
                (self.on_error)(&format!(
                    "accept failed: {}",
                    std::io::Error::last_os_error()
                ));
                return;
            }
            // SAFETY: `accept` just returned an open, owned file descriptor.
            let stream = unsafe { TcpStream::from_raw_fd(client_fd) };
            self.handle_client(stream);
        }
    }

    fn handle_client(&self, stream: TcpStream) {
        let peer_stream = match stream.try_clone() {
            Ok(s) => s,
            Err(err) => {
                (self.on_error)(&format!("failed to clone connection: {err}"));
                return;
            }
        };
        let mut reader = BufReader::new(stream);
        let mut writer = BufWriter::new(peer_stream);

        let response = match RequestParser::parse(&mut reader) {
            Ok(request) => self.dispatch(request),
            Err(HttpError::BadRequest(message)) => {
                log::warn!("bad request: {message}");
                self.error_response(400, &message)
            }
            Err(other) => {
                log::error!("failed to parse request: {other}");
                self.error_response(500, &other.to_string())
            }
        };

        if let Err(err) = response.write_to(&mut writer) {
            log::warn!("failed to write response: {err}");
        }
    }

    fn dispatch(&self, mut request: Request) -> Response {
        if let Some((handler, params)) = self.router.route(&request.method, &request.path) {
            request.params = params;
            return guard_handler(|| handler(&request));
        }

        if let Some(static_server) = &self.static_server {
            if let Some(response) = static_server.serve(&request.path) {
                return response;
            }
        }

        self.error_response(404, "An unexpected error occurred.")
    }

    /// Builds a response for `status`: the registered error page if one is
    /// configured and its file still exists, otherwise a synthesized
    /// plain-text body.
    pub fn error_response(&self, status: u16, message: &str) -> Response {
        if let Some(path) = self.error_pages.get(&status) {
            if let Ok(body) = std::fs::read(path) {
                return Response::new(status)
                    .with_body(body)
                    .with_header("Content-Type", "text/html");
            }
        }
        Response::new(status)
            .with_body(format!("Error {status}: {message}"))
            .with_header("Content-Type", "text/plain")
    }

    /// The configuration snapshot passed to every handler.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Closes the listening socket (unblocking `accept`) and waits for the
    /// accept task and any in-flight request handling to finish. Idempotent.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let fd = self.listen_fd.swap(-1, Ordering::SeqCst);
        if fd >= 0 {
            unsafe {
                libc::close(fd);
            }
        }
        self.pool.wait_idle();
    }
}

fn guard_handler(run: impl FnOnce() -> Response) -> Response {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(run)) {
        Ok(response) => response,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            log::error!("handler panicked: {message}");
            Response::internal_error(format!("Error 500: {message}"))
                .with_header("Content-Type", "text/plain")
        }
    }
}

fn bind_and_listen(host: &str, port: u16) -> std::io::Result<RawFd> {
    let addr = resolve_bind_address(host);

    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0) };
    if fd < 0 {
        return Err(std::io::Error::last_os_error());
    }

    let enable: libc::c_int = 1;
    unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &enable as *const _ as *const libc::c_void,
            mem::size_of_val(&enable) as libc::socklen_t,
        );
        #[cfg(target_os = "linux")]
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEPORT,
            &enable as *const _ as *const libc::c_void,
            mem::size_of_val(&enable) as libc::socklen_t,
        );
    }

    let sockaddr = libc::sockaddr_in {
        sin_family: libc::AF_INET as libc::sa_family_t,
        sin_port: port.to_be(),
        sin_addr: libc::in_addr {
            s_addr: u32::from(addr).to_be(),
        },
        sin_zero: [0; 8],
    };

    let bind_result = unsafe {
        libc::bind(
            fd,
            &sockaddr as *const libc::sockaddr_in as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };
    if bind_result < 0 {
        let err = std::io::Error::last_os_error();
        unsafe { libc::close(fd) };
        return Err(err);
    }

    let listen_result = unsafe { libc::listen(fd, 10) };
    if listen_result < 0 {
        let err = std::io::Error::last_os_error();
        unsafe { libc::close(fd) };
        return Err(err);
    }

    Ok(fd)
}

/// `localhost` and `127.0.0.1` both bind to `INADDR_ANY` so the server is
/// reachable the same way regardless of which the caller wrote; any other
/// value is parsed as a literal IPv4 address.
fn resolve_bind_address(host: &str) -> Ipv4Addr {
    if host == "localhost" || host == "127.0.0.1" {
        return Ipv4Addr::UNSPECIFIED;
    }
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(addr)) => addr,
        _ => Ipv4Addr::UNSPECIFIED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Router;
    use std::io::{Read, Write};
    use std::net::TcpStream as StdTcpStream;
    use std::sync::Arc as StdArc;
    use std::time::Duration;

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn resolves_localhost_and_loopback_to_unspecified() {
        assert_eq!(resolve_bind_address("localhost"), Ipv4Addr::UNSPECIFIED);
        assert_eq!(resolve_bind_address("127.0.0.1"), Ipv4Addr::UNSPECIFIED);
        assert_eq!(resolve_bind_address("10.0.0.5"), Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn serves_a_registered_route_end_to_end() {
        let mut router = Router::new();
        router.add_route(
            "GET",
            "/hello/{name}",
            Arc::new(|req: &Request| {
                Response::ok(format!("hi {}", req.params.get("name").unwrap()))
            }),
        );

        let port = free_port();
        let server = StdArc::new(HttpServer::new(
            "127.0.0.1",
            port,
            2,
            router,
            None,
            HashMap::new(),
            StdArc::new(Config::empty()),
            |msg: &str| panic!("unexpected server error: {msg}"),
        ));
        server.start();
        std::thread::sleep(Duration::from_millis(50));

        let mut stream = StdTcpStream::connect(("127.0.0.1", port)).unwrap();
        stream
            .write_all(b"GET /hello/world HTTP/1.1\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();

        server.stop();

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("hi world"));
    }

    #[test]
    fn unmatched_route_returns_404() {
        let port = free_port();
        let server = StdArc::new(HttpServer::new(
            "127.0.0.1",
            port,
            1,
            Router::new(),
            None,
            HashMap::new(),
            StdArc::new(Config::empty()),
            |_msg: &str| {},
        ));
        server.start();
        std::thread::sleep(Duration::from_millis(50));

        let mut stream = StdTcpStream::connect(("127.0.0.1", port)).unwrap();
        stream.write_all(b"GET /missing HTTP/1.1\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();

        server.stop();

        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.contains("Error 404"));
    }
}
