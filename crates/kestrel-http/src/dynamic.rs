use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use libloading::{Library, Symbol};

use crate::config::Config;
use crate::request::Request;
use crate::response::Response;

/// The ABI every dynamically loaded handler symbol must match: given the
/// server's configuration, the parsed request, and the route parameters,
/// produce a response.
pub type DynamicHandlerFn =
    unsafe extern "C" fn(&Config, &Request, &HashMap<String, String>) -> Response;

/// A handler resolved from a dynamically loaded module, or the built-in
/// stub returned when resolution failed.
pub type Handler = Box<dyn Fn(&Config, &Request, &HashMap<String, String>) -> Response + Send + Sync>;

/// Owns every dynamically loaded code unit registered with it and the
/// lookup that resolves a handler name within one. `load` never panics or
/// propagates an error to the caller: a missing module or symbol resolves
/// to a stub handler that answers `500`, and a descriptive message is
/// reported through `on_error`.
pub struct DynamicRegistry<F: Fn(&str) + Send + Sync> {
    libraries: Mutex<HashMap<u32, Library>>,
    next_id: AtomicU32,
    on_error: F,
}

impl<F: Fn(&str) + Send + Sync> DynamicRegistry<F> {
    pub fn new(on_error: F) -> Self {
        Self {
            libraries: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            on_error,
        }
    }

    /// Loads the code unit at `path` and assigns it an opaque id. Returns
    /// `0` if the module could not be opened; the error callback receives a
    /// descriptive message in that case.
    pub fn register(&self, path: &str) -> u32 {
        // SAFETY: the caller attests `path` names a code unit built for this
        // registry's handler ABI; loading an arbitrary library is inherently
        // unsafe, which is why the registry confines it to setup time.
        let library = unsafe { Library::new(path) };
        match library {
            Ok(library) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                self.libraries.lock().unwrap().insert(id, library);
                id
            }
            Err(err) => {
                (self.on_error)(&format!("failed to load dynamic module {path}: {err}"));
                0
            }
        }
    }

    /// Resolves `name` within the module registered under `id`. On any
    /// failure (unknown id, missing symbol) returns the `500` stub handler
    /// and reports the failure via the error callback.
    pub fn load(&self, id: u32, name: &str) -> Handler {
        match self.try_load(id, name) {
            Ok(handler) => handler,
            Err(message) => {
                (self.on_error)(&message);
                stub_handler()
            }
        }
    }

    fn try_load(&self, id: u32, name: &str) -> Result<Handler, String> {
        let libraries = self.libraries.lock().unwrap();
        let library = libraries
            .get(&id)
            .ok_or_else(|| format!("no dynamic module registered under id {id}"))?;
        // SAFETY: the caller attests the symbol named `name` in this module
        // matches `DynamicHandlerFn`'s calling convention and signature.
        let symbol: Symbol<DynamicHandlerFn> = unsafe {
            library
                .get(name.as_bytes())
                .map_err(|err| format!("symbol {name} not found in module {id}: {err}"))?
        };
        let function = *symbol;
        Ok(Box::new(move |config: &Config, request: &Request, params: &HashMap<String, String>| {
            // SAFETY: `function` was resolved against `DynamicHandlerFn` above.
            unsafe { function(config, request, params) }
        }))
    }
}

fn stub_handler() -> Handler {
    Box::new(|_config, _request, _params| {
        Response::internal_error("Error 500: dynamic handler unavailable")
            .with_header("Content-Type", "text/plain")
    })
}
