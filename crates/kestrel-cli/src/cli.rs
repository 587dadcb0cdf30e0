use clap::Parser;

/// Default worker count when `--workers`/`KESTREL_WORKERS` is unset or `0`:
/// the number of available CPUs, falling back to 4.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[derive(Debug, Clone, Parser)]
#[command(name = "kestrel", version, about = "Kestrel HTTP server and cron scheduler")]
pub struct Cli {
    /// Host to bind the HTTP listener to. `localhost`/`127.0.0.1` bind to
    /// every interface.
    #[arg(long, env = "KESTREL_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the HTTP listener to.
    #[arg(long, env = "KESTREL_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Worker threads for the HTTP server's task pool. `0` uses the
    /// available CPU count.
    #[arg(long, env = "KESTREL_WORKERS", default_value_t = 0)]
    pub workers: usize,

    /// Directory to serve static files from, if any.
    #[arg(long, env = "KESTREL_PUBLIC_DIR")]
    pub public_dir: Option<String>,

    /// Fall back to `index.html` for non-asset paths under `public_dir`
    /// that match no route and no static file.
    #[arg(long, env = "KESTREL_SPA", default_value_t = false)]
    pub spa: bool,

    /// Dotenv-shaped configuration file passed through to every handler.
    #[arg(long, env = "KESTREL_CONFIG", default_value = ".env")]
    pub config: String,

    /// Optional cron job list: one `id;description;expression` line per
    /// job, `#`-comments and blank lines skipped.
    #[arg(long, env = "KESTREL_CRON_FILE")]
    pub cron_file: Option<String>,
}

impl Cli {
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            default_workers()
        } else {
            self.workers
        }
    }
}
