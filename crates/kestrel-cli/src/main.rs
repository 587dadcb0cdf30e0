mod cli;
mod cron_file;
mod shutdown;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use kestrel_core::TaskPool;
use kestrel_cron::CronScheduler;
use kestrel_http::{load_config, Config, DynamicRegistry, HttpServer, Request, Response, Router, StaticServer};

use crate::cli::Cli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    shutdown::install();

    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("no config loaded from {}: {err}", cli.config);
            Config::empty()
        }
    };
    let config = Arc::new(config);

    let mut router = Router::new();
    register_builtin_routes(&mut router);
    // Kept alive for the server's whole lifetime: dropping it would unload
    // the module backing any route registered against it.
    let _dynamic_registry = register_dynamic_route(&mut router, &config);

    let static_server = cli
        .public_dir
        .as_ref()
        .map(|dir| StaticServer::new(dir.clone(), cli.spa));

    let server = Arc::new(HttpServer::new(
        cli.host.clone(),
        cli.port,
        cli.worker_count(),
        router,
        static_server,
        HashMap::new(),
        Arc::clone(&config),
        |message: &str| log::error!("{message}"),
    ));

    let cron_pool = Arc::new(TaskPool::new(cli.worker_count()));
    let scheduler = Arc::new(CronScheduler::new(Arc::clone(&cron_pool)));
    if let Some(cron_file) = &cli.cron_file {
        for job in cron_file::load_jobs(cron_file).context("loading cron file")? {
            let id = job.id.clone();
            if let Err(err) = scheduler.add(
                job.id,
                job.description,
                &job.expression,
                Arc::new(move || log::info!("cron job {id} fired")),
            ) {
                log::error!("failed to register cron job: {err}");
            }
        }
    }

    server.start();
    scheduler.start();
    log::info!("kestrel listening on {}:{}", cli.host, cli.port);

    while !shutdown::requested() {
        std::thread::sleep(Duration::from_millis(200));
    }

    log::info!("shutting down");
    scheduler.stop();
    server.stop();
    Ok(())
}

fn register_builtin_routes(router: &mut Router) {
    router.add_route(
        "GET",
        "/health",
        Arc::new(|_req: &Request| Response::ok("ok")),
    );

    router.add_route(
        "GET",
        "/api/echo/{name}",
        Arc::new(|req: &Request| {
            let name = req.params.get("name").map(String::as_str).unwrap_or("");
            Response::ok(format!("hello, {name}")).with_header("Content-Type", "text/plain")
        }),
    );

    router.add_route(
        "POST",
        "/api/submit",
        Arc::new(|req: &Request| {
            let mut body = String::new();
            for (key, value) in &req.form_fields {
                body.push_str(key);
                body.push('=');
                body.push_str(value);
                body.push('\n');
            }
            for (field, file) in &req.upload_files {
                body.push_str(&format!("{field} uploaded {} ({} bytes)\n", file.filename, file.data.len()));
            }
            Response::ok(body).with_header("Content-Type", "text/plain")
        }),
    );
}

/// If the loaded configuration names a dynamically loaded handler module
/// (`DYNAMIC_MODULE`/`DYNAMIC_HANDLER`/`DYNAMIC_ROUTE`), registers it and
/// returns the registry that owns the loaded module. The caller must keep
/// the returned registry alive for as long as the route may be invoked:
/// dropping it unloads the module.
fn register_dynamic_route(
    router: &mut Router,
    config: &Arc<Config>,
) -> Option<DynamicRegistry<impl Fn(&str) + Send + Sync>> {
    let (Some(module), Some(handler_name), Some(route)) = (
        config.get("DYNAMIC_MODULE"),
        config.get("DYNAMIC_HANDLER"),
        config.get("DYNAMIC_ROUTE"),
    ) else {
        return None;
    };

    let registry = DynamicRegistry::new(|message: &str| log::error!("{message}"));
    let id = registry.register(module);
    let handler = registry.load(id, handler_name);
    let config = Arc::clone(config);

    router.add_route(
        "GET",
        route,
        Arc::new(move |req: &Request| handler(&config, req, &req.params)),
    );

    Some(registry)
}
