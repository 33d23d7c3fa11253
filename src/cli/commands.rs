use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use http::Method;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::context::PoolStats;
use crate::dispatcher::{DispatchService, Dispatcher};
use crate::middleware::MetricsSnapshot;
use crate::registry::HandlerRegistry;
use crate::router::{normalize_path, Captures, Lookup};
use crate::table::RouteTable;

/// Command-line interface for radix-dispatch
///
/// Inspects route tables and drives synthetic traffic through the dispatcher.
#[derive(Parser, Debug)]
#[command(name = "radix-dispatch")]
#[command(about = "Radix-tree request dispatcher", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the routes of a route table
    Routes {
        /// Route table (YAML)
        #[arg(short, long, env = "RADIX_ROUTES")]
        config: PathBuf,

        /// Print the radix tree instead of the flat list
        #[arg(long, default_value_t = false)]
        tree: bool,
    },
    /// Show how a request would be routed
    Resolve {
        /// Route table (YAML)
        #[arg(short, long, env = "RADIX_ROUTES")]
        config: PathBuf,

        /// HTTP method, e.g. GET
        method: String,

        /// Request path, e.g. /users/42
        path: String,

        /// Also run the request through the full pipeline and show the response
        #[arg(long, default_value_t = false)]
        execute: bool,
    },
    /// Drive synthetic requests through the dispatcher on coroutines
    Load {
        /// Route table (YAML)
        #[arg(short, long, env = "RADIX_ROUTES")]
        config: PathBuf,

        /// Total number of requests
        #[arg(short = 'n', long, default_value_t = 10_000)]
        requests: usize,

        /// Number of concurrent coroutines
        #[arg(short = 'j', long, default_value_t = 8)]
        concurrency: usize,

        /// HTTP method for every request
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path; repeat to rotate through several paths
        #[arg(short, long, required = true)]
        path: Vec<String>,
    },
}

/// Parse arguments and run the selected command
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Routes { config, tree } => {
            let (dispatcher, _) = load_dispatcher(&config)?;
            print!("{}", routes_report(&dispatcher, tree));
            Ok(())
        }
        Commands::Resolve {
            config,
            method,
            path,
            execute,
        } => {
            let (dispatcher, _) = load_dispatcher(&config)?;
            let method = parse_method(&method)?;
            let mut report = resolve_report(&dispatcher, &method, &path);
            if execute {
                let service = dispatcher.build();
                report["response"] = execute_report(&service, method, &path)?;
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Load {
            config,
            requests,
            concurrency,
            method,
            path,
        } => {
            let (dispatcher, registry) = load_dispatcher(&config)?;
            let options = LoadOptions {
                requests,
                concurrency,
                method: parse_method(&method)?,
                paths: path,
                stack_size: dispatcher.config().stack_size,
            };
            let service = Arc::new(dispatcher.build());
            let report = run_load(&service, &options, &registry)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{method}'"))
}

/// Load a route table and build a dispatcher from it with the built-in registry
pub fn load_dispatcher(path: &Path) -> Result<(Dispatcher, HandlerRegistry)> {
    let table = RouteTable::load(path)?;
    let registry = HandlerRegistry::with_builtins();
    let dispatcher = table
        .build_dispatcher(&registry)
        .with_context(|| format!("failed to apply route table {}", path.display()))?;
    Ok((dispatcher, registry))
}

/// One line per route (`METHOD PATH -> handler`), or the radix tree
#[must_use]
pub fn routes_report(dispatcher: &Dispatcher, tree: bool) -> String {
    if tree {
        return dispatcher.router().render_tree();
    }
    let width = dispatcher
        .routes()
        .iter()
        .map(|r| r.path.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for route in dispatcher.routes() {
        out.push_str(&format!(
            "{:<7} {:<width$} -> {}\n",
            route.method.as_str(),
            route.path,
            route.handler_name
        ));
    }
    out
}

/// Routing decision for `method path` as JSON
#[must_use]
pub fn resolve_report(dispatcher: &Dispatcher, method: &Method, path: &str) -> serde_json::Value {
    let normalized = normalize_path(path);
    let mut captures = Captures::new();
    let lookup = dispatcher.router().lookup(method, normalized, &mut captures);
    let status = lookup.status().as_u16();
    match lookup {
        Lookup::Found(endpoint) => {
            let params: Vec<(String, String)> = endpoint
                .route
                .param_names
                .iter()
                .zip(captures.iter())
                .map(|(name, &(start, end))| (name.to_string(), normalized[start..end].to_string()))
                .collect();
            json!({
                "method": method.as_str(),
                "path": normalized,
                "status": status,
                "route": &*endpoint.route.template,
                "handler": &*endpoint.route.handler_name,
                "params": params,
            })
        }
        other => {
            let mut allowed: Vec<String> = other
                .allowed_methods()
                .iter()
                .map(|m| m.as_str().to_string())
                .collect();
            allowed.sort_unstable();
            json!({
                "method": method.as_str(),
                "path": normalized,
                "status": status,
                "allowed": allowed,
            })
        }
    }
}

fn execute_report(service: &DispatchService, method: Method, path: &str) -> Result<serde_json::Value> {
    let request = http::Request::builder()
        .method(method)
        .uri(path)
        .body(Vec::new())
        .context("invalid request")?;
    let response = service.serve(request);
    let headers: serde_json::Map<String, serde_json::Value> = response
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                json!(String::from_utf8_lossy(v.as_bytes())),
            )
        })
        .collect();
    Ok(json!({
        "status": response.status().as_u16(),
        "headers": headers,
        "body": String::from_utf8_lossy(response.body()),
    }))
}

/// Parameters of a synthetic load run
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub requests: usize,
    pub concurrency: usize,
    pub method: Method,
    pub paths: Vec<String>,
    /// Coroutine stack size in bytes
    pub stack_size: usize,
}

/// Outcome of a synthetic load run
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub requests: usize,
    pub concurrency: usize,
    pub elapsed_ms: u128,
    pub requests_per_sec: f64,
    pub success: usize,
    pub client_errors: usize,
    pub server_errors: usize,
    pub pool: PoolReport,
    pub metrics: MetricsReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub allocated: u64,
    pub reused: u64,
    pub discarded: u64,
    pub idle: usize,
    pub generation: u64,
}

impl From<PoolStats> for PoolReport {
    fn from(stats: PoolStats) -> Self {
        Self {
            allocated: stats.allocated,
            reused: stats.reused,
            discarded: stats.discarded,
            idle: stats.idle,
            generation: stats.generation,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub requests: u64,
    pub handler_errors: u64,
    pub average_latency_us: u128,
}

impl From<MetricsSnapshot> for MetricsReport {
    fn from(snap: MetricsSnapshot) -> Self {
        Self {
            requests: snap.requests,
            handler_errors: snap.handler_errors,
            average_latency_us: snap.average_latency.as_micros(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    success: usize,
    client_errors: usize,
    server_errors: usize,
}

/// Serve `options.requests` requests from `options.concurrency` coroutines
pub fn run_load(
    service: &Arc<DispatchService>,
    options: &LoadOptions,
    registry: &HandlerRegistry,
) -> Result<LoadReport> {
    anyhow::ensure!(!options.paths.is_empty(), "at least one path is required");
    let concurrency = options.concurrency.max(1);
    let paths: Arc<[String]> = Arc::from(options.paths.clone());

    info!(
        requests = options.requests,
        concurrency,
        paths = paths.len(),
        stack_size = options.stack_size,
        "Starting load run"
    );

    let start = Instant::now();
    let mut handles = Vec::with_capacity(concurrency);
    for worker in 0..concurrency {
        // Spread the remainder over the first workers
        let share = options.requests / concurrency + usize::from(worker < options.requests % concurrency);
        let service = Arc::clone(service);
        let paths = Arc::clone(&paths);
        let method = options.method.clone();
        let builder = may::coroutine::Builder::new()
            .name(format!("load-{worker}"))
            .stack_size(options.stack_size);
        // SAFETY: the coroutine only touches the shared service and its own
        // locals; it does not rely on thread-local state of the spawning thread.
        #[allow(unsafe_code)]
        let handle = unsafe {
            builder.spawn(move || {
                let mut tally = Tally::default();
                for i in 0..share {
                    let path = &paths[(worker + i) % paths.len()];
                    let request = match http::Request::builder()
                        .method(method.clone())
                        .uri(path.as_str())
                        .body(Vec::new())
                    {
                        Ok(request) => request,
                        Err(_) => {
                            tally.client_errors += 1;
                            continue;
                        }
                    };
                    let status = service.serve(request).status();
                    if status.is_server_error() {
                        tally.server_errors += 1;
                    } else if status.is_client_error() {
                        tally.client_errors += 1;
                    } else {
                        tally.success += 1;
                    }
                }
                tally
            })
        }
        .context("failed to spawn load coroutine")?;
        handles.push(handle);
    }

    let mut total = Tally::default();
    for handle in handles {
        let tally = handle
            .join()
            .map_err(|_| anyhow::anyhow!("load coroutine panicked"))?;
        total.success += tally.success;
        total.client_errors += tally.client_errors;
        total.server_errors += tally.server_errors;
    }
    let elapsed = start.elapsed();

    Ok(LoadReport {
        requests: options.requests,
        concurrency,
        elapsed_ms: elapsed.as_millis(),
        requests_per_sec: per_second(options.requests, elapsed),
        success: total.success,
        client_errors: total.client_errors,
        server_errors: total.server_errors,
        pool: service.pool_stats().into(),
        metrics: registry.metrics().snapshot().into(),
    })
}

fn per_second(count: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        0.0
    } else {
        count as f64 / secs
    }
}
