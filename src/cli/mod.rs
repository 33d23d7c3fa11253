//! # CLI Module
//!
//! Command-line tooling around a YAML route table (see [`crate::table`]).
//!
//! ## Commands
//!
//! ### `routes`
//!
//! ```bash
//! radix-dispatch routes --config routes.yaml
//! radix-dispatch routes --config routes.yaml --tree
//! ```
//!
//! ### `resolve`
//!
//! Shows the routing decision (route, parameters, 404/405 with allowed
//! methods) as JSON. `--execute` also serves the request through the full
//! middleware pipeline.
//!
//! ```bash
//! radix-dispatch resolve --config routes.yaml GET /api/v1/users/42 --execute
//! ```
//!
//! ### `load`
//!
//! Spawns coroutines that call the dispatcher directly, then reports
//! throughput, status classes and pool reuse.
//!
//! ```bash
//! radix-dispatch load --config routes.yaml -n 100000 -j 16 -p /health -p /api/v1/users/7
//! ```
//!
//! `--config` falls back to `RADIX_ROUTES`.

mod commands;


pub use commands::{
    load_dispatcher, resolve_report, routes_report, run, run_cli, run_load, Cli, Commands,
    LoadOptions, LoadReport, MetricsReport, PoolReport,
};
