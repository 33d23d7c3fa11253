use radix_dispatch::cli::run_cli;
use radix_dispatch::logging::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    let _guard = init_logging(&LogConfig::from_env())?;
    run_cli()
}
