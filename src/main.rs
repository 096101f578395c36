use clap::Parser;
use switchyard::cli::{run_cli, Cli};
use switchyard::logging::{init_logging, LogConfig};
use switchyard::runtime_config::RuntimeConfig;

fn main() -> anyhow::Result<()> {
    let log_config = LogConfig::from_env();
    init_logging(&log_config);

    let runtime = RuntimeConfig::from_env();
    runtime.apply();

    run_cli(Cli::parse())
}
