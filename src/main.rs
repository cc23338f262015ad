use clap::Parser;

use objpatchdiff::cli::Cli;
use objpatchdiff::config::RunConfig;
use objpatchdiff::{logging, pipeline};

fn main() {
    let cli = Cli::parse();
    let config: RunConfig = cli.into();
    logging::init(config.verbose);

    match pipeline::run(&config) {
        Ok(_) => std::process::exit(0),
        Err(err) => {
            tracing::error!("{err}");
            std::process::exit(err.exit_code());
        }
    }
}
