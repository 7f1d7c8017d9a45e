use std::process::ExitCode;

use clap::Parser;
use vmbox_logging::vmbox_error;

mod platform;

fn main() -> ExitCode {
    let cli = platform::cli::Cli::parse();
    vmbox_logging::initialize(cli.log.destination(), cli.log_level());

    match platform::run_app(cli) {
        Ok(code) => code,
        Err(err) => {
            vmbox_error!("{:#}", err);
            eprintln!("vmbox: {err:#}");
            ExitCode::FAILURE
        }
    }
}
