mod commands;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, Commands, probe, protocols};
use multiping_common::report::EXIT_CONFIGURATION_ERROR;
use multiping_core::Registry;
use terminal::{logging, print};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();

    logging::init(commands.verbose, commands.quiet);
    print::banner(commands.no_banner, commands.quiet);

    let code = match commands.command {
        Commands::Probe(args) => match probe::probe(args, commands.quiet).await {
            Ok(status) => ExitCode::from(status.exit_code()),
            Err(err) => {
                error!("{err:#}");
                ExitCode::from(EXIT_CONFIGURATION_ERROR)
            }
        },
        Commands::Protocols => {
            protocols::list(&Registry::with_defaults(), commands.quiet);
            ExitCode::SUCCESS
        }
    };

    if commands.quiet == 0 {
        print::end_of_program();
    }
    code
}
