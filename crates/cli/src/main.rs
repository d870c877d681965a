mod cli;
mod commands;

use crate::cli::{Commands, ServerArgs, TypelensCli};
use logging::{LogMode, LoggingGuards};

fn init_logging(args: &ServerArgs) -> anyhow::Result<Option<LoggingGuards>> {
    let mode = match (&args.log_dir, args.quiet) {
        (None, _) => LogMode::Cli,
        (Some(_), false) => LogMode::Foreground,
        (Some(_), true) => LogMode::Background,
    };
    logging::init(mode, args.verbose, args.log_dir.clone())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = TypelensCli::parse_args();

    match cli.command {
        Commands::Analyze(args) => {
            let _guards = init_logging(&args.server)?;
            commands::analyze::run(args).await
        }
        Commands::Hover(args) => {
            let _guards = init_logging(&args.server)?;
            commands::hover::run(args).await
        }
        Commands::Measure(args) => {
            let _guards = init_logging(&args.server)?;
            commands::measure::run(args).await
        }
    }
}
