use analysis::{ResolutionState, ResolutionStatus};
use anyhow::Result;

use crate::cli::AnalyzeArgs;
use crate::commands::{connect, read_source};

pub async fn run(args: AnalyzeArgs) -> Result<()> {
    let source = read_source(&args.file)?;
    let connection = connect(&args.server, &source).await?;
    let states = connection.coordinator.snapshot();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&states)?);
    } else {
        for state in &states {
            println!("{}", format_state(state));
        }
    }

    connection.coordinator.shutdown();
    Ok(())
}

fn format_state(state: &ResolutionState) -> String {
    let receiver = match (&state.status, &state.info) {
        (ResolutionStatus::Resolved, Some(info)) => info.class_name.as_str(),
        (status, _) => status.as_str(),
    };
    format!("{}:{}\t{}\t{}", state.line, state.col, state.name, receiver)
}
