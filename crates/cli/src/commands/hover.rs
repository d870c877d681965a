use anyhow::Result;

use crate::cli::HoverArgs;
use crate::commands::{connect, read_source};

pub async fn run(args: HoverArgs) -> Result<()> {
    let source = read_source(&args.file)?;
    let connection = connect(&args.server, &source).await?;

    let type_name = connection
        .coordinator
        .resolve_at_cursor(args.line, args.col)
        .await;
    println!("{}", type_name.as_deref().unwrap_or("unknown"));

    connection.coordinator.shutdown();
    Ok(())
}
