use anyhow::Result;

use crate::cli::MeasureArgs;
use crate::commands::{connect, read_source};

pub async fn run(args: MeasureArgs) -> Result<()> {
    let source = read_source(&args.file)?;
    let connection = connect(&args.server, &source).await?;

    let value = connection
        .coordinator
        .measure_value(&args.expression, args.line, args.col)
        .await?;
    match value {
        Some(value) => println!("{value}"),
        None => eprintln!("No value for `{}` at {}:{}", args.expression, args.line, args.col),
    }

    connection.coordinator.shutdown();
    Ok(())
}
