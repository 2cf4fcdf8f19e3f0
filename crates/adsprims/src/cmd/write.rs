use adsprims_types::Value;
use serde::Serialize;

use crate::cmd::{connect, ConnectionArgs, WriteArgs};
use crate::exit::{client_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct WriteOutput<'a> {
    path: &'a str,
    written: bool,
}

pub async fn run(args: WriteArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let value = parse_value(&args.value)?;

    let client = connect(conn).await?;
    let result = client.write_value(&args.path, &value).await;
    client.disconnect().await;
    result.map_err(|err| client_error(&format!("write {} failed", args.path), err))?;

    match format {
        OutputFormat::Json => print_json(&WriteOutput {
            path: &args.path,
            written: true,
        }),
        OutputFormat::Table | OutputFormat::Pretty => println!("wrote {}", args.path),
    }
    Ok(SUCCESS)
}

fn parse_value(input: &str) -> CliResult<Value> {
    serde_json::from_str(input)
        .map_err(|err| CliError::new(DATA_INVALID, format!("value is not valid JSON: {err}")))
}
