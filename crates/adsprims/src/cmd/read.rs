use crate::cmd::{connect, ConnectionArgs, ReadArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_value, OutputFormat};

pub async fn run(args: ReadArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let client = connect(conn).await?;
    let result = client.read_value(&args.path).await;
    client.disconnect().await;

    let value = result.map_err(|err| client_error(&format!("read {} failed", args.path), err))?;
    print_value(&args.path, &value, format);
    Ok(SUCCESS)
}
