use crate::cmd::{connect, ConnectionArgs, TypeArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_type, OutputFormat};

pub async fn run(args: TypeArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let client = connect(conn).await?;
    let result = client.resolve(&args.path).await;
    client.disconnect().await;

    let (_, node) = result.map_err(|err| client_error(&format!("resolve {} failed", args.path), err))?;
    print_type(&args.path, &node, format);
    Ok(SUCCESS)
}
