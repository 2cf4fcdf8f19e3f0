use tracing::info;

use crate::cmd::{connect, ConnectionArgs, ControlAction, ControlArgs};
use crate::exit::{client_error, CliResult, SUCCESS};

pub async fn run(args: ControlArgs, conn: &ConnectionArgs) -> CliResult<i32> {
    let client = connect(conn).await?;
    let result = match args.action {
        ControlAction::Run => client.set_system_run_mode().await,
        ControlAction::Config => client.set_system_config_mode().await,
        ControlAction::Start => client.start_plc().await,
        ControlAction::Stop => client.stop_plc().await,
        ControlAction::Reset => client.reset_plc().await,
    };
    client.disconnect().await;

    result.map_err(|err| client_error(&format!("{:?} failed", args.action), err))?;
    info!(action = ?args.action, target = %client.target(), "state change requested");
    Ok(SUCCESS)
}
