use adsprims_client::ClientError;
use adsprims_frame::index::PORT_SYSTEM_SERVICE;
use adsprims_frame::AdsState;
use serde::Serialize;

use crate::cmd::{connect, ConnectionArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct InfoOutput {
    router: String,
    local_address: String,
    target: String,
    device_name: String,
    version: String,
    ads_state: String,
    device_state: u16,
    system_state: Option<String>,
}

pub async fn run(conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let client = connect(conn).await?;

    let result = async {
        let info = client.read_device_info().await?;
        let state = client.read_state().await?;
        // The system service may refuse when the target is a bare runtime.
        let system = client
            .read_state_at(PORT_SYSTEM_SERVICE)
            .await
            .ok()
            .map(|s| s.ads_state);
        Ok::<_, ClientError>((info, state, system))
    }
    .await;
    client.disconnect().await;
    let (info, state, system) = result.map_err(|err| client_error("info failed", err))?;

    let out = InfoOutput {
        router: conn.router.clone(),
        local_address: client.local_address().to_string(),
        target: client.target().to_string(),
        device_name: info.name.clone(),
        version: info.version(),
        ads_state: state.ads_state.to_string(),
        device_state: state.device_state,
        system_state: system.map(|s: AdsState| s.to_string()),
    };
    print_info(&out, format);
    Ok(SUCCESS)
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Device Info:");
            println!("  Router:        {}", out.router);
            println!("  Local address: {}", out.local_address);
            println!("  Target:        {}", out.target);
            println!("  Device:        {} {}", out.device_name, out.version);
            println!("  ADS state:     {} (device state {})", out.ads_state, out.device_state);
            match &out.system_state {
                Some(state) => println!("  System state:  {state}"),
                None => println!("  System state:  unavailable"),
            }
        }
    }
}
