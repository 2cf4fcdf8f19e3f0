use adsprims_transport::{TcpTransport, DEFAULT_ROUTER_PORT};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("adsprims {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: adsprims");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("ADSPRIMS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "transport: {} (router port {})",
        TcpTransport::transport_name(),
        DEFAULT_ROUTER_PORT
    );
    println!(
        "features: client={}, cli=true",
        cfg!(feature = "client")
    );

    Ok(SUCCESS)
}
