use std::time::Duration;

use adsprims_client::{AdsClient, ClientConfig};
use adsprims_frame::{AmsAddress, AmsNetId};
use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{client_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod control;
pub mod info;
pub mod read;
pub mod typeinfo;
pub mod version;
pub mod watch;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show device info and ADS states.
    Info,
    /// Read a variable by symbol path.
    Read(ReadArgs),
    /// Write a JSON value to a variable.
    Write(WriteArgs),
    /// Subscribe to a variable and print each sample.
    Watch(WatchArgs),
    /// Print the resolved type tree of a variable.
    Type(TypeArgs),
    /// Change system or PLC runtime state.
    Control(ControlArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Info => info::run(conn, format).await,
        Command::Read(args) => read::run(args, conn, format).await,
        Command::Write(args) => write::run(args, conn, format).await,
        Command::Watch(args) => watch::run(args, conn, format).await,
        Command::Type(args) => typeinfo::run(args, conn, format).await,
        Command::Control(args) => control::run(args, conn).await,
        Command::Version(args) => version::run(args),
    }
}

/// Where to connect. Every flag falls back to an environment variable.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// AMS router address (host:port).
    #[arg(long, env = "ADSPRIMS_ROUTER", default_value = "127.0.0.1:48898", global = true)]
    pub router: String,

    /// Target AMS net id.
    #[arg(long, env = "ADSPRIMS_TARGET_NETID", default_value = "127.0.0.1.1.1", global = true)]
    pub target_netid: String,

    /// Target AMS port (851 = first TwinCAT 3 runtime).
    #[arg(long, env = "ADSPRIMS_TARGET_PORT", default_value_t = 851, global = true)]
    pub target_port: u16,

    /// Local AMS net id. Without it the router assigns the local address.
    #[arg(long, env = "ADSPRIMS_LOCAL_NETID", global = true)]
    pub local_netid: Option<String>,

    /// Local AMS port; required with --local-netid.
    #[arg(long, env = "ADSPRIMS_LOCAL_PORT", global = true)]
    pub local_port: Option<u16>,

    /// Per-request timeout (e.g. 2s, 500ms).
    #[arg(long, env = "ADSPRIMS_TIMEOUT", default_value = "2s", global = true)]
    pub timeout: String,
}

impl ConnectionArgs {
    pub fn client_config(&self) -> CliResult<ClientConfig> {
        let target_net_id = parse_net_id(&self.target_netid, "--target-netid")?;
        let local = match (&self.local_netid, self.local_port) {
            (Some(net_id), Some(port)) => {
                Some(AmsAddress::new(parse_net_id(net_id, "--local-netid")?, port))
            }
            (Some(_), None) => {
                return Err(CliError::new(USAGE, "--local-port is required with --local-netid"))
            }
            (None, Some(_)) => {
                return Err(CliError::new(USAGE, "--local-netid is required with --local-port"))
            }
            (None, None) => None,
        };

        Ok(ClientConfig {
            router_addr: self.router.clone(),
            target: AmsAddress::new(target_net_id, self.target_port),
            local,
            request_timeout: parse_duration(&self.timeout)?,
            ..ClientConfig::default()
        })
    }
}

pub async fn connect(conn: &ConnectionArgs) -> CliResult<AdsClient> {
    let config = conn.client_config()?;
    AdsClient::connect(config)
        .await
        .map_err(|err| client_error("connect failed", err))
}

fn parse_net_id(input: &str, flag: &str) -> CliResult<AmsNetId> {
    input
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("{flag}: invalid AMS net id '{input}'")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Symbol path, e.g. MAIN.counter.
    pub path: String,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Symbol path, e.g. MAIN.counter.
    pub path: String,
    /// Value as JSON (number, bool, string, array or object).
    pub value: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Symbol path, e.g. MAIN.counter.
    pub path: String,
    /// Exit after N samples.
    #[arg(long)]
    pub count: Option<usize>,
    /// Sampling cycle in milliseconds.
    #[arg(long, default_value_t = 200)]
    pub cycle_ms: u64,
    /// Only send samples when the value changes.
    #[arg(long)]
    pub on_change: bool,
}

#[derive(Args, Debug)]
pub struct TypeArgs {
    /// Symbol path, e.g. MAIN.recipe.
    pub path: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ControlAction {
    /// Restart the system service in run mode.
    Run,
    /// Restart the system service in config mode.
    Config,
    /// Start the PLC runtime.
    Start,
    /// Stop the PLC runtime.
    Stop,
    /// Reset the PLC runtime.
    Reset,
}

#[derive(Args, Debug)]
pub struct ControlArgs {
    pub action: ControlAction,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
