use std::time::Duration;

use adsprims_frame::index::PORT_PLC_RUNTIME_TC3;
use adsprims_frame::{AmsAddress, AmsNetId, DEFAULT_MAX_FRAME};
use adsprims_transport::DEFAULT_ROUTER_PORT;

/// Connection and client behaviour.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host` or `host:port` of the AMS router. Default port: 48898.
    pub router_addr: String,
    /// Device and runtime port every request goes to unless overridden.
    pub target: AmsAddress,
    /// Fixed local address. `None` registers a port with the router.
    pub local: Option<AmsAddress>,
    pub connect_timeout: Duration,
    /// Default per-request reply timeout.
    pub request_timeout: Duration,
    /// Largest accepted AMS/TCP frame body.
    pub max_frame_size: usize,
    /// Nesting bound for type resolution.
    pub max_type_depth: usize,
    /// Start the state monitor on connect with this interval.
    pub state_poll_interval: Option<Duration>,
    /// Delete all device notifications before disconnecting.
    pub unsubscribe_on_disconnect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            router_addr: format!("127.0.0.1:{DEFAULT_ROUTER_PORT}"),
            target: AmsAddress::new(AmsNetId::LOCALHOST, PORT_PLC_RUNTIME_TC3),
            local: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(2),
            max_frame_size: DEFAULT_MAX_FRAME,
            max_type_depth: 64,
            state_poll_interval: None,
            unsubscribe_on_disconnect: true,
        }
    }
}

/// How the device should deliver notification samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionSettings {
    /// How often the device checks (on-change) or sends (cyclic).
    pub cycle_time: Duration,
    /// Only send when the value changed.
    pub send_on_change: bool,
    /// Longest the device may buffer samples before sending.
    pub max_delay: Duration,
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            cycle_time: Duration::from_millis(200),
            send_on_change: true,
            max_delay: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.router_addr, "127.0.0.1:48898");
        assert_eq!(config.target.port, 851);
        assert_eq!(config.max_type_depth, 64);
        assert!(config.local.is_none());

        let settings = SubscriptionSettings::default();
        assert_eq!(settings.cycle_time, Duration::from_millis(200));
        assert!(settings.send_on_change);
        assert_eq!(settings.max_delay, Duration::ZERO);
    }
}
