use adsprims_frame::AdsState;

/// Connection-level events, delivered over a broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The router connection failed or was closed by the peer.
    ConnectionLost { reason: String },
    /// The system service (TwinCAT) state changed.
    SystemStateChanged {
        previous: Option<AdsState>,
        current: AdsState,
    },
    /// The target runtime's ADS state changed.
    RuntimeStateChanged {
        port: u16,
        previous: Option<AdsState>,
        current: AdsState,
    },
    /// The router reported a state change (0 stopped, 1 started, 2 removed).
    RouterStateChanged { state: u32 },
}
