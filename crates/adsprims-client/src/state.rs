//! Background polling of device state.
//!
//! Every `start` or `stop` bumps a generation counter. A running poll loop
//! remembers the generation it was started under and exits at its next
//! check once the counter has moved on, so restarting never leaves two loops
//! polling side by side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use adsprims_frame::index::PORT_SYSTEM_SERVICE;
use adsprims_frame::response::parse_read_state_response;
use adsprims_frame::{AdsState, ADS_READ_STATE};
use tracing::{debug, info, warn};

use crate::connection::{lock, Connection};
use crate::error::{ClientError, Result};
use crate::event::ClientEvent;

/// Most recent states seen by the monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStates {
    /// System service (TwinCAT) state.
    pub system: Option<AdsState>,
    /// Target runtime state.
    pub runtime: Option<AdsState>,
}

/// Periodic ReadState poller.
#[derive(Clone, Default)]
pub struct StateMonitor {
    inner: Arc<MonitorInner>,
}

#[derive(Default)]
struct MonitorInner {
    generation: AtomicU64,
    latest: Mutex<DeviceStates>,
}

impl StateMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling every `interval`, replacing any running loop.
    pub fn start(&self, conn: Connection, interval: Duration) {
        let generation = self.inner.advance();
        let inner = self.inner.clone();
        debug!(generation, ?interval, "state monitor started");
        tokio::spawn(async move {
            while inner.is_current(generation) {
                match poll(&conn).await {
                    Ok(states) => {
                        if !inner.record(generation, &conn, states) {
                            break;
                        }
                    }
                    Err(err) => {
                        // A replaced or stopped loop leaves the counter alone.
                        if !inner.retire(generation) {
                            break;
                        }
                        // Disconnected means the reader already reported the loss.
                        if !matches!(err, ClientError::Disconnected(_)) {
                            let reason = format!("state poll failed: {err}");
                            warn!(%reason, "connection lost");
                            conn.emit(ClientEvent::ConnectionLost { reason });
                        }
                        return;
                    }
                }
                tokio::time::sleep(interval).await;
            }
            debug!(generation, "state monitor loop exited");
        });
    }

    /// Stop polling. The running loop exits at its next check and a poll
    /// already in flight publishes nothing.
    pub fn stop(&self) {
        let generation = self.inner.advance();
        debug!(generation, "state monitor stopped");
    }

    /// Latest states; both `None` before the first successful poll.
    pub fn latest(&self) -> DeviceStates {
        *lock(&self.inner.latest)
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }
}

impl MonitorInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Bump the generation under the state lock so no `record` straddles it.
    fn advance(&self) -> u64 {
        let _latest = lock(&self.latest);
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Move past `generation` only if it is still the running one.
    fn retire(&self, generation: u64) -> bool {
        let _latest = lock(&self.latest);
        self.generation
            .compare_exchange(generation, generation + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Store `states` and emit change events. Returns false, touching
    /// nothing, when `generation` is stale.
    fn record(&self, generation: u64, conn: &Connection, states: DeviceStates) -> bool {
        let mut latest = lock(&self.latest);
        if !self.is_current(generation) {
            return false;
        }
        let previous = std::mem::replace(&mut *latest, states);

        if let Some(current) = states.system {
            if previous.system != Some(current) {
                info!(previous = ?previous.system, %current, "system state changed");
                conn.emit(ClientEvent::SystemStateChanged {
                    previous: previous.system,
                    current,
                });
            }
        }
        if let Some(current) = states.runtime {
            if previous.runtime != Some(current) {
                info!(previous = ?previous.runtime, %current, "runtime state changed");
                conn.emit(ClientEvent::RuntimeStateChanged {
                    port: conn.target().port,
                    previous: previous.runtime,
                    current,
                });
            }
        }
        true
    }
}

/// One poll: system service state, then target runtime state.
///
/// Device errors leave the affected state `None`; connection failures and
/// timeouts are returned.
async fn poll(conn: &Connection) -> Result<DeviceStates> {
    Ok(DeviceStates {
        system: read_state(conn, PORT_SYSTEM_SERVICE).await?,
        runtime: read_state(conn, conn.target().port).await?,
    })
}

async fn read_state(conn: &Connection, port: u16) -> Result<Option<AdsState>> {
    let reply = match conn.send(ADS_READ_STATE, port, &[]).await {
        Ok(reply) => reply,
        Err(ClientError::Ads(code)) => {
            debug!(port, %code, "state unavailable");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };
    match parse_read_state_response(&reply) {
        Ok(state) => Ok(Some(state.ads_state)),
        Err(err) => {
            debug!(port, %err, "state unavailable");
            Ok(None)
        }
    }
}
