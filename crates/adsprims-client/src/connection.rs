//! Transport multiplexer.
//!
//! Many callers share one router connection. Each request gets the next
//! invoke id and a oneshot slot in the pending table; a single reader task
//! decodes incoming frames and completes the slot whose id matches. Device
//! notifications go to the [`SubscriptionTable`] instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use adsprims_frame::{
    encode_ads_packet, encode_port_close, encode_port_connect, AdsPacket, AmsAddress, AmsCodec,
    AmsHeader, AmsPacket, CodecConfig, AdsReturnCode, ADS_NOTIFICATION,
};
use adsprims_transport::TcpTransport;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, oneshot};
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::event::ClientEvent;
use crate::notification::SubscriptionTable;

const READ_BUFFER_SIZE: usize = 8 * 1024;
const EVENT_CAPACITY: usize = 64;

type Completion = oneshot::Sender<Result<Bytes>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to one router connection. Cheap to clone.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    target: AmsAddress,
    local: OnceLock<AmsAddress>,
    registered: AtomicBool,
    request_timeout: Duration,
    next_invoke_id: AtomicU32,
    pending: Mutex<HashMap<u32, Completion>>,
    registration: Mutex<Option<oneshot::Sender<AmsAddress>>>,
    writer: tokio::sync::Mutex<Writer>,
    closed: Mutex<Option<String>>,
    cancel: CancellationToken,
    events: broadcast::Sender<ClientEvent>,
    subscriptions: Arc<SubscriptionTable>,
}

impl Connection {
    /// Open a TCP connection to the configured router and set it up.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let stream = TcpTransport::connect(&config.router_addr, config.connect_timeout).await?;
        Self::from_stream(stream, config).await
    }

    /// Run the protocol over an already-open stream.
    ///
    /// Without a configured local address the router is asked for a port
    /// first; the address it returns is fixed for the connection's lifetime.
    pub async fn from_stream<S>(stream: S, config: &ClientConfig) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Arc::new(Inner {
            target: config.target,
            local: OnceLock::new(),
            registered: AtomicBool::new(false),
            request_timeout: config.request_timeout,
            next_invoke_id: AtomicU32::new(1),
            pending: Mutex::new(HashMap::new()),
            registration: Mutex::new(None),
            writer: tokio::sync::Mutex::new(Box::new(write_half)),
            closed: Mutex::new(None),
            cancel: CancellationToken::new(),
            events,
            subscriptions: Arc::new(SubscriptionTable::new()),
        });

        let codec = AmsCodec::new(CodecConfig {
            max_frame_size: config.max_frame_size,
        });
        tokio::spawn(read_loop(read_half, codec, inner.clone()));

        let connection = Self { inner };
        match config.local {
            Some(local) => {
                let _ = connection.inner.local.set(local);
            }
            None => {
                let local = match connection.register(config.connect_timeout).await {
                    Ok(local) => local,
                    Err(err) => {
                        connection.inner.shutdown("router registration failed");
                        return Err(err);
                    }
                };
                let _ = connection.inner.local.set(local);
                connection.inner.registered.store(true, Ordering::Release);
                info!(%local, "registered with ams router");
            }
        }
        Ok(connection)
    }

    async fn register(&self, timeout: Duration) -> Result<AmsAddress> {
        let (tx, rx) = oneshot::channel();
        *lock(&self.inner.registration) = Some(tx);

        let mut buf = BytesMut::new();
        encode_port_connect(0, &mut buf);
        self.inner.write_packet(&buf).await?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(local)) => Ok(local),
            Ok(Err(_)) => Err(ClientError::Disconnected(
                "connection closed during router registration".to_string(),
            )),
            Err(_) => Err(ClientError::Timeout(timeout)),
        }
    }

    /// Our own AMS address.
    pub fn local_address(&self) -> AmsAddress {
        self.inner.local.get().copied().unwrap_or_default()
    }

    /// Default request target.
    pub fn target(&self) -> AmsAddress {
        self.inner.target
    }

    pub fn request_timeout(&self) -> Duration {
        self.inner.request_timeout
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.inner.closed).is_none()
    }

    /// Subscribe to connection events.
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Notification handles registered on this connection.
    pub fn subscriptions(&self) -> &Arc<SubscriptionTable> {
        &self.inner.subscriptions
    }

    /// Number of requests waiting for a reply.
    pub fn pending_count(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    /// Send a command to `port` on the target device with the default timeout.
    ///
    /// Returns the reply payload. A non-zero AMS header error code is
    /// returned as [`ClientError::Ads`]; the payload's own return code is
    /// left to the caller.
    pub async fn send(&self, command: u16, port: u16, payload: &[u8]) -> Result<Bytes> {
        self.send_with_timeout(command, port, payload, self.inner.request_timeout)
            .await
    }

    /// [`send`](Self::send) with an explicit reply timeout.
    pub async fn send_with_timeout(
        &self,
        command: u16,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Bytes> {
        self.inner.ensure_open()?;

        let invoke_id = self.inner.next_invoke_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        if lock(&self.inner.pending).insert(invoke_id, tx).is_some() {
            // A wrapped id is still outstanding; its caller has long timed out.
            debug!(invoke_id, "replaced stale pending request");
        }
        // Teardown sets `closed` before draining, so a slot inserted after the
        // drain is caught here.
        if let Err(err) = self.inner.ensure_open() {
            lock(&self.inner.pending).remove(&invoke_id);
            return Err(err);
        }

        let header = AmsHeader::request(
            AmsAddress::new(self.inner.target.net_id, port),
            self.local_address(),
            command,
            invoke_id,
        );
        let mut buf = BytesMut::new();
        if let Err(err) = encode_ads_packet(&header, payload, &mut buf) {
            lock(&self.inner.pending).remove(&invoke_id);
            return Err(err.into());
        }
        trace!(invoke_id, command, port, len = payload.len(), "sending ads request");
        if let Err(err) = self.inner.write_packet(&buf).await {
            lock(&self.inner.pending).remove(&invoke_id);
            return Err(err);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Disconnected("connection closed".to_string())),
            Err(_) => {
                lock(&self.inner.pending).remove(&invoke_id);
                debug!(invoke_id, ?timeout, "request timed out");
                Err(ClientError::Timeout(timeout))
            }
        }
    }

    /// Close the connection.
    ///
    /// Releases the router port if one was registered, stops the reader and
    /// fails every waiting caller with [`ClientError::Disconnected`].
    pub async fn disconnect(&self) {
        if !self.is_connected() {
            return;
        }
        if self.inner.registered.load(Ordering::Acquire) {
            let mut buf = BytesMut::new();
            encode_port_close(self.local_address().port, &mut buf);
            if let Err(err) = self.inner.write_packet(&buf).await {
                debug!(%err, "port close not sent");
            }
        }
        if self.inner.shutdown("disconnected by client") {
            info!(local = %self.local_address(), "disconnected");
        }
        let mut writer = self.inner.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

impl Inner {
    fn ensure_open(&self) -> Result<()> {
        match lock(&self.closed).as_ref() {
            Some(reason) => Err(ClientError::Disconnected(reason.clone())),
            None => Ok(()),
        }
    }

    /// Write one whole packet. A write failure tears the connection down.
    async fn write_packet(&self, packet: &[u8]) -> Result<()> {
        let result = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(packet).await {
                Ok(()) => writer.flush().await,
                Err(err) => Err(err),
            }
        };
        if let Err(err) = result {
            let reason = format!("write failed: {err}");
            if self.shutdown(&reason) {
                warn!(%reason, "connection lost");
                let _ = self.events.send(ClientEvent::ConnectionLost { reason });
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Mark closed, stop the reader and fail waiting callers. Returns false
    /// if the connection was already closed.
    fn shutdown(&self, reason: &str) -> bool {
        {
            let mut closed = lock(&self.closed);
            if closed.is_some() {
                return false;
            }
            *closed = Some(reason.to_string());
        }
        self.cancel.cancel();

        let waiting: Vec<Completion> = lock(&self.pending).drain().map(|(_, tx)| tx).collect();
        for tx in waiting {
            let _ = tx.send(Err(ClientError::Disconnected(reason.to_string())));
        }
        lock(&self.registration).take();
        true
    }

    fn handle_packet(&self, packet: AmsPacket) {
        match packet {
            AmsPacket::Ads(packet) => self.handle_ads(packet),
            AmsPacket::PortConnect(local) => match lock(&self.registration).take() {
                Some(tx) => {
                    let _ = tx.send(local);
                }
                None => debug!(%local, "unsolicited port connect reply"),
            },
            AmsPacket::RouterNotification(state) => {
                info!(state, "router state changed");
                let _ = self.events.send(ClientEvent::RouterStateChanged { state });
            }
        }
    }

    fn handle_ads(&self, packet: AdsPacket) {
        let header = packet.header;
        if header.command == ADS_NOTIFICATION {
            self.subscriptions.dispatch(&packet.payload);
            return;
        }
        if !header.is_response() {
            debug!(
                command = header.command,
                invoke_id = header.invoke_id,
                "ignoring request from device"
            );
            return;
        }

        let Some(tx) = lock(&self.pending).remove(&header.invoke_id) else {
            debug!(invoke_id = header.invoke_id, "dropping reply with no waiting request");
            return;
        };
        let result = if header.error_code != 0 {
            Err(ClientError::Ads(AdsReturnCode(header.error_code)))
        } else {
            Ok(packet.payload)
        };
        let _ = tx.send(result);
    }
}

async fn read_loop<R>(mut reader: R, mut codec: AmsCodec, inner: Arc<Inner>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    let reason = 'read: loop {
        loop {
            match codec.decode(&mut buf) {
                Ok(Some(packet)) => inner.handle_packet(packet),
                Ok(None) => break,
                Err(err) => break 'read format!("unrecoverable framing error: {err}"),
            }
        }

        let read = tokio::select! {
            _ = inner.cancel.cancelled() => return,
            read = reader.read_buf(&mut buf) => read,
        };
        match read {
            Ok(0) => break "connection closed by router".to_string(),
            Ok(_) => {}
            Err(err) => break format!("read failed: {err}"),
        }
    };

    if inner.shutdown(&reason) {
        warn!(%reason, "connection lost");
        let _ = inner.events.send(ClientEvent::ConnectionLost { reason });
    }
}
