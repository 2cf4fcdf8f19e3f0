use std::sync::Arc;
use std::time::Duration;

use adsprims_frame::index::{
    GET_DATATYPE_BYNAME_EX, GET_SYMHANDLE_BYNAME, GET_SYMINFO_BYNAME_EX, PORT_SYSTEM_SERVICE,
    READ_LENGTH_ANY, RELEASE_SYMHANDLE, RW_SYMVAL_BYHANDLE, SYM_UPLOAD_INFO2,
};
use adsprims_frame::request::{
    read_request, read_write_request, write_control_request, write_request,
};
use adsprims_frame::response::{
    parse_device_info_response, parse_read_response, parse_read_state_response,
    parse_write_response,
};
use adsprims_frame::{
    AdsState, AmsAddress, DeviceInfo, ReadStateResponse, ADS_READ, ADS_READ_DEVICE_INFO,
    ADS_READ_STATE, ADS_READ_WRITE, ADS_WRITE, ADS_WRITE_CONTROL,
};
use adsprims_types::{decode, encode, parse_data_type_entry, parse_symbol_entry, Symbol, TypeNode, Value};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, SubscriptionSettings};
use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::event::ClientEvent;
use crate::notification::{
    add_notification, delete_all_notifications, delete_notification, Notification, Subscription,
};
use crate::resolver::{self, DeclarationSource};
use crate::state::{DeviceStates, StateMonitor};

/// Symbol table sizes reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolUploadInfo {
    pub symbol_count: u32,
    pub symbol_length: u32,
    pub data_type_count: u32,
    pub data_type_length: u32,
    pub extra_count: u32,
    pub extra_length: u32,
}

/// ADS client for one target device.
///
/// Cheap to clone; clones share the connection, the subscriptions and the
/// state monitor.
#[derive(Clone)]
pub struct AdsClient {
    conn: Connection,
    config: Arc<ClientConfig>,
    monitor: StateMonitor,
}

impl AdsClient {
    /// Connect to the router named in `config`.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let conn = Connection::connect(&config).await?;
        info!(router = %config.router_addr, target = %config.target, "connected");
        Ok(Self::with_connection(conn, config))
    }

    /// Run the client over an already-open stream.
    pub async fn from_stream<S>(stream: S, config: ClientConfig) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let conn = Connection::from_stream(stream, &config).await?;
        Ok(Self::with_connection(conn, config))
    }

    fn with_connection(conn: Connection, config: ClientConfig) -> Self {
        let client = Self {
            conn,
            config: Arc::new(config),
            monitor: StateMonitor::new(),
        };
        if let Some(interval) = client.config.state_poll_interval {
            client.start_monitor(interval);
        }
        client
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn local_address(&self) -> AmsAddress {
        self.conn.local_address()
    }

    pub fn target(&self) -> AmsAddress {
        self.conn.target()
    }

    /// Subscribe to connection and state events.
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.conn.events()
    }

    /// Close the connection, deleting device notifications first when
    /// configured to.
    pub async fn disconnect(&self) {
        self.monitor.stop();
        if self.config.unsubscribe_on_disconnect && self.conn.is_connected() {
            if let Err(err) = self.unsubscribe_all().await {
                warn!(%err, "not every subscription could be deleted before disconnect");
            }
        }
        self.conn.disconnect().await;
    }

    // ---- raw access ----

    async fn read_at(&self, port: u16, index_group: u32, index_offset: u32, length: u32) -> Result<Bytes> {
        let reply = self
            .conn
            .send(ADS_READ, port, &read_request(index_group, index_offset, length))
            .await?;
        Ok(parse_read_response(&reply)?)
    }

    async fn write_at(&self, port: u16, index_group: u32, index_offset: u32, data: &[u8]) -> Result<()> {
        let reply = self
            .conn
            .send(ADS_WRITE, port, &write_request(index_group, index_offset, data))
            .await?;
        Ok(parse_write_response(&reply)?)
    }

    async fn read_write_at(
        &self,
        port: u16,
        index_group: u32,
        index_offset: u32,
        read_length: u32,
        data: &[u8],
    ) -> Result<Bytes> {
        let request = read_write_request(index_group, index_offset, read_length, data);
        let reply = self.conn.send(ADS_READ_WRITE, port, &request).await?;
        Ok(parse_read_response(&reply)?)
    }

    /// Read `length` bytes at `index_group`/`index_offset` of the target.
    pub async fn read_raw(&self, index_group: u32, index_offset: u32, length: u32) -> Result<Bytes> {
        self.read_at(self.target().port, index_group, index_offset, length)
            .await
    }

    pub async fn write_raw(&self, index_group: u32, index_offset: u32, data: &[u8]) -> Result<()> {
        self.write_at(self.target().port, index_group, index_offset, data)
            .await
    }

    /// Write `data`, then read up to `read_length` bytes, in one round trip.
    pub async fn read_write_raw(
        &self,
        index_group: u32,
        index_offset: u32,
        read_length: u32,
        data: &[u8],
    ) -> Result<Bytes> {
        self.read_write_at(self.target().port, index_group, index_offset, read_length, data)
            .await
    }

    // ---- device ----

    pub async fn read_device_info(&self) -> Result<DeviceInfo> {
        let reply = self
            .conn
            .send(ADS_READ_DEVICE_INFO, self.target().port, &[])
            .await?;
        Ok(parse_device_info_response(&reply)?)
    }

    /// ADS and device state of the target runtime.
    pub async fn read_state(&self) -> Result<ReadStateResponse> {
        self.read_state_at(self.target().port).await
    }

    /// ADS and device state of any port on the target device.
    pub async fn read_state_at(&self, port: u16) -> Result<ReadStateResponse> {
        let reply = self.conn.send(ADS_READ_STATE, port, &[]).await?;
        Ok(parse_read_state_response(&reply)?)
    }

    pub async fn write_control(&self, port: u16, ads_state: AdsState, device_state: u16) -> Result<()> {
        let request = write_control_request(ads_state.code(), device_state, &[]);
        let reply = self.conn.send(ADS_WRITE_CONTROL, port, &request).await?;
        Ok(parse_write_response(&reply)?)
    }

    /// Restart the system service into run mode.
    pub async fn set_system_run_mode(&self) -> Result<()> {
        info!(target = %self.target().net_id, "switching system to run mode");
        self.write_control(PORT_SYSTEM_SERVICE, AdsState::Reset, 0)
            .await
    }

    /// Restart the system service into config mode.
    pub async fn set_system_config_mode(&self) -> Result<()> {
        info!(target = %self.target().net_id, "switching system to config mode");
        self.write_control(PORT_SYSTEM_SERVICE, AdsState::Reconfig, 0)
            .await
    }

    pub async fn start_plc(&self) -> Result<()> {
        self.control_runtime(AdsState::Run).await
    }

    pub async fn stop_plc(&self) -> Result<()> {
        self.control_runtime(AdsState::Stop).await
    }

    pub async fn reset_plc(&self) -> Result<()> {
        self.control_runtime(AdsState::Reset).await
    }

    async fn control_runtime(&self, ads_state: AdsState) -> Result<()> {
        let current = self.read_state().await?;
        debug!(from = %current.ads_state, to = %ads_state, "runtime state change requested");
        self.write_control(self.target().port, ads_state, current.device_state)
            .await
    }

    /// Symbol and data type table sizes of the target runtime.
    pub async fn upload_info(&self) -> Result<SymbolUploadInfo> {
        let data = self.read_raw(SYM_UPLOAD_INFO2, 0, 24).await?;
        if data.len() < 24 {
            return Err(ClientError::UnexpectedResponse(format!(
                "upload info of {} bytes",
                data.len()
            )));
        }
        let u32_at = |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
        Ok(SymbolUploadInfo {
            symbol_count: u32_at(0),
            symbol_length: u32_at(4),
            data_type_count: u32_at(8),
            data_type_length: u32_at(12),
            extra_count: u32_at(16),
            extra_length: u32_at(20),
        })
    }

    // ---- symbols ----

    /// Symbol entry for a variable path.
    pub async fn symbol_info(&self, path: &str) -> Result<Symbol> {
        DeclarationSource::symbol(self, path, self.target().port).await
    }

    /// Fully resolved type tree for a type name.
    pub async fn data_type(&self, name: &str) -> Result<TypeNode> {
        resolver::resolve_type(self, name, self.target().port, self.config.max_type_depth).await
    }

    /// Symbol and fully resolved type tree for a variable path.
    pub async fn resolve(&self, path: &str) -> Result<(Symbol, TypeNode)> {
        resolver::resolve(self, path, self.target().port, self.config.max_type_depth).await
    }

    /// Read and decode a variable.
    pub async fn read_value(&self, path: &str) -> Result<Value> {
        let (symbol, node) = self.resolve(path).await?;
        let data = self
            .read_raw(symbol.index_group, symbol.index_offset, symbol.size)
            .await?;
        Ok(decode(&data, &node)?)
    }

    /// Encode and write a variable. Nothing is sent if encoding fails.
    pub async fn write_value(&self, path: &str, value: &Value) -> Result<()> {
        let (symbol, node) = self.resolve(path).await?;
        let data = encode(value, &node)?;
        self.write_raw(symbol.index_group, symbol.index_offset, &data)
            .await
    }

    // ---- handles ----

    /// Acquire a variable handle for repeated access.
    pub async fn create_handle(&self, path: &str) -> Result<u32> {
        let data = self
            .read_write_raw(GET_SYMHANDLE_BYNAME, 0, 4, &nul_terminated(path))
            .await?;
        match data.get(..4) {
            Some(b) => Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            None => Err(ClientError::UnexpectedResponse(format!(
                "handle reply of {} bytes",
                data.len()
            ))),
        }
    }

    pub async fn release_handle(&self, handle: u32) -> Result<()> {
        self.write_raw(RELEASE_SYMHANDLE, 0, &handle.to_le_bytes())
            .await
    }

    pub async fn read_raw_by_handle(&self, handle: u32, length: u32) -> Result<Bytes> {
        self.read_raw(RW_SYMVAL_BYHANDLE, handle, length).await
    }

    pub async fn write_raw_by_handle(&self, handle: u32, data: &[u8]) -> Result<()> {
        self.write_raw(RW_SYMVAL_BYHANDLE, handle, data).await
    }

    // ---- notifications ----

    /// Subscribe to a variable; samples arrive decoded.
    pub async fn subscribe<F>(
        &self,
        path: &str,
        settings: SubscriptionSettings,
        callback: F,
    ) -> Result<Subscription>
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        let (symbol, node) = self.resolve(path).await?;
        add_notification(
            &self.conn,
            self.target().port,
            symbol.index_group,
            symbol.index_offset,
            symbol.size,
            settings,
            Some(Arc::new(node)),
            Arc::new(callback),
        )
        .await
    }

    /// Subscribe to a raw memory region; samples arrive as bytes only.
    pub async fn subscribe_raw<F>(
        &self,
        port: u16,
        index_group: u32,
        index_offset: u32,
        size: u32,
        settings: SubscriptionSettings,
        callback: F,
    ) -> Result<Subscription>
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        add_notification(
            &self.conn,
            port,
            index_group,
            index_offset,
            size,
            settings,
            None,
            Arc::new(callback),
        )
        .await
    }

    pub async fn unsubscribe(&self, subscription: &Subscription) -> Result<()> {
        delete_notification(&self.conn, subscription).await
    }

    /// Delete every subscription; returns the first failure after trying all.
    pub async fn unsubscribe_all(&self) -> Result<()> {
        delete_all_notifications(&self.conn).await
    }

    pub fn subscription_count(&self) -> usize {
        self.conn.subscriptions().len()
    }

    // ---- state monitor ----

    pub fn start_monitor(&self, interval: Duration) {
        self.monitor.start(self.conn.clone(), interval);
    }

    pub fn stop_monitor(&self) {
        self.monitor.stop();
    }

    /// States last seen by the monitor.
    pub fn system_state(&self) -> DeviceStates {
        self.monitor.latest()
    }
}

impl DeclarationSource for AdsClient {
    async fn symbol(&self, path: &str, port: u16) -> Result<Symbol> {
        let data = self
            .read_write_at(port, GET_SYMINFO_BYNAME_EX, 0, READ_LENGTH_ANY, &nul_terminated(path))
            .await?;
        Ok(parse_symbol_entry(&data)?)
    }

    async fn data_type(&self, name: &str, port: u16) -> Result<TypeNode> {
        let data = self
            .read_write_at(port, GET_DATATYPE_BYNAME_EX, 0, READ_LENGTH_ANY, &nul_terminated(name))
            .await?;
        Ok(parse_data_type_entry(&data)?)
    }
}

fn nul_terminated(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len() + 1);
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    out
}
