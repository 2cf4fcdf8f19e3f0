use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

use crate::error::Result;

/// A connected router stream. Implements `AsyncRead + AsyncWrite`.
///
/// This is the fundamental I/O type returned by [`crate::TcpTransport`].
/// The multiplexer splits it into a read half owned by the reader task and
/// a write half shared by all senders.
pub struct AmsStream {
    inner: TcpStream,
}

impl AmsStream {
    pub(crate) fn from_tcp(inner: TcpStream) -> Self {
        Self { inner }
    }

    /// Address of the router end of the connection.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.inner.peer_addr().map_err(Into::into)
    }

    /// Local socket address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr().map_err(Into::into)
    }

    /// Consume the wrapper and return the TCP stream.
    pub fn into_inner(self) -> TcpStream {
        self.inner
    }
}

impl AsyncRead for AmsStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for AmsStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl std::fmt::Debug for AmsStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmsStream")
            .field("peer_addr", &self.inner.peer_addr().ok())
            .field("local_addr", &self.inner.local_addr().ok())
            .finish()
    }
}
