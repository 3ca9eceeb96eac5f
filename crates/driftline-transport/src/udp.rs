//! UDP transport implementation

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::UdpSocket;

use driftline_core::{DriftlineError, DriftlineResult};
use driftline_wire::PACKET_SIZE;

/// Default receive buffer. Larger than a packet; the excess is ignored by
/// the decoder.
pub const RECV_BUFFER_SIZE: usize = 128;

/// ENOMEM
const RAW_ENOMEM: i32 = 12;

/// Failure to hand a datagram to the network stack
#[derive(Error, Debug)]
pub enum SendFailure {
    /// The stack is out of buffers or memory. Expected under load on small
    /// devices; the datagram is lost and the sender should carry on.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(io::Error),

    #[error("Send failed: {0}")]
    Other(io::Error),
}

impl SendFailure {
    /// Classify an I/O error from a send call
    pub fn classify(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::OutOfMemory || err.raw_os_error() == Some(RAW_ENOMEM) {
            SendFailure::ResourceExhausted(err)
        } else {
            SendFailure::Other(err)
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, SendFailure::ResourceExhausted(_))
    }
}

/// UDP transport for driftline
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl UdpTransport {
    /// Bind to a local address
    pub async fn bind(addr: SocketAddr) -> DriftlineResult<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| DriftlineError::Bind(format!("{}: {}", addr, e)))?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| DriftlineError::Bind(format!("{}: {}", addr, e)))?;

        Ok(UdpTransport { socket, local_addr })
    }

    /// Bind an ephemeral sending socket matching the destination family
    pub async fn bind_for(dest: SocketAddr) -> DriftlineResult<Self> {
        let any: SocketAddr = if dest.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        Self::bind(any).await
    }

    /// Get local address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Send raw bytes to a destination. Fire and forget: nothing is retried.
    pub async fn send_bytes_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<(), SendFailure> {
        self.socket
            .send_to(bytes, dest)
            .await
            .map(|_| ())
            .map_err(SendFailure::classify)
    }

    /// Receive one datagram into `buf` (blocking, no timeout).
    ///
    /// Returns the received length, which may exceed `PACKET_SIZE`.
    pub async fn recv_bytes_from(&self, buf: &mut [u8]) -> DriftlineResult<(usize, SocketAddr)> {
        debug_assert!(buf.len() >= PACKET_SIZE);
        self.socket
            .recv_from(buf)
            .await
            .map_err(|e| DriftlineError::Transport(e.to_string()))
    }
}
