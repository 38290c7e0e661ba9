//! # Transport Layer
//!
//! Non-blocking UDP for the ground-station tick loop.
//!
//! ## Design
//!
//! - Raw UDP, best effort, at most once per send
//! - Receive never blocks: "no datagram" is `Ok(None)`, not an error
//! - Packet statistics for the status display

use std::io;
use std::net::SocketAddr;

/// The datagram operations the link needs from a socket.
///
/// [`UdpTransport`] is the production implementation; tests plug in
/// in-memory transports.
pub trait DatagramTransport {
    /// Receives one datagram into `buf` without blocking.
    ///
    /// Returns `Ok(None)` when nothing is waiting.
    ///
    /// # Errors
    ///
    /// Any socket error other than "would block".
    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>>;

    /// Sends one datagram.
    ///
    /// # Errors
    ///
    /// Any socket error; the datagram is lost.
    fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> io::Result<usize>;

    /// Allows or forbids sending to broadcast addresses.
    ///
    /// # Errors
    ///
    /// The socket option could not be changed.
    fn set_broadcast(&mut self, enabled: bool) -> io::Result<()> {
        let _ = enabled;
        Ok(())
    }
}

/// UDP socket wrapper for the droid link.
///
/// This is a thin wrapper around std UDP with:
/// - Non-blocking mode
/// - Packet statistics
pub struct UdpTransport {
    /// The underlying socket.
    socket: std::net::UdpSocket,
    /// Local address.
    local_addr: SocketAddr,
    /// Statistics.
    stats: TransportStats,
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Packets sent.
    pub packets_sent: u64,
    /// Packets received.
    pub packets_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Send errors.
    pub send_errors: u64,
    /// Receive errors.
    pub recv_errors: u64,
}

impl UdpTransport {
    /// Creates a non-blocking transport bound to the specified address.
    ///
    /// # Errors
    ///
    /// The address is in use or cannot be bound.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = std::net::UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            stats: TransportStats::default(),
        })
    }

    /// Returns the local address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns statistics.
    #[must_use]
    pub const fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Resets statistics.
    pub fn reset_stats(&mut self) {
        self.stats = TransportStats::default();
    }
}

impl DatagramTransport for UdpTransport {
    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buf) {
            Ok((len, addr)) => {
                self.stats.packets_received += 1;
                self.stats.bytes_received += len as u64;
                Ok(Some((len, addr)))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => {
                self.stats.recv_errors += 1;
                Err(e)
            }
        }
    }

    fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
        match self.socket.send_to(data, addr) {
            Ok(n) => {
                self.stats.packets_sent += 1;
                self.stats.bytes_sent += n as u64;
                Ok(n)
            }
            Err(e) => {
                self.stats.send_errors += 1;
                Err(e)
            }
        }
    }

    fn set_broadcast(&mut self, enabled: bool) -> io::Result<()> {
        self.socket.set_broadcast(enabled)
    }
}
