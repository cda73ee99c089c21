//! Device sessions
//!
//! A session is the boundary to one physical device: it knows the device's
//! string lengths, holds the bearer token and performs the actual send.
//! Token retrieval and login happen elsewhere; a session only hands out a
//! token while it is comfortably valid.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::info;

use crate::{ControlError, Result};

/// Tokens this close to expiry are treated as expired
pub const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(2);

/// Opaque bearer credential with an optional expiry
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("bytes", &"***REDACTED***")
            .field("len", &self.bytes.len())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl SessionToken {
    /// Wrap raw token bytes. `None` never expires.
    pub fn new(bytes: Vec<u8>, expires_at: Option<Instant>) -> Self {
        Self { bytes, expires_at }
    }

    /// Decode a hex-encoded token
    pub fn from_hex(hex_token: &str, expires_at: Option<Instant>) -> Result<Self> {
        let bytes = hex::decode(hex_token.trim()).map_err(|e| {
            ControlError::InvalidParameter(format!("Session token is not valid hex: {}", e))
        })?;
        Ok(Self::new(bytes, expires_at))
    }

    /// Raw token bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Expiry instant, if any
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// True if the token is still valid `margin` after `now`
    pub fn is_valid_at(&self, now: Instant, margin: Duration) -> bool {
        match self.expires_at {
            None => true,
            Some(expiry) => now + margin < expiry,
        }
    }
}

/// The device side of the transport
pub trait DeviceSession: Send {
    /// Token usable at `now`, or `None` when missing or about to expire
    fn current_token(&self, now: Instant) -> Option<&SessionToken>;

    /// Send one datagram, returning the number of bytes written
    fn send_datagram(&mut self, datagram: &[u8]) -> Result<usize>;

    /// Channel count (bytes) of every physical string, in frame order
    fn string_lengths(&self) -> &[usize];
}

/// Fire-and-forget UDP session
#[derive(Debug)]
pub struct UdpDeviceSession {
    socket: UdpSocket,
    target: SocketAddr,
    token: Option<SessionToken>,
    strings: Vec<usize>,
}

impl UdpDeviceSession {
    /// Bind a local socket for sending to `address`
    pub fn connect(address: &str, strings: Vec<usize>, token: Option<SessionToken>) -> Result<Self> {
        let target = address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                ControlError::InvalidParameter(format!("Address {} did not resolve", address))
            })?;
        let bind = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind)?;
        socket.set_nonblocking(true)?;
        info!(
            "UDP session to {} with {} strings",
            target,
            strings.len()
        );
        Ok(Self {
            socket,
            target,
            token,
            strings,
        })
    }

    /// Replace the token, e.g. after the session collaborator refreshed it
    pub fn set_token(&mut self, token: Option<SessionToken>) {
        self.token = token;
    }

    /// Destination address
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl DeviceSession for UdpDeviceSession {
    fn current_token(&self, now: Instant) -> Option<&SessionToken> {
        self.token
            .as_ref()
            .filter(|t| t.is_valid_at(now, TOKEN_EXPIRY_MARGIN))
    }

    fn send_datagram(&mut self, datagram: &[u8]) -> Result<usize> {
        Ok(self.socket.send_to(datagram, self.target)?)
    }

    fn string_lengths(&self) -> &[usize] {
        &self.strings
    }
}

/// Shared log of datagrams captured by a [`MemorySession`]
pub type DatagramLog = Arc<Mutex<Vec<Vec<u8>>>>;

/// In-memory session that records every datagram; used for previews and tests
#[derive(Debug, Clone)]
pub struct MemorySession {
    strings: Vec<usize>,
    token: Option<SessionToken>,
    sent: DatagramLog,
}

impl MemorySession {
    /// A session with a fixed, never-expiring token
    pub fn new(strings: Vec<usize>) -> Self {
        Self::with_token(strings, Some(SessionToken::new(vec![0x5A; 12], None)))
    }

    /// A session with an explicit token
    pub fn with_token(strings: Vec<usize>, token: Option<SessionToken>) -> Self {
        Self {
            strings,
            token,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the captured datagrams
    pub fn log(&self) -> DatagramLog {
        self.sent.clone()
    }

    /// Datagrams sent so far
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }
}

impl DeviceSession for MemorySession {
    fn current_token(&self, now: Instant) -> Option<&SessionToken> {
        self.token
            .as_ref()
            .filter(|t| t.is_valid_at(now, TOKEN_EXPIRY_MARGIN))
    }

    fn send_datagram(&mut self, datagram: &[u8]) -> Result<usize> {
        self.sent.lock().push(datagram.to_vec());
        Ok(datagram.len())
    }

    fn string_lengths(&self) -> &[usize] {
        &self.strings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let token = SessionToken::from_hex("deadbeef", None).unwrap();
        let printed = format!("{:?}", token);
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("222"));
        assert_eq!(token.bytes(), &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_invalid_hex() {
        assert!(SessionToken::from_hex("xyz", None).is_err());
    }

    #[test]
    fn test_token_expiry_margin() {
        let now = Instant::now();
        let token = SessionToken::new(vec![1], Some(now + Duration::from_secs(10)));
        assert!(token.is_valid_at(now, TOKEN_EXPIRY_MARGIN));
        assert!(!token.is_valid_at(now + Duration::from_secs(9), TOKEN_EXPIRY_MARGIN));
        assert!(!token.is_valid_at(now + Duration::from_secs(20), Duration::ZERO));
    }

    #[test]
    fn test_memory_session_records() {
        let mut session = MemorySession::new(vec![3]);
        let log = session.log();
        session.send_datagram(&[1, 2, 3]).unwrap();
        assert_eq!(log.lock().len(), 1);
        assert!(session.current_token(Instant::now()).is_some());
    }

    #[test]
    fn test_udp_session_sends_to_local_socket() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let address = receiver.local_addr().unwrap().to_string();
        let mut session = UdpDeviceSession::connect(&address, vec![3], None).unwrap();
        assert!(session.current_token(Instant::now()).is_none());
        assert_eq!(session.send_datagram(&[7, 7, 7]).unwrap(), 3);
        let mut buf = [0u8; 16];
        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[7, 7, 7]);
    }
}
