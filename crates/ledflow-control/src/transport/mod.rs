//! Frame transport
//!
//! A frame travels as one or more UDP datagrams per tick:
//!
//! ```text
//! +---------+------------------+----------+----------+-------------------+
//! | version | token (9 or 12)  | reserved | fragment | RGB payload <=900 |
//! +---------+------------------+----------+----------+-------------------+
//! ```
//!
//! [`TransportFramer`] slices the frame along the device's string lengths,
//! [`DeviceSession`] supplies the token and performs the send.

pub mod framer;
pub mod protocol;
pub mod session;

pub use framer::{SendOutcome, TransportFramer};
pub use protocol::{build_datagram, parse_datagram, Datagram, ProtocolVersion, MAX_PAYLOAD};
pub use session::{DeviceSession, MemorySession, SessionToken, UdpDeviceSession};
