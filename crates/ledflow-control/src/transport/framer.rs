//! Frame slicing and sending

use std::time::Instant;

use tracing::trace;

use super::protocol::{build_datagram, ProtocolVersion, MAX_PAYLOAD};
use super::session::DeviceSession;
use crate::{ControlError, Result};

/// What happened to one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// All datagrams were handed to the session
    Sent {
        /// Datagrams sent
        datagrams: usize,
        /// Bytes written, headers included
        bytes: usize,
    },
    /// No valid token; nothing was sent
    NoToken,
}

/// Packs frames into datagrams along the device's string boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportFramer {
    version: ProtocolVersion,
}

impl TransportFramer {
    /// A framer speaking `version`
    pub fn new(version: ProtocolVersion) -> Self {
        Self { version }
    }

    /// Protocol version in use
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Fail with [`ControlError::ConfigMismatch`] unless the strings cover
    /// exactly `frame_len` bytes
    pub fn check_lengths(strings: &[usize], frame_len: usize) -> Result<()> {
        let actual: usize = strings.iter().sum();
        if actual != frame_len {
            return Err(ControlError::ConfigMismatch {
                expected: frame_len,
                actual,
            });
        }
        Ok(())
    }

    /// Payload slices in send order.
    ///
    /// Each string yields one fragment, or several if it is longer than
    /// [`MAX_PAYLOAD`]. Empty strings yield nothing.
    pub fn fragments<'a>(strings: &[usize], frame: &'a [u8]) -> Result<Vec<&'a [u8]>> {
        Self::check_lengths(strings, frame.len())?;
        let mut fragments = Vec::with_capacity(strings.len());
        let mut offset = 0;
        for &len in strings {
            let string = &frame[offset..offset + len];
            fragments.extend(string.chunks(MAX_PAYLOAD));
            offset += len;
        }
        if fragments.len() > u8::MAX as usize + 1 {
            return Err(ControlError::TransportError(format!(
                "Frame needs {} fragments, at most 256 fit the index byte",
                fragments.len()
            )));
        }
        Ok(fragments)
    }

    /// Complete datagrams for one frame
    pub fn datagrams(&self, token: &[u8], strings: &[usize], frame: &[u8]) -> Result<Vec<Vec<u8>>> {
        Self::fragments(strings, frame)?
            .into_iter()
            .enumerate()
            .map(|(index, payload)| build_datagram(self.version, token, index as u8, payload))
            .collect()
    }

    /// Frame and send through `session`.
    ///
    /// Without a valid token nothing is sent and [`SendOutcome::NoToken`] is
    /// returned. Length mismatches fail before anything is sent, so a frame
    /// is either sent whole or not at all (barring socket errors).
    pub fn send(
        &self,
        session: &mut dyn DeviceSession,
        frame: &[u8],
        now: Instant,
    ) -> Result<SendOutcome> {
        let Some(token) = session.current_token(now) else {
            return Ok(SendOutcome::NoToken);
        };
        let datagrams = self.datagrams(token.bytes(), session.string_lengths(), frame)?;
        let mut bytes = 0;
        for datagram in &datagrams {
            bytes += session.send_datagram(datagram)?;
        }
        trace!("Sent {} datagrams ({} bytes)", datagrams.len(), bytes);
        Ok(SendOutcome::Sent {
            datagrams: datagrams.len(),
            bytes,
        })
    }
}

impl Default for TransportFramer {
    fn default() -> Self {
        Self::new(ProtocolVersion::default())
    }
}
