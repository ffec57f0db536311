use crate::error::RelayError;

/// Receive side of an external message transport.
///
/// Implementations must never block: when nothing is pending they return
/// `Ok(None)` immediately. Framing is the transport's concern, one call
/// yields one complete message.
pub trait ExternalReceiver: Send {
    fn next_message(&mut self) -> Result<Option<Vec<u8>>, RelayError>;
}

/// Send side for encoded command packets.
///
/// Returns `Ok(false)` when the packet was dropped because the transport
/// could not accept it without blocking.
pub trait PacketSink: Send {
    fn send(&mut self, packet: &[u8]) -> Result<bool, RelayError>;
}
