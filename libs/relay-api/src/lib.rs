pub mod error;
pub mod packet;
pub mod record;
pub mod referee;
pub mod topics;
pub mod transport;

pub use error::{ErrorKind, RelayError};
pub use packet::CommandPacket;
pub use record::{Record, now_ms};
pub use referee::{RefereeCommand, RefereeTag};
pub use transport::{ExternalReceiver, PacketSink};
