use std::io::ErrorKind as IoErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use relay_api::{ExternalReceiver, PacketSink, RelayError};

// ---- Config ----

fn default_interface() -> String {
    "0.0.0.0".into()
}

fn default_max_datagram() -> usize {
    65_536
}

/// Receive-side settings, read from a processor's `config` table.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UdpReceiverConfig {
    /// Local address, e.g. `"0.0.0.0:10006"`.
    pub bind: String,
    /// IPv4 multicast group to join, if any.
    #[serde(default)]
    pub multicast: Option<String>,
    /// Interface address for the multicast join.
    #[serde(default = "default_interface")]
    pub interface: String,
    /// Keep only the newest pending datagram.
    #[serde(default)]
    pub conflate: bool,
    #[serde(default = "default_max_datagram")]
    pub max_datagram: usize,
}

/// Send-side settings, read from a processor's `config` table.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UdpSenderConfig {
    /// Destination address for packets.
    pub target: String,
    #[serde(default = "default_sender_bind")]
    pub local: String,
}

fn default_sender_bind() -> String {
    "0.0.0.0:0".into()
}

// ---- Receiver ----

/// Non-blocking datagram receiver. One datagram is one message.
pub struct UdpReceiver {
    socket: UdpSocket,
    addr: SocketAddr,
    buf: Vec<u8>,
    conflate: bool,
}

impl UdpReceiver {
    pub fn bind(cfg: &UdpReceiverConfig) -> Result<Self, RelayError> {
        if cfg.max_datagram == 0 {
            return Err(RelayError::config("udp: max_datagram must be positive"));
        }
        let socket = UdpSocket::bind(&cfg.bind)
            .map_err(|e| RelayError::io(format!("udp bind {}: {e}", cfg.bind)))?;

        if let Some(group) = &cfg.multicast {
            let group: Ipv4Addr = group
                .parse()
                .map_err(|e| RelayError::config(format!("udp multicast group '{group}': {e}")))?;
            let interface: Ipv4Addr = cfg
                .interface
                .parse()
                .map_err(|e| RelayError::config(format!("udp interface '{}': {e}", cfg.interface)))?;
            socket
                .join_multicast_v4(&group, &interface)
                .map_err(|e| RelayError::io(format!("udp join {group} on {interface}: {e}")))?;
        }

        socket.set_nonblocking(true)?;
        let addr = socket.local_addr()?;
        tracing::info!(%addr, multicast = ?cfg.multicast, conflate = cfg.conflate, "udp receiver bound");

        Ok(Self {
            socket,
            addr,
            buf: vec![0; cfg.max_datagram],
            conflate: cfg.conflate,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl ExternalReceiver for UdpReceiver {
    fn next_message(&mut self) -> Result<Option<Vec<u8>>, RelayError> {
        let mut latest = None;
        loop {
            match self.socket.recv(&mut self.buf) {
                Ok(n) => {
                    latest = Some(self.buf[..n].to_vec());
                    if !self.conflate {
                        break;
                    }
                }
                Err(e) if e.kind() == IoErrorKind::WouldBlock => break,
                Err(e) => return Err(RelayError::io(format!("udp recv on {}: {e}", self.addr))),
            }
        }
        Ok(latest)
    }
}

// ---- Sender ----

/// Non-blocking datagram sender for command packets.
pub struct UdpSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSender {
    pub fn connect(cfg: &UdpSenderConfig) -> Result<Self, RelayError> {
        let target: SocketAddr = cfg
            .target
            .parse()
            .map_err(|e| RelayError::config(format!("udp target '{}': {e}", cfg.target)))?;
        let socket = UdpSocket::bind(&cfg.local)
            .map_err(|e| RelayError::io(format!("udp bind {}: {e}", cfg.local)))?;
        socket.set_nonblocking(true)?;
        tracing::info!(dest = %target, "udp sender ready");
        Ok(Self { socket, target })
    }
}

impl PacketSink for UdpSender {
    fn send(&mut self, packet: &[u8]) -> Result<bool, RelayError> {
        match self.socket.send_to(packet, self.target) {
            Ok(n) if n == packet.len() => Ok(true),
            Ok(n) => {
                tracing::warn!(dest = %self.target, sent = n, len = packet.len(), "udp packet truncated");
                Ok(false)
            }
            Err(e) if e.kind() == IoErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(RelayError::io(format!("udp send to {}: {e}", self.target))),
        }
    }
}
