//! Socket setup for the rig's four ports.
//!
//! One connectionless command socket and three telemetry streams. Telemetry
//! connects are bounded and fail fast; the command socket is best-effort and
//! degrades to a dropping sink if it cannot be opened.

use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::time::Duration;

use log::info;
use mio::net::TcpStream as MioTcpStream;

use crate::adapters::command_link::UdpCommandLink;
use crate::config::{PortConfig, RigConfig};
use crate::error::SetupError;
use crate::telemetry::Channel;

/// Address used when none is given.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Parse a numeric IPv4 address. Host names are not resolved.
pub fn parse_address(text: &str) -> Result<Ipv4Addr, SetupError> {
    text.trim()
        .parse()
        .map_err(|_| SetupError::InvalidAddress(text.to_owned()))
}

/// A connected, non-blocking telemetry stream.
pub struct TelemetryLink {
    channel: Channel,
    stream: MioTcpStream,
}

impl TelemetryLink {
    /// Wrap an already connected stream; it is switched to non-blocking.
    pub fn from_std(channel: Channel, stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            channel,
            stream: MioTcpStream::from_std(stream),
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub(crate) fn stream_mut(&mut self) -> &mut MioTcpStream {
        &mut self.stream
    }

    /// One read of at most `buf.len()` bytes.
    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

/// Everything the event loop needs from the network.
pub struct RigLinks {
    pub command: UdpCommandLink,
    pub telemetry: [TelemetryLink; 3],
}

pub struct Connector {
    address: Ipv4Addr,
    ports: PortConfig,
    connect_timeout: Duration,
}

impl Connector {
    pub fn new(address: Ipv4Addr, config: &RigConfig) -> Self {
        Self {
            address,
            ports: config.ports.clone(),
            connect_timeout: config.connect_timeout(),
        }
    }

    /// Open the command socket, then connect `out1`..`out3` in order.
    ///
    /// The first telemetry failure aborts; there is no retry.
    pub fn connect(&self) -> Result<RigLinks, SetupError> {
        let command = self.open_command_link();
        let telemetry = [
            self.connect_telemetry(Channel::Out1)?,
            self.connect_telemetry(Channel::Out2)?,
            self.connect_telemetry(Channel::Out3)?,
        ];
        Ok(RigLinks { command, telemetry })
    }

    /// Best-effort command socket; never fails.
    pub fn open_command_link(&self) -> UdpCommandLink {
        UdpCommandLink::open(self.endpoint(self.ports.command))
    }

    fn connect_telemetry(&self, channel: Channel) -> Result<TelemetryLink, SetupError> {
        let port = self.ports.telemetry[channel.index()];
        let connect_err = |source| SetupError::Connect {
            channel,
            port,
            source,
        };

        let stream = TcpStream::connect_timeout(&self.endpoint(port), self.connect_timeout)
            .map_err(connect_err)?;
        let link = TelemetryLink::from_std(channel, stream).map_err(connect_err)?;
        info!("connector: {} connected on port {}", channel, port);
        Ok(link)
    }

    fn endpoint(&self, port: u16) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.address, port))
    }
}
