//! KendraIO client: TCP for commands, UDP for the telemetry stream.
//!
//! All frames are length-prefixed protobuf messages. The navigation
//! service, velocity output, and static map source sit behind this one
//! connection; the controller is a client only and never implements
//! planning.

use crate::error::{AnveshaError, Result};
use prost::Message as ProstMessage;
use std::io::{Read, Write};
use std::net::{TcpStream, UdpSocket};
use std::sync::Mutex;
use std::time::Duration;

// Include generated protobuf types
pub mod proto {
    pub mod kendra {
        include!(concat!(env!("OUT_DIR"), "/kendra.rs"));
    }
}

use proto::kendra;

/// Navigation-facing surface of the hub connection.
///
/// The sequencer and behaviours talk to the external navigation service
/// through this trait so tests can substitute a recording mock.
pub trait NavService: Send + Sync {
    /// Dispatch a navigation goal and wait up to the configured bound for
    /// acknowledgment. Returns whether the goal was acknowledged in time.
    fn send_goal(&self, x: f32, y: f32, yaw: f32) -> Result<bool>;

    /// Cancel all in-flight navigation goals.
    fn cancel_all_goals(&self) -> Result<()>;

    /// Send a direct velocity command (homing creep/stop).
    fn set_velocity(&self, linear: f32, angular: f32) -> Result<()>;
}

/// Default buffer size (64KB), sized for one UDP telemetry datagram
const DEFAULT_BUFFER_SIZE: usize = 65536;

/// Upper bound on a length-prefixed TCP response frame. Static maps are the
/// largest response and a packed cell array grows well past the telemetry
/// buffer size, so this bound only guards against a corrupt length prefix.
const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

/// TCP/UDP client for the KendraIO hub.
pub struct KendraClient {
    /// Command stream; shared between the tick loop and the detection
    /// path, so writes are serialized
    stream: Mutex<TcpStream>,
    udp_socket: UdpSocket,
    goal_wait: Duration,
}

impl KendraClient {
    /// Connect with timeout (same port for TCP commands and UDP telemetry).
    pub fn connect_timeout(addr: &str, timeout: Duration, goal_wait: Duration) -> Result<Self> {
        let sock_addr: std::net::SocketAddr = addr
            .parse()
            .map_err(|e| AnveshaError::Config(format!("Invalid address: {}", e)))?;
        let stream = TcpStream::connect_timeout(&sock_addr, timeout)?;

        // Bind UDP socket to receive telemetry from the hub
        let udp_bind_addr = format!("0.0.0.0:{}", sock_addr.port());
        let udp_socket = UdpSocket::bind(&udp_bind_addr).map_err(|e| {
            AnveshaError::Config(format!("Failed to bind UDP to {}: {}", udp_bind_addr, e))
        })?;
        udp_socket.set_nonblocking(true)?;

        tracing::info!("UDP socket bound to port {} for telemetry", sock_addr.port());

        Ok(Self {
            stream: Mutex::new(stream),
            udp_socket,
            goal_wait,
        })
    }

    /// Receive one telemetry message from UDP (non-blocking).
    /// `buffer` is caller-owned scratch space of at least 64KB.
    pub fn recv_telemetry(&self, buffer: &mut [u8]) -> Result<Option<kendra::Telemetry>> {
        match self.udp_socket.recv(buffer) {
            Ok(len) => {
                if len < 4 {
                    return Ok(None);
                }
                let msg_len =
                    u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
                if len < 4 + msg_len {
                    return Err(AnveshaError::Protocol("Incomplete UDP message".into()));
                }
                let msg = kendra::Telemetry::decode(&buffer[4..4 + msg_len])?;
                Ok(Some(msg))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(AnveshaError::Connection(e)),
        }
    }

    /// Request the static occupancy map, waiting up to `timeout` for the
    /// hub to deliver it. Failure here is fatal for startup.
    pub fn request_map(&self, timeout: Duration) -> Result<kendra::MapData> {
        let command = kendra::Command {
            command: Some(kendra::command::Command::MapRequest(kendra::MapRequest {})),
        };

        let mut stream = self
            .stream
            .lock()
            .map_err(|_| AnveshaError::Protocol("command stream poisoned".into()))?;
        Self::send_command(&mut stream, &command)?;

        stream.set_read_timeout(Some(timeout))?;
        let response = Self::read_response(&mut stream).map_err(|e| {
            AnveshaError::Startup(format!("no static map within {:?}: {}", timeout, e))
        })?;

        match response.payload {
            Some(kendra::response::Payload::Map(map)) => Ok(map),
            _ => Err(AnveshaError::Startup(
                "unexpected response to map request".into(),
            )),
        }
    }

    /// Allocate a receive buffer sized for telemetry frames.
    pub fn telemetry_buffer() -> Vec<u8> {
        vec![0u8; DEFAULT_BUFFER_SIZE]
    }

    fn send_command(stream: &mut TcpStream, msg: &kendra::Command) -> Result<()> {
        let encoded = msg.encode_to_vec();
        let len = encoded.len() as u32;

        // Write length prefix (big-endian)
        stream.write_all(&len.to_be_bytes())?;
        stream.write_all(&encoded)?;
        stream.flush()?;

        Ok(())
    }

    fn read_response(stream: &mut TcpStream) -> Result<kendra::Response> {
        let mut prefix = [0u8; 4];
        stream.read_exact(&mut prefix)?;
        let msg_len = u32::from_be_bytes(prefix) as usize;
        if msg_len > MAX_RESPONSE_SIZE {
            return Err(AnveshaError::Protocol(format!(
                "oversized response frame: {} bytes",
                msg_len
            )));
        }

        let mut buf = vec![0u8; msg_len];
        stream.read_exact(&mut buf)?;
        Ok(kendra::Response::decode(buf.as_slice())?)
    }
}

impl NavService for KendraClient {
    fn send_goal(&self, x: f32, y: f32, yaw: f32) -> Result<bool> {
        let command = kendra::Command {
            command: Some(kendra::command::Command::NavGoal(kendra::NavGoal {
                x,
                y,
                yaw,
            })),
        };

        let mut stream = self
            .stream
            .lock()
            .map_err(|_| AnveshaError::Protocol("command stream poisoned".into()))?;
        Self::send_command(&mut stream, &command)?;

        // Bounded wait for acknowledgment; timing out is not an error,
        // change detection or an idle warning will trigger a resend
        stream.set_read_timeout(Some(self.goal_wait))?;
        match Self::read_response(&mut stream) {
            Ok(response) => match response.payload {
                Some(kendra::response::Payload::Ack(ack)) => Ok(ack.accepted),
                _ => Ok(false),
            },
            Err(AnveshaError::Connection(e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn cancel_all_goals(&self) -> Result<()> {
        let command = kendra::Command {
            command: Some(kendra::command::Command::CancelGoals(kendra::CancelGoals {})),
        };
        let mut stream = self
            .stream
            .lock()
            .map_err(|_| AnveshaError::Protocol("command stream poisoned".into()))?;
        Self::send_command(&mut stream, &command)
    }

    fn set_velocity(&self, linear: f32, angular: f32) -> Result<()> {
        let command = kendra::Command {
            command: Some(kendra::command::Command::Velocity(kendra::Velocity {
                linear,
                angular,
            })),
        };
        let mut stream = self
            .stream
            .lock()
            .map_err(|_| AnveshaError::Protocol("command stream poisoned".into()))?;
        Self::send_command(&mut stream, &command)
    }
}
