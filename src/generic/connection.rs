use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use log::debug;

use super::config::SessionConfig;
use super::session::TerminalSession;
use crate::error::{Error, Result};

/// A byte channel to the CLI of a device.
pub trait Transport: Sized {
    const DEFAULT_PORT: u16;

    /// Opens the channel and completes the protocol handshake before
    /// `deadline`.
    fn open(config: &SessionConfig, deadline: Instant) -> Result<Self>;

    /// Runs the dialogue needed before the first shell prompt, if any.
    fn login(session: &mut TerminalSession<Self>) -> Result<()> {
        let _ = session;
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Reads whatever is immediately available, returning 0 when nothing is.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn close(&mut self) -> Result<()>;
}

/// Connects a TCP stream, trying each resolved address in turn.
pub(crate) fn establish_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let could_not_connect = |reason: String| Error::CouldNotConnect {
        host: host.to_string(),
        port,
        reason,
    };

    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| could_not_connect(e.to_string()))?;

    let mut last_error = None;
    for addr in addrs {
        debug!("Connecting to {}", addr);
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }

    Err(match last_error {
        None => could_not_connect("no address resolved".to_string()),
        Some(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
            Error::ConnectTimeout {
                host: host.to_string(),
                port,
            }
        }
        Some(e) => could_not_connect(e.to_string()),
    })
}

/// Time left before `deadline`, or a connect timeout once it has passed.
pub(crate) fn time_left(host: &str, port: u16, deadline: Instant) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(Error::ConnectTimeout {
            host: host.to_string(),
            port,
        });
    }

    Ok(left)
}

/// True when a non-blocking read found nothing to return.
pub(crate) fn is_no_data(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
