use std::io::{Read, Write};
use std::time::Instant;

use log::debug;
use ssh2::{Channel, ErrorCode, MethodType, Session};

use super::config::SessionConfig;
use super::connection::{establish_tcp, is_no_data, time_left, Transport};
use crate::error::{Error, Result};

/// libssh2's `LIBSSH2_ERROR_TIMEOUT`.
const SESSION_TIMEOUT: i32 = -9;

/// Interactive shell channel over SSH.
pub struct SshTransport {
    sess: Session,
    channel: Channel,
}

impl SshTransport {
    fn establish_session(config: &SessionConfig, deadline: Instant) -> Result<Session> {
        let port = config.port_or(Self::DEFAULT_PORT);
        let tcp = establish_tcp(&config.host, port, time_left(&config.host, port, deadline)?)?;

        let mut sess = Session::new()?;
        if let Some(methods) = &config.host_key_methods {
            sess.method_pref(MethodType::HostKey, methods)?;
        }

        sess.set_tcp_stream(tcp);
        Self::step(&mut sess, config, deadline, |sess| sess.handshake())?;

        Ok(sess)
    }

    fn make_channel_session(
        mut sess: Session,
        config: &SessionConfig,
        deadline: Instant,
    ) -> Result<SshTransport> {
        let mut channel = Self::step(&mut sess, config, deadline, |sess| sess.channel_session())?;
        Self::step(&mut sess, config, deadline, |_| channel.request_pty("vt100", None, None))?;
        Self::step(&mut sess, config, deadline, |_| channel.shell())?;

        // Reads poll; only writes may block.
        sess.set_timeout(0);

        Ok(SshTransport { sess, channel })
    }

    /// Runs one blocking libssh2 call with what is left of the connect
    /// timeout. A stall is reported as a connect timeout.
    fn step<R>(
        sess: &mut Session,
        config: &SessionConfig,
        deadline: Instant,
        call: impl FnOnce(&mut Session) -> std::result::Result<R, ssh2::Error>,
    ) -> Result<R> {
        let port = config.port_or(Self::DEFAULT_PORT);
        let left = time_left(&config.host, port, deadline)?;

        // A zero timeout means "block forever" to libssh2.
        sess.set_timeout(u32::try_from(left.as_millis()).unwrap_or(u32::MAX).max(1));

        call(sess).map_err(|e| match e.code() {
            ErrorCode::Session(SESSION_TIMEOUT) => Error::ConnectTimeout {
                host: config.host.clone(),
                port,
            },
            _ => e.into(),
        })
    }
}

impl Transport for SshTransport {
    const DEFAULT_PORT: u16 = 22;

    fn open(config: &SessionConfig, deadline: Instant) -> Result<Self> {
        let mut sess = Self::establish_session(config, deadline)?;

        let username = config.username.as_deref().unwrap_or_default();
        let password = config.password.as_deref().unwrap_or_default();

        debug!("Authenticating as {} on {}", username, config.host);
        let authenticated = Self::step(&mut sess, config, deadline, |sess| {
            sess.userauth_password(username, password)
        });
        match authenticated {
            Err(e @ Error::ConnectTimeout { .. }) => return Err(e),
            Ok(()) if sess.authenticated() => {}
            _ => {
                return Err(Error::AuthenticationFailed {
                    user: username.to_string(),
                })
            }
        }

        Self::make_channel_session(sess, config, deadline)
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.channel.write_all(data)?;
        self.channel.flush()?;

        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.sess.set_blocking(false);
        let read = self.channel.read(buf);
        self.sess.set_blocking(true);

        match read {
            Ok(0) if self.channel.eof() => Err(Error::ConnectionClosed),
            Ok(size) => Ok(size),
            Err(ref e) if is_no_data(e) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.channel.close()?;

        if let Err(e) = self.sess.disconnect(None, "closed by client", None) {
            debug!("Ignored error while disconnecting: {}", e);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorKind;
    use crate::generic::session::TerminalSession;

    fn config(port: u16, timeout: Duration) -> SessionConfig {
        SessionConfig::new("127.0.0.1")
            .port(port)
            .credentials("admin", "secret")
            .connect_timeout(timeout)
    }

    #[test]
    fn refused_connection_is_could_not_connect() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        drop(listener);

        let deadline = Instant::now() + Duration::from_secs(1);
        let result = SshTransport::open(&config(port, Duration::from_secs(1)), deadline);
        assert!(matches!(result, Err(Error::CouldNotConnect { .. })), "{:?}", result.err());

        Ok(())
    }

    #[test]
    fn silent_server_is_a_connect_timeout_within_budget() -> anyhow::Result<()> {
        env_logger::try_init().ok();

        // Accepts TCP through the backlog but never sends an SSH banner.
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();

        let timeout = Duration::from_millis(300);
        let started = Instant::now();
        let result = TerminalSession::<SshTransport>::connect(config(port, timeout));
        let elapsed = started.elapsed();

        match result {
            Err(e @ Error::ConnectTimeout { .. }) => {
                assert_eq!(e.kind(), Some(ErrorKind::ConnectTimeout));
            }
            other => panic!("expected a connect timeout, got {:?}", other.err()),
        }
        assert!(elapsed < timeout + Duration::from_secs(1), "{:?}", elapsed);

        drop(listener);
        Ok(())
    }

    #[test]
    fn server_closing_during_handshake_is_not_a_timeout() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();

        let server = thread::spawn(move || -> std::io::Result<()> {
            let (stream, _) = listener.accept()?;
            let mut banner = String::new();
            BufReader::new(&stream).read_line(&mut banner)?;
            Ok(())
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        let result = SshTransport::open(&config(port, Duration::from_secs(5)), deadline);
        server.join().expect("server thread panicked")?;

        assert!(matches!(result, Err(Error::Ssh(_))), "{:?}", result.err());

        Ok(())
    }
}
