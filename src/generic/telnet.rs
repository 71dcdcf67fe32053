//! Telnet transport.
//!
//! Option negotiation is answered automatically so the remote end never
//! stalls waiting for a reply: `WILL`/`WONT` from the device are acknowledged
//! with `DO`/`DONT`, and every `DO`/`DONT` is refused with `WONT`.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Instant;

use log::{debug, trace};

use super::config::SessionConfig;
use super::connection::{establish_tcp, is_no_data, time_left, Transport};
use super::matcher::Terminator;
use super::session::TerminalSession;
use crate::error::{Error, Result};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const USERNAME_PROMPT: &str = r"(?:[Uu]ser ?[Nn]ame|[Ll]ogin): *";
const PASSWORD_PROMPT: &str = r"[Pp]assword: *";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Data,
    Iac,
    Negotiation(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Separates data from telnet commands in the incoming stream. Keeps its
/// state between reads so commands split across reads are handled.
#[derive(Debug, Default)]
pub struct TelnetParser {
    state: State,
}

impl TelnetParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the data bytes of `input` to `data` and the replies the
    /// remote end expects to `replies`.
    pub fn feed(&mut self, input: &[u8], data: &mut Vec<u8>, replies: &mut Vec<u8>) {
        for &byte in input {
            self.state = match (self.state, byte) {
                (State::Data, IAC) => State::Iac,
                (State::Data, _) => {
                    data.push(byte);
                    State::Data
                }
                (State::Iac, IAC) => {
                    data.push(IAC);
                    State::Data
                }
                (State::Iac, WILL | WONT | DO | DONT) => State::Negotiation(byte),
                (State::Iac, SB) => State::Subnegotiation,
                (State::Iac, _) => State::Data,
                (State::Negotiation(command), option) => {
                    let answer = match command {
                        WILL => DO,
                        WONT => DONT,
                        _ => WONT,
                    };
                    trace!("Telnet option {} {} answered with {}", command, option, answer);
                    replies.extend_from_slice(&[IAC, answer, option]);
                    State::Data
                }
                (State::Subnegotiation, IAC) => State::SubnegotiationIac,
                (State::Subnegotiation, _) => State::Subnegotiation,
                (State::SubnegotiationIac, SE) => State::Data,
                (State::SubnegotiationIac, _) => State::Subnegotiation,
            };
        }
    }
}

pub struct TelnetTransport {
    stream: TcpStream,
    parser: TelnetParser,
    raw: Vec<u8>,
}

impl TelnetTransport {
    pub fn new(stream: TcpStream) -> Self {
        TelnetTransport {
            stream,
            parser: TelnetParser::new(),
            raw: Vec::new(),
        }
    }
}

impl Transport for TelnetTransport {
    const DEFAULT_PORT: u16 = 23;

    fn open(config: &SessionConfig, deadline: Instant) -> Result<Self> {
        let port = config.port_or(Self::DEFAULT_PORT);
        let timeout = time_left(&config.host, port, deadline)?;
        let stream = establish_tcp(&config.host, port, timeout)?;
        stream.set_nodelay(true)?;

        Ok(Self::new(stream))
    }

    fn login(session: &mut TerminalSession<Self>) -> Result<()> {
        let username = session.config().username.clone();
        let password = session.config().password.clone();

        if let Some(username) = username {
            debug!("Sending username {}", username);
            session.expect_during_connect(&[Terminator::pattern(USERNAME_PROMPT)?])?;
            session.write_line(&username)?;
        }

        if let Some(password) = password {
            session.expect_during_connect(&[Terminator::pattern(PASSWORD_PROMPT)?])?;
            session.write_line(&password)?;
        }

        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut escaped = Vec::with_capacity(data.len());
        for &byte in data {
            if byte == IAC {
                escaped.push(IAC);
            }
            escaped.push(byte);
        }

        self.stream.write_all(&escaped)?;
        self.stream.flush()?;

        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.raw.resize(buf.len(), 0);

        self.stream.set_nonblocking(true)?;
        let read = self.stream.read(&mut self.raw);
        self.stream.set_nonblocking(false)?;

        let size = match read {
            Ok(0) => return Err(Error::ConnectionClosed),
            Ok(size) => size,
            Err(ref e) if is_no_data(e) => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut data = Vec::with_capacity(size);
        let mut replies = Vec::new();
        self.parser.feed(&self.raw[..size], &mut data, &mut replies);

        if !replies.is_empty() {
            self.stream.write_all(&replies)?;
        }

        // Data never grows while parsing, so it always fits in `buf`.
        buf[..data.len()].copy_from_slice(&data);

        Ok(data.len())
    }

    fn close(&mut self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != std::io::ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::generic::session::Shell;

    fn parse(parser: &mut TelnetParser, input: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut data = Vec::new();
        let mut replies = Vec::new();
        parser.feed(input, &mut data, &mut replies);
        (data, replies)
    }

    #[test]
    fn acknowledges_will_and_wont() {
        let mut parser = TelnetParser::new();
        let (data, replies) = parse(&mut parser, &[IAC, WILL, 1, b'o', b'k', IAC, WONT, 3]);

        assert_eq!(data, b"ok");
        assert_eq!(replies, [IAC, DO, 1, IAC, DONT, 3]);
    }

    #[test]
    fn refuses_do_and_dont() {
        let mut parser = TelnetParser::new();
        let (_, replies) = parse(&mut parser, &[IAC, DO, 24, IAC, DONT, 31]);

        assert_eq!(replies, [IAC, WONT, 24, IAC, WONT, 31]);
    }

    #[test]
    fn commands_split_across_reads() {
        let mut parser = TelnetParser::new();

        let (data, replies) = parse(&mut parser, &[b'a', IAC]);
        assert_eq!(data, b"a");
        assert!(replies.is_empty());

        let (data, replies) = parse(&mut parser, &[WILL]);
        assert!(data.is_empty());
        assert!(replies.is_empty());

        let (data, replies) = parse(&mut parser, &[1, b'b']);
        assert_eq!(data, b"b");
        assert_eq!(replies, [IAC, DO, 1]);
    }

    #[test]
    fn skips_subnegotiation_and_unescapes_iac() {
        let mut parser = TelnetParser::new();
        let (data, replies) = parse(&mut parser, &[IAC, SB, 24, 1, IAC, SE, b'x', IAC, IAC]);

        assert_eq!(data, [b'x', IAC]);
        assert!(replies.is_empty());
    }

    #[test]
    fn logs_in_through_username_and_password_prompts() -> anyhow::Result<()> {
        env_logger::try_init().ok();

        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();

        let device = thread::spawn(move || -> std::io::Result<Vec<String>> {
            let (mut stream, _) = listener.accept()?;
            let mut reader = BufReader::new(stream.try_clone()?);
            let mut received = Vec::new();

            // Negotiation replies arrive mixed with the lines, keep the text.
            let mut read_line = |received: &mut Vec<String>| -> std::io::Result<()> {
                let mut line = Vec::new();
                reader.read_until(b'\n', &mut line)?;
                let text: String = line
                    .into_iter()
                    .filter(|b| b.is_ascii_graphic() || *b == b' ')
                    .map(char::from)
                    .collect();
                received.push(text.trim().to_string());
                Ok(())
            };

            stream.write_all(&[IAC, WILL, 1, IAC, WILL, 3])?;
            stream.write_all(b"\r\nUsername: ")?;
            read_line(&mut received)?;

            stream.write_all(b"Password: ")?;
            read_line(&mut received)?;

            stream.write_all(b"\r\nswitch>")?;
            read_line(&mut received)?;
            stream.write_all(b"show clock\r\n10:00:00\r\nswitch>")?;

            read_line(&mut received)?;

            Ok(received)
        });

        let config = SessionConfig::new("127.0.0.1")
            .port(port)
            .credentials("admin", "secret")
            .command_timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(1));

        let mut session = TerminalSession::<TelnetTransport>::connect(config)?;
        assert_eq!(session.current_prompt(), "switch>");

        let lines = session.execute("show clock")?;
        assert_eq!(lines, vec!["10:00:00"]);

        session.quit("exit")?;

        let received = device.join().expect("device thread panicked")?;
        assert_eq!(received, ["admin", "secret", "show clock", "exit"]);

        Ok(())
    }
}
