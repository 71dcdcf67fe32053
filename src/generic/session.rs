//! Blocking line-oriented client for device CLIs.
//!
//! A device CLI has no message framing: every response ends with a prompt, so
//! each exchange is "send, then read until the buffer ends with one of the
//! expected terminators". [`TerminalSession`] implements this loop once over
//! any [`Transport`]; drivers only see the [`Shell`] capability.

use std::thread;
use std::time::{Duration, Instant};

use encoding_rs::Decoder;
use log::{debug, info, trace, warn};

use super::config::SessionConfig;
use super::connection::Transport;
use super::matcher::{self, Terminator};
use crate::error::{Error, Result};

/// What to wait for after sending something to the device.
#[derive(Debug, Clone, Default)]
pub struct Expect {
    /// Defaults to the configured prompts.
    pub wait_for: Option<Vec<Terminator>>,
    /// Keep the trailing prompt line in the returned lines.
    pub include_last_line: bool,
    /// Defaults to the configured command timeout.
    pub timeout: Option<Duration>,
}

impl Expect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait_for(mut self, terminator: Terminator) -> Self {
        self.wait_for.get_or_insert_with(Vec::new).push(terminator);
        self
    }

    pub fn include_last_line(mut self) -> Self {
        self.include_last_line = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The operations CLI drivers use to talk to a device.
pub trait Shell {
    /// Sends `command` and a line ending, then returns the response lines
    /// without the echoed command, the trailing prompt (unless asked) and
    /// blank lines.
    fn execute_with(&mut self, command: &str, expect: &Expect) -> Result<Vec<String>>;

    /// Like [`Shell::execute_with`] without appending a line ending.
    fn send_key_with(&mut self, key: &str, expect: &Expect) -> Result<Vec<String>>;

    /// Sends a last command without waiting for an answer and closes.
    fn quit(&mut self, command: &str) -> Result<()>;

    /// Last line of the most recent read.
    fn current_prompt(&self) -> &str;

    fn execute(&mut self, command: &str) -> Result<Vec<String>> {
        self.execute_with(command, &Expect::default())
    }

    fn send_key(&mut self, key: &str) -> Result<Vec<String>> {
        self.send_key_with(key, &Expect::default())
    }
}

pub struct TerminalSession<T: Transport> {
    transport: Option<T>,
    config: SessionConfig,
    connect_deadline: Instant,
    decoder: Decoder,
    buffer: String,
    transcript: String,
}

impl<T: Transport> TerminalSession<T> {
    /// Opens the transport and waits for the first shell prompt, all within
    /// the connect timeout.
    pub fn connect(config: SessionConfig) -> Result<Self> {
        let deadline = Instant::now() + config.connect_timeout;
        let transport = T::open(&config, deadline)?;

        Self::start_until(transport, config, deadline)
    }

    /// Runs the login dialogue on an already opened transport and waits for
    /// the first shell prompt.
    pub fn start(transport: T, config: SessionConfig) -> Result<Self> {
        let deadline = Instant::now() + config.connect_timeout;

        Self::start_until(transport, config, deadline)
    }

    fn start_until(transport: T, config: SessionConfig, deadline: Instant) -> Result<Self> {
        let mut session = Self::with_transport(transport, config, deadline);

        T::login(&mut session)?;

        let prompts = session.config.prompts.clone();
        session.expect_during_connect(&prompts)?;

        info!("Connected to {}", session.config.host);

        Ok(session)
    }

    fn with_transport(transport: T, config: SessionConfig, connect_deadline: Instant) -> Self {
        let decoder = config.encoding.new_decoder_without_bom_handling();

        TerminalSession {
            transport: Some(transport),
            config,
            connect_deadline,
            decoder,
            buffer: String::new(),
            transcript: String::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Everything read since the session was opened.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Waits for `terminators` within what is left of the connect timeout,
    /// reporting a timeout as a connection failure.
    pub fn expect_during_connect(&mut self, terminators: &[Terminator]) -> Result<()> {
        let timeout = self.connect_deadline.saturating_duration_since(Instant::now());

        let result = self.read_until(terminators, timeout).map(|_| ());

        match result {
            Ok(()) => Ok(()),
            Err(Error::CommandTimeout { buffer, .. }) => {
                debug!("No prompt during connect, got {:?}", buffer);
                Err(Error::ConnectTimeout {
                    host: self.config.host.clone(),
                    port: self.config.port_or(T::DEFAULT_PORT),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Writes `text` followed by the configured line ending.
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        let line = format!("{}{}", text, self.config.line_ending);
        self.write(&line)
    }

    fn write(&mut self, text: &str) -> Result<()> {
        let (bytes, _, _) = self.config.encoding.encode(text);
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;

        transport.send(&bytes)
    }

    /// Reads until the buffer ends with one of `terminators`, returning the
    /// whole buffer.
    pub fn read_until(&mut self, terminators: &[Terminator], timeout: Duration) -> Result<&str> {
        self.buffer.clear();

        let deadline = Instant::now() + timeout;
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];

        loop {
            let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
            let size = transport.read_available(&mut chunk)?;

            if size > 0 {
                let text = decode(&mut self.decoder, &chunk[..size]);
                trace!("Read: {:?}", text);
                self.buffer.push_str(&text);
                self.transcript.push_str(&text);

                if terminators.iter().any(|t| t.is_end_of(&self.buffer)) {
                    debug!("Found prompt {:?}", self.current_prompt());
                    return Ok(&self.buffer);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::CommandTimeout {
                    wait_for: matcher::describe(terminators),
                    buffer: self.buffer.clone(),
                });
            }

            if size == 0 {
                thread::sleep(self.config.poll_interval.min(deadline - now));
            }
        }
    }

    fn exchange(&mut self, data: &str, expect: &Expect) -> Result<Vec<String>> {
        self.write(data)?;

        let timeout = expect.timeout.unwrap_or(self.config.command_timeout);
        let buffer = match &expect.wait_for {
            Some(terminators) => self.read_until(terminators, timeout)?,
            None => {
                let prompts = self.config.prompts.clone();
                self.read_until(&prompts, timeout)?
            }
        };

        Ok(response_lines(buffer, expect.include_last_line))
    }
}

impl<T: Transport> Shell for TerminalSession<T> {
    fn execute_with(&mut self, command: &str, expect: &Expect) -> Result<Vec<String>> {
        debug!("Wrote: {}", command);
        let line = format!("{}{}", command, self.config.line_ending);

        self.exchange(&line, expect)
    }

    fn send_key_with(&mut self, key: &str, expect: &Expect) -> Result<Vec<String>> {
        debug!("Sent key: {:?}", key);

        self.exchange(key, expect)
    }

    fn quit(&mut self, command: &str) -> Result<()> {
        debug!("Quitting with: {}", command);
        let sent = self.write_line(command);

        let mut transport = self.transport.take().ok_or(Error::NotConnected)?;
        let closed = transport.close();
        info!("Disconnected from {}", self.config.host);

        sent.and(closed)
    }

    fn current_prompt(&self) -> &str {
        self.buffer
            .rsplit('\n')
            .next()
            .unwrap_or_default()
            .trim_matches('\r')
    }
}

impl<T: Transport> Drop for TerminalSession<T> {
    fn drop(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                warn!("Failed to close connection to {}: {}", self.config.host, e);
            }
        }
    }
}

fn decode(decoder: &mut Decoder, bytes: &[u8]) -> String {
    let capacity = decoder
        .max_utf8_buffer_length(bytes.len())
        .unwrap_or(bytes.len() * 3);
    let mut text = String::with_capacity(capacity);
    let _ = decoder.decode_to_string(bytes, &mut text, false);

    text
}

/// Splits a response buffer: drops the echoed first line, the prompt line
/// unless `include_last_line`, and blank lines.
fn response_lines(buffer: &str, include_last_line: bool) -> Vec<String> {
    let mut lines: Vec<&str> = buffer
        .split('\n')
        .map(|line| line.trim_matches('\r'))
        .skip(1)
        .collect();

    if !include_last_line {
        lines.pop();
    }

    lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// In-memory device answering scripted commands, a few bytes per read.
    pub(crate) struct ScriptedTransport {
        script: VecDeque<(String, String)>,
        pending: VecDeque<u8>,
        pub(crate) sent: Arc<Mutex<Vec<String>>>,
        pub(crate) closed: Arc<Mutex<bool>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(banner: &str) -> Self {
            ScriptedTransport {
                script: VecDeque::new(),
                pending: banner.bytes().collect(),
                sent: Arc::default(),
                closed: Arc::default(),
            }
        }

        /// Answers `reply` when exactly `sent` is written.
        pub(crate) fn reply(mut self, sent: &str, reply: &str) -> Self {
            self.script.push_back((sent.to_string(), reply.to_string()));
            self
        }
    }

    impl Transport for ScriptedTransport {
        const DEFAULT_PORT: u16 = 2323;

        fn open(_config: &SessionConfig, _deadline: Instant) -> Result<Self> {
            Err(Error::NotConnected)
        }

        fn send(&mut self, data: &[u8]) -> Result<()> {
            let data = String::from_utf8_lossy(data).to_string();

            if self.script.front().is_some_and(|(expected, _)| *expected == data) {
                if let Some((_, reply)) = self.script.pop_front() {
                    self.pending.extend(reply.bytes());
                }
            }
            self.sent.lock().unwrap().push(data);

            Ok(())
        }

        fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
            let size = buf.len().min(3).min(self.pending.len());
            for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..size)) {
                *slot = byte;
            }

            Ok(size)
        }

        fn close(&mut self) -> Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    fn config() -> SessionConfig {
        SessionConfig::new("switch")
            .command_timeout(Duration::from_millis(200))
            .connect_timeout(Duration::from_millis(200))
            .poll_interval(Duration::from_millis(1))
    }

    #[test]
    fn strips_echo_and_prompt() -> anyhow::Result<()> {
        env_logger::try_init().ok();

        let transport = ScriptedTransport::new("\r\nhost#").reply(
            "show vlan brief\n",
            "show vlan brief\r\nVLAN Name\r\n\r\n1    default\r\nhost#",
        );
        let mut session = TerminalSession::start(transport, config())?;

        let lines = session.execute("show vlan brief")?;
        assert_eq!(lines, vec!["VLAN Name", "1    default"]);
        assert_eq!(session.current_prompt(), "host#");

        Ok(())
    }

    #[test]
    fn includes_prompt_when_asked() -> anyhow::Result<()> {
        let transport = ScriptedTransport::new("host#")
            .reply("terminal length 0\n", "terminal length 0\r\nhost#");
        let mut session = TerminalSession::start(transport, config())?;

        let lines = session.execute_with("terminal length 0", &Expect::new().include_last_line())?;
        assert_eq!(lines, vec!["host#"]);

        Ok(())
    }

    #[test]
    fn enable_dialogue_changes_prompt() -> anyhow::Result<()> {
        let transport = ScriptedTransport::new("host>")
            .reply("enable\n", "enable\r\nPassword: ")
            .reply("secret\n", "\r\nhost#");
        let mut session = TerminalSession::start(transport, config())?;
        assert_eq!(session.current_prompt(), "host>");

        let expect = Expect::new().wait_for(Terminator::literal(": "));
        let lines = session.execute_with("enable", &expect)?;
        assert!(lines.is_empty(), "{:?}", lines);
        assert_eq!(session.current_prompt(), "Password: ");

        session.execute("secret")?;
        assert_eq!(session.current_prompt(), "host#");

        Ok(())
    }

    #[test]
    fn send_key_writes_no_line_ending() -> anyhow::Result<()> {
        let transport = ScriptedTransport::new("host#")
            .reply("show run\n", "show run\r\nhostname host\r\n--More--")
            .reply(" ", "\r\nend\r\nhost#");
        let sent = Arc::clone(&transport.sent);
        let mut session = TerminalSession::start(transport, config())?;

        let more = Expect::new()
            .wait_for(Terminator::literal("--More--"))
            .wait_for(Terminator::literal("#"));
        let lines = session.execute_with("show run", &more)?;
        assert_eq!(lines, vec!["hostname host"]);

        let lines = session.send_key(" ")?;
        assert_eq!(lines, vec!["end"]);
        assert_eq!(sent.lock().unwrap().as_slice(), ["show run\n", " "]);

        Ok(())
    }

    #[test]
    fn times_out_after_the_requested_delay() -> anyhow::Result<()> {
        let transport = ScriptedTransport::new("host#").reply("reload\n", "reload\r\nProceed? ");
        let mut session = TerminalSession::start(transport, config())?;

        let timeout = Duration::from_millis(50);
        let started = Instant::now();
        let result = session.execute_with(
            "reload",
            &Expect::new().wait_for(Terminator::literal("[confirm]")).timeout(timeout),
        );
        let elapsed = started.elapsed();

        match result {
            Err(Error::CommandTimeout { wait_for, buffer }) => {
                assert_eq!(wait_for, "\"[confirm]\"");
                assert_eq!(buffer, "reload\r\nProceed? ");
            }
            other => panic!("expected a command timeout, got {:?}", other),
        }
        assert!(elapsed >= timeout, "{:?}", elapsed);
        assert!(elapsed < timeout + Duration::from_millis(500), "{:?}", elapsed);

        Ok(())
    }

    #[test]
    fn missing_first_prompt_is_a_connect_timeout() {
        let transport = ScriptedTransport::new("Welcome\r\n");

        match TerminalSession::start(transport, config()) {
            Err(Error::ConnectTimeout { host, port }) => {
                assert_eq!(host, "switch");
                assert_eq!(port, ScriptedTransport::DEFAULT_PORT);
            }
            other => panic!("expected a connect timeout, got {:?}", other.err()),
        }
    }

    #[test]
    fn multibyte_characters_survive_split_reads() -> anyhow::Result<()> {
        let transport = ScriptedTransport::new("host#")
            .reply("show desc\n", "show desc\r\nGi0/1  salle réseau\r\nhost#");
        let mut session = TerminalSession::start(transport, config())?;

        let lines = session.execute("show desc")?;
        assert_eq!(lines, vec!["Gi0/1  salle réseau"]);
        assert!(session.transcript().starts_with("host#show desc\r\n"));

        Ok(())
    }

    #[test]
    fn quit_closes_without_waiting() -> anyhow::Result<()> {
        let transport = ScriptedTransport::new("host#");
        let sent = Arc::clone(&transport.sent);
        let closed = Arc::clone(&transport.closed);
        let mut session = TerminalSession::start(transport, config())?;

        session.quit("exit")?;
        assert_eq!(sent.lock().unwrap().as_slice(), ["exit\n"]);
        assert!(*closed.lock().unwrap());
        assert!(!session.is_open());
        assert!(matches!(session.execute("show version"), Err(Error::NotConnected)));

        Ok(())
    }

    #[test]
    fn lines_never_contain_the_echo() {
        let buffer = "show ip\r\nshow ip\r\nhost#";
        assert_eq!(response_lines(buffer, false), vec!["show ip"]);
        assert_eq!(response_lines(buffer, true), vec!["show ip", "host#"]);
        assert!(response_lines("host#", false).is_empty());
    }
}
