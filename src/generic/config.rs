use std::time::Duration;

use encoding_rs::Encoding;

use super::matcher::Terminator;

/// Connection parameters and timings of a terminal session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    /// Falls back to the transport's default port when unset.
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub command_timeout: Duration,
    pub connect_timeout: Duration,
    /// Sleep between two polls of the transport when no data is available.
    pub poll_interval: Duration,
    pub prompts: Vec<Terminator>,
    pub line_ending: String,
    pub encoding: &'static Encoding,
    pub read_chunk_size: usize,
    /// Restricts the SSH host key methods, e.g. `"ssh-rsa"` for older devices.
    pub host_key_methods: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            host: String::new(),
            port: None,
            username: None,
            password: None,
            command_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(10),
            prompts: vec![Terminator::literal(">"), Terminator::literal("#")],
            line_ending: "\n".to_string(),
            encoding: encoding_rs::UTF_8,
            read_chunk_size: 1024,
            host_key_methods: None,
        }
    }
}

impl SessionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        SessionConfig {
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn prompts(mut self, prompts: Vec<Terminator>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn line_ending(mut self, line_ending: &str) -> Self {
        self.line_ending = line_ending.to_string();
        self
    }

    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn host_key_methods(mut self, methods: &str) -> Self {
        self.host_key_methods = Some(methods.to_string());
        self
    }

    pub(crate) fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }
}
