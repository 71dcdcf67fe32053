use strum::{Display, EnumString};

pub mod error;
use error::Error;

pub mod generic;
use generic::config::SessionConfig;
use generic::session::{Shell, TerminalSession};
use generic::ssh::SshTransport;
use generic::telnet::TelnetTransport;

pub mod switch;

pub use error::{ErrorKind, Result, SwitchError};
pub use generic::checker::ResultChecker;
pub use generic::matcher::Terminator;
pub use generic::session::Expect;
pub use generic::subshell::{SubShell, SubShellContext};
pub use switch::flow_control::FlowControlSwitch;
pub use switch::operations::{SwitchDriver, SwitchOperations};

pub type SshSession = TerminalSession<SshTransport>;
pub type TelnetSession = TerminalSession<TelnetTransport>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Protocol {
    Ssh,
    Telnet,
}

/// Opens an interactive shell on a device.
///
/// # Arguments
/// * `protocol` - How to reach the device CLI.
/// * `config` - Host, credentials, prompts and timeouts of the session.
///
/// # Returns
/// A `Result` containing a `Box<dyn Shell>` sitting at the first prompt, or
/// an error if the device cannot be reached or never shows a prompt.
pub fn open_shell(protocol: Protocol, config: SessionConfig) -> Result<Box<dyn Shell>, Error> {
    Ok(match protocol {
        Protocol::Ssh => Box::new(SshSession::connect(config)?),
        Protocol::Telnet => Box::new(TelnetSession::connect(config)?),
    })
}
