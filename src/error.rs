use std::fmt;
use std::io;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

/// Placeholder subject used when an error is rebuilt from its tag alone.
const NOT_AVAILABLE: &str = "n/a";

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Authentication failed for user {user}")]
    AuthenticationFailed { user: String },

    #[error("Timed out while connecting to {host} on port {port}")]
    ConnectTimeout { host: String, port: u16 },

    #[error("Could not connect to {host} on port {port}: {reason}")]
    CouldNotConnect {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Timed out waiting for {wait_for}, buffer so far: {buffer:?}")]
    CommandTimeout { wait_for: String, buffer: String },

    #[error("Connection closed by remote host")]
    ConnectionClosed,

    #[error("Not connected")]
    NotConnected,

    #[error("Timed out waiting for the lock on {switch}")]
    LockTimeout { switch: String },

    #[error("Operation {operation} is not implemented by this driver")]
    NotImplemented { operation: String },

    #[error(transparent)]
    Switch(#[from] SwitchError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn not_implemented(operation: &str) -> Self {
        Error::NotImplemented {
            operation: operation.to_string(),
        }
    }

    /// Serialization tag of this error, `None` for errors raised by the
    /// underlying I/O, SSH or regex libraries.
    pub fn kind(&self) -> Option<ErrorKind> {
        Some(match self {
            Error::Io(_) | Error::Ssh(_) | Error::InvalidPattern(_) => return None,
            Error::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            Error::ConnectTimeout { .. } => ErrorKind::ConnectTimeout,
            Error::CouldNotConnect { .. } => ErrorKind::CouldNotConnect,
            Error::CommandTimeout { .. } => ErrorKind::CommandTimeout,
            Error::ConnectionClosed => ErrorKind::ConnectionClosed,
            Error::NotConnected => ErrorKind::NotConnected,
            Error::LockTimeout { .. } => ErrorKind::LockTimeout,
            Error::NotImplemented { .. } => ErrorKind::NotImplemented,
            Error::Switch(e) => e.kind,
        })
    }

    /// Builds the error identified by `kind` without any context.
    pub fn from_kind(kind: ErrorKind) -> Self {
        let na = || NOT_AVAILABLE.to_string();

        match kind {
            ErrorKind::AuthenticationFailed => Error::AuthenticationFailed { user: na() },
            ErrorKind::ConnectTimeout => Error::ConnectTimeout { host: na(), port: 0 },
            ErrorKind::CouldNotConnect => Error::CouldNotConnect {
                host: na(),
                port: 0,
                reason: na(),
            },
            ErrorKind::CommandTimeout => Error::CommandTimeout {
                wait_for: na(),
                buffer: String::new(),
            },
            ErrorKind::ConnectionClosed => Error::ConnectionClosed,
            ErrorKind::NotConnected => Error::NotConnected,
            ErrorKind::LockTimeout => Error::LockTimeout { switch: na() },
            ErrorKind::NotImplemented => Error::NotImplemented { operation: na() },
            domain => Error::Switch(SwitchError::from(domain)),
        }
    }

    /// Decodes a serialized tag such as `"UnknownVlan"`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.parse::<ErrorKind>().ok().map(Error::from_kind)
    }
}

/// Flat list of every typed error, used as the serialization tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum ErrorKind {
    // Engine
    AuthenticationFailed,
    ConnectTimeout,
    CouldNotConnect,
    CommandTimeout,
    ConnectionClosed,
    NotConnected,
    LockTimeout,
    NotImplemented,

    // Unknown resources
    UnknownVlan,
    UnknownInterface,
    UnknownBond,
    UnknownIp,
    UnknownAccessGroup,
    UnknownVrrpGroup,
    UnknownDhcpRelayServer,

    // Bad values
    BadVlanNumber,
    BadVlanName,
    BadBondNumber,
    BadInterfaceDescription,
    BadVrrpGroupNumber,
    BadVrrpPriorityNumber,
    BadVrrpTimers,
    BadVrrpTracking,
    InvalidAccessGroupName,
    InvalidValue,

    // Conflicts
    VlanAlreadyExist,
    BondAlreadyExist,
    IpAlreadySet,
    IpNotAvailable,
    VrrpAlreadyExistsForVlan,
    NoIpOnVlanForVrrp,
    DhcpRelayServerAlreadyExists,
    InterfaceInWrongPortMode,
    AccessVlanNotSet,
    TrunkVlanNotSet,
    NativeVlanNotSet,
    OperationNotCompleted,
}

impl ErrorKind {
    /// Human readable message for this kind about `subject`.
    pub fn describe(self, subject: &str) -> String {
        use ErrorKind::*;

        match self {
            UnknownVlan => format!("Vlan {} not found", subject),
            UnknownInterface => format!("Unknown interface {}", subject),
            UnknownBond => format!("Bond {} not found", subject),
            UnknownIp => format!("IP {} not found", subject),
            UnknownAccessGroup => format!("Access group {} not found", subject),
            UnknownVrrpGroup => format!("VRRP group {} does not exist", subject),
            UnknownDhcpRelayServer => format!("DHCP relay server {} not found", subject),
            BadVlanNumber => "Vlan number is invalid".to_string(),
            BadVlanName => "Vlan name is invalid".to_string(),
            BadBondNumber => "Bond number is invalid".to_string(),
            BadInterfaceDescription => format!("Invalid description: {}", subject),
            BadVrrpGroupNumber => "VRRP group number is invalid".to_string(),
            BadVrrpPriorityNumber => "VRRP priority value is invalid".to_string(),
            BadVrrpTimers => "VRRP timers values are invalid".to_string(),
            BadVrrpTracking => "VRRP tracking values are invalid".to_string(),
            InvalidAccessGroupName => format!("Access group name \"{}\" is invalid", subject),
            InvalidValue => format!("Invalid value: {}", subject),
            VlanAlreadyExist => format!("Vlan {} already exists", subject),
            BondAlreadyExist => format!("Bond {} already exists", subject),
            IpAlreadySet => format!("IP {} is already present in this vlan", subject),
            IpNotAvailable => format!("IP {} is not available in this vlan", subject),
            VrrpAlreadyExistsForVlan => {
                format!("VRRP group {} is already in use on this vlan", subject)
            }
            NoIpOnVlanForVrrp => {
                format!("Vlan must have an IP before configuring VRRP group {}", subject)
            }
            DhcpRelayServerAlreadyExists => {
                format!("DHCP relay server {} already exists on this vlan", subject)
            }
            InterfaceInWrongPortMode => {
                format!("Operation cannot be performed on a {} mode interface", subject)
            }
            AccessVlanNotSet => format!("Access vlan is not set on interface {}", subject),
            TrunkVlanNotSet => format!("Trunk vlan is not set on interface {}", subject),
            NativeVlanNotSet => format!("Native vlan is not set on interface {}", subject),
            OperationNotCompleted => format!(
                "An error occurred while completing the operation, \
                 no modifications have been applied: {}",
                subject
            ),
            engine => format!("{}: {}", engine, subject),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::from_kind(kind)
    }
}

/// A domain error detected by a driver in the output of the device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SwitchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SwitchError {
    pub fn new(kind: ErrorKind, subject: impl fmt::Display) -> Self {
        SwitchError {
            kind,
            message: kind.describe(&subject.to_string()),
        }
    }

    pub fn unknown_vlan(number: u16) -> Self {
        Self::new(ErrorKind::UnknownVlan, number)
    }

    pub fn unknown_interface(name: &str) -> Self {
        Self::new(ErrorKind::UnknownInterface, name)
    }

    pub fn vlan_already_exist(number: u16) -> Self {
        Self::new(ErrorKind::VlanAlreadyExist, number)
    }
}

impl From<ErrorKind> for SwitchError {
    fn from(kind: ErrorKind) -> Self {
        SwitchError::new(kind, NOT_AVAILABLE)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_kind_is_constructible_without_arguments() {
        for kind in ErrorKind::iter() {
            let error = Error::from_kind(kind);
            assert_eq!(error.kind(), Some(kind), "{}", error);
        }
    }

    #[test]
    fn tags_decode_through_the_table() {
        let tag: &'static str = ErrorKind::UnknownInterface.into();
        assert_eq!(tag, "UnknownInterface");

        let error = Error::from_tag(tag).expect("known tag");
        assert_eq!(error.to_string(), "Unknown interface n/a");

        assert!(Error::from_tag("NoSuchError").is_none());
    }

    #[test]
    fn library_errors_have_no_tag() {
        let error = Error::from(io::Error::other("boom"));
        assert_eq!(error.kind(), None);
    }

    #[test]
    fn switch_errors_format_their_subject() {
        let error: Error = SwitchError::unknown_vlan(1000).into();
        assert_eq!(error.to_string(), "Vlan 1000 not found");
        assert_eq!(error.kind(), Some(ErrorKind::UnknownVlan));

        let error = SwitchError::from(ErrorKind::BadVlanNumber);
        assert_eq!(error.message, "Vlan number is invalid");
    }
}
