//! Vendor-neutral objects exchanged with switch drivers.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use strum::{Display, EnumString};

use crate::error::{Error, ErrorKind, SwitchError};
use crate::generic::config::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PortMode {
    #[default]
    Access,
    Trunk,
    Dynamic,
    BondMember,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum OnOff {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AccessGroupDirection {
    In,
    Out,
}

/// An address with its prefix length, e.g. `10.0.0.1/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpPrefix {
    pub address: IpAddr,
    pub prefix_length: u8,
}

impl IpPrefix {
    pub fn new(address: IpAddr, prefix_length: u8) -> Result<Self, Error> {
        let max = match address {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };

        if prefix_length > max {
            let value = format!("{}/{}", address, prefix_length);
            return Err(SwitchError::new(ErrorKind::InvalidValue, value).into());
        }

        Ok(IpPrefix {
            address,
            prefix_length,
        })
    }
}

impl FromStr for IpPrefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let invalid = || Error::from(SwitchError::new(ErrorKind::InvalidValue, s));

        let (address, length) = s.split_once('/').ok_or_else(invalid)?;
        let address = address.trim().parse().map_err(|_| invalid())?;
        let length = length.trim().parse().map_err(|_| invalid())?;

        IpPrefix::new(address, length)
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VrrpGroup {
    pub id: u8,
    pub ips: Vec<IpAddr>,
    pub priority: Option<u8>,
    pub hello_interval: Option<u32>,
    pub dead_interval: Option<u32>,
    pub track_id: Option<String>,
    pub track_decrement: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vlan {
    pub number: u16,
    pub name: Option<String>,
    pub ips: Vec<IpPrefix>,
    pub vrrp_groups: Vec<VrrpGroup>,
    pub access_groups: BTreeMap<AccessGroupDirection, String>,
    pub dhcp_relay_servers: Vec<IpAddr>,
}

impl Vlan {
    pub fn new(number: u16, name: Option<&str>) -> Self {
        Vlan {
            number,
            name: name.map(String::from),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Interface {
    pub name: String,
    pub shutdown: bool,
    pub port_mode: PortMode,
    pub access_vlan: Option<u16>,
    pub trunk_native_vlan: Option<u16>,
    pub trunk_vlans: Vec<u16>,
    pub bond_master: Option<u16>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bond {
    pub number: u16,
    pub link_speed: Option<String>,
    pub members: Vec<String>,
    pub interface: Interface,
}

/// How to reach one switch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SwitchDescriptor {
    pub model: String,
    pub hostname: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
}

impl SwitchDescriptor {
    pub fn new(model: &str, hostname: &str) -> Self {
        SwitchDescriptor {
            model: model.to_string(),
            hostname: hostname.to_string(),
            ..Default::default()
        }
    }
}

impl From<&SwitchDescriptor> for SessionConfig {
    fn from(descriptor: &SwitchDescriptor) -> Self {
        SessionConfig {
            host: descriptor.hostname.clone(),
            port: descriptor.port,
            username: descriptor.username.clone(),
            password: descriptor.password.clone(),
            ..Default::default()
        }
    }
}
