use std::net::IpAddr;

use super::model::{AccessGroupDirection, Bond, Interface, IpPrefix, OnOff, Vlan, VrrpGroup};
use crate::error::{Error, Result};

/// The uniform operation set every switch exposes. Drivers override what
/// their platform supports; everything else fails with `NotImplemented`.
///
/// Operations named `get_*` only read from the device.
pub trait SwitchOperations {
    fn get_vlan(&mut self, number: u16) -> Result<Vlan> {
        let _ = number;
        Err(Error::not_implemented("get_vlan"))
    }

    fn get_vlans(&mut self) -> Result<Vec<Vlan>> {
        Err(Error::not_implemented("get_vlans"))
    }

    fn add_vlan(&mut self, number: u16, name: Option<&str>) -> Result<()> {
        let _ = (number, name);
        Err(Error::not_implemented("add_vlan"))
    }

    fn remove_vlan(&mut self, number: u16) -> Result<()> {
        let _ = number;
        Err(Error::not_implemented("remove_vlan"))
    }

    fn get_interface(&mut self, name: &str) -> Result<Interface> {
        let _ = name;
        Err(Error::not_implemented("get_interface"))
    }

    fn get_interfaces(&mut self) -> Result<Vec<Interface>> {
        Err(Error::not_implemented("get_interfaces"))
    }

    fn set_access_mode(&mut self, interface: &str) -> Result<()> {
        let _ = interface;
        Err(Error::not_implemented("set_access_mode"))
    }

    fn set_trunk_mode(&mut self, interface: &str) -> Result<()> {
        let _ = interface;
        Err(Error::not_implemented("set_trunk_mode"))
    }

    fn set_access_vlan(&mut self, interface: &str, vlan: u16) -> Result<()> {
        let _ = (interface, vlan);
        Err(Error::not_implemented("set_access_vlan"))
    }

    fn unset_interface_access_vlan(&mut self, interface: &str) -> Result<()> {
        let _ = interface;
        Err(Error::not_implemented("unset_interface_access_vlan"))
    }

    fn add_trunk_vlan(&mut self, interface: &str, vlan: u16) -> Result<()> {
        let _ = (interface, vlan);
        Err(Error::not_implemented("add_trunk_vlan"))
    }

    fn remove_trunk_vlan(&mut self, interface: &str, vlan: u16) -> Result<()> {
        let _ = (interface, vlan);
        Err(Error::not_implemented("remove_trunk_vlan"))
    }

    fn set_interface_native_vlan(&mut self, interface: &str, vlan: u16) -> Result<()> {
        let _ = (interface, vlan);
        Err(Error::not_implemented("set_interface_native_vlan"))
    }

    fn unset_interface_native_vlan(&mut self, interface: &str) -> Result<()> {
        let _ = interface;
        Err(Error::not_implemented("unset_interface_native_vlan"))
    }

    fn set_interface_description(&mut self, interface: &str, description: &str) -> Result<()> {
        let _ = (interface, description);
        Err(Error::not_implemented("set_interface_description"))
    }

    fn unset_interface_description(&mut self, interface: &str) -> Result<()> {
        let _ = interface;
        Err(Error::not_implemented("unset_interface_description"))
    }

    fn set_interface_state(&mut self, interface: &str, state: OnOff) -> Result<()> {
        let _ = (interface, state);
        Err(Error::not_implemented("set_interface_state"))
    }

    fn add_ip_to_vlan(&mut self, vlan: u16, ip: IpPrefix) -> Result<()> {
        let _ = (vlan, ip);
        Err(Error::not_implemented("add_ip_to_vlan"))
    }

    fn remove_ip_from_vlan(&mut self, vlan: u16, ip: IpPrefix) -> Result<()> {
        let _ = (vlan, ip);
        Err(Error::not_implemented("remove_ip_from_vlan"))
    }

    fn add_vrrp_group(&mut self, vlan: u16, group: &VrrpGroup) -> Result<()> {
        let _ = (vlan, group);
        Err(Error::not_implemented("add_vrrp_group"))
    }

    fn remove_vrrp_group(&mut self, vlan: u16, group_id: u8) -> Result<()> {
        let _ = (vlan, group_id);
        Err(Error::not_implemented("remove_vrrp_group"))
    }

    fn set_vlan_access_group(
        &mut self,
        vlan: u16,
        direction: AccessGroupDirection,
        name: &str,
    ) -> Result<()> {
        let _ = (vlan, direction, name);
        Err(Error::not_implemented("set_vlan_access_group"))
    }

    fn unset_vlan_access_group(
        &mut self,
        vlan: u16,
        direction: AccessGroupDirection,
    ) -> Result<()> {
        let _ = (vlan, direction);
        Err(Error::not_implemented("unset_vlan_access_group"))
    }

    fn add_dhcp_relay_server(&mut self, vlan: u16, ip: IpAddr) -> Result<()> {
        let _ = (vlan, ip);
        Err(Error::not_implemented("add_dhcp_relay_server"))
    }

    fn remove_dhcp_relay_server(&mut self, vlan: u16, ip: IpAddr) -> Result<()> {
        let _ = (vlan, ip);
        Err(Error::not_implemented("remove_dhcp_relay_server"))
    }

    fn get_bond(&mut self, number: u16) -> Result<Bond> {
        let _ = number;
        Err(Error::not_implemented("get_bond"))
    }

    fn get_bonds(&mut self) -> Result<Vec<Bond>> {
        Err(Error::not_implemented("get_bonds"))
    }

    fn add_bond(&mut self, number: u16) -> Result<()> {
        let _ = number;
        Err(Error::not_implemented("add_bond"))
    }

    fn remove_bond(&mut self, number: u16) -> Result<()> {
        let _ = number;
        Err(Error::not_implemented("remove_bond"))
    }

    fn add_interface_to_bond(&mut self, interface: &str, bond: u16) -> Result<()> {
        let _ = (interface, bond);
        Err(Error::not_implemented("add_interface_to_bond"))
    }

    fn remove_interface_from_bond(&mut self, interface: &str) -> Result<()> {
        let _ = interface;
        Err(Error::not_implemented("remove_interface_from_bond"))
    }

    fn set_bond_link_speed(&mut self, number: u16, speed: &str) -> Result<()> {
        let _ = (number, speed);
        Err(Error::not_implemented("set_bond_link_speed"))
    }
}

/// A stateful switch driver: the operation set plus the connection and
/// transaction primitives flow control is built from.
pub trait SwitchDriver: SwitchOperations {
    fn is_connected(&self) -> bool;

    fn in_transaction(&self) -> bool;

    fn connect(&mut self) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;

    fn start_transaction(&mut self) -> Result<()>;

    fn end_transaction(&mut self) -> Result<()>;

    fn commit_transaction(&mut self) -> Result<()>;

    fn rollback_transaction(&mut self) -> Result<()>;

    /// Whether `rollback_transaction` actually reverts the device. Most CLIs
    /// have no such primitive and roll back as a no-op.
    fn supports_rollback(&self) -> bool {
        false
    }
}
