//! Automatic connection, transaction and locking around a switch driver.
//!
//! Read operations (`get_*`) only need a connection. Every other operation
//! runs inside a transaction holding the switch lock:
//!
//! lock acquire, connect, start transaction, operation, commit (or rollback),
//! end transaction, disconnect, lock release.
//!
//! Whatever is already open when a call comes in (a connection, a
//! transaction) belongs to the caller and is passed through untouched.

use std::net::IpAddr;
use std::sync::Arc;

use log::{debug, warn};

use super::lock::{LockRegistry, SwitchLock};
use super::model::{
    AccessGroupDirection, Bond, Interface, IpPrefix, OnOff, SwitchDescriptor, Vlan, VrrpGroup,
};
use super::operations::{SwitchDriver, SwitchOperations};
use crate::error::Result;

pub struct FlowControlSwitch<D: SwitchDriver> {
    driver: D,
    lock: Arc<dyn SwitchLock>,
}

impl<D: SwitchDriver> FlowControlSwitch<D> {
    pub fn new(driver: D, lock: Arc<dyn SwitchLock>) -> Self {
        FlowControlSwitch { driver, lock }
    }

    /// Wraps `driver` with the process-wide lock of `switch`.
    pub fn for_switch(driver: D, switch: &SwitchDescriptor) -> Self {
        Self::new(driver, LockRegistry::global().lock_for(&switch.hostname))
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_inner(self) -> D {
        self.driver
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_connected()
    }

    pub fn in_transaction(&self) -> bool {
        self.driver.in_transaction()
    }

    pub fn connect(&mut self) -> Result<()> {
        self.driver.connect()
    }

    pub fn disconnect(&mut self) -> Result<()> {
        self.driver.disconnect()
    }

    pub fn commit_transaction(&mut self) -> Result<()> {
        self.driver.commit_transaction()
    }

    pub fn rollback_transaction(&mut self) -> Result<()> {
        self.driver.rollback_transaction()
    }

    /// Runs `block` inside a single transaction. Operations called on the
    /// switch from `block` join it instead of opening their own.
    pub fn transaction<R>(&mut self, block: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.with_transaction(block)
    }

    fn with_connection<R>(&mut self, op: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        if self.driver.is_connected() {
            return op(self);
        }

        self.driver.connect()?;
        let result = op(self);

        settle(result, self.driver.disconnect(), "disconnect")
    }

    fn with_transaction<R>(&mut self, op: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        if self.driver.in_transaction() {
            return op(self);
        }

        let lock = Arc::clone(&self.lock);
        lock.acquire()?;

        let result = self.with_connection(|switch| switch.bracket_transaction(op));

        settle(result, lock.release(), "lock release")
    }

    fn bracket_transaction<R>(&mut self, op: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.driver.start_transaction()?;

        let result = op(self).and_then(|value| self.driver.commit_transaction().map(|()| value));

        let result = match result {
            Ok(value) => Ok(value),
            Err(error) => {
                debug!("Rolling back after: {}", error);
                if !self.driver.supports_rollback() {
                    warn!("Driver cannot roll back, changes may remain: {}", error);
                }

                match self.driver.rollback_transaction() {
                    Ok(()) => Err(error),
                    Err(rollback_error) => {
                        warn!("Rollback failed ({}), masking: {}", rollback_error, error);
                        Err(rollback_error)
                    }
                }
            }
        };

        settle(result, self.driver.end_transaction(), "end transaction")
    }
}

/// Combines the outcome of an operation with the outcome of its teardown;
/// a failed teardown replaces the result.
fn settle<R>(result: Result<R>, teardown: Result<()>, step: &str) -> Result<R> {
    match (result, teardown) {
        (result, Ok(())) => result,
        (Ok(_), Err(error)) => Err(error),
        (Err(masked), Err(error)) => {
            warn!("{} failed ({}), masking: {}", step, error, masked);
            Err(error)
        }
    }
}

macro_rules! flow_controlled {
    ($($mode:ident fn $name:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*) => {
        impl<D: SwitchDriver> SwitchOperations for FlowControlSwitch<D> {
            $(
                fn $name(&mut self $(, $arg: $ty)*) -> Result<$ret> {
                    self.$mode(|switch| switch.driver.$name($($arg),*))
                }
            )*
        }
    };
}

flow_controlled! {
    with_connection fn get_vlan(number: u16) -> Vlan;
    with_connection fn get_vlans() -> Vec<Vlan>;
    with_transaction fn add_vlan(number: u16, name: Option<&str>) -> ();
    with_transaction fn remove_vlan(number: u16) -> ();

    with_connection fn get_interface(name: &str) -> Interface;
    with_connection fn get_interfaces() -> Vec<Interface>;
    with_transaction fn set_access_mode(interface: &str) -> ();
    with_transaction fn set_trunk_mode(interface: &str) -> ();
    with_transaction fn set_access_vlan(interface: &str, vlan: u16) -> ();
    with_transaction fn unset_interface_access_vlan(interface: &str) -> ();
    with_transaction fn add_trunk_vlan(interface: &str, vlan: u16) -> ();
    with_transaction fn remove_trunk_vlan(interface: &str, vlan: u16) -> ();
    with_transaction fn set_interface_native_vlan(interface: &str, vlan: u16) -> ();
    with_transaction fn unset_interface_native_vlan(interface: &str) -> ();
    with_transaction fn set_interface_description(interface: &str, description: &str) -> ();
    with_transaction fn unset_interface_description(interface: &str) -> ();
    with_transaction fn set_interface_state(interface: &str, state: OnOff) -> ();

    with_transaction fn add_ip_to_vlan(vlan: u16, ip: IpPrefix) -> ();
    with_transaction fn remove_ip_from_vlan(vlan: u16, ip: IpPrefix) -> ();
    with_transaction fn add_vrrp_group(vlan: u16, group: &VrrpGroup) -> ();
    with_transaction fn remove_vrrp_group(vlan: u16, group_id: u8) -> ();
    with_transaction fn set_vlan_access_group(
        vlan: u16, direction: AccessGroupDirection, name: &str
    ) -> ();
    with_transaction fn unset_vlan_access_group(vlan: u16, direction: AccessGroupDirection) -> ();
    with_transaction fn add_dhcp_relay_server(vlan: u16, ip: IpAddr) -> ();
    with_transaction fn remove_dhcp_relay_server(vlan: u16, ip: IpAddr) -> ();

    with_connection fn get_bond(number: u16) -> Bond;
    with_connection fn get_bonds() -> Vec<Bond>;
    with_transaction fn add_bond(number: u16) -> ();
    with_transaction fn remove_bond(number: u16) -> ();
    with_transaction fn add_interface_to_bond(interface: &str, bond: u16) -> ();
    with_transaction fn remove_interface_from_bond(interface: &str) -> ();
    with_transaction fn set_bond_link_speed(number: u16, speed: &str) -> ();
}
