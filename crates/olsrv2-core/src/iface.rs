//! Interface handle (spec §3.1) and the interface table `Core` consults
//! before sending protocol traffic on a link.

use sonic_types::{IpAddress, IpPrefix, MacAddress};
use std::collections::HashMap;

/// `(name, index)` plus link state, loopback flag, MAC, and the prefix →
/// address mapping assigned on the interface. Populated by the external
/// OS interface-address monitor (out of scope here); the core only reads
/// it.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub index: u32,
    pub mac: MacAddress,
    pub link_up: bool,
    pub loopback: bool,
    /// Addresses assigned on this interface, keyed by prefix so multiple
    /// addresses of the same family can coexist.
    addresses: HashMap<IpPrefix, IpAddress>,
}

impl Interface {
    pub fn new(name: impl Into<String>, index: u32, mac: MacAddress) -> Self {
        Interface {
            name: name.into(),
            index,
            mac,
            link_up: true,
            loopback: false,
            addresses: HashMap::new(),
        }
    }

    /// An interface may originate or receive protocol traffic only when
    /// it is up and not the local unicast loopback (spec §4.6 forwarding
    /// decision, §4.2 emit side).
    pub fn is_managed(&self) -> bool {
        self.link_up && !self.loopback
    }

    pub fn add_address(&mut self, prefix: IpPrefix) {
        self.addresses.insert(prefix, prefix.address().clone());
    }

    pub fn remove_address(&mut self, prefix: &IpPrefix) {
        self.addresses.remove(prefix);
    }

    pub fn addresses(&self) -> impl Iterator<Item = &IpPrefix> {
        self.addresses.keys()
    }

    pub fn has_address(&self, ip: &IpAddress) -> bool {
        self.addresses.keys().any(|p| p.address() == ip)
    }

    /// Longest-prefix match among this interface's addresses that shares
    /// `target`'s family — used to pick a source IP when
    /// `use_srcip_in_routes` is set (spec §4.5).
    pub fn best_matching_address(&self, target: &IpAddress) -> Option<IpAddress> {
        self.addresses
            .keys()
            .filter(|p| p.is_ipv4() == target.is_ipv4())
            .max_by_key(|p| p.prefix_len())
            .map(|p| *p.address())
    }
}

/// Table of interfaces keyed by name, owned by `Core`.
#[derive(Debug, Default)]
pub struct InterfaceTable {
    by_name: HashMap<String, Interface>,
}

impl InterfaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, iface: Interface) {
        self.by_name.insert(iface.name.clone(), iface);
    }

    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.by_name.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Interface> {
        self.by_name.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Interface> {
        self.by_name.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.by_name.values()
    }

    pub fn by_index(&self, index: u32) -> Option<&Interface> {
        self.by_name.values().find(|i| i.index == index)
    }
}
