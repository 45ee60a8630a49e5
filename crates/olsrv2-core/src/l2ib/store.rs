//! The L2 information base itself: origin registry, per-interface net
//! records, and the write/query/relabel operations of spec §4.1.

use super::cell::CellValue;
use super::net::NetRecord;
use super::neigh::NeighborKey;
use super::origin::{Origin, OriginPriority};
use crate::error::{CoreError, Result};
use crate::metric::{parse_metric_value, NeighMetricIndex, NetMetricIndex};
use sonic_types::{IpAddress, MacAddress};
use std::collections::HashMap;

/// Emitted by `net_commit`/`neigh_commit` once a batch of writes against a
/// net or neighbor settles (spec §4.1: "ADDED/CHANGED/REMOVED events").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum L2ibEvent {
    NetAdded(String),
    NetChanged(String),
    NetRemoved(String),
    NeighAdded(String, NeighborKey),
    NeighChanged(String, NeighborKey),
    NeighRemoved(String, NeighborKey),
}

#[derive(Default)]
pub struct L2ib {
    origins: HashMap<String, Origin>,
    nets: HashMap<String, NetRecord>,
    /// Per-`(origin, mac)` monotonic counter backing `generate_lid`.
    lid_counters: HashMap<(String, MacAddress), u32>,
    events: Vec<L2ibEvent>,
    /// Nets not yet committed this round, tracked so `net_commit` can
    /// diff against their pre-write snapshot for ADDED/CHANGED detection.
    dirty_nets: HashMap<String, bool>, // true if newly added this round
}

impl L2ib {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin_register(
        &mut self,
        name: impl Into<String>,
        priority: OriginPriority,
        proactive: bool,
    ) -> Result<Origin> {
        let name = name.into();
        if self.origins.contains_key(&name) {
            return Err(CoreError::AlreadyPresent(format!("origin {name:?}")));
        }
        let origin = Origin::new(name.clone(), priority, proactive);
        self.origins.insert(name, origin.clone());
        Ok(origin)
    }

    pub fn origin(&self, name: &str) -> Option<&Origin> {
        self.origins.get(name)
    }

    /// Removes an origin and clears everything it owns across every net,
    /// generating REMOVED/CHANGED events for anything that goes empty or
    /// merely loses a value (spec §4.1).
    pub fn origin_remove(&mut self, name: &str) -> Result<()> {
        let origin = self
            .origins
            .remove(name)
            .ok_or_else(|| CoreError::NotFound(format!("origin {name:?}")))?;
        let net_names: Vec<String> = self.nets.keys().cloned().collect();
        for net_name in net_names {
            let changed = {
                let net = self.nets.get_mut(&net_name).expect("net_names from nets");
                net.clear_origin(&origin)
            };
            if changed {
                self.finish_net_commit(&net_name);
            }
        }
        self.lid_counters.retain(|(o, _), _| o != name);
        Ok(())
    }

    pub fn net_add(&mut self, iface: impl Into<String>) -> &mut NetRecord {
        let iface = iface.into();
        if !self.nets.contains_key(&iface) {
            self.dirty_nets.insert(iface.clone(), true);
            self.nets.insert(iface.clone(), NetRecord::default());
        }
        self.nets.get_mut(&iface).expect("just inserted")
    }

    pub fn net(&self, iface: &str) -> Option<&NetRecord> {
        self.nets.get(iface)
    }

    pub fn net_mut(&mut self, iface: &str) -> Option<&mut NetRecord> {
        if !self.dirty_nets.contains_key(iface) {
            self.dirty_nets.insert(iface.to_string(), false);
        }
        self.nets.get_mut(iface)
    }

    /// Removes a net outright, owned by no one in particular (use this for
    /// interface teardown; origin-scoped clearing goes through
    /// `origin_remove`).
    pub fn net_remove(&mut self, iface: &str) -> Result<()> {
        self.nets
            .remove(iface)
            .ok_or_else(|| CoreError::NotFound(format!("net {iface:?}")))?;
        self.dirty_nets.remove(iface);
        self.events.push(L2ibEvent::NetRemoved(iface.to_string()));
        Ok(())
    }

    /// Settles a batch of writes against one net: runs garbage collection
    /// and emits the ADDED/CHANGED/REMOVED event (spec §4.1).
    pub fn net_commit(&mut self, iface: &str) {
        self.finish_net_commit(iface);
    }

    fn finish_net_commit(&mut self, iface: &str) {
        let is_new = self.dirty_nets.remove(iface).unwrap_or(false);
        let now_empty = match self.nets.get_mut(iface) {
            Some(net) => net.gc(),
            None => return,
        };
        if now_empty {
            self.nets.remove(iface);
            if !is_new {
                self.events.push(L2ibEvent::NetRemoved(iface.to_string()));
            }
        } else if is_new {
            self.events.push(L2ibEvent::NetAdded(iface.to_string()));
        } else {
            self.events.push(L2ibEvent::NetChanged(iface.to_string()));
        }
    }

    pub fn neigh_add(&mut self, iface: &str, mac: MacAddress, link_id: Vec<u8>) -> Result<()> {
        let net = self
            .nets
            .get_mut(iface)
            .ok_or_else(|| CoreError::NotFound(format!("net {iface:?}")))?;
        net.neighbor_mut(&NeighborKey::new(mac, link_id));
        Ok(())
    }

    pub fn neigh_add_by_mac(&mut self, iface: &str, mac: MacAddress) -> Result<()> {
        self.neigh_add(iface, mac, Vec::new())
    }

    /// Settles a batch of writes against one neighbor (spec §4.1).
    pub fn neigh_commit(&mut self, iface: &str, key: &NeighborKey) -> Result<()> {
        let net = self
            .nets
            .get_mut(iface)
            .ok_or_else(|| CoreError::NotFound(format!("net {iface:?}")))?;
        let now_empty = net.neighbor_mut(key).gc();
        if now_empty {
            net.remove_neighbor(key);
            self.events
                .push(L2ibEvent::NeighRemoved(iface.to_string(), key.clone()));
        } else {
            self.events
                .push(L2ibEvent::NeighChanged(iface.to_string(), key.clone()));
        }
        Ok(())
    }

    /// Typed cell write on a net (spec §4.1 `data_set`).
    pub fn data_set(
        &mut self,
        iface: &str,
        idx: NetMetricIndex,
        writer: &Origin,
        value: CellValue,
    ) -> Result<bool> {
        let net = self
            .nets
            .get_mut(iface)
            .ok_or_else(|| CoreError::NotFound(format!("net {iface:?}")))?;
        Ok(net.set_cell(idx, writer, value))
    }

    /// Typed cell write on a neighbor (spec §4.1 `data_set`).
    pub fn neigh_data_set(
        &mut self,
        iface: &str,
        key: &NeighborKey,
        idx: NeighMetricIndex,
        writer: &Origin,
        value: CellValue,
    ) -> Result<bool> {
        let net = self
            .nets
            .get_mut(iface)
            .ok_or_else(|| CoreError::NotFound(format!("net {iface:?}")))?;
        Ok(net.neighbor_mut(key).set_cell(idx, writer, value))
    }

    /// Parses human text into the metric's scaled integer and writes it
    /// (spec §4.1 `data_from_string`).
    pub fn data_from_string(
        &mut self,
        iface: &str,
        idx: NetMetricIndex,
        writer: &Origin,
        text: &str,
    ) -> Result<bool> {
        let meta = idx.metadata();
        let value = parse_metric_value(text, &meta)?;
        let cell_value = if meta.boolean {
            CellValue::Bool(value != 0)
        } else {
            CellValue::I64(value)
        };
        self.data_set(iface, idx, writer, cell_value)
    }

    pub fn net_relabel(&mut self, new: &Origin, old: &Origin) {
        for net in self.nets.values_mut() {
            net.relabel(new, old);
        }
    }

    pub fn neigh_relabel(&mut self, iface: &str, new: &Origin, old: &Origin) -> Result<()> {
        let net = self
            .nets
            .get_mut(iface)
            .ok_or_else(|| CoreError::NotFound(format!("net {iface:?}")))?;
        for (_, neigh) in net.neighbors_mut() {
            neigh.relabel(new, old);
        }
        Ok(())
    }

    /// Effective-metric lookup rule (spec §4.1 `neigh_query`): a value
    /// explicitly set on the neighbor wins; otherwise fall back to the
    /// net's per-neighbor default; otherwise `None`.
    pub fn neigh_query(
        &self,
        iface: &str,
        key: &NeighborKey,
        idx: NeighMetricIndex,
    ) -> Option<&CellValue> {
        let net = self.nets.get(iface)?;
        if let Some(neigh) = net.neighbor(key) {
            if let Some(cell) = neigh.cell(idx) {
                if !cell.is_empty() {
                    return Some(cell.value());
                }
            }
        }
        net.neigh_default_cell(idx)
            .filter(|c| !c.is_empty())
            .map(|c| c.value())
    }

    /// Longest-match lookup of `ip` across every net's remote-neighbor IP
    /// set (spec §4.1 `net_get_best_neighbor_match`).
    pub fn net_get_best_neighbor_match(&self, ip: &IpAddress) -> Option<(&str, &NeighborKey)> {
        self.nets
            .iter()
            .find_map(|(name, net)| net.best_neighbor_match(ip).map(|k| (name.as_str(), k)))
    }

    /// Generates the next link-id for `(origin, mac)`, a monotonically
    /// increasing per-pair counter encoded big-endian with leading zero
    /// bytes trimmed (spec §4.1 `generate_lid`). Ties within the same
    /// origin's `lid_index` reuse the same link-id rather than minting a
    /// fresh one, so repeated calls for an unchanged `lid_index` are
    /// idempotent.
    pub fn generate_lid(&mut self, origin: &Origin, mac: MacAddress) -> Vec<u8> {
        let key = (origin.name().to_string(), mac);
        let counter = self.lid_counters.entry(key).or_insert(0);
        if origin.lid_index != *counter {
            *counter = origin.lid_index;
        } else {
            *counter += 1;
        }
        encode_lid(*counter)
    }

    pub fn nets(&self) -> impl Iterator<Item = (&String, &NetRecord)> {
        self.nets.iter()
    }

    pub fn drain_events(&mut self) -> Vec<L2ibEvent> {
        std::mem::take(&mut self.events)
    }
}

fn encode_lid(counter: u32) -> Vec<u8> {
    let bytes = counter.to_be_bytes();
    let first_nonzero = bytes.iter().position(|b| *b != 0).unwrap_or(3);
    bytes[first_nonzero..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(n: u8) -> MacAddress {
        MacAddress::new([0, 0, 0, 0, 0, n])
    }

    #[test]
    fn origin_register_rejects_duplicate_name() {
        let mut db = L2ib::new();
        db.origin_register("eth_listener", OriginPriority::Unreliable, true)
            .unwrap();
        assert!(db
            .origin_register("eth_listener", OriginPriority::Configured, false)
            .is_err());
    }

    #[test]
    fn net_add_then_commit_emits_added_event() {
        let mut db = L2ib::new();
        let origin = db
            .origin_register("cfg", OriginPriority::Configured, false)
            .unwrap();
        db.net_add("eth0");
        db.data_set("eth0", NetMetricIndex::Mtu, &origin, CellValue::I64(1500))
            .unwrap();
        db.net_commit("eth0");
        let events = db.drain_events();
        assert_eq!(events, vec![L2ibEvent::NetAdded("eth0".to_string())]);
    }

    #[test]
    fn origin_remove_clears_cells_and_emits_changed() {
        let mut db = L2ib::new();
        let origin = db
            .origin_register("cfg", OriginPriority::Configured, false)
            .unwrap();
        db.net_add("eth0");
        db.data_set("eth0", NetMetricIndex::Mtu, &origin, CellValue::I64(1500))
            .unwrap();
        db.net_commit("eth0");
        db.drain_events();

        db.origin_remove("cfg").unwrap();
        let events = db.drain_events();
        assert_eq!(events, vec![L2ibEvent::NetRemoved("eth0".to_string())]);
        assert!(db.net("eth0").is_none());
    }

    #[test]
    fn neigh_query_falls_back_to_net_default() {
        let mut db = L2ib::new();
        let origin = db
            .origin_register("cfg", OriginPriority::Configured, false)
            .unwrap();
        db.net_add("eth0");
        {
            let net = db.net_mut("eth0").unwrap();
            net.set_neigh_default(NeighMetricIndex::TxBitrate, &origin, CellValue::I64(100));
        }
        db.neigh_add_by_mac("eth0", mac(1)).unwrap();
        let key = NeighborKey::by_mac(mac(1));
        assert_eq!(
            db.neigh_query("eth0", &key, NeighMetricIndex::TxBitrate),
            Some(&CellValue::I64(100))
        );
    }

    #[test]
    fn neigh_query_prefers_explicit_neighbor_value() {
        let mut db = L2ib::new();
        let origin = db
            .origin_register("cfg", OriginPriority::Configured, false)
            .unwrap();
        db.net_add("eth0");
        {
            let net = db.net_mut("eth0").unwrap();
            net.set_neigh_default(NeighMetricIndex::TxBitrate, &origin, CellValue::I64(100));
        }
        db.neigh_add_by_mac("eth0", mac(1)).unwrap();
        let key = NeighborKey::by_mac(mac(1));
        db.neigh_data_set(
            "eth0",
            &key,
            NeighMetricIndex::TxBitrate,
            &origin,
            CellValue::I64(999),
        )
        .unwrap();
        assert_eq!(
            db.neigh_query("eth0", &key, NeighMetricIndex::TxBitrate),
            Some(&CellValue::I64(999))
        );
    }

    #[test]
    fn generate_lid_is_monotonic_and_trims_leading_zeros() {
        let mut db = L2ib::new();
        let origin = db
            .origin_register("dlep", OriginPriority::Reliable, true)
            .unwrap();
        let first = db.generate_lid(&origin, mac(1));
        let second = db.generate_lid(&origin, mac(1));
        assert_ne!(first, second);
        assert!(first.len() <= 4 && !first.is_empty());
    }

    #[test]
    fn data_from_string_parses_and_writes() {
        let mut db = L2ib::new();
        let origin = db
            .origin_register("cfg", OriginPriority::Configured, false)
            .unwrap();
        db.net_add("eth0");
        assert!(db
            .data_from_string("eth0", NetMetricIndex::Bandwidth1, &origin, "54Mbit/s")
            .unwrap());
        assert_eq!(
            db.net("eth0").unwrap().cell(NetMetricIndex::Bandwidth1).unwrap().value(),
            &CellValue::I64(54_000_000)
        );
    }

    #[test]
    fn net_get_best_neighbor_match_finds_registered_remote_ip() {
        let mut db = L2ib::new();
        db.net_add("eth0");
        let key = NeighborKey::by_mac(mac(7));
        {
            let net = db.net_mut("eth0").unwrap();
            net.neighbor_mut(&key);
            net.note_remote_ip("10.0.0.9".parse().unwrap(), key.clone());
        }
        let found = db.net_get_best_neighbor_match(&"10.0.0.9".parse().unwrap());
        assert_eq!(found, Some(("eth0", &key)));
    }
}
