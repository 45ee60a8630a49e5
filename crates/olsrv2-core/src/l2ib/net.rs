//! L2IB net (interface) records (spec §3.2).

use super::cell::{CellValue, DataCell};
use super::neigh::{NeighborKey, NeighborRecord};
use super::origin::Origin;
use crate::metric::{NeighMetricIndex, NetMetricIndex};
use sonic_types::IpAddress;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetType {
    Undefined,
    Wireless,
    Ethernet,
    Tunnel,
}

#[derive(Debug, Clone, Default)]
pub struct NetRecord {
    pub net_type: NetType,
    pub dlep: bool,
    cells: HashMap<NetMetricIndex, DataCell>,
    neigh_defaults: HashMap<NeighMetricIndex, DataCell>,
    /// Locally assigned IP addresses, each owned by the origin that
    /// asserted it.
    local_ips: HashMap<IpAddress, Origin>,
    /// Remote neighbor IP addresses, denormalized across all neighbors of
    /// this net for `net_get_best_neighbor_match`.
    remote_ips: HashMap<IpAddress, NeighborKey>,
    neighbors: HashMap<NeighborKey, NeighborRecord>,
}

impl Default for NetType {
    fn default() -> Self {
        NetType::Undefined
    }
}

impl NetRecord {
    pub fn cell(&self, idx: NetMetricIndex) -> Option<&DataCell> {
        self.cells.get(&idx)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&NetMetricIndex, &DataCell)> {
        self.cells.iter()
    }

    pub fn set_cell(&mut self, idx: NetMetricIndex, writer: &Origin, value: CellValue) -> bool {
        self.cells
            .entry(idx)
            .or_insert_with(DataCell::empty)
            .set(writer, value)
    }

    pub fn neigh_default_cell(&self, idx: NeighMetricIndex) -> Option<&DataCell> {
        self.neigh_defaults.get(&idx)
    }

    pub fn set_neigh_default(
        &mut self,
        idx: NeighMetricIndex,
        writer: &Origin,
        value: CellValue,
    ) -> bool {
        self.neigh_defaults
            .entry(idx)
            .or_insert_with(DataCell::empty)
            .set(writer, value)
    }

    pub fn add_local_ip(&mut self, ip: IpAddress, origin: Origin) {
        self.local_ips.insert(ip, origin);
    }

    pub fn local_ips(&self) -> impl Iterator<Item = &IpAddress> {
        self.local_ips.keys()
    }

    pub fn neighbor(&self, key: &NeighborKey) -> Option<&NeighborRecord> {
        self.neighbors.get(key)
    }

    pub fn neighbor_mut(&mut self, key: &NeighborKey) -> &mut NeighborRecord {
        self.neighbors.entry(key.clone()).or_default()
    }

    pub fn neighbors(&self) -> impl Iterator<Item = (&NeighborKey, &NeighborRecord)> {
        self.neighbors.iter()
    }

    pub fn neighbors_mut(&mut self) -> impl Iterator<Item = (&NeighborKey, &mut NeighborRecord)> {
        self.neighbors.iter_mut()
    }

    pub fn remove_neighbor(&mut self, key: &NeighborKey) -> Option<NeighborRecord> {
        self.remote_ips.retain(|_, k| k != key);
        self.neighbors.remove(key)
    }

    pub fn note_remote_ip(&mut self, ip: IpAddress, key: NeighborKey) {
        self.remote_ips.insert(ip, key);
    }

    /// Longest-prefix style best match of `ip` against every neighbor's
    /// remote-ip set registered on this net (exact match, since these are
    /// host addresses — "longest prefix" degenerates to "present").
    pub fn best_neighbor_match(&self, ip: &IpAddress) -> Option<&NeighborKey> {
        self.remote_ips.get(ip)
    }

    /// Clears every cell/destination/neighbor-cell owned by `origin`.
    /// Returns whether anything changed.
    pub fn clear_origin(&mut self, origin: &Origin) -> bool {
        let mut changed = false;
        for cell in self.cells.values_mut() {
            changed |= cell.clear_if_owned_by(origin);
        }
        for cell in self.neigh_defaults.values_mut() {
            changed |= cell.clear_if_owned_by(origin);
        }
        let before = self.local_ips.len();
        self.local_ips.retain(|_, o| o != origin);
        changed |= self.local_ips.len() != before;
        for neigh in self.neighbors.values_mut() {
            changed |= neigh.clear_origin(origin);
        }
        changed
    }

    pub fn relabel(&mut self, new: &Origin, old: &Origin) {
        for cell in self.cells.values_mut() {
            cell.relabel(new, old);
        }
        for cell in self.neigh_defaults.values_mut() {
            cell.relabel(new, old);
        }
        for (_, o) in self.local_ips.iter_mut() {
            if o == old {
                *o = new.clone();
            }
        }
        for neigh in self.neighbors.values_mut() {
            neigh.relabel(new, old);
        }
    }

    /// Garbage-collects empty cells and neighbors. Returns whether the net
    /// itself is now empty (no cell with a value, no neighbors).
    pub fn gc(&mut self) -> bool {
        self.cells.retain(|_, c| !c.is_empty());
        self.neigh_defaults.retain(|_, c| !c.is_empty());
        let empty_neighbors: Vec<NeighborKey> = self
            .neighbors
            .iter_mut()
            .filter_map(|(k, n)| if n.gc() { Some(k.clone()) } else { None })
            .collect();
        for key in empty_neighbors {
            self.remove_neighbor(&key);
        }
        self.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(|c| c.is_empty())
            && self.neighbors.is_empty()
            && self.local_ips.is_empty()
    }
}
