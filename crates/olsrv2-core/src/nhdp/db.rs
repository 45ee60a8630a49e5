//! NHDP database: link and neighbor tables plus the invariants tying
//! them together (spec §3.3 invariants a-c).

use super::link::{Link, LinkKey, LinkState};
use super::neighbor::Neighbor;
use crate::addr::NetAddr;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct NhdpDb {
    links: HashMap<LinkKey, Link>,
    /// Which neighbor (by originator) owns each link.
    link_owner: HashMap<LinkKey, NetAddr>,
    neighbors: HashMap<NetAddr, Neighbor>,
}

impl NhdpDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&self, key: &LinkKey) -> Option<&Link> {
        self.links.get(key)
    }

    pub fn link_mut(&mut self, key: &LinkKey) -> Option<&mut Link> {
        self.links.get_mut(key)
    }

    pub fn neighbor(&self, originator: &NetAddr) -> Option<&Neighbor> {
        self.neighbors.get(originator)
    }

    pub fn neighbor_mut(&mut self, originator: &NetAddr) -> &mut Neighbor {
        self.neighbors
            .entry(*originator)
            .or_insert_with(|| Neighbor::new(*originator))
    }

    pub fn neighbors(&self) -> impl Iterator<Item = &Neighbor> {
        self.neighbors.values()
    }

    /// Inserts or returns the existing link for `key`, attaching it to the
    /// neighbor for `originator`.
    pub fn link_or_create(
        &mut self,
        key: LinkKey,
        originator: NetAddr,
        local_mac: sonic_types::MacAddress,
    ) -> &mut Link {
        if !self.links.contains_key(&key) {
            self.links
                .insert(key.clone(), Link::new(key.iface.clone(), key.addr, local_mac));
            self.link_owner.insert(key.clone(), originator);
            let neighbor = self.neighbor_mut(&originator);
            if !neighbor.links.contains(&key) {
                neighbor.links.push(key.clone());
            }
        }
        self.links.get_mut(&key).expect("just inserted")
    }

    /// Recomputes `neighbor.symmetric` for every neighbor (spec invariant
    /// (b)): the count of this neighbor's links currently SYM.
    pub fn recompute_symmetric_counts(&mut self) {
        let mut counts: HashMap<NetAddr, u32> = HashMap::new();
        for link in self.links.values() {
            if link.is_symmetric() {
                if let Some(owner) = self.link_owner.get(&link.key) {
                    *counts.entry(*owner).or_insert(0) += 1;
                }
            }
        }
        for (originator, neighbor) in self.neighbors.iter_mut() {
            neighbor.symmetric = counts.get(originator).copied().unwrap_or(0);
        }
    }

    /// Advances every link's state machine, drops links whose LOST hold
    /// time elapsed, and cleans up neighbors left with no links (spec
    /// §3.3 invariant (c) extends to link-less neighbors).
    pub fn tick(&mut self, now: Instant, lost_hold_time: Duration) {
        let mut dead = Vec::new();
        for (key, link) in self.links.iter_mut() {
            if link.tick(now, lost_hold_time) {
                dead.push(key.clone());
            }
        }
        for key in &dead {
            self.links.remove(key);
            if let Some(owner) = self.link_owner.remove(key) {
                if let Some(neighbor) = self.neighbors.get_mut(&owner) {
                    neighbor.links.retain(|l| l != key);
                    if neighbor.links.is_empty() {
                        self.clear_dualstack_partner(&owner);
                        self.neighbors.remove(&owner);
                    }
                }
            }
        }
        self.recompute_symmetric_counts();
    }

    /// Links two neighbors as dualstack partners, or clears the pairing
    /// when `to` is `None` (spec §4.2 dualstack partnering, invariant
    /// (c): clearing one side clears the other's back-reference).
    pub fn set_dualstack_partner(&mut self, a: &NetAddr, b: &NetAddr) {
        if let Some(n) = self.neighbors.get_mut(a) {
            n.dualstack_partner = Some(*b);
        }
        if let Some(n) = self.neighbors.get_mut(b) {
            n.dualstack_partner = Some(*a);
        }
    }

    pub fn clear_dualstack_partner(&mut self, a: &NetAddr) {
        let partner = self.neighbors.get(a).and_then(|n| n.dualstack_partner);
        if let Some(n) = self.neighbors.get_mut(a) {
            n.dualstack_partner = None;
        }
        if let Some(b) = partner {
            if let Some(n) = self.neighbors.get_mut(&b) {
                n.dualstack_partner = None;
            }
        }
    }

    pub fn state_of(&self, key: &LinkKey) -> Option<LinkState> {
        self.links.get(key).map(|l| l.state)
    }
}
