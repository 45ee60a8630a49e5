//! OLSRv2 topology database: TC-nodes, TC-edges (with inverse pointers),
//! and TC-endpoints, plus the ANSN-driven commit/cleanup of spec §3.4 and
//! §4.4.

use super::edge::{EdgeKey, TcEdge};
use super::endpoint::{EndpointKey, TcEndpoint};
use super::node::TcNode;
use crate::addr::NetAddr;
use crate::serial::serial_ge;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Default)]
pub struct TopologyDb {
    nodes: HashMap<NetAddr, TcNode>,
    edges: HashMap<EdgeKey, TcEdge>,
    endpoints: HashMap<EndpointKey, TcEndpoint>,
}

impl TopologyDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, originator: &NetAddr) -> Option<&TcNode> {
        self.nodes.get(originator)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TcNode> {
        self.nodes.values()
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&TcEdge> {
        self.edges.get(key)
    }

    pub fn edges(&self) -> impl Iterator<Item = &TcEdge> {
        self.edges.values()
    }

    pub fn endpoint(&self, key: &EndpointKey) -> Option<&TcEndpoint> {
        self.endpoints.get(key)
    }

    /// Accepts a TC-node update for `originator`/`ansn` if the node is new
    /// or `ansn` is not older in serial order (spec invariant I4). Returns
    /// whether the update was accepted.
    pub fn update_node(&mut self, originator: NetAddr, ansn: u16, expires: Instant) -> bool {
        match self.nodes.get_mut(&originator) {
            Some(node) if node.ansn == ansn => {
                node.expires = expires;
                true
            }
            Some(node) => {
                if serial_ge(ansn, node.ansn) {
                    node.ansn = ansn;
                    node.expires = expires;
                    true
                } else {
                    false
                }
            }
            None => {
                self.nodes.insert(originator, TcNode::new(originator, ansn, expires));
                true
            }
        }
    }

    /// Creates/refreshes `edge(node → to)` for `domain` with `cost` and
    /// sets `edge.ansn` (spec §4.4 NBR_ADDR_TYPE(ORIGINATOR) handling).
    pub fn refresh_edge_out(&mut self, from: NetAddr, to: NetAddr, domain: u8, cost: u32, ansn: u16) {
        let key = EdgeKey { from, to };
        let edge = self.edges.entry(key).or_insert_with(|| TcEdge::new(key, ansn));
        edge.cost.insert(domain, cost);
        edge.ansn = ansn;
        if let Some(node) = self.nodes.get_mut(&from) {
            node.edges.insert(key);
        }
        // The inverse becomes non-virtual only once it too carries a cost
        // for this domain from its own node's perspective; `virtual_` here
        // tracks whether *this* edge has been independently observed.
        edge.virtual_ = false;
        if !self.edges.contains_key(&key.inverse()) {
            let inv = self.edges.entry(key.inverse()).or_insert_with(|| TcEdge::new(key.inverse(), ansn));
            inv.virtual_ = true;
        }
    }

    /// LINK_METRIC(IN) updates the inverse edge's cost, but only if that
    /// inverse is still virtual — the inverse peer is authoritative for
    /// its own outbound cost once it reports directly (spec §4.4).
    pub fn refresh_edge_in(&mut self, from: NetAddr, to: NetAddr, domain: u8, cost: u32) {
        let inverse_key = EdgeKey { from: to, to: from };
        if let Some(edge) = self.edges.get_mut(&inverse_key) {
            if edge.virtual_ {
                edge.cost.insert(domain, cost);
            }
        }
    }

    pub fn upsert_endpoint(
        &mut self,
        owner: NetAddr,
        route_key: crate::addr::RouteKey,
        domain: u8,
        cost: u32,
        distance: u8,
        ansn: u16,
    ) {
        let key = EndpointKey { owner, key: route_key };
        let endpoint = self.endpoints.entry(key).or_insert_with(|| TcEndpoint::new(key, ansn));
        endpoint.cost.insert(domain, cost);
        endpoint.distance.insert(domain, distance);
        endpoint.ansn = ansn;
        if let Some(node) = self.nodes.get_mut(&owner) {
            node.endpoints.insert(key);
        }
    }

    /// ANSN-driven commit (spec §4.4, invariants I2/T2): removes every
    /// edge/endpoint under `originator` whose `ansn != node.ansn`.
    pub fn commit(&mut self, originator: &NetAddr) {
        let ansn = match self.nodes.get(originator) {
            Some(n) => n.ansn,
            None => return,
        };
        let stale_edges: Vec<EdgeKey> = self
            .nodes
            .get(originator)
            .map(|n| n.edges.iter().copied().filter(|k| self.edges.get(k).map(|e| e.ansn != ansn).unwrap_or(true)).collect())
            .unwrap_or_default();
        let stale_endpoints: Vec<EndpointKey> = self
            .nodes
            .get(originator)
            .map(|n| {
                n.endpoints
                    .iter()
                    .copied()
                    .filter(|k| self.endpoints.get(k).map(|e| e.ansn != ansn).unwrap_or(true))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(node) = self.nodes.get_mut(originator) {
            for key in &stale_edges {
                node.edges.remove(key);
            }
            for key in &stale_endpoints {
                node.endpoints.remove(key);
            }
        }
        for key in stale_edges {
            self.edges.remove(&key);
        }
        for key in stale_endpoints {
            self.endpoints.remove(&key);
        }
    }

    /// Drops nodes (and everything they own) whose validity timer has
    /// expired.
    pub fn expire_nodes(&mut self, now: Instant) {
        let dead: Vec<NetAddr> = self
            .nodes
            .values()
            .filter(|n| n.is_expired(now))
            .map(|n| n.originator)
            .collect();
        for originator in dead {
            if let Some(node) = self.nodes.remove(&originator) {
                for key in node.edges {
                    self.edges.remove(&key);
                }
                for key in node.endpoints {
                    self.endpoints.remove(&key);
                }
            }
        }
    }

    /// Spec invariant I3: an edge is usable by Dijkstra iff it is
    /// non-virtual, or its inverse exists with the same ANSN and both
    /// sides' costs for `domain` are finite.
    pub fn is_edge_valid(&self, key: &EdgeKey, domain: u8) -> bool {
        let edge = match self.edges.get(key) {
            Some(e) => e,
            None => return false,
        };
        if !edge.virtual_ {
            return true;
        }
        match self.edges.get(&key.inverse()) {
            Some(inv) => {
                inv.ansn == edge.ansn
                    && edge.cost(domain) < crate::metric::INFINITE
                    && inv.cost(domain) < crate::metric::INFINITE
            }
            None => false,
        }
    }
}
