//! TC-edge: a directed link between two TC-nodes, with an inverse pointer
//! (spec §3.4, invariant T1).

use crate::addr::NetAddr;
use crate::metric::RoutingCost;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub from: NetAddr,
    pub to: NetAddr,
}

impl EdgeKey {
    pub fn inverse(&self) -> EdgeKey {
        EdgeKey { from: self.to, to: self.from }
    }
}

pub struct TcEdge {
    pub key: EdgeKey,
    /// True until both directions have been observed from peer TCs (spec
    /// §3.4: "virtual=true until both directions are observed").
    pub virtual_: bool,
    pub cost: HashMap<u8, RoutingCost>,
    pub ansn: u16,
}

impl TcEdge {
    pub fn new(key: EdgeKey, ansn: u16) -> Self {
        TcEdge {
            key,
            virtual_: true,
            cost: HashMap::new(),
            ansn,
        }
    }

    pub fn cost(&self, domain: u8) -> RoutingCost {
        self.cost.get(&domain).copied().unwrap_or(crate::metric::INFINITE)
    }
}
