//! TC-endpoint: an attached network or routable non-originator neighbor
//! address advertised by a TC-node (spec §3.4).

use crate::addr::{NetAddr, RouteKey};
use crate::metric::RoutingCost;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    pub owner: NetAddr,
    pub key: RouteKey,
}

pub struct TcEndpoint {
    pub key: EndpointKey,
    pub cost: HashMap<u8, RoutingCost>,
    pub distance: HashMap<u8, u8>,
    pub ansn: u16,
}

impl TcEndpoint {
    pub fn new(key: EndpointKey, ansn: u16) -> Self {
        TcEndpoint {
            key,
            cost: HashMap::new(),
            distance: HashMap::new(),
            ansn,
        }
    }

    pub fn cost(&self, domain: u8) -> RoutingCost {
        self.cost.get(&domain).copied().unwrap_or(crate::metric::INFINITE)
    }

    pub fn distance(&self, domain: u8) -> u8 {
        self.distance.get(&domain).copied().unwrap_or(1)
    }
}
