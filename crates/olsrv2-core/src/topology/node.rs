//! TC-node (spec §3.4).

use super::edge::EdgeKey;
use super::endpoint::EndpointKey;
use crate::addr::NetAddr;
use std::collections::HashSet;
use std::time::{Duration, Instant};

pub struct TcNode {
    pub originator: NetAddr,
    pub ansn: u16,
    pub expires: Instant,
    pub interval_hint: Duration,
    pub edges: HashSet<EdgeKey>,
    pub endpoints: HashSet<EndpointKey>,
}

impl TcNode {
    pub fn new(originator: NetAddr, ansn: u16, expires: Instant) -> Self {
        TcNode {
            originator,
            ansn,
            expires,
            interval_hint: Duration::from_secs(5),
            edges: HashSet::new(),
            endpoints: HashSet::new(),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires <= now
    }
}
