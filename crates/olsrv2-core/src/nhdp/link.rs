//! NHDP link records and their state machine (spec §3.3, §4.2).

use crate::metric::RoutingCost;
use sonic_types::{IpAddress, MacAddress};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Pending,
    Heard,
    Symmetric,
    Lost,
}

/// In/out cost pair for one routing domain, quantized per RFC 7181 on the
/// wire and carried here already decoded (spec §3.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkMetric {
    pub in_cost: RoutingCost,
    pub out_cost: RoutingCost,
}

/// A neighbor reachable two hops away through this link (spec §3.3).
#[derive(Debug, Clone)]
pub struct Link2Hop {
    pub addr: IpAddress,
    pub metric: HashMap<u8, LinkMetric>,
    pub expires: Instant,
}

/// Key identifying a link: the local interface plus the neighbor's link
/// address on that interface (spec §3.3 keys a link "per interface, one
/// direct neighbor addressable on that interface").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkKey {
    pub iface: String,
    pub addr: IpAddress,
}

pub struct Link {
    pub key: LinkKey,
    pub state: LinkState,
    pub local_mac: MacAddress,
    pub addresses: Vec<IpAddress>,
    pub twohops: Vec<Link2Hop>,
    pub metric: HashMap<u8, LinkMetric>,
    pub heard_deadline: Option<Instant>,
    pub sym_deadline: Option<Instant>,
    pub lost_deadline: Option<Instant>,
    /// Index of this link's dualstack partner in the owning neighbor's link
    /// list, if any (spec §3.3: "pairs IPv4 and IPv6 link records for the
    /// same physical neighbor").
    pub dualstack_partner: Option<LinkKey>,
}

impl Link {
    pub fn new(iface: impl Into<String>, addr: IpAddress, local_mac: MacAddress) -> Self {
        let iface = iface.into();
        Link {
            key: LinkKey { iface, addr },
            state: LinkState::Pending,
            local_mac,
            addresses: vec![addr],
            twohops: Vec::new(),
            metric: HashMap::new(),
            heard_deadline: None,
            sym_deadline: None,
            lost_deadline: None,
            dualstack_partner: None,
        }
    }

    /// Applies the state machine of spec §4.2 to an inbound HELLO that
    /// lists the local address as `sym` (LINK_STATUS=SYM, or the address
    /// appears as SYMMETRIC) or merely `heard`.
    pub fn on_hello(&mut self, sym: bool, heard: bool, validity: std::time::Duration, now: Instant) {
        if sym {
            self.sym_deadline = Some(now + validity);
            self.heard_deadline = Some(now + validity);
            self.state = LinkState::Symmetric;
            self.lost_deadline = None;
        } else if heard {
            // HEARD timer extends on any HELLO; SYM timer, if already
            // running, is untouched by a merely-heard HELLO.
            let extended = now + validity;
            self.heard_deadline = Some(match self.heard_deadline {
                Some(d) if d > extended => d,
                _ => extended,
            });
            if !matches!(self.state, LinkState::Symmetric) {
                self.state = LinkState::Heard;
            }
        }
    }

    /// Advances the state machine against the clock (spec §4.2 "on SYM
    /// expires -> HEARD; on HEARD expires -> LOST; LOST removed after
    /// VTIME"). Returns true if the link should be dropped entirely.
    pub fn tick(&mut self, now: Instant, lost_hold_time: std::time::Duration) -> bool {
        match self.state {
            LinkState::Symmetric => {
                if self.sym_deadline.map(|d| d <= now).unwrap_or(true) {
                    self.enter_lost(now, lost_hold_time);
                }
            }
            LinkState::Heard => {
                if self.heard_deadline.map(|d| d <= now).unwrap_or(true) {
                    self.enter_lost(now, lost_hold_time);
                }
            }
            LinkState::Lost => {
                if self.lost_deadline.map(|d| d <= now).unwrap_or(true) {
                    return true;
                }
            }
            LinkState::Pending => {}
        }
        false
    }

    fn enter_lost(&mut self, now: Instant, lost_hold_time: std::time::Duration) {
        self.state = LinkState::Lost;
        self.lost_deadline = Some(now + lost_hold_time);
    }

    pub fn is_symmetric(&self) -> bool {
        matches!(self.state, LinkState::Symmetric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn link() -> Link {
        Link::new("eth0", "10.0.0.2".parse().unwrap(), MacAddress::new([0; 6]))
    }

    #[test]
    fn heard_hello_enters_heard_state() {
        let mut l = link();
        let now = Instant::now();
        l.on_hello(false, true, Duration::from_secs(6), now);
        assert_eq!(l.state, LinkState::Heard);
    }

    #[test]
    fn sym_hello_enters_symmetric_state() {
        let mut l = link();
        let now = Instant::now();
        l.on_hello(true, false, Duration::from_secs(6), now);
        assert!(l.is_symmetric());
    }

    #[test]
    fn sym_expiry_drops_to_lost_then_removed() {
        let mut l = link();
        let now = Instant::now();
        l.on_hello(true, false, Duration::from_secs(6), now);
        let expired = now + Duration::from_secs(7);
        assert!(!l.tick(expired, Duration::from_secs(30)));
        assert_eq!(l.state, LinkState::Lost);
        let after_hold = expired + Duration::from_secs(31);
        assert!(l.tick(after_hold, Duration::from_secs(30)));
    }
}
