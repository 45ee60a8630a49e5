//! FIB driver interface (spec §6.2): the abstract contract between the
//! reconciler and whatever installs routes into a kernel (or test fake).

use crate::addr::RouteKey;
use sonic_types::IpAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

/// `type` field of a route entry (spec §3.5); default is `Unicast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteType {
    Unicast,
    Local,
    Broadcast,
    Multicast,
    Throw,
    Unreachable,
    Prohibit,
    Blackhole,
    Nat,
}

impl Default for RouteType {
    fn default() -> Self {
        RouteType::Unicast
    }
}

/// A target FIB entry (spec §3.5): `(family, key=(dst,src), gateway,
/// src_ip?, metric, table, protocol, if_index, type)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibRoute {
    pub family: Family,
    pub key: RouteKey,
    pub gateway: IpAddress,
    pub src_ip: Option<IpAddress>,
    pub metric: u32,
    pub table: u8,
    pub protocol: u8,
    pub if_index: u32,
    pub route_type: RouteType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FibOp {
    Add,
    Replace,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FibErrorCode {
    /// ADD of a route that's already present — mapped to success.
    Eexist,
    /// DELETE of a route that's already gone — mapped to success.
    Esrch,
    Enoent,
    Other,
}

pub type FibAckResult = Result<(), FibErrorCode>;

/// External FIB collaborator (spec §6.2). Production code talks to the
/// kernel via netlink; tests swap in an in-memory fake.
pub trait FibDriver: Send {
    fn submit(&mut self, op: FibOp, route: FibRoute) -> u64;
    fn supports_source_specific(&self, family: Family) -> bool;
    /// Drains acknowledgments produced since the last call, in arrival
    /// order (spec §5: driver ACK wait is one of the three blocking ops,
    /// performed only from the event loop).
    fn drain_acks(&mut self) -> Vec<(u64, FibAckResult)>;
    /// Initial-sync / resync stream (spec §6.2 `query`).
    fn query(&self, table: u8) -> Vec<FibRoute>;
}
