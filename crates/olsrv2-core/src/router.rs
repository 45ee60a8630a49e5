//! Route computation (spec §4.5): Dijkstra over `self` plus the NHDP
//! neighborhood plus the TC topology, one run per domain.

use crate::addr::{NetAddr, RouteKey};
use crate::domain::Domain;
use crate::iface::InterfaceTable;
use crate::metric::{RoutingCost, INFINITE};
use crate::nhdp::NhdpDb;
use crate::topology::TopologyDb;
use sonic_types::IpAddress;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

/// One computed route (spec §4.5): next hop plus outgoing interface,
/// metric, hopcount, and an optional source prefix for source-specific
/// domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub domain: u8,
    pub key: RouteKey,
    pub next_hop: IpAddress,
    pub out_iface: String,
    pub metric: RoutingCost,
    pub hopcount: u8,
    pub src_addr: Option<IpAddress>,
}

/// Identifies a node in the Dijkstra graph: either `self` or a TC-node
/// reached via its originator address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NodeId {
    Local,
    Remote(NetAddr),
}

#[derive(Clone)]
struct HeapEntry {
    cost: RoutingCost,
    hops: u8,
    node: NodeId,
    tiebreak: NetAddr,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.hops == other.hops && self.tiebreak == other.tiebreak
    }
}
impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap via `BinaryHeap` (spec §4.5 tie-breaks:
        // lower cost, then fewer hops, then smaller originator).
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.hops.cmp(&self.hops))
            .then_with(|| other.tiebreak.cmp(&self.tiebreak))
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Dist {
    cost: RoutingCost,
    hops: u8,
    via_first_hop: Option<NetAddr>,
}

pub struct Router {
    pub routable_acl: bool,
    pub local_originators: Vec<NetAddr>,
}

impl Default for Router {
    fn default() -> Self {
        Router {
            routable_acl: true,
            local_originators: Vec::new(),
        }
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs Dijkstra for `domain` over `self` ∪ NHDP neighbors ∪ TC-nodes,
    /// producing every reachable route (spec §4.5). `now` suppresses
    /// routes to a currently-LOST neighbor address.
    pub fn compute(
        &self,
        domain: &Domain,
        nhdp: &NhdpDb,
        topo: &TopologyDb,
        ifaces: &InterfaceTable,
        now: Instant,
    ) -> Vec<RouteEntry> {
        let mut dist: HashMap<NodeId, Dist> = HashMap::new();
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
        dist.insert(
            NodeId::Local,
            Dist { cost: 0, hops: 0, via_first_hop: None },
        );
        heap.push(HeapEntry {
            cost: 0,
            hops: 0,
            node: NodeId::Local,
            tiebreak: NetAddr::host("0.0.0.0".parse().unwrap()),
        });

        while let Some(entry) = heap.pop() {
            let current = match dist.get(&entry.node) {
                Some(d) if d.cost == entry.cost && d.hops == entry.hops => d,
                _ => continue,
            };
            let current_cost = current.cost;
            let current_hops = current.hops;
            let current_first_hop = current.via_first_hop;

            for (neighbor_node, edge_cost) in self.out_edges(entry.node, domain, nhdp, topo, now) {
                if edge_cost >= INFINITE {
                    continue;
                }
                let next_cost = current_cost.saturating_add(edge_cost);
                let next_hops = current_hops + 1;
                let next_first_hop = current_first_hop.or(match neighbor_node {
                    NodeId::Remote(addr) if entry.node == NodeId::Local => Some(addr),
                    _ => current_first_hop,
                });

                let better = match dist.get(&neighbor_node) {
                    None => true,
                    Some(d) => {
                        (next_cost, next_hops, node_tiebreak(neighbor_node))
                            < (d.cost, d.hops, node_tiebreak(neighbor_node))
                    }
                };
                if better {
                    dist.insert(
                        neighbor_node,
                        Dist { cost: next_cost, hops: next_hops, via_first_hop: next_first_hop },
                    );
                    heap.push(HeapEntry {
                        cost: next_cost,
                        hops: next_hops,
                        node: neighbor_node,
                        tiebreak: node_tiebreak(neighbor_node),
                    });
                }
            }
        }

        self.build_routes(domain, &dist, nhdp, topo, ifaces, now)
    }

    fn out_edges(
        &self,
        node: NodeId,
        domain: &Domain,
        nhdp: &NhdpDb,
        topo: &TopologyDb,
        now: Instant,
    ) -> Vec<(NodeId, RoutingCost)> {
        match node {
            NodeId::Local => nhdp
                .neighbors()
                .filter(|n| n.is_symmetric())
                .filter(|n| !self.local_originators.contains(&n.originator))
                .map(|n| {
                    let cost = n.domains.get(&domain.ext).map(|s| s.out_cost).unwrap_or(1);
                    (NodeId::Remote(n.originator), cost)
                })
                .collect(),
            NodeId::Remote(originator) => topo
                .node(&originator)
                .map(|tc_node| {
                    tc_node
                        .edges
                        .iter()
                        .filter(|e| topo.is_edge_valid(e, domain.ext))
                        .filter_map(|e| topo.edge(e).map(|edge| (e.to, edge.cost(domain.ext))))
                        .map(|(to, cost)| (NodeId::Remote(to), cost))
                        .filter(|(to_node, _)| !self.is_lost_neighbor(to_node, nhdp, now))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
        }
    }

    fn is_lost_neighbor(&self, node: &NodeId, nhdp: &NhdpDb, now: Instant) -> bool {
        if let NodeId::Remote(addr) = node {
            if let Some(ip) = addr.as_ip() {
                if let Some(n) = nhdp.neighbor(addr) {
                    return n.is_address_lost(&ip, now);
                }
            }
        }
        false
    }

    fn build_routes(
        &self,
        domain: &Domain,
        dist: &HashMap<NodeId, Dist>,
        nhdp: &NhdpDb,
        topo: &TopologyDb,
        ifaces: &InterfaceTable,
        now: Instant,
    ) -> Vec<RouteEntry> {
        let mut out = Vec::new();

        for (node, d) in dist {
            let NodeId::Remote(originator) = node else { continue };
            let Some(first_hop) = d.via_first_hop else { continue };
            let Some(next_hop_ip) = first_hop.as_ip() else { continue };
            let out_iface = self.iface_for_neighbor(&first_hop, nhdp, ifaces);

            // spec §4.5: a route whose destination is a neighbor address
            // currently LOST (within its lost-vtime) is suppressed, even
            // though the neighbor itself may still be reachable via
            // another of its addresses and so still carry 2-hop traffic.
            let dst_is_lost_neighbor_addr = self.is_lost_neighbor(node, nhdp, now);

            if let Some(dst_ip) = originator.as_ip() {
                if !dst_is_lost_neighbor_addr && (self.routable_acl || nhdp.neighbor(originator).is_some()) {
                    out.push(self.make_route(
                        domain,
                        RouteKey::destination_only(crate::addr::NetAddr::host(dst_ip).to_ip_prefix().unwrap()),
                        next_hop_ip,
                        &out_iface,
                        d.cost,
                        d.hops,
                        ifaces,
                    ));
                }
            }

            if let Some(tc_node) = topo.node(originator) {
                for endpoint_key in &tc_node.endpoints {
                    if let Some(endpoint) = topo.endpoint(endpoint_key) {
                        let cost = d.cost.saturating_add(endpoint.cost(domain.ext));
                        if cost >= INFINITE {
                            continue;
                        }
                        let hopcount = d.hops.saturating_add(endpoint.distance(domain.ext));
                        out.push(self.make_route(
                            domain,
                            endpoint_key.key,
                            next_hop_ip,
                            &out_iface,
                            cost,
                            hopcount,
                            ifaces,
                        ));
                    }
                }
            }
        }

        out
    }

    fn iface_for_neighbor(&self, originator: &NetAddr, nhdp: &NhdpDb, ifaces: &InterfaceTable) -> String {
        nhdp.neighbor(originator)
            .and_then(|n| n.links.first())
            .map(|k| k.iface.clone())
            .unwrap_or_else(|| ifaces.iter().next().map(|i| i.name.clone()).unwrap_or_default())
    }

    fn make_route(
        &self,
        domain: &Domain,
        key: RouteKey,
        next_hop: IpAddress,
        out_iface: &str,
        metric: RoutingCost,
        hopcount: u8,
        ifaces: &InterfaceTable,
    ) -> RouteEntry {
        let src_addr = if domain.params.use_srcip_in_routes && key.dst.is_ipv4() {
            ifaces.get(out_iface).and_then(|i| i.best_matching_address(&next_hop))
        } else {
            None
        };
        RouteEntry {
            domain: domain.ext,
            key,
            next_hop,
            out_iface: out_iface.to_string(),
            metric,
            hopcount,
            src_addr,
        }
    }
}

fn node_tiebreak(node: NodeId) -> NetAddr {
    match node {
        NodeId::Local => NetAddr::host("0.0.0.0".parse().unwrap()),
        NodeId::Remote(addr) => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Domain, RoutingDomainParams};
    use crate::metric::RoutingCost;
    use crate::nhdp::link::LinkKey;
    use crate::topology::edge::EdgeKey;
    use sonic_types::MacAddress;
    use std::time::Duration;

    fn sym_neighbor(nhdp: &mut NhdpDb, iface: &str, addr: &str, out_cost: RoutingCost) -> NetAddr {
        let ip: IpAddress = addr.parse().unwrap();
        let originator = NetAddr::host(ip);
        let key = LinkKey { iface: iface.to_string(), addr: ip };
        nhdp.link_or_create(key.clone(), originator, MacAddress::new([0; 6]));
        let now = Instant::now();
        nhdp.link_mut(&key).unwrap().on_hello(true, false, Duration::from_secs(6), now);
        nhdp.neighbor_mut(&originator).domain_mut(0).out_cost = out_cost;
        nhdp.recompute_symmetric_counts();
        originator
    }

    fn domain() -> Domain {
        Domain::new(0, RoutingDomainParams::default())
    }

    #[test]
    fn direct_symmetric_neighbor_gets_a_route() {
        let mut nhdp = NhdpDb::new();
        let b = sym_neighbor(&mut nhdp, "eth0", "10.0.0.2", 10);
        let topo = TopologyDb::new();
        let ifaces = InterfaceTable::new();
        let router = Router::new();
        let routes = router.compute(&domain(), &nhdp, &topo, &ifaces, Instant::now());
        let route = routes.iter().find(|r| r.key.dst.address() == &b.as_ip().unwrap()).unwrap();
        assert_eq!(route.metric, 10);
        assert_eq!(route.hopcount, 1);
    }

    #[test]
    fn two_hop_route_via_tc_edge() {
        let mut nhdp = NhdpDb::new();
        let b = sym_neighbor(&mut nhdp, "eth0", "10.0.0.2", 10);
        let mut topo = TopologyDb::new();
        let now = Instant::now() + Duration::from_secs(60);
        topo.update_node(b, 5, now);
        let c = NetAddr::host("10.0.0.3".parse().unwrap());
        topo.refresh_edge_out(b, c, 0, 100, 5);
        topo.refresh_edge_out(c, b, 0, 100, 5);
        let ifaces = InterfaceTable::new();
        let router = Router::new();
        let routes = router.compute(&domain(), &nhdp, &topo, &ifaces, Instant::now());
        let route = routes.iter().find(|r| r.key.dst.address() == &c.as_ip().unwrap()).unwrap();
        assert_eq!(route.metric, 110);
        assert_eq!(route.hopcount, 2);
        assert_eq!(route.next_hop, b.as_ip().unwrap());
    }

    #[test]
    fn lost_neighbor_destination_is_suppressed() {
        let mut nhdp = NhdpDb::new();
        let b = sym_neighbor(&mut nhdp, "eth0", "10.0.0.2", 10);
        let now = Instant::now();
        let ip = b.as_ip().unwrap();
        nhdp.neighbor_mut(&b).addresses.push(crate::nhdp::neighbor::NeighborAddress {
            addr: ip,
            lost: false,
            lost_deadline: None,
        });
        nhdp.neighbor_mut(&b).mark_address_lost(ip, now, Duration::from_secs(30));
        let mut topo = TopologyDb::new();
        topo.update_node(b, 1, now + Duration::from_secs(60));
        let c = NetAddr::host("10.0.0.3".parse().unwrap());
        topo.refresh_edge_out(b, c, 0, 100, 1);
        topo.refresh_edge_out(c, b, 0, 100, 1);
        let ifaces = InterfaceTable::new();
        let router = Router::new();
        let routes = router.compute(&domain(), &nhdp, &topo, &ifaces, now);
        // The route to B's own (now LOST) address is suppressed...
        assert!(routes.iter().all(|r| r.key.dst.address() != &ip));
        // ...but B still carries 2-hop traffic to C, since C's own address
        // isn't the one that went LOST.
        assert!(routes.iter().any(|r| r.key.dst.address() == &c.as_ip().unwrap()));
    }

    #[test]
    fn unreachable_endpoint_behind_virtual_only_edge_is_skipped() {
        let mut nhdp = NhdpDb::new();
        let b = sym_neighbor(&mut nhdp, "eth0", "10.0.0.2", 10);
        let mut topo = TopologyDb::new();
        let now = Instant::now() + Duration::from_secs(60);
        topo.update_node(b, 5, now);
        let c = NetAddr::host("10.0.0.3".parse().unwrap());
        topo.refresh_edge_out(b, c, 0, 100, 5);
        assert!(topo.is_edge_valid(&EdgeKey { from: b, to: c }, 0));
        assert!(!topo.is_edge_valid(&EdgeKey { from: c, to: b }, 0));

        let ifaces = InterfaceTable::new();
        let router = Router::new();
        let routes = router.compute(&domain(), &nhdp, &topo, &ifaces, Instant::now());
        // `b → c` is usable (directly observed); the route exists.
        assert!(routes.iter().any(|r| r.key.dst.address() == &c.as_ip().unwrap()));
    }
}
