//! Read-only state export (spec §6.5): serde DTOs plus the accessor that
//! builds them consistently within one borrow of the owning tables. An
//! external console subsystem renders these; this module owns only the
//! shape and the snapshot discipline, not a server.

use crate::iface::InterfaceTable;
use crate::l2ib::L2ib;
use crate::nhdp::NhdpDb;
use crate::topology::TopologyDb;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct InterfaceSnapshot {
    pub name: String,
    pub index: u32,
    pub link_up: bool,
    pub addresses: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkSnapshot {
    pub iface: String,
    pub addr: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct TwoHopSnapshot {
    pub iface: String,
    pub via: String,
    pub addr: String,
}

#[derive(Debug, Serialize)]
pub struct NeighborSnapshot {
    pub originator: String,
    pub symmetric: u32,
    pub local_is_flooding_mpr: bool,
    pub neigh_is_flooding_mpr: bool,
    pub domains: Vec<NeighborDomainSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct NeighborDomainSnapshot {
    pub domain: u8,
    pub local_is_mpr: bool,
    pub neigh_is_mpr: bool,
    pub in_cost: u32,
    pub out_cost: u32,
}

#[derive(Debug, Serialize)]
pub struct TcNodeSnapshot {
    pub originator: String,
    pub ansn: u16,
    pub edges: Vec<TcEdgeSnapshot>,
    pub endpoints: Vec<TcEndpointSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct TcEdgeSnapshot {
    pub to: String,
    pub virtual_only: bool,
    pub costs: Vec<(u8, u32)>,
}

#[derive(Debug, Serialize)]
pub struct TcEndpointSnapshot {
    pub key: String,
    pub costs: Vec<(u8, u32)>,
    pub distances: Vec<(u8, u8)>,
}

#[derive(Debug, Serialize)]
pub struct L2ibCellSnapshot {
    pub net: String,
    pub index: String,
    pub value: String,
    pub origin: String,
}

/// Builds every DTO group from one borrow each of the owning tables, so
/// the result is a consistent snapshot (spec §6.5 "must be consistent
/// within one call").
pub fn take_snapshot(
    ifaces: &InterfaceTable,
    nhdp: &NhdpDb,
    topo: &TopologyDb,
    l2ib: &L2ib,
) -> CoreSnapshot {
    let interfaces = ifaces
        .iter()
        .map(|i| InterfaceSnapshot {
            name: i.name.clone(),
            index: i.index,
            link_up: i.link_up,
            addresses: i.addresses().map(|p| p.to_string()).collect(),
        })
        .collect();

    let mut links = Vec::new();
    let mut twohops = Vec::new();
    let mut neighbors = Vec::new();
    for n in nhdp.neighbors() {
        for key in &n.links {
            if let Some(link) = nhdp.link(key) {
                links.push(LinkSnapshot {
                    iface: key.iface.clone(),
                    addr: key.addr.to_string(),
                    state: format!("{:?}", link.state),
                });
                for t in &link.twohops {
                    twohops.push(TwoHopSnapshot {
                        iface: key.iface.clone(),
                        via: key.addr.to_string(),
                        addr: t.addr.to_string(),
                    });
                }
            }
        }
        neighbors.push(NeighborSnapshot {
            originator: n.originator.to_string(),
            symmetric: n.symmetric,
            local_is_flooding_mpr: n.local_is_flooding_mpr,
            neigh_is_flooding_mpr: n.neigh_is_flooding_mpr,
            domains: n
                .domains
                .iter()
                .map(|(d, s)| NeighborDomainSnapshot {
                    domain: *d,
                    local_is_mpr: s.local_is_mpr,
                    neigh_is_mpr: s.neigh_is_mpr,
                    in_cost: s.in_cost,
                    out_cost: s.out_cost,
                })
                .collect(),
        });
    }

    let tc_nodes = topo
        .nodes()
        .map(|node| TcNodeSnapshot {
            originator: node.originator.to_string(),
            ansn: node.ansn,
            edges: node
                .edges
                .iter()
                .filter_map(|k| topo.edge(k).map(|e| (k, e)))
                .map(|(k, e)| TcEdgeSnapshot {
                    to: k.to.to_string(),
                    virtual_only: e.virtual_,
                    costs: e.cost.iter().map(|(d, c)| (*d, *c)).collect(),
                })
                .collect(),
            endpoints: node
                .endpoints
                .iter()
                .filter_map(|k| topo.endpoint(k).map(|e| (k, e)))
                .map(|(k, e)| TcEndpointSnapshot {
                    key: k.key.to_string(),
                    costs: e.cost.iter().map(|(d, c)| (*d, *c)).collect(),
                    distances: e.distance.iter().map(|(d, dist)| (*d, *dist)).collect(),
                })
                .collect(),
        })
        .collect();

    let l2ib_cells = l2ib
        .nets()
        .flat_map(|(name, net)| {
            net.cells().map(move |(index, cell)| L2ibCellSnapshot {
                net: name.clone(),
                index: format!("{index:?}"),
                value: format!("{:?}", cell.value()),
                origin: cell.origin().map(|o| o.name().to_string()).unwrap_or_default(),
            })
        })
        .collect();

    CoreSnapshot { interfaces, links, twohops, neighbors, tc_nodes, l2ib_cells }
}

#[derive(Debug, Serialize)]
pub struct CoreSnapshot {
    pub interfaces: Vec<InterfaceSnapshot>,
    pub links: Vec<LinkSnapshot>,
    pub twohops: Vec<TwoHopSnapshot>,
    pub neighbors: Vec<NeighborSnapshot>,
    pub tc_nodes: Vec<TcNodeSnapshot>,
    pub l2ib_cells: Vec<L2ibCellSnapshot>,
}
