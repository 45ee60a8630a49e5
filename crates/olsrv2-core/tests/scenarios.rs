//! End-to-end scenarios driving `Core`'s public surface the way the
//! external codec/timer loop would, rather than exercising one module's
//! internals in isolation.

use olsrv2_core::addr::{NetAddr, RouteKey};
use olsrv2_core::config::{ConfigSet, DomainConfig};
use olsrv2_core::domain::{Domain, RoutingDomainParams};
use olsrv2_core::fib::{FibAckResult, FibDriver, FibErrorCode, FibOp, FibRoute};
use olsrv2_core::iface::Interface;
use olsrv2_core::l2ib::OriginPriority;
use olsrv2_core::router::Router;
use olsrv2_core::wire::{AddressBlockEntry, DecodedHello, DecodedTc, LinkStatus, NbrAddrType};
use olsrv2_core::Core;
use sonic_types::{IpAddress, MacAddress};
use std::time::{Duration, Instant};

/// A `FibDriver` stand-in that acks every op `Ok` on the next `drain_acks`
/// call, so tests can observe the reconciler's installed set settle after
/// one `tick`.
#[derive(Default)]
struct AckingDriver {
    next_seq: u64,
    submitted: Vec<(u64, FibOp, FibRoute)>,
    acks: Vec<(u64, FibAckResult)>,
    fail_next: Option<FibErrorCode>,
}

impl FibDriver for AckingDriver {
    fn submit(&mut self, op: FibOp, route: FibRoute) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        if let Some(code) = self.fail_next.take() {
            self.acks.push((seq, Err(code)));
        } else {
            self.acks.push((seq, Ok(())));
        }
        self.submitted.push((seq, op, route));
        seq
    }

    fn supports_source_specific(&self, _family: olsrv2_core::fib::Family) -> bool {
        true
    }

    fn drain_acks(&mut self) -> Vec<(u64, FibAckResult)> {
        std::mem::take(&mut self.acks)
    }

    fn query(&self, _table: u8) -> Vec<FibRoute> {
        Vec::new()
    }
}

fn ip(s: &str) -> IpAddress {
    s.parse().unwrap()
}

fn bootstrapped() -> Core {
    let mut config = ConfigSet::default();
    config.domains.push(DomainConfig {
        ext: 0,
        srcip_routes: false,
        protocol: 100,
        table: 254,
        distance: 115,
        source_specific: false,
    });
    let local = NetAddr::host(ip("10.0.0.1"));
    let mut core = Core::bootstrap(config, local).unwrap();
    core.ifaces.insert(Interface::new("eth0", 2, MacAddress::new([0; 6])));
    core
}

fn symmetric_hello(local: &str, sender: &str) -> DecodedHello {
    let mut entry = AddressBlockEntry::plain(ip(local));
    entry.link_status = Some(LinkStatus::Symmetric);
    DecodedHello {
        sender_iface_addrs: vec![ip(sender)],
        validity: Duration::from_secs(6),
        interval: Duration::from_secs(2),
        addresses: vec![entry],
        willingness: vec![],
        mpr_selecting_us: false,
    }
}

/// spec §8: a HELLO exchange with SYM link status makes the link (and
/// hence the neighbor) symmetric, and dirties the router.
#[test]
fn hello_with_sym_status_creates_symmetric_neighbor() {
    let mut core = bootstrapped();
    let now = Instant::now();
    let sender = ip("10.0.0.2");
    core.on_hello("eth0", sender, &ip("10.0.0.1"), &symmetric_hello("10.0.0.1", "10.0.0.2"), now);

    let neighbor = core.nhdp.db.neighbor(&NetAddr::host(sender)).unwrap();
    assert!(neighbor.is_symmetric());
}

/// spec §8: once B is a symmetric neighbor and floods a TC naming a route
/// to C, the daemon computes a 2-hop route to C via B and installs it
/// through the FIB driver.
#[test]
fn tc_from_symmetric_neighbor_yields_two_hop_fib_route() {
    let mut core = bootstrapped();
    let now = Instant::now();
    let b = ip("10.0.0.2");
    core.on_hello("eth0", b, &ip("10.0.0.1"), &symmetric_hello("10.0.0.1", "10.0.0.2"), now);

    let mut entry = AddressBlockEntry::plain(ip("10.0.0.3"));
    entry.nbr_addr_type = NbrAddrType { originator: false, routable: true };
    entry.link_metric.push((0, None, Some(50)));
    let tc = DecodedTc {
        originator: b,
        seqno: 1,
        hopcount: 0,
        hoplimit: 8,
        vtime_tlv: 0x33,
        mpr_types: vec![0],
        addresses: vec![entry],
    };
    assert!(core.on_tc(&tc, 2, now));

    let mut driver = AckingDriver::default();
    core.tick(now, &mut driver);
    core.tick(now, &mut driver);

    let installed = core.fib.installed_routes().find(|r| {
        r.key.dst.address() == &ip("10.0.0.3")
    });
    let installed = installed.expect("route to 10.0.0.3 should have been submitted and acked");
    assert_eq!(installed.gateway, b);
}

/// spec §8: a newer TC from the same originator with a smaller edge set
/// drops the stale edge (ANSN cleanup), and the recomputed route set no
/// longer contains the destination behind the dropped edge.
#[test]
fn newer_tc_ansn_drops_stale_edges() {
    let mut core = bootstrapped();
    let now = Instant::now();
    let b = ip("10.0.0.2");
    core.on_hello("eth0", b, &ip("10.0.0.1"), &symmetric_hello("10.0.0.1", "10.0.0.2"), now);

    let mut e_c = AddressBlockEntry::plain(ip("10.0.0.3"));
    e_c.nbr_addr_type = NbrAddrType { originator: false, routable: true };
    e_c.link_metric.push((0, None, Some(10)));
    let tc1 = DecodedTc {
        originator: b,
        seqno: 1,
        hopcount: 0,
        hoplimit: 8,
        vtime_tlv: 0x33,
        mpr_types: vec![0],
        addresses: vec![e_c],
    };
    assert!(core.on_tc(&tc1, 2, now));

    let tc2 = DecodedTc {
        originator: b,
        seqno: 2,
        hopcount: 0,
        hoplimit: 8,
        vtime_tlv: 0x33,
        mpr_types: vec![0],
        addresses: vec![],
    };
    assert!(core.on_tc(&tc2, 2, now));

    let mut driver = AckingDriver::default();
    core.tick(now, &mut driver);
    core.tick(now, &mut driver);
    assert!(core.fib.installed_routes().all(|r| r.key.dst.address() != &ip("10.0.0.3")));
}

/// spec §8, §3.2: a `Reliable` L2IB write beats a prior `Configured` write
/// on the same cell; a later `Configured` write does not overwrite it back.
#[test]
fn l2ib_higher_priority_origin_wins_and_resists_downgrade() {
    use olsrv2_core::l2ib::CellValue;
    use olsrv2_core::metric::NetMetricIndex;

    let mut core = bootstrapped();
    let configured = core.l2ib.origin_register("static-config", OriginPriority::Configured, false).unwrap();
    let reliable = core.l2ib.origin_register("radio-driver", OriginPriority::Reliable, true).unwrap();

    core.l2ib.net_add("eth0");
    core.l2ib.data_set("eth0", NetMetricIndex::Mtu, &configured, CellValue::I64(1500)).unwrap();
    core.l2ib.data_set("eth0", NetMetricIndex::Mtu, &reliable, CellValue::I64(1400)).unwrap();

    let net = core.l2ib.net("eth0").unwrap();
    assert_eq!(*net.cell(NetMetricIndex::Mtu).unwrap().value(), CellValue::I64(1400));

    // A later write from the lower-priority origin must not win back the cell.
    core.l2ib.data_set("eth0", NetMetricIndex::Mtu, &configured, CellValue::I64(9000)).unwrap();
    let net = core.l2ib.net("eth0").unwrap();
    assert_eq!(*net.cell(NetMetricIndex::Mtu).unwrap().value(), CellValue::I64(1400));
}

/// spec §8: a domain configured with `srcip_routes` stamps the best
/// matching local address on the outgoing interface as the route's source
/// address.
#[test]
fn source_specific_domain_fills_in_src_addr() {
    let domain = Domain::new(
        0,
        RoutingDomainParams {
            protocol_id: 100,
            kernel_table_id: 254,
            distance: 115,
            use_srcip_in_routes: true,
            source_specific: true,
        },
    );

    let mut nhdp = olsrv2_core::nhdp::NhdpDb::new();
    let b_ip = ip("10.0.0.2");
    let b = NetAddr::host(b_ip);
    let key = olsrv2_core::nhdp::link::LinkKey { iface: "eth0".to_string(), addr: b_ip };
    nhdp.link_or_create(key.clone(), b, MacAddress::new([0; 6]));
    nhdp.link_mut(&key).unwrap().on_hello(true, false, Duration::from_secs(6), Instant::now());
    nhdp.recompute_symmetric_counts();

    let mut ifaces = olsrv2_core::iface::InterfaceTable::new();
    let mut eth0 = Interface::new("eth0", 2, MacAddress::new([0; 6]));
    eth0.add_address("10.0.0.1/24".parse().unwrap());
    ifaces.insert(eth0);

    let topo = olsrv2_core::topology::TopologyDb::new();
    let routes = Router::new().compute(&domain, &nhdp, &topo, &ifaces, Instant::now());
    let route = routes.iter().find(|r| r.key.dst.address() == &b_ip).unwrap();
    assert_eq!(route.src_addr, Some(ip("10.0.0.1")));
}

/// spec §4.6/§8: a transient FIB failure is retried, and the route lands
/// in the installed set once the retry is acked.
#[test]
fn fib_retry_recovers_after_transient_failure() {
    let mut core = bootstrapped();
    let now = Instant::now();
    let b = ip("10.0.0.2");
    core.on_hello("eth0", b, &ip("10.0.0.1"), &symmetric_hello("10.0.0.1", "10.0.0.2"), now);

    let mut driver = AckingDriver::default();
    driver.fail_next = Some(FibErrorCode::Other);
    core.tick(now, &mut driver); // submits the route, driver queues an Err ack
    core.tick(now, &mut driver); // drains the Err ack, schedules a retry

    assert!(core.fib.installed_routes().all(|r| r.key.dst.address() != &b));
    assert_eq!(core.fib.pending_count(), 0);

    let later = now + Duration::from_secs(5);
    core.tick(later, &mut driver); // retry fires and is acked Ok in the same tick

    let installed = core.fib.installed_routes().any(|r| r.key.dst.address() == &b);
    assert!(installed, "route should be installed once the retried submit is acked");
}

/// spec §4.6: forwarding a flooded message requires a managed interface,
/// a symmetric neighbor that has selected us as its flooding MPR, and a
/// fresh `(msg_type, originator, seqno)` in the forwarded duplicate set.
#[test]
fn should_forward_requires_flooding_mpr_selection() {
    let mut core = bootstrapped();
    let now = Instant::now();
    let b = ip("10.0.0.2");
    core.on_hello("eth0", b, &ip("10.0.0.1"), &symmetric_hello("10.0.0.1", "10.0.0.2"), now);

    // Not yet selected as flooding MPR by B: must not forward.
    assert!(!core.should_forward("eth0", b, 2, ip("10.0.0.9"), 1, now));

    core.nhdp.db.neighbor_mut(&NetAddr::host(b)).neigh_is_flooding_mpr = true;
    assert!(core.should_forward("eth0", b, 2, ip("10.0.0.9"), 1, now));
    // Re-delivery of the same (msg_type, originator, seqno) is suppressed.
    assert!(!core.should_forward("eth0", b, 2, ip("10.0.0.9"), 1, now));
}

#[test]
fn route_key_helpers_distinguish_source_specific_keys() {
    let dst: sonic_types::IpPrefix = "10.0.0.0/24".parse().unwrap();
    let src: sonic_types::IpPrefix = "192.168.1.0/24".parse().unwrap();
    let plain = RouteKey::destination_only(dst);
    let ss = RouteKey::source_specific(dst, src);
    assert!(!plain.is_source_specific());
    assert!(ss.is_source_specific());
}
