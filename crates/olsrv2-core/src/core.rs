//! `Core`: the single struct owning every subsystem, driven by one
//! cooperative event loop (spec §5). All DB mutation happens through the
//! owning component's API; `Core` only sequences calls and tracks the
//! router dirty bit.

use crate::addr::NetAddr;
use crate::config::ConfigSet;
use crate::domain::{Domain, DomainTable};
use crate::dupset::{DupVerdict, DuplicateSet};
use crate::fib::{FibDriver, FibReconciler, FibRoute};
use crate::iface::InterfaceTable;
use crate::l2ib::L2ib;
use crate::nhdp::NhdpEngine;
use crate::router::Router;
use crate::topology::TcEngine;
use crate::wire::{to_net_addr, DecodedHello, DecodedTc};
use sonic_types::IpAddress;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct Core {
    pub ifaces: InterfaceTable,
    pub domains: DomainTable,
    pub l2ib: L2ib,
    pub nhdp: NhdpEngine,
    pub tc: TcEngine,
    pub router: Router,
    pub fib: FibReconciler,
    pub config: ConfigSet,
    dupset_processed: DuplicateSet,
    dupset_forwarded: DuplicateSet,
    dirty: bool,
    local_originator: NetAddr,
}

impl Core {
    /// Validates `config` and builds `Core`, or refuses to start (spec §7
    /// "on startup, the daemon refuses to run with an invalid config").
    pub fn bootstrap(config: ConfigSet, local_originator: NetAddr) -> crate::error::Result<Core> {
        config.validate()?;

        let mut domains = DomainTable::new();
        for d in &config.domains {
            let params = crate::domain::RoutingDomainParams {
                protocol_id: d.protocol,
                kernel_table_id: d.table,
                distance: d.distance,
                use_srcip_in_routes: d.srcip_routes,
                source_specific: d.source_specific,
            };
            domains.insert(Domain::new(d.ext, params));
        }
        for lan in &config.olsrv2.lans {
            domains.add_lan(crate::domain::LocalAttachedNetwork {
                domain: lan.domain.unwrap_or(0),
                key: lan.key,
                metric: lan.metric,
                distance: lan.distance,
            });
        }

        Ok(Core {
            ifaces: InterfaceTable::new(),
            domains,
            l2ib: L2ib::default(),
            nhdp: NhdpEngine::new(),
            tc: TcEngine::new(),
            router: Router::new(),
            fib: FibReconciler::new(),
            dupset_processed: DuplicateSet::new(config.olsrv2.processing_hold_time),
            dupset_forwarded: DuplicateSet::new(config.olsrv2.forward_hold_time),
            config,
            dirty: false,
            local_originator,
        })
    }

    /// Ingests an inbound HELLO (spec §4.2). HELLOs are not subject to the
    /// duplicate set (only TC is, per §4.3's `(msg_type, originator)` key
    /// being meaningful for flooded messages).
    pub fn on_hello(
        &mut self,
        iface: &str,
        sender: IpAddress,
        local_addr: &IpAddress,
        hello: &DecodedHello,
        now: Instant,
    ) {
        let Some(iface_rec) = self.ifaces.get(iface) else {
            warn!(iface, "hello on unknown interface, dropped");
            return;
        };
        if !iface_rec.is_managed() {
            debug!(iface, "hello on unmanaged interface, dropped");
            return;
        }
        let local_mac = iface_rec.mac;
        self.nhdp.process_hello(iface, sender, local_addr, local_mac, hello, now);
        self.nhdp.run_mpr_selection(&self.domains);
        self.dirty = true;
    }

    /// Ingests an inbound TC (spec §4.4): drops local-originator TCs,
    /// gates on the processed-dupset, then processes.
    pub fn on_tc(&mut self, tc: &DecodedTc, msg_type: u8, now: Instant) -> bool {
        let is_local = to_net_addr(&tc.originator) == self.local_originator;
        if is_local {
            debug!(originator = %tc.originator, "dropped local-originator tc");
            return false;
        }

        let verdict = self.dupset_processed.check(msg_type, tc.originator, tc.seqno, now);
        if !matches!(verdict, DupVerdict::New | DupVerdict::NewOld | DupVerdict::NewExpired) {
            debug!(originator = %tc.originator, seqno = tc.seqno, "duplicate tc suppressed");
            return false;
        }

        let accepted = self.tc.process_tc(tc, false, now);
        if accepted {
            self.dirty = true;
        }
        accepted
    }

    /// Forwarding decision for a flooded message (spec §4.6): forward iff
    /// it arrived on a managed interface from a SYM neighbor that
    /// selected us as flooding MPR, and the forwarded-dupset is new.
    pub fn should_forward(
        &mut self,
        iface: &str,
        source: IpAddress,
        msg_type: u8,
        originator: IpAddress,
        seqno: u16,
        now: Instant,
    ) -> bool {
        let Some(iface_rec) = self.ifaces.get(iface) else { return false };
        if !iface_rec.is_managed() {
            return false;
        }
        let source_net = to_net_addr(&source);
        let Some(neighbor) = self.nhdp.db.neighbor(&source_net) else { return false };
        if !neighbor.is_symmetric() || !neighbor.neigh_is_flooding_mpr {
            return false;
        }
        matches!(
            self.dupset_forwarded.check(msg_type, originator, seqno, now),
            DupVerdict::New | DupVerdict::NewOld
        )
    }

    /// Advances timers (link/neighbor state machine, TC-node expiry, FIB
    /// retries) and recomputes routes if anything is dirty. This is the
    /// single per-tick entry point the event loop drives (spec §5).
    pub fn tick(&mut self, now: Instant, driver: &mut dyn FibDriver) {
        self.nhdp.db.tick(now, self.config.olsrv2.nhdp_hold_time);
        self.tc.db.expire_nodes(now);
        self.fib.drive_retries(now, driver);
        self.fib.drain_acks(driver);
        self.recompute_if_dirty(now, driver);
    }

    fn recompute_if_dirty(&mut self, now: Instant, driver: &mut dyn FibDriver) {
        if !self.dirty {
            return;
        }
        let mut target = Vec::new();
        for domain in self.domains.iter() {
            for route in self.router.compute(domain, &self.nhdp.db, &self.tc.db, &self.ifaces, now) {
                if !self.config.olsrv2.nhdp_routable && self.tc.db.node(&to_net_addr(&route.next_hop)).is_none() {
                    continue;
                }
                target.push(to_fib_route(domain, &route, &self.ifaces));
            }
        }
        self.fib.reconcile(&target, driver);
        self.dirty = false;
    }

    /// Per-`tc_interval` outbound TC scheduling with advertisement-hold
    /// suppression (spec §4.4 emit side).
    pub fn should_emit_tc(&mut self, domain: &Domain) -> bool {
        let is_mpr_for_anyone = self
            .nhdp
            .db
            .neighbors()
            .any(|n| n.domains.get(&domain.ext).map(|s| s.neigh_is_mpr).unwrap_or(false));
        let has_lan = self.domains.lans_for(domain.ext).next().is_some();
        self.tc.should_emit(is_mpr_for_anyone, has_lan, self.config.olsrv2.advertisement_hold_time_factor)
    }

    pub fn shutdown(&mut self, driver: &mut dyn FibDriver, grace_period: Duration) {
        info!("core shutting down, flushing fib");
        self.fib.shutdown_flush(driver, grace_period);
    }
}

fn to_fib_route(domain: &Domain, route: &crate::router::RouteEntry, ifaces: &InterfaceTable) -> FibRoute {
    let if_index = ifaces.get(&route.out_iface).map(|i| i.index).unwrap_or(0);
    let family = if route.key.dst.is_ipv4() { crate::fib::Family::V4 } else { crate::fib::Family::V6 };
    FibRoute {
        family,
        key: route.key,
        gateway: route.next_hop,
        src_ip: route.src_addr,
        metric: route.metric,
        table: domain.params.kernel_table_id,
        protocol: domain.params.protocol_id,
        if_index,
        route_type: crate::fib::RouteType::Unicast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fib::{FibAckResult, FibOp};
    use crate::wire::AddressBlockEntry;
    use sonic_types::MacAddress;

    struct NullDriver {
        next: u64,
    }
    impl FibDriver for NullDriver {
        fn submit(&mut self, _op: FibOp, _route: FibRoute) -> u64 {
            self.next += 1;
            self.next
        }
        fn supports_source_specific(&self, _family: crate::fib::Family) -> bool {
            true
        }
        fn drain_acks(&mut self) -> Vec<(u64, FibAckResult)> {
            Vec::new()
        }
        fn query(&self, _table: u8) -> Vec<FibRoute> {
            Vec::new()
        }
    }

    fn bootstrap() -> Core {
        let mut config = ConfigSet::default();
        config.domains.push(crate::config::DomainConfig {
            ext: 0,
            srcip_routes: false,
            protocol: 100,
            table: 254,
            distance: 115,
            source_specific: false,
        });
        let local = NetAddr::host("10.0.0.1".parse().unwrap());
        let mut core = Core::bootstrap(config, local).unwrap();
        core.ifaces.insert(crate::iface::Interface::new("eth0", 2, MacAddress::new([0; 6])));
        core
    }

    #[test]
    fn invalid_config_refuses_to_bootstrap() {
        let mut config = ConfigSet::default();
        config.olsrv2.advertisement_hold_time_factor = 0;
        let local = NetAddr::host("10.0.0.1".parse().unwrap());
        assert!(Core::bootstrap(config, local).is_err());
    }

    #[test]
    fn hello_makes_neighbor_symmetric_and_dirty() {
        let mut core = bootstrap();
        let now = Instant::now();
        let local_addr: IpAddress = "10.0.0.1".parse().unwrap();
        let sender: IpAddress = "10.0.0.2".parse().unwrap();
        let hello = DecodedHello {
            sender_iface_addrs: vec![sender],
            validity: Duration::from_secs(6),
            interval: Duration::from_secs(2),
            addresses: vec![{
                let mut e = AddressBlockEntry::plain(local_addr);
                e.link_status = Some(crate::wire::LinkStatus::Symmetric);
                e
            }],
            willingness: vec![],
            mpr_selecting_us: false,
        };
        core.on_hello("eth0", sender, &local_addr, &hello, now);
        let originator = NetAddr::host(sender);
        assert!(core.nhdp.db.neighbor(&originator).unwrap().is_symmetric());
    }

    #[test]
    fn local_originator_tc_is_dropped() {
        let mut core = bootstrap();
        let now = Instant::now();
        let tc = DecodedTc {
            originator: "10.0.0.1".parse().unwrap(),
            seqno: 1,
            hopcount: 0,
            hoplimit: 8,
            vtime_tlv: 0x33,
            mpr_types: vec![0],
            addresses: vec![],
        };
        assert!(!core.on_tc(&tc, 2, now));
    }

    #[test]
    fn tick_recomputes_routes_after_dirty_hello() {
        let mut core = bootstrap();
        let now = Instant::now();
        let local_addr: IpAddress = "10.0.0.1".parse().unwrap();
        let sender: IpAddress = "10.0.0.2".parse().unwrap();
        let hello = DecodedHello {
            sender_iface_addrs: vec![sender],
            validity: Duration::from_secs(6),
            interval: Duration::from_secs(2),
            addresses: vec![{
                let mut e = AddressBlockEntry::plain(local_addr);
                e.link_status = Some(crate::wire::LinkStatus::Symmetric);
                e
            }],
            willingness: vec![],
            mpr_selecting_us: false,
        };
        core.on_hello("eth0", sender, &local_addr, &hello, now);
        let mut driver = NullDriver { next: 0 };
        core.tick(now, &mut driver);
        assert!(core.fib.pending_count() > 0 || core.fib.installed_routes().next().is_some());
    }
}
