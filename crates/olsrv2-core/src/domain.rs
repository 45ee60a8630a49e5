//! Routing domains (spec §3.5).

use crate::metric::{MetricHandler, Rfc7181HopCount};
use crate::mpr::{DefaultMprHandler, MprHandler};
use std::sync::Arc;

/// A fixed domain identifier reserved for LANs that apply to every domain
/// (spec §3.5 "A fixed domain `ALL` collects LANs that apply to every
/// domain").
pub const DOMAIN_ALL: u8 = 255;

/// External identifier plus the pluggable metric/MPR handlers selected for
/// this domain.
pub struct Domain {
    pub ext: u8,
    pub metric_handler_name: &'static str,
    pub mpr_handler_name: &'static str,
    pub metric: Arc<dyn MetricHandler>,
    pub mpr: Arc<dyn MprHandler>,
    pub params: RoutingDomainParams,
}

impl Domain {
    pub fn new(ext: u8, params: RoutingDomainParams) -> Self {
        let metric: Arc<dyn MetricHandler> = Arc::new(Rfc7181HopCount);
        let mpr: Arc<dyn MprHandler> = Arc::new(DefaultMprHandler);
        Domain {
            ext,
            metric_handler_name: metric.name(),
            mpr_handler_name: mpr.name(),
            metric,
            mpr,
            params,
        }
    }

    pub fn with_handlers(
        ext: u8,
        params: RoutingDomainParams,
        metric: Arc<dyn MetricHandler>,
        mpr: Arc<dyn MprHandler>,
    ) -> Self {
        Domain {
            ext,
            metric_handler_name: metric.name(),
            mpr_handler_name: mpr.name(),
            metric,
            mpr,
            params,
        }
    }
}

/// `{protocol_id, kernel_table_id, distance, use_srcip_in_routes,
/// source_specific}` (spec §3.5).
#[derive(Debug, Clone, Copy)]
pub struct RoutingDomainParams {
    pub protocol_id: u8,
    pub kernel_table_id: u8,
    pub distance: u8,
    pub use_srcip_in_routes: bool,
    pub source_specific: bool,
}

impl Default for RoutingDomainParams {
    fn default() -> Self {
        RoutingDomainParams {
            protocol_id: 100,
            kernel_table_id: 254, // "main"
            distance: 115,
            use_srcip_in_routes: false,
            source_specific: false,
        }
    }
}

/// `(domain, route_key, metric, distance)` configured locally, advertised
/// in outbound TC and injected as a pseudo-endpoint in route computation
/// (spec §3.4 Locally Attached Network).
#[derive(Debug, Clone)]
pub struct LocalAttachedNetwork {
    pub domain: u8,
    pub key: crate::addr::RouteKey,
    pub metric: crate::metric::RoutingCost,
    pub distance: u8,
}

/// Holds every configured domain plus the `ALL`-domain LAN set, keyed by
/// external identifier. Owned by `Core`.
#[derive(Default)]
pub struct DomainTable {
    domains: std::collections::BTreeMap<u8, Domain>,
    lans: Vec<LocalAttachedNetwork>,
}

impl DomainTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, domain: Domain) {
        self.domains.insert(domain.ext, domain);
    }

    pub fn get(&self, ext: u8) -> Option<&Domain> {
        self.domains.get(&ext)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Domain> {
        self.domains.values()
    }

    pub fn add_lan(&mut self, lan: LocalAttachedNetwork) {
        self.lans.push(lan);
    }

    /// LANs that apply to `domain`: those configured for it specifically
    /// plus every `DOMAIN_ALL` LAN.
    pub fn lans_for(&self, domain: u8) -> impl Iterator<Item = &LocalAttachedNetwork> {
        self.lans
            .iter()
            .filter(move |l| l.domain == domain || l.domain == DOMAIN_ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::RouteKey;

    #[test]
    fn lans_for_domain_includes_all_domain_lans() {
        let mut table = DomainTable::new();
        table.add_lan(LocalAttachedNetwork {
            domain: DOMAIN_ALL,
            key: RouteKey::destination_only("10.0.0.0/8".parse().unwrap()),
            metric: 1,
            distance: 1,
        });
        table.add_lan(LocalAttachedNetwork {
            domain: 3,
            key: RouteKey::destination_only("192.168.0.0/16".parse().unwrap()),
            metric: 1,
            distance: 1,
        });
        assert_eq!(table.lans_for(0).count(), 1);
        assert_eq!(table.lans_for(3).count(), 2);
    }
}
