//! Typed configuration surface (spec §6.4): parses the named external
//! sections into structs the rest of the core consumes directly, and
//! supports partial-success reload (spec §7).

use crate::addr::RouteKey;
use crate::error::{CoreError, Result};
use sonic_types::IpPrefix;
use std::str::FromStr;
use std::time::Duration;

/// `[olsrv2]` section.
#[derive(Debug, Clone)]
pub struct Olsrv2Config {
    pub tc_interval: Duration,
    pub tc_validity: Duration,
    /// How long a NHDP link stays in LOST after its HEARD/SYM timer
    /// expires before it is dropped entirely (spec §4.2 "LOST removed
    /// after VTIME"); distinct from `tc_validity`, which governs TC-node
    /// freshness instead of link freshness.
    pub nhdp_hold_time: Duration,
    pub forward_hold_time: Duration,
    pub processing_hold_time: Duration,
    pub advertisement_hold_time_factor: u8,
    pub nhdp_routable: bool,
    pub routable_acl: bool,
    pub lans: Vec<LanConfig>,
}

impl Default for Olsrv2Config {
    fn default() -> Self {
        Olsrv2Config {
            tc_interval: Duration::from_secs(5),
            tc_validity: Duration::from_secs(300),
            nhdp_hold_time: Duration::from_secs(3),
            forward_hold_time: Duration::from_secs(1),
            processing_hold_time: Duration::from_secs(1),
            advertisement_hold_time_factor: 3,
            nhdp_routable: true,
            routable_acl: true,
            lans: Vec::new(),
        }
    }
}

/// One `lan` entry: `prefix [src=P] [metric=M] [dist=D] [domain=N|all]`.
#[derive(Debug, Clone)]
pub struct LanConfig {
    pub key: RouteKey,
    pub metric: u32,
    pub distance: u8,
    pub domain: Option<u8>,
}

impl FromStr for LanConfig {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let dst_str = parts
            .next()
            .ok_or_else(|| CoreError::parse("lan entry missing destination prefix"))?;
        let dst: IpPrefix = dst_str
            .parse()
            .map_err(|_| CoreError::parse(format!("invalid lan prefix: {dst_str}")))?;

        let mut key = RouteKey::destination_only(dst);
        let mut metric = 1u32;
        let mut distance = 1u8;
        let mut domain = None;

        for field in parts {
            let (name, value) = field
                .split_once('=')
                .ok_or_else(|| CoreError::parse(format!("malformed lan field: {field}")))?;
            match name {
                "src" => {
                    let src: IpPrefix = value
                        .parse()
                        .map_err(|_| CoreError::parse(format!("invalid lan src: {value}")))?;
                    key = RouteKey::source_specific(dst, src);
                }
                "metric" => {
                    metric = value
                        .parse()
                        .map_err(|_| CoreError::parse(format!("invalid lan metric: {value}")))?;
                }
                "dist" => {
                    distance = value
                        .parse()
                        .map_err(|_| CoreError::parse(format!("invalid lan dist: {value}")))?;
                }
                "domain" => {
                    domain = if value == "all" {
                        Some(crate::domain::DOMAIN_ALL)
                    } else {
                        Some(
                            value
                                .parse()
                                .map_err(|_| CoreError::parse(format!("invalid lan domain: {value}")))?,
                        )
                    };
                }
                other => return Err(CoreError::parse(format!("unknown lan field: {other}"))),
            }
        }

        Ok(LanConfig { key, metric, distance, domain })
    }
}

/// `[domain=N]` section.
#[derive(Debug, Clone)]
pub struct DomainConfig {
    pub ext: u8,
    pub srcip_routes: bool,
    pub protocol: u8,
    pub table: u8,
    pub distance: u8,
    pub source_specific: bool,
}

impl DomainConfig {
    /// Validates the constrained fields (spec §6.4: `protocol` 1..254,
    /// `table` 1..254, `distance` 1..255).
    pub fn validate(&self) -> Result<()> {
        if !(1..=254).contains(&self.protocol) {
            return Err(CoreError::out_of_range("protocol", self.protocol, "1..254"));
        }
        if !(1..=254).contains(&self.table) {
            return Err(CoreError::out_of_range("table", self.table, "1..254"));
        }
        if self.distance == 0 {
            return Err(CoreError::out_of_range("distance", self.distance, "1..255"));
        }
        Ok(())
    }
}

/// `[layer2_config]` sub-keys under `[interface=X]`.
#[derive(Debug, Clone, Default)]
pub struct Layer2Config {
    pub l2net: Vec<String>,
    pub l2net_ip: Vec<String>,
    pub l2default: Vec<String>,
    pub l2neighbor: Vec<String>,
    pub l2neighbor_ip: Vec<String>,
    pub l2destination: Vec<String>,
}

/// `[interface=X]` section.
#[derive(Debug, Clone)]
pub struct InterfaceConfig {
    pub name: String,
    pub layer2: Layer2Config,
}

/// Aggregates every configured section; the unit Core bootstraps from and
/// reloads against (spec §6.4, §7).
#[derive(Debug, Clone, Default)]
pub struct ConfigSet {
    pub olsrv2: Olsrv2Config,
    pub domains: Vec<DomainConfig>,
    pub interfaces: Vec<InterfaceConfig>,
}

impl ConfigSet {
    /// Parses the `[section]`-delimited text format: `[olsrv2]`,
    /// `[domain=N]`, `[interface=NAME]` sections of `key = value` lines,
    /// `#`-prefixed comments and blank lines ignored. Unknown keys inside
    /// a known section are rejected; an unknown section name is rejected.
    pub fn parse(text: &str) -> Result<ConfigSet> {
        let mut config = ConfigSet::default();
        let mut section = Section::Olsrv2;
        let mut current_domain: Option<DomainConfig> = None;
        let mut current_iface: Option<InterfaceConfig> = None;

        for raw_line in text.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                flush_section(&mut config, &mut current_domain, &mut current_iface);
                section = match header {
                    "olsrv2" => Section::Olsrv2,
                    _ if header.starts_with("domain=") => {
                        let ext: u8 = header[7..]
                            .parse()
                            .map_err(|_| CoreError::parse(format!("invalid domain header: {header}")))?;
                        current_domain = Some(DomainConfig {
                            ext,
                            srcip_routes: false,
                            protocol: 100,
                            table: 254,
                            distance: 115,
                            source_specific: false,
                        });
                        Section::Domain
                    }
                    _ if header.starts_with("interface=") => {
                        current_iface = Some(InterfaceConfig {
                            name: header[10..].to_string(),
                            layer2: Layer2Config::default(),
                        });
                        Section::Interface
                    }
                    other => return Err(CoreError::parse(format!("unknown section: {other}"))),
                };
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| CoreError::parse(format!("malformed config line: {line}")))?;

            match section {
                Section::Olsrv2 => apply_olsrv2_key(&mut config.olsrv2, key, value)?,
                Section::Domain => {
                    let domain = current_domain
                        .as_mut()
                        .expect("section header always sets current_domain");
                    apply_domain_key(domain, key, value)?;
                }
                Section::Interface => {
                    let iface = current_iface
                        .as_mut()
                        .expect("section header always sets current_iface");
                    apply_interface_key(iface, key, value)?;
                }
            }
        }
        flush_section(&mut config, &mut current_domain, &mut current_iface);
        Ok(config)
    }

    /// Validates every domain independently, keeping the previous
    /// parameters for any domain that fails (spec §7: "runtime config
    /// reload accepts partial success... rolled back... and logged").
    /// Returns the accepted config set plus the rejected domain indices.
    pub fn apply_reload(previous: &ConfigSet, proposed: ConfigSet) -> (ConfigSet, Vec<(u8, CoreError)>) {
        let mut rejected = Vec::new();
        let mut domains = Vec::new();
        for domain in proposed.domains {
            match domain.validate() {
                Ok(()) => domains.push(domain),
                Err(e) => {
                    tracing::warn!(domain = domain.ext, error = %e, "domain config rejected, keeping previous");
                    if let Some(prev) = previous.domains.iter().find(|d| d.ext == domain.ext) {
                        domains.push(prev.clone());
                    }
                    rejected.push((domain.ext, e));
                }
            }
        }
        (
            ConfigSet { olsrv2: proposed.olsrv2, domains, interfaces: proposed.interfaces },
            rejected,
        )
    }

    /// Startup validation: the daemon refuses to run on an invalid config
    /// (spec §7 "On startup, the daemon refuses to run with an invalid
    /// config").
    pub fn validate(&self) -> Result<()> {
        if self.olsrv2.advertisement_hold_time_factor == 0 {
            return Err(CoreError::out_of_range(
                "advertisement_hold_time_factor",
                self.olsrv2.advertisement_hold_time_factor,
                "1..255",
            ));
        }
        for domain in &self.domains {
            domain.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Olsrv2,
    Domain,
    Interface,
}

fn flush_section(
    config: &mut ConfigSet,
    current_domain: &mut Option<DomainConfig>,
    current_iface: &mut Option<InterfaceConfig>,
) {
    if let Some(domain) = current_domain.take() {
        config.domains.push(domain);
    }
    if let Some(iface) = current_iface.take() {
        config.interfaces.push(iface);
    }
}

fn apply_olsrv2_key(olsrv2: &mut Olsrv2Config, key: &str, value: &str) -> Result<()> {
    let secs = |v: &str| -> Result<Duration> {
        v.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| CoreError::parse(format!("invalid duration: {v}")))
    };
    let flag = |v: &str| -> Result<bool> {
        v.parse::<bool>()
            .map_err(|_| CoreError::parse(format!("invalid bool: {v}")))
    };
    match key {
        "tc_interval" => olsrv2.tc_interval = secs(value)?,
        "tc_validity" => olsrv2.tc_validity = secs(value)?,
        "nhdp_hold_time" => olsrv2.nhdp_hold_time = secs(value)?,
        "forward_hold_time" => olsrv2.forward_hold_time = secs(value)?,
        "processing_hold_time" => olsrv2.processing_hold_time = secs(value)?,
        "advertisement_hold_time_factor" => {
            olsrv2.advertisement_hold_time_factor = value
                .parse()
                .map_err(|_| CoreError::parse(format!("invalid hold factor: {value}")))?;
        }
        "nhdp_routable" => olsrv2.nhdp_routable = flag(value)?,
        "routable_acl" => olsrv2.routable_acl = flag(value)?,
        "lan" => olsrv2.lans.push(value.parse()?),
        other => return Err(CoreError::parse(format!("unknown olsrv2 key: {other}"))),
    }
    Ok(())
}

fn apply_domain_key(domain: &mut DomainConfig, key: &str, value: &str) -> Result<()> {
    let byte = |v: &str| -> Result<u8> {
        v.parse().map_err(|_| CoreError::parse(format!("invalid value: {v}")))
    };
    match key {
        "srcip_routes" => {
            domain.srcip_routes = value
                .parse()
                .map_err(|_| CoreError::parse(format!("invalid bool: {value}")))?
        }
        "protocol" => domain.protocol = byte(value)?,
        "table" => domain.table = byte(value)?,
        "distance" => domain.distance = byte(value)?,
        "source_specific" => {
            domain.source_specific = value
                .parse()
                .map_err(|_| CoreError::parse(format!("invalid bool: {value}")))?
        }
        other => return Err(CoreError::parse(format!("unknown domain key: {other}"))),
    }
    Ok(())
}

fn apply_interface_key(iface: &mut InterfaceConfig, key: &str, value: &str) -> Result<()> {
    let list = || value.split(',').map(str::to_string).collect::<Vec<_>>();
    match key {
        "l2net" => iface.layer2.l2net = list(),
        "l2net_ip" => iface.layer2.l2net_ip = list(),
        "l2default" => iface.layer2.l2default = list(),
        "l2neighbor" => iface.layer2.l2neighbor = list(),
        "l2neighbor_ip" => iface.layer2.l2neighbor_ip = list(),
        "l2destination" => iface.layer2.l2destination = list(),
        other => return Err(CoreError::parse(format!("unknown interface key: {other}"))),
    }
    Ok(())
}
