//! Metric indices, metric metadata/text parsing, and the RFC 7181
//! compressed-cost encoding (spec §3.2, §4.1, §6.1, §9).
//!
//! Two distinct numeric domains live here:
//!
//! - L2IB data cells hold raw signed 64-bit values (bitrate in bps, signal
//!   in milli-dBm, ...) identified by [`NetMetricIndex`]/[`NeighMetricIndex`],
//!   parsed from and formatted to human text via [`MetricMetadata`].
//! - NHDP/TC routing costs are a single [`RoutingCost`], carried on the
//!   wire in the RFC 7181 12-bit exponent/mantissa compressed form
//!   (`rfc7181` module) so every pluggable metric handler shares one wire
//!   representation regardless of what it measures internally.

use crate::error::CoreError;
use std::cmp::Ordering;
use std::fmt;

/// Per-interface metric indices (spec §3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetMetricIndex {
    Frequency1,
    Frequency2,
    Bandwidth1,
    Bandwidth2,
    Noise,
    ChannelActive,
    ChannelBusy,
    ChannelRx,
    ChannelTx,
    TxBcBitrate,
    Mtu,
    McsByProbing,
    RxOnlyUnicast,
    TxOnlyUnicast,
    RadioMultihop,
    BandUpDown,
}

impl NetMetricIndex {
    pub const ALL: &'static [NetMetricIndex] = &[
        NetMetricIndex::Frequency1,
        NetMetricIndex::Frequency2,
        NetMetricIndex::Bandwidth1,
        NetMetricIndex::Bandwidth2,
        NetMetricIndex::Noise,
        NetMetricIndex::ChannelActive,
        NetMetricIndex::ChannelBusy,
        NetMetricIndex::ChannelRx,
        NetMetricIndex::ChannelTx,
        NetMetricIndex::TxBcBitrate,
        NetMetricIndex::Mtu,
        NetMetricIndex::McsByProbing,
        NetMetricIndex::RxOnlyUnicast,
        NetMetricIndex::TxOnlyUnicast,
        NetMetricIndex::RadioMultihop,
        NetMetricIndex::BandUpDown,
    ];

    /// True for the boolean flag metrics (spec §3.2: "boolean flags").
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            NetMetricIndex::McsByProbing
                | NetMetricIndex::RxOnlyUnicast
                | NetMetricIndex::TxOnlyUnicast
                | NetMetricIndex::RadioMultihop
                | NetMetricIndex::BandUpDown
        )
    }

    pub fn metadata(&self) -> MetricMetadata {
        use NetMetricIndex::*;
        match self {
            Frequency1 | Frequency2 => MetricMetadata::new("Hz", 0, false),
            Bandwidth1 | Bandwidth2 => MetricMetadata::new("bit/s", 0, true),
            Noise => MetricMetadata::new("dBm", 2, false),
            ChannelActive | ChannelBusy | ChannelRx | ChannelTx => {
                MetricMetadata::new("%", 2, false)
            }
            TxBcBitrate => MetricMetadata::new("bit/s", 0, true),
            Mtu => MetricMetadata::new("byte", 0, false),
            McsByProbing | RxOnlyUnicast | TxOnlyUnicast | RadioMultihop | BandUpDown => {
                MetricMetadata::boolean()
            }
        }
    }
}

impl fmt::Display for NetMetricIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Per-neighbor metric indices (spec §3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighMetricIndex {
    TxSignal,
    RxSignal,
    TxBitrate,
    RxBitrate,
    TxMaxBitrate,
    RxMaxBitrate,
    TxBytes,
    RxBytes,
    TxFrames,
    RxFrames,
    TxThroughput,
    RxThroughput,
    TxRetries,
    RxRetries,
    TxFailed,
    RxFailed,
    TxRlq,
    RxRlq,
    RxBcBitrate,
    RxBcLoss,
    Latency,
    Resources,
    RadioHopcount,
    IpHopcount,
}

impl NeighMetricIndex {
    pub const ALL: &'static [NeighMetricIndex] = &[
        NeighMetricIndex::TxSignal,
        NeighMetricIndex::RxSignal,
        NeighMetricIndex::TxBitrate,
        NeighMetricIndex::RxBitrate,
        NeighMetricIndex::TxMaxBitrate,
        NeighMetricIndex::RxMaxBitrate,
        NeighMetricIndex::TxBytes,
        NeighMetricIndex::RxBytes,
        NeighMetricIndex::TxFrames,
        NeighMetricIndex::RxFrames,
        NeighMetricIndex::TxThroughput,
        NeighMetricIndex::RxThroughput,
        NeighMetricIndex::TxRetries,
        NeighMetricIndex::RxRetries,
        NeighMetricIndex::TxFailed,
        NeighMetricIndex::RxFailed,
        NeighMetricIndex::TxRlq,
        NeighMetricIndex::RxRlq,
        NeighMetricIndex::RxBcBitrate,
        NeighMetricIndex::RxBcLoss,
        NeighMetricIndex::Latency,
        NeighMetricIndex::Resources,
        NeighMetricIndex::RadioHopcount,
        NeighMetricIndex::IpHopcount,
    ];

    pub fn metadata(&self) -> MetricMetadata {
        use NeighMetricIndex::*;
        match self {
            TxSignal | RxSignal => MetricMetadata::new("dBm", 3, false),
            TxBitrate | RxBitrate | TxMaxBitrate | RxMaxBitrate | RxBcBitrate => {
                MetricMetadata::new("bit/s", 0, true)
            }
            TxBytes | RxBytes => MetricMetadata::new("byte", 0, true),
            TxFrames | RxFrames | TxRetries | RxRetries | TxFailed | RxFailed => {
                MetricMetadata::new("", 0, false)
            }
            TxThroughput | RxThroughput => MetricMetadata::new("bit/s", 0, true),
            TxRlq | RxRlq | Resources => MetricMetadata::new("%", 0, false),
            RxBcLoss => MetricMetadata::new("o/oo", 0, false),
            Latency => MetricMetadata::new("us", 0, false),
            RadioHopcount | IpHopcount => MetricMetadata::new("", 0, false),
        }
    }
}

impl fmt::Display for NeighMetricIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// `{unit, fraction, binary?}` parsing/formatting metadata for a metric
/// (spec §4.1 `data_from_string`). `fraction` bounds the number of decimal
/// digits accepted; the bare magnitude suffixes `K`/`M`/`G` are always
/// base-1000, and `binary` additionally accepts the IEC spelling
/// `Ki`/`Mi`/`Gi` as base-1024.
#[derive(Debug, Clone, Copy)]
pub struct MetricMetadata {
    pub unit: &'static str,
    pub fraction: u32,
    pub binary: bool,
    pub boolean: bool,
}

impl MetricMetadata {
    pub const fn new(unit: &'static str, fraction: u32, binary: bool) -> Self {
        MetricMetadata {
            unit,
            fraction,
            binary,
            boolean: false,
        }
    }

    pub const fn boolean() -> Self {
        MetricMetadata {
            unit: "",
            fraction: 0,
            binary: false,
            boolean: true,
        }
    }
}

/// Parses human input (e.g. `"54Mbit/s"`, `"12.5%"`, `"true"`) into the
/// scaled internal integer, honoring `meta`'s unit/fraction/binary
/// constraints. Fails with `CoreError::Parse` on any violation.
pub fn parse_metric_value(text: &str, meta: &MetricMetadata) -> Result<i64, CoreError> {
    let text = text.trim();
    if meta.boolean {
        return match text.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(1),
            "0" | "false" | "no" | "off" => Ok(0),
            _ => Err(CoreError::Parse(format!("not a boolean: {text:?}"))),
        };
    }

    let body = if meta.unit.is_empty() {
        text
    } else {
        text.strip_suffix(meta.unit)
            .ok_or_else(|| CoreError::Parse(format!("expected unit {:?} in {:?}", meta.unit, text)))?
            .trim_end()
    };

    let (numeric, multiplier) = split_magnitude_suffix(body, meta.binary)?;

    let dot = numeric.find('.');
    if let Some(dot) = dot {
        let decimals = numeric.len() - dot - 1;
        if decimals as u32 > meta.fraction {
            return Err(CoreError::Parse(format!(
                "{numeric:?} exceeds {} allowed decimal digits",
                meta.fraction
            )));
        }
    }

    let value: f64 = numeric
        .parse()
        .map_err(|_| CoreError::Parse(format!("not a number: {numeric:?}")))?;

    Ok((value * multiplier as f64).round() as i64)
}

/// Formats a scaled internal integer back to the canonical human text for
/// `meta` (used by the state-export console view).
pub fn format_metric_value(value: i64, meta: &MetricMetadata) -> String {
    if meta.boolean {
        return if value != 0 { "true" } else { "false" }.to_string();
    }
    if meta.unit.is_empty() {
        value.to_string()
    } else {
        format!("{value}{}", meta.unit)
    }
}

fn split_magnitude_suffix(body: &str, binary: bool) -> Result<(&str, u64), CoreError> {
    let letters: &[(&str, u32)] = &[("G", 3), ("M", 2), ("K", 1)];

    // A binary metric additionally recognizes the explicit IEC spelling
    // ("Mi") as base-1024; the bare letter ("M") is always base-1000, the
    // form `data_from_string` and every wire value actually uses.
    if binary {
        for (letter, power) in letters {
            if let Some(rest) = body.strip_suffix(&format!("{letter}i")) {
                return Ok((rest.trim_end(), 1024u64.pow(*power)));
            }
        }
    }
    for (letter, power) in letters {
        if let Some(rest) = body.strip_suffix(letter) {
            return Ok((rest.trim_end(), 1000u64.pow(*power)));
        }
    }
    Ok((body.trim_end(), 1))
}

/// A routing cost as carried internally by NHDP/TC/Router: strictly
/// positive for a usable edge, [`INFINITE`] meaning "no edge" (spec §4.5,
/// §9 serial-number analogue for metrics).
pub type RoutingCost = u32;

pub const INFINITE: RoutingCost = u32::MAX;

/// Contract every pluggable metric handler satisfies (spec §9): a name for
/// config lookup, a wire codec, a total order, and the threshold above
/// which a cost is considered unusable.
pub trait MetricHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn decode(&self, wire: u16) -> RoutingCost;
    fn encode(&self, cost: RoutingCost) -> u16;
    fn cmp(&self, a: RoutingCost, b: RoutingCost) -> Ordering {
        a.cmp(&b)
    }
    fn infinite_threshold(&self) -> RoutingCost {
        INFINITE
    }
}

/// The default metric handler: RFC 7181 §6.1's 12-bit compressed encoding
/// directly as the routing cost, so `decode`/`encode` are the identity
/// modulo quantization.
#[derive(Debug, Default)]
pub struct Rfc7181HopCount;

impl MetricHandler for Rfc7181HopCount {
    fn name(&self) -> &'static str {
        "rfc7181_hopcount"
    }

    fn decode(&self, wire: u16) -> RoutingCost {
        rfc7181::decode(wire)
    }

    fn encode(&self, cost: RoutingCost) -> u16 {
        rfc7181::encode(cost)
    }
}

/// RFC 7181 12-bit exponent/mantissa compressed metric encoding (spec
/// §6.1, §9). A 5-bit exponent and 7-bit mantissa pack into the low 12
/// bits of the 16-bit wire field; the all-ones pattern decodes to
/// [`INFINITE`].
pub mod rfc7181 {
    use super::{RoutingCost, INFINITE};

    const MANTISSA_BITS: u32 = 7;
    const EXPONENT_BITS: u32 = 5;
    const MANTISSA_MAX: u32 = (1 << MANTISSA_BITS) - 1;
    const EXPONENT_MAX: u32 = (1 << EXPONENT_BITS) - 1;
    const WIRE_MASK: u16 = (1 << (MANTISSA_BITS + EXPONENT_BITS)) - 1;

    /// Decodes a 12-bit packed wire value (low bits of `wire`) into a
    /// routing cost: `(256 + mantissa) << exponent >> 8` — quantized but
    /// monotonic with the packed value, matching the RFC's intent of
    /// emphasizing small values.
    pub fn decode(wire: u16) -> RoutingCost {
        let packed = wire & WIRE_MASK;
        if packed == WIRE_MASK {
            return INFINITE;
        }
        let exponent = (packed >> MANTISSA_BITS) as u32;
        let mantissa = (packed & MANTISSA_MAX as u16) as u32;
        (((256 + mantissa) << exponent) >> 8) as RoutingCost
    }

    /// Encodes a routing cost into the 12-bit packed form, rounding down
    /// to the nearest representable value (never overestimates a cost).
    pub fn encode(cost: RoutingCost) -> u16 {
        if cost >= INFINITE || cost == 0 {
            return if cost == 0 { 0 } else { WIRE_MASK };
        }
        let mut exponent = 0u32;
        let mut scaled = (cost as u64) << 8;
        while scaled >= (512 << exponent) && exponent < EXPONENT_MAX {
            exponent += 1;
        }
        let base = 256u64 << exponent;
        let mantissa = if scaled > base {
            (((scaled - base) >> exponent).min(MANTISSA_MAX as u64)) as u32
        } else {
            0
        };
        (((exponent as u16) << MANTISSA_BITS) | mantissa as u16) & WIRE_MASK
    }

    /// Decodes the RFC 5497 VTIME/ITIME message TLV value into a
    /// validity/interval duration, selected by hopcount as the spec's
    /// "decoded from the VTIME TLV using hopcount-indexed selection"
    /// (§4.4) calls for: hopcount only widens the coarse exponent bucket
    /// so far-forwarded TCs get proportionally longer validity.
    pub fn vtime_from_tlv(wire: u8, hopcount: u8) -> std::time::Duration {
        let exponent = (wire >> 4) as u32;
        let mantissa = (wire & 0x0f) as u32;
        let millis = ((16 + mantissa) << exponent) * 1000 / 16;
        let scaled = millis as u64 * (1 + hopcount as u64 / 8);
        std::time::Duration::from_millis(scaled)
    }

}
