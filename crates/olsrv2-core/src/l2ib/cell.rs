//! The L2IB data cell: a tagged value plus the origin that last wrote it
//! (spec §3.2 write rule, §8 T4).

use super::origin::Origin;
use crate::addr::NetAddr;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    None,
    I64(i64),
    Bool(bool),
    NetAddr(NetAddr),
}

impl CellValue {
    pub fn is_none(&self) -> bool {
        matches!(self, CellValue::None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DataCell {
    value: CellValue,
    origin: Option<Origin>,
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::None
    }
}

impl DataCell {
    pub fn empty() -> Self {
        DataCell {
            value: CellValue::None,
            origin: None,
        }
    }

    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.origin.is_none()
    }

    /// Write rule (spec §3.2, §8 T4): overwrites iff the cell is empty or
    /// `current.origin.priority <= writer.priority`. Returns whether the
    /// write took effect.
    pub fn set(&mut self, writer: &Origin, value: CellValue) -> bool {
        let may_overwrite = match &self.origin {
            None => true,
            Some(cur) => cur.priority <= writer.priority,
        };
        if may_overwrite {
            self.value = value;
            self.origin = Some(writer.clone());
        }
        may_overwrite
    }

    /// Clears the cell if it is currently owned by `origin` (used by
    /// `origin_remove`/restricted `net_remove`).
    pub fn clear_if_owned_by(&mut self, origin: &Origin) -> bool {
        if self.origin.as_ref() == Some(origin) {
            *self = DataCell::empty();
            true
        } else {
            false
        }
    }

    /// Rewrites the owning origin pointer from `old` to `new`, leaving the
    /// value unchanged (spec §3.2 invariant iv, §8 T5).
    pub fn relabel(&mut self, new: &Origin, old: &Origin) -> bool {
        if self.origin.as_ref() == Some(old) {
            self.origin = Some(new.clone());
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::l2ib::origin::OriginPriority;

    fn origin(name: &str, prio: OriginPriority) -> Origin {
        Origin::new(name, prio, false)
    }

    #[test]
    fn empty_cell_accepts_any_write() {
        let mut cell = DataCell::empty();
        let low = origin("eth_listener", OriginPriority::Unreliable);
        assert!(cell.set(&low, CellValue::I64(6_000_000)));
        assert_eq!(cell.value(), &CellValue::I64(6_000_000));
    }

    #[test]
    fn higher_priority_overwrites_lower() {
        let mut cell = DataCell::empty();
        let low = origin("eth_listener", OriginPriority::Unreliable);
        let high = origin("l2_config", OriginPriority::Configured);
        cell.set(&low, CellValue::I64(6_000_000));
        assert!(cell.set(&high, CellValue::I64(54_000_000)));
        assert_eq!(cell.value(), &CellValue::I64(54_000_000));
        assert_eq!(cell.origin().unwrap().name(), "l2_config");
    }

    #[test]
    fn lower_priority_write_is_rejected() {
        let mut cell = DataCell::empty();
        let low = origin("eth_listener", OriginPriority::Unreliable);
        let high = origin("l2_config", OriginPriority::Configured);
        cell.set(&high, CellValue::I64(54_000_000));
        assert!(!cell.set(&low, CellValue::I64(1_000_000)));
        assert_eq!(cell.value(), &CellValue::I64(54_000_000));
        assert_eq!(cell.origin().unwrap().name(), "l2_config");
    }

    #[test]
    fn equal_priority_same_origin_overwrites() {
        let mut cell = DataCell::empty();
        let o = origin("cfg", OriginPriority::Configured);
        cell.set(&o, CellValue::I64(1));
        assert!(cell.set(&o, CellValue::I64(2)));
        assert_eq!(cell.value(), &CellValue::I64(2));
    }

    #[test]
    fn relabel_preserves_value() {
        let mut cell = DataCell::empty();
        let old = origin("prov@prev", OriginPriority::Configured);
        let new = origin("prov", OriginPriority::Configured);
        cell.set(&old, CellValue::Bool(true));
        assert!(cell.relabel(&new, &old));
        assert_eq!(cell.value(), &CellValue::Bool(true));
        assert_eq!(cell.origin().unwrap().name(), "prov");
    }

    #[test]
    fn relabel_is_noop_for_unrelated_origin() {
        let mut cell = DataCell::empty();
        let other = origin("someone_else", OriginPriority::Configured);
        let old = origin("prov@prev", OriginPriority::Configured);
        let new = origin("prov", OriginPriority::Configured);
        cell.set(&other, CellValue::Bool(false));
        assert!(!cell.relabel(&new, &old));
        assert_eq!(cell.origin().unwrap().name(), "someone_else");
    }
}
