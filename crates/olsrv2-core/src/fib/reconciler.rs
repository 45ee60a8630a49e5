//! FIB reconciler (spec §4.6): diffs the target route set against what's
//! installed, submits ADD/REPLACE before DELETE, tracks outstanding
//! operations by sequence number, and retries transient failures.

use super::driver::{FibAckResult, FibDriver, FibErrorCode, FibOp, FibRoute};
use crate::addr::RouteKey;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Key identifying one installed-set slot (spec §4.6: `(family, table,
/// route_key, metric)`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct InstalledKey {
    table: u8,
    route_key: RouteKey,
    metric: u32,
}

fn installed_key(r: &FibRoute) -> InstalledKey {
    InstalledKey { table: r.table, route_key: r.key, metric: r.metric }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Install,
    Remove,
}

struct Pending {
    kind: PendingKind,
    route: FibRoute,
    attempt: u32,
    submitted_at: Instant,
}

const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub struct FibReconciler {
    installed: BTreeMap<InstalledKey, FibRoute>,
    pending: BTreeMap<u64, Pending>,
    retry_queue: Vec<(Instant, PendingKind, FibRoute)>,
    next_seq: u64,
}

impl Default for FibReconciler {
    fn default() -> Self {
        FibReconciler {
            installed: BTreeMap::new(),
            pending: BTreeMap::new(),
            retry_queue: Vec::new(),
            next_seq: 1,
        }
    }
}

impl FibReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn installed_routes(&self) -> impl Iterator<Item = &FibRoute> {
        self.installed.values()
    }

    /// Diffs `target` against the installed set and submits adds/replaces
    /// before deletes through `driver`, as spec §4.6 step 2-3 requires.
    pub fn reconcile(&mut self, target: &[FibRoute], driver: &mut dyn FibDriver) {
        let target_map: BTreeMap<InstalledKey, FibRoute> =
            target.iter().cloned().map(|r| (installed_key(&r), r)).collect();

        let mut to_install = Vec::new();
        for (key, route) in &target_map {
            match self.installed.get(key) {
                Some(existing) if existing == route => {}
                Some(_) => to_install.push((FibOp::Replace, route.clone())),
                None => to_install.push((FibOp::Add, route.clone())),
            }
        }
        let to_delete: Vec<FibRoute> = self
            .installed
            .iter()
            .filter(|(key, _)| !target_map.contains_key(key))
            .map(|(_, r)| r.clone())
            .collect();

        for (op, route) in to_install {
            self.submit(op, route, driver);
        }
        for route in to_delete {
            self.submit(FibOp::Delete, route, driver);
        }
    }

    fn submit(&mut self, op: FibOp, route: FibRoute, driver: &mut dyn FibDriver) {
        let seq = driver.submit(op, route.clone());
        let kind = if op == FibOp::Delete { PendingKind::Remove } else { PendingKind::Install };
        debug!(seq, op = ?op, dst = %route.key, "fib op submitted");
        self.pending.insert(seq, Pending { kind, route, attempt: 1, submitted_at: Instant::now() });
    }

    /// Drains acks from `driver`, updating the installed set and queuing
    /// retries for transient failures (spec §4.6 step 4).
    pub fn drain_acks(&mut self, driver: &mut dyn FibDriver) {
        let acks = driver.drain_acks();
        for (seq, result) in acks {
            let Some(pending) = self.pending.remove(&seq) else {
                // Cancelled or already-processed sequence; ignore a late
                // ack (spec §5 cancellation).
                continue;
            };
            self.apply_ack(pending, result);
        }
    }

    fn apply_ack(&mut self, pending: Pending, result: FibAckResult) {
        let key = installed_key(&pending.route);
        match (pending.kind, result) {
            (PendingKind::Install, Ok(())) | (PendingKind::Install, Err(FibErrorCode::Eexist)) => {
                self.installed.insert(key, pending.route);
            }
            (PendingKind::Remove, Ok(()))
            | (PendingKind::Remove, Err(FibErrorCode::Esrch))
            | (PendingKind::Remove, Err(FibErrorCode::Enoent)) => {
                self.installed.remove(&key);
            }
            (kind, Err(code)) => {
                warn!(dst = %pending.route.key, code = ?code, attempt = pending.attempt, "fib op failed, scheduling retry");
                let backoff = backoff_for(pending.attempt);
                self.retry_queue.push((pending.submitted_at + backoff, kind, pending.route));
            }
        }
    }

    /// Resubmits any retry whose backoff has elapsed (spec §4.6 step 4:
    /// "schedule a single retry after `retry_backoff`").
    pub fn drive_retries(&mut self, now: Instant, driver: &mut dyn FibDriver) {
        let mut remaining = Vec::new();
        let due_entries: Vec<_> = self.retry_queue.drain(..).collect();
        for (due, kind, route) in due_entries {
            if due <= now {
                let op = match kind {
                    PendingKind::Install => FibOp::Replace,
                    PendingKind::Remove => FibOp::Delete,
                };
                self.submit(op, route, driver);
            } else {
                remaining.push((due, kind, route));
            }
        }
        self.retry_queue = remaining;
    }

    /// Shutdown flush (spec §4.6 step 5): deletes every installed route
    /// and waits for acks up to `grace_period`.
    pub fn shutdown_flush(&mut self, driver: &mut dyn FibDriver, grace_period: Duration) {
        let routes: Vec<FibRoute> = self.installed.values().cloned().collect();
        for route in routes {
            self.submit(FibOp::Delete, route, driver);
        }
        let deadline = Instant::now() + grace_period;
        while !self.pending.is_empty() && Instant::now() < deadline {
            self.drain_acks(driver);
        }
        if !self.pending.is_empty() {
            warn!(outstanding = self.pending.len(), "fib shutdown flush timed out");
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

fn backoff_for(attempt: u32) -> Duration {
    let secs = 1u64.checked_shl(attempt.min(8)).unwrap_or(u64::MAX);
    Duration::from_secs(secs).min(MAX_BACKOFF)
}
