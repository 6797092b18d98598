// Connection registry — dual-indexed store of live connections.
//
// Every record is owned jointly by the two indexes through an Rc handle,
// one strong reference per key path. Removal drops both handles in the same
// call, so a record can never be reachable by one key and gone from the
// other.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::model::{ConnStats, ConnTuple, SocketState};
use crate::system::conn_table::RawConnection;

/// How many consecutive sweeps a record survives without being observed.
/// Two, so a single transient read hiccup on the kernel table does not
/// destroy the statistics of a connection that is still alive.
const GRACE_SWEEPS: u8 = 2;

/// One tracked connection.
///
/// Created on first observation and never reallocated: the consuming
/// statistics layer relies on the `stats` slot living at the same record
/// for as long as the socket does.
#[derive(Debug)]
pub struct ConnRecord {
    socket_id: u64,
    tuple: ConnTuple,
    state: SocketState,
    active: Cell<bool>,
    lives: Cell<u8>,
    /// Opaque statistics payload. The registry zeroes it at creation and
    /// preserves it afterwards; only the consumer writes here.
    pub stats: RefCell<ConnStats>,
}

impl ConnRecord {
    pub fn socket_id(&self) -> u64 {
        self.socket_id
    }

    pub fn tuple(&self) -> ConnTuple {
        self.tuple
    }

    pub fn state(&self) -> SocketState {
        self.state
    }

    /// Whether the record was observed in the current tick's table passes.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

/// Shared handle to a registry record.
///
/// Handles are valid for the current tick only: holding one across a
/// `sweep` keeps a removed record's memory alive but the registry will no
/// longer know it. Consumers that need durable data take the stats payload
/// by value.
pub type ConnHandle = Rc<ConnRecord>;

/// The set of live connections, keyed independently by socket inode and by
/// 4-tuple. Lookups by either key are O(1); the socket-id index is primary.
#[derive(Default)]
pub struct Registry {
    by_id: FxHashMap<u64, ConnHandle>,
    by_tuple: FxHashMap<ConnTuple, ConnHandle>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Record one observation from a kernel table pass.
    ///
    /// If the socket inode is already known the record is only marked
    /// active — tuple, state and stats are left untouched, the inode being
    /// the authoritative identity. Otherwise a new record is inserted under
    /// both keys. Returns whether a record was created.
    pub fn upsert(&mut self, raw: &RawConnection) -> bool {
        if let Some(rec) = self.by_id.get(&raw.socket_id) {
            rec.active.set(true);
            return false;
        }

        let rec = Rc::new(ConnRecord {
            socket_id: raw.socket_id,
            tuple: raw.tuple,
            state: raw.state,
            active: Cell::new(true),
            lives: Cell::new(GRACE_SWEEPS),
            stats: RefCell::new(ConnStats::default()),
        });
        self.by_id.insert(raw.socket_id, Rc::clone(&rec));
        // A recycled tuple repoints the secondary index at the newer
        // socket; the superseded record stays reachable by id until swept.
        self.by_tuple.insert(raw.tuple, rec);
        true
    }

    pub fn get_by_id(&self, socket_id: u64) -> Option<&ConnHandle> {
        self.by_id.get(&socket_id)
    }

    pub fn get_by_tuple(&self, tuple: &ConnTuple) -> Option<&ConnHandle> {
        self.by_tuple.get(tuple)
    }

    /// Age out records not observed this tick. Call exactly once per tick,
    /// after all table passes.
    ///
    /// Iterates the socket-id index only: every record has exactly one
    /// entry there, so each record is evaluated exactly once per sweep no
    /// matter how many keys point at it. An observed record is re-armed
    /// (active cleared, grace budget restored); an unobserved one loses a
    /// life and is dropped from both indexes when none remain. Returns the
    /// number of records removed.
    pub fn sweep(&mut self) -> usize {
        let mut dead: Vec<ConnHandle> = Vec::new();

        for rec in self.by_id.values() {
            if rec.active.get() {
                rec.active.set(false);
                rec.lives.set(GRACE_SWEEPS);
            } else {
                let left = rec.lives.get().saturating_sub(1);
                rec.lives.set(left);
                if left == 0 {
                    dead.push(Rc::clone(rec));
                }
            }
        }

        let removed = dead.len();
        for rec in dead {
            let _ = self.by_id.remove(&rec.socket_id);
            // Only drop the tuple entry if it still points at this record;
            // a recycled tuple may already belong to a newer socket.
            if self
                .by_tuple
                .get(&rec.tuple)
                .is_some_and(|cur| Rc::ptr_eq(cur, &rec))
            {
                let _ = self.by_tuple.remove(&rec.tuple);
            }
        }
        removed
    }

    /// Read-only view of the live records, unordered. Handles must not be
    /// retained past the next `sweep`.
    pub fn connections(&self) -> impl Iterator<Item = &ConnHandle> {
        self.by_id.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Protocol;
    use std::net::Ipv4Addr;

    fn raw(socket_id: u64, local_port: u16) -> RawConnection {
        RawConnection {
            socket_id,
            tuple: ConnTuple {
                local: Ipv4Addr::new(127, 0, 0, 1),
                local_port,
                remote: Ipv4Addr::new(10, 0, 0, 2),
                remote_port: 443,
                proto: Protocol::Tcp,
            },
            state: SocketState::Established,
        }
    }

    #[test]
    fn upsert_creates_then_refreshes() {
        let mut reg = Registry::new();
        assert!(reg.upsert(&raw(20911, 5000)));
        assert!(!reg.upsert(&raw(20911, 5000)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn record_reachable_by_both_keys() {
        let mut reg = Registry::new();
        let r = raw(20911, 5000);
        reg.upsert(&r);

        let by_id = reg.get_by_id(20911).unwrap();
        let by_tuple = reg.get_by_tuple(&r.tuple).unwrap();
        assert!(Rc::ptr_eq(by_id, by_tuple));
        // one strong handle per index
        assert_eq!(Rc::strong_count(by_id), 2);
    }

    #[test]
    fn round_trip_identity_across_ticks() {
        let mut reg = Registry::new();
        let r = raw(20911, 5000);
        reg.upsert(&r);
        let first = Rc::clone(reg.get_by_id(20911).unwrap());
        first.stats.borrow_mut().add_rx(1500);

        for _ in 0..5 {
            reg.sweep();
            reg.upsert(&r);
        }

        let later = reg.get_by_id(20911).unwrap();
        assert!(Rc::ptr_eq(&first, later));
        assert_eq!(later.stats.borrow().rx_bytes, 1500);
    }

    #[test]
    fn grace_window_two_ticks() {
        let mut reg = Registry::new();
        let r = raw(20911, 5000);
        reg.upsert(&r);

        // tick 1: observed
        reg.sweep();
        assert_eq!(reg.len(), 1);

        // tick 2: absent — still queryable by both keys
        assert_eq!(reg.sweep(), 0);
        assert!(reg.get_by_id(20911).is_some());
        assert!(reg.get_by_tuple(&r.tuple).is_some());

        // tick 3: still absent — gone from both
        assert_eq!(reg.sweep(), 1);
        assert!(reg.get_by_id(20911).is_none());
        assert!(reg.get_by_tuple(&r.tuple).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn active_record_survives_indefinitely() {
        // Both indexes hold the record, so a sweep that visited it once per
        // key would burn both lives of an active record in a single tick.
        let mut reg = Registry::new();
        let r = raw(20911, 5000);
        reg.upsert(&r);

        for _ in 0..10 {
            reg.sweep();
            assert_eq!(reg.len(), 1, "active record must never be reclaimed");
            reg.upsert(&r);
        }
    }

    #[test]
    fn reobservation_restores_grace_budget() {
        let mut reg = Registry::new();
        let r = raw(20911, 5000);
        reg.upsert(&r);
        reg.sweep();

        // one missed tick, then observed again
        reg.sweep();
        reg.upsert(&r);
        reg.sweep();

        // a fresh single missed tick must not remove it
        assert_eq!(reg.sweep(), 0);
        assert!(reg.get_by_id(20911).is_some());
        assert_eq!(reg.sweep(), 1);
    }

    #[test]
    fn distinct_connections_coexist() {
        let mut reg = Registry::new();
        reg.upsert(&raw(1, 1000));
        reg.upsert(&raw(2, 2000));
        reg.upsert(&raw(3, 3000));
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.connections().count(), 3);

        // only the first goes unobserved
        reg.sweep();
        reg.upsert(&raw(2, 2000));
        reg.upsert(&raw(3, 3000));
        reg.sweep();
        reg.upsert(&raw(2, 2000));
        reg.upsert(&raw(3, 3000));
        assert_eq!(reg.sweep(), 1);
        assert!(reg.get_by_id(1).is_none());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn recycled_tuple_does_not_orphan_new_record() {
        let mut reg = Registry::new();
        let old = raw(100, 5000);
        reg.upsert(&old);
        reg.sweep(); // old armed

        // same tuple reappears under a new inode while old is in grace
        let new = RawConnection {
            socket_id: 200,
            ..old
        };
        reg.upsert(&new);
        reg.sweep(); // old: lives 2 -> 1
        reg.upsert(&new);
        reg.sweep(); // old removed

        assert!(reg.get_by_id(100).is_none());
        let survivor = reg.get_by_tuple(&new.tuple).unwrap();
        assert_eq!(survivor.socket_id(), 200);
    }
}
