//! Per-user stats registry.
//!
//! The only state shared across connections. Mutations are short critical
//! sections that never hold the lock across an `.await`, so a single
//! `std::sync::Mutex` guarding the whole table is sufficient.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::UserEntry;

#[derive(Default, Clone, Copy)]
struct Counters {
    connects: u64,
    curr_connects_x2: i64,
    octets: u64,
}

pub struct StatsRegistry {
    table: Mutex<HashMap<String, Counters>>,
}

impl StatsRegistry {
    /// Create one zeroed entry per configured user (spec: "created at
    /// startup, lives for process lifetime").
    pub fn new(users: &[UserEntry]) -> Self {
        let table = users.iter().map(|u| (u.name.clone(), Counters::default())).collect();
        Self { table: Mutex::new(table) }
    }

    pub fn inc_connects(&self, user: &str) {
        self.with_entry(user, |c| c.connects += 1);
    }

    pub fn inc_curr_connects(&self, user: &str) {
        self.with_entry(user, |c| c.curr_connects_x2 += 1);
    }

    pub fn dec_curr_connects(&self, user: &str) {
        self.with_entry(user, |c| c.curr_connects_x2 -= 1);
    }

    pub fn add_octets(&self, user: &str, n: u64) {
        self.with_entry(user, |c| c.octets += n);
    }

    /// Current `(connects, curr_connects_x2, octets)` for `user`, if known.
    pub fn get(&self, user: &str) -> Option<(u64, i64, u64)> {
        self.table.lock().unwrap().get(user).map(|c| (c.connects, c.curr_connects_x2, c.octets))
    }

    /// A snapshot of every user's counters, in no particular order, for the
    /// periodic stats printer.
    pub fn snapshot(&self) -> Vec<(String, u64, i64, u64)> {
        self.table
            .lock()
            .unwrap()
            .iter()
            .map(|(name, c)| (name.clone(), c.connects, c.curr_connects_x2, c.octets))
            .collect()
    }

    fn with_entry(&self, user: &str, f: impl FnOnce(&mut Counters)) {
        let mut table = self.table.lock().unwrap();
        f(table.entry(user.to_string()).or_default());
    }
}
