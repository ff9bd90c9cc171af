//! Per-IP connection accounting, enforcing `SecurityConfig::max_connections_per_ip`.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;

pub struct ConnectionManager {
    max_per_ip: usize,
    counts: Mutex<HashMap<IpAddr, usize>>,
}

impl ConnectionManager {
    pub fn new(max_per_ip: usize) -> Self {
        Self {
            max_per_ip,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Attempts to reserve a connection slot for `addr`. Returns `false` if
    /// that address is already at its limit.
    pub fn try_acquire(&self, addr: IpAddr) -> bool {
        let mut counts = self.counts.lock().expect("connection manager mutex poisoned");
        let count = counts.entry(addr).or_insert(0);
        if *count >= self.max_per_ip {
            return false;
        }
        *count += 1;
        true
    }

    /// Releases a previously acquired slot for `addr`.
    pub fn release(&self, addr: IpAddr) {
        let mut counts = self.counts.lock().expect("connection manager mutex poisoned");
        if let Some(count) = counts.get_mut(&addr) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&addr);
            }
        }
    }

    pub fn current_count(&self, addr: IpAddr) -> usize {
        let counts = self.counts.lock().expect("connection manager mutex poisoned");
        counts.get(&addr).copied().unwrap_or(0)
    }
}
