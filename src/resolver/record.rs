//! The per-IP record.
//!
//! A record maps every hostname seen for one IP to the TTL it was last
//! observed with. It is stored as JSON (`{"DNS":{"host":ttl}}`); the store
//! itself never looks inside.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hostnames known to resolve to one IP, with their last observed TTL.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "DNS")]
    hostnames: BTreeMap<String, u64>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `hostname`, or overwrites its TTL if already present.
    pub fn observe(&mut self, hostname: impl Into<String>, ttl: u64) {
        self.hostnames.insert(hostname.into(), ttl);
    }

    pub fn ttl(&self, hostname: &str) -> Option<u64> {
        self.hostnames.get(hostname).copied()
    }

    pub fn len(&self) -> usize {
        self.hostnames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hostnames.is_empty()
    }

    /// Hostnames in ascending order.
    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.hostnames.keys().map(String::as_str)
    }

    /// The lookup form: sorted hostnames joined with `,`.
    pub fn render(&self) -> String {
        self.hostnames().collect::<Vec<_>>().join(",")
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
