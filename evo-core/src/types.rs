//! Shared identifiers and value types used across every evolution crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for a persistent entity (module, phage, catalog
/// entry, memory pattern, ...). Stores own their records; every other
/// component references them by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(uuid::Uuid);

impl EntityId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> uuid::Uuid {
        self.0
    }

    pub fn nil() -> Self {
        Self(uuid::Uuid::nil())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::generate()
    }
}

/// Millisecond-precision timestamp backed by `chrono`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_chrono(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_chrono(&self) -> DateTime<Utc> {
        self.0
    }

    /// Hours elapsed since this timestamp, as of `now`. Negative durations
    /// (clock skew) clamp to zero.
    pub fn hours_since(&self, now: Timestamp) -> f64 {
        let secs = (now.0 - self.0).num_seconds().max(0) as f64;
        secs / 3600.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// A normalized content fingerprint (blake3), used for the Improvement
/// Memory's dedup key and for mutation/schema signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hash normalized text: lowercased, whitespace-collapsed. This is
    /// what makes fuzzily-identical hypotheses collide per P9.
    pub fn of_text(text: &str) -> Self {
        let normalized: String = text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self::of_bytes(normalized.as_bytes())
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        let hash = blake3::hash(bytes);
        Self(*hash.as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

/// A value carrying a monotonically increasing version and last-modified
/// timestamp. Used by stores that must expose idempotent `update` methods
/// (Catalog Registry, Improvement Memory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub data: T,
    pub version: u64,
    pub modified_at: Timestamp,
}

impl<T> Versioned<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            version: 1,
            modified_at: Timestamp::now(),
        }
    }

    pub fn update(&mut self, data: T) {
        self.data = data;
        self.version += 1;
        self.modified_at = Timestamp::now();
    }
}

/// Resource bounds used by the sandbox and rate limiter layers of the
/// Safety Kernel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_memory_mb: u64,
    pub max_cpu_time_secs: u64,
    pub max_file_creates: u32,
    pub timeout_secs: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_memory_mb: 512,
            max_cpu_time_secs: 30,
            max_file_creates: 256,
            timeout_secs: 60,
        }
    }
}

impl ResourceLimits {
    pub fn conservative() -> Self {
        Self {
            max_memory_mb: 128,
            max_cpu_time_secs: 10,
            max_file_creates: 64,
            timeout_secs: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_round_trips_through_display() {
        let id = EntityId::generate();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
    }

    #[test]
    fn timestamp_orders_monotonically() {
        let t1 = Timestamp::now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let t2 = Timestamp::now();
        assert!(t2 >= t1);
    }

    #[test]
    fn fingerprint_collides_on_whitespace_variation() {
        let a = Fingerprint::of_text("Add __hash__ to Agent");
        let b = Fingerprint::of_text("add  __hash__  to   agent");
        assert_eq!(a, b);
    }

    #[test]
    fn versioned_increments_on_update() {
        let mut v = Versioned::new(42);
        assert_eq!(v.version, 1);
        v.update(100);
        assert_eq!(v.version, 2);
        assert_eq!(v.data, 100);
    }
}
