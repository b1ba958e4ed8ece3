use super::{GroupId, RecordType};
use bytes::{BufMut, Bytes, BytesMut};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Fixed header prepended to the encoded response when an entry is written
/// to the shared cache: stored_at (u64 BE) + original_ttl (u32 BE) + rcode.
pub const ENTRY_HEADER_LEN: usize = 13;

/// The unit of caching: `(normalized_name, qtype, group)`.
///
/// The group is part of the key so per-group policy can never leak answers
/// between groups.
#[derive(Clone, Debug, Eq)]
pub struct CacheKey {
    pub name: Arc<str>,
    pub qtype: RecordType,
    pub group: GroupId,
}

impl CacheKey {
    #[inline]
    pub fn new(name: Arc<str>, qtype: RecordType, group: GroupId) -> Self {
        Self { name, qtype, group }
    }

    /// Shared-cache key form: `dns:{group}:{qtype}:{qname}`.
    pub fn shared_key(&self) -> String {
        format!("dns:{}:{}:{}", self.group, self.qtype, self.name)
    }

    /// Parse a shared-cache key back into its parts. Returns `None` for keys
    /// that do not carry the `dns:` prefix or are structurally off.
    pub fn from_shared_key(key: &str) -> Option<Self> {
        let rest = key.strip_prefix("dns:")?;
        let (group, rest) = rest.split_once(':')?;
        let (qtype, name) = rest.split_once(':')?;
        if group.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            name: Arc::from(name),
            qtype: qtype.parse().ok()?,
            group: Arc::from(group),
        })
    }
}

impl Hash for CacheKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        let name: &str = &self.name;
        name.hash(state);
        self.qtype.to_u16().hash(state);
        let group: &str = &self.group;
        group.hash(state);
    }
}

impl PartialEq for CacheKey {
    #[inline]
    fn eq(&self, other: &CacheKey) -> bool {
        self.qtype == other.qtype && self.name == other.name && self.group == other.group
    }
}

/// A cached, fully-encoded DNS response plus the metadata needed to age it.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    /// Wire-format response as received from upstream (or synthesized).
    pub encoded: Bytes,
    pub original_ttl: u32,
    /// Unix seconds at store time.
    pub stored_at: u64,
    pub rcode: u8,
}

impl CacheEntry {
    pub fn new(encoded: Bytes, original_ttl: u32, stored_at: u64, rcode: u8) -> Self {
        Self {
            encoded,
            original_ttl,
            stored_at,
            rcode,
        }
    }

    /// TTL left at read time: `max(0, original_ttl - (now - stored_at))`.
    #[inline]
    pub fn remaining_ttl(&self, now: u64) -> u32 {
        let age = now.saturating_sub(self.stored_at);
        (self.original_ttl as u64).saturating_sub(age) as u32
    }

    #[inline]
    pub fn is_fresh(&self, now: u64) -> bool {
        self.remaining_ttl(now) > 0
    }

    /// An expired entry may still be served while
    /// `now - stored_at <= original_ttl + serve_stale_window`.
    #[inline]
    pub fn is_within_stale_window(&self, now: u64, serve_stale_window: u64) -> bool {
        let age = now.saturating_sub(self.stored_at);
        age <= self.original_ttl as u64 + serve_stale_window
    }

    /// Approximate heap footprint, used for the L0 byte bound.
    pub fn approx_size(&self) -> usize {
        self.encoded.len() + ENTRY_HEADER_LEN
    }

    /// Serialize as header + encoded response for the shared cache.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ENTRY_HEADER_LEN + self.encoded.len());
        buf.put_u64(self.stored_at);
        buf.put_u32(self.original_ttl);
        buf.put_u8(self.rcode);
        buf.extend_from_slice(&self.encoded);
        buf.freeze()
    }

    /// Inverse of [`to_bytes`]. Returns `None` for truncated values.
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        if raw.len() < ENTRY_HEADER_LEN {
            return None;
        }
        let stored_at = u64::from_be_bytes(raw[0..8].try_into().ok()?);
        let original_ttl = u32::from_be_bytes(raw[8..12].try_into().ok()?);
        let rcode = raw[12];
        Some(Self {
            encoded: Bytes::copy_from_slice(&raw[ENTRY_HEADER_LEN..]),
            original_ttl,
            stored_at,
            rcode,
        })
    }
}
