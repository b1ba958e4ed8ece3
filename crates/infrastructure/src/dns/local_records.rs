use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use strata_dns_domain::config::LocalRecordConfig;
use strata_dns_domain::question::normalize_name;
use strata_dns_domain::RecordType;
use tracing::info;

type RecordMap = FxHashMap<(Arc<str>, RecordType), Arc<Vec<LocalRecordConfig>>>;

/// Authoritative answers for statically configured names.
///
/// Read-mostly: `apply_config` rebuilds the whole map off-path and swaps
/// the pointer, so lookups are lock-free and always see one snapshot.
/// Local records shadow the blocklist: explicit configuration wins.
#[derive(Default)]
pub struct LocalRecords {
    inner: ArcSwap<RecordMap>,
}

impl LocalRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_config(&self, records: &[LocalRecordConfig]) {
        let mut map: FxHashMap<(Arc<str>, RecordType), Vec<LocalRecordConfig>> =
            FxHashMap::default();
        for record in records {
            let key = (normalize_name(&record.name), record.record_type);
            map.entry(key).or_default().push(record.clone());
        }
        let snapshot: RecordMap = map
            .into_iter()
            .map(|(key, values)| (key, Arc::new(values)))
            .collect();
        info!(records = snapshot.len(), "Local records loaded");
        self.inner.store(Arc::new(snapshot));
    }

    /// Case-insensitive lookup on the normalized name.
    pub fn lookup(&self, name: &str, qtype: RecordType) -> Option<Arc<Vec<LocalRecordConfig>>> {
        let guard = self.inner.load();
        guard.get(&(normalize_name(name), qtype)).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }
}
