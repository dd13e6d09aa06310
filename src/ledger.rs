//! Append-only, hash-chained decision ledger.
//!
//! The ledger is a single JSON array on disk. Every append rewrites the file
//! through a temp file and an atomic rename, so a crash leaves either the old
//! or the new sequence, never a torn one. Each sealed record carries the
//! SHA-256 of its predecessor; a broken chain on load is fatal.
//!
//! Records written before sealing existed (no `sequence`, `prev_hash` or
//! `hash`) are accepted as an unsealed prefix. The first sealed record links
//! to a digest folded over that prefix, so the prefix is covered from then on.

use crate::error::{EngineError, Result};
use crate::types::transaction::Transaction;
use crate::types::verdict::Verdict;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Decision payload persisted for every analyzed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Missing on unsealed records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<Uuid>,
    pub amount: f64,
    pub hour: u8,
    pub frequency: u32,
    /// Location name; kept as text so records stay readable if the location
    /// set changes
    pub location: String,
    /// Stored as 0/1
    #[serde(with = "flag")]
    pub location_mismatch: bool,
    pub biometric_score: f64,
    pub predicted_fraud: bool,
    /// Fraud probability (0 - 100) rounded to two decimals
    pub fraud_score: f64,
    pub reasons: Vec<String>,
    /// Written as RFC 3339 UTC; naive ISO 8601 is read as UTC
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    /// Build the entry for a completed decision.
    pub fn from_decision(tx: &Transaction, location_mismatch: bool, verdict: &Verdict) -> Self {
        Self {
            decision_id: Some(Uuid::new_v4()),
            amount: tx.amount,
            hour: tx.hour,
            frequency: tx.frequency,
            location: tx.location.to_string(),
            location_mismatch,
            biometric_score: tx.biometric_score,
            predicted_fraud: verdict.is_fraud,
            fraud_score: (verdict.fraud_probability * 100.0).round() / 100.0,
            reasons: verdict.reasons.clone(),
            timestamp: Utc::now(),
        }
    }

    #[cfg(test)]
    pub(crate) fn sample() -> Self {
        Self {
            decision_id: Some(Uuid::new_v4()),
            amount: 100.0,
            hour: 14,
            frequency: 1,
            location: "Delhi".to_string(),
            location_mismatch: false,
            biometric_score: 0.95,
            predicted_fraud: false,
            fraud_score: 3.21,
            reasons: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

/// A ledger entry with its position and chain hashes.
///
/// The three chain fields are either all present (sealed) or all absent
/// (unsealed prefix record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    #[serde(flatten)]
    pub entry: LedgerEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl LedgerRecord {
    /// Chain link before the first record.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";

    /// Seal an entry at `sequence` after the link `prev_hash`.
    pub fn seal(sequence: u64, prev_hash: &str, entry: LedgerEntry) -> serde_json::Result<Self> {
        let hash = Self::digest(sequence, prev_hash, &entry)?;
        Ok(Self {
            sequence: Some(sequence),
            entry,
            prev_hash: Some(prev_hash.to_string()),
            hash: Some(hash),
        })
    }

    /// Wrap an entry without chain fields.
    pub fn unsealed(entry: LedgerEntry) -> Self {
        Self {
            sequence: None,
            entry,
            prev_hash: None,
            hash: None,
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.hash.is_some()
    }

    fn digest(sequence: u64, prev_hash: &str, entry: &LedgerEntry) -> serde_json::Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(prev_hash.as_bytes());
        hasher.update(sequence.to_be_bytes());
        hasher.update(serde_json::to_vec(entry)?);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Link the next sealed record must carry as `prev_hash`.
fn chain_head(records: &[LedgerRecord]) -> serde_json::Result<String> {
    match records.last() {
        Some(LedgerRecord {
            hash: Some(hash), ..
        }) => Ok(hash.clone()),
        _ => records
            .iter()
            .enumerate()
            .try_fold(LedgerRecord::GENESIS_HASH.to_string(), |link, (index, record)| {
                LedgerRecord::digest(index as u64, &link, &record.entry)
            }),
    }
}

/// Check ordering and hash links of a record sequence.
fn verify_chain(records: &[LedgerRecord]) -> std::result::Result<(), String> {
    let mut link = LedgerRecord::GENESIS_HASH.to_string();
    let mut sealed_seen = false;

    for (index, record) in records.iter().enumerate() {
        let encode_err = |e: serde_json::Error| format!("record {} cannot be encoded: {}", index, e);

        match (&record.sequence, &record.prev_hash, &record.hash) {
            (None, None, None) => {
                if sealed_seen {
                    return Err(format!("record {} is unsealed after a sealed record", index));
                }
                link = LedgerRecord::digest(index as u64, &link, &record.entry).map_err(encode_err)?;
            }
            (Some(sequence), Some(prev_hash), Some(hash)) => {
                sealed_seen = true;
                if *sequence != index as u64 {
                    return Err(format!("record {} carries sequence {}", index, sequence));
                }
                if *prev_hash != link {
                    return Err(format!("record {} does not link to its predecessor", index));
                }
                let expected =
                    LedgerRecord::digest(*sequence, prev_hash, &record.entry).map_err(encode_err)?;
                if *hash != expected {
                    return Err(format!("hash mismatch at record {}", index));
                }
                link = expected;
            }
            _ => return Err(format!("record {} is partially sealed", index)),
        }
    }
    Ok(())
}

/// Durable store for decision records. Appends are serialized by a mutex.
pub struct LedgerStore {
    path: PathBuf,
    records: Mutex<Vec<LedgerRecord>>,
}

impl LedgerStore {
    /// Open the ledger at `path`, creating an empty one if none exists yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| EngineError::persistence(&path, e))?;
            }
            write_atomically(&path, b"[]")?;
            info!(path = %path.display(), "Initialized empty ledger");
            return Ok(Self {
                path,
                records: Mutex::new(Vec::new()),
            });
        }

        let raw = fs::read_to_string(&path).map_err(|e| EngineError::persistence(&path, e))?;
        let records: Vec<LedgerRecord> = serde_json::from_str(&raw)
            .map_err(|e| EngineError::persistence(&path, format!("corrupt ledger: {}", e)))?;
        verify_chain(&records).map_err(|reason| EngineError::persistence(&path, reason))?;

        let unsealed = records.iter().filter(|r| !r.is_sealed()).count();
        if unsealed > 0 {
            warn!(
                path = %path.display(),
                unsealed,
                "Ledger has records without chain hashes; they are sealed in by the next append"
            );
        }
        info!(path = %path.display(), records = records.len(), "Ledger loaded");

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Most recent record, if any.
    pub fn latest(&self) -> Option<LedgerRecord> {
        self.records.lock().last().cloned()
    }

    /// All records in decision order.
    pub fn all(&self) -> Vec<LedgerRecord> {
        self.records.lock().clone()
    }

    /// Re-check the hash chain of the in-memory sequence.
    pub fn verify(&self) -> Result<()> {
        verify_chain(&self.records.lock()).map_err(|reason| EngineError::persistence(&self.path, reason))
    }

    /// Append an entry without consulting the current head. Returns the
    /// sealed record exactly as stored.
    pub fn append(&self, entry: LedgerEntry) -> Result<LedgerRecord> {
        self.append_locked(|_| ((), entry)).map(|((), record)| record)
    }

    /// Read the head and append in one critical section.
    ///
    /// `decide` sees the latest record and returns a value to hand back
    /// together with the entry to append. The entry is durably written before
    /// it becomes visible in memory; on failure nothing changes.
    pub fn append_with<T, F>(&self, decide: F) -> Result<T>
    where
        F: FnOnce(Option<&LedgerRecord>) -> (T, LedgerEntry),
    {
        self.append_locked(decide).map(|(value, _)| value)
    }

    fn append_locked<T, F>(&self, decide: F) -> Result<(T, LedgerRecord)>
    where
        F: FnOnce(Option<&LedgerRecord>) -> (T, LedgerEntry),
    {
        let mut records = self.records.lock();
        let (value, entry) = decide(records.last());

        let prev_hash = chain_head(&records).map_err(|e| EngineError::persistence(&self.path, e))?;
        let record = LedgerRecord::seal(records.len() as u64, &prev_hash, entry)
            .map_err(|e| EngineError::persistence(&self.path, e))?;

        let view: Vec<&LedgerRecord> = records.iter().chain(std::iter::once(&record)).collect();
        let encoded = serde_json::to_vec_pretty(&view)
            .map_err(|e| EngineError::persistence(&self.path, e))?;
        write_atomically(&self.path, &encoded)?;

        debug!(
            sequence = records.len(),
            decision_id = ?record.entry.decision_id,
            hash = ?record.hash,
            "Ledger record appended"
        );
        records.push(record.clone());

        Ok((value, record))
    }
}

/// Write `bytes` to a sibling temp file, fsync it and rename over `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let written = fs::File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&tmp, path));

    if let Err(e) = written {
        if fs::remove_file(&tmp).is_err() {
            warn!(path = %tmp.display(), "Could not remove ledger temp file");
        }
        return Err(EngineError::persistence(path, e));
    }
    Ok(())
}

/// Serde helper: booleans stored as 0/1, accepting either form on read.
mod flag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flag {
            Int(u64),
            Bool(bool),
        }

        match Flag::deserialize(deserializer)? {
            Flag::Int(0) | Flag::Bool(false) => Ok(false),
            Flag::Int(1) | Flag::Bool(true) => Ok(true),
            Flag::Int(other) => Err(D::Error::custom(format!("flag must be 0 or 1, got {}", other))),
        }
    }
}

/// Serde helper: RFC 3339 on write; on read also accepts the naive
/// `YYYY-MM-DDTHH:MM:SS[.ffffff]` form, taken as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(stamp) = raw.parse::<DateTime<Utc>>() {
            return Ok(stamp);
        }
        raw.parse::<NaiveDateTime>()
            .map(|naive| naive.and_utc())
            .map_err(|e| D::Error::custom(format!("invalid timestamp {:?}: {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn entry(location: &str, hour: u8) -> LedgerEntry {
        let mut entry = LedgerEntry::sample();
        entry.location = location.to_string();
        entry.hour = hour;
        entry
    }

    #[test]
    fn test_open_creates_empty_ledger() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");

        let store = LedgerStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(store.latest().is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn test_append_persists_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        {
            let store = LedgerStore::open(&path).unwrap();
            store.append(entry("Delhi", 9)).unwrap();
            store.append(entry("Mumbai", 10)).unwrap();
            let last = store.append(entry("Tokyo", 11)).unwrap();
            assert_eq!(last.sequence, Some(2));
            assert_eq!(store.latest().unwrap().entry.location, "Tokyo");
        }

        let reopened = LedgerStore::open(&path).unwrap();
        let locations: Vec<String> = reopened.all().into_iter().map(|r| r.entry.location).collect();
        assert_eq!(locations, ["Delhi", "Mumbai", "Tokyo"]);
        assert!(reopened.verify().is_ok());
    }

    #[test]
    fn test_field_names_are_stable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let store = LedgerStore::open(&path).unwrap();
        store.append(entry("Delhi", 9)).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let record = &raw[0];
        for field in [
            "amount",
            "hour",
            "frequency",
            "location",
            "location_mismatch",
            "biometric_score",
            "predicted_fraud",
            "fraud_score",
            "reasons",
            "timestamp",
        ] {
            assert!(record.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(record["location_mismatch"], 0);
        assert_eq!(record["prev_hash"], LedgerRecord::GENESIS_HASH);
    }

    #[test]
    fn test_tampered_record_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        {
            let store = LedgerStore::open(&path).unwrap();
            store.append(entry("Delhi", 9)).unwrap();
            store.append(entry("Sydney", 10)).unwrap();
        }

        let mut raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        raw[0]["fraud_score"] = serde_json::json!(0.0);
        fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        let err = LedgerStore::open(&path).err().unwrap();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("hash mismatch at record 0"));
    }

    #[test]
    fn test_dropped_record_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        {
            let store = LedgerStore::open(&path).unwrap();
            for hour in 0..3 {
                store.append(entry("Delhi", hour)).unwrap();
            }
        }

        let mut raw: Vec<serde_json::Value> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        raw.remove(1);
        fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        assert!(matches!(
            LedgerStore::open(&path),
            Err(EngineError::Persistence { .. })
        ));
    }

    #[test]
    fn test_corrupt_file_is_not_discarded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            LedgerStore::open(&path),
            Err(EngineError::Persistence { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_append_with_sees_latest() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::open(dir.path().join("ledger.json")).unwrap();

        let first_seen = store.append_with(|latest| (latest.is_none(), entry("Delhi", 9))).unwrap();
        assert!(first_seen);

        let seen = store
            .append_with(|latest| (latest.map(|r| r.entry.location.clone()), entry("London", 10)))
            .unwrap();
        assert_eq!(seen.as_deref(), Some("Delhi"));
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let store = Arc::new(LedgerStore::open(&path).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..5 {
                        store.append(entry("Delhi", (worker * 5 + i) as u8)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 20);
        let reopened = LedgerStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 20);
        assert!(reopened.verify().is_ok());
    }

    #[test]
    fn test_location_mismatch_accepts_bool() {
        let mut value = serde_json::to_value(LedgerEntry::sample()).unwrap();
        value["location_mismatch"] = serde_json::json!(true);
        let parsed: LedgerEntry = serde_json::from_value(value).unwrap();
        assert!(parsed.location_mismatch);
    }

    #[test]
    fn test_concurrent_append_returns_own_record() {
        let dir = tempdir().unwrap();
        let store = Arc::new(LedgerStore::open(dir.path().join("ledger.json")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let mut mismatched = 0;
                    for _ in 0..10 {
                        let entry = LedgerEntry::sample();
                        let id = entry.decision_id;
                        let record = store.append(entry).unwrap();
                        if record.entry.decision_id != id || !record.is_sealed() {
                            mismatched += 1;
                        }
                    }
                    mismatched
                })
            })
            .collect();

        let mismatched: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(mismatched, 0);
        assert_eq!(store.len(), 80);
    }

    const UNSEALED_LEDGER: &str = r#"[
    {
        "amount": 120,
        "hour": 10,
        "frequency": 1,
        "location": "Delhi",
        "location_mismatch": 0,
        "biometric_score": 0.92,
        "predicted_fraud": false,
        "fraud_score": 3.4,
        "reasons": [],
        "timestamp": "2024-05-01T10:15:30.123456"
    },
    {
        "amount": 8000.0,
        "hour": 3,
        "frequency": 12,
        "location": "Tokyo",
        "location_mismatch": 1,
        "biometric_score": 0.2,
        "predicted_fraud": true,
        "fraud_score": 97.53,
        "reasons": ["Transaction at odd hours", "Behavioral mismatch"],
        "timestamp": "2024-05-01T10:20:00"
    }
]"#;

    #[test]
    fn test_unsealed_records_load_and_extend() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fraud_log.json");
        fs::write(&path, UNSEALED_LEDGER).unwrap();

        let store = LedgerStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        let first = &store.all()[0];
        assert!(!first.is_sealed());
        assert_eq!(first.entry.decision_id, None);
        assert!(!first.entry.location_mismatch);
        assert_eq!(
            first.entry.timestamp,
            chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_micro_opt(10, 15, 30, 123_456)
                .unwrap()
                .and_utc()
        );
        assert!(store.latest().unwrap().entry.location_mismatch);

        let sealed = store.append(entry("Mumbai", 11)).unwrap();
        assert_eq!(sealed.sequence, Some(2));
        assert_ne!(sealed.prev_hash.as_deref(), Some(LedgerRecord::GENESIS_HASH));
        drop(store);

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw[0].get("hash").is_none());
        assert!(raw[2].get("hash").is_some());

        let reopened = LedgerStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 3);
        assert!(reopened.verify().is_ok());
        let locations: Vec<String> = reopened.all().into_iter().map(|r| r.entry.location).collect();
        assert_eq!(locations, ["Delhi", "Tokyo", "Mumbai"]);
    }

    #[test]
    fn test_unsealed_prefix_is_covered_once_sealed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fraud_log.json");
        fs::write(&path, UNSEALED_LEDGER).unwrap();
        LedgerStore::open(&path).unwrap().append(entry("Mumbai", 11)).unwrap();

        let mut raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        raw[1]["predicted_fraud"] = serde_json::json!(false);
        fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        let err = LedgerStore::open(&path).err().unwrap();
        assert!(err.to_string().contains("record 2 does not link"));
    }

    #[test]
    fn test_unsealed_record_after_sealed_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        {
            let store = LedgerStore::open(&path).unwrap();
            store.append(entry("Delhi", 9)).unwrap();
        }

        let mut raw: Vec<serde_json::Value> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        raw.push(serde_json::to_value(LedgerRecord::unsealed(entry("Tokyo", 10))).unwrap());
        fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        let err = LedgerStore::open(&path).err().unwrap();
        assert!(err.to_string().contains("unsealed after a sealed record"));
    }

    #[test]
    fn test_partially_sealed_record_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        {
            let store = LedgerStore::open(&path).unwrap();
            store.append(entry("Delhi", 9)).unwrap();
        }

        let mut raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        raw[0].as_object_mut().unwrap().remove("hash");
        fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        let err = LedgerStore::open(&path).err().unwrap();
        assert!(err.to_string().contains("partially sealed"));
    }

    #[test]
    fn test_bad_timestamp_is_corrupt() {
        let mut value = serde_json::to_value(LedgerEntry::sample()).unwrap();
        value["timestamp"] = serde_json::json!("yesterday");
        assert!(serde_json::from_value::<LedgerEntry>(value).is_err());
    }
}
