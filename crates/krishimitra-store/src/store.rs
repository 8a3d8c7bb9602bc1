//! Main store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use krishimitra_types::{
    Advisory, PendingAction, SoilHistoryEntry, Timestamp, Validate, WeatherSnapshot, now_millis,
};

use crate::backend::{KvBackend, MemoryBackend};
use crate::error::{Error, Result};
use crate::keys;
use crate::sqlite::SqliteBackend;

/// Maximum number of weather snapshots kept.
pub const WEATHER_CAPACITY: usize = 10;

/// Record layout version written under [`keys::SCHEMA_VERSION`].
pub const LAYOUT_VERSION: u32 = 1;

/// Typed access to the offline records.
///
/// Every operation takes the backend lock once for its whole
/// read-modify-write, so callers sharing an `Arc<Store>` never observe a
/// half-applied update. Reads never fail: absent keys, backend errors and
/// malformed JSON all come back as empty collections.
pub struct Store {
    backend: Mutex<Box<dyn KvBackend>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

/// Counts shown by status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub weather: usize,
    pub soil_history: usize,
    pub advisories: usize,
    pub unread_advisories: usize,
    pub pending_actions: usize,
    pub last_sync: Option<Timestamp>,
}

impl Store {
    /// Open or create a SQLite-backed store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_backend(SqliteBackend::open(path)?)
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open a store that lives only in memory.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_backend(MemoryBackend::new())
    }

    /// Wrap an arbitrary backend.
    pub fn with_backend<B: KvBackend + 'static>(backend: B) -> Result<Self> {
        let store = Self {
            backend: Mutex::new(Box::new(backend)),
        };
        store.check_layout()?;
        Ok(store)
    }

    fn check_layout(&self) -> Result<()> {
        let mut backend = self.lock();
        match backend.get(keys::SCHEMA_VERSION).ok().flatten() {
            // Fresh store
            None => {
                backend.set(keys::SCHEMA_VERSION, &LAYOUT_VERSION.to_string())?;
            }
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(version) if version > LAYOUT_VERSION => warn!(
                    "Stored layout version {} is newer than {}, unreadable records will be kept as-is",
                    version, LAYOUT_VERSION
                ),
                Ok(_) => {}
                Err(_) => {
                    warn!("Invalid layout version {:?}, resetting", raw);
                    backend.set(keys::SCHEMA_VERSION, &LAYOUT_VERSION.to_string())?;
                }
            },
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn KvBackend>> {
        // Each write is a single backend call, so a poisoned lock still guards consistent data.
        self.backend.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read-modify-write a list under one lock, writing back only on change.
    ///
    /// `f` sees the decoded records. Stored elements that failed to decode
    /// or validate are written back unchanged, each kept after the nearest
    /// earlier record that survived `f` (or at the front if none did).
    fn update_list<T, R>(&self, key: &str, f: impl FnOnce(&mut Vec<T>) -> R) -> Result<R>
    where
        T: DeserializeOwned + Serialize + Validate + PartialEq + Clone,
    {
        let mut backend = self.lock();
        let stored = decode_list::<T>(&**backend, key);
        let before = stored.records();
        let mut items = before.clone();
        let result = f(&mut items);
        if items == before {
            return Ok(result);
        }

        // Reject the whole edit rather than write a record reads would hide
        for item in &items {
            let validation = item.validate();
            if !validation.is_valid {
                return Err(Error::InvalidRecord(format!(
                    "{}: {}",
                    key,
                    validation.summary()
                )));
            }
        }

        let merged = stored.merge(&before, &items)?;
        let json = serde_json::to_string(&merged)?;
        backend.set(key, &json)?;
        Ok(result)
    }

    fn read<T>(&self, key: &str) -> Vec<T>
    where
        T: DeserializeOwned + Validate,
    {
        decode_list(&**self.lock(), key).into_records()
    }
}

/// One element of a stored list.
enum Slot<T> {
    Record(T),
    /// Kept verbatim so a rewrite of the list does not destroy it.
    Opaque(serde_json::Value),
}

/// A decoded list plus whatever could not be decoded.
struct StoredList<T> {
    slots: Vec<Slot<T>>,
}

impl<T> StoredList<T> {
    fn into_records(self) -> Vec<T> {
        self.slots
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Record(item) => Some(item),
                Slot::Opaque(_) => None,
            })
            .collect()
    }
}

impl<T: Clone> StoredList<T> {
    fn records(&self) -> Vec<T> {
        self.slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Record(item) => Some(item.clone()),
                Slot::Opaque(_) => None,
            })
            .collect()
    }
}

impl<T: Serialize + PartialEq> StoredList<T> {
    /// Lay out `after` (the edited form of `before`) with opaque elements
    /// restored next to the records that preceded them.
    fn merge(&self, before: &[T], after: &[T]) -> Result<Vec<serde_json::Value>> {
        // Position in `after` of each record in `before`, matched in order.
        let mut placed: Vec<Option<usize>> = vec![None; before.len()];
        for (pos, item) in after.iter().enumerate() {
            if let Some(index) = (0..before.len())
                .find(|&i| placed[i].is_none() && before[i] == *item)
            {
                placed[index] = Some(pos);
            }
        }

        let mut leading = Vec::new();
        let mut trailing: Vec<Vec<serde_json::Value>> = vec![Vec::new(); after.len()];
        let mut seen = 0;
        for slot in &self.slots {
            match slot {
                Slot::Record(_) => seen += 1,
                Slot::Opaque(value) => {
                    match (0..seen).rev().find_map(|i| placed[i]) {
                        Some(pos) => trailing[pos].push(value.clone()),
                        None => leading.push(value.clone()),
                    }
                }
            }
        }

        let mut merged = leading;
        for (item, extra) in after.iter().zip(trailing) {
            merged.push(serde_json::to_value(item)?);
            merged.extend(extra);
        }
        Ok(merged)
    }
}

/// Decode a stored list, setting aside elements that fail to decode or
/// validate. A value that is not a JSON list decodes as empty.
fn decode_list<T>(backend: &dyn KvBackend, key: &str) -> StoredList<T>
where
    T: DeserializeOwned + Validate,
{
    let empty = StoredList { slots: Vec::new() };
    let raw = match backend.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return empty,
        Err(e) => {
            warn!("Failed to read {}: {}", key, e);
            return empty;
        }
    };

    let elements = match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Array(elements)) => elements,
        Ok(other) => {
            warn!("Expected a list under {}, found {}; treating as empty", key, kind_of(&other));
            return empty;
        }
        Err(e) => {
            warn!("Corrupted JSON under {}: {}; treating as empty", key, e);
            return empty;
        }
    };

    let total = elements.len();
    let mut slots = Vec::with_capacity(total);
    let mut skipped = 0;
    for (index, element) in elements.into_iter().enumerate() {
        let item: T = match serde_json::from_value(element.clone()) {
            Ok(item) => item,
            Err(e) => {
                warn!("Skipping undecodable record {} under {}: {}", index, key, e);
                skipped += 1;
                slots.push(Slot::Opaque(element));
                continue;
            }
        };
        let validation = item.validate();
        if !validation.is_valid {
            warn!(
                "Skipping invalid record {} under {}: {}",
                index,
                key,
                validation.summary()
            );
            skipped += 1;
            slots.push(Slot::Opaque(element));
            continue;
        }
        if validation.has_warnings() {
            debug!("Record {} under {}: {}", index, key, validation.summary());
        }
        slots.push(Slot::Record(item));
    }

    if skipped > 0 {
        info!("Loaded {} of {} records under {}", total - skipped, total, key);
    }
    StoredList { slots }
}

fn write_list<T: Serialize>(backend: &mut dyn KvBackend, key: &str, items: &[T]) -> Result<()> {
    let json = serde_json::to_string(items)?;
    backend.set(key, &json)
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

// Weather operations
impl Store {
    /// Prepend a snapshot, keeping only the newest [`WEATHER_CAPACITY`].
    pub fn save_weather(&self, snapshot: WeatherSnapshot) -> Result<()> {
        self.update_list(keys::WEATHER, |items: &mut Vec<WeatherSnapshot>| {
            items.insert(0, snapshot);
            items.truncate(WEATHER_CAPACITY);
        })
    }

    /// Stored snapshots, newest first.
    pub fn weather(&self) -> Vec<WeatherSnapshot> {
        self.read(keys::WEATHER)
    }

    /// The most recent snapshot, if any.
    pub fn latest_weather(&self) -> Option<WeatherSnapshot> {
        self.weather().into_iter().next()
    }
}

// Soil history operations
impl Store {
    /// Prepend a soil test result. History is never truncated.
    pub fn save_soil_history(&self, entry: SoilHistoryEntry) -> Result<()> {
        self.update_list(keys::SOIL_HISTORY, |items: &mut Vec<SoilHistoryEntry>| {
            items.insert(0, entry);
        })
    }

    /// Stored soil tests, newest first.
    pub fn soil_history(&self) -> Vec<SoilHistoryEntry> {
        self.read(keys::SOIL_HISTORY)
    }
}

// Advisory operations
impl Store {
    /// Prepend an advisory.
    pub fn save_advisory(&self, advisory: Advisory) -> Result<()> {
        self.update_advisories(|items| items.insert(0, advisory))
    }

    /// Stored advisories, newest first.
    pub fn advisories(&self) -> Vec<Advisory> {
        self.read(keys::ADVISORIES)
    }

    /// Set the read flag on the advisory with `id`.
    ///
    /// Returns `false` and leaves storage untouched when no advisory matches
    /// or it was already read.
    pub fn mark_advisory_read(&self, id: &str) -> Result<bool> {
        let changed = self.update_advisories(|items| {
            match items.iter_mut().find(|a| a.id == id) {
                Some(advisory) if !advisory.is_read => {
                    advisory.is_read = true;
                    true
                }
                _ => false,
            }
        })?;
        if changed {
            debug!("Marked advisory {} as read", id);
        }
        Ok(changed)
    }

    /// Remove every advisory.
    pub fn clear_advisories(&self) -> Result<()> {
        let mut backend = self.lock();
        write_list::<Advisory>(&mut **backend, keys::ADVISORIES, &[])?;
        info!("Cleared all advisories");
        Ok(())
    }

    /// Run `f` against the advisory list under the store lock.
    ///
    /// The list is written back only if `f` changed it. Use this for
    /// check-then-insert policies that must not race other writers.
    pub fn update_advisories<R>(&self, f: impl FnOnce(&mut Vec<Advisory>) -> R) -> Result<R> {
        self.update_list(keys::ADVISORIES, f)
    }

    /// Whether an advisory with `id` is stored.
    pub fn contains_advisory(&self, id: &str) -> bool {
        self.advisories().iter().any(|a| a.id == id)
    }

    /// Number of advisories not yet read.
    pub fn unread_advisory_count(&self) -> usize {
        self.advisories().iter().filter(|a| !a.is_read).count()
    }

    /// Number of advisories created within `window_ms` before `now`.
    pub fn recent_advisory_count(&self, now: Timestamp, window_ms: Timestamp) -> usize {
        self.advisories()
            .iter()
            .filter(|a| a.is_recent(now, window_ms))
            .count()
    }
}

// Pending action queue operations
impl Store {
    /// Append an action to the end of the queue.
    pub fn enqueue_pending_action(&self, action: PendingAction) -> Result<()> {
        let kind = action.kind;
        let len = self.update_list(keys::OFFLINE_QUEUE, |items: &mut Vec<PendingAction>| {
            items.push(action);
            items.len()
        })?;
        debug!("Queued {} ({} pending)", kind, len);
        Ok(())
    }

    /// Queued actions, oldest first.
    pub fn pending_queue(&self) -> Vec<PendingAction> {
        self.read(keys::OFFLINE_QUEUE)
    }

    /// Drop every queued action, including ones this build cannot decode.
    pub fn clear_pending_queue(&self) -> Result<()> {
        let mut backend = self.lock();
        write_list::<PendingAction>(&mut **backend, keys::OFFLINE_QUEUE, &[])
    }

    /// Remove actions that were replayed successfully.
    ///
    /// Each replayed action removes one matching queue entry. Entries queued
    /// after the replay snapshot was taken stay in place. Returns the number
    /// of entries removed.
    pub fn settle_pending_queue(&self, replayed: &[PendingAction]) -> Result<usize> {
        self.update_list(keys::OFFLINE_QUEUE, |items: &mut Vec<PendingAction>| {
            let mut removed = 0;
            for done in replayed {
                if let Some(pos) = items.iter().position(|a| a == done) {
                    items.remove(pos);
                    removed += 1;
                }
            }
            removed
        })
    }
}

// Sync marker operations
impl Store {
    /// Record now as the last successful sync and return it.
    pub fn record_sync_timestamp(&self) -> Result<Timestamp> {
        let now = now_millis();
        self.lock().set(keys::LAST_SYNC, &now.to_string())?;
        Ok(now)
    }

    /// When the last successful sync completed, if ever.
    pub fn last_sync_timestamp(&self) -> Option<Timestamp> {
        let raw = match self.lock().get(keys::LAST_SYNC) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read {}: {}", keys::LAST_SYNC, e);
                return None;
            }
        };
        match raw.trim().parse::<Timestamp>() {
            Ok(ts) if ts > 0 => Some(ts),
            _ => {
                warn!("Ignoring malformed sync marker {:?}", raw);
                None
            }
        }
    }

    /// Counts of everything stored.
    pub fn summary(&self) -> StoreSummary {
        let advisories = self.advisories();
        StoreSummary {
            weather: self.weather().len(),
            soil_history: self.soil_history().len(),
            unread_advisories: advisories.iter().filter(|a| !a.is_read).count(),
            advisories: advisories.len(),
            pending_actions: self.pending_queue().len(),
            last_sync: self.last_sync_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krishimitra_types::{ActionKind, AdvisoryCategory, HOUR_MS};
    use serde_json::json;

    fn weather_at(timestamp: Timestamp) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: "28°C".to_string(),
            humidity: "65%".to_string(),
            rainfall: "12mm".to_string(),
            wind_speed: "8 km/h".to_string(),
            condition: "Partly Cloudy".to_string(),
            location: "Farm".to_string(),
            timestamp,
        }
    }

    fn advisory(id: &str, timestamp: Timestamp) -> Advisory {
        Advisory::new(id, "Weather Alert", "Light rain", AdvisoryCategory::Weather)
            .with_timestamp(timestamp)
    }

    fn seeded(key: &str, raw: &str) -> Store {
        Store::with_backend(MemoryBackend::with_entries([(key, raw)])).unwrap()
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.weather().is_empty());
        assert!(store.advisories().is_empty());
        assert!(store.pending_queue().is_empty());
        assert_eq!(store.last_sync_timestamp(), None);
    }

    #[test]
    fn test_save_weather_scenario() {
        let store = Store::open_in_memory().unwrap();
        let first = weather_at(1_000);

        store.save_weather(first.clone()).unwrap();
        assert_eq!(store.weather(), vec![first]);

        for i in 2..=11 {
            store.save_weather(weather_at(i * 1_000)).unwrap();
        }

        let stored = store.weather();
        assert_eq!(stored.len(), WEATHER_CAPACITY);
        assert_eq!(stored[0].timestamp, 11_000);
        assert_eq!(stored[9].timestamp, 2_000);
        assert!(stored.iter().all(|w| w.timestamp != 1_000));
        assert_eq!(store.latest_weather().unwrap().timestamp, 11_000);
    }

    #[test]
    fn test_soil_history_unbounded() {
        let store = Store::open_in_memory().unwrap();
        for i in 1..=15 {
            store
                .save_soil_history(SoilHistoryEntry {
                    id: format!("soil_{}", i),
                    ph: 6.5,
                    timestamp: i,
                    ..Default::default()
                })
                .unwrap();
        }

        let history = store.soil_history();
        assert_eq!(history.len(), 15);
        assert_eq!(history[0].id, "soil_15");
    }

    #[test]
    fn test_advisories_newest_first() {
        let store = Store::open_in_memory().unwrap();
        store.save_advisory(advisory("a1", 1)).unwrap();
        store.save_advisory(advisory("a2", 2)).unwrap();

        let ids: Vec<_> = store.advisories().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a2", "a1"]);
    }

    #[test]
    fn test_mark_advisory_read_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store.save_advisory(advisory("a1", 1)).unwrap();
        store.save_advisory(advisory("a2", 2)).unwrap();

        assert!(store.mark_advisory_read("a1").unwrap());
        let once = store.advisories();

        assert!(!store.mark_advisory_read("a1").unwrap());
        assert_eq!(store.advisories(), once);

        assert!(once[1].is_read);
        assert!(!once[0].is_read);
        assert_eq!(once[1].title, "Weather Alert");
        assert_eq!(store.unread_advisory_count(), 1);
    }

    #[test]
    fn test_mark_unknown_advisory_is_noop() {
        let store = Store::open_in_memory().unwrap();
        store.save_advisory(advisory("a1", 1)).unwrap();
        let before = store.advisories();

        assert!(!store.mark_advisory_read("missing").unwrap());
        assert_eq!(store.advisories(), before);
    }

    #[test]
    fn test_clear_advisories() {
        let store = Store::open_in_memory().unwrap();
        store.clear_advisories().unwrap();
        assert!(store.advisories().is_empty());

        store.save_advisory(advisory("a1", 1)).unwrap();
        store.save_advisory(advisory("a2", 2)).unwrap();
        store.clear_advisories().unwrap();
        assert!(store.advisories().is_empty());
        assert!(!store.contains_advisory("a1"));
    }

    #[test]
    fn test_recent_advisory_count() {
        let store = Store::open_in_memory().unwrap();
        let now = 1_000 * HOUR_MS;
        store.save_advisory(advisory("old", now - 30 * HOUR_MS)).unwrap();
        store.save_advisory(advisory("new1", now - HOUR_MS)).unwrap();
        store.save_advisory(advisory("new2", now)).unwrap();

        assert_eq!(store.recent_advisory_count(now, 24 * HOUR_MS), 2);
    }

    #[test]
    fn test_pending_queue_fifo() {
        let store = Store::open_in_memory().unwrap();
        let first = PendingAction::new(ActionKind::WeatherUpdate, json!({"t": 1}));
        let second = PendingAction::new(ActionKind::AdvisoryRead, json!({"id": "a1"}));

        store.enqueue_pending_action(first.clone()).unwrap();
        store.enqueue_pending_action(second.clone()).unwrap();
        assert_eq!(store.pending_queue(), vec![first, second]);

        store.clear_pending_queue().unwrap();
        assert!(store.pending_queue().is_empty());
    }

    #[test]
    fn test_settle_keeps_late_arrivals() {
        let store = Store::open_in_memory().unwrap();
        let a = PendingAction::new(ActionKind::SoilUpdate, json!({"ph": 6.5}));
        let b = PendingAction::new(ActionKind::AdvisoryRead, json!({"id": "x"}));
        store.enqueue_pending_action(a.clone()).unwrap();

        let snapshot = store.pending_queue();
        store.enqueue_pending_action(b.clone()).unwrap();

        assert_eq!(store.settle_pending_queue(&snapshot).unwrap(), 1);
        assert_eq!(store.pending_queue(), vec![b]);
    }

    #[test]
    fn test_sync_timestamp() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.last_sync_timestamp(), None);

        let recorded = store.record_sync_timestamp().unwrap();
        assert!(recorded > 0);
        assert_eq!(store.last_sync_timestamp(), Some(recorded));
    }

    #[test]
    fn test_reads_browser_written_marker() {
        let store = seeded(keys::LAST_SYNC, "1700000000000");
        assert_eq!(store.last_sync_timestamp(), Some(1_700_000_000_000));

        let store = seeded(keys::LAST_SYNC, "yesterday");
        assert_eq!(store.last_sync_timestamp(), None);
    }

    #[test]
    fn test_corrupted_json_reads_as_empty() {
        let store = seeded(keys::ADVISORIES, "[{\"id\": \"a1\", ");
        assert!(store.advisories().is_empty());

        // Writes recover the key
        store.save_advisory(advisory("a2", 5)).unwrap();
        assert_eq!(store.advisories().len(), 1);
    }

    #[test]
    fn test_non_list_reads_as_empty() {
        let store = seeded(keys::WEATHER, "{\"temperature\": \"28°C\"}");
        assert!(store.weather().is_empty());
    }

    #[test]
    fn test_bad_elements_are_skipped() {
        let raw = json!([
            {"id": "ok", "title": "t", "content": "c", "category": "pest",
             "language": "en", "timestamp": 10, "isRead": false},
            {"id": "bad-category", "title": "t", "content": "c", "category": "market",
             "language": "en", "timestamp": 10},
            {"id": "", "title": "t", "content": "c", "category": "general",
             "language": "en", "timestamp": 10},
            "not a record"
        ]);
        let store = seeded(keys::ADVISORIES, &raw.to_string());

        let advisories = store.advisories();
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].id, "ok");
    }

    #[test]
    fn test_reads_browser_queue() {
        let raw = r#"[{"type":"ADVISORY_READ","data":{"id":"advisory_1"},"timestamp":1700000000000},
                      {"type":"UNKNOWN_KIND","data":null,"timestamp":1700000000001}]"#;
        let store = seeded(keys::OFFLINE_QUEUE, raw);

        let queue = store.pending_queue();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].kind, ActionKind::AdvisoryRead);
        assert_eq!(queue[0].id, None);
    }

    #[test]
    fn test_invalid_records_are_rejected() {
        let store = Store::open_in_memory().unwrap();
        store.save_weather(weather_at(1_000)).unwrap();

        let err = store.save_weather(weather_at(0)).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(ref msg) if msg.contains("timestamp 0")));
        assert_eq!(store.weather(), vec![weather_at(1_000)]);

        let err = store.save_advisory(advisory("", 5)).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)));
        assert!(store.advisories().is_empty());

        let bad_soil = SoilHistoryEntry {
            ph: 40.0,
            timestamp: 5,
            ..Default::default()
        };
        assert!(store.save_soil_history(bad_soil).is_err());
        assert!(store.soil_history().is_empty());
    }

    #[test]
    fn test_unknown_actions_survive_queue_writes() {
        let raw = r#"[{"type":"CROP_UPDATE","data":{"crop":"rice"},"timestamp":1700000000000},
                      {"type":"SOIL_UPDATE","data":{},"timestamp":1700000000001}]"#;
        let store = seeded(keys::OFFLINE_QUEUE, raw);
        let known = store.pending_queue();
        assert_eq!(known.len(), 1);

        let late = PendingAction::new(ActionKind::WeatherUpdate, json!({}));
        store.enqueue_pending_action(late.clone()).unwrap();
        assert_eq!(store.settle_pending_queue(&known).unwrap(), 1);
        assert_eq!(store.pending_queue(), vec![late]);

        let stored: serde_json::Value =
            serde_json::from_str(&store.lock().get(keys::OFFLINE_QUEUE).unwrap().unwrap())
                .unwrap();
        let kinds: Vec<_> = stored
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(kinds, vec!["CROP_UPDATE", "WEATHER_UPDATE"]);
        assert_eq!(stored[0]["data"]["crop"], "rice");
    }

    #[test]
    fn test_unreadable_advisories_keep_their_place() {
        let raw = json!([
            advisory("a2", 20),
            {"id": "future", "category": "market", "timestamp": 15},
            advisory("a1", 10)
        ]);
        let store = seeded(keys::ADVISORIES, &raw.to_string());

        assert!(store.mark_advisory_read("a1").unwrap());
        store.save_advisory(advisory("a3", 30)).unwrap();

        let stored: serde_json::Value =
            serde_json::from_str(&store.lock().get(keys::ADVISORIES).unwrap().unwrap()).unwrap();
        let ids: Vec<_> = stored
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a3", "a2", "future", "a1"]);
        assert_eq!(stored[3]["isRead"], true);
        assert_eq!(store.advisories().len(), 3);
    }

    #[test]
    fn test_layout_version_written() {
        let backend = MemoryBackend::new();
        let store = Store::with_backend(backend).unwrap();
        let raw = store.lock().get(keys::SCHEMA_VERSION).unwrap();
        assert_eq!(raw, Some(LAYOUT_VERSION.to_string()));
    }

    #[test]
    fn test_summary() {
        let store = Store::open_in_memory().unwrap();
        store.save_weather(weather_at(1)).unwrap();
        store.save_advisory(advisory("a1", 1)).unwrap();
        store.save_advisory(advisory("a2", 2)).unwrap();
        store.mark_advisory_read("a2").unwrap();
        store
            .enqueue_pending_action(PendingAction::new(ActionKind::SoilUpdate, json!({})))
            .unwrap();

        let summary = store.summary();
        assert_eq!(summary.weather, 1);
        assert_eq!(summary.soil_history, 0);
        assert_eq!(summary.advisories, 2);
        assert_eq!(summary.unread_advisories, 1);
        assert_eq!(summary.pending_actions, 1);
        assert_eq!(summary.last_sync, None);
    }

    #[test]
    fn test_sqlite_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offline.db");

        {
            let store = Store::open(&path).unwrap();
            store.save_weather(weather_at(7)).unwrap();
            store.save_advisory(advisory("a1", 7)).unwrap();
        }

        let store = Store::open(&path).unwrap();
        assert_eq!(store.weather(), vec![weather_at(7)]);
        assert!(store.contains_advisory("a1"));
    }

    #[test]
    fn test_store_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Store>();
    }
}
