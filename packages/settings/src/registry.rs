// ABOUTME: Owning registry for settings
// ABOUTME: Creates and caches settings, persists their changes on flush and exposes an aggregate view

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use cellar_reactive::{Memo, ReactiveError, Scope, Signal};
use cellar_storage::{KeyValueStore, StorageError, StorageResult};
use futures::future::{join_all, LocalBoxFuture};
use futures::FutureExt;
use tracing::{debug, error, info, trace, warn};

use crate::codec::{
    decode_bool, decode_double, decode_int, decode_string, decode_string_list, encode_bool,
    encode_double, encode_int, encode_string, encode_string_list,
};
use crate::derived::DerivedSetting;
use crate::error::{SettingsError, SettingsResult};
use crate::raw::{to_raw_value, RawSettingValue};
use crate::setting::{AnySetting, Decoder, Encoder, Setting};

/// Upper bound on effect/write rounds within one [`Settings::flush`]
pub const MAX_FLUSH_ROUNDS: usize = 64;

/// What a flush did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Rounds that issued at least one storage write
    pub rounds: usize,
    pub effects_run: usize,
    pub writes: usize,
}

/// Immutable snapshot of the cache; every insertion swaps in a new one
#[derive(Clone, Default)]
struct SettingsCache(Rc<BTreeMap<String, Rc<dyn AnySetting>>>);

impl PartialEq for SettingsCache {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

struct PendingWrite {
    key: String,
    op: LocalBoxFuture<'static, StorageResult<()>>,
}

/// The owning context for a group of settings.
///
/// Typical use is two-phase: build the registry, then create each setting
/// through its factory methods and keep the handles in typed fields.
///
/// ```ignore
/// let settings = Settings::new(Arc::new(MemoryStorage::new()));
/// let dark_mode = settings.bool_setting("dark_mode", false)?;
/// dark_mode.toggle()?;
/// settings.flush().await?;
/// ```
pub struct Settings {
    inner: Rc<SettingsInner>,
}

pub(crate) struct SettingsInner {
    storage: Arc<dyn KeyValueStore>,
    pub(crate) scope: Scope,
    cache: Signal<SettingsCache>,
    all: Memo<BTreeMap<String, RawSettingValue>>,
    writes: RefCell<Vec<PendingWrite>>,
    revisions: RefCell<HashMap<String, Signal<u64>>>,
}

impl SettingsInner {
    pub(crate) fn read_raw(&self, key: &str) -> SettingsResult<RawSettingValue> {
        to_raw_value(self.storage.get(key).as_ref())
    }

    /// Signal bumped whenever a write to `key` lands or an external change
    /// is announced
    pub(crate) fn revision(&self, key: &str) -> Signal<u64> {
        self.revisions
            .borrow_mut()
            .entry(key.to_string())
            .or_insert_with(|| self.scope.signal(0))
            .clone()
    }

    fn bump(&self, key: &str) {
        let revision = self.revisions.borrow().get(key).cloned();
        if let Some(revision) = revision {
            // Fails only once disposed, when nobody listens anymore
            let _ = revision.update(|r| *r += 1);
        }
    }

    /// Build a setting, hook up its persistence effect and add it to the cache
    pub(crate) fn create<T: Clone + PartialEq + 'static>(
        self: &Rc<Self>,
        key: String,
        decode: Decoder<T>,
        encode: Encoder<T>,
    ) -> SettingsResult<Setting<T>> {
        if self.scope.is_disposed() {
            return Err(ReactiveError::Disposed.into());
        }

        let setting = Setting::hydrate(key, decode, encode, &self.scope, self.storage.clone())?;

        {
            let value = setting.value().clone();
            let encode = setting.encoder();
            let key = setting.key().to_string();
            let registry = Rc::downgrade(self);
            self.scope.effect(move || {
                let raw = value.with(|current| encode(current));
                if let Some(registry) = registry.upgrade() {
                    registry.persist(&key, raw);
                }
            });
        }

        let mut next = (*self.cache.get_untracked().0).clone();
        if next
            .insert(setting.key().to_string(), setting.erased())
            .is_some()
        {
            warn!("Setting {} was defined twice, replacing it", setting.key());
        }
        self.cache.set(SettingsCache(Rc::new(next)))?;

        Ok(setting)
    }

    /// Queue a write of `raw` unless storage already holds it
    pub(crate) fn persist(&self, key: &str, raw: RawSettingValue) {
        match self.read_raw(key) {
            Ok(stored) if stored == raw => {
                trace!("Setting {} already persisted", key);
                return;
            }
            Ok(_) => {}
            Err(e) => warn!("Overwriting unreadable value for {}: {}", key, e),
        }

        debug!("Queueing write for {} ({})", key, raw.type_name());
        let op = write_op(self.storage.clone(), key.to_string(), raw);
        self.writes.borrow_mut().push(PendingWrite {
            key: key.to_string(),
            op,
        });
    }
}

fn write_op(
    storage: Arc<dyn KeyValueStore>,
    key: String,
    raw: RawSettingValue,
) -> LocalBoxFuture<'static, StorageResult<()>> {
    async move {
        match raw {
            RawSettingValue::String(v) => storage.set_string(&key, v).await,
            RawSettingValue::Int(v) => storage.set_int(&key, v).await,
            RawSettingValue::Double(v) => storage.set_double(&key, v).await,
            RawSettingValue::Bool(v) => storage.set_bool(&key, v).await,
            RawSettingValue::StringList(v) => storage.set_string_list(&key, v).await,
            RawSettingValue::Null => storage.remove(&key).await,
        }
    }
    .boxed_local()
}

impl Settings {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let scope = Scope::new();
        let cache = scope.signal(SettingsCache::default());
        let all: Memo<BTreeMap<String, RawSettingValue>> = {
            let cache = cache.clone();
            scope.memo(move || {
                cache
                    .get()
                    .0
                    .iter()
                    .map(|(key, setting)| (key.clone(), setting.raw_value()))
                    .collect()
            })
        };

        Self {
            inner: Rc::new(SettingsInner {
                storage,
                scope,
                cache,
                all,
                writes: RefCell::new(Vec::new()),
                revisions: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Define a setting with custom decode/encode functions
    pub fn setting<T: Clone + PartialEq + 'static>(
        &self,
        key: impl Into<String>,
        decode: impl Fn(&RawSettingValue) -> T + 'static,
        encode: impl Fn(&T) -> RawSettingValue + 'static,
    ) -> SettingsResult<Setting<T>> {
        self.inner
            .create(key.into(), Rc::new(decode), Rc::new(encode))
    }

    pub fn int_setting(&self, key: impl Into<String>, default: i64) -> SettingsResult<Setting<i64>> {
        self.setting(key, move |raw| decode_int(raw, default), encode_int)
    }

    pub fn double_setting(
        &self,
        key: impl Into<String>,
        default: f64,
    ) -> SettingsResult<Setting<f64>> {
        self.setting(key, move |raw| decode_double(raw, default), encode_double)
    }

    pub fn bool_setting(
        &self,
        key: impl Into<String>,
        default: bool,
    ) -> SettingsResult<Setting<bool>> {
        self.setting(key, move |raw| decode_bool(raw, default), encode_bool)
    }

    /// Nullable string; absent or mismatched values decode to `None`
    pub fn string_setting(&self, key: impl Into<String>) -> SettingsResult<Setting<Option<String>>> {
        self.setting(key, decode_string, encode_string)
    }

    pub fn string_list_setting(
        &self,
        key: impl Into<String>,
    ) -> SettingsResult<Setting<Vec<String>>> {
        self.setting(key, decode_string_list, encode_string_list)
    }

    /// Define a setting whose decoding also depends on `input`
    pub fn derived_setting<T, I>(
        &self,
        key: impl Into<String>,
        input: &Signal<I>,
        decode: impl Fn(&RawSettingValue, &I) -> T + 'static,
        encode: impl Fn(&T) -> RawSettingValue + 'static,
    ) -> SettingsResult<DerivedSetting<T, I>>
    where
        T: Clone + PartialEq + 'static,
        I: Clone + PartialEq + 'static,
    {
        DerivedSetting::create(&self.inner, key.into(), input, decode, encode)
    }

    /// Current value of every defined setting, keyed by setting key.
    ///
    /// Values are the encoded form of each setting's current value, not the
    /// decoded `T`.
    ///
    /// Recomputes when a setting is added or any value changes, without
    /// waiting for a flush.
    pub fn all_settings(&self) -> Memo<BTreeMap<String, RawSettingValue>> {
        self.inner.all.clone()
    }

    /// Reset every defined setting to its default
    pub fn clear(&self) -> SettingsResult<()> {
        let cache = self.inner.cache.get_untracked();
        info!("Resetting {} settings", cache.0.len());

        for setting in cache.0.values() {
            setting.reset()?;
        }
        Ok(())
    }

    /// Run pending effects and wait for the storage writes they issue,
    /// repeating until nothing is left.
    ///
    /// Every failed write is logged; the first failure is returned once the
    /// remaining writes have completed.
    pub async fn flush(&self) -> SettingsResult<FlushReport> {
        let mut report = FlushReport::default();
        let mut first_error: Option<StorageError> = None;

        loop {
            report.effects_run += self.inner.scope.flush()?;

            let writes = std::mem::take(&mut *self.inner.writes.borrow_mut());
            if writes.is_empty() {
                break;
            }

            if report.rounds == MAX_FLUSH_ROUNDS {
                warn!("Settings still changing after {} flush rounds", MAX_FLUSH_ROUNDS);
                return Err(SettingsError::FlushLimitExceeded(MAX_FLUSH_ROUNDS));
            }
            report.rounds += 1;
            report.writes += writes.len();

            let (keys, ops): (Vec<String>, Vec<_>) =
                writes.into_iter().map(|w| (w.key, w.op)).unzip();
            let results = join_all(ops).await;

            for (key, result) in keys.into_iter().zip(results) {
                match result {
                    Ok(()) => self.inner.bump(&key),
                    Err(e) => {
                        error!("Failed to persist setting {}: {}", key, e);
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        debug!(
            "Flushed settings: {} effects, {} writes in {} rounds",
            report.effects_run, report.writes, report.rounds
        );

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(report),
        }
    }

    /// Announce that `key` was changed in storage by someone else, so
    /// settings derived from it recompute on the next flush
    pub fn notify_storage_changed(&self, key: &str) {
        debug!("External change announced for {}", key);
        self.inner.bump(key);
    }

    /// Release every cell and effect and drop writes not yet awaited. Later
    /// writes fail with [`ReactiveError::Disposed`]; reads return the last
    /// value.
    pub fn dispose(&self) {
        if self.inner.scope.is_disposed() {
            return;
        }
        info!("Disposing settings registry ({} settings)", self.len());
        self.inner.scope.dispose();

        let dropped = std::mem::take(&mut *self.inner.writes.borrow_mut());
        if !dropped.is_empty() {
            debug!("Dropped {} unflushed writes on dispose", dropped.len());
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.scope.is_disposed()
    }

    /// Keys of every defined setting, sorted
    pub fn keys(&self) -> Vec<String> {
        self.inner.cache.get_untracked().0.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.cache.get_untracked().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.storage
    }

    /// Writes queued by effects that already ran, not yet awaited
    pub fn pending_writes(&self) -> usize {
        self.inner.writes.borrow().len()
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("keys", &self.keys())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
