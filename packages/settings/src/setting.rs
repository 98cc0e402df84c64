// ABOUTME: A typed observable value bound to one storage key
// ABOUTME: Hydrates from storage on creation; the registry persists it whenever it changes

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use cellar_reactive::{Scope, Signal};
use cellar_storage::KeyValueStore;
use tracing::debug;

use crate::error::SettingsResult;
use crate::raw::{to_raw_value, RawSettingValue};

pub(crate) type Decoder<T> = Rc<dyn Fn(&RawSettingValue) -> T>;
pub(crate) type Encoder<T> = Rc<dyn Fn(&T) -> RawSettingValue>;

/// A named, typed, persisted observable value.
///
/// Handles are cheap to clone and all refer to the same cell. Create them
/// through [`Settings`](crate::Settings).
pub struct Setting<T> {
    inner: Rc<SettingInner<T>>,
}

pub(crate) struct SettingInner<T> {
    key: String,
    decode: Decoder<T>,
    encode: Encoder<T>,
    value: Signal<T>,
    storage: Arc<dyn KeyValueStore>,
}

/// Type-erased view of a setting, as held by the registry cache
pub(crate) trait AnySetting {
    /// Encoded current value. Tracked, so memos reading it re-run on change.
    fn raw_value(&self) -> RawSettingValue;
    fn reset(&self) -> SettingsResult<()>;
}

impl<T: Clone + PartialEq + 'static> AnySetting for SettingInner<T> {
    fn raw_value(&self) -> RawSettingValue {
        self.value.with(|value| (self.encode)(value))
    }

    fn reset(&self) -> SettingsResult<()> {
        let default = (self.decode)(&RawSettingValue::Null);
        self.value.set(default)?;
        Ok(())
    }
}

impl<T: Clone + PartialEq + 'static> Setting<T> {
    /// Read `key` from storage and build the cell from its decoded value.
    /// Fails when the stored shape cannot be classified.
    pub(crate) fn hydrate(
        key: String,
        decode: Decoder<T>,
        encode: Encoder<T>,
        scope: &Scope,
        storage: Arc<dyn KeyValueStore>,
    ) -> SettingsResult<Self> {
        let raw = to_raw_value(storage.get(&key).as_ref())?;
        debug!("Hydrating setting {} from {} value", key, raw.type_name());

        let value = scope.signal(decode(&raw));

        Ok(Self {
            inner: Rc::new(SettingInner {
                key,
                decode,
                encode,
                value,
                storage,
            }),
        })
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// The observable cell backing this setting
    pub fn value(&self) -> &Signal<T> {
        &self.inner.value
    }

    /// Current in-memory value; available before anything was persisted
    pub fn get(&self) -> T {
        self.inner.value.get()
    }

    /// Assign a new value. Persistence follows on the next flush.
    pub fn set(&self, value: T) -> SettingsResult<()> {
        self.inner.value.set(value)?;
        Ok(())
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) -> SettingsResult<()> {
        self.inner.value.update(f)?;
        Ok(())
    }

    /// Set the value to what an absent storage entry decodes to
    pub fn reset(&self) -> SettingsResult<()> {
        self.inner.reset()
    }

    /// Re-read the key from storage, picking up writes made by someone else
    pub fn reload(&self) -> SettingsResult<()> {
        let raw = to_raw_value(self.inner.storage.get(&self.inner.key).as_ref())?;
        self.set((self.inner.decode)(&raw))
    }

    pub fn decode(&self, raw: &RawSettingValue) -> T {
        (self.inner.decode)(raw)
    }

    pub fn encode(&self, value: &T) -> RawSettingValue {
        (self.inner.encode)(value)
    }

    pub(crate) fn encoder(&self) -> Encoder<T> {
        self.inner.encode.clone()
    }

    pub(crate) fn erased(&self) -> Rc<dyn AnySetting> {
        self.inner.clone()
    }
}

impl Setting<bool> {
    /// Flip the value; the new value is readable immediately
    pub fn toggle(&self) -> SettingsResult<()> {
        self.update(|value| *value = !*value)
    }
}

impl<T> Clone for Setting<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Setting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setting")
            .field("key", &self.inner.key)
            .field("value", &self.inner.value)
            .finish()
    }
}
