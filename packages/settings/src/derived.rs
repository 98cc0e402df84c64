// ABOUTME: Settings whose decoded value also depends on another observable
// ABOUTME: Recomputes on input changes and on storage changes it did not cause itself

use std::cell::{Cell, RefCell};
use std::ops::Deref;
use std::rc::Rc;

use cellar_reactive::{Signal, WeakSignal};
use tracing::{debug, warn};

use crate::error::SettingsResult;
use crate::raw::RawSettingValue;
use crate::registry::SettingsInner;
use crate::setting::Setting;

/// A [`Setting`] decoded from its stored value *and* the current value of an
/// input signal.
///
/// The input is held weakly: once every other handle to it is gone the
/// setting keeps its last value and stops recomputing.
pub struct DerivedSetting<T, I> {
    setting: Setting<T>,
    input: WeakSignal<I>,
}

/// What the recompute effect saw last
struct DerivedState<I> {
    /// Raw form of the value this setting holds, i.e. what storage will
    /// contain once the setting's own writes land
    expected: RefCell<RawSettingValue>,
    input: RefCell<I>,
    /// Set after the first run, which only subscribes
    primed: Cell<bool>,
}

impl<T, I> DerivedSetting<T, I>
where
    T: Clone + PartialEq + 'static,
    I: Clone + PartialEq + 'static,
{
    pub(crate) fn create(
        registry: &Rc<SettingsInner>,
        key: String,
        input: &Signal<I>,
        decode: impl Fn(&RawSettingValue, &I) -> T + 'static,
        encode: impl Fn(&T) -> RawSettingValue + 'static,
    ) -> SettingsResult<Self> {
        let decode = Rc::new(decode);
        let state = Rc::new(DerivedState {
            expected: RefCell::new(RawSettingValue::Null),
            input: RefCell::new(input.get_untracked()),
            primed: Cell::new(false),
        });

        // Plain decode for hydration and reset: the input as it is right now,
        // or as last seen if it has been dropped
        let base_decode = {
            let decode = decode.clone();
            let input = input.downgrade();
            let state = state.clone();
            move |raw: &RawSettingValue| match input.upgrade() {
                Some(input) => decode(raw, &input.get_untracked()),
                None => decode(raw, &state.input.borrow()),
            }
        };

        let setting = registry.create(key, Rc::new(base_decode), Rc::new(encode))?;
        *state.expected.borrow_mut() = setting.encode(&setting.value().get_untracked());

        {
            let setting = setting.clone();
            let input = input.downgrade();
            let weak_registry = Rc::downgrade(registry);
            registry.scope.effect(move || {
                let (Some(input), Some(registry)) = (input.upgrade(), weak_registry.upgrade())
                else {
                    return;
                };
                recompute(&registry, &setting, &input, &state, decode.as_ref());
            });
        }

        Ok(Self {
            setting,
            input: input.downgrade(),
        })
    }

    pub fn setting(&self) -> &Setting<T> {
        &self.setting
    }

    /// The input signal, if it is still alive
    pub fn input(&self) -> Option<Signal<I>> {
        self.input.upgrade()
    }
}

/// Body of the recompute effect. Subscribes to the input and to the key's
/// storage revision.
fn recompute<T, I>(
    registry: &SettingsInner,
    setting: &Setting<T>,
    input: &Signal<I>,
    state: &DerivedState<I>,
    decode: &dyn Fn(&RawSettingValue, &I) -> T,
) where
    T: Clone + PartialEq + 'static,
    I: Clone + PartialEq + 'static,
{
    let key = setting.key();
    let input_value = input.get();
    registry.revision(key).get();

    let raw = match registry.read_raw(key) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Skipping recompute of derived setting {}: {}", key, e);
            return;
        }
    };

    let first_run = !state.primed.replace(true);
    let input_changed = *state.input.borrow() != input_value;
    // Storage holding our own value is the echo of our own write
    if !input_changed && (first_run || raw == *state.expected.borrow()) {
        return;
    }

    let next = decode(&raw, &input_value);
    *state.input.borrow_mut() = input_value;

    let current = setting.value().get_untracked();
    if next == current {
        let encoded = setting.encode(&current);
        // The persist effect only runs on value changes, so a foreign raw
        // value that decodes to the current one has to be overwritten here
        if raw != encoded {
            registry.persist(key, encoded.clone());
        }
        *state.expected.borrow_mut() = encoded;
        return;
    }

    debug!("Derived setting {} recomputed from {} value", key, raw.type_name());
    *state.expected.borrow_mut() = setting.encode(&next);
    if let Err(e) = setting.set(next) {
        warn!("Could not update derived setting {}: {}", key, e);
    }
}

impl<T, I> Deref for DerivedSetting<T, I> {
    type Target = Setting<T>;

    fn deref(&self) -> &Setting<T> {
        &self.setting
    }
}

impl<T, I> Clone for DerivedSetting<T, I> {
    fn clone(&self) -> Self {
        Self {
            setting: self.setting.clone(),
            input: self.input.clone(),
        }
    }
}
