// ABOUTME: Typed, observable, persisted application settings
// ABOUTME: Settings hydrate from a key/value store and write themselves back when they change

pub mod codec;
pub mod derived;
pub mod error;
pub mod raw;
pub mod registry;
pub mod setting;

// Re-export main types
pub use codec::{
    decode_bool, decode_double, decode_int, decode_string, decode_string_list, encode_bool,
    encode_double, encode_int, encode_string, encode_string_list,
};
pub use derived::DerivedSetting;
pub use error::{SettingsError, SettingsResult};
pub use raw::{to_raw_value, RawSettingValue};
pub use registry::{FlushReport, Settings, MAX_FLUSH_ROUNDS};
pub use setting::Setting;

pub use cellar_reactive::{Memo, Scope, Signal};
pub use cellar_storage::{KeyValueStore, StorageError};
