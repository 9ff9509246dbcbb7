use std::collections::HashMap;
use std::ffi::CStr;

use libc::c_int;
use serde::de::DeserializeOwned;

use crate::abi::MosquittoOpt;

/// Read-only view over the `plugin_opt_*` entries the broker passes to init
/// and cleanup.
///
/// Entries with a null or non-UTF-8 key are skipped; a null value reads as an
/// empty string. When a key repeats, the last entry wins.
#[derive(Clone, Copy)]
pub struct OptionList<'a> {
    entries: &'a [MosquittoOpt],
}

impl<'a> OptionList<'a> {
    /// # Safety
    /// `options` must be null or point to `option_count` entries whose strings
    /// stay valid for `'a`.
    pub unsafe fn from_raw(options: *const MosquittoOpt, option_count: c_int) -> OptionList<'a> {
        if options.is_null() || option_count <= 0 {
            return OptionList { entries: &[] };
        }
        OptionList {
            entries: std::slice::from_raw_parts(options, option_count as usize),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let entries = self.entries;
        entries.iter().filter_map(|opt| {
            if opt.key.is_null() {
                return None;
            }
            let key = unsafe { CStr::from_ptr(opt.key) }.to_str().ok()?;
            let value = if opt.value.is_null() {
                ""
            } else {
                unsafe { CStr::from_ptr(opt.value) }.to_str().ok()?
            };
            Some((key, value))
        })
    }

    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.iter().filter(|(k, _)| *k == key).map(|(_, v)| v).last()
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, String> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => parse_bool(raw)
                .map(Some)
                .ok_or_else(|| format!("Option {} expects a boolean, got '{}'", key, raw)),
        }
    }

    pub fn get_positive_u64(&self, key: &str) -> Result<Option<u64>, String> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => parse_positive(raw)
                .map(Some)
                .ok_or_else(|| format!("Option {} expects a positive integer, got '{}'", key, raw)),
        }
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    /// Deserialises the whole list into `T`.
    ///
    /// Values arrive as strings and are coerced by `config`, so `"1500"`
    /// fills a `u64` field and `"yes"` a `bool` one. `config` reads keys as
    /// paths; keys that are not plain names (letters, digits, `_`, `-`) are
    /// left out rather than failing the whole list.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, String> {
        let mut builder = config::Config::builder();
        for (key, value) in self.iter() {
            if !is_plain_key(key) {
                crate::log_debug!(&format!("Skipping option '{}': not a plain key", key));
                continue;
            }
            builder = builder
                .set_override(key, value)
                .map_err(|e| format!("Invalid option {}: {}", key, e))?;
        }
        builder
            .build()
            .and_then(|c| c.try_deserialize::<T>())
            .map_err(|e| format!("Failed to read plugin options: {}", e))
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// `true/1/yes/on` and `false/0/no/off`, case-insensitive, surrounding
/// whitespace ignored.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|n| *n > 0)
}
