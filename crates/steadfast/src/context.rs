//! Cross-step values and placeholder expansion.
//!
//! Step arguments and repository names may embed tokens that are replaced
//! before they reach the engine:
//!
//! | Token | Replaced with |
//! |-------|---------------|
//! | `CONTEXT-<key>` | value stored under `key` by an earlier step |
//! | `RANDOM-<len>[-ALPHA\|-NUMERIC\|-ALPHANUMERIC]` | fresh random string |
//! | `UPLOAD-<relative path>` | absolute path under the upload root |
//! | `PROPERTY-<name>` | configuration property |
//!
//! A token that cannot be resolved is an error. It is never passed through
//! as literal text.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::seq::SliceRandom;
use regex::{Captures, Regex};
use tracing::debug;

use crate::config::EngineConfig;
use crate::result::{SteadfastError, SteadfastResult};

const PLACEHOLDER_PATTERN: &str = concat!(
    r"CONTEXT-(?P<context>[A-Za-z0-9_]+)",
    r"|PROPERTY-(?P<property>[A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)",
    r"|RANDOM-(?P<len>\d+)(?:-(?P<alphabet>ALPHANUMERIC|ALPHA|NUMERIC))?",
    r"|UPLOAD-(?P<upload>\S+)",
);

const ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMERIC: &[u8] = b"0123456789";
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Upper bound for `RANDOM-<len>`
pub const MAX_RANDOM_LEN: usize = 4096;

/// Character set for `RANDOM-` tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alphabet {
    /// Letters
    Alpha,
    /// Digits
    Numeric,
    /// Letters and digits
    #[default]
    Alphanumeric,
}

impl Alphabet {
    const fn charset(self) -> &'static [u8] {
        match self {
            Self::Alpha => ALPHA,
            Self::Numeric => NUMERIC,
            Self::Alphanumeric => ALPHANUMERIC,
        }
    }

    fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("ALPHA") => Self::Alpha,
            Some("NUMERIC") => Self::Numeric,
            _ => Self::Alphanumeric,
        }
    }
}

/// Random string of `len` characters from `alphabet`
#[must_use]
pub fn random_string(len: usize, alphabet: Alphabet) -> String {
    let mut rng = rand::thread_rng();
    let charset = alphabet.charset();
    (0..len)
        .filter_map(|_| charset.choose(&mut rng).map(|&b| char::from(b)))
        .collect()
}

/// String-keyed store shared by the steps of one scenario
#[derive(Debug, Default)]
pub struct ContextStore {
    values: Mutex<HashMap<String, String>>,
    properties: BTreeMap<String, String>,
    upload_root: PathBuf,
}

impl ContextStore {
    /// Empty store; uploads resolve against the current directory
    #[must_use]
    pub fn new() -> Self {
        Self {
            upload_root: PathBuf::from("."),
            ..Self::default()
        }
    }

    /// Store wired to a configuration's properties and upload root
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            values: Mutex::default(),
            properties: config.properties.clone(),
            upload_root: config.upload_dir.clone(),
        }
    }

    /// Set the upload root
    #[must_use]
    pub fn with_upload_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.upload_root = root.into();
        self
    }

    /// Add a property
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.properties.insert(name.into(), value.into());
        self
    }

    /// Directory `UPLOAD-` tokens resolve against
    #[must_use]
    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a value, returning the one it replaced
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.lock().insert(key.into(), value.into())
    }

    /// Stored value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Remove a value
    pub fn remove(&self, key: &str) -> Option<String> {
        self.lock().remove(key)
    }

    /// Drop every stored value
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored values
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Replace every placeholder token in `text`.
    ///
    /// # Errors
    ///
    /// [`SteadfastError::Context`] for an unknown key or property, an
    /// oversized random length, or an upload path that does not exist.
    pub fn expand(&self, text: &str) -> SteadfastResult<String> {
        if !text.contains('-') {
            return Ok(text.to_string());
        }
        let pattern = Regex::new(PLACEHOLDER_PATTERN)
            .map_err(|e| SteadfastError::context(format!("placeholder pattern: {e}")))?;

        let mut expanded = String::with_capacity(text.len());
        let mut last = 0;
        for caps in pattern.captures_iter(text) {
            let Some(token) = caps.get(0) else { continue };
            expanded.push_str(&text[last..token.start()]);
            expanded.push_str(&self.substitute(&caps)?);
            last = token.end();
        }
        expanded.push_str(&text[last..]);

        if expanded != text {
            debug!(input = text, output = %expanded, "expanded placeholders");
        }
        Ok(expanded)
    }

    fn substitute(&self, caps: &Captures<'_>) -> SteadfastResult<String> {
        if let Some(key) = caps.name("context") {
            return self.get(key.as_str()).ok_or_else(|| {
                SteadfastError::context(format!("no stored value for '{}'", key.as_str()))
            });
        }
        if let Some(name) = caps.name("property") {
            return self.properties.get(name.as_str()).cloned().ok_or_else(|| {
                SteadfastError::context(format!("no property named '{}'", name.as_str()))
            });
        }
        if let Some(len) = caps.name("len") {
            let len: usize = len
                .as_str()
                .parse()
                .map_err(|_| SteadfastError::context(format!("bad random length '{}'", len.as_str())))?;
            if len > MAX_RANDOM_LEN {
                return Err(SteadfastError::context(format!(
                    "random length {len} exceeds {MAX_RANDOM_LEN}"
                )));
            }
            let alphabet = Alphabet::from_flag(caps.name("alphabet").map(|m| m.as_str()));
            return Ok(random_string(len, alphabet));
        }
        if let Some(relative) = caps.name("upload") {
            return self.upload_path(relative.as_str());
        }
        Ok(caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default())
    }

    fn upload_path(&self, relative: &str) -> SteadfastResult<String> {
        let path = self.upload_root.join(relative);
        let absolute = path.canonicalize().map_err(|e| {
            SteadfastError::context(format!("upload file '{}' not found: {e}", path.display()))
        })?;
        Ok(absolute.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod store_tests {
        use super::*;

        #[test]
        fn test_set_get_remove() {
            let store = ContextStore::new();
            assert!(store.is_empty());
            assert_eq!(store.set("orderId", "A-17"), None);
            assert_eq!(store.get("orderId").as_deref(), Some("A-17"));
            assert_eq!(store.set("orderId", "B-2").as_deref(), Some("A-17"));
            assert_eq!(store.remove("orderId").as_deref(), Some("B-2"));
            assert!(store.get("orderId").is_none());
        }

        #[test]
        fn test_clear() {
            let store = ContextStore::new();
            let _ = store.set("a", "1");
            let _ = store.set("b", "2");
            assert_eq!(store.len(), 2);
            store.clear();
            assert!(store.is_empty());
        }
    }

    mod expand_tests {
        use super::*;

        #[test]
        fn test_plain_text_untouched() {
            let store = ContextStore::new();
            assert_eq!(store.expand("submitButton").unwrap(), "submitButton");
            assert_eq!(store.expand("half-way").unwrap(), "half-way");
        }

        #[test]
        fn test_context_token() {
            let store = ContextStore::new();
            let _ = store.set("user_name", "ada");
            assert_eq!(
                store.expand("Hello CONTEXT-user_name!").unwrap(),
                "Hello ada!"
            );
        }

        #[test]
        fn test_unknown_context_key() {
            let err = ContextStore::new().expand("CONTEXT-missing").unwrap_err();
            assert!(matches!(err, SteadfastError::Context { .. }));
            assert!(err.to_string().contains("missing"));
        }

        #[test]
        fn test_property_token() {
            let store = ContextStore::new().with_property("base.url", "https://shop.test");
            assert_eq!(
                store.expand("PROPERTY-base.url/cart").unwrap(),
                "https://shop.test/cart"
            );
        }

        #[test]
        fn test_property_token_ignores_trailing_dot() {
            let store = ContextStore::new().with_property("env", "staging");
            assert_eq!(store.expand("on PROPERTY-env.").unwrap(), "on staging.");
        }

        #[test]
        fn test_unknown_property() {
            assert!(ContextStore::new().expand("PROPERTY-nope").is_err());
        }

        #[test]
        fn test_several_tokens() {
            let store = ContextStore::new().with_property("domain", "example.test");
            let _ = store.set("user", "bob");
            assert_eq!(
                store.expand("CONTEXT-user@PROPERTY-domain").unwrap(),
                "bob@example.test"
            );
        }
    }

    mod random_tests {
        use super::*;

        #[test]
        fn test_default_alphabet_is_alphanumeric() {
            let out = ContextStore::new().expand("RANDOM-24").unwrap();
            assert_eq!(out.len(), 24);
            assert!(out.chars().all(|c| c.is_ascii_alphanumeric()));
        }

        #[test]
        fn test_numeric_flag() {
            let out = ContextStore::new().expand("id-RANDOM-8-NUMERIC").unwrap();
            let digits = out.strip_prefix("id-").unwrap();
            assert_eq!(digits.len(), 8);
            assert!(digits.chars().all(|c| c.is_ascii_digit()));
        }

        #[test]
        fn test_alpha_flag() {
            let out = ContextStore::new().expand("RANDOM-12-ALPHA").unwrap();
            assert_eq!(out.len(), 12);
            assert!(out.chars().all(|c| c.is_ascii_alphabetic()));
        }

        #[test]
        fn test_zero_length() {
            assert_eq!(ContextStore::new().expand("[RANDOM-0]").unwrap(), "[]");
        }

        #[test]
        fn test_oversized_length_rejected() {
            assert!(ContextStore::new().expand("RANDOM-999999").is_err());
        }
    }

    mod upload_tests {
        use super::*;

        #[test]
        fn test_upload_resolves_under_root() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("avatar.png"), b"png").unwrap();
            let store = ContextStore::new().with_upload_root(dir.path());

            let out = store.expand("UPLOAD-avatar.png").unwrap();
            let expected = dir.path().join("avatar.png").canonicalize().unwrap();
            assert_eq!(PathBuf::from(out), expected);
        }

        #[test]
        fn test_upload_path_stops_at_whitespace() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir(dir.path().join("docs")).unwrap();
            std::fs::write(dir.path().join("docs/cv.pdf"), b"pdf").unwrap();
            let store = ContextStore::new().with_upload_root(dir.path());

            let out = store.expand("UPLOAD-docs/cv.pdf now").unwrap();
            assert!(out.ends_with(" now"));
            assert!(out.contains("cv.pdf"));
        }

        #[test]
        fn test_missing_upload_is_context_error() {
            let dir = tempfile::tempdir().unwrap();
            let store = ContextStore::new().with_upload_root(dir.path());
            let err = store.expand("UPLOAD-nothing.txt").unwrap_err();
            assert!(matches!(err, SteadfastError::Context { .. }));
        }

        #[test]
        fn test_from_config() {
            let dir = tempfile::tempdir().unwrap();
            let config = EngineConfig::new()
                .with_upload_dir(dir.path())
                .with_property("tenant", "acme");
            let store = ContextStore::from_config(&config);
            assert_eq!(store.upload_root(), dir.path());
            assert_eq!(store.expand("PROPERTY-tenant").unwrap(), "acme");
        }
    }
}
