//! String and type identifier storage.
//!
//! Method bodies never hold names directly. Caught exception types, local variable names,
//! types and signatures, source file names and parameter names are integer keys into the
//! enclosing module's string and type pools. The [`IdentifierStore`] trait is the seam through
//! which rendering resolves those keys and parsing interns new names; [`Identifiers`] is the
//! in-memory implementation used by the command line tool and the tests.
//!
//! Unknown keys render as `type@N` / `string@N`, and the text reader accepts both forms, so a
//! method can be round-tripped without any identifier information at all.

use std::collections::HashMap;

/// Resolves and interns string and type identifiers by integer key.
pub trait IdentifierStore {
    /// Descriptor of the type with key `index`, e.g. `Ljava/lang/Exception;`.
    fn type_name(&self, index: u32) -> Option<&str>;

    /// Contents of the string with key `index`.
    fn string(&self, index: u32) -> Option<&str>;

    /// Returns the key of the type `name`, adding it if necessary.
    fn intern_type(&mut self, name: &str) -> u32;

    /// Returns the key of the string `value`, adding it if necessary.
    fn intern_string(&mut self, value: &str) -> u32;
}

/// Vector-backed identifier pools with reverse lookup maps.
///
/// # Examples
///
/// ```rust
/// use dexscope::identifiers::{IdentifierStore, Identifiers};
///
/// let mut ids = Identifiers::new();
/// let exception = ids.intern_type("Ljava/lang/Exception;");
/// assert_eq!(ids.intern_type("Ljava/lang/Exception;"), exception);
/// assert_eq!(ids.type_name(exception), Some("Ljava/lang/Exception;"));
/// assert_eq!(ids.string(7), None);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Identifiers {
    types: Vec<String>,
    strings: Vec<String>,
    type_keys: HashMap<String, u32>,
    string_keys: HashMap<String, u32>,
}

impl Identifiers {
    /// Creates empty pools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of types in the pool.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Number of strings in the pool.
    #[must_use]
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    /// Types in key order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }

    /// Strings in key order.
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }
}

impl IdentifierStore for Identifiers {
    fn type_name(&self, index: u32) -> Option<&str> {
        self.types.get(index as usize).map(String::as_str)
    }

    fn string(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    fn intern_type(&mut self, name: &str) -> u32 {
        intern(&mut self.types, &mut self.type_keys, name)
    }

    fn intern_string(&mut self, value: &str) -> u32 {
        intern(&mut self.strings, &mut self.string_keys, value)
    }
}

fn intern(pool: &mut Vec<String>, keys: &mut HashMap<String, u32>, value: &str) -> u32 {
    if let Some(&key) = keys.get(value) {
        return key;
    }

    let key = pool.len() as u32;
    pool.push(value.to_string());
    keys.insert(value.to_string(), key);
    key
}

/// Text form of an optional type key: the descriptor, `type@N`, or `null`.
#[must_use]
pub fn display_type(ids: &dyn IdentifierStore, index: Option<u32>) -> String {
    match index {
        None => "null".to_string(),
        Some(index) => ids
            .type_name(index)
            .map_or_else(|| format!("type@{index}"), str::to_string),
    }
}

/// Text form of an optional string key: a quoted literal, `string@N`, or `null`.
#[must_use]
pub fn display_string(ids: &dyn IdentifierStore, index: Option<u32>) -> String {
    match index {
        None => "null".to_string(),
        Some(index) => match ids.string(index) {
            Some(value) => quote(value),
            None => format!("string@{index}"),
        },
    }
}

/// Quotes and escapes a string literal.
#[must_use]
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
