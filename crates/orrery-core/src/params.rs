//! Namespaced key/value parameters.
//!
//! [`ParamTree`] is the in-process stand-in for an external parameter
//! server: an insertion-ordered map from slash-separated keys to
//! [`ParamValue`]s. Parsing configuration files into a tree happens
//! outside this workspace.

use indexmap::IndexMap;

use crate::error::ParamError;

/// A single parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Ordered list of values.
    List(Vec<ParamValue>),
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Insertion-ordered parameter tree keyed by slash-separated paths.
///
/// Typed getters return `Ok(None)` for an absent key and
/// [`ParamError::TypeMismatch`] for a present key of the wrong type, so
/// callers can fall back to defaults without masking configuration
/// mistakes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamTree {
    values: IndexMap<String, ParamValue>,
}

fn normalize(key: &str) -> String {
    key.trim_matches('/').to_string()
}

impl ParamTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any previous one. Returns `self` for chaining.
    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) -> &mut Self {
        self.values.insert(normalize(key), value.into());
        self
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Raw value lookup.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(&normalize(key))
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(&normalize(key))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Typed boolean lookup.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ParamError> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(mismatch(key, "bool")),
        }
    }

    /// Typed float lookup. Integers are widened.
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ParamError> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Float(v)) => Ok(Some(*v)),
            Some(ParamValue::Int(v)) => Ok(Some(*v as f64)),
            Some(_) => Err(mismatch(key, "float")),
        }
    }

    /// Typed integer lookup.
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, ParamError> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Int(v)) => Ok(Some(*v)),
            Some(_) => Err(mismatch(key, "int")),
        }
    }

    /// Typed unsigned lookup; negative or oversized values are out of range.
    pub fn get_u32(&self, key: &str) -> Result<Option<u32>, ParamError> {
        match self.get_i64(key)? {
            None => Ok(None),
            Some(v) => u32::try_from(v).map(Some).map_err(|_| ParamError::OutOfRange {
                key: normalize(key),
                reason: format!("{v} does not fit in u32"),
            }),
        }
    }

    /// Typed string lookup.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>, ParamError> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Str(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(mismatch(key, "string")),
        }
    }

    /// Typed list-of-strings lookup.
    pub fn get_str_list(&self, key: &str) -> Result<Option<Vec<String>>, ParamError> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::List(items)) => items
                .iter()
                .map(|item| match item {
                    ParamValue::Str(s) => Ok(s.clone()),
                    _ => Err(mismatch(key, "list of strings")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(mismatch(key, "list of strings")),
        }
    }

    /// Sub-tree of every key under `prefix`, with the prefix stripped.
    ///
    /// ```
    /// use orrery_core::ParamTree;
    ///
    /// let tree = ParamTree::new()
    ///     .with("cam_config/front/width", 640)
    ///     .with("headless", true);
    /// let front = tree.scoped("cam_config/front");
    /// assert_eq!(front.get_u32("width").unwrap(), Some(640));
    /// assert!(!front.contains("headless"));
    /// ```
    pub fn scoped(&self, prefix: &str) -> ParamTree {
        let prefix = normalize(prefix);
        if prefix.is_empty() {
            return self.clone();
        }
        let lead = format!("{prefix}/");
        let values = self
            .values
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&lead).map(|rest| (rest.to_string(), v.clone())))
            .collect();
        ParamTree { values }
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn mismatch(key: &str, expected: &'static str) -> ParamError {
    ParamError::TypeMismatch {
        key: normalize(key),
        expected,
    }
}
