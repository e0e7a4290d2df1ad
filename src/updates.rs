use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::io::Read;

/// Parameter name -> new default value. Keys are unique; inserting an
/// existing key replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRequest {
    entries: BTreeMap<String, String>,
}

impl UpdateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Parses positional `key=value` arguments, splitting on the first `=`.
    /// A repeated key keeps the value of its last occurrence.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut request = Self::new();
        for arg in args {
            let arg = arg.as_ref();
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                Error::configuration(format!("argument '{arg}' is not of the form key=value"))
            })?;
            if key.is_empty() {
                return Err(Error::configuration(format!(
                    "argument '{arg}' has an empty parameter name"
                )));
            }
            request.insert(key, value);
        }
        Ok(request)
    }

    /// Reads a JSON object of string keys to string values.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let entries: BTreeMap<String, String> = serde_json::from_reader(reader)
            .map_err(|e| Error::configuration(format!("invalid JSON update payload: {e}")))?;
        if entries.contains_key("") {
            return Err(Error::configuration("update payload has an empty parameter name"));
        }
        Ok(Self { entries })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UpdateRequest {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut request = Self::new();
        for (k, v) in iter {
            request.insert(k, v);
        }
        request
    }
}
