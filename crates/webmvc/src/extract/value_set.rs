use crate::error::ClientError;
use crate::request::RequestContext;
use mime::Mime;
use std::collections::HashMap;

/// The flat key to text view of a request that handler arguments are bound from.
///
/// Sources are merged in this order, a later source replacing the value of an earlier key:
/// query string, urlencoded form body, path parameters, json object body.
///
/// Keys keep the position of their first insertion. Lookups and replacements go through a
/// key index, so merging stays linear in the number of pairs.
#[derive(Debug, Clone, Default)]
pub struct RequestValueSet {
    entries: Vec<Option<(String, String)>>,
    index: HashMap<String, usize>,
}

impl RequestValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_request(ctx: &RequestContext) -> Result<Self, ClientError> {
        let mut values = Self::new();
        values.merge_query(ctx.uri().query().unwrap_or_default())?;

        let content_type = ctx.content_type().unwrap_or_default();
        let body = ctx.body();
        if !body.is_empty() && is_form(content_type) {
            values.merge_form(body)?;
        }

        for (key, value) in ctx.path_params().iter() {
            values.insert(key, value);
        }

        if !body.is_empty() && content_type.contains("json") {
            values.merge_json(body)?;
        }
        Ok(values)
    }

    pub fn merge_query(&mut self, query: &str) -> Result<(), ClientError> {
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .map_err(|e| ClientError::malformed_body(format!("query string: {e}")))?;
        self.extend(pairs);
        Ok(())
    }

    pub fn merge_form(&mut self, body: &[u8]) -> Result<(), ClientError> {
        let pairs =
            serde_urlencoded::from_bytes::<Vec<(String, String)>>(body).map_err(ClientError::malformed_body)?;
        self.extend(pairs);
        Ok(())
    }

    /// Merges the members of a json object.
    ///
    /// Strings are taken verbatim, other scalars by their json text, nested arrays and
    /// objects as compact json. A `null` member removes the key.
    pub fn merge_json(&mut self, body: &[u8]) -> Result<(), ClientError> {
        let object = serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(body)
            .map_err(ClientError::malformed_body)?;

        for (key, value) in object {
            match value {
                serde_json::Value::Null => self.remove(&key),
                serde_json::Value::String(s) => self.insert(key, s),
                other => self.insert(key, other.to_string()),
            }
        }
        Ok(())
    }

    /// Sets `key`, keeping its original position if it already exists.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        if let Some(&position) = self.index.get(&key)
            && let Some((_, slot)) = &mut self.entries[position]
        {
            *slot = value;
            return;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(Some((key, value)));
    }

    pub fn remove(&mut self, key: &str) {
        if let Some(position) = self.index.remove(key) {
            self.entries[position] = None;
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let position = *self.index.get(key)?;
        self.entries[position].as_ref().map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flatten().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl PartialEq for RequestValueSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for RequestValueSet {}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for RequestValueSet {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestValueSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut values = Self::new();
        values.extend(iter);
        values
    }
}

fn is_form(content_type: &str) -> bool {
    content_type
        .parse::<Mime>()
        .is_ok_and(|mime| mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str())
}
