use std::fmt;

/// A client-side location: path plus decoded query pairs. The query string
/// is kept as written so `full_path` reproduces it exactly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    path: String,
    query: Vec<(String, String)>,
    raw_query: String,
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            path: if path.is_empty() { "/".into() } else { path },
            query: Vec::new(),
            raw_query: String::new(),
        }
    }

    /// Parse `path?k=v&…`. Query components are percent-decoded; `+` is not
    /// treated as a space. A fragment, if any, is dropped.
    pub fn parse(full_path: &str) -> Self {
        let without_hash = full_path.split('#').next().unwrap_or_default();
        let (path, query_str) = match without_hash.split_once('?') {
            Some((p, q)) => (p, q),
            None => (without_hash, ""),
        };
        let query = query_str
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                (decode(k), decode(v))
            })
            .collect();
        Self {
            query,
            raw_query: query_str.to_string(),
            ..Self::new(path)
        }
    }

    /// Location of the login view carrying `target` as its `redirect` param.
    pub fn login_redirect(login_path: &str, target: &Location) -> Self {
        Self::new(login_path).with_query("redirect", target.full_path())
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let (key, value) = (key.into(), value.into());
        if !self.raw_query.is_empty() {
            self.raw_query.push('&');
        }
        self.raw_query.push_str(&urlencoding::encode(&key));
        self.raw_query.push('=');
        self.raw_query.push_str(&urlencoding::encode(&value));
        self.query.push((key, value));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Path plus query string.
    pub fn full_path(&self) -> String {
        if self.raw_query.is_empty() {
            return self.path.clone();
        }
        format!("{}?{}", self.path, self.raw_query)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}

fn decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}
