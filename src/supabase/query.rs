use std::collections::BTreeMap;

use url::form_urlencoded;

/// Query input for a REST request, in any of the shapes callers have on hand.
#[derive(Debug, Clone)]
pub enum Query {
    /// A pre-assembled query string, with or without the leading `?`.
    Raw(String),
    /// Key/value map; rendered in key order.
    Map(BTreeMap<String, String>),
    /// Parameter list; rendered in the given order.
    Params(Vec<(String, String)>),
}

impl Query {
    pub fn raw(q: impl Into<String>) -> Self {
        Query::Raw(q.into())
    }

    pub fn param(key: impl Into<String>, value: impl Into<String>) -> Self {
        Query::Params(vec![(key.into(), value.into())])
    }

    fn has_select(&self) -> bool {
        match self {
            Query::Raw(s) => s
                .trim_start_matches('?')
                .split('&')
                .any(|seg| seg.starts_with("select=")),
            Query::Map(map) => map.contains_key("select"),
            Query::Params(pairs) => pairs.iter().any(|(k, _)| k == "select"),
        }
    }

    fn encode(&self) -> String {
        match self {
            Query::Raw(s) => s.trim().trim_start_matches('?').to_string(),
            Query::Map(map) => {
                let mut ser = form_urlencoded::Serializer::new(String::new());
                for (k, v) in map {
                    ser.append_pair(k, v);
                }
                ser.finish()
            }
            Query::Params(pairs) => {
                let mut ser = form_urlencoded::Serializer::new(String::new());
                for (k, v) in pairs {
                    ser.append_pair(k, v);
                }
                ser.finish()
            }
        }
    }
}

/// Render a query string with a single leading `?`, or an empty string when
/// there is nothing to send. When `default_select_all` is set (list reads) and
/// no explicit `select` parameter is present, `select=*` is appended so callers
/// never need to remember it; an explicit `select` is left untouched.
pub(crate) fn render(query: Option<&Query>, default_select_all: bool) -> String {
    let (mut encoded, has_select) = match query {
        Some(q) => (q.encode(), q.has_select()),
        None => (String::new(), false),
    };

    if default_select_all && !has_select {
        if !encoded.is_empty() {
            encoded.push('&');
        }
        encoded.push_str("select=*");
    }

    if encoded.is_empty() {
        String::new()
    } else {
        format!("?{encoded}")
    }
}
