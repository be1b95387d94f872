//! Paging, sorting and filtering parameters for list endpoints.
//!
//! The wire form matches what the API's query binder expects for
//! `[FromQuery] QueryOptions opts, [FromQuery] List<FilterRule> filters`:
//! indexed arrays (`filters[0].field=...`), unencoded keys, encoded values,
//! absent values skipped.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

/// Everything except RFC 3986 unreserved characters; spaces become `%20`.
pub(crate) const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<SortDir>,
    pub search: Option<String>,
}

impl QueryOptions {
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    pub fn sorted_by(mut self, field: impl Into<String>, dir: SortDir) -> Self {
        self.sort_by = Some(field.into());
        self.sort_dir = Some(dir);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }
}

/// One filter clause. Operators are passed through to the API untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub field: String,
    pub op: String,
    pub value: String,
}

impl FilterRule {
    pub fn new(field: impl Into<String>, op: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: op.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub options: QueryOptions,
    pub filters: Vec<FilterRule>,
}

impl ListQuery {
    pub fn new(options: QueryOptions) -> Self {
        Self {
            options,
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, rule: FilterRule) -> Self {
        self.filters.push(rule);
        self
    }

    /// Query string without the leading `?`; empty when nothing is set.
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<(String, String)> = Vec::new();
        let opts = &self.options;

        if let Some(page) = opts.page {
            pairs.push(("page".into(), page.to_string()));
        }
        if let Some(page_size) = opts.page_size {
            pairs.push(("pageSize".into(), page_size.to_string()));
        }
        if let Some(sort_by) = &opts.sort_by {
            pairs.push(("sortBy".into(), sort_by.clone()));
        }
        if let Some(sort_dir) = opts.sort_dir {
            pairs.push(("sortDir".into(), sort_dir.as_str().into()));
        }
        if let Some(search) = &opts.search {
            pairs.push(("search".into(), search.clone()));
        }
        for (i, rule) in self.filters.iter().enumerate() {
            pairs.push((format!("filters[{i}].field"), rule.field.clone()));
            pairs.push((format!("filters[{i}].op"), rule.op.clone()));
            pairs.push((format!("filters[{i}].value"), rule.value.clone()));
        }

        pairs
            .into_iter()
            .map(|(key, value)| format!("{key}={}", utf8_percent_encode(&value, COMPONENT)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// `path` with this query appended.
    pub fn apply_to(&self, path: &str) -> String {
        let query = self.to_query_string();
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        }
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedList<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl<T> PagedList<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}
