//! Record and query types for the Airtable record API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field map of a record. Keys are the column labels exactly as shown in Airtable.
pub type Fields = Map<String, Value>;

/// Turn a `json!({...})` object into a [`Fields`] map.
///
/// Non-object values yield an empty map.
#[must_use]
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

/// A single Airtable row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Record ID (`rec...`)
    pub id: String,
    /// Field values keyed by column label
    #[serde(default)]
    pub fields: Fields,
    /// Creation time as reported by Airtable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

impl Record {
    /// Get a raw field value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a field as a string slice, if it is a string.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl SortDirection {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Query options for listing records.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Airtable formula; only records where it evaluates truthy are returned
    pub filter_by_formula: Option<String>,
    /// Stop after this many records across all pages
    pub max_records: Option<usize>,
    /// Records per page (Airtable caps this at 100)
    pub page_size: Option<usize>,
    /// Name or ID of a view to read through
    pub view: Option<String>,
    /// Only return these fields
    pub fields: Vec<String>,
    /// Sort order as `(field, direction)` pairs
    pub sort: Vec<(String, SortDirection)>,
}

impl ListQuery {
    /// Empty query (all records).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with an Airtable formula.
    #[must_use]
    pub fn filter(mut self, formula: impl Into<String>) -> Self {
        self.filter_by_formula = Some(formula.into());
        self
    }

    /// Cap the total number of records.
    #[must_use]
    pub const fn max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Set the page size.
    #[must_use]
    pub const fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Read through a view.
    #[must_use]
    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    /// Restrict returned fields.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into());
        self
    }

    /// Append a sort key.
    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push((field.into(), direction));
        self
    }

    /// Render as query-string pairs in Airtable's bracket notation.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(formula) = &self.filter_by_formula {
            params.push(("filterByFormula".to_string(), formula.clone()));
        }
        if let Some(max) = self.max_records {
            params.push(("maxRecords".to_string(), max.to_string()));
        }
        if let Some(size) = self.page_size {
            params.push(("pageSize".to_string(), size.min(100).to_string()));
        }
        if let Some(view) = &self.view {
            params.push(("view".to_string(), view.clone()));
        }
        for field in &self.fields {
            params.push(("fields[]".to_string(), field.clone()));
        }
        for (i, (field, direction)) in self.sort.iter().enumerate() {
            params.push((format!("sort[{i}][field]"), field.clone()));
            params.push((format!("sort[{i}][direction]"), direction.as_str().to_string()));
        }

        params
    }
}
