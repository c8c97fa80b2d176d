//! Column metadata for the active dataset
//!
//! The backend reports each column with its native dtype tag (Polars names such
//! as `Int64`/`Utf8`, or pandas-style names such as `float64`/`object`). The
//! catalog maps those tags onto a small semantic type set that drives chart
//! compatibility and pivot routing.
//!
//! The catalog is read-only to the engine: it is replaced wholesale whenever the
//! dataset is loaded or recast.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Semantic type of a column, derived from the backend dtype tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Integer,
    Decimal,
    Text,
    Date,
    DateTime,
    Boolean,
    Unknown,
}

impl SemanticType {
    /// Map a backend dtype tag to a semantic type
    ///
    /// Matching is case-insensitive. Parameterized tags such as
    /// `Datetime(time_unit='us')` or `datetime64[ns]` match on their prefix.
    /// Unrecognized tags never fail: they fall back to a numeric guess when the
    /// tag looks numeric, and to `Text` otherwise.
    pub fn from_backend_tag(tag: &str) -> Self {
        let lower = tag.trim().to_ascii_lowercase();

        match lower.as_str() {
            "int8" | "int16" | "int32" | "int64" | "uint8" | "uint16" | "uint32" | "uint64"
            | "integer" | "int" => return SemanticType::Integer,
            "float32" | "float64" | "numeric" | "decimal" | "float" => {
                return SemanticType::Decimal
            }
            "string" | "utf8" | "str" | "object" | "categorical" | "category" | "text" => {
                return SemanticType::Text
            }
            "date" => return SemanticType::Date,
            "datetime" | "timestamp" => return SemanticType::DateTime,
            "boolean" | "bool" => return SemanticType::Boolean,
            "null" | "unknown" => return SemanticType::Unknown,
            _ => {}
        }

        if lower.starts_with("datetime") || lower.starts_with("timestamp") {
            return SemanticType::DateTime;
        }
        if lower.starts_with("decimal") {
            return SemanticType::Decimal;
        }

        let guess = if lower.contains("int") {
            SemanticType::Integer
        } else if lower.contains("float") || lower.contains("decimal") || lower.contains("num") {
            SemanticType::Decimal
        } else {
            SemanticType::Text
        };
        tracing::warn!(tag, ?guess, "Unrecognized dtype tag, guessing");
        guess
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Decimal)
    }

    /// Text, Date, DateTime or Boolean: anything treated as discrete for charting
    pub fn is_categorical_like(self) -> bool {
        matches!(
            self,
            SemanticType::Text | SemanticType::Date | SemanticType::DateTime | SemanticType::Boolean
        )
    }
}

/// Types a column can be recast to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecastTarget {
    Text,
    Decimal,
    Integer,
}

impl RecastTarget {
    /// Dtype tag the backend expects in a recast request
    pub fn backend_tag(self) -> &'static str {
        match self {
            RecastTarget::Text => "String",
            RecastTarget::Decimal => "Float64",
            RecastTarget::Integer => "Int64",
        }
    }
}

impl std::str::FromStr for RecastTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(RecastTarget::Text),
            "decimal" | "float" | "float64" => Ok(RecastTarget::Decimal),
            "integer" | "int" | "int64" => Ok(RecastTarget::Integer),
            other => Err(format!("unknown recast type '{}'", other)),
        }
    }
}

/// One column of the active dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub dtype: SemanticType,
    pub is_numeric: bool,
    /// Native tag as reported by the backend
    pub backend_tag: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, backend_tag: impl Into<String>) -> Self {
        let backend_tag = backend_tag.into();
        let dtype = SemanticType::from_backend_tag(&backend_tag);
        Self {
            name: name.into(),
            dtype,
            is_numeric: dtype.is_numeric(),
            backend_tag,
        }
    }
}

/// Column metadata for the active dataset, keyed by column name
#[derive(Debug, Clone, Default)]
pub struct ColumnCatalog {
    columns: IndexMap<String, ColumnDescriptor>,
}

impl ColumnCatalog {
    /// Build a catalog, keeping the first descriptor for any repeated name
    pub fn new(descriptors: impl IntoIterator<Item = ColumnDescriptor>) -> Self {
        let mut columns = IndexMap::new();
        for descriptor in descriptors {
            if columns.contains_key(&descriptor.name) {
                tracing::warn!(column = %descriptor.name, "Duplicate column in metadata, ignoring");
                continue;
            }
            columns.insert(descriptor.name.clone(), descriptor);
        }
        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn dtype_of(&self, name: &str) -> Option<SemanticType> {
        self.columns.get(name).map(|c| c.dtype)
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.columns.get(name).is_some_and(|c| c.is_numeric)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
