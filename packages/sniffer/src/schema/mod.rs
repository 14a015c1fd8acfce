//! Schema registry: typed record shapes and dynamic construction.
//!
//! A [`RecordSchema`] names the fields the pipeline extracts and the
//! persistence layer turns into columns. Shapes come from two places:
//! a fixed set of built-ins ([`resolve`]) and on-the-fly construction
//! from model-proposed column lists ([`RecordSchema::from_columns`]).
//! Proposed column kinds are semi-trusted, so parsing is total: an
//! unrecognized kind becomes [`FieldKind::OptionalString`] instead of
//! rejecting the whole shape.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Built-in schema id: lender financial terms.
pub const LENDER_TERMS: &str = "lender_terms";

/// Built-in schema id: generic contact extraction.
pub const CONTACT: &str = "contact";

/// Built-in schema id: narrow contact extraction.
pub const CONTACT_BASIC: &str = "contact_basic";

/// The kind of a single record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    StringList,
    Mapping,
    OptionalString,
    OptionalInteger,
    OptionalFloat,
    OptionalBoolean,
}

impl FieldKind {
    /// Parse a kind string from a proposed column list.
    ///
    /// Total: unknown strings map to `OptionalString`.
    pub fn parse(kind: &str) -> Self {
        match kind.trim().to_lowercase().as_str() {
            "str" | "string" => Self::String,
            "int" | "integer" => Self::Integer,
            "float" => Self::Float,
            "bool" | "boolean" => Self::Boolean,
            "list" => Self::StringList,
            "dict" => Self::Mapping,
            "optional_int" => Self::OptionalInteger,
            "optional_float" => Self::OptionalFloat,
            "optional_bool" => Self::OptionalBoolean,
            _ => Self::OptionalString,
        }
    }

    /// Whether the field tolerates a null value.
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            Self::OptionalString
                | Self::OptionalInteger
                | Self::OptionalFloat
                | Self::OptionalBoolean
        )
    }

    fn json_type(&self) -> Value {
        match self {
            Self::String => json!("string"),
            Self::Integer => json!("integer"),
            Self::Float => json!("number"),
            Self::Boolean => json!("boolean"),
            Self::StringList => json!("array"),
            Self::Mapping => json!("object"),
            Self::OptionalString => json!(["string", "null"]),
            Self::OptionalInteger => json!(["integer", "null"]),
            Self::OptionalFloat => json!(["number", "null"]),
            Self::OptionalBoolean => json!(["boolean", "null"]),
        }
    }
}

/// A single (name, kind) entry in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A proposed column from config generation.
///
/// Both members are optional because the proposal is model output;
/// entries without a name are dropped during schema construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    #[serde(default)]
    pub column_name: Option<String>,
    #[serde(default)]
    pub column_type: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            column_name: Some(name.into()),
            column_type: Some(kind.into()),
        }
    }
}

/// A named, ordered record shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// Create a schema, keeping the first occurrence of each field name.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        let mut seen = Vec::new();
        let mut unique = Vec::with_capacity(fields.len());
        for field in fields {
            if !seen.contains(&field.name) {
                seen.push(field.name.clone());
                unique.push(field);
            }
        }
        Self {
            name: name.into(),
            fields: unique,
        }
    }

    /// Build a schema from a proposed column list.
    ///
    /// Returns `None` when the list is empty or contains no entry with
    /// both a name and a kind. Unknown kinds default per
    /// [`FieldKind::parse`]; nothing here rejects.
    pub fn from_columns(name: impl Into<String>, columns: &[ColumnSpec]) -> Option<Self> {
        let fields: Vec<FieldSpec> = columns
            .iter()
            .filter_map(|column| {
                let field_name = column.column_name.as_deref()?.trim();
                let field_kind = column.column_type.as_deref()?;
                if field_name.is_empty() {
                    return None;
                }
                Some(FieldSpec::new(field_name, FieldKind::parse(field_kind)))
            })
            .collect();

        if fields.is_empty() {
            return None;
        }
        Some(Self::new(name, fields))
    }

    /// Field names in schema order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Render the JSON-schema document consumed by the structured
    /// scraping and completion capabilities.
    ///
    /// Every field is listed as required (optional fields are nullable
    /// instead), matching the strict structured-output convention.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for field in &self.fields {
            properties.insert(
                field.name.clone(),
                json!({ "type": field.kind.json_type() }),
            );
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": self.field_names(),
            "additionalProperties": false,
        })
    }
}

/// Look up a built-in schema by id.
///
/// Ids are case-tolerant. Unrecognized ids return `None` so callers
/// can fall back instead of failing the request.
pub fn resolve(schema_id: &str) -> Option<RecordSchema> {
    match schema_id.trim().to_lowercase().as_str() {
        LENDER_TERMS => Some(lender_terms()),
        CONTACT => Some(contact()),
        CONTACT_BASIC => Some(contact_basic()),
        _ => None,
    }
}

/// Lender financial terms gathered from product pages and search.
pub fn lender_terms() -> RecordSchema {
    RecordSchema::new(
        LENDER_TERMS,
        vec![
            FieldSpec::new("lender", FieldKind::String),
            FieldSpec::new("interest_rate_range", FieldKind::String),
            FieldSpec::new("loan_to_value", FieldKind::String),
            FieldSpec::new("minimum_credit_score", FieldKind::Integer),
            FieldSpec::new("loan_amount_range", FieldKind::String),
            FieldSpec::new("loan_tenure_range", FieldKind::String),
            FieldSpec::new("approval_time", FieldKind::String),
            FieldSpec::new("processing_fee", FieldKind::String),
            FieldSpec::new("special_offers", FieldKind::String),
        ],
    )
}

/// Generic contact extraction: people or businesses listed on a page.
pub fn contact() -> RecordSchema {
    RecordSchema::new(
        CONTACT,
        vec![
            FieldSpec::new("name", FieldKind::String),
            FieldSpec::new("phone", FieldKind::String),
            FieldSpec::new("email", FieldKind::OptionalString),
            FieldSpec::new("city", FieldKind::OptionalString),
            FieldSpec::new("address", FieldKind::OptionalString),
            FieldSpec::new("specialization", FieldKind::OptionalString),
            FieldSpec::new("experience", FieldKind::OptionalString),
        ],
    )
}

/// Narrow contact extraction without profession details.
pub fn contact_basic() -> RecordSchema {
    RecordSchema::new(
        CONTACT_BASIC,
        vec![
            FieldSpec::new("name", FieldKind::String),
            FieldSpec::new("phone", FieldKind::String),
            FieldSpec::new("email", FieldKind::OptionalString),
            FieldSpec::new("city", FieldKind::OptionalString),
            FieldSpec::new("address", FieldKind::OptionalString),
        ],
    )
}
