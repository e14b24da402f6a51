//! In-memory representation of a parsed schema.
//!
//! A [`Schema`] is built once by the parser and then only read by the code
//! generator. Declaration order of tables, columns and references is preserved.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

pub const PROVIDER_KEY: &str = "provider";
pub const URL_KEY: &str = "url";
pub const DEFAULT_PROVIDER: &str = "sqlite";

/// Keys accepted by `set <key> <value>`
pub const CONFIGURATION_KEYS: [&str; 2] = [PROVIDER_KEY, URL_KEY];

/// Root of the AST
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Values assigned with `set`, `provider` is always present
    pub configuration: BTreeMap<String, String>,
    /// Tables in declaration order
    pub tables: Vec<Table>,
}

impl Default for Schema {
    fn default() -> Self {
        let mut configuration = BTreeMap::new();
        configuration.insert(PROVIDER_KEY.to_string(), DEFAULT_PROVIDER.to_string());
        Self {
            configuration,
            tables: Vec::new(),
        }
    }
}

impl Schema {
    pub fn provider(&self) -> &str {
        self.configuration
            .get(PROVIDER_KEY)
            .map_or(DEFAULT_PROVIDER, String::as_str)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<Column>,
    /// Foreign keys declared by this table's columns
    pub references: Vec<Reference>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn reference_mut(&mut self, source_column: &str) -> Option<&mut Reference> {
        self.references
            .iter_mut()
            .find(|reference| reference.source_column == source_column)
    }
}

/// Type designator of a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// A logical type name such as `int`, resolved per dialect
    Named(String),
    /// A backtick literal, emitted verbatim from the column's [`Attribute::Raw`]
    Raw,
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Named(name) => write!(f, "{}", name),
            DataType::Raw => write!(f, "raw"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    /// At most one attribute per [`AttributeKind`]
    pub attributes: Vec<Attribute>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, kind: AttributeKind) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.kind() == kind)
    }

    pub fn has(&self, kind: AttributeKind) -> bool {
        self.attribute(kind).is_some()
    }
}

/// The closed set of column attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeKind {
    Id,
    Default,
    AutoIncrement,
    Nullable,
    Reference,
    OnDelete,
    OnUpdate,
    /// Synthetic, carries the literal of a backtick data type
    Raw,
}

impl AttributeKind {
    pub fn name(self) -> &'static str {
        match self {
            AttributeKind::Id => "id",
            AttributeKind::Default => "default",
            AttributeKind::AutoIncrement => "auto_increment",
            AttributeKind::Nullable => "nullable",
            AttributeKind::Reference => "reference",
            AttributeKind::OnDelete => "onDelete",
            AttributeKind::OnUpdate => "onUpdate",
            AttributeKind::Raw => "raw",
        }
    }
}

impl FromStr for AttributeKind {
    type Err = String;

    /// Only the names a source file may write, `raw` is internal
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(AttributeKind::Id),
            "default" => Ok(AttributeKind::Default),
            "auto_increment" => Ok(AttributeKind::AutoIncrement),
            "nullable" => Ok(AttributeKind::Nullable),
            "reference" => Ok(AttributeKind::Reference),
            "onDelete" => Ok(AttributeKind::OnDelete),
            "onUpdate" => Ok(AttributeKind::OnUpdate),
            _ => Err(format!("Unknown attribute @{}", s)),
        }
    }
}

impl Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A validated attribute, each variant holds exactly the arguments it accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Id,
    AutoIncrement,
    Nullable,
    Default(Argument),
    Reference { table: String, column: String },
    OnDelete(String),
    OnUpdate(String),
    Raw(String),
}

impl Attribute {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Attribute::Id => AttributeKind::Id,
            Attribute::AutoIncrement => AttributeKind::AutoIncrement,
            Attribute::Nullable => AttributeKind::Nullable,
            Attribute::Default(_) => AttributeKind::Default,
            Attribute::Reference { .. } => AttributeKind::Reference,
            Attribute::OnDelete(_) => AttributeKind::OnDelete,
            Attribute::OnUpdate(_) => AttributeKind::OnUpdate,
            Attribute::Raw(_) => AttributeKind::Raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    /// `"..."`, quoted on output
    String,
    /// `` `...` ``, emitted as written
    RawExpression,
}

/// One value inside `@name(...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub value: String,
    pub kind: ArgumentKind,
}

impl Argument {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: ArgumentKind::String,
        }
    }

    pub fn raw(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: ArgumentKind::RawExpression,
        }
    }
}

/// Foreign key from a column of the owning table to an earlier table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}
