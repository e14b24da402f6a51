//! SQL Code Generation
//!
//! Renders a parsed [`Schema`] as one `CREATE TABLE` statement per table, in
//! declaration order, for the dialect named by the schema's `provider`.

use std::str::FromStr;

use itertools::Itertools;
use regex::Regex;
use tracing::debug;

use super::ast::{
    Argument, ArgumentKind, Attribute, AttributeKind, Column, DataType, Reference, Schema, Table,
};
use super::error::{CompileError, CompileResult};

/// Table and column names the generator accepts
const NAME_PATTERN: &str = r"^[a-zA-Z_][a-zA-Z0-9_$]*$";

/// Supported target dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(format!("Provider not supported: '{}'", s)),
        }
    }
}

impl Dialect {
    /// Maps a logical type name to the dialect's column type
    pub fn sql_type(self, logical: &str) -> Option<&'static str> {
        match self {
            Dialect::Sqlite => match logical {
                "int" | "integer" => Some("INTEGER"),
                "string" => Some("TEXT"),
                "boolean" | "bool" => Some("NUMERIC"),
                "datetime" => Some("NUMERIC"),
                "float" => Some("REAL"),
                "blob" => Some("BLOB"),
                _ => None,
            },
        }
    }
}

/// Clauses of a column definition, collected from its attributes
#[derive(Default)]
struct ColumnClauses<'a> {
    primary_key: bool,
    default: Option<&'a Argument>,
    auto_increment: bool,
    nullable: bool,
}

pub struct Generator {
    dialect: Dialect,
    name_pattern: Regex,
}

impl Generator {
    pub fn new(dialect: Dialect) -> CompileResult<Self> {
        let name_pattern = Regex::new(NAME_PATTERN)
            .map_err(|e| CompileError::generation(format!("Invalid name pattern: {}", e)))?;
        Ok(Self {
            dialect,
            name_pattern,
        })
    }

    /// Generates the SQL text for a whole schema.
    ///
    /// Fails without producing any output if the provider is unsupported,
    /// the schema declares no tables, or any table cannot be rendered.
    pub fn generate(schema: &Schema) -> CompileResult<String> {
        let dialect: Dialect = schema
            .provider()
            .parse()
            .map_err(CompileError::generation)?;

        if schema.tables.is_empty() {
            return Err(CompileError::generation("No tables declared"));
        }

        let generator = Generator::new(dialect)?;
        let statements = schema
            .tables
            .iter()
            .map(|table| generator.create_table(table))
            .collect::<CompileResult<Vec<String>>>()?;

        Ok(format!("{}\n", statements.iter().join("\n\n")))
    }

    /// Renders a single `CREATE TABLE` statement
    pub fn create_table(&self, table: &Table) -> CompileResult<String> {
        if !self.name_pattern.is_match(&table.name) {
            return Err(CompileError::generation(format!(
                "Bad name for table '{}'",
                table.name
            )));
        }

        if table.columns.is_empty() {
            return Err(CompileError::generation(format!(
                "No columns specified for table '{}'",
                table.name
            )));
        }

        let mut sql = format!("CREATE TABLE {} (\n", table.name);

        for column in &table.columns {
            sql.push('\t');
            sql.push_str(&self.column_definition(table, column)?);
            sql.push_str(",\n");
        }

        for reference in &table.references {
            sql.push('\t');
            sql.push_str(&foreign_key(reference));
            sql.push_str(",\n");
        }

        sql.push_str(");");

        debug!("Generated statement for table '{}'", table.name);
        Ok(sql)
    }

    fn column_definition(&self, table: &Table, column: &Column) -> CompileResult<String> {
        if !self.name_pattern.is_match(&column.name) {
            return Err(CompileError::generation(format!(
                "Bad column name '{}' for table '{}'",
                column.name, table.name
            )));
        }

        let mut clauses = ColumnClauses::default();
        for attribute in &column.attributes {
            match attribute {
                Attribute::Id => clauses.primary_key = true,
                Attribute::Default(arg) => clauses.default = Some(arg),
                Attribute::AutoIncrement => clauses.auto_increment = true,
                Attribute::Nullable => clauses.nullable = true,
                // rendered as table constraints or as the column type
                Attribute::Reference { .. }
                | Attribute::OnDelete(_)
                | Attribute::OnUpdate(_)
                | Attribute::Raw(_) => {}
            }
        }

        let mut parts = vec![column.name.clone(), self.column_type(column)?];

        if clauses.primary_key {
            parts.push("PRIMARY KEY UNIQUE".to_string());
        }
        if let Some(arg) = clauses.default {
            parts.push(default_clause(arg));
        }
        if clauses.auto_increment {
            parts.push("AUTO_INCREMENT".to_string());
        }
        parts.push(if clauses.nullable { "NULL" } else { "NOT NULL" }.to_string());

        Ok(parts.join(" "))
    }

    fn column_type(&self, column: &Column) -> CompileResult<String> {
        match &column.data_type {
            DataType::Raw => match column.attribute(AttributeKind::Raw) {
                Some(Attribute::Raw(literal)) if !literal.is_empty() => Ok(literal.clone()),
                Some(_) => Err(CompileError::generation(format!(
                    "Raw type for column '{}' is empty",
                    column.name
                ))),
                None => Err(CompileError::generation(format!(
                    "Expected raw attribute on column '{}'",
                    column.name
                ))),
            },
            DataType::Named(name) => self
                .dialect
                .sql_type(name)
                .map(str::to_string)
                .ok_or_else(|| CompileError::generation(format!("Invalid data type: {}", name))),
        }
    }
}

fn default_clause(arg: &Argument) -> String {
    match arg.kind {
        ArgumentKind::RawExpression => format!("DEFAULT {}", arg.value),
        ArgumentKind::String => format!("DEFAULT '{}'", arg.value.replace('\'', "''")),
    }
}

fn foreign_key(reference: &Reference) -> String {
    let mut clause = format!(
        "FOREIGN KEY ({}) REFERENCES {}({})",
        reference.source_column, reference.target_table, reference.target_column
    );
    if let Some(action) = &reference.on_delete {
        clause.push_str(&format!(" ON DELETE {}", action));
    }
    if let Some(action) = &reference.on_update {
        clause.push_str(&format!(" ON UPDATE {}", action));
    }
    clause
}
