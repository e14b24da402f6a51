//! Schema Parser
//!
//! Recursive-descent parser over the token stream produced by [`Tokenizer`].
//! Semantic checks happen inline while the AST is built:
//! 1. table and column names are unique
//! 2. attributes have the argument shape they require
//! 3. `@reference` targets a table and column declared earlier in the source
//!
//! # Example
//! ```ignore
//! let schema = Parser::parse("table users\n  id int @id\nend\n")?;
//! assert_eq!(schema.tables[0].name, "users");
//! ```

use tracing::{debug, info};

use super::ast::{
    Argument, ArgumentKind, Attribute, AttributeKind, Column, DataType, Reference, Schema, Table,
    CONFIGURATION_KEYS,
};
use super::error::{CompileError, CompileResult};
use super::token::{Token, TokenKind};
use super::tokenizer::Tokenizer;

/// Parser state for one compile. The table whose column block is open is
/// passed down the column rules by reference and only joins the schema once
/// its `end` is reached, so references can only see earlier tables.
pub struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    schema: Schema,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            tokenizer: Tokenizer::new(source),
            schema: Schema::default(),
        }
    }

    /// Parses a complete source text into a [`Schema`]
    pub fn parse(source: &'a str) -> CompileResult<Schema> {
        Parser::new(source).parse_schema()
    }

    /// `schema := (table | set | EOL)*`
    pub fn parse_schema(mut self) -> CompileResult<Schema> {
        loop {
            let token = self.tokenizer.next_token();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Eol => {}
                TokenKind::Table => {
                    let table = self.parse_table()?;
                    info!(
                        "Parsed table '{}' ({} columns, {} references)",
                        table.name,
                        table.columns.len(),
                        table.references.len()
                    );
                    self.schema.tables.push(table);
                }
                TokenKind::Set => self.parse_set()?,
                _ => return Err(unexpected(&token)),
            }
        }

        Ok(self.schema)
    }

    /// `set := "set" IDENT (IDENT | STRING)`
    fn parse_set(&mut self) -> CompileResult<()> {
        let key = self.tokenizer.next_token();
        if !key.is(TokenKind::Identifier) {
            return Err(CompileError::at(&key, "Expected identifier after 'set'"));
        }
        if !CONFIGURATION_KEYS.contains(&key.literal.as_str()) {
            return Err(CompileError::at(&key, format!("Unknown '{}'", key.literal)));
        }

        let value = self.tokenizer.next_token();
        match value.kind {
            TokenKind::Identifier | TokenKind::String => {}
            TokenKind::Eol | TokenKind::Eof => {
                return Err(CompileError::at(
                    &value,
                    format!("Expected value after '{}'", key.literal),
                ))
            }
            _ => return Err(unexpected(&value)),
        }

        self.expect_line_end()?;

        debug!("Configuration {} = {}", key.literal, value.literal);
        self.schema.configuration.insert(key.literal, value.literal);
        Ok(())
    }

    /// `table := "table" IDENT EOL column* "end"`
    fn parse_table(&mut self) -> CompileResult<Table> {
        let name = self.tokenizer.next_token();
        match name.kind {
            TokenKind::Identifier => {}
            TokenKind::Eol | TokenKind::Eof => {
                return Err(CompileError::at(
                    &name,
                    "Missing '<Table Name>' after 'table'",
                ))
            }
            _ => {
                return Err(CompileError::at(
                    &name,
                    "'<Table Name>' must start with a letter or underscore",
                ))
            }
        }

        if self.schema.table(&name.literal).is_some() {
            return Err(CompileError::at(
                &name,
                format!("Table with name '{}' already declared", name.literal),
            ));
        }

        let terminator = self.tokenizer.next_token();
        if !terminator.is(TokenKind::Eol) {
            return Err(CompileError::at(&terminator, "Expected end of line"));
        }

        let mut table = Table::new(name.literal);
        self.parse_columns(&mut table)?;
        Ok(table)
    }

    fn parse_columns(&mut self, table: &mut Table) -> CompileResult<()> {
        loop {
            let token = self.tokenizer.next_token();
            match token.kind {
                TokenKind::End => return Ok(()),
                TokenKind::Eol => {}
                TokenKind::Eof | TokenKind::Table => {
                    return Err(CompileError::at(&token, "Missing 'end' keyword"))
                }
                TokenKind::Identifier => {
                    let column = self.parse_column(token, table)?;
                    table.columns.push(column);
                }
                _ => return Err(unexpected(&token)),
            }
        }
    }

    /// `column := IDENT type attr* EOL`
    fn parse_column(&mut self, name: Token, table: &mut Table) -> CompileResult<Column> {
        if table.column(&name.literal).is_some() {
            return Err(CompileError::at(
                &name,
                format!("Column with name '{}' already declared", name.literal),
            ));
        }

        let mut column = self.parse_column_type(name.literal)?;

        loop {
            let token = self.tokenizer.next_token();
            match token.kind {
                TokenKind::Eol => break,
                TokenKind::Eof => return Err(CompileError::at(&token, "Missing 'end' keyword")),
                TokenKind::Attribute => {
                    let args = self.parse_arguments()?;
                    let attribute = self.parse_attribute(&token, args, &column, table)?;
                    column.attributes.push(attribute);
                }
                _ => return Err(unexpected(&token)),
            }
        }

        debug!(
            "Parsed column '{}.{}' of type {}",
            table.name, column.name, column.data_type
        );
        Ok(column)
    }

    /// `type := IDENT | RAW_LITERAL`
    fn parse_column_type(&mut self, name: String) -> CompileResult<Column> {
        let token = self.tokenizer.peek_token();
        match token.kind {
            TokenKind::Identifier => {
                self.tokenizer.next_token();
                Ok(Column::new(name, DataType::Named(token.literal)))
            }
            TokenKind::Raw => {
                self.tokenizer.next_token();
                let mut column = Column::new(name, DataType::Raw);
                column.attributes.push(Attribute::Raw(token.literal));
                Ok(column)
            }
            _ => Err(CompileError::at(
                &token,
                "Missing data type after column name",
            )),
        }
    }

    /// `( "(" arg ("," arg)* ")" )?` following an attribute name
    fn parse_arguments(&mut self) -> CompileResult<Vec<Argument>> {
        let mut args = Vec::new();
        if !self.tokenizer.peek_token().is(TokenKind::LeftParen) {
            return Ok(args);
        }
        self.tokenizer.next_token();

        let mut token = self.tokenizer.next_token();
        if token.is(TokenKind::RightParen) {
            return Ok(args);
        }

        loop {
            let kind = match token.kind {
                TokenKind::String => {
                    if self.tokenizer.peek_token().is(TokenKind::Eof) {
                        return Err(CompileError::at(&token, "Unterminated string"));
                    }
                    ArgumentKind::String
                }
                TokenKind::Raw => ArgumentKind::RawExpression,
                _ => return Err(unexpected(&token)),
            };
            args.push(Argument {
                value: token.literal,
                kind,
            });

            let separator = self.tokenizer.next_token();
            match separator.kind {
                TokenKind::RightParen => return Ok(args),
                TokenKind::Comma => token = self.tokenizer.next_token(),
                _ => return Err(unexpected(&separator)),
            }
        }
    }

    /// Validates one `@name(args)` clause against the argument shape of its kind
    fn parse_attribute(
        &self,
        token: &Token,
        args: Vec<Argument>,
        column: &Column,
        table: &mut Table,
    ) -> CompileResult<Attribute> {
        let kind: AttributeKind = token
            .literal
            .parse()
            .map_err(|message: String| CompileError::at(token, message))?;

        if column.has(kind) {
            return Err(CompileError::at(
                token,
                format!("Duplicate attribute @{}", kind),
            ));
        }

        let attribute = match kind {
            AttributeKind::Id => {
                expect_no_arguments(token, kind, &args)?;
                Attribute::Id
            }
            AttributeKind::AutoIncrement => {
                expect_no_arguments(token, kind, &args)?;
                Attribute::AutoIncrement
            }
            AttributeKind::Nullable => {
                expect_no_arguments(token, kind, &args)?;
                Attribute::Nullable
            }
            AttributeKind::Default => Attribute::Default(expect_one_argument(token, kind, args)?),
            AttributeKind::Reference => self.parse_reference(token, args, column, table)?,
            AttributeKind::OnDelete => {
                let action = expect_action(token, kind, args)?;
                find_reference(token, kind, column, table)?.on_delete = Some(action.clone());
                Attribute::OnDelete(action)
            }
            AttributeKind::OnUpdate => {
                let action = expect_action(token, kind, args)?;
                find_reference(token, kind, column, table)?.on_update = Some(action.clone());
                Attribute::OnUpdate(action)
            }
            AttributeKind::Raw => {
                return Err(CompileError::at(
                    token,
                    format!("Unknown attribute @{}", kind),
                ))
            }
        };

        Ok(attribute)
    }

    /// `@reference("table", "column")`, the target must already be declared
    fn parse_reference(
        &self,
        token: &Token,
        args: Vec<Argument>,
        column: &Column,
        table: &mut Table,
    ) -> CompileResult<Attribute> {
        let [target_table, target_column]: [Argument; 2] = args
            .try_into()
            .map_err(|_| CompileError::at(token, "@reference takes two parameters"))?;

        if target_table.kind != ArgumentKind::String || target_column.kind != ArgumentKind::String
        {
            return Err(CompileError::at(token, "@reference Expected string values"));
        }

        let target = self.schema.table(&target_table.value).ok_or_else(|| {
            CompileError::at(token, format!("no such table '{}'", target_table.value))
        })?;

        if target.column(&target_column.value).is_none() {
            return Err(CompileError::at(
                token,
                format!(
                    "no such col '{}' on table '{}'",
                    target_column.value, target.name
                ),
            ));
        }

        table.references.push(Reference {
            source_column: column.name.clone(),
            target_table: target_table.value.clone(),
            target_column: target_column.value.clone(),
            on_delete: None,
            on_update: None,
        });

        Ok(Attribute::Reference {
            table: target_table.value,
            column: target_column.value,
        })
    }

    /// A `set` assignment must be the last thing on its line
    fn expect_line_end(&mut self) -> CompileResult<()> {
        let token = self.tokenizer.next_token();
        match token.kind {
            TokenKind::Eol | TokenKind::Eof => Ok(()),
            _ => Err(CompileError::at(&token, "Expected end of line")),
        }
    }
}

fn unexpected(token: &Token) -> CompileError {
    CompileError::at(token, format!("Unexpected token '{}'", token))
}

fn expect_no_arguments(token: &Token, kind: AttributeKind, args: &[Argument]) -> CompileResult<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CompileError::at(
            token,
            format!("@{} takes no parameters", kind),
        ))
    }
}

fn expect_one_argument(
    token: &Token,
    kind: AttributeKind,
    args: Vec<Argument>,
) -> CompileResult<Argument> {
    let [arg]: [Argument; 1] = args
        .try_into()
        .map_err(|_| CompileError::at(token, format!("@{} takes one parameter", kind)))?;
    Ok(arg)
}

fn expect_string_argument(
    token: &Token,
    kind: AttributeKind,
    args: Vec<Argument>,
) -> CompileResult<String> {
    let arg = expect_one_argument(token, kind, args)?;
    if arg.kind != ArgumentKind::String {
        return Err(CompileError::at(
            token,
            format!("@{} Expected string value", kind),
        ));
    }
    Ok(arg.value)
}

/// Referential actions accepted by `@onDelete` and `@onUpdate`
const REFERENTIAL_ACTIONS: [&str; 5] = [
    "CASCADE",
    "SET NULL",
    "SET DEFAULT",
    "RESTRICT",
    "NO ACTION",
];

/// A single string argument naming a referential action, upper-cased
fn expect_action(
    token: &Token,
    kind: AttributeKind,
    args: Vec<Argument>,
) -> CompileResult<String> {
    let action = expect_string_argument(token, kind, args)?.to_ascii_uppercase();
    if !REFERENTIAL_ACTIONS.contains(&action.as_str()) {
        return Err(CompileError::at(
            token,
            format!(
                "@{} expects one of {}",
                kind,
                REFERENTIAL_ACTIONS.join(", ")
            ),
        ));
    }
    Ok(action)
}

/// The reference declared by `column` earlier on the same line
fn find_reference<'t>(
    token: &Token,
    kind: AttributeKind,
    column: &Column,
    table: &'t mut Table,
) -> CompileResult<&'t mut Reference> {
    table.reference_mut(&column.name).ok_or_else(|| {
        CompileError::at(
            token,
            format!(
                "To use the @{} directive, you must first declare a reference using @reference",
                kind
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const USERS: &str = "table users\n  id int @id\n  name string\nend\n";

    fn syntax_error(source: &str) -> (String, usize, usize) {
        match Parser::parse(source) {
            Err(CompileError::Syntax {
                message,
                line,
                column,
            }) => (message, line, column),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    fn message(source: &str) -> String {
        syntax_error(source).0
    }

    #[test]
    fn test_parse_simple_table() -> Result<()> {
        let schema = Parser::parse(USERS)?;

        assert_eq!(schema.provider(), "sqlite");
        assert_eq!(schema.tables.len(), 1);

        let users = &schema.tables[0];
        assert_eq!(users.name, "users");
        assert_eq!(users.columns.len(), 2);
        assert_eq!(users.columns[0].name, "id");
        assert_eq!(users.columns[0].data_type, DataType::Named("int".to_string()));
        assert_eq!(users.columns[0].attributes, vec![Attribute::Id]);
        assert_eq!(users.columns[1].name, "name");
        assert!(users.columns[1].attributes.is_empty());
        assert!(users.references.is_empty());

        Ok(())
    }

    #[test]
    fn test_tables_keep_declaration_order() -> Result<()> {
        let source = "\n\ntable b\n x int\nend\n\ntable a\n y int\nend\ntable c\n z int\nend";
        let schema = Parser::parse(source)?;

        let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);

        Ok(())
    }

    #[test]
    fn test_blank_lines_and_empty_table() -> Result<()> {
        let schema = Parser::parse("table a\n\n  x int\n\nend\ntable b\nend\n")?;

        assert_eq!(schema.tables[0].columns.len(), 1);
        assert!(schema.tables[1].columns.is_empty());

        Ok(())
    }

    #[test]
    fn test_set_configuration() -> Result<()> {
        let schema = Parser::parse("set provider postgres\nset url \"file:app.db\"\n")?;

        assert_eq!(schema.provider(), "postgres");
        assert_eq!(schema.configuration["url"], "file:app.db");

        Ok(())
    }

    #[test]
    fn test_set_errors() {
        assert_eq!(message("set foo bar\n"), "Unknown 'foo'");
        assert_eq!(message("set provider\n"), "Expected value after 'provider'");
        assert_eq!(message("set \"provider\" x\n"), "Expected identifier after 'set'");
        assert_eq!(message("set url (\n"), "Unexpected token '('");
        assert_eq!(message("set url x y\n"), "Expected end of line");
    }

    #[test]
    fn test_unexpected_top_level_token() {
        assert_eq!(
            syntax_error("\nusers\n"),
            ("Unexpected token 'users'".to_string(), 2, 1)
        );
    }

    #[test]
    fn test_table_name_errors() {
        assert_eq!(
            syntax_error("table\n"),
            ("Missing '<Table Name>' after 'table'".to_string(), 1, 6)
        );
        assert_eq!(
            message("table 1users\n"),
            "'<Table Name>' must start with a letter or underscore"
        );
        assert_eq!(message("table users x\n"), "Expected end of line");
    }

    #[test]
    fn test_duplicate_table() {
        let source = "table a\n x int\nend\ntable a\n x int\nend\n";
        assert_eq!(
            syntax_error(source),
            ("Table with name 'a' already declared".to_string(), 4, 7)
        );
    }

    #[test]
    fn test_duplicate_column() {
        let source = "table a\n x int\n x string\nend\n";
        assert_eq!(
            syntax_error(source),
            ("Column with name 'x' already declared".to_string(), 3, 2)
        );
    }

    #[test]
    fn test_missing_end() {
        assert_eq!(message("table a\n x int\n"), "Missing 'end' keyword");
        assert_eq!(message("table a\n x int"), "Missing 'end' keyword");
        assert_eq!(
            syntax_error("table a\n x int\ntable b\n y int\nend\n"),
            ("Missing 'end' keyword".to_string(), 3, 1)
        );
    }

    #[test]
    fn test_missing_data_type() {
        assert_eq!(
            syntax_error("table a\n x\nend\n"),
            ("Missing data type after column name".to_string(), 2, 3)
        );
        assert_eq!(
            message("table a\n x @id\nend\n"),
            "Missing data type after column name"
        );
    }

    #[test]
    fn test_raw_data_type() -> Result<()> {
        let schema = Parser::parse("table a\n  code `VARCHAR(20)` @nullable\nend\n")?;

        let column = &schema.tables[0].columns[0];
        assert_eq!(column.data_type, DataType::Raw);
        assert_eq!(
            column.attributes,
            vec![
                Attribute::Raw("VARCHAR(20)".to_string()),
                Attribute::Nullable
            ]
        );

        Ok(())
    }

    #[test]
    fn test_default_argument_kinds() -> Result<()> {
        let source = "table a\n  email string @default(\"a@b.com\")\n  created datetime @default(`CURRENT_TIMESTAMP`)\nend\n";
        let schema = Parser::parse(source)?;

        let columns = &schema.tables[0].columns;
        assert_eq!(
            columns[0].attribute(AttributeKind::Default),
            Some(&Attribute::Default(Argument::string("a@b.com")))
        );
        assert_eq!(
            columns[1].attribute(AttributeKind::Default),
            Some(&Attribute::Default(Argument::raw("CURRENT_TIMESTAMP")))
        );

        Ok(())
    }

    #[test]
    fn test_attribute_argument_counts() {
        assert!(Parser::parse("table a\n x int @id() @auto_increment\nend\n").is_ok());
        assert_eq!(
            message("table a\n x int @id(\"x\")\nend\n"),
            "@id takes no parameters"
        );
        assert_eq!(
            message("table a\n x int @nullable(`1`)\nend\n"),
            "@nullable takes no parameters"
        );
        assert_eq!(
            message("table a\n x int @default()\nend\n"),
            "@default takes one parameter"
        );
        assert_eq!(
            message("table a\n x int @default(\"1\", \"2\")\nend\n"),
            "@default takes one parameter"
        );
    }

    #[test]
    fn test_malformed_argument_lists() {
        assert_eq!(
            message("table a\n x int @default(x)\nend\n"),
            "Unexpected token 'x'"
        );
        assert_eq!(
            message("table a\n x int @default(\"1\" \"2\")\nend\n"),
            "Unexpected token '\"2\"'"
        );
        assert_eq!(
            message("table a\n x string @default(\"abc"),
            "Unterminated string"
        );
    }

    #[test]
    fn test_unknown_attribute() {
        assert_eq!(
            syntax_error("table a\n x int @unique\nend\n"),
            ("Unknown attribute @unique".to_string(), 2, 8)
        );
        assert_eq!(
            message("table a\n x `TEXT` @raw(`TEXT`)\nend\n"),
            "Unknown attribute @raw"
        );
    }

    #[test]
    fn test_duplicate_attribute() {
        assert_eq!(
            message("table a\n x int @id @id\nend\n"),
            "Duplicate attribute @id"
        );
        assert_eq!(
            message("table a\n x int @default(\"1\") @default(\"2\")\nend\n"),
            "Duplicate attribute @default"
        );
    }

    #[test]
    fn test_reference_with_actions() -> Result<()> {
        let source = format!(
            "{}table posts\n  author int @reference(\"users\", \"id\") @onDelete(\"CASCADE\") @onUpdate(\"NO ACTION\")\nend\n",
            USERS
        );
        let schema = Parser::parse(&source)?;

        let posts = &schema.tables[1];
        assert_eq!(
            posts.references,
            vec![Reference {
                source_column: "author".to_string(),
                target_table: "users".to_string(),
                target_column: "id".to_string(),
                on_delete: Some("CASCADE".to_string()),
                on_update: Some("NO ACTION".to_string()),
            }]
        );
        assert!(posts.columns[0].has(AttributeKind::Reference));

        Ok(())
    }

    #[test]
    fn test_reference_to_undeclared_table() {
        let source = "table posts\n  author int @reference(\"users\",\"id\")\nend\n";
        assert_eq!(
            syntax_error(source),
            ("no such table 'users'".to_string(), 2, 14)
        );
    }

    #[test]
    fn test_reference_to_undeclared_column() {
        let source = format!(
            "{}table posts\n  author int @reference(\"users\",\"uid\")\nend\n",
            USERS
        );
        assert_eq!(message(&source), "no such col 'uid' on table 'users'");
    }

    #[test]
    fn test_reference_cannot_target_own_table() {
        let source = "table nodes\n  id int @id\n  parent int @reference(\"nodes\",\"id\")\nend\n";
        assert_eq!(message(source), "no such table 'nodes'");
    }

    #[test]
    fn test_reference_argument_shape() {
        let prefix = USERS;
        assert_eq!(
            message(&format!("{}table p\n a int @reference(\"users\")\nend\n", prefix)),
            "@reference takes two parameters"
        );
        assert_eq!(
            message(&format!(
                "{}table p\n a int @reference(`users`, \"id\")\nend\n",
                prefix
            )),
            "@reference Expected string values"
        );
    }

    #[test]
    fn test_action_names_are_normalized() -> Result<()> {
        let source = format!(
            "{}table p\n a int @reference(\"users\",\"id\") @onDelete(\"set null\")\nend\n",
            USERS
        );
        let schema = Parser::parse(&source)?;

        assert_eq!(
            schema.tables[1].references[0].on_delete.as_deref(),
            Some("SET NULL")
        );

        Ok(())
    }

    #[test]
    fn test_unknown_actions_are_rejected() {
        let expected = (
            "@onDelete expects one of CASCADE, SET NULL, SET DEFAULT, RESTRICT, NO ACTION"
                .to_string(),
            6,
            33,
        );
        assert_eq!(
            syntax_error(&format!(
                "{}table p\n a int @reference(\"users\",\"id\") @onDelete(\"\")\nend\n",
                USERS
            )),
            expected
        );
        assert_eq!(
            message(&format!(
                "{}table p\n a int @reference(\"users\",\"id\") @onUpdate(\"x); DROP TABLE users; --\")\nend\n",
                USERS
            )),
            "@onUpdate expects one of CASCADE, SET NULL, SET DEFAULT, RESTRICT, NO ACTION"
        );
    }

    #[test]
    fn test_actions_require_reference() {
        assert_eq!(
            message("table a\n x int @onDelete(\"CASCADE\")\nend\n"),
            "To use the @onDelete directive, you must first declare a reference using @reference"
        );
        assert_eq!(
            message("table a\n x int @onUpdate(\"CASCADE\")\nend\n"),
            "To use the @onUpdate directive, you must first declare a reference using @reference"
        );
        assert_eq!(
            message(&format!(
                "{}table p\n a int @reference(\"users\",\"id\") @onDelete(`CASCADE`)\nend\n",
                USERS
            )),
            "@onDelete Expected string value"
        );
    }

    #[test]
    fn test_action_on_other_column_does_not_match() {
        let source = format!(
            "{}table p\n a int @reference(\"users\",\"id\")\n b int @onDelete(\"CASCADE\")\nend\n",
            USERS
        );
        assert!(message(&source).starts_with("To use the @onDelete directive"));
    }

    #[test]
    fn test_unexpected_token_in_column_line() {
        assert_eq!(
            message("table a\n x int y\nend\n"),
            "Unexpected token 'y'"
        );
        assert_eq!(message("table a\n 42 int\nend\n"), "Unexpected token '42'");
    }
}
