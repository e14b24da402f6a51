//! The input to the front-end is schema source text. The output is the SQL
//! data-definition script for the configured dialect.
//!
//! text → [`tokenizer`] → tokens → [`parser`] → [`ast::Schema`] → [`code_gen`] → SQL
pub mod ast;
pub mod code_gen;
pub mod error;
pub mod parser;
pub mod token;
pub mod tokenizer;

use code_gen::Generator;
use error::CompileResult;
use parser::Parser;

/// Compiles schema source text into `CREATE TABLE` statements
pub fn compile(source: &str) -> CompileResult<String> {
    let schema = Parser::parse(source)?;
    Generator::generate(&schema)
}
