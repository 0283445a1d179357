//! SQLFlow AST - expression trees, extended statement AST and parser

pub mod ast;
pub mod expr;
pub mod parser;
mod to_ir;

pub use ast::*;
pub use expr::*;
pub use parser::{parse_expression, parse_program, parse_statement, ParseError};
pub use to_ir::program_to_ir;
