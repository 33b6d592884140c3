pub mod accessor;
pub mod ast;
pub mod clauses;
pub mod cli;
pub mod clone;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod format;
pub mod lexer;
pub mod parser;
pub mod resolve;
pub mod result_operators;
pub mod streamed;
pub mod structure;
pub mod types;
pub mod value;
pub mod visitor;

pub use accessor::find_accessor;
pub use ast::{Expr, ExprKind, Lambda, MethodCallParseInfo, Param, QuerySource, Token};
pub use clauses::QueryModel;
pub use clone::CloneContext;
pub use error::{QueryError, Result};
pub use evaluator::{CompiledLambda, Evaluator};
pub use executor::{InMemoryExecutor, QueryExecutor};
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, Parser, parse_query};
pub use resolve::{resolve_lambda, reverse_resolve};
pub use result_operators::ResultOperator;
pub use streamed::{StreamedData, StreamedDataInfo};
pub use structure::QueryParser;
pub use types::{Member, ObjectType, Type};
pub use value::Value;
pub use visitor::ExprVisitor;
