//! # Expression tree model
//!
//! Immutable, shareable expression nodes used as the intermediate
//! representation of queries.
//!
//! - **[expressions]** - expression nodes, parameters, lambdas, member bindings
//! - **[operators]** - operators, conversions and methods carried by call nodes
//! - **[source]** - query sources, identified by reference
//! - **[parse_info]** - per-call parsing context handed to clause builders
//! - **[tokens]** - tokens of the textual query syntax
//!
//! ## Identity
//!
//! Every node gets a process-unique [`NodeId`] when it is built. Nodes are
//! shared by cloning the handle, so the same node can appear in several
//! trees. Searches and substitutions compare nodes by identity, never by
//! shape:
//!
//! ```
//! use qmodel_ir::ast::Expr;
//!
//! let a = Expr::int(1);
//! let b = Expr::int(1);
//! assert!(a.is_same(&a.clone()));
//! assert!(!a.is_same(&b));
//! ```
//!
//! ## Textual syntax
//!
//! ```text
//! $.where(x => x.price > 10)
//!  .select(x => new { name = x.name, total = x.price * 2 })
//!  .group_by(g => g.name, g => g.total)
//! ```
pub mod expressions;
pub mod operators;
pub mod parse_info;
pub mod source;
pub mod tokens;

pub use expressions::{Expr, ExprKind, Lambda, MemberBinding, NodeId, Param, ParamId, is_convertible};
pub use operators::{BinOp, ConvertKind, Method, QueryMethod, StringMethod, UnaryOp};
pub use parse_info::MethodCallParseInfo;
pub use source::{QuerySource, SourceId};
pub use tokens::Token;
