use crate::ast::Expr;

/// Parsing context of one query method-call node.
///
/// Built once by the structure parser for each call in a chain and handed to
/// the clause it produces. Read-only after construction.
#[derive(Debug, Clone)]
pub struct MethodCallParseInfo {
    associated_identifier: String,
    source: Expr,
    parsed_expression: Expr,
}

impl MethodCallParseInfo {
    pub fn new(associated_identifier: impl Into<String>, source: Expr, parsed_expression: Expr) -> Self {
        MethodCallParseInfo {
            associated_identifier: associated_identifier.into(),
            source,
            parsed_expression,
        }
    }

    /// The name the user gave the items streaming out of this call, e.g. `x`
    /// in `.where(x => ...)`, or a generated name when there is none.
    pub fn associated_identifier(&self) -> &str {
        &self.associated_identifier
    }

    /// The node streaming data into the parsed call.
    pub fn source(&self) -> &Expr {
        &self.source
    }

    /// The call being parsed.
    pub fn parsed_expression(&self) -> &Expr {
        &self.parsed_expression
    }
}
