use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, Lambda, MemberBinding, Param, QueryMethod, StringMethod, Token, UnaryOp},
    error::QueryError,
    lexer::{LexError, Lexer},
    types::{ObjectType, Type},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("Expected {expected}, got {found:?} at position {position}")]
    Unexpected {
        expected: String,
        found: Token,
        position: usize,
    },

    #[error("Unknown identifier '{name}' at position {position}")]
    UnknownIdentifier { name: String, position: usize },

    #[error("Unknown query operator '{name}' at position {position}")]
    UnknownOperator { name: String, position: usize },

    #[error("Unknown type '{name}' at position {position}")]
    UnknownType { name: String, position: usize },

    #[error("{error} (at position {position})")]
    Query { error: QueryError, position: usize },
}

/// Parses query text into an expression tree over a given root sequence.
///
/// ```text
/// $.where(x => x.v > 1).group_by(x => x.c, x => x.v)
/// ```
///
/// `$` stands for the root expression handed to the parser. Lambda
/// parameters are typed by the item type of the sequence they are applied
/// to, so member reads are checked while parsing.
pub struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    root: Expr,
    /// Lambda parameters in scope, innermost last
    scopes: Vec<Param>,
    types: HashMap<String, Arc<ObjectType>>,
}

/// Lexes and parses a full query chain.
pub fn parse_query(input: &str, root: Expr) -> Result<Expr, ParseError> {
    Parser::new(input, root)?.parse_query()
}

impl Parser {
    pub fn new(input: &str, root: Expr) -> Result<Self, ParseError> {
        Ok(Parser {
            tokens: Lexer::new(input).tokenize()?,
            pos: 0,
            root,
            scopes: Vec::new(),
            types: HashMap::new(),
        })
    }

    /// Makes `ty` constructible as `new Name { ... }` and usable after `as`.
    pub fn with_type(mut self, ty: Arc<ObjectType>) -> Self {
        self.types.insert(ty.name.clone(), ty);
        self
    }

    fn current(&self) -> &Token {
        // tokenize() always ends with Eof and advance() never moves past it
        &self.tokens[self.pos].0
    }

    fn position(&self) -> usize {
        self.tokens[self.pos].1
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(self.current()) == mem::discriminant(token)
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::Unexpected {
            expected: expected.into(),
            found: self.current().clone(),
            position: self.position(),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(format!("{:?}", expected)));
        }
        self.advance();
        Ok(())
    }

    fn expect_identifier(&mut self) -> Result<(String, usize), ParseError> {
        let position = self.position();
        match self.current() {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok((name, position))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn build(&self, built: Result<Expr, QueryError>, position: usize) -> Result<Expr, ParseError> {
        built.map_err(|error| ParseError::Query { error, position })
    }

    // ------------------------------------------------------------------
    // Query chains
    // ------------------------------------------------------------------

    /// Parses `$` followed by any number of `.operator(args)` calls.
    pub fn parse_query(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::Dollar)?;
        let mut chain = self.root.clone();
        while self.check(&Token::Dot) {
            self.advance();
            chain = self.parse_query_call(chain)?;
        }
        self.expect(Token::Eof)?;
        Ok(chain)
    }

    fn parse_query_call(&mut self, source: Expr) -> Result<Expr, ParseError> {
        let (name, position) = self.expect_identifier()?;
        let method = QueryMethod::from_name(&name)
            .ok_or_else(|| ParseError::UnknownOperator { name, position })?;
        self.expect(Token::LParen)?;

        let item = source.ty().item_type().cloned().unwrap_or(Type::Any);
        let (args, ty) = match method {
            QueryMethod::Where | QueryMethod::OrderBy | QueryMethod::OrderByDescending => {
                let lambda = self.parse_lambda(item)?;
                (vec![lambda.into_expr()], source.ty().clone())
            }
            QueryMethod::Select => {
                let lambda = self.parse_lambda(item)?;
                let ty = Type::sequence(lambda.body().ty().clone());
                (vec![lambda.into_expr()], ty)
            }
            QueryMethod::GroupBy => {
                let key = self.parse_lambda(item.clone())?;
                let element = if self.check(&Token::Comma) {
                    self.advance();
                    Some(self.parse_lambda(item.clone())?)
                } else {
                    None
                };
                let element_ty = element.as_ref().map(|e| e.body().ty().clone()).unwrap_or(item);
                let ty = Type::sequence(Type::grouping(key.body().ty().clone(), element_ty));
                let mut args = vec![key.into_expr()];
                args.extend(element.map(Lambda::into_expr));
                (args, ty)
            }
            QueryMethod::Take | QueryMethod::Skip => {
                let count = self.parse_expression()?;
                (vec![count], source.ty().clone())
            }
            QueryMethod::Distinct => (Vec::new(), source.ty().clone()),
            QueryMethod::Count => (Vec::new(), Type::Int),
            QueryMethod::First | QueryMethod::FirstOrDefault => (Vec::new(), item),
        };
        self.expect(Token::RParen)?;
        self.build(Expr::query_call(source, method, args, ty), position)
    }

    /// Parses `name => body` with `name` typed as `param_type`.
    pub fn parse_lambda(&mut self, param_type: Type) -> Result<Lambda, ParseError> {
        let (name, _) = self.expect_identifier()?;
        self.expect(Token::Arrow)?;
        let param = Param::new(name, param_type);
        self.scopes.push(param.clone());
        let body = self.parse_expression();
        self.scopes.pop();
        Ok(Lambda::new(vec![param], body?))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Parses a standalone expression up to the end of input.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        self.expect(Token::Eof)?;
        Ok(expr)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        while self.check(&Token::Or) {
            let position = self.position();
            self.advance();
            let right = self.parse_and()?;
            left = self.build(Expr::binary(BinOp::Or, left, right), position)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;

        while self.check(&Token::And) {
            let position = self.position();
            self.advance();
            let right = self.parse_comparison()?;
            left = self.build(Expr::binary(BinOp::And, left, right), position)?;
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;

        let op = match self.current() {
            Token::EqEq => BinOp::Equal,
            Token::NotEq => BinOp::NotEqual,
            Token::Lt => BinOp::LessThan,
            Token::Gt => BinOp::GreaterThan,
            Token::LtEq => BinOp::LessEqual,
            Token::GtEq => BinOp::GreaterEqual,
            _ => return Ok(left),
        };
        let position = self.position();
        self.advance();
        let right = self.parse_additive()?;
        self.build(Expr::binary(op, left, right), position)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Subtract,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.build(Expr::binary(op, left, right), position)?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current() {
                Token::Star => BinOp::Multiply,
                Token::Slash => BinOp::Divide,
                Token::Percent => BinOp::Modulo,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let right = self.parse_unary()?;
            left = self.build(Expr::binary(op, left, right), position)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current() {
            Token::Minus => UnaryOp::Negate,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let position = self.position();
        self.advance();
        let operand = self.parse_unary()?;
        self.build(Expr::unary(op, operand), position)
    }

    /// Member reads, method calls and `as` conversions.
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&Token::Dot) {
                self.advance();
                let (name, position) = self.expect_identifier()?;
                expr = if self.check(&Token::LParen) {
                    self.advance();
                    let args = self.parse_arguments()?;
                    self.parse_method_call(expr, &name, args, position)?
                } else {
                    let member = expr.ty().find_member(&name).ok_or_else(|| {
                        ParseError::Query {
                            error: QueryError::type_mismatch(
                                format!("access to '{}'", name),
                                format!("a type with member '{}'", name),
                                expr.ty(),
                            ),
                            position,
                        }
                    })?;
                    self.build(Expr::read_member(expr, member), position)?
                };
            } else if self.check(&Token::As) {
                let position = self.position();
                self.advance();
                let checked = matches!(self.current(), Token::Identifier(name) if name == "checked");
                if checked {
                    self.advance();
                }
                let ty = self.parse_type()?;
                expr = if checked {
                    self.build(Expr::convert_checked(expr, ty), position)?
                } else {
                    self.build(Expr::convert(expr, ty), position)?
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Arguments after an opening parenthesis, up to and including `)`.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        while !self.check(&Token::RParen) {
            args.push(self.parse_expression()?);
            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn parse_method_call(
        &mut self,
        object: Expr,
        name: &str,
        args: Vec<Expr>,
        position: usize,
    ) -> Result<Expr, ParseError> {
        if let Some(member) = object.ty().find_member(name).filter(|m| m.is_method()) {
            if !args.is_empty() {
                return Err(ParseError::Query {
                    error: QueryError::InvalidArgument(format!("{}() takes no arguments", name)),
                    position,
                });
            }
            return self.build(Expr::getter_call(object, member), position);
        }
        match StringMethod::from_name(name) {
            Some(method) => self.build(Expr::string_call(object, method, args), position),
            None => Err(ParseError::UnknownIdentifier {
                name: format!("{}()", name),
                position,
            }),
        }
    }

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let (name, position) = self.expect_identifier()?;
        let ty = match name.as_str() {
            "any" => Type::Any,
            "bool" => Type::Bool,
            "int" => Type::Int,
            "float" => Type::Float,
            "decimal" => Type::Decimal,
            "string" => Type::String,
            _ => match self.types.get(&name) {
                Some(object) => Type::Object(object.clone()),
                None => return Err(ParseError::UnknownType { name, position }),
            },
        };
        Ok(ty)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.position();
        let expr = match mem::replace(&mut self.tokens[self.pos].0, Token::Eof) {
            Token::Float(n) => Expr::float(n),
            Token::Integer(n) => Expr::int(n),
            Token::String(s) => Expr::string(s),
            Token::Boolean(b) => Expr::boolean(b),
            Token::Null => Expr::null(),
            Token::Identifier(name) => {
                match self.scopes.iter().rev().find(|p| p.name() == name) {
                    Some(param) => param.to_expr(),
                    None => return Err(ParseError::UnknownIdentifier { name, position }),
                }
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                return Ok(expr);
            }
            Token::New => {
                self.advance();
                return self.parse_construction(position);
            }
            token => {
                self.tokens[self.pos].0 = token;
                return Err(self.unexpected("expression"));
            }
        };
        self.advance();
        Ok(expr)
    }

    /// After `new`: `{ a = expr, ... }` or `TypeName { a = expr, ... }`.
    fn parse_construction(&mut self, position: usize) -> Result<Expr, ParseError> {
        let named = match self.current() {
            Token::Identifier(_) => {
                let (name, type_position) = self.expect_identifier()?;
                match self.types.get(&name) {
                    Some(object) => Some(object.clone()),
                    None => {
                        return Err(ParseError::UnknownType {
                            name,
                            position: type_position,
                        });
                    }
                }
            }
            _ => None,
        };

        self.expect(Token::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(&Token::RBrace) {
            let (name, field_position) = self.expect_identifier()?;
            self.expect(Token::Assign)?;
            let value = self.parse_expression()?;
            fields.push((name, value, field_position));
            if !self.check(&Token::RBrace) {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RBrace)?;

        let Some(object) = named else {
            return Ok(Expr::new_anonymous(
                fields.into_iter().map(|(name, value, _)| (name, value)).collect(),
            ));
        };

        let new = self.build(Expr::new_object(object.clone(), Vec::new(), Vec::new()), position)?;
        let mut bindings = Vec::with_capacity(fields.len());
        for (name, expr, field_position) in fields {
            let member = object.member(&name).cloned().ok_or_else(|| ParseError::Query {
                error: QueryError::InvalidArgument(format!("'{}' is not a member of {}", name, object.name)),
                position: field_position,
            })?;
            bindings.push(MemberBinding::Assignment { member, expr });
        }
        self.build(Expr::member_init(new, bindings), position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn ints() -> Expr {
        Expr::constant(Value::Array(vec![]), Type::sequence(Type::Int)).unwrap()
    }

    #[test]
    fn precedence_follows_arithmetic() {
        let x = Param::new("x", Type::Int);
        let mut parser = Parser::new("1 + x * 2 > 3", ints()).unwrap();
        parser.scopes.push(x);
        assert_eq!(parser.parse().unwrap().to_string(), "((1 + (x * 2)) > 3)");
    }

    #[test]
    fn lambda_parameters_are_scoped() {
        let err = parse_query("$.where(x => y > 1)", ints()).unwrap_err();
        assert!(matches!(err, ParseError::UnknownIdentifier { ref name, .. } if name == "y"));
    }

    #[test]
    fn unknown_operator_is_reported() {
        let err = parse_query("$.flatten()", ints()).unwrap_err();
        assert!(matches!(err, ParseError::UnknownOperator { position: 2, .. }));
    }
}
