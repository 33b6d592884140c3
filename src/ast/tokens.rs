#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Floating-point number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// ```
    Integer(i64),

    /// String literal enclosed in single or double quotes
    String(String),

    /// `true` / `false`
    Boolean(bool),

    /// `null`
    Null,

    // Identifiers and keywords
    /// Member, method, lambda parameter or type name
    Identifier(String),

    /// `new`, starts a construction
    ///
    /// # Examples
    /// ```text
    /// new { a = x.v, b = "lit" }
    /// new Point { x = 1, y = 2 }
    /// ```
    New,

    /// `as`, postfix conversion
    ///
    /// # Examples
    /// ```text
    /// x.v as float
    /// ```
    As,

    /// Root sequence (`$`)
    Dollar,

    /// Lambda arrow (`=>`)
    Arrow,

    /// Member assignment inside a construction (`=`)
    Assign,

    // Comparison
    /// Equality operator
    EqEq,

    /// Inequality operator
    NotEq,

    /// Less than
    Lt,

    /// Greater than
    Gt,

    /// Less than or equal
    LtEq,

    /// Greater than or equal
    GtEq,

    // Arithmetic
    /// Addition or string concatenation
    Plus,

    /// Subtraction or negation
    Minus,

    /// Multiplication
    Star,

    /// Division
    Slash,

    /// Modulo
    Percent,

    // Logical
    /// Logical AND (word, not symbol)
    And,

    /// Logical OR (word, not symbol)
    Or,

    /// Logical NOT (`!`)
    Bang,

    // Delimiters
    LParen,

    RParen,

    LBrace,

    RBrace,

    /// Member access or method call
    Dot,

    Comma,

    /// End of input
    Eof,
}
