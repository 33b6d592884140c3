// tests/lexer_tests.rs

use qmodel_ir::ast::Token;
use qmodel_ir::lexer::{LexError, Lexer};

fn tokens(input: &str) -> Vec<Token> {
    Lexer::new(input)
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|(token, _)| token)
        .collect()
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_single_char_tokens() {
    let test_cases = vec![
        ("$", Token::Dollar),
        ("+", Token::Plus),
        ("-", Token::Minus),
        ("*", Token::Star),
        ("/", Token::Slash),
        ("%", Token::Percent),
        ("(", Token::LParen),
        (")", Token::RParen),
        ("{", Token::LBrace),
        ("}", Token::RBrace),
        (".", Token::Dot),
        (",", Token::Comma),
        ("<", Token::Lt),
        (">", Token::Gt),
        ("!", Token::Bang),
        ("=", Token::Assign),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token().unwrap();
        assert_eq!(token, expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_two_char_tokens() {
    assert_eq!(
        tokens("== != <= >= =>"),
        vec![
            Token::EqEq,
            Token::NotEq,
            Token::LtEq,
            Token::GtEq,
            Token::Arrow,
            Token::Eof
        ]
    );
}

#[test]
fn test_assign_is_not_confused_with_arrow() {
    assert_eq!(
        tokens("a = b => c"),
        vec![
            Token::Identifier("a".into()),
            Token::Assign,
            Token::Identifier("b".into()),
            Token::Arrow,
            Token::Identifier("c".into()),
            Token::Eof
        ]
    );
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_numbers() {
    assert_eq!(
        tokens("42 3.5 7"),
        vec![Token::Integer(42), Token::Float(3.5), Token::Integer(7), Token::Eof]
    );
}

#[test]
fn test_member_after_integer_is_not_a_float() {
    assert_eq!(
        tokens("1.x"),
        vec![
            Token::Integer(1),
            Token::Dot,
            Token::Identifier("x".into()),
            Token::Eof
        ]
    );
}

#[test]
fn test_strings_with_escapes() {
    assert_eq!(
        tokens(r#""a\"b" 'c\'d' "tab\there""#),
        vec![
            Token::String("a\"b".into()),
            Token::String("c'd".into()),
            Token::String("tab\there".into()),
            Token::Eof
        ]
    );
}

#[test]
fn test_keywords_and_identifiers() {
    assert_eq!(
        tokens("new Point as float and or null true nothing"),
        vec![
            Token::New,
            Token::Identifier("Point".into()),
            Token::As,
            Token::Identifier("float".into()),
            Token::And,
            Token::Or,
            Token::Null,
            Token::Boolean(true),
            Token::Identifier("nothing".into()),
            Token::Eof
        ]
    );
}

// ============================================================================
// Positions and errors
// ============================================================================

#[test]
fn test_positions_are_character_offsets() {
    let positions: Vec<usize> = Lexer::new("$.count()")
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|(_, position)| position)
        .collect();
    assert_eq!(positions, vec![0, 1, 2, 7, 8, 9]);
}

#[test]
fn test_unterminated_string() {
    let err = Lexer::new("x == \"abc").tokenize().unwrap_err();
    assert_eq!(err, LexError::UnterminatedString { position: 5 });
}

#[test]
fn test_unexpected_character() {
    let err = Lexer::new("x # y").tokenize().unwrap_err();
    assert_eq!(err, LexError::UnexpectedChar { ch: '#', position: 2 });
}

#[test]
fn test_invalid_escape() {
    let err = Lexer::new(r#""\q""#).tokenize().unwrap_err();
    assert!(matches!(err, LexError::InvalidEscape { ch: 'q', .. }));
}

#[test]
fn test_integer_overflow_is_an_error() {
    let err = Lexer::new("99999999999999999999").tokenize().unwrap_err();
    assert!(matches!(err, LexError::InvalidNumber { position: 0, .. }));
}
