use thiserror::Error;

use crate::ast::Token;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("Unterminated string starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("Invalid escape sequence '\\{ch}' at position {position}")]
    InvalidEscape { ch: char, position: usize },

    #[error("Invalid number '{text}' at position {position}")]
    InvalidNumber { text: String, position: usize },
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Lexes the whole input. Each token is paired with the character offset
    /// it starts at; the last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<(Token, usize)>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.position;
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push((token, start));
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// Consumes `n` characters and yields `token`.
    fn single(&mut self, n: usize, token: Token) -> Token {
        self.position += n;
        token
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some(c @ ('"' | '\'' | '\\')) => result.push(c),
                        Some(ch) => {
                            return Err(LexError::InvalidEscape {
                                ch,
                                position: self.position,
                            });
                        }
                        None => return Err(LexError::UnterminatedString { position: start }),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString { position: start })
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let invalid = |text: String| LexError::InvalidNumber {
            text,
            position: start,
        };
        if is_float {
            number
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| invalid(number.clone()))
        } else {
            number
                .parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| invalid(number.clone()))
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let token = match self.current_char() {
            None => Token::Eof,
            Some('$') => self.single(1, Token::Dollar),
            Some('.') => self.single(1, Token::Dot),
            Some(',') => self.single(1, Token::Comma),
            Some('+') => self.single(1, Token::Plus),
            Some('-') => self.single(1, Token::Minus),
            Some('*') => self.single(1, Token::Star),
            Some('/') => self.single(1, Token::Slash),
            Some('%') => self.single(1, Token::Percent),
            Some('(') => self.single(1, Token::LParen),
            Some(')') => self.single(1, Token::RParen),
            Some('{') => self.single(1, Token::LBrace),
            Some('}') => self.single(1, Token::RBrace),
            Some('=') => match self.peek_char(1) {
                Some('=') => self.single(2, Token::EqEq),
                Some('>') => self.single(2, Token::Arrow),
                _ => self.single(1, Token::Assign),
            },
            Some('>') => match self.peek_char(1) {
                Some('=') => self.single(2, Token::GtEq),
                _ => self.single(1, Token::Gt),
            },
            Some('<') => match self.peek_char(1) {
                Some('=') => self.single(2, Token::LtEq),
                _ => self.single(1, Token::Lt),
            },
            Some('!') => match self.peek_char(1) {
                Some('=') => self.single(2, Token::NotEq),
                _ => self.single(1, Token::Bang),
            },
            Some('"') => Token::String(self.read_string('"')?),
            Some('\'') => Token::String(self.read_string('\'')?),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();

                match ident.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "new" => Token::New,
                    "as" => Token::As,
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    "null" => Token::Null,
                    _ => Token::Identifier(ident),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) => {
                return Err(LexError::UnexpectedChar {
                    ch,
                    position: self.position,
                });
            }
        };
        Ok(token)
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("and or new as true false null");
    assert_eq!(lexer.next_token(), Ok(Token::And));
    assert_eq!(lexer.next_token(), Ok(Token::Or));
    assert_eq!(lexer.next_token(), Ok(Token::New));
    assert_eq!(lexer.next_token(), Ok(Token::As));
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(true)));
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(false)));
    assert_eq!(lexer.next_token(), Ok(Token::Null));
}

#[test]
fn test_lambda_chain() {
    let tokens: Vec<Token> = Lexer::new("$.where(x => x.v >= 2)")
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|(t, _)| t)
        .collect();
    assert_eq!(
        tokens,
        vec![
            Token::Dollar,
            Token::Dot,
            Token::Identifier("where".to_string()),
            Token::LParen,
            Token::Identifier("x".to_string()),
            Token::Arrow,
            Token::Identifier("x".to_string()),
            Token::Dot,
            Token::Identifier("v".to_string()),
            Token::GtEq,
            Token::Integer(2),
            Token::RParen,
            Token::Eof,
        ]
    );
}
