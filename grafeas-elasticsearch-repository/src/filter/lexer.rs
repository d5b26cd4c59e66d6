//! Tokenizer for filter expressions.

use crate::errors::FilterError;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    String(String),
    Int(i64),
    UInt(u64),
    Double(f64),
    Bool(bool),
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Bang,
    Minus,
    Dot,
    Comma,
    LParen,
    RParen,
    Eof,
}

impl TokenKind {
    /// Short human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier '{}'", name),
            Self::String(value) => format!("string \"{}\"", value),
            Self::Int(value) => format!("integer {}", value),
            Self::UInt(value) => format!("unsigned integer {}u", value),
            Self::Double(value) => format!("number {}", value),
            Self::Bool(value) => format!("'{}'", value),
            Self::AndAnd => "'&&'".to_string(),
            Self::OrOr => "'||'".to_string(),
            Self::EqEq => "'=='".to_string(),
            Self::NotEq => "'!='".to_string(),
            Self::Lt => "'<'".to_string(),
            Self::Le => "'<='".to_string(),
            Self::Gt => "'>'".to_string(),
            Self::Ge => "'>='".to_string(),
            Self::Bang => "'!'".to_string(),
            Self::Minus => "'-'".to_string(),
            Self::Dot => "'.'".to_string(),
            Self::Comma => "','".to_string(),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::Eof => "end of input".to_string(),
        }
    }
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Split `input` into tokens, ending with [`TokenKind::Eof`].
pub fn tokenize(input: &str) -> Result<Vec<Token>, FilterError> {
    let mut lexer = Lexer {
        chars: input.char_indices().peekable(),
        len: input.len(),
    };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    len: usize,
}

impl Lexer<'_> {
    fn next_token(&mut self) -> Result<Token, FilterError> {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }

        let Some((position, c)) = self.chars.next() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                position: self.len,
            });
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            '-' => TokenKind::Minus,
            '&' => self.expect_second('&', position, TokenKind::AndAnd)?,
            '|' => self.expect_second('|', position, TokenKind::OrOr)?,
            '=' => self.expect_second('=', position, TokenKind::EqEq)?,
            '!' => self.optional_second('=', TokenKind::NotEq, TokenKind::Bang),
            '<' => self.optional_second('=', TokenKind::Le, TokenKind::Lt),
            '>' => self.optional_second('=', TokenKind::Ge, TokenKind::Gt),
            '"' | '\'' => self.string(c, position)?,
            c if c.is_ascii_digit() => self.number(c, position)?,
            c if c.is_alphabetic() || c == '_' => self.ident(c),
            other => {
                return Err(FilterError::syntax(
                    position,
                    format!("unexpected character '{}'", other),
                ))
            }
        };

        Ok(Token { kind, position })
    }

    fn expect_second(
        &mut self,
        expected: char,
        position: usize,
        kind: TokenKind,
    ) -> Result<TokenKind, FilterError> {
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(kind),
            _ => Err(FilterError::syntax(
                position,
                format!("expected '{}{}'", expected, expected),
            )),
        }
    }

    fn optional_second(&mut self, second: char, with: TokenKind, without: TokenKind) -> TokenKind {
        if matches!(self.chars.peek(), Some((_, c)) if *c == second) {
            self.chars.next();
            with
        } else {
            without
        }
    }

    fn string(&mut self, quote: char, position: usize) -> Result<TokenKind, FilterError> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                None => return Err(FilterError::syntax(position, "unterminated string")),
                Some((_, c)) if c == quote => return Ok(TokenKind::String(value)),
                Some((escape_position, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, c @ ('\\' | '"' | '\''))) => value.push(c),
                    _ => {
                        return Err(FilterError::syntax(
                            escape_position,
                            "invalid escape sequence",
                        ))
                    }
                },
                Some((_, c)) => value.push(c),
            }
        }
    }

    fn number(&mut self, first: char, position: usize) -> Result<TokenKind, FilterError> {
        let mut digits = String::from(first);
        self.take_digits(&mut digits);

        // A '.' only continues the number when a digit follows it.
        let mut lookahead = self.chars.clone();
        if matches!(lookahead.next(), Some((_, '.')))
            && matches!(lookahead.next(), Some((_, c)) if c.is_ascii_digit())
        {
            self.chars.next();
            digits.push('.');
            self.take_digits(&mut digits);
            return digits
                .parse()
                .map(TokenKind::Double)
                .map_err(|_| FilterError::syntax(position, "invalid number"));
        }

        if matches!(self.chars.peek(), Some((_, 'u' | 'U'))) {
            self.chars.next();
            return digits
                .parse()
                .map(TokenKind::UInt)
                .map_err(|_| FilterError::syntax(position, "unsigned integer out of range"));
        }

        digits
            .parse()
            .map(TokenKind::Int)
            .map_err(|_| FilterError::syntax(position, "integer out of range"))
    }

    fn take_digits(&mut self, digits: &mut String) {
        while let Some((_, c)) = self.chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(*c);
            self.chars.next();
        }
    }

    fn ident(&mut self, first: char) -> TokenKind {
        let mut name = String::from(first);
        while let Some((_, c)) = self.chars.peek() {
            if !(c.is_alphanumeric() || *c == '_') {
                break;
            }
            name.push(*c);
            self.chars.next();
        }
        match name.as_str() {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            _ => TokenKind::Ident(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_comparison() {
        assert_eq!(
            kinds(r#"a.b == "c""#),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Dot,
                TokenKind::Ident("b".to_string()),
                TokenKind::EqEq,
                TokenKind::String("c".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("&& || != <= >= < > !"),
            vec![
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::NotEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_literals() {
        assert_eq!(
            kinds(r#"42 7u 7.5 true false 'single' "esc\"aped""#),
            vec![
                TokenKind::Int(42),
                TokenKind::UInt(7),
                TokenKind::Double(7.5),
                TokenKind::Bool(true),
                TokenKind::Bool(false),
                TokenKind::String("single".to_string()),
                TokenKind::String("esc\"aped".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_followed_by_member_access() {
        assert_eq!(
            kinds("1.x"),
            vec![
                TokenKind::Int(1),
                TokenKind::Dot,
                TokenKind::Ident("x".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_errors() {
        assert!(matches!(
            tokenize(r#""open"#),
            Err(FilterError::Syntax { position: 0, .. })
        ));
        assert!(matches!(
            tokenize("a = b"),
            Err(FilterError::Syntax { position: 2, .. })
        ));
        assert!(tokenize("a & b").is_err());
        assert!(tokenize("a # b").is_err());
        assert!(tokenize(r#""bad \q escape""#).is_err());
    }
}
