use crate::error::{RowqlError, RowqlResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    And,
    Or,
    Not,
    In,
    Is,
    Like,
    If,
    True,
    False,
    Null,

    // CASE expression keywords
    Case,
    When,
    Then,
    Else,
    End,

    // Identifiers and literals
    Identifier(String),
    Integer(i64),
    Float(f64),
    String(String),

    // Operators
    Equal,         // ==
    Assign,        // =
    NotEqual,      // != or <>
    LessThan,      // <
    LessThanEq,    // <=
    GreaterThan,   // >
    GreaterThanEq, // >=
    Plus,          // +
    Minus,         // -
    Star,          // *
    DoubleStar,    // **
    Slash,         // /
    DoubleSlash,   // //
    Percent,       // %

    // Bitwise operators
    Ampersand,  // &
    Pipe,       // |
    Caret,      // ^
    Tilde,      // ~
    LeftShift,  // <<
    RightShift, // >>

    NullCoalesce, // ??

    // Delimiters
    Dot,          // .
    Comma,        // ,
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    LeftParen,    // (
    RightParen,   // )
    Colon,        // :
    Question,     // ?

    // Special
    Eof,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            current_char,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    /// Peek at the next character without consuming it
    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> RowqlResult<Token> {
        let mut num_str = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() || ch == '_' {
                if ch != '_' {
                    num_str.push(ch);
                }
                self.advance();
            } else if ch == '.' && !is_float {
                // `1.upper()` style method calls are not numbers
                if matches!(self.peek_char(), Some(c) if c.is_alphabetic() && c != 'e' && c != 'E')
                {
                    break;
                }
                is_float = true;
                num_str.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E')
                && matches!(self.peek_char(), Some(c) if c.is_ascii_digit() || c == '-' || c == '+')
            {
                is_float = true;
                num_str.push(ch);
                self.advance();
                if let Some(sign @ ('-' | '+')) = self.current_char {
                    num_str.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        if is_float {
            num_str
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| RowqlError::SyntaxError(format!("Invalid float number: {}", num_str)))
        } else {
            match num_str.parse::<i64>() {
                Ok(n) => Ok(Token::Integer(n)),
                // too large for i64
                Err(_) => num_str.parse::<f64>().map(Token::Float).map_err(|_| {
                    RowqlError::SyntaxError(format!("Invalid integer number: {}", num_str))
                }),
            }
        }
    }

    fn read_string(&mut self) -> RowqlResult<Token> {
        let quote = self.current_char.unwrap_or('"');
        self.advance(); // Skip opening quote

        let mut string = String::new();

        while let Some(ch) = self.current_char {
            if ch == quote {
                if self.peek_char() == Some(quote) {
                    // doubled quote
                    string.push(quote);
                    self.advance();
                    self.advance();
                    continue;
                }
                self.advance(); // Skip closing quote
                return Ok(Token::String(string));
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    let resolved = match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        '\\' => '\\',
                        '"' => '"',
                        '\'' => '\'',
                        _ => {
                            string.push('\\');
                            escaped
                        }
                    };
                    string.push(resolved);
                    self.advance();
                }
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Err(RowqlError::SyntaxError("Unterminated string".to_string()))
    }

    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Check for keywords
        match ident.to_uppercase().as_str() {
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            "IN" => Token::In,
            "IS" => Token::Is,
            "LIKE" => Token::Like,
            "IF" => Token::If,
            "TRUE" => Token::True,
            "FALSE" => Token::False,
            "NULL" | "NONE" => Token::Null,
            // CASE expression keywords
            "CASE" => Token::Case,
            "WHEN" => Token::When,
            "THEN" => Token::Then,
            "ELSE" => Token::Else,
            "END" => Token::End,
            _ => Token::Identifier(ident),
        }
    }

    pub fn next_token(&mut self) -> RowqlResult<Token> {
        self.skip_whitespace();

        let token = match self.current_char {
            None => Token::Eof,

            Some(ch) if ch.is_ascii_digit() => {
                return self.read_number();
            }

            Some('.') if matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) => {
                return self.read_number();
            }

            Some('"') | Some('\'') => {
                return self.read_string();
            }

            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                return Ok(self.read_identifier());
            }

            Some('=') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::Equal
                } else {
                    Token::Assign
                }
            }

            Some('!') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::NotEqual
                } else {
                    Token::Not
                }
            }

            Some('<') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::LessThanEq
                } else if self.current_char == Some('<') {
                    self.advance();
                    Token::LeftShift
                } else if self.current_char == Some('>') {
                    self.advance();
                    Token::NotEqual
                } else {
                    Token::LessThan
                }
            }

            Some('>') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::GreaterThanEq
                } else if self.current_char == Some('>') {
                    self.advance();
                    Token::RightShift
                } else {
                    Token::GreaterThan
                }
            }

            Some('+') => {
                self.advance();
                Token::Plus
            }
            Some('-') => {
                self.advance();
                Token::Minus
            }
            Some('*') => {
                self.advance();
                if self.current_char == Some('*') {
                    self.advance();
                    Token::DoubleStar
                } else {
                    Token::Star
                }
            }
            Some('/') => {
                self.advance();
                if self.current_char == Some('/') {
                    self.advance();
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            Some('%') => {
                self.advance();
                Token::Percent
            }
            Some('&') => {
                self.advance();
                if self.current_char == Some('&') {
                    self.advance();
                    Token::And
                } else {
                    Token::Ampersand
                }
            }
            Some('|') => {
                self.advance();
                if self.current_char == Some('|') {
                    self.advance();
                    Token::Or
                } else {
                    Token::Pipe
                }
            }
            Some('^') => {
                self.advance();
                Token::Caret
            }
            Some('~') => {
                self.advance();
                Token::Tilde
            }
            Some('.') => {
                self.advance();
                Token::Dot
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some('{') => {
                self.advance();
                Token::LeftBrace
            }
            Some('}') => {
                self.advance();
                Token::RightBrace
            }
            Some('[') => {
                self.advance();
                Token::LeftBracket
            }
            Some(']') => {
                self.advance();
                Token::RightBracket
            }
            Some('(') => {
                self.advance();
                Token::LeftParen
            }
            Some(')') => {
                self.advance();
                Token::RightParen
            }
            Some(':') => {
                self.advance();
                Token::Colon
            }
            Some('?') => {
                self.advance();
                if self.current_char == Some('?') {
                    self.advance();
                    Token::NullCoalesce
                } else {
                    Token::Question
                }
            }

            Some(ch) => {
                return Err(RowqlError::SyntaxError(format!("Unexpected character: {}", ch)));
            }
        };

        Ok(token)
    }

    pub fn tokenize(&mut self) -> RowqlResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(tokenize("and")[0], Token::And);
        assert_eq!(tokenize("AND")[0], Token::And);
        assert_eq!(tokenize("Not")[0], Token::Not);
        assert_eq!(tokenize("is")[0], Token::Is);
    }

    #[test]
    fn test_boolean_null() {
        assert_eq!(tokenize("TRUE")[0], Token::True);
        assert_eq!(tokenize("False")[0], Token::False);
        assert_eq!(tokenize("NULL")[0], Token::Null);
        assert_eq!(tokenize("None")[0], Token::Null);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokenize("42")[0], Token::Integer(42));
        assert_eq!(tokenize("3.5")[0], Token::Float(3.5));
        assert_eq!(tokenize(".5")[0], Token::Float(0.5));
        assert_eq!(tokenize("1e3")[0], Token::Float(1000.0));
        assert_eq!(tokenize("1_000")[0], Token::Integer(1000));
    }

    #[test]
    fn test_strings() {
        assert_eq!(tokenize("'abc'")[0], Token::String("abc".to_string()));
        assert_eq!(tokenize("\"a\\nb\"")[0], Token::String("a\nb".to_string()));
        assert_eq!(tokenize("'it''s'")[0], Token::String("it's".to_string()));
        assert!(Lexer::new("'abc").tokenize().is_err());
    }

    #[test]
    fn test_unknown_escape_keeps_backslash() {
        assert_eq!(tokenize(r"'a\db'")[0], Token::String(r"a\db".to_string()));
        assert_eq!(tokenize(r"'a\\b'")[0], Token::String(r"a\b".to_string()));
    }

    #[test]
    fn test_operators() {
        let tokens = tokenize("a ** 2 // 3 <> b && c || d ?? e");
        assert_eq!(tokens[1], Token::DoubleStar);
        assert_eq!(tokens[3], Token::DoubleSlash);
        assert_eq!(tokens[5], Token::NotEqual);
        assert_eq!(tokens[7], Token::And);
        assert_eq!(tokens[9], Token::Or);
        assert_eq!(tokens[11], Token::NullCoalesce);
    }

    #[test]
    fn test_item_access() {
        let tokens = tokenize("_values[0]['a']");
        assert_eq!(tokens[0], Token::Identifier("_values".to_string()));
        assert_eq!(tokens[1], Token::LeftBracket);
        assert_eq!(tokens[2], Token::Integer(0));
        assert_eq!(tokens[5], Token::String("a".to_string()));
    }

    #[test]
    fn test_unexpected_character() {
        assert!(Lexer::new("a $ b").tokenize().is_err());
    }
}
