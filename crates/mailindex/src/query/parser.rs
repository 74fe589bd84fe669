//! Query language parser
//!
//! Supports:
//! - Bare words and `"quoted phrases"`
//! - Field predicates: `tag:`, `id:`, `thread:`, `from:`, `to:`,
//!   `subject:`, `attachment:`, `date:` (with `field:"phrase"` values)
//! - `AND`, `OR`, `NOT` (any case) and parentheses; adjacent terms are
//!   implicitly AND-ed
//! - `*` or an empty query for every message

use crate::error::{Error, Result};

/// Field a term is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Text,
    Tag,
    Id,
    Thread,
    From,
    To,
    Subject,
    Attachment,
    Date,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tag" | "is" => Some(Field::Tag),
            "id" | "mid" => Some(Field::Id),
            "thread" => Some(Field::Thread),
            "from" => Some(Field::From),
            "to" => Some(Field::To),
            "subject" => Some(Field::Subject),
            "attachment" => Some(Field::Attachment),
            "date" => Some(Field::Date),
            _ => None,
        }
    }
}

/// Parsed query expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    All,
    Term { field: Field, value: String },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Tags named by positive or negative `tag:` terms
    pub fn mentioned_tags(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_tags(&mut out);
        out
    }

    fn collect_tags<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Term {
                field: Field::Tag,
                value,
            } => out.push(value),
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.collect_tags(out);
                b.collect_tags(out);
            }
            Expr::Not(inner) => inner.collect_tags(out),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Term { field: Field, value: String },
    All,
}

fn syntax_error(message: impl Into<String>) -> Error {
    Error::backend(format!("Query syntax error: {}", message.into()))
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        match c {
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '"' => {
                chars.next();
                let phrase = read_quoted(&mut chars)?;
                tokens.push(Token::Term {
                    field: Field::Text,
                    value: phrase,
                });
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' || c == '"' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }

                // field:"quoted value"
                if let Some(name) = word.strip_suffix(':')
                    && let Some(field) = Field::from_name(name)
                    && chars.peek() == Some(&'"')
                {
                    chars.next();
                    let value = read_quoted(&mut chars)?;
                    tokens.push(Token::Term { field, value });
                    continue;
                }

                tokens.push(classify_word(word)?);
            }
        }
    }

    Ok(tokens)
}

fn read_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<String> {
    let mut value = String::new();
    loop {
        match chars.next() {
            Some('"') => return Ok(value),
            Some(c) => value.push(c),
            None => return Err(syntax_error("unterminated quote")),
        }
    }
}

fn classify_word(word: String) -> Result<Token> {
    match word.to_ascii_lowercase().as_str() {
        "and" => return Ok(Token::And),
        "or" => return Ok(Token::Or),
        "not" => return Ok(Token::Not),
        "*" => return Ok(Token::All),
        _ => {}
    }

    if let Some((name, value)) = word.split_once(':')
        && let Some(field) = Field::from_name(name)
    {
        if value.is_empty() {
            return Err(syntax_error(format!("missing value after {}:", name)));
        }
        return Ok(Token::Term {
            field,
            value: value.to_string(),
        });
    }

    Ok(Token::Term {
        field: Field::Text,
        value: word,
    })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.next();
                }
                Some(Token::Not | Token::LParen | Token::Term { .. } | Token::All) => {}
                _ => break,
            }
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.next();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(syntax_error("missing closing parenthesis")),
                }
            }
            Some(Token::Term { field, value }) => Ok(Expr::Term { field, value }),
            Some(Token::All) => Ok(Expr::All),
            Some(Token::RParen) => Err(syntax_error("unexpected closing parenthesis")),
            Some(token) => Err(syntax_error(format!("unexpected operator {:?}", token))),
            None => Err(syntax_error("unexpected end of query")),
        }
    }
}

/// Parse a query string into an expression.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Ok(Expr::All);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos < parser.tokens.len() {
        return Err(syntax_error("unexpected closing parenthesis"));
    }
    Ok(expr)
}
