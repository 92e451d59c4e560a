//! SQL parser.
//!
//! Recursive descent over the lexer's token stream. The grammar is the
//! engine's whole SQL surface:
//!
//! ```text
//! CREATE TABLE name ( column type [, ...] ) ;
//! CREATE INDEX name ON table ( column ) ;
//! INSERT INTO table VALUES ( literal [, ...] ) ;
//! SELECT * FROM table [ WHERE column = literal ] ;
//! ```
//!
//! Types are `INT`/`INTEGER` and `VARCHAR(n)` (`STRING(n)` is accepted as
//! an alias). The trailing semicolon may be omitted.

use crate::catalog::DataType;
use crate::sql::lexer::{LexError, Lexer, Token, TokenKind};
use thiserror::Error;

/// A literal as written in the statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Integer(i32),
    String(String),
}

/// One column definition in CREATE TABLE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub length: u32,
}

/// A parsed statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
    },
    CreateIndex {
        name: String,
        table: String,
        column: String,
    },
    Insert {
        table: String,
        values: Vec<Literal>,
    },
    Select {
        table: String,
        predicate: Option<(String, Literal)>,
    },
}

/// Parse errors, all carrying a source position
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("line {line}, column {column}: expected {expected}, found '{found}'")]
    Unexpected {
        expected: String,
        found: String,
        line: u32,
        column: u32,
    },

    #[error("line {line}, column {column}: unsupported data type '{name}'")]
    UnsupportedType { name: String, line: u32, column: u32 },

    #[error("line {line}, column {column}: integer literal '{text}' out of range")]
    IntegerOutOfRange { text: String, line: u32, column: u32 },
}

/// Parse one statement.
pub fn parse(sql: &str) -> Result<Statement, ParseError> {
    Parser::new(sql).parse_statement()
}

struct Parser {
    lexer: Lexer,
}

impl Parser {
    fn new(sql: &str) -> Self {
        Self {
            lexer: Lexer::new(sql),
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let token = self.lexer.peek()?;
        let statement = match token.kind {
            TokenKind::Create => self.parse_create()?,
            TokenKind::Insert => self.parse_insert()?,
            TokenKind::Select => self.parse_select()?,
            _ => return Err(unexpected("a statement", &token)),
        };

        // Accept an optional trailing semicolon, then require the end.
        if self.lexer.peek()?.kind == TokenKind::Semicolon {
            self.lexer.next_token()?;
        }
        self.expect(TokenKind::Eof)?;
        Ok(statement)
    }

    fn parse_create(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Create)?;
        let token = self.lexer.peek()?;
        match token.kind {
            TokenKind::Table => self.parse_create_table(),
            TokenKind::Index => self.parse_create_index(),
            _ => Err(unexpected("TABLE or INDEX", &token)),
        }
    }

    fn parse_create_table(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Table)?;
        let name = self.expect(TokenKind::Identifier)?.text;
        self.expect(TokenKind::LeftParen)?;

        let mut columns = Vec::new();
        loop {
            let col_name = self.expect(TokenKind::Identifier)?.text;
            columns.push(self.parse_column_type(col_name)?);

            let token = self.lexer.next_token()?;
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RightParen => break,
                _ => return Err(unexpected("',' or ')'", &token)),
            }
        }

        Ok(Statement::CreateTable { name, columns })
    }

    fn parse_column_type(&mut self, col_name: String) -> Result<ColumnDef, ParseError> {
        let type_token = self.expect(TokenKind::Identifier)?;
        match type_token.text.to_ascii_uppercase().as_str() {
            "INT" | "INTEGER" => Ok(ColumnDef {
                name: col_name,
                data_type: DataType::Integer,
                length: 4,
            }),
            "VARCHAR" | "STRING" => {
                self.expect(TokenKind::LeftParen)?;
                let len_token = self.expect(TokenKind::Number)?;
                let length: u32 = len_token.text.parse().map_err(|_| {
                    ParseError::IntegerOutOfRange {
                        text: len_token.text.clone(),
                        line: len_token.span.line,
                        column: len_token.span.column,
                    }
                })?;
                self.expect(TokenKind::RightParen)?;
                Ok(ColumnDef {
                    name: col_name,
                    data_type: DataType::Varchar,
                    length,
                })
            }
            other => Err(ParseError::UnsupportedType {
                name: other.to_string(),
                line: type_token.span.line,
                column: type_token.span.column,
            }),
        }
    }

    fn parse_create_index(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Index)?;
        let name = self.expect(TokenKind::Identifier)?.text;
        self.expect(TokenKind::On)?;
        let table = self.expect(TokenKind::Identifier)?.text;
        self.expect(TokenKind::LeftParen)?;
        let column = self.expect(TokenKind::Identifier)?.text;
        self.expect(TokenKind::RightParen)?;

        Ok(Statement::CreateIndex {
            name,
            table,
            column,
        })
    }

    fn parse_insert(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Insert)?;
        self.expect(TokenKind::Into)?;
        let table = self.expect(TokenKind::Identifier)?.text;
        self.expect(TokenKind::Values)?;
        self.expect(TokenKind::LeftParen)?;

        let mut values = Vec::new();
        loop {
            values.push(self.parse_literal()?);
            let token = self.lexer.next_token()?;
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RightParen => break,
                _ => return Err(unexpected("',' or ')'", &token)),
            }
        }

        Ok(Statement::Insert { table, values })
    }

    fn parse_select(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Select)?;
        self.expect(TokenKind::Star)?;
        self.expect(TokenKind::From)?;
        let table = self.expect(TokenKind::Identifier)?.text;

        let predicate = if self.lexer.peek()?.kind == TokenKind::Where {
            self.lexer.next_token()?;
            let column = self.expect(TokenKind::Identifier)?.text;
            self.expect(TokenKind::Equal)?;
            Some((column, self.parse_literal()?))
        } else {
            None
        };

        Ok(Statement::Select { table, predicate })
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let token = self.lexer.next_token()?;
        match token.kind {
            TokenKind::Number => {
                let value: i32 =
                    token
                        .text
                        .parse()
                        .map_err(|_| ParseError::IntegerOutOfRange {
                            text: token.text.clone(),
                            line: token.span.line,
                            column: token.span.column,
                        })?;
                Ok(Literal::Integer(value))
            }
            TokenKind::StringLit => Ok(Literal::String(token.text)),
            _ => Err(unexpected("a literal", &token)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let token = self.lexer.next_token()?;
        if token.kind != kind {
            return Err(unexpected(&kind.to_string(), &token));
        }
        Ok(token)
    }
}

fn unexpected(expected: &str, found: &Token) -> ParseError {
    ParseError::Unexpected {
        expected: expected.to_string(),
        found: if found.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            found.text.clone()
        },
        line: found.span.line,
        column: found.span.column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_table() {
        let stmt = parse("CREATE TABLE users (id INT, name VARCHAR(16));").unwrap();
        assert_eq!(
            stmt,
            Statement::CreateTable {
                name: "users".into(),
                columns: vec![
                    ColumnDef {
                        name: "id".into(),
                        data_type: DataType::Integer,
                        length: 4,
                    },
                    ColumnDef {
                        name: "name".into(),
                        data_type: DataType::Varchar,
                        length: 16,
                    },
                ],
            }
        );
    }

    #[test]
    fn test_parse_create_index() {
        let stmt = parse("CREATE INDEX users_by_id ON users (id);").unwrap();
        assert_eq!(
            stmt,
            Statement::CreateIndex {
                name: "users_by_id".into(),
                table: "users".into(),
                column: "id".into(),
            }
        );
    }

    #[test]
    fn test_parse_insert() {
        let stmt = parse("INSERT INTO users VALUES (1, 'ada', -5);").unwrap();
        assert_eq!(
            stmt,
            Statement::Insert {
                table: "users".into(),
                values: vec![
                    Literal::Integer(1),
                    Literal::String("ada".into()),
                    Literal::Integer(-5),
                ],
            }
        );
    }

    #[test]
    fn test_parse_select_with_and_without_predicate() {
        assert_eq!(
            parse("SELECT * FROM users").unwrap(),
            Statement::Select {
                table: "users".into(),
                predicate: None,
            }
        );
        assert_eq!(
            parse("SELECT * FROM users WHERE id = 3;").unwrap(),
            Statement::Select {
                table: "users".into(),
                predicate: Some(("id".into(), Literal::Integer(3))),
            }
        );
    }

    #[test]
    fn test_semicolon_is_optional_but_trailing_junk_is_not() {
        assert!(parse("SELECT * FROM t").is_ok());
        assert!(parse("SELECT * FROM t;").is_ok());
        match parse("SELECT * FROM t extra") {
            Err(ParseError::Unexpected { .. }) => {}
            other => panic!("expected Unexpected, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_statement() {
        match parse("DROP TABLE t;") {
            Err(ParseError::Unexpected { found, .. }) => assert_eq!(found, "DROP"),
            other => panic!("expected Unexpected, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_column_type() {
        match parse("CREATE TABLE t (x FLOAT)") {
            Err(ParseError::UnsupportedType { name, .. }) => assert_eq!(name, "FLOAT"),
            other => panic!("expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn test_varchar_requires_length() {
        assert!(parse("CREATE TABLE t (x VARCHAR)").is_err());
    }

    #[test]
    fn test_integer_overflow_is_reported() {
        match parse("INSERT INTO t VALUES (99999999999)") {
            Err(ParseError::IntegerOutOfRange { .. }) => {}
            other => panic!("expected IntegerOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_lex_errors_propagate() {
        match parse("SELECT * FROM 'unterminated") {
            Err(ParseError::Lex(LexError::UnterminatedString { .. })) => {}
            other => panic!("expected lex error, got {:?}", other),
        }
    }
}
