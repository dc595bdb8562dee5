//! Recursive-descent parser for function bodies
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! statement   := declare | return | if | while | break | continue | throw
//!              | block | ";" | expression [";"]
//! expression  := assignment
//! assignment  := conditional [("=" | "+=" | ...) assignment]
//! conditional := or ["?" assignment ":" assignment]
//! or          := and ("||" and)*
//! and         := equality ("&&" equality)*
//! equality    := relational (("==" | "!=" | "===" | "!==") relational)*
//! relational  := additive (("<" | "<=" | ">" | ">=") additive)*
//! additive    := term (("+" | "-") term)*
//! term        := unary (("*" | "/" | "%") unary)*
//! unary       := ("!" | "-" | "+" | "typeof") unary | postfix
//! postfix     := primary ("." name | "[" expression "]" | "(" args ")")*
//! ```
//!
//! Semicolons are optional statement terminators.

use super::ast::{BinaryOp, Expr, LogicalOp, Stmt, UnaryOp};
use super::lexer::{tokenize, Spanned, Token};

/// A body that does not parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the body text
    pub offset: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

/// Parse a complete function body into statements
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let tokens = tokenize(source).map_err(|offset| ParseError {
        message: "unrecognized character".to_string(),
        offset,
    })?;

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
    };

    let mut statements = Vec::new();
    while !parser.at_end() {
        statements.push(parser.statement()?);
    }
    Ok(statements)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", what)))
        }
    }

    fn error(&self, message: &str) -> ParseError {
        let found = match self.peek() {
            Some(token) => format!("found {:?}", token),
            None => "found end of body".to_string(),
        };
        ParseError {
            message: format!("{}, {}", message, found),
            offset: self.offset(),
        }
    }

    fn end_statement(&mut self) {
        self.eat(&Token::Semicolon);
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let token = match self.peek() {
            Some(token) => token.clone(),
            None => return Err(self.error("expected statement")),
        };

        match token {
            Token::Let | Token::Var => {
                self.pos += 1;
                self.declaration(false)
            }
            Token::Const => {
                self.pos += 1;
                self.declaration(true)
            }
            Token::Return => {
                self.pos += 1;
                let value = match self.peek() {
                    None | Some(Token::Semicolon) | Some(Token::CloseBrace) => None,
                    Some(_) => Some(self.expression()?),
                };
                self.end_statement();
                Ok(Stmt::Return(value))
            }
            Token::If => {
                self.pos += 1;
                let condition = self.parenthesized()?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if self.eat(&Token::Else) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    condition,
                    then_branch,
                    else_branch,
                })
            }
            Token::While => {
                self.pos += 1;
                let condition = self.parenthesized()?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::While { condition, body })
            }
            Token::Break => {
                self.pos += 1;
                self.end_statement();
                Ok(Stmt::Break)
            }
            Token::Continue => {
                self.pos += 1;
                self.end_statement();
                Ok(Stmt::Continue)
            }
            Token::Throw => {
                self.pos += 1;
                let value = self.expression()?;
                self.end_statement();
                Ok(Stmt::Throw(value))
            }
            Token::OpenBrace => {
                self.pos += 1;
                self.block()
            }
            Token::Semicolon => {
                self.pos += 1;
                Ok(Stmt::Empty)
            }
            _ => {
                let expr = self.expression()?;
                self.end_statement();
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn declaration(&mut self, constant: bool) -> Result<Stmt, ParseError> {
        let mut bindings = Vec::new();
        loop {
            let name = match self.peek() {
                Some(Token::Ident(name)) => name.clone(),
                _ => return Err(self.error("expected variable name")),
            };
            self.pos += 1;
            let init = if self.eat(&Token::Assign) {
                Some(self.expression()?)
            } else {
                None
            };
            bindings.push((name, init));

            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.end_statement();
        Ok(Stmt::Declare { constant, bindings })
    }

    fn block(&mut self) -> Result<Stmt, ParseError> {
        let mut statements = Vec::new();
        while !self.eat(&Token::CloseBrace) {
            if self.at_end() {
                return Err(self.error("expected '}'"));
            }
            statements.push(self.statement()?);
        }
        Ok(Stmt::Block(statements))
    }

    fn parenthesized(&mut self) -> Result<Expr, ParseError> {
        self.expect(&Token::OpenParen, "'('")?;
        let expr = self.expression()?;
        self.expect(&Token::CloseParen, "')'")?;
        Ok(expr)
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.conditional()?;

        let op = match self.peek() {
            Some(Token::Assign) => None,
            Some(Token::PlusAssign) => Some(BinaryOp::Add),
            Some(Token::MinusAssign) => Some(BinaryOp::Sub),
            Some(Token::StarAssign) => Some(BinaryOp::Mul),
            Some(Token::SlashAssign) => Some(BinaryOp::Div),
            Some(Token::PercentAssign) => Some(BinaryOp::Rem),
            _ => return Ok(target),
        };

        if !matches!(
            target,
            Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. }
        ) {
            return Err(self.error("invalid assignment target"));
        }

        self.pos += 1;
        let value = self.assignment()?;
        Ok(Expr::Assign {
            target: Box::new(target),
            op,
            value: Box::new(value),
        })
    }

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let condition = self.logical_or()?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let then_expr = self.assignment()?;
        self.expect(&Token::Colon, "':'")?;
        let else_expr = self.assignment()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.logical_and()?;
        while self.eat(&Token::Or) {
            let right = self.logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;
        while self.eat(&Token::And) {
            let right = self.equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// Parse a left-associative chain of binary operators
    fn binary_chain(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, ParseError>,
        operator: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, ParseError> {
        let mut left = operand(self)?;
        while let Some(op) = self.peek().and_then(operator) {
            self.pos += 1;
            let right = operand(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_chain(Self::relational, |token| match token {
            Token::Eq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::NotEq),
            Token::StrictEq => Some(BinaryOp::StrictEq),
            Token::StrictNotEq => Some(BinaryOp::StrictNotEq),
            _ => None,
        })
    }

    fn relational(&mut self) -> Result<Expr, ParseError> {
        self.binary_chain(Self::additive, |token| match token {
            Token::Lt => Some(BinaryOp::Lt),
            Token::LtEq => Some(BinaryOp::LtEq),
            Token::Gt => Some(BinaryOp::Gt),
            Token::GtEq => Some(BinaryOp::GtEq),
            _ => None,
        })
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_chain(Self::term, |token| match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        self.binary_chain(Self::unary, |token| match token {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Typeof) => UnaryOp::Typeof,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(&Token::OpenBracket) {
                let index = self.expression()?;
                self.expect(&Token::CloseBracket, "']'")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(&Token::OpenParen) {
                let args = self.list(&Token::CloseParen, Self::expression)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated items up to and including `close`; a trailing comma is allowed
    fn list<T>(
        &mut self,
        close: &Token,
        item: fn(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(item(self)?);
            if !self.eat(&Token::Comma) {
                self.expect(close, &format!("{:?}", close))?;
                break;
            }
        }
        Ok(items)
    }

    fn property_name(&mut self) -> Result<String, ParseError> {
        let name = match self.peek() {
            Some(Token::Ident(name)) => name.clone(),
            Some(token) => match keyword_text(token) {
                Some(text) => text.to_string(),
                None => return Err(self.error("expected property name")),
            },
            None => return Err(self.error("expected property name")),
        };
        self.pos += 1;
        Ok(name)
    }

    fn object_entry(&mut self) -> Result<(String, Expr), ParseError> {
        let key = match self.peek() {
            Some(Token::Str(key)) => {
                let key = key.clone();
                self.pos += 1;
                key
            }
            Some(Token::Number(number)) => {
                let key = number.to_string();
                self.pos += 1;
                key
            }
            _ => self.property_name()?,
        };
        self.expect(&Token::Colon, "':'")?;
        let value = self.assignment()?;
        Ok((key, value))
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let token = match self.advance() {
            Some(token) => token,
            None => return Err(self.error("expected expression")),
        };

        let expr = match token {
            Token::Number(number) => Expr::Number(number),
            Token::Str(text) => Expr::Str(text),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Null => Expr::Null,
            Token::Undefined => Expr::Undefined,
            Token::This => Expr::This,
            Token::Ident(name) => Expr::Ident(name),
            Token::OpenParen => {
                let expr = self.expression()?;
                self.expect(&Token::CloseParen, "')'")?;
                expr
            }
            Token::OpenBracket => Expr::Array(self.list(&Token::CloseBracket, Self::expression)?),
            Token::OpenBrace => Expr::Object(self.list(&Token::CloseBrace, Self::object_entry)?),
            _ => {
                self.pos = start;
                return Err(self.error("expected expression"));
            }
        };
        Ok(expr)
    }
}

/// Keywords are still valid property names after a dot (`this.set`)
fn keyword_text(token: &Token) -> Option<&'static str> {
    let text = match token {
        Token::Let => "let",
        Token::Const => "const",
        Token::Var => "var",
        Token::Return => "return",
        Token::If => "if",
        Token::Else => "else",
        Token::While => "while",
        Token::Break => "break",
        Token::Continue => "continue",
        Token::Throw => "throw",
        Token::Typeof => "typeof",
        Token::True => "true",
        Token::False => "false",
        Token::Null => "null",
        Token::Undefined => "undefined",
        Token::This => "this",
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;

    fn parse(source: &str) -> Vec<Stmt> {
        parse_program(source).unwrap()
    }

    #[test]
    fn test_return_string() {
        assert_eq!(
            parse("return 'it works';"),
            vec![Stmt::Return(Some(Expr::Str("it works".to_string())))]
        );
    }

    #[test]
    fn test_bare_return() {
        assert_eq!(parse("return;"), vec![Stmt::Return(None)]);
        assert_eq!(parse("return"), vec![Stmt::Return(None)]);
    }

    #[test]
    fn test_precedence() {
        let stmts = parse("return a + b * 2;");
        let expected = Expr::Binary {
            op: BinaryOp::Add,
            left: Box::new(Expr::Ident("a".to_string())),
            right: Box::new(Expr::Binary {
                op: BinaryOp::Mul,
                left: Box::new(Expr::Ident("b".to_string())),
                right: Box::new(Expr::Number(Number::Int(2))),
            }),
        };
        assert_eq!(stmts, vec![Stmt::Return(Some(expected))]);
    }

    #[test]
    fn test_member_assignment() {
        let stmts = parse("this.setter1 = value + 1;");
        assert!(matches!(
            &stmts[0],
            Stmt::Expr(Expr::Assign { target, op: None, .. })
                if matches!(target.as_ref(), Expr::Member { property, .. } if property == "setter1")
        ));
    }

    #[test]
    fn test_if_else_without_braces() {
        let stmts = parse("if (num % 2 == 0)\n    return num * 2;\nelse\n    return num * 3;\n");
        assert_eq!(stmts.len(), 1);
        assert!(matches!(
            &stmts[0],
            Stmt::If {
                else_branch: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_declarations() {
        let stmts = parse("let a = 1, b; const c = 2");
        assert_eq!(
            stmts,
            vec![
                Stmt::Declare {
                    constant: false,
                    bindings: vec![
                        ("a".to_string(), Some(Expr::Number(Number::Int(1)))),
                        ("b".to_string(), None),
                    ],
                },
                Stmt::Declare {
                    constant: true,
                    bindings: vec![("c".to_string(), Some(Expr::Number(Number::Int(2))))],
                },
            ]
        );
    }

    #[test]
    fn test_keyword_property_name() {
        let stmts = parse("return this.set;");
        assert_eq!(
            stmts,
            vec![Stmt::Return(Some(Expr::Member {
                object: Box::new(Expr::This),
                property: "set".to_string(),
            }))]
        );
    }

    #[test]
    fn test_object_and_array_literals() {
        let stmts = parse("return { a: [1, 2,], 'b c': null };");
        assert!(matches!(
            &stmts[0],
            Stmt::Return(Some(Expr::Object(entries))) if entries.len() == 2 && entries[1].0 == "b c"
        ));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_program("1 = 2;").unwrap_err();
        assert!(err.message.starts_with("invalid assignment target"));
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse_program("if (a) { return 1;").unwrap_err();
        assert!(err.message.contains("'}'"));
        assert_eq!(err.offset, "if (a) { return 1;".len());
    }

    #[test]
    fn test_unrecognized_character() {
        let err = parse_program("return a # b").unwrap_err();
        assert_eq!(err.offset, 9);
    }
}
