//! Token definitions for function bodies
//!
//! Bodies are tokenized with the logos derive macro. Whitespace, including the
//! newlines left over from folded block scalars, is insignificant, and so are
//! `/* ... */` comments.

use logos::{FilterResult, Logos};

use crate::value::Number;

/// All tokens of the body language
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Keywords
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("var")]
    Var,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("throw")]
    Throw,
    #[token("typeof")]
    Typeof,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("undefined")]
    Undefined,
    #[token("this")]
    This,

    // Literals
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", parse_number)]
    Number(Number),
    #[regex(r#""([^"\\]|\\.)*""#, unquote)]
    #[regex(r"'([^'\\]|\\.)*'", unquote)]
    Str(String),
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Punctuation
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    // Operators
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("==")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("!")]
    Not,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    // Comments are matched here and skipped by the callback, never emitted
    #[token("/*", skip_block_comment)]
    Slash,
    #[token("%")]
    Percent,
}

fn parse_number(lex: &mut logos::Lexer<Token>) -> Option<Number> {
    let text = lex.slice();
    if !text.contains(['.', 'e', 'E']) {
        if let Ok(int) = text.parse::<i64>() {
            return Some(Number::Int(int));
        }
    }
    text.parse::<f64>().ok().map(Number::Float)
}

/// Skip past the closing `*/`; an unterminated comment is a lexing error
fn skip_block_comment(lex: &mut logos::Lexer<Token>) -> FilterResult<(), ()> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => FilterResult::Error(()),
    }
}

fn unquote(lex: &mut logos::Lexer<Token>) -> String {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// A token with its byte range in the body text
pub type Spanned = (Token, std::ops::Range<usize>);

/// Tokenize a function body.
///
/// On failure, returns the byte offset of the first unrecognized input.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, usize> {
    Token::lexer(source)
        .spanned()
        .map(|(token, span)| match token {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(span.start),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_return_string() {
        assert_eq!(
            kinds("return 'it works';"),
            vec![
                Token::Return,
                Token::Str("it works".to_string()),
                Token::Semicolon
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 2.5 1e3"),
            vec![
                Token::Number(Number::Int(42)),
                Token::Number(Number::Float(2.5)),
                Token::Number(Number::Float(1000.0)),
            ]
        );
    }

    #[test]
    fn test_keywords_vs_identifiers() {
        assert_eq!(
            kinds("let letter this thisOne"),
            vec![
                Token::Let,
                Token::Ident("letter".to_string()),
                Token::This,
                Token::Ident("thisOne".to_string()),
            ]
        );
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            kinds("a === b !== c <= d += 1"),
            vec![
                Token::Ident("a".to_string()),
                Token::StrictEq,
                Token::Ident("b".to_string()),
                Token::StrictNotEq,
                Token::Ident("c".to_string()),
                Token::LtEq,
                Token::Ident("d".to_string()),
                Token::PlusAssign,
                Token::Number(Number::Int(1)),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\"\n" 'it\'s'"#),
            vec![
                Token::Str("say \"hi\"\n".to_string()),
                Token::Str("it's".to_string()),
            ]
        );
    }

    #[test]
    fn test_newlines_and_comments_skipped() {
        assert_eq!(
            kinds("let val = 42;\n/* answer */\nreturn val;"),
            vec![
                Token::Let,
                Token::Ident("val".to_string()),
                Token::Assign,
                Token::Number(Number::Int(42)),
                Token::Semicolon,
                Token::Return,
                Token::Ident("val".to_string()),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_block_comment_forms() {
        assert_eq!(
            kinds("/** doc **/ a /**/ / b /* x * y / z */"),
            vec![
                Token::Ident("a".to_string()),
                Token::Slash,
                Token::Ident("b".to_string()),
            ]
        );
        assert_eq!(
            kinds("a /= 2"),
            vec![
                Token::Ident("a".to_string()),
                Token::SlashAssign,
                Token::Number(Number::Int(2)),
            ]
        );
    }

    #[test]
    fn test_unterminated_comment_is_an_error() {
        assert_eq!(tokenize("return 1; /* open"), Err(10));
    }

    #[test]
    fn test_unknown_character_reports_offset() {
        assert_eq!(tokenize("a # b"), Err(2));
    }
}
