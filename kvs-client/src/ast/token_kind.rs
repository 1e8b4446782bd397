use logos::Logos;
use strum_macros::EnumIter;
pub use self::TokenKind::*;

#[allow(non_camel_case_types)]
#[derive(Logos, EnumIter, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Error,

    EOI,

    #[regex(r"[ \t\r\f]+", logos::skip)]
    Whitespace,

    #[regex(r"--[^\n]*", logos::skip)]
    Comment,

    #[regex(r"[\n]+")]
    Newline,

    #[token(";")]
    SemiColon,

    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r#"'([^'\\]|\\.)*'"#)]
    QuotedString,

    #[regex(r#"[_a-zA-Z][_a-zA-Z0-9]*"#)]
    Ident,

    #[token("BEGIN", ignore(ascii_case))]
    BEGIN,
    #[token("WRITE", ignore(ascii_case))]
    WRITE,
    #[token("READ", ignore(ascii_case))]
    READ,
    #[token("COMMIT", ignore(ascii_case))]
    COMMIT,
    #[token("ABORT", ignore(ascii_case))]
    ABORT,
    #[token("SHOW", ignore(ascii_case))]
    SHOW,
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(self, TokenKind::QuotedString | TokenKind::Ident)
    }
}
