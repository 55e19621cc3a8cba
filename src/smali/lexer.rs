//! Tokens of the assembly text.
//!
//! The reader is line oriented, so [`tokenize`] lexes one line at a time and reports 1-based
//! columns alongside every token.

use logos::Logos;

use crate::{Error, Result};

/// One token of an assembly line.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    /// Spaces and tabs (skipped)
    #[regex(r"[ \t\r]+", logos::skip)]
    Whitespace,

    /// `#` to the end of the line (skipped)
    #[regex(r"#[^\n]*", logos::skip)]
    Comment,

    /// `.name`, without the dot
    #[regex(r"\.[a-z][a-z0-9\-]*", |lex| lex.slice()[1..].to_string())]
    Directive(String),

    /// `:name`, without the colon
    #[regex(r":[A-Za-z0-9_$]+", |lex| lex.slice()[1..].to_string())]
    Label(String),

    /// `:Type` suffix of a local declaration, without the colon
    #[regex(
        r":(L[^;\s]*;|\[+(L[^;\s]*;|[VZBSCIJFD])|[VZBSCIJFD]|type@[0-9]+)",
        |lex| lex.slice()[1..].to_string(),
        priority = 5
    )]
    TypeAnnotation(String),

    /// Mnemonics, registers and keywords
    #[regex(r"[a-z][a-z0-9\-/]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// Hex literal, optionally negative
    #[regex(r"-?0x[0-9a-fA-F]+", parse_hex)]
    Hex(i128),

    /// Decimal literal
    #[regex(r"-?[0-9]+", parse_int)]
    Int(i64),

    /// Quoted string with escapes resolved
    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    Str(String),

    /// Type descriptor
    #[regex(r"L[^;\s]*;|\[+(L[^;\s]*;|[VZBSCIJFD])|[VZBSCIJFD]", |lex| lex.slice().to_string())]
    Type(String),

    /// Unresolved type key
    #[regex(r"type@[0-9]+", parse_index)]
    TypeId(u32),

    /// Unresolved string key
    #[regex(r"string@[0-9]+", parse_index)]
    StringId(u32),

    /// `,`
    #[token(",")]
    Comma,

    /// `{`
    #[token("{")]
    LBrace,

    /// `}`
    #[token("}")]
    RBrace,

    /// `..` inside a try range
    #[token("..")]
    Range,

    /// `->` between a sparse-switch key and its label
    #[token("->")]
    Arrow,
}

fn parse_hex(lex: &mut logos::Lexer<Token>) -> Option<i128> {
    let slice = lex.slice();
    let (negative, digits) = match slice.strip_prefix('-') {
        Some(rest) => (true, &rest[2..]),
        None => (false, &slice[2..]),
    };
    let value = i128::from_str_radix(digits, 16).ok()?;
    Some(if negative { -value } else { value })
}

fn parse_int(lex: &mut logos::Lexer<Token>) -> Option<i64> {
    lex.slice().parse().ok()
}

fn parse_index(lex: &mut logos::Lexer<Token>) -> Option<u32> {
    let slice = lex.slice();
    slice[slice.find('@')? + 1..].parse().ok()
}

fn parse_string(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let slice = lex.slice();
    unescape(&slice[1..slice.len() - 1])
}

fn unescape(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next()? {
            'n' => result.push('\n'),
            'r' => result.push('\r'),
            't' => result.push('\t'),
            '\\' => result.push('\\'),
            '"' => result.push('"'),
            '\'' => result.push('\''),
            'u' => {
                let digits: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&digits, 16).ok()?;
                result.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }

    Some(result)
}

/// Lexes `text`, one line of input, into tokens paired with their 1-based column.
///
/// # Errors
/// Returns [`Error::Parse`] at the first character that starts no token.
pub fn tokenize(text: &str, line: usize) -> Result<Vec<(Token, usize)>> {
    let mut lexer = Token::lexer(text);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next() {
        let column = lexer.span().start + 1;
        match token {
            Ok(token) => tokens.push((token, column)),
            Err(()) => {
                return Err(Error::Parse {
                    line,
                    column,
                    message: format!("Unexpected input '{}'", lexer.slice()),
                })
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<Token> {
        tokenize(text, 1)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn instruction_line() {
        assert_eq!(
            kinds("    if-eqz 0x01, :cond_1c # comment"),
            vec![
                Token::Ident("if-eqz".into()),
                Token::Hex(1),
                Token::Comma,
                Token::Label("cond_1c".into()),
            ]
        );
        assert_eq!(kinds("const/16 -0x10")[1], Token::Hex(-16));
    }

    #[test]
    fn catch_line() {
        assert_eq!(
            kinds(".catch Ljava/io/IOException; {:try_start_0 .. :try_end_1a} :catch_1a"),
            vec![
                Token::Directive("catch".into()),
                Token::Type("Ljava/io/IOException;".into()),
                Token::LBrace,
                Token::Label("try_start_0".into()),
                Token::Range,
                Token::Label("try_end_1a".into()),
                Token::RBrace,
                Token::Label("catch_1a".into()),
            ]
        );
    }

    #[test]
    fn local_line() {
        assert_eq!(
            kinds(r#".local v3, "it\"s":I, string@4"#),
            vec![
                Token::Directive("local".into()),
                Token::Ident("v3".into()),
                Token::Comma,
                Token::Str("it\"s".into()),
                Token::TypeAnnotation("I".into()),
                Token::Comma,
                Token::StringId(4),
            ]
        );
        assert_eq!(
            kinds(".local v0, null:[Ljava/lang/String;")[3],
            Token::Ident("null".into())
        );
        assert_eq!(
            kinds(".local v0, null:type@7")[4],
            Token::TypeAnnotation("type@7".into())
        );
    }

    #[test]
    fn sparse_case_line() {
        assert_eq!(
            kinds("-0x5 -> :sswitch_a"),
            vec![Token::Hex(-5), Token::Arrow, Token::Label("sswitch_a".into())]
        );
    }

    #[test]
    fn error_has_column() {
        match tokenize("nop %", 7) {
            Err(Error::Parse { line, column, .. }) => assert_eq!((line, column), (7, 5)),
            other => panic!("unexpected {other:?}"),
        }
    }
}
