use logos::Logos;
use std::fmt;

use crate::ast::Span;

/// Token type for `.tale` scripts.
///
/// The language is line oriented, so each token covers the rest of its line
/// after the leading marker. The parser splits the payload further.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `INCLUDE <path>`
    Include(String),
    /// `VAR <name> = <literal>`
    Var(String),
    /// `== <name> ==`
    Knot(String),
    /// `-> <target>`
    Divert(String),
    /// `~ <name> = <literal>`
    Assign(String),
    /// `* ...` (once-only) or `+ ...` (sticky) choice.
    Choice {
        /// `true` for `+` choices.
        sticky: bool,
        /// Text after the marker.
        body: String,
    },
    /// `// TODO: <note>`
    Todo(String),
    /// Any other non-empty line.
    Text(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Include(p) => write!(f, "INCLUDE {p}"),
            Token::Var(v) => write!(f, "VAR {v}"),
            Token::Knot(k) => write!(f, "== {k} =="),
            Token::Divert(t) => write!(f, "-> {t}"),
            Token::Assign(a) => write!(f, "~ {a}"),
            Token::Choice { sticky, body } => {
                write!(f, "{} {body}", if *sticky { '+' } else { '*' })
            }
            Token::Todo(t) => write!(f, "TODO: {t}"),
            Token::Text(t) => write!(f, "{t}"),
        }
    }
}

/// Internal logos token. Every variant except `Text` starts with a marker and
/// wins over `Text` through its higher priority when both cover the whole line.
#[derive(Logos, Debug)]
#[logos(skip r"[ \t\r]+")]
enum RawToken {
    #[token("\n")]
    Newline,

    #[regex(r"//[^\n]*", priority = 20)]
    Comment,

    #[regex(r"INCLUDE[ \t][^\n]*", priority = 20)]
    Include,

    #[regex(r"VAR[ \t][^\n]*", priority = 20)]
    Var,

    #[regex(r"==[^\n]*", priority = 20)]
    Knot,

    #[regex(r"->[^\n]*", priority = 20)]
    Divert,

    #[regex(r"~[^\n]*", priority = 20)]
    Assign,

    #[regex(r"\*[^\n]*", priority = 20)]
    OnceChoice,

    #[regex(r"\+[^\n]*", priority = 20)]
    StickyChoice,

    #[regex(r"[^ \t\r\n][^\n]*", priority = 1)]
    Text,
}

/// A lexer error with source location.
#[derive(Debug, Clone)]
pub struct LexError {
    /// Byte range of the erroneous input in the source.
    pub span: Span,
    /// Human-readable description of the lexer error.
    pub message: String,
}

/// Lex source code into a sequence of `(Token, Span)` pairs, one per non-blank line.
///
/// Plain comments are dropped; `// TODO:` comments are kept so the compiler
/// can report them.
pub fn lex(source: &str) -> (Vec<(Token, Span)>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let slice = lexer.slice().trim_end();
        let token = match result {
            Ok(RawToken::Newline) => continue,
            Ok(RawToken::Comment) => {
                let comment = slice[2..].trim();
                match comment.strip_prefix("TODO:") {
                    Some(note) => Token::Todo(note.trim().to_string()),
                    None => continue,
                }
            }
            Ok(RawToken::Include) => Token::Include(payload(slice, "INCLUDE")),
            Ok(RawToken::Var) => Token::Var(payload(slice, "VAR")),
            Ok(RawToken::Knot) => Token::Knot(slice.trim_matches('=').trim().to_string()),
            Ok(RawToken::Divert) => Token::Divert(payload(slice, "->")),
            Ok(RawToken::Assign) => Token::Assign(payload(slice, "~")),
            Ok(RawToken::OnceChoice) => Token::Choice {
                sticky: false,
                body: payload(slice, "*"),
            },
            Ok(RawToken::StickyChoice) => Token::Choice {
                sticky: true,
                body: payload(slice, "+"),
            },
            Ok(RawToken::Text) => Token::Text(slice.to_string()),
            Err(()) => {
                errors.push(LexError {
                    span: span.clone(),
                    message: format!("unexpected input: {:?}", &source[span]),
                });
                continue;
            }
        };
        tokens.push((token, span));
    }

    (tokens, errors)
}

fn payload(slice: &str, marker: &str) -> String {
    slice
        .strip_prefix(marker)
        .unwrap_or(slice)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<String> {
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty(), "errors: {errors:?}");
        tokens.iter().map(|(t, _)| t.to_string()).collect()
    }

    #[test]
    fn lex_markers() {
        let source = "INCLUDE common.tale\nVAR gold = 3\n== start ==\nHello there.\n* Leave -> END\n+ Wait -> start\n~ gold = 4\n-> start\n";
        assert_eq!(
            kinds(source),
            vec![
                "INCLUDE common.tale",
                "VAR gold = 3",
                "== start ==",
                "Hello there.",
                "* Leave -> END",
                "+ Wait -> start",
                "~ gold = 4",
                "-> start",
            ]
        );
    }

    #[test]
    fn comments_are_dropped_except_todo() {
        let source = "// just a note\n  // TODO: write the ending\nText\n";
        assert_eq!(kinds(source), vec!["TODO: write the ending", "Text"]);
    }

    #[test]
    fn keywords_need_separator() {
        let (tokens, _) = lex("INCLUDED in the price\nVARIOUS things\n");
        assert!(matches!(&tokens[0].0, Token::Text(t) if t == "INCLUDED in the price"));
        assert!(matches!(&tokens[1].0, Token::Text(t) if t == "VARIOUS things"));
    }

    #[test]
    fn spans_cover_line_content() {
        let source = "  Indented text\r\n== cellar\n";
        let (tokens, _) = lex(source);
        assert_eq!(tokens[0].0, Token::Text("Indented text".into()));
        assert_eq!(&source[tokens[0].1.clone()].trim_end(), &"Indented text");
        assert_eq!(tokens[1].0, Token::Knot("cellar".into()));
    }

    #[test]
    fn blank_lines_produce_nothing() {
        let (tokens, errors) = lex("\n\n   \n\t\n");
        assert!(tokens.is_empty());
        assert!(errors.is_empty());
    }
}
