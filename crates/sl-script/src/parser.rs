use crate::ast::*;
use crate::lexer::Token;

/// Parse error with source span.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Byte range of the offending line.
    pub span: Span,
    /// Human-readable description.
    pub message: String,
}

impl ParseError {
    fn new(span: &Span, message: impl Into<String>) -> Self {
        Self {
            span: span.clone(),
            message: message.into(),
        }
    }
}

/// Parse a token stream into a [`ScriptFile`].
///
/// Every line is parsed independently, so one malformed line does not hide
/// errors further down; all errors are returned together with the items that
/// did parse.
pub fn parse(tokens: &[(Token, Span)]) -> (ScriptFile, Vec<ParseError>) {
    let mut file = ScriptFile::default();
    let mut errors = Vec::new();

    for (token, span) in tokens {
        match parse_line(token, span) {
            Ok(items) => file
                .items
                .extend(items.into_iter().map(|item| Spanned::new(item, span.clone()))),
            Err(e) => errors.push(e),
        }
    }

    (file, errors)
}

fn parse_line(token: &Token, span: &Span) -> Result<Vec<Item>, ParseError> {
    let item = match token {
        Token::Include(path) => {
            if path.is_empty() {
                return Err(ParseError::new(span, "INCLUDE needs a file path"));
            }
            Item::Include(path.clone())
        }
        Token::Var(body) => {
            let (name, value) = parse_binding(body, span, "VAR")?;
            Item::Var { name, value }
        }
        Token::Assign(body) => {
            let (name, value) = parse_binding(body, span, "~")?;
            Item::Assign { name, value }
        }
        Token::Knot(name) => Item::Knot(identifier(name, span, "knot name")?),
        Token::Divert(target) => Item::Divert(identifier(target, span, "divert target")?),
        Token::Choice { sticky, body } => Item::Choice(parse_choice(*sticky, body, span)?),
        Token::Todo(note) => Item::Todo(note.clone()),
        Token::Text(text) => {
            // `Some text -> target` is shorthand for a text line followed by a divert.
            if let Some((before, target)) = text.rsplit_once("->") {
                let target = identifier(target.trim(), span, "divert target")?;
                let before = before.trim();
                let mut items = Vec::with_capacity(2);
                if !before.is_empty() {
                    items.push(Item::Text(before.to_string()));
                }
                items.push(Item::Divert(target));
                return Ok(items);
            }
            Item::Text(text.clone())
        }
    };
    Ok(vec![item])
}

fn parse_choice(sticky: bool, body: &str, span: &Span) -> Result<ChoiceLine, ParseError> {
    let mut rest = body.trim();

    let condition = match rest.strip_prefix('{') {
        Some(after) => {
            let (cond, tail) = after
                .split_once('}')
                .ok_or_else(|| ParseError::new(span, "unclosed `{` in choice condition"))?;
            rest = tail.trim_start();
            Some(identifier(cond.trim(), span, "choice condition")?)
        }
        None => None,
    };

    let (text, target) = rest
        .rsplit_once("->")
        .ok_or_else(|| ParseError::new(span, "choice must end with `-> target`"))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::new(span, "choice has no text"));
    }

    Ok(ChoiceLine {
        sticky,
        condition,
        text: text.to_string(),
        target: identifier(target.trim(), span, "divert target")?,
    })
}

fn parse_binding(body: &str, span: &Span, keyword: &str) -> Result<(String, Literal), ParseError> {
    let (name, value) = body
        .split_once('=')
        .ok_or_else(|| ParseError::new(span, format!("expected `{keyword} name = value`")))?;
    let name = identifier(name.trim(), span, "variable name")?;
    let value = parse_literal(value.trim())
        .ok_or_else(|| ParseError::new(span, format!("invalid value: {}", value.trim())))?;
    Ok((name, value))
}

fn parse_literal(raw: &str) -> Option<Literal> {
    match raw {
        "true" => Some(Literal::Bool(true)),
        "false" => Some(Literal::Bool(false)),
        _ if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') => {
            Some(Literal::Str(raw[1..raw.len() - 1].to_string()))
        }
        _ => raw.replace('_', "").parse::<i64>().ok().map(Literal::Int),
    }
}

fn identifier(raw: &str, span: &Span, what: &str) -> Result<String, ParseError> {
    let mut chars = raw.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(raw.to_string())
    } else if raw.is_empty() {
        Err(ParseError::new(span, format!("missing {what}")))
    } else {
        Err(ParseError::new(span, format!("invalid {what}: {raw:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_ok(source: &str) -> Vec<Item> {
        let (tokens, lex_errors) = lex(source);
        assert!(lex_errors.is_empty());
        let (file, errors) = parse(&tokens);
        assert!(errors.is_empty(), "errors: {errors:?}");
        file.items.into_iter().map(|s| s.node).collect()
    }

    fn parse_errors(source: &str) -> Vec<String> {
        let (tokens, _) = lex(source);
        parse(&tokens).1.into_iter().map(|e| e.message).collect()
    }

    #[test]
    fn parse_full_script() {
        let items = parse_ok(
            "INCLUDE inn.tale\nVAR name = \"Ada\"\n== start ==\nHi {name}.\n* {met} Greet -> inn\n+ Wait -> start\n~ met = true\n-> END\n",
        );
        assert_eq!(
            items,
            vec![
                Item::Include("inn.tale".into()),
                Item::Var {
                    name: "name".into(),
                    value: Literal::Str("Ada".into()),
                },
                Item::Knot("start".into()),
                Item::Text("Hi {name}.".into()),
                Item::Choice(ChoiceLine {
                    sticky: false,
                    condition: Some("met".into()),
                    text: "Greet".into(),
                    target: "inn".into(),
                }),
                Item::Choice(ChoiceLine {
                    sticky: true,
                    condition: None,
                    text: "Wait".into(),
                    target: "start".into(),
                }),
                Item::Assign {
                    name: "met".into(),
                    value: Literal::Bool(true),
                },
                Item::Divert("END".into()),
            ]
        );
    }

    #[test]
    fn inline_divert_splits_text() {
        let items = parse_ok("You walk on. -> forest\n");
        assert_eq!(
            items,
            vec![Item::Text("You walk on.".into()), Item::Divert("forest".into())]
        );
    }

    #[test]
    fn integer_literals_allow_underscores() {
        let items = parse_ok("VAR gold = 1_000\n");
        assert_eq!(
            items,
            vec![Item::Var {
                name: "gold".into(),
                value: Literal::Int(1000),
            }]
        );
    }

    #[test]
    fn malformed_lines_are_reported_individually() {
        let errors = parse_errors("VAR gold\n* Leave\n== bad name ==\n* {open Leave -> END\nFine text.\n");
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors[0].contains("VAR name = value"));
        assert!(errors[1].contains("-> target"));
        assert!(errors[2].contains("invalid knot name"));
        assert!(errors[3].contains("unclosed"));
    }

    #[test]
    fn invalid_literal_is_rejected() {
        let errors = parse_errors("~ mood = grumpy\n");
        assert_eq!(errors, vec!["invalid value: grumpy"]);
    }
}
