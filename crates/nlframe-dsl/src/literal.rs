//! Literal values.
//!
//! `Literal` is the one value model used for decoded entities, parameter values
//! and option lists. It renders as Python source (the generated code targets a
//! Python dataframe API), and it can be parsed back from the literal text a user
//! types into a parameter field.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag},
    character::complete::{char as pchar, digit0, digit1, multispace0},
    combinator::{all_consuming, map, opt, recognize, value},
    multi::separated_list0,
    sequence::{delimited, pair, separated_pair, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Value model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Literal {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Map(BTreeMap<String, Literal>),
}

impl Literal {
    pub fn str(s: impl Into<String>) -> Self {
        Literal::Str(s.into())
    }

    pub fn strs<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Literal::List(items.into_iter().map(|s| Literal::Str(s.into())).collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Literal::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) => Some(items),
            _ => None,
        }
    }

    /// Value equality with Python's numeric semantics (`1 == 1.0`).
    pub fn matches(&self, other: &Literal) -> bool {
        match (self, other) {
            (Literal::Int(a), Literal::Float(b)) | (Literal::Float(b), Literal::Int(a)) => {
                (*a as f64) == *b
            }
            (Literal::List(a), Literal::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
            }
            (Literal::Map(a), Literal::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.matches(vb))
            }
            _ => self == other,
        }
    }

    /// Python `repr` of the value.
    pub fn to_python(&self) -> String {
        match self {
            Literal::None => "None".to_string(),
            Literal::Bool(true) => "True".to_string(),
            Literal::Bool(false) => "False".to_string(),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => python_float(*f),
            Literal::Str(s) => python_str(s),
            Literal::List(items) => {
                let inner: Vec<String> = items.iter().map(Literal::to_python).collect();
                format!("[{}]", inner.join(", "))
            }
            Literal::Map(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", python_str(k), v.to_python()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
        }
    }

    /// Python `str` of the value: strings verbatim, everything else as `repr`.
    ///
    /// Used for parameters whose text is an expression rather than a string.
    pub fn to_raw(&self) -> String {
        match self {
            Literal::Str(s) => s.clone(),
            other => other.to_python(),
        }
    }

    /// Interpret user-typed text: a literal if it parses, a string otherwise.
    pub fn from_user_text(text: &str) -> Literal {
        parse_literal(text).unwrap_or_else(|_| Literal::Str(text.to_string()))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Str(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Str(s)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Int(i)
    }
}

impl From<f64> for Literal {
    fn from(f: f64) -> Self {
        Literal::Float(f)
    }
}

fn python_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

fn python_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Decode a numeric literal: an integer when the text is integral, a float
/// otherwise, `None` when it is neither (e.g. `1/2`).
pub fn decode_number(text: &str) -> Option<Literal> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(Literal::Int(i));
    }
    text.parse::<f64>().ok().map(Literal::Float)
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse literal `{text}`: {message}")]
pub struct LiteralParseError {
    pub text: String,
    pub message: String,
}

/// Parse Python-style literal text (`None`, `True`, `3`, `-0.5`, `'a'`,
/// `["a", 1]`, `{'k': 'v'}`).
pub fn parse_literal(text: &str) -> Result<Literal, LiteralParseError> {
    all_consuming(literal)(text)
        .map(|(_, v)| v)
        .map_err(|e| LiteralParseError {
            text: text.to_string(),
            message: e.to_string(),
        })
}

fn literal(input: &str) -> IResult<&str, Literal> {
    delimited(
        multispace0,
        alt((none_lit, bool_lit, number_lit, string_lit, list_lit, map_lit)),
        multispace0,
    )(input)
}

fn none_lit(input: &str) -> IResult<&str, Literal> {
    value(Literal::None, tag("None"))(input)
}

fn bool_lit(input: &str) -> IResult<&str, Literal> {
    alt((
        value(Literal::Bool(true), tag("True")),
        value(Literal::Bool(false), tag("False")),
    ))(input)
}

fn number_lit(input: &str) -> IResult<&str, Literal> {
    let (rest, text) = recognize(tuple((
        opt(alt((pchar('-'), pchar('+')))),
        alt((
            recognize(pair(digit1, opt(pair(pchar('.'), digit0)))),
            recognize(pair(pchar('.'), digit1)),
        )),
    )))(input)?;
    match decode_number(text) {
        Some(lit) => Ok((rest, lit)),
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

fn quoted(quote: char) -> impl FnMut(&str) -> IResult<&str, String> {
    let normal: &'static str = if quote == '\'' { "\\'" } else { "\\\"" };
    move |input: &str| {
        map(
            delimited(
                pchar(quote),
                opt(escaped_transform(
                    is_not(normal),
                    '\\',
                    alt((
                        value("\\", tag("\\")),
                        value("'", tag("'")),
                        value("\"", tag("\"")),
                        value("\n", tag("n")),
                        value("\t", tag("t")),
                    )),
                )),
                pchar(quote),
            ),
            Option::unwrap_or_default,
        )(input)
    }
}

fn string_lit(input: &str) -> IResult<&str, Literal> {
    map(alt((quoted('\''), quoted('"'))), Literal::Str)(input)
}

fn list_lit(input: &str) -> IResult<&str, Literal> {
    map(
        delimited(
            pchar('['),
            separated_list0(pchar(','), literal),
            pair(multispace0, pchar(']')),
        ),
        Literal::List,
    )(input)
}

fn map_lit(input: &str) -> IResult<&str, Literal> {
    map(
        delimited(
            pchar('{'),
            separated_list0(pchar(','), separated_pair(literal, pchar(':'), literal)),
            pair(multispace0, pchar('}')),
        ),
        |entries| Literal::Map(entries.into_iter().map(|(k, v)| (k.to_raw(), v)).collect()),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_python_repr() {
        assert_eq!(Literal::str("id").to_python(), "'id'");
        assert_eq!(Literal::str("it's").to_python(), "\"it's\"");
        assert_eq!(Literal::Bool(true).to_python(), "True");
        assert_eq!(Literal::None.to_python(), "None");
        assert_eq!(Literal::Float(5.0).to_python(), "5.0");
        assert_eq!(Literal::Float(-0.25).to_python(), "-0.25");
        assert_eq!(Literal::strs(["a", "b"]).to_python(), "['a', 'b']");
        let mut m = BTreeMap::new();
        m.insert("name".to_string(), Literal::str("state"));
        assert_eq!(Literal::Map(m).to_python(), "{'name': 'state'}");
    }

    #[test]
    fn raw_keeps_expressions_unquoted() {
        assert_eq!(Literal::str("df[\"date\"]").to_raw(), "df[\"date\"]");
        assert_eq!(Literal::Int(3).to_raw(), "3");
    }

    #[test]
    fn parses_scalars() {
        assert_eq!(parse_literal("None").unwrap(), Literal::None);
        assert_eq!(parse_literal(" True ").unwrap(), Literal::Bool(true));
        assert_eq!(parse_literal("42").unwrap(), Literal::Int(42));
        assert_eq!(parse_literal("-0.5").unwrap(), Literal::Float(-0.5));
        assert_eq!(parse_literal("'abc'").unwrap(), Literal::str("abc"));
        assert_eq!(parse_literal("\"a'b\"").unwrap(), Literal::str("a'b"));
        assert_eq!(parse_literal("''").unwrap(), Literal::str(""));
    }

    #[test]
    fn parses_collections() {
        assert_eq!(
            parse_literal("['a', 1, None]").unwrap(),
            Literal::List(vec![Literal::str("a"), Literal::Int(1), Literal::None])
        );
        assert_eq!(parse_literal("[]").unwrap(), Literal::List(vec![]));
        let parsed = parse_literal("{'old': 'new'}").unwrap();
        let mut expected = BTreeMap::new();
        expected.insert("old".to_string(), Literal::str("new"));
        assert_eq!(parsed, Literal::Map(expected));
    }

    #[test]
    fn unparseable_text_stays_a_string() {
        assert!(parse_literal("df.a * 2").is_err());
        assert_eq!(Literal::from_user_text("df.a * 2"), Literal::str("df.a * 2"));
        assert_eq!(Literal::from_user_text("Nonesuch"), Literal::str("Nonesuch"));
    }

    #[test]
    fn numeric_matching_crosses_int_and_float() {
        assert!(Literal::Int(1).matches(&Literal::Float(1.0)));
        assert!(!Literal::Int(1).matches(&Literal::str("1")));
    }

    #[test]
    fn serde_is_untagged() {
        let v: Literal = serde_json::from_str(r#"["a", 1, 2.5, null, true]"#).unwrap();
        assert_eq!(
            v,
            Literal::List(vec![
                Literal::str("a"),
                Literal::Int(1),
                Literal::Float(2.5),
                Literal::None,
                Literal::Bool(true),
            ])
        );
    }
}
