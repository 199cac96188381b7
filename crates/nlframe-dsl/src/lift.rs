//! Entity lifting.
//!
//! Lifting replaces literal spans of an utterance with unindexed placeholders and
//! records the literals per type. Five passes run in `EntityType::LIFT_ORDER`;
//! each pass scans the partially lifted text left to right.
//!
//! The lexical rules need lookaround ("a quote not followed by `,`", "an
//! operator run not ending in a placeholder token"), which the `regex` crate does
//! not offer. The matchers below use plain regexes for the shape of a match and
//! check the surrounding context by hand, retrying from the next start position
//! when the context rejects a candidate.

use regex::Regex;
use std::ops::Range;

use crate::entity::{strip_quotes, EntitySet, EntityType};

/// A quoted value: content excludes `;`, vertical tab and the quote char.
const QUOTE: &str = r#"(?:"[^\v;"]+?"|'[^\v;']+?')"#;

/// A number: optional sign, optional leading `.`, digits, optional `.` or `/`
/// and digits, word-bounded.
const DIGIT: &str = r"[-+]?\.?\b\d+[/.]?\d*\b";

/// Operator run followed by one or more quoted operands (no commas inside).
const QUOTED_CONDITION: &str = r#"^[<>=!]+ ?(?:"[^\v,;'"]+?"|'[^\v,;'"]+?')+"#;

/// Whole-text numeric shape, used when shortening a number candidate.
const NUMBER_SHAPE: &str = r"^[-+]?\.?\d+[/.]?\d*$";

/// Placeholder tokens an operator run must never end inside.
const PLACEHOLDER_TOKENS: [&str; 5] = [
    "<number>",
    "<value>",
    "<string_list>",
    "<number_list>",
    "<condition>",
];

/// Text a bare condition must not start with.
const GUARDED_PREFIXES: [&str; 6] = [
    "<number>",
    "<value>",
    "<string_list>",
    "<number_list>",
    "<condition>",
    "><condition>",
];

/// Regex-driven entity lifter.
#[derive(Debug, Clone)]
pub struct EntityLifter {
    quote: Regex,
    string_list: Regex,
    number: Regex,
    number_list: Regex,
    quoted_condition: Regex,
    number_shape: Regex,
}

impl Default for EntityLifter {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityLifter {
    pub fn new() -> Self {
        Self {
            quote: Regex::new(QUOTE).unwrap(),
            string_list: Regex::new(&format!("{QUOTE}(?:, {QUOTE})+")).unwrap(),
            number: Regex::new(DIGIT).unwrap(),
            number_list: Regex::new(&format!("{DIGIT}(?:, {DIGIT})+")).unwrap(),
            quoted_condition: Regex::new(QUOTED_CONDITION).unwrap(),
            number_shape: Regex::new(NUMBER_SHAPE).unwrap(),
        }
    }

    /// Lift every entity out of `text`.
    ///
    /// Returns the lifted text (unindexed placeholders) and the literals found,
    /// per type, in left-to-right order. Value literals lose their wrapping quotes;
    /// every other type keeps its literal text.
    pub fn lift(&self, text: &str) -> (String, EntitySet) {
        let mut lifted = text.to_string();
        let mut entities = EntitySet::new();

        for ty in EntityType::LIFT_ORDER {
            let (next, found) = self.lift_pass(&lifted, ty);
            lifted = next;
            entities.get_mut(ty).extend(found);
        }

        (lifted, entities)
    }

    /// Run a single lifting pass for one entity type.
    pub fn lift_pass(&self, text: &str, ty: EntityType) -> (String, Vec<String>) {
        let spans = self.spans(text, ty);

        let mut lifted = String::with_capacity(text.len());
        let mut found = Vec::with_capacity(spans.len());
        let mut cursor = 0;
        for span in spans {
            lifted.push_str(&text[cursor..span.start]);
            lifted.push_str(ty.placeholder());

            let literal = &text[span.clone()];
            found.push(match ty {
                EntityType::Value => strip_quotes(literal).to_string(),
                _ => literal.to_string(),
            });
            cursor = span.end;
        }
        lifted.push_str(&text[cursor..]);

        (lifted, found)
    }

    /// Replace known entity literals in `action` with their placeholders.
    ///
    /// Values are matched in their double-quoted form. Literals that do not occur
    /// in the action are ignored.
    pub fn replace_entities(&self, action: &str, entities: &EntitySet) -> String {
        let mut out = action.to_string();
        for ty in EntityType::LIFT_ORDER {
            for literal in entities.get(ty) {
                let needle = match ty {
                    EntityType::Value => ty.grounded_text(literal),
                    _ => literal.clone(),
                };
                if !needle.is_empty() {
                    out = out.replace(&needle, ty.placeholder());
                }
            }
        }
        out
    }

    // ========================================================================
    // Matchers
    // ========================================================================

    /// Non-overlapping match spans of `ty` in `text`, left to right.
    fn spans(&self, text: &str, ty: EntityType) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut at = 0;
        while at <= text.len() {
            let next = match ty {
                EntityType::Condition => self.find_condition(text, at),
                EntityType::StringList => self.string_list.find_at(text, at).map(|m| m.range()),
                EntityType::NumberList => self.number_list.find_at(text, at).map(|m| m.range()),
                EntityType::Value => self.find_value(text, at),
                EntityType::Number => self.find_number(text, at),
            };
            let Some(span) = next else { break };
            at = if span.is_empty() {
                next_boundary(text, span.end)
            } else {
                span.end
            };
            spans.push(span);
        }
        spans
    }

    /// A quoted value not followed by `,`.
    fn find_value(&self, text: &str, mut at: usize) -> Option<Range<usize>> {
        while let Some(m) = self.quote.find_at(text, at) {
            if !followed_by_comma(text, m.end()) {
                return Some(m.range());
            }
            at = next_boundary(text, m.start());
        }
        None
    }

    /// A number not followed by `,`.
    ///
    /// When the longest candidate is followed by a comma, shorter numeric
    /// prefixes that still end on a word boundary are tried before moving on.
    fn find_number(&self, text: &str, mut at: usize) -> Option<Range<usize>> {
        while let Some(m) = self.number.find_at(text, at) {
            if !followed_by_comma(text, m.end()) {
                return Some(m.range());
            }
            let shorter = (m.start() + 1..m.end()).rev().find(|&end| {
                text.is_char_boundary(end)
                    && self.number_shape.is_match(&text[m.start()..end])
                    && is_word_boundary(text, end)
                    && !followed_by_comma(text, end)
            });
            if let Some(end) = shorter {
                return Some(m.start()..end);
            }
            at = next_boundary(text, m.start());
        }
        None
    }

    /// An operator run followed by quoted operands or by a non-space run.
    fn find_condition(&self, text: &str, at: usize) -> Option<Range<usize>> {
        for (offset, c) in text[at..].char_indices() {
            if !is_operator(c) {
                continue;
            }
            let start = at + offset;
            if let Some(m) = self.quoted_condition.find(&text[start..]) {
                return Some(start..start + m.end());
            }
            if let Some(end) = bare_condition_end(text, start) {
                return Some(start..end);
            }
        }
        None
    }
}

fn bare_condition_end(text: &str, start: usize) -> Option<usize> {
    let rest = &text[start..];
    if GUARDED_PREFIXES.iter().any(|p| rest.starts_with(p)) {
        return None;
    }

    // Operators are ASCII, so the run length in chars is its length in bytes.
    let run = rest.chars().take_while(|c| is_operator(*c)).count();
    for len in (1..=run).rev() {
        let op_end = start + len;
        if PLACEHOLDER_TOKENS
            .iter()
            .any(|token| text[..op_end].ends_with(token))
        {
            continue;
        }

        let mut operand = op_end;
        if text[operand..].starts_with(' ') {
            operand += 1;
        }
        let end = text[operand..]
            .find(char::is_whitespace)
            .map_or(text.len(), |i| operand + i);
        if end > operand {
            return Some(end);
        }
    }
    None
}

fn is_operator(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '!')
}

fn followed_by_comma(text: &str, pos: usize) -> bool {
    text[pos..].starts_with(',')
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_word_boundary(text: &str, pos: usize) -> bool {
    let before = text[..pos].chars().next_back().is_some_and(is_word_char);
    let after = text[pos..].chars().next().is_some_and(is_word_char);
    before != after
}

fn next_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map_or(text.len() + 1, |c| pos + c.len_utf8())
}
