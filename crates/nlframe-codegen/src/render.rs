//! Code generation.
//!
//! Turns the state of a refiner session into a single call expression:
//!
//! ```text
//! df["col"] = df["col"].str.strip(to_strip='(m)')
//! ^^^^^^^^^   ^^^^^^^^^ ^^^^^^^^^ ^^^^^^^^^^^^^^^
//! assignment  target    operation keyword text
//! ```

use nlframe_dsl::Literal;

use crate::catalog::TargetKind;
use crate::config::EngineConfig;
use crate::params::DType;
use crate::refiner::{RefinerSession, ReturnBinding};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeGenerator {
    module_alias: String,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl CodeGenerator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            module_alias: config.module_alias.clone(),
        }
    }

    /// Render the session's current call. A session without an operation
    /// renders as an empty string.
    pub fn render(&self, session: &RefinerSession) -> String {
        let Some(descriptor) = session.descriptor() else {
            return String::new();
        };

        let columns = session
            .scope()
            .map(|scope| column_subscript(&scope.value))
            .unwrap_or_default();
        let args = self.keyword_text(session);
        let dataset = &session.dataset().name;

        let assignment = if is_inplace(session) {
            String::new()
        } else {
            match session.return_binding() {
                ReturnBinding::ActiveDataset => format!("{dataset}{columns} = "),
                ReturnBinding::Named(name) if name.is_empty() => String::new(),
                ReturnBinding::Named(name) => format!("{name} = "),
                ReturnBinding::Discard => String::new(),
            }
        };

        let target = match descriptor.target {
            TargetKind::Module => self.module_alias.clone(),
            TargetKind::Table | TargetKind::Series => format!("{dataset}{columns}"),
        };

        format!("{assignment}{target}.{}({args})", descriptor.operation)
    }

    /// `name=value` pairs for every non-default parameter, in signature order.
    pub fn keyword_text(&self, session: &RefinerSession) -> String {
        session
            .minimal_kwargs()
            .iter()
            .map(|(name, value)| {
                let dtype = session
                    .parameter(name)
                    .map(|p| p.dtype)
                    .unwrap_or(DType::Plain);
                match dtype {
                    DType::Heterogeneous => format!("{name}={}", value.to_raw()),
                    DType::Variadic => value.to_raw(),
                    _ => format!("{name}={}", value.to_python()),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn is_inplace(session: &RefinerSession) -> bool {
    session
        .parameter("inplace")
        .is_some_and(|p| p.value == Literal::Bool(true))
}

/// `["col"]` for one column, `[[...]]` around the list repr for several,
/// nothing when unscoped.
fn column_subscript(value: &Literal) -> String {
    match value {
        Literal::None => String::new(),
        Literal::Str(s) => format!("[\"{}\"]", escape_double_quoted(s)),
        Literal::List(_) => format!("[{}]", value.to_python()),
        other => format!("[{}]", other.to_python()),
    }
}

/// Escape text for a double-quoted Python string literal.
fn escape_double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscripts() {
        assert_eq!(column_subscript(&Literal::None), "");
        assert_eq!(column_subscript(&Literal::str("B")), "[\"B\"]");
        assert_eq!(column_subscript(&Literal::strs(["a", "b"])), "[['a', 'b']]");
        assert_eq!(column_subscript(&Literal::Int(3)), "[3]");
    }

    #[test]
    fn subscripts_escape_quotes_and_backslashes() {
        assert_eq!(
            column_subscript(&Literal::str(r#"size "cm""#)),
            r#"["size \"cm\""]"#
        );
        assert_eq!(column_subscript(&Literal::str(r"C:\x")), r#"["C:\\x"]"#);
        assert_eq!(column_subscript(&Literal::str("a\nb")), r#"["a\nb"]"#);
    }

    #[test]
    fn empty_session_renders_nothing() {
        let session = RefinerSession::default();
        assert_eq!(CodeGenerator::default().render(&session), "");
    }
}
