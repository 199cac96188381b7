//! Past-action suggestions.
//!
//! The host remembers the values a user chose for parameters in earlier
//! sessions. The engine only reads that memory through `PastActions` and
//! proposes values that differ from what a session currently has.

use nlframe_dsl::Literal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::refiner::RefinerSession;
use crate::schema::Workspace;

/// Read-only view of a key → value memory.
pub trait PastActions {
    fn recall(&self, key: &str) -> Option<Literal>;
}

impl PastActions for BTreeMap<String, Literal> {
    fn recall(&self, key: &str) -> Option<Literal> {
        self.get(key).cloned()
    }
}

impl PastActions for HashMap<String, Literal> {
    fn recall(&self, key: &str) -> Option<Literal> {
        self.get(key).cloned()
    }
}

impl<T: PastActions + ?Sized> PastActions for &T {
    fn recall(&self, key: &str) -> Option<Literal> {
        (**self).recall(key)
    }
}

/// A remembered value worth offering for one parameter (or the scope).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub parameter: String,
    pub value: Literal,
}

/// Python truthiness; empty and zero values are never suggested.
fn is_truthy(value: &Literal) -> bool {
    match value {
        Literal::None => false,
        Literal::Bool(b) => *b,
        Literal::Int(i) => *i != 0,
        Literal::Float(f) => *f != 0.0,
        Literal::Str(s) => !s.is_empty(),
        Literal::List(items) => !items.is_empty(),
        Literal::Map(entries) => !entries.is_empty(),
    }
}

/// Suggestions for every parameter and the scope of `session`.
///
/// Values remembered for schema-dependent parameters are dropped unless some
/// dataset in `workspace` has them as a column or index label.
pub fn suggestions<P: PastActions + ?Sized>(
    session: &RefinerSession,
    store: &P,
    workspace: &Workspace,
) -> Vec<Suggestion> {
    let mut out = Vec::new();

    for param in session.parameters() {
        let Some(value) = store.recall(&param.name) else {
            continue;
        };
        if !is_truthy(&value) || value.matches(&param.value) {
            continue;
        }
        if param.dtype.is_schema_dependent()
            && !workspace.is_column_name(&value)
            && !workspace.is_index_label(&value)
        {
            tracing::debug!(parameter = %param.name, value = %value, "dropping stale suggestion");
            continue;
        }
        out.push(Suggestion {
            parameter: param.name.clone(),
            value,
        });
    }

    if let Some(scope) = session.scope() {
        let key = scope.kind.key();
        if let Some(value) = store.recall(key) {
            let known = workspace.is_column_name(&value) || workspace.is_index_label(&value);
            if is_truthy(&value) && !value.matches(&scope.value) && known {
                out.push(Suggestion {
                    parameter: key.to_string(),
                    value,
                });
            }
        }
    }

    out
}

/// The values of `session` worth remembering: every non-default parameter and
/// the scope when one is chosen.
pub fn remembered_values(session: &RefinerSession) -> BTreeMap<String, Literal> {
    let mut values: BTreeMap<String, Literal> = session.minimal_kwargs().iter().cloned().collect();
    if let Some(scope) = session.scope() {
        if !scope.value.is_none() {
            values.insert(scope.kind.key().to_string(), scope.value.clone());
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_python() {
        assert!(!is_truthy(&Literal::None));
        assert!(!is_truthy(&Literal::Bool(false)));
        assert!(!is_truthy(&Literal::Int(0)));
        assert!(!is_truthy(&Literal::str("")));
        assert!(!is_truthy(&Literal::List(vec![])));
        assert!(is_truthy(&Literal::str("a")));
        assert!(is_truthy(&Literal::Float(0.5)));
    }

    #[test]
    fn maps_are_stores() {
        let mut store = HashMap::new();
        store.insert("inplace".to_string(), Literal::Bool(true));
        assert_eq!(store.recall("inplace"), Some(Literal::Bool(true)));
        assert_eq!(store.recall("axis"), None);
    }
}
