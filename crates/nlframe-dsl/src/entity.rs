//! Entity types and entity sets.
//!
//! An entity is a literal span of an utterance (a quoted value, a number, a
//! comparison, a list) that the lifter replaced by a typed placeholder. The same
//! five types drive lifting, grounding and decoding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::literal::{decode_number, Literal};

/// The five entity types, in grounding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Number,
    Value,
    NumberList,
    StringList,
    Condition,
}

impl EntityType {
    /// Order in which a template is grounded and indices are assigned.
    pub const GROUND_ORDER: [EntityType; 5] = [
        EntityType::Number,
        EntityType::Value,
        EntityType::NumberList,
        EntityType::StringList,
        EntityType::Condition,
    ];

    /// Order of the lifting passes. Longer, more specific shapes go first so a
    /// list is never lifted as its first element.
    pub const LIFT_ORDER: [EntityType; 5] = [
        EntityType::Condition,
        EntityType::StringList,
        EntityType::NumberList,
        EntityType::Value,
        EntityType::Number,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            EntityType::Number => "number",
            EntityType::Value => "value",
            EntityType::NumberList => "number_list",
            EntityType::StringList => "string_list",
            EntityType::Condition => "condition",
        }
    }

    /// Unindexed placeholder token, e.g. `<value>`.
    pub fn placeholder(self) -> &'static str {
        match self {
            EntityType::Number => "<number>",
            EntityType::Value => "<value>",
            EntityType::NumberList => "<number_list>",
            EntityType::StringList => "<string_list>",
            EntityType::Condition => "<condition>",
        }
    }

    /// Indexed placeholder token, e.g. `<value1>`.
    pub fn indexed(self, index: usize) -> String {
        format!("<{}{}>", self.tag(), index)
    }

    /// Text substituted for an entity when grounding a template.
    pub fn grounded_text(self, literal: &str) -> String {
        match self {
            EntityType::Value => format!("\"{literal}\""),
            _ => literal.to_string(),
        }
    }

    /// Decode the literal text of an entity into its typed value.
    ///
    /// Value literals arrive already unquoted and are kept verbatim.
    pub fn decode(self, literal: &str) -> Literal {
        match self {
            EntityType::Number => {
                decode_number(literal).unwrap_or_else(|| Literal::str(literal.trim()))
            }
            EntityType::Value => Literal::str(literal),
            EntityType::NumberList => decode_number_list(literal),
            EntityType::StringList => Literal::List(
                literal
                    .split(", ")
                    .map(|item| Literal::str(strip_quotes(item.trim())))
                    .collect(),
            ),
            EntityType::Condition => Literal::str(literal),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Strip one layer of matching wrapping quotes.
pub fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

fn decode_number_list(literal: &str) -> Literal {
    let items: Vec<&str> = literal.split(',').map(str::trim).collect();

    let ints: Option<Vec<i64>> = items.iter().map(|s| s.parse::<i64>().ok()).collect();
    if let Some(ints) = ints {
        return Literal::List(ints.into_iter().map(Literal::Int).collect());
    }

    let floats: Option<Vec<f64>> = items.iter().map(|s| s.parse::<f64>().ok()).collect();
    match floats {
        Some(floats) => Literal::List(floats.into_iter().map(Literal::Float).collect()),
        None => Literal::List(items.into_iter().map(Literal::str).collect()),
    }
}

// ============================================================================
// EntitySet
// ============================================================================

/// Literal entity texts per type, each in left-to-right match order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySet {
    pub numbers: Vec<String>,
    pub values: Vec<String>,
    pub number_lists: Vec<String>,
    pub string_lists: Vec<String>,
    pub conditions: Vec<String>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ty: EntityType) -> &[String] {
        match ty {
            EntityType::Number => &self.numbers,
            EntityType::Value => &self.values,
            EntityType::NumberList => &self.number_lists,
            EntityType::StringList => &self.string_lists,
            EntityType::Condition => &self.conditions,
        }
    }

    pub fn get_mut(&mut self, ty: EntityType) -> &mut Vec<String> {
        match ty {
            EntityType::Number => &mut self.numbers,
            EntityType::Value => &mut self.values,
            EntityType::NumberList => &mut self.number_lists,
            EntityType::StringList => &mut self.string_lists,
            EntityType::Condition => &mut self.conditions,
        }
    }

    pub fn push(&mut self, ty: EntityType, literal: impl Into<String>) {
        self.get_mut(ty).push(literal.into());
    }

    /// Builder-style push.
    pub fn with(mut self, ty: EntityType, literal: impl Into<String>) -> Self {
        self.push(ty, literal);
        self
    }

    /// Append every entity of `other`, keeping per-type order.
    pub fn merge(&mut self, other: &EntitySet) {
        for ty in EntityType::GROUND_ORDER {
            self.get_mut(ty).extend(other.get(ty).iter().cloned());
        }
    }

    pub fn len(&self) -> usize {
        EntityType::GROUND_ORDER
            .iter()
            .map(|ty| self.get(*ty).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> EntityCounts {
        let mut counts = EntityCounts::default();
        for ty in EntityType::GROUND_ORDER {
            counts.set(ty, self.get(ty).len());
        }
        counts
    }
}

/// Per-type entity (or placeholder) counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts([usize; 5]);

impl EntityCounts {
    fn slot(ty: EntityType) -> usize {
        match ty {
            EntityType::Number => 0,
            EntityType::Value => 1,
            EntityType::NumberList => 2,
            EntityType::StringList => 3,
            EntityType::Condition => 4,
        }
    }

    pub fn get(&self, ty: EntityType) -> usize {
        self.0[Self::slot(ty)]
    }

    pub fn set(&mut self, ty: EntityType, count: usize) {
        self.0[Self::slot(ty)] = count;
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Types with a non-zero count.
    pub fn types(&self) -> Vec<EntityType> {
        EntityType::GROUND_ORDER
            .into_iter()
            .filter(|ty| self.get(*ty) > 0)
            .collect()
    }
}

impl fmt::Display for EntityCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .types()
            .into_iter()
            .map(|ty| format!("{} {}", self.get(ty), ty))
            .collect();
        if parts.is_empty() {
            f.write_str("no entities")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

// ============================================================================
// OrderedEntities
// ============================================================================

/// Indexed placeholder (`<value0>`) → decoded value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedEntities(BTreeMap<String, Literal>);

impl OrderedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Literal) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Literal> {
        self.0.get(key)
    }

    /// Entity `index` of type `ty`, if present.
    pub fn entity(&self, ty: EntityType, index: usize) -> Option<&Literal> {
        self.0.get(&ty.indexed(index))
    }

    pub fn contains(&self, ty: EntityType, index: usize) -> bool {
        self.entity(ty, index).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Literal)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Literal)> for OrderedEntities {
    fn from_iter<T: IntoIterator<Item = (String, Literal)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
