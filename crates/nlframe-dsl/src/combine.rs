//! Grounding templates with entities.
//!
//! A template such as `RENAME <value> TO <value>` is combined with an entity set
//! into three forms: the grounded action (literal text substituted, values
//! double-quoted), the lifted action (type-indexed placeholders) and the decoded
//! entities keyed by their indexed placeholder.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{EntityCounts, EntitySet, EntityType, OrderedEntities};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombineError {
    #[error("template `{template}` expects {expected} but {supplied} were supplied")]
    TemplateMismatch {
        template: String,
        expected: EntityCounts,
        supplied: EntityCounts,
    },
}

/// The three forms of a grounded template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    pub grounded: String,
    pub lifted: String,
    pub entities: OrderedEntities,
}

/// Count the unindexed placeholders of each type in a template.
pub fn placeholder_counts(template: &str) -> EntityCounts {
    let mut counts = EntityCounts::default();
    for ty in EntityType::GROUND_ORDER {
        counts.set(ty, template.matches(ty.placeholder()).count());
    }
    counts
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Combiner;

impl Combiner {
    pub fn new() -> Self {
        Self
    }

    /// Ground `template` with `entities`.
    ///
    /// Per-type placeholder counts must equal per-type entity counts; in
    /// particular the placeholder types are exactly the non-empty entity types.
    pub fn recombine(
        &self,
        template: &str,
        entities: &EntitySet,
    ) -> Result<Combination, CombineError> {
        let expected = placeholder_counts(template);
        let supplied = entities.counts();
        if expected != supplied {
            return Err(CombineError::TemplateMismatch {
                template: template.to_string(),
                expected,
                supplied,
            });
        }

        let mut grounded = template.to_string();
        let mut lifted = template.to_string();
        let mut ordered = OrderedEntities::new();

        for ty in EntityType::GROUND_ORDER {
            for (index, literal) in entities.get(ty).iter().enumerate() {
                let indexed = ty.indexed(index);
                grounded = grounded.replacen(ty.placeholder(), &ty.grounded_text(literal), 1);
                lifted = lifted.replacen(ty.placeholder(), &indexed, 1);
                ordered.insert(indexed, ty.decode(literal));
            }
        }

        Ok(Combination {
            grounded,
            lifted,
            entities: ordered,
        })
    }
}
