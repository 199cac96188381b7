//! Candidate resolution.
//!
//! Takes the ranked output of an external classifier for one utterance and
//! turns every plausible template into a resolved operation: entities are
//! lifted from the utterance, recombined with each template and looked up in
//! the catalog. Candidates that cannot be grounded, or that map to no
//! operation, are dropped.

use nlframe_dsl::{Combination, Combiner, EntityLifter, EntitySet, Literal, OrderedEntities};
use serde::{Deserialize, Serialize};

use crate::catalog::{ActionCatalog, OperationDescriptor};
use crate::config::EngineConfig;
use crate::schema::Workspace;

/// One ranked classifier result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// The training utterance the input was matched against.
    pub utterance: String,
    pub template: String,
    pub probability: f64,
}

impl Candidate {
    pub fn new(utterance: impl Into<String>, template: impl Into<String>, probability: f64) -> Self {
        Self {
            utterance: utterance.into(),
            template: template.into(),
            probability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCandidate {
    pub descriptor: OperationDescriptor,
    pub grounded: String,
    pub lifted: String,
    pub entities: OrderedEntities,
    pub training_utterance: String,
    pub utterance: String,
    /// Percentage, rounded to two decimals.
    pub probability: f64,
    pub documentation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Candidates { candidates: Vec<ResolvedCandidate> },
    NotSure { marker: String },
}

impl Resolution {
    pub fn candidates(&self) -> &[ResolvedCandidate] {
        match self {
            Resolution::Candidates { candidates } => candidates,
            Resolution::NotSure { .. } => &[],
        }
    }

    pub fn is_not_sure(&self) -> bool {
        matches!(self, Resolution::NotSure { .. })
    }
}

#[derive(Debug, Clone)]
pub struct CandidateResolver {
    config: EngineConfig,
    lifter: EntityLifter,
    combiner: Combiner,
    catalog: ActionCatalog,
}

impl Default for CandidateResolver {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CandidateResolver {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            lifter: EntityLifter::new(),
            combiner: Combiner::new(),
            catalog: ActionCatalog::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve the ranked `candidates` for `utterance`.
    ///
    /// `workspace` decides which value of an `ON COLUMN` template is the column.
    pub fn resolve(
        &self,
        utterance: &str,
        candidates: &[Candidate],
        workspace: &Workspace,
    ) -> Resolution {
        let (_, entities) = self.lifter.lift(utterance);

        let mut ranked: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.probability >= self.config.confidence_threshold)
            .collect();
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        let mut seen: Vec<String> = Vec::new();
        let mut grounded = Vec::new();
        for candidate in ranked {
            let Some((template, combination)) =
                self.ground(&candidate.template, &entities, workspace)
            else {
                continue;
            };
            if seen.contains(&template) {
                continue;
            }
            seen.push(template.clone());
            grounded.push((candidate, (template, combination)));
        }
        grounded.truncate(self.config.max_candidates);

        let resolved: Vec<ResolvedCandidate> = grounded
            .into_iter()
            .filter_map(|(candidate, (template, combination))| {
                let descriptor = self.catalog.resolve(&template, &combination.entities);
                if !descriptor.is_implemented() {
                    tracing::warn!(template = %template, "dropping candidate without operation");
                    return None;
                }
                Some(ResolvedCandidate {
                    documentation: descriptor.summary.clone(),
                    descriptor,
                    grounded: combination.grounded,
                    lifted: combination.lifted,
                    entities: combination.entities,
                    training_utterance: candidate.utterance.clone(),
                    utterance: utterance.to_string(),
                    probability: (candidate.probability * 100.0 * 100.0).round() / 100.0,
                })
            })
            .collect();

        if resolved.is_empty() {
            tracing::debug!(utterance, "no candidate resolved");
            Resolution::NotSure {
                marker: self.config.not_sure_marker.clone(),
            }
        } else {
            Resolution::Candidates {
                candidates: resolved,
            }
        }
    }

    /// Lift literals embedded in `template`, merge them after the utterance's
    /// entities and recombine. Returns the lifted template with the result.
    fn ground(
        &self,
        template: &str,
        entities: &EntitySet,
        workspace: &Workspace,
    ) -> Option<(String, Combination)> {
        let (template, embedded) = self.lifter.lift(template);
        let mut merged = entities.clone();
        merged.merge(&embedded);

        let combination = match self.combiner.recombine(&template, &merged) {
            Ok(combination) => combination,
            Err(err) => {
                tracing::debug!(error = %err, "skipping candidate");
                return None;
            }
        };

        if !template.contains("ON COLUMN") || merged.values.is_empty() {
            return Some((template, combination));
        }

        let is_column = |v: &String| workspace.is_column_name(&Literal::str(v.as_str()));
        if is_column(&merged.values[0]) || !merged.values.iter().any(is_column) {
            return Some((template, combination));
        }

        let (mut columns, others): (Vec<String>, Vec<String>) =
            merged.values.iter().cloned().partition(|v| is_column(v));
        columns.extend(others);
        merged.values = columns;

        match self.combiner.recombine(&template, &merged) {
            Ok(reordered) => Some((template, reordered)),
            Err(_) => Some((template, combination)),
        }
    }
}
