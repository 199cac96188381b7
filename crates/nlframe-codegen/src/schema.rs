//! Dataset schemas and the workspace.
//!
//! The host owns the live datasets; the engine only sees their labels. A
//! `Workspace` is a read-only snapshot of every dataset the host knows plus the
//! one currently active.

use nlframe_dsl::Literal;
use serde::{Deserialize, Serialize};

use crate::catalog::OperationDescriptor;
use crate::params::{parameter_table, DType};

/// Column and index labels of one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSnapshot {
    pub columns: Vec<Literal>,
    pub index_labels: Vec<Literal>,
}

impl SchemaSnapshot {
    pub fn new<C, I>(columns: C, index_labels: I) -> Self
    where
        C: IntoIterator,
        C::Item: Into<Literal>,
        I: IntoIterator,
        I::Item: Into<Literal>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            index_labels: index_labels.into_iter().map(Into::into).collect(),
        }
    }

    /// True when `label` (or every item of a list label) is a column.
    pub fn has_column(&self, label: &Literal) -> bool {
        contains_label(&self.columns, label)
    }

    /// True when `label` (or every item of a list label) is an index label.
    pub fn has_index_label(&self, label: &Literal) -> bool {
        contains_label(&self.index_labels, label)
    }

    /// Column labels followed by the trailing `None` option.
    pub fn column_options(&self) -> Vec<Literal> {
        with_none(&self.columns)
    }

    /// Index labels followed by the trailing `None` option.
    pub fn index_options(&self) -> Vec<Literal> {
        with_none(&self.index_labels)
    }
}

fn contains_label(labels: &[Literal], label: &Literal) -> bool {
    match label {
        Literal::List(items) => {
            !items.is_empty() && items.iter().all(|item| contains_label(labels, item))
        }
        other => labels.iter().any(|l| l.matches(other)),
    }
}

fn with_none(labels: &[Literal]) -> Vec<Literal> {
    let mut options = labels.to_vec();
    options.push(Literal::None);
    options
}

/// A named dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    #[serde(flatten)]
    pub schema: SchemaSnapshot,
}

impl Dataset {
    pub fn new(name: impl Into<String>, schema: SchemaSnapshot) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Every dataset known to the host, in discovery order, plus the active one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workspace {
    datasets: Vec<Dataset>,
    active: Option<String>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. The first dataset added becomes active.
    pub fn with_dataset(mut self, name: impl Into<String>, schema: SchemaSnapshot) -> Self {
        self.insert(Dataset::new(name, schema));
        self
    }

    pub fn insert(&mut self, dataset: Dataset) {
        if self.active.is_none() {
            self.active = Some(dataset.name.clone());
        }
        match self.datasets.iter_mut().find(|d| d.name == dataset.name) {
            Some(existing) => *existing = dataset,
            None => self.datasets.push(dataset),
        }
    }

    /// Make `name` the active dataset. Returns false for unknown names.
    pub fn activate(&mut self, name: &str) -> bool {
        if self.dataset(name).is_some() {
            self.active = Some(name.to_string());
            true
        } else {
            false
        }
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// The active dataset; the first one when none was named.
    pub fn active(&self) -> Option<&Dataset> {
        match self.active.as_deref() {
            Some(name) => self.dataset(name),
            None => self.datasets.first(),
        }
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active().map(|d| d.name.as_str())
    }

    /// Datasets that have `label` as a column.
    pub fn column_owners(&self, label: &Literal) -> Vec<&str> {
        self.datasets
            .iter()
            .filter(|d| d.schema.has_column(label))
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Datasets that have `label` as an index label.
    pub fn index_owners(&self, label: &Literal) -> Vec<&str> {
        self.datasets
            .iter()
            .filter(|d| d.schema.has_index_label(label))
            .map(|d| d.name.as_str())
            .collect()
    }

    pub fn is_column_name(&self, label: &Literal) -> bool {
        !self.column_owners(label).is_empty()
    }

    pub fn is_index_label(&self, label: &Literal) -> bool {
        !self.index_owners(label).is_empty()
    }

    /// The dataset that should be active for `label`, starting from `current`.
    ///
    /// Index ownership is checked first and column ownership last, so a label
    /// that is a column somewhere wins over one that is only an index label.
    pub fn dataset_owning<'a>(&'a self, label: &Literal, current: Option<&'a str>) -> Option<&'a str> {
        let mut chosen = current;
        for owners in [self.index_owners(label), self.column_owners(label)] {
            if let Some(&first) = owners.first() {
                if !chosen.is_some_and(|c| owners.contains(&c)) {
                    chosen = Some(first);
                }
            }
        }
        chosen
    }

    /// Switch the active dataset to one owning `label`. Returns true on a switch.
    pub fn activate_for(&mut self, label: &Literal) -> bool {
        let current = self.active_name();
        let next = self.dataset_owning(label, current).map(str::to_string);
        match next {
            Some(name) if Some(name.as_str()) != self.active_name() => {
                tracing::debug!(dataset = %name, label = %label, "switching active dataset");
                self.active = Some(name);
                true
            }
            _ => false,
        }
    }

    /// The dataset a selected operation should run against.
    ///
    /// Labels named by the operation's schema-dependent arguments and scope move
    /// the choice away from the active dataset when it lacks them.
    pub fn dataset_for(&self, descriptor: &OperationDescriptor) -> Option<&Dataset> {
        let table = parameter_table(descriptor.target, &descriptor.operation);
        let mut current = self.active_name();

        let schema_labels = descriptor.kwargs.iter().filter_map(|(name, value)| {
            let dtype = descriptor
                .overrides
                .get(name)
                .and_then(|o| o.dtype)
                .or_else(|| table.iter().find(|p| p.name == name.as_str()).map(|p| p.dtype));
            dtype
                .is_some_and(DType::is_schema_dependent)
                .then_some(value)
        });

        for label in schema_labels.chain(descriptor.scope.iter()) {
            current = self.dataset_owning(label, current);
        }

        current.and_then(|name| self.dataset(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        Workspace::new()
            .with_dataset("df", SchemaSnapshot::new(["id", "name"], [0i64, 1, 2]))
            .with_dataset("sales", SchemaSnapshot::new(["region", "total"], ["a", "b"]))
    }

    #[test]
    fn first_dataset_is_active() {
        assert_eq!(workspace().active_name(), Some("df"));
    }

    #[test]
    fn list_labels_need_every_item() {
        let ws = workspace();
        assert!(ws.is_column_name(&Literal::strs(["id", "name"])));
        assert!(!ws.is_column_name(&Literal::strs(["id", "region"])));
        assert!(!ws.is_column_name(&Literal::List(vec![])));
        assert!(ws.is_index_label(&Literal::Int(2)));
    }

    #[test]
    fn activate_for_switches_to_owner() {
        let mut ws = workspace();
        assert!(!ws.activate_for(&Literal::str("id")));
        assert!(ws.activate_for(&Literal::str("total")));
        assert_eq!(ws.active_name(), Some("sales"));
        assert!(!ws.activate_for(&Literal::str("missing")));
        assert_eq!(ws.active_name(), Some("sales"));
    }

    #[test]
    fn column_ownership_beats_index_ownership() {
        let ws = Workspace::new()
            .with_dataset("a", SchemaSnapshot::new(["x"], ["k"]))
            .with_dataset("b", SchemaSnapshot::new(["k"], Vec::<Literal>::new()));
        assert_eq!(ws.dataset_owning(&Literal::str("k"), Some("a")), Some("b"));
    }

    #[test]
    fn deserialized_workspace_defaults_to_first_dataset() {
        let ws: Workspace = serde_json::from_str(
            r#"{"datasets": [
                {"name": "df", "columns": ["a", "b"], "index_labels": [0, 1]},
                {"name": "other", "columns": ["c"]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(ws.active_name(), Some("df"));
        assert!(ws.is_column_name(&Literal::str("c")));
    }

    #[test]
    fn options_end_with_none() {
        let schema = SchemaSnapshot::new(["a"], Vec::<Literal>::new());
        assert_eq!(schema.column_options(), vec![Literal::str("a"), Literal::None]);
        assert_eq!(schema.index_options(), vec![Literal::None]);
    }
}
