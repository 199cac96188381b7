//! Refiner sessions.
//!
//! A `RefinerSession` owns the editable state of one selected operation: the
//! parameter table with current values and options, the axis, the scope, the
//! dataset it runs against and the rendered code.
//!
//! ```text
//!   Uninitialized ──select──► Configured ◄──reset── Refining
//!                                  │  ▲                ▲ │
//!                                  │  └────────────────┘ │
//!                                  └──edit──► Refining ◄─┘
//!                       Configured | Refining ──finalize──► Finalized
//! ```
//!
//! Every change runs the re-validation pass: schema-dependent options are
//! recomputed from the dataset and axis, values that are no longer members are
//! reset to the first option, the minimal kwargs are derived and the code is
//! re-rendered.

use nlframe_dsl::Literal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{OperationDescriptor, ScopeKind, TargetKind};
use crate::config::EngineConfig;
use crate::error::{RefineError, SessionWarning};
use crate::params::{parameter_table, DType, Selection};
use crate::render::CodeGenerator;
use crate::schema::{Dataset, Workspace};

// ============================================================================
// Session types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Configured,
    Refining,
    Finalized,
}

/// Orientation of axis-dependent parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Index,
    Columns,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Index => "index",
            Axis::Columns => "columns",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Axis::Index => Axis::Columns,
            Axis::Columns => Axis::Index,
        }
    }

    /// Accepts the names and the numeric aliases (`0` rows, `1` columns).
    pub fn from_literal(value: &Literal) -> Option<Self> {
        match value {
            Literal::Str(s) if s == "index" || s == "rows" => Some(Axis::Index),
            Literal::Str(s) if s == "columns" => Some(Axis::Columns),
            Literal::Int(0) => Some(Axis::Index),
            Literal::Int(1) => Some(Axis::Columns),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the result of the generated call is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ReturnBinding {
    /// Back into the dataset (or its scoped columns) the call runs on.
    ActiveDataset,
    Named(String),
    /// Expression only, no assignment.
    Discard,
}

/// Current state of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    pub name: String,
    pub value: Literal,
    pub default: Literal,
    pub dtype: DType,
    pub options: Option<Vec<Literal>>,
    pub selection: Selection,
}

impl ParameterState {
    pub fn is_default(&self) -> bool {
        self.value.matches(&self.default)
    }
}

/// Current scope restriction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeState {
    pub kind: ScopeKind,
    pub value: Literal,
    pub options: Vec<Literal>,
    pub selection: Selection,
}

/// Serializable view of a session for the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub template: Option<String>,
    pub operation: Option<String>,
    pub dataset: String,
    pub axis: Axis,
    pub parameters: Vec<ParameterState>,
    pub scope: Option<ScopeState>,
    pub kwargs: Vec<(String, Literal)>,
    pub code: String,
    pub summary: Option<String>,
    pub warnings: Vec<SessionWarning>,
}

// ============================================================================
// RefinerSession
// ============================================================================

#[derive(Debug, Clone)]
pub struct RefinerSession {
    config: EngineConfig,
    state: SessionState,
    descriptor: Option<OperationDescriptor>,
    dataset: Dataset,
    parameters: Vec<ParameterState>,
    axis: Axis,
    scope: Option<ScopeState>,
    minimal_kwargs: Vec<(String, Literal)>,
    return_binding: ReturnBinding,
    code: String,
    warnings: Vec<SessionWarning>,
}

impl Default for RefinerSession {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl RefinerSession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: SessionState::Uninitialized,
            descriptor: None,
            dataset: Dataset::default(),
            parameters: Vec::new(),
            axis: Axis::Columns,
            scope: None,
            minimal_kwargs: Vec::new(),
            return_binding: ReturnBinding::ActiveDataset,
            code: String::new(),
            warnings: Vec::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn descriptor(&self) -> Option<&OperationDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn parameters(&self) -> &[ParameterState] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterState> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Current value of every parameter, in signature order.
    pub fn refined_kwargs(&self) -> Vec<(String, Literal)> {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }

    /// Parameters whose value differs from the declared default.
    pub fn minimal_kwargs(&self) -> &[(String, Literal)] {
        &self.minimal_kwargs
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn scope(&self) -> Option<&ScopeState> {
        self.scope.as_ref()
    }

    pub fn return_binding(&self) -> &ReturnBinding {
        &self.return_binding
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn warnings(&self) -> &[SessionWarning] {
        &self.warnings
    }

    /// Parameters whose options come from the dataset schema.
    pub fn schema_dependencies(&self) -> impl Iterator<Item = &ParameterState> {
        self.parameters
            .iter()
            .filter(|p| p.dtype.is_schema_dependent())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            template: self.descriptor.as_ref().map(|d| d.template.clone()),
            operation: self.descriptor.as_ref().map(|d| d.operation.clone()),
            dataset: self.dataset.name.clone(),
            axis: self.axis,
            parameters: self.parameters.clone(),
            scope: self.scope.clone(),
            kwargs: self.minimal_kwargs.clone(),
            code: self.code.clone(),
            summary: self.descriptor.as_ref().map(|d| d.summary.clone()),
            warnings: self.warnings.clone(),
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Configure the session for `descriptor` against `dataset`.
    pub fn select(
        &mut self,
        descriptor: OperationDescriptor,
        dataset: &Dataset,
    ) -> Result<SessionState, RefineError> {
        if self.state == SessionState::Finalized {
            return Err(RefineError::Finalized);
        }
        if !descriptor.is_implemented() {
            return Err(RefineError::NotImplemented(descriptor.template));
        }

        let mut parameters = build_parameters(&descriptor);
        for (name, value) in &descriptor.kwargs {
            let param = parameters
                .iter_mut()
                .find(|p| &p.name == name)
                .ok_or_else(|| RefineError::UnknownParameter {
                    operation: descriptor.operation.clone(),
                    name: name.clone(),
                })?;
            param.value = value.clone();
        }

        self.axis = parameters
            .iter()
            .find(|p| p.dtype == DType::Axis)
            .and_then(|p| Axis::from_literal(&p.value))
            .unwrap_or(Axis::Columns);

        self.scope = descriptor
            .scope_options
            .first()
            .map(|&kind| ScopeState {
                kind,
                value: descriptor.scope.clone().unwrap_or(Literal::None),
                options: Vec::new(),
                selection: Selection::Dropdown,
            });

        self.return_binding = match descriptor.target {
            TargetKind::Module => ReturnBinding::Named(self.config.result_binding.clone()),
            TargetKind::Table | TargetKind::Series => ReturnBinding::ActiveDataset,
        };

        tracing::debug!(
            template = %descriptor.template,
            operation = %descriptor.operation,
            dataset = %dataset.name,
            "selected operation"
        );

        self.parameters = parameters;
        self.dataset = dataset.clone();
        self.descriptor = Some(descriptor);
        self.state = SessionState::Configured;
        self.refresh();
        Ok(self.state)
    }

    /// Select `descriptor` against the workspace dataset its labels point to.
    pub fn select_in(
        &mut self,
        descriptor: OperationDescriptor,
        workspace: &Workspace,
    ) -> Result<SessionState, RefineError> {
        let dataset = workspace.dataset_for(&descriptor).ok_or_else(|| {
            RefineError::UnknownDataset(workspace.active_name().unwrap_or_default().to_string())
        })?;
        self.select(descriptor, dataset)
    }

    /// Re-run the session against the workspace dataset called `name`.
    pub fn switch_dataset(&mut self, workspace: &Workspace, name: &str) -> Result<(), RefineError> {
        let dataset = workspace
            .dataset(name)
            .ok_or_else(|| RefineError::UnknownDataset(name.to_string()))?;
        self.set_schema(dataset)
    }

    /// Restore the catalog configuration of the selected operation. The return
    /// binding is kept.
    pub fn reset(&mut self) -> Result<SessionState, RefineError> {
        self.ensure_editable()?;
        let descriptor = self.descriptor.clone().ok_or(RefineError::NotSelected)?;
        let dataset = self.dataset.clone();
        let binding = self.return_binding.clone();
        self.select(descriptor, &dataset)?;
        self.return_binding = binding;
        self.render();
        Ok(self.state)
    }

    /// Change the orientation of axis-dependent parameters.
    pub fn set_axis(&mut self, axis: Axis) -> Result<(), RefineError> {
        self.ensure_editable()?;
        if axis != self.axis {
            self.axis = axis;
            tracing::debug!(axis = %axis, "axis changed");
        }
        self.state = SessionState::Refining;
        self.refresh();
        Ok(())
    }

    /// Re-run the session against another dataset.
    pub fn set_schema(&mut self, dataset: &Dataset) -> Result<(), RefineError> {
        self.ensure_editable()?;
        if dataset.name != self.dataset.name {
            tracing::debug!(from = %self.dataset.name, to = %dataset.name, "dataset changed");
        }
        self.dataset = dataset.clone();
        self.refresh();
        Ok(())
    }

    /// Set a parameter to a typed value.
    pub fn set_parameter(&mut self, name: &str, value: Literal) -> Result<(), RefineError> {
        self.ensure_editable()?;
        let dtype = self.find_parameter(name)?.dtype;

        if dtype == DType::Axis {
            let axis = Axis::from_literal(&value).ok_or_else(|| RefineError::InvalidValue {
                name: name.to_string(),
                reason: format!("expected `index` or `columns`, got {}", value.to_python()),
            })?;
            return self.set_axis(axis);
        }

        let value = coerce(name, dtype, value)?;
        if let Some(param) = self.parameters.iter_mut().find(|p| p.name == name) {
            param.value = value;
        }
        self.state = SessionState::Refining;
        self.refresh();
        Ok(())
    }

    /// Set a parameter from the text a user typed.
    pub fn set_parameter_text(&mut self, name: &str, text: &str) -> Result<(), RefineError> {
        self.ensure_editable()?;
        let param = self.find_parameter(name)?;
        let value = parse_text(param, text)?;
        self.set_parameter(name, value)
    }

    /// Restrict (or, with `None`, unrestrict) the operation's scope.
    pub fn set_scope(&mut self, value: Literal) -> Result<(), RefineError> {
        self.ensure_editable()?;
        let operation = self.operation_name();
        let scope = self.scope.as_mut().ok_or(RefineError::NoScope(operation))?;
        scope.value = match value {
            Literal::Str(s) if s.is_empty() => Literal::None,
            other => other,
        };
        self.state = SessionState::Refining;
        self.refresh();
        Ok(())
    }

    pub fn set_return_binding(&mut self, binding: ReturnBinding) -> Result<(), RefineError> {
        self.ensure_editable()?;
        self.return_binding = binding;
        self.render();
        Ok(())
    }

    /// Freeze the session and hand out the final code.
    pub fn finalize(&mut self) -> Result<String, RefineError> {
        self.ensure_editable()?;
        self.state = SessionState::Finalized;
        Ok(self.code.clone())
    }

    // ========================================================================
    // Re-validation
    // ========================================================================

    fn ensure_editable(&self) -> Result<(), RefineError> {
        match self.state {
            SessionState::Uninitialized => Err(RefineError::NotSelected),
            SessionState::Finalized => Err(RefineError::Finalized),
            SessionState::Configured | SessionState::Refining => Ok(()),
        }
    }

    fn operation_name(&self) -> String {
        self.descriptor
            .as_ref()
            .map(|d| d.operation.clone())
            .unwrap_or_default()
    }

    fn find_parameter(&self, name: &str) -> Result<&ParameterState, RefineError> {
        self.parameter(name)
            .ok_or_else(|| RefineError::UnknownParameter {
                operation: self.operation_name(),
                name: name.to_string(),
            })
    }

    fn schema_options(&self, dtype: DType) -> Vec<Literal> {
        let schema = &self.dataset.schema;
        let columns_side = match dtype {
            DType::SchemaColumns => true,
            DType::SchemaIndex => false,
            DType::SchemaAxis => self.axis == Axis::Columns,
            DType::SchemaAxisOpposite => self.axis.opposite() == Axis::Columns,
            _ => return Vec::new(),
        };
        if columns_side {
            schema.column_options()
        } else {
            schema.index_options()
        }
    }

    /// Recompute options, repair values, derive kwargs and render.
    fn refresh(&mut self) {
        let mut warnings = Vec::new();
        let dataset_name = self.dataset.name.clone();

        for i in 0..self.parameters.len() {
            let dtype = self.parameters[i].dtype;
            if dtype == DType::Axis {
                self.parameters[i].value = Literal::str(self.axis.as_str());
                continue;
            }
            if !dtype.is_schema_dependent() {
                continue;
            }

            let options = self.schema_options(dtype);
            let param = &mut self.parameters[i];
            if let Some(warning) = revalidate(&param.name, &mut param.value, &options, &dataset_name) {
                warnings.push(warning);
            }
            param.options = Some(options);
        }

        if let Some(scope) = self.scope.as_mut() {
            let options = self.dataset.schema.column_options();
            if let Some(warning) =
                revalidate(scope.kind.key(), &mut scope.value, &options, &dataset_name)
            {
                warnings.push(warning);
            }
            scope.options = options;
        }

        self.warnings = warnings;
        self.minimal_kwargs = self
            .parameters
            .iter()
            .filter(|p| !p.is_default())
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();
        self.render();
    }

    fn render(&mut self) {
        self.code = CodeGenerator::new(&self.config).render(self);
    }
}

/// Keep `value` if every part of it is an option; otherwise reset it to the
/// first option, or leave it and warn when the schema offers nothing.
fn revalidate(
    name: &str,
    value: &mut Literal,
    options: &[Literal],
    dataset: &str,
) -> Option<SessionWarning> {
    let is_member = |v: &Literal| options.iter().any(|o| o.matches(v));
    let valid = match &*value {
        Literal::List(items) => items.iter().all(is_member),
        scalar => is_member(scalar),
    };
    if valid {
        return None;
    }

    let real_options = options.iter().filter(|o| !o.is_none()).count();
    if real_options == 0 {
        tracing::warn!(
            parameter = name,
            value = %value,
            dataset,
            "no schema options for schema-dependent parameter"
        );
        return Some(SessionWarning::UnresolvedSchemaDependency {
            parameter: name.to_string(),
            value: value.clone(),
            dataset: dataset.to_string(),
        });
    }

    tracing::debug!(parameter = name, from = %value, to = %options[0], "value reset to first option");
    *value = options[0].clone();
    None
}

/// Merge an operation's parameter table with the catalog overrides and fill in
/// options and selection hints.
fn build_parameters(descriptor: &OperationDescriptor) -> Vec<ParameterState> {
    parameter_table(descriptor.target, &descriptor.operation)
        .into_iter()
        .map(|spec| {
            let mut state = ParameterState {
                name: spec.name.to_string(),
                value: spec.default.clone(),
                default: spec.default,
                dtype: spec.dtype,
                options: None,
                selection: Selection::Text,
            };
            let mut selection = None;

            if let Some(o) = descriptor.overrides.get(spec.name) {
                if let Some(default) = &o.default {
                    state.default = default.clone();
                    state.value = default.clone();
                }
                if let Some(dtype) = o.dtype {
                    state.dtype = dtype;
                }
                state.options = o.options.clone();
                selection = o.selection;
            }

            if state.name == "axis" {
                state.dtype = DType::Axis;
                state.default = Literal::str("index");
                state.value = Literal::str("index");
                state.options = Some(vec![Literal::str("columns"), Literal::str("index")]);
                state.selection = Selection::Dropdown;
                return state;
            }

            state.selection = match state.dtype {
                DType::Boolean => {
                    if state.options.is_none() {
                        state.options = Some(vec![Literal::Bool(true), Literal::Bool(false)]);
                    }
                    selection.unwrap_or(Selection::Dropdown)
                }
                d if d.is_schema_dependent() => selection.unwrap_or(Selection::Dropdown),
                DType::Numeric => selection.unwrap_or(Selection::Number),
                _ => selection.unwrap_or(Selection::Text),
            };
            state
        })
        .collect()
}

fn invalid(name: &str, reason: impl Into<String>) -> RefineError {
    RefineError::InvalidValue {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Check a typed value against the parameter's dtype.
fn coerce(name: &str, dtype: DType, value: Literal) -> Result<Literal, RefineError> {
    match dtype {
        DType::Numeric => match value {
            Literal::Int(_) | Literal::Float(_) | Literal::None => Ok(value),
            Literal::Str(s) => match s.trim() {
                "" | "None" => Ok(Literal::None),
                text => nlframe_dsl::literal::decode_number(text).ok_or_else(|| {
                    invalid(name, format!("expected a number, got `{text}`"))
                }),
            },
            other => Err(invalid(name, format!("expected a number, got {}", other.to_python()))),
        },
        DType::Boolean => match value {
            Literal::Bool(_) | Literal::None => Ok(value),
            Literal::Str(s) if s == "True" => Ok(Literal::Bool(true)),
            Literal::Str(s) if s == "False" => Ok(Literal::Bool(false)),
            other => Err(invalid(
                name,
                format!("expected True or False, got {}", other.to_python()),
            )),
        },
        _ => Ok(value),
    }
}

/// Interpret editor text for a parameter.
fn parse_text(param: &ParameterState, text: &str) -> Result<Literal, RefineError> {
    let trimmed = text.trim();
    match param.dtype {
        DType::Numeric => {
            if trimmed.is_empty() || trimmed == "None" {
                return Ok(Literal::None);
            }
            nlframe_dsl::literal::decode_number(trimmed)
                .ok_or_else(|| invalid(&param.name, format!("`{trimmed}` is not a number")))
        }
        DType::Boolean => match trimmed {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" | "" => Ok(Literal::None),
            _ => Err(invalid(&param.name, format!("`{trimmed}` is not True or False"))),
        },
        DType::FreeForm | DType::Heterogeneous | DType::Variadic => Ok(Literal::str(text)),
        DType::Axis => Ok(Literal::str(trimmed)),
        d if d.is_schema_dependent() => {
            let verbatim = Literal::str(text);
            let is_option = param
                .options
                .as_ref()
                .is_some_and(|opts| opts.iter().any(|o| o.matches(&verbatim)));
            if is_option {
                Ok(verbatim)
            } else {
                Ok(Literal::from_user_text(text))
            }
        }
        _ => Ok(Literal::from_user_text(text)),
    }
}
