//! Action catalog.
//!
//! A fixed mapping from DSL action templates to dataframe operations. Each arm
//! builds an `OperationDescriptor` from the decoded entities: the operation, the
//! keyword arguments the entities fill in, per-parameter overrides and the scope.
//!
//! Templates outside the catalog, or whose required entity is missing, resolve to
//! the "not implemented" descriptor rather than failing.

use nlframe_dsl::{EntityType, Literal, OrderedEntities};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::params::{DType, Selection};

pub const NOT_IMPLEMENTED: &str = "not implemented";

/// Every template the catalog understands.
pub const TEMPLATES: &[&str] = &[
    "CONVERT <value> TO DATETIME",
    "CONVERT <value> TO NUMERIC",
    "READ <value> AS CSV",
    "SHOW INFORMATION",
    "DESCRIBE DATAFRAME",
    "SHOW FIRST ROWS",
    "SHOW FIRST <number> ROWS",
    "SHOW MISSING VALUES",
    "DROP MISSING VALUES",
    "DROP MISSING VALUES FROM <value>",
    "FILL MISSING VALUES WITH <value>",
    "FILL MISSING VALUES WITH <number>",
    "DROP DUPLICATE VALUES",
    "CHANGE DATATYPE TO <value>",
    "ON COLUMN <value> CHANGE DATATYPE TO <value>",
    "ROUND TO <number> DECIMAL POINTS",
    "ON COLUMN <value> ROUND TO <number> DECIMAL POINTS",
    "RENAME <value> TO <value>",
    "RENAME COLUMNS TO <value>",
    "MELT DATAFRAME",
    "MELT DATAFRAME WITH <string_list> AS COLUMNS",
    "FILTER FOR COLUMN <value>",
    "FILTER FOR COLUMN <string_list>",
    "SET INDEX TO <value>",
    "RESET INDEX",
    "SORT VALUES BY <value>",
    "ASSIGN NEW COLUMN",
    "ASSIGN NEW COLUMN AS <value>",
    "GROUP BY COLUMN <value>",
    "GROUP BY COLUMN <string_list>",
    "AGGREGATE USING <value>",
    "SAVE TO CSV",
    "SAVE TO CSV AS <value>",
    "DELETE COLUMN",
    "DELETE COLUMN <value>",
    "DELETE COLUMN <string_list>",
    "DELETE ROWS",
    "DELETE ROW <number>",
    "DELETE ROWS <number_list>",
    "ON COLUMN <value> STRIP <value>",
    "SPLIT ON COLUMN <value>",
    "ON COLUMN <value> SPLIT ON <value>",
    "REPLACE VALUES",
    "ON COLUMN <value> REPLACE <value> WITH <value>",
    "ON COLUMN <value> JOIN ON <value>",
    "EXTRACT VALUES",
    "ON COLUMN <value> EXTRACT <value>",
    "GET UNIQUE VALUES FROM <value>",
];

/// What the generated call is invoked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// A dataset method, `df.op(...)`.
    Table,
    /// A column method, `df["col"].op(...)`.
    Series,
    /// A module function, `pd.op(...)`.
    Module,
}

/// Scope restrictions an operation supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    SubsetColumns,
}

impl ScopeKind {
    /// Key under which a scope choice is remembered.
    pub fn key(self) -> &'static str {
        match self {
            ScopeKind::SubsetColumns => "subset_col",
        }
    }
}

/// Catalog adjustments to one parameter of the operation's table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamOverride {
    pub default: Option<Literal>,
    pub dtype: Option<DType>,
    pub options: Option<Vec<Literal>>,
    pub selection: Option<Selection>,
}

impl ParamOverride {
    pub fn dtype(dtype: DType) -> Self {
        Self {
            dtype: Some(dtype),
            ..Self::default()
        }
    }

    pub fn dropdown<I, L>(options: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        Self {
            options: Some(options.into_iter().map(Into::into).collect()),
            selection: Some(Selection::Dropdown),
            ..Self::default()
        }
    }

    pub fn with_default(mut self, default: impl Into<Literal>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }
}

/// Everything needed to configure a refiner session for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub template: String,
    pub target: TargetKind,
    pub operation: String,
    pub kwargs: BTreeMap<String, Literal>,
    pub overrides: BTreeMap<String, ParamOverride>,
    pub scope_options: Vec<ScopeKind>,
    pub scope: Option<Literal>,
    pub summary: String,
}

impl OperationDescriptor {
    fn new(template: &str, target: TargetKind, operation: &str, summary: &str) -> Self {
        Self {
            template: template.to_string(),
            target,
            operation: operation.to_string(),
            kwargs: BTreeMap::new(),
            overrides: BTreeMap::new(),
            scope_options: Vec::new(),
            scope: None,
            summary: summary.to_string(),
        }
    }

    /// The sentinel for templates without an operation.
    pub fn not_implemented(template: &str) -> Self {
        Self::new(template, TargetKind::Table, NOT_IMPLEMENTED, NOT_IMPLEMENTED)
    }

    pub fn is_implemented(&self) -> bool {
        self.operation != NOT_IMPLEMENTED
    }

    fn kwarg(mut self, name: &str, value: impl Into<Literal>) -> Self {
        self.kwargs.insert(name.to_string(), value.into());
        self
    }

    fn param(mut self, name: &str, spec: ParamOverride) -> Self {
        self.overrides.insert(name.to_string(), spec);
        self
    }

    fn subset_columns(mut self) -> Self {
        self.scope_options.push(ScopeKind::SubsetColumns);
        self
    }

    fn scoped_to(mut self, value: Literal) -> Self {
        self.scope = Some(value);
        self
    }
}

/// Looks up decoded entities by type and index.
struct Entities<'a>(&'a OrderedEntities);

impl Entities<'_> {
    fn get(&self, ty: EntityType, index: usize) -> Option<Literal> {
        self.0.entity(ty, index).cloned()
    }

    fn value(&self, index: usize) -> Option<Literal> {
        self.get(EntityType::Value, index)
    }

    fn number(&self, index: usize) -> Option<Literal> {
        self.get(EntityType::Number, index)
    }

    fn string_list(&self, index: usize) -> Option<Literal> {
        self.get(EntityType::StringList, index)
    }

    fn number_list(&self, index: usize) -> Option<Literal> {
        self.get(EntityType::NumberList, index)
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActionCatalog;

impl ActionCatalog {
    pub fn new() -> Self {
        Self
    }

    pub fn templates(&self) -> &'static [&'static str] {
        TEMPLATES
    }

    /// Map a template and its entities to an operation descriptor.
    pub fn resolve(&self, template: &str, entities: &OrderedEntities) -> OperationDescriptor {
        match build(template, &Entities(entities)) {
            Some(descriptor) => descriptor,
            None => {
                if TEMPLATES.contains(&template) {
                    tracing::warn!(template, entities = entities.len(), "missing entity for template");
                } else {
                    tracing::debug!(template, "template not in catalog");
                }
                OperationDescriptor::not_implemented(template)
            }
        }
    }
}

fn choices<'a>(options: &[&'a str]) -> ParamOverride {
    ParamOverride::dropdown(options.iter().copied())
}

fn multi(dtype: DType) -> ParamOverride {
    ParamOverride::dtype(dtype).with_selection(Selection::DropdownMulti)
}

/// `RENAME COLUMNS TO <value>` takes a mapping written as a dict literal.
fn rename_mapper(text: &Literal) -> Literal {
    let parsed = text
        .as_str()
        .and_then(|s| serde_json::from_str::<Literal>(&s.replace('\'', "\"")).ok());
    match parsed {
        Some(map @ Literal::Map(_)) => map,
        _ => text.clone(),
    }
}

fn build(template: &str, e: &Entities<'_>) -> Option<OperationDescriptor> {
    use OperationDescriptor as Op;
    use TargetKind::{Module, Series, Table};

    let descriptor = match template {
        "CONVERT <value> TO DATETIME" => {
            Op::new(template, Module, "to_datetime", "Convert argument to datetime.")
                .kwarg("arg", e.value(0)?)
                .param("arg", ParamOverride::dtype(DType::Heterogeneous))
                .param("errors", choices(&["raise", "coerce", "ignore"]))
                .param("utc", ParamOverride::dtype(DType::Boolean))
        }
        "CONVERT <value> TO NUMERIC" => {
            Op::new(template, Module, "to_numeric", "Convert argument to a numeric type.")
                .kwarg("arg", e.value(0)?)
                .param("arg", ParamOverride::dtype(DType::Heterogeneous))
                .param("errors", choices(&["raise", "coerce", "ignore"]))
        }
        "READ <value> AS CSV" => {
            let mut op = Op::new(
                template,
                Module,
                "read_csv",
                "Read a comma-separated values (csv) file into DataFrame.",
            )
            .kwarg("filepath_or_buffer", e.value(0)?)
            .param("engine", choices(&["c", "python", "pyarrow"]))
            .param("on_bad_lines", choices(&["error", "warn", "skip"]))
            .param("prefix", ParamOverride::dtype(DType::FreeForm).with_default(""))
            .param("sep", ParamOverride::dtype(DType::FreeForm).with_default(","))
            .param("names", ParamOverride::dtype(DType::Heterogeneous).with_default(""));
            for name in [
                "index_col",
                "usecols",
                "dtype",
                "skiprows",
                "na_values",
                "parse_dates",
                "compression",
                "quoting",
                "dialect",
            ] {
                op = op.param(name, ParamOverride::dtype(DType::Heterogeneous));
            }
            op
        }
        "SHOW INFORMATION" => {
            Op::new(template, Table, "info", "Print a concise summary of a DataFrame.")
                .param("verbose", ParamOverride::dtype(DType::Boolean))
                .param("memory_usage", ParamOverride::dtype(DType::Boolean))
                .param("show_counts", ParamOverride::dtype(DType::Boolean))
        }
        "DESCRIBE DATAFRAME" => {
            Op::new(template, Table, "describe", "Generate descriptive statistics.")
        }
        "SHOW FIRST ROWS" | "SHOW FIRST <number> ROWS" => {
            let mut op = Op::new(template, Table, "head", "Return the first `n` rows.")
                .param("n", ParamOverride::dtype(DType::Numeric))
                .subset_columns();
            if template.contains("<number>") {
                op = op.kwarg("n", e.number(0)?);
            }
            op
        }
        "SHOW MISSING VALUES" => Op::new(template, Table, "isnull", "Detect missing values."),
        "DROP MISSING VALUES" | "DROP MISSING VALUES FROM <value>" => {
            let mut op = Op::new(template, Table, "dropna", "Remove missing values.")
                .param("how", choices(&["any", "all"]))
                .param("thresh", ParamOverride::dtype(DType::Numeric))
                .param("subset", multi(DType::SchemaAxisOpposite));
            if template.contains("<value>") {
                op = op.kwarg("subset", e.value(0)?);
            }
            op
        }
        "FILL MISSING VALUES WITH <value>" | "FILL MISSING VALUES WITH <number>" => {
            let value = e.value(0).or_else(|| e.number(0))?;
            Op::new(
                template,
                Table,
                "fillna",
                "Fill NA/NaN values using the specified method.",
            )
            .kwarg("value", value)
            .param(
                "method",
                ParamOverride::dropdown([
                    Literal::str("backfill"),
                    Literal::str("bfill"),
                    Literal::str("pad"),
                    Literal::str("ffill"),
                    Literal::None,
                ]),
            )
            .param("limit", ParamOverride::dtype(DType::Numeric))
            .param("downcast", ParamOverride::dtype(DType::Heterogeneous))
            .subset_columns()
        }
        "DROP DUPLICATE VALUES" => Op::new(
            template,
            Table,
            "drop_duplicates",
            "Return DataFrame with duplicate rows removed.",
        )
        .param("subset", multi(DType::SchemaAxis))
        .param(
            "keep",
            ParamOverride::dropdown([
                Literal::str("first"),
                Literal::str("last"),
                Literal::Bool(false),
            ]),
        ),
        "CHANGE DATATYPE TO <value>" | "ON COLUMN <value> CHANGE DATATYPE TO <value>" => {
            let op = Op::new(
                template,
                Table,
                "astype",
                "Cast a pandas object to a specified dtype `dtype`.",
            )
            .param("errors", choices(&["raise", "ignore"]))
            .subset_columns();
            if e.len() == 2 {
                op.kwarg("dtype", e.value(1)?).scoped_to(e.value(0)?)
            } else {
                op.kwarg("dtype", e.value(0)?)
            }
        }
        "ROUND TO <number> DECIMAL POINTS"
        | "ON COLUMN <value> ROUND TO <number> DECIMAL POINTS" => {
            let mut op = Op::new(
                template,
                Table,
                "round",
                "Round a DataFrame to a variable number of decimal places.",
            )
            .kwarg("decimals", e.number(0)?)
            .subset_columns();
            if e.len() == 2 {
                op = op.scoped_to(e.value(0)?);
            }
            op
        }
        "RENAME <value> TO <value>" | "RENAME COLUMNS TO <value>" => {
            let mapper = if e.len() == 2 {
                let from = e.value(0)?.to_raw();
                Literal::Map(BTreeMap::from([(from, e.value(1)?)]))
            } else {
                rename_mapper(&e.value(0)?)
            };
            Op::new(template, Table, "rename", "Alter axes labels.")
                .kwarg("mapper", mapper)
                .kwarg("axis", "columns")
                .param("mapper", ParamOverride::dtype(DType::Heterogeneous))
                .param("level", ParamOverride::dtype(DType::Numeric))
        }
        "MELT DATAFRAME" | "MELT DATAFRAME WITH <string_list> AS COLUMNS" => {
            let mut op = Op::new(
                template,
                Table,
                "melt",
                "Unpivot a DataFrame from wide to long format, optionally leaving identifiers set.",
            )
            .param("id_vars", multi(DType::SchemaColumns))
            .param("value_vars", multi(DType::SchemaColumns));
            if template.contains("<string_list>") {
                op = op.kwarg("id_vars", e.string_list(0)?);
            }
            op
        }
        "FILTER FOR COLUMN <value>" | "FILTER FOR COLUMN <string_list>" => {
            let items = match e.value(0) {
                Some(value) => Literal::List(vec![value]),
                None => e.string_list(0)?,
            };
            Op::new(
                template,
                Table,
                "filter",
                "Subset the dataframe rows or columns according to the specified index labels.",
            )
            .kwarg("items", items)
            .kwarg("axis", "columns")
            .param("items", multi(DType::SchemaAxis))
        }
        "SET INDEX TO <value>" => Op::new(
            template,
            Table,
            "set_index",
            "Set the DataFrame index using existing columns.",
        )
        .kwarg("keys", e.value(0)?)
        .param("keys", ParamOverride::dtype(DType::SchemaAxis)),
        "RESET INDEX" => Op::new(
            template,
            Table,
            "reset_index",
            "Reset the index, or a level of it.",
        ),
        "SORT VALUES BY <value>" => Op::new(
            template,
            Table,
            "sort_values",
            "Sort by the values along either axis.",
        )
        .kwarg("by", e.value(0)?)
        .kwarg("axis", "index")
        .kwarg("inplace", true)
        .param("by", multi(DType::SchemaAxisOpposite))
        .param(
            "kind",
            choices(&["quicksort", "mergesort", "heapsort", "stable"]),
        )
        .param("na_position", choices(&["first", "last"])),
        "ASSIGN NEW COLUMN" | "ASSIGN NEW COLUMN AS <value>" => {
            let mut op = Op::new(template, Table, "assign", "Assign new columns to a DataFrame.");
            if template.contains("<value>") {
                op = op.kwarg("kwargs", e.value(0)?);
            }
            op
        }
        "GROUP BY COLUMN <value>" | "GROUP BY COLUMN <string_list>" => {
            let by = e.value(0).or_else(|| e.string_list(0))?;
            Op::new(
                template,
                Table,
                "groupby",
                "Group DataFrame using a mapper or by a Series of columns.",
            )
            .kwarg("by", by)
            .kwarg("axis", "columns")
            .param("by", multi(DType::SchemaAxis))
            .param("level", ParamOverride::dtype(DType::Numeric))
            .param(
                "squeeze",
                ParamOverride::dtype(DType::Boolean).with_default(false),
            )
        }
        "AGGREGATE USING <value>" => Op::new(
            template,
            Table,
            "agg",
            "Aggregate using one or more operations over the specified axis.",
        )
        .kwarg("func", e.value(0)?)
        .subset_columns(),
        "SAVE TO CSV" | "SAVE TO CSV AS <value>" => {
            let mut op = Op::new(
                template,
                Table,
                "to_csv",
                "Write object to a comma-separated values (csv) file.",
            );
            if template.contains("<value>") {
                op = op.kwarg("path_or_buf", e.value(0)?);
            }
            op
        }
        "DELETE COLUMN" | "DELETE COLUMN <value>" | "DELETE COLUMN <string_list>" => {
            let mut op = Op::new(
                template,
                Table,
                "drop",
                "Drop specified labels from rows or columns.",
            )
            .kwarg("axis", "columns")
            .param("labels", multi(DType::SchemaAxis))
            .param("index", ParamOverride::dtype(DType::SchemaAxis))
            .param("columns", ParamOverride::dtype(DType::SchemaColumns))
            .param("level", ParamOverride::dtype(DType::Numeric));
            if !e.is_empty() {
                let labels = e.value(0).or_else(|| e.string_list(0))?;
                op = op.kwarg("labels", labels);
            }
            op
        }
        "DELETE ROWS" | "DELETE ROW <number>" | "DELETE ROWS <number_list>" => {
            let mut op = Op::new(
                template,
                Table,
                "drop",
                "Drop specified labels from rows or columns.",
            )
            .param("labels", multi(DType::SchemaAxis))
            .param("level", ParamOverride::dtype(DType::Numeric));
            if !e.is_empty() {
                let labels = e.number(0).or_else(|| e.number_list(0))?;
                op = op.kwarg("labels", labels).kwarg("axis", "index");
            }
            op
        }
        "ON COLUMN <value> STRIP <value>" => Op::new(
            template,
            Series,
            "str.strip",
            "Remove leading and trailing characters.",
        )
        .kwarg("to_strip", e.value(1)?)
        .subset_columns()
        .scoped_to(e.value(0)?),
        "SPLIT ON COLUMN <value>" | "ON COLUMN <value> SPLIT ON <value>" => {
            let mut op = Op::new(
                template,
                Series,
                "str.split",
                "Split strings around given separator/delimiter.",
            )
            .param("n", ParamOverride::dtype(DType::Numeric))
            .param("regex", ParamOverride::dtype(DType::Boolean))
            .subset_columns()
            .scoped_to(e.value(0)?);
            if e.len() == 2 {
                op = op.kwarg("pat", e.value(1)?);
            }
            op
        }
        "REPLACE VALUES" | "ON COLUMN <value> REPLACE <value> WITH <value>" => {
            let mut op = Op::new(
                template,
                Series,
                "str.replace",
                "Replace each occurrence of pattern/regex in the Series/Index.",
            )
            .param("n", ParamOverride::dtype(DType::Numeric))
            .param("regex", ParamOverride::dtype(DType::Boolean))
            .param("case", ParamOverride::dtype(DType::Boolean))
            .param("flags", ParamOverride::dtype(DType::Numeric))
            .subset_columns();
            if !e.is_empty() {
                op = op
                    .kwarg("pat", e.value(1)?)
                    .kwarg("repl", e.value(2)?)
                    .scoped_to(e.value(0)?);
            }
            op
        }
        "ON COLUMN <value> JOIN ON <value>" => Op::new(
            template,
            Series,
            "str.join",
            "Join lists contained as elements in the Series/Index with passed delimiter.",
        )
        .kwarg("sep", e.value(1)?)
        .subset_columns()
        .scoped_to(e.value(0)?),
        "EXTRACT VALUES" | "ON COLUMN <value> EXTRACT <value>" => {
            let mut op = Op::new(
                template,
                Series,
                "str.extract",
                "Extract capture groups in the regex `pat` as columns in a DataFrame.",
            )
            .subset_columns();
            if !e.is_empty() {
                op = op.kwarg("pat", e.value(1)?).scoped_to(e.value(0)?);
            }
            op
        }
        "GET UNIQUE VALUES FROM <value>" => Op::new(
            template,
            Series,
            "unique",
            "Return unique values of Series object.",
        )
        .subset_columns()
        .scoped_to(e.value(0)?),
        _ => return None,
    };

    Some(descriptor)
}
