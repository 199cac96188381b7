//! Hand-authored parameter tables.
//!
//! One table per catalogued operation, listing every keyword the call accepts in
//! signature order with its declared default. Required parameters declare `''`
//! as their default; a parameter named `axis` is always an axis selector.

use nlframe_dsl::Literal;
use serde::{Deserialize, Serialize};

use crate::catalog::TargetKind;

/// How a parameter's value is typed, offered and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DType {
    /// No special handling; rendered as a Python literal.
    Plain,
    Boolean,
    Numeric,
    /// Free text kept verbatim.
    FreeForm,
    /// Expression text rendered unquoted as `name=value`.
    Heterogeneous,
    /// `*args` / `**kwargs`, rendered positionally.
    Variadic,
    Axis,
    SchemaColumns,
    SchemaIndex,
    SchemaAxis,
    SchemaAxisOpposite,
}

impl DType {
    /// Options come from the active dataset's schema.
    pub fn is_schema_dependent(self) -> bool {
        matches!(
            self,
            DType::SchemaColumns
                | DType::SchemaIndex
                | DType::SchemaAxis
                | DType::SchemaAxisOpposite
        )
    }

    pub fn is_axis_dependent(self) -> bool {
        matches!(self, DType::SchemaAxis | DType::SchemaAxisOpposite)
    }
}

/// Widget hint for the host's parameter editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Dropdown,
    DropdownMulti,
    Text,
    Number,
}

/// One parameter of an operation signature.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: Literal,
    pub dtype: DType,
}

impl ParamSpec {
    /// Optional parameter; booleans are inferred from the default.
    fn opt(name: &'static str, default: impl Into<Literal>) -> Self {
        let default = default.into();
        let dtype = match default {
            Literal::Bool(_) => DType::Boolean,
            _ => DType::Plain,
        };
        Self {
            name,
            default,
            dtype,
        }
    }

    /// Optional parameter defaulting to `None`.
    fn none(name: &'static str) -> Self {
        Self {
            name,
            default: Literal::None,
            dtype: DType::Plain,
        }
    }

    /// Required parameter.
    fn req(name: &'static str) -> Self {
        Self {
            name,
            default: Literal::str(""),
            dtype: DType::Plain,
        }
    }

    fn variadic(name: &'static str) -> Self {
        Self {
            name,
            default: Literal::str(""),
            dtype: DType::Variadic,
        }
    }

    fn axis() -> Self {
        Self {
            name: "axis",
            default: Literal::str("index"),
            dtype: DType::Axis,
        }
    }
}

/// Parameter table for `operation` on `target`. Unknown operations have none.
pub fn parameter_table(target: TargetKind, operation: &str) -> Vec<ParamSpec> {
    use ParamSpec as P;

    match (target, operation) {
        (TargetKind::Module, "to_datetime") => vec![
            P::req("arg"),
            P::opt("errors", "raise"),
            P::opt("dayfirst", false),
            P::opt("yearfirst", false),
            P::none("utc"),
            P::none("format"),
            P::opt("exact", true),
            P::none("unit"),
            P::opt("infer_datetime_format", false),
            P::opt("origin", "unix"),
            P::opt("cache", true),
        ],
        (TargetKind::Module, "to_numeric") => vec![
            P::req("arg"),
            P::opt("errors", "raise"),
            P::none("downcast"),
        ],
        (TargetKind::Module, "read_csv") => vec![
            P::req("filepath_or_buffer"),
            P::opt("sep", ","),
            P::none("delimiter"),
            P::opt("header", "infer"),
            P::opt("names", ""),
            P::none("index_col"),
            P::none("usecols"),
            P::opt("prefix", ""),
            P::opt("mangle_dupe_cols", true),
            P::none("dtype"),
            P::none("engine"),
            P::none("converters"),
            P::none("true_values"),
            P::none("false_values"),
            P::opt("skipinitialspace", false),
            P::none("skiprows"),
            P::opt("skipfooter", 0i64),
            P::none("nrows"),
            P::none("na_values"),
            P::opt("keep_default_na", true),
            P::opt("na_filter", true),
            P::opt("verbose", false),
            P::opt("skip_blank_lines", true),
            P::none("parse_dates"),
            P::opt("infer_datetime_format", false),
            P::opt("keep_date_col", false),
            P::none("date_parser"),
            P::opt("dayfirst", false),
            P::opt("cache_dates", true),
            P::opt("iterator", false),
            P::none("chunksize"),
            P::opt("compression", "infer"),
            P::none("thousands"),
            P::opt("decimal", "."),
            P::none("lineterminator"),
            P::opt("quotechar", "\""),
            P::opt("quoting", 0i64),
            P::opt("doublequote", true),
            P::none("escapechar"),
            P::none("comment"),
            P::none("encoding"),
            P::opt("encoding_errors", "strict"),
            P::none("dialect"),
            P::none("on_bad_lines"),
            P::opt("delim_whitespace", false),
            P::opt("low_memory", true),
            P::opt("memory_map", false),
            P::none("float_precision"),
            P::none("storage_options"),
        ],
        (TargetKind::Table, "info") => vec![
            P::none("verbose"),
            P::none("buf"),
            P::none("max_cols"),
            P::none("memory_usage"),
            P::none("show_counts"),
        ],
        (TargetKind::Table, "describe") => vec![
            P::none("percentiles"),
            P::none("include"),
            P::none("exclude"),
            P::opt("datetime_is_numeric", false),
        ],
        (TargetKind::Table, "head") => vec![P::opt("n", 5i64)],
        (TargetKind::Table, "isnull") | (TargetKind::Series, "unique") => vec![],
        (TargetKind::Table, "dropna") => vec![
            P::axis(),
            P::opt("how", "any"),
            P::none("thresh"),
            P::none("subset"),
            P::opt("inplace", false),
        ],
        (TargetKind::Table, "fillna") => vec![
            P::none("value"),
            P::none("method"),
            P::axis(),
            P::opt("inplace", false),
            P::none("limit"),
            P::none("downcast"),
        ],
        (TargetKind::Table, "drop_duplicates") => vec![
            P::none("subset"),
            P::opt("keep", "first"),
            P::opt("inplace", false),
            P::opt("ignore_index", false),
        ],
        (TargetKind::Table, "astype") => vec![
            P::req("dtype"),
            P::opt("copy", true),
            P::opt("errors", "raise"),
        ],
        (TargetKind::Table, "round") => vec![
            P::opt("decimals", 0i64),
            P::variadic("args"),
            P::variadic("kwargs"),
        ],
        (TargetKind::Table, "rename") => vec![
            P::none("mapper"),
            P::none("index"),
            P::none("columns"),
            P::axis(),
            P::opt("copy", true),
            P::opt("inplace", false),
            P::none("level"),
            P::opt("errors", "ignore"),
        ],
        (TargetKind::Table, "melt") => vec![
            P::none("id_vars"),
            P::none("value_vars"),
            P::none("var_name"),
            P::opt("value_name", "value"),
            P::none("col_level"),
            P::opt("ignore_index", true),
        ],
        (TargetKind::Table, "filter") => vec![
            P::none("items"),
            P::none("like"),
            P::none("regex"),
            P::axis(),
        ],
        (TargetKind::Table, "set_index") => vec![
            P::req("keys"),
            P::opt("drop", true),
            P::opt("append", false),
            P::opt("inplace", false),
            P::opt("verify_integrity", false),
        ],
        (TargetKind::Table, "reset_index") => vec![
            P::none("level"),
            P::opt("drop", false),
            P::opt("inplace", false),
            P::opt("col_level", 0i64),
            P::opt("col_fill", ""),
        ],
        (TargetKind::Table, "sort_values") => vec![
            P::req("by"),
            P::axis(),
            P::opt("ascending", true),
            P::opt("inplace", false),
            P::opt("kind", "quicksort"),
            P::opt("na_position", "last"),
            P::opt("ignore_index", false),
            P::none("key"),
        ],
        (TargetKind::Table, "assign") => vec![P::variadic("kwargs")],
        (TargetKind::Table, "groupby") => vec![
            P::none("by"),
            P::axis(),
            P::none("level"),
            P::opt("as_index", true),
            P::opt("sort", true),
            P::opt("group_keys", true),
            P::opt("squeeze", false),
            P::opt("observed", false),
            P::opt("dropna", true),
        ],
        (TargetKind::Table, "agg") => vec![
            P::none("func"),
            P::axis(),
            P::variadic("args"),
            P::variadic("kwargs"),
        ],
        (TargetKind::Table, "to_csv") => vec![
            P::none("path_or_buf"),
            P::opt("sep", ","),
            P::opt("na_rep", ""),
            P::none("float_format"),
            P::none("columns"),
            P::opt("header", true),
            P::opt("index", true),
            P::none("index_label"),
            P::opt("mode", "w"),
            P::none("encoding"),
            P::opt("compression", "infer"),
            P::none("quoting"),
            P::opt("quotechar", "\""),
            P::none("line_terminator"),
            P::none("chunksize"),
            P::none("date_format"),
            P::opt("doublequote", true),
            P::none("escapechar"),
            P::opt("decimal", "."),
            P::opt("errors", "strict"),
            P::none("storage_options"),
        ],
        (TargetKind::Table, "drop") => vec![
            P::none("labels"),
            P::axis(),
            P::none("index"),
            P::none("columns"),
            P::none("level"),
            P::opt("inplace", false),
            P::opt("errors", "raise"),
        ],
        (TargetKind::Series, "str.strip") => vec![P::none("to_strip")],
        (TargetKind::Series, "str.split") => vec![
            P::none("pat"),
            P::opt("n", -1i64),
            P::opt("expand", false),
            P::none("regex"),
        ],
        (TargetKind::Series, "str.replace") => vec![
            P::req("pat"),
            P::req("repl"),
            P::opt("n", -1i64),
            P::none("case"),
            P::opt("flags", 0i64),
            P::none("regex"),
        ],
        (TargetKind::Series, "str.join") => vec![P::req("sep")],
        (TargetKind::Series, "str.extract") => vec![
            P::req("pat"),
            P::opt("flags", 0i64),
            P::opt("expand", true),
        ],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_defaults_to_index() {
        let table = parameter_table(TargetKind::Table, "drop");
        let axis = table.iter().find(|p| p.name == "axis").unwrap();
        assert_eq!(axis.dtype, DType::Axis);
        assert_eq!(axis.default, Literal::str("index"));
    }

    #[test]
    fn booleans_are_inferred_from_defaults() {
        let table = parameter_table(TargetKind::Table, "sort_values");
        let inplace = table.iter().find(|p| p.name == "inplace").unwrap();
        assert_eq!(inplace.dtype, DType::Boolean);
        let key = table.iter().find(|p| p.name == "key").unwrap();
        assert_eq!(key.dtype, DType::Plain);
    }

    #[test]
    fn required_parameters_default_to_empty_text() {
        let table = parameter_table(TargetKind::Table, "sort_values");
        assert_eq!(table[0].name, "by");
        assert_eq!(table[0].default, Literal::str(""));
    }

    #[test]
    fn unknown_operation_has_no_table() {
        assert!(parameter_table(TargetKind::Table, "pivot").is_empty());
        assert!(parameter_table(TargetKind::Module, "drop").is_empty());
    }
}
