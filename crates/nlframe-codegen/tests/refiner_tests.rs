use nlframe_codegen::{
    ActionCatalog, Axis, DType, Dataset, OperationDescriptor, RefineError, RefinerSession,
    ReturnBinding, SchemaSnapshot, Selection, SessionState, SessionWarning,
};
use nlframe_dsl::{Combiner, EntitySet, EntityType, Literal, OrderedEntities};

fn descriptor(template: &str, entities: EntitySet) -> OperationDescriptor {
    let combination = Combiner::new().recombine(template, &entities).unwrap();
    ActionCatalog::new().resolve(template, &combination.entities)
}

fn values(items: &[&str]) -> EntitySet {
    items
        .iter()
        .fold(EntitySet::new(), |set, v| set.with(EntityType::Value, *v))
}

fn df1() -> Dataset {
    Dataset::new("df1", SchemaSnapshot::new(["id", "B", "C", "D"], [0i64, 1, 2]))
}

fn sort_session() -> RefinerSession {
    let mut session = RefinerSession::default();
    session
        .select(descriptor("SORT VALUES BY <value>", values(&["id"])), &df1())
        .unwrap();
    session
}

fn kwargs(session: &RefinerSession) -> Vec<(&str, Literal)> {
    session
        .minimal_kwargs()
        .iter()
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect()
}

// ============================================================================
// State machine
// ============================================================================

#[test]
fn new_session_rejects_edits() {
    let mut session = RefinerSession::default();
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert_eq!(session.set_axis(Axis::Index), Err(RefineError::NotSelected));
    assert_eq!(session.finalize(), Err(RefineError::NotSelected));
    assert_eq!(session.code(), "");
}

#[test]
fn edits_move_between_configured_and_refining() {
    let mut session = sort_session();
    assert_eq!(session.state(), SessionState::Configured);

    session
        .set_parameter("na_position", Literal::str("first"))
        .unwrap();
    assert_eq!(session.state(), SessionState::Refining);

    assert_eq!(session.reset(), Ok(SessionState::Configured));
    assert_eq!(
        session.parameter("na_position").unwrap().value,
        Literal::str("last")
    );
}

#[test]
fn finalized_session_is_frozen() {
    let mut session = sort_session();
    let code = session.finalize().unwrap();
    assert_eq!(code, "df1.sort_values(by='id', inplace=True)");
    assert_eq!(session.state(), SessionState::Finalized);

    assert_eq!(
        session.set_parameter("inplace", Literal::Bool(false)),
        Err(RefineError::Finalized)
    );
    assert_eq!(session.set_axis(Axis::Columns), Err(RefineError::Finalized));
    let again = descriptor("SORT VALUES BY <value>", values(&["B"]));
    assert_eq!(session.select(again, &df1()), Err(RefineError::Finalized));
    assert_eq!(session.code(), code);
}

#[test]
fn sentinel_cannot_be_selected() {
    let sentinel = ActionCatalog::new().resolve("FLY TO THE MOON", &OrderedEntities::new());
    let mut session = RefinerSession::default();
    assert_eq!(
        session.select(sentinel, &df1()),
        Err(RefineError::NotImplemented("FLY TO THE MOON".to_string()))
    );
    assert_eq!(session.state(), SessionState::Uninitialized);
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn minimal_kwargs_hold_only_non_defaults() {
    let session = sort_session();
    assert_eq!(
        kwargs(&session),
        vec![("by", Literal::str("id")), ("inplace", Literal::Bool(true))]
    );
    assert_eq!(
        session.refined_kwargs().len(),
        session.parameters().len()
    );
    for param in session.parameters() {
        let listed = session.minimal_kwargs().iter().any(|(k, _)| *k == param.name);
        assert_eq!(listed, !param.value.matches(&param.default), "{}", param.name);
    }
}

#[test]
fn parameters_carry_options_and_hints() {
    let session = sort_session();

    let axis = session.parameter("axis").unwrap();
    assert_eq!(axis.dtype, DType::Axis);
    assert_eq!(axis.selection, Selection::Dropdown);
    assert_eq!(
        axis.options,
        Some(vec![Literal::str("columns"), Literal::str("index")])
    );

    let inplace = session.parameter("inplace").unwrap();
    assert_eq!(inplace.dtype, DType::Boolean);
    assert_eq!(
        inplace.options,
        Some(vec![Literal::Bool(true), Literal::Bool(false)])
    );

    let kind = session.parameter("kind").unwrap();
    assert_eq!(kind.selection, Selection::Dropdown);
    assert_eq!(kind.options.as_ref().map(Vec::len), Some(4));

    let by = session.parameter("by").unwrap();
    assert_eq!(by.dtype, DType::SchemaAxisOpposite);
    assert_eq!(by.selection, Selection::DropdownMulti);
    assert_eq!(by.options.as_ref().unwrap().last(), Some(&Literal::None));

    let key = session.parameter("key").unwrap();
    assert_eq!(key.selection, Selection::Text);
}

#[test]
fn unknown_parameter_is_rejected() {
    let mut session = sort_session();
    assert_eq!(
        session.set_parameter("color", Literal::str("red")),
        Err(RefineError::UnknownParameter {
            operation: "sort_values".to_string(),
            name: "color".to_string(),
        })
    );
}

#[test]
fn numeric_text_is_parsed() {
    let mut session = RefinerSession::default();
    let fill = descriptor(
        "FILL MISSING VALUES WITH <number>",
        EntitySet::new().with(EntityType::Number, "0"),
    );
    session.select(fill, &df1()).unwrap();

    session.set_parameter_text("limit", "3").unwrap();
    assert_eq!(session.parameter("limit").unwrap().value, Literal::Int(3));

    session.set_parameter_text("limit", "2.5").unwrap();
    assert_eq!(session.parameter("limit").unwrap().value, Literal::Float(2.5));

    session.set_parameter_text("limit", "").unwrap();
    assert_eq!(session.parameter("limit").unwrap().value, Literal::None);

    session.set_parameter_text("limit", "None").unwrap();
    assert_eq!(session.parameter("limit").unwrap().value, Literal::None);

    assert!(matches!(
        session.set_parameter_text("limit", "three"),
        Err(RefineError::InvalidValue { .. })
    ));
    assert!(matches!(
        session.set_parameter("limit", Literal::str("three")),
        Err(RefineError::InvalidValue { .. })
    ));
}

#[test]
fn numeric_strings_are_accepted_as_typed_values() {
    let mut session = RefinerSession::default();
    session
        .select(descriptor("SHOW FIRST ROWS", EntitySet::new()), &df1())
        .unwrap();

    session.set_parameter("n", Literal::str("3")).unwrap();
    assert_eq!(session.parameter("n").unwrap().value, Literal::Int(3));
    assert_eq!(session.code(), "df1 = df1.head(n=3)");

    session.set_parameter("n", Literal::str("0.5")).unwrap();
    assert_eq!(session.parameter("n").unwrap().value, Literal::Float(0.5));

    session.set_parameter("n", Literal::str("None")).unwrap();
    assert_eq!(session.parameter("n").unwrap().value, Literal::None);
    assert_eq!(session.code(), "df1 = df1.head(n=None)");
}

#[test]
fn boolean_text_is_parsed() {
    let mut session = sort_session();
    session.set_parameter_text("ascending", "False").unwrap();
    assert_eq!(
        session.parameter("ascending").unwrap().value,
        Literal::Bool(false)
    );
    assert!(matches!(
        session.set_parameter_text("ascending", "maybe"),
        Err(RefineError::InvalidValue { .. })
    ));
    session
        .set_parameter("ascending", Literal::str("True"))
        .unwrap();
    assert_eq!(
        session.parameter("ascending").unwrap().value,
        Literal::Bool(true)
    );
}

#[test]
fn free_text_is_kept_verbatim() {
    let mut session = RefinerSession::default();
    let read = descriptor("READ <value> AS CSV", values(&["data.csv"]));
    session.select(read, &df1()).unwrap();

    session.set_parameter_text("sep", " ; ").unwrap();
    assert_eq!(session.parameter("sep").unwrap().value, Literal::str(" ; "));

    session.set_parameter_text("names", "['a', 'b']").unwrap();
    assert_eq!(
        session.parameter("names").unwrap().value,
        Literal::str("['a', 'b']")
    );
}

#[test]
fn literal_text_is_parsed_for_plain_parameters() {
    let mut session = sort_session();
    session.set_parameter_text("key", "None").unwrap();
    assert_eq!(session.parameter("key").unwrap().value, Literal::None);
    session.set_parameter_text("key", "len").unwrap();
    assert_eq!(session.parameter("key").unwrap().value, Literal::str("len"));
}

// ============================================================================
// Axis and schema re-validation
// ============================================================================

#[test]
fn axis_change_recomputes_dependent_options() {
    let mut session = sort_session();
    assert_eq!(session.axis(), Axis::Index);

    session.set_axis(Axis::Columns).unwrap();
    assert_eq!(session.state(), SessionState::Refining);

    let by = session.parameter("by").unwrap();
    assert_eq!(
        by.options,
        Some(vec![
            Literal::Int(0),
            Literal::Int(1),
            Literal::Int(2),
            Literal::None
        ])
    );
    assert_eq!(by.value, Literal::Int(0));
    assert_eq!(
        session.parameter("axis").unwrap().value,
        Literal::str("columns")
    );
    assert_eq!(
        kwargs(&session),
        vec![
            ("by", Literal::Int(0)),
            ("axis", Literal::str("columns")),
            ("inplace", Literal::Bool(true)),
        ]
    );
    assert_eq!(
        session.code(),
        "df1.sort_values(by=0, axis='columns', inplace=True)"
    );
}

#[test]
fn axis_parameter_routes_to_set_axis() {
    let mut session = sort_session();
    session.set_parameter("axis", Literal::Int(1)).unwrap();
    assert_eq!(session.axis(), Axis::Columns);
    session
        .set_parameter_text("axis", "index")
        .unwrap();
    assert_eq!(session.axis(), Axis::Index);
    assert!(matches!(
        session.set_parameter("axis", Literal::str("diagonal")),
        Err(RefineError::InvalidValue { .. })
    ));
}

#[test]
fn list_values_need_every_member() {
    let mut session = sort_session();
    session
        .set_parameter("by", Literal::strs(["id", "B"]))
        .unwrap();
    assert_eq!(
        session.parameter("by").unwrap().value,
        Literal::strs(["id", "B"])
    );

    session
        .set_parameter("by", Literal::strs(["id", "missing"]))
        .unwrap();
    assert_eq!(session.parameter("by").unwrap().value, Literal::str("id"));
}

#[test]
fn empty_schema_side_leaves_value_and_warns() {
    let columns_only = Dataset::new(
        "wide",
        SchemaSnapshot::new(["id", "B"], Vec::<Literal>::new()),
    );
    let mut session = RefinerSession::default();
    session
        .select(descriptor("SORT VALUES BY <value>", values(&["id"])), &columns_only)
        .unwrap();
    assert!(session.warnings().is_empty());

    session.set_axis(Axis::Columns).unwrap();
    assert_eq!(session.parameter("by").unwrap().value, Literal::str("id"));
    assert_eq!(
        session.warnings(),
        &[SessionWarning::UnresolvedSchemaDependency {
            parameter: "by".to_string(),
            value: Literal::str("id"),
            dataset: "wide".to_string(),
        }]
    );
    assert_eq!(session.state(), SessionState::Refining);

    session.set_axis(Axis::Index).unwrap();
    assert!(session.warnings().is_empty());
}

#[test]
fn schema_change_revalidates_and_follows_the_dataset() {
    let mut session = RefinerSession::default();
    let drop = descriptor("DELETE COLUMN <value>", values(&["B"]));
    session.select(drop, &df1()).unwrap();
    assert_eq!(session.axis(), Axis::Columns);
    assert_eq!(
        session.code(),
        "df1 = df1.drop(labels='B', axis='columns')"
    );

    let df2 = Dataset::new("df2", SchemaSnapshot::new(["x", "y"], [0i64]));
    session.set_schema(&df2).unwrap();
    assert_eq!(session.parameter("labels").unwrap().value, Literal::str("x"));
    assert_eq!(session.code(), "df2 = df2.drop(labels='x', axis='columns')");
}

#[test]
fn scope_is_revalidated() {
    let mut session = RefinerSession::default();
    let strip = descriptor("ON COLUMN <value> STRIP <value>", values(&["B", "(m)"]));
    session.select(strip, &df1()).unwrap();
    assert_eq!(session.scope().unwrap().value, Literal::str("B"));

    let other = Dataset::new("other", SchemaSnapshot::new(["name"], [0i64]));
    session.set_schema(&other).unwrap();
    let scope = session.scope().unwrap();
    assert_eq!(scope.value, Literal::str("name"));
    assert_eq!(scope.options, vec![Literal::str("name"), Literal::None]);
}

#[test]
fn scope_requires_a_scoped_operation() {
    let mut session = sort_session();
    assert_eq!(
        session.set_scope(Literal::str("B")),
        Err(RefineError::NoScope("sort_values".to_string()))
    );
}

#[test]
fn reset_keeps_return_binding() {
    let mut session = sort_session();
    session.set_parameter("inplace", Literal::Bool(false)).unwrap();
    session
        .set_return_binding(ReturnBinding::Named("sorted".to_string()))
        .unwrap();
    assert_eq!(session.code(), "sorted = df1.sort_values(by='id')");

    session.reset().unwrap();
    assert_eq!(session.code(), "df1.sort_values(by='id', inplace=True)");
    assert_eq!(
        session.return_binding(),
        &ReturnBinding::Named("sorted".to_string())
    );
}

#[test]
fn snapshot_serializes() {
    let session = sort_session();
    let snapshot = serde_json::to_value(session.snapshot()).unwrap();
    assert_eq!(snapshot["state"], "configured");
    assert_eq!(snapshot["operation"], "sort_values");
    assert_eq!(snapshot["dataset"], "df1");
    assert_eq!(snapshot["axis"], "index");
    assert_eq!(snapshot["code"], "df1.sort_values(by='id', inplace=True)");
}

#[test]
fn workspace_selection_follows_labels() {
    use nlframe_codegen::Workspace;

    let workspace = Workspace::new()
        .with_dataset("df1", df1().schema)
        .with_dataset("sales", SchemaSnapshot::new(["region", "total"], [0i64]));

    let mut session = RefinerSession::default();
    session
        .select_in(descriptor("SORT VALUES BY <value>", values(&["total"])), &workspace)
        .unwrap();
    assert_eq!(session.dataset().name, "sales");

    session.switch_dataset(&workspace, "df1").unwrap();
    assert_eq!(session.dataset().name, "df1");
    assert_eq!(session.parameter("by").unwrap().value, Literal::str("id"));

    assert_eq!(
        session.switch_dataset(&workspace, "nope"),
        Err(RefineError::UnknownDataset("nope".to_string()))
    );

    let mut empty = RefinerSession::default();
    assert!(matches!(
        empty.select_in(
            descriptor("SORT VALUES BY <value>", values(&["total"])),
            &Workspace::new()
        ),
        Err(RefineError::UnknownDataset(_))
    ));
}

#[test]
fn host_workspace_without_active_key_selects_first_dataset() {
    use nlframe_codegen::Workspace;

    let workspace: Workspace = serde_json::from_str(
        r#"{"datasets": [{"name": "df", "columns": ["a", "b"], "index_labels": [0, 1]}]}"#,
    )
    .unwrap();

    let mut session = RefinerSession::default();
    session
        .select_in(descriptor("SHOW INFORMATION", EntitySet::new()), &workspace)
        .unwrap();
    assert_eq!(session.dataset().name, "df");
    assert_eq!(session.code(), "df = df.info()");
}
