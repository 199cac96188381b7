use nlframe_codegen::{
    ActionCatalog, Axis, Dataset, RefinerSession, SchemaSnapshot, SessionWarning,
};
use nlframe_dsl::{Combiner, EntitySet, EntityType, Literal};
use proptest::prelude::*;

fn column_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(proptest::string::string_regex("[a-z]{1,6}").unwrap(), 1..5)
        .prop_map(|set| set.into_iter().collect())
}

fn index_labels() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(0i64..50, 0..5).prop_map(|set| set.into_iter().collect())
}

fn axis() -> impl Strategy<Value = Axis> {
    prop_oneof![Just(Axis::Index), Just(Axis::Columns)]
}

const TEMPLATES: [&str; 4] = [
    "SORT VALUES BY <value>",
    "DELETE COLUMN <value>",
    "SET INDEX TO <value>",
    "GROUP BY COLUMN <value>",
];

fn select(template: &str, label: &str, dataset: &Dataset) -> RefinerSession {
    let entities = EntitySet::new().with(EntityType::Value, label);
    let combination = Combiner::new().recombine(template, &entities).unwrap();
    let descriptor = ActionCatalog::new().resolve(template, &combination.entities);
    let mut session = RefinerSession::default();
    session.select(descriptor, dataset).unwrap();
    session
}

fn assert_consistent(session: &RefinerSession) -> Result<(), TestCaseError> {
    for param in session.schema_dependencies() {
        let options = param.options.clone().unwrap_or_default();
        let is_member = |v: &Literal| options.iter().any(|o| o.matches(v));
        let valid = match &param.value {
            Literal::List(items) => items.iter().all(is_member),
            scalar => is_member(scalar),
        };
        let warned = session.warnings().iter().any(|w| match w {
            SessionWarning::UnresolvedSchemaDependency { parameter, .. } => {
                parameter == &param.name
            }
        });
        prop_assert!(valid || warned, "{} = {}", param.name, param.value);
    }

    let expected: Vec<(String, Literal)> = session
        .parameters()
        .iter()
        .filter(|p| !p.value.matches(&p.default))
        .map(|p| (p.name.clone(), p.value.clone()))
        .collect();
    prop_assert_eq!(session.minimal_kwargs(), expected.as_slice());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn schema_values_stay_members_across_axis_changes(
        columns in column_names(),
        index in index_labels(),
        template in 0usize..TEMPLATES.len(),
        axes in prop::collection::vec(axis(), 1..4),
    ) {
        let dataset = Dataset::new("df", SchemaSnapshot::new(columns.clone(), index));
        let mut session = select(TEMPLATES[template], &columns[0], &dataset);
        assert_consistent(&session)?;

        for axis in axes {
            session.set_axis(axis).unwrap();
            prop_assert_eq!(session.axis(), axis);
            if let Some(param) = session.parameter("axis") {
                prop_assert_eq!(&param.value, &Literal::str(axis.as_str()));
            }
            assert_consistent(&session)?;
        }
    }

    #[test]
    fn schema_changes_keep_sessions_consistent(
        before in column_names(),
        after in column_names(),
        index in index_labels(),
    ) {
        let first = Dataset::new("a", SchemaSnapshot::new(before.clone(), index.clone()));
        let second = Dataset::new("b", SchemaSnapshot::new(after.clone(), index));
        let mut session = select("DELETE COLUMN <value>", &before[0], &first);

        session.set_schema(&second).unwrap();
        assert_consistent(&session)?;

        let labels = &session.parameter("labels").unwrap().value;
        if after.contains(&before[0]) {
            prop_assert_eq!(labels, &Literal::str(before[0].as_str()));
        } else {
            prop_assert_eq!(labels, &Literal::str(after[0].as_str()));
        }
    }
}
