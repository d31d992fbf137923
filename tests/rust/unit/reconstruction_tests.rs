//! Row-to-tree reconstruction through the public API
//!
//! Covers flat, grouped and nested grouped schemas, ungrouped parents of
//! grouped children and both grouping-consistency modes.

#[cfg(test)]
mod reconstruction_tests {
    use serde_json::{json, Value};

    use sparqltree::mapper::{
        reconstruct, reconstruct_with_report, MappingError, OutputValue, RowTable,
    };
    use sparqltree::model::{FieldSpec, Node, TruthinessRule};

    fn to_json(node: &Node, table: &RowTable) -> Value {
        let objects = reconstruct(node, table).expect("reconstruction should succeed");
        serde_json::to_value(objects).unwrap()
    }

    fn xy_rows() -> RowTable {
        RowTable::from_json_rows(&[
            json!({"x": 1, "y": 2}),
            json!({"x": 1, "y": 3}),
            json!({"x": 2, "y": 4}),
        ])
    }

    #[test]
    fn test_flat_ungrouped_rows_map_one_to_one() {
        let node = Node::builder("Flat")
            .field(FieldSpec::scalar("x"))
            .field(FieldSpec::scalar("y"))
            .build()
            .unwrap();

        assert_eq!(
            to_json(&node, &xy_rows()),
            json!([{"x": 1, "y": 2}, {"x": 1, "y": 3}, {"x": 2, "y": 4}])
        );
    }

    #[test]
    fn test_grouped_scalar_aggregate() {
        let node = Node::builder("Grouped")
            .group_by("x")
            .field(FieldSpec::scalar("x"))
            .field(FieldSpec::scalar_list("y"))
            .build()
            .unwrap();

        assert_eq!(
            to_json(&node, &xy_rows()),
            json!([{"x": 1, "y": [2, 3]}, {"x": 2, "y": [4]}])
        );
    }

    fn author_schema() -> Node {
        let work = Node::builder("Work")
            .group_by("name")
            .field(FieldSpec::scalar("name").with_binding("work_name"))
            .field(FieldSpec::scalar_list("viafs").with_binding("viaf"))
            .build()
            .unwrap();

        Node::builder("Author")
            .group_by("surname")
            .field(FieldSpec::scalar("surname"))
            .field(FieldSpec::object_list("works", work))
            .build()
            .unwrap()
    }

    #[test]
    fn test_nested_grouped_aggregate_with_duplicates() {
        let table = RowTable::from_json_rows(&[
            json!({"surname": "Rilke", "work_name": "Duineser Elegien", "viaf": "v1"}),
            json!({"surname": "Rilke", "work_name": "Duineser Elegien", "viaf": "v2"}),
            json!({"surname": "Rilke", "work_name": "Duineser Elegien", "viaf": "v1"}),
            json!({"surname": "Rilke", "work_name": "Stundenbuch", "viaf": "v3"}),
            json!({"surname": "Rilke", "work_name": "Stundenbuch", "viaf": "v3"}),
            json!({"surname": "Rilke", "work_name": "Stundenbuch", "viaf": "v4"}),
        ]);

        assert_eq!(
            to_json(&author_schema(), &table),
            json!([{
                "surname": "Rilke",
                "works": [
                    {"name": "Duineser Elegien", "viafs": ["v1", "v2"]},
                    {"name": "Stundenbuch", "viafs": ["v3", "v4"]}
                ]
            }])
        );
    }

    #[test]
    fn test_nested_groups_are_scoped_to_their_parent() {
        let table = RowTable::from_json_rows(&[
            json!({"surname": "Rilke", "work_name": "Gedichte", "viaf": "v1"}),
            json!({"surname": "Trakl", "work_name": "Gedichte", "viaf": "v2"}),
        ]);

        assert_eq!(
            to_json(&author_schema(), &table),
            json!([
                {"surname": "Rilke", "works": [{"name": "Gedichte", "viafs": ["v1"]}]},
                {"surname": "Trakl", "works": [{"name": "Gedichte", "viafs": ["v2"]}]}
            ])
        );
    }

    #[test]
    fn test_unbound_list_values_are_skipped() {
        let table = RowTable::from_json_rows(&[
            json!({"surname": "Rilke", "work_name": "Gedichte", "viaf": null}),
            json!({"surname": "Rilke", "work_name": "Gedichte", "viaf": "v1"}),
        ]);

        assert_eq!(
            to_json(&author_schema(), &table),
            json!([{"surname": "Rilke", "works": [{"name": "Gedichte", "viafs": ["v1"]}]}])
        );
    }

    #[test]
    fn test_object_list_with_truthiness_field_drops_empty_objects() {
        let work = Node::builder("Work")
            .group_by("name")
            .field(FieldSpec::scalar("name").with_binding("work_name"))
            .field(FieldSpec::scalar_list("viafs").with_binding("viaf"))
            .truthiness(TruthinessRule::Field("name".into()))
            .build()
            .unwrap();
        let author = Node::builder("Author")
            .group_by("surname")
            .field(FieldSpec::scalar("surname"))
            .field(FieldSpec::object_list("works", work))
            .build()
            .unwrap();

        // an author without works still yields an OPTIONAL row with unbound work bindings
        let table = RowTable::from_json_rows(&[
            json!({"surname": "Celan", "work_name": null, "viaf": null}),
        ]);

        assert_eq!(to_json(&author, &table), json!([{"surname": "Celan", "works": []}]));
    }

    #[test]
    fn test_ungrouped_parent_with_grouped_child() {
        let series = Node::builder("Series")
            .group_by("series")
            .field(FieldSpec::scalar("series"))
            .field(FieldSpec::scalar_list("volumes").with_binding("volume"))
            .build()
            .unwrap();
        let book = Node::builder("Book")
            .field(FieldSpec::scalar("title"))
            .field(FieldSpec::object("series", series))
            .build()
            .unwrap();

        let table = RowTable::from_json_rows(&[
            json!({"title": "A", "series": "S1", "volume": 1}),
            json!({"title": "B", "series": "S1", "volume": 2}),
            json!({"title": "C", "series": "S2", "volume": 1}),
        ]);

        assert_eq!(
            to_json(&book, &table),
            json!([
                {"title": "A", "series": {"series": "S1", "volumes": [1, 2]}},
                {"title": "B", "series": {"series": "S1", "volumes": [1, 2]}},
                {"title": "C", "series": {"series": "S2", "volumes": [1]}}
            ])
        );
    }

    #[test]
    fn test_union_field_uses_fallback_for_empty_object() {
        let publisher = Node::builder("Publisher")
            .field(FieldSpec::scalar("publisher"))
            .build()
            .unwrap();
        let book = Node::builder("Book")
            .field(FieldSpec::scalar("title"))
            .field(FieldSpec::object_union(
                "publisher",
                publisher,
                OutputValue::Scalar("unknown".into()),
            ))
            .build()
            .unwrap();

        let table = RowTable::from_json_rows(&[
            json!({"title": "A", "publisher": "Insel"}),
            json!({"title": "B", "publisher": null}),
        ]);

        assert_eq!(
            to_json(&book, &table),
            json!([
                {"title": "A", "publisher": {"publisher": "Insel"}},
                {"title": "B", "publisher": "unknown"}
            ])
        );
    }

    fn series_union_book() -> Node {
        let series = Node::builder("Series")
            .group_by("series")
            .field(FieldSpec::scalar("series"))
            .field(FieldSpec::scalar_list("volumes").with_binding("volume"))
            .truthiness(TruthinessRule::Field("series".into()))
            .build()
            .unwrap();
        Node::builder("Book")
            .field(FieldSpec::scalar("title"))
            .field(FieldSpec::object_union(
                "series",
                series,
                OutputValue::Scalar("standalone".into()),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_union_candidate_from_reverse_partition() {
        let table = RowTable::from_json_rows(&[
            json!({"title": "A", "series": "S1", "volume": 1}),
            json!({"title": "B", "series": null, "volume": null}),
            json!({"title": "C", "series": "S1", "volume": 2}),
            json!({"title": "D", "series": null, "volume": null}),
        ]);

        assert_eq!(
            to_json(&series_union_book(), &table),
            json!([
                {"title": "A", "series": {"series": "S1", "volumes": [1, 2]}},
                {"title": "B", "series": "standalone"},
                {"title": "C", "series": {"series": "S1", "volumes": [1, 2]}},
                {"title": "D", "series": "standalone"}
            ])
        );
    }

    fn author_with_birthplace(enforce: bool) -> Node {
        let place = Node::builder("Place")
            .field(FieldSpec::scalar("city"))
            .build()
            .unwrap();
        Node::builder("Author")
            .group_by("surname")
            .field(FieldSpec::scalar("surname"))
            .field(FieldSpec::object("birthplace", place))
            .field(FieldSpec::scalar_list("works").with_binding("work"))
            .enforce_grouping_consistency(enforce)
            .build()
            .unwrap()
    }

    fn conflicting_birthplaces() -> RowTable {
        RowTable::from_json_rows(&[
            json!({"surname": "Rilke", "city": "Prague", "work": "Gedichte"}),
            json!({"surname": "Rilke", "city": "Vienna", "work": "Elegien"}),
        ])
    }

    #[test]
    fn test_ungrouped_object_must_agree_across_parent_group() {
        let err = reconstruct(&author_with_birthplace(true), &conflicting_birthplaces())
            .unwrap_err();
        assert!(matches!(
            err,
            MappingError::InconsistentGrouping { ref node, ref field, .. }
                if node == "Place" && field == "city"
        ));
    }

    #[test]
    fn test_ungrouped_object_keeps_first_row_when_relaxed() {
        let report =
            reconstruct_with_report(&author_with_birthplace(false), &conflicting_birthplaces())
                .unwrap();

        assert_eq!(
            serde_json::to_value(&report.objects).unwrap(),
            json!([{
                "surname": "Rilke",
                "birthplace": {"city": "Prague"},
                "works": ["Gedichte", "Elegien"]
            }])
        );
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].node, "Place");
        assert_eq!(report.warnings[0].conflicting, "\"Vienna\"");
    }

    #[test]
    fn test_grouped_schema_over_columnless_empty_result() {
        assert_eq!(to_json(&author_schema(), &RowTable::default()), json!([]));
    }

    fn inconsistent_rows() -> RowTable {
        RowTable::from_json_rows(&[
            json!({"x": 1, "y": 2, "z": "a"}),
            json!({"x": 1, "y": 3, "z": "b"}),
        ])
    }

    fn inconsistent_node(enforce: bool) -> Node {
        Node::builder("Model")
            .group_by("x")
            .field(FieldSpec::scalar("x"))
            .field(FieldSpec::scalar("y"))
            .field(FieldSpec::scalar_list("z"))
            .enforce_grouping_consistency(enforce)
            .build()
            .unwrap()
    }

    #[test]
    fn test_inconsistent_grouping_is_an_error_when_enforced() {
        let err = reconstruct(&inconsistent_node(true), &inconsistent_rows()).unwrap_err();
        assert!(matches!(
            err,
            MappingError::InconsistentGrouping { ref node, ref field, .. }
                if node == "Model" && field == "y"
        ));
    }

    #[test]
    fn test_inconsistent_grouping_warns_when_relaxed() {
        let report =
            reconstruct_with_report(&inconsistent_node(false), &inconsistent_rows()).unwrap();

        assert_eq!(
            serde_json::to_value(&report.objects).unwrap(),
            json!([{"x": 1, "y": 2, "z": ["a", "b"]}])
        );
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].field, "y");
        assert_eq!(report.warnings[0].first, "2");
        assert_eq!(report.warnings[0].conflicting, "3");
    }

    #[test]
    fn test_empty_table_yields_no_objects() {
        let table = RowTable::new(vec!["surname".into(), "work_name".into(), "viaf".into()]);
        assert_eq!(to_json(&author_schema(), &table), json!([]));
    }

    #[test]
    fn test_missing_binding_names_field() {
        let table = RowTable::from_json_rows(&[json!({"surname": "Rilke", "viaf": "v1"})]);
        let err = reconstruct(&author_schema(), &table).unwrap_err();
        assert_eq!(
            err,
            MappingError::MissingBinding {
                node: "Work".into(),
                field: "name".into(),
                binding: "work_name".into()
            }
        );
    }
}
