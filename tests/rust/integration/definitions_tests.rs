//! Integration tests for declarative definitions
//!
//! Definitions are loaded from YAML, resolved into schemas and turned into
//! served endpoints.

#[cfg(test)]
mod definitions_tests {
    use std::io::Write;
    use std::sync::Arc;

    use serde_json::json;
    use sparqltree::config::ServerConfig;
    use sparqltree::mapper::{reconstruct, RowTable};
    use sparqltree::model::{Definitions, RootTruthinessPolicy, SchemaError};
    use sparqltree::server::{AdapterError, AppState, ExecutionError, QueryExecutor};

    const AUTHORS_YAML: &str = r#"
models:
  Author:
    group_by: surname
    fields:
      - name: surname
      - name: works
        kind: object_list
        model: Work
  Work:
    group_by: name
    truthiness: name
    fields:
      - name: name
        binding: work_name
      - name: viafs
        kind: scalar_list
        binding: viaf

endpoints:
  - name: authors
    model: Author
    description: Authors with their works
    query: |
      select ?surname ?work_name ?viaf where {
        ?author <urn:surname> ?surname .
        optional { ?work <urn:author> ?author ; <urn:title> ?work_name .
                   optional { ?work <urn:viaf> ?viaf } }
      }
"#;

    #[test]
    fn test_definitions_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(AUTHORS_YAML.as_bytes()).unwrap();

        let definitions = Definitions::from_yaml_file(file.path()).unwrap();
        assert_eq!(definitions.models.len(), 2);
        assert_eq!(definitions.endpoints.len(), 1);
        assert!(definitions.validate().is_ok());
    }

    #[test]
    fn test_missing_definitions_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Definitions::from_yaml_file(dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(SchemaError::ConfigReadError { .. })));
    }

    #[test]
    fn test_schema_from_definitions_reconstructs_rows() {
        let definitions = Definitions::from_yaml_str(AUTHORS_YAML).unwrap();
        let schema = definitions
            .build_schema("Author", RootTruthinessPolicy::Reject)
            .unwrap();

        let table = RowTable::from_json_rows(&[
            json!({"surname": "Rilke", "work_name": "Stundenbuch", "viaf": "v1"}),
            json!({"surname": "Rilke", "work_name": "Stundenbuch", "viaf": "v1"}),
            json!({"surname": "Celan", "work_name": null, "viaf": null}),
        ]);

        let objects = reconstruct(schema.root(), &table).unwrap();
        assert_eq!(
            serde_json::to_value(objects).unwrap(),
            json!([
                {"surname": "Rilke", "works": [{"name": "Stundenbuch", "viafs": ["v1"]}]},
                {"surname": "Celan", "works": []}
            ])
        );
    }

    #[test]
    fn test_root_truthiness_policy_applies_to_definitions() {
        let yaml = r#"
models:
  Book:
    truthiness: title
    fields:
      - name: title
"#;
        let definitions = Definitions::from_yaml_str(yaml).unwrap();
        assert_eq!(
            definitions
                .build_schema("Book", RootTruthinessPolicy::Reject)
                .unwrap_err(),
            SchemaError::RootTruthiness {
                node: "Book".into()
            }
        );

        let schema = definitions
            .build_schema("Book", RootTruthinessPolicy::Warn)
            .unwrap();
        assert!(!schema.root().has_truthiness_rule());
    }

    #[test]
    fn test_invalid_group_by_in_definitions() {
        let yaml = r#"
models:
  Author:
    group_by: works
    fields:
      - name: surname
      - name: works
        kind: scalar_list
"#;
        let definitions = Definitions::from_yaml_str(yaml).unwrap();
        assert!(matches!(
            definitions.build_node("Author"),
            Err(SchemaError::InvalidGroupBy { ref key, .. }) if key == "works"
        ));
    }

    struct Unused;

    #[async_trait::async_trait]
    impl QueryExecutor for Unused {
        async fn execute(&self, _query: &str) -> Result<RowTable, ExecutionError> {
            Ok(RowTable::default())
        }
    }

    #[test]
    fn test_app_state_shares_executors_per_url() {
        let yaml = format!(
            "{}  - name: authors_mirror\n    model: Author\n    sparql_endpoint: https://mirror.example.org/sparql\n    query: \"select * where {{?surname <urn:p> ?work_name . ?work_name <urn:q> ?viaf}}\"\n  - name: authors_copy\n    model: Author\n    query: \"select * where {{?surname <urn:p> ?work_name . ?work_name <urn:q> ?viaf}}\"\n",
            AUTHORS_YAML
        );
        let definitions = Definitions::from_yaml_str(&yaml).unwrap();

        let mut requested = Vec::new();
        let state = AppState::new(&definitions, ServerConfig::default(), |url| {
            requested.push(url.to_string());
            Ok(Arc::new(Unused) as Arc<dyn QueryExecutor>)
        })
        .unwrap();

        assert_eq!(state.endpoints.len(), 3);
        assert_eq!(
            requested,
            vec![
                "http://localhost:3030/sparql".to_string(),
                "https://mirror.example.org/sparql".to_string()
            ]
        );
        let info = &state.endpoints["authors"].info;
        assert!(info.grouped);
        assert_eq!(info.orderable_fields, vec!["surname".to_string()]);
    }

    #[test]
    fn test_app_state_rejects_unsupported_base_query() {
        let yaml = AUTHORS_YAML.replace("select ?surname ?work_name ?viaf where", "ask");
        let definitions = Definitions::from_yaml_str(&yaml).unwrap();

        let result = AppState::new(&definitions, ServerConfig::default(), |_| {
            Ok(Arc::new(Unused) as Arc<dyn QueryExecutor>)
        });
        assert!(matches!(result, Err(AdapterError::Query(_))));
    }

    #[test]
    fn test_demo_definitions_load() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/definitions.yaml");
        let definitions = Definitions::from_yaml_file(path).unwrap();

        let state = AppState::new(&definitions, ServerConfig::default(), |_| {
            Ok(Arc::new(Unused) as Arc<dyn QueryExecutor>)
        })
        .unwrap();
        let authors = &state.endpoints["authors"];
        assert!(authors.info.grouped);

        let preview = authors
            .adapter
            .preview(&sparqltree::query::QueryParameters::new(1, 5))
            .unwrap();
        assert!(preview
            .count_query
            .contains("select (count(distinct ?author) as ?cnt) where {"));
        assert!(preview
            .items_query
            .contains("{select distinct ?author where {"));
        assert!(preview.items_query.ends_with("} order by ?author"));
    }
}
