//! Integration tests for the model adapter
//!
//! The executor is mocked; expectations match on the rewritten query text, so
//! each test also pins down which query the adapter sends for which page.

#[cfg(test)]
mod adapter_tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::function;
    use serde_json::{json, Value};

    use sparqltree::mapper::RowTable;
    use sparqltree::model::{FieldSpec, Node, Schema};
    use sparqltree::query::{QueryError, QueryParameters};
    use sparqltree::server::{AdapterError, ExecutionError, QueryExecutor, SparqlModelAdapter};

    mock! {
        pub Endpoint {}

        #[async_trait]
        impl QueryExecutor for Endpoint {
            async fn execute(&self, query: &str) -> Result<RowTable, ExecutionError>;
        }
    }

    const QUERY: &str = "select ?x ?y where {?x <urn:p> ?y}";

    fn grouped_schema() -> Schema {
        Schema::new(
            Node::builder("Model")
                .group_by("x")
                .field(FieldSpec::scalar("x"))
                .field(FieldSpec::scalar_list("y"))
                .build()
                .unwrap(),
        )
        .unwrap()
    }

    fn ungrouped_schema() -> Schema {
        Schema::new(
            Node::builder("Model")
                .field(FieldSpec::scalar("x"))
                .field(FieldSpec::scalar("y"))
                .build()
                .unwrap(),
        )
        .unwrap()
    }

    fn rows(values: &[Value]) -> RowTable {
        RowTable::from_json_rows(values)
    }

    fn expect_count(endpoint: &mut MockEndpoint, count: i64) {
        endpoint
            .expect_execute()
            .with(function(|query: &str| query.contains("as ?cnt")))
            .returning(move |_| Ok(rows(&[json!({ "cnt": count })])));
    }

    fn expect_items(endpoint: &mut MockEndpoint, marker: &'static str, items: Vec<Value>) {
        endpoint
            .expect_execute()
            .with(function(move |query: &str| {
                !query.contains("as ?cnt") && query.contains(marker)
            }))
            .times(1)
            .returning(move |_| Ok(rows(&items)));
    }

    /// Three groups, two per page: the executor answers each page's items
    /// query with exactly the rows of that page's groups.
    fn paginated_endpoint() -> MockEndpoint {
        let mut endpoint = MockEndpoint::new();
        expect_count(&mut endpoint, 3);
        expect_items(
            &mut endpoint,
            "limit 2 offset 0}",
            vec![
                json!({"x": 1, "y": 10}),
                json!({"x": 1, "y": 11}),
                json!({"x": 2, "y": 20}),
            ],
        );
        expect_items(
            &mut endpoint,
            "limit 2 offset 2}",
            vec![json!({"x": 3, "y": 30}), json!({"x": 3, "y": 31})],
        );
        expect_items(&mut endpoint, "limit 2 offset 4}", Vec::new());
        endpoint
    }

    #[tokio::test]
    async fn test_grouped_pagination_is_exact() {
        let adapter =
            SparqlModelAdapter::new(QUERY, grouped_schema(), Arc::new(paginated_endpoint()))
                .unwrap();

        let first = adapter.query(&QueryParameters::new(1, 2)).await.unwrap();
        assert_eq!((first.total, first.pages, first.items.len()), (3, 2, 2));
        assert_eq!(
            serde_json::to_value(&first.items).unwrap(),
            json!([{"x": 1, "y": [10, 11]}, {"x": 2, "y": [20]}])
        );

        let second = adapter.query(&QueryParameters::new(2, 2)).await.unwrap();
        assert_eq!((second.total, second.pages, second.items.len()), (3, 2, 1));
        assert_eq!(
            serde_json::to_value(&second.items).unwrap(),
            json!([{"x": 3, "y": [30, 31]}])
        );

        let beyond = adapter.query(&QueryParameters::new(3, 2)).await.unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 3);
        assert_eq!(beyond.page, 3);
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        for schema in [grouped_schema(), ungrouped_schema()] {
            let mut endpoint = MockEndpoint::new();
            expect_count(&mut endpoint, 4);
            // the endpoint reports no variables for an empty solution sequence
            endpoint
                .expect_execute()
                .with(function(|query: &str| !query.contains("as ?cnt")))
                .times(1)
                .returning(|_| Ok(RowTable::default()));

            let adapter = SparqlModelAdapter::new(QUERY, schema, Arc::new(endpoint)).unwrap();
            let page = adapter.query(&QueryParameters::new(5, 2)).await.unwrap();

            assert!(page.items.is_empty());
            assert_eq!((page.page, page.total, page.pages), (5, 4, 2));
        }
    }

    #[tokio::test]
    async fn test_ungrouped_page_orders_and_counts_rows() {
        let mut endpoint = MockEndpoint::new();
        expect_count(&mut endpoint, 5);
        expect_items(
            &mut endpoint,
            "order by DESC(?y) limit 2 offset 2",
            vec![json!({"x": 1, "y": 3}), json!({"x": 2, "y": 2})],
        );

        let adapter =
            SparqlModelAdapter::new(QUERY, ungrouped_schema(), Arc::new(endpoint)).unwrap();
        let page = adapter
            .query(&QueryParameters::new(2, 2).order_by("y", Some(true)))
            .await
            .unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        assert_eq!(
            serde_json::to_value(&page.items).unwrap(),
            json!([{"x": 1, "y": 3}, {"x": 2, "y": 2}])
        );
    }

    #[tokio::test]
    async fn test_invalid_parameters_fail_before_execution() {
        // no expectations: any executor call panics the mock
        let adapter =
            SparqlModelAdapter::new(QUERY, grouped_schema(), Arc::new(MockEndpoint::new()))
                .unwrap()
                .with_max_page_size(50);

        let err = adapter.query(&QueryParameters::new(1, 51)).await.unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Query(QueryError::InvalidSize { size: 51, max: 50 })
        ));

        let err = adapter
            .query(&QueryParameters::new(1, 10).order_by("nope", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Query(QueryError::InvalidOrderBy { .. })
        ));
    }

    #[tokio::test]
    async fn test_execution_errors_propagate() {
        let mut endpoint = MockEndpoint::new();
        endpoint.expect_execute().returning(|_| {
            Err(ExecutionError::QueryRejected {
                body: "Parse error".into(),
            })
        });

        let adapter =
            SparqlModelAdapter::new(QUERY, grouped_schema(), Arc::new(endpoint)).unwrap();
        assert!(matches!(
            adapter.query(&QueryParameters::default()).await,
            Err(AdapterError::Execution(ExecutionError::QueryRejected { .. }))
        ));
    }

    fn key(field: &str, value: &str) -> BTreeMap<String, String> {
        BTreeMap::from([(field.to_string(), value.to_string())])
    }

    fn item_adapter(answer: Vec<Value>) -> SparqlModelAdapter {
        let mut endpoint = MockEndpoint::new();
        endpoint
            .expect_execute()
            .with(function(|query: &str| {
                query == r#"select ?x ?y where {?x <urn:p> ?y filter (str(?x) = "1") }"#
            }))
            .times(1)
            .returning(move |_| Ok(rows(&answer)));
        SparqlModelAdapter::new(QUERY, grouped_schema(), Arc::new(endpoint)).unwrap()
    }

    #[tokio::test]
    async fn test_get_item_single_group() {
        let adapter = item_adapter(vec![json!({"x": 1, "y": 2}), json!({"x": 1, "y": 3})]);
        let item = adapter.get_item(&key("x", "1"), None, None).await.unwrap();
        assert_eq!(item.to_json(), json!({"x": 1, "y": [2, 3]}));
    }

    #[tokio::test]
    async fn test_get_item_no_results() {
        let adapter = item_adapter(Vec::new());
        assert!(matches!(
            adapter.get_item(&key("x", "1"), None, None).await,
            Err(AdapterError::NoResultsFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_item_multiple_results() {
        // str() comparison matches both the IRI and the literal "1"
        let adapter = item_adapter(vec![
            json!({"x": "1", "y": 2}),
            json!({"x": 1, "y": 3}),
        ]);
        assert!(matches!(
            adapter.get_item(&key("x", "1"), None, None).await,
            Err(AdapterError::MultipleResultsFound { count: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_item_typed_filter() {
        let mut endpoint = MockEndpoint::new();
        endpoint
            .expect_execute()
            .with(function(|query: &str| {
                query.contains(r#"filter (?x = "1"^^<http://www.w3.org/2001/XMLSchema#integer>)"#)
            }))
            .returning(|_| Ok(rows(&[json!({"x": 1, "y": 2})])));
        let adapter =
            SparqlModelAdapter::new(QUERY, grouped_schema(), Arc::new(endpoint)).unwrap();

        let item = adapter
            .get_item(&key("x", "1"), Some("xsd:integer"), None)
            .await
            .unwrap();
        assert_eq!(item.to_json(), json!({"x": 1, "y": [2]}));
    }

    #[tokio::test]
    async fn test_get_item_rejects_unknown_field() {
        let adapter =
            SparqlModelAdapter::new(QUERY, grouped_schema(), Arc::new(MockEndpoint::new()))
                .unwrap();
        assert!(matches!(
            adapter.get_item(&key("z", "1"), None, None).await,
            Err(AdapterError::Query(QueryError::InvalidItemKey { .. }))
        ));
    }
}
