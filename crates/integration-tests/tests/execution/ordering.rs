use std::time::Duration;

use engine::{
    registry::{MetaField, MetaInputValue, ObjectType, Registry, ResolverFuture},
    Error, Schema,
};
use integration_tests::{runtime, star_wars_schema};
use rand::Rng;

#[test]
fn keys_follow_the_document_whatever_the_resolver_timing() {
    runtime().block_on(async {
        let schema = star_wars_schema();

        for _ in 0..20 {
            let response = schema.execute("{ timing { e d c b a } last: timing { z: a y: b } }").await;
            assert!(response.is_ok(), "{response:?}");

            let data = response.to_json()["data"].clone();
            let keys: Vec<_> = data["timing"]
                .as_object()
                .unwrap()
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            assert_eq!(keys, ["e=5", "d=4", "c=3", "b=2", "a=1"]);

            let keys: Vec<_> = data["last"].as_object().unwrap().keys().cloned().collect();
            assert_eq!(keys, ["z", "y"]);

            let roots: Vec<_> = data.as_object().unwrap().keys().cloned().collect();
            assert_eq!(roots, ["timing", "last"]);
        }
    });
}

#[test]
fn list_items_keep_their_order() {
    runtime().block_on(async {
        let response = star_wars_schema()
            .execute("{ characters { name } }")
            .await;

        let names: Vec<_> = response.to_json()["data"]["characters"]
            .as_array()
            .unwrap()
            .iter()
            .map(|character| character["name"].as_str().unwrap_or_default().to_string())
            .collect();

        assert_eq!(
            names,
            [
                "Luke Skywalker",
                "Darth Vader",
                "Han Solo",
                "Leia Organa",
                "Wilhuff Tarkin",
                "C-3PO",
                "R2-D2"
            ]
        );
    });
}

#[test]
fn fragments_place_keys_at_their_first_occurrence() {
    runtime().block_on(async {
        let schema = star_wars_schema();
        let query = r#"
            { ...Timings timing { e } x: timing { a } }
            fragment Timings on Query { x: timing { b } timing { d c } }
        "#;

        for _ in 0..20 {
            let response = schema.execute(query).await;

            assert_eq!(
                serde_json::to_string(&response).unwrap(),
                r#"{"data":{"x":{"b":2,"a":1},"timing":{"d":4,"c":3,"e":5}}}"#
            );
        }
    });
}

#[test]
fn sibling_errors_follow_the_document() {
    runtime().block_on(async {
        let mut registry = Registry::new("Query");
        registry
            .register(
                ObjectType::new("Query").field(
                    MetaField::new("engine", "String!")
                        .argument(MetaInputValue::new("n", "Int!"))
                        .resolve(|ctx| {
                            ResolverFuture::new(async move {
                                let delay = rand::thread_rng().gen_range(0..20);
                                tokio::time::sleep(Duration::from_millis(delay)).await;
                                let n = ctx.args.get_as::<i64>("n")?.unwrap_or_default();
                                Err(Error::new(format!("Engine {n} failed")))
                            })
                        }),
                ),
            )
            .unwrap();
        let schema = Schema::new(registry);

        for _ in 0..20 {
            let response = schema
                .execute("{ a: engine(n: 1) b: engine(n: 2) c: engine(n: 3) }")
                .await;

            let messages: Vec<_> = response.errors.iter().map(|error| error.message.as_str()).collect();
            assert_eq!(messages, ["Engine 1 failed", "Engine 2 failed", "Engine 3 failed"]);
            assert_eq!(response.to_json()["data"], serde_json::Value::Null);
        }
    });
}
