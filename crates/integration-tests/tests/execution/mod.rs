mod ordering;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use engine::{
    registry::{MetaField, MetaInputValue, ObjectType, Registry},
    Request, Schema, Variables,
};
use indoc::indoc;
use integration_tests::{runtime, star_wars::star_wars_registry, star_wars_schema, StarWars};
use serde_json::json;

#[test]
fn hero_with_friends() {
    runtime().block_on(async {
        let response = star_wars_schema()
            .execute("{ hero { id name friends { name } } }")
            .await;

        insta::assert_json_snapshot!(response, @r###"
        {
          "data": {
            "hero": {
              "id": "2001",
              "name": "R2-D2",
              "friends": [
                {
                  "name": "Luke Skywalker"
                },
                {
                  "name": "Han Solo"
                },
                {
                  "name": "Leia Organa"
                }
              ]
            }
          }
        }
        "###);
    });
}

#[test]
fn inline_fragments_apply_to_their_runtime_type() {
    runtime().block_on(async {
        let response = star_wars_schema()
            .execute(
                r#"
                {
                    luke: hero(episode: EMPIRE) { name ... on Droid { primaryFunction } }
                    artoo: hero { name ... on Droid { primaryFunction } }
                }
                "#,
            )
            .await;

        assert_eq!(
            response.to_json(),
            json!({
                "data": {
                    "luke": { "name": "Luke Skywalker" },
                    "artoo": { "name": "R2-D2", "primaryFunction": "Astromech" }
                }
            })
        );
    });
}

#[test]
fn named_fragments_and_typename() {
    runtime().block_on(async {
        let response = star_wars_schema()
            .execute(indoc! {r#"
                query {
                    characters { __typename ...HumanDetails ...DroidDetails }
                }

                fragment HumanDetails on Human { name homePlanet }
                fragment DroidDetails on Droid { name primaryFunction }
            "#})
            .await;

        assert!(response.is_ok(), "{response:?}");
        let characters = response.to_json()["data"]["characters"].clone();
        assert_eq!(characters.as_array().map(Vec::len), Some(7));
        assert_eq!(
            characters[3],
            json!({ "__typename": "Human", "name": "Leia Organa", "homePlanet": "Alderaan" })
        );
        assert_eq!(
            characters[5],
            json!({ "__typename": "Droid", "name": "C-3PO", "primaryFunction": "Protocol" })
        );
    });
}

#[test]
fn union_members() {
    runtime().block_on(async {
        let response = star_wars_schema()
            .execute(
                r#"
                {
                    humans: search(text: "Solo") { ...Result }
                    droids: search(text: "-") { ...Result }
                }

                fragment Result on SearchResult {
                    __typename
                    ... on Human { name }
                    ... on Droid { primaryFunction }
                }
                "#,
            )
            .await;

        assert_eq!(
            response.to_json(),
            json!({
                "data": {
                    "humans": [
                        { "__typename": "Human", "name": "Han Solo" }
                    ],
                    "droids": [
                        { "__typename": "Droid", "primaryFunction": "Protocol" },
                        { "__typename": "Droid", "primaryFunction": "Astromech" }
                    ]
                }
            })
        );
    });
}

#[test]
fn aliases_resolve_separately() {
    runtime().block_on(async {
        let calls = Arc::new(AtomicUsize::new(0));

        let mut registry = Registry::new("Query");
        registry
            .register(
                ObjectType::new("Query").field(
                    MetaField::new("foo", "Int")
                        .argument(MetaInputValue::new("x", "Int"))
                        .resolve_sync({
                            let calls = Arc::clone(&calls);
                            move |_| {
                                calls.fetch_add(1, Ordering::SeqCst);
                                Ok(json!(1))
                            }
                        }),
                ),
            )
            .unwrap();

        let response = Schema::new(registry).execute("{ a: foo b: foo(x: 1) }").await;

        assert_eq!(response.to_json(), json!({ "data": { "a": 1, "b": 1 } }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    });
}

#[test]
fn merged_fields_resolve_once() {
    runtime().block_on(async {
        let schema = star_wars_schema();

        let response = schema.execute("{ counter counter other: counter }").await;
        let data = response.to_json()["data"].clone();

        let keys: Vec<_> = data.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["counter", "other"]);

        let mut counts = vec![data["counter"].as_i64(), data["other"].as_i64()];
        counts.sort();
        assert_eq!(counts, [Some(1), Some(2)]);
    });
}

#[test]
fn nullable_field_errors_are_contained() {
    runtime().block_on(async {
        let response = star_wars_schema().execute("{ failing hero { name } }").await;

        assert_eq!(response.to_json()["data"], json!({ "failing": null, "hero": { "name": "R2-D2" } }));
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "The Death Star exploded");
        assert_eq!(response.to_json()["errors"][0]["path"], json!(["failing"]));
    });
}

#[test]
fn non_null_errors_reach_the_root() {
    runtime().block_on(async {
        let response = star_wars_schema().execute("{ hero { name } failingRequired }").await;

        insta::assert_json_snapshot!(response, @r###"
        {
          "data": null,
          "errors": [
            {
              "message": "The Death Star exploded",
              "locations": [
                {
                  "line": 1,
                  "column": 17
                }
              ],
              "path": [
                "failingRequired"
              ],
              "extensions": {
                "code": "BOOM"
              }
            }
          ]
        }
        "###);
    });
}

#[test]
fn nulls_stop_at_the_nearest_nullable_parent() {
    runtime().block_on(async {
        let mut registry = Registry::new("Query");
        registry
            .register(
                ObjectType::new("Query").field(
                    MetaField::new("ship", "Ship").resolve_sync(|_| Ok(json!({ "name": null, "crew": [1, null] }))),
                ),
            )
            .unwrap();
        registry
            .register(
                ObjectType::new("Ship")
                    .field(MetaField::new("name", "String!"))
                    .field(MetaField::new("crew", "[Int]!")),
            )
            .unwrap();
        let schema = Schema::new(registry);

        let response = schema.execute("{ ship { crew } }").await;
        assert_eq!(response.to_json(), json!({ "data": { "ship": { "crew": [1, null] } } }));

        let response = schema.execute("{ ship { crew name } }").await;
        assert_eq!(response.to_json()["data"], json!({ "ship": null }));
        assert_eq!(
            response.errors[0].message,
            "An error occurred while fetching `name`, a non-nullable value was expected but no value was found."
        );
        assert_eq!(response.to_json()["errors"][0]["path"], json!(["ship", "name"]));
    });
}

#[test]
fn abstract_types_need_a_concrete_type() {
    runtime().block_on(async {
        let response = star_wars_schema().execute("{ human(id: \"2000\") { name } }").await;
        assert_eq!(response.to_json(), json!({ "data": { "human": null } }));

        let response = star_wars_schema().execute("{ droid(id: \"2000\") { name } }").await;
        assert_eq!(response.to_json(), json!({ "data": { "droid": { "name": "C-3PO" } } }));
    });
}

#[test]
fn variables_and_defaults() {
    runtime().block_on(async {
        let schema = star_wars_schema();

        let request = Request::new("query Hero($episode: Episode) { hero(episode: $episode) { name } }")
            .variables(Variables::from_json(json!({ "episode": "EMPIRE" })));
        let response = schema.execute(request).await;
        assert_eq!(response.to_json(), json!({ "data": { "hero": { "name": "Luke Skywalker" } } }));

        let response = schema
            .execute("query Hero($episode: Episode = EMPIRE) { hero(episode: $episode) { name } }")
            .await;
        assert_eq!(response.to_json(), json!({ "data": { "hero": { "name": "Luke Skywalker" } } }));

        let response = schema
            .execute("query Human($id: ID!) { human(id: $id) { name } }")
            .await;
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
    });
}

#[test]
fn operation_selection() {
    runtime().block_on(async {
        let schema = star_wars_schema();
        let document = "query A { hero { name } } query B { droid(id: \"2000\") { name } }";

        let response = schema.execute(Request::new(document).with_operation_name("B")).await;
        assert_eq!(response.to_json(), json!({ "data": { "droid": { "name": "C-3PO" } } }));

        let response = schema.execute(document).await;
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
    });
}

#[test]
fn unknown_fields_fail_the_parent() {
    runtime().block_on(async {
        let response = star_wars_schema().execute("{ hero { name starship } }").await;

        assert_eq!(response.to_json()["data"], json!({ "hero": null }));
        assert_eq!(
            response.errors[0].message,
            r#"Cannot query field "starship" on type "Droid"."#
        );
    });
}

#[test]
fn mutations_run_in_document_order() {
    runtime().block_on(async {
        let star_wars = StarWars::default();
        let reviews = star_wars.reviews();
        let schema = Schema::build(star_wars_registry()).data(star_wars).finish();

        let response = schema
            .execute(
                r#"
                mutation {
                    first: createReview(episode: NEWHOPE, stars: 5) { stars }
                    second: createReview(episode: EMPIRE, stars: 4, commentary: "Dark") { stars commentary }
                    third: createReview(episode: JEDI, stars: 3) { episode }
                }
                "#,
            )
            .await;

        assert_eq!(
            response.to_json(),
            json!({
                "data": {
                    "first": { "stars": 5 },
                    "second": { "stars": 4, "commentary": "Dark" },
                    "third": { "episode": "JEDI" }
                }
            })
        );

        let episodes: Vec<_> = reviews
            .lock()
            .unwrap()
            .iter()
            .map(|review| review["episode"].clone())
            .collect();
        assert_eq!(episodes, vec![json!("NEWHOPE"), json!("EMPIRE"), json!("JEDI")]);
    });
}
