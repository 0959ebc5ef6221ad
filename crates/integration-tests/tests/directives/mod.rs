use engine::{
    registry::{DirectiveContext, DirectiveHandler, DirectiveLocation, MetaDirective, MetaInputValue},
    ConstValue, Error, Request, ResponseValue, Schema, Variables,
};
use integration_tests::{runtime, star_wars::star_wars_schema_builder, star_wars_schema};
use serde_json::json;

#[test]
fn skip_and_include() {
    runtime().block_on(async {
        let schema = star_wars_schema();

        let request = Request::new(
            r#"
            query Hero($skipName: Boolean!, $withFriends: Boolean = false) {
                hero {
                    id
                    name @skip(if: $skipName)
                    appearsIn @include(if: true)
                    friends @include(if: $withFriends) { name }
                    ... on Droid @skip(if: true) { primaryFunction }
                }
            }
            "#,
        )
        .variables(Variables::from_json(json!({ "skipName": true })));

        let response = schema.execute(request).await;

        assert_eq!(
            response.to_json(),
            json!({
                "data": {
                    "hero": { "id": "2001", "appearsIn": ["NEWHOPE", "EMPIRE", "JEDI"] }
                }
            })
        );
    });
}

#[test]
fn skip_wins_over_include() {
    runtime().block_on(async {
        let response = star_wars_schema()
            .execute("{ hero { id name @skip(if: true) @include(if: true) } droid(id: \"2000\") @skip(if: false) { name } }")
            .await;

        assert_eq!(
            response.to_json(),
            json!({ "data": { "hero": { "id": "2001" }, "droid": { "name": "C-3PO" } } })
        );
    });
}

#[test]
fn skipped_fragment_spreads() {
    runtime().block_on(async {
        let response = star_wars_schema()
            .execute(
                r#"
                query { hero { name ...Details @skip(if: true) } }
                fragment Details on Character { id }
                "#,
            )
            .await;

        assert_eq!(response.to_json(), json!({ "data": { "hero": { "name": "R2-D2" } } }));
    });
}

struct Upper;

impl DirectiveHandler for Upper {
    fn resolve(&self, _ctx: &DirectiveContext<'_>, value: ResponseValue) -> Result<ResponseValue, Error> {
        match value {
            ResponseValue::Primitive(ConstValue::String(text)) => {
                Ok(ResponseValue::Primitive(ConstValue::String(text.to_uppercase())))
            }
            ResponseValue::Null => Ok(value),
            _ => Err(Error::new("@upper only applies to strings")),
        }
    }
}

/// Drops `null` values from the response.
struct OmitNull;

impl DirectiveHandler for OmitNull {
    fn include_after(&self, _ctx: &DirectiveContext<'_>, value: &ResponseValue) -> bool {
        !value.is_null()
    }
}

/// Keeps a field only when its `flag` argument is in the enabled list.
struct Feature(Vec<&'static str>);

impl DirectiveHandler for Feature {
    fn include_before(&self, ctx: &DirectiveContext<'_>) -> bool {
        ctx.args
            .get_as::<String>("flag")
            .ok()
            .flatten()
            .is_some_and(|flag| self.0.contains(&flag.as_str()))
    }
}

fn schema_with_custom_directives() -> Schema {
    star_wars_schema_builder()
        .directive(MetaDirective::new("upper", [DirectiveLocation::Field]).with_handler(Upper))
        .directive(MetaDirective::new("omitNull", [DirectiveLocation::Field]).with_handler(OmitNull))
        .directive(
            MetaDirective::new(
                "feature",
                [DirectiveLocation::Field, DirectiveLocation::InlineFragment],
            )
            .argument(MetaInputValue::new("flag", "String!"))
            .with_handler(Feature(vec!["planets"])),
        )
        .finish()
}

#[test]
fn custom_directive_rewrites_values() {
    runtime().block_on(async {
        let response = schema_with_custom_directives()
            .execute("{ hero { name @upper shout: name @upper id } }")
            .await;

        assert_eq!(
            response.to_json(),
            json!({ "data": { "hero": { "name": "R2-D2", "shout": "R2-D2", "id": "2001" } } })
        );

        let response = schema_with_custom_directives()
            .execute("{ human(id: \"1000\") { name @upper } }")
            .await;

        assert_eq!(
            response.to_json(),
            json!({ "data": { "human": { "name": "LUKE SKYWALKER" } } })
        );
    });
}

#[test]
fn custom_directive_failures_follow_nullability() {
    runtime().block_on(async {
        let response = schema_with_custom_directives()
            .execute("{ human(id: \"1000\") { name appearsIn @upper } }")
            .await;

        assert_eq!(response.to_json()["data"], json!({ "human": null }));
        assert_eq!(response.errors[0].message, "@upper only applies to strings");
        assert_eq!(response.to_json()["errors"][0]["path"], json!(["human", "appearsIn"]));
    });
}

#[test]
fn custom_directive_decides_inclusion() {
    runtime().block_on(async {
        let schema = schema_with_custom_directives();

        let response = schema
            .execute(
                r#"
                {
                    luke: human(id: "1000") { name homePlanet @omitNull }
                    han: human(id: "1002") { name homePlanet @omitNull }
                }
                "#,
            )
            .await;
        assert_eq!(
            response.to_json(),
            json!({
                "data": {
                    "luke": { "name": "Luke Skywalker", "homePlanet": "Tatooine" },
                    "han": { "name": "Han Solo" }
                }
            })
        );

        let response = schema
            .execute(
                r#"
                {
                    human(id: "1003") {
                        name
                        homePlanet @feature(flag: "planets")
                        friends @feature(flag: "friends") { name }
                        ... on Human @feature(flag: "ids") { id }
                    }
                }
                "#,
            )
            .await;
        assert_eq!(
            response.to_json(),
            json!({ "data": { "human": { "name": "Leia Organa", "homePlanet": "Alderaan" } } })
        );
    });
}
