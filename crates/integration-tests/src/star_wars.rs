//! The Star Wars schema used across the tests.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use engine::{
    registry::{
        EnumType, InterfaceType, MetaField, MetaInputValue, MetaType, ObjectType, Registry, ResolverContext,
        ResolverFuture, SubscriptionSource, UnionType,
    },
    Error, Filter, Schema, SchemaBuilder,
};
use rand::Rng;
use serde_json::{json, Value};

/// Schema data: the characters, and the reviews the mutations created.
#[derive(Debug)]
pub struct StarWars {
    characters: Vec<Value>,
    reviews: Arc<Mutex<Vec<Value>>>,
}

impl Default for StarWars {
    fn default() -> Self {
        let characters = vec![
            json!({
                "__typename": "Human", "id": "1000", "name": "Luke Skywalker",
                "friends": ["1002", "1003", "2000", "2001"], "appearsIn": ["NEWHOPE", "EMPIRE", "JEDI"],
                "homePlanet": "Tatooine"
            }),
            json!({
                "__typename": "Human", "id": "1001", "name": "Darth Vader",
                "friends": ["1004"], "appearsIn": ["NEWHOPE", "EMPIRE", "JEDI"],
                "homePlanet": "Tatooine"
            }),
            json!({
                "__typename": "Human", "id": "1002", "name": "Han Solo",
                "friends": ["1000", "1003", "2001"], "appearsIn": ["NEWHOPE", "EMPIRE", "JEDI"],
                "homePlanet": null
            }),
            json!({
                "__typename": "Human", "id": "1003", "name": "Leia Organa",
                "friends": ["1000", "1002", "2000", "2001"], "appearsIn": ["NEWHOPE", "EMPIRE", "JEDI"],
                "homePlanet": "Alderaan"
            }),
            json!({
                "__typename": "Human", "id": "1004", "name": "Wilhuff Tarkin",
                "friends": ["1001"], "appearsIn": ["NEWHOPE"],
                "homePlanet": null
            }),
            json!({
                "__typename": "Droid", "id": "2000", "name": "C-3PO",
                "friends": ["1000", "1002", "1003", "2001"], "appearsIn": ["NEWHOPE", "EMPIRE", "JEDI"],
                "primaryFunction": "Protocol"
            }),
            json!({
                "__typename": "Droid", "id": "2001", "name": "R2-D2",
                "friends": ["1000", "1002", "1003"], "appearsIn": ["NEWHOPE", "EMPIRE", "JEDI"],
                "primaryFunction": "Astromech"
            }),
        ];

        Self {
            characters,
            reviews: Arc::default(),
        }
    }
}

impl StarWars {
    /// Reviews created by mutations, in the order they were created.
    pub fn reviews(&self) -> Arc<Mutex<Vec<Value>>> {
        Arc::clone(&self.reviews)
    }

    pub fn character(&self, id: &str) -> Option<&Value> {
        self.characters.iter().find(|character| character["id"] == id)
    }

    /// Luke is the hero of The Empire Strikes Back, R2-D2 of every other episode.
    fn hero(&self, episode: Option<&str>) -> Value {
        let id = match episode {
            Some("EMPIRE") => "1000",
            _ => "2001",
        };
        self.character(id).cloned().unwrap_or_default()
    }

    fn friends(&self, character: &Value) -> Value {
        let friends = character["friends"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|id| id.as_str().and_then(|id| self.character(id)))
            .cloned()
            .collect();

        Value::Array(friends)
    }
}

fn character_fields() -> Vec<MetaField> {
    vec![
        MetaField::new("id", "ID!"),
        MetaField::new("name", "String!"),
        MetaField::new("friends", "[Character]").resolve_sync(|ctx| {
            let star_wars = ctx.data_or_err::<StarWars>()?;
            Ok(star_wars.friends(ctx.parent_value()))
        }),
        MetaField::new("appearsIn", "[Episode!]!"),
    ]
}

/// A field taking a random time to resolve.
fn delayed(name: &str, ty: &str) -> MetaField {
    MetaField::new(name, ty).resolve(|ctx| {
        ResolverFuture::new(async move {
            let delay = rand::thread_rng().gen_range(0..20);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(ctx.parent_value()[ctx.field.name.as_str()].clone())
        })
    })
}

pub fn star_wars_registry() -> Registry {
    let mut registry = Registry::new("Query")
        .with_mutation_type("Mutation")
        .with_subscription_type("Subscription");

    let types: [MetaType; 10] = [
        EnumType::new("Episode", ["NEWHOPE", "EMPIRE", "JEDI"]).into(),
        character_fields()
            .into_iter()
            .fold(InterfaceType::new("Character"), InterfaceType::field)
            .into(),
        character_fields()
            .into_iter()
            .fold(ObjectType::new("Human").implements("Character"), ObjectType::field)
            .field(MetaField::new("homePlanet", "String"))
            .into(),
        character_fields()
            .into_iter()
            .fold(ObjectType::new("Droid").implements("Character"), ObjectType::field)
            .field(MetaField::new("primaryFunction", "String"))
            .into(),
        UnionType::new("SearchResult", ["Human", "Droid"]).into(),
        ObjectType::new("Review")
            .field(MetaField::new("episode", "Episode!"))
            .field(MetaField::new("stars", "Int!"))
            .field(MetaField::new("commentary", "String"))
            .into(),
        ObjectType::new("Timing")
            .field(delayed("a", "Int"))
            .field(delayed("b", "Int"))
            .field(delayed("c", "Int"))
            .field(delayed("d", "Int"))
            .field(delayed("e", "Int"))
            .into(),
        query_type().into(),
        mutation_type().into(),
        subscription_type().into(),
    ];

    for ty in types {
        if let Err(error) = registry.register(ty) {
            panic!("{error}");
        }
    }

    registry
}

fn query_type() -> ObjectType {
    ObjectType::new("Query")
        .field(
            MetaField::new("hero", "Character")
                .argument(MetaInputValue::new("episode", "Episode"))
                .resolve_sync(|ctx| {
                    let star_wars = ctx.data_or_err::<StarWars>()?;
                    let episode = ctx.args.get_as::<String>("episode")?;
                    Ok(star_wars.hero(episode.as_deref()))
                }),
        )
        .field(
            MetaField::new("human", "Human")
                .argument(MetaInputValue::new("id", "ID!"))
                .resolve_sync(|ctx| character_by_id(&ctx, "Human")),
        )
        .field(
            MetaField::new("droid", "Droid")
                .argument(MetaInputValue::new("id", "ID!"))
                .resolve_sync(|ctx| character_by_id(&ctx, "Droid")),
        )
        .field(MetaField::new("characters", "[Character!]!").resolve_sync(|ctx| {
            let star_wars = ctx.data_or_err::<StarWars>()?;
            Ok(Value::Array(star_wars.characters.clone()))
        }))
        .field(
            MetaField::new("search", "[SearchResult!]!")
                .argument(MetaInputValue::new("text", "String!"))
                .resolve_sync(|ctx| {
                    let star_wars = ctx.data_or_err::<StarWars>()?;
                    let text = ctx.args.get_as::<String>("text")?.unwrap_or_default();
                    let found = star_wars
                        .characters
                        .iter()
                        .filter(|character| character["name"].as_str().is_some_and(|name| name.contains(&text)))
                        .cloned()
                        .collect();
                    Ok(Value::Array(found))
                }),
        )
        .field(MetaField::new("timing", "Timing!").resolve_sync(|_| {
            Ok(json!({ "a": 1, "b": 2, "c": 3, "d": 4, "e": 5 }))
        }))
        .field(
            MetaField::new("failing", "String").resolve_sync(|_| Err(Error::new("The Death Star exploded"))),
        )
        .field(
            MetaField::new("failingRequired", "String!")
                .resolve_sync(|_| Err(Error::new("The Death Star exploded").with_extension("code", "BOOM"))),
        )
        .field(MetaField::new("counter", "Int").resolve_sync(|ctx| {
            let counter = ctx.data_or_err::<Arc<Mutex<i64>>>()?;
            let mut counter = counter.lock().map_err(|error| Error::new(error.to_string()))?;
            *counter += 1;
            Ok(json!(*counter))
        }))
}

fn character_by_id(ctx: &ResolverContext<'_>, typename: &str) -> Result<Value, Error> {
    let star_wars = ctx.data_or_err::<StarWars>()?;
    let id = ctx.args.get_as::<String>("id")?.unwrap_or_default();

    Ok(star_wars
        .character(&id)
        .filter(|character| character["__typename"] == typename)
        .cloned()
        .unwrap_or_default())
}

fn mutation_type() -> ObjectType {
    ObjectType::new("Mutation").field(
        MetaField::new("createReview", "Review")
            .argument(MetaInputValue::new("episode", "Episode!"))
            .argument(MetaInputValue::new("stars", "Int!"))
            .argument(MetaInputValue::new("commentary", "String"))
            .resolve(|ctx| {
                ResolverFuture::new(async move {
                    let delay = rand::thread_rng().gen_range(0..20);
                    tokio::time::sleep(Duration::from_millis(delay)).await;

                    let review = json!({
                        "episode": ctx.args.get_as::<String>("episode")?,
                        "stars": ctx.args.get_as::<i64>("stars")?,
                        "commentary": ctx.args.get_as::<String>("commentary")?,
                    });

                    let star_wars = ctx.data_or_err::<StarWars>()?;
                    star_wars
                        .reviews
                        .lock()
                        .map_err(|error| Error::new(error.to_string()))?
                        .push(review.clone());

                    Ok(review)
                })
            }),
    )
}

/// Subscriptions listen on the `characters` channel, optionally filtered on the episodes the
/// published character appears in.
fn subscription_type() -> ObjectType {
    ObjectType::new("Subscription").field(
        MetaField::new("characterChanged", "Character")
            .argument(MetaInputValue::new("episode", "Episode"))
            .subscribe_to(SubscriptionSource::new("characters").with_filter(|args| {
                match args.get_as::<String>("episode").ok().flatten() {
                    Some(episode) => Filter::contains("appearsIn", episode),
                    None => Filter::All,
                }
            })),
    )
}

pub fn star_wars_schema_builder() -> SchemaBuilder {
    Schema::build(star_wars_registry())
        .data(StarWars::default())
        .data(Arc::new(Mutex::new(0_i64)))
}

pub fn star_wars_schema() -> Schema {
    star_wars_schema_builder().finish()
}
