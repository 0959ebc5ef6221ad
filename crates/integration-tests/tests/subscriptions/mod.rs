use std::time::Duration;

use engine::{ClientId, Schema};
use futures::{FutureExt, StreamExt};
use integration_tests::{runtime, star_wars_schema, StarWars};
use serde_json::{json, Value};

const BY_EPISODE: &str = "subscription Changed($episode: Episode) { characterChanged(episode: $episode) { name } }";

fn character(id: &str) -> Value {
    StarWars::default().character(id).cloned().unwrap()
}

fn subscribe(schema: &Schema, episode: &str, operation_id: &str) -> engine::ResponseStream {
    let request = engine::Request::new(BY_EPISODE)
        .variables(engine::Variables::from_json(json!({ "episode": episode })));

    schema.subscribe(request, ClientId::new("session", operation_id)).unwrap()
}

#[test]
fn filtered_subscription() {
    runtime().block_on(async {
        let schema = star_wars_schema();
        let mut stream = subscribe(&schema, "EMPIRE", "1");

        // Tarkin only appears in A New Hope.
        assert_eq!(schema.publish("characters", character("1004")), 0);
        assert!(stream.next().now_or_never().is_none());

        assert_eq!(schema.publish("characters", character("1000")), 1);
        let response = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            response.to_json(),
            json!({ "data": { "characterChanged": { "name": "Luke Skywalker" } } })
        );

        assert_eq!(schema.publish("starships", character("1000")), 0);
        assert!(stream.next().now_or_never().is_none());
    });
}

#[test]
fn unfiltered_subscription_sees_every_event() {
    runtime().block_on(async {
        let schema = star_wars_schema();
        let mut stream = schema.execute_stream("subscription { characterChanged { __typename name } }");

        schema.publish("characters", character("1004"));
        schema.publish("characters", character("2000"));

        let responses: Vec<_> = stream.by_ref().take(2).map(|response| response.to_json()).collect().await;
        assert_eq!(
            responses,
            [
                json!({ "data": { "characterChanged": { "__typename": "Human", "name": "Wilhuff Tarkin" } } }),
                json!({ "data": { "characterChanged": { "__typename": "Droid", "name": "C-3PO" } } }),
            ]
        );
    });
}

#[test]
fn identical_subscriptions_register_once() {
    runtime().block_on(async {
        let schema = star_wars_schema();

        let mut first = subscribe(&schema, "JEDI", "1");
        let mut second = subscribe(&schema, "JEDI", "1");

        assert_eq!(schema.event_bus().subscription_count(), 1);
        assert!(second.next().await.is_none());

        assert_eq!(schema.publish("characters", character("2001")), 1);
        assert!(first.next().await.is_some());

        // Same filter, another client.
        let _other = subscribe(&schema, "JEDI", "2");
        assert_eq!(schema.event_bus().subscription_count(), 2);
    });
}

#[test]
fn dropping_the_stream_unsubscribes() {
    runtime().block_on(async {
        let schema = star_wars_schema();

        let stream = subscribe(&schema, "NEWHOPE", "1");
        assert_eq!(schema.event_bus().subscription_count(), 1);

        drop(stream);
        assert_eq!(schema.event_bus().subscription_count(), 0);
        assert_eq!(schema.publish("characters", character("1004")), 0);
    });
}

#[test]
fn unsubscribing_an_unknown_client_is_a_no_op() {
    runtime().block_on(async {
        let schema = star_wars_schema();
        let _stream = subscribe(&schema, "NEWHOPE", "1");

        let removed = schema
            .event_bus()
            .unsubscribe(&ClientId::new("session", "42"), engine::ChannelSelector::All);

        assert_eq!(removed, 0);
        assert_eq!(schema.event_bus().subscription_count(), 1);
    });
}

#[test]
fn each_event_runs_the_operation_again() {
    runtime().block_on(async {
        let schema = star_wars_schema();
        let mut stream = schema.execute_stream("subscription { characterChanged { name friends { name } } }");

        schema.publish("characters", character("1004"));
        let response = stream.next().await.unwrap();

        assert_eq!(
            response.to_json(),
            json!({
                "data": {
                    "characterChanged": { "name": "Wilhuff Tarkin", "friends": [{ "name": "Darth Vader" }] }
                }
            })
        );
    });
}

#[test]
fn invalid_subscriptions() {
    runtime().block_on(async {
        let schema = star_wars_schema();

        let error = schema
            .subscribe(
                "subscription { characterChanged { name } other: characterChanged { name } }",
                ClientId::new("session", "1"),
            )
            .err()
            .unwrap();
        assert_eq!(error.into_server_error().message, "Subscription operations must select exactly one top level field.");

        let mut stream = schema.execute_stream("subscription { starshipChanged { name } }");
        let response = stream.next().await.unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
        assert!(stream.next().await.is_none());
        assert_eq!(schema.event_bus().subscription_count(), 0);
    });
}
