use std::time::Duration;

use engine::Schema;
use engine_websocket::{CloseFrame, ConnectionSettings, ConnectionState, Frame};
use integration_tests::{runtime, star_wars_schema, StarWars, TestConnection};
use serde_json::{json, Value};

const SILENCE: Duration = Duration::from_millis(100);

fn character(id: &str) -> Value {
    StarWars::default().character(id).cloned().unwrap()
}

fn start(id: &str, query: &str) -> Value {
    json!({ "type": "start", "id": id, "payload": { "query": query } })
}

/// Operations start asynchronously, publishing before they are registered would be lost.
async fn wait_for_subscriptions(schema: &Schema, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while schema.event_bus().subscription_count() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscriptions were not registered in time");
}

#[test]
fn connection_is_acknowledged() {
    runtime().block_on(async {
        let mut connection = TestConnection::new(Some(star_wars_schema()));

        connection.send(json!({ "type": "connection_init", "payload": { "token": "secret" } }));
        insta::assert_json_snapshot!(connection.next_message().await, @r###"
        {
          "type": "connection_ack"
        }
        "###);

        // A second init changes nothing.
        connection.send(json!({ "type": "connection_init" }));
        connection.assert_silent(SILENCE).await;

        assert_eq!(connection.finished().await, ConnectionState::Closed);
    });
}

#[test]
fn connection_without_schema() {
    runtime().block_on(async {
        let mut connection = TestConnection::new(None);

        connection.send(json!({ "type": "connection_init" }));
        assert_eq!(
            connection.next_message().await,
            json!({
                "type": "connection_error",
                "payload": { "error": { "message": "No schema is available to serve this connection." } }
            })
        );

        connection.set_schema(Some(star_wars_schema()));
        connection.send(json!({ "type": "connection_init" }));
        assert_eq!(connection.next_message().await, json!({ "type": "connection_ack" }));
    });
}

#[test]
fn messages_before_init_are_ignored() {
    runtime().block_on(async {
        let mut connection = TestConnection::new(Some(star_wars_schema()));

        connection.send(start("1", "{ hero { name } }"));
        connection.send(json!({ "type": "stop", "id": "1" }));
        connection.send(json!({ "type": "connection_terminate" }));
        connection.assert_silent(SILENCE).await;

        connection.send(json!({ "type": "connection_init" }));
        assert_eq!(connection.next_message().await, json!({ "type": "connection_ack" }));
    });
}

#[test]
fn queries_send_data_then_complete() {
    runtime().block_on(async {
        let mut connection = TestConnection::initialized(star_wars_schema()).await;

        connection.send(start("1", "{ hero { name } }"));

        insta::assert_json_snapshot!(connection.next_message().await, @r###"
        {
          "type": "data",
          "id": "1",
          "payload": {
            "data": {
              "hero": {
                "name": "R2-D2"
              }
            }
          }
        }
        "###);
        assert_eq!(connection.next_message().await, json!({ "type": "complete", "id": "1" }));
    });
}

#[test]
fn operation_errors() {
    runtime().block_on(async {
        let mut connection = TestConnection::initialized(star_wars_schema()).await;

        connection.send(start("1", "{ hero { name } "));
        let message = connection.next_message().await;
        assert_eq!(message["type"], "error");
        assert_eq!(message["id"], "1");
        assert!(message["payload"]["error"]["message"].is_string());

        connection.send(start("2", "{ failing }"));
        let message = connection.next_message().await;
        assert_eq!(message["type"], "data");
        assert_eq!(message["payload"]["data"], json!({ "failing": null }));
        assert_eq!(message["payload"]["errors"][0]["message"], "The Death Star exploded");
        assert_eq!(connection.next_message().await, json!({ "type": "complete", "id": "2" }));
    });
}

#[test]
fn subscriptions_over_the_connection() {
    runtime().block_on(async {
        let schema = star_wars_schema();
        let mut connection = TestConnection::initialized(schema.clone()).await;

        connection.send(start(
            "sub",
            "subscription { characterChanged(episode: JEDI) { name } }",
        ));
        wait_for_subscriptions(&schema, 1).await;

        schema.publish("characters", character("1004"));
        connection.assert_silent(SILENCE).await;

        schema.publish("characters", character("1003"));
        assert_eq!(
            connection.next_message().await,
            json!({
                "type": "data",
                "id": "sub",
                "payload": { "data": { "characterChanged": { "name": "Leia Organa" } } }
            })
        );
        connection.assert_silent(SILENCE).await;

        connection.send(json!({ "type": "stop", "id": "sub" }));
        assert_eq!(connection.next_message().await, json!({ "type": "complete", "id": "sub" }));
        wait_for_subscriptions(&schema, 0).await;

        assert_eq!(schema.publish("characters", character("1003")), 0);
        connection.assert_silent(SILENCE).await;
    });
}

#[test]
fn restarting_an_operation_replaces_it() {
    runtime().block_on(async {
        let schema = star_wars_schema();
        let mut connection = TestConnection::initialized(schema.clone()).await;

        connection.send(start("1", "subscription { characterChanged { name } }"));
        wait_for_subscriptions(&schema, 1).await;
        connection.send(start("1", "subscription { characterChanged { id } }"));
        connection.send(start("2", "{ hero { id } }"));

        // The query runs after the second start was handled.
        assert_eq!(connection.next_message().await["id"], "2");
        assert_eq!(connection.next_message().await["type"], "complete");
        assert_eq!(schema.event_bus().subscription_count(), 1);

        assert_eq!(schema.publish("characters", character("2000")), 1);
        assert_eq!(
            connection.next_message().await,
            json!({ "type": "data", "id": "1", "payload": { "data": { "characterChanged": { "id": "2000" } } } })
        );
        connection.assert_silent(SILENCE).await;
    });
}

#[test]
fn stopping_an_unknown_operation() {
    runtime().block_on(async {
        let mut connection = TestConnection::initialized(star_wars_schema()).await;

        connection.send(json!({ "type": "stop", "id": "nope" }));

        assert_eq!(
            connection.next_message().await,
            json!({
                "type": "error",
                "id": "nope",
                "payload": { "error": { "message": "Unknown operation id \"nope\"." } }
            })
        );
    });
}

#[test]
fn terminate_closes_the_connection() {
    runtime().block_on(async {
        let schema = star_wars_schema();
        let mut connection = TestConnection::initialized(schema.clone()).await;

        connection.send(start("1", "subscription { characterChanged { name } }"));
        wait_for_subscriptions(&schema, 1).await;

        connection.send(json!({ "type": "connection_terminate" }));
        assert_eq!(connection.next_close().await, CloseFrame::normal());
        assert_eq!(connection.next_frame().await, None);
        assert_eq!(schema.event_bus().subscription_count(), 0);

        assert_eq!(connection.finished().await, ConnectionState::Closed);
    });
}

#[test]
fn client_close_is_echoed() {
    runtime().block_on(async {
        let schema = star_wars_schema();
        let mut connection = TestConnection::initialized(schema.clone()).await;

        connection.send(start("1", "subscription { characterChanged { name } }"));
        wait_for_subscriptions(&schema, 1).await;

        let frame = CloseFrame {
            code: 4000,
            reason: "bye".to_string(),
        };
        connection.send_frame(Frame::Close(Some(frame.clone())));

        assert_eq!(connection.next_close().await, frame);
        assert_eq!(schema.event_bus().subscription_count(), 0);
    });
}

#[test]
fn transport_end_disposes_operations() {
    runtime().block_on(async {
        let schema = star_wars_schema();
        let connection = TestConnection::initialized(schema.clone()).await;

        connection.send(start("1", "subscription { characterChanged { name } }"));
        connection.send(start("2", "subscription { characterChanged(episode: JEDI) { name } }"));
        wait_for_subscriptions(&schema, 2).await;

        assert_eq!(connection.finished().await, ConnectionState::Closed);
        assert_eq!(schema.event_bus().subscription_count(), 0);
    });
}

#[test]
fn keep_alive_follows_the_ack() {
    runtime().block_on(async {
        let settings = ConnectionSettings {
            keep_alive_interval: Some(Duration::from_millis(50)),
            ..ConnectionSettings::default()
        };
        let mut connection = TestConnection::with_settings(Some(star_wars_schema()), settings);

        connection.send(json!({ "type": "connection_init" }));
        assert_eq!(connection.next_message().await, json!({ "type": "connection_ack" }));
        assert_eq!(connection.next_message().await, json!({ "type": "ka" }));
        assert_eq!(connection.next_message().await, json!({ "type": "ka" }));
    });
}

#[test]
fn no_keep_alive_before_init() {
    runtime().block_on(async {
        let settings = ConnectionSettings {
            keep_alive_interval: Some(Duration::from_millis(20)),
            ..ConnectionSettings::default()
        };
        let mut connection = TestConnection::with_settings(Some(star_wars_schema()), settings);

        connection.assert_silent(SILENCE).await;
    });
}

#[test]
fn unreadable_frames_are_ignored() {
    runtime().block_on(async {
        let mut connection = TestConnection::initialized(star_wars_schema()).await;

        connection.send(json!({ "type": "subscribe", "id": "1" }));
        connection.send_frame(Frame::Text("not json".to_string()));
        connection.send_frame(Frame::Ping(vec![1, 2, 3]));
        connection.assert_silent(SILENCE).await;

        connection.send_frame(Frame::Binary(start("1", "{ droid(id: \"2001\") { name } }").to_string().into_bytes()));
        assert_eq!(
            connection.next_message().await,
            json!({ "type": "data", "id": "1", "payload": { "data": { "droid": { "name": "R2-D2" } } } })
        );
        assert_eq!(connection.next_message().await, json!({ "type": "complete", "id": "1" }));
    });
}
