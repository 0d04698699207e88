//! Integration tests for remote calls: the dispatcher, the blocking
//! bridge, and the named operations.

mod support;

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use riftlink::operations::{FindPlayer, GetSummonerByName};
use riftlink::protocol::{CallRequest, Fault, Value};
use riftlink::{ClientConfig, PublicSummoner, RpcError};
use serde_json::json;
use support::{
    FakeAcquirer, FakeConnector, Harness, Reply, WAIT, handshake_only, handshake_then, wait_until,
};

/// Answers `getSummonerByName` with a summoner named after the argument.
fn summoner_reply(request: &CallRequest) -> Value {
    let name = request.args[0].as_str().unwrap_or_default();
    json!({
        "acctId": 200,
        "summonerId": 100,
        "name": name,
        "summonerLevel": 30,
        "profileIconId": 7
    })
}

fn summoner_script() -> support::Script {
    handshake_then(|request| match request.operation.as_str() {
        "getSummonerByName" => Reply::Value(summoner_reply(request)),
        "getSummonerNames" => Reply::Value(json!(["First", "Second"])),
        "findPlayer" => Reply::Fault(Fault::new("Server.Processing", "invalid summoner id")),
        "getRecentGames" => Reply::Value(json!({ "userId": 200, "gameStatistics": [{ "gameId": 1 }] })),
        _ => Reply::Value(json!({ "echo": request.args })),
    })
}

/// Holds every service call so the test decides when and how each one
/// completes.
fn holding_script() -> support::Script {
    handshake_then(|_| Reply::Hold)
}

fn ready(script: support::Script) -> Harness {
    let h = Harness::new(FakeConnector::new(script), FakeAcquirer::issuing("T1"));
    h.connect_ready();
    h
}

// =========================================================================
// Not connected
// =========================================================================

#[test]
fn test_calls_before_connect_are_rejected_without_sending() {
    let h = Harness::new(FakeConnector::new(summoner_script()), FakeAcquirer::issuing("T1"));

    let blocking = h.client.get_summoner_by_name("Anyone");
    assert!(matches!(blocking, Err(RpcError::NotConnected)));

    let issued = h
        .client
        .get_summoner_by_name_async("Anyone", |_| panic!("handler must not run"));
    assert!(matches!(issued, Err(RpcError::NotConnected)));

    assert_eq!(h.connector.opened(), 0);
}

#[test]
fn test_calls_during_handshake_are_rejected_without_sending() {
    let script = std::sync::Arc::new(|request: &CallRequest| match request.operation.as_str() {
        "login" => Reply::Hold,
        _ => Reply::Value(json!("unexpected")),
    });
    let h = Harness::new(FakeConnector::new(script), FakeAcquirer::issuing("T1"));

    h.client.connect().unwrap();
    assert!(wait_until(|| h.connector.opened() == 1 && h.transport().held_count() == 1));

    assert!(matches!(
        h.client.get_summoner_names(&[1, 2]),
        Err(RpcError::NotConnected)
    ));
    // Only the held login call reached the transport.
    assert_eq!(h.transport().call_count(), 1);
}

#[test]
fn test_calls_after_disconnect_are_rejected() {
    let h = ready(summoner_script());
    h.client.disconnect();

    assert!(matches!(
        h.client.get_summoner_by_name("Anyone"),
        Err(RpcError::NotConnected)
    ));
    assert!(h.transport().service_calls().is_empty());
}

// =========================================================================
// Results, faults, decoding
// =========================================================================

#[test]
fn test_async_call_delivers_decoded_result() {
    let h = ready(summoner_script());
    let (tx, rx) = mpsc::channel();

    h.client
        .get_summoner_by_name_async("Some Summoner", move |result| {
            let _ = tx.send(result);
        })
        .unwrap();

    let summoner = rx.recv_timeout(WAIT).unwrap().unwrap().unwrap();
    assert_eq!(summoner.name, "Some Summoner");
    assert_eq!(summoner.acct_id, 200);
}

#[test]
fn test_blocking_call_matches_async_call() {
    let h = ready(summoner_script());
    let (tx, rx) = mpsc::channel();

    h.client
        .get_summoner_by_name_async("Some Summoner", move |result| {
            let _ = tx.send(result);
        })
        .unwrap();
    let from_async = rx.recv_timeout(WAIT).unwrap().unwrap();
    let from_blocking = h.client.get_summoner_by_name("Some Summoner").unwrap();

    assert_eq!(from_async, from_blocking);
}

#[test]
fn test_call_is_routed_through_endpoint_and_service() {
    let h = ready(summoner_script());

    let stats = h.client.get_aggregated_stats(200, "CLASSIC", "CURRENT").unwrap();
    assert_eq!(stats["echo"], json!([200, "CLASSIC", "CURRENT"]));

    let calls = h.transport().service_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].endpoint.as_deref(), Some("my-rtmps"));
    assert_eq!(calls[0].destination.as_deref(), Some("playerStatsService"));
    assert_eq!(calls[0].operation, "getAggregatedStats");
}

#[test]
fn test_list_arguments_are_sent_as_one_array() {
    let h = ready(summoner_script());

    let names = h.client.get_summoner_names(&[100, 101]).unwrap();
    assert_eq!(names, vec!["First", "Second"]);

    let calls = h.transport().service_calls();
    assert_eq!(calls[0].args, vec![json!([100, 101])]);
}

#[test]
fn test_recent_games_decode() {
    let h = ready(summoner_script());

    let games = h.client.get_recent_games(200).unwrap();
    assert_eq!(games.user_id, Some(200));
    assert_eq!(games.game_statistics.len(), 1);
}

#[test]
fn test_fault_is_returned_to_blocking_caller() {
    let h = ready(handshake_then(|_| {
        Reply::Fault(Fault::new("Server.Processing", "service unavailable"))
    }));

    match h.client.get_recent_games(200) {
        Err(RpcError::Fault(fault)) => assert_eq!(fault.fault_string, "service unavailable"),
        other => panic!("expected fault, got {other:?}"),
    }
    // A fault is about the call; the session survives.
    assert!(h.client.is_ready());
}

#[test]
fn test_find_player_fault_means_unknown_id() {
    let h = ready(summoner_script());

    assert!(h.client.find_player(-1).unwrap().is_none());

    let (tx, rx) = mpsc::channel();
    h.client
        .find_player_async(-1, move |result| {
            let _ = tx.send(result);
        })
        .unwrap();
    assert!(rx.recv_timeout(WAIT).unwrap().unwrap().is_none());

    // The generic path leaves the fault untouched.
    let raw = h.client.call::<FindPlayer>(vec![Value::from(-1)]);
    assert!(matches!(raw, Err(RpcError::Fault(_))));
}

#[test]
fn test_result_shape_mismatch_is_protocol_error() {
    let h = ready(handshake_then(|_| Reply::Value(json!("not a summoner"))));

    let result = h.client.get_summoner_by_name("Some Summoner");
    assert!(matches!(result, Err(RpcError::Protocol(_))));
}

#[test]
fn test_null_summoner_is_none() {
    let h = ready(handshake_then(|_| Reply::Value(Value::Null)));
    assert_eq!(h.client.get_summoner_by_name("Nobody").unwrap(), None);
}

// =========================================================================
// Blocking bridge
// =========================================================================

#[test]
fn test_blocking_call_times_out() {
    let config = ClientConfig {
        request_timeout: Duration::from_millis(100),
        ..ClientConfig::default()
    };
    let h = Harness::with_config(
        FakeConnector::new(holding_script()),
        FakeAcquirer::issuing("T1"),
        config,
    );
    h.connect_ready();

    let started = Instant::now();
    let result = h.client.get_summoner_by_name("Slow");
    assert!(matches!(result, Err(RpcError::Timeout(t)) if t == Duration::from_millis(100)));
    assert!(started.elapsed() < WAIT);

    // The server answering afterwards must not disturb anything.
    for (request, completion) in h.transport().take_held() {
        completion(Ok(summoner_reply(&request)));
    }
    assert!(h.client.is_ready());
}

#[test]
fn test_timeout_header_follows_config() {
    let config = ClientConfig {
        request_timeout: Duration::from_secs(15),
        ..ClientConfig::default()
    };
    let h = Harness::with_config(
        FakeConnector::new(handshake_only()),
        FakeAcquirer::issuing("T1"),
        config,
    );
    h.connect_ready();

    assert_eq!(
        h.transport().header(riftlink::protocol::REQUEST_TIMEOUT_HEADER),
        Some(json!(15))
    );
}

#[test]
fn test_sub_second_timeout_header_rounds_up() {
    let config = ClientConfig {
        request_timeout: Duration::from_millis(500),
        ..ClientConfig::default()
    };
    let h = Harness::with_config(
        FakeConnector::new(handshake_only()),
        FakeAcquirer::issuing("T1"),
        config,
    );
    h.connect_ready();

    assert_eq!(
        h.transport().header(riftlink::protocol::REQUEST_TIMEOUT_HEADER),
        Some(json!(1))
    );
}

#[test]
fn test_concurrent_blocking_calls_do_not_cross() {
    let h = ready(holding_script());
    let transport = h.transport();

    thread::scope(|s| {
        let first = s.spawn(|| h.client.get_summoner_by_name("First"));
        let second = s.spawn(|| h.client.get_summoner_by_name("Second"));

        assert!(wait_until(|| transport.held_count() == 2));

        // Complete in reverse order of issue; each answer is derived from
        // its own request, so crossed wires would show up as wrong names.
        let mut held = transport.take_held();
        held.reverse();
        for (request, completion) in held {
            completion(Ok(summoner_reply(&request)));
        }

        let first: Option<PublicSummoner> = first.join().unwrap().unwrap();
        let second: Option<PublicSummoner> = second.join().unwrap().unwrap();
        assert_eq!(first.unwrap().name, "First");
        assert_eq!(second.unwrap().name, "Second");
    });
}

#[test]
fn test_disconnect_releases_blocked_calls() {
    let h = ready(holding_script());
    let transport = h.transport();

    thread::scope(|s| {
        let waiter = s.spawn(|| {
            let started = Instant::now();
            (h.client.get_summoner_by_name("Stuck"), started.elapsed())
        });

        assert!(wait_until(|| transport.held_count() == 1));
        h.client.disconnect();

        let (result, waited) = waiter.join().unwrap();
        assert!(matches!(result, Err(RpcError::ConnectionClosed(_))));
        // Well before the 60 s request timeout.
        assert!(waited < WAIT);
    });
    assert_eq!(h.disconnect_count(), 1);
}

#[test]
fn test_gateway_drop_releases_blocked_calls() {
    let h = ready(holding_script());
    let transport = h.transport();

    thread::scope(|s| {
        let waiter = s.spawn(|| h.client.get_recent_games(200));

        assert!(wait_until(|| transport.held_count() == 1));
        transport.drop_connection();

        assert!(matches!(
            waiter.join().unwrap(),
            Err(RpcError::ConnectionClosed(_))
        ));
    });
    assert!(!h.client.is_ready());
}

#[test]
fn test_async_handler_sees_connection_closed() {
    let h = ready(holding_script());
    let (tx, rx) = mpsc::channel();

    h.client
        .call_async::<GetSummonerByName, _>(vec![Value::from("Stuck")], move |result| {
            let _ = tx.send(result);
        })
        .unwrap();
    h.client.disconnect();

    assert!(matches!(
        rx.recv_timeout(WAIT).unwrap(),
        Err(RpcError::ConnectionClosed(_))
    ));
}
