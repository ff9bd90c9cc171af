//! End-to-end tests driving a real `HubServer` over an actual WebSocket
//! connection, one per seeded scenario from the testable-properties list:
//! rated-match Elo deltas, mutual cancel, disputed reports, duplicate
//! report rejection, session takeover, and spectator bootstrap.

mod test_helpers;

use card_hub_server::protocol::{ClientMessage, MatchOutcome, ReportStatus, ReportValue, ServerMessage};
use test_helpers::{connect_client, recv, recv_n, recv_until, register_and_login, send, start_test_server};

fn unique_username(tag: &str) -> String {
    format!("{tag}-{}", uuid::Uuid::new_v4().simple())
}

async fn pair_two_players(addr: std::net::SocketAddr) -> (
    test_helpers::ClientSink,
    test_helpers::ClientStream,
    test_helpers::ClientSink,
    test_helpers::ClientStream,
    uuid::Uuid,
) {
    let (mut sink1, mut stream1) = connect_client(addr).await;
    let (mut sink2, mut stream2) = connect_client(addr).await;

    register_and_login(&mut sink1, &mut stream1, &unique_username("p1"), "hunter2-password").await;
    register_and_login(&mut sink2, &mut stream2, &unique_username("p2"), "hunter2-password").await;

    // `queue_notify_all` pushes a QueueCountUpdate to every open connection
    // ahead of the handler's own JoinQueueResponse reply, so skip past it.
    send(&mut sink1, &ClientMessage::JoinQueue).await;
    match recv_until(&mut stream1, |m| matches!(m, ServerMessage::JoinQueueResponse { .. })).await {
        ServerMessage::JoinQueueResponse { success, .. } => assert!(success),
        other => panic!("expected JoinQueueResponse, got {other:?}"),
    }

    send(&mut sink2, &ClientMessage::JoinQueue).await;
    match recv_until(&mut stream2, |m| matches!(m, ServerMessage::JoinQueueResponse { .. })).await {
        ServerMessage::JoinQueueResponse { success, .. } => assert!(success),
        other => panic!("expected JoinQueueResponse, got {other:?}"),
    }

    let found1 = recv_until(&mut stream1, |m| matches!(m, ServerMessage::MatchFound { .. })).await;
    let found2 = recv_until(&mut stream2, |m| matches!(m, ServerMessage::MatchFound { .. })).await;

    let match_id = match (found1, found2) {
        (ServerMessage::MatchFound { match_id: m1, .. }, ServerMessage::MatchFound { match_id: m2, .. }) => {
            assert_eq!(m1, m2, "both players must see the same match id");
            m1
        }
        _ => unreachable!(),
    };

    (sink1, stream1, sink2, stream2, match_id)
}

#[tokio::test]
async fn rated_match_applies_zero_sum_elo_deltas() {
    let addr = start_test_server().await;
    let (mut sink1, mut stream1, mut sink2, mut stream2, match_id) = pair_two_players(addr).await;

    send(&mut sink1, &ClientMessage::ReportResult { match_id, result: ReportValue::Win }).await;
    match recv(&mut stream1).await {
        ServerMessage::ReportResultResponse { success: true, status: Some(ReportStatus::Pending), .. } => {}
        other => panic!("expected a pending report acknowledgement, got {other:?}"),
    }

    // The coordinator pushes `MatchResolved` to the reporter's own connection
    // before the handler's `ReportResultResponse` reply goes out, so the two
    // frames can arrive in either order; read both and sort by variant.
    send(&mut sink2, &ClientMessage::ReportResult { match_id, result: ReportValue::Lose }).await;
    let mut frames2 = recv_n(&mut stream2, 2).await;
    let resolved2_idx = frames2
        .iter()
        .position(|m| matches!(m, ServerMessage::MatchResolved { .. }))
        .expect("expected a MatchResolved push among the reporter's two frames");
    let resolved2 = frames2.remove(resolved2_idx);
    match frames2.remove(0) {
        ServerMessage::ReportResultResponse { success: true, status: Some(ReportStatus::Resolved), .. } => {}
        other => panic!("expected a resolved report acknowledgement, got {other:?}"),
    }

    let resolved1 = recv_until(&mut stream1, |m| matches!(m, ServerMessage::MatchResolved { .. })).await;

    let (outcome1, rate_change1) = match resolved1 {
        ServerMessage::MatchResolved { outcome, rate_change, .. } => (outcome, rate_change),
        _ => unreachable!(),
    };
    let (outcome2, rate_change2) = match resolved2 {
        ServerMessage::MatchResolved { outcome, rate_change, .. } => (outcome, rate_change),
        _ => unreachable!(),
    };

    assert_eq!(outcome1, MatchOutcome::Consistent);
    assert_eq!(outcome2, MatchOutcome::Consistent);
    let (winner_change, loser_change) = (rate_change1.unwrap(), rate_change2.unwrap());
    assert!(winner_change > 0, "winner's rate change should be positive");
    assert_eq!(winner_change, -loser_change, "elo changes must be zero-sum between equally rated players");
}

#[tokio::test]
async fn mutual_cancel_leaves_rates_unchanged() {
    let addr = start_test_server().await;
    let (mut sink1, mut stream1, mut sink2, mut stream2, match_id) = pair_two_players(addr).await;

    send(&mut sink1, &ClientMessage::ReportResult { match_id, result: ReportValue::Cancel }).await;
    recv(&mut stream1).await;
    send(&mut sink2, &ClientMessage::ReportResult { match_id, result: ReportValue::Cancel }).await;
    recv(&mut stream2).await;

    let resolved1 = recv_until(&mut stream1, |m| matches!(m, ServerMessage::MatchResolved { .. })).await;
    match resolved1 {
        ServerMessage::MatchResolved { outcome, rate_change, .. } => {
            assert_eq!(outcome, MatchOutcome::Cancel);
            assert_eq!(rate_change, None);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn mismatched_reports_are_flagged_disputed_with_rates_unchanged() {
    let addr = start_test_server().await;
    let (mut sink1, mut stream1, mut sink2, mut stream2, match_id) = pair_two_players(addr).await;

    send(&mut sink1, &ClientMessage::ReportResult { match_id, result: ReportValue::Win }).await;
    recv(&mut stream1).await;
    send(&mut sink2, &ClientMessage::ReportResult { match_id, result: ReportValue::Win }).await;
    recv(&mut stream2).await;

    let resolved1 = recv_until(&mut stream1, |m| matches!(m, ServerMessage::MatchResolved { .. })).await;
    match resolved1 {
        ServerMessage::MatchResolved { outcome, rate_change, .. } => {
            assert_eq!(outcome, MatchOutcome::Disputed);
            assert_eq!(rate_change, None);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn duplicate_report_from_the_same_player_is_rejected() {
    let addr = start_test_server().await;
    let (mut sink1, mut stream1, _sink2, _stream2, match_id) = pair_two_players(addr).await;

    send(&mut sink1, &ClientMessage::ReportResult { match_id, result: ReportValue::Win }).await;
    match recv(&mut stream1).await {
        ServerMessage::ReportResultResponse { success: true, status: Some(ReportStatus::Pending), .. } => {}
        other => panic!("expected first report to be accepted, got {other:?}"),
    }

    send(&mut sink1, &ClientMessage::ReportResult { match_id, result: ReportValue::Win }).await;
    match recv(&mut stream1).await {
        ServerMessage::ReportResultResponse { success: false, error_code: Some(_), .. } => {}
        other => panic!("expected the duplicate report to be rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn logging_in_from_a_second_connection_forces_out_the_first() {
    let addr = start_test_server().await;
    let username = unique_username("takeover");

    let (mut sink1, mut stream1) = connect_client(addr).await;
    register_and_login(&mut sink1, &mut stream1, &username, "hunter2-password").await;

    let (mut sink2, mut stream2) = connect_client(addr).await;
    send(&mut sink2, &ClientMessage::Login { username: username.clone(), password: "hunter2-password".to_string() }).await;
    match recv(&mut stream2).await {
        ServerMessage::LoginResponse { success: true, .. } => {}
        other => panic!("expected second login to succeed, got {other:?}"),
    }

    let forced = recv_until(&mut stream1, |m| matches!(m, ServerMessage::LogoutForced { .. })).await;
    assert!(matches!(forced, ServerMessage::LogoutForced { .. }));
}

#[tokio::test]
async fn a_joining_spectator_is_bootstrapped_with_the_cached_broadcaster_offer() {
    let addr = start_test_server().await;

    let (mut broadcaster_sink, mut broadcaster_stream) = connect_client(addr).await;
    register_and_login(&mut broadcaster_sink, &mut broadcaster_stream, &unique_username("caster"), "hunter2-password").await;

    // The broadcast-list notifier pushes a BroadcastListUpdate to every open
    // connection (including the broadcaster's own) before the handler's own
    // StartBroadcastResponse reply goes out.
    send(&mut broadcaster_sink, &ClientMessage::StartBroadcast).await;
    let room_id = match recv_until(&mut broadcaster_stream, |m| matches!(m, ServerMessage::StartBroadcastResponse { .. })).await {
        ServerMessage::StartBroadcastResponse { success: true, room_id: Some(room_id), .. } => room_id,
        other => panic!("expected a room id from StartBroadcastResponse, got {other:?}"),
    };

    let offer = serde_json::json!({"sdp": "v=0 offer"});
    send(&mut broadcaster_sink, &ClientMessage::SpectateSignal { room_id: room_id.clone(), signal: offer.clone() }).await;

    let (mut spectator_sink, mut spectator_stream) = connect_client(addr).await;
    send(&mut spectator_sink, &ClientMessage::JoinSpectateRoom { room_id: room_id.clone() }).await;

    // The cached offer is pushed to the spectator's channel while `join` is
    // still running, ahead of the handler's own JoinSpectateRoomResponse, so
    // it is the first frame to arrive on this connection.
    let bootstrapped = recv(&mut spectator_stream).await;
    match bootstrapped {
        ServerMessage::SpectateSignal { room_id: got_room, signal } => {
            assert_eq!(got_room, room_id);
            assert_eq!(signal, offer, "latecomer should receive the cached broadcaster offer verbatim");
        }
        other => panic!("expected a bootstrapped SpectateSignal, got {other:?}"),
    }

    match recv(&mut spectator_stream).await {
        ServerMessage::JoinSpectateRoomResponse { success: true, .. } => {}
        other => panic!("expected join to succeed, got {other:?}"),
    }
}
