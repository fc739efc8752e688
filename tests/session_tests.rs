use std::time::Duration;

use tick_pulse::deriv::types::Request;
use tick_pulse::session::{
    FeedSession, SessionCommand, SessionInput, SessionSettings, SessionState,
};

fn settings(token: Option<&str>) -> SessionSettings {
    SessionSettings {
        symbol: "R_100".to_string(),
        api_token: token.map(str::to_string),
        reconnect_delay: Duration::from_secs(3),
        resubscribe_delay: Duration::from_millis(500),
        window_capacity: 100,
        event_log_len: 50,
    }
}

fn tick_msg(symbol: &str, epoch: u64, quote: f64) -> SessionInput {
    SessionInput::Message(format!(
        r#"{{"msg_type":"tick","tick":{{"symbol":"{}","quote":{},"epoch":{}}},"subscription":{{"id":"abc"}}}}"#,
        symbol, quote, epoch
    ))
}

fn sends(cmds: &[SessionCommand]) -> Vec<Request> {
    cmds.iter()
        .filter_map(|c| match c {
            SessionCommand::Send(r) => Some(r.clone()),
            _ => None,
        })
        .collect()
}

/// Connect, open and authorize; returns the session in `Authorized`.
fn authorized_session() -> FeedSession {
    let mut session = FeedSession::new(settings(Some("tok")));
    session.handle(SessionInput::Connect);
    session.handle(SessionInput::TransportOpened);
    let cmds = session.handle(SessionInput::Message(
        r#"{"msg_type":"authorize","authorize":{"loginid":"VRTC123"}}"#.to_string(),
    ));
    assert_eq!(sends(&cmds), vec![Request::subscribe_ticks("R_100")]);
    assert_eq!(session.state(), SessionState::Authorized);
    session
}

fn subscribed_session() -> FeedSession {
    let mut session = authorized_session();
    session.handle(tick_msg("R_100", 1, 100.0));
    assert_eq!(session.state(), SessionState::Subscribed);
    session
}

#[test]
fn connect_opens_transport_then_sends_credential() {
    let mut session = FeedSession::new(settings(Some("tok")));
    assert_eq!(session.state(), SessionState::Disconnected);

    let cmds = session.handle(SessionInput::Connect);
    assert!(cmds.contains(&SessionCommand::OpenTransport { generation: 1 }));
    assert!(!cmds.contains(&SessionCommand::CloseTransport));
    assert_eq!(session.state(), SessionState::Connecting);

    let cmds = session.handle(SessionInput::TransportOpened);
    assert_eq!(sends(&cmds), vec![Request::authorize("tok")]);
    assert_eq!(session.state(), SessionState::Authorizing);
}

#[test]
fn without_credential_subscribes_publicly() {
    let mut session = FeedSession::new(settings(None));
    session.handle(SessionInput::Connect);
    let cmds = session.handle(SessionInput::TransportOpened);
    assert_eq!(sends(&cmds), vec![Request::subscribe_ticks("R_100")]);
    assert!(session.is_public_fallback());
    assert_eq!(session.state(), SessionState::Authorized);
}

#[test]
fn invalid_token_falls_back_to_public_subscription_once() {
    let mut session = FeedSession::new(settings(Some("bad")));
    session.handle(SessionInput::Connect);
    session.handle(SessionInput::TransportOpened);

    let err = r#"{"msg_type":"authorize","error":{"code":"InvalidToken","message":"The token is invalid."}}"#;
    let cmds = session.handle(SessionInput::Message(err.to_string()));
    assert_eq!(sends(&cmds), vec![Request::subscribe_ticks("R_100")]);
    assert_eq!(session.state(), SessionState::Authorized);
    assert!(session.is_public_fallback());
    assert!(session.last_error().unwrap().contains("InvalidToken"));

    // a repeated auth error does not trigger another subscribe
    let cmds = session.handle(SessionInput::Message(err.to_string()));
    assert!(sends(&cmds).is_empty());
}

#[test]
fn invalid_token_while_connecting_falls_back_to_public() {
    let mut session = FeedSession::new(settings(Some("bad")));
    session.handle(SessionInput::Connect);
    assert_eq!(session.state(), SessionState::Connecting);

    let cmds = session.handle(SessionInput::Message(
        r#"{"msg_type":"authorize","error":{"code":"InvalidToken","message":"The token is invalid."}}"#
            .to_string(),
    ));
    let subscribes = sends(&cmds)
        .into_iter()
        .filter(|r| *r == Request::subscribe_ticks("R_100"))
        .count();
    assert_eq!(subscribes, 1);
    assert_eq!(sends(&cmds).len(), 1);
    assert_eq!(session.state(), SessionState::Authorized);
    assert!(session.is_public_fallback());
}

#[test]
fn authorization_required_also_falls_back() {
    let mut session = FeedSession::new(settings(Some("tok")));
    session.handle(SessionInput::Connect);
    session.handle(SessionInput::TransportOpened);
    let cmds = session.handle(SessionInput::Message(
        r#"{"msg_type":"ticks","error":{"code":"AuthorizationRequired","message":"Please log in."}}"#
            .to_string(),
    ));
    assert_eq!(sends(&cmds), vec![Request::subscribe_ticks("R_100")]);
}

#[test]
fn other_errors_are_surfaced_without_transition() {
    let mut session = subscribed_session();
    let cmds = session.handle(SessionInput::Message(
        r#"{"msg_type":"ticks","error":{"code":"MarketIsClosed","message":"This market is presently closed."}}"#
            .to_string(),
    ));
    assert!(cmds.is_empty());
    assert_eq!(session.state(), SessionState::Subscribed);
    assert_eq!(
        session.last_error(),
        Some("venue error (MarketIsClosed): This market is presently closed.")
    );
}

#[test]
fn ticks_fill_the_window_in_order() {
    let mut session = authorized_session();
    for i in 0..5u64 {
        session.handle(tick_msg("R_100", 10 + i, 100.0 + i as f64));
    }
    assert_eq!(session.state(), SessionState::Subscribed);
    assert_eq!(session.tick_count(), 5);
    let prices: Vec<f64> = session.snapshot().iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![100.0, 101.0, 102.0, 103.0, 104.0]);
}

#[test]
fn string_quotes_are_normalized() {
    let mut session = authorized_session();
    session.handle(SessionInput::Message(
        r#"{"msg_type":"tick","tick":{"symbol":"R_100","quote":"6123.45","epoch":7}}"#.to_string(),
    ));
    assert_eq!(session.snapshot()[0].price, 6123.45);
    assert_eq!(session.snapshot()[0].epoch, 7);
}

#[test]
fn malformed_and_unparsable_messages_are_discarded() {
    let mut session = subscribed_session();
    let before = session.window().len();

    assert!(session
        .handle(SessionInput::Message("{not json".to_string()))
        .is_empty());
    session.handle(SessionInput::Message(
        r#"{"msg_type":"tick","tick":{"symbol":"R_100","quote":"abc","epoch":9}}"#.to_string(),
    ));

    assert_eq!(session.window().len(), before);
    assert_eq!(session.state(), SessionState::Subscribed);
}

#[test]
fn informational_messages_change_nothing() {
    let mut session = subscribed_session();
    let cmds = session.handle(SessionInput::Message(
        r#"{"msg_type":"ping","ping":"pong"}"#.to_string(),
    ));
    assert!(cmds.is_empty());
    assert_eq!(session.state(), SessionState::Subscribed);
}

#[test]
fn close_while_subscribed_schedules_one_reconnect_and_rejects_ticks() {
    let mut session = subscribed_session();
    let cmds = session.handle(SessionInput::TransportClosed {
        reason: "peer closed".to_string(),
    });
    assert_eq!(session.state(), SessionState::Disconnected);
    let reconnects = cmds
        .iter()
        .filter(|c| matches!(c, SessionCommand::ScheduleReconnect(_)))
        .count();
    assert_eq!(reconnects, 1);
    assert!(cmds.contains(&SessionCommand::ScheduleReconnect(Duration::from_secs(3))));
    assert!(cmds.contains(&SessionCommand::CancelResubscribe));

    let len = session.window().len();
    session.handle(tick_msg("R_100", 99, 1.0));
    assert_eq!(session.window().len(), len);
}

#[test]
fn reconnect_tears_down_live_transport_first() {
    let mut session = subscribed_session();
    let cmds = session.handle(SessionInput::Connect);
    let close_at = cmds
        .iter()
        .position(|c| *c == SessionCommand::CloseTransport)
        .expect("stale transport closed");
    let open_at = cmds
        .iter()
        .position(|c| *c == SessionCommand::OpenTransport { generation: 2 })
        .expect("new transport opened");
    assert!(close_at < open_at);
    assert!(cmds.contains(&SessionCommand::CancelReconnect));
    assert_eq!(session.generation(), 2);
    assert_eq!(session.state(), SessionState::Connecting);
    assert!(!session.is_public_fallback());
}

#[test]
fn instrument_change_while_subscribed_resubscribes_on_same_connection() {
    let mut session = subscribed_session();
    session.handle(tick_msg("R_100", 2, 101.0));
    assert!(!session.window().is_empty());

    let cmds = session.handle(SessionInput::SelectInstrument("R_75".to_string()));
    assert!(session.window().is_empty());
    assert_eq!(sends(&cmds), vec![Request::forget_all_ticks()]);
    assert!(cmds.contains(&SessionCommand::ScheduleResubscribe(Duration::from_millis(500))));
    assert!(!cmds
        .iter()
        .any(|c| matches!(c, SessionCommand::OpenTransport { .. })));
    assert_eq!(session.symbol(), "R_75");

    // stale ticks for the old instrument are dropped during the settle delay
    session.handle(tick_msg("R_100", 3, 102.0));
    assert!(session.window().is_empty());

    let cmds = session.handle(SessionInput::ResubscribeDue);
    assert_eq!(sends(&cmds), vec![Request::subscribe_ticks("R_75")]);

    session.handle(tick_msg("R_75", 4, 50.0));
    assert_eq!(session.window().len(), 1);
    assert_eq!(session.state(), SessionState::Subscribed);
}

#[test]
fn instrument_change_while_disconnected_only_records_selection() {
    let mut session = FeedSession::new(settings(Some("tok")));
    let cmds = session.handle(SessionInput::SelectInstrument("BOOM1000".to_string()));
    assert!(cmds.is_empty());
    assert_eq!(session.symbol(), "BOOM1000");

    session.handle(SessionInput::Connect);
    session.handle(SessionInput::TransportOpened);
    let cmds = session.handle(SessionInput::Message(
        r#"{"msg_type":"authorize","authorize":{}}"#.to_string(),
    ));
    assert_eq!(sends(&cmds), vec![Request::subscribe_ticks("BOOM1000")]);
}

#[test]
fn selecting_current_instrument_is_a_no_op() {
    let mut session = subscribed_session();
    let cmds = session.handle(SessionInput::SelectInstrument("R_100".to_string()));
    assert!(cmds.is_empty());
    assert_eq!(session.window().len(), 1);
}

#[test]
fn resubscribe_after_disconnect_is_ignored() {
    let mut session = subscribed_session();
    session.handle(SessionInput::SelectInstrument("R_50".to_string()));
    session.handle(SessionInput::TransportClosed {
        reason: "network".to_string(),
    });
    assert!(session.handle(SessionInput::ResubscribeDue).is_empty());
}

#[test]
fn analysis_is_declined_until_twenty_ticks() {
    let mut session = authorized_session();
    for i in 0..19u64 {
        session.handle(tick_msg("R_100", i, 10.0 + i as f64));
    }
    assert!(session.analyze().is_err());
    session.handle(tick_msg("R_100", 19, 29.0));
    let rec = session.analyze().unwrap();
    assert_eq!(rec.symbol, "R_100");
    assert_eq!(rec.sample_count, 20);
}

#[test]
fn events_are_recorded_for_observers() {
    let session = subscribed_session();
    let messages: Vec<String> = session
        .recent_events(50)
        .into_iter()
        .map(|r| r.message)
        .collect();
    assert!(messages.iter().any(|m| m.starts_with("connecting")));
    assert!(messages.iter().any(|m| m == "authorize"));
    assert!(messages.iter().any(|m| m == "subscribe ticks R_100"));
    assert!(messages.iter().any(|m| m.contains("VRTC123")));

    let status = session.status();
    assert_eq!(status.state, SessionState::Subscribed);
    assert_eq!(status.last_price, Some(100.0));
    assert!(status.is_connected());
}
