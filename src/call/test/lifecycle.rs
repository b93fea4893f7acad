use std::sync::{Arc, Mutex};

use crate::xmlrpc::MethodRequest;

use super::*;

#[test]
fn start_unconfigured_is_rejected() {
    let mut call: MethodCall<ValueSink> = MethodCall::new();

    assert!(call.start().is_err());
    assert_eq!(call.poll_action(), None);
}

#[test]
fn configure_after_start_is_rejected() {
    let mut call = configured();

    call.start().unwrap();

    let err = call.configure(
        Endpoint::new("other.example", 80),
        Arc::new(MethodRequest::new("other")),
        ValueSink::new(),
    );
    assert!(err.is_err());
}

#[test]
fn start_twice_is_rejected() {
    let mut call = configured();

    call.start().unwrap();
    assert!(call.start().is_err());
}

#[test]
fn cancel_before_start() {
    let mut call = configured();

    call.cancel();

    // Nothing was connected, so there is nothing to close.
    assert_eq!(
        call.poll_action(),
        Some(Action::Report(Outcome::Failure(FailReason::Cancelled)))
    );
    assert_eq!(call.poll_action(), None);

    assert!(call.start().is_err());
}

#[test]
fn cancel_while_connecting() {
    let mut call = configured();

    call.start().unwrap();
    assert!(matches!(call.poll_action(), Some(Action::Connect(_))));

    call.cancel();

    assert_close_and_report(&mut call, Outcome::Failure(FailReason::Cancelled));

    // The connection resolving late changes nothing, and the request
    // is never transmitted.
    call.handle(Event::Connected);
    assert_eq!(call.state(), CallState::Failed);
    assert_eq!(call.poll_action(), None);
}

#[test]
fn cancel_mid_call() {
    let mut call = awaiting_response();

    call.cancel();

    assert_close_and_report(&mut call, Outcome::Failure(FailReason::Cancelled));

    // Cancelling again is a no-op.
    call.cancel();
    assert_eq!(call.poll_action(), None);
}

#[test]
fn events_after_terminal_are_ignored() {
    let mut call = awaiting_response();

    let mut input = OK_XML_HEAD.to_vec();
    input.extend_from_slice(PONG_BODY);
    call.handle(Event::Data(&input));

    assert_eq!(call.state(), CallState::Done);
    assert_close_and_report(&mut call, Outcome::Success);

    call.handle(Event::Data(b"HTTP/1.1 500 nope\r\n\r\n"));
    call.handle(Event::Closed);

    assert_eq!(call.state(), CallState::Done);
    assert_eq!(call.poll_action(), None);
}

#[test]
fn events_before_start_are_ignored() {
    let mut call = configured();

    call.handle(Event::Connected);
    call.handle(Event::Data(b"HTTP/1.1 200 OK\r\n\r\n"));

    assert_eq!(call.state(), CallState::Start);
    assert_eq!(call.poll_action(), None);
}

#[test]
fn trace_hook_sees_every_transition() {
    let transitions = Arc::new(Mutex::new(Vec::new()));

    let mut call = configured();
    let t = transitions.clone();
    call.set_trace(move |from, to| t.lock().unwrap().push((from, to)));

    call.start().unwrap();
    assert!(matches!(call.poll_action(), Some(Action::Connect(_))));

    call.handle(Event::Connected);
    assert!(matches!(call.poll_action(), Some(Action::Transmit(_))));

    let mut input = OK_XML_HEAD.to_vec();
    input.extend_from_slice(PONG_BODY);
    call.handle(Event::Data(&input));

    assert_eq!(
        *transitions.lock().unwrap(),
        vec![
            (CallState::Start, CallState::AwaitResponse),
            (CallState::AwaitResponse, CallState::CheckStatus),
            (CallState::CheckStatus, CallState::AwaitResponse),
            (CallState::AwaitResponse, CallState::Done),
        ]
    );
}
