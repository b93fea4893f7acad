use super::*;

#[test]
fn incomplete_headers_keep_waiting() {
    let mut call = awaiting_response();

    call.handle(Event::Data(b"HTTP/1.1 200 OK\r\nContent-"));

    assert_eq!(call.state(), CallState::AwaitResponse);
    assert_eq!(call.poll_action(), None);
}

#[test]
fn closed_before_headers() {
    let mut call = awaiting_response();

    call.handle(Event::Data(b"HTTP/1.1 200 OK\r\n"));
    call.handle(Event::Closed);

    assert_eq!(
        call.poll_action(),
        Some(Action::Report(Outcome::Failure(
            FailReason::ConnectionClosedEarly
        )))
    );
    assert_eq!(call.poll_action(), None);
}

#[test]
fn malformed_headers() {
    let mut call = awaiting_response();

    call.handle(Event::Data(b"BOGUS NONSENSE\r\n\r\n"));

    assert_close_and_report(&mut call, Outcome::Failure(FailReason::MalformedHeaders));
}

#[test]
fn success_delivered_byte_at_a_time() {
    let mut call = awaiting_response();

    let mut input = OK_XML_HEAD.to_vec();
    input.extend_from_slice(PONG_BODY);

    for b in input {
        call.handle(Event::Data(&[b]));
    }

    assert_eq!(call.state(), CallState::Done);
    assert_close_and_report(&mut call, Outcome::Success);

    let sink = call.into_sink().unwrap();
    assert_eq!(sink.value(), Some(&Value::String("pong".into())));
}

#[test]
fn success_in_one_chunk() {
    let mut call = awaiting_response();

    let mut input = OK_XML_HEAD.to_vec();
    input.extend_from_slice(PONG_BODY);

    call.handle(Event::Data(&input));

    assert_eq!(call.state(), CallState::Done);
    assert_close_and_report(&mut call, Outcome::Success);

    // The result can be peeked at in place, or taken out.
    assert!(!call.sink().unwrap().is_empty());

    let mut sink = call.into_sink().unwrap();
    assert_eq!(sink.take(), Some(Ok(Value::String("pong".into()))));
    assert!(sink.is_empty());
}

#[test]
fn fault_is_a_successful_exchange() {
    let mut call = awaiting_response();

    call.handle(Event::Data(OK_XML_HEAD));
    call.handle(Event::Data(FAULT_BODY));

    assert_eq!(call.state(), CallState::Done);
    assert_close_and_report(&mut call, Outcome::Success);

    let sink = call.into_sink().unwrap();
    let fault = sink.fault().unwrap();
    assert_eq!(fault.code, 4);
    assert_eq!(fault.string, "Too many parameters.");
}

#[test]
fn closed_mid_body() {
    let mut call = awaiting_response();

    call.handle(Event::Data(OK_XML_HEAD));
    call.handle(Event::Data(b"<methodResponse><params>"));
    call.handle(Event::Closed);

    assert_eq!(
        call.poll_action(),
        Some(Action::Report(Outcome::Failure(FailReason::MalformedBody)))
    );
    assert_eq!(call.poll_action(), None);

    let sink = call.into_sink().unwrap();
    assert!(sink.is_empty());
}

#[test]
fn malformed_body() {
    let mut call = awaiting_response();

    call.handle(Event::Data(OK_XML_HEAD));
    call.handle(Event::Data(b"<methodResponse><bogus/>"));

    assert_close_and_report(&mut call, Outcome::Failure(FailReason::MalformedBody));

    let sink = call.into_sink().unwrap();
    assert!(sink.is_empty());
}
