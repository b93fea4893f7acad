use std::sync::Arc;

use crate::xmlrpc::MethodRequest;

use super::*;

mod lifecycle;
mod state_await_response;

pub const OK_XML_HEAD: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\n\r\n";

pub const PONG_BODY: &[u8] = b"<methodResponse><params><param>\
    <value><string>pong</string></value>\
    </param></params></methodResponse>";

pub const FAULT_BODY: &[u8] = b"<methodResponse><fault><value><struct>\
    <member><name>faultCode</name><value><int>4</int></value></member>\
    <member><name>faultString</name><value><string>Too many parameters.</string></value></member>\
    </struct></value></fault></methodResponse>";

/// A call for "ping" at example.com:8002, configured but not started.
pub fn configured() -> MethodCall<ValueSink> {
    let mut call = MethodCall::new();

    call.configure(
        Endpoint::new("example.com", 8002),
        Arc::new(MethodRequest::new("ping")),
        ValueSink::new(),
    )
    .unwrap();

    call
}

/// A started call that already connected and handed over the request.
pub fn awaiting_response() -> MethodCall<ValueSink> {
    let mut call = configured();

    call.start().unwrap();
    assert!(matches!(call.poll_action(), Some(Action::Connect(_))));

    call.handle(Event::Connected);
    assert!(matches!(call.poll_action(), Some(Action::Transmit(_))));
    assert_eq!(call.state(), CallState::AwaitResponse);

    call
}

/// Assert the terminal action pair: close the connection, then report.
pub fn assert_close_and_report(call: &mut MethodCall<ValueSink>, outcome: Outcome) {
    assert_eq!(call.poll_action(), Some(Action::Close));
    assert_eq!(call.poll_action(), Some(Action::Report(outcome)));
    assert_eq!(call.poll_action(), None);
}
