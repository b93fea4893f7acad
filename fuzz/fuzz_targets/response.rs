#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use xmlrpc_proto::call::{Action, Endpoint, Event, MethodCall, ValueSink};
use xmlrpc_proto::xmlrpc::MethodRequest;

// Drives a whole call with arbitrary response bytes. Whatever the peer
// sends, the machine must reach a terminal state without panicking and
// report exactly once.
fuzz_target!(|data: &[u8]| {
    let mut call = MethodCall::new();

    call.configure(
        Endpoint::new("fuzz.test", 8002),
        Arc::new(MethodRequest::new("ping").param(1).param("x")),
        ValueSink::new(),
    )
    .unwrap();

    call.start().unwrap();
    call.handle(Event::Connected);

    // Split the input into a few chunks to exercise resumption.
    for chunk in data.chunks(7) {
        call.handle(Event::Data(chunk));
    }
    call.handle(Event::Closed);

    assert!(call.is_terminal());

    let mut reports = 0;
    while let Some(action) = call.poll_action() {
        if let Action::Report(_) = action {
            reports += 1;
        }
    }
    assert_eq!(reports, 1);
});
