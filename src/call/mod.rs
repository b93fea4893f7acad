//! XML-RPC method call state machine.
//!
//! Sans-IO protocol impl: the machine never touches a socket. The caller
//! configures it, starts it, and then feeds it [`Event`] values as the
//! outside world produces them (connection result, received bytes,
//! stream closure). The machine answers with [`Action`] values telling
//! the driver what to do next: connect, transmit-and-flush, close, and
//! finally report the [`Outcome`] exactly once.
//!
//! The states are:
//!
//! * **Start** - Waiting for the connection attempt to resolve. On
//!   success the entire request (headers + XML-RPC body) is serialized
//!   and handed over for transmission before anything else happens.
//! * **AwaitResponse** - Suspended until response bytes arrive. First
//!   occupied while the header block accumulates, and again while the
//!   body document decodes.
//! * **CheckStatus** - The header block is complete. A non-200 status
//!   fails the call without ever interpreting a body byte.
//! * **Done** - Terminal. The decoded value (or fault) is in the sink.
//! * **Failed** - Terminal, with a [`FailReason`].
//!
//! ```text
//!            ┌──────────────────┐
//!            │      Start       │─────────────┐
//!            └──────────────────┘             │
//!                      │                      │
//!                      ▼                      │
//!            ┌──────────────────┐◀──┐         │
//!        ┌───│  AwaitResponse   │   │         │
//!        │   └──────────────────┘   │         │
//!        │             │            │         │
//!        │             ▼            │         ▼
//!        │   ┌──────────────────┐   │  ┌────────────┐
//!        │   │   CheckStatus    │───┴─▶│   Failed   │
//!        │   └──────────────────┘      └────────────┘
//!        │
//!        └──▶┌──────────────────┐
//!            │       Done       │
//!            └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use xmlrpc_proto::call::{Action, Endpoint, Event, MethodCall, Outcome, ValueSink};
//! use xmlrpc_proto::xmlrpc::{MethodRequest, Value};
//!
//! let mut call = MethodCall::new();
//!
//! call.configure(
//!     Endpoint::new("example.com", 8002),
//!     Arc::new(MethodRequest::new("ping")),
//!     ValueSink::new(),
//! ).unwrap();
//!
//! call.start().unwrap();
//!
//! // The driver owns all I/O. Actions say what to do next.
//! let Some(Action::Connect(endpoint)) = call.poll_action() else { panic!() };
//! assert_eq!(endpoint.host(), "example.com");
//! assert_eq!(endpoint.port(), 8002);
//!
//! // ... connect, then:
//! call.handle(Event::Connected);
//!
//! let Some(Action::Transmit(bytes)) = call.poll_action() else { panic!() };
//! assert!(bytes.starts_with(b"POST / HTTP/1.1\r\n"));
//!
//! // ... send fully, flush, then feed whatever arrives:
//! call.handle(Event::Data(b"HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\n\r\n"));
//! call.handle(Event::Data(b"<methodResponse><params><param>\
//!     <value><string>pong</string></value>\
//!     </param></params></methodResponse>"));
//!
//! let Some(Action::Close) = call.poll_action() else { panic!() };
//! let Some(Action::Report(Outcome::Success)) = call.poll_action() else { panic!() };
//!
//! let sink = call.into_sink().unwrap();
//! assert_eq!(sink.value(), Some(&Value::String("pong".into())));
//! ```
//!
//! # In scope:
//!
//! * One fixed `POST /` HTTP/1.1 exchange with `Connection: close`
//! * Status validation strictly before body decoding
//! * Cooperative cancellation
//!
//! # Out of scope:
//!
//! * Opening/closing sockets, reactors, timers
//! * TLS
//! * Retries, redirects, connection reuse

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;

use crate::util::log_data;
use crate::xmlrpc::{Fault, MethodRequest, Value};
use crate::Error;

mod encoder;

mod decoder;
use decoder::{DecodeEvent, ResponseDecoder, ResponseHead};

#[cfg(test)]
mod test;

/// Max number of headers to parse from an HTTP response
pub(crate) const MAX_RESPONSE_HEADERS: usize = 128;

/// Network address of the remote service.
///
/// Carried opaquely into [`Action::Connect`]; resolution is the
/// driver's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create an endpoint from host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Endpoint {
            host: host.into(),
            port,
        }
    }

    /// The host part.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port part.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Caller-supplied destination for the decoded response.
///
/// Written at most once per call, and only after the HTTP status has
/// been validated.
pub trait ResponseSink {
    /// The response value of a successful exchange.
    fn on_value(&mut self, value: Value);

    /// The remote method answered with an XML-RPC fault.
    fn on_fault(&mut self, fault: Fault);
}

/// Catch-all [`ResponseSink`] that stores the decoded result.
#[derive(Debug, Default)]
pub struct ValueSink {
    result: Option<Result<Value, Fault>>,
}

impl ValueSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        ValueSink::default()
    }

    /// The decoded value, if the call succeeded without a fault.
    pub fn value(&self) -> Option<&Value> {
        match &self.result {
            Some(Ok(v)) => Some(v),
            _ => None,
        }
    }

    /// The fault, if the remote method answered with one.
    pub fn fault(&self) -> Option<&Fault> {
        match &self.result {
            Some(Err(f)) => Some(f),
            _ => None,
        }
    }

    /// Whether anything was written to the sink.
    pub fn is_empty(&self) -> bool {
        self.result.is_none()
    }

    /// Take the result out of the sink.
    pub fn take(&mut self) -> Option<Result<Value, Fault>> {
        self.result.take()
    }
}

impl ResponseSink for ValueSink {
    fn on_value(&mut self, value: Value) {
        self.result = Some(Ok(value));
    }

    fn on_fault(&mut self, fault: Fault) {
        self.result = Some(Err(fault));
    }
}

/// The state of a call. See the [state graph][self].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Waiting for the connection attempt to resolve.
    Start,

    /// Suspended until response bytes arrive.
    AwaitResponse,

    /// Headers complete, validating the status code.
    CheckStatus,

    /// Terminal success.
    Done,

    /// Terminal failure.
    Failed,
}

impl CallState {
    fn is_terminal(&self) -> bool {
        matches!(self, CallState::Done | CallState::Failed)
    }
}

/// External happenings fed into [`MethodCall::handle`].
pub enum Event<'a> {
    /// The connection attempt succeeded.
    Connected,

    /// The connection attempt failed.
    ConnectFailed,

    /// Bytes received from the connection, in whatever chunk size the
    /// transport produced them.
    Data(&'a [u8]),

    /// The peer closed the stream.
    Closed,
}

impl fmt::Debug for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Connected => write!(f, "Connected"),
            Event::ConnectFailed => write!(f, "ConnectFailed"),
            Event::Data(d) => write!(f, "Data({} bytes)", d.len()),
            Event::Closed => write!(f, "Closed"),
        }
    }
}

/// What the driver should do next, in queue order.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Establish a connection to the endpoint.
    Connect(Endpoint),

    /// Send these bytes in full, then flush.
    Transmit(Vec<u8>),

    /// Close the connection.
    Close,

    /// The call is over. Emitted exactly once.
    Report(Outcome),
}

/// Final result of a call, reported exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The response was decoded into the sink. Note that an XML-RPC
    /// fault is a successful exchange; it arrives via
    /// [`ResponseSink::on_fault`].
    Success,

    /// The call failed. The sink was not written.
    Failure(FailReason),
}

/// Reasons for a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// No connection could be established.
    ConnectionFailed,

    /// The peer closed the stream before the header block was complete.
    ConnectionClosedEarly,

    /// The request could not be serialized. Nothing was transmitted.
    EncodeFailed,

    /// The response status line or headers could not be parsed.
    MalformedHeaders,

    /// A non-200 status. The body was never interpreted.
    Status(StatusCode),

    /// The response carried a content-type we cannot decode (or none).
    UnsupportedContentType,

    /// The response body was not a well-formed XML-RPC document.
    MalformedBody,

    /// The caller cancelled the call.
    Cancelled,
}

impl FailReason {
    /// A human readable explanation of the failure.
    pub fn explain(&self) -> &'static str {
        match self {
            FailReason::ConnectionFailed => "could not establish connection",
            FailReason::ConnectionClosedEarly => "connection closed before headers were received",
            FailReason::EncodeFailed => "request could not be serialized",
            FailReason::MalformedHeaders => "response headers could not be parsed",
            FailReason::Status(_) => "non-success http status",
            FailReason::UnsupportedContentType => "unsupported response content-type",
            FailReason::MalformedBody => "response body could not be decoded",
            FailReason::Cancelled => "call was cancelled",
        }
    }
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::Status(code) => write!(f, "non-success http status: {}", code),
            other => f.write_str(other.explain()),
        }
    }
}

type TraceFn = Box<dyn FnMut(CallState, CallState) + Send>;

/// One XML-RPC method call over its own connection.
///
/// Created, configured, started, then driven by events until terminal.
/// A terminal call is inert: further events are ignored and it cannot
/// be restarted.
pub struct MethodCall<S> {
    state: CallState,
    started: bool,
    endpoint: Option<Endpoint>,
    request: Option<Arc<MethodRequest>>,
    sink: Option<S>,
    decoder: ResponseDecoder,
    actions: VecDeque<Action>,
    trace: Option<TraceFn>,
}

impl<S> Default for MethodCall<S> {
    fn default() -> Self {
        MethodCall {
            state: CallState::Start,
            started: false,
            endpoint: None,
            request: None,
            sink: None,
            decoder: ResponseDecoder::new(),
            actions: VecDeque::new(),
            trace: None,
        }
    }
}

impl<S> MethodCall<S> {
    /// Create an unconfigured call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply endpoint, request and sink. Must precede [`start`][Self::start].
    ///
    /// The request is shared: the same `Arc` can back any number of
    /// concurrent calls.
    pub fn configure(
        &mut self,
        endpoint: Endpoint,
        request: Arc<MethodRequest>,
        sink: S,
    ) -> Result<(), Error> {
        if self.started {
            return Err(Error::Configuration("configure after start"));
        }

        self.endpoint = Some(endpoint);
        self.request = Some(request);
        self.sink = Some(sink);

        Ok(())
    }

    /// Install a hook observing every state transition.
    pub fn set_trace(&mut self, trace: impl FnMut(CallState, CallState) + Send + 'static) {
        self.trace = Some(Box::new(trace));
    }

    /// Begin the call. Returns immediately; the first queued action is
    /// [`Action::Connect`].
    pub fn start(&mut self) -> Result<(), Error> {
        if self.started {
            return Err(Error::Configuration("start called twice"));
        }
        if self.state.is_terminal() {
            return Err(Error::Configuration("start after cancel"));
        }

        let Some(endpoint) = &self.endpoint else {
            return Err(Error::Configuration("start before configure"));
        };

        debug!("starting call to {}", endpoint);

        self.started = true;
        self.actions.push_back(Action::Connect(endpoint.clone()));

        Ok(())
    }

    /// Request early termination.
    ///
    /// Closes the connection (if any) and reports
    /// `Failure(Cancelled)`. A no-op once the call is terminal.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            debug!("cancel after terminal state is a no-op");
            return;
        }

        debug!("cancelling call");

        if self.started {
            self.actions.push_back(Action::Close);
        }
        self.fail(FailReason::Cancelled);
    }

    /// Next thing for the driver to do, if any.
    pub fn poll_action(&mut self) -> Option<Action> {
        self.actions.pop_front()
    }

    /// Current state.
    pub fn state(&self) -> CallState {
        self.state
    }

    /// Whether the call reached `Done` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Borrow the sink.
    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    /// Consume the call, returning the sink to the caller.
    pub fn into_sink(self) -> Option<S> {
        self.sink
    }

    fn set_state(&mut self, next: CallState) {
        let prev = self.state;
        self.state = next;

        debug!("{:?} -> {:?}", prev, next);

        if let Some(trace) = &mut self.trace {
            trace(prev, next);
        }
    }

    fn fail(&mut self, reason: FailReason) {
        debug!("call failed: {}", reason);

        self.set_state(CallState::Failed);
        self.actions.push_back(Action::Report(Outcome::Failure(reason)));
    }
}

impl<S: ResponseSink> MethodCall<S> {
    /// Feed one external event.
    ///
    /// Events are processed to completion, one at a time. Events
    /// arriving before start or after a terminal state are ignored.
    pub fn handle(&mut self, event: Event<'_>) {
        if !self.started {
            debug!("event before start ignored: {:?}", event);
            return;
        }
        if self.state.is_terminal() {
            debug!("event after terminal state ignored: {:?}", event);
            return;
        }

        match (self.state, event) {
            (CallState::Start, Event::Connected) => self.on_connected(),
            (CallState::Start, Event::ConnectFailed) => self.fail(FailReason::ConnectionFailed),
            (CallState::AwaitResponse, Event::Data(input)) => self.on_data(input),
            (CallState::AwaitResponse, Event::Closed) => self.on_closed(),
            (state, event) => debug!("unexpected event {:?} in state {:?}", event, state),
        }
    }

    fn on_connected(&mut self) {
        // configure() guarantees both are set once started.
        let (Some(endpoint), Some(request)) = (&self.endpoint, &self.request) else {
            return;
        };

        match encoder::encode(endpoint, request) {
            Ok(bytes) => {
                log_data(&bytes);
                self.actions.push_back(Action::Transmit(bytes));
                self.set_state(CallState::AwaitResponse);
            }
            Err(e) => {
                // Local condition: close cleanly and report, don't crash.
                debug!("request encoding failed: {}", e);
                self.actions.push_back(Action::Close);
                self.fail(FailReason::EncodeFailed);
            }
        }
    }

    fn on_data(&mut self, input: &[u8]) {
        log_data(input);

        match self.decoder.feed(input) {
            Ok(Some(event)) => self.on_decode_event(event),
            Ok(None) => {}
            Err(e) => self.fail_decode(e),
        }
    }

    fn on_decode_event(&mut self, event: DecodeEvent) {
        match event {
            DecodeEvent::Headers(head) => self.on_headers(head),
            DecodeEvent::Complete(result) => self.on_complete(result),
        }
    }

    fn on_headers(&mut self, head: ResponseHead) {
        self.set_state(CallState::CheckStatus);

        debug!("response status: {}", head.status);

        if head.status != StatusCode::OK {
            self.actions.push_back(Action::Close);
            self.fail(FailReason::Status(head.status));
            return;
        }

        if !head.is_text_xml() {
            debug!("unsupported content-type: {:?}", head.content_type);
            self.actions.push_back(Action::Close);
            self.fail(FailReason::UnsupportedContentType);
            return;
        }

        // Status validated. Body bytes may be interpreted from here on.
        self.set_state(CallState::AwaitResponse);

        match self.decoder.begin_body() {
            Ok(Some(event)) => self.on_decode_event(event),
            Ok(None) => {}
            Err(e) => self.fail_decode(e),
        }
    }

    fn on_complete(&mut self, result: Result<Value, Fault>) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        match result {
            Ok(value) => sink.on_value(value),
            Err(fault) => {
                debug!("remote answered with {}", fault);
                sink.on_fault(fault);
            }
        }

        self.set_state(CallState::Done);
        self.actions.push_back(Action::Close);
        self.actions.push_back(Action::Report(Outcome::Success));
    }

    fn on_closed(&mut self) {
        if self.decoder.headers_done() {
            // The peer closed with the document still open.
            debug!("stream closed at document depth {}", self.decoder.body_depth());
            self.fail(FailReason::MalformedBody);
        } else {
            self.fail(FailReason::ConnectionClosedEarly);
        }
    }

    fn fail_decode(&mut self, e: Error) {
        let reason = if self.decoder.headers_done() {
            debug!(
                "body decode failed at depth {}: {}",
                self.decoder.body_depth(),
                e
            );
            FailReason::MalformedBody
        } else {
            debug!("header parse failed: {}", e);
            FailReason::MalformedHeaders
        };

        self.actions.push_back(Action::Close);
        self.fail(reason);
    }
}

impl<S> fmt::Debug for MethodCall<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodCall<{:?}>", self.state)
    }
}
