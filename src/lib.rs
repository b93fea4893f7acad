#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(missing_docs)]
//! Sans-IO XML-RPC method call support.
//!
//! This crate contains the protocol logic for performing a single
//! XML-RPC method call over HTTP/1.1. It does no I/O itself. The
//! [`call::MethodCall`] state machine is driven by events the caller
//! feeds it and answers with actions the caller carries out, which
//! makes it usable from blocking I/O, non-blocking reactors and tests
//! alike.
//!
//! * [`xmlrpc`] holds the data model (values, faults, requests) and the
//!   incremental document decoder.
//! * [`call`] holds the per-call state machine tying the HTTP exchange
//!   together.

#[macro_use]
extern crate log;

mod error;
pub use error::Error;

mod util;

mod parser;

pub mod xmlrpc;

pub mod call;

pub use http;
