//! XML-RPC value tree and document codec.
//!
//! The value tree covers the scalar and composite types of the XML-RPC
//! spec. The encoder turns a [`MethodRequest`] into a complete
//! `<methodCall>` document, built atomically in memory. [`Decoder`] is an
//! incremental parser for `<methodResponse>` documents, fed bytes in
//! whatever chunk sizes the transport produces them.

use std::fmt;

mod encode;
pub(crate) use encode::method_call;

mod decode;
pub use decode::Decoder;

/// An XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `<i4>` or `<int>`, a 32 bit signed integer.
    Int(i32),

    /// `<boolean>`, encoded as `0` or `1`.
    Bool(bool),

    /// `<string>`, also the type of an untagged `<value>`.
    String(String),

    /// `<double>`. NaN and infinities cannot be encoded.
    Double(f64),

    /// `<dateTime.iso8601>`, carried as the verbatim timestamp text.
    DateTime(String),

    /// `<base64>`, decoded to the raw bytes.
    Base64(Vec<u8>),

    /// `<array>` of values.
    Array(Vec<Value>),

    /// `<struct>` of named members, in document order.
    Struct(Vec<(String, Value)>),
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

/// An XML-RPC level error response.
///
/// Distinct from a transport or HTTP error: a fault is a well-formed
/// answer from the remote method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// The `faultCode` member.
    pub code: i32,

    /// The `faultString` member.
    pub string: String,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fault {}: {}", self.code, self.string)
    }
}

/// An immutable method call: name plus ordered arguments.
///
/// Calls hold this behind an `Arc`, so one request can safely back any
/// number of concurrent calls.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRequest {
    name: String,
    params: Vec<Value>,
}

impl MethodRequest {
    /// Create a request for the named method, without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        MethodRequest {
            name: name.into(),
            params: vec![],
        }
    }

    /// Append an argument.
    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// The method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered arguments.
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}
