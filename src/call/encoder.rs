use crate::xmlrpc::{self, MethodRequest};
use crate::Error;

use super::Endpoint;

/// Serialize the entire HTTP request for one method call.
///
/// The XML-RPC body is built first, so the Content-Length is exact and a
/// failed serialization produces no bytes at all. The header set is
/// fixed: a single `POST /` with `Connection: close`.
pub(crate) fn encode(endpoint: &Endpoint, request: &MethodRequest) -> Result<Vec<u8>, Error> {
    let body = xmlrpc::method_call(request)?;

    let mut head = String::with_capacity(128 + body.len());
    head.push_str("POST / HTTP/1.1\r\n");
    head.push_str(&format!("Host: {}\r\n", endpoint));
    head.push_str("Accept: */*\r\n");
    head.push_str("Accept-Encoding:\r\n");
    head.push_str("Connection: close\r\n");
    head.push_str("Content-Type: text/xml\r\n");
    head.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));

    let mut out = head.into_bytes();
    out.extend_from_slice(body.as_bytes());

    Ok(out)
}
