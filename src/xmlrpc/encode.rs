use base64::prelude::BASE64_STANDARD;
use base64::Engine;

use super::{MethodRequest, Value};
use crate::Error;

/// Serialize a request to a complete `<methodCall>` document.
///
/// The document is built in full before anything is transmitted, so a
/// failing argument never leaves a partially written body behind.
pub(crate) fn method_call(request: &MethodRequest) -> Result<String, Error> {
    let mut out = String::with_capacity(128);

    out.push_str("<?xml version=\"1.0\"?>");
    out.push_str("<methodCall><methodName>");
    escape_into(request.name(), &mut out);
    out.push_str("</methodName><params>");

    for p in request.params() {
        out.push_str("<param>");
        value_into(p, &mut out)?;
        out.push_str("</param>");
    }

    out.push_str("</params></methodCall>");

    Ok(out)
}

fn value_into(v: &Value, out: &mut String) -> Result<(), Error> {
    out.push_str("<value>");

    match v {
        Value::Int(i) => {
            out.push_str("<int>");
            out.push_str(&i.to_string());
            out.push_str("</int>");
        }
        Value::Bool(b) => {
            out.push_str("<boolean>");
            out.push_str(if *b { "1" } else { "0" });
            out.push_str("</boolean>");
        }
        Value::String(s) => {
            out.push_str("<string>");
            escape_into(s, out);
            out.push_str("</string>");
        }
        Value::Double(d) => {
            if !d.is_finite() {
                return Err(Error::NonFiniteDouble);
            }
            out.push_str("<double>");
            out.push_str(&d.to_string());
            out.push_str("</double>");
        }
        Value::DateTime(t) => {
            out.push_str("<dateTime.iso8601>");
            escape_into(t, out);
            out.push_str("</dateTime.iso8601>");
        }
        Value::Base64(data) => {
            out.push_str("<base64>");
            out.push_str(&BASE64_STANDARD.encode(data));
            out.push_str("</base64>");
        }
        Value::Array(values) => {
            out.push_str("<array><data>");
            for v in values {
                value_into(v, out)?;
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, v) in members {
                out.push_str("<member><name>");
                escape_into(name, out);
                out.push_str("</name>");
                value_into(v, out)?;
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }

    out.push_str("</value>");

    Ok(())
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
