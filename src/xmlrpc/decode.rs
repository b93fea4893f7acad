use base64::prelude::BASE64_STANDARD;
use base64::Engine;

use super::{Fault, Value};
use crate::Error;

const SCALAR_TAGS: &[&str] = &[
    "i4",
    "int",
    "boolean",
    "string",
    "double",
    "dateTime.iso8601",
    "base64",
];

/// Incremental parser for a `<methodResponse>` document.
///
/// Fed bytes in arbitrary chunk sizes. The value tree is built as tags
/// close; the document is complete when `</methodResponse>` has been
/// seen. A completed document holds either a response value or a
/// [`Fault`].
#[derive(Debug, Default)]
pub struct Decoder {
    buf: Vec<u8>,
    stack: Vec<Frame>,
    pending: Option<Result<Value, Fault>>,
    result: Option<Result<Value, Fault>>,
}

#[derive(Debug)]
enum Frame {
    MethodResponse,
    Params { value: Option<Value> },
    Param { value: Option<Value> },
    FaultTag { value: Option<Value> },
    Value { text: String, typed: Option<Value> },
    Scalar { tag: String, text: String },
    Array { values: Option<Vec<Value>> },
    Data { values: Vec<Value> },
    StructTag { members: Vec<(String, Value)> },
    Member { name: Option<String>, value: Option<Value> },
    Name { text: String },
}

impl Frame {
    fn tag(&self) -> &str {
        match self {
            Frame::MethodResponse => "methodResponse",
            Frame::Params { .. } => "params",
            Frame::Param { .. } => "param",
            Frame::FaultTag { .. } => "fault",
            Frame::Value { .. } => "value",
            Frame::Scalar { tag, .. } => tag,
            Frame::Array { .. } => "array",
            Frame::Data { .. } => "data",
            Frame::StructTag { .. } => "struct",
            Frame::Member { .. } => "member",
            Frame::Name { .. } => "name",
        }
    }
}

enum Token {
    Start(String),
    End(String),
    /// Self-closing tag, equivalent to start immediately followed by end.
    Empty(String),
    Text(String),
    /// XML declaration, comment or doctype.
    Skip,
}

impl Decoder {
    /// Create a decoder for one document.
    pub fn new() -> Self {
        Decoder::default()
    }

    /// Feed the next chunk of the document.
    ///
    /// Returns `true` once the document is complete. Bytes fed after
    /// completion are ignored.
    pub fn feed(&mut self, input: &[u8]) -> Result<bool, Error> {
        if self.is_complete() {
            return Ok(true);
        }

        self.buf.extend_from_slice(input);

        let mut pos = 0;
        while pos < self.buf.len() && self.result.is_none() {
            let Some((n, token)) = next_token(&self.buf[pos..])? else {
                break;
            };
            pos += n;
            self.apply(token)?;
        }
        self.buf.drain(..pos);

        Ok(self.is_complete())
    }

    /// Whether `</methodResponse>` has been seen.
    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    /// The decoded value or fault, once complete.
    pub fn take_result(&mut self) -> Option<Result<Value, Fault>> {
        self.result.take()
    }

    /// Element nesting depth reached so far. Diagnostic only.
    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    fn apply(&mut self, token: Token) -> Result<(), Error> {
        match token {
            Token::Start(name) => self.apply_start(name),
            Token::End(name) => self.apply_end(&name),
            Token::Empty(name) => {
                self.apply_start(name.clone())?;
                self.apply_end(&name)
            }
            Token::Text(text) => self.apply_text(text),
            Token::Skip => Ok(()),
        }
    }

    fn apply_start(&mut self, name: String) -> Result<(), Error> {
        let next = match self.stack.last() {
            None if name == "methodResponse" => Frame::MethodResponse,
            Some(Frame::MethodResponse) => match name.as_str() {
                "params" => Frame::Params { value: None },
                "fault" => Frame::FaultTag { value: None },
                _ => return Err(Error::XmlUnexpectedElement(name)),
            },
            Some(Frame::Params { value: None }) if name == "param" => Frame::Param { value: None },
            Some(Frame::Param { value: None })
            | Some(Frame::FaultTag { value: None })
            | Some(Frame::Data { .. })
                if name == "value" =>
            {
                Frame::Value {
                    text: String::new(),
                    typed: None,
                }
            }
            Some(Frame::Value { typed: None, .. }) => {
                if SCALAR_TAGS.contains(&name.as_str()) {
                    Frame::Scalar {
                        tag: name,
                        text: String::new(),
                    }
                } else if name == "array" {
                    Frame::Array { values: None }
                } else if name == "struct" {
                    Frame::StructTag { members: vec![] }
                } else {
                    return Err(Error::XmlUnexpectedElement(name));
                }
            }
            Some(Frame::Array { values: None }) if name == "data" => Frame::Data { values: vec![] },
            Some(Frame::StructTag { .. }) if name == "member" => Frame::Member {
                name: None,
                value: None,
            },
            Some(Frame::Member { name: None, .. }) if name == "name" => Frame::Name {
                text: String::new(),
            },
            Some(Frame::Member {
                name: Some(_),
                value: None,
            }) if name == "value" => Frame::Value {
                text: String::new(),
                typed: None,
            },
            _ => return Err(Error::XmlUnexpectedElement(name)),
        };

        self.stack.push(next);
        Ok(())
    }

    fn apply_text(&mut self, text: String) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(Frame::Scalar { text: t, .. })
            | Some(Frame::Name { text: t })
            | Some(Frame::Value { text: t, typed: None }) => {
                t.push_str(&text);
                Ok(())
            }
            _ => {
                // Whitespace between structural tags is insignificant.
                if text.trim().is_empty() {
                    Ok(())
                } else {
                    Err(Error::XmlParseFail("text outside a value".into()))
                }
            }
        }
    }

    fn apply_end(&mut self, name: &str) -> Result<(), Error> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::XmlParseFail(format!("unmatched end tag: {}", name)))?;

        if frame.tag() != name {
            return Err(Error::XmlParseFail(format!(
                "mismatched end tag: expected {}, got {}",
                frame.tag(),
                name
            )));
        }

        match frame {
            Frame::Scalar { tag, text } => {
                let v = parse_scalar(&tag, text)?;
                self.set_typed(v)
            }
            Frame::Value { text, typed } => {
                let v = typed.unwrap_or(Value::String(text));
                self.deliver_value(v)
            }
            Frame::Name { text } => match self.stack.last_mut() {
                Some(Frame::Member { name, .. }) => {
                    *name = Some(text);
                    Ok(())
                }
                _ => Err(Error::XmlParseFail("name outside member".into())),
            },
            Frame::Data { values } => match self.stack.last_mut() {
                Some(Frame::Array { values: av }) => {
                    *av = Some(values);
                    Ok(())
                }
                _ => Err(Error::XmlParseFail("data outside array".into())),
            },
            Frame::Array { values } => self.set_typed(Value::Array(values.unwrap_or_default())),
            Frame::StructTag { members } => self.set_typed(Value::Struct(members)),
            Frame::Member { name, value } => {
                let (name, value) = name
                    .zip(value)
                    .ok_or_else(|| Error::XmlParseFail("incomplete struct member".into()))?;
                match self.stack.last_mut() {
                    Some(Frame::StructTag { members }) => {
                        members.push((name, value));
                        Ok(())
                    }
                    _ => Err(Error::XmlParseFail("member outside struct".into())),
                }
            }
            Frame::Param { value } => {
                let v = value.ok_or_else(|| Error::XmlParseFail("param without value".into()))?;
                match self.stack.last_mut() {
                    Some(Frame::Params { value }) => {
                        *value = Some(v);
                        Ok(())
                    }
                    _ => Err(Error::XmlParseFail("param outside params".into())),
                }
            }
            Frame::Params { value } => {
                let v = value.ok_or_else(|| Error::XmlParseFail("params without param".into()))?;
                self.pending = Some(Ok(v));
                Ok(())
            }
            Frame::FaultTag { value } => {
                let v = value.ok_or_else(|| Error::XmlParseFail("fault without value".into()))?;
                self.pending = Some(Err(fault_from_value(v)?));
                Ok(())
            }
            Frame::MethodResponse => {
                let r = self
                    .pending
                    .take()
                    .ok_or_else(|| Error::XmlParseFail("empty methodResponse".into()))?;
                self.result = Some(r);
                Ok(())
            }
        }
    }

    /// A completed type element sets the value of the enclosing `<value>`.
    fn set_typed(&mut self, v: Value) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(Frame::Value { typed, .. }) => {
                *typed = Some(v);
                Ok(())
            }
            _ => Err(Error::XmlParseFail("type element outside value".into())),
        }
    }

    /// A completed `<value>` lands in whatever holds it.
    fn deliver_value(&mut self, v: Value) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(Frame::Param { value })
            | Some(Frame::FaultTag { value })
            | Some(Frame::Member { value, .. }) => {
                *value = Some(v);
                Ok(())
            }
            Some(Frame::Data { values }) => {
                values.push(v);
                Ok(())
            }
            _ => Err(Error::XmlParseFail("value in unexpected position".into())),
        }
    }
}

fn parse_scalar(tag: &str, text: String) -> Result<Value, Error> {
    let v = match tag {
        "i4" | "int" => Value::Int(
            text.trim()
                .parse()
                .map_err(|_| Error::XmlParseFail(format!("bad int: {}", text.trim())))?,
        ),
        "boolean" => match text.trim() {
            "1" | "true" => Value::Bool(true),
            "0" | "false" => Value::Bool(false),
            other => return Err(Error::XmlParseFail(format!("bad boolean: {}", other))),
        },
        "string" => Value::String(text),
        "double" => Value::Double(
            text.trim()
                .parse()
                .map_err(|_| Error::XmlParseFail(format!("bad double: {}", text.trim())))?,
        ),
        "dateTime.iso8601" => Value::DateTime(text.trim().to_string()),
        "base64" => {
            let stripped: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            Value::Base64(
                BASE64_STANDARD
                    .decode(stripped)
                    .map_err(|e| Error::XmlParseFail(format!("bad base64: {}", e)))?,
            )
        }
        _ => unreachable!("scalar tags are checked on start"),
    };

    Ok(v)
}

fn fault_from_value(v: Value) -> Result<Fault, Error> {
    let malformed = || Error::XmlParseFail("malformed fault struct".into());

    let Value::Struct(members) = v else {
        return Err(malformed());
    };

    let mut code = None;
    let mut string = None;

    for (name, value) in members {
        match (name.as_str(), value) {
            ("faultCode", Value::Int(c)) => code = Some(c),
            ("faultString", Value::String(s)) => string = Some(s),
            _ => return Err(malformed()),
        }
    }

    let (code, string) = code.zip(string).ok_or_else(malformed)?;

    Ok(Fault { code, string })
}

/// Extract the next token from the front of `buf`.
///
/// Returns `None` when the buffer holds only an incomplete token; the
/// caller waits for more input.
fn next_token(buf: &[u8]) -> Result<Option<(usize, Token)>, Error> {
    if buf.is_empty() {
        return Ok(None);
    }

    if buf[0] != b'<' {
        // Text runs until the next tag. Hold it until the tag arrives,
        // so entities and multi-byte characters are never split.
        let Some(pos) = buf.iter().position(|b| *b == b'<') else {
            return Ok(None);
        };
        let text = as_utf8(&buf[..pos])?;
        return Ok(Some((pos, Token::Text(unescape(text)?))));
    }

    if buf.starts_with(b"<!--") {
        let Some(pos) = find(buf, b"-->") else {
            return Ok(None);
        };
        return Ok(Some((pos + 3, Token::Skip)));
    }

    let Some(pos) = buf.iter().position(|b| *b == b'>') else {
        return Ok(None);
    };
    let consumed = pos + 1;
    let inner = as_utf8(&buf[1..pos])?;

    if inner.starts_with('?') || inner.starts_with('!') {
        return Ok(Some((consumed, Token::Skip)));
    }

    let token = if let Some(name) = inner.strip_prefix('/') {
        Token::End(name.trim().to_string())
    } else {
        let (inner, empty) = match inner.strip_suffix('/') {
            Some(rest) => (rest, true),
            None => (inner, false),
        };

        // Attributes, if any, are not part of the XML-RPC grammar.
        let name = inner.split_whitespace().next().unwrap_or_default();
        if name.is_empty() {
            return Err(Error::XmlParseFail("empty tag name".into()));
        }

        if empty {
            Token::Empty(name.to_string())
        } else {
            Token::Start(name.to_string())
        }
    };

    Ok(Some((consumed, token)))
}

fn as_utf8(buf: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(buf).map_err(|_| Error::XmlParseFail("invalid utf-8".into()))
}

fn find(buf: &[u8], needle: &[u8]) -> Option<usize> {
    buf.windows(needle.len()).position(|w| w == needle)
}

fn unescape(text: &str) -> Result<String, Error> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        let end = rest
            .find(';')
            .ok_or_else(|| Error::XmlParseFail("unterminated entity".into()))?;
        let entity = &rest[1..end];

        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let num = entity
                    .strip_prefix("#x")
                    .map(|h| u32::from_str_radix(h, 16))
                    .or_else(|| entity.strip_prefix('#').map(|d| d.parse()));

                let c = num
                    .and_then(|n| n.ok())
                    .and_then(char::from_u32)
                    .ok_or_else(|| Error::XmlParseFail(format!("unknown entity: {}", entity)))?;

                out.push(c);
            }
        }

        rest = &rest[end + 1..];
    }

    out.push_str(rest);

    Ok(out)
}
