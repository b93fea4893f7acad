use http::{header, Response, StatusCode};

use crate::parser::try_parse_response;
use crate::xmlrpc::{Decoder, Fault, Value};
use crate::Error;

use super::MAX_RESPONSE_HEADERS;

/// The parsed response head, available once the blank line terminating
/// the headers has been seen.
#[derive(Debug, Clone)]
pub(crate) struct ResponseHead {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl ResponseHead {
    /// Whether the body is a payload type we know how to decode.
    pub fn is_text_xml(&self) -> bool {
        self.content_type.as_deref() == Some("text/xml")
    }
}

/// Incremental two-phase response decoder.
///
/// Phase 1 accumulates bytes until the complete header block arrived.
/// The decoder then pauses: any further bytes are buffered but not
/// interpreted until [`begin_body`][ResponseDecoder::begin_body] is
/// called, which happens only after the status has been validated.
/// Phase 2 streams body bytes into the XML-RPC document decoder.
#[derive(Debug)]
pub(crate) struct ResponseDecoder {
    phase: Phase,
}

#[derive(Debug)]
enum Phase {
    Headers { buf: Vec<u8> },
    Paused { leftover: Vec<u8>, length: Option<u64> },
    Body { remaining: Option<u64>, xml: Decoder },
    Ended,
}

#[derive(Debug)]
pub(crate) enum DecodeEvent {
    /// The header block is complete. The decoder is now paused.
    Headers(ResponseHead),

    /// The XML-RPC document is fully closed.
    Complete(Result<Value, Fault>),
}

impl ResponseDecoder {
    pub fn new() -> Self {
        ResponseDecoder {
            phase: Phase::Headers { buf: vec![] },
        }
    }

    /// Whether the header block has been fully received.
    pub fn headers_done(&self) -> bool {
        !matches!(self.phase, Phase::Headers { .. })
    }

    /// How deep into the document the body decode got. Diagnostic only.
    pub fn body_depth(&self) -> usize {
        match &self.phase {
            Phase::Body { xml, .. } => xml.depth(),
            _ => 0,
        }
    }

    /// Feed the next chunk received from the connection.
    pub fn feed(&mut self, input: &[u8]) -> Result<Option<DecodeEvent>, Error> {
        match &mut self.phase {
            Phase::Headers { buf } => {
                buf.extend_from_slice(input);

                let Some((n, response)) = try_parse_response::<MAX_RESPONSE_HEADERS>(buf)? else {
                    return Ok(None);
                };

                let head = parse_head(&response)?;
                let leftover = buf.split_off(n);

                self.phase = Phase::Paused {
                    leftover,
                    length: head.content_length,
                };

                Ok(Some(DecodeEvent::Headers(head)))
            }
            Phase::Paused { leftover, .. } => {
                // Status not validated yet. Buffer without interpreting.
                leftover.extend_from_slice(input);
                Ok(None)
            }
            Phase::Body { .. } => self.feed_body(input),
            Phase::Ended => Ok(None),
        }
    }

    /// Start decoding the body. Called once the status is validated.
    pub fn begin_body(&mut self) -> Result<Option<DecodeEvent>, Error> {
        let prev = std::mem::replace(&mut self.phase, Phase::Ended);

        let Phase::Paused { leftover, length } = prev else {
            self.phase = prev;
            return Ok(None);
        };

        self.phase = Phase::Body {
            remaining: length,
            xml: Decoder::new(),
        };

        self.feed_body(&leftover)
    }

    fn feed_body(&mut self, input: &[u8]) -> Result<Option<DecodeEvent>, Error> {
        let Phase::Body { remaining, xml } = &mut self.phase else {
            return Ok(None);
        };

        // Bytes past the announced content length are not body.
        let take = match remaining {
            Some(r) => input.len().min(*r as usize),
            None => input.len(),
        };

        let complete = xml.feed(&input[..take])?;

        if let Some(r) = remaining {
            *r -= take as u64;
        }

        if complete {
            let result = xml.take_result();
            self.phase = Phase::Ended;
            return match result {
                Some(r) => Ok(Some(DecodeEvent::Complete(r))),
                None => Err(Error::XmlTruncated),
            };
        }

        if *remaining == Some(0) {
            // Content length ran out with the document still open.
            return Err(Error::XmlTruncated);
        }

        Ok(None)
    }
}

fn parse_head(response: &Response<()>) -> Result<ResponseHead, Error> {
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        });

    let content_length = match response.headers().get(header::CONTENT_LENGTH) {
        Some(v) => Some(
            v.to_str()
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .ok_or_else(|| Error::HttpParseFail("bad content-length header".into()))?,
        ),
        None => None,
    };

    Ok(ResponseHead {
        status: response.status(),
        content_type,
        content_length,
    })
}
