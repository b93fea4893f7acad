use http::{Response, Version};

use crate::Error;

/// Attempt to parse a response status line + header block.
///
/// Returns `None` until the blank line terminating the headers has been
/// seen. On success, the `usize` is the number of input bytes the head
/// occupied; the rest of the input is body.
pub(crate) fn try_parse_response<const N: usize>(
    input: &[u8],
) -> Result<Option<(usize, Response<()>)>, Error> {
    let mut headers = [httparse::EMPTY_HEADER; N];
    let mut res = httparse::Response::new(&mut headers);

    let n = match res.parse(input) {
        Ok(httparse::Status::Complete(n)) => n,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(httparse::Error::TooManyHeaders) => return Err(Error::HttpParseTooManyHeaders),
        Err(e) => return Err(e.into()),
    };

    let version = match res.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        _ => return Err(Error::HttpParseFail("unrecognized http version".into())),
    };

    let code = res.code.ok_or(Error::MissingStatusCode)?;

    let mut builder = Response::builder().version(version).status(code);

    for h in res.headers {
        builder = builder.header(h.name, h.value);
    }

    let response = builder
        .body(())
        .map_err(|e| Error::HttpParseFail(e.to_string()))?;

    Ok(Some((n, response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn parse_complete_head() {
        const HEAD: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\n\r\nrest";

        let (n, response) = try_parse_response::<16>(HEAD).unwrap().unwrap();

        assert_eq!(n, HEAD.len() - 4);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.version(), Version::HTTP_11);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "text/xml"
        );
    }

    #[test]
    fn parse_partial_head() {
        const HEAD: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\n\r\n";

        // -1 to never see the terminating blank line
        for i in 0..HEAD.len() - 1 {
            let maybe = try_parse_response::<16>(&HEAD[..i]).unwrap();
            assert!(maybe.is_none());
        }
    }

    #[test]
    fn parse_no_headers() {
        const HEAD: &[u8] = b"HTTP/1.1 500 Internal Server Error\r\n\r\n";

        let (n, response) = try_parse_response::<16>(HEAD).unwrap().unwrap();

        assert_eq!(n, HEAD.len());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn parse_garbage() {
        let err = try_parse_response::<16>(b"HTTP/1.1200 OK\r\n\r\n").unwrap_err();
        assert!(matches!(err, Error::HttpParseFail(_)));
    }

    #[test]
    fn parse_too_many_headers() {
        let mut head = String::from("HTTP/1.1 200 OK\r\n");
        for i in 0..20 {
            head.push_str(&format!("X-Header-{}: value\r\n", i));
        }
        head.push_str("\r\n");

        let err = try_parse_response::<4>(head.as_bytes()).unwrap_err();
        assert_eq!(err, Error::HttpParseTooManyHeaders);
    }
}
