use std::fmt;

/// Error type for xmlrpc-proto
#[derive(Debug, PartialEq, Eq)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum Error {
    /// Caller misuse of the call surface, such as configuring after
    /// start or starting twice.
    Configuration(&'static str),
    HttpParseFail(String),
    HttpParseTooManyHeaders,
    MissingStatusCode,
    NonFiniteDouble,
    XmlParseFail(String),
    XmlUnexpectedElement(String),
    XmlTruncated,
}

impl From<httparse::Error> for Error {
    fn from(value: httparse::Error) -> Self {
        Error::HttpParseFail(value.to_string())
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(v) => write!(f, "configuration: {}", v),
            Error::HttpParseFail(v) => write!(f, "http parse fail: {}", v),
            Error::HttpParseTooManyHeaders => write!(f, "http parse resulted in too many headers"),
            Error::MissingStatusCode => write!(f, "response head without a status code"),
            Error::NonFiniteDouble => write!(f, "non-finite double cannot be encoded"),
            Error::XmlParseFail(v) => write!(f, "xml parse fail: {}", v),
            Error::XmlUnexpectedElement(v) => write!(f, "unexpected xml element: {}", v),
            Error::XmlTruncated => write!(f, "xml document ended before it was closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_httparse_error() {
        let error: Error = httparse::Error::HeaderName.into();
        assert!(matches!(error, Error::HttpParseFail(_)));
    }

    #[test]
    fn display_is_lowercase() {
        let errors = [
            Error::Configuration("start before configure"),
            Error::HttpParseTooManyHeaders,
            Error::MissingStatusCode,
            Error::NonFiniteDouble,
            Error::XmlParseFail("bad entity".into()),
            Error::XmlUnexpectedElement("flurb".into()),
            Error::XmlTruncated,
        ];

        for e in errors {
            let s = e.to_string();
            assert!(s.chars().next().unwrap().is_lowercase(), "{}", s);
        }
    }
}
