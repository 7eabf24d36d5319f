use std::{fmt::Write, str::from_utf8};

use bytes::{Buf, BytesMut};
use http::{header::CONTENT_LENGTH, request::Builder, Error as HttpError, Method, Uri, Version};
use memchr::memmem;
use once_cell::sync::Lazy;
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    error::{RequestError, ResponseError},
    http::{LINE_DELIMITER, REQUEST_DELIMITER},
};

use super::{Request, Response};

static FINDER: Lazy<memmem::Finder> = Lazy::new(|| memmem::Finder::new(LINE_DELIMITER));

/// Largest body a client may declare. Person payloads are a few bytes.
pub const MAX_BODY_LEN: usize = 64 * 1024;

/// Frames one HTTP/1.x request per connection. The head is parsed as soon
/// as `\r\n\r\n` arrives; the body is then awaited until `Content-Length`
/// bytes are buffered.
#[derive(Default)]
pub struct ConnectionCodec {
    pending: Option<(Builder, usize)>,
}

impl Decoder for ConnectionCodec {
    type Item = Request;

    type Error = RequestError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let (req, len) = match self.pending.take() {
            Some(pending) => pending,
            None => {
                let Some(position) = memmem::find(src, REQUEST_DELIMITER) else {
                    return Ok(None);
                };

                let head = src.split_to(position);
                let req = request_from_slice(&head)?;
                src.advance(REQUEST_DELIMITER.len());

                let content_length = req
                    .headers_ref()
                    .and_then(|map| map.get(CONTENT_LENGTH))
                    .map(|value| value.to_str().map(str::trim))
                    .transpose()?
                    .map(str::parse::<usize>)
                    .transpose()?
                    .unwrap_or_default();

                if content_length == 0 {
                    return req.body(None).map(Some).map_err(RequestError::HttpError);
                }
                if content_length > MAX_BODY_LEN {
                    return Err(RequestError::ContentLengthTooLarge {
                        declared: content_length,
                        limit: MAX_BODY_LEN,
                    });
                }

                (req, content_length)
            }
        };

        if src.len() < len {
            src.reserve(len - src.len());
            self.pending = Some((req, len));
            return Ok(None);
        }

        if src.len() > len {
            return Err(RequestError::BodyTooLarge {
                expected: len,
                received: src.len(),
            });
        }

        req.body(Some(src.split().freeze()))
            .map(Some)
            .map_err(RequestError::HttpError)
    }
}

#[inline]
fn request_from_slice(buf: &[u8]) -> Result<Builder, RequestError> {
    let mut buf = from_utf8(buf)?;
    let mut request_line = split_to_delimiter(&mut buf)?;

    // request line = "METHOD PATH HTTP/VERSION\r\n"
    let method = split_to_byte(&mut request_line, b' ')?;
    let path = split_to_byte(&mut request_line, b' ')?;
    let version = request_line;

    let mut builder = http::Request::builder()
        .method(Method::try_from(method).map_err(HttpError::from)?)
        .uri(Uri::try_from(path).map_err(HttpError::from)?)
        .version(match version {
            "HTTP/1.0" => Version::HTTP_10,
            "HTTP/1.1" => Version::HTTP_11,
            _ => return Err(RequestError::UnsupportedVersion),
        });

    // header = "Name: Value\r\n"
    while let Ok(mut header) = split_to_delimiter(&mut buf) {
        let key = split_to_byte(&mut header, b':')?;
        builder = builder.header(key, header.trim());
    }

    Ok(builder)
}

#[inline]
fn split_to_byte<'a>(buf: &mut &'a str, byte: u8) -> Result<&'a str, RequestError> {
    memchr::memchr(byte, buf.as_bytes())
        .map(|e| {
            let part = &buf[..e];
            *buf = &buf[e + 1..];
            part
        })
        .ok_or(RequestError::InvalidFormat)
}

#[inline]
fn split_to_delimiter<'a>(buf: &mut &'a str) -> Result<&'a str, RequestError> {
    if buf.is_empty() {
        return Err(RequestError::InvalidFormat);
    }

    match FINDER.find(buf.as_bytes()) {
        Some(pos) => {
            let part = &buf[..pos];
            *buf = &buf[pos + LINE_DELIMITER.len()..];
            Ok(part)
        }
        None => {
            let part = *buf;
            *buf = &buf[part.len()..];
            Ok(part)
        }
    }
}

impl Encoder<Response> for ConnectionCodec {
    type Error = ResponseError;

    fn encode(&mut self, response: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write!(dst, "{:?} {}\r\n", response.version(), response.status())?;

        for (key, value) in response.headers() {
            let value = value.to_str()?;
            write!(dst, "{}: {}\r\n", key, value)?;
        }

        if response.headers().get(CONTENT_LENGTH).is_none() {
            let len = response.body().as_ref().map(|b| b.len()).unwrap_or_default();

            write!(dst, "{}: {}\r\n", CONTENT_LENGTH, len)?;
        }

        write!(dst, "\r\n")?;

        if let Some(body) = response.body() {
            dst.extend_from_slice(body);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use http::{header::CONTENT_TYPE, StatusCode};

    use super::*;
    use crate::http::{IntoResponse, Redirect};

    #[test]
    fn decodes_request_without_body() {
        let mut codec = ConnectionCodec::default();
        let mut src = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]);

        let req = codec.decode(&mut src).unwrap().expect("complete request");

        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.uri().path(), "/");
        assert_eq!(req.headers()["host"], "localhost");
        assert!(req.body().is_none());
    }

    #[test]
    fn waits_for_the_whole_body() {
        let mut codec = ConnectionCodec::default();
        let mut src = BytesMut::from(
            &b"POST /persons HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 16\r\n\r\n{\"name\":"[..],
        );

        assert!(codec.decode(&mut src).unwrap().is_none());

        src.extend_from_slice(b"\"Steve\"}");
        let req = codec.decode(&mut src).unwrap().expect("complete request");

        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(req.body().as_deref(), Some(&b"{\"name\":\"Steve\"}"[..]));
    }

    #[test]
    fn rejects_body_longer_than_reported() {
        let mut codec = ConnectionCodec::default();
        let mut src =
            BytesMut::from(&b"POST /persons HTTP/1.1\r\nContent-Length: 2\r\n\r\nabcd"[..]);

        let err = codec.decode(&mut src).unwrap_err();
        assert!(matches!(
            err,
            RequestError::BodyTooLarge {
                expected: 2,
                received: 4
            }
        ));
    }

    #[test]
    fn rejects_declared_length_over_the_limit() {
        let mut codec = ConnectionCodec::default();
        let mut src = BytesMut::from(
            &b"POST /persons HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\nab"[..],
        );

        let err = codec.decode(&mut src).unwrap_err();
        assert!(matches!(
            err,
            RequestError::ContentLengthTooLarge {
                limit: MAX_BODY_LEN,
                ..
            }
        ));
    }

    #[test]
    fn accepts_body_at_the_limit() {
        let mut codec = ConnectionCodec::default();
        let head = format!("POST /persons HTTP/1.1\r\nContent-Length: {MAX_BODY_LEN}\r\n\r\n");
        let mut src = BytesMut::from(head.as_bytes());

        assert!(codec.decode(&mut src).unwrap().is_none());

        src.extend_from_slice(&vec![b'a'; MAX_BODY_LEN]);
        let req = codec.decode(&mut src).unwrap().expect("complete request");
        assert_eq!(req.body().as_ref().map(|b| b.len()), Some(MAX_BODY_LEN));
    }

    #[test]
    fn rejects_unknown_versions() {
        let mut codec = ConnectionCodec::default();
        let mut src = BytesMut::from(&b"GET / HTTP/9.9\r\n\r\n"[..]);

        assert!(matches!(
            codec.decode(&mut src),
            Err(RequestError::UnsupportedVersion)
        ));
    }

    #[test]
    fn encodes_status_line_and_headers() {
        let mut codec = ConnectionCodec::default();
        let mut dst = BytesMut::new();

        codec
            .encode(Redirect::see_other("/").into_response(), &mut dst)
            .unwrap();

        let text = std::str::from_utf8(&dst).unwrap();
        assert!(text.starts_with("HTTP/1.1 303 See Other\r\n"), "{text}");
        assert!(text.contains("location: /\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn encodes_body_after_headers() {
        let mut codec = ConnectionCodec::default();
        let mut dst = BytesMut::new();

        codec
            .encode((StatusCode::OK, "hello").into_response(), &mut dst)
            .unwrap();

        let text = std::str::from_utf8(&dst).unwrap();
        assert!(text.contains("content-length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\nhello"));
    }
}
