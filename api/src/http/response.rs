use bytes::Bytes;
use http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION},
    HeaderValue, StatusCode,
};

pub type Response = http::Response<Option<Bytes>>;

pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        let mut response = http::Response::new(None);
        *response.status_mut() = self;
        response.headers_mut().insert(CONTENT_LENGTH, 0.into());

        response
    }
}

fn with_body(body: Bytes, content_type: &'static str) -> Response {
    let body_len = body.len();
    let mut response = http::Response::new(Some(body));

    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, body_len.into());

    response
}

impl IntoResponse for Bytes {
    fn into_response(self) -> Response {
        with_body(self, mime::APPLICATION_OCTET_STREAM.as_ref())
    }
}

pub struct Json<T>(pub T);
impl<T> IntoResponse for Json<T>
where
    T: serde::Serialize,
{
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(json) => with_body(json.into(), mime::APPLICATION_JSON.as_ref()),
            Err(err) => {
                tracing::error!(%err, "failed to serialize response body");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// A rendered HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Html(pub String);

impl Html {
    pub fn content_type(&self) -> &'static str {
        mime::TEXT_HTML_UTF_8.as_ref()
    }
}

impl IntoResponse for Html {
    fn into_response(self) -> Response {
        let content_type = self.content_type();
        with_body(Bytes::from(self.0), content_type)
    }
}

pub struct Redirect {
    status: StatusCode,
    location: &'static str,
}

impl Redirect {
    /// `303 See Other`, the redirect to follow a successful form post.
    pub fn see_other(location: &'static str) -> Self {
        Self {
            status: StatusCode::SEE_OTHER,
            location,
        }
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        let mut response = self.status.into_response();
        response
            .headers_mut()
            .insert(LOCATION, HeaderValue::from_static(self.location));

        response
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        with_body(Bytes::from(self), mime::TEXT_PLAIN_UTF_8.as_ref())
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        with_body(Bytes::from(self), mime::TEXT_PLAIN_UTF_8.as_ref())
    }
}

impl<B: IntoResponse> IntoResponse for (StatusCode, B) {
    fn into_response(self) -> Response {
        let mut response = self.1.into_response();
        *response.status_mut() = self.0;

        response
    }
}
