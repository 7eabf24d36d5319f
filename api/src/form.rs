//! Binding of submitted request bodies to typed values.
//!
//! A [`Form`] keeps the raw submitted fields next to the bound value so a
//! failed submission can be rendered back with its errors.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::header::CONTENT_TYPE;

use crate::{
    domains::{Person, NAME_MAX_LEN},
    http::Request,
};

pub const REQUIRED: &str = "This field is required";
pub const INVALID_BODY: &str = "Invalid request body";
pub const INVALID_VALUE: &str = "Invalid value";

#[derive(Debug, Clone)]
pub struct Form<T> {
    value: Option<T>,
    data: BTreeMap<String, String>,
    errors: BTreeMap<String, Vec<String>>,
    global_errors: Vec<String>,
}

impl<T> Default for Form<T> {
    fn default() -> Self {
        Self {
            value: None,
            data: BTreeMap::new(),
            errors: BTreeMap::new(),
            global_errors: Vec::new(),
        }
    }
}

impl<T> Form<T> {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || !self.global_errors.is_empty()
    }

    /// The bound value, only present when binding succeeded without errors.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn raw(&self, field: &str) -> Option<&str> {
        self.data.get(field).map(String::as_str)
    }

    pub fn errors(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn global_errors(&self) -> &[String] {
        &self.global_errors
    }

    fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }
}

pub trait FormFactory: Send + Sync {
    fn person_form(&self, request: &Request) -> Form<Person>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFormFactory;

impl FormFactory for DefaultFormFactory {
    fn person_form(&self, request: &Request) -> Form<Person> {
        let mut form = Form::default();

        let Some(body) = request.body().as_ref().filter(|body| !body.is_empty()) else {
            form.global_errors.push(INVALID_BODY.to_owned());
            return form;
        };

        let fields = match BodyKind::of(request, body) {
            BodyKind::Json => json_fields(body),
            BodyKind::UrlEncoded => Some((urlencoded_fields(body), Vec::new())),
        };
        let Some((fields, structured)) = fields else {
            form.global_errors.push(INVALID_BODY.to_owned());
            return form;
        };
        form.data = fields;

        let name = form.raw("name").unwrap_or_default().to_owned();
        if structured.iter().any(|key| key == "name") {
            form.reject("name", INVALID_VALUE);
        } else if name.trim().is_empty() {
            form.reject("name", REQUIRED);
        } else if name.chars().count() > NAME_MAX_LEN {
            form.reject("name", format!("Maximum length is {NAME_MAX_LEN}"));
        }

        if !form.has_errors() {
            form.value = Some(Person::new(name));
        }

        form
    }
}

enum BodyKind {
    Json,
    UrlEncoded,
}

impl BodyKind {
    fn of(request: &Request, body: &Bytes) -> Self {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<mime::Mime>().ok());

        match content_type.as_ref().map(mime::Mime::essence_str) {
            Some(essence) if essence == mime::APPLICATION_JSON.essence_str() => Self::Json,
            Some(essence) if essence == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() => {
                Self::UrlEncoded
            }
            _ => match body.iter().copied().find(|b| !b.is_ascii_whitespace()) {
                Some(b'{') => Self::Json,
                _ => Self::UrlEncoded,
            },
        }
    }
}

/// Scalar members of a JSON object as text. Arrays and objects are not
/// bindable; their keys land in the second map so a bound field of the
/// wrong shape can be reported instead of silently read as missing.
fn json_fields(body: &[u8]) -> Option<(BTreeMap<String, String>, Vec<String>)> {
    let serde_json::Value::Object(object) = serde_json::from_slice::<serde_json::Value>(body).ok()?
    else {
        return None;
    };

    let mut fields = BTreeMap::new();
    let mut structured = Vec::new();
    for (key, value) in object {
        match value {
            serde_json::Value::String(value) => {
                fields.insert(key, value);
            }
            serde_json::Value::Number(value) => {
                fields.insert(key, value.to_string());
            }
            serde_json::Value::Bool(value) => {
                fields.insert(key, value.to_string());
            }
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => structured.push(key),
            serde_json::Value::Null => {}
        }
    }

    Some((fields, structured))
}

fn urlencoded_fields(body: &[u8]) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

#[cfg(test)]
mod tests {
    use http::header::CONTENT_TYPE;

    use super::*;

    fn request(content_type: Option<&str>, body: impl Into<Bytes>) -> Request {
        let mut builder = http::Request::post("/persons");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Some(body.into())).unwrap()
    }

    #[test]
    fn binds_json_payload() {
        let req = request(Some("application/json"), r#"{"id": null, "name": "Steve"}"#);
        let form = DefaultFormFactory.person_form(&req);

        assert!(!form.has_errors());
        assert_eq!(form.value(), Some(&Person::new("Steve")));
    }

    #[test]
    fn binds_urlencoded_payload() {
        let req = request(
            Some("application/x-www-form-urlencoded; charset=utf-8"),
            "name=Steve+Jobs",
        );
        let form = DefaultFormFactory.person_form(&req);

        assert_eq!(form.value(), Some(&Person::new("Steve Jobs")));
    }

    #[test]
    fn sniffs_json_without_content_type() {
        let req = request(None, r#"  {"name": "Ada"}"#);
        let form = DefaultFormFactory.person_form(&req);

        assert_eq!(form.value(), Some(&Person::new("Ada")));
    }

    #[test]
    fn submitted_id_is_not_bound() {
        let req = request(Some("application/json"), r#"{"id": 42, "name": "Steve"}"#);
        let form = DefaultFormFactory.person_form(&req);

        assert_eq!(form.value().and_then(|p| p.id), None);
    }

    #[test]
    fn unrelated_fields_do_not_block_binding() {
        let req = request(
            Some("application/json"),
            r#"{"id": null, "name": "Steve", "active": true, "tags": ["a"], "meta": {"k": 1}}"#,
        );
        let form = DefaultFormFactory.person_form(&req);

        assert!(!form.has_errors(), "{form:?}");
        assert_eq!(form.value(), Some(&Person::new("Steve")));
    }

    #[test]
    fn structured_name_is_a_field_error() {
        let req = request(Some("application/json"), r#"{"name": ["Steve"]}"#);
        let form = DefaultFormFactory.person_form(&req);

        assert!(form.value().is_none());
        assert_eq!(form.errors("name"), [INVALID_VALUE]);
        assert!(form.global_errors().is_empty());
    }

    #[test]
    fn blank_name_is_required() {
        let req = request(Some("application/x-www-form-urlencoded"), "name=++");
        let form = DefaultFormFactory.person_form(&req);

        assert!(form.has_errors());
        assert!(form.value().is_none());
        assert_eq!(form.errors("name"), [REQUIRED]);
        assert_eq!(form.raw("name"), Some("  "));
    }

    #[test]
    fn long_name_is_rejected() {
        let name = "x".repeat(NAME_MAX_LEN + 1);
        let form = DefaultFormFactory.person_form(&request(None, format!("name={name}")));

        assert_eq!(form.errors("name"), ["Maximum length is 255"]);
    }

    #[test]
    fn malformed_json_is_a_global_error() {
        let req = request(Some("application/json"), r#"{"name": "#);
        let form = DefaultFormFactory.person_form(&req);

        assert!(form.has_errors());
        assert_eq!(form.global_errors(), [INVALID_BODY]);
        assert!(form.errors("name").is_empty());
    }

    #[test]
    fn missing_body_is_a_global_error() {
        let req = http::Request::post("/persons").body(None).unwrap();
        let form = DefaultFormFactory.person_form(&req);

        assert_eq!(form.global_errors(), [INVALID_BODY]);
    }
}
