//! Incoming HTTP request type.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

use crate::params::{Params, ParamsError};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// An incoming HTTP request as seen by filters and route targets.
///
/// `params` holds the merged query, form and path parameters once the request
/// has been routed. `path` is the percent-decoded URI path that routing
/// matches against.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: Params,
}

impl Request {
    /// Builds a request and decodes its query string and, for form posts,
    /// its body into the parameter set.
    ///
    /// A form body is consumed by this step: [`Request::body`] is empty
    /// afterwards. A path whose percent-decoding is not UTF-8 is rejected
    /// like a malformed query.
    pub fn from_http(req: http::Request<Bytes>) -> Result<Self, ParamsError> {
        let (parts, mut body) = req.into_parts();
        let path = urlencoding::decode(parts.uri.path()).map_err(|_| ParamsError::InvalidUtf8)?.into_owned();

        let mut params = Params::new();
        if is_form(&parts.method, &parts.headers) {
            let form = std::str::from_utf8(&body).map_err(|_| ParamsError::InvalidUtf8)?;
            params = Params::parse(form)?;
            body = Bytes::new();
        }
        params.extend(Params::parse(parts.uri.query().unwrap_or(""))?);

        Ok(Self { method: parts.method, uri: parts.uri, path, headers: parts.headers, body, params })
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    /// The decoded path: `/hello/a%20b` reads as `/hello/a b`.
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn params(&self) -> &Params { &self.params }
    pub fn params_mut(&mut self) -> &mut Params { &mut self.params }

    /// Header lookup. Values that are not visible ASCII are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the first value of a named parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub(crate) fn into_parts(self) -> (Params, Bytes) {
        (self.params, self.body)
    }
}

fn is_form(method: &Method, headers: &HeaderMap) -> bool {
    let body_method = matches!(*method, Method::POST | Method::PUT | Method::PATCH);
    body_method
        && headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, uri: &str, content_type: Option<&str>, body: &'static str) -> http::Request<Bytes> {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(http::header::CONTENT_TYPE, ct);
        }
        builder.body(Bytes::from_static(body.as_bytes())).unwrap()
    }

    #[test]
    fn query_lands_in_params() {
        let req = Request::from_http(request(Method::GET, "/users?page=2&sort=name", None, "")).unwrap();
        assert_eq!(req.path(), "/users");
        assert_eq!(req.param("page"), Some("2"));
        assert_eq!(req.param("sort"), Some("name"));
    }

    #[test]
    fn path_is_percent_decoded() {
        let req = Request::from_http(request(Method::GET, "/hello/caf%C3%A9/a%2Fb", None, "")).unwrap();
        assert_eq!(req.path(), "/hello/café/a/b");
        assert_eq!(req.uri().path(), "/hello/caf%C3%A9/a%2Fb");
    }

    #[test]
    fn path_decoding_to_invalid_utf8_is_rejected() {
        let err = Request::from_http(request(Method::GET, "/hello/%ff", None, "")).unwrap_err();
        assert!(matches!(err, ParamsError::InvalidUtf8));
    }

    #[test]
    fn malformed_query_is_rejected() {
        assert!(Request::from_http(request(Method::GET, "/users?page=%zz", None, "")).is_err());
    }

    #[test]
    fn form_body_precedes_query_and_is_consumed() {
        let req = Request::from_http(request(
            Method::POST,
            "/users?name=query",
            Some("application/x-www-form-urlencoded; charset=utf-8"),
            "name=form&age=3",
        ))
        .unwrap();
        assert_eq!(req.params().get_all("name").collect::<Vec<_>>(), vec!["form", "query"]);
        assert_eq!(req.param("age"), Some("3"));
        assert!(req.body().is_empty());
    }

    #[test]
    fn json_body_is_left_alone() {
        let req = Request::from_http(request(Method::POST, "/users", Some("application/json"), r#"{"a":1}"#)).unwrap();
        assert!(req.params().is_empty());
        assert_eq!(&req.body()[..], br#"{"a":1}"#);
    }

    #[test]
    fn form_body_on_get_is_not_parsed() {
        let req = Request::from_http(request(
            Method::GET,
            "/users",
            Some("application/x-www-form-urlencoded"),
            "a=1",
        ))
        .unwrap();
        assert!(req.params().is_empty());
    }
}
