use reqwest::Method;
use std::borrow::Cow;

/// Static description of one API call: where it goes, which verb it uses and
/// whether it carries the bearer token.
///
/// Paths are relative to the configured base URL and never start with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    path: Cow<'static, str>,
    method: Method,
    requires_auth: bool,
    query: Vec<(&'static str, String)>,
}

impl Endpoint {
    pub fn new(method: Method, path: impl Into<Cow<'static, str>>) -> Self {
        Self {
            path: path.into(),
            method,
            requires_auth: true,
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Marks the endpoint as callable without credentials.
    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    pub fn with_query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub fn with_page(self, page: u32, page_size: u32) -> Self {
        self.with_query("page", page).with_query("pageSize", page_size)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn query(&self) -> &[(&'static str, String)] {
        &self.query
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn endpoints_require_auth_unless_marked_public() {
        assert!(Endpoint::get("stories/me").requires_auth());
        assert!(!Endpoint::post("auth/login").public().requires_auth());
    }

    #[test]
    fn page_parameters_are_appended_in_order() {
        let endpoint = Endpoint::get("stories/search")
            .with_query("keyword", "hope")
            .with_page(2, 10);
        assert_eq!(
            endpoint.query(),
            &[
                ("keyword", "hope".to_string()),
                ("page", "2".to_string()),
                ("pageSize", "10".to_string()),
            ]
        );
        assert_eq!(endpoint.to_string(), "GET stories/search");
    }
}
