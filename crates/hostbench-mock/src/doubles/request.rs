//! HTTP request double.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Values the request double is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParams {
    /// HTTP method.
    pub method: String,
    /// Path below the application root.
    pub path_info: String,
    /// Query and body parameters.
    pub params: BTreeMap<String, String>,
    /// Request headers; names compare case-insensitively.
    pub headers: BTreeMap<String, String>,
}

impl Default for RequestParams {
    fn default() -> Self {
        Self {
            method: String::from("GET"),
            path_info: String::from("/"),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }
}

impl RequestParams {
    /// Adds a parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }
}

/// Immutable request seen by application code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRequest {
    method: String,
    path_info: String,
    params: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
}

impl FakeRequest {
    /// Request built from `params`.
    #[must_use]
    pub fn new(params: RequestParams) -> Self {
        Self {
            method: params.method.to_ascii_uppercase(),
            path_info: params.path_info,
            params: params.params,
            headers: params
                .headers
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
        }
    }

    /// HTTP method, upper case.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path below the application root.
    #[must_use]
    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    /// Parameter `name`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Parameter `name`, or `default` when absent.
    #[must_use]
    pub fn param_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.param(name).unwrap_or(default)
    }

    /// Every parameter.
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Header `name`, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_exposes_params_and_headers() {
        let mut params = RequestParams::default()
            .param("dir", "/Photos")
            .header("X-Requested-With", "XMLHttpRequest");
        params.method = String::from("post");
        params
            .headers
            .insert(String::from("OCS-APIRequest"), String::from("true"));
        let request = FakeRequest::new(params);

        assert_eq!(request.method(), "POST");
        assert_eq!(request.path_info(), "/");
        assert_eq!(request.param("dir"), Some("/Photos"));
        assert_eq!(request.param_or("view", "list"), "list");
        assert_eq!(request.header("x-requested-with"), Some("XMLHttpRequest"));
        assert_eq!(request.header("ocs-apirequest"), Some("true"));
    }
}
