//! Per-request routing details.

use http::{HeaderMap, HeaderName, HeaderValue, Method};

/// Method, path, headers and query string for one API call.
///
/// Query parameters keep their order and may repeat, as `/user?q=a&q=b`
/// requires.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// The HTTP method.
    pub method: Method,

    /// The path below the API base URL, e.g. `/vn`.
    pub path: String,

    /// Headers added to this request only.
    pub headers: HeaderMap,

    /// Query parameters, in order.
    pub query_params: Vec<(String, String)>,
}

impl RequestMetadata {
    /// Creates metadata for `method` on `path`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query_params: Vec::new(),
        }
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Appends a query parameter; repeated keys are kept.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Appends a query parameter only when `value` is present.
    pub fn with_optional_query_param(
        self,
        key: impl Into<String>,
        value: Option<impl Into<String>>,
    ) -> Self {
        match value {
            Some(value) => self.with_query_param(key, value),
            None => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_query_params_are_kept_in_order() {
        let metadata = RequestMetadata::new(Method::GET, "/user")
            .with_query_param("q", "yorhel")
            .with_query_param("q", "u1")
            .with_optional_query_param("fields", None::<String>)
            .with_optional_query_param("fields", Some("lengthvotes"));

        assert_eq!(
            metadata.query_params,
            vec![
                ("q".to_string(), "yorhel".to_string()),
                ("q".to_string(), "u1".to_string()),
                ("fields".to_string(), "lengthvotes".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_header_is_a_configuration_error() {
        let result = RequestMetadata::new(Method::GET, "/stats").with_header("bad header", "x");
        assert!(matches!(result, Err(crate::Error::ConfigurationError(_))));
    }
}
