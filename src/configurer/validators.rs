use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("invalid url `{0}`: {1}")]
    InvalidUrl(String, String),
    #[error("unexpected scheme `{0}`, only `{1}` is supported")]
    UnexpectedScheme(String, &'static str),
    #[error("unexpected path `{0}`, expected `{1}`")]
    UnexpectedPath(String, &'static str),
    #[error("user info is not allowed in the endpoint url, credentials must be set in their own fields")]
    UnexpectedUserInfo,
    #[error("invalid json list of labels: {0}")]
    InvalidLabelList(String),
    #[error("invalid json object of labels: {0}")]
    InvalidLabelMap(String),
}

const SCHEME_SEPARATOR: &str = "://";

/// Validates endpoint urls that must point to a fixed vendor path.
#[derive(Debug, Clone, Copy)]
pub struct EndpointValidator {
    scheme: &'static str,
    path: &'static str,
    default_path: bool,
}

impl EndpointValidator {
    /// Only accepts `https` endpoints whose path is exactly `path`.
    pub const fn https(path: &'static str) -> Self {
        Self {
            scheme: "https",
            path,
            default_path: false,
        }
    }

    /// Fills in the expected path when the endpoint has none.
    pub const fn with_default_path(self) -> Self {
        Self {
            default_path: true,
            ..self
        }
    }

    /// Returns the normalized url or the reason it cannot be used as an endpoint.
    ///
    /// `https://` is assumed when the input comes without a scheme.
    pub fn validate(&self, raw: &str) -> Result<String, ValidationError> {
        let raw = raw.trim();
        let with_scheme = if raw.contains(SCHEME_SEPARATOR) {
            raw.to_string()
        } else {
            format!("https{SCHEME_SEPARATOR}{raw}")
        };

        let mut url = Url::parse(&with_scheme)
            .map_err(|e| ValidationError::InvalidUrl(raw.to_string(), e.to_string()))?;

        if url.scheme() != self.scheme {
            return Err(ValidationError::UnexpectedScheme(
                url.scheme().to_string(),
                self.scheme,
            ));
        }

        // Special schemes are always parsed with at least the root path.
        if self.default_path && (url.path().is_empty() || url.path() == "/") {
            url.set_path(self.path);
        }
        if url.path() != self.path {
            return Err(ValidationError::UnexpectedPath(
                url.path().to_string(),
                self.path,
            ));
        }

        if !url.username().is_empty() || url.password().is_some() {
            return Err(ValidationError::UnexpectedUserInfo);
        }

        Ok(url.to_string())
    }
}

const EMPTY_LIST: &str = "[]";

/// Parses an optional json encoded list of attribute names.
///
/// An absent, empty or `[]` value is valid and yields no labels.
pub fn parse_label_list(raw: Option<&str>) -> Result<Vec<String>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") | Some(EMPTY_LIST) => Ok(Vec::default()),
        Some(raw) => serde_json::from_str::<Vec<String>>(raw)
            .map_err(|e| ValidationError::InvalidLabelList(e.to_string())),
    }
}

/// Parses an optional json object of label names to values.
pub fn parse_external_labels(
    raw: Option<&str>,
) -> Result<Option<BTreeMap<String, String>>, ValidationError> {
    raw.map(|raw| {
        serde_json::from_str::<BTreeMap<String, String>>(raw)
            .map_err(|e| ValidationError::InvalidLabelMap(e.to_string()))
    })
    .transpose()
}

/// Builds the transform statement copying a resource attribute into the data point attributes.
pub fn resource_attribute_statement(attribute: &str) -> String {
    format!("set(attributes[\"{attribute}\"], resource.attributes[\"{attribute}\"])")
}
