use crate::JsonMap;
use apollo_compiler::Name;
use serde::Serialize;

/// <https://spec.graphql.org/October2021/#sec-Response-Format>
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// None/null if a field error was propagated all the way to the root
    pub data: Option<JsonMap>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Error>,
}

/// A response that contains a [request error].
///
/// Does not contain a `data` entry. This is different from `data: null`.
///
/// [request error]: https://spec.graphql.org/October2021/#sec-Errors.Request-errors
#[derive(Debug, Clone, Serialize)]
pub struct RequestErrorResponse {
    pub errors: [Error; 1],
}

/// <https://spec.graphql.org/October2021/#sec-Errors.Error-result-format>
#[derive(Debug, Clone, Serialize)]
pub struct Error {
    pub message: String,

    /// Empty for request errors
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathElement>,

    #[serde(skip_serializing_if = "JsonMap::is_empty")]
    pub extensions: JsonMap,
}

/// Possible key in the `Error::extensions` map,
/// set on errors that document validation is expected to have prevented
pub const EXTENSION_SUSPECTED_VALIDATION_BUG: &str = "APOLLO_SUSPECTED_VALIDATION_BUG";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    Field(Name),
    ListItem { index: usize },
}

pub(crate) fn request_error(message: impl Into<String>) -> RequestErrorResponse {
    Error::new(message).into_request_error()
}

impl Error {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            extensions: JsonMap::new(),
        }
    }

    pub(crate) fn at_path(mut self, path: Vec<PathElement>) -> Self {
        self.path = path;
        self
    }

    pub(crate) fn suspected_validation_bug(mut self) -> Self {
        self.extensions
            .insert(EXTENSION_SUSPECTED_VALIDATION_BUG, true.into());
        self
    }

    /// Whether this error carries the [`EXTENSION_SUSPECTED_VALIDATION_BUG`] flag
    pub fn is_suspected_validation_bug(&self) -> bool {
        self.extensions
            .get(EXTENSION_SUSPECTED_VALIDATION_BUG)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    pub(crate) fn into_request_error(self) -> RequestErrorResponse {
        RequestErrorResponse { errors: [self] }
    }
}

impl RequestErrorResponse {
    pub(crate) fn suspected_validation_bug(self) -> Self {
        let [err] = self.errors;
        err.suspected_validation_bug().into_request_error()
    }

    /// The message of the single error in this response
    pub fn message(&self) -> &str {
        &self.errors[0].message
    }
}

impl Response {
    /// Combine two partial responses for the same operation,
    /// such as this crate’s output and that of another executor for concrete root fields.
    pub fn merge(mut self, mut other: Self) -> Self {
        if let (Some(self_data), Some(other_data)) = (&mut self.data, other.data) {
            self_data.extend(other_data)
        } else {
            // null was propagated to the root:
            self.data = None
        }
        self.errors.append(&mut other.errors);
        self
    }
}

impl Serialize for PathElement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            PathElement::Field(name) => name.as_str().serialize(serializer),
            PathElement::ListItem { index } => index.serialize(serializer),
        }
    }
}
