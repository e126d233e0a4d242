//! Execution of the [schema introspection](https://spec.graphql.org/October2021/#sec-Schema-Introspection)
//! meta-fields `__schema` and `__type` of GraphQL queries.
//!
//! Parsing and validation are left to `apollo-compiler`.
//! Build a [`TypeIndex`] once per validated schema,
//! then execute any number of (possibly concurrent) requests with an [`Introspector`].
//!
//! Example usage:
//!
//! ```
#![doc = include_str!("../tests/doc_example.rs")]
//! ```

mod arguments;
mod describe;
mod execution;
mod input_coercion;
mod meta_fields;
mod response;
mod selection;
mod type_index;

pub use self::arguments::resolve_arguments;
pub use self::arguments::ArgumentError;
pub use self::arguments::ArgumentValue;
pub use self::arguments::BoundVariables;
pub use self::execution::get_operation;
pub use self::execution::Introspector;
pub use self::input_coercion::VariableValues;
pub use self::response::Error;
pub use self::response::PathElement;
pub use self::response::RequestErrorResponse;
pub use self::response::Response;
pub use self::response::EXTENSION_SUSPECTED_VALIDATION_BUG;
pub use self::selection::collect_fields;
pub use self::selection::FragmentCycles;
pub use self::selection::GroupedFields;
pub use self::selection::SelectionError;
pub use self::type_index::Deprecation;
pub use self::type_index::DirectiveDefinition;
pub use self::type_index::EnumValueDefinition;
pub use self::type_index::FieldDefinition;
pub use self::type_index::InputValueDefinition;
pub use self::type_index::TypeDefinition;
pub use self::type_index::TypeIndex;
pub use self::type_index::TypeKind;
pub use self::type_index::TypeRef;
pub use serde_json_bytes::ByteString;
pub use serde_json_bytes::Value as JsonValue;

/// Represents a JSON object
pub type JsonMap = serde_json_bytes::Map<ByteString, JsonValue>;
