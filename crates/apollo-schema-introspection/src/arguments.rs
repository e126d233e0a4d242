use crate::input_coercion::VariableValues;
use crate::JsonMap;
use crate::JsonValue;
use apollo_compiler::ast;
use apollo_compiler::executable::VariableDefinition;
use apollo_compiler::Name;
use apollo_compiler::Node;

/// An argument value as written in a document, before variables are substituted.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    /// `null`, booleans, numbers, strings, and enum values (as their name)
    Scalar(JsonValue),
    List(Vec<ArgumentValue>),
    /// Fields in document order
    Object(Vec<(Name, ArgumentValue)>),
    Variable(Name),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("missing value for variable ${name}")]
    MissingVariable { name: Name },
    #[error("invalid number literal {literal}")]
    InvalidNumber { literal: String },
}

/// The variables visible to one operation: coerced request values
/// and the operation’s own variable definitions (for their defaults).
#[derive(Clone, Copy)]
pub struct BoundVariables<'a> {
    pub values: &'a VariableValues,
    pub definitions: &'a [Node<VariableDefinition>],
}

impl ArgumentValue {
    pub fn from_ast(value: &ast::Value) -> Result<Self, ArgumentError> {
        Ok(match value {
            ast::Value::Null => Self::Scalar(JsonValue::Null),
            ast::Value::Enum(name) => Self::Scalar(name.as_str().into()),
            ast::Value::Variable(name) => Self::Variable(name.clone()),
            ast::Value::String(value) => Self::Scalar(value.as_str().into()),
            ast::Value::Boolean(value) => Self::Scalar((*value).into()),
            ast::Value::Int(value) => Self::Scalar(number(value.as_str())?),
            ast::Value::Float(value) => Self::Scalar(number(value.as_str())?),
            ast::Value::List(items) => Self::List(
                items
                    .iter()
                    .map(|item| Self::from_ast(item))
                    .collect::<Result<_, _>>()?,
            ),
            ast::Value::Object(fields) => Self::Object(
                fields
                    .iter()
                    .map(|(name, value)| Ok((name.clone(), Self::from_ast(value)?)))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Substitute variables, recursively through lists and objects.
    ///
    /// Order and `null` entries are preserved.
    pub fn resolve(&self, variables: BoundVariables<'_>) -> Result<JsonValue, ArgumentError> {
        match self {
            Self::Scalar(value) => Ok(value.clone()),
            Self::List(items) => Ok(JsonValue::Array(
                items
                    .iter()
                    .map(|item| item.resolve(variables))
                    .collect::<Result<_, _>>()?,
            )),
            Self::Object(fields) => {
                let mut object = JsonMap::with_capacity(fields.len());
                for (name, value) in fields {
                    object.insert(name.as_str(), value.resolve(variables)?);
                }
                Ok(JsonValue::Object(object))
            }
            Self::Variable(name) => variables
                .lookup(name)?
                .ok_or_else(|| ArgumentError::MissingVariable { name: name.clone() }),
        }
    }
}

impl BoundVariables<'_> {
    /// The bound value of a variable, or the default from its definition
    pub(crate) fn lookup(&self, name: &Name) -> Result<Option<JsonValue>, ArgumentError> {
        if let Some(value) = self.values.get(name.as_str()) {
            return Ok(Some(value.clone()));
        }
        let default = self
            .definitions
            .iter()
            .find(|def| def.name == *name)
            .and_then(|def| def.default_value.as_ref());
        match default {
            Some(default) => ArgumentValue::from_ast(default)?.resolve(*self).map(Some),
            None => Ok(None),
        }
    }
}

/// <https://spec.graphql.org/October2021/#sec-Coercing-Field-Arguments>
///
/// `definitions` are the arguments declared by the field definition,
/// `supplied` those written in the document.
pub fn resolve_arguments(
    definitions: &[Node<ast::InputValueDefinition>],
    supplied: &[Node<ast::Argument>],
    variables: BoundVariables<'_>,
) -> Result<JsonMap, ArgumentError> {
    let mut resolved = JsonMap::new();
    for arg_def in definitions {
        let default = || {
            arg_def
                .default_value
                .as_ref()
                .map(|default| ArgumentValue::from_ast(default)?.resolve(variables))
                .transpose()
        };
        let value = match supplied.iter().find(|arg| arg.name == arg_def.name) {
            Some(arg) => match ArgumentValue::from_ast(&arg.value)? {
                ArgumentValue::Variable(name) => match variables.lookup(&name)? {
                    Some(value) => Some(value),
                    None => Some(default()?.ok_or(ArgumentError::MissingVariable { name })?),
                },
                value => Some(value.resolve(variables)?),
            },
            None => default()?,
        };
        if let Some(value) = value {
            resolved.insert(arg_def.name.as_str(), value);
        }
    }
    Ok(resolved)
}

/// Convert a value that cannot contain variables, such as a default value
pub(crate) fn const_value(value: &ast::Value) -> Result<JsonValue, ArgumentError> {
    let values = VariableValues::default();
    let variables = BoundVariables {
        values: &values,
        definitions: &[],
    };
    ArgumentValue::from_ast(value)?.resolve(variables)
}

fn number(literal: &str) -> Result<JsonValue, ArgumentError> {
    // Rely on `serde_json::Number`’s own parser to use whatever precision it supports
    literal
        .parse()
        .map(JsonValue::Number)
        .map_err(|_| ArgumentError::InvalidNumber {
            literal: literal.to_owned(),
        })
}
