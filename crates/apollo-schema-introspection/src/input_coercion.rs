use crate::arguments::const_value;
use crate::response::request_error;
use crate::response::RequestErrorResponse;
use crate::type_index::TypeIndex;
use crate::type_index::TypeKind;
use crate::type_index::TypeRef;
use crate::JsonMap;
use crate::JsonValue;
use apollo_compiler::executable::Operation;

/// Values of variables from a given GraphQL request, after coercion to types expected by the operation.
#[derive(Debug, Clone, Default)]
pub struct VariableValues(pub(crate) JsonMap);

impl std::ops::Deref for VariableValues {
    type Target = JsonMap;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

macro_rules! request_error {
    ($($arg: tt)+) => {
        return Err(request_error(format!($($arg)+)))
    };
}

macro_rules! validation_bug {
    ($($arg: tt)+) => {
        return Err(request_error(format!($($arg)+)).suspected_validation_bug())
    };
}

impl VariableValues {
    /// <https://spec.graphql.org/October2021/#CoerceVariableValues()>
    ///
    /// Variables that are neither provided nor have a default stay unbound
    /// if their type is nullable.
    pub fn coerce(
        index: &TypeIndex,
        operation: &Operation,
        values: &JsonMap,
    ) -> Result<Self, RequestErrorResponse> {
        let mut coerced = JsonMap::new();
        for variable_def in &operation.variables {
            let name = variable_def.name.as_str();
            let ty = TypeRef::from(&*variable_def.ty);
            if let Some((key, value)) = values.get_key_value(name) {
                let path = Path::Variable(name);
                coerced.insert(key.clone(), coerce_value(index, &path, &ty, value)?);
            } else if let Some(default) = &variable_def.default_value {
                let value = const_value(default).map_err(|err| {
                    request_error(format!("invalid default for variable ${name}: {err}"))
                        .suspected_validation_bug()
                })?;
                coerced.insert(name, value);
            } else if matches!(ty, TypeRef::NonNull(_)) {
                request_error!("missing value for non-null variable ${name}")
            }
        }
        Ok(Self(coerced))
    }
}

/// Where a value being coerced sits, for error messages
enum Path<'a> {
    Variable(&'a str),
    InputField(&'a Path<'a>, &'a str, &'a str),
}

impl std::fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Path::Variable(name) => write!(f, "variable ${name}"),
            Path::InputField(parent, ty, field) => write!(f, "input field {ty}.{field} of {parent}"),
        }
    }
}

fn coerce_value(
    index: &TypeIndex,
    path: &Path<'_>,
    ty: &TypeRef,
    value: &JsonValue,
) -> Result<JsonValue, RequestErrorResponse> {
    let ty = match ty {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                request_error!("null value for non-null {path}")
            }
            &**inner
        }
        ty => {
            if value.is_null() {
                return Ok(JsonValue::Null);
            }
            ty
        }
    };
    let ty_name = match ty {
        TypeRef::List(inner) => {
            // https://spec.graphql.org/October2021/#sec-List.Input-Coercion
            return value
                .as_array()
                .map(Vec::as_slice)
                // If not an array, treat the value as an array of size one:
                .unwrap_or(std::slice::from_ref(value))
                .iter()
                .map(|item| coerce_value(index, path, inner, item))
                .collect();
        }
        TypeRef::NonNull(_) => validation_bug!("doubly non-null type for {path}"),
        TypeRef::Named(name) => name,
    };
    let Some(ty_def) = index.type_by_name(ty_name) else {
        validation_bug!("undefined type {ty_name} for {path}")
    };
    let accepted = match ty_def.kind {
        TypeKind::Scalar => match ty_name.as_str() {
            // https://spec.graphql.org/October2021/#sec-Int.Input-Coercion
            "Int" => value
                .as_i64()
                .is_some_and(|value| i32::try_from(value).is_ok()),
            // https://spec.graphql.org/October2021/#sec-Float.Input-Coercion
            "Float" => value.is_number(),
            "String" => value.is_string(),
            "Boolean" => value.is_boolean(),
            "ID" => value.is_string() || value.is_i64(),
            // Custom scalars are passed through
            _ => true,
        },
        TypeKind::Enum => value.as_str().is_some_and(|value| {
            ty_def
                .enum_values
                .iter()
                .any(|enum_value| enum_value.name == value)
        }),
        TypeKind::InputObject => {
            // https://spec.graphql.org/October2021/#sec-Input-Objects.Input-Coercion
            let Some(object) = value.as_object() else {
                request_error!("could not coerce {path}: {value} to type {ty_name}")
            };
            if let Some(key) = object
                .keys()
                .find(|key| !ty_def.input_fields.iter().any(|f| f.name == key.as_str()))
            {
                request_error!(
                    "input object for {path} has key {} not in type {ty_name}",
                    key.as_str()
                )
            }
            let mut coerced = JsonMap::new();
            for field_def in &ty_def.input_fields {
                let field_path = Path::InputField(path, ty_name, &field_def.name);
                if let Some(field_value) = object.get(field_def.name.as_str()) {
                    let field_value = coerce_value(index, &field_path, &field_def.ty, field_value)?;
                    coerced.insert(field_def.name.as_str(), field_value);
                } else if let Some(default) = &field_def.default_value {
                    let default = const_value(default).map_err(|err| {
                        request_error(format!("invalid default for {field_path}: {err}"))
                            .suspected_validation_bug()
                    })?;
                    coerced.insert(field_def.name.as_str(), default);
                } else if matches!(field_def.ty, TypeRef::NonNull(_)) {
                    request_error!("missing value for non-null {field_path}")
                }
            }
            return Ok(JsonValue::Object(coerced));
        }
        TypeKind::Object | TypeKind::Interface | TypeKind::Union => {
            validation_bug!("non-input type {ty_name} for {path}")
        }
        TypeKind::List | TypeKind::NonNull => {
            validation_bug!("named type {ty_name} with a wrapper kind")
        }
    };
    if accepted {
        Ok(value.clone())
    } else {
        request_error!("could not coerce {path}: {value} to type {ty_name}")
    }
}
