use crate::arguments::resolve_arguments;
use crate::arguments::BoundVariables;
use crate::describe;
use crate::describe::MetaObject;
use crate::describe::ResolveError;
use crate::describe::Resolved;
use crate::input_coercion::VariableValues;
use crate::meta_fields::RootField;
use crate::response::request_error;
use crate::response::Error;
use crate::response::PathElement;
use crate::response::RequestErrorResponse;
use crate::response::Response;
use crate::selection::check_max_depth;
use crate::selection::collect_fields;
use crate::selection::FragmentCycles;
use crate::type_index::TypeDefinition;
use crate::type_index::TypeIndex;
use crate::JsonMap;
use crate::JsonValue;
use apollo_compiler::ast::Type;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::Operation;
use apollo_compiler::executable::OperationType;
use apollo_compiler::executable::Selection;
use apollo_compiler::ExecutableDocument;
use apollo_compiler::Node;

const DEFAULT_MAX_DEPTH: u32 = 3;

/// Executes the schema introspection portion of GraphQL queries against one schema.
///
/// Only the meta-fields `__schema`, `__type`, and `__typename` are executed.
/// Concrete root fields are **_silently skipped_**:
/// the caller can execute them separately and combine the two partial responses
/// with [`Response::merge`].
#[derive(Debug, Clone, Copy)]
pub struct Introspector<'schema> {
    index: &'schema TypeIndex,
    max_depth: Option<u32>,
}

/// Return in `Err` when a field error occurred at some non-nullable place
///
/// <https://spec.graphql.org/October2021/#sec-Handling-Field-Errors>
struct PropagateNull;

/// Linked-list version of `Vec<PathElement>`, taking advantage of the call stack
type LinkedPath<'a> = Option<&'a LinkedPathElement<'a>>;

struct LinkedPathElement<'a> {
    element: PathElement,
    next: LinkedPath<'a>,
}

struct ExecutionContext<'a> {
    index: &'a TypeIndex,
    document: &'a ExecutableDocument,
    fragment_cycles: &'a FragmentCycles,
    variables: BoundVariables<'a>,
    errors: &'a mut Vec<Error>,
}

/// The object whose selection set is being executed
#[derive(Clone, Copy)]
enum ObjectValue<'a> {
    /// The query root type: only its meta-fields are executed
    Root(&'a TypeDefinition),
    Meta(MetaObject<'a>),
}

/// Select one operation from a document, based on an optional requested operation name
///
/// <https://spec.graphql.org/October2021/#GetOperation()>
pub fn get_operation<'doc>(
    document: &'doc ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<&'doc Node<Operation>, RequestErrorResponse> {
    document.operations.get(operation_name).map_err(|_| {
        let operations = &document.operations;
        match operation_name {
            Some(name) => request_error(format!("no operation named '{name}'")),
            None if operations.anonymous.is_none() && operations.named.is_empty() => {
                request_error("document does not contain any operation")
            }
            None => request_error("multiple operations but no `operationName`"),
        }
    })
}

impl<'schema> Introspector<'schema> {
    pub fn new(index: &'schema TypeIndex) -> Self {
        Self {
            index,
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }

    /// Configure the nesting limit for the list meta-fields
    /// `fields`, `interfaces`, `possibleTypes`, and `inputFields`.
    ///
    /// Operations nesting them `max_depth` levels deep or more are rejected
    /// with a request error before execution.
    /// Defaults to 3, which leaves room for the standard full introspection query.
    /// `None` disables the check.
    pub fn max_depth(mut self, max_depth: Option<u32>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Select an operation, coerce request variables, then execute.
    ///
    /// `document` is expected to be valid against the schema the index was built from.
    pub fn execute(
        &self,
        document: &ExecutableDocument,
        operation_name: Option<&str>,
        variables: &JsonMap,
    ) -> Result<Response, RequestErrorResponse> {
        let operation = get_operation(document, operation_name)?;
        let variables = VariableValues::coerce(self.index, operation, variables)?;
        self.execute_operation(document, operation, &variables)
    }

    /// Execute one operation with already-coerced variables
    ///
    /// <https://spec.graphql.org/October2021/#ExecuteQuery()>
    pub fn execute_operation(
        &self,
        document: &ExecutableDocument,
        operation: &Operation,
        variables: &VariableValues,
    ) -> Result<Response, RequestErrorResponse> {
        if let Some(max_depth) = self.max_depth {
            check_max_depth(document, operation, max_depth)?
        }
        if operation.operation_type != OperationType::Query {
            tracing::debug!(
                operation_type = ?operation.operation_type,
                "no schema introspection outside of queries"
            );
            return Ok(Response {
                data: Some(JsonMap::new()),
                errors: Vec::new(),
            });
        }
        let Some(root_type) = self.index.query_type() else {
            return Err(request_error("Undefined root operation type").suspected_validation_bug());
        };
        tracing::debug!(
            operation = operation.name.as_ref().map(|name| name.as_str()),
            root_selections = operation.selection_set.selections.len(),
            "executing introspection"
        );
        let fragment_cycles = FragmentCycles::new(document);
        let mut errors = Vec::new();
        let mut ctx = ExecutionContext {
            index: self.index,
            document,
            fragment_cycles: &fragment_cycles,
            variables: BoundVariables {
                values: variables,
                definitions: &operation.variables,
            },
            errors: &mut errors,
        };
        let path = None; // root: empty path
        let data = execute_selection_set(
            &mut ctx,
            path,
            ObjectValue::Root(root_type),
            &operation.selection_set.selections,
        )
        // propagated null is represented as `None` here
        .ok();
        Ok(Response { data, errors })
    }
}

impl<'a> ObjectValue<'a> {
    fn type_name(&self) -> &'a str {
        match self {
            ObjectValue::Root(def) => def.name.as_str(),
            ObjectValue::Meta(object) => object.type_name(),
        }
    }
}

impl ExecutionContext<'_> {
    fn record(&mut self, error: Error) {
        tracing::warn!(
            message = %error.message,
            path = ?error.path,
            "introspection field error"
        );
        self.errors.push(error)
    }
}

/// <https://spec.graphql.org/October2021/#ExecuteSelectionSet()>
fn execute_selection_set<'a>(
    ctx: &mut ExecutionContext<'a>,
    path: LinkedPath<'_>,
    object_value: ObjectValue<'a>,
    selections: impl IntoIterator<Item = &'a Selection>,
) -> Result<JsonMap, PropagateNull> {
    let index = ctx.index;
    let type_name = object_value.type_name();
    let Some(object_type) = index.type_by_name(type_name) else {
        ctx.record(
            field_error(format!("Undefined type {type_name}"), path).suspected_validation_bug(),
        );
        return Err(PropagateNull);
    };
    let grouped_field_set = match collect_fields(
        index,
        ctx.document,
        ctx.fragment_cycles,
        ctx.variables,
        object_type,
        selections,
    ) {
        Ok(grouped) => grouped,
        Err(err) => {
            ctx.record(field_error(err.to_string(), path));
            return Err(PropagateNull);
        }
    };

    let mut response_map = JsonMap::with_capacity(grouped_field_set.len());
    for (&response_key, fields) in &grouped_field_set {
        let field_path = LinkedPathElement {
            element: PathElement::Field(response_key.clone()),
            next: path,
        };
        if let Some(value) = execute_field(ctx, Some(&field_path), object_value, fields)? {
            response_map.insert(response_key.as_str(), value);
        }
    }
    Ok(response_map)
}

/// <https://spec.graphql.org/October2021/#ExecuteField()>
///
/// Return `Ok(None)` for silently skipping that field.
fn execute_field<'a>(
    ctx: &mut ExecutionContext<'a>,
    path: LinkedPath<'_>,
    object_value: ObjectValue<'a>,
    fields: &[&'a Field],
) -> Result<Option<JsonValue>, PropagateNull> {
    // Indexing should not panic: `collect_fields` only creates a `Vec` to push to it
    let field = fields[0];
    if field.name == "__typename" {
        return Ok(Some(object_value.type_name().into()));
    }
    let root_field = match object_value {
        ObjectValue::Root(_) => match RootField::from_name(&field.name) {
            Some(root_field) => Some(root_field),
            None => return Ok(None),
        },
        ObjectValue::Meta(_) => None,
    };
    let ty = &field.definition.ty;
    let arguments = match resolve_arguments(
        &field.definition.arguments,
        &field.arguments,
        ctx.variables,
    ) {
        Ok(arguments) => arguments,
        Err(err) => {
            ctx.record(field_error(err.to_string(), path));
            return try_nullify(ty, Err(PropagateNull)).map(Some);
        }
    };
    let resolved = match (object_value, root_field) {
        (ObjectValue::Meta(object), _) => object.resolve_field(ctx.index, &field.name, &arguments),
        (ObjectValue::Root(_), Some(root_field)) => {
            tracing::trace!(field = %field.name, "resolving root meta-field");
            resolve_root_field(ctx.index, root_field, &arguments)
        }
        (ObjectValue::Root(_), None) => return Ok(None),
    };
    let completed = match resolved {
        Ok(resolved) => complete_value(ctx, path, ty, resolved, fields),
        Err(ResolveError { message }) => {
            ctx.record(field_error(message, path).suspected_validation_bug());
            Err(PropagateNull)
        }
    };
    try_nullify(ty, completed).map(Some)
}

fn resolve_root_field<'a>(
    index: &'a TypeIndex,
    field: RootField,
    arguments: &JsonMap,
) -> Result<Resolved<'a>, ResolveError> {
    match field {
        RootField::Schema => Ok(Resolved::Object(MetaObject::Schema)),
        RootField::Type => {
            let Some(name) = arguments.get("name").and_then(|name| name.as_str()) else {
                return Err(ResolveError {
                    message: "missing string argument `name` of `__type`".to_owned(),
                });
            };
            // An unknown name is not an error, only null
            Ok(describe::lookup_type(index, name))
        }
    }
}

/// <https://spec.graphql.org/October2021/#CompleteValue()>
///
/// Returns `Err` for a field error being propagated upwards to find a nullable place
fn complete_value<'a>(
    ctx: &mut ExecutionContext<'a>,
    path: LinkedPath<'_>,
    ty: &Type,
    resolved: Resolved<'a>,
    fields: &[&'a Field],
) -> Result<JsonValue, PropagateNull> {
    match resolved {
        Resolved::Leaf(JsonValue::Null) if ty.is_non_null() => {
            ctx.record(field_error(
                format!("Non-null type {ty} resolved to null"),
                path,
            ));
            Err(PropagateNull)
        }
        Resolved::Leaf(value) => Ok(value),
        Resolved::List(items) => {
            let item_ty = match ty {
                Type::List(inner) | Type::NonNullList(inner) => &**inner,
                Type::Named(_) | Type::NonNullNamed(_) => {
                    ctx.record(
                        field_error(format!("Non-list type {ty} resolved to a list"), path)
                            .suspected_validation_bug(),
                    );
                    return Err(PropagateNull);
                }
            };
            let mut completed_list = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let item_path = LinkedPathElement {
                    element: PathElement::ListItem { index },
                    next: path,
                };
                let item_result = complete_value(ctx, Some(&item_path), item_ty, item, fields);
                // On field error, try to nullify that item.
                // If the item is non-null, the caller tries to nullify the list.
                completed_list.push(try_nullify(item_ty, item_result)?);
            }
            Ok(JsonValue::Array(completed_list))
        }
        Resolved::Object(object) => {
            // Sub-selections of all fields with the same response key are merged
            let selections = fields
                .iter()
                .flat_map(|&field| &field.selection_set.selections);
            execute_selection_set(ctx, path, ObjectValue::Meta(object), selections)
                .map(JsonValue::Object)
        }
    }
}

fn field_error(message: impl Into<String>, mut link: LinkedPath<'_>) -> Error {
    let mut path = Vec::new();
    while let Some(node) = link {
        path.push(node.element.clone());
        link = node.next;
    }
    path.reverse();
    Error::new(message).at_path(path)
}

/// Try to insert a propagated null if possible, or keep propagating it.
///
/// <https://spec.graphql.org/October2021/#sec-Handling-Field-Errors>
fn try_nullify(
    ty: &Type,
    result: Result<JsonValue, PropagateNull>,
) -> Result<JsonValue, PropagateNull> {
    match result {
        Ok(json) => Ok(json),
        Err(PropagateNull) => {
            if ty.is_non_null() {
                Err(PropagateNull)
            } else {
                Ok(JsonValue::Null)
            }
        }
    }
}
