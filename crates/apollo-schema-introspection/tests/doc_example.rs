use apollo_compiler::validation::Valid;
use apollo_compiler::ExecutableDocument;
use apollo_schema_introspection::Introspector;
use apollo_schema_introspection::JsonMap;
use apollo_schema_introspection::RequestErrorResponse;
use apollo_schema_introspection::Response;
use apollo_schema_introspection::TypeIndex;

/// `document` is presumed valid against the schema `index` was built from
pub fn execute_request(
    index: &TypeIndex,
    document: &Valid<ExecutableDocument>,
    operation_name: Option<&str>,
    variable_values: &JsonMap,
) -> Result<Response, RequestErrorResponse> {
    let introspection_response =
        Introspector::new(index).execute(document, operation_name, variable_values)?;
    let response = execute_concrete_fields(document, operation_name, variable_values)?;
    Ok(response.merge(introspection_response))
}

fn execute_concrete_fields(
    _document: &ExecutableDocument,
    _operation_name: Option<&str>,
    _variable_values: &JsonMap,
) -> Result<Response, RequestErrorResponse> {
    unimplemented!()
}
