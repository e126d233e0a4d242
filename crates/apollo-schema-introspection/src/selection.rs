use crate::arguments::BoundVariables;
use crate::response::request_error;
use crate::response::RequestErrorResponse;
use crate::type_index::TypeDefinition;
use crate::type_index::TypeIndex;
use crate::type_index::TypeKind;
use apollo_compiler::ast::Value;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::Operation;
use apollo_compiler::executable::Selection;
use apollo_compiler::executable::SelectionSet;
use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// Fragment names from the first spread of the cycle back to itself
    #[error(
        "fragment spread cycle: {}",
        .cycle.iter().map(|name| name.as_str()).collect::<Vec<_>>().join(" -> ")
    )]
    FragmentCycle { cycle: Vec<Name> },
}

/// Field selections grouped by response key, in document order
pub type GroupedFields<'doc> = IndexMap<&'doc Name, Vec<&'doc Field>>;

/// Fragments whose expansion reaches a spread of themselves,
/// directly or through field sub-selections and other fragments.
///
/// Validation rejects such documents, but executing one would never terminate.
#[derive(Debug, Default)]
pub struct FragmentCycles {
    /// Fragment name to the spread path leading back to it
    cycles: HashMap<Name, Vec<Name>>,
}

impl FragmentCycles {
    pub fn new(document: &ExecutableDocument) -> Self {
        let mut cycles = HashMap::new();
        for name in document.fragments.keys() {
            let mut path = vec![name];
            if spread_path_to(document, name, &mut path, &mut HashSet::new()) {
                cycles.insert(name.clone(), path.into_iter().cloned().collect());
            }
        }
        if !cycles.is_empty() {
            tracing::debug!(fragments = cycles.len(), "fragment spread cycles in document");
        }
        Self { cycles }
    }

    /// Returns the spread path from `fragment` back to itself, if there is one
    pub fn cycle(&self, fragment: &Name) -> Option<&[Name]> {
        self.cycles.get(fragment).map(Vec::as_slice)
    }
}

/// Depth-first search for a spread of `target`, starting from the last fragment of `path`
fn spread_path_to<'doc>(
    document: &'doc ExecutableDocument,
    target: &Name,
    path: &mut Vec<&'doc Name>,
    visited: &mut HashSet<&'doc Name>,
) -> bool {
    let Some(fragment) = path.last().and_then(|&name| document.fragments.get(name)) else {
        return false;
    };
    let mut spreads = Vec::new();
    nested_spreads(&fragment.selection_set, &mut spreads);
    for name in spreads {
        if name == target {
            path.push(name);
            return true;
        }
        if visited.insert(name) {
            path.push(name);
            if spread_path_to(document, target, path, visited) {
                return true;
            }
            path.pop();
        }
    }
    false
}

fn nested_spreads<'doc>(selection_set: &'doc SelectionSet, spreads: &mut Vec<&'doc Name>) {
    for selection in &selection_set.selections {
        match selection {
            Selection::Field(field) => nested_spreads(&field.selection_set, spreads),
            Selection::FragmentSpread(spread) => spreads.push(&spread.fragment_name),
            Selection::InlineFragment(inline) => nested_spreads(&inline.selection_set, spreads),
        }
    }
}

/// <https://spec.graphql.org/October2021/#CollectFields()>
///
/// Inlines fragment spreads and inline fragments that apply to `object_type`,
/// and drops selections excluded by `@skip` or `@include`.
/// Spreading a fragment listed in `fragment_cycles` is an error.
pub fn collect_fields<'doc>(
    index: &TypeIndex,
    document: &'doc ExecutableDocument,
    fragment_cycles: &FragmentCycles,
    variables: BoundVariables<'_>,
    object_type: &TypeDefinition,
    selections: impl IntoIterator<Item = &'doc Selection>,
) -> Result<GroupedFields<'doc>, SelectionError> {
    let mut collector = Collector {
        index,
        document,
        fragment_cycles,
        variables,
        object_type,
        visited_fragments: HashSet::new(),
        grouped_fields: IndexMap::new(),
    };
    collector.collect(selections)?;
    Ok(collector.grouped_fields)
}

struct Collector<'a, 'doc> {
    index: &'a TypeIndex,
    document: &'doc ExecutableDocument,
    fragment_cycles: &'a FragmentCycles,
    variables: BoundVariables<'a>,
    object_type: &'a TypeDefinition,
    visited_fragments: HashSet<&'doc Name>,
    grouped_fields: GroupedFields<'doc>,
}

impl<'doc> Collector<'_, 'doc> {
    fn collect(
        &mut self,
        selections: impl IntoIterator<Item = &'doc Selection>,
    ) -> Result<(), SelectionError> {
        for selection in selections {
            if self.eval_if_arg(selection, "skip").unwrap_or(false)
                || !self.eval_if_arg(selection, "include").unwrap_or(true)
            {
                continue;
            }
            match selection {
                Selection::Field(field) => self
                    .grouped_fields
                    .entry(field.response_key())
                    .or_default()
                    .push(field.as_ref()),
                Selection::FragmentSpread(spread) => {
                    let name = &spread.fragment_name;
                    if let Some(cycle) = self.fragment_cycles.cycle(name) {
                        return Err(SelectionError::FragmentCycle {
                            cycle: cycle.to_vec(),
                        });
                    }
                    let new = self.visited_fragments.insert(name);
                    if !new {
                        continue;
                    }
                    let Some(fragment) = self.document.fragments.get(name) else {
                        continue;
                    };
                    if !self.does_fragment_type_apply(fragment.type_condition()) {
                        continue;
                    }
                    self.collect(&fragment.selection_set.selections)?;
                }
                Selection::InlineFragment(inline) => {
                    if let Some(condition) = &inline.type_condition {
                        if !self.does_fragment_type_apply(condition) {
                            continue;
                        }
                    }
                    self.collect(&inline.selection_set.selections)?
                }
            }
        }
        Ok(())
    }

    /// <https://spec.graphql.org/October2021/#DoesFragmentTypeApply()>
    fn does_fragment_type_apply(&self, fragment_type: &Name) -> bool {
        let Some(def) = self.index.type_by_name(fragment_type) else {
            return false;
        };
        match def.kind {
            TypeKind::Object => def.name == self.object_type.name,
            TypeKind::Interface => self.object_type.interfaces.contains(fragment_type),
            TypeKind::Union => def.possible_types.contains(&self.object_type.name),
            // Not an output type: validation should have caught this
            _ => false,
        }
    }

    /// `None` when the directive is absent or its condition is not a boolean
    fn eval_if_arg(&self, selection: &Selection, directive_name: &str) -> Option<bool> {
        match selection
            .directives()
            .get(directive_name)?
            .specified_argument_by_name("if")?
            .as_ref()
        {
            Value::Boolean(value) => Some(*value),
            Value::Variable(var) => self.variables.lookup(var).ok()??.as_bool(),
            _ => None,
        }
    }
}

/// Reject operations that nest list meta-fields `max_depth` levels deep or more.
///
/// The introspection schema is recursive,
/// so without a limit a small query can request a response exponential in its depth.
pub(crate) fn check_max_depth(
    document: &ExecutableDocument,
    operation: &Operation,
    max_depth: u32,
) -> Result<(), RequestErrorResponse> {
    let initial_depth = 0;
    check_selection_set(
        document,
        &mut HashSet::new(),
        max_depth,
        initial_depth,
        &operation.selection_set,
    )
}

fn check_selection_set<'doc>(
    document: &'doc ExecutableDocument,
    // A fragment spread again at a depth where it was already checked adds nothing
    fragments_checked: &mut HashSet<(&'doc Name, u32)>,
    max_depth: u32,
    depth_so_far: u32,
    selection_set: &'doc SelectionSet,
) -> Result<(), RequestErrorResponse> {
    for selection in &selection_set.selections {
        match selection {
            Selection::InlineFragment(inline) => check_selection_set(
                document,
                fragments_checked,
                max_depth,
                depth_so_far,
                &inline.selection_set,
            )?,
            Selection::FragmentSpread(spread) => {
                let Some(def) = document.fragments.get(&spread.fragment_name) else {
                    continue;
                };
                if fragments_checked.insert((&spread.fragment_name, depth_so_far)) {
                    check_selection_set(
                        document,
                        fragments_checked,
                        max_depth,
                        depth_so_far,
                        &def.selection_set,
                    )?
                }
            }
            Selection::Field(field) => {
                let mut depth = depth_so_far;
                if matches!(
                    field.name.as_str(),
                    "fields" | "interfaces" | "possibleTypes" | "inputFields"
                ) {
                    depth += 1;
                    if depth >= max_depth {
                        tracing::debug!(depth, max_depth, "introspection query too deep");
                        return Err(request_error("Maximum introspection depth exceeded"));
                    }
                }
                check_selection_set(
                    document,
                    fragments_checked,
                    max_depth,
                    depth,
                    &field.selection_set,
                )?
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_coercion::VariableValues;
    use apollo_compiler::validation::Valid;
    use apollo_compiler::Schema;
    use serde_json_bytes::json;

    const SCHEMA: &str = "type Query { hello: String }";

    fn schema() -> Valid<Schema> {
        Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap()
    }

    /// Builds without validation so that invalid documents reach the collector
    fn document(schema: &Valid<Schema>, query: &str) -> ExecutableDocument {
        ExecutableDocument::parse(schema, query, "query.graphql")
            .unwrap_or_else(|invalid| invalid.partial)
    }

    /// Response keys collected from the selection set of the `__schema` root field
    fn schema_fields(
        query: &str,
        variables: serde_json_bytes::Value,
    ) -> Result<Vec<String>, SelectionError> {
        let schema = schema();
        let index = TypeIndex::new(&schema);
        let document = document(&schema, query);
        let operation = document.operations.get(None).unwrap();
        let Some(Selection::Field(root)) = operation.selection_set.selections.first() else {
            panic!("expected a root field")
        };
        let values = VariableValues(variables.as_object().unwrap().clone());
        let variables = BoundVariables {
            values: &values,
            definitions: &operation.variables,
        };
        let grouped = collect_fields(
            &index,
            &document,
            &FragmentCycles::new(&document),
            variables,
            index.type_by_name("__Schema").unwrap(),
            &root.selection_set.selections,
        )?;
        Ok(grouped.keys().map(|key| key.to_string()).collect())
    }

    #[test]
    fn inlines_fragments_in_document_order() {
        let keys = schema_fields(
            r#"
            query {
                __schema {
                    description
                    ...Roots
                    ... on __Schema { directives { name } }
                    ... on __Type { kind }
                    alias: types { name }
                }
            }
            fragment Roots on __Schema { queryType { name } description }
            "#,
            json!({}),
        );
        assert_eq!(
            keys.unwrap(),
            ["description", "queryType", "directives", "alias"]
        );
    }

    #[test]
    fn skip_and_include() {
        let query = r#"
            query($yes: Boolean!, $no: Boolean = false) {
                __schema {
                    description @skip(if: true)
                    types @include(if: $yes) { name }
                    queryType @include(if: $no) { name }
                    ... @skip(if: $yes) { directives { name } }
                    mutationType @skip(if: false) { name }
                }
            }
        "#;
        let keys = schema_fields(query, json!({"yes": true}));
        assert_eq!(keys.unwrap(), ["types", "mutationType"]);
    }

    #[test]
    fn repeated_spread_is_not_a_cycle() {
        let keys = schema_fields(
            r#"
            query { __schema { ...Desc ...Desc types { name } ...Desc } }
            fragment Desc on __Schema { description }
            "#,
            json!({}),
        );
        assert_eq!(keys.unwrap(), ["description", "types"]);
    }

    #[test]
    fn fragment_cycle() {
        let err = schema_fields(
            r#"
            query { __schema { ...A } }
            fragment A on __Schema { description ...B }
            fragment B on __Schema { types { name } ...A }
            "#,
            json!({}),
        )
        .unwrap_err();
        let SelectionError::FragmentCycle { cycle } = &err;
        assert_eq!(cycle, &["A", "B", "A"]);
        expect_test::expect!["fragment spread cycle: A -> B -> A"].assert_eq(&err.to_string());
    }

    #[test]
    fn spread_cycle_through_nested_fields() {
        let schema = schema();
        let document = document(
            &schema,
            r#"
            query { __type(name: "Query") { ...A } }
            fragment A on __Type { name fields { type { ...B } } }
            fragment B on __Type { ofType { ... on __Type { ...A } } }
            fragment Leaf on __Type { name }
            fragment UsesLeaf on __Type { fields { type { ...Leaf ...Leaf } } }
            "#,
        );
        let cycles = FragmentCycles::new(&document);
        let cycle = |name: &str| {
            cycles
                .cycle(&Name::new(name).unwrap())
                .map(|cycle| cycle.iter().map(|name| name.as_str()).collect::<Vec<_>>())
        };
        assert_eq!(cycle("A").unwrap(), ["A", "B", "A"]);
        assert_eq!(cycle("B").unwrap(), ["B", "A", "B"]);
        assert_eq!(cycle("Leaf"), None);
        assert_eq!(cycle("UsesLeaf"), None);
    }

    #[test]
    fn max_depth() {
        let schema = schema();
        let check = |query: &str| {
            let document = document(&schema, query);
            let operation = document.operations.get(None).unwrap();
            check_max_depth(&document, operation, 3).map_err(|err| err.message().to_owned())
        };
        let ok = check(r#"{ __type(name: "Query") { fields { type { fields { name } } } } }"#);
        assert!(ok.is_ok());
        let err = check(
            r#"
            { __schema { types { fields { type { ...Deep } } } } }
            fragment Deep on __Type { interfaces { possibleTypes { name } } }
            "#,
        );
        expect_test::expect![[r#"
            Err(
                "Maximum introspection depth exceeded",
            )
        "#]]
        .assert_debug_eq(&err);

        // Each spread counts at its own depth
        let ok = check(
            r#"
            { __type(name: "Query") { ...F } __schema { queryType { ...F } } }
            fragment F on __Type { fields { name } }
            "#,
        );
        assert!(ok.is_ok());
        let err = check(
            r#"
            { __type(name: "Query") { ...F fields { type { fields { type { ...F } } } } } }
            fragment F on __Type { fields { type { fields { name } } } }
            "#,
        );
        assert!(err.is_err());
    }
}
