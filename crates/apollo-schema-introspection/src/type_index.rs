//! Read-only view of a schema in the shape that introspection describes it.

use apollo_compiler::ast;
use apollo_compiler::schema;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use indexmap::IndexMap;

/// Immutable lookup structure over a validated schema.
///
/// Build it once per schema with [`TypeIndex::new`], then share it
/// (for example in an `Arc`) between any number of concurrent introspection requests.
#[derive(Debug, Clone)]
pub struct TypeIndex {
    description: Option<String>,
    /// Sorted by name
    types: IndexMap<Name, TypeDefinition>,
    query_type: Option<Name>,
    mutation_type: Option<Name>,
    subscription_type: Option<Name>,
    directives: IndexMap<Name, DirectiveDefinition>,
}

/// <https://spec.graphql.org/October2021/#sec-Type-Kinds>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

/// A named type: every kind except `LIST` and `NON_NULL`
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub kind: TypeKind,
    /// Object and interface types only
    pub fields: Vec<FieldDefinition>,
    /// Object and interface types only
    pub interfaces: Vec<Name>,
    /// Union members, or object types implementing an interface
    pub possible_types: Vec<Name>,
    /// Enum types only
    pub enum_values: Vec<EnumValueDefinition>,
    /// Input object types only
    pub input_fields: Vec<InputValueDefinition>,
    /// Scalar types only, from `@specifiedBy(url:)`
    pub specified_by_url: Option<String>,
}

/// A reference to a type as written in a field or argument definition.
///
/// `List` and `NonNull` are the synthetic wrapper types.
/// Their nesting is fixed by the schema, so walking `ofType` always terminates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(Name),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub args: Vec<InputValueDefinition>,
    pub ty: TypeRef,
    pub deprecation: Option<Deprecation>,
}

#[derive(Debug, Clone)]
pub struct InputValueDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub ty: TypeRef,
    /// `None` if no default is declared, `Some(Value::Null)` for an explicit `= null`
    pub default_value: Option<Node<ast::Value>>,
    pub deprecation: Option<Deprecation>,
}

#[derive(Debug, Clone)]
pub struct EnumValueDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub deprecation: Option<Deprecation>,
}

#[derive(Debug, Clone)]
pub struct DirectiveDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub args: Vec<InputValueDefinition>,
    pub locations: Vec<ast::DirectiveLocation>,
    pub is_repeatable: bool,
}

/// An application of `@deprecated`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    /// `None` for an explicit `reason: null`
    pub reason: Option<String>,
}

impl TypeIndex {
    pub fn new(schema: &Valid<Schema>) -> Self {
        let default_reason = schema
            .directive_definitions
            .get("deprecated")
            .and_then(|def| def.arguments.iter().find(|arg| arg.name == "reason"))
            .and_then(|arg| arg.default_value.as_deref())
            .and_then(|value| value.as_str());

        let mut implementers = IndexMap::<&Name, Vec<Name>>::new();
        for (name, def) in &schema.types {
            if let ExtendedType::Object(def) = def {
                for interface in &def.implements_interfaces {
                    implementers
                        .entry(&interface.name)
                        .or_default()
                        .push(name.clone());
                }
            }
        }

        let mut types: IndexMap<Name, TypeDefinition> = schema
            .types
            .iter()
            .map(|(name, def)| {
                let possible_types = implementers.get(name).cloned().unwrap_or_default();
                let def = build_type(name, def, possible_types, default_reason);
                (name.clone(), def)
            })
            .collect();
        types.sort_keys();

        let directives = schema
            .directive_definitions
            .iter()
            .map(|(name, def)| {
                let def = DirectiveDefinition {
                    name: name.clone(),
                    description: def.description.as_deref().map(str::to_owned),
                    args: input_values(&def.arguments, default_reason),
                    locations: def.locations.clone(),
                    is_repeatable: def.repeatable,
                };
                (name.clone(), def)
            })
            .collect();

        let root = &schema.schema_definition;
        let index = Self {
            description: root.description.as_deref().map(str::to_owned),
            types,
            query_type: root.query.as_ref().map(|name| name.name.clone()),
            mutation_type: root.mutation.as_ref().map(|name| name.name.clone()),
            subscription_type: root.subscription.as_ref().map(|name| name.name.clone()),
            directives,
        };
        tracing::debug!(
            types = index.types.len(),
            directives = index.directives.len(),
            "built introspection type index"
        );
        index
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Look up a named type, including introspection meta-types such as `__Type`
    pub fn type_by_name(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    /// All types sorted by name, without the introspection meta-types
    pub fn all_types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types
            .values()
            .filter(|def| !def.name.starts_with("__"))
    }

    pub fn query_type(&self) -> Option<&TypeDefinition> {
        self.root_type(&self.query_type)
    }

    pub fn mutation_type(&self) -> Option<&TypeDefinition> {
        self.root_type(&self.mutation_type)
    }

    pub fn subscription_type(&self) -> Option<&TypeDefinition> {
        self.root_type(&self.subscription_type)
    }

    fn root_type(&self, name: &Option<Name>) -> Option<&TypeDefinition> {
        self.type_by_name(name.as_ref()?)
    }

    /// Directive definitions in schema order, built-in ones included
    pub fn directives(&self) -> impl Iterator<Item = &DirectiveDefinition> {
        self.directives.values()
    }
}

impl TypeKind {
    /// The `__TypeKind` enum value
    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::Scalar => "SCALAR",
            TypeKind::Object => "OBJECT",
            TypeKind::Interface => "INTERFACE",
            TypeKind::Union => "UNION",
            TypeKind::Enum => "ENUM",
            TypeKind::InputObject => "INPUT_OBJECT",
            TypeKind::List => "LIST",
            TypeKind::NonNull => "NON_NULL",
        }
    }
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TypeRef {
    /// The name of the innermost named type
    pub fn inner_named_type(&self) -> &Name {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.inner_named_type(),
        }
    }
}

impl From<&ast::Type> for TypeRef {
    fn from(ty: &ast::Type) -> Self {
        match ty {
            ast::Type::Named(name) => TypeRef::Named(name.clone()),
            ast::Type::NonNullNamed(name) => {
                TypeRef::NonNull(Box::new(TypeRef::Named(name.clone())))
            }
            ast::Type::List(inner) => TypeRef::List(Box::new(TypeRef::from(&**inner))),
            ast::Type::NonNullList(inner) => TypeRef::NonNull(Box::new(TypeRef::List(
                Box::new(TypeRef::from(&**inner)),
            ))),
        }
    }
}

fn build_type(
    name: &Name,
    def: &ExtendedType,
    possible_types: Vec<Name>,
    default_reason: Option<&str>,
) -> TypeDefinition {
    let mut ty = TypeDefinition {
        name: name.clone(),
        description: def.description().map(|text| text.to_string()),
        kind: TypeKind::Scalar,
        fields: Vec::new(),
        interfaces: Vec::new(),
        possible_types: Vec::new(),
        enum_values: Vec::new(),
        input_fields: Vec::new(),
        specified_by_url: None,
    };
    match def {
        ExtendedType::Scalar(def) => {
            ty.specified_by_url = def
                .directives
                .get("specifiedBy")
                .and_then(|directive| directive.arguments.iter().find(|arg| arg.name == "url"))
                .and_then(|arg| arg.value.as_str())
                .map(str::to_owned);
        }
        ExtendedType::Object(def) => {
            ty.kind = TypeKind::Object;
            ty.fields = def
                .fields
                .values()
                .map(|def| field(def, default_reason))
                .collect();
            ty.interfaces = def.implements_interfaces.iter().map(|i| i.name.clone()).collect();
        }
        ExtendedType::Interface(def) => {
            ty.kind = TypeKind::Interface;
            ty.fields = def
                .fields
                .values()
                .map(|def| field(def, default_reason))
                .collect();
            ty.interfaces = def.implements_interfaces.iter().map(|i| i.name.clone()).collect();
            ty.possible_types = possible_types;
        }
        ExtendedType::Union(def) => {
            ty.kind = TypeKind::Union;
            ty.possible_types = def.members.iter().map(|m| m.name.clone()).collect();
        }
        ExtendedType::Enum(def) => {
            ty.kind = TypeKind::Enum;
            ty.enum_values = def
                .values
                .values()
                .map(|value| EnumValueDefinition {
                    name: value.value.clone(),
                    description: value.description.as_deref().map(str::to_owned),
                    deprecation: deprecation(&value.directives, default_reason),
                })
                .collect();
        }
        ExtendedType::InputObject(def) => {
            ty.kind = TypeKind::InputObject;
            ty.input_fields = def
                .fields
                .values()
                .map(|def| input_value(def, default_reason))
                .collect();
        }
    }
    ty
}

fn field(def: &schema::FieldDefinition, default_reason: Option<&str>) -> FieldDefinition {
    FieldDefinition {
        name: def.name.clone(),
        description: def.description.as_deref().map(str::to_owned),
        args: input_values(&def.arguments, default_reason),
        ty: TypeRef::from(&def.ty),
        deprecation: deprecation(&def.directives, default_reason),
    }
}

fn input_values(
    defs: &[Node<schema::InputValueDefinition>],
    default_reason: Option<&str>,
) -> Vec<InputValueDefinition> {
    defs.iter()
        .map(|def| input_value(def, default_reason))
        .collect()
}

fn input_value(
    def: &schema::InputValueDefinition,
    default_reason: Option<&str>,
) -> InputValueDefinition {
    InputValueDefinition {
        name: def.name.clone(),
        description: def.description.as_deref().map(str::to_owned),
        ty: TypeRef::from(&*def.ty),
        default_value: def.default_value.clone(),
        deprecation: deprecation(&def.directives, default_reason),
    }
}

fn deprecation(
    directives: &ast::DirectiveList,
    default_reason: Option<&str>,
) -> Option<Deprecation> {
    let directive = directives.get("deprecated")?;
    let reason = match directive.arguments.iter().find(|arg| arg.name == "reason") {
        Some(arg) => arg.value.as_str().map(str::to_owned),
        None => default_reason.map(str::to_owned),
    };
    Some(Deprecation { reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(sdl: &str) -> TypeIndex {
        TypeIndex::new(&Schema::parse_and_validate(sdl, "schema.graphql").unwrap())
    }

    #[test]
    fn types_are_sorted_and_exclude_meta_types() {
        let index = index(
            r#"
            type Query { zebra: Zebra, apple: Apple }
            type Zebra { id: ID }
            type Apple { id: ID }
            "#,
        );
        let names: Vec<&str> = index.all_types().map(|def| def.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"Apple"));
        assert!(names.contains(&"Query"));
        assert!(names.iter().all(|name| !name.starts_with("__")));
        // Still reachable by name
        assert_eq!(index.type_by_name("__Type").unwrap().kind, TypeKind::Object);
        assert!(index.type_by_name("Missing").is_none());
    }

    #[test]
    fn shareable_between_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypeIndex>();
    }

    #[test]
    fn root_types() {
        let index = index(
            r#"
            schema { query: QueryRoot }
            type QueryRoot { onlyField: String }
            "#,
        );
        assert_eq!(index.query_type().unwrap().name, "QueryRoot");
        assert!(index.mutation_type().is_none());
        assert!(index.subscription_type().is_none());
    }

    #[test]
    fn wrapped_types() {
        let index = index("type Query { matrix: [[Int!]]! }");
        let field = &index.type_by_name("Query").unwrap().fields[0];
        let int = || TypeRef::Named(Name::new("Int").unwrap());
        assert_eq!(
            field.ty,
            TypeRef::NonNull(Box::new(TypeRef::List(Box::new(TypeRef::List(Box::new(
                TypeRef::NonNull(Box::new(int()))
            ))))))
        );
        assert_eq!(field.ty.inner_named_type(), "Int");
    }

    #[test]
    fn deprecation_reasons() {
        let index = index(
            r#"
            type Query {
                dep: String @deprecated
                depReason: String @deprecated(reason: "because")
                depNull: String @deprecated(reason: null)
                notDep: String
            }
            "#,
        );
        let reasons: Vec<_> = index
            .type_by_name("Query")
            .unwrap()
            .fields
            .iter()
            .map(|field| field.deprecation.clone().map(|dep| dep.reason))
            .collect();
        assert_eq!(
            reasons,
            [
                Some(Some("No longer supported".to_owned())),
                Some(Some("because".to_owned())),
                Some(None),
                None,
            ]
        );
    }

    #[test]
    fn possible_types_of_interfaces_and_unions() {
        let index = index(
            r#"
            type Query { node: Node, result: Result }
            interface Node { id: ID! }
            interface Entity implements Node { id: ID! }
            type User implements Node & Entity { id: ID! }
            type Group implements Node { id: ID! }
            union Result = Group | User
            "#,
        );
        let possible = |name: &str| -> Vec<String> {
            index.type_by_name(name).unwrap().possible_types.iter().map(|n| n.to_string()).collect()
        };
        assert_eq!(possible("Node"), ["User", "Group"]);
        assert_eq!(possible("Entity"), ["User"]);
        assert_eq!(possible("Result"), ["Group", "User"]);
        assert!(possible("User").is_empty());
        assert_eq!(index.type_by_name("Entity").unwrap().interfaces, ["Node"]);
    }

    #[test]
    fn input_defaults_distinguish_absent_and_null() {
        let index = index(
            r#"
            type Query { f(arg: TestInputObject): String }
            input TestInputObject {
                a: String = "test"
                b: [String]
                c: String = null
            }
            "#,
        );
        let fields = &index.type_by_name("TestInputObject").unwrap().input_fields;
        assert_eq!(
            fields[0].default_value.as_deref(),
            Some(&ast::Value::String("test".into()))
        );
        assert!(fields[1].default_value.is_none());
        assert_eq!(fields[2].default_value.as_deref(), Some(&ast::Value::Null));
    }
}
