//! Resolvers for the introspection meta-types: `__Schema`, `__Type`, and the objects they list.

use crate::meta_fields::DirectiveField;
use crate::meta_fields::EnumValueField;
use crate::meta_fields::FieldField;
use crate::meta_fields::InputValueField;
use crate::meta_fields::SchemaField;
use crate::meta_fields::TypeField;
use crate::type_index::Deprecation;
use crate::type_index::DirectiveDefinition;
use crate::type_index::EnumValueDefinition;
use crate::type_index::FieldDefinition;
use crate::type_index::InputValueDefinition;
use crate::type_index::TypeDefinition;
use crate::type_index::TypeIndex;
use crate::type_index::TypeKind;
use crate::type_index::TypeRef;
use crate::JsonMap;
use crate::JsonValue;
use apollo_compiler::Name;

/// An object of one of the introspection meta-types
#[derive(Debug, Clone, Copy)]
pub(crate) enum MetaObject<'a> {
    Schema,
    Type(TypeHandle<'a>),
    Field(&'a FieldDefinition),
    InputValue(&'a InputValueDefinition),
    EnumValue(&'a EnumValueDefinition),
    Directive(&'a DirectiveDefinition),
}

/// A `__Type` object: either a named type, or a `LIST` or `NON_NULL` wrapper
#[derive(Debug, Clone, Copy)]
pub(crate) enum TypeHandle<'a> {
    Named(&'a TypeDefinition),
    /// Never `TypeRef::Named`
    Wrapper(&'a TypeRef),
}

/// The result of resolving one meta-field, before completion against the selection set
pub(crate) enum Resolved<'a> {
    /// A scalar or enum value, or null
    Leaf(JsonValue),
    Object(MetaObject<'a>),
    List(Vec<Resolved<'a>>),
}

/// A field that could not be resolved.
/// Only happens for documents or schemas that bypassed validation.
#[derive(Debug)]
pub(crate) struct ResolveError {
    pub(crate) message: String,
}

impl<'a> Resolved<'a> {
    pub(crate) fn null() -> Self {
        Self::Leaf(JsonValue::Null)
    }

    fn leaf(value: impl Into<JsonValue>) -> Self {
        Self::Leaf(value.into())
    }

    fn optional_str(value: Option<&str>) -> Self {
        Self::Leaf(value.map_or(JsonValue::Null, JsonValue::from))
    }

    fn nullable_object(object: Option<MetaObject<'a>>) -> Self {
        object.map_or(Self::null(), Self::Object)
    }

    fn objects<T: 'a>(
        items: impl IntoIterator<Item = &'a T>,
        object: impl Fn(&'a T) -> MetaObject<'a>,
    ) -> Self {
        Self::List(items.into_iter().map(|item| Self::Object(object(item))).collect())
    }
}

/// The `__Type` object for a type name, or null if there is no such type
pub(crate) fn lookup_type<'a>(index: &'a TypeIndex, name: &str) -> Resolved<'a> {
    Resolved::nullable_object(
        index
            .type_by_name(name)
            .map(|def| MetaObject::Type(TypeHandle::Named(def))),
    )
}

/// Look up a named type, for places where the schema guarantees it exists
fn named_type<'a>(
    index: &'a TypeIndex,
    name: &str,
) -> Result<Resolved<'a>, ResolveError> {
    match index.type_by_name(name) {
        Some(def) => Ok(Resolved::Object(MetaObject::Type(TypeHandle::Named(def)))),
        None => Err(ResolveError {
            message: format!("Undefined type {name}"),
        }),
    }
}

/// The `__Type` object for a type reference, wrappers included
fn type_ref<'a>(index: &'a TypeIndex, ty: &'a TypeRef) -> Result<Resolved<'a>, ResolveError> {
    match ty {
        TypeRef::Named(name) => named_type(index, name),
        TypeRef::List(_) | TypeRef::NonNull(_) => {
            Ok(Resolved::Object(MetaObject::Type(TypeHandle::Wrapper(ty))))
        }
    }
}

fn named_types<'a>(index: &'a TypeIndex, names: &[Name]) -> Result<Resolved<'a>, ResolveError> {
    names
        .iter()
        .map(|name| named_type(index, name))
        .collect::<Result<_, _>>()
        .map(Resolved::List)
}

fn include_deprecated(arguments: &JsonMap) -> bool {
    arguments
        .get("includeDeprecated")
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

/// Whether something with this optional deprecation is shown for the given `includeDeprecated`
fn is_visible(deprecation: &Option<Deprecation>, include_deprecated: bool) -> bool {
    include_deprecated || deprecation.is_none()
}

fn is_deprecated(deprecation: &Option<Deprecation>) -> Resolved<'static> {
    Resolved::leaf(deprecation.is_some())
}

fn deprecation_reason(deprecation: &Option<Deprecation>) -> Resolved<'static> {
    Resolved::optional_str(deprecation.as_ref().and_then(|dep| dep.reason.as_deref()))
}

fn input_values<'a>(defs: &'a [InputValueDefinition], arguments: &JsonMap) -> Resolved<'a> {
    let include_deprecated = include_deprecated(arguments);
    Resolved::objects(
        defs.iter()
            .filter(|def| is_visible(&def.deprecation, include_deprecated)),
        MetaObject::InputValue,
    )
}

impl<'a> MetaObject<'a> {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            MetaObject::Schema => SchemaField::TYPE_NAME,
            MetaObject::Type(_) => TypeField::TYPE_NAME,
            MetaObject::Field(_) => FieldField::TYPE_NAME,
            MetaObject::InputValue(_) => InputValueField::TYPE_NAME,
            MetaObject::EnumValue(_) => EnumValueField::TYPE_NAME,
            MetaObject::Directive(_) => DirectiveField::TYPE_NAME,
        }
    }

    /// Resolve a field of this object other than `__typename`
    pub(crate) fn resolve_field(
        &self,
        index: &'a TypeIndex,
        field_name: &str,
        arguments: &JsonMap,
    ) -> Result<Resolved<'a>, ResolveError> {
        let unknown_field = || ResolveError {
            message: format!("Unexpected field {}.{field_name}", self.type_name()),
        };
        match *self {
            MetaObject::Schema => {
                let field = SchemaField::from_name(field_name).ok_or_else(unknown_field)?;
                resolve_schema_field(index, field)
            }
            MetaObject::Type(ty) => {
                let field = TypeField::from_name(field_name).ok_or_else(unknown_field)?;
                match ty {
                    TypeHandle::Named(def) => resolve_named_type_field(index, def, field, arguments),
                    TypeHandle::Wrapper(ty) => resolve_wrapper_type_field(index, ty, field),
                }
            }
            MetaObject::Field(def) => {
                let field = FieldField::from_name(field_name).ok_or_else(unknown_field)?;
                Ok(match field {
                    FieldField::Name => Resolved::leaf(def.name.as_str()),
                    FieldField::Description => Resolved::optional_str(def.description.as_deref()),
                    FieldField::Args => input_values(&def.args, arguments),
                    FieldField::Type => return type_ref(index, &def.ty),
                    FieldField::IsDeprecated => is_deprecated(&def.deprecation),
                    FieldField::DeprecationReason => deprecation_reason(&def.deprecation),
                })
            }
            MetaObject::InputValue(def) => {
                let field = InputValueField::from_name(field_name).ok_or_else(unknown_field)?;
                Ok(match field {
                    InputValueField::Name => Resolved::leaf(def.name.as_str()),
                    InputValueField::Description => {
                        Resolved::optional_str(def.description.as_deref())
                    }
                    InputValueField::Type => return type_ref(index, &def.ty),
                    InputValueField::DefaultValue => Resolved::optional_str(
                        def.default_value
                            .as_ref()
                            .map(|value| value.serialize().no_indent().to_string())
                            .as_deref(),
                    ),
                    InputValueField::IsDeprecated => is_deprecated(&def.deprecation),
                    InputValueField::DeprecationReason => deprecation_reason(&def.deprecation),
                })
            }
            MetaObject::EnumValue(def) => {
                let field = EnumValueField::from_name(field_name).ok_or_else(unknown_field)?;
                Ok(match field {
                    EnumValueField::Name => Resolved::leaf(def.name.as_str()),
                    EnumValueField::Description => {
                        Resolved::optional_str(def.description.as_deref())
                    }
                    EnumValueField::IsDeprecated => is_deprecated(&def.deprecation),
                    EnumValueField::DeprecationReason => deprecation_reason(&def.deprecation),
                })
            }
            MetaObject::Directive(def) => {
                let field = DirectiveField::from_name(field_name).ok_or_else(unknown_field)?;
                Ok(match field {
                    DirectiveField::Name => Resolved::leaf(def.name.as_str()),
                    DirectiveField::Description => {
                        Resolved::optional_str(def.description.as_deref())
                    }
                    DirectiveField::Locations => Resolved::List(
                        def.locations
                            .iter()
                            .map(|location| Resolved::leaf(location.name()))
                            .collect(),
                    ),
                    DirectiveField::Args => input_values(&def.args, arguments),
                    DirectiveField::IsRepeatable => Resolved::leaf(def.is_repeatable),
                })
            }
        }
    }
}

fn root_type(def: Option<&TypeDefinition>) -> Resolved<'_> {
    Resolved::nullable_object(def.map(|def| MetaObject::Type(TypeHandle::Named(def))))
}

fn resolve_schema_field(
    index: &TypeIndex,
    field: SchemaField,
) -> Result<Resolved<'_>, ResolveError> {
    Ok(match field {
        SchemaField::Description => Resolved::optional_str(index.description()),
        SchemaField::Types => Resolved::objects(index.all_types(), |def| {
            MetaObject::Type(TypeHandle::Named(def))
        }),
        SchemaField::QueryType => root_type(index.query_type()),
        SchemaField::MutationType => root_type(index.mutation_type()),
        SchemaField::SubscriptionType => root_type(index.subscription_type()),
        SchemaField::Directives => Resolved::objects(index.directives(), MetaObject::Directive),
    })
}

fn resolve_named_type_field<'a>(
    index: &'a TypeIndex,
    def: &'a TypeDefinition,
    field: TypeField,
    arguments: &JsonMap,
) -> Result<Resolved<'a>, ResolveError> {
    let has_fields = matches!(def.kind, TypeKind::Object | TypeKind::Interface);
    Ok(match field {
        TypeField::Kind => Resolved::leaf(def.kind.as_str()),
        TypeField::Name => Resolved::leaf(def.name.as_str()),
        TypeField::Description => Resolved::optional_str(def.description.as_deref()),
        TypeField::Fields if has_fields => {
            let include_deprecated = include_deprecated(arguments);
            Resolved::objects(
                def.fields
                    .iter()
                    .filter(|field| is_visible(&field.deprecation, include_deprecated)),
                MetaObject::Field,
            )
        }
        TypeField::Interfaces if has_fields => return named_types(index, &def.interfaces),
        TypeField::PossibleTypes if matches!(def.kind, TypeKind::Interface | TypeKind::Union) => {
            return named_types(index, &def.possible_types)
        }
        TypeField::EnumValues if def.kind == TypeKind::Enum => {
            let include_deprecated = include_deprecated(arguments);
            Resolved::objects(
                def.enum_values
                    .iter()
                    .filter(|value| is_visible(&value.deprecation, include_deprecated)),
                MetaObject::EnumValue,
            )
        }
        TypeField::InputFields if def.kind == TypeKind::InputObject => {
            input_values(&def.input_fields, arguments)
        }
        TypeField::SpecifiedByUrl => Resolved::optional_str(def.specified_by_url.as_deref()),
        TypeField::Fields
        | TypeField::Interfaces
        | TypeField::PossibleTypes
        | TypeField::EnumValues
        | TypeField::InputFields
        | TypeField::OfType => Resolved::null(),
    })
}

fn resolve_wrapper_type_field<'a>(
    index: &'a TypeIndex,
    ty: &'a TypeRef,
    field: TypeField,
) -> Result<Resolved<'a>, ResolveError> {
    let (kind, inner) = match ty {
        TypeRef::List(inner) => (TypeKind::List, inner),
        TypeRef::NonNull(inner) => (TypeKind::NonNull, inner),
        TypeRef::Named(name) => {
            return Err(ResolveError {
                message: format!("Named type {name} used as a wrapper type"),
            })
        }
    };
    Ok(match field {
        TypeField::Kind => Resolved::leaf(kind.as_str()),
        TypeField::OfType => return type_ref(index, inner),
        TypeField::Name
        | TypeField::Description
        | TypeField::Fields
        | TypeField::Interfaces
        | TypeField::PossibleTypes
        | TypeField::EnumValues
        | TypeField::InputFields
        | TypeField::SpecifiedByUrl => Resolved::null(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use apollo_compiler::Schema;
    use serde_json_bytes::json;

    const SCHEMA: &str = r#"
        type Query {
            list: [String!]
            old: String @deprecated(reason: "because")
        }
        input TestInputObject {
            a: String = "test"
            b: [String]
            c: String = null
            d: [Int] = [1, 2]
        }
        scalar Url @specifiedBy(url: "https://tools.ietf.org/html/rfc3986")
    "#;

    fn index() -> TypeIndex {
        TypeIndex::new(&Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap())
    }

    fn leaf(resolved: Result<Resolved<'_>, ResolveError>) -> JsonValue {
        match resolved.unwrap() {
            Resolved::Leaf(value) => value,
            Resolved::Object(object) => panic!("expected a leaf, got a {}", object.type_name()),
            Resolved::List(_) => panic!("expected a leaf, got a list"),
        }
    }

    fn object(resolved: Result<Resolved<'_>, ResolveError>) -> MetaObject<'_> {
        match resolved.unwrap() {
            Resolved::Object(object) => object,
            _ => panic!("expected an object"),
        }
    }

    fn list(resolved: Result<Resolved<'_>, ResolveError>) -> Vec<Resolved<'_>> {
        match resolved.unwrap() {
            Resolved::List(items) => items,
            _ => panic!("expected a list"),
        }
    }

    fn args(json: JsonValue) -> JsonMap {
        json.as_object().unwrap().clone()
    }

    #[test]
    fn wrapper_types_unwrap_through_of_type() {
        let index = index();
        let query = MetaObject::Type(TypeHandle::Named(index.type_by_name("Query").unwrap()));
        let fields = list(query.resolve_field(&index, "fields", &args(json!({}))));
        assert_eq!(fields.len(), 1);
        let Resolved::Object(list_field) = &fields[0] else {
            panic!("expected an object")
        };
        let list_type = object(list_field.resolve_field(&index, "type", &JsonMap::new()));
        let no_args = JsonMap::new();
        assert_eq!(leaf(list_type.resolve_field(&index, "kind", &no_args)), json!("LIST"));
        assert_eq!(leaf(list_type.resolve_field(&index, "name", &no_args)), JsonValue::Null);
        let non_null = object(list_type.resolve_field(&index, "ofType", &no_args));
        assert_eq!(leaf(non_null.resolve_field(&index, "kind", &no_args)), json!("NON_NULL"));
        let string = object(non_null.resolve_field(&index, "ofType", &no_args));
        assert_eq!(leaf(string.resolve_field(&index, "name", &no_args)), json!("String"));
        assert_eq!(leaf(string.resolve_field(&index, "ofType", &no_args)), JsonValue::Null);
    }

    #[test]
    fn deprecated_fields_are_filtered() {
        let index = index();
        let query = MetaObject::Type(TypeHandle::Named(index.type_by_name("Query").unwrap()));
        let include = args(json!({"includeDeprecated": true}));
        let all = list(query.resolve_field(&index, "fields", &include));
        assert_eq!(all.len(), 2);
        let Resolved::Object(old) = &all[1] else {
            panic!("expected an object")
        };
        let no_args = JsonMap::new();
        assert_eq!(leaf(old.resolve_field(&index, "isDeprecated", &no_args)), json!(true));
        assert_eq!(
            leaf(old.resolve_field(&index, "deprecationReason", &no_args)),
            json!("because")
        );
    }

    #[test]
    fn default_values_render_as_graphql_literals() {
        let index = index();
        let input = MetaObject::Type(TypeHandle::Named(
            index.type_by_name("TestInputObject").unwrap(),
        ));
        let no_args = JsonMap::new();
        let defaults: Vec<JsonValue> = list(input.resolve_field(&index, "inputFields", &no_args))
            .iter()
            .map(|item| {
                let Resolved::Object(field) = item else {
                    panic!("expected an object")
                };
                leaf(field.resolve_field(&index, "defaultValue", &no_args))
            })
            .collect();
        assert_eq!(
            defaults,
            [json!("\"test\""), JsonValue::Null, json!("null"), json!("[1, 2]")]
        );
    }

    #[test]
    fn kind_specific_fields_are_null_elsewhere() {
        let index = index();
        let no_args = JsonMap::new();
        let url = MetaObject::Type(TypeHandle::Named(index.type_by_name("Url").unwrap()));
        assert_eq!(
            leaf(url.resolve_field(&index, "specifiedByURL", &no_args)),
            json!("https://tools.ietf.org/html/rfc3986")
        );
        for field in ["fields", "interfaces", "possibleTypes", "enumValues", "inputFields"] {
            assert_eq!(leaf(url.resolve_field(&index, field, &no_args)), JsonValue::Null);
        }
        let query = MetaObject::Type(TypeHandle::Named(index.type_by_name("Query").unwrap()));
        assert!(list(query.resolve_field(&index, "interfaces", &no_args)).is_empty());
    }

    #[test]
    fn unknown_field_is_an_error() {
        let index = index();
        let err = MetaObject::Schema
            .resolve_field(&index, "nope", &JsonMap::new())
            .err()
            .unwrap();
        expect_test::expect!["Unexpected field __Schema.nope"].assert_eq(&err.message);
    }
}
