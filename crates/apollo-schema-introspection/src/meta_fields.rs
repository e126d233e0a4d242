//! Closed sets of the fields each introspection meta-type exposes.
//!
//! <https://spec.graphql.org/October2021/#sec-Schema-Introspection.Schema-Introspection-Schema>

macro_rules! meta_fields {
    (
        $(
            $(#[$attr: meta])*
            $Enum: ident $( for $type_name: literal )? {
                $( $Variant: ident = $name: literal, )+
            }
        )+
    ) => {
        $(
            $(#[$attr])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub(crate) enum $Enum {
                $( $Variant, )+
            }

            impl $Enum {
                $(
                    /// Name of the meta-type whose fields this enum covers
                    pub(crate) const TYPE_NAME: &'static str = $type_name;
                )?

                /// Returns `None` for a name this enum does not cover
                pub(crate) fn from_name(name: &str) -> Option<Self> {
                    match name {
                        $( $name => Some(Self::$Variant), )+
                        _ => None,
                    }
                }
            }
        )+
    };
}

meta_fields! {
    /// Meta-fields of the root query type, other than `__typename`
    RootField {
        Schema = "__schema",
        Type = "__type",
    }

    SchemaField for "__Schema" {
        Description = "description",
        Types = "types",
        QueryType = "queryType",
        MutationType = "mutationType",
        SubscriptionType = "subscriptionType",
        Directives = "directives",
    }

    TypeField for "__Type" {
        Kind = "kind",
        Name = "name",
        Description = "description",
        Fields = "fields",
        Interfaces = "interfaces",
        PossibleTypes = "possibleTypes",
        EnumValues = "enumValues",
        InputFields = "inputFields",
        OfType = "ofType",
        SpecifiedByUrl = "specifiedByURL",
    }

    FieldField for "__Field" {
        Name = "name",
        Description = "description",
        Args = "args",
        Type = "type",
        IsDeprecated = "isDeprecated",
        DeprecationReason = "deprecationReason",
    }

    InputValueField for "__InputValue" {
        Name = "name",
        Description = "description",
        Type = "type",
        DefaultValue = "defaultValue",
        IsDeprecated = "isDeprecated",
        DeprecationReason = "deprecationReason",
    }

    EnumValueField for "__EnumValue" {
        Name = "name",
        Description = "description",
        IsDeprecated = "isDeprecated",
        DeprecationReason = "deprecationReason",
    }

    DirectiveField for "__Directive" {
        Name = "name",
        Description = "description",
        Locations = "locations",
        Args = "args",
        IsRepeatable = "isRepeatable",
    }
}
