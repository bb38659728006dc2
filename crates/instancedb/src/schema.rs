//! API schema and field type resolution.
//!
//! The schema is supplied by the embedding application and is read-only for
//! the lifetime of an [`InstanceDb`](crate::InstanceDb) handle:
//!
//! ```json
//! {
//!   "executables": { "<name>": { "parameters_schema": { "<field>": { "type": "number" } },
//!                                "results_schema":    { ... } } },
//!   "invokers":    { ... }
//! }
//! ```
//!
//! Nothing in the schema is mandatory. An unknown owner, an unknown field or
//! a field without a `type` all resolve to [`ValueType::TextString`].

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{
    keys::Target,
    types::{FieldKind, Owner, ValueType},
};

/// Declared parameter and result types per executable and invoker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSchema {
    /// Schemas of executables, by name.
    #[serde(default)]
    pub executables: HashMap<String, OwnerSchema>,
    /// Schemas of invokers, by name.
    #[serde(default)]
    pub invokers: HashMap<String, OwnerSchema>,
}

/// Field declarations of one executable or invoker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerSchema {
    /// Declared parameters.
    #[serde(default)]
    pub parameters_schema: BTreeMap<String, FieldSchema>,
    /// Declared results.
    #[serde(default)]
    pub results_schema: BTreeMap<String, FieldSchema>,
}

/// Declaration of a single field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// The declared type; `None` means text.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
}

impl ApiSchema {
    /// Returns the schema entry of `owner`, if declared.
    #[must_use]
    pub fn owner(&self, owner: &Owner) -> Option<&OwnerSchema> {
        match owner {
            Owner::Executable(name) => self.executables.get(name),
            Owner::Invoker(name) => self.invokers.get(name),
        }
    }
}

impl OwnerSchema {
    /// Returns the declarations for one field kind.
    #[must_use]
    pub fn fields(&self, kind: FieldKind) -> &BTreeMap<String, FieldSchema> {
        match kind {
            FieldKind::Parameter => &self.parameters_schema,
            FieldKind::Result => &self.results_schema,
        }
    }
}

/// The codec type(s) to use for one driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSelection {
    /// Every value uses the same type.
    Single(ValueType),
    /// Each leaf name has its own type; names not in the map are text.
    PerName(HashMap<String, ValueType>),
}

impl TypeSelection {
    /// Returns the type to decode the leaf `name` with.
    #[must_use]
    pub fn for_name(&self, name: &str) -> ValueType {
        match self {
            Self::Single(value_type) => *value_type,
            Self::PerName(types) => types.get(name).copied().unwrap_or_default(),
        }
    }
}

impl From<ValueType> for TypeSelection {
    fn from(value_type: ValueType) -> Self {
        Self::Single(value_type)
    }
}

/// Maps `(owner, field)` pairs to declared types.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use instancedb::{ApiSchema, FieldKind, Owner, Target, TypeResolver, TypeSelection, ValueType};
///
/// let schema: ApiSchema = serde_json::from_value(serde_json::json!({
///     "executables": { "thumbnail": { "parameters_schema": { "image": { "type": "byte_string" } } } }
/// }))?;
/// let resolver = TypeResolver::new(Some(Arc::new(schema)));
/// let owner = Owner::executable("thumbnail");
///
/// let raw = resolver.resolve(FieldKind::Parameter, &owner, Target::Named("image"), false);
/// assert_eq!(raw, TypeSelection::Single(ValueType::ByteString));
///
/// let text = resolver.resolve(FieldKind::Parameter, &owner, Target::Named("image"), true);
/// assert_eq!(text, TypeSelection::Single(ValueType::Base64Text));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeResolver {
    schema: Option<Arc<ApiSchema>>,
}

impl TypeResolver {
    /// Creates a resolver over an optional schema.
    #[must_use]
    pub fn new(schema: Option<Arc<ApiSchema>>) -> Self {
        Self { schema }
    }

    /// Returns the schema, if one was supplied.
    #[must_use]
    pub fn schema(&self) -> Option<&ApiSchema> {
        self.schema.as_deref()
    }

    /// Resolves the type of one field, or of every declared field for
    /// [`Target::All`].
    #[must_use]
    pub fn resolve(
        &self,
        kind: FieldKind,
        owner: &Owner,
        target: Target<'_>,
        prefer_base64: bool,
    ) -> TypeSelection {
        let fields = self.schema().and_then(|schema| schema.owner(owner)).map(|o| o.fields(kind));

        match target {
            Target::All => TypeSelection::PerName(
                fields
                    .into_iter()
                    .flatten()
                    .map(|(name, field)| {
                        (name.clone(), apply_preference(field.value_type, prefer_base64))
                    })
                    .collect(),
            ),
            Target::Named(name) => {
                let declared = fields.and_then(|f| f.get(name)).and_then(|f| f.value_type);
                TypeSelection::Single(apply_preference(declared, prefer_base64))
            },
        }
    }
}

fn apply_preference(declared: Option<ValueType>, prefer_base64: bool) -> ValueType {
    match declared.unwrap_or_default() {
        ValueType::ByteString if prefer_base64 => ValueType::Base64Text,
        other => other,
    }
}
