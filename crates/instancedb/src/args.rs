//! Call arguments and their validation.
//!
//! [`Args`] is the loose, transport-friendly shape callers fill in (it
//! deserializes from the camelCase JSON objects orchestration layers pass
//! around). Before any driver is touched, the façades validate it into an
//! immutable request value:
//!
//! - [`InstanceRequest`]: owner + instance id
//! - [`FieldRequest`]: an instance request + field kind + field name
//!
//! Validation is pure and never mutates the caller's `Args`, so one `Args`
//! value can be reused across calls of different entity kinds.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::{
    error::{DbError, DbResult},
    types::{FieldKind, Owner, Value},
};

/// Which stored values `instances.get` embeds into its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EmbedRepr", into = "EmbedRepr")]
pub enum Embed {
    /// Every stored value (`"all"`).
    All,
    /// Only the named values.
    Names(Vec<String>),
}

impl Embed {
    /// Creates an [`Embed::Names`] selection.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Names(names.into_iter().map(Into::into).collect())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum EmbedRepr {
    Keyword(String),
    Names(Vec<String>),
}

impl TryFrom<EmbedRepr> for Embed {
    type Error = String;

    fn try_from(repr: EmbedRepr) -> Result<Self, Self::Error> {
        match repr {
            EmbedRepr::Keyword(word) if word == "all" => Ok(Self::All),
            EmbedRepr::Keyword(word) => {
                Err(format!("expected \"all\" or an array of names, got \"{word}\""))
            },
            EmbedRepr::Names(names) => Ok(Self::Names(names)),
        }
    }
}

impl From<Embed> for EmbedRepr {
    fn from(embed: Embed) -> Self {
        match embed {
            Embed::All => Self::Keyword("all".to_owned()),
            Embed::Names(names) => Self::Names(names),
        }
    }
}

/// Arguments of a façade call.
///
/// Every field is optional; each operation documents which ones it needs.
///
/// # Examples
///
/// ```
/// use instancedb::Args;
/// use serde_json::json;
///
/// let from_json: Args = serde_json::from_value(json!({
///     "id": 2,
///     "invokerName": "testinv",
///     "instance": { "status": "running", "parameters": { "foo": "bar" } }
/// }))?;
///
/// let built = Args::new()
///     .id("2")
///     .invoker("testinv")
///     .instance(json!({ "status": "running", "parameters": { "foo": "bar" } }));
///
/// assert_eq!(from_json, built);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Args {
    /// Instance id. Numbers are accepted and rendered as text.
    #[serde(deserialize_with = "id_from_json", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Instance payload for `instances.set`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<Map<String, JsonValue>>,
    /// Owning executable. Takes precedence over `invoker_name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_name: Option<String>,
    /// Owning invoker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoker_name: Option<String>,
    /// Parameter or result name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Parameter name; used instead of `name` by parameter operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_name: Option<String>,
    /// Result name; used instead of `name` by result operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_name: Option<String>,
    /// Value for `parameters.set` / `results.set`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Status filter for `instances.get_all`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JsonValue>,
    /// Parameters to embed in `instances.get`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_parameters: Option<Embed>,
    /// Results to embed in `instances.get`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_results: Option<Embed>,
    /// Read binary fields as base64 text. Falls back to the handle's default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefer_base64: Option<bool>,
    /// Names to keep in `get_all` answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<String>>,
}

fn id_from_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(render_id))
}

/// Renders a JSON id (string or number) as key text.
fn render_id(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

impl Args {
    /// Creates empty arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the instance id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the owning executable.
    #[must_use]
    pub fn executable(mut self, name: impl Into<String>) -> Self {
        self.executable_name = Some(name.into());
        self
    }

    /// Sets the owning invoker.
    #[must_use]
    pub fn invoker(mut self, name: impl Into<String>) -> Self {
        self.invoker_name = Some(name.into());
        self
    }

    /// Sets the instance payload. Anything but a JSON object clears it.
    #[must_use]
    pub fn instance(mut self, instance: JsonValue) -> Self {
        self.instance = match instance {
            JsonValue::Object(map) => Some(map),
            _ => None,
        };
        self
    }

    /// Sets the parameter or result name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the value to store.
    #[must_use]
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Sets the status filter.
    #[must_use]
    pub fn status(mut self, status: impl Into<JsonValue>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Selects the parameters to embed.
    #[must_use]
    pub fn embed_parameters(mut self, embed: Embed) -> Self {
        self.embed_parameters = Some(embed);
        self
    }

    /// Selects the results to embed.
    #[must_use]
    pub fn embed_results(mut self, embed: Embed) -> Self {
        self.embed_results = Some(embed);
        self
    }

    /// Sets the base64 preference for binary fields.
    #[must_use]
    pub fn prefer_base64(mut self, prefer: bool) -> Self {
        self.prefer_base64 = Some(prefer);
        self
    }

    /// Restricts `get_all` answers to the given names.
    #[must_use]
    pub fn filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the owner, preferring the executable when both are named.
    #[must_use]
    pub fn owner(&self) -> Option<Owner> {
        non_empty(self.executable_name.as_ref())
            .map(Owner::executable)
            .or_else(|| non_empty(self.invoker_name.as_ref()).map(Owner::invoker))
    }

    /// Returns the instance id from `id`, falling back to `instance.id`.
    #[must_use]
    pub fn resolved_id(&self) -> Option<String> {
        non_empty(self.id.as_ref()).map(str::to_owned).or_else(|| {
            self.instance.as_ref().and_then(|instance| instance.get("id")).and_then(render_id)
        })
    }

    /// Returns the field name for `kind`: the kind-specific name if given,
    /// otherwise `name`. The other kind's name is ignored.
    #[must_use]
    pub fn field_name(&self, kind: FieldKind) -> Option<&str> {
        let specific = match kind {
            FieldKind::Parameter => &self.parameter_name,
            FieldKind::Result => &self.result_name,
        };
        non_empty(specific.as_ref()).or_else(|| non_empty(self.name.as_ref()))
    }
}

/// A validated instance address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceRequest {
    /// The owner of the instance.
    pub owner: Owner,
    /// The instance id.
    pub id: String,
}

/// A validated parameter or result address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRequest {
    /// The instance the field belongs to.
    pub instance: InstanceRequest,
    /// Parameter or result.
    pub kind: FieldKind,
    /// The field name.
    pub name: String,
}

fn present(args: Option<&Args>) -> DbResult<&Args> {
    args.ok_or_else(|| DbError::invalid_argument("arguments must not be null or undefined"))
}

/// Validates arguments that only need an owner (wildcard-id operations).
///
/// # Errors
///
/// Returns [`DbError::InvalidArgument`] when `args` is `None` or names no
/// owner.
pub fn owner_request(args: Option<&Args>) -> DbResult<Owner> {
    present(args)?.owner().ok_or_else(|| {
        DbError::invalid_argument("either executable name or invoker name must be specified")
    })
}

/// Validates instance-level arguments.
///
/// # Errors
///
/// Returns [`DbError::InvalidArgument`] when `args` is `None`, when neither
/// `id` nor `instance.id` is present, or when no owner is named.
///
/// # Examples
///
/// ```
/// use instancedb::{Args, Owner, instance_request};
/// use serde_json::json;
///
/// let args = Args::new().executable("textexec").instance(json!({ "id": "7" }));
/// let request = instance_request(Some(&args))?;
/// assert_eq!(request.id, "7");
/// assert_eq!(request.owner, Owner::executable("textexec"));
///
/// assert!(instance_request(None).is_err());
/// # Ok::<(), instancedb::DbError>(())
/// ```
pub fn instance_request(args: Option<&Args>) -> DbResult<InstanceRequest> {
    let args = present(args)?;
    let id =
        args.resolved_id().ok_or_else(|| DbError::invalid_argument("instance id must be specified"))?;
    let owner = owner_request(Some(args))?;
    Ok(InstanceRequest { owner, id })
}

/// Validates parameter- or result-level arguments.
///
/// # Errors
///
/// Everything [`instance_request`] rejects, plus a missing field name.
pub fn field_request(args: Option<&Args>, kind: FieldKind) -> DbResult<FieldRequest> {
    let instance = instance_request(args)?;
    let name = args
        .and_then(|args| args.field_name(kind))
        .ok_or_else(|| DbError::invalid_argument("parameter or result name must be specified"))?;
    Ok(FieldRequest { instance, kind, name: name.to_owned() })
}
