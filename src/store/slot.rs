//! Slot names and slot values
//!
//! Every piece of page state lives in a named slot. A slot is either absent
//! (nothing produced yet) or holds a value of the one variant it accepts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::auth::AuthResult;
use crate::config::Config;
use crate::context::definition::FoundContext;
use crate::tags::{TagSource, Tags};

/// Opaque feature flags computed by the bootstrap
pub type Flags = serde_json::Map<String, Value>;

// =============================================================================
// SlotName
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotName {
    Config,
    Flags,
    Auth,
    Context,
    PathTags,
    DomTags,
    CaseDetailsTags,
    PropTags,
    /// Derived: overlay of the four tag sources
    Tags,
    CaseDetails,
    /// Derived: aggregate page readiness
    InitialisationStatus,
    FatalInitialisationError,
    ContextError,
}

impl SlotName {
    pub const ALL: [SlotName; 13] = [
        SlotName::Config,
        SlotName::Flags,
        SlotName::Auth,
        SlotName::Context,
        SlotName::PathTags,
        SlotName::DomTags,
        SlotName::CaseDetailsTags,
        SlotName::PropTags,
        SlotName::Tags,
        SlotName::CaseDetails,
        SlotName::InitialisationStatus,
        SlotName::FatalInitialisationError,
        SlotName::ContextError,
    ];

    /// Slots included in every readiness result
    pub const ALWAYS_PRESENT: [SlotName; 2] = [
        SlotName::FatalInitialisationError,
        SlotName::InitialisationStatus,
    ];

    /// Slots that must all hold a value before the page counts as ready
    pub const INITIALISATION: [SlotName; 4] = [
        SlotName::Config,
        SlotName::Flags,
        SlotName::Context,
        SlotName::Auth,
    ];

    /// Slots reset on every navigation
    pub const CONTEXT_SCOPED: [SlotName; 3] =
        [SlotName::Context, SlotName::PathTags, SlotName::DomTags];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::Config => "config",
            SlotName::Flags => "flags",
            SlotName::Auth => "auth",
            SlotName::Context => "context",
            SlotName::PathTags => "pathTags",
            SlotName::DomTags => "domTags",
            SlotName::CaseDetailsTags => "caseDetailsTags",
            SlotName::PropTags => "propTags",
            SlotName::Tags => "tags",
            SlotName::CaseDetails => "caseDetails",
            SlotName::InitialisationStatus => "initialisationStatus",
            SlotName::FatalInitialisationError => "fatalInitialisationError",
            SlotName::ContextError => "contextError",
        }
    }

    /// Recomputed by the store, never written by producers
    pub fn is_derived(&self) -> bool {
        matches!(self, SlotName::Tags | SlotName::InitialisationStatus)
    }

    pub fn tag_source(&self) -> Option<TagSource> {
        match self {
            SlotName::PathTags => Some(TagSource::PathTags),
            SlotName::DomTags => Some(TagSource::DomTags),
            SlotName::CaseDetailsTags => Some(TagSource::CaseDetailsTags),
            SlotName::PropTags => Some(TagSource::PropTags),
            _ => None,
        }
    }

    /// Whether `value` is the variant this slot holds
    pub fn accepts(&self, value: &SlotValue) -> bool {
        matches!(
            (self, value),
            (SlotName::Config, SlotValue::Config(_))
                | (SlotName::Flags, SlotValue::Flags(_))
                | (SlotName::Auth, SlotValue::Auth(_))
                | (SlotName::Context, SlotValue::Context(_))
                | (
                    SlotName::PathTags
                        | SlotName::DomTags
                        | SlotName::CaseDetailsTags
                        | SlotName::PropTags
                        | SlotName::Tags,
                    SlotValue::Tags(_)
                )
                | (SlotName::CaseDetails, SlotValue::CaseDetails(_))
                | (SlotName::InitialisationStatus, SlotValue::Status(_))
                | (
                    SlotName::FatalInitialisationError | SlotName::ContextError,
                    SlotValue::Error(_)
                )
        )
    }
}

impl From<TagSource> for SlotName {
    fn from(source: TagSource) -> Self {
        match source {
            TagSource::PathTags => SlotName::PathTags,
            TagSource::DomTags => SlotName::DomTags,
            TagSource::CaseDetailsTags => SlotName::CaseDetailsTags,
            TagSource::PropTags => SlotName::PropTags,
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotName::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| format!("unknown slot `{s}`"))
    }
}

// =============================================================================
// Slot values
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialisationStatus {
    #[default]
    Pending,
    Ready,
    Broken,
}

/// A failure recorded into an error slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
}

impl ErrorRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<E: std::error::Error> From<&E> for ErrorRecord {
    fn from(err: &E) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SlotValue {
    Config(Rc<Config>),
    Flags(Rc<Flags>),
    Auth(Rc<AuthResult>),
    Context(Rc<FoundContext>),
    Tags(Tags),
    CaseDetails(Rc<Value>),
    Status(InitialisationStatus),
    Error(ErrorRecord),
}

impl SlotValue {
    /// Variant name, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            SlotValue::Config(_) => "config",
            SlotValue::Flags(_) => "flags",
            SlotValue::Auth(_) => "auth",
            SlotValue::Context(_) => "context",
            SlotValue::Tags(_) => "tags",
            SlotValue::CaseDetails(_) => "case details",
            SlotValue::Status(_) => "status",
            SlotValue::Error(_) => "error",
        }
    }

    /// Decode a JSON value for `slot`. `null` means "clear the slot".
    ///
    /// Context results are produced in-process by the matcher and cannot be
    /// decoded from JSON.
    pub fn from_json(slot: SlotName, value: Value) -> Result<Option<SlotValue>, String> {
        if value.is_null() {
            return Ok(None);
        }
        let decoded = match slot {
            SlotName::Config => SlotValue::Config(Rc::new(decode(value)?)),
            SlotName::Flags => SlotValue::Flags(Rc::new(decode(value)?)),
            SlotName::Auth => SlotValue::Auth(Rc::new(decode(value)?)),
            SlotName::Context => return Err("the context slot is written by the matcher".to_string()),
            SlotName::PathTags
            | SlotName::DomTags
            | SlotName::CaseDetailsTags
            | SlotName::PropTags
            | SlotName::Tags => SlotValue::Tags(decode(value)?),
            SlotName::CaseDetails => SlotValue::CaseDetails(Rc::new(value)),
            SlotName::InitialisationStatus => SlotValue::Status(decode(value)?),
            SlotName::FatalInitialisationError | SlotName::ContextError => match value {
                Value::String(message) => SlotValue::Error(ErrorRecord::new(message)),
                other => SlotValue::Error(decode(other)?),
            },
        };
        Ok(Some(decoded))
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

impl From<Config> for SlotValue {
    fn from(config: Config) -> Self {
        SlotValue::Config(Rc::new(config))
    }
}

impl From<AuthResult> for SlotValue {
    fn from(auth: AuthResult) -> Self {
        SlotValue::Auth(Rc::new(auth))
    }
}

impl From<FoundContext> for SlotValue {
    fn from(context: FoundContext) -> Self {
        SlotValue::Context(Rc::new(context))
    }
}

impl From<Tags> for SlotValue {
    fn from(tags: Tags) -> Self {
        SlotValue::Tags(tags)
    }
}

impl From<Flags> for SlotValue {
    fn from(flags: Flags) -> Self {
        SlotValue::Flags(Rc::new(flags))
    }
}

impl From<ErrorRecord> for SlotValue {
    fn from(record: ErrorRecord) -> Self {
        SlotValue::Error(record)
    }
}
