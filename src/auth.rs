//! Auth result model and context authorisation
//!
//! The auth flow itself lives outside this crate. It hands over an opaque
//! result discriminated by `isAuthed`; the core only looks at `groups` when a
//! context requires a directory group, and passes everything else through.

use serde::{Deserialize, Serialize};

use crate::context::definition::Authorisation;

// =============================================================================
// AuthResult
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AuthWire", into = "AuthWire")]
pub enum AuthResult {
    Authed {
        username: String,
        groups: Vec<String>,
        object_id: String,
    },
    Unauthed {
        reason_code: String,
        reason: String,
    },
}

impl AuthResult {
    pub fn is_authed(&self) -> bool {
        matches!(self, AuthResult::Authed { .. })
    }

    pub fn groups(&self) -> &[String] {
        match self {
            AuthResult::Authed { groups, .. } => groups,
            AuthResult::Unauthed { .. } => &[],
        }
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups().iter().any(|g| g == group)
    }
}

/// JS-facing shape: `{ isAuthed: true, username, groups, objectId }` or
/// `{ isAuthed: false, reasonCode, reason }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthWire {
    is_authed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl TryFrom<AuthWire> for AuthResult {
    type Error = String;

    fn try_from(wire: AuthWire) -> Result<Self, Self::Error> {
        if wire.is_authed {
            Ok(AuthResult::Authed {
                username: wire
                    .username
                    .ok_or_else(|| "authed result without username".to_string())?,
                groups: wire.groups.unwrap_or_default(),
                object_id: wire.object_id.unwrap_or_default(),
            })
        } else {
            Ok(AuthResult::Unauthed {
                reason_code: wire.reason_code.unwrap_or_default(),
                reason: wire.reason.unwrap_or_default(),
            })
        }
    }
}

impl From<AuthResult> for AuthWire {
    fn from(result: AuthResult) -> Self {
        match result {
            AuthResult::Authed {
                username,
                groups,
                object_id,
            } => AuthWire {
                is_authed: true,
                username: Some(username),
                groups: Some(groups),
                object_id: Some(object_id),
                ..Default::default()
            },
            AuthResult::Unauthed {
                reason_code,
                reason,
            } => AuthWire {
                is_authed: false,
                reason_code: Some(reason_code),
                reason: Some(reason),
                ..Default::default()
            },
        }
    }
}

// =============================================================================
// Authorisation
// =============================================================================

/// Whether the current user may see the matched context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum AuthorisationOutcome {
    /// Context has no authorisation requirement
    NotRequired,
    /// Requirement exists but auth has not completed yet
    Pending,
    Authorised,
    Unauthorised { reason: String },
}

/// Check `requirement` against the auth result, if there is one yet
pub fn check_authorisation(
    requirement: Option<&Authorisation>,
    auth: Option<&AuthResult>,
) -> AuthorisationOutcome {
    let Some(requirement) = requirement else {
        return AuthorisationOutcome::NotRequired;
    };
    match auth {
        None => AuthorisationOutcome::Pending,
        Some(AuthResult::Unauthed { reason, .. }) => AuthorisationOutcome::Unauthorised {
            reason: format!("not signed in: {reason}"),
        },
        Some(auth) if auth.in_group(&requirement.ad_group) => AuthorisationOutcome::Authorised,
        Some(_) => AuthorisationOutcome::Unauthorised {
            reason: format!("user is not in group `{}`", requirement.ad_group),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn authed(groups: &[&str]) -> AuthResult {
        AuthResult::Authed {
            username: "jo@example.gov.uk".to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            object_id: "oid-1".to_string(),
        }
    }

    #[test]
    fn test_deserialize_authed() {
        let auth: AuthResult = serde_json::from_value(json!({
            "isAuthed": true,
            "username": "jo@example.gov.uk",
            "groups": ["readers"],
            "objectId": "oid-1"
        }))
        .unwrap();
        assert_eq!(auth, authed(&["readers"]));
    }

    #[test]
    fn test_deserialize_unauthed() {
        let auth: AuthResult = serde_json::from_value(json!({
            "isAuthed": false,
            "reasonCode": "no-token",
            "reason": "No token"
        }))
        .unwrap();
        assert!(!auth.is_authed());
        assert!(auth.groups().is_empty());
    }

    #[test]
    fn test_authed_without_username_rejected() {
        let result: Result<AuthResult, _> = serde_json::from_value(json!({ "isAuthed": true }));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_shape() {
        let value = serde_json::to_value(authed(&["a"])).unwrap();
        assert_eq!(
            value,
            json!({ "isAuthed": true, "username": "jo@example.gov.uk", "groups": ["a"], "objectId": "oid-1" })
        );
    }

    #[test]
    fn test_check_authorisation() {
        let requirement = Authorisation {
            ad_group: "case-readers".to_string(),
        };

        assert_eq!(
            check_authorisation(None, None),
            AuthorisationOutcome::NotRequired
        );
        assert_eq!(
            check_authorisation(Some(&requirement), None),
            AuthorisationOutcome::Pending
        );
        assert_eq!(
            check_authorisation(Some(&requirement), Some(&authed(&["case-readers"]))),
            AuthorisationOutcome::Authorised
        );
        assert!(matches!(
            check_authorisation(Some(&requirement), Some(&authed(&["other"]))),
            AuthorisationOutcome::Unauthorised { .. }
        ));
        let unauthed = AuthResult::Unauthed {
            reason_code: "x".to_string(),
            reason: "expired".to_string(),
        };
        assert!(matches!(
            check_authorisation(Some(&requirement), Some(&unauthed)),
            AuthorisationOutcome::Unauthorised { reason } if reason.contains("expired")
        ));
    }
}
