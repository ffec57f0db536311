use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Referee field value: the game controller sends either a numeric code or
/// a symbolic name depending on its version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefereeTag {
    Code(i64),
    Name(String),
}

impl Default for RefereeTag {
    fn default() -> Self {
        RefereeTag::Code(0)
    }
}

impl std::fmt::Display for RefereeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefereeTag::Code(c) => write!(f, "{c}"),
            RefereeTag::Name(n) => f.write_str(n),
        }
    }
}

/// Latest referee decision. Only the newest snapshot matters; commands are
/// never replayed.
///
/// Wire form: `{"state": .., "team": .., "is_left": ..}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefereeCommand {
    pub state: RefereeTag,
    #[serde(rename = "team")]
    pub command_for_team: RefereeTag,
    #[serde(rename = "is_left")]
    pub is_part_of_field_left: bool,
}

impl RefereeCommand {
    /// Decode one referee message.
    pub fn from_json(bytes: &[u8]) -> Result<Self, RelayError> {
        serde_json::from_slice(bytes)
            .map_err(|e| RelayError::from(e).with_context("referee message"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn decodes_numeric_fields() {
        let cmd = RefereeCommand::from_json(br#"{"state": 3, "team": 1, "is_left": true}"#).unwrap();
        assert_eq!(cmd.state, RefereeTag::Code(3));
        assert_eq!(cmd.command_for_team, RefereeTag::Code(1));
        assert!(cmd.is_part_of_field_left);
    }

    #[test]
    fn decodes_named_fields() {
        let cmd =
            RefereeCommand::from_json(br#"{"state": "HALT", "team": "blue", "is_left": false}"#)
                .unwrap();
        assert_eq!(cmd.state, RefereeTag::Name("HALT".into()));
        assert_eq!(cmd.command_for_team.to_string(), "blue");
    }

    #[test]
    fn missing_field_is_format_error() {
        let err = RefereeCommand::from_json(br#"{"state": 3}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.message.starts_with("referee message"));
    }

    #[test]
    fn default_snapshot_is_zeroed() {
        let cmd = RefereeCommand::default();
        assert_eq!(cmd.state, RefereeTag::Code(0));
        assert_eq!(cmd.command_for_team, RefereeTag::Code(0));
        assert!(!cmd.is_part_of_field_left);
    }
}
