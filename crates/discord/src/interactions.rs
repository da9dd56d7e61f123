//! Wire-level parsing of Discord interaction payloads.
//!
//! Discord delivers every interaction as one JSON document on the webhook
//! endpoint. This module decodes that document into a typed
//! [`InteractionEvent`] so the dispatcher never touches raw JSON.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use resumebot_core::domain::review::AttachmentMeta;

// Interaction type codes from the Discord gateway documentation.
const INTERACTION_PING: u8 = 1;
const INTERACTION_APPLICATION_COMMAND: u8 = 2;
const INTERACTION_MODAL_SUBMIT: u8 = 5;

/// Command option that carries the resume attachment id.
pub const RESUME_OPTION: &str = "resume";
/// Command option that carries the email when inline collection is active.
pub const EMAIL_OPTION: &str = "email";
/// Prefix for the email modal `custom_id`; the interaction id follows it.
pub const MODAL_CUSTOM_ID_PREFIX: &str = "email_modal_";
/// `custom_id` of the single text input inside the email modal.
pub const EMAIL_INPUT_ID: &str = "email_input";

/// The member (or user, in DMs) who triggered an interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invoker {
    pub id: String,
    pub display_name: String,
}

/// A slash command invocation, already resolved against the attachment map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandInvocation {
    pub interaction_id: String,
    pub command_name: String,
    pub channel_id: Option<String>,
    pub invoker: Option<Invoker>,
    pub attachment: Option<AttachmentMeta>,
    pub email_option: Option<String>,
}

/// A modal submission with the raw email input value, if present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModalSubmission {
    pub interaction_id: String,
    pub custom_id: String,
    pub invoker: Option<Invoker>,
    pub email_value: Option<String>,
}

/// Typed interaction event as consumed by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionEvent {
    Ping,
    Command(CommandInvocation),
    ModalSubmit(ModalSubmission),
    Unsupported { kind: u8 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("interaction payload is not valid JSON: {0}")]
    Json(String),
    #[error("interaction payload is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Builds the modal `custom_id` carrying the originating interaction id.
pub fn modal_custom_id(interaction_id: &str) -> String {
    format!("{MODAL_CUSTOM_ID_PREFIX}{interaction_id}")
}

/// Extracts the originating interaction id from a modal `custom_id`.
pub fn pending_key(custom_id: &str) -> Option<&str> {
    custom_id.strip_prefix(MODAL_CUSTOM_ID_PREFIX)
}

/// Decodes a raw webhook body into an [`InteractionEvent`].
pub fn parse_interaction(body: &[u8]) -> Result<InteractionEvent, ParseError> {
    let wire: WireInteraction =
        serde_json::from_slice(body).map_err(|error| ParseError::Json(error.to_string()))?;

    match wire.kind {
        INTERACTION_PING => Ok(InteractionEvent::Ping),
        INTERACTION_APPLICATION_COMMAND => parse_command(wire).map(InteractionEvent::Command),
        INTERACTION_MODAL_SUBMIT => parse_modal(wire).map(InteractionEvent::ModalSubmit),
        kind => Ok(InteractionEvent::Unsupported { kind }),
    }
}

fn parse_command(wire: WireInteraction) -> Result<CommandInvocation, ParseError> {
    let invoker = wire.invoker();
    let data = wire.data.ok_or(ParseError::MissingField("data"))?;
    let command_name = data.name.ok_or(ParseError::MissingField("data.name"))?;

    let attachment = data
        .options
        .iter()
        .find(|option| option.name == RESUME_OPTION)
        .and_then(|option| option.value.as_str())
        .and_then(|attachment_id| data.resolved.attachments.get(attachment_id))
        .map(WireAttachment::to_meta);

    let email_option = data
        .options
        .iter()
        .find(|option| option.name == EMAIL_OPTION)
        .and_then(|option| option.value.as_str())
        .map(str::to_owned);

    Ok(CommandInvocation {
        interaction_id: wire.id,
        command_name,
        channel_id: wire.channel_id,
        invoker,
        attachment,
        email_option,
    })
}

fn parse_modal(wire: WireInteraction) -> Result<ModalSubmission, ParseError> {
    let invoker = wire.invoker();
    let data = wire.data.ok_or(ParseError::MissingField("data"))?;
    let custom_id = data.custom_id.ok_or(ParseError::MissingField("data.custom_id"))?;

    let email_value = data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .find(|input| input.custom_id == EMAIL_INPUT_ID)
        .and_then(|input| input.value.clone());

    Ok(ModalSubmission {
        interaction_id: wire.id,
        custom_id,
        invoker,
        email_value,
    })
}

#[derive(Deserialize)]
struct WireInteraction {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    data: Option<WireInteractionData>,
    #[serde(default)]
    member: Option<WireMember>,
    #[serde(default)]
    user: Option<WireUser>,
}

impl WireInteraction {
    // Guild interactions nest the user under `member`; DMs put it at the top.
    fn invoker(&self) -> Option<Invoker> {
        self.member
            .as_ref()
            .and_then(|member| member.user.as_ref())
            .or(self.user.as_ref())
            .map(|user| Invoker {
                id: user.id.clone(),
                display_name: user
                    .global_name
                    .clone()
                    .unwrap_or_else(|| user.username.clone()),
            })
    }
}

#[derive(Deserialize)]
struct WireInteractionData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    options: Vec<WireOption>,
    #[serde(default)]
    resolved: WireResolved,
    #[serde(default)]
    components: Vec<WireActionRow>,
}

#[derive(Deserialize)]
struct WireOption {
    name: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Default, Deserialize)]
struct WireResolved {
    #[serde(default)]
    attachments: HashMap<String, WireAttachment>,
}

#[derive(Deserialize)]
struct WireAttachment {
    filename: String,
    #[serde(default)]
    content_type: Option<String>,
    size: u64,
    url: String,
}

impl WireAttachment {
    fn to_meta(&self) -> AttachmentMeta {
        AttachmentMeta {
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
            size_bytes: self.size,
            url: self.url.clone(),
        }
    }
}

#[derive(Deserialize)]
struct WireActionRow {
    #[serde(default)]
    components: Vec<WireTextInput>,
}

#[derive(Deserialize)]
struct WireTextInput {
    #[serde(default)]
    custom_id: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Deserialize)]
struct WireMember {
    #[serde(default)]
    user: Option<WireUser>,
}

#[derive(Deserialize)]
struct WireUser {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{parse_interaction, pending_key, InteractionEvent, ParseError};

    #[test]
    fn parses_a_ping() {
        let event = parse_interaction(br#"{"id":"I-1","type":1}"#).expect("parse");
        assert_eq!(event, InteractionEvent::Ping);
    }

    #[test]
    fn parses_a_command_with_a_resolved_attachment() {
        let body = br#"{
            "id": "I-2",
            "type": 2,
            "channel_id": "C-9",
            "member": {"user": {"id": "U-1", "username": "ada", "global_name": "Ada"}},
            "data": {
                "name": "resume-review",
                "options": [{"name": "resume", "value": "A-7"}],
                "resolved": {
                    "attachments": {
                        "A-7": {
                            "filename": "resume.pdf",
                            "content_type": "application/pdf",
                            "size": 1048576,
                            "url": "https://cdn.example/resume.pdf"
                        }
                    }
                }
            }
        }"#;

        let event = parse_interaction(body).expect("parse");
        let InteractionEvent::Command(command) = event else {
            panic!("expected a command event");
        };

        assert_eq!(command.interaction_id, "I-2");
        assert_eq!(command.command_name, "resume-review");
        assert_eq!(command.channel_id.as_deref(), Some("C-9"));

        let invoker = command.invoker.expect("invoker");
        assert_eq!(invoker.id, "U-1");
        assert_eq!(invoker.display_name, "Ada");

        let attachment = command.attachment.expect("attachment");
        assert_eq!(attachment.filename, "resume.pdf");
        assert_eq!(attachment.size_bytes, 1_048_576);
    }

    #[test]
    fn command_without_a_matching_resolved_entry_has_no_attachment() {
        let body = br#"{
            "id": "I-3",
            "type": 2,
            "data": {"name": "resume-review", "options": [{"name": "resume", "value": "A-9"}]}
        }"#;

        let event = parse_interaction(body).expect("parse");
        let InteractionEvent::Command(command) = event else {
            panic!("expected a command event");
        };
        assert_eq!(command.attachment, None);
        assert_eq!(command.invoker, None);
    }

    #[test]
    fn falls_back_to_the_username_when_no_global_name_is_set() {
        let body = br#"{
            "id": "I-4",
            "type": 2,
            "user": {"id": "U-2", "username": "grace"},
            "data": {"name": "resume-review"}
        }"#;

        let event = parse_interaction(body).expect("parse");
        let InteractionEvent::Command(command) = event else {
            panic!("expected a command event");
        };
        assert_eq!(command.invoker.expect("invoker").display_name, "grace");
    }

    #[test]
    fn parses_a_modal_submission() {
        let body = br#"{
            "id": "I-5",
            "type": 5,
            "member": {"user": {"id": "U-1", "username": "ada", "global_name": "Ada"}},
            "data": {
                "custom_id": "email_modal_I-2",
                "components": [
                    {"components": [{"custom_id": "email_input", "value": "ada@example.com"}]}
                ]
            }
        }"#;

        let event = parse_interaction(body).expect("parse");
        let InteractionEvent::ModalSubmit(submission) = event else {
            panic!("expected a modal submission");
        };

        assert_eq!(submission.custom_id, "email_modal_I-2");
        assert_eq!(submission.email_value.as_deref(), Some("ada@example.com"));
        assert_eq!(pending_key(&submission.custom_id), Some("I-2"));
    }

    #[test]
    fn unknown_interaction_types_are_reported_not_rejected() {
        let event = parse_interaction(br#"{"id":"I-6","type":3}"#).expect("parse");
        assert_eq!(event, InteractionEvent::Unsupported { kind: 3 });
    }

    #[test]
    fn command_without_a_name_is_a_parse_error() {
        let error = parse_interaction(br#"{"id":"I-7","type":2,"data":{}}"#)
            .expect_err("missing name must fail");
        assert_eq!(error, ParseError::MissingField("data.name"));
    }

    #[test]
    fn garbage_bodies_are_a_parse_error() {
        let error = parse_interaction(b"not json").expect_err("garbage must fail");
        assert!(matches!(error, ParseError::Json(_)));
    }
}
