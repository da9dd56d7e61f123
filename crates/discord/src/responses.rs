//! Interaction callbacks sent back to Discord.
//!
//! Every webhook interaction gets exactly one synchronous callback. The
//! dispatcher returns an [`InteractionResponse`]; the HTTP layer serializes it
//! into the callback envelope (or a plain error body for client mistakes).

use serde::Serialize;

use resumebot_core::validate::{format_size_mib, AttachmentRejection, MAX_RESUME_BYTES};

use crate::interactions::{modal_custom_id, EMAIL_INPUT_ID};

// Interaction callback type codes.
const CALLBACK_PONG: u8 = 1;
const CALLBACK_CHANNEL_MESSAGE: u8 = 4;
const CALLBACK_MODAL: u8 = 9;

// Message flag marking a reply visible only to the invoking user.
const EPHEMERAL_FLAG: u64 = 64;

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_TEXT_INPUT: u8 = 4;
const TEXT_INPUT_STYLE_SHORT: u8 = 1;

/// Dispatcher verdict for one interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionResponse {
    /// Answer to a liveness ping.
    Pong,
    /// Ephemeral message shown only to the invoking user.
    Ephemeral(String),
    /// Open the email collection modal.
    EmailModal { interaction_id: String },
    /// Malformed or unrecognized request; surfaced as an HTTP 400.
    ClientError(&'static str),
}

impl InteractionResponse {
    /// The callback envelope for this response, or `None` for client errors
    /// (those carry no interaction callback).
    pub fn to_callback(&self) -> Option<InteractionCallback> {
        match self {
            Self::Pong => Some(InteractionCallback { kind: CALLBACK_PONG, data: None }),
            Self::Ephemeral(content) => Some(InteractionCallback {
                kind: CALLBACK_CHANNEL_MESSAGE,
                data: Some(CallbackData::Message(MessageData {
                    content: content.clone(),
                    flags: EPHEMERAL_FLAG,
                })),
            }),
            Self::EmailModal { interaction_id } => Some(InteractionCallback {
                kind: CALLBACK_MODAL,
                data: Some(CallbackData::Modal(email_modal(interaction_id))),
            }),
            Self::ClientError(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InteractionCallback {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<CallbackData>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
enum CallbackData {
    Message(MessageData),
    Modal(ModalData),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct MessageData {
    content: String,
    flags: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct ModalData {
    custom_id: String,
    title: String,
    components: Vec<ActionRow>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct ActionRow {
    #[serde(rename = "type")]
    kind: u8,
    components: Vec<TextInput>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct TextInput {
    #[serde(rename = "type")]
    kind: u8,
    custom_id: &'static str,
    label: &'static str,
    style: u8,
    placeholder: &'static str,
    required: bool,
    max_length: u16,
}

fn email_modal(interaction_id: &str) -> ModalData {
    ModalData {
        custom_id: modal_custom_id(interaction_id),
        title: "Resume Review - Email".to_owned(),
        components: vec![ActionRow {
            kind: COMPONENT_ACTION_ROW,
            components: vec![TextInput {
                kind: COMPONENT_TEXT_INPUT,
                custom_id: EMAIL_INPUT_ID,
                label: "Your Email Address",
                style: TEXT_INPUT_STYLE_SHORT,
                placeholder: "example@email.com",
                required: true,
                max_length: 100,
            }],
        }],
    }
}

pub fn attachment_rejection_message(rejection: &AttachmentRejection) -> String {
    match rejection {
        AttachmentRejection::Missing => {
            "❌ No attachment found. Please upload a PDF file.".to_owned()
        }
        AttachmentRejection::NotPdf { filename, content_type } => format!(
            "❌ Invalid file type. Please upload a PDF file.\n\nReceived: {filename} ({content_type})"
        ),
        AttachmentRejection::TooLarge { filename, size_bytes, .. } => format!(
            "❌ File too large. Maximum size is {}MB.\n\nYour file: {filename} ({}MB)",
            MAX_RESUME_BYTES / (1024 * 1024),
            format_size_mib(*size_bytes)
        ),
    }
}

pub fn invalid_email_message(rejected: &str) -> String {
    format!(
        "❌ Invalid email address: \"{rejected}\"\n\nPlease run the command again with a valid email."
    )
}

pub fn session_expired_message() -> String {
    "❌ Session expired. Please upload your resume again.".to_owned()
}

pub fn quota_reached_message(limit: u32) -> String {
    let noun = if limit == 1 { "review" } else { "reviews" };
    format!(
        "❌ You have already used your {limit} free resume {noun}. Watch your inbox for the results."
    )
}

pub fn wrong_channel_message(channel_id: &str) -> String {
    format!("❌ This command can only be used in <#{channel_id}>.")
}

pub fn missing_identity_message() -> String {
    "❌ Could not identify who ran this command. Please try again.".to_owned()
}

pub fn commit_failed_message() -> String {
    "⚠️ Something went wrong while saving your request. Please try again later.".to_owned()
}

pub fn success_message(filename: &str, email: &str) -> String {
    format!(
        "✅ Resume received!\n\n📄 **File:** {filename}\n📧 **Results will be sent to:** {email}\n\nYour resume is in the review queue."
    )
}

#[cfg(test)]
mod tests {
    use resumebot_core::validate::AttachmentRejection;

    use super::{
        attachment_rejection_message, quota_reached_message, success_message, InteractionResponse,
    };

    #[test]
    fn pong_serializes_to_the_bare_callback_envelope() {
        let callback = InteractionResponse::Pong.to_callback().expect("callback");
        let json = serde_json::to_value(&callback).expect("serialize");
        assert_eq!(json, serde_json::json!({"type": 1}));
    }

    #[test]
    fn ephemeral_messages_carry_the_ephemeral_flag() {
        let callback = InteractionResponse::Ephemeral("hi".to_owned())
            .to_callback()
            .expect("callback");
        let json = serde_json::to_value(&callback).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"type": 4, "data": {"content": "hi", "flags": 64}})
        );
    }

    #[test]
    fn the_email_modal_names_the_originating_interaction() {
        let callback = InteractionResponse::EmailModal { interaction_id: "I-42".to_owned() }
            .to_callback()
            .expect("callback");
        let json = serde_json::to_value(&callback).expect("serialize");

        assert_eq!(json["type"], 9);
        assert_eq!(json["data"]["custom_id"], "email_modal_I-42");
        assert_eq!(json["data"]["title"], "Resume Review - Email");

        let input = &json["data"]["components"][0]["components"][0];
        assert_eq!(input["custom_id"], "email_input");
        assert_eq!(input["max_length"], 100);
        assert_eq!(input["required"], true);
    }

    #[test]
    fn client_errors_have_no_callback() {
        assert_eq!(InteractionResponse::ClientError("unknown command").to_callback(), None);
    }

    #[test]
    fn the_too_large_message_shows_the_size_with_two_decimals() {
        let message = attachment_rejection_message(&AttachmentRejection::TooLarge {
            filename: "resume.pdf".to_owned(),
            size_bytes: 3 * 1024 * 1024,
            limit_bytes: 2 * 1024 * 1024,
        });
        assert!(message.contains("Maximum size is 2MB"));
        assert!(message.contains("resume.pdf (3.00MB)"));
    }

    #[test]
    fn the_quota_message_pluralizes_the_limit() {
        assert!(quota_reached_message(1).contains("1 free resume review."));
        assert!(quota_reached_message(3).contains("3 free resume reviews."));
    }

    #[test]
    fn the_success_message_echoes_file_and_email() {
        let message = success_message("resume.pdf", "ada@example.com");
        assert!(message.contains("**File:** resume.pdf"));
        assert!(message.contains("**Results will be sent to:** ada@example.com"));
    }
}
