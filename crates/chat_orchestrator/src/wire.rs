//! The message shape sent to the text-generation backend.

use serde::Serialize;

/// One turn in the backend conversation payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: String,
    pub content: WireContent,
}

impl WireMessage {
    pub fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: WireContent::Text(text.into()),
        }
    }

    pub fn parts(role: &str, parts: Vec<WirePart>) -> Self {
        Self {
            role: role.to_string(),
            content: WireContent::Parts(parts),
        }
    }
}

/// Either a plain string or a content-part array (used when a turn carries
/// image attachments).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WirePart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl WirePart {
    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}
