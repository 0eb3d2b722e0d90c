//! Parsing of inbound data-channel frames.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

const ITEM_CREATED: &str = "conversation.item.created";

/// An inbound frame the session acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// The agent said something, optionally tagged with pre-classified behaviour signals.
    AgentUtterance { text: String, signals: Vec<String> },
    /// A finalized representative utterance.
    RepUtterance { text: String },
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Vec<ContentPart>,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    signals: Vec<String>,
}

/// Parse one inbound frame.
///
/// - `Ok(Some(_))`: an utterance the session should handle.
/// - `Ok(None)`: well-formed but not of interest (other event types, empty utterances).
/// - `Err(_)`: malformed. The whole frame is to be dropped.
///
/// Items with role `representative` (or `user`) are the representative's; any other `message`
/// item is the agent's.
pub fn parse_inbound(frame: &str) -> Result<Option<InboundEvent>> {
    let value: Value = serde_json::from_str(frame)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::msg("inbound frame has no type"))?;
    if kind != ITEM_CREATED {
        return Ok(None);
    }

    let item = value
        .get("item")
        .cloned()
        .ok_or_else(|| Error::msg("conversation.item.created without item"))?;
    let item: Item = serde_json::from_value(item)?;

    let text = item
        .content
        .first()
        .and_then(|part| part.text.as_deref())
        .unwrap_or_default()
        .trim()
        .to_owned();
    if text.is_empty() {
        return Ok(None);
    }

    let is_rep = matches!(item.role.as_deref(), Some("representative" | "user"));
    if is_rep {
        return Ok(Some(InboundEvent::RepUtterance { text }));
    }

    if item.kind.as_deref() == Some("message") {
        let signals = item.metadata.unwrap_or_default().signals;
        return Ok(Some(InboundEvent::AgentUtterance { text, signals }));
    }

    Ok(None)
}
