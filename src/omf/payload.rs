use std::path::Path;

use serde_json::value::RawValue;
use tracing::info;

use crate::error::{PublishError, PublishResult};
use crate::omf::{OmfMessage, OmfMessageType};

/// Read the three payload files and return their messages in send order:
/// every type, then every container, then every data message.
pub async fn load_messages(
    types_path: &Path,
    containers_path: &Path,
    data_path: &Path,
) -> PublishResult<Vec<OmfMessage>> {
    let mut messages = Vec::new();
    for (message_type, path) in [
        (OmfMessageType::Type, types_path),
        (OmfMessageType::Container, containers_path),
        (OmfMessageType::Data, data_path),
    ] {
        let loaded = load_file(message_type, path).await?;
        info!(file = %path.display(), count = loaded.len(), "loaded {} messages", message_type);
        messages.extend(loaded);
    }
    Ok(messages)
}

pub async fn load_file(
    message_type: OmfMessageType,
    path: &Path,
) -> PublishResult<Vec<OmfMessage>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        PublishError::config(format!("unable to open payload file '{}': {}", path.display(), e))
    })?;
    parse_messages(message_type, &content).map_err(|reason| {
        PublishError::config(format!("payload file '{}': {}", path.display(), reason))
    })
}

/// Split a JSON array into one message per element. Each element keeps its
/// original text: key order, number formatting and whitespace inside it are
/// what the ingestion endpoint receives.
pub fn parse_messages(
    message_type: OmfMessageType,
    content: &str,
) -> Result<Vec<OmfMessage>, String> {
    if !content.trim_start().starts_with('[') {
        return Err("expected a JSON array".to_string());
    }
    serde_json::from_str::<Vec<Box<RawValue>>>(content)
        .map(|items| {
            items
                .into_iter()
                .map(|body| OmfMessage::new(message_type, body))
                .collect()
        })
        .map_err(|e| format!("unable to parse: {}", e))
}
