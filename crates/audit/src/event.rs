use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockroom_core::ShopId;

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Created,
    Updated,
    Completed,
    Cancelled,
    Deleted,
    Adjusted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Updated => "updated",
            AuditAction::Completed => "completed",
            AuditAction::Cancelled => "cancelled",
            AuditAction::Deleted => "deleted",
            AuditAction::Adjusted => "adjusted",
        }
    }
}

/// A fact record describing a successful state change.
///
/// Events are immutable; `old_data`/`new_data` carry serialized entity
/// snapshots where a diff is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub shop_id: ShopId,
    pub action_type: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub entity_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_data: Option<JsonValue>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        shop_id: ShopId,
        action_type: AuditAction,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        entity_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            shop_id,
            action_type,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            entity_name: entity_name.into(),
            description: description.into(),
            old_data: None,
            new_data: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_old_data(mut self, data: JsonValue) -> Self {
        self.old_data = Some(data);
        self
    }

    pub fn with_new_data(mut self, data: JsonValue) -> Self {
        self.new_data = Some(data);
        self
    }
}
