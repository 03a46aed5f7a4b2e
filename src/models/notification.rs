//! Push payloads, relay messages, and notification records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Push `type` value for a finished AI analysis.
pub const AI_ANALYSIS_COMPLETE: &str = "ai_analysis_complete";

/// Push `type` value for a freshly published signal (also the fallback).
pub const NEW_SIGNAL: &str = "new_signal";

/// Kind of signal event a notification represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "new_signal")]
    NewSignal,
    #[serde(rename = "ai_analysis_complete")]
    AiAnalysisComplete,
}

impl NotificationKind {
    /// Returns the wire-format type name used in push payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewSignal => NEW_SIGNAL,
            NotificationKind::AiAnalysisComplete => AI_ANALYSIS_COMPLETE,
        }
    }

    /// Maps a push `type` field; anything unrecognised is a new signal.
    pub fn from_push_type(tpe: Option<&str>) -> Self {
        match tpe {
            Some(AI_ANALYSIS_COMPLETE) => NotificationKind::AiAnalysisComplete,
            _ => NotificationKind::NewSignal,
        }
    }
}

/// Descriptive fields carried from the event payload into the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationData {
    pub pair: String,
    pub direction: String,
    pub quality_score: Option<String>,
    pub strategy: Option<String>,
    pub timeframe: Option<String>,
}

impl NotificationData {
    /// Extracts the descriptive fields from a push data map. Missing string
    /// fields become empty, missing optional fields stay `None`.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        Self {
            pair: string_field(payload, "pair").unwrap_or_default(),
            direction: string_field(payload, "direction").unwrap_or_default(),
            quality_score: string_field(payload, "quality_score"),
            strategy: string_field(payload, "strategy"),
            timeframe: string_field(payload, "timeframe"),
        }
    }
}

/// One delivered signal event as tracked by the notification store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    pub signal_id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub pair: String,
    #[serde(default)]
    pub direction: String,
    /// Client receipt time, Unix milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
}

impl NotificationItem {
    pub fn new(signal_id: i64, kind: NotificationKind, data: NotificationData, timestamp: i64) -> Self {
        Self {
            signal_id,
            kind,
            pair: data.pair,
            direction: data.direction,
            timestamp,
            quality_score: data.quality_score,
            strategy: data.strategy,
            timeframe: data.timeframe,
        }
    }
}

/// Notification payload already rendered by the messaging platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformNotification {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// A push message as delivered to the background worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushMessage {
    /// Free-form data map (`signal_id`, `type`, `pair`, `direction`, ...).
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Present when the platform will display a notification itself.
    #[serde(default)]
    pub notification: Option<PlatformNotification>,
}

impl PushMessage {
    /// The raw `type` field, if it is a string.
    pub fn push_type(&self) -> Option<&str> {
        self.data.get("type").and_then(Value::as_str)
    }

    /// The `signal_id` field, accepted as a number or numeric string.
    pub fn signal_id(&self) -> Option<i64> {
        parse_signal_id(self.data.get("signal_id"))
    }
}

/// Client-side event name relayed to open windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessageType {
    #[serde(rename = "signals:new")]
    NewSignal,
    #[serde(rename = "signals:ai_complete")]
    AiComplete,
}

impl ClientMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientMessageType::NewSignal => "signals:new",
            ClientMessageType::AiComplete => "signals:ai_complete",
        }
    }
}

impl From<NotificationKind> for ClientMessageType {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::NewSignal => ClientMessageType::NewSignal,
            NotificationKind::AiAnalysisComplete => ClientMessageType::AiComplete,
        }
    }
}

impl From<ClientMessageType> for NotificationKind {
    fn from(tpe: ClientMessageType) -> Self {
        match tpe {
            ClientMessageType::NewSignal => NotificationKind::NewSignal,
            ClientMessageType::AiComplete => NotificationKind::AiAnalysisComplete,
        }
    }
}

/// Message posted from the worker to every open window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    #[serde(rename = "type")]
    pub tpe: ClientMessageType,
    /// The original push data map, untouched.
    pub payload: Map<String, Value>,
}

/// Data attached to a displayed notification, returned on click.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAttachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_id: Option<i64>,
}

/// A system notification the worker asks the platform to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    /// Replacement key: same tag replaces, distinct tags stack.
    pub tag: String,
    pub renotify: bool,
    pub data: NotificationAttachment,
}

/// A click on a displayed notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationClick {
    pub tag: String,
    pub data: NotificationAttachment,
}

/// Parses a signal id given as a JSON number or numeric string.
pub fn parse_signal_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a field as a string, stringifying numbers.
fn string_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
