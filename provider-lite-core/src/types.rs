use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─── Scalar aliases ───────────────────────────────────────────

/// Epoch milliseconds (UTC).
pub type Timestamp = i64;

/// Ordered property bag exchanged with the orchestrator and with handlers.
pub type PropertyMap = BTreeMap<String, Value>;

pub(crate) fn now_ms() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

// ─── Value ────────────────────────────────────────────────────

/// A property value. Schema-less on the wire, so deserialization is
/// shape-driven (`untagged`): bools and integers are tried before floats.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::I64(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// ─── Lifecycle event (inbound wire shape) ─────────────────────

/// One Create/Update/Delete request for a logical resource.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// A lifecycle request as delivered by the orchestrator.
///
/// Field names follow the orchestrator's JSON casing exactly. Keys the
/// envelope does not know about land in `extra` and ride along unchanged —
/// that is how a handler passes state to the completion checks that follow it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    pub request_type: RequestType,
    pub logical_resource_id: String,
    /// Absent on Create; assigned by the system once Create completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: PropertyMap,
    /// Present only on Update: the previous desired state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<PropertyMap>,
    /// Provider-defined type tag. Opaque to the engine.
    pub resource_type: String,
    /// Unique per request; the default physical id for a Create.
    pub request_id: String,
    /// Owning deployment transaction.
    pub stack_id: String,
    /// Passthrough keys accumulated across invocations.
    #[serde(flatten)]
    pub extra: PropertyMap,
}

impl LifecycleEvent {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ─── Handler results ──────────────────────────────────────────

/// Output of the synchronous lifecycle handler.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HandlerResult {
    /// Defaulted per request type when omitted: Create → `RequestId`,
    /// Update → the inbound physical id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    /// Exposed attributes of the resource.
    #[serde(default)]
    pub data: PropertyMap,
    /// Ask consumers to mask `data` when displaying it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_echo: Option<bool>,
    /// Anything else is forwarded into the next invocation's event.
    #[serde(flatten)]
    pub extra: PropertyMap,
}

/// Output of one completion poll.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletionResult {
    pub is_complete: bool,
    /// Only meaningful when `is_complete` — merged over the synchronous
    /// handler's data, new keys winning on conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PropertyMap>,
}

// ─── Resource record (engine-internal) ────────────────────────

/// A normalized, confirmed-or-pending resource: the dispatch engine's view
/// of a handler result after defaulting rules have been applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceRecord {
    pub physical_resource_id: String,
    pub data: PropertyMap,
    pub no_echo: bool,
    /// Set when an Update produced a new physical identity — the old id
    /// must be deleted once this record is confirmed live.
    pub replaces: Option<String>,
}

/// A deletion owed to a replacement: the old physical identity, queued once
/// the replacement is live.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingDeletion {
    pub logical_resource_id: String,
    pub physical_resource_id: String,
    pub scheduled_at: Timestamp,
}

// ─── Terminal response (outbound wire shape) ──────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
}

/// The one terminal response reported back to the orchestrator per
/// lifecycle event — never both SUCCESS and FAILED, never neither.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProviderResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: PropertyMap,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_echo: bool,
}

impl ProviderResponse {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_orchestrator_event_with_passthrough_keys() {
        let json = r#"{
            "RequestType": "Update",
            "LogicalResourceId": "SearchIndex",
            "PhysicalResourceId": "idx-001",
            "ResourceProperties": {"IndexName": "documents", "Dimensions": 1024},
            "OldResourceProperties": {"IndexName": "documents", "Dimensions": 768},
            "ResourceType": "Custom::SearchIndex",
            "RequestId": "req-9",
            "StackId": "stack-1",
            "CollectionEndpoint": "https://search.example"
        }"#;

        let event = LifecycleEvent::from_json(json).unwrap();
        assert_eq!(event.request_type, RequestType::Update);
        assert_eq!(event.physical_resource_id.as_deref(), Some("idx-001"));
        assert_eq!(
            event.resource_properties.get("Dimensions"),
            Some(&Value::I64(1024))
        );
        assert_eq!(
            event.old_resource_properties.as_ref().unwrap().get("Dimensions"),
            Some(&Value::I64(768))
        );
        assert_eq!(
            event.extra.get("CollectionEndpoint"),
            Some(&Value::Str("https://search.example".to_string()))
        );
    }

    #[test]
    fn create_event_omits_physical_id_on_the_wire() {
        let event = LifecycleEvent {
            request_type: RequestType::Create,
            logical_resource_id: "SearchIndex".to_string(),
            physical_resource_id: None,
            resource_properties: PropertyMap::new(),
            old_resource_properties: None,
            resource_type: "Custom::SearchIndex".to_string(),
            request_id: "req-1".to_string(),
            stack_id: "stack-1".to_string(),
            extra: PropertyMap::new(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("PhysicalResourceId"));
        assert!(!json.contains("OldResourceProperties"));
    }

    #[test]
    fn value_deserializes_by_shape() {
        let map: PropertyMap =
            serde_json::from_str(r#"{"a": true, "b": 2, "c": 2.5, "d": "x", "e": [1], "f": {"g": null}}"#)
                .unwrap();
        assert_eq!(map.get("a"), Some(&Value::Bool(true)));
        assert_eq!(map.get("b"), Some(&Value::I64(2)));
        assert_eq!(map.get("c"), Some(&Value::F64(2.5)));
        assert_eq!(map.get("d"), Some(&Value::Str("x".to_string())));
        assert_eq!(map.get("e"), Some(&Value::List(vec![Value::I64(1)])));
        let nested = match map.get("f") {
            Some(Value::Map(m)) => m,
            other => panic!("expected nested map, got {other:?}"),
        };
        assert_eq!(nested.get("g"), Some(&Value::Null));
    }

    #[test]
    fn response_status_uses_upper_case_wire_names() {
        let response = ProviderResponse {
            status: ResponseStatus::Success,
            reason: None,
            physical_resource_id: Some("idx-001".to_string()),
            stack_id: "stack-1".to_string(),
            request_id: "req-1".to_string(),
            logical_resource_id: "SearchIndex".to_string(),
            data: PropertyMap::new(),
            no_echo: false,
        };
        let json = response.to_json().unwrap();
        assert!(json.contains(r#""Status":"SUCCESS""#));
        assert!(!json.contains("Reason"));
        assert!(!json.contains("NoEcho"));
    }

    #[test]
    fn handler_result_parses_passthrough_keys() {
        let result: HandlerResult = serde_json::from_str(
            r#"{"PhysicalResourceId": "idx-002", "Data": {"Endpoint": "x"}, "PollMarker": "m-1"}"#,
        )
        .unwrap();
        assert_eq!(result.physical_resource_id.as_deref(), Some("idx-002"));
        assert_eq!(result.extra.get("PollMarker"), Some(&Value::Str("m-1".to_string())));
    }
}
