//! Field-presence rules and physical-id normalization for the event
//! envelope. Everything here runs before or immediately after the handler,
//! and never touches the store — pure functions over the envelope.

use crate::error::ProviderError;
use crate::types::{LifecycleEvent, RequestType};

/// Check the presence rules for an inbound event. Violations are fatal and
/// reported before any handler is invoked.
pub fn validate(event: &LifecycleEvent) -> Result<(), ProviderError> {
    let violation = |reason: &str| {
        Err(ProviderError::ContractViolation {
            reason: reason.to_string(),
        })
    };

    match event.request_type {
        RequestType::Create => {
            if event.physical_resource_id.is_some() {
                return violation("Create event must not carry PhysicalResourceId");
            }
            if event.old_resource_properties.is_some() {
                return violation("Create event must not carry OldResourceProperties");
            }
        }
        RequestType::Update => {
            if event.physical_resource_id.is_none() {
                return violation("Update event requires PhysicalResourceId");
            }
            if event.old_resource_properties.is_none() {
                return violation("Update event requires OldResourceProperties");
            }
        }
        RequestType::Delete => {
            if event.physical_resource_id.is_none() {
                return violation("Delete event requires PhysicalResourceId");
            }
            if event.old_resource_properties.is_some() {
                return violation("Delete event must not carry OldResourceProperties");
            }
        }
    }
    Ok(())
}

/// Apply the physical-id defaulting rules to a handler's answer.
///
/// Create falls back to the request id, Update passes the inbound id
/// through, and a Delete that answers under a different identity is a
/// violation — the system cannot delete "something else".
pub fn resolve_physical_id(
    event: &LifecycleEvent,
    returned: Option<&str>,
) -> Result<String, ProviderError> {
    match event.request_type {
        RequestType::Create => Ok(returned.unwrap_or(&event.request_id).to_string()),
        RequestType::Update => {
            // Presence validated before dispatch.
            let inbound = event.physical_resource_id.as_deref().unwrap_or_default();
            Ok(returned.unwrap_or(inbound).to_string())
        }
        RequestType::Delete => {
            let inbound = event.physical_resource_id.as_deref().unwrap_or_default();
            match returned {
                None => Ok(inbound.to_string()),
                Some(r) if r == inbound => Ok(inbound.to_string()),
                Some(r) => Err(ProviderError::ReplacementViolation {
                    expected: inbound.to_string(),
                    returned: r.to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyMap;

    fn make_event(request_type: RequestType) -> LifecycleEvent {
        let physical_resource_id = match request_type {
            RequestType::Create => None,
            _ => Some("idx-001".to_string()),
        };
        let old_resource_properties = match request_type {
            RequestType::Update => Some(PropertyMap::new()),
            _ => None,
        };
        LifecycleEvent {
            request_type,
            logical_resource_id: "SearchIndex".to_string(),
            physical_resource_id,
            resource_properties: PropertyMap::new(),
            old_resource_properties,
            resource_type: "Custom::SearchIndex".to_string(),
            request_id: "req-1".to_string(),
            stack_id: "stack-1".to_string(),
            extra: PropertyMap::new(),
        }
    }

    #[test]
    fn well_formed_events_pass() {
        for rt in [RequestType::Create, RequestType::Update, RequestType::Delete] {
            assert!(validate(&make_event(rt)).is_ok());
        }
    }

    #[test]
    fn create_with_physical_id_is_rejected() {
        let mut event = make_event(RequestType::Create);
        event.physical_resource_id = Some("idx-001".to_string());
        assert!(matches!(
            validate(&event),
            Err(ProviderError::ContractViolation { .. })
        ));
    }

    #[test]
    fn update_without_old_properties_is_rejected() {
        let mut event = make_event(RequestType::Update);
        event.old_resource_properties = None;
        let err = validate(&event).unwrap_err();
        assert!(err.to_string().contains("OldResourceProperties"));
    }

    #[test]
    fn update_without_physical_id_is_rejected() {
        let mut event = make_event(RequestType::Update);
        event.physical_resource_id = None;
        assert!(validate(&event).is_err());
    }

    #[test]
    fn delete_with_old_properties_is_rejected() {
        let mut event = make_event(RequestType::Delete);
        event.old_resource_properties = Some(PropertyMap::new());
        assert!(validate(&event).is_err());
    }

    #[test]
    fn create_defaults_to_the_request_id() {
        let event = make_event(RequestType::Create);
        assert_eq!(resolve_physical_id(&event, None).unwrap(), "req-1");
        // Same event, same request id, same default.
        assert_eq!(resolve_physical_id(&event, None).unwrap(), "req-1");
    }

    #[test]
    fn create_keeps_an_explicit_id() {
        let event = make_event(RequestType::Create);
        assert_eq!(resolve_physical_id(&event, Some("idx-42")).unwrap(), "idx-42");
    }

    #[test]
    fn update_passes_the_inbound_id_through() {
        let event = make_event(RequestType::Update);
        assert_eq!(resolve_physical_id(&event, None).unwrap(), "idx-001");
    }

    #[test]
    fn delete_under_a_different_identity_is_a_violation() {
        let event = make_event(RequestType::Delete);
        let err = resolve_physical_id(&event, Some("idx-other")).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::ReplacementViolation { ref expected, ref returned }
                if expected == "idx-001" && returned == "idx-other"
        ));
    }

    #[test]
    fn delete_echoing_the_inbound_id_is_fine() {
        let event = make_event(RequestType::Delete);
        assert_eq!(resolve_physical_id(&event, Some("idx-001")).unwrap(), "idx-001");
    }
}
