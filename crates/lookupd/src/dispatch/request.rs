//! Decoding of dispatch-mode request payloads.

use lookup_protocol::ActionRequest;

use super::DispatchError;

/// Parses a trimmed payload into an [`ActionRequest`].
///
/// # Errors
///
/// Returns [`DispatchError::MalformedJson`] for empty or non-JSON payloads
/// and [`DispatchError::InvalidStructure`] when the JSON lacks a non-empty
/// string `action`.
pub fn parse_request(payload: &[u8]) -> Result<ActionRequest, DispatchError> {
    if payload.is_empty() {
        return Err(DispatchError::malformed("empty request"));
    }
    let request: ActionRequest =
        serde_json::from_slice(payload).map_err(DispatchError::from_json_error)?;
    if request.action.trim().is_empty() {
        return Err(DispatchError::invalid_structure("action field is empty"));
    }
    Ok(request)
}
