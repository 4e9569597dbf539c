use crate::error::{AppError, Result};
use crate::registry::types::Instance;

/// Decodes the node payload stored under `{root}/instances/{app}/{host}:{port}`.
pub fn decode_instance(bytes: &[u8]) -> Result<Instance> {
    let instance: Instance = serde_json::from_slice(bytes)
        .map_err(|e| AppError::Parse(format!("Failed to decode instance payload: {}", e)))?;

    if instance.app_name.is_empty() || instance.host_name.is_empty() {
        return Err(AppError::Parse(
            "Instance payload is missing appName or hostName".to_string(),
        ));
    }

    Ok(instance)
}

pub fn encode_instance(instance: &Instance) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(instance)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_registration_payload() {
        let payload = br#"{
            "appName": "orderApp",
            "hostName": "10.0.0.1",
            "port": 8080,
            "appState": "UP",
            "startTime": 1558923912000
        }"#;

        let instance = decode_instance(payload).unwrap();
        assert_eq!(instance, Instance::new("orderApp", "10.0.0.1", 8080, "UP"));
    }

    #[test]
    fn test_decode_short_field_names() {
        let payload = br#"{"appName":"orderApp","host":"10.0.0.1","port":8080}"#;

        let instance = decode_instance(payload).unwrap();
        assert_eq!(instance.host_name, "10.0.0.1");
        assert_eq!(instance.app_state, "");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_instance(b"\xac\xed\x00\x05sr").is_err());
        assert!(decode_instance(br#"{"appName":"orderApp"}"#).is_err());
        assert!(decode_instance(br#"{"appName":"orderApp","hostName":"h","port":70000}"#).is_err());
        assert!(decode_instance(br#"{"appName":"","hostName":"h","port":1}"#).is_err());
    }

    #[test]
    fn test_encoded_payload_decodes() {
        let instance = Instance::new("payApp", "10.0.0.9", 9090, "DOWN");
        let bytes = encode_instance(&instance).unwrap();
        assert_eq!(decode_instance(&bytes).unwrap(), instance);
    }
}
