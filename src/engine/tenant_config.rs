//! Endpoint configuration keys.
//!
//! `Endpoint.config` is a free-form JSON object; only the keys this crate
//! understands are interpreted here. Unknown keys are stored but ignored,
//! matching the admin surface's contract of persisting whatever config map a
//! client supplies.

use serde_json::Value;

use crate::error::ScimError;

#[derive(Debug, Clone, Default)]
pub struct TenantConfig {
    pub multi_op_patch_add_multiple_members: bool,
    pub patch_op_allow_remove_all_members: bool,
    pub verbose_patch_supported: bool,
    pub log_level: Option<String>,
}

const KNOWN_LOG_LEVELS: &[&str] = &["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

impl TenantConfig {
    pub fn from_json(value: &Value) -> Result<Self, ScimError> {
        let mut cfg = TenantConfig::default();
        let Some(obj) = value.as_object() else {
            return Ok(cfg);
        };

        for (key, v) in obj {
            match key.as_str() {
                "MultiOpPatchRequestAddMultipleMembersToGroup" => {
                    cfg.multi_op_patch_add_multiple_members = parse_bool(key, v)?;
                }
                "PatchOpAllowRemoveAllMembers" => {
                    cfg.patch_op_allow_remove_all_members = parse_bool(key, v)?;
                }
                "VerbosePatchSupported" => {
                    cfg.verbose_patch_supported = parse_bool(key, v)?;
                }
                "logLevel" => {
                    cfg.log_level = Some(parse_log_level(v)?);
                }
                _ => {}
            }
        }
        Ok(cfg)
    }
}

/// Validates a raw config map at admin write time (invalid values must
/// produce `400 invalidValue`), without needing an already-constructed
/// `TenantConfig`.
pub fn validate_config(value: &Value) -> Result<(), ScimError> {
    TenantConfig::from_json(value).map(|_| ())
}

fn parse_bool(key: &str, v: &Value) -> Result<bool, ScimError> {
    match v {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(ScimError::InvalidValue {
                detail: format!("invalid value '{other}' for config key '{key}'"),
            }),
        },
        other => Err(ScimError::InvalidValue {
            detail: format!("invalid value '{other}' for config key '{key}'"),
        }),
    }
}

fn parse_log_level(v: &Value) -> Result<String, ScimError> {
    match v {
        Value::String(s) if KNOWN_LOG_LEVELS.contains(&s.to_uppercase().as_str()) => Ok(s.to_uppercase()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(ScimError::InvalidValue {
            detail: format!("invalid value '{other}' for config key 'logLevel'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_keys() {
        let cfg = TenantConfig::from_json(&json!({
            "MultiOpPatchRequestAddMultipleMembersToGroup": "true",
            "PatchOpAllowRemoveAllMembers": false,
            "logLevel": "debug",
        }))
        .unwrap();
        assert!(cfg.multi_op_patch_add_multiple_members);
        assert!(!cfg.patch_op_allow_remove_all_members);
        assert_eq!(cfg.log_level.as_deref(), Some("DEBUG"));
    }

    #[test]
    fn rejects_invalid_bool() {
        assert!(TenantConfig::from_json(&json!({"PatchOpAllowRemoveAllMembers": "maybe"})).is_err());
    }
}
