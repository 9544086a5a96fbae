use serde::{Deserialize, Serialize};

/// Payload the credentials backend is expected to answer with. Only used to
/// warn about unexpected payloads; the bytes are forwarded untouched.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct IamRoleCredentials {
    pub role_arn: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub token: String,
    pub expiration: String,
}
