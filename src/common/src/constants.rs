pub const DEFAULT_LISTENING_IP: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 51679;
pub const DEFAULT_AWS_CONTAINER_CREDENTIALS_IP: &str = "169.254.170.2";
// credentials repository for IAM roles, keyed by job id
pub const DEFAULT_CREDENTIALS_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_JOB_ID_PREFIX: &str = "TARDIS_SCHID=";

pub const BACKEND_TIMEOUT_MS: u64 = 10_000;
pub const PROCESS_LOOKUP_TIMEOUT_MS: u64 = 2_000;

pub const ENV_PREFIX: &str = "MESOS2IAM";
/// Older name of `MESOS2IAM_JOB_ID_PREFIX`, still honoured.
pub const LEGACY_PREFIX_ENV: &str = "MESOS2IAM_PREFIX";
pub const LOG_FILE_NAME: &str = "mesos2iam.log";

pub const CREDENTIALS_ENDPOINT: &str = "/v2/credentials";
pub const METADATA_PORT: u16 = 80;
