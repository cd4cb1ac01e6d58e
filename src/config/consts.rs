/// Tag sent with a data request asking for the complete data bundle of a task
pub const DATA_REQUEST_ALL: &str = "all";
/// RPC method the console shim uses to forward log lines
pub const LOG_OUTPUT_METHOD: &str = "logNodeOutput";
/// RPC methods exposed to sandboxed code through the `helpers` façade by default
pub const DEFAULT_RPC_METHODS: &[&str] = &[
    "helpers.httpRequest",
    "helpers.httpRequestWithAuthentication",
    "helpers.requestWithAuthenticationPaginated",
    "helpers.prepareBinaryData",
    "helpers.setBinaryDataBuffer",
    "helpers.binaryToString",
];
/// Environment variable overriding the built-in module allow-list
pub const ENV_ALLOW_BUILTIN: &str = "NODE_FUNCTION_ALLOW_BUILTIN";
/// Environment variable overriding the external module allow-list
pub const ENV_ALLOW_EXTERNAL: &str = "NODE_FUNCTION_ALLOW_EXTERNAL";
/// Allow-list entry permitting every module
pub const ALLOW_ALL: &str = "*";
