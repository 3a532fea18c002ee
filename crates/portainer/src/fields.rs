//! Canonical field names per resource kind.
//!
//! Read and write shapes share most names but not all of them (form-data and
//! query spellings differ from the JSON ones), so every module refers to
//! these constants instead of string literals.

/// Environment groups (`/endpoint_groups`).
pub mod group {
    pub const ID: &str = "Id";
    pub const NAME: &str = "Name";
    pub const DESCRIPTION: &str = "Description";
    pub const TAG_IDS: &str = "TagIDs";
}

/// Tags (`/tags`).
pub mod tag {
    pub const ID: &str = "ID";
    pub const NAME: &str = "Name";
}

/// Environments (`/endpoints`).
pub mod environment {
    pub const ID: &str = "Id";
    pub const NAME: &str = "Name";
    pub const NAME_QUERY: &str = "name";
    pub const HEARTBEAT: &str = "Heartbeat";
    pub const GROUP_ID: &str = "GroupId";
    pub const GROUP_ID_FORM_DATA: &str = "GroupID";
    pub const TAG_IDS: &str = "TagIds";
    pub const GROUP_IDS_QUERY: &str = "groupIds";
    pub const TAG_IDS_QUERY: &str = "tagIds";
    pub const CREATION_TYPE: &str = "EndpointCreationType";
    pub const URL: &str = "URL";
    pub const EDGE_CHECKIN_INTERVAL: &str = "EdgeCheckinInterval";
    pub const EDGE_TUNNEL_SERVER_ADDRESS: &str = "EdgeTunnelServerAddress";
    pub const TLS_CONFIG: &str = "TLSConfig";
    pub const TLS: &str = "TLS";
    pub const TLS_CA_CERT: &str = "TLSCACert";
    pub const TLS_CERT: &str = "TLSCert";
    pub const TLS_KEY: &str = "TLSKey";
    pub const TLS_SKIP_VERIFY: &str = "TLSSkipVerify";
    pub const EXCLUDE_SNAPSHOTS: &str = "excludeSnapshots";
    pub const EXCLUDE_SNAPSHOT_RAW: &str = "excludeSnapshotRaw";
    pub const TYPE: &str = "Type";
    pub const SWARM: &str = "Swarm";

    /// TLS fields nested under `TLSConfig` on read and flat on write.
    pub const TLS_FIELDS: [&str; 5] = [TLS, TLS_CA_CERT, TLS_CERT, TLS_KEY, TLS_SKIP_VERIFY];

    /// `Type` value of edge agent environments.
    pub const TYPE_EDGE_AGENT: i64 = 4;
}

/// Stacks (`/stacks`).
pub mod stack {
    pub const ID: &str = "Id";
    pub const NAME: &str = "Name";
    pub const TYPE: &str = "Type";
    pub const ENDPOINT_ID: &str = "EndpointId";
    pub const ENDPOINT_ID_QUERY: &str = "endpointId";
    pub const ADDITIONAL_FILES: &str = "AdditionalFiles";
    pub const AUTO_UPDATE: &str = "AutoUpdate";
    pub const COMPOSE_FILE: &str = "ComposeFile";
    pub const ENV: &str = "Env";
    pub const PRUNE: &str = "Prune";
    pub const PULL_IMAGE: &str = "PullImage";
    pub const REPOSITORY_AUTHENTICATION: &str = "RepositoryAuthentication";
    pub const REPOSITORY_AUTHORIZATION_TYPE: &str = "RepositoryAuthorizationType";
    pub const REPOSITORY_PASSWORD: &str = "RepositoryPassword";
    pub const REPOSITORY_REFERENCE_NAME: &str = "RepositoryReferenceName";
    pub const REPOSITORY_URL: &str = "RepositoryURL";
    pub const REPOSITORY_USERNAME: &str = "RepositoryUsername";
    pub const SWARM_ID: &str = "SwarmId";
    pub const SWARM_ID_FORM_DATA: &str = "SwarmID";
    pub const TLS_SKIP_VERIFY: &str = "TlsskipVerify";
    pub const FILE: &str = "file";
    pub const FILE_CONTENT: &str = "StackFileContent";
    pub const STATUS: &str = "Status";
    pub const FILTERS_QUERY: &str = "filters";

    pub const GIT_CONFIG: &str = "GitConfig";
    pub const GIT_AUTHENTICATION: &str = "Authentication";
    pub const GIT_AUTH_TYPE: &str = "Authentication.AuthorizationType";
    pub const GIT_USERNAME: &str = "Authentication.Username";
    pub const GIT_REFERENCE_NAME: &str = "ReferenceName";
    pub const GIT_TLS_SKIP_VERIFY: &str = "TLSSkipVerify";
    pub const GIT_URL: &str = "URL";
    pub const GIT_CONFIG_FILE_PATH: &str = "ConfigFilePath";

    /// Server-managed bookkeeping fields.
    pub const BOOKKEEPING: [&str; 3] = ["ResourceControl", "UpdateDate", "UpdatedBy"];
}

/// Swarm configs (`/configs` through the Docker proxy).
pub mod config {
    pub const ID: &str = "ID";
    pub const NAME: &str = "Name";
    pub const DATA: &str = "Data";
}

/// Swarm secrets (`/secrets` through the Docker proxy).
pub mod secret {
    pub const ID: &str = "ID";
    pub const NAME: &str = "Name";
    pub const DATA: &str = "Data";
}

/// Docker networks (`/networks` through the Docker proxy).
pub mod network {
    pub const ID: &str = "Id";
    pub const NAME: &str = "Name";
    pub const DRIVER: &str = "Driver";
    pub const SCOPE: &str = "Scope";
    pub const INTERNAL: &str = "Internal";
    pub const ATTACHABLE: &str = "Attachable";
    pub const INGRESS: &str = "Ingress";
}

/// Swarm descriptor (`/swarm` through the Docker proxy).
pub mod swarm {
    pub const ID: &str = "ID";
    pub const NAME: &str = "Name";
    pub const SPEC_NAME: &str = "Spec.Name";
    pub const SPEC_DATA: &str = "Spec.Data";
}
