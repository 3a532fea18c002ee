use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use portainer::{StackSource, StackType};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "portainer-reconcile")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declaratively reconcile Portainer resources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Compute and report changes without applying them
    #[arg(long, global = true)]
    pub check: bool,

    /// Show a before/after diff of the resource
    #[arg(long, global = true)]
    pub diff: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub output: OutputFormat,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// How to reach the Portainer server.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Portainer server URL (e.g. https://portainer:9443)
    #[arg(long, env = "PORTAINER_URL", global = true)]
    pub url: Option<String>,

    /// API access token
    #[arg(long, env = "PORTAINER_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// HTTP timeout in seconds [default: 30]
    #[arg(long, env = "PORTAINER_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Settings file [default: ~/.config/portainer-reconcile/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON on stdout
    #[default]
    Json,
    /// Colored status lines and a unified diff
    Text,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(flatten)]
    Resource(ResourceCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ResourceCommand {
    /// Manage a tag
    Tag(TagArgs),

    /// Manage an environment group
    Group(GroupArgs),

    /// Manage an environment
    Environment(EnvironmentArgs),

    /// List environments by id, name, group or tag
    EnvironmentInfo(EnvironmentInfoArgs),

    /// Manage a stack
    Stack(StackArgs),

    /// Manage a Docker network
    Network(NetworkArgs),

    /// Manage a Swarm config
    Config(ConfigArgs),

    /// Manage a Swarm secret
    Secret(SecretArgs),
}

// ============================================================================
// Target states
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Presence {
    #[default]
    Present,
    Absent,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum EnvironmentState {
    #[default]
    Present,
    Absent,
    /// Wait until the environment reports a heartbeat
    Healthy,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum StackState {
    #[default]
    Present,
    Absent,
    Redeployed,
    Started,
    Stopped,
}

// ============================================================================
// Tag / Group
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct TagArgs {
    /// Tag name
    #[arg(long, required_unless_present = "id")]
    pub name: Option<String>,

    /// Tag id
    #[arg(long)]
    pub id: Option<i64>,

    #[arg(long, value_enum, default_value_t)]
    pub state: Presence,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GroupArgs {
    /// Group name
    #[arg(long, required_unless_present = "id")]
    pub name: Option<String>,

    /// Group id
    #[arg(long)]
    pub id: Option<i64>,

    #[arg(long)]
    pub description: Option<String>,

    /// Tag names (comma-separated)
    #[arg(long, value_delimiter = ',', conflicts_with = "tag_ids")]
    pub tags: Vec<String>,

    /// Tag ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub tag_ids: Vec<i64>,

    /// Create tags that do not exist yet
    #[arg(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        default_value_t = false,
        action = clap::ArgAction::Set,
        requires = "tags"
    )]
    pub create_tags: bool,

    #[arg(long, value_enum, default_value_t)]
    pub state: Presence,
}

// ============================================================================
// Environment
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct EnvironmentArgs {
    /// Environment name
    #[arg(long, required_unless_present = "id")]
    pub name: Option<String>,

    /// Environment id
    #[arg(long)]
    pub id: Option<i64>,

    /// Group name
    #[arg(long)]
    pub group: Option<String>,

    /// Create the group if it does not exist
    #[arg(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        default_value_t = false,
        action = clap::ArgAction::Set
    )]
    pub create_group: bool,

    /// Tag names (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Create tags that do not exist yet
    #[arg(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        default_value_t = false,
        action = clap::ArgAction::Set
    )]
    pub create_tags: bool,

    #[arg(long, value_enum, default_value_t)]
    pub state: EnvironmentState,

    /// Seconds to wait for a heartbeat with --state healthy
    #[arg(long, default_value_t = 30)]
    pub wait_timeout: u64,

    /// Seconds between heartbeat polls
    #[arg(long, default_value_t = 5, hide = true)]
    pub poll_interval: u64,

    /// 1 docker, 2 agent, 3 azure, 4 edge agent, 5 local kubernetes
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=5))]
    pub creation_type: Option<i64>,

    /// Environment URL (required for edge agents)
    #[arg(long, required_if_eq("creation_type", "4"))]
    pub url: Option<String>,

    #[arg(long)]
    pub tls: Option<bool>,

    #[arg(long)]
    pub edge_checkin_interval: Option<i64>,

    #[arg(long)]
    pub edge_tunnel_server_address: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EnvironmentInfoArgs {
    /// Environment id
    #[arg(long, conflicts_with_all = ["name", "groups", "tags"])]
    pub id: Option<i64>,

    /// Environment name
    #[arg(long)]
    pub name: Option<String>,

    /// Group names (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub groups: Vec<String>,

    /// Tag names (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
}

// ============================================================================
// Docker-proxied resources
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Environment the config lives in
    #[arg(long)]
    pub environment_id: i64,

    /// Config name
    #[arg(long, required_unless_present = "id")]
    pub name: Option<String>,

    /// Config id
    #[arg(long)]
    pub id: Option<String>,

    /// Read the content from a file
    #[arg(long, conflicts_with = "content")]
    pub file: Option<PathBuf>,

    /// Inline content
    #[arg(long)]
    pub content: Option<String>,

    /// Content is already base64-encoded
    #[arg(long)]
    pub b64_encoded: bool,

    #[arg(long, value_enum, default_value_t)]
    pub state: Presence,

    /// Recreate the config when its content differs
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SecretArgs {
    /// Environment the secret lives in
    #[arg(long)]
    pub environment_id: i64,

    /// Secret name
    #[arg(long, required_unless_present = "id")]
    pub name: Option<String>,

    /// Secret id
    #[arg(long)]
    pub id: Option<String>,

    /// Read the content from a file
    #[arg(long, conflicts_with = "content")]
    pub file: Option<PathBuf>,

    /// Inline content
    #[arg(long, env = "PORTAINER_SECRET_CONTENT", hide_env_values = true)]
    pub content: Option<String>,

    /// Content is already base64-encoded
    #[arg(long)]
    pub b64_encoded: bool,

    #[arg(long, value_enum, default_value_t)]
    pub state: Presence,

    /// Recreate the secret even if it exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum NetworkDriver {
    #[default]
    Bridge,
    Overlay,
}

impl NetworkDriver {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bridge => "bridge",
            Self::Overlay => "overlay",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum NetworkScope {
    Swarm,
    Global,
    Local,
}

impl NetworkScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Swarm => "swarm",
            Self::Global => "global",
            Self::Local => "local",
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct NetworkArgs {
    /// Environment the network lives in
    #[arg(long)]
    pub environment_id: i64,

    /// Network name
    #[arg(long, required_unless_present = "id")]
    pub name: Option<String>,

    /// Network id
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub driver: NetworkDriver,

    #[arg(long, value_enum)]
    pub scope: Option<NetworkScope>,

    #[arg(long)]
    pub attachable: Option<bool>,

    #[arg(long)]
    pub internal: Option<bool>,

    #[arg(long)]
    pub ingress: Option<bool>,

    #[arg(long, value_enum, default_value_t)]
    pub state: Presence,

    /// Recreate the network when its settings differ
    #[arg(long)]
    pub force: bool,
}

// ============================================================================
// Stack
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StackTypeArg {
    Swarm,
    Standalone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StackSourceArg {
    File,
    Repository,
}

impl From<StackTypeArg> for StackType {
    fn from(arg: StackTypeArg) -> Self {
        match arg {
            StackTypeArg::Swarm => Self::Swarm,
            StackTypeArg::Standalone => Self::Standalone,
        }
    }
}

impl From<StackSourceArg> for StackSource {
    fn from(arg: StackSourceArg) -> Self {
        match arg {
            StackSourceArg::File => Self::File,
            StackSourceArg::Repository => Self::Repository,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct StackArgs {
    /// Stack name
    #[arg(long)]
    pub name: Option<String>,

    /// Stack id
    #[arg(long)]
    pub id: Option<i64>,

    #[arg(long = "type", value_enum, required_if_eq("state", "present"))]
    pub stack_type: Option<StackTypeArg>,

    #[arg(long, value_enum, required_if_eq("state", "present"))]
    pub source: Option<StackSourceArg>,

    #[arg(long, value_enum, default_value_t)]
    pub state: StackState,

    /// Target swarm cluster id
    #[arg(long)]
    pub swarm_id: Option<String>,

    /// Target environment id
    #[arg(long)]
    pub environment_id: Option<i64>,

    /// Stack environment variable (NAME=VALUE, repeatable)
    #[arg(long = "env", value_parser = parse_env_var)]
    pub env: Vec<EnvVar>,

    /// Remove services no longer in the compose file
    #[arg(long)]
    pub prune: Option<bool>,

    /// Pull images on update
    #[arg(long)]
    pub pull_images: Option<bool>,

    /// Additional compose files in the repository (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub additional_files: Vec<String>,

    /// Auto-update settings as a JSON object
    #[arg(long, value_parser = parse_json_object)]
    pub autoupdate: Option<serde_json::Value>,

    /// Compose file path in the repository
    #[arg(long)]
    pub compose_file: Option<String>,

    #[arg(long)]
    pub repository_authentication: Option<bool>,

    #[arg(long, env = "PORTAINER_REPOSITORY_PASSWORD", hide_env_values = true)]
    pub repository_password: Option<String>,

    /// Always send an update so a changed password takes effect
    #[arg(long)]
    pub update_password: bool,

    /// Git reference (e.g. refs/heads/main)
    #[arg(long)]
    pub refs_name: Option<String>,

    #[arg(long)]
    pub repository_url: Option<String>,

    #[arg(long)]
    pub repository_username: Option<String>,

    #[arg(long)]
    pub tls_skip_verify: Option<bool>,

    /// Local compose file for file-based stacks
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// One `NAME=VALUE` stack variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

fn parse_env_var(s: &str) -> Result<EnvVar, String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok(EnvVar {
            name: name.to_string(),
            value: value.to_string(),
        }),
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

fn parse_json_object(s: &str) -> Result<serde_json::Value, String> {
    match serde_json::from_str(s) {
        Ok(value @ serde_json::Value::Object(_)) => Ok(value),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}
