//! Configuration: `skillreg.toml` plus environment overrides for secrets.

pub mod parser;
pub mod schema;
pub mod store;

pub use parser::{parse_config, parse_config_str, to_toml};
pub use schema::{
    CanonicalConfig, CanonicalCredential, EndpointConfig, GitHubConfig, SkillregConfig,
    ToolsConfig,
};
pub use store::{ConfigStore, apply_env};
