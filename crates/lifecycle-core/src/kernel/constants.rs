/// Application name
pub const APP_NAME: &str = "lifecycle";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the default startup stage (runs oldest registration first)
pub const STARTUP_STAGE: &str = "startup";

/// Name of the default shutdown stage (runs newest registration first)
pub const SHUTDOWN_STAGE: &str = "shutdown";

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "lifecycle.toml";
