pub mod commands;
pub mod handlers;

pub use commands::{CLAP_STYLING, DEFAULT_CONFIG_DIR, command_argument_builder};
pub use handlers::{
    GlobalOptions, database_path, failure_hint, initialize_database, key_updated_at,
    open_database, resolve_config_dir, state_message, stored_key_summary,
};
