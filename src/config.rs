use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Mindmetric";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Storage key for the JSON-serialized record collection.
pub const STORE_KEY_TEST_DATA: &str = "mccb_test_data";
/// Storage key for the user's display name.
pub const STORE_KEY_USER_NAME: &str = "mccb_user_name";

/// Base URL of the optional local backup collaborator.
pub const DEFAULT_BACKUP_URL: &str = "http://localhost:8001";

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    "mindmetric=info".to_string()
}

/// Get the application data directory
/// ~/Mindmetric/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Mindmetric")
}

/// Get the path of the dashboard's durable store.
pub fn store_path() -> PathBuf {
    app_data_dir().join("dashboard.db")
}
