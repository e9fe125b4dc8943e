use std::path::PathBuf;

pub fn default_root() -> PathBuf {
    PathBuf::from(".")
}

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    3000
}

pub fn default_hmr_path() -> String {
    "/__kite_hmr".to_string()
}

pub fn default_bare_module_route() -> String {
    "/@module".to_string()
}

pub fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

pub fn default_debounce_ms() -> u64 {
    100
}

pub fn default_watch_ignore() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        ".git".to_string(),
        "dist".to_string(),
        "*.log".to_string(),
        ".DS_Store".to_string(),
    ]
}
