/// Returns the CLI version:
/// 1. USDPACK_CLI_VERSION env var
/// 2. compile-time CARGO_PKG_VERSION
pub fn get_version() -> String {
    if let Ok(v) = std::env::var("USDPACK_CLI_VERSION") {
        if !v.trim().is_empty() {
            return v.trim().to_string();
        }
    }

    env!("CARGO_PKG_VERSION").to_string()
}
