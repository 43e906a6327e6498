pub fn get_signature(version: &str) -> String {
    format!(
        r#"
   _   _ ___ ___                 _
  | | | / __|   \ _ __  __ _ __| |__
  | |_| \__ \ |) | '_ \/ _` / _| / /   usdpack (USD addon packager and bootstrapper)
   \___/|___/___/| .__/\__,_\__|_\_\
                 |_|                   v{}
"#,
        version
    )
}
