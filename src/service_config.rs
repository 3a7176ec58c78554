use serde::Deserialize;

/// Connection details for the remote vision/inventory service. The clear-token
/// is never stored in the config file, only the name of the environment
/// variable that holds it.
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub clear_token_env: Option<String>,
}

impl ServiceConfig {
    pub fn clear_token_env_name(&self) -> &str {
        self.clear_token_env.as_deref().unwrap_or("INVCAM_INVENTORY_TOKEN")
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            base_url: "http://127.0.0.1:8000".to_string(),
            clear_token_env: None,
        }
    }
}
