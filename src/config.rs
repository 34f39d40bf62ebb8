use std::env;
use std::path::PathBuf;

use crate::services::pipedream::PipedreamSettings;

pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub frontend_origin: Option<String>,
    pub pipedream: PipedreamSettings,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let bind_addr = optional("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:4000".to_string());
        let data_dir = optional("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let pipedream = PipedreamSettings {
            client_id: optional("PIPEDREAM_CLIENT_ID"),
            client_secret: optional("PIPEDREAM_CLIENT_SECRET"),
            project_id: optional("PIPEDREAM_PROJECT_ID"),
            environment: optional("PIPEDREAM_PROJECT_ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),
            api_base: optional("PIPEDREAM_API_BASE")
                .unwrap_or_else(|| "https://api.pipedream.com".to_string()),
        };

        Config {
            bind_addr,
            data_dir,
            frontend_origin: optional("FRONTEND_ORIGIN"),
            pipedream,
        }
    }

    pub fn deployments_path(&self) -> PathBuf {
        self.data_dir.join("deployments.json")
    }

    pub fn workflows_path(&self) -> PathBuf {
        self.data_dir.join("workflows.json")
    }
}
