use once_cell::sync::OnceCell;

const DEFAULT_AGENT_API_URL: &str = "https://agent-prod.studio.lyzr.ai/v3/inference/chat/";

#[derive(Debug, Clone)]
pub struct Config {
    pub agent_api_key: String,
    pub agent_api_url: String,
    pub agent_max_retries: u32,
    pub agent_retry_base_delay_ms: u64,
    pub agent_retry_max_delay_ms: u64,
    pub agent_retry_jitter_ms: u64,
    pub port: u16,
    pub node_env: String,
    pub host: String,
    pub log_level: String,
    pub log_max_files: String,
    pub cors_origins: Vec<String>,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn init_global() -> Result<&'static Config, String> {
        let cfg = Config::from_env();
        CONFIG
            .set(cfg)
            .map_err(|_| "Config already initialized".to_string())?;
        CONFIG
            .get()
            .ok_or_else(|| "Config missing after initialization".to_string())
    }

    pub fn get() -> &'static Config {
        CONFIG.get().expect("Config not initialized")
    }

    fn from_env() -> Config {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let read_u64 = |key: &str, def: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(def)
        };
        let read_str = |key: &str, def: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| def.to_string())
        };

        let agent_api_key = lookup("AGENT_API_KEY")
            .or_else(|| lookup("LYZR_API_KEY"))
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        let agent_api_url = read_str("AGENT_API_URL", DEFAULT_AGENT_API_URL);

        let agent_max_retries = lookup("AGENT_MAX_RETRIES")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(3);
        let agent_retry_base_delay_ms = read_u64("AGENT_RETRY_BASE_DELAY_MS", 1000);
        let agent_retry_max_delay_ms = read_u64("AGENT_RETRY_MAX_DELAY_MS", 10_000);
        let agent_retry_jitter_ms = read_u64("AGENT_RETRY_JITTER_MS", 1000);

        let port = lookup("PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(3001);
        let node_env = read_str("NODE_ENV", "development");
        let host = read_str("HOST", "0.0.0.0");

        let log_level = read_str("LOG_LEVEL", "info");
        let log_max_files = read_str("LOG_MAX_FILES", "7d");

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(v) => v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => vec!["*".to_string()],
        };

        Config {
            agent_api_key,
            agent_api_url,
            agent_max_retries,
            agent_retry_base_delay_ms,
            agent_retry_max_delay_ms,
            agent_retry_jitter_ms,
            port,
            node_env,
            host,
            log_level,
            log_max_files,
            cors_origins,
        }
    }

    pub fn has_agent_api_key(&self) -> bool {
        !self.agent_api_key.is_empty()
    }

    pub fn print(&self) {
        println!("Current configuration:");
        println!("  - NODE_ENV: {}", self.node_env);
        println!("  - PORT: {}", self.port);
        println!("  - HOST: {}", self.host);
        println!("  - AGENT_API_URL: {}", self.agent_api_url);
        println!(
            "  - AGENT_API_KEY: {}",
            if self.has_agent_api_key() { "set" } else { "not set" }
        );
        println!("  - LOG_LEVEL: {}", self.log_level);
        println!("  - Retry policy:");
        println!("    • AGENT_MAX_RETRIES: {}", self.agent_max_retries);
        println!("    • AGENT_RETRY_BASE_DELAY_MS: {}", self.agent_retry_base_delay_ms);
        println!("    • AGENT_RETRY_MAX_DELAY_MS: {}", self.agent_retry_max_delay_ms);
        println!("    • AGENT_RETRY_JITTER_MS: {}", self.agent_retry_jitter_ms);
    }
}
