use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub analysis_base_url: String,
    pub default_price_per_kb: f64,
    pub media_root: String,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        let analysis_base_url = env::var("ANALYSIS_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let default_price_per_kb = env::var("DEFAULT_PRICE_PER_KB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1.0);
        let media_root = env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Self {
            database_url,
            jwt_secret,
            analysis_base_url,
            default_price_per_kb,
            media_root,
            bind_addr,
        }
    }
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}
