use crate::error::ConfigurationError;
use crate::util;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

fn default_mongodb_uri() -> String {
    env::var("MONGODB_URI").unwrap_or("mongodb://localhost:27017".to_string())
}

fn default_mongodb_db() -> String {
    env::var("MONGODB_DB_NAME").unwrap_or("lessonplan".to_string())
}

fn default_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or("change_me_in_production".to_string())
}

fn default_jwt_expiry_hours() -> i64 {
    env::var("JWT_EXPIRY_HOURS")
        .ok()
        .and_then(|it| it.parse().ok())
        .unwrap_or(24)
}

fn default_session_expiry_days() -> i64 {
    env::var("SESSION_EXPIRY_DAYS")
        .ok()
        .and_then(|it| it.parse().ok())
        .unwrap_or(7)
}

fn default_llm_api_key() -> String {
    env::var("LLM_API_KEY").unwrap_or_default()
}

fn default_llm_base_url() -> String {
    env::var("LLM_BASE_URL").unwrap_or("https://api.openai.com/v1".to_string())
}

fn default_llm_model() -> String {
    env::var("LLM_MODEL").unwrap_or("gpt-4o".to_string())
}

fn default_oauth_session_url() -> String {
    env::var("OAUTH_SESSION_URL")
        .unwrap_or("https://demobackend.emergentagent.com/auth/v1/env/oauth/session-data".to_string())
}

fn default_allowed_origins() -> Vec<String> {
    env::var("CORS_ORIGINS")
        .map(|it| it.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or(vec![String::from("*")])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    file_path: PathBuf,

    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    #[serde(default = "default_mongodb_db")]
    pub mongodb_db: String,

    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiry_hours")]
    pub jwt_expiry_hours: i64,
    #[serde(default = "default_session_expiry_days")]
    pub session_expiry_days: i64,

    #[serde(default = "default_llm_api_key")]
    pub llm_api_key: String,
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    #[serde(default = "default_oauth_session_url")]
    pub oauth_session_url: String,

    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file_path: config_dir().join("settings.yml"),
            mongodb_uri: default_mongodb_uri(),
            mongodb_db: default_mongodb_db(),
            jwt_secret: default_jwt_secret(),
            jwt_expiry_hours: default_jwt_expiry_hours(),
            session_expiry_days: default_session_expiry_days(),
            llm_api_key: default_llm_api_key(),
            llm_base_url: default_llm_base_url(),
            llm_model: default_llm_model(),
            oauth_session_url: default_oauth_session_url(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[inline]
fn config_dir() -> PathBuf {
    PathBuf::from(env::var("CONFIG_DIR").unwrap_or("./config".to_string()))
}

impl Config {
    pub fn load() -> Result<Config, ConfigurationError> {
        let config_file = util::find_first_subpath(
            config_dir(),
            &["settings.yml", "settings.yaml"],
            Path::exists,
        )
        .ok_or_else(|| ConfigurationError::NotFound(config_dir()))?;

        let file = File::open(config_file)?;
        let config = serde_yaml::from_reader(BufReader::new(file))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigurationError> {
        let file = File::create(&self.file_path)?;
        let mut out = BufWriter::new(file);
        serde_yaml::to_writer(&mut out, self)?;
        out.flush()?;
        Ok(())
    }
}
