use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub participation: ParticipationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipationConfig {
    /// 完成活动所需的瓦片互动次数
    #[serde(default = "default_required_tile_count")]
    pub required_tile_count: i64,
}

impl Default for ParticipationConfig {
    fn default() -> Self {
        Self {
            required_tile_count: default_required_tile_count(),
        }
    }
}

fn default_required_tile_count() -> i64 {
    3
}

impl Config {
    pub fn from_toml() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                toml::from_str(&config_str)
                    .with_context(|| format!("failed to parse config file {config_path}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Config {
                server: ServerConfig {
                    host: "0.0.0.0".to_string(),
                    port: 8080,
                },
                database: DatabaseConfig {
                    url: String::new(),
                    max_connections: 10,
                },
                participation: ParticipationConfig::default(),
            },
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read config file {config_path}"));
            }
        };

        // 环境变量覆盖
        if let Ok(host) = env::var("SERVER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("SERVER_PORT") {
            config.server.port = port.parse().context("SERVER_PORT must be a port number")?;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(max) = env::var("DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections = max
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?;
        }
        if let Ok(count) = env::var("REQUIRED_TILE_COUNT") {
            config.participation.required_tile_count = count
                .parse()
                .context("REQUIRED_TILE_COUNT must be a number")?;
        }

        if config.database.url.is_empty() {
            anyhow::bail!("database url is not configured (config file or DATABASE_URL)");
        }

        Ok(config)
    }
}
