use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub argon2: Argon2Config,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub cors: CorsConfig,
    pub upload: UploadConfig,
    pub lti: LtiConfig,
    pub mail: MailConfig,
    pub features: FeatureConfig,
    pub worker: WorkerConfig,
}

/// 应用设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub system_name: String,
    pub environment: String,
    pub log_level: String,
    pub debug: bool,
    pub external_url: String,
    pub default_role: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            system_name: "CodeGrade".into(),
            environment: "development".into(),
            log_level: "info".into(),
            debug: false,
            external_url: "http://localhost:8080".into(),
            default_role: "Student".into(),
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub unix_socket_path: String,
    pub workers: usize,
    pub max_workers: usize,
    pub timeouts: TimeoutConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            unix_socket_path: String::new(),
            workers: 0,
            max_workers: 16,
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// 超时配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub client_request: u64,
    pub client_disconnect: u64,
    pub keep_alive: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            client_request: 30_000,
            client_disconnect: 5_000,
            keep_alive: 30,
        }
    }
}

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    #[serde(skip_serializing)] // 不序列化到JSON响应中
    pub secret: String,
    #[serde(skip_serializing)]
    pub lti_secret: String,
    /// Access Token 有效期（分钟）
    pub access_token_expiry: i64,
    /// LTI 启动令牌有效期（秒）
    pub lti_launch_expiry: i64,
    /// 重置令牌有效期（秒）
    pub reset_token_time: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me".into(),
            lti_secret: "change-me-too".into(),
            access_token_expiry: 30 * 24 * 60,
            lti_launch_expiry: 60,
            reset_token_time: 86_400,
        }
    }
}

/// Argon2 参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2Config {
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost: 19_456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,    // 数据库连接 URL（从 scheme 自动推断类型）
    pub pool_size: u32, // 连接池大小
    pub timeout: u64,   // 连接超时 (秒)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "cgsystem.db".into(),
            pool_size: 8,
            timeout: 10,
        }
    }
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(rename = "type")]
    pub cache_type: String,
    pub default_ttl: u64,
    pub redis: RedisConfig,
    pub memory: MemoryConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: "moka".into(),
            default_ttl: 300,
            redis: RedisConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1/".into(),
            key_prefix: "cgsystem:".into(),
        }
    }
}

/// 内存缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_capacity: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub max_age: usize,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self { max_age: 86_400 }
    }
}

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub dir: String,        // 提交文件存放目录
    pub mirror_dir: String, // 临时中转目录
    pub max_size: usize,    // 单次上传最大字节数
    pub mirror_ttl: u64,    // 中转文件存活时间（秒）
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".into(),
            mirror_dir: "mirror_uploads".into(),
            max_size: 64 * 1024 * 1024,
            mirror_ttl: 60,
        }
    }
}

/// LTI 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LtiConfig {
    /// consumer key -> shared secret
    #[serde(skip_serializing)]
    pub consumer_key_secrets: HashMap<String, String>,
}

/// 邮件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub use_ssl: bool,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub default_sender: String,
    pub max_emails: usize,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: 25,
            use_tls: false,
            use_ssl: false,
            username: String::new(),
            password: String::new(),
            default_sender: "noreply@localhost".into(),
            max_emails: 100,
        }
    }
}

/// 功能开关
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub blackboard_zip_upload: bool,
    pub rubrics: bool,
    pub automatic_lti_role: bool,
    pub lti: bool,
    pub incremental_rubric_submission: bool,
    pub register: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            blackboard_zip_upload: true,
            rubrics: true,
            automatic_lti_role: true,
            lti: true,
            incremental_rubric_submission: true,
            register: true,
        }
    }
}

/// 后台任务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// 同时运行的 linter 实例数
    pub linter_concurrency: usize,
    /// 单个 linter 子进程超时（秒）
    pub linter_timeout: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            linter_concurrency: 4,
            linter_timeout: 600,
        }
    }
}
