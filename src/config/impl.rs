use config::{Config, ConfigError, Environment, File};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use super::{AppConfig, FeatureConfig};

static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// 功能开关名称
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    BlackboardZipUpload,
    Rubrics,
    AutomaticLtiRole,
    Lti,
    IncrementalRubricSubmission,
    Register,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Feature::BlackboardZipUpload => "BLACKBOARD_ZIP_UPLOAD",
            Feature::Rubrics => "RUBRICS",
            Feature::AutomaticLtiRole => "AUTOMATIC_LTI_ROLE",
            Feature::Lti => "LTI",
            Feature::IncrementalRubricSubmission => "INCREMENTAL_RUBRIC_SUBMISSION",
            Feature::Register => "REGISTER",
        }
    }
}

impl FeatureConfig {
    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::BlackboardZipUpload => self.blackboard_zip_upload,
            Feature::Rubrics => self.rubrics,
            Feature::AutomaticLtiRole => self.automatic_lti_role,
            Feature::Lti => self.lti,
            Feature::IncrementalRubricSubmission => self.incremental_rubric_submission,
            Feature::Register => self.register,
        }
    }
}

impl AppConfig {
    /// 加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // 首先加载默认配置文件
            .add_source(File::with_name("config").required(false))
            // 然后根据环境加载特定配置文件
            .add_source(
                File::with_name(&format!(
                    "config.{}",
                    std::env::var("APP_ENV").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // 最后加载环境变量覆盖
            .add_source(
                Environment::with_prefix("CGSYSTEM")
                    .separator("__")
                    .try_parsing(true),
            );

        let env = |name: &str| std::env::var(name).ok();

        // 支持从环境变量加载
        builder = builder
            .set_override_option("app.environment", env("APP_ENV"))?
            .set_override_option("app.log_level", env("RUST_LOG"))?
            .set_override_option("app.debug", env("DEBUG"))?
            .set_override_option("app.external_url", env("EXTERNAL_URL"))?
            .set_override_option("app.default_role", env("DEFAULT_ROLE"))?
            .set_override_option("server.host", env("SERVER_HOST"))?
            .set_override_option("server.port", env("SERVER_PORT"))?
            .set_override_option("server.unix_socket_path", env("UNIX_SOCKET"))?
            .set_override_option("server.workers", env("CPU_COUNT"))?
            .set_override_option("jwt.secret", env("SECRET_KEY"))?
            .set_override_option("jwt.lti_secret", env("LTI_SECRET_KEY"))?
            .set_override_option("jwt.access_token_expiry", env("JWT_ACCESS_TOKEN_EXPIRES"))?
            .set_override_option("jwt.reset_token_time", env("RESET_TOKEN_TIME"))?
            .set_override_option("database.url", env("DATABASE_URL"))?
            .set_override_option("cache.redis.url", env("REDIS_URL"))?
            .set_override_option("upload.dir", env("UPLOAD_DIR"))?
            .set_override_option("upload.mirror_dir", env("MIRROR_UPLOAD_DIR"))?
            .set_override_option("upload.max_size", env("MAX_UPLOAD_SIZE"))?
            .set_override_option("mail.server", env("MAIL_SERVER"))?
            .set_override_option("mail.port", env("MAIL_PORT"))?
            .set_override_option("mail.use_tls", env("MAIL_USE_TLS"))?
            .set_override_option("mail.use_ssl", env("MAIL_USE_SSL"))?
            .set_override_option("mail.username", env("MAIL_USERNAME"))?
            .set_override_option("mail.password", env("MAIL_PASSWORD"))?
            .set_override_option("mail.default_sender", env("MAIL_DEFAULT_SENDER"))?
            .set_override_option("mail.max_emails", env("MAIL_MAX_EMAILS"))?;

        for (key, var) in [
            ("features.blackboard_zip_upload", "BLACKBOARD_ZIP_UPLOAD"),
            ("features.rubrics", "RUBRICS"),
            ("features.automatic_lti_role", "AUTOMATIC_LTI_ROLE"),
            ("features.lti", "LTI"),
            (
                "features.incremental_rubric_submission",
                "INCREMENTAL_RUBRIC_SUBMISSION",
            ),
            ("features.register", "REGISTER"),
        ] {
            builder = builder.set_override_option(key, env(&format!("FEATURE_{var}")))?;
        }

        let config = builder.build()?;
        let mut app_config: AppConfig = config.try_deserialize()?;

        // LTI 密钥表以 JSON 形式给出
        if let Some(raw) = env("LTI_CONSUMER_KEY_SECRETS") {
            app_config.lti.consumer_key_secrets = serde_json::from_str::<HashMap<String, String>>(
                &raw,
            )
            .map_err(|e| ConfigError::Message(format!("LTI_CONSUMER_KEY_SECRETS 解析失败: {e}")))?;
        }

        // 处理工作线程数
        if app_config.server.workers == 0 {
            app_config.server.workers = num_cpus::get().min(app_config.server.max_workers);
        }

        if app_config.worker.linter_concurrency == 0 {
            app_config.worker.linter_concurrency = 1;
        }

        Ok(app_config)
    }

    /// 获取全局配置实例
    pub fn get() -> &'static AppConfig {
        APP_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                eprintln!("Failed to load configuration: {e}");
                std::process::exit(1);
            })
        })
    }

    /// 初始化配置 (在应用启动时调用)
    pub fn init() -> Result<(), ConfigError> {
        let config = Self::load()?;
        APP_CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("Configuration already initialized".to_string()))?;
        Ok(())
    }

    /// 检查上传目录与中转目录是否存在
    pub fn check_directories(&self) -> Result<(), ConfigError> {
        for (label, dir) in [
            ("UPLOAD_DIR", &self.upload.dir),
            ("MIRROR_UPLOAD_DIR", &self.upload.mirror_dir),
        ] {
            if !Path::new(dir).is_dir() {
                return Err(ConfigError::Message(format!(
                    "{label} ({dir}) does not exist or is not a directory"
                )));
            }
        }
        Ok(())
    }

    /// 检查是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }

    /// 检查是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app.environment == "development"
    }

    /// 功能开关
    pub fn feature_enabled(&self, feature: Feature) -> bool {
        self.features.is_enabled(feature)
    }

    /// 是否配置了邮件服务器
    pub fn mail_enabled(&self) -> bool {
        !self.mail.server.is_empty()
    }

    /// 获取服务器绑定地址
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 获取 Unix 套接字路径 (如果配置了)
    #[cfg(unix)]
    pub fn unix_socket_path(&self) -> Option<&str> {
        if self.server.unix_socket_path.is_empty() {
            None
        } else {
            Some(&self.server.unix_socket_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.upload.max_size, 64 * 1024 * 1024);
        assert_eq!(config.upload.mirror_ttl, 60);
        assert_eq!(config.app.default_role, "Student");
        assert_eq!(config.mail.max_emails, 100);
        assert!(config.feature_enabled(Feature::Rubrics));
    }

    #[test]
    fn test_check_directories() {
        let upload = tempfile::tempdir().unwrap();
        let mirror = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.upload.dir = upload.path().to_string_lossy().into_owned();
        config.upload.mirror_dir = mirror.path().to_string_lossy().into_owned();
        assert!(config.check_directories().is_ok());

        config.upload.mirror_dir = mirror.path().join("missing").to_string_lossy().into_owned();
        assert!(config.check_directories().is_err());
    }

    #[test]
    fn test_feature_toggle() {
        let mut config = AppConfig::default();
        config.features.blackboard_zip_upload = false;
        assert!(!config.feature_enabled(Feature::BlackboardZipUpload));
        assert_eq!(Feature::BlackboardZipUpload.name(), "BLACKBOARD_ZIP_UPLOAD");
    }
}
