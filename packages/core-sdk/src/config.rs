use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Kore";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/** \brief 凭据环境变量，按顺序查找。 */
const API_KEY_VARS: [&str; 3] = ["RETRODESK_API_KEY", "GEMINI_API_KEY", "API_KEY"];

/**
 * \brief 网关配置，进程启动时构造一次。
 */
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /** \brief API 基地址 */
    pub api_base: String,
    /** \brief API Key；缺失时所有调用直接走回退 */
    pub api_key: Option<String>,
    /** \brief 文本/结构化生成模型 */
    pub model: String,
    /** \brief 语音生成模型 */
    pub tts_model: String,
    /** \brief 预置音色 */
    pub voice: String,
    /** \brief 单次调用超时 */
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GatewayConfig {
    /**
     * \brief 从环境变量读取配置，未设置的项使用默认值。
     */
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();
        cfg.api_key = API_KEY_VARS.iter().find_map(|k| non_empty(*k));
        if let Some(base) = non_empty("RETRODESK_API_BASE") {
            cfg.api_base = base;
        }
        if let Some(model) = non_empty("RETRODESK_MODEL") {
            cfg.model = model;
        }
        if let Some(model) = non_empty("RETRODESK_TTS_MODEL") {
            cfg.tts_model = model;
        }
        if let Some(voice) = non_empty("RETRODESK_VOICE") {
            cfg.voice = voice;
        }
        if let Some(secs) = non_empty("RETRODESK_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
        {
            cfg.timeout = Duration::from_secs(secs);
        }
        cfg
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/** \brief 读取 RETRODESK_TELEMETRY 开关（1/true/on）。 */
pub fn telemetry_from_env() -> bool {
    std::env::var("RETRODESK_TELEMETRY")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes"))
        .unwrap_or(false)
}
