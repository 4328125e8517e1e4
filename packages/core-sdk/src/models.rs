use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/** \brief Gemini TTS 输出的固定采样率（单声道 16-bit PCM）。 */
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/**
 * \brief 桌面助手角色，决定发给模型的语气指令。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Persona {
    Clippy,
    Bonzi,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Clippy => "Clippy",
            Persona::Bonzi => "Bonzi",
        }
    }

    /** \brief 大小写不敏感地解析角色名。 */
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clippy" => Some(Persona::Clippy),
            "bonzi" | "bonzibuddy" => Some(Persona::Bonzi),
            _ => None,
        }
    }
}

/**
 * \brief 网关请求，一次调用只允许一个变体。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentRequest {
    SearchQuery {
        text: String,
    },
    PeerLibrary {
        peer_id: String,
    },
    ChatPrompt {
        last_message: String,
    },
    AssistantPrompt {
        persona: Persona,
        user_text: String,
    },
    ForumTopic {
        topic: String,
    },
    SpeechRequest {
        text: String,
    },
}

/**
 * \brief 与 ContentRequest 对应的结果。
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentResponse {
    SearchResults { results: Vec<SearchResultItem> },
    Reply { reply: String },
    Thread { thread: ForumThread },
    Speech { audio: Option<SpeechAudio> },
}

/**
 * \brief 一条模拟的 P2P 搜索结果。字段名与模型 schema 一致。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    /** \brief 网关分配的唯一 ID，从不来自模型。 */
    pub id: String,
    pub filename: String,
    #[serde(rename = "size")]
    pub size_label: String,
    #[serde(rename = "type")]
    pub file_type: String,
    #[serde(rename = "bitrate")]
    pub bitrate_label: String,
    #[serde(rename = "speed")]
    pub speed_label: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /** \brief 1..=5 星。 */
    #[serde(rename = "quality")]
    pub quality_rating: u8,
}

pub type SearchResultSet = Vec<SearchResultItem>;

/**
 * \brief 论坛帖子。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumPost {
    pub user: String,
    pub rank: String,
    #[serde(rename = "avatarType")]
    pub avatar_type: String,
    pub content: String,
    pub signature: String,
}

/**
 * \brief 论坛主题：标题与有序帖子列表。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumThread {
    pub title: String,
    pub posts: Vec<ForumPost>,
}

/**
 * \brief 模型返回的语音数据：base64 编码的小端 16-bit PCM，单声道，24 kHz。
 * \details 只做透传与简单解码，不做重采样。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechAudio {
    /** \brief base64 PCM 数据 */
    pub data: String,
    /** \brief 模型声明的 MIME 类型（若有） */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl SpeechAudio {
    pub fn sample_rate(&self) -> u32 {
        SPEECH_SAMPLE_RATE
    }

    /**
     * \brief 解码为 i16 采样。末尾不足两字节的残余会被丢弃。
     */
    pub fn decode_samples(&self) -> Result<Vec<i16>, GatewayError> {
        let bytes = general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| GatewayError::MalformedResponse(format!("invalid base64 audio: {}", e)))?;
        Ok(bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }

    /** \brief 归一化到 [-1, 1) 的浮点采样，供播放端使用。 */
    pub fn decode_normalized(&self) -> Result<Vec<f32>, GatewayError> {
        Ok(self
            .decode_samples()?
            .into_iter()
            .map(|s| s as f32 / 32768.0)
            .collect())
    }

    pub fn duration_secs(&self) -> Result<f64, GatewayError> {
        let samples = self.decode_samples()?.len();
        Ok(samples as f64 / f64::from(SPEECH_SAMPLE_RATE))
    }
}
