use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    config::GatewayConfig,
    error::GatewayError,
    llm::{ContentProvider, GeminiProvider, GenerateRequest, GenerateResponse, OutputMode},
    models::{
        ContentRequest, ContentResponse, ForumPost, ForumThread, Persona, SearchResultItem,
        SearchResultSet, SpeechAudio,
    },
    prompts, telemetry,
};

pub const CHAT_FALLBACK: &str = "brb mom calling";
pub const CHAT_EMPTY_REPLY: &str = "lol wut";
pub const ASSISTANT_EMPTY_REPLY: &str = "I am here to help!";

/**
 * \brief 生成内容网关。
 * \details 五个操作都是全函数：Provider 的任何失败都会被记录并替换为固定回退值，
 *          调用方永远拿不到错误。
 */
pub struct ContentGateway {
    provider: Arc<dyn ContentProvider>,
    model: String,
    tts_model: String,
    voice: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl ContentGateway {
    /**
     * \brief 以注入的 Provider 构造网关。
     */
    pub fn new(provider: Arc<dyn ContentProvider>, config: &GatewayConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            tts_model: config.tts_model.clone(),
            voice: config.voice.clone(),
            timeout: config.timeout,
            next_id: AtomicU64::new(0),
        }
    }

    /**
     * \brief 使用 Gemini Provider 构造网关。
     */
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let provider = GeminiProvider::new(config)?;
        Ok(Self::new(Arc::new(provider), config))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tts_model(&self) -> &str {
        &self.tts_model
    }

    /**
     * \brief 按请求变体分发。
     */
    pub async fn handle(&self, request: ContentRequest) -> ContentResponse {
        match request {
            ContentRequest::SearchQuery { text } => ContentResponse::SearchResults {
                results: self.fetch_search_results(&text).await,
            },
            ContentRequest::PeerLibrary { peer_id } => ContentResponse::SearchResults {
                results: self.fetch_peer_library(&peer_id).await,
            },
            ContentRequest::ChatPrompt { last_message } => ContentResponse::Reply {
                reply: self.fetch_chat_reply(&last_message).await,
            },
            ContentRequest::AssistantPrompt { persona, user_text } => ContentResponse::Reply {
                reply: self.fetch_assistant_reply(persona, &user_text).await,
            },
            ContentRequest::ForumTopic { topic } => ContentResponse::Thread {
                thread: self.fetch_forum_thread(&topic).await,
            },
            ContentRequest::SpeechRequest { text } => ContentResponse::Speech {
                audio: self.fetch_speech_audio(&text).await,
            },
        }
    }

    /**
     * \brief 模拟 P2P 搜索。失败时返回两条固定结果。
     */
    pub async fn fetch_search_results(&self, query: &str) -> SearchResultSet {
        self.search_or_fallback("gateway.search", query).await
    }

    /**
     * \brief 浏览某个节点的共享目录，本质是一次搜索。
     */
    pub async fn fetch_peer_library(&self, peer_id: &str) -> SearchResultSet {
        self.search_or_fallback("gateway.peer", &prompts::peer_library_query(peer_id))
            .await
    }

    pub async fn fetch_chat_reply(&self, last_message: &str) -> String {
        let request = GenerateRequest {
            model: self.model.clone(),
            system_instruction: None,
            prompt: prompts::chat_prompt(last_message),
            output: OutputMode::Text,
        };
        match self.call(request).await {
            Ok(resp) => {
                telemetry::log_event("gateway.chat", "reply ok");
                reply_or(&resp, CHAT_EMPTY_REPLY)
            }
            Err(e) => {
                log_fallback("gateway.chat", &e);
                CHAT_FALLBACK.to_string()
            }
        }
    }

    pub async fn fetch_assistant_reply(&self, persona: Persona, user_text: &str) -> String {
        let request = GenerateRequest {
            model: self.model.clone(),
            system_instruction: Some(prompts::assistant_system(persona)),
            prompt: prompts::assistant_prompt(user_text),
            output: OutputMode::Text,
        };
        match self.call(request).await {
            Ok(resp) => {
                telemetry::log_event(
                    "gateway.assistant",
                    &format!("persona={} reply ok", persona.as_str()),
                );
                reply_or(&resp, ASSISTANT_EMPTY_REPLY)
            }
            Err(e) => {
                log_fallback("gateway.assistant", &e);
                assistant_fallback(persona).to_string()
            }
        }
    }

    /**
     * \brief 生成论坛主题。失败或结构不符时返回只有管理员帖子的主题。
     */
    pub async fn fetch_forum_thread(&self, topic: &str) -> ForumThread {
        match self.try_forum_thread(topic).await {
            Ok(thread) => {
                telemetry::log_event(
                    "gateway.forum",
                    &format!("thread ok posts={}", thread.posts.len()),
                );
                thread
            }
            Err(e) => {
                log_fallback("gateway.forum", &e);
                fallback_forum_thread(topic)
            }
        }
    }

    /**
     * \brief 语音合成。没有可用音频时返回 None。
     */
    pub async fn fetch_speech_audio(&self, text: &str) -> Option<SpeechAudio> {
        match self.try_speech(text).await {
            Ok(audio) => {
                telemetry::log_event(
                    "gateway.speech",
                    &format!("audio ok b64_len={}", audio.data.len()),
                );
                Some(audio)
            }
            Err(e) => {
                log_fallback("gateway.speech", &e);
                None
            }
        }
    }

    async fn search_or_fallback(&self, category: &str, query: &str) -> SearchResultSet {
        match self.try_search(query).await {
            Ok(results) => {
                telemetry::log_event(category, &format!("results={}", results.len()));
                results
            }
            Err(e) => {
                log_fallback(category, &e);
                fallback_search_results()
            }
        }
    }

    async fn try_search(&self, query: &str) -> Result<SearchResultSet, GatewayError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            system_instruction: Some(prompts::SEARCH_SYSTEM.to_string()),
            prompt: prompts::search_prompt(query),
            output: OutputMode::Json {
                schema: prompts::search_result_schema(),
            },
        };
        let resp = self.call(request).await?;
        let stamp = unix_millis();
        parse_search_results(&resp.text(), |_| {
            format!("res-{}-{}", stamp, self.next_id.fetch_add(1, Ordering::Relaxed))
        })
    }

    async fn try_forum_thread(&self, topic: &str) -> Result<ForumThread, GatewayError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            system_instruction: Some(prompts::FORUM_SYSTEM.to_string()),
            prompt: prompts::forum_prompt(topic),
            output: OutputMode::Json {
                schema: prompts::forum_thread_schema(),
            },
        };
        let resp = self.call(request).await?;
        parse_forum_thread(&resp.text())
    }

    async fn try_speech(&self, text: &str) -> Result<SpeechAudio, GatewayError> {
        let request = GenerateRequest {
            model: self.tts_model.clone(),
            system_instruction: None,
            prompt: text.to_string(),
            output: OutputMode::Audio {
                voice: self.voice.clone(),
            },
        };
        let resp = self.call(request).await?;
        let inline = resp
            .first_inline_data()
            .ok_or(GatewayError::EmptyResponse("no inline audio part"))?;
        if inline.data.trim().is_empty() {
            return Err(GatewayError::EmptyResponse("inline audio part is empty"));
        }
        let audio = SpeechAudio {
            data: inline.data.clone(),
            mime_type: inline.mime_type.clone(),
        };
        // 解码失败即 MalformedResponse；解不出完整采样视为空
        if audio.decode_samples()?.is_empty() {
            return Err(GatewayError::EmptyResponse("inline audio has no samples"));
        }
        Ok(audio)
    }

    async fn call(&self, request: GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        match tokio::time::timeout(self.timeout, self.provider.generate(&request)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        }
    }
}

#[derive(Deserialize)]
struct RawSearchPayload {
    results: Vec<RawSearchItem>,
}

#[derive(Deserialize)]
struct RawSearchItem {
    filename: String,
    size: String,
    #[serde(rename = "type")]
    file_type: String,
    bitrate: String,
    speed: String,
    artist: String,
    #[serde(default)]
    album: Option<String>,
    quality: i64,
}

/**
 * \brief 解析搜索结果并分配 ID。
 * \details 空文本视为零条结果；评分超出 1..=5 整体视为 MalformedResponse。
 */
pub(crate) fn parse_search_results<F>(text: &str, mut next_id: F) -> Result<SearchResultSet, GatewayError>
where
    F: FnMut(usize) -> String,
{
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let payload: RawSearchPayload = serde_json::from_str(text)?;
    payload
        .results
        .into_iter()
        .enumerate()
        .map(|(index, raw)| -> Result<SearchResultItem, GatewayError> {
            let quality_rating = u8::try_from(raw.quality)
                .ok()
                .filter(|q| (1..=5).contains(q))
                .ok_or_else(|| {
                    GatewayError::MalformedResponse(format!(
                        "quality {} out of range for {}",
                        raw.quality, raw.filename
                    ))
                })?;
            Ok(SearchResultItem {
                id: next_id(index),
                filename: raw.filename,
                size_label: raw.size,
                file_type: raw.file_type,
                bitrate_label: raw.bitrate,
                speed_label: raw.speed,
                artist: raw.artist,
                album: raw.album,
                quality_rating,
            })
        })
        .collect()
}

pub(crate) fn parse_forum_thread(text: &str) -> Result<ForumThread, GatewayError> {
    if text.trim().is_empty() {
        return Err(GatewayError::EmptyResponse("forum thread body is empty"));
    }
    Ok(serde_json::from_str(text)?)
}

fn reply_or(resp: &GenerateResponse, empty: &str) -> String {
    let text = resp.text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        empty.to_string()
    } else {
        trimmed.to_string()
    }
}

fn log_fallback(category: &str, e: &GatewayError) {
    telemetry::log_error(category, &format!("fallback kind={} error={}", e.kind(), e));
}

fn unix_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

/**
 * \brief 搜索失败时的两条固定结果。
 */
pub fn fallback_search_results() -> SearchResultSet {
    vec![
        SearchResultItem {
            id: "fallback-1".to_string(),
            filename: "Linkin_Park_Numb.mp3".to_string(),
            size_label: "3.4 MB".to_string(),
            file_type: "mp3".to_string(),
            bitrate_label: "128kbps".to_string(),
            speed_label: "T3".to_string(),
            artist: "Linkin Park".to_string(),
            album: Some("Meteora".to_string()),
            quality_rating: 5,
        },
        SearchResultItem {
            id: "fallback-2".to_string(),
            filename: "funny_cats_compilation.wmv".to_string(),
            size_label: "12.1 MB".to_string(),
            file_type: "wmv".to_string(),
            bitrate_label: "-".to_string(),
            speed_label: "Cable".to_string(),
            artist: "Unknown".to_string(),
            album: Some("-".to_string()),
            quality_rating: 3,
        },
    ]
}

pub fn assistant_fallback(persona: Persona) -> &'static str {
    match persona {
        Persona::Clippy => "It looks like you're having internet trouble!",
        Persona::Bonzi => "I cannot reach the banana server!",
    }
}

pub fn fallback_forum_thread(topic: &str) -> ForumThread {
    ForumThread {
        title: topic.to_string(),
        posts: vec![ForumPost {
            user: "Admin".to_string(),
            rank: "Administrator".to_string(),
            avatar_type: "Standard XP Logo".to_string(),
            content: "Welcome to the thread. Please keep it civil.".to_string(),
            signature: "Sent from my computer.".to_string(),
        }],
    }
}
