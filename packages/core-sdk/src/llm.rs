use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};

use crate::{config::GatewayConfig, error::GatewayError};

/**
 * \brief 期望的输出形态。
 */
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMode {
    /** \brief 自由文本 */
    Text,
    /** \brief application/json，按给定 schema 约束 */
    Json { schema: Value },
    /** \brief 音频模态，使用预置音色 */
    Audio { voice: String },
}

/**
 * \brief 发给 Provider 的一次生成请求。
 */
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub prompt: String,
    pub output: OutputMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: Option<String>,
    /** \brief base64 数据 */
    pub data: String,
}

/**
 * \brief 第一个候选结果的内容片段。
 */
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerateResponse {
    pub parts: Vec<ResponsePart>,
}

impl GenerateResponse {
    /** \brief 拼接全部文本片段。 */
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    /** \brief 第一个内联数据片段。 */
    pub fn first_inline_data(&self) -> Option<&InlineData> {
        self.parts.iter().find_map(|p| p.inline_data.as_ref())
    }
}

/**
 * \brief 生成内容服务的抽象；网关只依赖此接口。
 */
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError>;
}

/**
 * \brief Gemini generateContent 客户端。HTTP 连接池在进程内共享。
 */
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl GeminiProvider {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            normalize_gemini_base(&self.api_base),
            model
        )
    }
}

#[async_trait]
impl ContentProvider for GeminiProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GatewayError::MissingCredential)?;

        let resp = self
            .client
            .post(self.endpoint(&request.model))
            .query(&[("key", api_key)])
            .header(CONTENT_TYPE, "application/json")
            .json(&gemini_body(request))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Transport(format!(
                "gemini request failed: {} -> {}",
                status, text
            )));
        }
        let v: Value = resp.json().await?;
        parse_gemini_response(&v)
    }
}

/**
 * \brief 构造 generateContent 请求体。
 */
pub(crate) fn gemini_body(request: &GenerateRequest) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": request.prompt}]
        }],
    });
    if let Some(sys) = &request.system_instruction {
        body["systemInstruction"] = json!({
            "parts": [{"text": sys}]
        });
    }
    match &request.output {
        OutputMode::Text => {}
        OutputMode::Json { schema } => {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            });
        }
        OutputMode::Audio { voice } => {
            body["generationConfig"] = json!({
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": {
                            "voiceName": voice
                        }
                    }
                }
            });
        }
    }
    body
}

/**
 * \brief 解析 generateContent 响应，只取第一个候选。
 * \details 响应体内的 error 字段与缺失 candidates 分别映射为 Transport/EmptyResponse。
 */
pub(crate) fn parse_gemini_response(v: &Value) -> Result<GenerateResponse, GatewayError> {
    if let Some(err) = v.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown provider error");
        return Err(GatewayError::Transport(format!("gemini error: {}", message)));
    }
    let first = v
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .ok_or(GatewayError::EmptyResponse("no candidates"))?;

    let parts = first
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|arr| arr.iter().map(parse_part).collect())
        .unwrap_or_default();

    Ok(GenerateResponse { parts })
}

fn parse_part(p: &Value) -> ResponsePart {
    let text = p.get("text").and_then(|t| t.as_str()).map(|s| s.to_string());
    let inline_data = p.get("inlineData").and_then(|d| {
        let data = d.get("data").and_then(|x| x.as_str())?;
        Some(InlineData {
            mime_type: d
                .get("mimeType")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string()),
            data: data.to_string(),
        })
    });
    ResponsePart { text, inline_data }
}

fn normalize_gemini_base(api_base: &str) -> String {
    let trimmed = api_base.trim_end_matches('/');
    if trimmed.ends_with("/v1")
        || trimmed.ends_with("/v1beta")
        || trimmed.contains("/v1/")
        || trimmed.contains("/v1beta/")
    {
        trimmed.to_string()
    } else {
        format!("{}/v1beta", trimmed)
    }
}
