use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    routing::{get, get_service, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use crate::{
    gateway::ContentGateway,
    models::{ContentRequest, ContentResponse, ForumThread, Persona, SearchResultItem, SpeechAudio},
    telemetry,
};

/**
 * \brief 路由共享状态：网关只构造一次。
 */
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<ContentGateway>,
    has_credential: bool,
}

impl AppState {
    pub fn new(gateway: Arc<ContentGateway>, has_credential: bool) -> Self {
        Self {
            gateway,
            has_credential,
        }
    }
}

/**
 * \brief 启动本地 HTTP 服务，提供静态前端与内容 API。
 * \param addr 监听地址，如 "127.0.0.1:5173"
 * \param gateway 进程内唯一的内容网关
 */
pub async fn run(addr: &str, gateway: Arc<ContentGateway>, has_credential: bool) -> Result<()> {
    let state = AppState::new(gateway, has_credential);

    let ui_root =
        std::env::var("RETRODESK_UI_DIR").unwrap_or_else(|_| "packages/ui/dist".to_string());
    let fallback_root =
        std::env::var("RETRODESK_UI_FALLBACK").unwrap_or_else(|_| "web".to_string());

    let static_handler = if std::path::Path::new(&ui_root).exists() {
        ServeDir::new(ui_root)
    } else {
        ServeDir::new(fallback_root)
    }
    .append_index_html_on_directories(true);

    let app = api_router(state).fallback_service(get_service(static_handler));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if !has_credential {
        println!("No API key configured, every request will use fallback content");
    }
    println!("Server listening on http://{}", addr);
    telemetry::log_event("server", &format!("listening addr={}", addr));
    axum::serve(listener, app).await?;
    Ok(())
}

/**
 * \brief 仅包含 /api 路由，便于单独测试。
 */
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", post(search))
        .route("/api/peers/library", post(peer_library))
        .route("/api/chat", post(chat))
        .route("/api/assistant", post(assistant))
        .route("/api/forum", post(forum))
        .route("/api/speech", post(speech))
        .route("/api/content", post(content))
        .route("/api/health", get(health))
        .with_state(state)
}

#[derive(Deserialize, Debug)]
struct SearchBody {
    /** \brief 搜索关键字，允许为空 */
    #[serde(default)]
    query: String,
}

#[derive(Deserialize, Debug)]
struct PeerBody {
    peer_id: String,
}

#[derive(Deserialize, Debug)]
struct ChatBody {
    /** \brief 用户最后一条消息 */
    message: String,
}

#[derive(Deserialize, Debug)]
struct AssistantBody {
    persona: Persona,
    text: String,
}

#[derive(Deserialize, Debug)]
struct ForumBody {
    topic: String,
}

#[derive(Deserialize, Debug)]
struct SpeechBody {
    text: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SearchResponse {
    results: Vec<SearchResultItem>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ReplyResponse {
    reply: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SpeechResponse {
    /** \brief 无音频时为 null */
    audio: Option<SpeechAudio>,
}

#[derive(Serialize, Debug)]
struct HealthResponse {
    ok: bool,
    model: String,
    tts_model: String,
    credential: bool,
}

/**
 * \brief POST /api/search
 */
async fn search(State(state): State<AppState>, Json(body): Json<SearchBody>) -> Json<SearchResponse> {
    let results = state.gateway.fetch_search_results(&body.query).await;
    Json(SearchResponse { results })
}

/**
 * \brief POST /api/peers/library：浏览节点共享目录。
 */
async fn peer_library(
    State(state): State<AppState>,
    Json(body): Json<PeerBody>,
) -> Json<SearchResponse> {
    let results = state.gateway.fetch_peer_library(&body.peer_id).await;
    Json(SearchResponse { results })
}

async fn chat(State(state): State<AppState>, Json(body): Json<ChatBody>) -> Json<ReplyResponse> {
    let reply = state.gateway.fetch_chat_reply(&body.message).await;
    Json(ReplyResponse { reply })
}

async fn assistant(
    State(state): State<AppState>,
    Json(body): Json<AssistantBody>,
) -> Json<ReplyResponse> {
    let reply = state
        .gateway
        .fetch_assistant_reply(body.persona, &body.text)
        .await;
    Json(ReplyResponse { reply })
}

async fn forum(State(state): State<AppState>, Json(body): Json<ForumBody>) -> Json<ForumThread> {
    Json(state.gateway.fetch_forum_thread(&body.topic).await)
}

async fn speech(State(state): State<AppState>, Json(body): Json<SpeechBody>) -> Json<SpeechResponse> {
    let audio = state.gateway.fetch_speech_audio(&body.text).await;
    Json(SpeechResponse { audio })
}

/**
 * \brief POST /api/content：按 kind 分发的统一入口。
 */
async fn content(
    State(state): State<AppState>,
    Json(request): Json<ContentRequest>,
) -> Json<ContentResponse> {
    Json(state.gateway.handle(request).await)
}

/**
 * \brief 健康检查：只报告配置，不消耗模型调用。
 */
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        model: state.gateway.model().to_string(),
        tts_model: state.gateway.tts_model().to_string(),
        credential: state.has_credential,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::gateway::{fallback_forum_thread, fallback_search_results};

    /** \brief 未配置凭据的网关：所有调用即时回退。 */
    fn offline_state() -> AppState {
        let gateway = ContentGateway::from_config(&GatewayConfig::default()).expect("gateway");
        AppState::new(Arc::new(gateway), false)
    }

    #[tokio::test]
    async fn test_search_route_returns_fallback_offline() {
        let Json(resp) = search(
            State(offline_state()),
            Json(SearchBody {
                query: "numb".to_string(),
            }),
        )
        .await;
        assert_eq!(resp.results, fallback_search_results());
    }

    #[tokio::test]
    async fn test_reply_routes_offline() {
        let state = offline_state();
        let Json(resp) = chat(
            State(state.clone()),
            Json(ChatBody {
                message: "hi".to_string(),
            }),
        )
        .await;
        assert_eq!(resp.reply, "brb mom calling");

        let Json(resp) = assistant(
            State(state),
            Json(AssistantBody {
                persona: Persona::Clippy,
                text: "hi".to_string(),
            }),
        )
        .await;
        assert_eq!(resp.reply, "It looks like you're having internet trouble!");
    }

    #[tokio::test]
    async fn test_forum_and_speech_routes_offline() {
        let state = offline_state();
        let Json(thread) = forum(
            State(state.clone()),
            Json(ForumBody {
                topic: "Morpheus vs Kazaa".to_string(),
            }),
        )
        .await;
        assert_eq!(thread, fallback_forum_thread("Morpheus vs Kazaa"));

        let Json(resp) = speech(
            State(state),
            Json(SpeechBody {
                text: "hi".to_string(),
            }),
        )
        .await;
        let v = serde_json::to_value(&resp).expect("serialize");
        assert!(v["audio"].is_null());
    }

    #[tokio::test]
    async fn test_content_route_dispatch() {
        let request: ContentRequest =
            serde_json::from_str(r#"{"kind":"peer_library","peer_id":"10.0.0.7"}"#)
                .expect("parse request");
        let Json(resp) = content(State(offline_state()), Json(request)).await;
        assert_eq!(
            resp,
            ContentResponse::SearchResults {
                results: fallback_search_results()
            }
        );
    }

    #[tokio::test]
    async fn test_health_reports_config() {
        let Json(resp) = health(State(offline_state())).await;
        assert!(resp.ok);
        assert!(!resp.credential);
        assert_eq!(resp.model, "gemini-3-flash-preview");
    }

    #[test]
    fn test_search_body_query_defaults_empty() {
        let body: SearchBody = serde_json::from_str("{}").expect("parse");
        assert_eq!(body.query, "");
    }
}
