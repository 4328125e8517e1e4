use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use retrodesk_core_sdk::{
    config::{telemetry_from_env, GatewayConfig},
    models::{Persona, SpeechAudio},
    server, telemetry, ContentGateway,
};

/**
 * \brief CLI 程序入口：逐个调用内容网关，或启动本地服务。
 */
#[derive(Parser, Debug)]
#[command(name = "retrodesk", version, about = "RetroDesk generated-content gateway")]
struct Cli {
    /** \brief API Key，未提供时读取 RETRODESK_API_KEY / GEMINI_API_KEY / API_KEY */
    #[arg(long, global = true)]
    api_key: Option<String>,
    #[arg(long, global = true)]
    api_base: Option<String>,
    #[arg(long, global = true)]
    model: Option<String>,
    #[arg(long, global = true)]
    tts_model: Option<String>,
    /** \brief 单次调用超时（秒），必须大于 0 */
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
    /** \brief 写入 logs/retrodesk.log */
    #[arg(long, global = true, default_value_t = false)]
    telemetry: bool,
    /** \brief 日志目录，覆盖 RETRODESK_LOG_DIR */
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /** \brief 模拟 P2P 搜索。 */
    Search { query: String },

    /** \brief 浏览某个节点的共享文件。 */
    Peer { peer_id: String },

    /** \brief 聊天室陌生人的回复。 */
    Chat { message: String },

    /**
     * \brief 桌面助手回复。
     * \param persona clippy 或 bonzi
     */
    Assistant { persona: String, text: String },

    /** \brief 生成论坛主题。 */
    Forum { topic: String },

    /** \brief 语音合成，可选写出 WAV 文件。 */
    Speak {
        text: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /** \brief 启动本地 HTTP 服务并提供前端页面。 */
    Serve {
        #[arg(long, default_value = "127.0.0.1:5173")]
        addr: String,
    },
}

impl Cli {
    /** \brief 命令行参数覆盖环境变量。 */
    fn gateway_config(&self) -> GatewayConfig {
        let mut cfg = GatewayConfig::from_env();
        if let Some(key) = &self.api_key {
            cfg.api_key = Some(key.clone());
        }
        if let Some(base) = &self.api_base {
            cfg.api_base = base.clone();
        }
        if let Some(model) = &self.model {
            cfg.model = model.clone();
        }
        if let Some(model) = &self.tts_model {
            cfg.tts_model = model.clone();
        }
        if let Some(secs) = self.timeout_secs {
            cfg.timeout = Duration::from_secs(secs);
        }
        cfg
    }

    fn apply_telemetry(&self) {
        telemetry::set_enabled(self.telemetry || telemetry_from_env());
        if let Some(dir) = &self.log_dir {
            telemetry::set_log_dir(dir.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.apply_telemetry();

    let config = cli.gateway_config();
    if !config.has_credential() && !matches!(cli.command, Commands::Serve { .. }) {
        eprintln!("warning: no API key configured, output is fallback content");
    }
    let gateway =
        Arc::new(ContentGateway::from_config(&config).context("build content gateway failed")?);

    match cli.command {
        Commands::Serve { addr } => {
            server::run(&addr, gateway, config.has_credential()).await?;
        }
        Commands::Search { query } => {
            print_json(&gateway.fetch_search_results(&query).await)?;
        }
        Commands::Peer { peer_id } => {
            print_json(&gateway.fetch_peer_library(&peer_id).await)?;
        }
        Commands::Chat { message } => {
            println!("{}", gateway.fetch_chat_reply(&message).await);
        }
        Commands::Assistant { persona, text } => {
            let persona = Persona::parse(&persona)
                .ok_or_else(|| anyhow!("unknown persona '{}', expected clippy or bonzi", persona))?;
            println!("{}", gateway.fetch_assistant_reply(persona, &text).await);
        }
        Commands::Forum { topic } => {
            print_json(&gateway.fetch_forum_thread(&topic).await)?;
        }
        Commands::Speak { text, out } => match gateway.fetch_speech_audio(&text).await {
            Some(audio) => {
                let secs = audio.duration_secs().context("decode speech audio failed")?;
                match out {
                    Some(path) => {
                        write_wav(&path, &audio)?;
                        println!("Wrote {:.1}s of audio to {}", secs, path.display());
                    }
                    None => println!("Received {:.1}s of audio (use --out to save)", secs),
                }
            }
            None => println!("No audio available"),
        },
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/**
 * \brief 把 24 kHz / 16-bit / 单声道 PCM 写成 WAV。
 */
fn write_wav(path: &Path, audio: &SpeechAudio) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let samples = audio.decode_samples()?;
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("create {} failed", path.display()))?;
    for s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(())
}
