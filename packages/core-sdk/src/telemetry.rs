use std::{fs::OpenOptions, io::Write, path::PathBuf, sync::RwLock};

use anyhow::Result;
use once_cell::sync::Lazy;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

const LOG_FILE: &str = "retrodesk.log";

struct TelemetryState {
    enabled: bool,
    log_dir: PathBuf,
}

static TELEMETRY: Lazy<RwLock<TelemetryState>> = Lazy::new(|| {
    let log_dir = std::env::var("RETRODESK_LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    RwLock::new(TelemetryState {
        enabled: false,
        log_dir: PathBuf::from(log_dir),
    })
});

/**
 * \brief 更新诊断日志开关。
 */
pub fn set_enabled(enabled: bool) {
    if let Ok(mut guard) = TELEMETRY.write() {
        guard.enabled = enabled;
    }
}

pub fn is_enabled() -> bool {
    TELEMETRY.read().map(|g| g.enabled).unwrap_or(false)
}

/**
 * \brief 修改日志目录（默认 logs/，或 RETRODESK_LOG_DIR）。
 */
pub fn set_log_dir(dir: impl Into<PathBuf>) {
    if let Ok(mut guard) = TELEMETRY.write() {
        guard.log_dir = dir.into();
    }
}

pub fn log_path() -> PathBuf {
    TELEMETRY
        .read()
        .map(|g| g.log_dir.join(LOG_FILE))
        .unwrap_or_else(|_| PathBuf::from("logs").join(LOG_FILE))
}

/**
 * \brief 记录常规事件。
 */
pub fn log_event(category: &str, message: &str) {
    if !is_enabled() {
        return;
    }
    if let Err(err) = write_line("INFO", category, message) {
        eprintln!("telemetry write failed: {}", err);
    }
}

/**
 * \brief 记录错误事件（包括网关回退）。
 */
pub fn log_error(category: &str, message: &str) {
    if !is_enabled() {
        return;
    }
    if let Err(err) = write_line("ERROR", category, message) {
        eprintln!("telemetry write failed: {}", err);
    }
}

fn format_line(timestamp: &str, level: &str, category: &str, message: &str) -> String {
    // 单行记录，消息里的换行会破坏 grep
    let flat = message.replace(['\r', '\n'], " ");
    format!("{} [{}] {} - {}", timestamp, level, category, flat)
}

fn write_line(level: &str, category: &str, message: &str) -> Result<()> {
    let path = log_path();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", format_line(&timestamp, level, category, message))?;
    Ok(())
}
