pub mod config;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod server;
pub mod telemetry;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::ContentGateway;

/**
 * \brief SDK 预导入集合，方便外部引用常用模块。
 */
pub mod prelude {
    pub use crate::config;
    pub use crate::gateway;
    pub use crate::llm;
    pub use crate::models;
    pub use crate::server;
    pub use crate::telemetry;
}
