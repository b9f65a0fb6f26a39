use std::env;
use std::path::PathBuf;

use super::{ServerConfig, TlsConfig};
use crate::core::llm::gemini::DEFAULT_GEMINI_MODEL;
use crate::core::tts::elevenlabs::DEFAULT_VOICE_ID;

pub(crate) const DEFAULT_HOST: &str = "0.0.0.0";
pub(crate) const DEFAULT_PORT: u16 = 3001;
pub(crate) const DEFAULT_SERVER_NAME: &str = "Atelier Gateway";
pub(crate) const DEFAULT_STT_MODEL: &str = "nova-2";
pub(crate) const DEFAULT_STT_LANGUAGE: &str = "en-US";

/// Read an environment variable, treating unset and blank as absent.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Build a configuration from environment variables with defaults.
///
/// `.env` values are visible here because dotenvy loads them into the
/// process environment at startup, with actual environment variables
/// taking precedence.
pub(super) fn load() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let port = match optional("PORT") {
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT value {raw:?}: {e}"))?,
        None => DEFAULT_PORT,
    };

    let tls = match (optional("TLS_CERT_PATH"), optional("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        (None, None) => None,
        _ => return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into()),
    };

    Ok(ServerConfig {
        host: optional("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port,
        server_name: optional("SERVER_NAME").unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
        tls,
        deepgram_api_key: optional("DEEPGRAM_API_KEY"),
        google_api_key: optional("GOOGLE_API_KEY"),
        elevenlabs_api_key: optional("ELEVENLABS_API_KEY"),
        stt_model: optional("STT_MODEL").unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
        stt_language: optional("STT_LANGUAGE")
            .unwrap_or_else(|| DEFAULT_STT_LANGUAGE.to_string()),
        gemini_model: optional("GEMINI_MODEL")
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        elevenlabs_voice_id: optional("ELEVENLABS_VOICE_ID")
            .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
        cors_allowed_origins: optional("CORS_ALLOWED_ORIGINS"),
    })
}
