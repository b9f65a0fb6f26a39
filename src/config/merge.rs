use std::path::PathBuf;

use super::yaml::YamlConfig;
use super::{ServerConfig, TlsConfig, env};

/// Merge environment configuration (base) with YAML overrides.
///
/// Every YAML value that is present replaces the corresponding environment
/// value; absent YAML values leave the environment value in place.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = env::load()?;

    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(name) = server.name {
            config.server_name = name;
        }
        if let Some(tls) = server.tls {
            if tls.enabled == Some(false) {
                config.tls = None;
            } else {
                match (tls.cert_path, tls.key_path) {
                    (Some(cert), Some(key)) => {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert),
                            key_path: PathBuf::from(key),
                        });
                    }
                    (None, None) => {}
                    _ => {
                        return Err(
                            "tls.cert_path and tls.key_path must be set together".into()
                        );
                    }
                }
            }
        }
    }

    if let Some(collaborators) = yaml.collaborators {
        if let Some(key) = collaborators.deepgram_api_key {
            config.deepgram_api_key = Some(key);
        }
        if let Some(key) = collaborators.google_api_key {
            config.google_api_key = Some(key);
        }
        if let Some(key) = collaborators.elevenlabs_api_key {
            config.elevenlabs_api_key = Some(key);
        }
        if let Some(model) = collaborators.stt_model {
            config.stt_model = model;
        }
        if let Some(language) = collaborators.stt_language {
            config.stt_language = language;
        }
        if let Some(model) = collaborators.gemini_model {
            config.gemini_model = model;
        }
        if let Some(voice_id) = collaborators.elevenlabs_voice_id {
            config.elevenlabs_voice_id = voice_id;
        }
    }

    if let Some(security) = yaml.security {
        if let Some(origins) = security.cors_allowed_origins {
            config.cors_allowed_origins = Some(origins);
        }
    }

    Ok(config)
}
