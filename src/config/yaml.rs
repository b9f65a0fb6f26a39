use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// This structure represents the full configuration that can be loaded from a
/// YAML file. All fields are optional to allow partial configuration.
/// Environment variables provide the base values that YAML overrides.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   name: "Atelier Gateway"
///
/// collaborators:
///   deepgram_api_key: "your-deepgram-key"
///   google_api_key: "your-google-key"
///   elevenlabs_api_key: "your-elevenlabs-key"
///   stt_model: "nova-2"
///   stt_language: "en-US"
///   gemini_model: "gemini-1.5-flash-latest"
///   elevenlabs_voice_id: "1SM7GgM6IMuvQlz2BwM3"
///
/// security:
///   cors_allowed_origins: "https://example.com,https://app.example.com"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub collaborators: Option<CollaboratorsYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Display name reported by the health endpoint
    pub name: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Collaborator API keys and tuning from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CollaboratorsYaml {
    /// Deepgram API key for live transcription (required to start)
    pub deepgram_api_key: Option<String>,
    /// Google API key for Gemini text and vision (required to start)
    pub google_api_key: Option<String>,
    /// ElevenLabs API key for speech synthesis (optional; replies stay
    /// text-only without it)
    pub elevenlabs_api_key: Option<String>,
    /// Transcription model (e.g. "nova-2")
    pub stt_model: Option<String>,
    /// Spoken language hint (e.g. "en-US")
    pub stt_language: Option<String>,
    /// Gemini model for replies and image analysis
    pub gemini_model: Option<String>,
    /// ElevenLabs voice used for synthesized replies
    pub elevenlabs_voice_id: Option<String>,
}

/// Security configuration from YAML
///
/// # Example YAML structure
/// ```yaml
/// security:
///   cors_allowed_origins: "https://example.com,https://app.example.com"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  name: "Test Gateway"
  tls:
    enabled: true
    cert_path: "/etc/certs/server.pem"
    key_path: "/etc/certs/server.key"

collaborators:
  deepgram_api_key: "dg-key"
  google_api_key: "goog-key"
  elevenlabs_api_key: "el-key"
  stt_model: "nova-3"
  stt_language: "fr-FR"
  gemini_model: "gemini-1.5-pro-latest"
  elevenlabs_voice_id: "voice-123"

security:
  cors_allowed_origins: "*"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host, Some("127.0.0.1".to_string()));
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.name, Some("Test Gateway".to_string()));
        let tls = server.tls.as_ref().unwrap();
        assert_eq!(tls.enabled, Some(true));
        assert_eq!(tls.cert_path, Some("/etc/certs/server.pem".to_string()));

        let collaborators = config.collaborators.as_ref().unwrap();
        assert_eq!(collaborators.deepgram_api_key, Some("dg-key".to_string()));
        assert_eq!(collaborators.google_api_key, Some("goog-key".to_string()));
        assert_eq!(collaborators.elevenlabs_api_key, Some("el-key".to_string()));
        assert_eq!(collaborators.stt_model, Some("nova-3".to_string()));
        assert_eq!(collaborators.stt_language, Some("fr-FR".to_string()));
        assert_eq!(
            collaborators.gemini_model,
            Some("gemini-1.5-pro-latest".to_string())
        );
        assert_eq!(
            collaborators.elevenlabs_voice_id,
            Some("voice-123".to_string())
        );

        assert_eq!(
            config.security.as_ref().unwrap().cors_allowed_origins,
            Some("*".to_string())
        );
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
server:
  port: 9000

collaborators:
  deepgram_api_key: "dg-key"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(config.server.as_ref().unwrap().host.is_none());
        assert_eq!(config.server.as_ref().unwrap().port, Some(9000));
        assert!(config.server.as_ref().unwrap().tls.is_none());
        let collaborators = config.collaborators.as_ref().unwrap();
        assert_eq!(collaborators.deepgram_api_key, Some("dg-key".to_string()));
        assert!(collaborators.google_api_key.is_none());
        assert!(config.security.is_none());
    }

    #[test]
    fn test_yaml_config_empty_mapping() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();

        assert!(config.server.is_none());
        assert!(config.collaborators.is_none());
        assert!(config.security.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "localhost"
  port: 3000
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();

        assert_eq!(
            config.server.as_ref().unwrap().host,
            Some("localhost".to_string())
        );
        assert_eq!(config.server.as_ref().unwrap().port, Some(3000));
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: [content").unwrap();

        let result = YamlConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}
