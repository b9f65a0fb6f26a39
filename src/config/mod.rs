//! Configuration module for the Atelier Gateway server
//!
//! This module handles server configuration from various sources: .env files,
//! YAML files, and environment variables. Priority: YAML > ENV vars > .env
//! values > defaults. The configuration is split into logical submodules.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use atelier_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod merge;
mod validation;
mod yaml;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the Atelier Gateway server:
/// - Server settings (host, port, name, TLS)
/// - Collaborator API keys (Deepgram, Google, ElevenLabs)
/// - Collaborator tuning (transcription model and language, Gemini model,
///   synthesis voice)
/// - Security settings (CORS)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Display name reported by the health endpoint
    pub server_name: String,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Collaborator API keys
    /// Deepgram API key for live transcription (required)
    pub deepgram_api_key: Option<String>,
    /// Google API key for Gemini text and vision (required)
    pub google_api_key: Option<String>,
    /// ElevenLabs API key for speech synthesis. Optional: without it,
    /// replies are text-only and no audio frames are sent.
    pub elevenlabs_api_key: Option<String>,

    // Collaborator tuning
    /// Transcription model (default "nova-2")
    pub stt_model: String,
    /// Spoken language hint (default "en-US")
    pub stt_language: String,
    /// Gemini model for replies and image analysis
    pub gemini_model: String,
    /// ElevenLabs voice used for synthesized replies
    pub elevenlabs_voice_id: String,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
/// This ensures sensitive data is cleared from memory immediately after use.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.deepgram_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.google_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.elevenlabs_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable base
    ///
    /// Loads .env file (if present), then merges environment variables (with
    /// defaults), and finally applies YAML overrides.
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final
    /// configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // Note: the .env file is loaded in main.rs at application startup,
        // so by the time this runs .env values are plain environment
        // variables that actual ENV vars have already overridden.
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let config = merge::merge_config(Some(yaml_config))?;

        validation::validate_collaborator_keys(&config)?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    ///
    /// Same precedence as [`ServerConfig::from_file`] minus the YAML layer.
    ///
    /// # Errors
    /// Returns an error if environment variables have invalid formats or
    /// validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;

        validation::validate_collaborator_keys(&config)?;

        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    ///
    /// Returns true if TLS configuration is present
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Get API key for a specific collaborator
    ///
    /// # Arguments
    /// * `collaborator` - The name of the collaborator (e.g., "deepgram",
    ///   "google", "elevenlabs")
    ///
    /// # Returns
    /// * `Result<String, String>` - The API key on success, or an error
    ///   message on failure
    pub fn get_api_key(&self, collaborator: &str) -> Result<String, String> {
        match collaborator.to_lowercase().as_str() {
            "deepgram" => {
                self.deepgram_api_key.as_ref().cloned().ok_or_else(|| {
                    "Deepgram API key not configured in server environment".to_string()
                })
            }
            "google" | "gemini" => self.google_api_key.as_ref().cloned().ok_or_else(|| {
                "Google API key not configured in server environment".to_string()
            }),
            "elevenlabs" => self.elevenlabs_api_key.as_ref().cloned().ok_or_else(|| {
                "ElevenLabs API key not configured in server environment".to_string()
            }),
            _ => Err(format!("Unsupported collaborator: {collaborator}")),
        }
    }
}
