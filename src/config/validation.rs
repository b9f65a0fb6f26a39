use super::ServerConfig;

fn missing(value: Option<&str>) -> bool {
    value.map(str::trim).filter(|v| !v.is_empty()).is_none()
}

/// Validate that the required collaborator keys are present.
///
/// Deepgram and Google keys are mandatory; the gateway cannot transcribe or
/// reply without them. The ElevenLabs key stays optional since sessions
/// degrade to text-only replies without synthesis.
pub(super) fn validate_collaborator_keys(
    config: &ServerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if missing(config.deepgram_api_key.as_deref()) {
        return Err(
            "Deepgram API key is required (DEEPGRAM_API_KEY or collaborators.deepgram_api_key)"
                .into(),
        );
    }
    if missing(config.google_api_key.as_deref()) {
        return Err(
            "Google API key is required (GOOGLE_API_KEY or collaborators.google_api_key)".into(),
        );
    }
    Ok(())
}
