//! Deepgram live transcription client.
//!
//! Speaks the Deepgram listen protocol: one WebSocket per recording, binary
//! frames carry audio in, JSON `Results` events carry transcripts out.
//! Audio reaches the stream task through a bounded channel; that channel is
//! the backpressure boundary the session pushes against.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::Error as TungsteniteError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

use super::{STTConfig, STTError, STTResult, SpeechToText, TranscriptFragment, TranscriptionStream};

/// Deepgram live transcription endpoint.
pub const DEEPGRAM_LIVE_URL: &str = "wss://api.deepgram.com/v1/listen";

/// Capacity of the bounded audio channel into the stream task.
const AUDIO_CHANNEL_CAPACITY: usize = 256;

/// Keepalive cadence while no audio is flowing.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// How long to wait for final results after requesting stream close.
const FINISH_GRACE: Duration = Duration::from_secs(2);

/// Control message asking the collaborator to flush and close the stream.
const CLOSE_STREAM_MESSAGE: &str = r#"{"type":"CloseStream"}"#;

/// Control message keeping an idle stream open.
const KEEPALIVE_MESSAGE: &str = r#"{"type":"KeepAlive"}"#;

type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Deepgram speech-to-text collaborator client.
#[derive(Debug, Clone)]
pub struct DeepgramSTT {
    config: STTConfig,
}

impl DeepgramSTT {
    /// Create a client, validating the configuration.
    pub fn new(config: STTConfig) -> STTResult<Self> {
        if config.api_key.is_empty() {
            return Err(STTError::InvalidConfig("api key is required".to_string()));
        }
        Ok(Self { config })
    }

    fn build_url(&self) -> STTResult<Url> {
        let base = self.config.endpoint.as_deref().unwrap_or(DEEPGRAM_LIVE_URL);
        let params: Vec<(&str, String)> = vec![
            ("model", self.config.model.clone()),
            ("language", self.config.language.clone()),
            ("interim_results", self.config.interim_results.to_string()),
            ("smart_format", self.config.smart_format.to_string()),
            ("vad_events", self.config.vad_events.to_string()),
            (
                "utterance_end_ms",
                self.config.utterance_end_ms.to_string(),
            ),
        ];
        Url::parse_with_params(base, &params).map_err(|e| STTError::InvalidConfig(e.to_string()))
    }

    fn build_request(&self, url: &Url) -> STTResult<http::Request<()>> {
        let host = url
            .host_str()
            .ok_or_else(|| STTError::InvalidConfig("endpoint has no host".to_string()))?;
        http::Request::builder()
            .uri(url.as_str())
            .header("Authorization", format!("Token {}", self.config.api_key))
            .header("Host", host)
            .header("Upgrade", "websocket")
            .header("Connection", "Upgrade")
            .header("Sec-WebSocket-Key", generate_key())
            .header("Sec-WebSocket-Version", "13")
            .body(())
            .map_err(|e| STTError::InvalidConfig(e.to_string()))
    }
}

#[async_trait]
impl SpeechToText for DeepgramSTT {
    async fn open_stream(
        &self,
        fragments: mpsc::Sender<TranscriptFragment>,
    ) -> STTResult<Box<dyn TranscriptionStream>> {
        let url = self.build_url()?;
        let request = self.build_request(&url)?;

        let (ws_stream, _response) = connect_async(request).await.map_err(map_connect_error)?;
        info!(model = %self.config.model, "transcription stream opened");

        let (command_tx, command_rx) = mpsc::channel::<StreamCommand>(AUDIO_CHANNEL_CAPACITY);
        let task = tokio::spawn(run_stream(ws_stream, command_rx, fragments));

        Ok(Box::new(DeepgramStream {
            commands: command_tx,
            task,
            finished: false,
        }))
    }
}

fn map_connect_error(error: TungsteniteError) -> STTError {
    match error {
        TungsteniteError::Http(response)
            if response.status() == http::StatusCode::UNAUTHORIZED
                || response.status() == http::StatusCode::FORBIDDEN =>
        {
            STTError::AuthenticationFailed(response.status().to_string())
        }
        other => STTError::ConnectionFailed(other.to_string()),
    }
}

// =============================================================================
// Stream handle
// =============================================================================

enum StreamCommand {
    Audio(Bytes),
    Finish,
}

struct DeepgramStream {
    commands: mpsc::Sender<StreamCommand>,
    task: JoinHandle<()>,
    finished: bool,
}

#[async_trait]
impl TranscriptionStream for DeepgramStream {
    async fn send_audio(&mut self, chunk: Bytes) -> STTResult<()> {
        self.commands
            .send(StreamCommand::Audio(chunk))
            .await
            .map_err(|_| STTError::StreamClosed)
    }

    async fn finish(&mut self) -> STTResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let _ = self.commands.send(StreamCommand::Finish).await;
        if tokio::time::timeout(FINISH_GRACE, &mut self.task)
            .await
            .is_err()
        {
            self.task.abort();
        }
        Ok(())
    }
}

impl Drop for DeepgramStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// Stream task
// =============================================================================

async fn run_stream(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut commands: mpsc::Receiver<StreamCommand>,
    fragments: mpsc::Sender<TranscriptFragment>,
) {
    let (mut sink, mut stream) = ws_stream.split();
    let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);

    loop {
        select! {
            command = commands.recv() => match command {
                Some(StreamCommand::Audio(chunk)) => {
                    if let Err(e) = sink.send(Message::Binary(chunk)).await {
                        warn!(error = %e, "failed to forward audio chunk");
                        break;
                    }
                }
                Some(StreamCommand::Finish) | None => {
                    let _ = sink.send(Message::Text(CLOSE_STREAM_MESSAGE.into())).await;
                    drain_final_results(&mut stream, &fragments).await;
                    break;
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if let Some(fragment) = parse_live_event(&text)
                        && fragments.send(fragment).await.is_err()
                    {
                        // Session side hung up; nothing left to deliver to.
                        break;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = sink.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!("transcription stream closed by collaborator");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "transcription stream error");
                    break;
                }
            },
            _ = keepalive.tick() => {
                if sink.send(Message::Text(KEEPALIVE_MESSAGE.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;
}

/// Read out the results the collaborator flushes after `CloseStream`,
/// bounded by [`FINISH_GRACE`].
async fn drain_final_results(stream: &mut WsStream, fragments: &mpsc::Sender<TranscriptFragment>) {
    let deadline = tokio::time::sleep(FINISH_GRACE);
    tokio::pin!(deadline);
    loop {
        select! {
            _ = &mut deadline => break,
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if let Some(fragment) = parse_live_event(&text)
                        && fragments.send(fragment).await.is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }
}

// =============================================================================
// Live event parsing
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum LiveEvent {
    Results(ResultsEvent),
    Metadata {},
    UtteranceEnd {},
    SpeechStarted {},
}

#[derive(Debug, Deserialize)]
struct ResultsEvent {
    #[serde(default)]
    is_final: bool,
    channel: ResultsChannel,
}

#[derive(Debug, Deserialize)]
struct ResultsChannel {
    alternatives: Vec<ResultsAlternative>,
}

#[derive(Debug, Deserialize)]
struct ResultsAlternative {
    transcript: String,
}

/// Extract a transcript fragment from one live event, if it carries one.
/// Empty transcripts and non-result events yield nothing.
fn parse_live_event(raw: &str) -> Option<TranscriptFragment> {
    let event: LiveEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(e) => {
            debug!(error = %e, "unrecognized transcription event");
            return None;
        }
    };
    match event {
        LiveEvent::Results(results) => {
            let alternative = results.channel.alternatives.into_iter().next()?;
            if alternative.transcript.is_empty() {
                return None;
            }
            Some(TranscriptFragment {
                text: alternative.transcript,
                is_final: results.is_final,
            })
        }
        LiveEvent::Metadata {} | LiveEvent::UtteranceEnd {} | LiveEvent::SpeechStarted {} => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> STTConfig {
        STTConfig {
            api_key: "test-key".to_string(),
            ..STTConfig::default()
        }
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = DeepgramSTT::new(STTConfig::default());
        assert!(matches!(result, Err(STTError::InvalidConfig(_))));
    }

    #[test]
    fn test_build_url_includes_live_options() {
        let client = DeepgramSTT::new(test_config()).unwrap();
        let url = client.build_url().unwrap();
        let query = url.query().unwrap();
        assert!(url.as_str().starts_with(DEEPGRAM_LIVE_URL));
        assert!(query.contains("model=nova-2"));
        assert!(query.contains("language=en-US"));
        assert!(query.contains("interim_results=true"));
        assert!(query.contains("smart_format=true"));
        assert!(query.contains("vad_events=true"));
        assert!(query.contains("utterance_end_ms=1000"));
    }

    #[test]
    fn test_build_url_honors_endpoint_override() {
        let config = STTConfig {
            endpoint: Some("ws://127.0.0.1:9000/listen".to_string()),
            ..test_config()
        };
        let client = DeepgramSTT::new(config).unwrap();
        let url = client.build_url().unwrap();
        assert!(url.as_str().starts_with("ws://127.0.0.1:9000/listen?"));
    }

    #[test]
    fn test_request_carries_token_authorization() {
        let client = DeepgramSTT::new(test_config()).unwrap();
        let url = client.build_url().unwrap();
        let request = client.build_request(&url).unwrap();
        let auth = request.headers().get("Authorization").unwrap();
        assert_eq!(auth, "Token test-key");
        assert_eq!(request.headers().get("Upgrade").unwrap(), "websocket");
        assert!(request.headers().contains_key("Sec-WebSocket-Key"));
    }

    #[test]
    fn test_parse_interim_results_event() {
        let raw = r#"{"type":"Results","channel_index":[0,1],"duration":1.02,"start":0.0,
            "is_final":false,"speech_final":false,
            "channel":{"alternatives":[{"transcript":"Hello there","confidence":0.98,"words":[]}]}}"#;
        let fragment = parse_live_event(raw).unwrap();
        assert_eq!(fragment.text, "Hello there");
        assert!(!fragment.is_final);
    }

    #[test]
    fn test_parse_final_results_event() {
        let raw = r#"{"type":"Results","is_final":true,
            "channel":{"alternatives":[{"transcript":"Hello there.","confidence":0.99}]}}"#;
        let fragment = parse_live_event(raw).unwrap();
        assert_eq!(fragment.text, "Hello there.");
        assert!(fragment.is_final);
    }

    #[test]
    fn test_parse_skips_empty_transcript() {
        let raw = r#"{"type":"Results","is_final":false,
            "channel":{"alternatives":[{"transcript":"","confidence":0.0}]}}"#;
        assert!(parse_live_event(raw).is_none());
    }

    #[test]
    fn test_parse_skips_non_result_events() {
        assert!(parse_live_event(r#"{"type":"Metadata","request_id":"abc"}"#).is_none());
        assert!(parse_live_event(r#"{"type":"UtteranceEnd","last_word_end":2.1}"#).is_none());
        assert!(parse_live_event(r#"{"type":"SpeechStarted","timestamp":0.4}"#).is_none());
    }

    #[test]
    fn test_parse_garbage_returns_none() {
        assert!(parse_live_event("not json at all").is_none());
        assert!(parse_live_event(r#"{"type":"Results"}"#).is_none());
    }
}
