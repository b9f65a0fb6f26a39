//! Session state machine.
//!
//! One `Session` per WebSocket connection. All mutation funnels through a
//! single owner: the connection task calls the `handle_*` methods for
//! inbound frames, and every asynchronous completion (transcript fragments,
//! assistant replies, synthesized speech, image analysis results) re-enters
//! as a [`SessionEvent`] on the per-session event channel. Spawned work
//! never touches session state directly.
//!
//! Lifecycle: `Idle` until the transport opens, then `Connected`,
//! `Recording` while a transcription stream is live, and `Closed` once the
//! transport goes away. `Closed` is terminal and closing is idempotent.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::messages::{ClientMessage, CommandAction, MessageRoute, ServerMessage};
use crate::core::context::{ConversationContext, TurnRole};
use crate::core::llm::LLMResult;
use crate::core::reconcile::{Reconciliation, TranscriptReconciler};
use crate::core::stt::{TranscriptFragment, TranscriptionStream};
use crate::core::tts::TTSResult;
use crate::core::vision::{DataUrl, ImageSource, VisionResult};
use crate::errors::SessionError;
use crate::state::Collaborators;

/// How long a binary frame may wait on the transcription channel before it
/// is dropped.
const AUDIO_FORWARD_TIMEOUT: Duration = Duration::from_millis(250);

/// Capacity of the transcript fragment channel between the transcription
/// stream and the session event loop.
const FRAGMENT_CHANNEL_CAPACITY: usize = 64;

/// Acknowledgement turn recorded when a client submits an image.
const IMAGE_SUBMITTED_ACK: &str = "[User shared an image for analysis]";

// =============================================================================
// States and events
// =============================================================================

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport yet.
    Idle,
    /// Transport open, no recording active.
    Connected,
    /// Audio streaming to the transcription collaborator.
    Recording,
    /// Transport gone. Terminal.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connected => "connected",
            ConnectionState::Recording => "recording",
            ConnectionState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Completions that re-enter the session loop from spawned work.
///
/// Fragment events carry the recording epoch they belong to; fragments from
/// a superseded recording are discarded on arrival.
#[derive(Debug)]
pub enum SessionEvent {
    /// A transcript fragment from the live transcription stream.
    Fragment {
        epoch: u64,
        fragment: TranscriptFragment,
    },
    /// The transcription collaborator ended the stream on its own.
    TranscriptStreamEnded { epoch: u64 },
    /// A language-model reply resolved.
    Reply(LLMResult<String>),
    /// A speech synthesis call resolved.
    Speech(TTSResult<Bytes>),
    /// An image analysis resolved.
    ImageOutcome {
        request_id: Uuid,
        result: VisionResult<String>,
    },
}

struct ActiveRecording {
    stream: Box<dyn TranscriptionStream>,
    pump: JoinHandle<()>,
}

struct PendingImage {
    id: Uuid,
    payload: String,
    cancel: CancellationToken,
}

// =============================================================================
// Session
// =============================================================================

/// Per-connection session state.
pub struct Session {
    id: Uuid,
    state: ConnectionState,
    context: ConversationContext,
    reconciler: TranscriptReconciler,
    /// Whether the current last accepted utterance already has a reply in
    /// flight or delivered.
    replied: bool,
    recording_epoch: u64,
    recording: Option<ActiveRecording>,
    pending_image: Option<PendingImage>,
    collaborators: Collaborators,
    outbound: mpsc::Sender<MessageRoute>,
    events: mpsc::Sender<SessionEvent>,
}

impl Session {
    /// Create a session awaiting its transport.
    pub fn new(
        id: Uuid,
        collaborators: Collaborators,
        outbound: mpsc::Sender<MessageRoute>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            id,
            state: ConnectionState::Idle,
            context: ConversationContext::new(),
            reconciler: TranscriptReconciler::new(),
            replied: false,
            recording_epoch: 0,
            recording: None,
            pending_image: None,
            collaborators,
            outbound,
            events,
        }
    }

    /// Mark the transport open.
    pub fn open(&mut self) {
        if self.state == ConnectionState::Idle {
            self.state = ConnectionState::Connected;
            info!(session_id = %self.id, "session opened");
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Conversation history accumulated so far.
    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    // =========================================================================
    // Inbound frames
    // =========================================================================

    /// Apply a typed control message.
    pub async fn handle_control(&mut self, message: ClientMessage) {
        if self.is_closed() {
            return;
        }
        match message {
            ClientMessage::StartRecording => self.start_recording().await,
            ClientMessage::StopRecording => self.stop_recording().await,
            ClientMessage::AnalyzeImage { data_url } => self.begin_image_analysis(data_url).await,
        }
    }

    /// Apply a plain-text frame from a legacy client. Treated as a final
    /// transcript fragment.
    pub async fn handle_legacy_transcript(&mut self, text: String) {
        if self.is_closed() {
            return;
        }
        debug!(session_id = %self.id, chars = text.len(), "legacy transcript fragment");
        self.apply_fragment(&text, true).await;
    }

    /// Forward a binary audio frame to the transcription stream. Frames
    /// outside `Recording` are dropped with a warning; a saturated stream
    /// drops the frame and reports backpressure after a capped wait.
    pub async fn handle_audio(&mut self, chunk: Bytes) {
        if self.state != ConnectionState::Recording {
            warn!(
                session_id = %self.id,
                state = %self.state,
                bytes = chunk.len(),
                "not recording, dropping audio frame"
            );
            return;
        }

        enum Forward {
            Sent,
            TimedOut,
            Failed(String),
        }

        let forward = match self.recording.as_mut() {
            Some(recording) => {
                match timeout(AUDIO_FORWARD_TIMEOUT, recording.stream.send_audio(chunk)).await {
                    Ok(Ok(())) => Forward::Sent,
                    Ok(Err(e)) => Forward::Failed(e.to_string()),
                    Err(_) => Forward::TimedOut,
                }
            }
            None => return,
        };

        match forward {
            Forward::Sent => {}
            Forward::TimedOut => self.report(SessionError::Backpressure).await,
            Forward::Failed(reason) => {
                self.recording = None;
                self.state = ConnectionState::Connected;
                self.report(SessionError::CollaboratorFailure {
                    collaborator: "transcription",
                    reason,
                })
                .await;
            }
        }
    }

    // =========================================================================
    // Event loop entry
    // =========================================================================

    /// Apply one completion from the per-session event channel.
    pub async fn handle_event(&mut self, event: SessionEvent) {
        if self.is_closed() {
            return;
        }
        match event {
            SessionEvent::Fragment { epoch, fragment } => {
                if epoch != self.recording_epoch {
                    debug!(session_id = %self.id, epoch, "discarding fragment from superseded recording");
                    return;
                }
                self.apply_fragment(&fragment.text, fragment.is_final).await;
            }
            SessionEvent::TranscriptStreamEnded { epoch } => {
                if epoch == self.recording_epoch && self.state == ConnectionState::Recording {
                    info!(session_id = %self.id, "transcription stream ended, recording stopped");
                    self.recording = None;
                    self.state = ConnectionState::Connected;
                }
            }
            SessionEvent::Reply(result) => match result {
                Ok(text) => {
                    self.context.append(TurnRole::AssistantText, Some(text.clone()));
                    self.emit(ServerMessage::AiResponse { text: text.clone() }).await;
                    self.spawn_speech(text);
                }
                Err(e) => {
                    self.report(SessionError::CollaboratorFailure {
                        collaborator: "language model",
                        reason: e.to_string(),
                    })
                    .await;
                }
            },
            SessionEvent::Speech(result) => match result {
                Ok(audio) => {
                    self.context.append(TurnRole::AssistantAudioRef, None);
                    let audio_base64 = BASE64_STANDARD.encode(&audio);
                    self.emit(ServerMessage::AiAudio { audio_base64 }).await;
                }
                Err(e) => {
                    self.report(SessionError::CollaboratorFailure {
                        collaborator: "speech synthesis",
                        reason: e.to_string(),
                    })
                    .await;
                }
            },
            SessionEvent::ImageOutcome { request_id, result } => {
                self.apply_image_outcome(request_id, result).await;
            }
        }
    }

    // =========================================================================
    // Recording lifecycle
    // =========================================================================

    async fn start_recording(&mut self) {
        if self.state != ConnectionState::Connected {
            self.report(SessionError::InvalidState {
                operation: "start_recording",
                state: self.state.to_string(),
            })
            .await;
            return;
        }

        let (fragment_tx, mut fragment_rx) = mpsc::channel(FRAGMENT_CHANNEL_CAPACITY);
        let stream = match self.collaborators.stt.open_stream(fragment_tx).await {
            Ok(stream) => stream,
            Err(e) => {
                self.report(SessionError::CollaboratorFailure {
                    collaborator: "transcription",
                    reason: e.to_string(),
                })
                .await;
                return;
            }
        };

        self.recording_epoch += 1;
        let epoch = self.recording_epoch;
        let events = self.events.clone();
        let pump = tokio::spawn(async move {
            while let Some(fragment) = fragment_rx.recv().await {
                if events
                    .send(SessionEvent::Fragment { epoch, fragment })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            let _ = events.send(SessionEvent::TranscriptStreamEnded { epoch }).await;
        });

        self.reconciler.reset();
        self.replied = false;
        self.recording = Some(ActiveRecording { stream, pump });
        self.state = ConnectionState::Recording;
        info!(session_id = %self.id, "recording started");
    }

    async fn stop_recording(&mut self) {
        if self.state != ConnectionState::Recording {
            self.report(SessionError::InvalidState {
                operation: "stop_recording",
                state: self.state.to_string(),
            })
            .await;
            return;
        }

        if let Some(recording) = self.recording.take() {
            // Finish in the background so final fragments can still drain
            // through the event channel while the loop stays responsive.
            let mut stream = recording.stream;
            tokio::spawn(async move {
                if let Err(e) = stream.finish().await {
                    debug!(error = %e, "transcription stream finish failed");
                }
            });
        }
        self.state = ConnectionState::Connected;
        info!(session_id = %self.id, "recording stopped");
    }

    // =========================================================================
    // Transcript reconciliation
    // =========================================================================

    async fn apply_fragment(&mut self, text: &str, is_final: bool) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        match self.reconciler.observe(trimmed) {
            Reconciliation::Duplicate => {
                debug!(session_id = %self.id, "duplicate fragment discarded");
                if is_final && !self.replied {
                    self.spawn_reply();
                }
            }
            Reconciliation::Subset => {
                debug!(session_id = %self.id, "subset fragment discarded");
            }
            Reconciliation::Correct { replaced } => {
                let applied = self.context.replace_last(
                    TurnRole::UserSpeech,
                    |turn| turn.text.as_deref() == Some(replaced.as_str()),
                    Some(trimmed.to_string()),
                );
                if !applied {
                    // Another user_speech turn (e.g. an image acknowledgement)
                    // landed after the one being corrected; never evict it.
                    self.context.append(TurnRole::UserSpeech, Some(trimmed.to_string()));
                }
                self.replied = false;
                self.emit(ServerMessage::Transcription {
                    text: trimmed.to_string(),
                })
                .await;
                if is_final {
                    self.spawn_reply();
                }
            }
            Reconciliation::Append => {
                self.context.append(TurnRole::UserSpeech, Some(trimmed.to_string()));
                self.replied = false;
                self.emit(ServerMessage::Transcription {
                    text: trimmed.to_string(),
                })
                .await;
                if is_final {
                    self.spawn_reply();
                }
            }
        }
    }

    // =========================================================================
    // Reply pipeline
    // =========================================================================

    /// Request an assistant reply to the last accepted utterance. The
    /// language-model call runs as a spawned task and re-enters the loop as
    /// [`SessionEvent::Reply`].
    fn spawn_reply(&mut self) {
        if self.is_closed() {
            return;
        }
        let utterance = self.reconciler.last_accepted().to_string();
        if utterance.is_empty() {
            return;
        }

        let prompt = self.context.prompt_with_context(&utterance);
        let image = self.context.active_image().map(str::to_string);
        let llm = Arc::clone(&self.collaborators.llm);
        let events = self.events.clone();
        debug!(session_id = %self.id, chars = utterance.len(), "requesting assistant reply");
        tokio::spawn(async move {
            let image = image.as_deref().and_then(|raw| DataUrl::parse(raw).ok());
            let result = llm.reply(&prompt, image.as_ref()).await;
            let _ = events.send(SessionEvent::Reply(result)).await;
        });
        self.replied = true;
    }

    /// Synthesize `text` when a synthesizer is configured. Completion
    /// re-enters the loop as [`SessionEvent::Speech`].
    fn spawn_speech(&mut self, text: String) {
        if self.is_closed() {
            return;
        }
        let Some(tts) = self.collaborators.tts.clone() else {
            debug!(session_id = %self.id, "no synthesizer configured, skipping speech");
            return;
        };
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = tts.synthesize(&text).await;
            let _ = events.send(SessionEvent::Speech(result)).await;
        });
    }

    // =========================================================================
    // Image analysis bridge
    // =========================================================================

    async fn begin_image_analysis(&mut self, data_url: String) {
        if self.pending_image.is_some() {
            self.report(SessionError::Busy).await;
            return;
        }

        let request_id = Uuid::new_v4();
        info!(
            session_id = %self.id,
            %request_id,
            bytes = data_url.len(),
            "image analysis requested"
        );

        self.context
            .append(TurnRole::UserSpeech, Some(IMAGE_SUBMITTED_ACK.to_string()));
        self.emit(ServerMessage::Transcription {
            text: IMAGE_SUBMITTED_ACK.to_string(),
        })
        .await;

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let vision = Arc::clone(&self.collaborators.vision);
        let events = self.events.clone();
        let payload = data_url.clone();
        tokio::spawn(async move {
            let source = ImageSource::DataUrl(payload);
            tokio::select! {
                _ = task_cancel.cancelled() => {}
                result = vision.describe(&source, None) => {
                    let _ = events.send(SessionEvent::ImageOutcome { request_id, result }).await;
                }
            }
        });

        self.pending_image = Some(PendingImage {
            id: request_id,
            payload: data_url,
            cancel,
        });
    }

    async fn apply_image_outcome(&mut self, request_id: Uuid, result: VisionResult<String>) {
        let Some(pending) = self.pending_image.take_if(|p| p.id == request_id) else {
            debug!(session_id = %self.id, %request_id, "discarding stale image analysis result");
            return;
        };

        match result {
            Ok(description) => {
                info!(session_id = %self.id, %request_id, "image analysis completed");
                self.context
                    .append(TurnRole::ImageAnalysis, Some(description.clone()));
                self.context.set_active_image(pending.payload);
                self.emit(ServerMessage::AiResponse {
                    text: description.clone(),
                })
                .await;
                self.emit(ServerMessage::Command {
                    action: CommandAction::EnableAnalyzeButton,
                })
                .await;
                self.spawn_speech(description);
            }
            Err(e) => {
                self.report(SessionError::CollaboratorFailure {
                    collaborator: "image analysis",
                    reason: e.to_string(),
                })
                .await;
                self.emit(ServerMessage::Command {
                    action: CommandAction::EnableAnalyzeButton,
                })
                .await;
            }
        }
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Close the session. Idempotent; stops the recording stream, cancels
    /// any pending image analysis, and tells the sender task to close the
    /// socket.
    pub async fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        info!(session_id = %self.id, turns = self.context.len(), "session closed");
        self.state = ConnectionState::Closed;

        if let Some(recording) = self.recording.take() {
            recording.pump.abort();
            let mut stream = recording.stream;
            tokio::spawn(async move {
                let _ = stream.finish().await;
            });
        }
        if let Some(pending) = self.pending_image.take() {
            pending.cancel.cancel();
        }

        let _ = self.outbound.send(MessageRoute::Close).await;
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    /// Surface a session error. Collaborator failures and backpressure are
    /// recorded as `system_error` turns; transport failures close the
    /// session; everything else is reported to the client only.
    async fn report(&mut self, error: SessionError) {
        if error.is_fatal() {
            warn!(session_id = %self.id, error = %error, "transport failure, closing session");
            self.close().await;
            return;
        }
        warn!(session_id = %self.id, error = %error, "session error");
        if matches!(
            error,
            SessionError::CollaboratorFailure { .. } | SessionError::Backpressure
        ) {
            self.context.append(TurnRole::SystemError, Some(error.to_string()));
        }
        self.emit(ServerMessage::Error {
            text: error.to_string(),
        })
        .await;
    }

    /// Queue a frame for the sender task. A closed outbound channel means
    /// the transport is gone, which closes the session.
    async fn emit(&mut self, message: ServerMessage) {
        if self.is_closed() {
            return;
        }
        if self.outbound.send(MessageRoute::Outgoing(message)).await.is_err() {
            warn!(session_id = %self.id, "outbound channel closed, closing session");
            self.close().await;
        }
    }
}
