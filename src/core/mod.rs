pub mod context;
pub mod llm;
pub mod reconcile;
pub mod stt;
pub mod tts;
pub mod vision;

// Re-export commonly used types for convenience
pub use context::{ConversationContext, ConversationTurn, HISTORY_WINDOW, TurnRole};

pub use reconcile::{Reconciliation, TranscriptReconciler};

pub use stt::{
    DeepgramSTT, STTConfig, STTError, STTResult, SpeechToText, TranscriptFragment,
    TranscriptionStream,
};

pub use llm::{GeminiLLM, LLMError, LLMResult, LanguageModel};

pub use tts::{ElevenLabsTTS, SpeechSynthesizer, TTSConfig, TTSError, TTSResult};

pub use vision::{
    DataUrl, GeminiVision, ImageSource, VisionAnalyzer, VisionError, VisionResult,
};
