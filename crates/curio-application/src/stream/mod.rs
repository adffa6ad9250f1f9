//! Streaming exchange: decoding a chunk stream and pacing its display.

mod decoder;
mod renderer;

pub use decoder::{COMMENT_PREFIX, DATA_PREFIX, DONE_SENTINEL, EVENT_PREFIX, StreamDecoder};
pub use renderer::TypingRenderer;

use curio_core::config::TypingSettings;
use curio_core::conversation::ChunkStream;
use curio_core::error::CurioError;
use futures::StreamExt;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Transient state of one network exchange. Never persisted.
#[derive(Debug)]
pub struct StreamState {
    decoder: StreamDecoder,
    renderer: TypingRenderer,
    closed: bool,
}

impl StreamState {
    pub fn new(batch_size: usize) -> Self {
        Self {
            decoder: StreamDecoder::new(),
            renderer: TypingRenderer::new(batch_size),
            closed: false,
        }
    }

    /// Decodes a chunk and hands any completed content to the renderer.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        let delta = self.decoder.push(chunk);
        self.renderer.extend(&delta);
    }

    /// Marks the end of input and flushes the trailing partial line.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let delta = self.decoder.flush();
        self.renderer.extend(&delta);
    }

    pub fn tick(&mut self) -> Option<&str> {
        self.renderer.tick()
    }

    pub fn reveal_all(&mut self) -> Option<&str> {
        self.renderer.reveal_all()
    }

    pub fn committed(&self) -> &str {
        self.renderer.committed()
    }

    pub fn displayed(&self) -> &str {
        self.renderer.displayed()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Input has ended and every committed character is on screen.
    pub fn is_finished(&self) -> bool {
        self.closed && self.renderer.is_converged()
    }

    /// Consumes the state, yielding the trimmed message text.
    pub fn into_message(self) -> Option<String> {
        self.decoder.message_text()
    }
}

/// What a finished exchange produced.
#[derive(Debug)]
pub struct ExchangeOutcome {
    /// Trimmed message text, `None` when nothing but whitespace arrived.
    pub text: Option<String>,
    /// Mid-stream failure or cancellation. `text` still holds the partial result.
    pub error: Option<CurioError>,
    pub chunk_count: usize,
}

/// Reads `stream` to the end while revealing its text at the typing pace.
///
/// `on_display` receives every newly revealed slice in order. Returns only
/// after the display has caught up with everything decoded. A read error
/// ends input early but the committed text still converges; cancellation
/// ends input and reveals the rest at once.
pub async fn run_exchange<F>(
    mut stream: ChunkStream,
    typing: &TypingSettings,
    cancel: &CancellationToken,
    mut on_display: F,
) -> ExchangeOutcome
where
    F: FnMut(&str),
{
    let mut state = StreamState::new(typing.effective_batch_size());
    let mut ticker = tokio::time::interval(typing.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut error = None;
    let mut chunk_count = 0usize;

    while !state.is_finished() {
        tokio::select! {
            biased;

            _ = cancel.cancelled(), if !state.is_closed() => {
                tracing::debug!(chunk_count, "exchange cancelled");
                error = Some(CurioError::stream("exchange cancelled"));
                state.close();
                if let Some(rest) = state.reveal_all() {
                    on_display(rest);
                }
            }
            item = stream.next(), if !state.is_closed() => match item {
                Some(Ok(chunk)) => {
                    chunk_count += 1;
                    state.push_chunk(&chunk);
                }
                Some(Err(err)) => {
                    tracing::warn!(chunk_count, error = %err, "stream read failed, keeping partial text");
                    error = Some(err);
                    state.close();
                }
                None => {
                    tracing::debug!(chunk_count, "stream ended");
                    state.close();
                }
            },
            _ = ticker.tick() => {
                if let Some(revealed) = state.tick() {
                    on_display(revealed);
                }
            }
        }
    }

    ExchangeOutcome {
        text: state.into_message(),
        error,
        chunk_count,
    }
}
