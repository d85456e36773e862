//! Server-sent event transport for generation runs.
//!
//! Each run executes on its own task and reports through an event channel;
//! this module turns the receiving end into `data: <json>` frames. When the
//! client goes away the response stream is dropped, which aborts the run.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use sitesmith_core::swarm::{channel, PipelineEvent, PipelineRequest, PipelineStage, RunKind};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::AbortHandle;

use crate::SharedState;

/// Aborts the run task when the response stream is dropped.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if !self.0.is_finished() {
            tracing::info!("Client disconnected, aborting generation");
            self.0.abort();
        }
    }
}

struct StreamState {
    events: UnboundedReceiver<PipelineEvent>,
    _run: AbortOnDrop,
    finished: bool,
}

/// One SSE frame.
pub fn frame(event: &PipelineEvent) -> Event {
    Event::default().data(event.to_wire().to_string())
}

/// Start `request` and stream its events.
pub fn stream_run(
    state: SharedState,
    kind: RunKind,
    request: PipelineRequest,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (mut sink, events) = channel();
    let task = tokio::spawn(async move {
        // Outcome is already reported through the sink
        let _ = state.coordinator.execute(kind, request, &mut sink).await;
    });

    let initial = StreamState {
        events,
        _run: AbortOnDrop(task.abort_handle()),
        finished: false,
    };
    let stream = stream::unfold(initial, |mut st| async move {
        if st.finished {
            return None;
        }
        let event = match st.events.recv().await {
            Some(event) => event,
            // Run task ended without a terminal event (panic)
            None => PipelineEvent::Error {
                stage: PipelineStage::Failed,
                message: "Generation ended unexpectedly".to_string(),
            },
        };
        st.finished = event.is_terminal();
        Some((Ok(frame(&event)), st))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
