// rest/sse.rs — progress events as Server-Sent Events.
//
// GET /api/v1/events
//
// The GUI subscribes once and receives every pipeline progress event as
// it happens. A slow consumer that lags the broadcast channel is dropped
// rather than back-pressuring the pipeline.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures_util::stream;
use tokio::sync::broadcast::error::RecvError;

use super::ServerState;

pub async fn progress_events_sse(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let rx = state.progress.subscribe();

    let s = stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let data = match serde_json::to_string(&event) {
                        Ok(d) => d,
                        Err(_) => continue,
                    };
                    let sse_event = Event::default().event("progress").data(data);
                    return Some((Ok::<Event, std::convert::Infallible>(sse_event), rx));
                }
                // Lagged: skip to the live edge instead of closing.
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(s).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
