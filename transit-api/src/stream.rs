use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::stream::Stream;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::extract::AppPath;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/assignments/{assignment_id}/stream", get(seat_stream))
}

/// GET /v1/assignments/{assignment_id}/stream
///
/// Live seat events for one assignment. Slow consumers that fall behind the
/// channel skip the missed events; clients re-read occupancy on reconnect.
async fn seat_stream(
    State(state): State<AppState>,
    AppPath(assignment_id): AppPath<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sse_tx.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.assignment_id == assignment_id => {
            match Event::default().event(event.kind.event_name()).json_data(&event) {
                Ok(sse) => Some(Ok(sse)),
                Err(e) => {
                    tracing::warn!("Dropping unserializable seat event: {}", e);
                    None
                }
            }
        }
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Seat stream for {} lagged: {}", assignment_id, e);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
