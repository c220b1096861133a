use crate::server::AppContext;
use crate::state::HoleEvent;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use fairway_common::HoleId;
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

pub fn sse_routes() -> Router<AppContext> {
    Router::new().route("/holes/:hole_id/events", get(hole_events_handler))
}

/// Live updates for one hole's image grid and processing banner.
pub async fn hole_events_handler(
    State(ctx): State<AppContext>,
    Path(hole_id): Path<HoleId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = ctx.events.subscribe();

    // Lagged receivers skip the missed events rather than closing the stream.
    let stream = BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .filter(move |event: &HoleEvent| event.hole_id() == hole_id)
        .map(|event: HoleEvent| {
            let data = event.to_json().unwrap_or_else(|e| {
                format!(r#"{{"error": "serialization failed: {}"}}"#, e)
            });
            Ok(Event::default().data(data))
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
