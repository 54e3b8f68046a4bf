use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream};

use crate::domain::EventMessage;
use crate::interfaces::http::state::AppState;

fn to_sse(msg: &EventMessage) -> Result<Event, axum::Error> {
    Event::default()
        .id(msg.id.clone())
        .event(msg.event.event_type())
        .json_data(msg)
}

/// `GET /api/v1/events`: one SSE event per notification, named by its type
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    responses(
        (status = 200, description = "Stream of sessionStarted, sessionEnded, timerWarning, timerExpired and costLimitReached events", body = String, content_type = "text/event-stream")
    )
)]
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscriber = state.event_bus.subscribe();
    let events = stream::unfold(subscriber, |mut subscriber| async move {
        let msg = subscriber.recv().await?;
        Some((to_sse(&msg), subscriber))
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
