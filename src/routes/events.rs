// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-Sent Events stream of the caller's change feed.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Extension, Router,
};
use futures_util::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use crate::middleware::auth::AuthUser;
use crate::routes::api::NotificationResponse;
use crate::services::{SessionState, UserEvent};
use crate::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/events", get(events))
}

/// One SSE message per change; views re-fetch what the event names.
fn to_sse(event: UserEvent) -> Event {
    let name = event.name();
    match event {
        UserEvent::NotificationAdded(notification) => {
            let body = NotificationResponse::from(notification);
            Event::default()
                .event(name)
                .json_data(&body)
                .unwrap_or_else(|_| Event::default().event(name))
        }
        _ => Event::default().event(name).data(name),
    }
}

async fn events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(uid = %user.uid, "Event stream opened");

    // A new receiver has already seen the current state, so only a
    // sign-out after the stream opened ends it
    let mut session = state.session.subscribe(&user.uid);
    let uid = user.uid.clone();
    let signed_out = async move {
        while session.changed().await.is_ok() {
            if matches!(*session.borrow_and_update(), SessionState::SignedOut) {
                break;
            }
        }
        tracing::debug!(uid = %uid, "Event stream closed by sign-out");
    };

    let subscription = state.feed.subscribe(&user.uid);
    let stream = stream::unfold(subscription, |mut sub| async move {
        let event = sub.next().await?;
        Some((Ok(to_sse(event)), sub))
    })
    .take_until(signed_out);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}
