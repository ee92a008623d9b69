//! Streaming answers over WebSocket
//!
//! Protocol:
//! → Client sends: {"type":"ask","query":"...","session_id":"s1"}
//! → Client sends: {"type":"cancel","session_id":"s1"}
//! ← Server sends: {"event":"stream_contexts","session_id":"s1","contexts":[...]}
//! ← Server sends: {"event":"stream_start","session_id":"s1","status":"generating"}
//! ← Server sends: {"event":"stream_token","session_id":"s1","token":"..."}
//! ← Server sends: {"event":"stream_end","session_id":"s1","status":"completed","full_answer":"..."}
//!   or {"event":"stream_error","session_id":"s1","error":"..."}

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedSender};
use uuid::Uuid;

use crate::generation::{ollama::EMPTY_ANSWER, CancelFlag};
use crate::retrieval::Retrieval;
use crate::server::state::AppState;
use crate::types::{StreamCommand, StreamEvent};

/// Error reported when a session is cancelled before it completes
pub const CANCELLED: &str = "cancelled";

/// GET /ws - WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection.
///
/// Each ask runs in its own task so a cancel message can arrive while tokens
/// are still being produced. All events go through one writer task.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    tracing::info!("WebSocket client connected ({})", connection_id);

    let (mut sink, mut incoming) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<StreamEvent>();

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to serialize stream event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Sessions started on this connection, keyed in the shared registry by connection
    let mut owned: Vec<(String, CancelFlag)> = Vec::new();

    while let Some(message) = incoming.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("WebSocket receive error ({}): {}", connection_id, e);
                break;
            }
        };

        let command = match serde_json::from_str::<StreamCommand>(&text) {
            Ok(command) => command,
            Err(e) => {
                let _ = tx.send(StreamEvent::error(None, format!("Invalid message: {}", e)));
                continue;
            }
        };

        match command {
            StreamCommand::Ask { query, session_id } => {
                let query = match state.validate_query(query) {
                    Ok(query) => query,
                    Err(e) => {
                        let _ = tx.send(StreamEvent::error(Some(&session_id), e.to_string()));
                        continue;
                    }
                };

                let key = session_key(&connection_id, &session_id);
                let cancel = state.register_session(&key);
                retain_live(&state, &mut owned);
                owned.push((key.clone(), cancel.clone()));

                tracing::info!("Streaming query for session {}: \"{}\"", session_id, query);

                let state = state.clone();
                let events = tx.clone();
                tokio::spawn(async move {
                    stream_answer(&state, &query, &session_id, &cancel, &events).await;
                    state.finish_session(&key, &cancel);
                });
            }
            StreamCommand::Cancel { session_id } => {
                let key = session_key(&connection_id, &session_id);
                if !state.cancel_session(&key) {
                    tracing::debug!("Cancel for unknown session {}", session_id);
                }
            }
        }
    }

    for (key, flag) in owned {
        flag.cancel();
        state.finish_session(&key, &flag);
    }
    drop(tx);
    writer.abort();

    tracing::info!("WebSocket client disconnected ({})", connection_id);
}

/// Drop sessions that finished or were cancelled
fn retain_live(state: &AppState, owned: &mut Vec<(String, CancelFlag)>) {
    owned.retain(|(key, flag)| state.is_session_live(key, flag));
}

fn session_key(connection_id: &Uuid, session_id: &str) -> String {
    format!("{}:{}", connection_id, session_id)
}

/// Run one streamed answer, pushing events for `session_id` into `events`.
///
/// Emits contexts, start, zero or more tokens, then exactly one terminal
/// event. Stops early when the receiver is gone or `cancel` is set; the
/// flag is checked between tokens.
pub async fn stream_answer(
    state: &AppState,
    query: &str,
    session_id: &str,
    cancel: &CancelFlag,
    events: &UnboundedSender<StreamEvent>,
) {
    let emit = |event: StreamEvent| events.send(event).is_ok();

    let top_k = state.config().retrieval.top_k;
    let contexts = match state.retriever().retrieve(query, top_k).await {
        Retrieval::Failed(reason) => {
            emit(StreamEvent::error(
                Some(session_id),
                format!("Failed to retrieve context: {}", reason),
            ));
            return;
        }
        retrieval => retrieval.into_contexts(),
    };

    if !emit(StreamEvent::StreamContexts {
        session_id: session_id.to_string(),
        contexts: contexts.clone(),
    }) {
        return;
    }
    if !emit(StreamEvent::start(session_id)) {
        return;
    }

    let mut tokens = match state.generator().generate_stream(query, &contexts).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!("Streaming generation failed for {}: {}", session_id, e);
            emit(StreamEvent::error(Some(session_id), e.to_string()));
            return;
        }
    };

    let mut full_answer = String::new();
    loop {
        if cancel.is_cancelled() {
            tracing::info!("Session {} cancelled", session_id);
            emit(StreamEvent::error(Some(session_id), CANCELLED));
            return;
        }

        match tokens.next().await {
            Some(Ok(token)) => {
                if token.is_empty() {
                    continue;
                }
                full_answer.push_str(&token);
                if !emit(StreamEvent::token(session_id, token)) {
                    return;
                }
            }
            Some(Err(e)) => {
                tracing::error!("Token stream failed for {}: {}", session_id, e);
                emit(StreamEvent::error(Some(session_id), e.to_string()));
                return;
            }
            None => break,
        }
    }

    let full_answer = match full_answer.trim() {
        "" => EMPTY_ANSWER.to_string(),
        answer => answer.to_string(),
    };
    emit(StreamEvent::end(session_id, full_answer));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RagConfig;
    use crate::error::Result;
    use crate::generation::{AnswerGenerator, TokenStream};
    use crate::retrieval::knowledge::tests::FixedEmbedder;
    use crate::types::response::ServiceStatus;
    use crate::types::Chunk;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::Arc;

    /// Generator replaying a fixed token script
    struct ScriptedGenerator {
        tokens: Vec<&'static str>,
    }

    #[async_trait]
    impl AnswerGenerator for ScriptedGenerator {
        async fn generate(&self, _question: &str, _contexts: &[String]) -> Result<String> {
            Ok(self.tokens.concat())
        }

        async fn generate_stream(&self, _question: &str, _contexts: &[String]) -> Result<TokenStream> {
            let tokens: Vec<Result<String>> =
                self.tokens.iter().map(|t| Ok(t.to_string())).collect();
            Ok(stream::iter(tokens).boxed())
        }

        async fn health_check(&self) -> ServiceStatus {
            ServiceStatus::Connected
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    async fn state_with(tokens: Vec<&'static str>) -> AppState {
        let embedder = Arc::new(FixedEmbedder::new(&[
            ("Paris is in France.", vec![1.0, 0.0]),
            ("Where is Paris?", vec![0.9, 0.1]),
        ]));
        let state = AppState::new(
            RagConfig::default(),
            embedder,
            Arc::new(ScriptedGenerator { tokens }),
        )
        .unwrap();
        state
            .knowledge()
            .index_chunks(vec![Chunk::new("Paris is in France.", "geo.txt", 0)])
            .await
            .unwrap();
        state
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let state = state_with(vec!["In ", "France."]).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        stream_answer(&state, "Where is Paris?", "s1", &CancelFlag::new(), &tx).await;
        let events = drain(&mut rx);

        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            StreamEvent::StreamContexts {
                session_id: "s1".into(),
                contexts: vec!["Paris is in France.".into()],
            }
        );
        assert_eq!(events[1], StreamEvent::start("s1"));
        assert_eq!(events[2], StreamEvent::token("s1", "In "));
        assert_eq!(events[3], StreamEvent::token("s1", "France."));
        assert_eq!(events[4], StreamEvent::end("s1", "In France."));
    }

    #[tokio::test]
    async fn test_cancelled_session_ends_with_error() {
        let state = state_with(vec!["never", "sent"]).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancelFlag::new();
        cancel.cancel();

        stream_answer(&state, "Where is Paris?", "s2", &cancel, &tx).await;
        let events = drain(&mut rx);

        assert!(!events
            .iter()
            .any(|e| matches!(e, StreamEvent::StreamToken { .. })));
        assert_eq!(
            events.last(),
            Some(&StreamEvent::error(Some("s2"), CANCELLED))
        );
    }

    #[tokio::test]
    async fn test_empty_generation_gets_fallback_answer() {
        let state = state_with(vec!["", "  "]).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        stream_answer(&state, "Where is Paris?", "s3", &CancelFlag::new(), &tx).await;
        let events = drain(&mut rx);

        assert_eq!(events.last(), Some(&StreamEvent::end("s3", EMPTY_ANSWER)));
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_single_error() {
        let state = state_with(vec!["x"]).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        // No vector is known for this query text
        stream_answer(&state, "unknown question", "s4", &CancelFlag::new(), &tx).await;
        let events = drain(&mut rx);

        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
    }

    #[tokio::test]
    async fn test_finished_sessions_are_pruned() {
        let state = state_with(vec!["x"]).await;
        let mut owned: Vec<(String, CancelFlag)> = ["a", "b", "c"]
            .iter()
            .map(|id| (id.to_string(), state.register_session(id)))
            .collect();

        state.finish_session("a", &owned[0].1);
        owned[1].1.cancel();
        retain_live(&state, &mut owned);

        let remaining: Vec<&str> = owned.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(remaining, vec!["c"]);

        // Reusing an id replaces the older session
        let newer = state.register_session("c");
        retain_live(&state, &mut owned);
        assert!(owned.is_empty());
        assert!(state.is_session_live("c", &newer));
    }

    #[test]
    fn test_session_keys_are_scoped_per_connection() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(session_key(&a, "default"), session_key(&b, "default"));
    }
}
