use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use other_word::constants::TICK_MS;
use other_word::engine::GameEngine;
use other_word::score_store::JsonScoreStore;
use other_word::server_protocol::{parse_client_message, ParsedClientMessage};
use other_word::server_utils::{
    is_supported_room, may_resume, parse_port, sanitize_name, sanitize_participant_id,
};
use other_word::types::{Action, GameConfig};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
    participant_id: Option<String>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    active_client_by_participant: HashMap<String, String>,
    reconnect_tokens: HashMap<String, String>,
    engine: GameEngine,
}

impl ServerState {
    fn new(engine: GameEngine) -> Self {
        Self {
            clients: HashMap::new(),
            active_client_by_participant: HashMap::new(),
            reconnect_tokens: HashMap::new(),
            engine,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScoreQuery {
    id: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("other_word=debug,server=debug,tower_http=info")),
        )
        .init();

    let port = parse_port(std::env::var("PORT").ok().as_deref(), 8080);
    let score_path = std::env::var("SCORE_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".data/scores.json"));

    let session_seed: u32 = rand::rng().random();
    tracing::info!(path = %score_path.display(), session_seed, "loading score store");
    let engine = GameEngine::new(
        session_seed,
        GameConfig::default(),
        Box::new(JsonScoreStore::new(score_path)),
    );

    let state = Arc::new(Mutex::new(ServerState::new(engine)));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/scores", get(scores_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    tracing::info!("listening on :{port}");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn scores_handler(
    State(state): State<SharedState>,
    Query(query): Query<ScoreQuery>,
) -> impl IntoResponse {
    let Some(id) = sanitize_participant_id(query.id.as_deref()) else {
        return Json(json!({ "ok": false, "message": "invalid id" }));
    };
    let guard = state.lock().await;
    let totals = guard.engine.store().load(&id).unwrap_or_default();
    Json(json!({ "ok": true, "participantId": id, "score": totals }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        guard.clients.insert(
            client_id.clone(),
            ClientContext {
                tx: tx.clone(),
                participant_id: None,
            },
        );
    }
    tracing::debug!(client = %client_id, "socket opened");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(state.clone(), &client_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(state.clone(), &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    handle_disconnect(state, &client_id).await;
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        send_error_to_client(&state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    match message {
        ParsedClientMessage::Hello {
            name,
            participant_id,
            reconnect_token,
            room_id,
        } => handle_hello(
            &mut guard,
            client_id,
            &name,
            participant_id,
            reconnect_token,
            room_id,
        ),
        ParsedClientMessage::Action(action) => handle_action(&mut guard, client_id, action),
        ParsedClientMessage::Ping { t } => {
            send_to_client(
                &mut guard,
                client_id,
                &json!({
                    "type": "pong",
                    "t": t,
                    "serverTime": Utc::now().timestamp_millis(),
                }),
                QueuePolicy::DropOnFull,
            );
        }
    }
}

fn handle_hello(
    state: &mut ServerState,
    client_id: &str,
    name: &str,
    requested_id: Option<String>,
    reconnect_token: Option<String>,
    room_id: Option<String>,
) {
    if !is_supported_room(room_id.as_deref()) {
        send_error(state, client_id, "unknown room");
        return;
    }
    let participant_id = sanitize_participant_id(requested_id.as_deref())
        .or_else(|| {
            reconnect_token
                .as_deref()
                .and_then(|token| find_participant_by_token(state, token))
        })
        .unwrap_or_else(make_guest_id);
    let name = sanitize_name(name);

    let already_seated = state.engine.state().participant(&participant_id).is_some();
    if already_seated {
        let issued = state.reconnect_tokens.get(&participant_id).map(String::as_str);
        if !may_resume(issued, reconnect_token.as_deref()) {
            tracing::info!(client = %client_id, participant = %participant_id, "reconnect token mismatch");
            send_error(state, client_id, "reconnect token mismatch for this participant");
            return;
        }
    } else {
        if let Err(error) = state.engine.participant_joined(&participant_id, &name) {
            tracing::info!(client = %client_id, participant = %participant_id, %error, "join rejected");
            send_error(state, client_id, &error.to_string());
            return;
        }
        state
            .reconnect_tokens
            .insert(participant_id.clone(), make_reconnect_token());
    }
    let token = state
        .reconnect_tokens
        .get(&participant_id)
        .cloned()
        .unwrap_or_default();

    bind_client_to_participant(state, client_id, &participant_id);
    send_to_client(
        state,
        client_id,
        &json!({
            "type": "welcome",
            "participantId": participant_id,
            "reconnectToken": token,
            "resumed": already_seated,
        }),
        QueuePolicy::DisconnectOnFull,
    );
    broadcast_state(state, QueuePolicy::DisconnectOnFull);
}

fn handle_action(state: &mut ServerState, client_id: &str, action: Action) {
    let Some(participant_id) = bound_participant(state, client_id) else {
        send_error(state, client_id, "hello required");
        return;
    };
    match state.engine.apply(&participant_id, action) {
        Ok(()) => broadcast_state(state, QueuePolicy::DisconnectOnFull),
        Err(error) => send_error(state, client_id, &error.to_string()),
    }
}

async fn handle_disconnect(state: SharedState, client_id: &str) {
    let mut guard = state.lock().await;
    disconnect_client_internal(&mut guard, client_id, true);
}

fn disconnect_client_internal(state: &mut ServerState, client_id: &str, broadcast_after: bool) {
    let Some(context) = state.clients.remove(client_id) else {
        return;
    };
    let Some(participant_id) = context.participant_id else {
        return;
    };
    if state
        .active_client_by_participant
        .get(&participant_id)
        .map(|active| active != client_id)
        .unwrap_or(true)
    {
        return;
    }
    state.active_client_by_participant.remove(&participant_id);
    state.reconnect_tokens.remove(&participant_id);
    state.engine.participant_left(&participant_id);
    tracing::debug!(client = %client_id, participant = %participant_id, "socket closed");

    if broadcast_after {
        broadcast_state(state, QueuePolicy::DisconnectOnFull);
    }
}

fn bound_participant(state: &ServerState, client_id: &str) -> Option<String> {
    let participant_id = state.clients.get(client_id)?.participant_id.clone()?;
    let active = state.active_client_by_participant.get(&participant_id)?;
    (active == client_id).then_some(participant_id)
}

fn bind_client_to_participant(state: &mut ServerState, client_id: &str, participant_id: &str) {
    if let Some(old_client_id) = state
        .active_client_by_participant
        .get(participant_id)
        .cloned()
    {
        if old_client_id != client_id {
            if let Some(old_client) = state.clients.get_mut(&old_client_id) {
                old_client.participant_id = None;
                let _ = old_client.tx.try_send(OutboundMessage::Close {
                    code: 4001,
                    reason: "superseded by new connection".to_string(),
                });
            }
        }
    }

    if let Some(ctx) = state.clients.get_mut(client_id) {
        ctx.participant_id = Some(participant_id.to_string());
    }
    state
        .active_client_by_participant
        .insert(participant_id.to_string(), client_id.to_string());
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_game(&mut guard);
        }
    });
}

/// The clock runs in the lobby too so reaction cooldowns expire.
fn tick_game(state: &mut ServerState) {
    state.engine.step(TICK_MS);
    if !state.engine.state().game_started {
        return;
    }
    broadcast_state(state, QueuePolicy::DropOnFull);

    if !state.engine.is_ended() {
        return;
    }
    if let Some(summary) = state.engine.build_summary() {
        broadcast(
            state,
            &json!({
                "type": "game_over",
                "summary": summary,
            }),
            QueuePolicy::DisconnectOnFull,
        );
    }
    state.engine.reset_to_lobby();
    broadcast_state(state, QueuePolicy::DisconnectOnFull);
}

/// Each participant gets their own redacted view of the authoritative state.
fn broadcast_state(state: &mut ServerState, policy: QueuePolicy) {
    let snapshot = state.engine.build_snapshot();
    let recipients: Vec<(String, String)> = state
        .active_client_by_participant
        .iter()
        .map(|(participant_id, client_id)| (participant_id.clone(), client_id.clone()))
        .collect();
    for (participant_id, client_id) in recipients {
        let view = snapshot.clone().redacted_for(&participant_id);
        send_to_client(
            state,
            &client_id,
            &json!({
                "type": "state",
                "snapshot": view,
            }),
            policy,
        );
    }
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        disconnect_client_internal(state, client_id, false);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let client_ids: Vec<String> = state.active_client_by_participant.values().cloned().collect();
    for client_id in client_ids {
        send_to_client(state, &client_id, message, policy);
    }
}

fn send_error(state: &mut ServerState, client_id: &str, message: &str) {
    send_to_client(
        state,
        client_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DropOnFull,
    );
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_error(&mut guard, client_id, message);
}

fn find_participant_by_token(state: &ServerState, token: &str) -> Option<String> {
    state
        .reconnect_tokens
        .iter()
        .find(|(_, issued)| may_resume(Some(issued.as_str()), Some(token)))
        .map(|(participant_id, _)| participant_id.clone())
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

fn make_reconnect_token() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

fn make_guest_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("guest_{suffix}")
}
