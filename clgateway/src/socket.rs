//! Component I: the per-connection websocket loop. One task per connection
//! reads client frames and dispatches them against the lobby the connection
//! currently belongs to, while a second future forwards that lobby's
//! broadcast events (plus this song cache's download events) back out.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;
use clmetadata::PlaylistItem;
use cllobby::{ChatSendError, LobbyEvent, LobbyHandle, NewSong, Song, User, UserMode};
use clsongcache::DownloadEvent;
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::gateway::Gateway;
use crate::protocol::*;

pub async fn ws_handler(ws: WebSocketUpgrade, State(gateway): State<Arc<Gateway>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, gateway))
}

struct Connection {
    conn_id: String,
    username: String,
    emoji: Option<String>,
    mode: UserMode,
    lobby: Option<Arc<LobbyHandle>>,
}

async fn handle_socket(socket: WebSocket, gateway: Arc<Gateway>) {
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut conn = Connection {
        conn_id: Uuid::new_v4().to_string(),
        username: String::new(),
        emoji: None,
        mode: UserMode::Listening,
        lobby: None,
    };
    let mut lobby_events: Option<broadcast::Receiver<LobbyEvent>> = None;
    let mut downloads = gateway.songs.subscribe();

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(&gateway, &mut conn, &mut lobby_events, &out_tx, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("websocket read error: {e}");
                        break;
                    }
                }
            }
            event = recv_lobby_event(&mut lobby_events) => {
                match event {
                    Some(Ok(event)) => forward_lobby_event(&conn, &out_tx, event),
                    Some(Err(broadcast::error::RecvError::Lagged(n))) => {
                        warn!("connection {} lagged {n} lobby events", conn.conn_id);
                    }
                    Some(Err(broadcast::error::RecvError::Closed)) | None => {
                        lobby_events = None;
                    }
                }
            }
            event = downloads.recv() => {
                if let Ok(event) = event {
                    forward_download_event(&conn, &out_tx, &event);
                }
            }
        }
    }

    if let Some(lobby) = conn.lobby.take() {
        gateway.lobbies.leave_lobby(&lobby.id(), &conn.conn_id);
    }
    writer.abort();
}

async fn recv_lobby_event(
    rx: &mut Option<broadcast::Receiver<LobbyEvent>>,
) -> Option<Result<LobbyEvent, broadcast::error::RecvError>> {
    match rx {
        Some(rx) => Some(rx.recv().await),
        None => std::future::pending().await,
    }
}

fn forward_lobby_event(conn: &Connection, out_tx: &mpsc::UnboundedSender<String>, event: LobbyEvent) {
    let frame = match event {
        LobbyEvent::QueueUpdated { lobby_id, songs } => Some(encode(
            "queue:update",
            serde_json::json!({ "lobbyId": lobby_id, "songs": songs.iter().map(SongDto::from).collect::<Vec<_>>() }),
        )),
        LobbyEvent::PlaybackSync(payload) => Some(encode("playback:sync", SyncDto::from(&payload))),
        LobbyEvent::ForceSync { to_conn_id, payload } => {
            if to_conn_id == conn.conn_id {
                Some(encode("playback:forceSync", SyncDto::from(&payload)))
            } else {
                None
            }
        }
        LobbyEvent::TrackEnded { lobby_id, ended_track, repeat_mode } => Some(encode(
            "playback:trackEnded",
            serde_json::json!({
                "lobbyId": lobby_id,
                "endedTrack": ended_track.as_ref().map(SongDto::from),
                "repeatMode": repeat_mode,
            }),
        )),
        LobbyEvent::ShuffleChanged { lobby_id, shuffle_enabled } => Some(encode(
            "playback:shuffle",
            serde_json::json!({ "lobbyId": lobby_id, "shuffleEnabled": shuffle_enabled }),
        )),
        LobbyEvent::UserJoined { lobby_id, user } => Some(encode(
            "lobby:user-joined",
            serde_json::json!({ "lobbyId": lobby_id, "user": UserDto::from(&user) }),
        )),
        LobbyEvent::UserLeft { lobby_id, conn_id } => Some(encode(
            "user-left",
            serde_json::json!({ "lobbyId": lobby_id, "connId": conn_id }),
        )),
        LobbyEvent::UsersUpdated { lobby_id, users } => Some(encode(
            "users:updated",
            serde_json::json!({ "lobbyId": lobby_id, "users": users.iter().map(UserDto::from).collect::<Vec<_>>() }),
        )),
        LobbyEvent::ModeChanged { lobby_id, conn_id, mode } => Some(encode(
            "mode:changed",
            serde_json::json!({ "lobbyId": lobby_id, "connId": conn_id, "mode": mode }),
        )),
        LobbyEvent::LobbyRenamed { lobby_id, name } => Some(encode(
            "lobby:renamed",
            serde_json::json!({ "lobbyId": lobby_id, "name": name }),
        )),
        LobbyEvent::LobbyClosed { lobby_id, message } => Some(encode(
            "lobby:closed",
            serde_json::json!({ "lobbyId": lobby_id, "message": message }),
        )),
        LobbyEvent::Chat { lobby_id, message } => Some(encode(
            "chat:message",
            serde_json::json!({ "lobbyId": lobby_id, "message": ChatMessageDto::from(&message) }),
        )),
    };
    if let Some(frame) = frame {
        let _ = out_tx.send(frame);
    }
}

fn forward_download_event(conn: &Connection, out_tx: &mpsc::UnboundedSender<String>, event: &DownloadEvent) {
    let current_lobby = conn.lobby.as_ref().map(|l| l.id());
    if event.lobby_id.is_some() && event.lobby_id != current_lobby {
        return;
    }
    let frame = encode(
        "download:status",
        serde_json::json!({
            "url": event.url,
            "songId": event.song_id,
            "status": event.status,
            "percent": event.percent,
            "error": event.error,
        }),
    );
    let _ = out_tx.send(frame);
}

async fn dispatch(
    gateway: &Arc<Gateway>,
    conn: &mut Connection,
    lobby_events: &mut Option<broadcast::Receiver<LobbyEvent>>,
    out_tx: &mpsc::UnboundedSender<String>,
    text: &str,
) {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            let _ = out_tx.send(lobby_error(format!("malformed message: {e}")));
            return;
        }
    };
    let send = |frame: String| {
        let _ = out_tx.send(frame);
    };

    match envelope.event.as_str() {
        "lobby:create" => {
            let Ok(payload) = serde_json::from_value::<LobbyCreate>(envelope.data) else { return };
            conn.username = payload.username.clone();
            conn.emoji = payload.emoji.clone();
            match gateway.lobbies.create_lobby(
                Some(conn.conn_id.clone()),
                None,
                payload.listening_mode.unwrap_or(cllobby::ListeningMode::Synchronized),
                payload.name,
            ) {
                Ok(handle) => {
                    *lobby_events = Some(handle.subscribe());
                    handle.add_user(User::new(conn.conn_id.clone(), payload.username, payload.emoji));
                    send(encode(
                        "lobby:created",
                        serde_json::json!({ "id": handle.id(), "name": handle.name(), "listeningMode": handle.listening_mode() }),
                    ));
                    conn.lobby = Some(handle);
                }
                Err(e) => send(lobby_error(e.to_string())),
            }
        }
        "lobby:join" => {
            let Ok(payload) = serde_json::from_value::<LobbyJoin>(envelope.data) else { return };
            if let Some(current) = conn.lobby.take() {
                gateway.lobbies.leave_lobby(&current.id(), &conn.conn_id);
            }
            conn.username = payload.username.clone();
            conn.emoji = payload.emoji.clone();
            let handle = gateway.lobbies.join_lobby(
                &payload.lobby_id,
                User::new(conn.conn_id.clone(), payload.username, payload.emoji),
            );
            *lobby_events = Some(handle.subscribe());
            let synchronized = handle.listening_mode() == cllobby::ListeningMode::Synchronized;
            let playback = synchronized.then(|| {
                let snap = handle.playback_snapshot();
                serde_json::json!({
                    "track": snap.current_track.as_ref().map(SongDto::from),
                    "position": snap.position,
                    "isPlaying": snap.is_playing,
                    "repeatMode": snap.repeat_mode,
                })
            });
            send(encode(
                "lobby:joined",
                serde_json::json!({
                    "id": handle.id(),
                    "name": handle.name(),
                    "listeningMode": handle.listening_mode(),
                    "users": handle.snapshot_users().iter().map(UserDto::from).collect::<Vec<_>>(),
                    "queue": handle.songs().iter().map(SongDto::from).collect::<Vec<_>>(),
                    "playback": playback,
                    "shuffleEnabled": handle.playback_snapshot().shuffle_enabled,
                }),
            ));
            conn.lobby = Some(handle);
        }
        "lobby:leave" => {
            let Ok(payload) = serde_json::from_value::<LobbyLeave>(envelope.data) else { return };
            gateway.lobbies.leave_lobby(&payload.lobby_id, &conn.conn_id);
            conn.lobby = None;
            *lobby_events = None;
        }
        "lobby:rename" => {
            let Ok(payload) = serde_json::from_value::<LobbyRename>(envelope.data) else { return };
            if let Err(e) = gateway.lobbies.rename_lobby(&payload.lobby_id, Some(payload.name)) {
                send(lobby_error(e.to_string()));
            }
        }
        "mode:set" => {
            let Ok(payload) = serde_json::from_value::<ModeSet>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, payload.lobby_id.as_deref()) {
                handle.set_user_mode(&conn.conn_id, payload.mode);
                conn.mode = payload.mode;
            }
        }
        "user:update" => {
            let Ok(payload) = serde_json::from_value::<UserUpdate>(envelope.data) else { return };
            if let Some(username) = &payload.username {
                conn.username = username.clone();
            }
            if let Some(emoji) = &payload.emoji {
                conn.emoji = Some(emoji.clone());
            }
            if let Some(handle) = current_lobby(conn, gateway, payload.lobby_id.as_deref()) {
                handle.update_user(&conn.conn_id, payload.username, payload.emoji.map(Some));
            }
        }
        "queue:add" => handle_queue_add(gateway, conn, out_tx, envelope.data).await,
        "queue:playlist-add" => handle_playlist_add(gateway, out_tx, envelope.data).await,
        "queue:remove" => {
            let Ok(payload) = serde_json::from_value::<QueueRemove>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                handle.remove_song(&payload.song_id);
            }
        }
        "queue:reorder" => {
            let Ok(payload) = serde_json::from_value::<QueueReorder>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                if !handle.reorder_song(&payload.song_id, payload.new_index) {
                    send(encode("queue:error", LobbyErrorPayload { message: "invalid reorder".into() }));
                }
            }
        }
        "queue:get" => {
            let Some(lobby_id) = lobby_id_of(&envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&lobby_id)) {
                send(encode(
                    "queue:update",
                    serde_json::json!({ "lobbyId": handle.id(), "songs": handle.songs().iter().map(SongDto::from).collect::<Vec<_>>() }),
                ));
            }
        }
        "queue:next" => {
            let Some(lobby_id) = lobby_id_of(&envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&lobby_id)) {
                advance_next(&handle, conn, out_tx);
            }
        }
        "playback:toggle" => {
            let Ok(payload) = serde_json::from_value::<LobbyScoped>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                let snap = handle.playback_snapshot();
                if snap.is_playing {
                    handle.pause();
                } else if snap.current_track.is_none() {
                    if let Some(first) = handle.songs().into_iter().next() {
                        handle.set_track(first, true);
                    }
                } else {
                    handle.resume();
                }
            }
        }
        "playback:next" => {
            let Ok(payload) = serde_json::from_value::<LobbyScoped>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                advance_next(&handle, conn, out_tx);
            }
        }
        "playback:previous" => {
            let Ok(payload) = serde_json::from_value::<LobbyScoped>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                handle.seek(0.0);
                if !handle.playback_snapshot().is_playing {
                    handle.resume();
                }
            }
        }
        "playback:ended" => {
            let Ok(payload) = serde_json::from_value::<PlaybackEnded>(envelope.data) else { return };
            let lobby_id = payload.lobby_id.or_else(|| conn.lobby.as_ref().map(|l| l.id()));
            if let Some(handle) = current_lobby(conn, gateway, lobby_id.as_deref()) {
                let outcome = handle.track_ended();
                if outcome == cllobby::TrackEndedOutcome::Stopped {
                    advance_after_stop(&handle, conn);
                }
            }
        }
        "playback:play" => {
            let Ok(payload) = serde_json::from_value::<PlaybackPlay>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                match payload.track {
                    Some(track) => {
                        let song = Song::new(NewSong {
                            url: track.url,
                            title: track.title,
                            duration: track.duration,
                            added_by: track.added_by,
                            thumbnail: track.thumbnail,
                        });
                        handle.set_track(song, true);
                    }
                    None => {
                        handle.resume();
                    }
                }
            }
        }
        "playback:pause" => {
            let Ok(payload) = serde_json::from_value::<LobbyScoped>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                handle.pause();
            }
        }
        "playback:resume" => {
            let Ok(payload) = serde_json::from_value::<LobbyScoped>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                handle.resume();
            }
        }
        "playback:seek" => {
            let Ok(payload) = serde_json::from_value::<PlaybackSeek>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                handle.seek(payload.position.max(0.0));
            }
        }
        "playback:setRepeat" => {
            let Ok(payload) = serde_json::from_value::<PlaybackSetRepeat>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                handle.set_repeat_mode(payload.mode);
            }
        }
        "playback:shuffle" => {
            let Ok(payload) = serde_json::from_value::<PlaybackShuffle>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                handle.toggle_shuffle(payload.enabled);
            }
        }
        "playback:reportPosition" => {
            let Ok(payload) = serde_json::from_value::<PlaybackReportPosition>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                handle.report_position(&conn.conn_id, payload.client_position);
            }
        }
        "playback:getState" => {
            let Some(lobby_id) = lobby_id_of(&envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&lobby_id)) {
                let snap = handle.playback_snapshot();
                send(encode(
                    "playback:getState:ack",
                    serde_json::json!({
                        "lobbyId": handle.id(),
                        "track": snap.current_track.as_ref().map(SongDto::from),
                        "position": snap.effective_position(Utc::now()),
                        "isPlaying": snap.is_playing,
                        "repeatMode": snap.repeat_mode,
                    }),
                ));
            }
        }
        "playback:getShuffleState" => {
            let Some(lobby_id) = lobby_id_of(&envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&lobby_id)) {
                let snap = handle.playback_snapshot();
                send(encode(
                    "playback:getShuffleState:ack",
                    serde_json::json!({ "lobbyId": handle.id(), "shuffleEnabled": snap.shuffle_enabled }),
                ));
            }
        }
        "chat:send" => {
            let Ok(payload) = serde_json::from_value::<ChatSend>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                match handle.send_chat(&conn.conn_id, &conn.conn_id, &conn.username, conn.emoji.clone(), &payload.content) {
                    Ok(_) => {}
                    Err(ChatSendError::Throttled) => send(encode("chat:throttled", serde_json::json!({}))),
                }
            }
        }
        "chat:history" => {
            let Ok(payload) = serde_json::from_value::<ChatHistory>(envelope.data) else { return };
            if let Some(handle) = current_lobby(conn, gateway, Some(&payload.lobby_id)) {
                let messages = handle.chat_history(payload.limit.unwrap_or(50));
                send(encode(
                    "chat:history",
                    serde_json::json!({
                        "lobbyId": handle.id(),
                        "messages": messages.iter().map(ChatMessageDto::from).collect::<Vec<_>>(),
                    }),
                ));
            }
        }
        other => debug!("unrecognized event: {other}"),
    }
}

/// Resolves the lobby a payload refers to, preferring the explicit id but
/// falling back to the connection's current lobby.
fn current_lobby(conn: &Connection, gateway: &Arc<Gateway>, lobby_id: Option<&str>) -> Option<Arc<LobbyHandle>> {
    match lobby_id {
        Some(id) => gateway.lobbies.get_lobby(id),
        None => conn.lobby.clone(),
    }
}

/// Shared "advance to the next track" logic for `queue:next` and
/// `playback:next`: shuffle mode picks via the shuffle cursor, synchronized
/// mode advances the shared queue head, independent mode advances only the
/// caller's own cursor.
fn advance_next(handle: &Arc<LobbyHandle>, conn: &Connection, out_tx: &mpsc::UnboundedSender<String>) {
    if handle.listening_mode() == cllobby::ListeningMode::Independent {
        if let Some(song) = handle.advance_user_position(&conn.conn_id) {
            let _ = out_tx.send(encode(
                "playback:sync",
                serde_json::json!({
                    "type": "sync",
                    "lobbyId": handle.id(),
                    "track": SongDto::from(&song),
                    "position": 0.0,
                    "isPlaying": true,
                }),
            ));
        }
        return;
    }
    let snap = handle.playback_snapshot();
    if snap.shuffle_enabled && handle.queue_len() >= 2 {
        if let Some(index) = handle.next_shuffle_index() {
            if let Some(song) = handle.song_at(index) {
                handle.set_track(song, true);
            }
        }
        return;
    }
    if let Some(next) = handle.advance_queue() {
        handle.set_track(next, true);
    }
}

/// After a non-repeat-one track end, the gateway (not the playback engine)
/// decides how the queue itself reacts: repeat-all rotates the finished
/// track to the tail, off removes it, and the new head becomes the playing
/// track.
fn advance_after_stop(handle: &Arc<LobbyHandle>, conn: &Connection) {
    if handle.listening_mode() == cllobby::ListeningMode::Independent {
        handle.advance_user_position(&conn.conn_id);
        return;
    }
    let repeat_mode = handle.playback_snapshot().repeat_mode;
    if repeat_mode == cllobby::RepeatMode::All {
        handle.move_current_to_end();
    } else {
        handle.advance_queue();
    }
    if let Some(next) = handle.songs().into_iter().next() {
        handle.set_track(next, true);
    }
}

async fn handle_queue_add(gateway: &Arc<Gateway>, conn: &Connection, out_tx: &mpsc::UnboundedSender<String>, data: serde_json::Value) {
    let Ok(payload) = serde_json::from_value::<QueueAdd>(data) else { return };
    let Some(handle) = gateway.lobbies.get_lobby(&payload.lobby_id) else {
        let _ = out_tx.send(lobby_error("lobby not found"));
        return;
    };
    let url = payload.url.clone().or_else(|| payload.query.clone());
    let Some(url) = url else {
        let _ = out_tx.send(encode("queue:error", LobbyErrorPayload { message: "missing url".into() }));
        return;
    };

    if is_playlist_url(&url) {
        match gateway.resolve_playlist(&url).await {
            Ok(items) => {
                let first = items.first().cloned();
                let _ = out_tx.send(encode(
                    "queue:playlist-confirm",
                    serde_json::json!({
                        "lobbyId": handle.id(),
                        "url": url,
                        "firstItem": first,
                        "totalItems": items.len(),
                    }),
                ));
            }
            Err(e) => {
                let _ = out_tx.send(encode("queue:error", LobbyErrorPayload { message: e.to_string() }));
            }
        }
        return;
    }

    let _ = out_tx.send(encode("queue:adding", serde_json::json!({ "status": "fetching" })));

    let (title, duration, thumbnail) = match payload.title {
        Some(title) => (title, payload.duration.unwrap_or(0.0), payload.thumbnail.clone()),
        None => match gateway.fetch_metadata(&url).await {
            Ok(meta) => (meta.title, meta.duration, meta.thumbnail_url),
            Err(e) => {
                let _ = out_tx.send(encode("queue:error", LobbyErrorPayload { message: e.to_string() }));
                return;
            }
        },
    };

    let (song, was_empty) = handle.add_song(NewSong {
        url: url.clone(),
        title: title.clone(),
        duration,
        added_by: payload.added_by.or_else(|| Some(conn.username.clone())),
        thumbnail: thumbnail.clone(),
    });
    if was_empty && handle.listening_mode() == cllobby::ListeningMode::Synchronized {
        handle.set_track(song.clone(), true);
    }
    gateway.kick_off_caching(&url, &title, duration, thumbnail.as_deref(), &handle.id());
}

async fn handle_playlist_add(gateway: &Arc<Gateway>, out_tx: &mpsc::UnboundedSender<String>, data: serde_json::Value) {
    let Ok(payload) = serde_json::from_value::<QueuePlaylistAdd>(data) else { return };
    let Some(handle) = gateway.lobbies.get_lobby(&payload.lobby_id) else {
        let _ = out_tx.send(lobby_error("lobby not found"));
        return;
    };

    let items = match gateway.resolve_playlist(&payload.url).await {
        Ok(items) => items,
        Err(e) => {
            let _ = out_tx.send(encode("queue:error", LobbyErrorPayload { message: e.to_string() }));
            return;
        }
    };

    let to_add: &[PlaylistItem] = match payload.mode {
        PlaylistAddMode::Single => &items[..items.len().min(1)],
        PlaylistAddMode::All => &items,
    };
    let total = to_add.len();
    for (i, item) in to_add.iter().enumerate() {
        let (song, was_empty) = handle.add_song(NewSong {
            url: item.url.clone(),
            title: item.title.clone(),
            duration: item.duration,
            added_by: Some(payload.added_by.clone()),
            thumbnail: item.thumbnail_url.clone(),
        });
        if i == 0 && was_empty && handle.listening_mode() == cllobby::ListeningMode::Synchronized {
            handle.set_track(song.clone(), true);
        }
        gateway.kick_off_caching(&item.url, &item.title, item.duration, item.thumbnail_url.as_deref(), &handle.id());
        if payload.mode == PlaylistAddMode::All {
            let _ = out_tx.send(encode(
                "queue:playlist-progress",
                serde_json::json!({ "current": i + 1, "total": total, "title": item.title }),
            ));
        }
    }
    if payload.mode == PlaylistAddMode::All {
        let _ = out_tx.send(encode(
            "queue:playlist-complete",
            serde_json::json!({ "lobbyId": handle.id(), "added": total }),
        ));
    }
}

fn is_playlist_url(url: &str) -> bool {
    url.contains("list=")
}
