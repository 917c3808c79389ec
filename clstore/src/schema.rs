use rusqlite::Connection;

/// Creates every table and index the store owns, idempotently. Mirrors the
/// teacher's `PersistenceManager::init`/`DB::init` shape: one `CREATE TABLE
/// IF NOT EXISTS` per entity followed by its indexes, all inside a single
/// connection-level call made once at startup.
pub fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS lobbies (
            id              TEXT PRIMARY KEY,
            host_id         TEXT,
            name            TEXT,
            listening_mode  TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            last_activity   TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_lobbies_name_ci
            ON lobbies (LOWER(name))
            WHERE name IS NOT NULL;

        CREATE TABLE IF NOT EXISTS playback_state (
            lobby_id         TEXT PRIMARY KEY REFERENCES lobbies(id) ON DELETE CASCADE,
            current_track    TEXT,
            position         REAL NOT NULL DEFAULT 0,
            is_playing       INTEGER NOT NULL DEFAULT 0,
            started_at       TEXT,
            shuffle_enabled  INTEGER NOT NULL DEFAULT 0,
            shuffled_indices TEXT,
            shuffle_index    INTEGER NOT NULL DEFAULT 0,
            repeat_mode      TEXT NOT NULL DEFAULT 'off'
        );

        CREATE TABLE IF NOT EXISTS queue_songs (
            id          TEXT PRIMARY KEY,
            lobby_id    TEXT NOT NULL REFERENCES lobbies(id) ON DELETE CASCADE,
            url         TEXT NOT NULL,
            title       TEXT NOT NULL,
            duration    REAL NOT NULL,
            added_by    TEXT,
            thumbnail   TEXT,
            added_at    TEXT NOT NULL,
            sort_order  INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_queue_songs_lobby_sort
            ON queue_songs (lobby_id, sort_order);

        CREATE TABLE IF NOT EXISTS songs (
            id             TEXT PRIMARY KEY,
            url            TEXT NOT NULL UNIQUE,
            title          TEXT,
            duration       REAL,
            file_path      TEXT,
            thumbnail_url  TEXT,
            status         TEXT NOT NULL,
            error_message  TEXT,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_songs_url ON songs (url);
        CREATE INDEX IF NOT EXISTS idx_songs_status ON songs (status);

        CREATE TABLE IF NOT EXISTS chat_messages (
            id          TEXT PRIMARY KEY,
            lobby_id    TEXT NOT NULL REFERENCES lobbies(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL,
            username    TEXT NOT NULL,
            emoji       TEXT,
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chat_messages_lobby_created
            ON chat_messages (lobby_id, created_at);

        CREATE TABLE IF NOT EXISTS playlists (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            name        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_playlists_user ON playlists (user_id);

        CREATE TABLE IF NOT EXISTS playlist_songs (
            id           TEXT PRIMARY KEY,
            playlist_id  TEXT NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
            url          TEXT NOT NULL,
            title        TEXT NOT NULL,
            duration     REAL NOT NULL,
            thumbnail    TEXT,
            sort_order   INTEGER NOT NULL,
            added_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_playlist_songs_playlist_sort
            ON playlist_songs (playlist_id, sort_order);
        "#,
    )
}
