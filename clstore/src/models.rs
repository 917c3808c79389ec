use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ListeningMode {
    Synchronized,
    Independent,
}

impl ListeningMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ListeningMode::Synchronized => "synchronized",
            ListeningMode::Independent => "independent",
        }
    }
}

impl std::str::FromStr for ListeningMode {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "synchronized" => Ok(ListeningMode::Synchronized),
            "independent" => Ok(ListeningMode::Independent),
            other => Err(anyhow::anyhow!("invalid listening mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        }
    }
}

impl std::str::FromStr for RepeatMode {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(RepeatMode::Off),
            "all" => Ok(RepeatMode::All),
            "one" => Ok(RepeatMode::One),
            other => Err(anyhow::anyhow!("invalid repeat mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Copy)]
#[serde(rename_all = "lowercase")]
pub enum SongStatus {
    Pending,
    Downloading,
    Ready,
    Error,
}

impl SongStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SongStatus::Pending => "pending",
            SongStatus::Downloading => "downloading",
            SongStatus::Ready => "ready",
            SongStatus::Error => "error",
        }
    }
}

impl std::str::FromStr for SongStatus {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SongStatus::Pending),
            "downloading" => Ok(SongStatus::Downloading),
            "ready" => Ok(SongStatus::Ready),
            "error" => Ok(SongStatus::Error),
            other => Err(anyhow::anyhow!("invalid song status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyRow {
    pub id: String,
    pub host_id: Option<String>,
    pub name: Option<String>,
    pub listening_mode: ListeningMode,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_activity: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSongRow {
    pub id: String,
    pub lobby_id: String,
    pub url: String,
    pub title: String,
    pub duration: f64,
    pub added_by: Option<String>,
    pub thumbnail: Option<String>,
    pub added_at: chrono::DateTime<chrono::Utc>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackStateRow {
    pub lobby_id: String,
    pub current_track: Option<serde_json::Value>,
    pub position: f64,
    pub is_playing: bool,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub shuffle_enabled: bool,
    pub shuffled_indices: Vec<i64>,
    pub shuffle_index: i64,
    pub repeat_mode: RepeatMode,
}

impl PlaybackStateRow {
    pub fn initial(lobby_id: impl Into<String>) -> Self {
        Self {
            lobby_id: lobby_id.into(),
            current_track: None,
            position: 0.0,
            is_playing: false,
            started_at: None,
            shuffle_enabled: false,
            shuffled_indices: Vec::new(),
            shuffle_index: 0,
            repeat_mode: RepeatMode::Off,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSongRow {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub file_path: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: SongStatus,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageRow {
    pub id: String,
    pub lobby_id: String,
    pub user_id: String,
    pub username: String,
    pub emoji: Option<String>,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSongRow {
    pub id: String,
    pub playlist_id: String,
    pub url: String,
    pub title: String,
    pub duration: f64,
    pub thumbnail: Option<String>,
    pub sort_order: i64,
    pub added_at: chrono::DateTime<chrono::Utc>,
}
