//! Component D: the per-lobby ordered song list plus the per-user cursor
//! map used by independent-mode lobbies.

use std::collections::HashMap;

use crate::song::Song;

#[derive(Debug, Clone, Default)]
pub struct Queue {
    songs: Vec<Song>,
    /// Independent-mode cursor per connection: an index into `songs`.
    /// Absent entries mean "no position yet" (defaults to the head).
    user_positions: HashMap<String, usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_songs(songs: Vec<Song>) -> Self {
        Self {
            songs,
            user_positions: HashMap::new(),
        }
    }

    pub fn add_song(&mut self, song: Song) -> Song {
        self.songs.push(song.clone());
        song
    }

    pub fn remove_song(&mut self, id: &str) -> Option<Song> {
        let index = self.songs.iter().position(|s| s.id == id)?;
        let removed = self.songs.remove(index);
        // Cursors pointing past the removed index shift back by one; a
        // cursor exactly on the removed song now points at its successor.
        for pos in self.user_positions.values_mut() {
            if *pos > index {
                *pos -= 1;
            }
        }
        self.clamp_user_positions();
        Some(removed)
    }

    /// Tie-break rule: same index is a no-op (returns `true` without
    /// mutating); negative (unrepresentable here, so: none) or out-of-range
    /// indices return `false`.
    pub fn reorder_song(&mut self, id: &str, new_index: usize) -> bool {
        let Some(current_index) = self.songs.iter().position(|s| s.id == id) else {
            return false;
        };
        if new_index >= self.songs.len() {
            return false;
        }
        if new_index == current_index {
            return true;
        }
        let song = self.songs.remove(current_index);
        self.songs.insert(new_index, song);
        true
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.songs.first()
    }

    pub fn song_at(&self, index: usize) -> Option<&Song> {
        self.songs.get(index)
    }

    /// Removes and returns the head of the queue, used by synchronized-mode
    /// advancement.
    pub fn advance_queue(&mut self) -> Option<Song> {
        if self.songs.is_empty() {
            return None;
        }
        let removed = self.songs.remove(0);
        for pos in self.user_positions.values_mut() {
            if *pos > 0 {
                *pos -= 1;
            }
        }
        self.clamp_user_positions();
        Some(removed)
    }

    /// Rotates the current head to the tail — repeat-all in synchronized
    /// mode.
    pub fn move_current_to_end(&mut self) {
        if !self.songs.is_empty() {
            let head = self.songs.remove(0);
            self.songs.push(head);
        }
    }

    /// Advances a connection's independent-mode cursor and returns the song
    /// now at that position, or `None` if the queue is empty.
    pub fn advance_user_position(&mut self, conn_id: &str) -> Option<Song> {
        if self.songs.is_empty() {
            self.user_positions.remove(conn_id);
            return None;
        }
        let next = self
            .user_positions
            .get(conn_id)
            .map(|i| i + 1)
            .unwrap_or(1)
            .min(self.songs.len() - 1);
        self.user_positions.insert(conn_id.to_string(), next);
        self.songs.get(next).cloned()
    }

    pub fn set_user_position(&mut self, conn_id: &str, index: usize) -> bool {
        if index >= self.songs.len() {
            return false;
        }
        self.user_positions.insert(conn_id.to_string(), index);
        true
    }

    pub fn user_position(&self, conn_id: &str) -> usize {
        self.user_positions.get(conn_id).copied().unwrap_or(0)
    }

    pub fn remove_user_position(&mut self, conn_id: &str) {
        self.user_positions.remove(conn_id);
    }

    fn clamp_user_positions(&mut self) {
        if self.songs.is_empty() {
            self.user_positions.clear();
            return;
        }
        let max = self.songs.len() - 1;
        for pos in self.user_positions.values_mut() {
            if *pos > max {
                *pos = max;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::NewSong;

    fn song(url: &str) -> Song {
        Song::new(NewSong {
            url: url.to_string(),
            title: url.to_string(),
            duration: 1.0,
            added_by: None,
            thumbnail: None,
        })
    }

    #[test]
    fn add_then_remove_restores_prestate() {
        let mut queue = Queue::new();
        let added = queue.add_song(song("a"));
        assert_eq!(queue.len(), 1);
        let removed = queue.remove_song(&added.id).unwrap();
        assert_eq!(removed.id, added.id);
        assert!(queue.is_empty());
    }

    #[test]
    fn reorder_then_reorder_back_restores_order() {
        let mut queue = Queue::new();
        let a = queue.add_song(song("a"));
        queue.add_song(song("b"));
        queue.add_song(song("c"));

        assert!(queue.reorder_song(&a.id, 2));
        assert_eq!(queue.songs()[2].url, "a");

        assert!(queue.reorder_song(&a.id, 0));
        let urls: Vec<_> = queue.songs().iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "b", "c"]);
    }

    #[test]
    fn reorder_same_index_is_noop() {
        let mut queue = Queue::new();
        let a = queue.add_song(song("a"));
        queue.add_song(song("b"));
        assert!(queue.reorder_song(&a.id, 0));
        assert_eq!(queue.songs()[0].url, "a");
    }

    #[test]
    fn reorder_out_of_range_rejected() {
        let mut queue = Queue::new();
        let a = queue.add_song(song("a"));
        assert!(!queue.reorder_song(&a.id, 5));
        assert!(!queue.reorder_song("missing", 0));
    }

    #[test]
    fn independent_cursors_are_per_connection() {
        let mut queue = Queue::new();
        queue.add_song(song("a"));
        queue.add_song(song("b"));
        queue.add_song(song("c"));

        let next_a = queue.advance_user_position("connA").unwrap();
        assert_eq!(next_a.url, "b");
        assert_eq!(queue.user_position("connB"), 0);

        let next_a2 = queue.advance_user_position("connA").unwrap();
        assert_eq!(next_a2.url, "c");

        queue.remove_user_position("connA");
        assert_eq!(queue.user_position("connA"), 0);
    }

    #[test]
    fn move_current_to_end_rotates_carousel() {
        let mut queue = Queue::new();
        queue.add_song(song("x"));
        queue.add_song(song("y"));
        queue.move_current_to_end();
        let urls: Vec<_> = queue.songs().iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["y", "x"]);
    }
}
