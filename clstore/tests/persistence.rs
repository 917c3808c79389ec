use chrono::Utc;
use clstore::{ListeningMode, LobbyRow, QueueSongRow, Store};

fn sample_lobby(id: &str, name: Option<&str>) -> LobbyRow {
    let now = Utc::now();
    LobbyRow {
        id: id.to_string(),
        host_id: Some("host-1".to_string()),
        name: name.map(str::to_string),
        listening_mode: ListeningMode::Synchronized,
        created_at: now,
        last_activity: now,
    }
}

#[test]
fn lobby_names_are_unique_case_insensitively() {
    let store = Store::open_in_memory().unwrap();
    store.insert_lobby(&sample_lobby("L1", Some("Chill Vibes"))).unwrap();

    assert!(store.is_name_taken("chill vibes", None).unwrap());
    assert!(!store.is_name_taken("chill vibes", Some("L1")).unwrap());
    assert!(!store.is_name_taken("other room", None).unwrap());
}

#[test]
fn queue_sort_orders_round_trip_through_reorder() {
    let store = Store::open_in_memory().unwrap();
    store.insert_lobby(&sample_lobby("L1", None)).unwrap();

    let ids = ["a", "b", "c"];
    for (i, id) in ids.iter().enumerate() {
        store
            .insert_queue_song(&QueueSongRow {
                id: id.to_string(),
                lobby_id: "L1".to_string(),
                url: format!("http://example.com/{id}"),
                title: id.to_string(),
                duration: 10.0,
                added_by: None,
                thumbnail: None,
                added_at: Utc::now(),
                sort_order: i as i64,
            })
            .unwrap();
    }

    // move "c" to the front
    store
        .replace_sort_orders("L1", &["c".to_string(), "a".to_string(), "b".to_string()])
        .unwrap();

    let songs = store.list_queue_songs("L1").unwrap();
    let order: Vec<_> = songs.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(order, vec!["c", "a", "b"]);

    // sort_order must still be a dense 0..n permutation
    let mut sort_orders: Vec<_> = songs.iter().map(|s| s.sort_order).collect();
    sort_orders.sort();
    assert_eq!(sort_orders, vec![0, 1, 2]);
}

#[test]
fn deleting_a_lobby_cascades_to_its_queue() {
    let store = Store::open_in_memory().unwrap();
    store.insert_lobby(&sample_lobby("L1", None)).unwrap();
    store
        .insert_queue_song(&QueueSongRow {
            id: "a".to_string(),
            lobby_id: "L1".to_string(),
            url: "http://example.com/a".to_string(),
            title: "a".to_string(),
            duration: 10.0,
            added_by: None,
            thumbnail: None,
            added_at: Utc::now(),
            sort_order: 0,
        })
        .unwrap();

    store.delete_lobby("L1").unwrap();
    assert!(store.list_queue_songs("L1").unwrap().is_empty());
}

#[test]
fn unavailable_store_degrades_instead_of_panicking() {
    let store = Store::open(None).unwrap();
    assert!(!store.is_available());
    assert!(store.list_lobbies().is_err());
}
