use super::*;

#[test]
fn game_errors_map_to_http_statuses() {
    let conflict = HttpApiError::from_game_error(GameError::AlreadyDead);
    assert_eq!(conflict.status, StatusCode::CONFLICT);
    assert_eq!(conflict.error.error_code, ErrorCode::AlreadyDead);

    let missing = HttpApiError::from_game_error(GameError::NoActiveGame);
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let invalid = HttpApiError::from_game_error(GameError::TestModeOnly);
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let broken = HttpApiError::from_game_error(GameError::Storage("disk gone".to_string()));
    assert_eq!(broken.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(broken.error.details.as_deref(), Some("disk gone"));
}

#[test]
fn broadcast_sink_feeds_the_stream() {
    let (stream_tx, mut rx) = broadcast::channel(16);
    let sink = BroadcastSink { stream_tx };

    sink.notify(77, "your contract").expect("notify");
    sink.announce(-100, "the hunt begins").expect("announce");

    let direct = rx.try_recv().expect("direct message");
    assert_eq!(direct.message_type, "notify.player");
    assert_eq!(direct.payload["account_id"], 77);

    let chat = rx.try_recv().expect("chat message");
    assert_eq!(chat.message_type, "notify.chat");
    assert_eq!(chat.payload["chat_id"], -100);
}

#[tokio::test]
async fn routes_drive_a_test_game_end_to_end() {
    let store = GameStore::open_in_memory().expect("in-memory store");
    let config = EngineConfig {
        seed: Some(21),
        ..EngineConfig::default()
    };
    let state = AppState::with_store(store, config);
    let mut rx = state.stream_tx.subscribe();

    let started = begin_test_game(
        State(state.clone()),
        Json(BeginTestGameRequest {
            chat_id: -5,
            players: Some(4),
        }),
    )
    .await
    .expect("test game")
    .0;
    assert_eq!(started.summary.players, 4);

    let overview = get_overview(State(state.clone())).await.expect("overview").0;
    assert_eq!(overview.overview.alive.len(), 4);
    assert!(overview.overview.game.test_mode);

    let announcement = rx.try_recv().expect("start announcement");
    assert_eq!(announcement.message_type, "notify.chat");

    // Unknown accounts surface as not found, not as internal errors.
    let err = get_contract(Path(123), State(state.clone()))
        .await
        .err()
        .expect("unknown account rejected");
    assert_eq!(err.status, StatusCode::NOT_FOUND);

    let victim = overview.overview.alive[0].player_id;
    let death = simulate_death(
        State(state.clone()),
        Json(SimulateDeathRequest { player_id: victim }),
    )
    .await
    .expect("simulated death")
    .0;
    assert_eq!(death.outcome.victim.player_id, victim);
    assert!(death.outcome.new_contract.is_some());

    let after = get_overview(State(state.clone())).await.expect("overview").0;
    assert_eq!(after.overview.alive.len(), 3);
}
