use std::collections::{BTreeMap, BTreeSet};

use contracts::{ContractRecord, GameError, GameStatus, PlayerRecord};

use crate::engine::{EngineConfig, GameEngine};
use crate::notify::{BufferSink, SentMessage};
use crate::store::GameStore;

const CHAT: i64 = -1001;

fn engine_with_seed(seed: u64) -> (GameEngine, BufferSink) {
    let store = GameStore::open_in_memory().expect("in-memory store");
    let sink = BufferSink::new();
    let config = EngineConfig {
        seed: Some(seed),
        ..EngineConfig::default()
    };
    let engine = GameEngine::with_config(store, Box::new(sink.clone()), config);
    (engine, sink)
}

fn join(engine: &mut GameEngine, count: usize) -> Vec<i64> {
    let accounts: Vec<i64> = (0..count as i64).map(|n| 100 + n).collect();
    for account in &accounts {
        engine
            .register_player(*account, &format!("Player {account}"), &format!("@p{account}"))
            .expect("register");
    }
    accounts
}

fn active_contracts(engine: &mut GameEngine, game_id: i64) -> Vec<ContractRecord> {
    let tx = engine.store_mut().tx().expect("tx");
    tx.active_contracts(game_id).expect("contracts")
}

fn alive_players(engine: &mut GameEngine, game_id: i64) -> Vec<PlayerRecord> {
    let tx = engine.store_mut().tx().expect("tx");
    tx.alive_players(game_id).expect("players")
}

#[test]
fn registration_lifecycle_is_enforced() {
    let (mut engine, _sink) = engine_with_seed(1);
    engine.open_registration(CHAT).expect("open");
    join(&mut engine, 4);

    assert!(matches!(
        engine.register_player(100, "Again", "@again"),
        Err(GameError::AlreadyRegistered)
    ));
    assert!(matches!(
        engine.open_registration(CHAT),
        Err(GameError::AlreadyRunning)
    ));

    engine.start_game().expect("start");
    assert!(matches!(
        engine.register_player(999, "Late", "@late"),
        Err(GameError::RegistrationClosed)
    ));
    assert!(matches!(
        engine.start_game(),
        Err(GameError::AlreadyRunning)
    ));
}

#[test]
fn start_requires_minimum_players() {
    let (mut engine, _sink) = engine_with_seed(2);
    engine.open_registration(CHAT).expect("open");
    join(&mut engine, 3);

    match engine.start_game() {
        Err(GameError::BelowMinimumPlayers {
            registered,
            minimum,
        }) => {
            assert_eq!(registered, 3);
            assert_eq!(minimum, 4);
        }
        other => panic!("expected BelowMinimumPlayers, got {other:?}"),
    }
}

#[test]
fn start_builds_a_single_ring() {
    let (mut engine, _sink) = engine_with_seed(3);
    engine.open_registration(CHAT).expect("open");
    join(&mut engine, 6);
    let summary = engine.start_game().expect("start");

    let contracts = active_contracts(&mut engine, summary.game_id);
    assert_eq!(contracts.len(), 6);

    let assassins: BTreeSet<i64> = contracts.iter().map(|c| c.assassin_player_id).collect();
    let targets: BTreeSet<i64> = contracts.iter().map(|c| c.target_player_id).collect();
    assert_eq!(assassins.len(), 6);
    assert_eq!(targets.len(), 6);
    assert!(contracts
        .iter()
        .all(|c| c.assassin_player_id != c.target_player_id));

    // One cycle, not several: following edges from any node visits everyone.
    let edges: BTreeMap<i64, i64> = contracts
        .iter()
        .map(|c| (c.assassin_player_id, c.target_player_id))
        .collect();
    let start = contracts[0].assassin_player_id;
    let mut current = start;
    let mut visited = BTreeSet::new();
    loop {
        visited.insert(current);
        current = edges[&current];
        if current == start {
            break;
        }
    }
    assert_eq!(visited.len(), 6);
}

#[test]
fn contracts_are_delivered_to_real_players_on_start() {
    let (mut engine, sink) = engine_with_seed(4);
    engine.open_registration(CHAT).expect("open");
    let accounts = join(&mut engine, 4);
    sink.drain();

    engine.start_game().expect("start");
    let sent = sink.drain();
    for account in accounts {
        assert!(
            sent.iter().any(|m| matches!(
                m,
                SentMessage::Direct { account_id, message }
                    if *account_id == account && message.starts_with("Your contract")
            )),
            "account {account} got no contract message"
        );
    }
    assert!(sent
        .iter()
        .any(|m| matches!(m, SentMessage::Announcement { chat_id, .. } if *chat_id == CHAT)));
}

#[test]
fn death_repairs_the_ring() {
    let (mut engine, _sink) = engine_with_seed(5);
    let summary = engine.begin_test_game(4, CHAT).expect("test game");

    let before = active_contracts(&mut engine, summary.game_id);
    let hunting = before[0].clone();
    let victim = hunting.target_player_id;
    let outgoing = before
        .iter()
        .find(|c| c.assassin_player_id == victim)
        .expect("victim hunts someone")
        .clone();

    let outcome = engine.simulate_death(victim).expect("death");
    assert_eq!(outcome.killer.player_id, hunting.assassin_player_id);
    assert_eq!(outcome.victim.player_id, victim);
    assert!(!outcome.victim.alive);
    let repaired = outcome.new_contract.expect("repair contract");
    assert_eq!(repaired.assassin_player_id, hunting.assassin_player_id);
    assert_eq!(repaired.target_player_id, outgoing.target_player_id);
    assert!(outcome.finished.is_none());

    let alive = alive_players(&mut engine, summary.game_id);
    assert_eq!(alive.len(), 3);

    // Every survivor hunts exactly once and is hunted exactly once.
    let after = active_contracts(&mut engine, summary.game_id);
    assert_eq!(after.len(), 3);
    let alive_ids: BTreeSet<i64> = alive.iter().map(|p| p.player_id).collect();
    let assassins: BTreeSet<i64> = after.iter().map(|c| c.assassin_player_id).collect();
    let targets: BTreeSet<i64> = after.iter().map(|c| c.target_player_id).collect();
    assert_eq!(assassins, alive_ids);
    assert_eq!(targets, alive_ids);
}

#[test]
fn duplicate_death_is_rejected() {
    let (mut engine, _sink) = engine_with_seed(6);
    let summary = engine.begin_test_game(4, CHAT).expect("test game");
    let victim = active_contracts(&mut engine, summary.game_id)[0].target_player_id;

    engine.simulate_death(victim).expect("first death");
    assert!(matches!(
        engine.simulate_death(victim),
        Err(GameError::AlreadyDead)
    ));

    let tx = engine.store_mut().tx().expect("tx");
    let kills = tx.kills(summary.game_id).expect("kills");
    assert_eq!(kills.len(), 1);
}

#[test]
fn two_survivors_hunt_each_other() {
    let (mut engine, _sink) = engine_with_seed(7);
    let summary = engine.begin_test_game(4, CHAT).expect("test game");

    for _ in 0..2 {
        let victim = active_contracts(&mut engine, summary.game_id)[0].target_player_id;
        engine.simulate_death(victim).expect("death");
    }

    let contracts = active_contracts(&mut engine, summary.game_id);
    assert_eq!(contracts.len(), 2);
    assert_eq!(
        contracts[0].assassin_player_id,
        contracts[1].target_player_id
    );
    assert_eq!(
        contracts[0].target_player_id,
        contracts[1].assassin_player_id
    );
}

#[test]
fn game_terminates_with_a_single_winner() {
    let (mut engine, _sink) = engine_with_seed(8);
    let summary = engine.begin_test_game(5, CHAT).expect("test game");

    let mut finished = None;
    for _ in 0..4 {
        let victim = active_contracts(&mut engine, summary.game_id)[0].target_player_id;
        let outcome = engine.simulate_death(victim).expect("death");
        if outcome.finished.is_some() {
            finished = outcome.finished;
            break;
        }
    }
    let finished = finished.expect("game finished within four deaths");
    assert!(finished.report.contains("Kill chronology:"));
    assert!(finished
        .report
        .contains(&format!("Congratulations to the winner, {}!", finished.winner.mention)));

    let tx = engine.store_mut().tx().expect("tx");
    let game = tx.game(summary.game_id).expect("query").expect("game row");
    assert_eq!(game.status, GameStatus::Finished);
    assert_eq!(game.winner_player_id, Some(finished.winner.player_id));
    drop(tx);

    assert_eq!(alive_players(&mut engine, summary.game_id).len(), 1);
    assert!(active_contracts(&mut engine, summary.game_id).is_empty());
    assert!(matches!(
        engine.simulate_death(finished.winner.player_id),
        Err(GameError::GameNotRunning)
    ));

    let replay = engine.latest_report().expect("report replay");
    assert_eq!(replay.report, finished.report);
}

#[test]
fn death_requires_the_two_phase_handshake() {
    let (mut engine, _sink) = engine_with_seed(9);
    engine.open_registration(CHAT).expect("open");
    let accounts = join(&mut engine, 4);
    engine.start_game().expect("start");

    let victim_account = accounts[0];
    assert!(matches!(
        engine.confirm_death(victim_account),
        Err(GameError::NoPendingConfirmation)
    ));

    let pending = engine.signal_dead(victim_account).expect("signal");
    assert!(pending.killer_mention.starts_with('@'));

    let outcome = engine.confirm_death(victim_account).expect("confirm");
    assert_eq!(outcome.killer.player_id, pending.killer_player_id);
    assert!(!outcome.victim.alive);

    // Confirming again races against the processed death and loses.
    assert!(matches!(
        engine.confirm_death(victim_account),
        Err(GameError::NoPendingConfirmation)
    ));
    assert!(matches!(
        engine.signal_dead(victim_account),
        Err(GameError::AlreadyDead)
    ));
}

#[test]
fn cancelled_signal_leaves_the_victim_alive() {
    let (mut engine, _sink) = engine_with_seed(10);
    engine.open_registration(CHAT).expect("open");
    let accounts = join(&mut engine, 4);
    let summary = engine.start_game().expect("start");

    engine.signal_dead(accounts[1]).expect("signal");
    engine.cancel_confirmation(accounts[1]).expect("cancel");
    assert!(matches!(
        engine.confirm_death(accounts[1]),
        Err(GameError::NoPendingConfirmation)
    ));
    assert!(matches!(
        engine.cancel_confirmation(accounts[1]),
        Err(GameError::NoPendingConfirmation)
    ));
    assert_eq!(alive_players(&mut engine, summary.game_id).len(), 4);
}

#[test]
fn safe_zone_never_enters_the_location_pool() {
    let (mut engine, _sink) = engine_with_seed(11);
    let update = engine
        .set_locations(&[
            "the kitchen".to_string(),
            "The Smoking Room".to_string(),
            "the balcony".to_string(),
        ])
        .expect("set locations");
    assert_eq!(update.saved, 2);
    assert_eq!(update.skipped, vec!["The Smoking Room".to_string()]);

    let pools = engine.list_pools().expect("pools");
    assert!(pools
        .locations
        .iter()
        .all(|l| !l.eq_ignore_ascii_case(contracts::SAFE_ZONE)));
}

#[test]
fn reset_abandons_the_active_game() {
    let (mut engine, _sink) = engine_with_seed(12);
    engine.begin_test_game(4, CHAT).expect("test game");
    let game = engine.reset_game().expect("reset");

    assert!(matches!(engine.overview(), Err(GameError::NoActiveGame)));
    assert!(matches!(
        engine.reset_game(),
        Err(GameError::NoActiveGame)
    ));

    // Abandoned games are finished without a winner.
    let tx = engine.store_mut().tx().expect("tx");
    let row = tx.game(game.game_id).expect("query").expect("game row");
    assert_eq!(row.status, GameStatus::Finished);
    assert_eq!(row.winner_player_id, None);
    drop(tx);

    engine.open_registration(CHAT).expect("open again");
}

#[test]
fn overview_tracks_eliminations() {
    let (mut engine, _sink) = engine_with_seed(13);
    let summary = engine.begin_test_game(4, CHAT).expect("test game");

    let before = engine.overview().expect("overview");
    assert_eq!(before.total_players, 4);
    assert_eq!(before.alive.len(), 4);
    assert_eq!(before.game.status, GameStatus::Running);

    let victim = active_contracts(&mut engine, summary.game_id)[0].target_player_id;
    engine.simulate_death(victim).expect("death");

    let after = engine.overview().expect("overview");
    assert_eq!(after.total_players, 4);
    assert_eq!(after.alive.len(), 3);
    assert!(after.alive.iter().all(|p| p.player_id != victim));
}

#[test]
fn simulate_death_is_test_mode_only() {
    let (mut engine, _sink) = engine_with_seed(14);
    engine.open_registration(CHAT).expect("open");
    join(&mut engine, 4);
    let summary = engine.start_game().expect("start");

    let victim = active_contracts(&mut engine, summary.game_id)[0].target_player_id;
    assert!(matches!(
        engine.simulate_death(victim),
        Err(GameError::TestModeOnly)
    ));
}
