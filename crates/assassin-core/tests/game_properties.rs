use std::collections::BTreeSet;

use assassin_core::engine::{EngineConfig, GameEngine};
use assassin_core::notify::NullSink;
use assassin_core::ring::build_ring;
use assassin_core::store::GameStore;
use contracts::ContractRecord;
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

const CHAT: i64 = -42;

fn seeded_engine(seed: u64) -> GameEngine {
    let store = GameStore::open_in_memory().expect("in-memory store");
    let config = EngineConfig {
        seed: Some(seed),
        ..EngineConfig::default()
    };
    GameEngine::with_config(store, Box::new(NullSink), config)
}

fn active_contracts(engine: &mut GameEngine, game_id: i64) -> Vec<ContractRecord> {
    let tx = engine.store_mut().tx().expect("tx");
    tx.active_contracts(game_id).expect("contracts")
}

proptest! {
    #[test]
    fn ring_is_one_cycle_over_all_players(seed in 0_u64..10_000, count in 2_usize..40) {
        let players: Vec<i64> = (1..=count as i64).collect();
        let mut rng = SmallRng::seed_from_u64(seed);
        let assignments = build_ring(&players, &mut rng);

        prop_assert_eq!(assignments.len(), count);
        for (assassin, target) in &assignments {
            prop_assert_ne!(assassin, target);
        }

        let edges: std::collections::BTreeMap<i64, i64> =
            assignments.iter().copied().collect();
        let start = assignments[0].0;
        let mut current = start;
        let mut visited = BTreeSet::new();
        loop {
            prop_assert!(visited.insert(current), "revisited {} before closing", current);
            current = edges[&current];
            if current == start {
                break;
            }
        }
        prop_assert_eq!(visited.len(), count);
    }

    #[test]
    fn assignment_is_deterministic_per_seed(seed in 0_u64..10_000) {
        let mut a = seeded_engine(seed);
        let mut b = seeded_engine(seed);
        let game_a = a.begin_test_game(6, CHAT).expect("test game").game_id;
        let game_b = b.begin_test_game(6, CHAT).expect("test game").game_id;

        let ring_a: Vec<(i64, i64)> = active_contracts(&mut a, game_a)
            .iter()
            .map(|c| (c.assassin_player_id, c.target_player_id))
            .collect();
        let ring_b: Vec<(i64, i64)> = active_contracts(&mut b, game_b)
            .iter()
            .map(|c| (c.assassin_player_id, c.target_player_id))
            .collect();
        prop_assert_eq!(ring_a, ring_b);
    }

    #[test]
    fn eliminations_are_monotonic_and_terminate(
        seed in 0_u64..10_000,
        count in 4_usize..10,
        picks in proptest::collection::vec(any::<prop::sample::Index>(), 16),
    ) {
        let mut engine = seeded_engine(seed);
        let game_id = engine.begin_test_game(count, CHAT).expect("test game").game_id;

        let mut expected_alive = count;
        let mut finished = false;
        for pick in picks {
            let contracts = active_contracts(&mut engine, game_id);
            if contracts.is_empty() {
                break;
            }
            let victim = contracts[pick.index(contracts.len())].target_player_id;
            let outcome = engine.simulate_death(victim).expect("death");
            expected_alive -= 1;

            let tx = engine.store_mut().tx().expect("tx");
            let alive = tx.alive_players(game_id).expect("players");
            prop_assert_eq!(alive.len(), expected_alive);

            if expected_alive == 1 {
                let done = outcome.finished.expect("terminal death finishes the game");
                prop_assert_eq!(Some(done.winner.player_id), Some(alive[0].player_id));
                finished = true;
                break;
            }

            // Ring invariant holds after every repair.
            let remaining = tx.active_contracts(game_id).expect("contracts");
            drop(tx);
            let alive_ids: BTreeSet<i64> = alive.iter().map(|p| p.player_id).collect();
            let assassins: BTreeSet<i64> =
                remaining.iter().map(|c| c.assassin_player_id).collect();
            let targets: BTreeSet<i64> =
                remaining.iter().map(|c| c.target_player_id).collect();
            prop_assert_eq!(remaining.len(), expected_alive);
            prop_assert_eq!(&assassins, &alive_ids);
            prop_assert_eq!(&targets, &alive_ids);
        }
        prop_assert!(finished, "{} players outlasted 16 deaths", expected_alive);
    }
}
