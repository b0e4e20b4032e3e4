use contracts::{GameError, DEFAULT_LOCATIONS, DEFAULT_WEAPONS};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::store::StoreTx;

/// Uniformly permute the players and wire each to the next, wrapping the last
/// back to the first. The result is one Hamiltonian cycle over the whole set:
/// a permutation-based ring has no self-edges and no sub-cycles by
/// construction (a lone player would self-target, which start preconditions
/// exclude).
pub fn build_ring(player_ids: &[i64], rng: &mut impl Rng) -> Vec<(i64, i64)> {
    let mut order: Vec<i64> = player_ids.to_vec();
    order.shuffle(rng);

    let mut assignments = Vec::with_capacity(order.len());
    for (index, assassin) in order.iter().enumerate() {
        let target = order[(index + 1) % order.len()];
        assignments.push((*assassin, target));
    }
    assignments
}

/// The flavor pools a contract draws from. Empty configured pools fall back
/// to the built-in defaults so starting a game never blocks on list upkeep.
#[derive(Debug, Clone)]
pub struct Pools {
    pub weapons: Vec<String>,
    pub locations: Vec<String>,
}

impl Pools {
    pub fn load(tx: &StoreTx<'_>) -> Result<Self, GameError> {
        let mut weapons = tx.active_weapons()?;
        if weapons.is_empty() {
            weapons = DEFAULT_WEAPONS.iter().map(|w| w.to_string()).collect();
        }
        let mut locations = tx.active_locations()?;
        if locations.is_empty() {
            locations = DEFAULT_LOCATIONS.iter().map(|l| l.to_string()).collect();
        }

        if weapons.is_empty() {
            return Err(GameError::NoWeaponsConfigured);
        }
        if locations.is_empty() {
            return Err(GameError::NoLocationsConfigured);
        }

        Ok(Self { weapons, locations })
    }

    pub fn pick_weapon(&self, rng: &mut impl Rng) -> &str {
        &self.weapons[rng.gen_range(0..self.weapons.len())]
    }

    pub fn pick_location(&self, rng: &mut impl Rng) -> &str {
        &self.locations[rng.gen_range(0..self.locations.len())]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    fn follow_ring(assignments: &[(i64, i64)]) -> Vec<i64> {
        let edges: BTreeMap<i64, i64> = assignments.iter().copied().collect();
        let start = assignments[0].0;
        let mut visited = Vec::new();
        let mut current = start;
        loop {
            visited.push(current);
            current = edges[&current];
            if current == start {
                break;
            }
        }
        visited
    }

    #[test]
    fn ring_visits_every_player_exactly_once() {
        let mut rng = SmallRng::seed_from_u64(42);
        let players: Vec<i64> = (1..=9).collect();
        let assignments = build_ring(&players, &mut rng);

        assert_eq!(assignments.len(), players.len());
        let visited = follow_ring(&assignments);
        assert_eq!(visited.len(), players.len());
        assert_eq!(
            visited.iter().copied().collect::<BTreeSet<_>>(),
            players.iter().copied().collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn ring_has_no_self_targets() {
        let mut rng = SmallRng::seed_from_u64(7);
        let players: Vec<i64> = (1..=4).collect();
        for _ in 0..200 {
            let assignments = build_ring(&players, &mut rng);
            assert!(assignments.iter().all(|(assassin, target)| assassin != target));
        }
    }

    #[test]
    fn each_player_is_assassin_once_and_target_once() {
        let mut rng = SmallRng::seed_from_u64(19);
        let players: Vec<i64> = (1..=12).collect();
        let assignments = build_ring(&players, &mut rng);

        let assassins: BTreeSet<i64> = assignments.iter().map(|(a, _)| *a).collect();
        let targets: BTreeSet<i64> = assignments.iter().map(|(_, t)| *t).collect();
        assert_eq!(assassins.len(), players.len());
        assert_eq!(targets.len(), players.len());
    }

    #[test]
    fn pool_picks_stay_inside_the_pool() {
        let pools = Pools {
            weapons: vec!["a fork".to_string(), "a spoon".to_string()],
            locations: vec!["the hall".to_string()],
        };
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..50 {
            assert!(pools.weapons.iter().any(|w| w == pools.pick_weapon(&mut rng)));
            assert_eq!(pools.pick_location(&mut rng), "the hall");
        }
    }
}
