use chrono::{DateTime, Utc};
use contracts::{
    ContractRecord, ContractView, GameError, GameRecord, GameStatus, PlayerRecord,
    DEFAULT_TEST_PLAYERS, SAFE_ZONE,
};
use rand::rngs::SmallRng;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::engine::{FinalOutcome, GameEngine};
use crate::report;
use crate::ring::{self, Pools};
use crate::store::StoreTx;

#[derive(Debug, Clone, Serialize)]
pub struct StartSummary {
    pub game_id: i64,
    pub players: usize,
}

/// Result of replacing a flavor pool: how many entries landed, and which were
/// refused.
#[derive(Debug, Clone, Serialize)]
pub struct PoolUpdate {
    pub saved: usize,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolsView {
    pub weapons: Vec<String>,
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameOverview {
    pub game: GameRecord,
    pub total_players: usize,
    pub alive: Vec<PlayerRecord>,
}

impl GameEngine {
    /// Open a fresh game for sign-ups. Refused while any game is still in
    /// registration or running.
    pub fn open_registration(&mut self, chat_id: i64) -> Result<GameRecord, GameError> {
        let now = Utc::now();
        let game = {
            let tx = self.store.tx()?;
            if tx.active_game()?.is_some() {
                return Err(GameError::AlreadyRunning);
            }
            let game = tx.create_game(false, chat_id, now)?;
            tx.commit()?;
            game
        };
        self.announce(&game, "Registration is open. Sign up to join the hunt!");
        info!(game_id = game.game_id, chat_id, "registration opened");
        Ok(game)
    }

    pub fn register_player(
        &mut self,
        account_id: i64,
        display_name: &str,
        mention: &str,
    ) -> Result<PlayerRecord, GameError> {
        let now = Utc::now();
        let player = {
            let tx = self.store.tx()?;
            let game = tx.active_game()?.ok_or(GameError::NoActiveGame)?;
            if game.status != GameStatus::Registration {
                return Err(GameError::RegistrationClosed);
            }
            if tx.player_by_account(game.game_id, account_id)?.is_some() {
                return Err(GameError::AlreadyRegistered);
            }
            if tx.player_count(game.game_id)? >= self.config.max_players {
                return Err(GameError::RegistrationClosed);
            }
            let player = tx.create_player(
                game.game_id,
                Some(account_id),
                false,
                display_name,
                mention,
                now,
            )?;
            tx.commit()?;
            player
        };
        self.notify_player(
            &player,
            "You are in. Your contract arrives when the game starts.",
        );
        info!(
            game_id = player.game_id,
            player_id = player.player_id,
            "player registered"
        );
        Ok(player)
    }

    /// Replace the weapon pool wholesale.
    pub fn set_weapons(&mut self, items: &[String]) -> Result<PoolUpdate, GameError> {
        let cleaned = clean_entries(items);
        let saved = {
            let tx = self.store.tx()?;
            let saved = tx.replace_weapons(&cleaned)?;
            tx.commit()?;
            saved
        };
        info!(saved, "weapon pool replaced");
        Ok(PoolUpdate {
            saved,
            skipped: Vec::new(),
        })
    }

    /// Replace the location pool wholesale. The safe zone can never be a
    /// contract location, so entries naming it are refused rather than saved.
    pub fn set_locations(&mut self, items: &[String]) -> Result<PoolUpdate, GameError> {
        let cleaned = clean_entries(items);
        let (allowed, skipped): (Vec<String>, Vec<String>) = cleaned
            .into_iter()
            .partition(|entry| !entry.eq_ignore_ascii_case(SAFE_ZONE));
        let saved = {
            let tx = self.store.tx()?;
            let saved = tx.replace_locations(&allowed)?;
            tx.commit()?;
            saved
        };
        info!(saved, skipped = skipped.len(), "location pool replaced");
        Ok(PoolUpdate { saved, skipped })
    }

    /// The pools a started game would actually draw from, defaults included.
    pub fn list_pools(&mut self) -> Result<PoolsView, GameError> {
        let tx = self.store.tx()?;
        let pools = Pools::load(&tx)?;
        Ok(PoolsView {
            weapons: pools.weapons,
            locations: pools.locations,
        })
    }

    /// Close registration, build the contract ring, and set the game running.
    pub fn start_game(&mut self) -> Result<StartSummary, GameError> {
        let now = Utc::now();
        let (game, players, assigned) = {
            let tx = self.store.tx()?;
            let game = tx.active_game()?.ok_or(GameError::NoActiveGame)?;
            if game.status != GameStatus::Registration {
                return Err(GameError::AlreadyRunning);
            }
            let players = tx.players(game.game_id)?;
            if players.len() < self.config.min_players {
                return Err(GameError::BelowMinimumPlayers {
                    registered: players.len(),
                    minimum: self.config.min_players,
                });
            }
            let assigned = assign_contracts(&tx, &mut self.rng, &game, &players, now)?;
            tx.commit()?;
            (game, players, assigned)
        };
        self.deliver_contracts(&players, &assigned);
        self.announce(
            &game,
            &format!("The hunt begins! {} players are in.", players.len()),
        );
        info!(
            game_id = game.game_id,
            players = players.len(),
            "game started"
        );
        Ok(StartSummary {
            game_id: game.game_id,
            players: players.len(),
        })
    }

    /// Abandon the active game without declaring a winner.
    pub fn reset_game(&mut self) -> Result<GameRecord, GameError> {
        let now = Utc::now();
        let game = {
            let tx = self.store.tx()?;
            let game = tx.active_game()?.ok_or(GameError::NoActiveGame)?;
            tx.finish_game(game.game_id, None, now)?;
            tx.commit()?;
            game
        };
        self.pending
            .retain(|_, pending| pending.game_id != game.game_id);
        self.announce(&game, "The game has been reset.");
        info!(game_id = game.game_id, "game reset");
        Ok(game)
    }

    /// Create and immediately start a throwaway game populated with virtual
    /// players, for dry-running the pipeline.
    pub fn begin_test_game(
        &mut self,
        player_count: usize,
        chat_id: i64,
    ) -> Result<StartSummary, GameError> {
        let count = if player_count == 0 {
            DEFAULT_TEST_PLAYERS
        } else {
            player_count.min(self.config.max_players)
        };
        if count < self.config.min_players {
            return Err(GameError::BelowMinimumPlayers {
                registered: count,
                minimum: self.config.min_players,
            });
        }
        let now = Utc::now();
        let (game, players) = {
            let tx = self.store.tx()?;
            if tx.active_game()?.is_some() {
                return Err(GameError::AlreadyRunning);
            }
            let game = tx.create_game(true, chat_id, now)?;
            let mut players = Vec::with_capacity(count);
            for n in 1..=count {
                let name = format!("Virtual #{n:02}");
                players.push(tx.create_player(game.game_id, None, true, &name, &name, now)?);
            }
            assign_contracts(&tx, &mut self.rng, &game, &players, now)?;
            tx.commit()?;
            (game, players)
        };
        self.announce(
            &game,
            &format!("Test game started with {} virtual players.", players.len()),
        );
        info!(
            game_id = game.game_id,
            players = players.len(),
            "test game started"
        );
        Ok(StartSummary {
            game_id: game.game_id,
            players: players.len(),
        })
    }

    /// What the calling player is currently assigned to do.
    pub fn current_contract(&mut self, account_id: i64) -> Result<ContractView, GameError> {
        let tx = self.store.tx()?;
        let game = tx.active_game()?.ok_or(GameError::NoActiveGame)?;
        if game.status != GameStatus::Running {
            return Err(GameError::GameNotRunning);
        }
        let player = tx
            .player_by_account(game.game_id, account_id)?
            .ok_or(GameError::NotInGame)?;
        if !player.alive {
            return Err(GameError::AlreadyDead);
        }
        let contract = tx
            .contract_for_assassin(game.game_id, player.player_id)?
            .ok_or(GameError::ContractMissing {
                game_id: game.game_id,
                player_id: player.player_id,
                role: contracts::ContractRole::Assassin,
            })?;
        let target = tx
            .player(contract.target_player_id)?
            .ok_or(GameError::PlayerNotFound)?;
        Ok(ContractView {
            target_name: target.display_name,
            target_mention: target.mention,
            weapon: contract.weapon,
            location: contract.location,
        })
    }

    pub fn overview(&mut self) -> Result<GameOverview, GameError> {
        let tx = self.store.tx()?;
        let game = tx.active_game()?.ok_or(GameError::NoActiveGame)?;
        let total_players = tx.player_count(game.game_id)?;
        let alive = tx.alive_players(game.game_id)?;
        Ok(GameOverview {
            game,
            total_players,
            alive,
        })
    }

    /// Re-render the report of the most recently finished game that crowned a
    /// winner.
    pub fn latest_report(&mut self) -> Result<FinalOutcome, GameError> {
        let offset = self.config.report_offset;
        let tx = self.store.tx()?;
        let game = tx.latest_finished_game()?.ok_or(GameError::NoActiveGame)?;
        let winner_id = game.winner_player_id.ok_or(GameError::PlayerNotFound)?;
        let winner = tx.player(winner_id)?.ok_or(GameError::PlayerNotFound)?;
        let all_kills = tx.kills(game.game_id)?;
        let winner_kills = tx.kills_by_killer(game.game_id, winner_id)?;
        let report = report::final_report(&all_kills, &winner_kills, &winner, offset);
        Ok(FinalOutcome { winner, report })
    }

    fn deliver_contracts(
        &self,
        players: &[PlayerRecord],
        assigned: &BTreeMap<i64, ContractRecord>,
    ) {
        let by_id: BTreeMap<i64, &PlayerRecord> = players
            .iter()
            .map(|player| (player.player_id, player))
            .collect();
        for player in players {
            let Some(contract) = assigned.get(&player.player_id) else {
                continue;
            };
            let Some(target) = by_id.get(&contract.target_player_id) else {
                continue;
            };
            self.notify_player(player, &Self::contract_message(target, contract));
        }
    }
}

/// Wire the registered players into a single ring of contracts and flip the
/// game to running, all inside the caller's transaction.
fn assign_contracts(
    tx: &StoreTx<'_>,
    rng: &mut SmallRng,
    game: &GameRecord,
    players: &[PlayerRecord],
    now: DateTime<Utc>,
) -> Result<BTreeMap<i64, ContractRecord>, GameError> {
    let pools = Pools::load(tx)?;
    let ids: Vec<i64> = players.iter().map(|player| player.player_id).collect();

    let mut assigned = BTreeMap::new();
    for (assassin, target) in ring::build_ring(&ids, rng) {
        let weapon = pools.pick_weapon(rng).to_string();
        let location = pools.pick_location(rng).to_string();
        let contract = tx.create_contract(game.game_id, assassin, target, &weapon, &location, now)?;
        assigned.insert(assassin, contract);
    }
    tx.mark_running(game.game_id, now)?;
    Ok(assigned)
}

fn clean_entries(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
