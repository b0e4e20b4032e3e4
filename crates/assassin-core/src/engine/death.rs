use chrono::Utc;
use contracts::{ContractRecord, ContractRole, GameError, GameStatus, PlayerRecord};
use serde::Serialize;
use tracing::{error, info};

use crate::engine::{FinalOutcome, GameEngine, PendingConfirmation};
use crate::report;
use crate::ring::Pools;

/// Everything a single processed death changed.
#[derive(Debug, Clone, Serialize)]
pub struct DeathOutcome {
    pub killer: PlayerRecord,
    pub victim: PlayerRecord,
    /// The repair contract handed to the killer, absent on the final kill.
    pub new_contract: Option<ContractRecord>,
    /// Present when this death ended the game.
    pub finished: Option<FinalOutcome>,
}

impl GameEngine {
    /// First half of the handshake: the victim declares their own death. The
    /// game state is untouched until the victim confirms.
    pub fn signal_dead(&mut self, account_id: i64) -> Result<PendingConfirmation, GameError> {
        let pending = {
            let tx = self.store.tx()?;
            let game = tx.active_game()?.ok_or(GameError::NoActiveGame)?;
            if game.status != GameStatus::Running {
                return Err(GameError::GameNotRunning);
            }
            let victim = tx
                .player_by_account(game.game_id, account_id)?
                .ok_or(GameError::NotInGame)?;
            if !victim.alive {
                return Err(GameError::AlreadyDead);
            }
            let hunting = tx
                .contract_for_target(game.game_id, victim.player_id)?
                .ok_or_else(|| {
                    error!(
                        game_id = game.game_id,
                        player_id = victim.player_id,
                        "alive player has no hunter"
                    );
                    GameError::ContractMissing {
                        game_id: game.game_id,
                        player_id: victim.player_id,
                        role: ContractRole::Target,
                    }
                })?;
            let killer = tx
                .player(hunting.assassin_player_id)?
                .ok_or(GameError::PlayerNotFound)?;
            PendingConfirmation {
                game_id: game.game_id,
                victim_player_id: victim.player_id,
                killer_player_id: killer.player_id,
                killer_mention: killer.mention,
                requested_at: Utc::now(),
            }
        };
        info!(
            game_id = pending.game_id,
            victim = pending.victim_player_id,
            "death signaled, awaiting confirmation"
        );
        self.pending
            .insert(pending.victim_player_id, pending.clone());
        Ok(pending)
    }

    /// Back out of an unconfirmed death signal.
    pub fn cancel_confirmation(&mut self, account_id: i64) -> Result<(), GameError> {
        let victim_id = {
            let tx = self.store.tx()?;
            let game = tx.active_game()?.ok_or(GameError::NoActiveGame)?;
            let victim = tx
                .player_by_account(game.game_id, account_id)?
                .ok_or(GameError::NotInGame)?;
            victim.player_id
        };
        if self.pending.remove(&victim_id).is_none() {
            return Err(GameError::NoPendingConfirmation);
        }
        info!(victim = victim_id, "death signal cancelled");
        Ok(())
    }

    /// Second half of the handshake: the victim stands by their signal, and
    /// the death goes through the pipeline.
    pub fn confirm_death(&mut self, account_id: i64) -> Result<DeathOutcome, GameError> {
        let (game_id, victim_id) = {
            let tx = self.store.tx()?;
            let game = tx.active_game()?.ok_or(GameError::NoActiveGame)?;
            let victim = tx
                .player_by_account(game.game_id, account_id)?
                .ok_or(GameError::NotInGame)?;
            (game.game_id, victim.player_id)
        };
        if !self.pending.contains_key(&victim_id) {
            return Err(GameError::NoPendingConfirmation);
        }
        let outcome = self.process_death(game_id, victim_id)?;
        self.pending.remove(&victim_id);
        Ok(outcome)
    }

    /// Force a death without the handshake. Only meaningful while dry-running
    /// a test-mode game with virtual players.
    pub fn simulate_death(&mut self, victim_player_id: i64) -> Result<DeathOutcome, GameError> {
        let game_id = {
            let tx = self.store.tx()?;
            let victim = tx
                .player(victim_player_id)?
                .ok_or(GameError::PlayerNotFound)?;
            let game = tx.game(victim.game_id)?.ok_or(GameError::NoActiveGame)?;
            if !game.test_mode {
                return Err(GameError::TestModeOnly);
            }
            game.game_id
        };
        self.process_death(game_id, victim_player_id)
    }

    /// The death pipeline proper. Every read and write between validation and
    /// the repair contract happens in one store transaction, so a concurrent
    /// duplicate sees either the untouched state or the fully processed one.
    fn process_death(
        &mut self,
        game_id: i64,
        victim_player_id: i64,
    ) -> Result<DeathOutcome, GameError> {
        let now = Utc::now();
        let offset = self.config.report_offset;
        let (game, outcome, new_target) = {
            let tx = self.store.tx()?;
            let game = tx.game(game_id)?.ok_or(GameError::NoActiveGame)?;
            if game.status != GameStatus::Running {
                return Err(GameError::GameNotRunning);
            }
            let mut victim = tx
                .player(victim_player_id)?
                .ok_or(GameError::PlayerNotFound)?;
            if !victim.alive {
                return Err(GameError::AlreadyDead);
            }

            let contract_missing = |role: ContractRole| {
                error!(
                    game_id,
                    player_id = victim_player_id,
                    %role,
                    "ring is broken: alive player lacks an active contract"
                );
                GameError::ContractMissing {
                    game_id,
                    player_id: victim_player_id,
                    role,
                }
            };
            let hunting = tx
                .contract_for_target(game_id, victim_player_id)?
                .ok_or_else(|| contract_missing(ContractRole::Target))?;
            let outgoing = tx
                .contract_for_assassin(game_id, victim_player_id)?
                .ok_or_else(|| contract_missing(ContractRole::Assassin))?;
            let killer = tx
                .player(hunting.assassin_player_id)?
                .ok_or(GameError::PlayerNotFound)?;

            tx.record_kill(
                game_id,
                killer.player_id,
                victim_player_id,
                &hunting.weapon,
                &hunting.location,
                game.test_mode,
                now,
            )?;
            tx.mark_player_dead(victim_player_id, now)?;
            tx.deactivate_contract(hunting.contract_id)?;
            tx.deactivate_contract(outgoing.contract_id)?;
            victim.alive = false;
            victim.died_at = Some(now);

            let alive = tx.alive_players(game_id)?;
            if let [winner] = alive.as_slice() {
                let winner = winner.clone();
                tx.finish_game(game_id, Some(winner.player_id), now)?;
                let all_kills = tx.kills(game_id)?;
                let winner_kills = tx.kills_by_killer(game_id, winner.player_id)?;
                let rendered = report::final_report(&all_kills, &winner_kills, &winner, offset);
                tx.commit()?;
                let outcome = DeathOutcome {
                    killer,
                    victim,
                    new_contract: None,
                    finished: Some(FinalOutcome {
                        winner,
                        report: rendered,
                    }),
                };
                (game, outcome, None)
            } else {
                // Ring repair: the killer inherits the victim's target, with
                // fresh flavor.
                let pools = Pools::load(&tx)?;
                let weapon = pools.pick_weapon(&mut self.rng).to_string();
                let location = pools.pick_location(&mut self.rng).to_string();
                let contract = tx.create_contract(
                    game_id,
                    killer.player_id,
                    outgoing.target_player_id,
                    &weapon,
                    &location,
                    now,
                )?;
                let new_target = tx
                    .player(contract.target_player_id)?
                    .ok_or(GameError::PlayerNotFound)?;
                tx.commit()?;
                let outcome = DeathOutcome {
                    killer,
                    victim,
                    new_contract: Some(contract),
                    finished: None,
                };
                (game, outcome, Some(new_target))
            }
        };

        self.pending.remove(&victim_player_id);
        self.announce(
            &game,
            &format!("{} has been eliminated!", outcome.victim.display_name),
        );
        if let (Some(contract), Some(target)) = (&outcome.new_contract, &new_target) {
            self.notify_player(&outcome.killer, &Self::contract_message(target, contract));
        }
        if let Some(finished) = &outcome.finished {
            self.announce(&game, &finished.report);
        }
        info!(
            game_id,
            killer = outcome.killer.player_id,
            victim = victim_player_id,
            finished = outcome.finished.is_some(),
            "death processed"
        );
        Ok(outcome)
    }
}
