//! Game lifecycle controller and death pipeline. One engine instance owns the
//! store; callers serialize access to it, so every read-then-write sequence in
//! here runs inside a single store transaction.

mod death;
mod lifecycle;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use contracts::{ContractRecord, GameRecord, PlayerRecord, MAX_PLAYERS, MIN_PLAYERS};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::warn;

use crate::notify::NotificationSink;
use crate::store::GameStore;

pub use death::DeathOutcome;
pub use lifecycle::{GameOverview, PoolUpdate, PoolsView, StartSummary};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub min_players: usize,
    pub max_players: usize,
    /// Offset applied when rendering kill times in reports.
    pub report_offset: FixedOffset,
    /// Fixed seed for reproducible contract assignment. None draws from the OS.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_players: MIN_PLAYERS,
            max_players: MAX_PLAYERS,
            report_offset: Utc.fix(),
            seed: None,
        }
    }
}

/// An unconfirmed "I am dead" signal. Lives only in memory: an unconfirmed
/// signal is intentionally lost on restart and the player simply signals
/// again.
#[derive(Debug, Clone)]
pub struct PendingConfirmation {
    pub game_id: i64,
    pub victim_player_id: i64,
    pub killer_player_id: i64,
    pub killer_mention: String,
    pub requested_at: DateTime<Utc>,
}

/// The winner and the rendered narrative of a finished game.
#[derive(Debug, Clone, Serialize)]
pub struct FinalOutcome {
    pub winner: PlayerRecord,
    pub report: String,
}

pub struct GameEngine {
    store: GameStore,
    config: EngineConfig,
    rng: SmallRng,
    sink: Box<dyn NotificationSink + Send>,
    pending: BTreeMap<i64, PendingConfirmation>,
}

impl GameEngine {
    pub fn new(store: GameStore, sink: Box<dyn NotificationSink + Send>) -> Self {
        Self::with_config(store, sink, EngineConfig::default())
    }

    pub fn with_config(
        store: GameStore,
        sink: Box<dyn NotificationSink + Send>,
        config: EngineConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            store,
            config,
            rng,
            sink,
            pending: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store_mut(&mut self) -> &mut GameStore {
        &mut self.store
    }

    /// Best-effort direct message. Virtual players have no account to reach.
    fn notify_player(&self, player: &PlayerRecord, message: &str) {
        let Some(account_id) = player.account_id else {
            return;
        };
        if let Err(err) = self.sink.notify(account_id, message) {
            warn!(
                player_id = player.player_id,
                account_id,
                error = %err,
                "failed to notify player"
            );
        }
    }

    /// Best-effort chat broadcast. Test-mode traffic is visibly tagged.
    fn announce(&self, game: &GameRecord, message: &str) {
        let tagged;
        let body = if game.test_mode {
            tagged = format!("[test] {message}");
            tagged.as_str()
        } else {
            message
        };
        if let Err(err) = self.sink.announce(game.chat_id, body) {
            warn!(
                game_id = game.game_id,
                chat_id = game.chat_id,
                error = %err,
                "failed to announce to chat"
            );
        }
    }

    fn contract_message(target: &PlayerRecord, contract: &ContractRecord) -> String {
        format!(
            "Your contract: eliminate {}. Weapon: {}. Location: {}. \
             The safe zone is {} and kills there do not count.",
            target.mention,
            contract.weapon,
            contract.location,
            contracts::SAFE_ZONE,
        )
    }
}
