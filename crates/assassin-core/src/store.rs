use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use contracts::{ContractRecord, GameError, GameRecord, GameStatus, KillView, PlayerRecord};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<StoreError> for GameError {
    fn from(value: StoreError) -> Self {
        tracing::error!(error = %value, "storage failure");
        GameError::Storage(value.to_string())
    }
}

/// Durable store for games, players, contracts, the kill log, and the
/// weapon/location pools. Every multi-statement write runs inside one
/// [`StoreTx`]; a failed transaction rolls back and surfaces as
/// `GameError::Storage` without partial effects.
#[derive(Debug)]
pub struct GameStore {
    conn: Connection,
}

impl GameStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    /// Begin the exclusive critical section for one read-then-write sequence.
    pub fn tx(&mut self) -> Result<StoreTx<'_>, StoreError> {
        Ok(StoreTx {
            tx: self.conn.transaction()?,
        })
    }

    fn configure(&mut self) -> Result<(), StoreError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS game (
                game_id INTEGER PRIMARY KEY AUTOINCREMENT,
                status TEXT NOT NULL DEFAULT 'registration',
                test_mode INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                started_at TEXT,
                finished_at TEXT,
                winner_player_id INTEGER,
                chat_id INTEGER NOT NULL,
                FOREIGN KEY (winner_player_id) REFERENCES player(player_id)
            );

            CREATE TABLE IF NOT EXISTS player (
                player_id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id INTEGER NOT NULL,
                account_id INTEGER,
                virtual_player INTEGER NOT NULL DEFAULT 0,
                display_name TEXT NOT NULL,
                mention TEXT NOT NULL,
                alive INTEGER NOT NULL DEFAULT 1,
                registered_at TEXT NOT NULL,
                died_at TEXT,
                FOREIGN KEY (game_id) REFERENCES game(game_id)
            );

            CREATE TABLE IF NOT EXISTS contract (
                contract_id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id INTEGER NOT NULL,
                assassin_player_id INTEGER NOT NULL,
                target_player_id INTEGER NOT NULL,
                weapon TEXT NOT NULL,
                location TEXT NOT NULL,
                assigned_at TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY (game_id) REFERENCES game(game_id),
                FOREIGN KEY (assassin_player_id) REFERENCES player(player_id),
                FOREIGN KEY (target_player_id) REFERENCES player(player_id)
            );

            CREATE TABLE IF NOT EXISTS kill_log (
                kill_id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id INTEGER NOT NULL,
                killer_player_id INTEGER NOT NULL,
                victim_player_id INTEGER NOT NULL,
                weapon TEXT NOT NULL,
                location TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                test_mode INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (game_id) REFERENCES game(game_id),
                FOREIGN KEY (killer_player_id) REFERENCES player(player_id),
                FOREIGN KEY (victim_player_id) REFERENCES player(player_id)
            );

            CREATE TABLE IF NOT EXISTS weapon (
                entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL UNIQUE,
                active INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS location (
                entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL UNIQUE,
                active INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_game_status ON game(status);
            CREATE INDEX IF NOT EXISTS idx_player_game ON player(game_id);
            CREATE INDEX IF NOT EXISTS idx_player_account ON player(game_id, account_id);
            CREATE INDEX IF NOT EXISTS idx_contract_game_active ON contract(game_id, active);
            CREATE INDEX IF NOT EXISTS idx_kill_log_game ON kill_log(game_id);
            ",
        )?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct StoreTx<'conn> {
    tx: Transaction<'conn>,
}

impl StoreTx<'_> {
    pub fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }

    // === Game ===

    pub fn create_game(
        &self,
        test_mode: bool,
        chat_id: i64,
        now: DateTime<Utc>,
    ) -> Result<GameRecord, StoreError> {
        self.tx.execute(
            "INSERT INTO game (status, test_mode, created_at, chat_id)
             VALUES ('registration', ?1, ?2, ?3)",
            params![test_mode, now, chat_id],
        )?;
        let game_id = self.tx.last_insert_rowid();
        Ok(GameRecord {
            game_id,
            status: GameStatus::Registration,
            test_mode,
            created_at: now,
            started_at: None,
            finished_at: None,
            winner_player_id: None,
            chat_id,
        })
    }

    /// The single game in registration or running state, if any. The
    /// single-active-game invariant is enforced here, inside the transaction
    /// that also performs the dependent write.
    pub fn active_game(&self) -> Result<Option<GameRecord>, StoreError> {
        let game = self
            .tx
            .query_row(
                "SELECT game_id, status, test_mode, created_at, started_at,
                        finished_at, winner_player_id, chat_id
                 FROM game
                 WHERE status IN ('registration', 'running')
                 ORDER BY created_at DESC
                 LIMIT 1",
                [],
                game_from_row,
            )
            .optional()?;
        Ok(game)
    }

    pub fn game(&self, game_id: i64) -> Result<Option<GameRecord>, StoreError> {
        let game = self
            .tx
            .query_row(
                "SELECT game_id, status, test_mode, created_at, started_at,
                        finished_at, winner_player_id, chat_id
                 FROM game WHERE game_id = ?1",
                params![game_id],
                game_from_row,
            )
            .optional()?;
        Ok(game)
    }

    pub fn latest_finished_game(&self) -> Result<Option<GameRecord>, StoreError> {
        let game = self
            .tx
            .query_row(
                "SELECT game_id, status, test_mode, created_at, started_at,
                        finished_at, winner_player_id, chat_id
                 FROM game
                 WHERE status = 'finished'
                 ORDER BY finished_at DESC, game_id DESC
                 LIMIT 1",
                [],
                game_from_row,
            )
            .optional()?;
        Ok(game)
    }

    pub fn mark_running(&self, game_id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.tx.execute(
            "UPDATE game SET status = 'running', started_at = ?2 WHERE game_id = ?1",
            params![game_id, at],
        )?;
        Ok(())
    }

    pub fn finish_game(
        &self,
        game_id: i64,
        winner_player_id: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.tx.execute(
            "UPDATE game
             SET status = 'finished', finished_at = ?2, winner_player_id = ?3
             WHERE game_id = ?1",
            params![game_id, at, winner_player_id],
        )?;
        Ok(())
    }

    // === Player ===

    pub fn create_player(
        &self,
        game_id: i64,
        account_id: Option<i64>,
        virtual_player: bool,
        display_name: &str,
        mention: &str,
        now: DateTime<Utc>,
    ) -> Result<PlayerRecord, StoreError> {
        self.tx.execute(
            "INSERT INTO player (
                game_id, account_id, virtual_player, display_name, mention, registered_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![game_id, account_id, virtual_player, display_name, mention, now],
        )?;
        let player_id = self.tx.last_insert_rowid();
        Ok(PlayerRecord {
            player_id,
            game_id,
            account_id,
            virtual_player,
            display_name: display_name.to_string(),
            mention: mention.to_string(),
            alive: true,
            registered_at: now,
            died_at: None,
        })
    }

    pub fn player(&self, player_id: i64) -> Result<Option<PlayerRecord>, StoreError> {
        let player = self
            .tx
            .query_row(
                "SELECT player_id, game_id, account_id, virtual_player, display_name,
                        mention, alive, registered_at, died_at
                 FROM player WHERE player_id = ?1",
                params![player_id],
                player_from_row,
            )
            .optional()?;
        Ok(player)
    }

    pub fn player_by_account(
        &self,
        game_id: i64,
        account_id: i64,
    ) -> Result<Option<PlayerRecord>, StoreError> {
        let player = self
            .tx
            .query_row(
                "SELECT player_id, game_id, account_id, virtual_player, display_name,
                        mention, alive, registered_at, died_at
                 FROM player WHERE game_id = ?1 AND account_id = ?2",
                params![game_id, account_id],
                player_from_row,
            )
            .optional()?;
        Ok(player)
    }

    pub fn players(&self, game_id: i64) -> Result<Vec<PlayerRecord>, StoreError> {
        let mut stmt = self.tx.prepare(
            "SELECT player_id, game_id, account_id, virtual_player, display_name,
                    mention, alive, registered_at, died_at
             FROM player WHERE game_id = ?1
             ORDER BY registered_at, player_id",
        )?;
        let rows = stmt.query_map(params![game_id], player_from_row)?;
        collect_rows(rows)
    }

    pub fn alive_players(&self, game_id: i64) -> Result<Vec<PlayerRecord>, StoreError> {
        let mut stmt = self.tx.prepare(
            "SELECT player_id, game_id, account_id, virtual_player, display_name,
                    mention, alive, registered_at, died_at
             FROM player WHERE game_id = ?1 AND alive = 1
             ORDER BY registered_at, player_id",
        )?;
        let rows = stmt.query_map(params![game_id], player_from_row)?;
        collect_rows(rows)
    }

    pub fn player_count(&self, game_id: i64) -> Result<usize, StoreError> {
        let count: i64 = self.tx.query_row(
            "SELECT COUNT(*) FROM player WHERE game_id = ?1",
            params![game_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// The one alive->dead flip a player ever gets.
    pub fn mark_player_dead(&self, player_id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.tx.execute(
            "UPDATE player SET alive = 0, died_at = ?2 WHERE player_id = ?1",
            params![player_id, at],
        )?;
        Ok(())
    }

    // === Contract ===

    pub fn create_contract(
        &self,
        game_id: i64,
        assassin_player_id: i64,
        target_player_id: i64,
        weapon: &str,
        location: &str,
        now: DateTime<Utc>,
    ) -> Result<ContractRecord, StoreError> {
        self.tx.execute(
            "INSERT INTO contract (
                game_id, assassin_player_id, target_player_id, weapon, location, assigned_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![game_id, assassin_player_id, target_player_id, weapon, location, now],
        )?;
        let contract_id = self.tx.last_insert_rowid();
        Ok(ContractRecord {
            contract_id,
            game_id,
            assassin_player_id,
            target_player_id,
            weapon: weapon.to_string(),
            location: location.to_string(),
            assigned_at: now,
            active: true,
        })
    }

    pub fn contract_for_assassin(
        &self,
        game_id: i64,
        assassin_player_id: i64,
    ) -> Result<Option<ContractRecord>, StoreError> {
        let contract = self
            .tx
            .query_row(
                "SELECT contract_id, game_id, assassin_player_id, target_player_id,
                        weapon, location, assigned_at, active
                 FROM contract
                 WHERE game_id = ?1 AND assassin_player_id = ?2 AND active = 1",
                params![game_id, assassin_player_id],
                contract_from_row,
            )
            .optional()?;
        Ok(contract)
    }

    pub fn contract_for_target(
        &self,
        game_id: i64,
        target_player_id: i64,
    ) -> Result<Option<ContractRecord>, StoreError> {
        let contract = self
            .tx
            .query_row(
                "SELECT contract_id, game_id, assassin_player_id, target_player_id,
                        weapon, location, assigned_at, active
                 FROM contract
                 WHERE game_id = ?1 AND target_player_id = ?2 AND active = 1",
                params![game_id, target_player_id],
                contract_from_row,
            )
            .optional()?;
        Ok(contract)
    }

    pub fn active_contracts(&self, game_id: i64) -> Result<Vec<ContractRecord>, StoreError> {
        let mut stmt = self.tx.prepare(
            "SELECT contract_id, game_id, assassin_player_id, target_player_id,
                    weapon, location, assigned_at, active
             FROM contract WHERE game_id = ?1 AND active = 1
             ORDER BY contract_id",
        )?;
        let rows = stmt.query_map(params![game_id], contract_from_row)?;
        collect_rows(rows)
    }

    /// Weapon and location are frozen at deactivation time; only the flag flips.
    pub fn deactivate_contract(&self, contract_id: i64) -> Result<(), StoreError> {
        self.tx.execute(
            "UPDATE contract SET active = 0 WHERE contract_id = ?1",
            params![contract_id],
        )?;
        Ok(())
    }

    // === Kill log ===

    pub fn record_kill(
        &self,
        game_id: i64,
        killer_player_id: i64,
        victim_player_id: i64,
        weapon: &str,
        location: &str,
        test_mode: bool,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        self.tx.execute(
            "INSERT INTO kill_log (
                game_id, killer_player_id, victim_player_id, weapon, location,
                recorded_at, test_mode
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                game_id,
                killer_player_id,
                victim_player_id,
                weapon,
                location,
                now,
                test_mode
            ],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn kills(&self, game_id: i64) -> Result<Vec<KillView>, StoreError> {
        let mut stmt = self.tx.prepare(
            "SELECT kl.kill_id, kl.killer_player_id,
                    k.display_name, k.mention,
                    v.display_name, v.mention,
                    kl.weapon, kl.location, kl.recorded_at
             FROM kill_log kl
             JOIN player k ON kl.killer_player_id = k.player_id
             JOIN player v ON kl.victim_player_id = v.player_id
             WHERE kl.game_id = ?1
             ORDER BY kl.recorded_at, kl.kill_id",
        )?;
        let rows = stmt.query_map(params![game_id], kill_view_from_row)?;
        collect_rows(rows)
    }

    pub fn kills_by_killer(
        &self,
        game_id: i64,
        killer_player_id: i64,
    ) -> Result<Vec<KillView>, StoreError> {
        let mut stmt = self.tx.prepare(
            "SELECT kl.kill_id, kl.killer_player_id,
                    k.display_name, k.mention,
                    v.display_name, v.mention,
                    kl.weapon, kl.location, kl.recorded_at
             FROM kill_log kl
             JOIN player k ON kl.killer_player_id = k.player_id
             JOIN player v ON kl.victim_player_id = v.player_id
             WHERE kl.game_id = ?1 AND kl.killer_player_id = ?2
             ORDER BY kl.recorded_at, kl.kill_id",
        )?;
        let rows = stmt.query_map(params![game_id, killer_player_id], kill_view_from_row)?;
        collect_rows(rows)
    }

    // === Pools ===

    pub fn replace_weapons(&self, items: &[String]) -> Result<usize, StoreError> {
        self.tx.execute("DELETE FROM weapon", [])?;
        let mut saved = 0;
        for item in items {
            saved += self.tx.execute(
                "INSERT OR IGNORE INTO weapon (text) VALUES (?1)",
                params![item],
            )?;
        }
        Ok(saved)
    }

    pub fn replace_locations(&self, items: &[String]) -> Result<usize, StoreError> {
        self.tx.execute("DELETE FROM location", [])?;
        let mut saved = 0;
        for item in items {
            saved += self.tx.execute(
                "INSERT OR IGNORE INTO location (text) VALUES (?1)",
                params![item],
            )?;
        }
        Ok(saved)
    }

    pub fn active_weapons(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .tx
            .prepare("SELECT text FROM weapon WHERE active = 1 ORDER BY entry_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        collect_rows(rows)
    }

    pub fn active_locations(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .tx
            .prepare("SELECT text FROM location WHERE active = 1 ORDER BY entry_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        collect_rows(rows)
    }

}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>, StoreError> {
    let mut collected = Vec::new();
    for row in rows {
        collected.push(row?);
    }
    Ok(collected)
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<GameRecord> {
    let raw_status: String = row.get(1)?;
    let status = GameStatus::parse(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown game status: {raw_status}").into(),
        )
    })?;
    Ok(GameRecord {
        game_id: row.get(0)?,
        status,
        test_mode: row.get(2)?,
        created_at: row.get(3)?,
        started_at: row.get(4)?,
        finished_at: row.get(5)?,
        winner_player_id: row.get(6)?,
        chat_id: row.get(7)?,
    })
}

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<PlayerRecord> {
    Ok(PlayerRecord {
        player_id: row.get(0)?,
        game_id: row.get(1)?,
        account_id: row.get(2)?,
        virtual_player: row.get(3)?,
        display_name: row.get(4)?,
        mention: row.get(5)?,
        alive: row.get(6)?,
        registered_at: row.get(7)?,
        died_at: row.get(8)?,
    })
}

fn contract_from_row(row: &Row<'_>) -> rusqlite::Result<ContractRecord> {
    Ok(ContractRecord {
        contract_id: row.get(0)?,
        game_id: row.get(1)?,
        assassin_player_id: row.get(2)?,
        target_player_id: row.get(3)?,
        weapon: row.get(4)?,
        location: row.get(5)?,
        assigned_at: row.get(6)?,
        active: row.get(7)?,
    })
}

fn kill_view_from_row(row: &Row<'_>) -> rusqlite::Result<KillView> {
    Ok(KillView {
        kill_id: row.get(0)?,
        killer_player_id: row.get(1)?,
        killer_name: row.get(2)?,
        killer_mention: row.get(3)?,
        victim_name: row.get(4)?,
        victim_mention: row.get(5)?,
        weapon: row.get(6)?,
        location: row.get(7)?,
        recorded_at: row.get(8)?,
    })
}
