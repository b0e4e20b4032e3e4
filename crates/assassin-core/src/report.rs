//! Final-report rendering. Pure read/format step over persisted kill views:
//! nothing here mutates the log, so a failed delivery can simply re-render.

use chrono::{DateTime, FixedOffset, Utc};
use contracts::{KillView, PlayerRecord};

fn local_time(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%H:%M").to_string()
}

fn kill_line(kill: &KillView, killer_mention: &str, offset: FixedOffset) -> String {
    format!(
        "{} — {} took out {} in {} with {}\n",
        local_time(kill.recorded_at, offset),
        killer_mention,
        kill.victim_mention,
        kill.location,
        kill.weapon,
    )
}

fn sorted_by_time(kills: &[KillView]) -> Vec<KillView> {
    let mut ordered = kills.to_vec();
    // Total order comes from the persisted timestamp, not insertion order.
    ordered.sort_by_key(|kill| (kill.recorded_at, kill.kill_id));
    ordered
}

/// Every kill of the game, ascending by time of day.
pub fn kill_chronology(kills: &[KillView], offset: FixedOffset) -> String {
    let mut rendered = String::from("Kill chronology:\n");
    for kill in sorted_by_time(kills) {
        rendered.push_str(&kill_line(&kill, &kill.killer_mention, offset));
    }
    rendered
}

/// The subsequence of kills where the winner pulled the trigger. Empty string
/// when the winner never confirmed a kill (everyone else eliminated each
/// other).
pub fn winner_path(
    winner_kills: &[KillView],
    winner: &PlayerRecord,
    offset: FixedOffset,
) -> String {
    if winner_kills.is_empty() {
        return String::new();
    }
    let mut rendered = String::from("\nThe winner's path:\n");
    for kill in sorted_by_time(winner_kills) {
        rendered.push_str(&kill_line(&kill, &winner.mention, offset));
    }
    rendered
}

/// The single narrative sent when a game finishes: full chronology, the
/// winner's personal path, and the victory line.
pub fn final_report(
    all_kills: &[KillView],
    winner_kills: &[KillView],
    winner: &PlayerRecord,
    offset: FixedOffset,
) -> String {
    let mut rendered = kill_chronology(all_kills, offset);
    rendered.push_str(&winner_path(winner_kills, winner, offset));
    rendered.push_str(&format!(
        "\nCongratulations to the winner, {}!",
        winner.mention
    ));
    rendered
}
