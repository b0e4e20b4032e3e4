use std::env;
use std::net::SocketAddr;

use assassin_api::serve;
use assassin_core::{EngineConfig, GameEngine, GameStore, NullSink};

fn print_usage() {
    println!("assassin-cli <command>");
    println!("commands:");
    println!("  status [sqlite_path]");
    println!("  report [sqlite_path]");
    println!("  reset [sqlite_path]");
    println!("  serve [addr] [sqlite_path]");
    println!("    default addr: 127.0.0.1:8080");
    println!("  simulate <players> [seed] [sqlite_path]");
    println!("    runs a virtual test game to completion and prints the report");
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

fn default_sqlite_path() -> String {
    std::env::var("ASSASSIN_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "assassin.sqlite".to_string())
}

fn parse_sqlite_path(value: Option<&String>) -> String {
    value
        .map(String::to_string)
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path)
}

fn open_engine(sqlite_path: &str, seed: Option<u64>) -> Result<GameEngine, String> {
    let store = GameStore::open(sqlite_path)
        .map_err(|err| format!("failed to open store at {sqlite_path}: {err}"))?;
    let config = EngineConfig {
        seed,
        ..EngineConfig::default()
    };
    Ok(GameEngine::with_config(store, Box::new(NullSink), config))
}

fn show_status(args: &[String]) -> Result<(), String> {
    let sqlite_path = parse_sqlite_path(args.get(2));
    let mut engine = open_engine(&sqlite_path, None)?;
    let overview = engine
        .overview()
        .map_err(|err| format!("no status to show: {err}"))?;
    println!(
        "game={} status={} test_mode={} players={} alive={}",
        overview.game.game_id,
        overview.game.status,
        overview.game.test_mode,
        overview.total_players,
        overview.alive.len(),
    );
    for player in &overview.alive {
        println!("  alive: {}", player.display_name);
    }
    Ok(())
}

fn show_report(args: &[String]) -> Result<(), String> {
    let sqlite_path = parse_sqlite_path(args.get(2));
    let mut engine = open_engine(&sqlite_path, None)?;
    let outcome = engine
        .latest_report()
        .map_err(|err| format!("no finished game to report: {err}"))?;
    println!("{}", outcome.report);
    Ok(())
}

fn reset(args: &[String]) -> Result<(), String> {
    let sqlite_path = parse_sqlite_path(args.get(2));
    let mut engine = open_engine(&sqlite_path, None)?;
    let game = engine
        .reset_game()
        .map_err(|err| format!("nothing to reset: {err}"))?;
    println!("abandoned game_id={}", game.game_id);
    Ok(())
}

fn run_simulation(args: &[String]) -> Result<(), String> {
    let players = args
        .get(2)
        .ok_or_else(|| "missing players".to_string())?
        .parse::<usize>()
        .map_err(|_| "invalid players".to_string())?;
    let seed = args
        .get(3)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| format!("invalid seed: {value}"))
        })
        .transpose()?;
    let sqlite_path = parse_sqlite_path(args.get(4));

    let mut engine = open_engine(&sqlite_path, seed)?;
    let summary = engine
        .begin_test_game(players, 0)
        .map_err(|err| format!("failed to start test game: {err}"))?;
    println!(
        "simulating game_id={} players={} sqlite={}",
        summary.game_id, summary.players, sqlite_path
    );

    loop {
        let victim = {
            let tx = engine
                .store_mut()
                .tx()
                .map_err(|err| format!("store error: {err}"))?;
            let contracts = tx
                .active_contracts(summary.game_id)
                .map_err(|err| format!("store error: {err}"))?;
            match contracts.first() {
                Some(contract) => contract.target_player_id,
                None => return Err("no contracts left and no winner".to_string()),
            }
        };
        let outcome = engine
            .simulate_death(victim)
            .map_err(|err| format!("death failed: {err}"))?;
        println!(
            "  {} took out {}",
            outcome.killer.display_name, outcome.victim.display_name
        );
        if let Some(finished) = outcome.finished {
            println!();
            println!("{}", finished.report);
            return Ok(());
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("status") => {
            if let Err(err) = show_status(&args) {
                eprintln!("error: {err}");
                std::process::exit(2);
            }
        }
        Some("report") => {
            if let Err(err) = show_report(&args) {
                eprintln!("error: {err}");
                std::process::exit(2);
            }
        }
        Some("reset") => {
            if let Err(err) = reset(&args) {
                eprintln!("error: {err}");
                std::process::exit(2);
            }
        }
        Some("serve") => match parse_socket_addr(args.get(2)) {
            Ok(addr) => {
                let sqlite_path = parse_sqlite_path(args.get(3));
                println!("serving api on http://{addr} sqlite={sqlite_path}");
                if let Err(err) = serve(addr, sqlite_path, EngineConfig::default()).await {
                    eprintln!("server error: {err}");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        },
        Some("simulate") => {
            if let Err(err) = run_simulation(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        _ => {
            print_usage();
        }
    }
}
