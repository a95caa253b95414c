use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dreidel_core::{
    spin_with_seeds, Rounding, SeededRng, SpinConfig, Symbol, TurnController, TurnEvent,
};
use sha2::{Digest, Sha256};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

#[derive(Parser)]
#[command(name = "dreidel-cli", about = "Admin and offline tools for the dreidel server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Database URL, default sqlite://dreidel.db
    #[arg(long, value_parser, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rotate server seed to a new secret
    RotateSeed { new_seed: String },
    /// View last N spins
    ViewLogs {
        #[arg(default_value_t = 20)]
        n: i64,
    },
    /// Export spins to CSV path
    ExportCsv { path: String },
    /// Play a game locally without the server
    Simulate {
        #[arg(long, default_value_t = 2)]
        players: usize,
        #[arg(long, default_value_t = 20)]
        spins: usize,
        /// Seed for a repeatable game; random when omitted
        #[arg(long)]
        seed: Option<u64>,
        /// Rules document; traditional rules when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the half-pot rounding
        #[arg(long, value_parser = parse_rounding)]
        rounding: Option<Rounding>,
    },
    /// Recompute the symbol a published spin must have landed on
    Verify {
        #[arg(long)]
        server_seed: String,
        #[arg(long)]
        client_seed: String,
        #[arg(long)]
        nonce: u64,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Symbol the server published, checked against the recomputed one
        #[arg(long)]
        expect: Option<Symbol>,
    },
}

fn parse_rounding(s: &str) -> Result<Rounding, String> {
    match s {
        "floor" => Ok(Rounding::Floor),
        "ceil" => Ok(Rounding::Ceil),
        other => Err(format!("expected floor or ceil, got '{other}'")),
    }
}

fn load_rules(path: Option<PathBuf>) -> anyhow::Result<SpinConfig> {
    match path {
        Some(path) => SpinConfig::from_path(&path)
            .with_context(|| format!("loading rules from {}", path.display())),
        None => Ok(SpinConfig::traditional()),
    }
}

async fn get_pool(url: Option<String>) -> anyhow::Result<SqlitePool> {
    let url = url.unwrap_or_else(|| "sqlite://dreidel.db".into());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;
    Ok(pool)
}

fn simulate(
    players: usize,
    spins: usize,
    seed: Option<u64>,
    config: SpinConfig,
) -> anyhow::Result<()> {
    let rng = match seed {
        Some(seed) => SeededRng::seed_from_u64(seed),
        None => SeededRng::from_entropy(),
    };
    let mut game = TurnController::new(players, config, rng)?.with_listener(Vec::<TurnEvent>::new());
    let start_total = game.ledger().total();

    for _ in 0..spins {
        if let Err(e) = game.request_spin() {
            println!("stopping: {e}");
            break;
        }
        game.complete_spin()?;
        for event in std::mem::take(game.listener_mut()) {
            match event {
                TurnEvent::Settled {
                    result,
                    pot,
                    next_player,
                } => {
                    let effect = game.config().effect_of(result.symbol);
                    println!(
                        "player {} | {} | moved {} {:?} | pot {} | next {}",
                        result.player,
                        result.symbol.describe(effect),
                        result.amount_moved,
                        result.direction,
                        pot,
                        next_player
                    );
                }
                TurnEvent::Ante { contributors, pot } => {
                    println!("  ante: {contributors} players chip in, pot {pot}");
                }
                _ => {}
            }
        }
    }

    let ledger = game.ledger();
    for (i, p) in ledger.players().iter().enumerate() {
        println!("player {i}: {} gelt", p.gelt);
    }
    println!("pot: {}", ledger.pot());
    anyhow::ensure!(
        ledger.total() == start_total,
        "gelt not conserved: started with {start_total}, ended with {}",
        ledger.total()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            players,
            spins,
            seed,
            config,
            rounding,
        } => {
            let mut rules = load_rules(config)?;
            if let Some(rounding) = rounding {
                rules = rules.with_rounding(rounding);
            }
            simulate(players, spins, seed, rules)?;
        }
        Commands::Verify {
            server_seed,
            client_seed,
            nonce,
            config,
            expect,
        } => {
            let rules = load_rules(config)?;
            let symbol = spin_with_seeds(&server_seed, &client_seed, nonce, &rules);
            println!("nonce {nonce} -> {symbol} ({})", symbol.letter());
            if let Some(expected) = expect {
                anyhow::ensure!(
                    symbol == expected,
                    "published {expected} does not match recomputed {symbol}"
                );
                println!("verified");
            }
        }
        command => {
            let pool = get_pool(cli.database_url).await?;
            run_admin(&pool, command).await?;
        }
    }
    Ok(())
}

async fn run_admin(pool: &SqlitePool, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::RotateSeed { new_seed } => {
            let hash = {
                let mut h = Sha256::new();
                h.update(new_seed.as_bytes());
                hex::encode(h.finalize())
            };
            sqlx::query(
                "UPDATE params SET server_seed = ?, server_seed_hash = ?, nonce = 0 WHERE id = 1",
            )
            .bind(new_seed)
            .bind(hash.clone())
            .execute(pool)
            .await?;
            println!("Rotated server seed. New hash: {}", hash);
            println!("The running server picks it up at the next new game.");
        }
        Commands::ViewLogs { n } => {
            let rows = sqlx::query("SELECT id, ts, client_seed, nonce, player, symbol, amount_moved, direction, pot_after FROM spins ORDER BY id DESC LIMIT ?")
                .bind(n)
                .fetch_all(pool).await?;
            for r in rows {
                let id: i64 = r.get("id");
                let ts: String = r.get("ts");
                let client_seed: String = r.get("client_seed");
                let nonce: i64 = r.get("nonce");
                let player: i64 = r.get("player");
                let symbol: String = r.get("symbol");
                let amount: i64 = r.get("amount_moved");
                let direction: String = r.get("direction");
                let pot_after: i64 = r.get("pot_after");
                println!(
                    "#{:>6} {} seed={} nonce={} player={} {} {} {} pot={}",
                    id, ts, client_seed, nonce, player, symbol, amount, direction, pot_after
                );
            }
        }
        Commands::ExportCsv { path } => {
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record([
                "id",
                "ts",
                "client_seed",
                "nonce",
                "server_seed_hash",
                "player",
                "symbol",
                "amount_moved",
                "direction",
                "pot_after",
            ])?;
            let rows = sqlx::query("SELECT id, ts, client_seed, nonce, server_seed_hash, player, symbol, amount_moved, direction, pot_after FROM spins ORDER BY id ASC")
                .fetch_all(pool).await?;
            let total = rows.len();
            for r in &rows {
                wtr.write_record(&[
                    r.get::<i64, _>("id").to_string(),
                    r.get::<String, _>("ts"),
                    r.get::<String, _>("client_seed"),
                    r.get::<i64, _>("nonce").to_string(),
                    r.get::<String, _>("server_seed_hash"),
                    r.get::<i64, _>("player").to_string(),
                    r.get::<String, _>("symbol"),
                    r.get::<i64, _>("amount_moved").to_string(),
                    r.get::<String, _>("direction"),
                    r.get::<i64, _>("pot_after").to_string(),
                ])?;
            }
            wtr.flush()?;
            println!("Exported {} rows to {}", total, path);
        }
        Commands::Simulate { .. } | Commands::Verify { .. } => {
            anyhow::bail!("not a database command")
        }
    }
    Ok(())
}
