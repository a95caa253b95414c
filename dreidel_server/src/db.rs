use anyhow::Context;
use dreidel_core::{ConfigDocument, Direction, SpinConfig, Symbol};
use dreidel_shared::SpinLogEntry;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::session::SettledSpin;

// DB schema is defined in migrations (see migrations/ folder)

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredParams {
    pub server_seed: String,
    pub server_seed_hash: String,
    pub config_json: String,
    pub nonce: i64,
}

impl StoredParams {
    /// Stored rules, or the traditional ones when none were ever set.
    pub fn rules(&self) -> anyhow::Result<SpinConfig> {
        if self.config_json.trim().is_empty() {
            return Ok(SpinConfig::traditional());
        }
        SpinConfig::from_json_str(&self.config_json).context("stored rules are invalid")
    }
}

pub async fn get_params(pool: &SqlitePool) -> anyhow::Result<StoredParams> {
    let row = sqlx::query_as::<_, StoredParams>(
        "SELECT server_seed, server_seed_hash, config_json, nonce FROM params WHERE id = 1",
    )
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn set_params(pool: &SqlitePool, p: &StoredParams) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE params SET server_seed = ?, server_seed_hash = ?, config_json = ?, nonce = ? WHERE id = 1",
    )
    .bind(&p.server_seed)
    .bind(&p.server_seed_hash)
    .bind(&p.config_json)
    .bind(p.nonce)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn save_nonce(pool: &SqlitePool, nonce: u64) -> anyhow::Result<()> {
    sqlx::query("UPDATE params SET nonce = ? WHERE id = 1")
        .bind(nonce as i64)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn save_rules(pool: &SqlitePool, doc: &ConfigDocument) -> anyhow::Result<()> {
    sqlx::query("UPDATE params SET config_json = ? WHERE id = 1")
        .bind(serde_json::to_string(doc)?)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn init_db(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(db).await?;
    // ensure server_seed_hash matches server_seed
    let mut p = get_params(db).await?;
    let hash = dreidel_core::derive_hash_hex(p.server_seed.as_bytes());
    if p.server_seed_hash != hash {
        p.server_seed_hash = hash;
        set_params(db, &p).await?;
    }
    Ok(())
}

fn enum_text<T: Serialize>(value: &T) -> anyhow::Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => anyhow::bail!("expected a string variant, got {other}"),
    }
}

pub async fn log_spin(pool: &SqlitePool, spin: &SettledSpin) -> anyhow::Result<()> {
    let ts = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO spins (ts, client_seed, nonce, server_seed_hash, player, symbol, amount_moved, direction, pot_after) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(ts)
    .bind(&spin.client_seed)
    .bind(spin.nonce as i64)
    .bind(&spin.server_seed_hash)
    .bind(spin.result.player as i64)
    .bind(enum_text(&spin.result.symbol)?)
    .bind(spin.result.amount_moved as i64)
    .bind(enum_text(&spin.result.direction)?)
    .bind(spin.pot_after as i64)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn recent_spins(pool: &SqlitePool, n: i64) -> anyhow::Result<Vec<SpinLogEntry>> {
    let rows = sqlx::query(
        "SELECT id, ts, client_seed, nonce, server_seed_hash, player, symbol, amount_moved, direction, pot_after FROM spins ORDER BY id DESC LIMIT ?",
    )
    .bind(n)
    .fetch_all(pool)
    .await?;
    rows.iter()
        .map(|r| -> anyhow::Result<SpinLogEntry> {
            let ts: String = r.get("ts");
            let symbol: String = r.get("symbol");
            let direction: String = r.get("direction");
            Ok(SpinLogEntry {
                id: r.get("id"),
                ts: chrono::DateTime::parse_from_rfc3339(&ts)?.with_timezone(&chrono::Utc),
                client_seed: r.get("client_seed"),
                nonce: r.get("nonce"),
                server_seed_hash: r.get("server_seed_hash"),
                player: r.get("player"),
                symbol: symbol.parse::<Symbol>()?,
                amount_moved: r.get("amount_moved"),
                direction: serde_json::from_value::<Direction>(serde_json::Value::String(direction))?,
                pot_after: r.get("pot_after"),
            })
        })
        .collect()
}
