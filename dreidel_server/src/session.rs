//! The single table the server hosts, plus the timer that settles a spin once its
//! animation has had time to play.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dreidel_core::{
    DreidelError, ProvablyFairRng, SettlementResult, SpinConfig, SpinTicket, Symbol,
    TurnController,
};
use dreidel_shared::{GameView, VerifyResponse};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, info};

pub type Game = TurnController<ProvablyFairRng>;
pub type SharedTable = Arc<Mutex<Table>>;

#[derive(Debug, Clone)]
pub struct StartedSpin {
    pub id: u64,
    pub nonce: u64,
    pub player: usize,
    pub symbol: Symbol,
    pub duration: Duration,
}

/// Everything needed to log a settled spin.
#[derive(Debug, Clone)]
pub struct SettledSpin {
    pub nonce: u64,
    pub client_seed: String,
    pub server_seed_hash: String,
    pub result: SettlementResult,
    pub pot_after: u64,
}

pub struct Table {
    game: Game,
    server_seed_hash: String,
    spin_id: u64,
    in_flight: Option<(u64, u64)>, // (spin id, nonce)
    timer: Option<AbortHandle>,
}

impl Table {
    pub fn new(
        player_count: usize,
        config: SpinConfig,
        rng: ProvablyFairRng,
    ) -> Result<Self, DreidelError> {
        let server_seed_hash = rng.server_seed_hash_hex();
        Ok(Self {
            game: TurnController::new(player_count, config, rng)?,
            server_seed_hash,
            spin_id: 0,
            in_flight: None,
            timer: None,
        })
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn server_seed_hash(&self) -> &str {
        &self.server_seed_hash
    }

    pub fn next_nonce(&self) -> u64 {
        self.game.rng().nonce
    }

    /// Commitment for the seed this table is spinning with, which can differ from the stored
    /// one after a rotation until the next new game.
    pub fn verify(&self) -> VerifyResponse {
        VerifyResponse {
            server_seed_hash: self.server_seed_hash.clone(),
        }
    }

    pub fn view(&self) -> GameView {
        GameView {
            ledger: self.game.ledger().clone(),
            phase: self.game.phase(),
            current_player: self.game.current_player(),
            client_seed: self.game.rng().client_seed.clone(),
            next_nonce: self.next_nonce(),
        }
    }

    pub fn start_spin(&mut self) -> Result<StartedSpin, DreidelError> {
        let nonce = self.next_nonce();
        match self.game.request_spin()? {
            SpinTicket::Started {
                player,
                symbol: Some(symbol),
            } => {
                self.spin_id += 1;
                self.in_flight = Some((self.spin_id, nonce));
                Ok(StartedSpin {
                    id: self.spin_id,
                    nonce,
                    player,
                    symbol,
                    duration: self.game.spin_duration(),
                })
            }
            // the table runs with the default reject policy and core selection
            _ => Err(DreidelError::InvalidState {
                action: "start a spin",
                phase: self.game.phase(),
            }),
        }
    }

    /// Settles spin `id` if it is still the one in flight. `None` means it was cancelled.
    pub fn finish_spin(&mut self, id: u64) -> Option<Result<SettledSpin, DreidelError>> {
        let (current, nonce) = self.in_flight?;
        if current != id {
            return None;
        }
        self.in_flight = None;
        self.timer = None;
        Some(self.game.complete_spin().map(|result| SettledSpin {
            nonce,
            client_seed: self.game.rng().client_seed.clone(),
            server_seed_hash: self.server_seed_hash.clone(),
            result,
            pot_after: self.game.ledger().pot(),
        }))
    }

    /// Stops the pending timer and discards the spin in flight.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.in_flight = None;
        if let Some(symbol) = self.game.cancel_spin() {
            info!(%symbol, "in-flight spin discarded");
        }
    }

    /// Replaces the table. The old one keeps running if the new settings are invalid.
    pub fn replace(
        &mut self,
        player_count: usize,
        config: SpinConfig,
        rng: ProvablyFairRng,
    ) -> Result<(), DreidelError> {
        let fresh = Table::new(player_count, config, rng)?;
        self.cancel();
        *self = Table {
            spin_id: self.spin_id,
            ..fresh
        };
        Ok(())
    }
}

/// Waits out the spin animation, then settles and hands the outcome to `on_settled`.
pub async fn schedule_settlement<F, Fut>(table: SharedTable, spin: &StartedSpin, on_settled: F)
where
    F: FnOnce(SettledSpin) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let id = spin.id;
    let duration = spin.duration;
    let handle = tokio::spawn({
        let table = table.clone();
        async move {
            tokio::time::sleep(duration).await;
            let settled = table.lock().await.finish_spin(id);
            match settled {
                Some(Ok(spin)) => on_settled(spin).await,
                Some(Err(e)) => tracing::error!(error = %e, id, "settlement failed"),
                None => debug!(id, "spin no longer in flight"),
            }
        }
    });
    let mut table = table.lock().await;
    if table.in_flight.map(|(current, _)| current) == Some(id) {
        table.timer = Some(handle.abort_handle());
    }
}
