//! Turn sequencing: `Idle -> Spinning -> Settling -> Idle`.
//!
//! The controller owns the ledger. A spin picks its symbol as soon as it starts; settlement
//! waits for `complete_spin` (or `land` when the presentation layer decides the face) so a
//! cosmetic animation can run in between without affecting the outcome.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::SpinConfig,
    error::{DreidelError, Result},
    ledger::Ledger,
    rng::RandomSource,
    selector::select_outcome,
    settlement::{settle, SettlementResult},
    symbols::Symbol,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    Spinning,
    Settling,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Idle => "idle",
            Phase::Spinning => "spinning",
            Phase::Settling => "settling",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnState {
    pub phase: Phase,
    pub current_player: usize,
}

/// What happens to a spin request that arrives while another spin is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReentryPolicy {
    #[default]
    Reject,
    /// Hold the request and start it as soon as the current turn settles.
    Queue,
}

/// Who decides the face a spin lands on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutcomeSource {
    #[default]
    Selector,
    /// The presentation layer reports the landed face through `land`.
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinTicket {
    /// `symbol` is `None` while an external landing is awaited.
    Started {
        player: usize,
        symbol: Option<Symbol>,
    },
    Queued {
        pending: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    SymbolChosen {
        player: usize,
        symbol: Symbol,
    },
    Ante {
        contributors: u64,
        pot: u64,
    },
    Settled {
        result: SettlementResult,
        pot: u64,
        next_player: usize,
    },
    Cancelled {
        symbol: Option<Symbol>,
        dropped_requests: usize,
    },
}

/// Notifications for the presentation layer. Every method defaults to doing nothing.
pub trait TurnListener {
    fn on_symbol_chosen(&mut self, _player: usize, _symbol: Symbol) {}

    fn on_ante(&mut self, _contributors: u64, _ledger: &Ledger) {}

    fn on_settled(&mut self, _result: &SettlementResult, _ledger: &Ledger, _next_player: usize) {}

    fn on_cancelled(&mut self, _symbol: Option<Symbol>, _dropped_requests: usize) {}
}

impl TurnListener for () {}

/// Records every notification, in order.
impl TurnListener for Vec<TurnEvent> {
    fn on_symbol_chosen(&mut self, player: usize, symbol: Symbol) {
        self.push(TurnEvent::SymbolChosen { player, symbol });
    }

    fn on_ante(&mut self, contributors: u64, ledger: &Ledger) {
        self.push(TurnEvent::Ante {
            contributors,
            pot: ledger.pot(),
        });
    }

    fn on_settled(&mut self, result: &SettlementResult, ledger: &Ledger, next_player: usize) {
        self.push(TurnEvent::Settled {
            result: *result,
            pot: ledger.pot(),
            next_player,
        });
    }

    fn on_cancelled(&mut self, symbol: Option<Symbol>, dropped_requests: usize) {
        self.push(TurnEvent::Cancelled {
            symbol,
            dropped_requests,
        });
    }
}

/// Fresh ledger and turn state for a new game.
pub fn init_game(player_count: usize, config: &SpinConfig) -> Result<(Ledger, TurnState)> {
    config.validate()?;
    let ledger = Ledger::new(player_count, config.starting_gelt)?;
    Ok((
        ledger,
        TurnState {
            phase: Phase::Idle,
            current_player: 0,
        },
    ))
}

pub struct TurnController<R, L = ()> {
    config: SpinConfig,
    ledger: Ledger,
    state: TurnState,
    pending: Option<Symbol>,
    queued: usize,
    reentry: ReentryPolicy,
    source: OutcomeSource,
    rng: R,
    listener: L,
}

impl<R: RandomSource> TurnController<R> {
    pub fn new(player_count: usize, config: SpinConfig, rng: R) -> Result<Self> {
        let (ledger, state) = init_game(player_count, &config)?;
        Ok(Self {
            config,
            ledger,
            state,
            pending: None,
            queued: 0,
            reentry: ReentryPolicy::default(),
            source: OutcomeSource::default(),
            rng,
            listener: (),
        })
    }

    /// Picks up an existing table at player 0.
    pub fn from_ledger(ledger: Ledger, config: SpinConfig, rng: R) -> Result<Self> {
        config.validate()?;
        if ledger.player_count() == 0 {
            return Err(DreidelError::config("player count must be at least 1"));
        }
        Ok(Self {
            config,
            ledger,
            state: TurnState {
                phase: Phase::Idle,
                current_player: 0,
            },
            pending: None,
            queued: 0,
            reentry: ReentryPolicy::default(),
            source: OutcomeSource::default(),
            rng,
            listener: (),
        })
    }
}

impl<R: RandomSource, L: TurnListener> TurnController<R, L> {
    pub fn with_listener<L2: TurnListener>(self, listener: L2) -> TurnController<R, L2> {
        TurnController {
            config: self.config,
            ledger: self.ledger,
            state: self.state,
            pending: self.pending,
            queued: self.queued,
            reentry: self.reentry,
            source: self.source,
            rng: self.rng,
            listener,
        }
    }

    pub fn with_reentry(mut self, policy: ReentryPolicy) -> Self {
        self.reentry = policy;
        self
    }

    pub fn with_outcome_source(mut self, source: OutcomeSource) -> Self {
        self.source = source;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn current_player(&self) -> usize {
        self.state.current_player
    }

    pub fn config(&self) -> &SpinConfig {
        &self.config
    }

    /// Symbol chosen for the spin in flight, if any.
    pub fn pending_symbol(&self) -> Option<Symbol> {
        self.pending
    }

    pub fn queued_requests(&self) -> usize {
        self.queued
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// How long the presentation layer may animate before calling `complete_spin`.
    pub fn spin_duration(&self) -> Duration {
        self.config.spin_duration()
    }

    pub fn request_spin(&mut self) -> Result<SpinTicket> {
        if self.state.phase != Phase::Idle {
            return match self.reentry {
                ReentryPolicy::Reject => Err(self.invalid("request a spin")),
                ReentryPolicy::Queue => {
                    self.queued += 1;
                    debug!(pending = self.queued, "spin request queued");
                    Ok(SpinTicket::Queued {
                        pending: self.queued,
                    })
                }
            };
        }
        if self.ledger.is_exhausted() {
            return Err(DreidelError::Exhausted);
        }
        Ok(self.begin_spin())
    }

    /// Settles the symbol chosen when the spin started.
    pub fn complete_spin(&mut self) -> Result<SettlementResult> {
        self.expect_phase(Phase::Spinning, "complete a spin")?;
        let symbol = self
            .pending
            .ok_or_else(|| self.invalid("complete a spin before it has landed"))?;
        self.settle_pending(symbol)
    }

    /// Settles a face reported by the presentation layer.
    pub fn land(&mut self, symbol: Symbol) -> Result<SettlementResult> {
        self.expect_phase(Phase::Spinning, "land a symbol")?;
        if self.source != OutcomeSource::External {
            return Err(self.invalid("land a symbol the selector already chose"));
        }
        self.listener
            .on_symbol_chosen(self.state.current_player, symbol);
        self.settle_pending(symbol)
    }

    /// Abandons the spin in flight along with any queued requests. The ledger is untouched.
    pub fn cancel_spin(&mut self) -> Option<Symbol> {
        if self.state.phase != Phase::Spinning {
            return None;
        }
        let symbol = self.pending.take();
        let dropped = std::mem::take(&mut self.queued);
        self.state.phase = Phase::Idle;
        info!(?symbol, dropped, "spin cancelled");
        self.listener.on_cancelled(symbol, dropped);
        symbol
    }

    /// Starts a new game with `player_count` players. The current game is only discarded
    /// once the new one is known to be valid.
    pub fn reset(&mut self, player_count: usize) -> Result<()> {
        let (ledger, state) = init_game(player_count, &self.config)?;
        self.cancel_spin();
        self.ledger = ledger;
        self.state = state;
        info!(player_count, "game reset");
        Ok(())
    }

    fn begin_spin(&mut self) -> SpinTicket {
        self.state.phase = Phase::Spinning;
        let player = self.state.current_player;
        let symbol = match self.source {
            OutcomeSource::Selector => {
                let symbol = select_outcome(&self.config, &mut self.rng);
                self.pending = Some(symbol);
                self.listener.on_symbol_chosen(player, symbol);
                Some(symbol)
            }
            OutcomeSource::External => None,
        };
        debug!(player, ?symbol, "spinning");
        SpinTicket::Started { player, symbol }
    }

    fn settle_pending(&mut self, symbol: Symbol) -> Result<SettlementResult> {
        self.state.phase = Phase::Settling;
        let player = self.state.current_player;
        let result = match settle(&mut self.ledger, player, symbol, &self.config) {
            Ok(result) => result,
            Err(e) => {
                self.state.phase = Phase::Spinning;
                return Err(e);
            }
        };
        self.pending = None;
        info!(
            player,
            %symbol,
            amount = result.amount_moved,
            direction = ?result.direction,
            pot = self.ledger.pot(),
            "settled"
        );

        self.state.current_player = (player + 1) % self.ledger.player_count();
        if self.config.ante_on_empty_pot && self.ledger.pot() == 0 {
            let contributors = self.ledger.collect_ante();
            if contributors > 0 {
                info!(contributors, "pot empty, everyone antes");
                self.listener.on_ante(contributors, &self.ledger);
            }
        }

        self.state.phase = Phase::Idle;
        self.listener
            .on_settled(&result, &self.ledger, self.state.current_player);

        if self.queued > 0 {
            if self.ledger.is_exhausted() {
                let dropped = std::mem::take(&mut self.queued);
                warn!(dropped, "no gelt left, queued spins discarded");
                self.listener.on_cancelled(None, dropped);
            } else {
                self.queued -= 1;
                self.begin_spin();
            }
        }
        Ok(result)
    }

    fn expect_phase(&self, phase: Phase, action: &'static str) -> Result<()> {
        if self.state.phase != phase {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> DreidelError {
        DreidelError::InvalidState {
            action,
            phase: self.state.phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SequenceRng;

    // 0.0 -> Nun, 0.3 -> Gimel, 0.6 -> Hey, 0.9 -> Shin under uniform selection
    const NUN: f64 = 0.0;
    const GIMEL: f64 = 0.3;

    fn controller(players: usize, draws: Vec<f64>) -> TurnController<SequenceRng, Vec<TurnEvent>> {
        TurnController::new(players, SpinConfig::traditional(), SequenceRng::new(draws))
            .unwrap()
            .with_listener(Vec::new())
    }

    #[test]
    fn init_game_starts_idle_at_player_zero() {
        let (ledger, state) = init_game(3, &SpinConfig::traditional()).unwrap();
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.current_player, 0);
        assert_eq!(ledger.player_count(), 3);
        assert!(matches!(
            init_game(0, &SpinConfig::traditional()),
            Err(DreidelError::Config(_))
        ));
    }

    #[test]
    fn starting_gelt_too_large_for_the_table_is_refused() {
        let config = SpinConfig::traditional().with_starting_gelt(u64::MAX - 1, 1);
        assert!(init_game(1, &config).is_ok());
        assert!(matches!(
            TurnController::new(2, config, SequenceRng::new(vec![0.1])),
            Err(DreidelError::Config(_))
        ));
    }

    #[test]
    fn symbol_is_announced_before_ledger_moves() {
        let mut game = controller(2, vec![GIMEL]);
        let before = game.ledger().clone();
        let ticket = game.request_spin().unwrap();
        assert_eq!(
            ticket,
            SpinTicket::Started {
                player: 0,
                symbol: Some(Symbol::Gimel)
            }
        );
        assert_eq!(game.phase(), Phase::Spinning);
        assert_eq!(game.ledger(), &before);
        assert_eq!(
            game.listener(),
            &vec![TurnEvent::SymbolChosen {
                player: 0,
                symbol: Symbol::Gimel
            }]
        );
    }

    #[test]
    fn double_spin_is_rejected_without_touching_ledger() {
        let mut game = controller(2, vec![NUN]);
        game.request_spin().unwrap();
        let before = game.ledger().clone();
        let err = game.request_spin().unwrap_err();
        assert_eq!(
            err,
            DreidelError::InvalidState {
                action: "request a spin",
                phase: Phase::Spinning
            }
        );
        assert_eq!(game.ledger(), &before);
        assert_eq!(game.phase(), Phase::Spinning);
    }

    #[test]
    fn sequential_spins_are_accepted() {
        let mut game = controller(2, vec![NUN]);
        game.request_spin().unwrap();
        game.complete_spin().unwrap();
        assert!(game.request_spin().is_ok());
        game.complete_spin().unwrap();
        assert_eq!(game.current_player(), 0);
    }

    #[test]
    fn queued_request_starts_after_settlement() {
        let mut game = controller(2, vec![NUN]).with_reentry(ReentryPolicy::Queue);
        game.request_spin().unwrap();
        assert_eq!(
            game.request_spin().unwrap(),
            SpinTicket::Queued { pending: 1 }
        );
        game.complete_spin().unwrap();
        assert_eq!(game.phase(), Phase::Spinning);
        assert_eq!(game.current_player(), 1);
        assert_eq!(game.queued_requests(), 0);
        game.complete_spin().unwrap();
        assert_eq!(game.phase(), Phase::Idle);
        let settlements = game
            .listener()
            .iter()
            .filter(|e| matches!(e, TurnEvent::Settled { .. }))
            .count();
        assert_eq!(settlements, 2);
    }

    #[test]
    fn complete_while_idle_is_invalid() {
        let mut game = controller(2, vec![NUN]);
        assert!(matches!(
            game.complete_spin(),
            Err(DreidelError::InvalidState {
                phase: Phase::Idle,
                ..
            })
        ));
    }

    #[test]
    fn turn_index_wraps() {
        let mut game = controller(3, vec![NUN]);
        game.request_spin().unwrap();
        game.complete_spin().unwrap();
        assert_eq!(game.current_player(), 1);
        for _ in 0..2 {
            game.request_spin().unwrap();
            game.complete_spin().unwrap();
        }
        assert_eq!(game.current_player(), 0);
    }

    #[test]
    fn gimel_empties_pot_then_everyone_antes() {
        let mut game = controller(2, vec![GIMEL]);
        game.request_spin().unwrap();
        let result = game.complete_spin().unwrap();
        assert_eq!(result.amount_moved, 20);
        assert_eq!(game.ledger().pot(), 2);
        assert_eq!(game.ledger().gelt(0).unwrap(), 29);
        assert_eq!(game.ledger().gelt(1).unwrap(), 9);
        assert_eq!(
            game.listener()[1..],
            [
                TurnEvent::Ante {
                    contributors: 2,
                    pot: 2
                },
                TurnEvent::Settled {
                    result,
                    pot: 2,
                    next_player: 1
                },
            ]
        );
    }

    #[test]
    fn ante_disabled_leaves_pot_empty() {
        let config = SpinConfig::traditional().with_ante(false);
        let mut game = TurnController::new(2, config, SequenceRng::new(vec![GIMEL])).unwrap();
        game.request_spin().unwrap();
        game.complete_spin().unwrap();
        assert_eq!(game.ledger().pot(), 0);
        assert_eq!(game.ledger().total(), 40);
    }

    #[test]
    fn cancel_discards_outcome() {
        let mut game = controller(2, vec![GIMEL]);
        let before = game.ledger().clone();
        game.request_spin().unwrap();
        assert_eq!(game.cancel_spin(), Some(Symbol::Gimel));
        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.current_player(), 0);
        assert_eq!(game.ledger(), &before);
        assert!(game.complete_spin().is_err());
        assert_eq!(game.cancel_spin(), None);
    }

    #[test]
    fn reset_mid_spin_starts_over() {
        let mut game = controller(2, vec![GIMEL]);
        game.request_spin().unwrap();
        game.reset(4).unwrap();
        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.ledger().player_count(), 4);
        assert_eq!(game.ledger().pot(), 20);
        assert!(game.reset(0).is_err());
        assert_eq!(game.ledger().player_count(), 4);
    }

    #[test]
    fn external_landing_drives_settlement() {
        let mut game = controller(2, vec![NUN]).with_outcome_source(OutcomeSource::External);
        assert_eq!(
            game.request_spin().unwrap(),
            SpinTicket::Started {
                player: 0,
                symbol: None
            }
        );
        assert!(game.complete_spin().is_err());
        let result = game.land(Symbol::Hey).unwrap();
        assert_eq!(result.amount_moved, 10);
        assert_eq!(game.ledger().pot(), 10);
        assert_eq!(game.current_player(), 1);
    }

    #[test]
    fn land_is_refused_when_selector_decides() {
        let mut game = controller(2, vec![NUN]);
        game.request_spin().unwrap();
        assert!(game.land(Symbol::Gimel).is_err());
        assert_eq!(game.pending_symbol(), Some(Symbol::Nun));
    }

    #[test]
    fn exhausted_table_refuses_spins() {
        let ledger = Ledger::from_balances(0, [0, 0]).unwrap();
        let mut game =
            TurnController::from_ledger(ledger, SpinConfig::traditional(), SequenceRng::new(vec![NUN]))
                .unwrap();
        assert_eq!(game.request_spin().unwrap_err(), DreidelError::Exhausted);
        assert_eq!(game.phase(), Phase::Idle);
    }

    #[test]
    fn resumed_table_keeps_balances() {
        let ledger = Ledger::from_balances(3, [5, 0, 7]).unwrap();
        let mut game =
            TurnController::from_ledger(ledger, SpinConfig::traditional(), SequenceRng::new(vec![GIMEL]))
                .unwrap();
        game.request_spin().unwrap();
        game.complete_spin().unwrap();
        // player 1 is broke so only two ante
        assert_eq!(game.ledger().pot(), 2);
        assert_eq!(game.ledger().gelt(0).unwrap(), 7);
        assert_eq!(game.ledger().gelt(2).unwrap(), 6);
    }
}
