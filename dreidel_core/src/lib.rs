pub mod config;
pub mod error;
pub mod ledger;
pub mod rng;
pub mod selector;
pub mod settlement;
pub mod symbols;
pub mod turn;

pub use crate::config::{ConfigDocument, EffectName, SpinConfig, StartingGelt, SymbolEntry, Weights};
pub use crate::error::{DreidelError, Result};
pub use crate::ledger::{Ledger, Player};
pub use crate::rng::{derive_floats, derive_hash_hex, ProvablyFairRng, RandomSource, SeededRng, SequenceRng};
pub use crate::selector::{select_outcome, spin_with_seeds, verify_spin};
pub use crate::settlement::{settle, Direction, SettlementResult};
pub use crate::symbols::{EffectTable, Rounding, RuleEffect, Symbol};
pub use crate::turn::{
    init_game, OutcomeSource, Phase, ReentryPolicy, SpinTicket, TurnController, TurnEvent,
    TurnListener, TurnState,
};
