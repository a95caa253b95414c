//! Applies a symbol's rule to the ledger.

use serde::{Deserialize, Serialize};

use crate::{
    config::SpinConfig,
    error::Result,
    ledger::Ledger,
    symbols::{RuleEffect, Symbol},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    ToPlayer,
    ToPot,
    None,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResult {
    pub symbol: Symbol,
    pub player: usize,
    pub amount_moved: u64,
    pub direction: Direction,
}

/// Settles `symbol` for the player at `player_index`. The index is checked before anything
/// moves, so an error leaves the ledger untouched.
pub fn settle(
    ledger: &mut Ledger,
    player_index: usize,
    symbol: Symbol,
    config: &SpinConfig,
) -> Result<SettlementResult> {
    ledger.check_index(player_index)?;
    let before = ledger.total();

    let (amount_moved, direction) = match config.effect_of(symbol) {
        RuleEffect::Nothing => (0, Direction::None),
        RuleEffect::TakeAll => {
            let amount = ledger.pot();
            ledger.pot_to_player(player_index, amount);
            (amount, Direction::ToPlayer)
        }
        RuleEffect::TakeHalf => {
            let half = config.half_rounding.half_of(ledger.pot());
            ledger.pot_to_player(player_index, half);
            (half, Direction::ToPlayer)
        }
        RuleEffect::PutIn(put_amount) => {
            // short players put in whatever they have left
            let amount = put_amount.min(ledger.gelt(player_index)?);
            ledger.player_to_pot(player_index, amount);
            (amount, Direction::ToPot)
        }
    };

    assert_eq!(before, ledger.total(), "settlement must conserve gelt");
    Ok(SettlementResult {
        symbol,
        player: player_index,
        amount_moved,
        direction: if amount_moved == 0 {
            Direction::None
        } else {
            direction
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DreidelError;
    use crate::symbols::Rounding;

    #[test]
    fn nun_changes_nothing() {
        let mut ledger = Ledger::from_balances(5, [3]).unwrap();
        let res = settle(&mut ledger, 0, Symbol::Nun, &SpinConfig::traditional()).unwrap();
        assert_eq!(res.amount_moved, 0);
        assert_eq!(res.direction, Direction::None);
        assert_eq!(ledger, Ledger::from_balances(5, [3]).unwrap());
    }

    #[test]
    fn gimel_takes_the_pot() {
        let mut ledger = Ledger::from_balances(9, [1, 4]).unwrap();
        let res = settle(&mut ledger, 1, Symbol::Gimel, &SpinConfig::traditional()).unwrap();
        assert_eq!(res.amount_moved, 9);
        assert_eq!(res.direction, Direction::ToPlayer);
        assert_eq!(ledger.pot(), 0);
        assert_eq!(ledger.gelt(1).unwrap(), 13);
        assert_eq!(ledger.gelt(0).unwrap(), 1);
    }

    #[test]
    fn gimel_on_empty_pot_is_a_no_op() {
        let mut ledger = Ledger::from_balances(0, [4]).unwrap();
        let res = settle(&mut ledger, 0, Symbol::Gimel, &SpinConfig::traditional()).unwrap();
        assert_eq!(res.amount_moved, 0);
        assert_eq!(res.direction, Direction::None);
        assert_eq!(ledger, Ledger::from_balances(0, [4]).unwrap());
    }

    #[test]
    fn hey_rounds_odd_pot_per_policy() {
        let mut ledger = Ledger::from_balances(7, [0]).unwrap();
        let floor = SpinConfig::traditional().with_rounding(Rounding::Floor);
        let res = settle(&mut ledger, 0, Symbol::Hey, &floor).unwrap();
        assert_eq!(res.amount_moved, 3);
        assert_eq!(ledger.pot(), 4);
        assert_eq!(ledger.gelt(0).unwrap(), 3);

        let mut ledger = Ledger::from_balances(7, [0]).unwrap();
        let ceil = SpinConfig::traditional().with_rounding(Rounding::Ceil);
        let res = settle(&mut ledger, 0, Symbol::Hey, &ceil).unwrap();
        assert_eq!(res.amount_moved, 4);
        assert_eq!(ledger.pot(), 3);
        assert_eq!(ledger.gelt(0).unwrap(), 4);
    }

    #[test]
    fn hey_with_pot_of_one_under_floor_moves_nothing() {
        let mut ledger = Ledger::from_balances(1, [0]).unwrap();
        let res = settle(&mut ledger, 0, Symbol::Hey, &SpinConfig::traditional()).unwrap();
        assert_eq!(res.direction, Direction::None);
        assert_eq!(ledger.pot(), 1);
    }

    #[test]
    fn shin_puts_in_configured_amount() {
        let config = SpinConfig::traditional().with_put_amount(2);
        let mut ledger = Ledger::from_balances(0, [5]).unwrap();
        let res = settle(&mut ledger, 0, Symbol::Shin, &config).unwrap();
        assert_eq!(res.amount_moved, 2);
        assert_eq!(res.direction, Direction::ToPot);
        assert_eq!(ledger.pot(), 2);
        assert_eq!(ledger.gelt(0).unwrap(), 3);
    }

    #[test]
    fn shin_with_insufficient_gelt() {
        let config = SpinConfig::traditional().with_put_amount(2);

        let mut broke = Ledger::from_balances(4, [0]).unwrap();
        let res = settle(&mut broke, 0, Symbol::Shin, &config).unwrap();
        assert_eq!(res.amount_moved, 0);
        assert_eq!(res.direction, Direction::None);
        assert_eq!(broke, Ledger::from_balances(4, [0]).unwrap());

        let mut short = Ledger::from_balances(4, [1]).unwrap();
        let res = settle(&mut short, 0, Symbol::Shin, &config).unwrap();
        assert_eq!(res.amount_moved, 1);
        assert_eq!(short.pot(), 5);
        assert_eq!(short.gelt(0).unwrap(), 0);
    }

    #[test]
    fn bad_index_leaves_ledger_untouched() {
        let mut ledger = Ledger::from_balances(8, [2, 2]).unwrap();
        let err = settle(&mut ledger, 2, Symbol::Gimel, &SpinConfig::traditional()).unwrap_err();
        assert_eq!(err, DreidelError::Index { index: 2, count: 2 });
        assert_eq!(ledger, Ledger::from_balances(8, [2, 2]).unwrap());
    }
}
