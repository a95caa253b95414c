//! Pot and per-player gelt balances

use serde::{Deserialize, Serialize};

use crate::config::StartingGelt;
use crate::error::{DreidelError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub gelt: u64,
}

/// Shared economic state. Readable by anyone; only settlement and the turn controller
/// change balances.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawLedger")]
pub struct Ledger {
    pot: u64,
    players: Vec<Player>,
}

#[derive(Deserialize)]
struct RawLedger {
    pot: u64,
    players: Vec<Player>,
}

impl TryFrom<RawLedger> for Ledger {
    type Error = DreidelError;

    fn try_from(raw: RawLedger) -> Result<Self> {
        Ledger::checked(raw.pot, raw.players)
    }
}

impl Ledger {
    pub fn new(player_count: usize, starting: StartingGelt) -> Result<Self> {
        if player_count < 1 {
            return Err(DreidelError::config("player count must be at least 1"));
        }
        Self::checked(
            starting.pot,
            vec![Player { gelt: starting.player }; player_count],
        )
    }

    /// Builds a ledger from explicit balances, e.g. to resume a saved table.
    pub fn from_balances(pot: u64, gelt: impl IntoIterator<Item = u64>) -> Result<Self> {
        Self::checked(pot, gelt.into_iter().map(|gelt| Player { gelt }).collect())
    }

    /// Every ledger has a player and a total that fits in `u64`, so no transfer can overflow.
    fn checked(pot: u64, players: Vec<Player>) -> Result<Self> {
        if players.is_empty() {
            return Err(DreidelError::config("player count must be at least 1"));
        }
        players
            .iter()
            .try_fold(pot, |acc, p| acc.checked_add(p.gelt))
            .ok_or_else(|| DreidelError::config("total gelt does not fit in 64 bits"))?;
        Ok(Self { pot, players })
    }

    pub fn pot(&self) -> u64 {
        self.pot
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn gelt(&self, index: usize) -> Result<u64> {
        self.check_index(index)?;
        Ok(self.players[index].gelt)
    }

    /// Pot plus every player's gelt.
    pub fn total(&self) -> u64 {
        // bounded at construction; saturating keeps a corrupted ledger from panicking here
        self.players
            .iter()
            .fold(self.pot, |acc, p| acc.saturating_add(p.gelt))
    }

    /// Nobody can move gelt any more.
    pub fn is_exhausted(&self) -> bool {
        self.pot == 0 && self.players.iter().all(|p| p.gelt == 0)
    }

    pub fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.players.len() {
            return Err(DreidelError::Index {
                index,
                count: self.players.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn pot_to_player(&mut self, index: usize, amount: u64) {
        assert!(amount <= self.pot, "pot would go negative");
        self.pot -= amount;
        self.players[index].gelt += amount;
    }

    pub(crate) fn player_to_pot(&mut self, index: usize, amount: u64) {
        let player = &mut self.players[index];
        assert!(amount <= player.gelt, "gelt would go negative");
        player.gelt -= amount;
        self.pot += amount;
    }

    /// Every player holding gelt pays one unit into the pot. Returns how many paid.
    pub(crate) fn collect_ante(&mut self) -> u64 {
        let mut contributors = 0;
        for player in self.players.iter_mut().filter(|p| p.gelt > 0) {
            player.gelt -= 1;
            contributors += 1;
        }
        self.pot += contributors;
        contributors
    }
}
