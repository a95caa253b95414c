use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DreidelError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Symbol {
    Nun,
    Gimel,
    Hey,
    Shin,
}

impl Symbol {
    pub const ALL: [Symbol; 4] = [Symbol::Nun, Symbol::Gimel, Symbol::Hey, Symbol::Shin];

    pub fn from_index(i: u8) -> Self {
        match i % 4 {
            0 => Symbol::Nun,
            1 => Symbol::Gimel,
            2 => Symbol::Hey,
            _ => Symbol::Shin,
        }
    }

    pub fn to_index(self) -> u8 {
        match self {
            Symbol::Nun => 0,
            Symbol::Gimel => 1,
            Symbol::Hey => 2,
            Symbol::Shin => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Symbol::Nun => "Nun",
            Symbol::Gimel => "Gimel",
            Symbol::Hey => "Hey",
            Symbol::Shin => "Shin",
        }
    }

    /// The Hebrew letter printed on the matching face.
    pub fn letter(self) -> char {
        match self {
            Symbol::Nun => 'נ',
            Symbol::Gimel => 'ג',
            Symbol::Hey => 'ה',
            Symbol::Shin => 'ש',
        }
    }

    /// Short announcement for whoever is showing the result to players.
    pub fn describe(self, effect: RuleEffect) -> String {
        let action = match effect {
            RuleEffect::Nothing => "nothing happens".to_string(),
            RuleEffect::TakeAll => "take everything!".to_string(),
            RuleEffect::TakeHalf => "take half!".to_string(),
            RuleEffect::PutIn(1) => "put one in.".to_string(),
            RuleEffect::PutIn(n) => format!("put {n} in."),
        };
        format!("{} {}: {}", self.letter(), self.name(), action)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Symbol {
    type Err = DreidelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nun" => Ok(Symbol::Nun),
            "gimel" | "gimmel" => Ok(Symbol::Gimel),
            "hey" | "hei" | "he" => Ok(Symbol::Hey),
            "shin" => Ok(Symbol::Shin),
            other => Err(DreidelError::Config(format!("unknown symbol '{other}'"))),
        }
    }
}

/// What landing on a symbol does to the ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RuleEffect {
    Nothing,
    TakeAll,
    TakeHalf,
    PutIn(u64),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    #[default]
    Floor,
    Ceil,
}

impl Rounding {
    pub fn half_of(self, amount: u64) -> u64 {
        match self {
            Rounding::Floor => amount / 2,
            Rounding::Ceil => amount / 2 + amount % 2,
        }
    }
}

/// Effect assigned to each symbol, indexed by `Symbol::to_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectTable([RuleEffect; 4]);

impl EffectTable {
    pub fn traditional(put_amount: u64) -> Self {
        Self([
            RuleEffect::Nothing,
            RuleEffect::TakeAll,
            RuleEffect::TakeHalf,
            RuleEffect::PutIn(put_amount),
        ])
    }

    pub fn from_effects(effects: [RuleEffect; 4]) -> Self {
        Self(effects)
    }

    pub fn effect_of(&self, symbol: Symbol) -> RuleEffect {
        self.0[symbol.to_index() as usize]
    }
}
