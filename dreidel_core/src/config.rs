//! Game rules: the JSON document players edit and the validated `SpinConfig` built from it.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DreidelError, Result};
use crate::symbols::{EffectTable, RuleEffect, Rounding, Symbol};

const PROBABILITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartingGelt {
    pub pot: u64,
    pub player: u64,
}

/// Per-symbol selection probabilities in declared order. Only constructible when they
/// cover every symbol once and sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights(Vec<(Symbol, f64)>);

impl Weights {
    pub fn new(entries: Vec<(Symbol, f64)>) -> Result<Self> {
        check_symbols_once(entries.iter().map(|(s, _)| *s))?;
        for (symbol, p) in &entries {
            if !p.is_finite() || *p < 0.0 {
                return Err(DreidelError::config(format!(
                    "probability for {symbol} must be a finite non-negative number, got {p}"
                )));
            }
        }
        let sum: f64 = entries.iter().map(|(_, p)| p).sum();
        if (sum - 1.0).abs() > PROBABILITY_EPSILON {
            return Err(DreidelError::config(format!(
                "symbol probabilities sum to {sum}, expected 1.0"
            )));
        }
        Ok(Self(entries))
    }

    pub fn entries(&self) -> &[(Symbol, f64)] {
        &self.0
    }

    pub fn probability_of(&self, symbol: Symbol) -> f64 {
        self.0
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, p)| *p)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpinConfig {
    /// `None` selects uniformly.
    pub weights: Option<Weights>,
    pub effects: EffectTable,
    pub half_rounding: Rounding,
    pub ante_on_empty_pot: bool,
    pub starting_gelt: StartingGelt,
    /// Cosmetic delay between choosing a symbol and settling it.
    pub spin_duration_ms: u64,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self::traditional()
    }
}

impl SpinConfig {
    /// Uniform faces, floor on half pots, put one in, ante on an empty pot; 20 in the pot
    /// and 10 per player.
    pub fn traditional() -> Self {
        Self {
            weights: None,
            effects: EffectTable::traditional(1),
            half_rounding: Rounding::Floor,
            ante_on_empty_pot: true,
            starting_gelt: StartingGelt { pot: 20, player: 10 },
            spin_duration_ms: 0,
        }
    }

    pub fn with_rounding(mut self, rounding: Rounding) -> Self {
        self.half_rounding = rounding;
        self
    }

    pub fn with_put_amount(mut self, amount: u64) -> Self {
        let effects = Symbol::ALL.map(|s| match self.effects.effect_of(s) {
            RuleEffect::PutIn(_) => RuleEffect::PutIn(amount),
            other => other,
        });
        self.effects = EffectTable::from_effects(effects);
        self
    }

    pub fn with_ante(mut self, ante_on_empty_pot: bool) -> Self {
        self.ante_on_empty_pot = ante_on_empty_pot;
        self
    }

    pub fn with_starting_gelt(mut self, pot: u64, player: u64) -> Self {
        self.starting_gelt = StartingGelt { pot, player };
        self
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn effect_of(&self, symbol: Symbol) -> RuleEffect {
        self.effects.effect_of(symbol)
    }

    pub fn spin_duration(&self) -> Duration {
        Duration::from_millis(self.spin_duration_ms)
    }

    /// Checks the invariants that struct literals and builder calls can break.
    pub fn validate(&self) -> Result<()> {
        if self.starting_gelt.pot == 0 {
            return Err(DreidelError::config("startingGelt.pot must be positive"));
        }
        if self.starting_gelt.player == 0 {
            return Err(DreidelError::config("startingGelt.player must be positive"));
        }
        if self.starting_gelt.pot.checked_add(self.starting_gelt.player).is_none() {
            return Err(DreidelError::config("startingGelt does not fit in 64 bits"));
        }
        for symbol in Symbol::ALL {
            if self.effect_of(symbol) == RuleEffect::PutIn(0) {
                return Err(DreidelError::config(format!(
                    "put-in amount for {symbol} must be positive"
                )));
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: ConfigDocument = serde_json::from_str(json)
            .map_err(|e| DreidelError::config(format!("malformed config: {e}")))?;
        Self::try_from(doc)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DreidelError::config(format!("reading {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EffectName {
    Nothing,
    All,
    Half,
    Put,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    pub effect: EffectName,
}

/// The rules document as it appears on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<SymbolEntry>>,
    pub starting_gelt: StartingGelt,
    #[serde(default)]
    pub spin_duration_ms: u64,
    #[serde(default)]
    pub half_rounding: Rounding,
    #[serde(default = "default_put_amount")]
    pub put_amount: u64,
    #[serde(default = "default_ante")]
    pub ante_on_empty_pot: bool,
}

fn default_put_amount() -> u64 {
    1
}

fn default_ante() -> bool {
    true
}

impl TryFrom<ConfigDocument> for SpinConfig {
    type Error = DreidelError;

    fn try_from(doc: ConfigDocument) -> Result<Self> {
        if doc.put_amount == 0 {
            return Err(DreidelError::config("putAmount must be positive"));
        }
        let mut config = SpinConfig {
            weights: None,
            effects: EffectTable::traditional(doc.put_amount),
            half_rounding: doc.half_rounding,
            ante_on_empty_pot: doc.ante_on_empty_pot,
            starting_gelt: doc.starting_gelt,
            spin_duration_ms: doc.spin_duration_ms,
        };

        if let Some(entries) = doc.symbols {
            let parsed = entries
                .iter()
                .map(|e| e.name.parse::<Symbol>())
                .collect::<Result<Vec<_>>>()?;
            check_symbols_once(parsed.iter().copied())?;

            let mut effects = [RuleEffect::Nothing; 4];
            for (symbol, entry) in parsed.iter().zip(&entries) {
                effects[symbol.to_index() as usize] = match entry.effect {
                    EffectName::Nothing => RuleEffect::Nothing,
                    EffectName::All => RuleEffect::TakeAll,
                    EffectName::Half => RuleEffect::TakeHalf,
                    EffectName::Put => RuleEffect::PutIn(doc.put_amount),
                };
            }
            config.effects = EffectTable::from_effects(effects);

            let with_probability = entries.iter().filter(|e| e.probability.is_some()).count();
            if with_probability == entries.len() {
                let weighted = parsed
                    .iter()
                    .zip(&entries)
                    .filter_map(|(s, e)| e.probability.map(|p| (*s, p)))
                    .collect();
                config.weights = Some(Weights::new(weighted)?);
            } else if with_probability != 0 {
                return Err(DreidelError::config(
                    "either every symbol has a probability or none does",
                ));
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn check_symbols_once(symbols: impl Iterator<Item = Symbol>) -> Result<()> {
    let mut seen = [false; 4];
    for s in symbols {
        let slot = &mut seen[s.to_index() as usize];
        if *slot {
            return Err(DreidelError::config(format!("symbol {s} listed twice")));
        }
        *slot = true;
    }
    if let Some(missing) = Symbol::ALL.iter().find(|s| !seen[s.to_index() as usize]) {
        return Err(DreidelError::config(format!("symbol {missing} missing")));
    }
    Ok(())
}
