//! Folding a creature's types against the type chart.
//!
//! Every attacking type starts at a neutral multiplier. Each of the defender's
//! types multiplies it by 2, 0 or 1/2 according to that type's
//! [`CompatibilityRow`]. The results are grouped by multiplier for display,
//! dropping the neutral group.

use crate::cache::CompatibilityRow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// One relation's effect on an accumulated multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    Double,
    Immune,
    Half,
}

/// An exact damage multiplier: zero, or a (possibly negative) power of two.
///
/// Products of 2, 0 and 1/2 never leave this set, so multipliers compare and
/// group without floating-point error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Multiplier {
    immune: bool,
    exponent: i32,
}

impl Multiplier {
    pub const NEUTRAL: Multiplier = Multiplier {
        immune: false,
        exponent: 0,
    };

    pub const IMMUNE: Multiplier = Multiplier {
        immune: true,
        exponent: 0,
    };

    /// `2^exponent`.
    pub fn power_of_two(exponent: i32) -> Self {
        Self {
            immune: false,
            exponent,
        }
    }

    /// Multiply by a contribution. Once immune, always immune.
    pub fn apply(self, contribution: Contribution) -> Self {
        if self.immune {
            return self;
        }
        match contribution {
            Contribution::Double => Self::power_of_two(self.exponent + 1),
            Contribution::Half => Self::power_of_two(self.exponent - 1),
            Contribution::Immune => Self::IMMUNE,
        }
    }

    pub fn is_neutral(self) -> bool {
        self == Self::NEUTRAL
    }

    pub fn is_immune(self) -> bool {
        self.immune
    }

    /// The multiplier scaled by 100 (neutral is 100, immune is 0).
    pub fn percent(self) -> f64 {
        if self.immune {
            0.0
        } else {
            100.0 * 2f64.powi(self.exponent)
        }
    }

    /// Short display label: `0`, `1/4`, `1/2`, `2`, `4`, otherwise `?<percent>`.
    pub fn label(self) -> String {
        if self.immune {
            return "0".to_string();
        }
        match self.exponent {
            -2 => "1/4".to_string(),
            -1 => "1/2".to_string(),
            0 => "1".to_string(),
            1 => "2".to_string(),
            2 => "4".to_string(),
            _ => format!("?{}", self.percent()),
        }
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl Ord for Multiplier {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.immune, other.immune) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.exponent.cmp(&other.exponent),
        }
    }
}

impl PartialOrd for Multiplier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.label())
    }
}

/// Per-attacking-type multipliers from one aggregation.
#[derive(Debug, Clone, Default)]
pub struct Effectiveness {
    /// In order of first encounter.
    entries: Vec<(String, Multiplier)>,
    index: HashMap<String, usize>,
    unresolved: Vec<String>,
}

impl Effectiveness {
    fn contribute(&mut self, category: &str, contribution: Contribution) {
        match self.index.get(category) {
            Some(&i) => {
                let entry = &mut self.entries[i].1;
                *entry = entry.apply(contribution);
            }
            None => {
                self.index.insert(category.to_string(), self.entries.len());
                self.entries.push((
                    category.to_string(),
                    Multiplier::NEUTRAL.apply(contribution),
                ));
            }
        }
    }

    /// Multiplier of an attacking type. Untouched types are neutral.
    pub fn multiplier(&self, category: &str) -> Multiplier {
        self.index
            .get(category)
            .map(|&i| self.entries[i].1)
            .unwrap_or(Multiplier::NEUTRAL)
    }

    /// Touched attacking types and their multipliers, in encounter order.
    pub fn entries(&self) -> &[(String, Multiplier)] {
        &self.entries
    }

    /// Defender types skipped because their row was not known.
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    /// Group by multiplier, dropping neutral, ascending by multiplier.
    pub fn grouped(&self) -> GroupedResult {
        let mut groups: Vec<EffectGroup> = Vec::new();
        let mut by_multiplier: HashMap<Multiplier, usize> = HashMap::new();

        for (category, multiplier) in &self.entries {
            if multiplier.is_neutral() {
                continue;
            }
            match by_multiplier.get(multiplier) {
                Some(&i) => groups[i].categories.push(category.clone()),
                None => {
                    by_multiplier.insert(*multiplier, groups.len());
                    groups.push(EffectGroup {
                        multiplier: *multiplier,
                        categories: vec![category.clone()],
                    });
                }
            }
        }

        groups.sort_by_key(|g| g.multiplier);
        GroupedResult(groups)
    }
}

/// Attacking types sharing one multiplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectGroup {
    pub multiplier: Multiplier,
    /// In encounter order.
    pub categories: Vec<String>,
}

/// Non-neutral groups, ascending by multiplier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedResult(Vec<EffectGroup>);

impl GroupedResult {
    pub fn groups(&self) -> &[EffectGroup] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Categories of the group with exactly this multiplier.
    pub fn get(&self, multiplier: Multiplier) -> Option<&[String]> {
        self.0
            .iter()
            .find(|g| g.multiplier == multiplier)
            .map(|g| g.categories.as_slice())
    }
}

/// Fold `types` against their rows.
///
/// `row_of` returns the row of a defender type, or `None` if it is not known
/// yet; such types contribute nothing and are listed in
/// [`Effectiveness::unresolved`].
pub fn aggregate<F>(types: &[String], mut row_of: F) -> Effectiveness
where
    F: FnMut(&str) -> Option<CompatibilityRow>,
{
    let mut effectiveness = Effectiveness::default();

    for defender in types {
        let Some(row) = row_of(defender) else {
            effectiveness.unresolved.push(defender.clone());
            continue;
        };

        for attacker in &row.double_from {
            effectiveness.contribute(attacker, Contribution::Double);
        }
        for attacker in &row.zero_from {
            effectiveness.contribute(attacker, Contribution::Immune);
        }
        for attacker in &row.half_from {
            effectiveness.contribute(attacker, Contribution::Half);
        }
    }

    effectiveness
}
