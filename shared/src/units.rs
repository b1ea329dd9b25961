//! Explicit quantity types
//!
//! Egg output is counted either in trays or in single eggs, and feed is weighed
//! in kilograms but reported per egg in grams. Each unit gets its own type so a
//! tray count can never be added to an egg count by accident.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Eggs in one standard tray
pub const EGGS_PER_TRAY: f64 = 30.0;

/// Grams in one kilogram
pub const GRAMS_PER_KG: f64 = 1000.0;

/// A count of single eggs
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Eggs(pub f64);

/// A count of trays (30 eggs each); fractional trays are allowed
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trays(pub f64);

/// Feed weight in kilograms
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedKg(pub f64);

/// Weight in grams
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grams(pub f64);

impl Eggs {
    pub const ZERO: Eggs = Eggs(0.0);

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn to_trays(self) -> Trays {
        Trays(self.0 / EGGS_PER_TRAY)
    }
}

impl Trays {
    pub const ZERO: Trays = Trays(0.0);

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn to_eggs(self) -> Eggs {
        Eggs(self.0 * EGGS_PER_TRAY)
    }
}

impl FeedKg {
    pub const ZERO: FeedKg = FeedKg(0.0);

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn to_grams(self) -> Grams {
        Grams(self.0 * GRAMS_PER_KG)
    }

    /// Grams of feed per egg; zero when no eggs were laid
    pub fn grams_per_egg(self, eggs: Eggs) -> Grams {
        if eggs.0 > 0.0 {
            Grams(self.to_grams().0 / eggs.0)
        } else {
            Grams(0.0)
        }
    }
}

impl Grams {
    pub fn value(self) -> f64 {
        self.0
    }
}

/// Egg output as recorded on a log: either trays or raw eggs, never both
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EggOutput {
    Trays(Trays),
    Eggs(Eggs),
}

impl EggOutput {
    /// Pick trays when they were recorded, otherwise the raw egg count
    pub fn from_parts(trays: Option<Trays>, eggs: Option<Eggs>) -> Self {
        match (trays, eggs) {
            (Some(trays), _) => EggOutput::Trays(trays),
            (None, Some(eggs)) => EggOutput::Eggs(eggs),
            (None, None) => EggOutput::Eggs(Eggs::ZERO),
        }
    }

    pub fn eggs(self) -> Eggs {
        match self {
            EggOutput::Trays(trays) => trays.to_eggs(),
            EggOutput::Eggs(eggs) => eggs,
        }
    }

    pub fn trays(self) -> Trays {
        match self {
            EggOutput::Trays(trays) => trays,
            EggOutput::Eggs(eggs) => eggs.to_trays(),
        }
    }
}

macro_rules! impl_quantity_ops {
    ($($ty:ident),*) => {
        $(
            impl Add for $ty {
                type Output = $ty;

                fn add(self, rhs: $ty) -> $ty {
                    $ty(self.0 + rhs.0)
                }
            }

            impl AddAssign for $ty {
                fn add_assign(&mut self, rhs: $ty) {
                    self.0 += rhs.0;
                }
            }

            impl Sum for $ty {
                fn sum<I: Iterator<Item = $ty>>(iter: I) -> $ty {
                    iter.fold($ty(0.0), |acc, q| acc + q)
                }
            }
        )*
    };
}

impl_quantity_ops!(Eggs, Trays, FeedKg, Grams);
