//! Xymon status colours and their severity ordering.
//!
//! Colours carry a numeric rank. The four ordinary colours rank from `clear`
//! (0) to `red` (3); `purple` ranks above everything and `blue` has no rank
//! at all, so it compares as neither greater nor smaller than the others.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Status colour attached to a Xymon report.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    EnumString,
    Display,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Color {
    /// No report received within the status lifetime.
    Purple,
    /// The test is disabled.
    Blue,
    /// No data, or the test is not applicable.
    #[default]
    Clear,
    /// Everything is fine.
    Green,
    /// Warning level.
    Yellow,
    /// Critical level.
    Red,
}

impl Color {
    /// Every colour, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Purple,
        Self::Blue,
        Self::Clear,
        Self::Green,
        Self::Yellow,
        Self::Red,
    ];

    /// Numeric severity used for ordering.
    #[must_use]
    pub const fn rank(self) -> f64 {
        match self {
            Self::Purple => f64::INFINITY,
            Self::Blue => f64::NAN,
            Self::Clear => 0.0,
            Self::Green => 1.0,
            Self::Yellow => 2.0,
            Self::Red => 3.0,
        }
    }

    /// Lowercase wire name of the colour.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Returns the most severe colour of `colors`, or `None` when empty.
    ///
    /// The running maximum is only replaced by a strictly greater candidate,
    /// so an incomparable `blue` wins when it comes first and is ignored
    /// otherwise.
    ///
    /// ```
    /// use xymon_client::Color;
    ///
    /// let worst = Color::most_severe([Color::Green, Color::Red, Color::Yellow]);
    /// assert_eq!(worst, Some(Color::Red));
    /// ```
    pub fn most_severe<I>(colors: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        colors.into_iter().reduce(|current, candidate| {
            if candidate > current {
                candidate
            } else {
                current
            }
        })
    }
}

impl PartialOrd for Color {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        self.rank().partial_cmp(&other.rank())
    }
}

impl PartialEq<str> for Color {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Color {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialEq<Color> for &str {
    fn eq(&self, other: &Color) -> bool {
        *self == other.as_str()
    }
}
