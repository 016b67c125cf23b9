use std::fmt;

use serde::{Deserialize, Serialize};

/// Letter grade on the price-per-unit tier tables. Lower rank is the better deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    const ORDERED: [LetterGrade; 6] = [
        LetterGrade::APlus,
        LetterGrade::A,
        LetterGrade::B,
        LetterGrade::C,
        LetterGrade::D,
        LetterGrade::F,
    ];

    pub fn rank(self) -> u8 {
        match self {
            LetterGrade::APlus => 0,
            LetterGrade::A => 1,
            LetterGrade::B => 2,
            LetterGrade::C => 3,
            LetterGrade::D => 4,
            LetterGrade::F => 5,
        }
    }

    /// Ranks past `F` saturate to `F`.
    pub fn from_rank(rank: u8) -> Self {
        Self::ORDERED[usize::from(rank).min(Self::ORDERED.len() - 1)]
    }

    pub fn label(self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }

    /// Unweighted mean of the two ranks; a half-step rounds toward the worse grade.
    pub fn combine(self, other: LetterGrade) -> LetterGrade {
        let total = self.rank() + other.rank();
        LetterGrade::from_rank(total.div_ceil(2))
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
