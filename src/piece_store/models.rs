use serde::{Deserialize, Serialize};

/// Position of a piece in the 2-D latent difficulty map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub x1: f64,
    pub x2: f64,
}

impl Difficulty {
    pub fn squared_distance(&self, other: &Difficulty) -> f64 {
        let dx1 = self.x1 - other.x1;
        let dx2 = self.x2 - other.x2;
        dx1 * dx1 + dx2 * dx2
    }
}

/// A musical score record of the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub period: String,
    pub difficulty: Difficulty,
    pub key: String,
}

/// One page of pieces plus the number of pages available under the same
/// filter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PiecePage {
    pub pieces: Vec<Piece>,
    pub total_pages: usize,
    /// The page actually served, after clamping.
    pub page: usize,
}

/// Optional filters for listing pieces. All provided filters must match.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PieceFilter {
    pub key: Option<String>,
    pub period: Option<String>,
    /// Inclusive lower bound on `difficulty.x1`.
    pub min_difficulty: Option<f64>,
    /// Inclusive upper bound on `difficulty.x1`.
    pub max_difficulty: Option<f64>,
}

impl PieceFilter {
    pub fn is_empty(&self) -> bool {
        self.key.is_none()
            && self.period.is_none()
            && self.min_difficulty.is_none()
            && self.max_difficulty.is_none()
    }

    pub fn matches(&self, piece: &Piece) -> bool {
        self.key.as_ref().map_or(true, |k| &piece.key == k)
            && self.period.as_ref().map_or(true, |p| &piece.period == p)
            && self
                .min_difficulty
                .map_or(true, |min| piece.difficulty.x1 >= min)
            && self
                .max_difficulty
                .map_or(true, |max| piece.difficulty.x1 <= max)
    }
}
