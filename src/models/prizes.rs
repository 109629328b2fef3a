use serde::{Deserialize, Serialize};

/// One entry of the prize table. `weight` is relative, the table does not
/// have to sum to 100.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct Prize {
    pub amount: i64,
    pub weight: f64,
}

/// Result of a single draw against the wheel.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct PrizeDraw {
    pub amount: i64,
    pub index: usize,
}
