//! Pure reward-engine math: spin accrual, the weighted wheel and the quest
//! calendar rules. Everything here is side-effect free; services feed in
//! clocks and RNGs.

pub mod accrual;
pub mod questlog;
pub mod wheel;
