pub mod accrual;
pub mod leverage;
pub mod simulate;
