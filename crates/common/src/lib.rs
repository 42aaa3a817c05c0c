pub mod clock;
pub mod data_id;
pub mod retry;
pub mod rule;
