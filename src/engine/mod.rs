pub mod commission;
pub mod lifecycle;
pub mod overdue;
pub mod ranking;
