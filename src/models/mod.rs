pub mod delivery;
pub mod order;
pub mod person;
