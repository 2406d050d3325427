pub mod contract;
pub mod contracted;
pub mod pendency;
pub mod reference;
pub mod report;
pub mod role;
pub mod user;
