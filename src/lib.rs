pub mod account;
pub mod approvals;
pub mod audit;
pub mod error;
pub mod formatter;
pub mod import;
pub mod reconcile;
pub mod role;
pub mod service;
pub mod store;
pub mod utils;
pub mod value;
