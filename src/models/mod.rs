pub mod field;
pub mod requests;
pub mod responses;
pub mod state;
