pub mod bid;
pub mod status;
