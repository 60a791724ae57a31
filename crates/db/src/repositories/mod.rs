pub mod bid_repo;

pub use bid_repo::BidRepo;
