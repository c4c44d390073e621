pub mod cache;
pub mod job;
pub mod wardrobe;
