pub mod cache;
pub mod filter;
pub mod fuzzy;
pub mod handlers;
pub mod pipeline;
pub mod ranker;
pub mod text;
