pub mod handlers;
pub mod page;
pub mod router;

pub use router::router;
