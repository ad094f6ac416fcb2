pub mod gateway;
pub mod handlers;

pub use handlers::router;
