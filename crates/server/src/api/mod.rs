pub mod catalog;
pub mod handlers;
pub mod middleware;
pub mod optimize;
pub mod routes;

pub use routes::create_router;
