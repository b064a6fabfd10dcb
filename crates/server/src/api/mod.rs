pub mod handlers;
pub mod middleware;
pub mod queries;
pub mod routes;
pub mod snapshot;

pub use routes::create_router;
