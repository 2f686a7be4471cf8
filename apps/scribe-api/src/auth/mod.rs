pub mod guard;
pub mod middleware;
pub mod sessions;

pub use middleware::AuthUser;
