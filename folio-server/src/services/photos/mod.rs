pub mod photos_resolver;
pub mod photos_routes;

pub use photos_resolver::{PhotoResolver, Resolution, ServedFile};
