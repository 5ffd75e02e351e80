pub mod posts_frontmatter;
pub mod posts_normalize;
pub mod posts_routes;
pub mod posts_schema;
pub mod posts_service;

pub use posts_schema::{PostDefaults, PostDocument};
pub use posts_service::PostsService;
