mod handler;
mod model;

pub use handler::{search, validate_comment_input, validate_post_input};
pub use model::{SearchParams, SearchResponse};
