mod handler;
mod model;

pub use handler::{get_messages, put_message};
pub use model::LocationQuery;
