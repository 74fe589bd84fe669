//! Thread resolution and summaries

mod resolver;
mod summary;

pub use resolver::{assign, components, root_of, root_order, split};
pub use summary::{strip_reply_prefix, summarize};
