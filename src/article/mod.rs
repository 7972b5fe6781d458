//! RFC 5536 article format: the immutable record produced by POST
//! acceptance (§3), the codec that validates and normalizes it (§4.2), and
//! the control-message grammar carried in its `Control` header (§4.6).

mod codec;
mod control;
mod types;

pub use codec::{Codec, PostedArticle};
pub use control::ControlMessage;
pub use types::{Article, ArticleHeaders};
