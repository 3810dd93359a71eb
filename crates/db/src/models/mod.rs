pub mod document;
pub mod notebook;
pub mod notebook_message;
pub mod notebook_source;
pub mod source;
pub mod user;

pub use document::*;
pub use notebook::*;
pub use notebook_message::*;
pub use notebook_source::*;
pub use source::*;
pub use user::*;
