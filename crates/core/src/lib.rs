pub mod error;
pub mod git_root;
pub mod parser;
pub mod paths;
pub mod source;
pub mod types;

pub use error::*;
pub use git_root::detect_git_root;
pub use parser::*;
pub use source::*;
pub use types::*;
