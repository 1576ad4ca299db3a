pub mod formatters;
pub mod paths;

pub use paths::{expand_tilde, lenient_canonicalize, make_absolute, symlink_target};
