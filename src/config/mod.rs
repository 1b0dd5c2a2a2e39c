mod r#impl;
mod structs;

pub use r#impl::Feature;
pub use structs::*;
