pub mod background;
pub mod lifetime;

pub use background::Background;
