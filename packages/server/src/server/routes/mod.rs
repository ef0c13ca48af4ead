// HTTP routes
pub mod health;
pub mod phone;

pub use health::*;
pub use phone::*;
