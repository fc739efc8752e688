pub mod signal;
pub mod tick;
pub mod window;
