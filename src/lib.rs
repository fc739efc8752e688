pub mod config;
pub mod deriv;
pub mod error;
pub mod event;
pub mod feed;
pub mod indicator;
pub mod input;
pub mod instrument_catalog;
pub mod model;
pub mod session;
pub mod signal;
