pub mod app;
pub mod cifar;
pub mod config;
pub mod convert;
pub mod error;
pub mod fs_util;
pub mod http;
pub mod output;
pub mod remote;
pub mod store;
pub mod taxonomy;
pub mod tui;
pub mod zoo;
