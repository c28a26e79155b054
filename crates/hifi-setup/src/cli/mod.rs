pub mod app;
pub mod install;
pub mod session;
pub mod status;
pub mod uninstall;
