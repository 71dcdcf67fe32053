pub mod checker;
pub mod config;
pub mod connection;
pub mod matcher;
pub mod privilege;
pub mod session;
pub mod ssh;
pub mod subshell;
pub mod telnet;
