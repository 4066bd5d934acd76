pub mod action;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod output;
pub mod repl;
pub mod runner;
