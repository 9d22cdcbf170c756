pub mod catalog;
pub mod config;
pub mod identity;
pub mod matching;
pub mod merge;
pub mod migration;
