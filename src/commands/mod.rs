//! Operator entry points. Each command owns its identity-map load so a
//! call always sees the catalog as it is now.

pub mod catalog_cmds;
pub mod identity_cmds;
pub mod match_cmds;
pub mod merge_cmds;
pub mod migration_cmds;
pub mod settings_cmds;

#[cfg(test)]
#[path = "tests/error_handling_tests.rs"]
mod error_handling_tests;
#[cfg(test)]
#[path = "tests/identity_cmds_tests.rs"]
mod identity_cmds_tests;
#[cfg(test)]
#[path = "tests/merge_cmds_tests.rs"]
mod merge_cmds_tests;
#[cfg(test)]
#[path = "tests/migration_cmds_tests.rs"]
mod migration_cmds_tests;
#[cfg(test)]
#[path = "tests/match_cmds_tests.rs"]
mod match_cmds_tests;
#[cfg(test)]
#[path = "tests/catalog_cmds_tests.rs"]
mod catalog_cmds_tests;
#[cfg(test)]
#[path = "tests/settings_cmds_tests.rs"]
mod settings_cmds_tests;
