pub mod config;
pub mod db;
pub mod ids;
pub mod membership;
pub mod permission;
pub mod prompt;
pub mod scope;
pub mod tag;
pub mod team;
pub mod team_member;
