pub mod connection;
pub mod prompt_repo;
pub mod tag_repo;
pub mod team_repo;
