pub mod commands;
pub mod dto;
pub mod request_engine;
pub mod schedule;
pub mod session;
pub mod team;
pub mod time;
pub mod view_builder;
