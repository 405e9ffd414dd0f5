//! Falling-block puzzle engine: a pure reducer over grid, pieces and score,
//! plus the thin session, input and persistence layers around it.

pub mod command;
pub mod game;
pub mod highscore;
pub mod input;
pub mod session;
