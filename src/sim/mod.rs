pub mod engine;
pub mod event;
pub mod highscore;
pub mod session;
pub mod spawn;
pub mod timer;
