// Command implementations

pub mod replay;

pub use replay::{replay_file, replay_reader, run_replay};
