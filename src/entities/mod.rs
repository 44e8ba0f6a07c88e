pub mod player;
pub mod rank;
