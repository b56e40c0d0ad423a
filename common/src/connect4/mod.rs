mod agent;
mod board;
mod engine;
mod player;

pub use agent::{ColumnRng, ComputerAgent, RandomColumnRng};
pub use board::{Board, BoardError, Cell, DropError, COLS, ROWS};
pub use engine::{GameEngine, MoveResult, Outcome};
pub use player::PlayerNum;
