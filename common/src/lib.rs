mod connect4;
pub mod messages;

pub use connect4::{
    Board, BoardError, Cell, ColumnRng, ComputerAgent, DropError, GameEngine, MoveResult, Outcome,
    PlayerNum, RandomColumnRng, COLS, ROWS,
};
