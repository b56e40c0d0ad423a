use crate::connect4::board::{Board, Cell, COLS, ROWS};
use crate::connect4::player::PlayerNum;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoveResult {
    Accepted(usize),
    Rejected,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Continuing,
    Win(PlayerNum),
    Draw,
}

// One game of Connect Four. Replays bind a fresh engine rather than
// resetting this one in place.
#[derive(Debug)]
pub struct GameEngine {
    board: Board,
    active: PlayerNum,
    last_placement: Option<(usize, usize)>,
}

impl Default for GameEngine {
    fn default() -> Self {
        GameEngine::new()
    }
}

impl GameEngine {
    pub fn new() -> Self {
        GameEngine {
            board: Board::new(),
            active: PlayerNum::P1,
            last_placement: None,
        }
    }

    pub fn active_player(&self) -> PlayerNum {
        self.active
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    // Columns arrive 1-based off the wire. Out-of-range and full-column
    // moves are both Rejected; the active player never switches here.
    pub fn attempt_move(&mut self, column: u32) -> MoveResult {
        if column < 1 || column > COLS as u32 {
            return MoveResult::Rejected;
        }
        let col = (column - 1) as usize;
        match self.board.drop_piece(col, self.active) {
            Ok(row) => {
                self.last_placement = Some((row, col));
                MoveResult::Accepted(row)
            }
            Err(_) => MoveResult::Rejected,
        }
    }

    // The win check runs first, so a move that completes a line while
    // filling the board reports Win rather than Draw.
    pub fn evaluate_outcome(&self) -> Outcome {
        if let Some((row, col)) = self.last_placement {
            if self.connects_four(row, col) {
                return Outcome::Win(self.active);
            }
        }
        if self.board.is_full() {
            Outcome::Draw
        } else {
            Outcome::Continuing
        }
    }

    // Callable only after a Continuing outcome
    pub fn advance_turn(&mut self) {
        self.active = self.active.other();
    }

    // A just-placed piece can only complete a line that passes through it,
    // so scanning outward from the placement covers every winning line.
    fn connects_four(&self, row: usize, col: usize) -> bool {
        const ORIENTATIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];
        ORIENTATIONS.iter().any(|&(row_dir, col_dir)| {
            1 + self.run_length(row, col, row_dir, col_dir)
                + self.run_length(row, col, -row_dir, -col_dir)
                >= 4
        })
    }

    fn run_length(&self, row: usize, col: usize, row_dir: i32, col_dir: i32) -> usize {
        let mut count = 0;
        let mut row = row as i32 + row_dir;
        let mut col = col as i32 + col_dir;
        while (0..ROWS as i32).contains(&row)
            && (0..COLS as i32).contains(&col)
            && self.board.cell(row as usize, col as usize) == Cell::Piece(self.active)
        {
            count += 1;
            row += row_dir;
            col += col_dir;
        }
        count
    }
}
