use crate::connect4::board::{Board, COLS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait ColumnRng {
    // Samples a 1-based column, without regard for legality
    fn pick(&mut self) -> u32;
}

#[derive(Debug)]
pub struct RandomColumnRng {
    rng: StdRng,
}

impl Default for RandomColumnRng {
    fn default() -> Self {
        let rng = StdRng::from_rng(rand::thread_rng()).unwrap();
        RandomColumnRng { rng }
    }
}

impl ColumnRng for RandomColumnRng {
    fn pick(&mut self) -> u32 {
        self.rng.gen_range(1..=COLS as u32)
    }
}

// The simplest possible opponent: no look-ahead, no difficulty levels.
// Holds no board copy of its own; it only probes the engine's board.
#[derive(Debug)]
pub struct ComputerAgent<R> {
    rng: R,
}

impl<R: ColumnRng> ComputerAgent<R> {
    pub fn new(rng: R) -> Self {
        ComputerAgent { rng }
    }

    // Resamples until a legal column comes up. The caller must not invoke
    // this on a full board, or no legal column exists and the loop cannot
    // terminate.
    pub fn choose_column(&mut self, board: &Board) -> u32 {
        loop {
            let column = self.rng.pick();
            if board.column_open((column - 1) as usize) {
                return column;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect4::board::ROWS;
    use crate::connect4::player::PlayerNum;

    struct ScriptedRng(Vec<u32>);

    impl ColumnRng for ScriptedRng {
        fn pick(&mut self) -> u32 {
            self.0.remove(0)
        }
    }

    #[test]
    fn test_returns_the_first_legal_sample() {
        let board = Board::new();
        let mut agent = ComputerAgent::new(ScriptedRng(vec![5]));
        assert_eq!(agent.choose_column(&board), 5);
    }

    #[test]
    fn test_resamples_past_full_columns() {
        let mut board = Board::new();
        for _ in 0..ROWS {
            board.drop_piece(1, PlayerNum::P1).unwrap();
        }
        let mut agent = ComputerAgent::new(ScriptedRng(vec![2, 2, 3]));
        assert_eq!(agent.choose_column(&board), 3);
    }
}
