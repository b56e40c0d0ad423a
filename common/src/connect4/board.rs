use crate::connect4::player::PlayerNum;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DropError {
    #[error("column {0} is out of range")]
    OutOfRange(usize),
    #[error("column {0} is full")]
    ColumnFull(usize),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BoardError {
    #[error("column {col} has a floating piece at row {row}")]
    FloatingPiece { row: usize, col: usize },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Piece(PlayerNum),
}

impl Cell {
    fn marker(&self) -> &'static str {
        match self {
            Cell::Empty => " ",
            Cell::Piece(PlayerNum::P1) => "X",
            Cell::Piece(PlayerNum::P2) => "O",
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.marker())
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let marker = String::deserialize(deserializer)?;
        // Anything unrecognized reads back as an empty cell
        Ok(match marker.as_str() {
            "X" => Cell::Piece(PlayerNum::P1),
            "O" => Cell::Piece(PlayerNum::P2),
            _ => Cell::Empty,
        })
    }
}

// Row-major grid with row 0 at the top. Within any column, occupied cells
// form a contiguous run ending at the bottom row.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Board([[Cell; COLS]; ROWS]);

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Board([[Cell::Empty; COLS]; ROWS])
    }

    // Enforce the following constraint:
    // - No occupied cell sits above an empty cell in the same column
    pub fn from_grid(grid: [[Cell; COLS]; ROWS]) -> Result<Self, BoardError> {
        for col in 0..COLS {
            for row in 0..ROWS - 1 {
                if grid[row][col] != Cell::Empty && grid[row + 1][col] == Cell::Empty {
                    return Err(BoardError::FloatingPiece { row, col });
                }
            }
        }
        Ok(Board(grid))
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.0[row][col]
    }

    pub fn column_open(&self, col: usize) -> bool {
        col < COLS && self.0[0][col] == Cell::Empty
    }

    pub fn drop_piece(&mut self, col: usize, piece: PlayerNum) -> Result<usize, DropError> {
        if col >= COLS {
            return Err(DropError::OutOfRange(col));
        }
        for row in (0..ROWS).rev() {
            if self.0[row][col] == Cell::Empty {
                self.0[row][col] = Cell::Piece(piece);
                return Ok(row);
            }
        }
        Err(DropError::ColumnFull(col))
    }

    // Gravity makes a board full exactly when the top row is occupied
    pub fn is_full(&self) -> bool {
        self.0[0].iter().all(|cell| *cell != Cell::Empty)
    }

    pub fn snapshot(&self) -> Board {
        self.clone()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.0 {
            write!(f, "|")?;
            for cell in row {
                write!(f, "{}|", cell.marker())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_gravity(board: &Board) {
        for col in 0..COLS {
            for row in 0..ROWS - 1 {
                if board.cell(row, col) != Cell::Empty {
                    assert_ne!(
                        board.cell(row + 1, col),
                        Cell::Empty,
                        "floating piece at row {} col {}",
                        row,
                        col
                    );
                }
            }
        }
    }

    #[test]
    fn test_drop_lands_on_the_bottom_and_stacks() {
        let mut board = Board::new();
        assert_eq!(board.drop_piece(3, PlayerNum::P1), Ok(5));
        assert_eq!(board.drop_piece(3, PlayerNum::P2), Ok(4));
        assert_eq!(board.drop_piece(3, PlayerNum::P1), Ok(3));
        assert_eq!(board.cell(5, 3), Cell::Piece(PlayerNum::P1));
        assert_eq!(board.cell(4, 3), Cell::Piece(PlayerNum::P2));
        assert_eq!(board.cell(3, 3), Cell::Piece(PlayerNum::P1));
        assert_gravity(&board);
    }

    #[test]
    fn test_drop_out_of_range() {
        let mut board = Board::new();
        assert_eq!(
            board.drop_piece(COLS, PlayerNum::P1),
            Err(DropError::OutOfRange(COLS))
        );
    }

    #[test]
    fn test_drop_into_full_column() {
        let mut board = Board::new();
        for _ in 0..ROWS {
            board.drop_piece(0, PlayerNum::P1).unwrap();
        }
        assert_eq!(
            board.drop_piece(0, PlayerNum::P2),
            Err(DropError::ColumnFull(0))
        );
        assert_gravity(&board);
    }

    #[test]
    fn test_gravity_holds_under_mixed_drops() {
        let mut board = Board::new();
        let columns = [0, 3, 3, 6, 1, 3, 0, 6, 2, 5, 4, 3, 1];
        for (i, col) in columns.into_iter().enumerate() {
            let piece = if i % 2 == 0 {
                PlayerNum::P1
            } else {
                PlayerNum::P2
            };
            board.drop_piece(col, piece).unwrap();
            assert_gravity(&board);
        }
    }

    #[test]
    fn test_is_full_probes_the_top_row() {
        let mut board = Board::new();
        assert!(!board.is_full());
        for col in 0..COLS {
            for row in 0..ROWS {
                let piece = if (row + col) % 2 == 0 {
                    PlayerNum::P1
                } else {
                    PlayerNum::P2
                };
                board.drop_piece(col, piece).unwrap();
            }
            assert_eq!(board.is_full(), col == COLS - 1);
        }
    }

    #[test]
    fn test_from_grid_rejects_floating_pieces() {
        let mut grid = [[Cell::Empty; COLS]; ROWS];
        grid[2][4] = Cell::Piece(PlayerNum::P1);
        assert_eq!(
            Board::from_grid(grid),
            Err(BoardError::FloatingPiece { row: 2, col: 4 })
        );
    }

    #[test]
    fn test_board_round_trips_through_json() {
        let mut board = Board::new();
        board.drop_piece(2, PlayerNum::P1).unwrap();
        board.drop_piece(2, PlayerNum::P2).unwrap();
        let encoded = serde_json::to_string(&board).unwrap();
        let decoded: Board = serde_json::from_str(&encoded).unwrap();
        assert_eq!(board, decoded);
    }

    #[test]
    fn test_unrecognized_cell_decodes_to_empty() {
        let cell: Cell = serde_json::from_str("\"?\"").unwrap();
        assert_eq!(cell, Cell::Empty);
        let cell: Cell = serde_json::from_str("\"X\"").unwrap();
        assert_eq!(cell, Cell::Piece(PlayerNum::P1));
    }
}
