use crate::connect4::{Board, PlayerNum};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum GameResult {
    Win(PlayerNum),
    Draw,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ServerMessage {
    ModePrompt,
    WelcomeAs(PlayerNum),
    TurnPrompt(PlayerNum),
    BoardState(Board),
    MoveRejected,
    GameResult(GameResult),
    ReplayPrompt,
    ReplayAccepted,
    Farewell,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Single,
    Multi,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    ModeSelection(Mode),
    ColumnChoice(u32),
    ReplayResponse(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_choice_wire_format() {
        let encoded = serde_json::to_string(&ClientMessage::ColumnChoice(4)).unwrap();
        assert_eq!(encoded, "{\"ColumnChoice\":4}");
        let decoded: ClientMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, ClientMessage::ColumnChoice(4));
    }

    #[test]
    fn test_board_state_round_trips() {
        let mut board = Board::new();
        board.drop_piece(0, PlayerNum::P1).unwrap();
        let msg = ServerMessage::BoardState(board.snapshot());
        let encoded = serde_json::to_string(&msg).unwrap();
        let decoded: ServerMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }
}
