use crate::client::SendMsg;
use crate::util;
use common::{
    messages::{ClientMessage, GameResult, ServerMessage},
    ColumnRng, ComputerAgent, GameEngine, MoveResult, Outcome, PlayerNum, RandomColumnRng,
};
use hashbrown::HashMap;
use serde::Serialize;
use serde_json::from_str;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub type Sessions = Arc<RwLock<HashMap<String, Session<RandomColumnRng>>>>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SessionState {
    AwaitingMove,
    // One replay choice per seat; a computer seat is an automatic yes
    AwaitingReplay([Option<bool>; 2]),
    Ended,
}

#[derive(Debug)]
enum Seat<R> {
    Human(String),
    Computer(ComputerAgent<R>),
}

// One play-through of Connect Four between two participants. The session
// owns its engine exclusively; nothing is shared with other sessions.
#[derive(Debug)]
pub struct Session<R: ColumnRng + Default + Debug> {
    engine: GameEngine,
    // The first seat is Player 1's; Player 1 always moves first
    seats: [Seat<R>; 2],
    state: SessionState,
}

impl<R: ColumnRng + Default + Debug> Session<R> {
    pub fn versus_human(player1_id: String, player2_id: String) -> Self {
        Session {
            engine: GameEngine::new(),
            seats: [Seat::Human(player1_id), Seat::Human(player2_id)],
            state: SessionState::AwaitingMove,
        }
    }

    pub fn versus_computer(human_id: String) -> Self {
        Session {
            engine: GameEngine::new(),
            seats: [
                Seat::Human(human_id),
                Seat::Computer(ComputerAgent::new(R::default())),
            ],
            state: SessionState::AwaitingMove,
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self.state, SessionState::Ended)
    }

    // Given a client's ID, gets the other human's ID, if there is one
    pub fn opponent_id(&self, id: &str) -> Option<String> {
        match &self.seats {
            [Seat::Human(id1), Seat::Human(id2)] if id1 == id => Some(id2.clone()),
            [Seat::Human(id1), Seat::Human(id2)] if id2 == id => Some(id1.clone()),
            _ => None,
        }
    }

    // Sends the opening messages for a fresh game: seat assignments, the
    // empty board, and the first turn prompt to Player 1.
    pub fn start<S: SendMsg>(&self, player1: &S, player2: Option<&S>) {
        send_message(player1, &ServerMessage::WelcomeAs(PlayerNum::P1));
        if let Some(player2) = player2 {
            send_message(player2, &ServerMessage::WelcomeAs(PlayerNum::P2));
        }
        self.broadcast_board(player1, player2);
        send_message(player1, &ServerMessage::TurnPrompt(PlayerNum::P1));
    }

    pub fn handle_message<S: SendMsg>(
        &mut self,
        player_num: PlayerNum,
        msg: &str,
        client: &S,
        opponent: Option<&S>,
    ) {
        self.state = match self.state {
            SessionState::AwaitingMove => {
                let message: ClientMessage = match from_str(msg) {
                    Ok(message) => message,
                    Err(err) => {
                        warn!("failed to deserialize message from {:?}: {}", player_num, err);
                        if player_num == self.engine.active_player() {
                            send_message(client, &ServerMessage::MoveRejected);
                            send_message(client, &ServerMessage::TurnPrompt(player_num));
                        }
                        return;
                    }
                };
                match message {
                    ClientMessage::ColumnChoice(column)
                        if player_num == self.engine.active_player() =>
                    {
                        self.process_move(player_num, column, client, opponent)
                    }
                    message => {
                        warn!(
                            "protocol violation from {:?} while awaiting a move: {:?}",
                            player_num, message
                        );
                        SessionState::Ended
                    }
                }
            }
            SessionState::AwaitingReplay(choices) => {
                let message: ClientMessage = match from_str(msg) {
                    Ok(message) => message,
                    Err(err) => {
                        warn!("failed to deserialize message from {:?}: {}", player_num, err);
                        send_message(client, &ServerMessage::ReplayPrompt);
                        return;
                    }
                };
                match message {
                    ClientMessage::ReplayResponse(choice) => {
                        self.process_replay_choice(choices, player_num, choice, client, opponent)
                    }
                    message => {
                        warn!(
                            "protocol violation from {:?} while awaiting a replay decision: {:?}",
                            player_num, message
                        );
                        SessionState::Ended
                    }
                }
            }
            SessionState::Ended => SessionState::Ended,
        };
    }

    fn process_move<S: SendMsg>(
        &mut self,
        mover: PlayerNum,
        column: u32,
        client: &S,
        opponent: Option<&S>,
    ) -> SessionState {
        match self.engine.attempt_move(column) {
            MoveResult::Rejected => {
                info!("rejected column {} from {:?}", column, mover);
                send_message(client, &ServerMessage::MoveRejected);
                if let Some(opponent) = opponent {
                    // Mirror the rejection so both sides stay in sync
                    send_message(opponent, &ServerMessage::MoveRejected);
                }
                send_message(client, &ServerMessage::TurnPrompt(mover));
                SessionState::AwaitingMove
            }
            MoveResult::Accepted(row) => {
                info!("{:?} placed a piece in column {} (row {})", mover, column, row);
                self.broadcast_board(client, opponent);
                match self.engine.evaluate_outcome() {
                    Outcome::Continuing => {
                        self.engine.advance_turn();
                        self.next_turn(mover, client, opponent)
                    }
                    Outcome::Win(player) => {
                        self.finish_game(GameResult::Win(player), client, opponent)
                    }
                    Outcome::Draw => self.finish_game(GameResult::Draw, client, opponent),
                }
            }
        }
    }

    fn next_turn<S: SendMsg>(
        &mut self,
        mover: PlayerNum,
        client: &S,
        opponent: Option<&S>,
    ) -> SessionState {
        let active = self.engine.active_player();
        let seat = match active {
            PlayerNum::P1 => &self.seats[0],
            PlayerNum::P2 => &self.seats[1],
        };
        if let Seat::Computer(_) = seat {
            return self.computer_turns(client);
        }
        match (active == mover, opponent) {
            (true, _) => send_message(client, &ServerMessage::TurnPrompt(active)),
            (false, Some(opponent)) => send_message(opponent, &ServerMessage::TurnPrompt(active)),
            (false, None) => warn!("no sender available for {:?}", active),
        }
        SessionState::AwaitingMove
    }

    // Plays computer turns until the human is active again or the game
    // ends. Resolves synchronously; the session never waits on the agent.
    fn computer_turns<S: SendMsg>(&mut self, human: &S) -> SessionState {
        loop {
            let active = self.engine.active_player();
            let seat = match active {
                PlayerNum::P1 => &mut self.seats[0],
                PlayerNum::P2 => &mut self.seats[1],
            };
            let column = match seat {
                Seat::Computer(agent) => agent.choose_column(self.engine.board()),
                Seat::Human(_) => {
                    send_message(human, &ServerMessage::TurnPrompt(active));
                    return SessionState::AwaitingMove;
                }
            };
            if let MoveResult::Rejected = self.engine.attempt_move(column) {
                // The agent only proposes open columns
                warn!("computer proposed an illegal column {}", column);
                return SessionState::Ended;
            }
            info!("computer placed a piece in column {}", column);
            self.broadcast_board(human, None);
            match self.engine.evaluate_outcome() {
                Outcome::Continuing => self.engine.advance_turn(),
                Outcome::Win(player) => {
                    return self.finish_game(GameResult::Win(player), human, None)
                }
                Outcome::Draw => return self.finish_game(GameResult::Draw, human, None),
            }
        }
    }

    fn finish_game<S: SendMsg>(
        &mut self,
        result: GameResult,
        client: &S,
        opponent: Option<&S>,
    ) -> SessionState {
        info!("game finished: {:?}\n{}", result, self.engine.board());
        send_message(client, &ServerMessage::GameResult(result));
        if let Some(opponent) = opponent {
            send_message(opponent, &ServerMessage::GameResult(result));
        }
        send_message(client, &ServerMessage::ReplayPrompt);
        if let Some(opponent) = opponent {
            send_message(opponent, &ServerMessage::ReplayPrompt);
        }
        SessionState::AwaitingReplay(self.initial_replay_choices())
    }

    fn initial_replay_choices(&self) -> [Option<bool>; 2] {
        let vote = |seat: &Seat<R>| match seat {
            Seat::Human(_) => None,
            Seat::Computer(_) => Some(true),
        };
        [vote(&self.seats[0]), vote(&self.seats[1])]
    }

    fn process_replay_choice<S: SendMsg>(
        &mut self,
        choices: [Option<bool>; 2],
        player_num: PlayerNum,
        choice: bool,
        client: &S,
        opponent: Option<&S>,
    ) -> SessionState {
        let choices = match player_num {
            PlayerNum::P1 => [Some(choice), choices[1]],
            PlayerNum::P2 => [choices[0], Some(choice)],
        };
        match choices {
            [Some(true), Some(true)] => {
                info!("all participants accepted a replay; starting a fresh game");
                // Replace the engine so no stale outcome leaks into the new game
                self.engine = GameEngine::new();
                send_message(client, &ServerMessage::ReplayAccepted);
                if let Some(opponent) = opponent {
                    send_message(opponent, &ServerMessage::ReplayAccepted);
                }
                self.broadcast_board(client, opponent);
                let player1 = if player_num == PlayerNum::P1 {
                    Some(client)
                } else {
                    opponent
                };
                match player1 {
                    Some(sender) => send_message(sender, &ServerMessage::TurnPrompt(PlayerNum::P1)),
                    None => warn!("no sender available for {:?}", PlayerNum::P1),
                }
                SessionState::AwaitingMove
            }
            [Some(false), _] | [_, Some(false)] => {
                info!("replay declined; closing the session");
                send_message(client, &ServerMessage::Farewell);
                if let Some(opponent) = opponent {
                    send_message(opponent, &ServerMessage::Farewell);
                }
                SessionState::Ended
            }
            _ => SessionState::AwaitingReplay(choices),
        }
    }

    fn broadcast_board<S: SendMsg>(&self, client: &S, opponent: Option<&S>) {
        let board = ServerMessage::BoardState(self.engine.board().snapshot());
        send_message(client, &board);
        if let Some(opponent) = opponent {
            send_message(opponent, &board);
        }
    }
}

fn send_message<M: Serialize>(client: &impl SendMsg, message: &M) {
    // If we cannot serialize a server message, that's a bug
    let encoded = serde_json::to_string(message).unwrap();
    // If the message fails to send even after retries, there's not much we can do but proceed
    let _ = util::retry(1, || client.send(&encoded));
}
