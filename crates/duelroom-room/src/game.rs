//! The turn game seam and the tic-tac-toe ruleset behind it.
//!
//! The room state machine only ever talks to [`TurnGame`]: it starts a
//! match, forwards moves, asks whether the match is over and who won, and
//! renders a view for snapshots. Any two-player, cell-indexed turn game
//! can be slotted in without touching the orchestrator.

use duelroom_protocol::{GameView, Mark, SessionId};
use rand::Rng;

/// One match between exactly two sessions.
///
/// Once [`is_over`](Self::is_over) returns `true` the game is frozen:
/// `play` must reject every move and `current_turn` must not change.
pub trait TurnGame: Send + 'static {
    /// Starts a match between two sessions. Which one moves first is
    /// decided by `rng`, so callers can pin the outcome with a seeded RNG.
    fn start<R: Rng + ?Sized>(first: SessionId, second: SessionId, rng: &mut R) -> Self
    where
        Self: Sized;

    /// Plays `cell` for `player`. Returns `false`, leaving the game
    /// untouched, when the move is not legal right now.
    fn play(&mut self, cell: usize, player: &SessionId) -> bool;

    /// Ends the match in favour of the opponent of `leaver`.
    fn forfeit(&mut self, leaver: &SessionId);

    fn is_over(&self) -> bool;

    /// The winning session; `None` while running and after a draw.
    fn winner(&self) -> Option<&SessionId>;

    /// The session expected to move next.
    fn current_turn(&self) -> &SessionId;

    /// Renders the externally visible state of the match.
    fn view(&self) -> GameView;
}

/// The 8 three-in-a-row lines of a 3×3 board, as cell indices.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

const CELLS: usize = 9;

/// Classic 3×3 tic-tac-toe. X always moves first.
#[derive(Debug, Clone)]
pub struct TicTacToe {
    board: [Option<Mark>; CELLS],
    player_x: SessionId,
    player_o: SessionId,
    current_turn: SessionId,
    winner: Option<SessionId>,
    over: bool,
}

impl TicTacToe {
    pub fn player_x(&self) -> &SessionId {
        &self.player_x
    }

    pub fn player_o(&self) -> &SessionId {
        &self.player_o
    }

    pub fn board(&self) -> &[Option<Mark>; CELLS] {
        &self.board
    }

    /// The mark a session plays with, if it is in this match.
    pub fn mark_of(&self, player: &SessionId) -> Option<Mark> {
        if *player == self.player_x {
            Some(Mark::X)
        } else if *player == self.player_o {
            Some(Mark::O)
        } else {
            None
        }
    }

    fn opponent_of(&self, player: &SessionId) -> &SessionId {
        if *player == self.player_x {
            &self.player_o
        } else {
            &self.player_x
        }
    }
}

impl TurnGame for TicTacToe {
    fn start<R: Rng + ?Sized>(first: SessionId, second: SessionId, rng: &mut R) -> Self {
        let (player_x, player_o) = if rng.random_bool(0.5) {
            (first, second)
        } else {
            (second, first)
        };
        Self {
            board: [None; CELLS],
            current_turn: player_x.clone(),
            player_x,
            player_o,
            winner: None,
            over: false,
        }
    }

    fn play(&mut self, cell: usize, player: &SessionId) -> bool {
        if self.over || cell >= CELLS || self.board[cell].is_some() || *player != self.current_turn {
            return false;
        }
        let Some(mark) = self.mark_of(player) else {
            return false;
        };

        self.board[cell] = Some(mark);

        if has_line(&self.board, mark) {
            self.winner = Some(player.clone());
            self.over = true;
        } else if self.board.iter().all(Option::is_some) {
            self.over = true;
        } else {
            self.current_turn = self.opponent_of(player).clone();
        }
        true
    }

    fn forfeit(&mut self, leaver: &SessionId) {
        if self.over || self.mark_of(leaver).is_none() {
            return;
        }
        self.winner = Some(self.opponent_of(leaver).clone());
        self.over = true;
    }

    fn is_over(&self) -> bool {
        self.over
    }

    fn winner(&self) -> Option<&SessionId> {
        self.winner.as_ref()
    }

    fn current_turn(&self) -> &SessionId {
        &self.current_turn
    }

    fn view(&self) -> GameView {
        GameView {
            board: self.board,
            player_x: self.player_x.clone(),
            player_o: self.player_o.clone(),
            current_turn: self.current_turn.clone(),
            winner: self.winner.clone(),
            over: self.over,
        }
    }
}

fn has_line(board: &[Option<Mark>; CELLS], mark: Mark) -> bool {
    LINES
        .iter()
        .any(|line| line.iter().all(|&cell| board[cell] == Some(mark)))
}
