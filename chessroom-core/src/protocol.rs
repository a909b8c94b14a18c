//! Wire messages exchanged between clients and the realtime server.
//!
//! Every message is a single JSON object. Clients send [`UserGameCommand`]s,
//! the server answers with [`ServerMessage`]s discriminated by `serverMessageType`.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coretypes::Move;
use crate::error::{self, ErrorKind};
use crate::game::Game;

/// Identifier of a game session.
pub type GameId = i64;

/// Kind of an inbound command.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Connect,
    MakeMove,
    Leave,
    Resign,
}

/// Envelope of every inbound command.
///
/// # Example
/// `{"commandType":"CONNECT","authToken":"abc","gameID":1}`
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGameCommand {
    pub command_type: CommandType,
    pub auth_token: String,
    #[serde(rename = "gameID")]
    pub game_id: GameId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#move: Option<Move>,
}

/// A decoded command with its payload, ready for dispatch.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Command {
    Connect,
    MakeMove(Move),
    Leave,
    Resign,
}

impl UserGameCommand {
    pub fn new_connect(auth_token: &str, game_id: GameId) -> Self {
        Self::with_type(CommandType::Connect, auth_token, game_id, None)
    }

    pub fn new_make_move(auth_token: &str, game_id: GameId, move_: Move) -> Self {
        Self::with_type(CommandType::MakeMove, auth_token, game_id, Some(move_))
    }

    pub fn new_leave(auth_token: &str, game_id: GameId) -> Self {
        Self::with_type(CommandType::Leave, auth_token, game_id, None)
    }

    pub fn new_resign(auth_token: &str, game_id: GameId) -> Self {
        Self::with_type(CommandType::Resign, auth_token, game_id, None)
    }

    fn with_type(
        command_type: CommandType,
        auth_token: &str,
        game_id: GameId,
        move_: Option<Move>,
    ) -> Self {
        Self {
            command_type,
            auth_token: auth_token.to_string(),
            game_id,
            r#move: move_,
        }
    }

    /// Parse a single inbound JSON text into a UserGameCommand if possible.
    pub fn parse_command(input_str: &str) -> error::Result<Self> {
        serde_json::from_str(input_str)
            .map_err(|err| error::Error::new(ErrorKind::MalformedCommand, err))
    }

    /// Typed view of this command. A `MAKE_MOVE` must carry a move.
    pub fn command(&self) -> error::Result<Command> {
        match (self.command_type, self.r#move) {
            (CommandType::Connect, _) => Ok(Command::Connect),
            (CommandType::MakeMove, Some(move_)) => Ok(Command::MakeMove(move_)),
            (CommandType::MakeMove, None) => {
                Err((ErrorKind::MalformedCommand, "MAKE_MOVE requires a move").into())
            }
            (CommandType::Leave, _) => Ok(Command::Leave),
            (CommandType::Resign, _) => Ok(Command::Resign),
        }
    }
}

impl FromStr for UserGameCommand {
    type Err = error::Error;
    fn from_str(s: &str) -> error::Result<Self> {
        Self::parse_command(s)
    }
}

impl Display for UserGameCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&serde_json::to_string(self).map_err(|_| fmt::Error)?)
    }
}

/// Outbound message from server to client.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "serverMessageType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    LoadGame {
        game: Game,
    },
    Notification {
        message: String,
    },
    Error {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

impl ServerMessage {
    pub fn new_load_game(game: Game) -> Self {
        Self::LoadGame { game }
    }

    pub fn new_notification<S: Into<String>>(message: S) -> Self {
        Self::Notification {
            message: message.into(),
        }
    }

    /// Error text is always prefixed with `Error: `.
    pub fn new_error<S: Display>(message: S) -> Self {
        Self::Error {
            error_message: format!("Error: {message}"),
        }
    }

    /// Build the client facing error message for a failed command.
    pub fn from_error(error: &error::Error) -> Self {
        Self::new_error(error.client_message())
    }
}

/// Compact single line JSON.
impl Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&serde_json::to_string(self).map_err(|_| fmt::Error)?)
    }
}

impl FromStr for ServerMessage {
    type Err = error::Error;
    fn from_str(s: &str) -> error::Result<Self> {
        serde_json::from_str(s).map_err(|err| error::Error::new(ErrorKind::MalformedCommand, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_connect() {
        let input = r#"{"commandType":"CONNECT","authToken":"abc","gameID":7}"#;
        let command = UserGameCommand::parse_command(input).unwrap();
        assert_eq!(command, UserGameCommand::new_connect("abc", 7));
        assert_eq!(command.command().unwrap(), Command::Connect);
    }

    #[test]
    fn parse_make_move() {
        let input = json!({
            "commandType": "MAKE_MOVE",
            "authToken": "abc",
            "gameID": 1,
            "move": {"start": {"row": 2, "col": 5}, "end": {"row": 4, "col": 5}}
        })
        .to_string();
        let command: UserGameCommand = input.parse().unwrap();
        assert_eq!(
            command.command().unwrap(),
            Command::MakeMove("e2e4".parse().unwrap())
        );
        let reparsed: UserGameCommand = command.to_string().parse().unwrap();
        assert_eq!(reparsed, command);
    }

    #[test]
    fn malformed_commands() {
        let kind = |s: &str| UserGameCommand::parse_command(s).unwrap_err().kind();
        assert_eq!(kind("not json"), ErrorKind::MalformedCommand);
        assert_eq!(
            kind(r#"{"commandType":"DANCE","authToken":"abc","gameID":1}"#),
            ErrorKind::MalformedCommand
        );
        assert_eq!(kind(r#"{"commandType":"CONNECT","gameID":1}"#), ErrorKind::MalformedCommand);
        let off_board = json!({
            "commandType": "MAKE_MOVE",
            "authToken": "abc",
            "gameID": 1,
            "move": {"start": {"row": 9, "col": 5}, "end": {"row": 4, "col": 5}}
        });
        assert_eq!(kind(&off_board.to_string()), ErrorKind::MalformedCommand);

        let input = r#"{"commandType":"MAKE_MOVE","authToken":"a","gameID":1}"#;
        let no_move = UserGameCommand::parse_command(input).unwrap();
        assert_eq!(no_move.command().unwrap_err().kind(), ErrorKind::MalformedCommand);
    }

    #[test]
    fn server_message_shapes() {
        let notification: serde_json::Value =
            serde_json::from_str(&ServerMessage::new_notification("hi").to_string()).unwrap();
        assert_eq!(notification, json!({"serverMessageType": "NOTIFICATION", "message": "hi"}));

        let error: serde_json::Value =
            serde_json::from_str(&ServerMessage::new_error("unauthorized").to_string()).unwrap();
        assert_eq!(
            error,
            json!({"serverMessageType": "ERROR", "errorMessage": "Error: unauthorized"})
        );

        let load = ServerMessage::new_load_game(Game::start_position());
        let value: serde_json::Value = serde_json::from_str(&load.to_string()).unwrap();
        assert_eq!(value["serverMessageType"], "LOAD_GAME");
        assert_eq!(value["game"]["turn"], "WHITE");
        assert_eq!(load.to_string().parse::<ServerMessage>().unwrap(), load);
    }
}
