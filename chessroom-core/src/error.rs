//! Chessroom core error type.

use std::error;
use std::fmt::{self, Display};
use std::result;

use crate::fen::ParseFenError;

/// Chessroom core generic result type.
pub type Result<T> = result::Result<T, Error>;

/// A list specifying general errors for the chessroom core.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Auth token could not be resolved to an identity.
    Unauthorized,
    /// Move was rejected by the rules engine or by seat ownership.
    InvalidMove,
    /// Referenced session does not exist.
    NotFound,
    /// Unexpected failure of a collaborator.
    Internal,
    /// Inbound command could not be decoded.
    MalformedCommand,
    /// A seat in a session is already held by another player.
    SeatTaken,
    /// Fen error kinds.
    Fen,

    /// Position parse string malformed.
    ParsePositionMalformed,
    /// Position coordinates outside of the board.
    ParsePositionOutOfRange,
    /// Piece parse string malformed.
    ParsePieceMalformed,
    /// Move parse string malformed.
    ParseMoveMalformed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidMove => "invalid move",
            ErrorKind::NotFound => "not found",
            ErrorKind::Internal => "internal",
            ErrorKind::MalformedCommand => "malformed command",
            ErrorKind::SeatTaken => "seat taken",
            ErrorKind::Fen => "fen",

            ErrorKind::ParsePositionMalformed => "parse position malformed",
            ErrorKind::ParsePositionOutOfRange => "parse position out of range",
            ErrorKind::ParsePieceMalformed => "parse piece malformed",
            ErrorKind::ParseMoveMalformed => "parse move malformed",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The primary and general error type for the chessroom core.
#[derive(Debug)]
pub enum Error {
    Simple(ErrorKind),
    Message(ErrorKind, String),
    Custom(ErrorKind, Box<dyn error::Error + Send + Sync>),
}

impl Error {
    pub fn new<E>(error_kind: ErrorKind, inner_error: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self::Custom(error_kind, inner_error.into())
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Simple(error_kind)
            | Error::Message(error_kind, _)
            | Error::Custom(error_kind, _) => *error_kind,
        }
    }

    /// Human readable text for a client, without the `Error: ` prefix.
    /// Internal errors never leak their detail to clients.
    pub fn client_message(&self) -> String {
        match (self.kind(), self) {
            (ErrorKind::Internal, _) => String::from("internal server error"),
            (ErrorKind::Unauthorized, _) => String::from("unauthorized"),
            (ErrorKind::NotFound, Error::Message(_, detail)) => detail.clone(),
            (error_kind, Error::Simple(_)) => error_kind.to_string(),
            (error_kind, Error::Message(_, detail)) => format!("{error_kind} - {detail}"),
            (error_kind, Error::Custom(_, box_error)) => format!("{error_kind} - {box_error}"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Simple(error_kind) => {
                write!(f, "{error_kind}")
            }
            Error::Message(error_kind, string) => {
                write!(f, "{error_kind}: {string}")
            }
            Error::Custom(error_kind, ref box_error) => {
                write!(f, "{error_kind}, error: {}", *box_error)
            }
        }
    }
}

impl error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(error_kind: ErrorKind) -> Self {
        Self::Simple(error_kind)
    }
}

impl From<ParseFenError> for Error {
    fn from(error: ParseFenError) -> Self {
        Self::Custom(ErrorKind::Fen, error.into())
    }
}

impl<S: ToString> From<(ErrorKind, S)> for Error {
    fn from((error_kind, stringable): (ErrorKind, S)) -> Self {
        Self::Message(error_kind, stringable.to_string())
    }
}
