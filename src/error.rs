use thiserror::Error;

use crate::types::{MatchId, ParticipantId, TournamentId, TournamentStatus};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BracketError {
    // Invalid input: rejected before any write.
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("participant names can't be empty")]
    EmptyName,
    #[error("participant {0:?} is already entered")]
    DuplicateName(String),
    #[error("a bracket needs at least 2 participants, got {0}")]
    TooFewParticipants(usize),
    #[error("scores can't be tied ({0}-{0})")]
    TiedScore(u32),
    #[error("scores can't be negative: {0}")]
    NegativeScore(String),
    #[error("please enter valid scores: {0:?} is not a number")]
    NonNumericScore(String),
    #[error("score {0} is too large")]
    ScoreTooLarge(String),

    // Preconditions: the caller should have gated these.
    #[error("match {0} is missing one or both players")]
    MatchNotReady(MatchId),
    #[error("match {0} already has a winner")]
    MatchAlreadyResolved(MatchId),
    #[error("tournament {id} is {actual:?}, expected {expected:?}")]
    WrongStatus {
        id: TournamentId,
        actual: TournamentStatus,
        expected: TournamentStatus,
    },
    #[error("tournament status can't go from {from:?} to {to:?}")]
    IllegalTransition {
        from: TournamentStatus,
        to: TournamentStatus,
    },
    #[error("seed index {0} has no participant")]
    UnknownSeed(usize),
    #[error("round {round} position {position} has no match")]
    MissingMatch { round: u32, position: u32 },
    #[error("participant {0} is not in this tournament")]
    ParticipantNotFound(ParticipantId),

    // Storage layer.
    #[error("tournament {0} not found")]
    TournamentNotFound(TournamentId),
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error("match {0} was resolved by another submission")]
    Conflict(MatchId),
    #[error("tournament store unavailable: {0}")]
    StoreUnavailable(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Precondition,
    NotFound,
    Conflict,
    Internal,
}

impl BracketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BracketError::MissingField(_)
            | BracketError::EmptyName
            | BracketError::DuplicateName(_)
            | BracketError::TooFewParticipants(_)
            | BracketError::TiedScore(_)
            | BracketError::NegativeScore(_)
            | BracketError::NonNumericScore(_)
            | BracketError::ScoreTooLarge(_) => ErrorKind::InvalidInput,
            BracketError::MatchNotReady(_)
            | BracketError::MatchAlreadyResolved(_)
            | BracketError::WrongStatus { .. }
            | BracketError::IllegalTransition { .. }
            | BracketError::UnknownSeed(_)
            | BracketError::MissingMatch { .. } => ErrorKind::Precondition,
            BracketError::TournamentNotFound(_)
            | BracketError::MatchNotFound(_)
            | BracketError::ParticipantNotFound(_) => ErrorKind::NotFound,
            BracketError::Conflict(_) => ErrorKind::Conflict,
            BracketError::StoreUnavailable(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(BracketError::TiedScore(3).kind(), ErrorKind::InvalidInput);
        assert_eq!(BracketError::MatchAlreadyResolved(7).kind(), ErrorKind::Precondition);
        assert_eq!(BracketError::MatchNotFound(7).kind(), ErrorKind::NotFound);
        assert_eq!(BracketError::Conflict(7).kind(), ErrorKind::Conflict);
        assert_eq!(BracketError::ScoreTooLarge("9".repeat(12)).kind(), ErrorKind::InvalidInput);
        assert_eq!(BracketError::StoreUnavailable(String::new()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(BracketError::TiedScore(3).to_string(), "scores can't be tied (3-3)");
        assert_eq!(
            BracketError::TooFewParticipants(1).to_string(),
            "a bracket needs at least 2 participants, got 1"
        );
    }
}
