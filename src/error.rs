use card_reader_types::CardId;
use thiserror::Error;

/// Why a single card could not be produced.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("remote read for card {id} failed: {source}")]
    Remote {
        id: CardId,
        #[source]
        source: anyhow::Error,
    },
    #[error("card {id}: required field `{field}` decoded empty")]
    MissingField { id: CardId, field: &'static str },
    #[error("card {id}: view call returned no values")]
    EmptyResponse { id: CardId },
    #[error("card {id}: fetch cancelled")]
    Cancelled { id: CardId },
}

impl FetchError {
    pub fn id(&self) -> CardId {
        match self {
            FetchError::Remote { id, .. }
            | FetchError::MissingField { id, .. }
            | FetchError::EmptyResponse { id }
            | FetchError::Cancelled { id } => *id,
        }
    }

    /// Decode failures, as opposed to transport failures.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            FetchError::MissingField { .. } | FetchError::EmptyResponse { .. }
        )
    }
}

/// An operation stopped because its cancellation token fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Whether `error` (or anything in its chain) is a cancellation.
pub fn is_cancelled(error: &anyhow::Error) -> bool {
    error.chain().any(|e| e.is::<Cancelled>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_fetch_error_ids_and_kinds() {
        let remote = FetchError::Remote {
            id: 4,
            source: anyhow::anyhow!("connection reset"),
        };
        assert_eq!(remote.id(), 4);
        assert!(!remote.is_decode());
        assert!(remote.to_string().contains("connection reset"));

        let missing = FetchError::MissingField { id: 9, field: "name" };
        assert!(missing.is_decode());
        assert_eq!(missing.to_string(), "card 9: required field `name` decoded empty");
    }

    #[test]
    fn test_cancellation_survives_context() {
        let err = Err::<(), _>(anyhow::Error::from(Cancelled))
            .context("loading page")
            .unwrap_err();
        assert!(is_cancelled(&err));
        assert!(!is_cancelled(&anyhow::anyhow!("other")));
    }
}
