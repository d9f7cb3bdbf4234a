use thiserror::Error;

/// Errors surfaced while resolving sampling rules.
///
/// The core performs no recovery or retry; every error propagates unchanged
/// to the caller, which decides whether to retry, substitute or abort. After
/// a failed `PropertyMap::update` pass, properties updated before the failing
/// one keep their fresh values and later ones stay stale.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("cannot draw from an empty choice collection")]
    EmptyChoice,
    #[error("sequence generator is exhausted")]
    ExhaustedSequence,
    #[error("sampling rule failed: {0}")]
    Propagated(#[source] Box<dyn std::error::Error>),
    #[error("property value read before first resolution")]
    Unresolved,
}
