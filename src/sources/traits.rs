use crate::domain::Candidate;
use crate::errors::FeederResult;

#[cfg_attr(test, mockall::automock)]
pub trait CandidateSource: Send + Sync {
    /// Short label used in progress output
    fn name(&self) -> &str;

    /// Every audio item currently listed by the source, in page order
    fn list_candidates(&self) -> FeederResult<Vec<Candidate>>;
}
