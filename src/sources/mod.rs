pub mod oral_argument;
pub mod traits;

pub use oral_argument::OralArgumentIndex;
pub use traits::CandidateSource;
