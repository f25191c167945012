pub mod error;
pub mod output;
pub mod pipeline;
pub mod poll;
pub mod settings;
pub mod voice;

pub use error::{CloneError, ProviderError};
pub use pipeline::{CloneJob, RunOutcome, VoiceCloner};
pub use poll::{poll_until, PollError, PollPolicy, PollStep};
pub use settings::Settings;
pub use voice::DashScopeConfig;
