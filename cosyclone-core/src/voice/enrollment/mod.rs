pub mod dashscope;
pub mod provider;
pub mod types;

pub use dashscope::DashScopeEnrollment;
pub use provider::VoiceEnrollment;
pub use types::{Enrollment, VoiceEnrollmentRequest, VoiceIdentity, VoiceInfo, VoiceStatus};
