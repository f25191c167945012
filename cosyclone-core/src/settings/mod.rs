pub mod config;


pub use config::{EndpointSettings, EnrollmentSettings, PollSettings, Settings, SynthesisSettings};
