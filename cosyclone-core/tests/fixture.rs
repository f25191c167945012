use std::path::PathBuf;
use std::time::Duration;

use cosyclone_core::{
    voice::mock::MockVoiceService, CloneJob, PollPolicy, Settings, VoiceCloner,
};
use tempfile::TempDir;

pub const VOICE_ID: &str = "cosyvoice-v3-plus-myvoice-7f3a";
pub const INTERVAL: Duration = Duration::from_secs(10);

pub struct Fixture {
    pub cloner: VoiceCloner,
    pub mock: MockVoiceService,
    pub job: CloneJob,
    pub output_dir: TempDir,
}

impl Fixture {
    #[allow(dead_code)]
    pub fn with_statuses(statuses: &[&str]) -> Self {
        Self::with_service(MockVoiceService::with_statuses(VOICE_ID, statuses))
    }

    pub fn with_service(mock: MockVoiceService) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let output_dir = TempDir::new().unwrap();
        let mut job = Settings::default().to_job();
        job.output_path = output_dir.path().join("my_custom_voice_output.mp3");
        job.poll = PollPolicy::new(30, INTERVAL);

        let cloner = VoiceCloner::new(Box::new(mock.clone()), Box::new(mock.clone()));

        Fixture {
            cloner,
            mock,
            job,
            output_dir,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.job.output_path.clone()
    }
}
