use super::job::{Job, SourceEntry};
use super::level::{CompressionLevel, Rotation};
use super::settings::Settings;

#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub level: CompressionLevel,
    pub estimate_only: bool,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, job: &Job) -> Self {
        MergedConfig {
            level: job.level.unwrap_or(settings.default_level),
            estimate_only: job.estimate_only.unwrap_or(false),
        }
    }

    /// 入力ファイル単位の上書きを解決する。
    pub fn for_source(&self, source: &SourceEntry) -> (CompressionLevel, Rotation) {
        (
            source.level.unwrap_or(self.level),
            source.rotate.unwrap_or_default(),
        )
    }
}
