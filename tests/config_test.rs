// 設定ファイル解析テスト

use std::io::Write;

use pdfpress::config::job::{JobFile, parse_page_order, parse_page_range};
use pdfpress::config::level::{CompressionLevel, RasterMode, Rotation};
use pdfpress::config::load_settings_for_job;
use pdfpress::config::merged::MergedConfig;
use pdfpress::config::settings::Settings;
use pdfpress::encode::jpeg::ChromaSubsampling;

// ============================================================
// 1. ページ範囲パーサ
// ============================================================

#[test]
fn test_parse_page_range_single_range() {
    let result = parse_page_range("5-10").expect("should parse range");
    assert_eq!(result, vec![5, 6, 7, 8, 9, 10]);
}

#[test]
fn test_parse_page_range_sorts_and_dedups() {
    let result = parse_page_range("7, 1, 3-4, 3").expect("should parse mixed");
    assert_eq!(result, vec![1, 3, 4, 7]);
}

#[test]
fn test_parse_page_order_keeps_written_order() {
    let result = parse_page_order("3, 1, 5-6, 1").expect("should parse order");
    assert_eq!(result, vec![3, 1, 5, 6, 1]);
}

#[test]
fn test_parse_page_range_rejects_invalid() {
    assert!(parse_page_range("abc").is_err());
    assert!(parse_page_range("10-5").is_err());
    assert!(parse_page_range("").is_err());
    assert!(parse_page_range("0").is_err(), "pages are 1-based");
    assert!(parse_page_range(" , ").is_err());
}

// ============================================================
// 2. Settings
// ============================================================

#[test]
fn test_settings_empty_yaml_uses_defaults() {
    let settings = Settings::from_yaml("{}").expect("defaults");
    assert_eq!(settings.pixel_ceiling, 5_000_000);
    assert_eq!(settings.min_dpi, 72);
    assert_eq!(settings.image_default_dpi, 96);
    assert_eq!(settings.default_level, CompressionLevel::None);
    assert!(settings.cache_dir.is_none());

    let min = settings.levels.get(CompressionLevel::Min).unwrap();
    assert_eq!((min.mode, min.dpi, min.quality), (RasterMode::Smart, 200, 85));
    let med = settings.levels.get(CompressionLevel::Med).unwrap();
    assert_eq!((med.mode, med.dpi, med.quality), (RasterMode::All, 150, 70));
    let max = settings.levels.get(CompressionLevel::Max).unwrap();
    assert_eq!((max.mode, max.dpi, max.quality), (RasterMode::All, 110, 50));
    assert!(settings.levels.get(CompressionLevel::None).is_none());
}

#[test]
fn test_settings_partial_override_keeps_other_defaults() {
    let yaml = r#"
pixel_ceiling: 2000000
default_level: med
cache_dir: "/tmp/pdfpress-cache"
levels:
  max:
    mode: smart
    dpi: 96
    quality: 40
image_bands:
  med:
    quality_seed: 70
    keep_max_ratio: 0.5
    quality_floor: 20
    subsampling: "4:4:4"
"#;
    let settings = Settings::from_yaml(yaml).expect("should parse");
    assert_eq!(settings.pixel_ceiling, 2_000_000);
    assert_eq!(settings.default_level, CompressionLevel::Med);
    assert_eq!(
        settings.cache_dir.as_deref(),
        Some(std::path::Path::new("/tmp/pdfpress-cache"))
    );

    let max = settings.levels.get(CompressionLevel::Max).unwrap();
    assert_eq!((max.mode, max.dpi, max.quality), (RasterMode::Smart, 96, 40));
    // 指定していないレベルは既定値
    assert_eq!(settings.levels.get(CompressionLevel::Min).unwrap().dpi, 200);

    let med = settings.image_bands.get(CompressionLevel::Med).unwrap();
    assert_eq!(med.quality_seed, 70);
    assert_eq!(med.keep_max_ratio, Some(0.5));
    assert_eq!(med.keep_min_ratio, None);
    assert_eq!(med.max_long_side, None);
    assert_eq!(med.subsampling, ChromaSubsampling::Yuv444);
    assert_eq!(settings.image_bands.max.quality_seed, 65);
}

#[test]
fn test_settings_rejects_out_of_range_values() {
    assert!(Settings::from_yaml("min_dpi: 0").is_err());
    assert!(Settings::from_yaml("pixel_ceiling: 0").is_err());
    assert!(Settings::from_yaml("levels:\n  min:\n    mode: all\n    dpi: 0\n    quality: 80\n").is_err());
    assert!(Settings::from_yaml("levels:\n  min:\n    mode: all\n    dpi: 150\n    quality: 101\n").is_err());
    let inverted_band = r#"
image_bands:
  min:
    quality_seed: 80
    keep_max_ratio: 0.4
    keep_min_ratio: 0.6
    quality_floor: 30
    subsampling: "4:2:0"
"#;
    assert!(Settings::from_yaml(inverted_band).is_err());
    let floor_above_seed = r#"
image_bands:
  max:
    quality_seed: 40
    quality_floor: 50
    subsampling: "4:2:0"
"#;
    assert!(Settings::from_yaml(floor_above_seed).is_err());
}

#[test]
fn test_settings_rejects_unknown_level_name() {
    assert!(Settings::from_yaml("default_level: ultra").is_err());
}

#[test]
fn test_compression_level_from_str() {
    assert_eq!("MAX".parse::<CompressionLevel>().unwrap(), CompressionLevel::Max);
    assert_eq!(" min ".parse::<CompressionLevel>().unwrap(), CompressionLevel::Min);
    assert!("lossless".parse::<CompressionLevel>().is_err());
    assert_eq!(CompressionLevel::Med.to_string(), "med");
}

// ============================================================
// 3. Job
// ============================================================

#[test]
fn test_merge_job_parses_sources() {
    let yaml = r#"
jobs:
  - output: "out.pdf"
    level: max
    sources:
      - input: "scan.pdf"
        pages: "3, 1-2"
        rotate: 90
      - input: "photo.jpg"
        level: min
"#;
    let job_file: JobFile = serde_yml::from_str(yaml).expect("parse");
    let job = &job_file.jobs[0];
    job.validate().expect("valid merge job");
    assert_eq!(job.level, Some(CompressionLevel::Max));
    assert_eq!(job.sources.len(), 2);
    assert_eq!(job.sources[0].pages, Some(vec![3, 1, 2]));
    assert_eq!(job.sources[0].rotate, Some(Rotation::R90));
    assert_eq!(job.sources[1].pages, None);
    assert_eq!(job.sources[1].level, Some(CompressionLevel::Min));
}

#[test]
fn test_split_job_parses_pages_and_rotations() {
    let yaml = r#"
jobs:
  - output: "part.pdf"
    split:
      input: "book.pdf"
      pages: "5, 2-3, 3"
      rotate:
        2: 270
"#;
    let job_file: JobFile = serde_yml::from_str(yaml).expect("parse");
    let job = &job_file.jobs[0];
    job.validate().expect("valid split job");
    let split = job.split.as_ref().unwrap();
    assert_eq!(split.pages, vec![2, 3, 5]);
    assert_eq!(split.rotate.get(&2), Some(&Rotation::R270));
}

#[test]
fn test_split_rotation_keys_are_one_based() {
    let yaml = r#"
jobs:
  - output: "part.pdf"
    split:
      input: "book.pdf"
      pages: "1"
      rotate:
        0: 90
"#;
    let result: Result<JobFile, _> = serde_yml::from_str(yaml);
    assert!(result.is_err());
}

#[test]
fn test_job_rotation_must_be_quarter_turn() {
    let yaml = r#"
jobs:
  - output: "out.pdf"
    sources:
      - input: "a.pdf"
        rotate: 45
"#;
    let result: Result<JobFile, _> = serde_yml::from_str(yaml);
    assert!(result.is_err());
}

#[test]
fn test_job_requires_exactly_one_mode() {
    let neither = r#"
jobs:
  - output: "out.pdf"
"#;
    let job_file: JobFile = serde_yml::from_str(neither).expect("parse");
    assert!(job_file.jobs[0].validate().is_err());

    let both = r#"
jobs:
  - output: "out.pdf"
    sources:
      - input: "a.pdf"
    split:
      input: "b.pdf"
      pages: "1"
"#;
    let job_file: JobFile = serde_yml::from_str(both).expect("parse");
    assert!(job_file.jobs[0].validate().is_err());
}

#[test]
fn test_job_missing_output_is_an_error() {
    let yaml = r#"
jobs:
  - sources:
      - input: "a.pdf"
"#;
    let result: Result<JobFile, _> = serde_yml::from_str(yaml);
    assert!(result.is_err());
}

// ============================================================
// 4. 設定マージ
// ============================================================

#[test]
fn test_merge_job_level_overrides_settings() {
    let settings = Settings::from_yaml("default_level: min").expect("parse settings");
    let job_yaml = r#"
jobs:
  - output: "out.pdf"
    level: max
    estimate_only: true
    sources:
      - input: "a.pdf"
      - input: "b.pdf"
        level: none
        rotate: 180
"#;
    let job_file: JobFile = serde_yml::from_str(job_yaml).expect("parse job");
    let job = &job_file.jobs[0];
    let merged = MergedConfig::new(&settings, job);
    assert_eq!(merged.level, CompressionLevel::Max);
    assert!(merged.estimate_only);
    assert_eq!(merged.for_source(&job.sources[0]), (CompressionLevel::Max, Rotation::R0));
    assert_eq!(merged.for_source(&job.sources[1]), (CompressionLevel::None, Rotation::R180));
}

#[test]
fn test_merge_falls_back_to_settings_level() {
    let settings = Settings::from_yaml("default_level: med").expect("parse settings");
    let job_yaml = r#"
jobs:
  - output: "out.pdf"
    sources:
      - input: "a.pdf"
"#;
    let job_file: JobFile = serde_yml::from_str(job_yaml).expect("parse job");
    let merged = MergedConfig::new(&settings, &job_file.jobs[0]);
    assert_eq!(merged.level, CompressionLevel::Med);
    assert!(!merged.estimate_only);
}

// ============================================================
// 5. settings.yaml自動検出
// ============================================================

#[test]
fn test_auto_detect_settings_yaml_exists() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let settings_path = dir.path().join("settings.yaml");
    let job_path = dir.path().join("jobs.yaml");

    let mut f = std::fs::File::create(&settings_path).expect("create settings.yaml");
    f.write_all(b"pixel_ceiling: 1234567\n").expect("write settings");
    std::fs::File::create(&job_path).expect("create jobs.yaml");

    let settings = load_settings_for_job(&job_path).expect("should load settings");
    assert_eq!(settings.pixel_ceiling, 1_234_567);
}

#[test]
fn test_auto_detect_settings_yaml_missing() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let job_path = dir.path().join("jobs.yaml");
    std::fs::File::create(&job_path).expect("create jobs.yaml");

    let settings = load_settings_for_job(&job_path).expect("should return defaults");
    assert_eq!(settings.pixel_ceiling, 5_000_000);
}

#[test]
fn test_auto_detect_invalid_settings_is_an_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    std::fs::write(dir.path().join("settings.yaml"), "min_dpi: [not, a, number]\n").unwrap();
    let job_path = dir.path().join("jobs.yaml");
    std::fs::File::create(&job_path).expect("create jobs.yaml");

    assert!(load_settings_for_job(&job_path).is_err());
}
