// proxymirror-core/tests/pipeline_tests.rs
//
// End-to-end pipeline runs against temporary trees, with the encoder replaced
// by the scripted MockFfmpegSpawner.

use proxymirror_core::external::mocks::MockFfmpegSpawner;
use proxymirror_core::{CoreConfig, CoreConfigBuilder, CoreError, ScanPipeline, Summary};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::{TempDir, tempdir};

struct Tree {
    _dir: TempDir,
    source: PathBuf,
    dest: PathBuf,
}

fn tree(files: &[&str]) -> Tree {
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("in");
    let dest = dir.path().join("out");
    fs::create_dir_all(&source).unwrap();
    for file in files {
        let path = source.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"media").unwrap();
    }
    Tree {
        _dir: dir,
        source,
        dest,
    }
}

fn run(config: CoreConfig, spawner: &MockFfmpegSpawner) -> Summary {
    ScanPipeline::new(config, spawner.clone())
        .expect("valid config")
        .run()
        .expect("run completes")
}

fn default_run(t: &Tree, spawner: &MockFfmpegSpawner) -> Summary {
    run(CoreConfig::new(t.source.clone(), t.dest.clone()), spawner)
}

fn inputs(spawner: &MockFfmpegSpawner) -> Vec<String> {
    let mut inputs: Vec<String> = spawner
        .received_calls()
        .iter()
        .filter_map(|call| call.value_after("-i").map(str::to_string))
        .collect();
    inputs.sort();
    inputs
}

#[test]
fn builds_mirrored_proxies_and_ignores_other_files() {
    let t = tree(&["clip1.mov", "sub/clip2.avi", "notes.txt"]);
    let spawner = MockFfmpegSpawner::new();

    let summary = default_run(&t, &spawner);

    assert_eq!(spawner.call_count(), 2);
    assert!(t.dest.join("clip1.mp4").is_file());
    assert!(t.dest.join("sub").is_dir());
    assert!(t.dest.join("sub").join("clip2.mp4").is_file());
    assert!(!t.dest.join("notes.txt").exists());
    assert!(!t.dest.join("notes.mp4").exists());

    assert_eq!(summary.files_considered, 2);
    assert_eq!(summary.files_built, 2);
    assert_eq!(summary.files_skipped, 0);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.files_ignored, 1);
    assert!(!summary.interrupted);

    let expected: Vec<String> = vec![
        t.source.join("clip1.mov").display().to_string(),
        t.source.join("sub").join("clip2.avi").display().to_string(),
    ];
    assert_eq!(inputs(&spawner), expected);
}

#[test]
fn encoder_writes_to_a_staging_file_beside_the_target() {
    let t = tree(&["a/b/c.MOV"]);
    let spawner = MockFfmpegSpawner::new();

    default_run(&t, &spawner);

    let calls = spawner.received_calls();
    let written = calls[0].output().unwrap();
    assert_eq!(written.parent(), Some(t.dest.join("a").join("b").as_path()));
    let name = written.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with(".c.partial-"), "got {name}");
    assert!(name.ends_with(".mp4"));
    assert!(t.dest.join("a/b/c.mp4").is_file());
    assert_eq!(fs::read_dir(t.dest.join("a/b")).unwrap().count(), 1);
}

#[test]
fn second_run_builds_nothing() {
    let t = tree(&["clip1.mov", "sub/clip2.avi", "day2/clip3.mxf"]);

    let first = default_run(&t, &MockFfmpegSpawner::new());
    assert_eq!(first.files_built, 3);

    let spawner = MockFfmpegSpawner::new();
    let second = default_run(&t, &spawner);

    assert_eq!(spawner.call_count(), 0);
    assert_eq!(second.files_built, 0);
    assert_eq!(second.files_skipped, second.files_considered);
    assert_eq!(second.files_considered, 3);
}

#[test]
fn one_failing_job_does_not_stop_the_others() {
    let t = tree(&["a.mov", "broken.mov", "c.mpg", "d/e.mxf"]);
    let spawner = MockFfmpegSpawner::new();
    spawner.add_exit_expectation("broken.mov", 1, &["broken.mov: moov atom not found"]);

    let summary = default_run(&t, &spawner);

    assert_eq!(spawner.call_count(), 4);
    assert_eq!(summary.files_built, 3);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.failures.len(), 1);

    let failure = &summary.failures[0];
    assert_eq!(failure.input, t.source.join("broken.mov"));
    assert_eq!(failure.output, t.dest.join("broken.mp4"));
    assert!(failure.reason.contains("moov atom not found"));
    assert!(!t.dest.join("broken.mp4").exists());
    assert!(t.dest.join("d").join("e.mp4").is_file());
}

#[test]
fn failed_job_is_retried_on_the_next_run() {
    let t = tree(&["a.mov", "broken.mov"]);
    let failing = MockFfmpegSpawner::new();
    failing.add_exit_expectation("broken.mov", 1, &[]);
    default_run(&t, &failing);

    let spawner = MockFfmpegSpawner::new();
    let summary = default_run(&t, &spawner);

    assert_eq!(inputs(&spawner), vec![t.source.join("broken.mov").display().to_string()]);
    assert_eq!(summary.files_built, 1);
    assert_eq!(summary.files_skipped, 1);
}

#[test]
fn spawn_failure_is_counted_as_an_error() {
    let t = tree(&["a.mov", "b.mov"]);
    let spawner = MockFfmpegSpawner::new();
    spawner.add_spawn_error_expectation("a.mov", "No such file or directory");

    let summary = default_run(&t, &spawner);

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.files_built, 1);
    assert!(t.dest.join("b.mp4").is_file());
    assert!(!t.dest.join("a.mp4").exists());
}

#[test]
fn sidecar_artifacts_are_never_dispatched() {
    let t = tree(&[
        "day1/clip.mov",
        "day1/._clip.mov",
        "day1/.AppleDouble/clip.mov",
        "__MACOSX/day1/clip.mov",
    ]);
    let spawner = MockFfmpegSpawner::new();

    let summary = default_run(&t, &spawner);

    assert_eq!(inputs(&spawner), vec![t.source.join("day1/clip.mov").display().to_string()]);
    assert_eq!(summary.files_considered, 1);
    assert!(!t.dest.join("day1").join(".AppleDouble").exists());
    assert!(!t.dest.join("__MACOSX").exists());
    assert!(!t.dest.join("day1").join("._clip.mp4").exists());
}

#[test]
fn legacy_proxy_counts_as_built() {
    let t = tree(&["old.mxf", "new.mxf"]);
    fs::create_dir_all(&t.dest).unwrap();
    fs::write(t.dest.join("old.mov"), b"legacy proxy").unwrap();
    let spawner = MockFfmpegSpawner::new();

    let summary = default_run(&t, &spawner);

    assert_eq!(inputs(&spawner), vec![t.source.join("new.mxf").display().to_string()]);
    assert_eq!(summary.files_skipped, 1);
    assert!(!t.dest.join("old.mp4").exists());
}

#[test]
fn two_sources_for_one_target_encode_once() {
    let t = tree(&["clip.mov", "clip.avi"]);
    let spawner = MockFfmpegSpawner::new();

    let summary = default_run(&t, &spawner);

    assert_eq!(spawner.call_count(), 1);
    assert_eq!(summary.files_considered, 2);
    assert_eq!(summary.files_built, 1);
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(summary.errors, 0);
}

#[test]
fn invalid_stream_maps_fail_every_job_without_spawning() {
    let t = tree(&["a.mov", "b.mov"]);
    let spawner = MockFfmpegSpawner::new();
    let config = CoreConfigBuilder::new()
        .source_dir(t.source.clone())
        .dest_dir(t.dest.clone())
        .stream_maps(vec!["0:v:0".to_string(), "not a selector".to_string()])
        .build()
        .unwrap();

    let summary = run(config, &spawner);

    assert_eq!(spawner.call_count(), 0);
    assert_eq!(summary.errors, 2);
    assert!(summary.failures[0].reason.starts_with("invalid options"));
}

#[test]
fn stream_map_overrides_replace_default_mapping() {
    let t = tree(&["a.mov"]);
    let spawner = MockFfmpegSpawner::new();
    let config = CoreConfigBuilder::new()
        .source_dir(t.source.clone())
        .dest_dir(t.dest.clone())
        .stream_maps(vec!["0:v:0".to_string(), "0:a:2".to_string()])
        .build()
        .unwrap();

    run(config, &spawner);

    let calls = spawner.received_calls();
    assert_eq!(calls[0].map_selectors(), vec!["0:v:0", "0:a:2"]);
}

#[test]
fn default_mapping_without_overrides() {
    let t = tree(&["a.mov"]);
    let spawner = MockFfmpegSpawner::new();

    default_run(&t, &spawner);

    let calls = spawner.received_calls();
    assert_eq!(calls[0].map_selectors(), vec!["0:v:0", "0:a:0?"]);
    assert_eq!(calls[0].value_after("-vf"), Some("scale=320:240"));
}

#[test]
fn destination_inside_source_is_not_rescanned() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("media");
    fs::create_dir_all(source.join("day1")).unwrap();
    fs::write(source.join("day1").join("a.mov"), b"media").unwrap();
    let dest = source.join("proxies");
    let spawner = MockFfmpegSpawner::new();

    let first = run(CoreConfig::new(source.clone(), dest.clone()), &spawner);
    // Plant a file that would be a candidate if the destination were walked.
    fs::write(dest.join("day1").join("stray.mov"), b"x").unwrap();
    let second = run(CoreConfig::new(source.clone(), dest.clone()), &spawner);

    assert_eq!(first.files_built, 1);
    assert_eq!(second.files_considered, 1);
    assert_eq!(second.files_skipped, 1);
    assert_eq!(spawner.call_count(), 1);
    assert!(!dest.join("proxies").exists());
}

#[test]
fn missing_source_is_fatal() {
    let dir = tempdir().unwrap();
    let config = CoreConfig::new(dir.path().join("nope"), dir.path().join("out"));

    let result = ScanPipeline::new(config, MockFfmpegSpawner::new())
        .unwrap()
        .run();

    assert!(matches!(result, Err(CoreError::SourceNotFound(_))));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn uncreatable_destination_is_fatal() {
    let t = tree(&["a.mov"]);
    let blocker = t.source.parent().unwrap().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();
    let config = CoreConfig::new(t.source.clone(), blocker.join("out"));
    let spawner = MockFfmpegSpawner::new();

    let result = ScanPipeline::new(config, spawner.clone()).unwrap().run();

    assert!(matches!(result, Err(CoreError::DirectoryCreate { .. })));
    assert_eq!(spawner.call_count(), 0);
}

fn assert_same_directory_rejected(t: &Tree, dest: PathBuf) {
    let config = CoreConfig::new(t.source.clone(), dest);
    let spawner = MockFfmpegSpawner::new();

    let result = ScanPipeline::new(config, spawner.clone())
        .expect("roots differ as written")
        .run();

    assert!(matches!(result, Err(CoreError::Config(_))), "got {result:?}");
    assert_eq!(spawner.call_count(), 0);
    let mut names: Vec<String> = fs::read_dir(&t.source)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.mov", "b.avi"]);
}

#[test]
fn destination_spelled_through_parent_is_rejected() {
    let t = tree(&["a.mov", "b.avi"]);
    let dest = t.source.join("..").join("in");
    assert_same_directory_rejected(&t, dest);
}

#[cfg(unix)]
#[test]
fn destination_symlinked_to_source_is_rejected() {
    let t = tree(&["a.mov", "b.avi"]);
    let link = t.source.parent().unwrap().join("link-to-in");
    std::os::unix::fs::symlink(&t.source, &link).unwrap();
    assert_same_directory_rejected(&t, link);
}

#[test]
fn unmirrorable_subdirectory_is_pruned_and_counted() {
    let t = tree(&["ok/a.mov", "blocked/b.mov"]);
    fs::create_dir_all(&t.dest).unwrap();
    // A file where the mirrored directory should go.
    fs::write(t.dest.join("blocked"), b"in the way").unwrap();
    let spawner = MockFfmpegSpawner::new();

    let summary = default_run(&t, &spawner);

    assert_eq!(inputs(&spawner), vec![t.source.join("ok/a.mov").display().to_string()]);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.files_built, 1);
}

#[test]
fn parallel_run_builds_everything_once() {
    let names: Vec<String> = (0..12).map(|i| format!("dir{}/clip{i}.mov", i % 3)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let t = tree(&refs);
    let spawner = MockFfmpegSpawner::new();
    spawner.add_exit_expectation("clip7.mov", 1, &[]);
    let config = CoreConfigBuilder::new()
        .source_dir(t.source.clone())
        .dest_dir(t.dest.clone())
        .jobs(4)
        .build()
        .unwrap();

    let summary = run(config, &spawner);

    assert_eq!(spawner.call_count(), 12);
    assert_eq!(summary.files_built, 11);
    assert_eq!(summary.errors, 1);
    for i in (0..12).filter(|i| *i != 7) {
        let target = t.dest.join(format!("dir{}", i % 3)).join(format!("clip{i}.mp4"));
        assert!(target.is_file(), "missing {}", target.display());
    }
}

#[test]
fn interrupt_during_parallel_run_stops_new_jobs() {
    let names: Vec<String> = (0..10).map(|i| format!("clip{i}.mov")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let t = tree(&refs);
    let spawner = MockFfmpegSpawner::new();
    let cancel = Arc::new(AtomicBool::new(false));
    spawner.raise_flag_on_spawn(Arc::clone(&cancel));
    let config = CoreConfigBuilder::new()
        .source_dir(t.source.clone())
        .dest_dir(t.dest.clone())
        .jobs(2)
        .build()
        .unwrap();

    let summary = ScanPipeline::new(config, spawner.clone())
        .unwrap()
        .with_cancel_flag(cancel)
        .run()
        .unwrap();

    // Only encodes already past the dispatch check when the flag rose may run.
    let started = spawner.call_count();
    assert!((1..=2).contains(&started), "started {started} encodes");
    assert!(summary.interrupted);
    assert_eq!(summary.files_considered, 10);
    assert_eq!(summary.files_built, started);
    assert_eq!(summary.errors, 0);
    let proxies = fs::read_dir(&t.dest)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".mp4"))
        .count();
    assert_eq!(proxies, started);
}

#[test]
fn custom_extensions_and_duration_cap() {
    let t = tree(&["a.r3d", "b.mov"]);
    let spawner = MockFfmpegSpawner::new();
    let config = CoreConfigBuilder::new()
        .source_dir(t.source.clone())
        .dest_dir(t.dest.clone())
        .media_extensions(["R3D"])
        .max_duration_secs(6)
        .ffmpeg_path(PathBuf::from("/opt/bin/ffmpeg"))
        .build()
        .unwrap();

    let summary = run(config, &spawner);

    assert_eq!(summary.files_considered, 1);
    let calls = spawner.received_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, Path::new("/opt/bin/ffmpeg"));
    assert_eq!(calls[0].value_after("-t"), Some("6"));
}
