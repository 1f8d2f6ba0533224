//! Drives the real process-spawning merger against small shell scripts that
//! speak the `<inputs>... cat output <file>` command line.
#![cfg(unix)]

use pdf_merge_service::models::MergeJob;
use pdf_merge_service::services::merger::{MergeToolError, PdfMerger, PdftkMerger};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONCAT_TOOL: &str = r#"#!/bin/sh
for last; do :; done
: > "$last"
for arg; do
  [ "$arg" = "cat" ] && break
  cat "$arg" >> "$last"
done
"#;

const FAILING_TOOL: &str = r#"#!/bin/sh
echo "Error: could not open input" >&2
echo "partial output"
exit 3
"#;

const SLOW_TOOL: &str = "#!/bin/sh\nsleep 30\n";

const SILENT_TOOL: &str = "#!/bin/sh\nexit 0\n";

fn write_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

// One test function: scripts are written before any process is spawned, so no
// other test thread can hold a write handle to them while they are executed.
#[tokio::test]
async fn test_pdftk_merger_against_scripted_tools() {
    let dir = tempfile::tempdir().unwrap();
    let concat = write_tool(dir.path(), "concat.sh", CONCAT_TOOL);
    let failing = write_tool(dir.path(), "failing.sh", FAILING_TOOL);
    let slow = write_tool(dir.path(), "slow.sh", SLOW_TOOL);
    let silent = write_tool(dir.path(), "silent.sh", SILENT_TOOL);

    let inputs_dir = dir.path().join("uploads dir");
    std::fs::create_dir_all(&inputs_dir).unwrap();
    let first = inputs_dir.join("1.pdf");
    let second = inputs_dir.join("2.pdf");
    std::fs::write(&first, b"%PDF-one\n").unwrap();
    std::fs::write(&second, b"%PDF-two\n").unwrap();

    // Success: arguments reach the tool in job order
    let output = dir.path().join("merged.pdf");
    let job = MergeJob {
        inputs: vec![second.clone(), first.clone()],
        output: output.clone(),
        timeout: Some(Duration::from_secs(30)),
    };
    let merger = PdftkMerger::new(&concat);
    assert!(merger.health_check().await);
    merger.merge(&job).await.unwrap();
    assert_eq!(std::fs::read(&output).unwrap(), b"%PDF-two\n%PDF-one\n");

    // Non-zero exit: both streams captured
    let err = PdftkMerger::new(&failing).merge(&job).await.unwrap_err();
    match err {
        MergeToolError::Failed {
            status,
            stderr,
            stdout,
        } => {
            assert_eq!(status.code(), Some(3));
            assert!(stderr.contains("could not open input"));
            assert!(stdout.contains("partial output"));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // Timeout
    let slow_job = MergeJob {
        timeout: Some(Duration::from_millis(200)),
        ..job.clone()
    };
    let err = PdftkMerger::new(&slow).merge(&slow_job).await.unwrap_err();
    assert!(matches!(err, MergeToolError::TimedOut { .. }));

    // Exit zero without producing the output file
    let missing_job = MergeJob {
        output: dir.path().join("never-written.pdf"),
        ..job
    };
    let err = PdftkMerger::new(&silent).merge(&missing_job).await.unwrap_err();
    assert!(matches!(err, MergeToolError::MissingOutput(_)));
}
