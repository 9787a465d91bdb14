use std::path::Path;
use std::process::{Command, Output};

fn run_cli(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_adbpull"))
        .args(args)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .current_dir(home)
        .output()
        .expect("failed to spawn adbpull")
}

#[test]
fn missing_destination_exits_non_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope");
    let out = run_cli(dir.path(), &["-s", "/sdcard/DCIM", "-d", missing.to_str().expect("utf8")]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("destination folder does not exist"), "stderr: {}", stderr);
}

#[test]
fn missing_input_file_exits_non_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().to_str().expect("utf8");
    let out = run_cli(dir.path(), &["-i", "no-such-list.txt", "-d", root]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("input file"));
}

#[test]
fn dry_run_over_list_prints_pairs_without_touching_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&out_dir).expect("mkdir");
    std::fs::write(dir.path().join("list.txt"), "/a/b/c.txt\n/x/2.mp4\n/x/1.jpg\n").expect("write");

    let out = run_cli(
        dir.path(),
        &["-i", "list.txt", "-d", out_dir.to_str().expect("utf8"), "--dry-run", "-f", "\\.mp4$"],
    );
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("/x/2.mp4\t->  "), "stdout: {}", stdout);
    assert!(!stdout.contains("/a/b/c.txt"));
    assert!(!out_dir.join("x").exists());
    assert!(!dir.path().join("pulled.txt").exists());
}

#[test]
fn missing_bridge_is_fatal_for_a_real_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("list.txt"), "/x/1.jpg\n").expect("write");
    let root = dir.path().to_str().expect("utf8");
    let out = run_cli(dir.path(), &["-i", "list.txt", "-d", root, "--adb", "/nonexistent/adb"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("device bridge executable not found"));
}

#[cfg(unix)]
#[test]
fn empty_work_list_is_a_clean_exit() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("list.txt"), "/x/1.jpg\n").expect("write");
    std::fs::write(dir.path().join("pulled.txt"), "/x/1.jpg\n").expect("write");
    let root = dir.path().to_str().expect("utf8");

    // the bridge resolves but is never invoked
    let out = run_cli(
        dir.path(),
        &["-i", "list.txt", "-p", "pulled.txt", "-d", root, "--adb", "/bin/sh"],
    );
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("No files to pull"));
    assert!(!dir.path().join("failed.txt").exists());
    assert_eq!(std::fs::read_to_string(dir.path().join("pulled.txt")).expect("read"), "/x/1.jpg\n");
}

// `/bin/sh` as the bridge runs `shell` and `pull` from the working directory
// as plain scripts, so nothing freshly written is ever exec'd directly.
#[cfg(unix)]
#[test]
fn json_run_prints_only_the_summary_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("shell"), "printf '/r:\\na\\nb\\n'\n").expect("write");
    std::fs::write(
        dir.path().join("pull"),
        "case \"$2\" in /r/a) echo 'remote object missing' >&2; exit 3 ;; esac\nprintf data > \"$3\"\n",
    )
    .expect("write");
    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&out_dir).expect("mkdir");

    let out = run_cli(
        dir.path(),
        &["-s", "/r", "-d", out_dir.to_str().expect("utf8"), "--adb", "/bin/sh", "--json"],
    );
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "stdout: {}", stdout);
    let v: serde_json::Value = serde_json::from_str(lines[0]).expect("json summary");
    assert_eq!(v["total"], 2);
    assert_eq!(v["succeeded"], 1);
    assert_eq!(v["failed"], 1);
    assert_eq!(std::fs::read_to_string(dir.path().join("failed.txt")).expect("read"), "/r/a\n");
    assert_eq!(std::fs::read_to_string(out_dir.join("r/b")).expect("read"), "data");
}
