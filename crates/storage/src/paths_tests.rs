// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use yare::parameterized;

#[test]
fn git_dir_of_main_checkout() {
    let id = project_id_from_git_dir(Path::new("/home/dev/widgets/.git"));
    assert_eq!(id.as_deref(), Some("widgets"));
}

#[test]
fn git_dir_of_linked_worktree() {
    let id = project_id_from_git_dir(Path::new("/home/dev/widgets/.git/worktrees/feature-x"));
    assert_eq!(id.as_deref(), Some("widgets"));
}

#[test]
fn bare_path_uses_basename() {
    let id = project_id_from_git_dir(Path::new("/srv/repos/widgets"));
    assert_eq!(id.as_deref(), Some("widgets"));
}

#[test]
fn cwd_fallback_uses_basename() {
    assert_eq!(project_id_from_cwd(Path::new("/home/dev/my proj")), "my-proj");
}

#[parameterized(
    plain = { "widgets", "widgets" },
    spaces = { "my project", "my-project" },
    slashes = { "a/b", "a-b" },
    keeps_dots = { "lib.rs-repo", "lib.rs-repo" },
    empty = { "", "project" },
)]
fn sanitize_cases(raw: &str, expected: &str) {
    assert_eq!(sanitize_project_id(raw), expected);
}

#[test]
#[serial]
fn data_dir_honors_env_override() {
    std::env::set_var("MISSION_DATA_DIR", "/tmp/mc-test-data");
    assert_eq!(data_dir(), PathBuf::from("/tmp/mc-test-data"));
    std::env::remove_var("MISSION_DATA_DIR");

    let fallback = data_dir();
    assert!(fallback.ends_with("mission-control"));
}
