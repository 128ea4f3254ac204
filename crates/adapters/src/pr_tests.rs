// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn request() -> PrRequest {
    PrRequest {
        branch: "mc/integration-p1".into(),
        base: "main".into(),
        title: "auth-refactor".into(),
        body: "3 jobs merged".into(),
    }
}

#[parameterized(
    ssh_scp = { "git@github.com:acme/widgets.git" },
    ssh_url = { "ssh://git@github.com/acme/widgets.git" },
    https = { "https://github.com/acme/widgets" },
    https_git = { "https://github.com/acme/widgets.git" },
)]
fn remote_forms_normalize(remote: &str) {
    let pr = CompareUrlPr::new(Some(remote.to_string()));
    let url = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(pr.open_pr(&request()))
        .unwrap();
    assert_eq!(
        url,
        "https://github.com/acme/widgets/compare/main...mc/integration-p1?expand=1"
    );
}

#[tokio::test]
async fn missing_remote_is_an_error() {
    let pr = CompareUrlPr::new(None);
    let err = pr.open_pr(&request()).await.unwrap_err();
    assert!(matches!(err, PrError::NoRemote));
}

#[tokio::test]
async fn unsupported_remote_is_an_error() {
    let pr = CompareUrlPr::new(Some("/srv/git/widgets.git".into()));
    let err = pr.open_pr(&request()).await.unwrap_err();
    assert!(matches!(err, PrError::UnsupportedRemote(_)));
}

#[tokio::test]
async fn fake_records_requests() {
    let pr = FakePrAdapter::new();
    let url = pr.open_pr(&request()).await.unwrap();
    assert!(url.contains("mc/integration-p1"));
    assert_eq!(pr.requests(), vec![request()]);
}
