//! `/skip` command handling
//!
//! A reviewer comments `/skip` on a pull request to mark optional checks
//! that are failing or still running as passed. Required checks are never
//! touched, checks that never reported are not fabricated, green checks are
//! left alone, and a check the same comment asks to re-run is not skipped.

use std::collections::HashSet;

use presubmit_trigger::{is_skip_command, Presubmit, SKIPPED_DESCRIPTION};
use presubmit_types::{CommentAction, CommentEvent, IssueState, Status, StatusState};
use tracing::{debug, info, warn, Span};

use crate::config::SkipSettings;
use crate::host::{HostClient, HostError};

/// A status write that the host rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWriteFailure {
    pub context: String,
    pub error: HostError,
}

fn describe_failures(failures: &[StatusWriteFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.context, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors for skip handling
#[derive(Debug, thiserror::Error)]
pub enum SkipError {
    #[error("Cannot get PR #{number} in {org}/{repo}: {source}")]
    PullRequest {
        org: String,
        repo: String,
        number: u64,
        source: HostError,
    },

    #[error("Cannot get commit statuses for {sha}: {source}")]
    ListStatuses { sha: String, source: HostError },

    #[error("Cannot check whether {user} is trusted: {source}")]
    TrustCheck { user: String, source: HostError },

    #[error("Cannot update PR status for {}", describe_failures(.failures))]
    StatusWrites { failures: Vec<StatusWriteFailure> },
}

/// What a skip request did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipOutcome {
    /// Contexts marked as skipped, in definition order
    pub skipped: Vec<String>,
}

/// Returns true if the event is a new `/skip` comment on an open pull request.
pub fn is_skip_request(event: &CommentEvent) -> bool {
    event.is_pr
        && event.issue_state == IssueState::Open
        && event.action == CommentAction::Created
        && is_skip_command(&event.body)
}

/// Select the presubmits whose contexts a skip comment should resolve.
///
/// A presubmit qualifies when it is optional, its context is currently
/// failing or pending, and `body` does not also trigger it. Each context is
/// returned at most once.
pub fn contexts_to_skip<'a>(
    body: &str,
    presubmits: &'a [Presubmit],
    existing: &[Status],
) -> Vec<&'a Presubmit> {
    let mut seen = HashSet::new();
    presubmits
        .iter()
        .filter(|presubmit| presubmit.is_optional())
        .filter(|presubmit| {
            existing.iter().any(|status| {
                status.context == presubmit.context()
                    && matches!(status.state, StatusState::Failure | StatusState::Pending)
            })
        })
        .filter(|presubmit| !presubmit.trigger_matches(body))
        .filter(|presubmit| seen.insert(presubmit.context().to_string()))
        .collect()
}

/// Resolves `/skip` comments against posted statuses
pub struct SkipResolver<H> {
    host: H,
    settings: SkipSettings,
    span: Span,
}

impl<H: HostClient> SkipResolver<H> {
    /// Create a resolver logging under `span`
    pub fn new(host: H, settings: SkipSettings, span: Span) -> Self {
        Self {
            host,
            settings,
            span,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Handle a comment event end to end.
    ///
    /// Looks up the head commit (unless the event carries it) and the
    /// statuses currently posted on it, then resolves the skip.
    pub fn handle(
        &self,
        event: &CommentEvent,
        presubmits: &[Presubmit],
    ) -> Result<SkipOutcome, SkipError> {
        let _enter = self.span.enter();
        if !is_skip_request(event) {
            debug!(pr = event.number, "Not a skip request");
            return Ok(SkipOutcome::default());
        }
        if !self.check_trusted(event)? {
            return Ok(SkipOutcome::default());
        }

        let org = &event.repo.owner;
        let repo = &event.repo.name;
        let sha = self.head_sha(event)?;
        let existing = match self.host.list_statuses(org, repo, &sha) {
            Ok(statuses) => statuses,
            Err(source) => {
                let err = SkipError::ListStatuses { sha, source };
                self.report_failure(event, &err);
                return Err(err);
            }
        };

        self.apply(event, &sha, presubmits, &existing)
    }

    /// Resolve a skip request against already-fetched statuses.
    ///
    /// Posts `success`/"Skipped" for every qualifying context. Every write is
    /// attempted; failures are returned together.
    pub fn resolve_skips(
        &self,
        event: &CommentEvent,
        presubmits: &[Presubmit],
        existing: &[Status],
    ) -> Result<SkipOutcome, SkipError> {
        let _enter = self.span.enter();
        if !is_skip_request(event) {
            debug!(pr = event.number, "Not a skip request");
            return Ok(SkipOutcome::default());
        }
        if !self.check_trusted(event)? {
            return Ok(SkipOutcome::default());
        }

        let sha = self.head_sha(event)?;
        self.apply(event, &sha, presubmits, existing)
    }

    fn apply(
        &self,
        event: &CommentEvent,
        sha: &str,
        presubmits: &[Presubmit],
        existing: &[Status],
    ) -> Result<SkipOutcome, SkipError> {
        let org = &event.repo.owner;
        let repo = &event.repo.name;
        let mut outcome = SkipOutcome::default();
        let mut failures = Vec::new();

        for presubmit in contexts_to_skip(&event.body, presubmits, existing) {
            let context = presubmit.context();
            let status = Status::new(context, StatusState::Success).with_description(SKIPPED_DESCRIPTION);
            match self.host.create_status(org, repo, sha, &status) {
                Ok(()) => {
                    info!(context = %context, sha = %sha, pr = event.number, "Skipped optional context");
                    outcome.skipped.push(context.to_string());
                }
                Err(error) => {
                    warn!(context = %context, sha = %sha, error = %error, "Cannot update PR status");
                    failures.push(StatusWriteFailure {
                        context: context.to_string(),
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            return Ok(outcome);
        }
        let err = SkipError::StatusWrites { failures };
        self.report_failure(event, &err);
        Err(err)
    }

    /// Returns false (after telling the author) when the author may not skip.
    fn check_trusted(&self, event: &CommentEvent) -> Result<bool, SkipError> {
        if !self.settings.require_trusted_user {
            return Ok(true);
        }
        let trusted = self
            .host
            .is_trusted(&event.repo.owner, &event.repo.name, &event.user)
            .map_err(|source| SkipError::TrustCheck {
                user: event.user.clone(),
                source,
            })?;
        if !trusted {
            info!(user = %event.user, pr = event.number, "Ignoring skip from untrusted user");
            self.comment(event, "Cannot skip tests: user is not trusted.");
        }
        Ok(trusted)
    }

    fn head_sha(&self, event: &CommentEvent) -> Result<String, SkipError> {
        if let Some(sha) = &event.head_sha {
            return Ok(sha.clone());
        }
        match self
            .host
            .get_pull_request(&event.repo.owner, &event.repo.name, event.number)
        {
            Ok(pr) => Ok(pr.head_sha),
            Err(source) => {
                let err = SkipError::PullRequest {
                    org: event.repo.owner.clone(),
                    repo: event.repo.name.clone(),
                    number: event.number,
                    source,
                };
                self.report_failure(event, &err);
                Err(err)
            }
        }
    }

    fn report_failure(&self, event: &CommentEvent, err: &SkipError) {
        if self.settings.comment_on_failure {
            self.comment(event, &err.to_string());
        }
    }

    /// Best-effort reply on the pull request
    fn comment(&self, event: &CommentEvent, message: &str) {
        let body = format_response(&event.user, &event.body, message);
        if let Err(error) =
            self.host
                .create_comment(&event.repo.owner, &event.repo.name, event.number, &body)
        {
            warn!(pr = event.number, error = %error, "Cannot comment on pull request");
        }
    }
}

/// Reply addressed to the comment author, quoting the original comment.
pub fn format_response(user: &str, original: &str, message: &str) -> String {
    let quoted = original
        .lines()
        .map(|line| format!(">{}", line))
        .collect::<Vec<_>>()
        .join("\n");
    if user.is_empty() {
        format!("{}\n\nIn response to:\n\n{}", message, quoted)
    } else {
        format!("@{}: {}\n\nIn response to:\n\n{}", user, message, quoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FailureConfig, FakeHost, HostOperation};
    use presubmit_trigger::PresubmitSpec;
    use presubmit_types::Repo;

    const SHA: &str = "shalala";

    fn optional(context: &str) -> Presubmit {
        Presubmit::compile(&PresubmitSpec {
            name: context.to_string(),
            optional: true,
            ..Default::default()
        })
        .unwrap()
    }

    fn required(context: &str) -> Presubmit {
        Presubmit::compile(&PresubmitSpec {
            name: context.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn skip_event(body: &str) -> CommentEvent {
        let mut event = CommentEvent::pr_comment(Repo::new("org", "repo"), 1, body);
        event.user = "reviewer".to_string();
        event
    }

    fn resolver(host: &FakeHost) -> SkipResolver<&FakeHost> {
        host.add_pull_request("org", "repo", 1, SHA);
        SkipResolver::new(host, SkipSettings::default(), Span::none())
    }

    #[test]
    fn test_is_skip_request_gating() {
        assert!(is_skip_request(&skip_event("/skip")));

        let mut event = skip_event("/skip");
        event.is_pr = false;
        assert!(!is_skip_request(&event));

        let mut event = skip_event("/skip");
        event.issue_state = IssueState::Closed;
        assert!(!is_skip_request(&event));

        let mut event = skip_event("/skip");
        event.action = CommentAction::Edited;
        assert!(!is_skip_request(&event));

        assert!(!is_skip_request(&skip_event("lgtm")));
    }

    #[test]
    fn test_contexts_to_skip_error_state_left_alone() {
        let presubmits = [optional("flaky")];
        let existing = [Status::new("flaky", StatusState::Error)];
        assert!(contexts_to_skip("/skip", &presubmits, &existing).is_empty());
    }

    #[test]
    fn test_contexts_to_skip_dedupes_contexts() {
        let presubmits = [optional("flaky"), optional("flaky")];
        let existing = [Status::new("flaky", StatusState::Failure)];
        assert_eq!(contexts_to_skip("/skip", &presubmits, &existing).len(), 1);
    }

    #[test]
    fn test_non_skip_event_does_nothing() {
        let host = FakeHost::new();
        host.seed_statuses(SHA, [Status::new("flaky", StatusState::Failure)]);
        let resolver = resolver(&host);

        let outcome = resolver.handle(&skip_event("/retest"), &[optional("flaky")]).unwrap();
        assert!(outcome.skipped.is_empty());
        assert!(host.status_writes().is_empty());
    }

    #[test]
    fn test_handle_fetches_head_and_statuses() {
        let host = FakeHost::new();
        host.seed_statuses(SHA, [Status::new("flaky", StatusState::Failure)]);
        let resolver = resolver(&host);

        let outcome = resolver.handle(&skip_event("/skip"), &[optional("flaky")]).unwrap();
        assert_eq!(outcome.skipped, vec!["flaky"]);

        let writes = host.status_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].sha, SHA);
        assert_eq!(writes[0].status.description, "Skipped");
    }

    #[test]
    fn test_event_head_sha_used_without_lookup() {
        let host = FakeHost::new();
        host.fail(HostOperation::GetPullRequest, FailureConfig::error("500", "down"));
        let resolver = SkipResolver::new(&host, SkipSettings::default(), Span::none());

        let mut event = skip_event("/skip");
        event.head_sha = Some("abc123".to_string());
        let existing = [Status::new("flaky", StatusState::Pending)];

        resolver
            .resolve_skips(&event, &[optional("flaky")], &existing)
            .unwrap();
        assert_eq!(host.status_writes()[0].sha, "abc123");
    }

    #[test]
    fn test_write_failures_aggregated_after_trying_all() {
        let host = FakeHost::new();
        host.seed_statuses(
            SHA,
            [
                Status::new("a", StatusState::Failure),
                Status::new("b", StatusState::Failure),
                Status::new("c", StatusState::Pending),
            ],
        );
        host.fail_status_write("a", FailureConfig::error("500", "boom"));
        host.fail_status_write("c", FailureConfig::error("422", "invalid"));
        let resolver = resolver(&host);

        let err = resolver
            .handle(&skip_event("/skip"), &[optional("a"), optional("b"), optional("c")])
            .unwrap_err();

        match err {
            SkipError::StatusWrites { ref failures } => {
                let contexts: Vec<&str> = failures.iter().map(|f| f.context.as_str()).collect();
                assert_eq!(contexts, vec!["a", "c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(host.status_writes().len(), 1);
        assert_eq!(host.status_writes()[0].status.context, "b");

        let comments = host.comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].body.starts_with("@reviewer: Cannot update PR status for a"));
    }

    #[test]
    fn test_pull_request_lookup_failure() {
        let host = FakeHost::new();
        let resolver = SkipResolver::new(&host, SkipSettings::default(), Span::none());

        let err = resolver.handle(&skip_event("/skip"), &[optional("flaky")]).unwrap_err();
        assert!(matches!(err, SkipError::PullRequest { number: 1, .. }));
        assert!(host.comments()[0].body.contains("Cannot get PR #1 in org/repo"));
    }

    #[test]
    fn test_list_statuses_failure() {
        let host = FakeHost::new();
        host.fail(HostOperation::ListStatuses, FailureConfig::error("502", "bad gateway"));
        let resolver = resolver(&host);

        let err = resolver.handle(&skip_event("/skip"), &[optional("flaky")]).unwrap_err();
        assert!(matches!(err, SkipError::ListStatuses { .. }));
    }

    #[test]
    fn test_no_comment_when_disabled() {
        let host = FakeHost::new();
        let settings = SkipSettings {
            comment_on_failure: false,
            ..SkipSettings::default()
        };
        let resolver = SkipResolver::new(&host, settings, Span::none());

        assert!(resolver.handle(&skip_event("/skip"), &[optional("flaky")]).is_err());
        assert!(host.comments().is_empty());
    }

    #[test]
    fn test_comment_failure_does_not_mask_error() {
        let host = FakeHost::new();
        host.fail(HostOperation::CreateComment, FailureConfig::error("403", "forbidden"));
        let resolver = SkipResolver::new(&host, SkipSettings::default(), Span::none());

        let err = resolver.handle(&skip_event("/skip"), &[optional("flaky")]).unwrap_err();
        assert!(matches!(err, SkipError::PullRequest { .. }));
    }

    #[test]
    fn test_untrusted_user_rejected() {
        let host = FakeHost::new();
        host.seed_statuses(SHA, [Status::new("flaky", StatusState::Failure)]);
        host.add_pull_request("org", "repo", 1, SHA);
        let settings = SkipSettings {
            require_trusted_user: true,
            ..SkipSettings::default()
        };
        let resolver = SkipResolver::new(&host, settings, Span::none());

        let outcome = resolver.handle(&skip_event("/skip"), &[optional("flaky")]).unwrap();
        assert!(outcome.skipped.is_empty());
        assert!(host.status_writes().is_empty());
        assert!(host.comments()[0].body.contains("user is not trusted"));

        host.trust("reviewer");
        let outcome = resolver.handle(&skip_event("/skip"), &[optional("flaky")]).unwrap();
        assert_eq!(outcome.skipped, vec!["flaky"]);
    }

    #[test]
    fn test_trust_check_failure() {
        let host = FakeHost::new();
        host.fail(HostOperation::IsTrusted, FailureConfig::error("500", "down"));
        let settings = SkipSettings {
            require_trusted_user: true,
            ..SkipSettings::default()
        };
        let resolver = SkipResolver::new(&host, settings, Span::none());

        let err = resolver.handle(&skip_event("/skip"), &[optional("flaky")]).unwrap_err();
        assert!(matches!(err, SkipError::TrustCheck { .. }));
    }

    #[test]
    fn test_required_untouched_even_with_optional_sibling() {
        let host = FakeHost::new();
        host.seed_statuses(
            SHA,
            [
                Status::new("gate", StatusState::Failure),
                Status::new("flaky", StatusState::Failure),
            ],
        );
        let resolver = resolver(&host);

        resolver
            .handle(&skip_event("/skip"), &[required("gate"), optional("flaky")])
            .unwrap();
        let statuses = host.statuses(SHA);
        assert_eq!(statuses[0].state, StatusState::Failure);
        assert_eq!(statuses[1].state, StatusState::Success);
    }

    #[test]
    fn test_format_response() {
        let body = format_response("alice", "/skip\nplease", "done");
        assert_eq!(body, "@alice: done\n\nIn response to:\n\n>/skip\n>please");
        assert!(format_response("", "/skip", "done").starts_with("done"));
    }
}
