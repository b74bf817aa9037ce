//! Layer 1: eligibility.
//!
//! An ordered rule table. Rules whose criterion is off are skipped; the
//! first enabled rule that fails eliminates the project with score 0 and
//! the remaining rules are recorded as not evaluated. A project passing
//! every enabled rule scores 100.
//!
//! The repository is probed at most once and only when an accessibility or
//! visibility rule is reached. Probe errors eliminate (fail closed).

use gauntlet_state::{EligibilityCriteria, Project};

use crate::domain::{
    EligibilityEvidence, Evidence, LayerDecision, RepoCheckError, RepositoryEvidence, RuleCheck,
    RuleOutcome,
};
use crate::repo_check::{parse_repository_url, RepoAccess, RepoRef, RepositoryChecker};

pub const ELIGIBLE_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityRule {
    SubmissionPresent,
    RepositoryParseable,
    RepositoryAccessible,
    RepositoryPublic,
}

/// Rules in evaluation order.
pub const ELIGIBILITY_RULES: [EligibilityRule; 4] = [
    EligibilityRule::SubmissionPresent,
    EligibilityRule::RepositoryParseable,
    EligibilityRule::RepositoryAccessible,
    EligibilityRule::RepositoryPublic,
];

impl EligibilityRule {
    pub fn name(self) -> &'static str {
        match self {
            EligibilityRule::SubmissionPresent => "submission_present",
            EligibilityRule::RepositoryParseable => "repository_parseable",
            EligibilityRule::RepositoryAccessible => "repository_accessible",
            EligibilityRule::RepositoryPublic => "repository_public",
        }
    }

    pub fn enabled(self, criteria: &EligibilityCriteria) -> bool {
        match self {
            EligibilityRule::SubmissionPresent => criteria.submission_deadline,
            EligibilityRule::RepositoryParseable => criteria.checks_repository(),
            EligibilityRule::RepositoryAccessible => criteria.repository_accessible,
            EligibilityRule::RepositoryPublic => criteria.repository_public,
        }
    }
}

/// Repository facts gathered while walking the rules.
#[derive(Default)]
struct RepoState {
    parsed: Option<RepoRef>,
    probe: Option<Result<RepoAccess, RepoCheckError>>,
    evidence: Option<RepositoryEvidence>,
}

impl RepoState {
    async fn probe(&mut self, checker: &dyn RepositoryChecker) -> Result<RepoAccess, String> {
        let Some(repo) = self.parsed.as_ref() else {
            return Err("repository was not resolved".to_string());
        };
        if self.probe.is_none() {
            self.probe = Some(checker.check(repo).await);
        }

        let evidence = self.evidence.get_or_insert_with(RepositoryEvidence::default);
        match self.probe.as_ref() {
            Some(Ok(access)) => {
                evidence.accessible = Some(access.accessible);
                evidence.is_public = Some(access.is_public);
                match &access.error {
                    Some(err) => {
                        evidence.error = Some(err.clone());
                        Err(format!("repository check failed: {err}"))
                    }
                    None => Ok(access.clone()),
                }
            }
            Some(Err(err)) => {
                evidence.error = Some(err.to_string());
                Err(format!("repository check failed: {err}"))
            }
            None => Err("repository was not checked".to_string()),
        }
    }
}

/// Apply the layer 1 rule table to one project.
pub async fn evaluate_eligibility(
    project: &Project,
    criteria: &EligibilityCriteria,
    checker: &dyn RepositoryChecker,
) -> LayerDecision {
    let mut checks = Vec::with_capacity(ELIGIBILITY_RULES.len());
    let mut repo = RepoState::default();
    let mut failure: Option<String> = None;

    for rule in ELIGIBILITY_RULES {
        if failure.is_some() {
            checks.push(RuleCheck {
                rule: rule.name().to_string(),
                outcome: RuleOutcome::NotEvaluated,
                detail: None,
            });
            continue;
        }
        if !rule.enabled(criteria) {
            checks.push(RuleCheck {
                rule: rule.name().to_string(),
                outcome: RuleOutcome::Skipped,
                detail: None,
            });
            continue;
        }

        let outcome: Result<(), String> = match rule {
            EligibilityRule::SubmissionPresent => match project.submitted_at {
                Some(_) => Ok(()),
                None => Err("project was not submitted".to_string()),
            },
            EligibilityRule::RepositoryParseable => match project.repository_url.as_deref() {
                None => Err("no repository URL provided".to_string()),
                Some(url) if url.trim().is_empty() => {
                    Err("no repository URL provided".to_string())
                }
                Some(url) => {
                    let evidence = repo.evidence.get_or_insert_with(RepositoryEvidence::default);
                    evidence.url = Some(url.to_string());
                    match parse_repository_url(url) {
                        Ok(parsed) => {
                            evidence.owner = Some(parsed.owner.clone());
                            evidence.repo = Some(parsed.repo.clone());
                            repo.parsed = Some(parsed);
                            Ok(())
                        }
                        Err(err) => {
                            evidence.error = Some(err.to_string());
                            Err(format!("repository URL could not be parsed: {err}"))
                        }
                    }
                }
            },
            EligibilityRule::RepositoryAccessible => match repo.probe(checker).await {
                Ok(access) if access.accessible => Ok(()),
                Ok(_) => Err("repository is not accessible".to_string()),
                Err(err) => Err(err),
            },
            EligibilityRule::RepositoryPublic => match repo.probe(checker).await {
                Ok(access) if access.accessible && access.is_public => Ok(()),
                Ok(_) => Err("repository is not public".to_string()),
                Err(err) => Err(err),
            },
        };

        match outcome {
            Ok(()) => checks.push(RuleCheck {
                rule: rule.name().to_string(),
                outcome: RuleOutcome::Passed,
                detail: None,
            }),
            Err(reason) => {
                checks.push(RuleCheck {
                    rule: rule.name().to_string(),
                    outcome: RuleOutcome::Failed,
                    detail: Some(reason.clone()),
                });
                failure = Some(reason);
            }
        }
    }

    let evidence = Evidence::Eligibility(EligibilityEvidence {
        criteria: criteria.clone(),
        checks,
        repository: repo.evidence,
    });

    match failure {
        Some(reason) => LayerDecision::eliminate(reason, evidence),
        None => LayerDecision::survive(ELIGIBLE_SCORE, "all eligibility checks passed", evidence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo_check::StaticRepoChecker;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn criteria(deadline: bool, accessible: bool, public: bool) -> EligibilityCriteria {
        EligibilityCriteria {
            submission_deadline: deadline,
            repository_accessible: accessible,
            repository_public: public,
        }
    }

    fn submitted(url: Option<&str>) -> Project {
        let mut project = Project::new("p-1", "defi");
        project.submitted_at = Some(Utc::now());
        project.repository_url = url.map(str::to_string);
        project
    }

    fn checks(decision: &LayerDecision) -> Vec<(String, RuleOutcome)> {
        let Evidence::Eligibility(e) = &decision.evidence else {
            panic!("wrong evidence kind");
        };
        e.checks
            .iter()
            .map(|c| (c.rule.clone(), c.outcome))
            .collect()
    }

    struct CountingChecker {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RepositoryChecker for CountingChecker {
        async fn check(&self, _repo: &RepoRef) -> Result<RepoAccess, RepoCheckError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RepoAccess::public())
        }
    }

    #[tokio::test]
    async fn missing_submission_eliminates_when_required() {
        let project = Project::new("p-1", "defi");
        let checker = StaticRepoChecker::new();

        let decision = evaluate_eligibility(&project, &criteria(true, false, false), &checker).await;
        assert!(decision.eliminated);
        assert_eq!(decision.score, 0.0);
        assert!(decision.reason.contains("not submitted"));

        let decision = evaluate_eligibility(&project, &criteria(false, false, false), &checker).await;
        assert!(!decision.eliminated);
        assert_eq!(decision.score, 100.0);
    }

    #[tokio::test]
    async fn first_failing_rule_wins_and_later_rules_are_not_evaluated() {
        let project = Project::new("p-1", "defi");
        let decision = evaluate_eligibility(
            &project,
            &criteria(true, true, true),
            &StaticRepoChecker::new(),
        )
        .await;

        assert_eq!(
            checks(&decision),
            vec![
                ("submission_present".to_string(), RuleOutcome::Failed),
                ("repository_parseable".to_string(), RuleOutcome::NotEvaluated),
                ("repository_accessible".to_string(), RuleOutcome::NotEvaluated),
                ("repository_public".to_string(), RuleOutcome::NotEvaluated),
            ]
        );
    }

    #[tokio::test]
    async fn unparseable_url_eliminates_with_parse_reason() {
        let project = submitted(Some("https://example.com/not/github"));
        let decision = evaluate_eligibility(
            &project,
            &criteria(false, true, false),
            &StaticRepoChecker::new(),
        )
        .await;
        assert!(decision.eliminated);
        assert!(decision.reason.contains("could not be parsed"));
    }

    #[tokio::test]
    async fn browser_urls_resolve_to_the_repository() {
        let checker = StaticRepoChecker::new().with("acme/widget", RepoAccess::public());
        for url in [
            "https://github.com/acme/widget/tree/main",
            "https://github.com/acme/widget?tab=readme",
            "https://github.com/acme/widget#readme",
            "https://GitHub.com/acme/widget",
        ] {
            let decision =
                evaluate_eligibility(&submitted(Some(url)), &criteria(true, true, true), &checker)
                    .await;
            assert!(!decision.eliminated, "{url} was eliminated: {}", decision.reason);
            assert_eq!(decision.score, 100.0);
        }
    }

    #[tokio::test]
    async fn missing_url_eliminates_when_repository_checked() {
        let decision = evaluate_eligibility(
            &submitted(None),
            &criteria(false, false, true),
            &StaticRepoChecker::new(),
        )
        .await;
        assert!(decision.eliminated);
        assert!(decision.reason.contains("no repository URL"));
    }

    #[tokio::test]
    async fn url_is_ignored_when_no_repository_flag_set() {
        let decision = evaluate_eligibility(
            &submitted(Some("garbage")),
            &criteria(true, false, false),
            &StaticRepoChecker::new(),
        )
        .await;
        assert!(!decision.eliminated);
    }

    #[tokio::test]
    async fn private_repository_fails_public_rule() {
        let checker = StaticRepoChecker::new().with("acme/secret", RepoAccess::private());
        let project = submitted(Some("https://github.com/acme/secret"));

        let decision = evaluate_eligibility(&project, &criteria(true, true, false), &checker).await;
        assert!(!decision.eliminated);

        let decision = evaluate_eligibility(&project, &criteria(true, true, true), &checker).await;
        assert!(decision.eliminated);
        assert_eq!(decision.reason, "repository is not public");
    }

    #[tokio::test]
    async fn unreachable_repository_fails_accessible_rule() {
        let project = submitted(Some("git@github.com:acme/gone.git"));
        let decision = evaluate_eligibility(
            &project,
            &criteria(false, true, false),
            &StaticRepoChecker::new(),
        )
        .await;
        assert!(decision.eliminated);
        assert_eq!(decision.reason, "repository is not accessible");
    }

    #[tokio::test]
    async fn checker_error_fails_closed_with_error_in_evidence() {
        let checker =
            StaticRepoChecker::new().with_error("acme/flaky", RepoCheckError::UnexpectedStatus(502));
        let project = submitted(Some("https://github.com/acme/flaky"));

        let decision = evaluate_eligibility(&project, &criteria(false, true, true), &checker).await;
        assert!(decision.eliminated);
        assert!(decision.reason.contains("502"));
        let Evidence::Eligibility(e) = &decision.evidence else {
            panic!("wrong evidence kind");
        };
        let repo = e.repository.as_ref().unwrap();
        assert!(repo.error.as_deref().unwrap().contains("502"));
        assert_eq!(repo.owner.as_deref(), Some("acme"));
    }

    #[tokio::test]
    async fn repository_is_probed_once_for_both_rules() {
        let checker = CountingChecker {
            calls: AtomicUsize::new(0),
        };
        let project = submitted(Some("https://github.com/acme/widget"));

        let decision = evaluate_eligibility(&project, &criteria(true, true, true), &checker).await;
        assert!(!decision.eliminated);
        assert_eq!(decision.score, 100.0);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 1);
        assert!(checks(&decision)
            .iter()
            .all(|(_, outcome)| *outcome == RuleOutcome::Passed));
    }
}
