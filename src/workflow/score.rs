use crate::workflow::types::{Issue, Severity};

/// Points deducted per issue, by severity.
fn deduction(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 25,
        Severity::High => 15,
        Severity::Medium => 8,
        Severity::Low => 3,
        Severity::Unknown => 5,
    }
}

/// Map a list of review issues to a 0-100 quality score.
///
/// An empty list scores 100. Deductions sum per issue and are capped at 100
/// before subtraction, so the floor is 0. This is the single scoring function
/// used for the initial review and every refinement round; the 85-point
/// threshold is only meaningful because the same function runs everywhere.
pub fn score_issues(issues: &[Issue]) -> u8 {
    if issues.is_empty() {
        return 100;
    }

    let total: u32 = issues.iter().map(|i| deduction(i.severity)).sum();
    (100 - total.min(100)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::IssueKind;

    fn issue(severity: Severity) -> Issue {
        Issue {
            kind: IssueKind::Bug,
            severity,
            line: None,
            description: "test issue".to_string(),
            suggestion: "fix it".to_string(),
        }
    }

    #[test]
    fn empty_list_scores_100() {
        assert_eq!(score_issues(&[]), 100);
    }

    #[test]
    fn single_critical_scores_75() {
        assert_eq!(score_issues(&[issue(Severity::Critical)]), 75);
    }

    #[test]
    fn critical_plus_high_scores_60() {
        assert_eq!(
            score_issues(&[issue(Severity::Critical), issue(Severity::High)]),
            60
        );
    }

    #[test]
    fn deduction_is_capped_at_100() {
        let issues: Vec<Issue> = (0..11).map(|_| issue(Severity::Critical)).collect();
        assert_eq!(score_issues(&issues), 0);
    }

    #[test]
    fn unknown_severity_deducts_5() {
        assert_eq!(score_issues(&[issue(Severity::Unknown)]), 95);
    }

    #[test]
    fn adding_an_issue_never_increases_the_score() {
        let severities = [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
            Severity::Unknown,
        ];

        let mut issues = Vec::new();
        let mut previous = score_issues(&issues);
        for severity in severities {
            issues.push(issue(severity));
            let current = score_issues(&issues);
            assert!(current <= previous);
            previous = current;
        }
    }

    #[test]
    fn score_is_order_independent() {
        let forward = vec![issue(Severity::Critical), issue(Severity::Low)];
        let backward = vec![issue(Severity::Low), issue(Severity::Critical)];
        assert_eq!(score_issues(&forward), score_issues(&backward));
    }

    #[test]
    fn score_stays_in_bounds() {
        for n in 0..40 {
            let issues: Vec<Issue> = (0..n).map(|_| issue(Severity::High)).collect();
            let score = score_issues(&issues);
            assert!(score <= 100);
        }
    }
}
