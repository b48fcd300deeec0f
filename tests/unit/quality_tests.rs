/*!
 * Tests for the quality checker
 */

use gamestringer::validation::{IssueKind, QualityChecker, QualityConfig, Severity};

#[test]
fn test_check_withDroppedFormatSpecifier_shouldReportMissingPlaceholder() {
    let checker = QualityChecker::new();
    let issues = checker.check("Press %s to continue", "Premi per continuare");

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::MissingPlaceholder);
    assert_eq!(issues[0].severity, Severity::High);
    assert!(issues[0].issues[0].contains("%s"));
}

#[test]
fn test_check_withUnclosedBold_shouldReportMarkupImbalance() {
    let checker = QualityChecker::new();
    let issues = checker.check("<b>Hello</b>", "<b>Ciao");

    assert!(issues.iter().any(|issue| issue.kind == IssueKind::MarkupImbalance));
}

#[test]
fn test_check_withReorderedPlaceholders_shouldPass() {
    let checker = QualityChecker::new();
    let issues = checker.check("{0} attacks {1} for {2} damage", "{1} subisce {2} danni da {0}");
    assert!(issues.is_empty());
}

#[test]
fn test_check_withEveryPlaceholderStyle_shouldDetectEachDrop() {
    let checker = QualityChecker::new();
    let sources = [
        ("Hello, {player_name}!", "Ciao!"),
        ("Gold: $gold", "Oro:"),
        ("Press [ACTION] to jump", "Premi per saltare"),
        ("HP %1$d of %2$d", "PV %1$d"),
    ];

    for (source, translated) in sources {
        let issues = checker.check(source, translated);
        assert!(
            issues.iter().any(|issue| issue.kind == IssueKind::MissingPlaceholder),
            "missed drop in {:?}",
            source
        );
    }
}

#[test]
fn test_assess_withCleanTranslation_shouldScoreMaximum() {
    let checker = QualityChecker::new();
    let (issues, score) = checker.assess("The treasure chest is locked.", "Lo scrigno del tesoro è chiuso.");

    assert!(issues.is_empty());
    assert_eq!(score, 100);
}

#[test]
fn test_score_withHighAndInfoIssues_shouldPenalizeBoth() {
    let checker = QualityChecker::new();
    let source = "Collect {0} crystals before the portal closes";
    let (issues, score) = checker.assess(source, "Raccogli");

    let kinds: Vec<IssueKind> = issues.iter().map(|issue| issue.kind).collect();
    assert!(kinds.contains(&IssueKind::MissingPlaceholder));
    assert!(kinds.contains(&IssueKind::LengthAnomaly));
    assert_eq!(score, 100 - 10 - 3);
}

#[test]
fn test_withConfig_placeholderCheckOff_shouldIgnoreDrops() {
    let checker = QualityChecker::with_config(QualityConfig {
        placeholder_check: false,
        ..QualityConfig::default()
    });
    assert!(checker.check("Press %s", "Premi").is_empty());
}
