/*!
 * Tests for line classification
 */

use scriptvox::script::{LineClassifier, LineContext, LineKind, Lookahead};

fn classifier() -> LineClassifier {
    LineClassifier::default()
}

/// Parentheticals never become dialogue, whatever precedes them
#[test]
fn test_classify_parenthetical_afterCue_shouldBeStageDirection() {
    for previous in [None, Some(LineKind::CharacterCue), Some(LineKind::Dialogue)] {
        let kind = classifier().classify("(whispering)", &LineContext::new(previous, Lookahead::Unknown));
        assert_eq!(kind, LineKind::StageDirection);
    }
}

/// Sluglines never become dialogue, whatever precedes them
#[test]
fn test_classify_slugline_afterDialogue_shouldBeSceneHeading() {
    for previous in [None, Some(LineKind::CharacterCue), Some(LineKind::Dialogue)] {
        let kind = classifier().classify("INT. OFFICE - DAY", &LineContext::new(previous, Lookahead::Line("Hi.")));
        assert_eq!(kind, LineKind::SceneHeading);
    }
}

#[test]
fn test_classify_upperCaseLine_followedByUpperCase_shouldBeSceneHeading() {
    let kind = classifier().classify(
        "THE BIG HOUSE",
        &LineContext::new(None, Lookahead::Line("ON THE HILL")),
    );
    assert_eq!(kind, LineKind::SceneHeading);
}

#[test]
fn test_classify_upperCaseLine_atEndOfDocument_shouldBeSceneHeading() {
    let kind = classifier().classify("JOHN", &LineContext::new(None, Lookahead::EndOfDocument));
    assert_eq!(kind, LineKind::SceneHeading);
}

#[test]
fn test_classify_nonSpeakerPhrases_shouldNeverBeCues() {
    for phrase in ["THE END", "MONTAGE", "LATER", "MOMENTS LATER", "FLASHBACK", "V.O."] {
        let kind = classifier().classify(phrase, &LineContext::new(None, Lookahead::Line("Some text follows.")));
        assert_eq!(kind, LineKind::SceneHeading, "{}", phrase);
    }
}

#[test]
fn test_classify_transitions_shouldBeStageDirection() {
    for line in ["FADE IN:", "CUT TO:", "DISSOLVE TO:", "SMASH CUT:", "CONTINUED", "(CONT'D)"] {
        let kind = classifier().classify(line, &LineContext::after(LineKind::Dialogue));
        assert_eq!(kind, LineKind::StageDirection, "{}", line);
    }
}

#[test]
fn test_classify_plainText_withoutSpeaker_shouldBeStageDirection() {
    let kind = classifier().classify("The door creaks open.", &LineContext::after(LineKind::SceneHeading));
    assert_eq!(kind, LineKind::StageDirection);
}

#[test]
fn test_classify_plainText_afterDialogue_shouldContinueDialogue() {
    let kind = classifier().classify("and then some.", &LineContext::after(LineKind::Dialogue));
    assert_eq!(kind, LineKind::Dialogue);
}

#[test]
fn test_cueName_shouldStripModifierAndColon() {
    let classifier = classifier();
    assert_eq!(classifier.cue_name("BARISTA (O.S.)"), Some("BARISTA"));
    assert_eq!(classifier.cue_name("SARAH:"), Some("SARAH"));
    assert_eq!(classifier.cue_name("J"), None);
    assert_eq!(classifier.cue_name("John"), None);
    assert_eq!(classifier.cue_name(&"A".repeat(31)), None);
}

#[test]
fn test_cueName_shouldRespectConfiguredLength() {
    let classifier = LineClassifier::new(5);
    assert_eq!(classifier.cue_name("BOB"), Some("BOB"));
    assert_eq!(classifier.cue_name("BARISTA"), None);
}
