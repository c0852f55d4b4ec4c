/*!
 * Tests for script parsing
 */

use scriptvox::app_config::ParserConfig;
use scriptvox::script::{pages_from_text, parse, Page, ScriptParser, ScriptSummary};
use scriptvox::ScriptError;

use crate::common::{single_page, COFFEE_SHOP_SCRIPT};

#[test]
fn test_parse_basicExchange_shouldMatchExpectedDialogue() {
    let parsed = parse(&single_page(&["JOHN", "Hello there.", "(pause)", "SARAH", "Hi John!"])).unwrap();

    let entries: Vec<(&str, &str, u64)> = parsed
        .dialogue
        .iter()
        .map(|line| (line.character.as_str(), line.text.as_str(), line.sequence))
        .collect();
    assert_eq!(entries, vec![("JOHN", "Hello there.", 1), ("SARAH", "Hi John!", 2)]);
    assert_eq!(parsed.registry.get("JOHN").unwrap().line_count, 1);
    assert_eq!(parsed.registry.get("SARAH").unwrap().line_count, 1);
}

#[test]
fn test_parse_coffeeShop_shouldAttributeEveryLine() {
    let pages = pages_from_text(COFFEE_SHOP_SCRIPT).unwrap();
    let parsed = parse(&pages).unwrap();

    let speakers: Vec<&str> = parsed.dialogue.iter().map(|line| line.character.as_str()).collect();
    assert_eq!(speakers, vec!["JOHN", "SARAH", "JOHN", "BARISTA", "JOHN", "SARAH"]);
    assert_eq!(parsed.dialogue[1].text, "John! Sorry I'm late.");
    assert_eq!(parsed.dialogue[5].text, "That was the day everything changed.");
    assert_eq!(parsed.registry.keys(), vec!["JOHN", "SARAH", "BARISTA"]);
}

#[test]
fn test_parse_shouldBeDeterministic() {
    let pages = pages_from_text(COFFEE_SHOP_SCRIPT).unwrap();
    let first = parse(&pages).unwrap();
    let second = parse(&pages).unwrap();
    assert_eq!(first.dialogue, second.dialogue);
    assert_eq!(first.registry.keys(), second.registry.keys());
}

#[test]
fn test_parse_sequences_shouldBeGaplessFromOne() {
    let pages = vec![
        Page::new(0, "JOHN\nOne.\n...\nTwo.\n(beat)\nThree."),
        Page::new(1, "SARAH\nFour.\n\nINT. HALL - NIGHT\n\nJOHN\nFive."),
    ];
    let parsed = parse(&pages).unwrap();

    let sequences: Vec<u64> = parsed.dialogue.iter().map(|line| line.sequence).collect();
    assert_eq!(sequences, (1..=5).collect::<Vec<u64>>());
    assert_eq!(parsed.dialogue[3].source_page, 1);
}

#[test]
fn test_parse_lineCounts_shouldMatchDialogue() {
    let parsed = parse(&pages_from_text(COFFEE_SHOP_SCRIPT).unwrap()).unwrap();
    for character in parsed.registry.characters() {
        let count = parsed.dialogue.iter().filter(|line| line.character == character.key).count();
        assert_eq!(character.line_count, count, "{}", character.key);
    }
}

#[test]
fn test_parse_caseAndSpacingVariants_shouldShareCharacter() {
    let parsed = parse(&single_page(&["JOHN", "First.", "SARAH", "Second.", "JOHN ", "Third."])).unwrap();
    assert_eq!(parsed.registry.len(), 2);
    assert_eq!(parsed.lines_for("john ").len(), 2);
}

#[test]
fn test_parse_noCues_shouldFailWithEmptyScript() {
    let result = parse(&single_page(&["INT. OFFICE - DAY", "(silence)", "The phone rings."]));
    assert!(matches!(result, Err(ScriptError::EmptyScript)));
}

#[test]
fn test_parse_headingsAndWrylies_shouldNeverProduceDialogue() {
    let parsed = parse(&single_page(&["JOHN", "(whispering)", "Quiet.", "INT. OFFICE - DAY", "(whispering)"])).unwrap();
    assert_eq!(parsed.dialogue.len(), 1);
    assert_eq!(parsed.dialogue[0].text, "Quiet.");
}

#[test]
fn test_parse_withBlankLineEndingDialogue_shouldDropActionLines() {
    let config = ParserConfig {
        blank_line_ends_dialogue: true,
        ..ParserConfig::default()
    };
    let pages = single_page(&["JOHN", "Hello.", "", "He leaves the room."]);

    let strict = ScriptParser::new(config).parse(&pages).unwrap();
    assert_eq!(strict.dialogue.len(), 1);

    let lenient = parse(&pages).unwrap();
    assert_eq!(lenient.dialogue.len(), 2);
}

#[test]
fn test_summary_coffeeShop_shouldCountWords() {
    let parsed = parse(&pages_from_text(COFFEE_SHOP_SCRIPT).unwrap()).unwrap();
    let summary = ScriptSummary::from_parsed(&parsed);

    assert_eq!(summary.character_count, 3);
    assert_eq!(summary.total_dialogue_lines, 6);
    let barista = summary.characters.iter().find(|c| c.key == "BARISTA").unwrap();
    assert_eq!(barista.total_words, 2);
    assert_eq!(barista.sample_line, "Two lattes?");
}
