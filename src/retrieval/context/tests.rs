use super::*;

fn result(id: i64, text: &str) -> RetrievalResult {
    RetrievalResult {
        id,
        text: text.to_string(),
        embedding: vec![0.0; 2],
        distance: 0.1 * id as f64,
    }
}

#[test]
fn empty_results_give_placeholder() {
    assert_eq!(assemble(&[], 3, 100), NO_CONTEXT_PLACEHOLDER);
    assert_eq!(assemble(&[result(1, "text")], 0, 100), NO_CONTEXT_PLACEHOLDER);
}

#[test]
fn items_keep_ranked_order_and_separator() {
    let results = [
        result(1, "Birds fly south."),
        result(2, "The cat sat."),
        result(3, "The dog ran."),
    ];

    assert_eq!(
        assemble(&results, 3, 100),
        "Birds fly south.\n---\nThe cat sat.\n---\nThe dog ran."
    );
}

#[test]
fn max_items_limits_count() {
    let results = [result(1, "one"), result(2, "two"), result(3, "three")];

    assert_eq!(assemble(&results, 2, 100), "one\n---\ntwo");
    assert_eq!(assemble(&results, 10, 100), "one\n---\ntwo\n---\nthree");
}

#[test]
fn long_items_are_truncated_with_ellipsis() {
    let results = [result(1, "abcdefghij"), result(2, "short")];

    assert_eq!(assemble(&results, 2, 5), "abcde...\n---\nshort");
}

#[test]
fn item_of_exact_length_is_untouched() {
    assert_eq!(truncate_chars("abcde", 5), "abcde");
    assert_eq!(truncate_chars("abcdef", 5), "abcde...");
}

#[test]
fn truncation_counts_characters_not_bytes() {
    assert_eq!(truncate_chars("äöüßéè", 3), "äöü...");
    assert_eq!(truncate_chars("日本語テキスト", 3), "日本語...");
}

#[test]
fn record_without_text_is_not_reported_as_no_context() {
    let context = assemble(&[result(1, "")], 3, 100);

    assert_ne!(context, NO_CONTEXT_PLACEHOLDER);
    assert_eq!(context, ELLIPSIS);
    assert_eq!(assemble(&[result(1, ""), result(2, "b")], 3, 100), "\n---\nb");
}

#[test]
fn context_is_never_empty() {
    for results in [vec![], vec![result(1, "x")], vec![result(1, "")]] {
        for max_items in [0, 1, 5] {
            assert!(!assemble(&results, max_items, 1).is_empty());
        }
    }
}
