//! Language cleaners: raw text → the symbol alphabet a model was trained on.
//!
//! Every cleaner is a pure `&str -> String` function.

use pinyin::ToPinyin;

const ZH_PUNCTUATION: [(char, &str); 5] = [
    ('，', ","),
    ('。', "."),
    ('！', "!"),
    ('？', "?"),
    ('、', ","),
];

fn is_han(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

fn zh_punctuation(c: char) -> Option<&'static str> {
    ZH_PUNCTUATION
        .iter()
        .find(|(p, _)| *p == c)
        .map(|(_, mapped)| *mapped)
}

fn keep_for_zh(c: char) -> bool {
    is_han(c) || zh_punctuation(c).is_some() || c.is_ascii_alphanumeric() || c.is_whitespace()
}

fn flush_run(run: &mut String, phones: &mut Vec<String>) {
    let token = run.trim();
    if !token.is_empty() {
        phones.push(token.to_string());
    }
    run.clear();
}

/// Mandarin to space-separated toned pinyin (`你好` → `ni3 hao3 .`).
///
/// Keeps CJK ideographs, `，。！？、`, ASCII letters/digits and whitespace;
/// everything else is stripped. Latin runs pass through as single tokens.
pub fn chinese_cleaners(text: &str) -> String {
    let mut phones: Vec<String> = Vec::new();
    let mut run = String::new();

    for c in text.chars().filter(|c| keep_for_zh(*c)) {
        if let Some(mark) = zh_punctuation(c) {
            flush_run(&mut run, &mut phones);
            phones.push(mark.to_string());
        } else if is_han(c) {
            flush_run(&mut run, &mut phones);
            // ideographs without a known reading are dropped
            if let Some(py) = c.to_pinyin() {
                phones.push(py.with_tone_num_end().to_string());
            }
        } else {
            run.push(c);
        }
    }
    flush_run(&mut run, &mut phones);

    if let Some(last) = phones.last() {
        if !matches!(last.as_str(), "." | "!" | "?") {
            phones.push(".".to_string());
        }
    }
    phones.join(" ")
}

/// Mixed zh/ja models trained on pinyin input; same rules as `chinese_cleaners`.
pub fn zh_ja_mixture_cleaners(text: &str) -> String {
    chinese_cleaners(text)
}

pub fn sanskrit_cleaners(text: &str) -> String {
    let text = text.replace('॥', "।").replace('ॐ', "ओम्");
    if text.is_empty() || text.ends_with('।') {
        text
    } else {
        text + "।"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chinese_greeting() {
        assert_eq!(chinese_cleaners("你好"), "ni3 hao3 .");
    }

    #[test]
    fn chinese_punctuation_is_mapped() {
        assert_eq!(chinese_cleaners("你好，世界！"), "ni3 hao3 , shi4 jie4 !");
        assert_eq!(chinese_cleaners("你好。"), "ni3 hao3 .");
    }

    #[test]
    fn chinese_strips_unsupported_characters() {
        assert_eq!(chinese_cleaners("你好~ (≧∇≦)"), "ni3 hao3 .");
        assert_eq!(chinese_cleaners("🙂😂"), "");
    }

    #[test]
    fn chinese_keeps_latin_runs() {
        assert_eq!(chinese_cleaners("我用 Rust 2024"), "wo3 yong4 Rust 2024 .");
    }

    #[test]
    fn sanskrit_appends_danda() {
        assert_eq!(sanskrit_cleaners("ॐ नमः"), "ओम् नमः।");
        assert_eq!(sanskrit_cleaners("नमः॥"), "नमः।");
        assert_eq!(sanskrit_cleaners(""), "");
    }
}
