// src/signals.rs
//! Text-signal detection over normalized titles.
//!
//! Each signal contributes an additive weight to the scorer's engagement
//! modifier. Signals are independent and may co-occur on the same title;
//! the scorer sums them before applying the total multiplicatively.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Additive modifier weights per signal category.
pub const MONEY_WEIGHT: f64 = 0.30;
pub const TIME_SAVINGS_WEIGHT: f64 = 0.20;
pub const INSIDER_WEIGHT: f64 = 0.20;
pub const CONTROVERSY_WEIGHT: f64 = 0.15;

fn money_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)
            \$\s?\d |
            \b(money|income|revenue|profit|salary|earn(ed|ing|s)?|
               passive\s+income|side\s+hustle|million(aire)?|rich|wealth)\b",
        )
        .unwrap()
    })
}

fn time_savings_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)
            \b(in\s+\d+\s+(minutes?|hours?|days?)|
               faster|automat(e|ed|ion)|shortcut|time[-\s]sav(er|ing)|
               productivity|hack(s)?)\b",
        )
        .unwrap()
    })
}

fn insider_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)
            \b(secret(s)?|insider|nobody\s+(talks|tells)|hidden|
               behind\s+the\s+scenes|leak(ed)?|exposed)\b",
        )
        .unwrap()
    })
}

fn controversy_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)
            \b(unpopular\s+opinion|controvers(y|ial)|scam|overrated|
               dead|wrong|stop\s+doing|myth(s)?|lie(s|d)?)\b",
        )
        .unwrap()
    })
}

/// Sum of matched additive signal weights for a title.
pub fn signal_weight_sum(title: &str) -> f64 {
    let t = title.to_ascii_lowercase();
    let mut sum = 0.0;
    if money_re().is_match(&t) {
        sum += MONEY_WEIGHT;
    }
    if time_savings_re().is_match(&t) {
        sum += TIME_SAVINGS_WEIGHT;
    }
    if insider_re().is_match(&t) {
        sum += INSIDER_WEIGHT;
    }
    if controversy_re().is_match(&t) {
        sum += CONTROVERSY_WEIGHT;
    }
    sum
}

/// Normalize a title: decode HTML entities, strip tags, collapse whitespace,
/// normalize typographic quotes, cap length.
pub fn normalize_title(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap: 500 chars is plenty for any title.
    if out.chars().count() > 500 {
        out = out.chars().take(500).collect();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_terms_match() {
        assert_eq!(signal_weight_sum("How I made $10k in passive income"), MONEY_WEIGHT);
        assert_eq!(signal_weight_sum("My revenue doubled"), MONEY_WEIGHT);
    }

    #[test]
    fn signals_stack_additively() {
        let w = signal_weight_sum("The secret money hack nobody talks about");
        let expected = MONEY_WEIGHT + TIME_SAVINGS_WEIGHT + INSIDER_WEIGHT;
        assert!((w - expected).abs() < 1e-9);
    }

    #[test]
    fn neutral_title_matches_nothing() {
        assert_eq!(signal_weight_sum("Weekly garden photos thread"), 0.0);
    }

    #[test]
    fn controversy_matches() {
        assert_eq!(signal_weight_sum("Unpopular opinion: kale is fine"), CONTROVERSY_WEIGHT);
    }

    #[test]
    fn normalize_strips_tags_and_entities() {
        let s = "  <b>Hello&nbsp;world</b> &ldquo;ok&rdquo;  ";
        assert_eq!(normalize_title(s), r#"Hello world "ok""#);
    }
}
