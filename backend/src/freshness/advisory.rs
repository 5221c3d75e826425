use lazy_static::lazy_static;
use std::collections::HashMap;

/// Scores strictly below this get the low-confidence caveat.
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.7;

pub const FALLBACK_ADVICE: &str = "Use your own judgment to decide whether the food is safe to eat.";
pub const LOW_CONFIDENCE_CAVEAT: &str =
    " (Note: detection confidence is low, please check the food again manually.)";

const LOW_CONFIDENCE_CAVEAT_ZH: &str = " （注意：检测置信度较低，建议人工再次确认）";

struct Advisory {
    text: &'static str,
    caveat: &'static str,
}

lazy_static! {
    static ref ADVICE_TABLE: HashMap<&'static str, Advisory> = {
        let en = |text| Advisory { text, caveat: LOW_CONFIDENCE_CAVEAT };
        let zh = |text| Advisory { text, caveat: LOW_CONFIDENCE_CAVEAT_ZH };
        HashMap::from([
            ("fresh", en("The food is in good condition and safe to eat. Eat it soon for the best taste.")),
            ("average", en("The food is in fair condition, eat it soon. Check for off smells or discoloration.")),
            ("spoiled", en("The food has spoiled. Do not eat it and dispose of it properly.")),
            ("slightly_spoiled", en("The food may be starting to spoil. Inspect it carefully before deciding to eat it.")),
            ("severely_spoiled", en("The food is badly spoiled. Throw it away immediately and do not eat it.")),
            ("新鲜", zh("食品状态良好，可以放心食用。建议尽快食用以保持最佳口感。")),
            ("一般", zh("食品状态一般，建议尽快食用。注意检查是否有异味或变色。")),
            ("变质", zh("食品已变质，不建议食用，请妥善处理。")),
            ("轻微变质", zh("食品可能开始变质，建议仔细检查后决定是否食用。")),
            ("严重变质", zh("食品严重变质，请立即丢弃，避免食用。")),
        ])
    };
}

pub fn advise(label: &str, score: f32) -> String {
    let (text, caveat) = match ADVICE_TABLE.get(label) {
        Some(advisory) => (advisory.text, advisory.caveat),
        None => (FALLBACK_ADVICE, LOW_CONFIDENCE_CAVEAT),
    };

    let mut advice = text.to_string();
    if score < LOW_CONFIDENCE_THRESHOLD {
        advice.push_str(caveat);
    }
    advice
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_confidence_adds_caveat() {
        assert!(advise("fresh", 0.5).contains(LOW_CONFIDENCE_CAVEAT));
        assert!(!advise("fresh", 0.95).contains(LOW_CONFIDENCE_CAVEAT));
    }

    #[test]
    fn threshold_itself_is_confident() {
        assert!(!advise("average", 0.7).contains(LOW_CONFIDENCE_CAVEAT));
        assert!(advise("average", 0.699).contains(LOW_CONFIDENCE_CAVEAT));
    }

    #[test]
    fn unknown_label_falls_back() {
        assert_eq!(advise("unknown_label", 0.9), FALLBACK_ADVICE);
    }

    #[test]
    fn chinese_labels_keep_their_caveat() {
        let advice = advise("变质", 0.4);
        assert!(advice.starts_with("食品已变质"));
        assert!(advice.ends_with(LOW_CONFIDENCE_CAVEAT_ZH));
    }
}
