//! Theme labels derived from quote text
//!
//! Rules are evaluated in declaration order and the first match wins, so the
//! order of [`PRIMARY_RULES`] is part of the output contract. When no primary
//! rule matches, the broader [`FALLBACK_RULES`] run; when those miss too the
//! catch-all [`Theme::Insight`] is returned.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    TimeAndPace,
    Imperfection,
    Growth,
    SelfAcceptance,
    Emotion,
    Relationships,
    Mindfulness,
    Resilience,
    Insight,
}

impl Theme {
    pub const ALL: [Theme; 9] = [
        Theme::TimeAndPace,
        Theme::Imperfection,
        Theme::Growth,
        Theme::SelfAcceptance,
        Theme::Emotion,
        Theme::Relationships,
        Theme::Mindfulness,
        Theme::Resilience,
        Theme::Insight,
    ];

    /// Text painted under the theme icon
    pub fn label(self) -> &'static str {
        match self {
            Theme::TimeAndPace => "时间与节奏",
            Theme::Imperfection => "接纳不完美",
            Theme::Growth => "成长与突破",
            Theme::SelfAcceptance => "自我接纳",
            Theme::Emotion => "情绪觉察",
            Theme::Relationships => "关系与边界",
            Theme::Mindfulness => "当下与觉知",
            Theme::Resilience => "韧性与力量",
            Theme::Insight => "心理洞察",
        }
    }

    /// File stem of the theme's icon in the icon directory
    pub fn slug(self) -> &'static str {
        match self {
            Theme::TimeAndPace => "time",
            Theme::Imperfection => "imperfection",
            Theme::Growth => "growth",
            Theme::SelfAcceptance => "self",
            Theme::Emotion => "emotion",
            Theme::Relationships => "relationships",
            Theme::Mindfulness => "mindfulness",
            Theme::Resilience => "resilience",
            Theme::Insight => "insight",
        }
    }
}

#[derive(Clone, Copy)]
pub enum Predicate {
    /// Matches when the text contains any of the keywords
    AnyOf(&'static [&'static str]),
    Custom(fn(&str) -> bool),
}

impl Predicate {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Predicate::AnyOf(keywords) => keywords.iter().any(|k| text.contains(k)),
            Predicate::Custom(f) => f(text),
        }
    }
}

#[derive(Clone, Copy)]
pub struct ThemeRule {
    pub theme: Theme,
    pub predicate: Predicate,
}

const fn any_of(theme: Theme, keywords: &'static [&'static str]) -> ThemeRule {
    ThemeRule {
        theme,
        predicate: Predicate::AnyOf(keywords),
    }
}

pub static PRIMARY_RULES: &[ThemeRule] = &[
    any_of(
        Theme::TimeAndPace,
        &["时区", "节奏", "时间", "等待", "步调", "来得及", "早晚", "慢慢"],
    ),
    any_of(
        Theme::Imperfection,
        &["完美", "缺点", "失败", "犯错", "错误", "不足", "瑕疵"],
    ),
    any_of(
        Theme::Growth,
        &["成长", "舒适圈", "改变", "进步", "突破", "学习", "坚持"],
    ),
    any_of(
        Theme::SelfAcceptance,
        &["脆弱", "接受自己", "接纳", "做自己", "自我", "真实的你"],
    ),
    any_of(
        Theme::Emotion,
        &["情绪", "焦虑", "愤怒", "悲伤", "难过", "压力", "抑郁", "孤独", "快乐"],
    ),
    any_of(
        Theme::Relationships,
        &["关系", "朋友", "边界", "家人", "伴侣", "拒绝", "讨好", "爱"],
    ),
    any_of(
        Theme::Mindfulness,
        &["当下", "此刻", "觉察", "呼吸", "正念", "专注"],
    ),
    any_of(
        Theme::Resilience,
        &["力量", "勇气", "坚强", "韧性", "挫折", "困难"],
    ),
];

pub static FALLBACK_RULES: &[ThemeRule] = &[
    ThemeRule {
        theme: Theme::TimeAndPace,
        predicate: Predicate::Custom(mentions_duration),
    },
    any_of(Theme::SelfAcceptance, &["自己", "内心", "我"]),
    any_of(Theme::Relationships, &["别人", "他人", "他们", "人"]),
    any_of(Theme::Emotion, &["心", "感受", "感觉"]),
];

/// A number (Arabic or Han numeral) directly followed by an age or time unit.
fn mentions_duration(text: &str) -> bool {
    const NUMERALS: &str = "一二两三四五六七八九十百千";
    const UNITS: &str = "岁年天月周";
    let chars: Vec<char> = text.chars().collect();
    chars
        .windows(2)
        .any(|w| (w[0].is_ascii_digit() || NUMERALS.contains(w[0])) && UNITS.contains(w[1]))
}

/// Map quote text to exactly one theme.
pub fn extract_theme(text: &str) -> Theme {
    PRIMARY_RULES
        .iter()
        .chain(FALLBACK_RULES.iter())
        .find(|rule| rule.predicate.matches(text))
        .map(|rule| rule.theme)
        .unwrap_or(Theme::Insight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_zone_maps_to_time_and_pace() {
        assert_eq!(
            extract_theme("每个人都有自己的时区，不要被别人的节奏打乱"),
            Theme::TimeAndPace
        );
    }

    #[test]
    fn first_matching_rule_wins() {
        // matches both Imperfection ("完美") and Growth ("进步")
        assert_eq!(extract_theme("完美主义是进步的敌人"), Theme::Imperfection);
        assert_eq!(extract_theme("真正的成长发生在舒适圈之外"), Theme::Growth);
    }

    #[test]
    fn fallback_rules_run_after_primary() {
        assert_eq!(extract_theme("三十岁也可以重新开始"), Theme::TimeAndPace);
        assert_eq!(extract_theme("倾听内心的声音"), Theme::SelfAcceptance);
        assert_eq!(extract_theme("善待身边的人"), Theme::Relationships);
    }

    #[test]
    fn unmatched_text_gets_catch_all() {
        assert_eq!(extract_theme(""), Theme::Insight);
        assert_eq!(extract_theme("hello world"), Theme::Insight);
        assert_eq!(extract_theme("山高水长"), Theme::Insight);
    }

    #[test]
    fn every_theme_has_label_and_slug() {
        for theme in Theme::ALL {
            assert!(!theme.label().is_empty());
            assert!(!theme.slug().is_empty());
        }
    }
}
