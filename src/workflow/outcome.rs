//! 处理输出的分类
//!
//! 输出文本拆成"状态词"（第一个单词）和"详情"（其余单词用单个空格重新拼接）。

use serde::{Deserialize, Serialize};

/// 单张图纸处理结果的类别，决定界面上的颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeClass {
    Success,
    Error,
}

impl OutcomeClass {
    /// 对应的行背景色
    pub fn color(self) -> &'static str {
        match self {
            OutcomeClass::Success => "LightGreen",
            OutcomeClass::Error => "LightCoral",
        }
    }

    /// 执行记录中使用的标签
    pub fn label(self) -> &'static str {
        match self {
            OutcomeClass::Success => "SUCCESS",
            OutcomeClass::Error => "ERROR",
        }
    }
}

/// 把输出拆成 (状态词, 详情)
///
/// 先去掉首尾空白，再按空格切分并丢弃空词；原有的多个空格不保留。
pub fn classify(output: &str) -> (String, String) {
    let mut words = output.trim().split(' ').filter(|word| !word.is_empty());

    match words.next() {
        Some(first) => (first.to_string(), words.collect::<Vec<_>>().join(" ")),
        None => (String::new(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_first_word_from_rest() {
        assert_eq!(classify("OK done now"), ("OK".to_string(), "done now".to_string()));
    }

    #[test]
    fn single_word_has_empty_detail() {
        assert_eq!(classify("OK"), ("OK".to_string(), String::new()));
    }

    #[test]
    fn empty_output_is_empty_pair() {
        assert_eq!(classify(""), (String::new(), String::new()));
        assert_eq!(classify("   "), (String::new(), String::new()));
    }

    #[test]
    fn internal_spaces_collapse() {
        assert_eq!(
            classify("  12   blocks    renamed "),
            ("12".to_string(), "blocks renamed".to_string())
        );
    }

    #[test]
    fn class_colors() {
        assert_eq!(OutcomeClass::Success.color(), "LightGreen");
        assert_eq!(OutcomeClass::Error.label(), "ERROR");
    }
}
