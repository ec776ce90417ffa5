//! Token 估算
//!
//! 仅用于压缩阈值等比较，不追求与具体分词器一致：要求确定、且随内容增长单调不减。

/// Token 估算器（简单的字符计数近似）
pub struct TokenEstimator;

impl TokenEstimator {
    /// 估算文本的 token 数量
    /// 使用简单的启发式规则：英文约 4 字符/token，中文约 1.5 字符/token
    pub fn estimate(text: &str) -> usize {
        let mut ascii_chars = 0;
        let mut non_ascii_chars = 0;

        for c in text.chars() {
            if c.is_ascii() {
                ascii_chars += 1;
            } else {
                non_ascii_chars += 1;
            }
        }

        let tokens = ascii_chars / 4 + (non_ascii_chars as f64 / 1.5).ceil() as usize;
        tokens.max(1)
    }

    /// 多段文本的估算总和
    pub fn estimate_all<'a>(texts: impl IntoIterator<Item = &'a str>) -> usize {
        texts.into_iter().map(Self::estimate).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_estimator_english() {
        let text = "Hello, world! This is a test.";
        let tokens = TokenEstimator::estimate(text);
        assert!(tokens > 0);
        assert!(tokens < text.len());
    }

    #[test]
    fn test_token_estimator_chinese() {
        let text = "你好世界，这是一个测试。";
        assert_eq!(TokenEstimator::estimate(text), 8);
    }

    #[test]
    fn test_estimate_all_is_monotonic() {
        let one = TokenEstimator::estimate_all(["abc"]);
        let two = TokenEstimator::estimate_all(["abc", "defgh"]);
        assert!(two > one);
        assert_eq!(TokenEstimator::estimate_all(std::iter::empty()), 0);
    }
}
