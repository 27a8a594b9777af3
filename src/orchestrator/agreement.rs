//! 一致性评分：显著词集合的两两 Jaccard 相似度均值
//!
//! 分词：按非字母数字字符切分并转小写，长度 <= 3 的词视为噪声丢弃。

use std::collections::HashSet;

/// 显著词最小长度（字符数）
const MIN_SIGNIFICANT_LEN: usize = 4;

pub fn significant_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_SIGNIFICANT_LEN)
        .map(str::to_lowercase)
        .collect()
}

/// 两个集合均为空时视为相同，返回 1.0
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// 只对成功输出计算；不足两份时无从比较，记为 1.0
pub fn agreement_score<S: AsRef<str>>(texts: &[S]) -> f64 {
    if texts.len() < 2 {
        return 1.0;
    }
    let sets: Vec<HashSet<String>> = texts.iter().map(|t| significant_words(t.as_ref())).collect();

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            total += jaccard(&sets[i], &sets[j]);
            pairs += 1;
        }
    }
    total / pairs as f64
}
