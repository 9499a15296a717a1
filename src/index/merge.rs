//! 合并多个按 `expires_at` 降序排列的桶列表

use crate::models::Message;

/// 合并两个降序列表，相同过期时间时左侧优先
pub fn merge_two(left: Vec<Message>, right: Vec<Message>) -> Vec<Message> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => l.expires_at >= r.expires_at,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_left { left.next() } else { right.next() };
        merged.extend(next);
    }

    merged
}

/// 分治合并任意数量的降序列表
pub fn merge_all(mut lists: Vec<Vec<Message>>) -> Vec<Message> {
    match lists.len() {
        0 => Vec::new(),
        1 => lists.pop().unwrap_or_default(),
        n => {
            let right = lists.split_off(n / 2);
            merge_two(merge_all(lists), merge_all(right))
        }
    }
}

pub fn is_sorted_desc(list: &[Message]) -> bool {
    list.is_sorted_by(|a, b| a.expires_at >= b.expires_at)
}
