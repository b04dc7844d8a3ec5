//! Bounded memo of successful chat replies.

use std::collections::{HashMap, VecDeque};

pub type MemoKey = (String, String, u32);

/// Holds at most `capacity` replies; the oldest insertion is evicted first.
/// A capacity of zero disables memoisation.
#[derive(Debug)]
pub struct ResponseMemo {
    capacity: usize,
    entries: HashMap<MemoKey, String>,
    order: VecDeque<MemoKey>,
}

impl ResponseMemo {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &MemoKey) -> Option<&String> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: MemoKey, reply: String) {
        if self.capacity == 0 {
            return;
        }
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = reply;
            return;
        }

        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, reply);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(prompt: &str) -> MemoKey {
        ("sys".to_string(), prompt.to_string(), 10)
    }

    #[test]
    fn test_oldest_entry_is_evicted_at_capacity() {
        let mut memo = ResponseMemo::new(2);
        memo.insert(key("a"), "1".into());
        memo.insert(key("b"), "2".into());
        memo.insert(key("c"), "3".into());

        assert_eq!(memo.len(), 2);
        assert!(memo.get(&key("a")).is_none());
        assert_eq!(memo.get(&key("c")).map(String::as_str), Some("3"));
    }

    #[test]
    fn test_many_large_prompts_stay_within_budget() {
        let mut memo = ResponseMemo::new(64);
        let resume = "x".repeat(6_000);
        for i in 0..500 {
            memo.insert(key(&format!("{resume}{i}")), "reply".into());
        }
        assert_eq!(memo.len(), 64);
        assert_eq!(memo.order.len(), 64);
    }

    #[test]
    fn test_reinsert_does_not_grow() {
        let mut memo = ResponseMemo::new(2);
        memo.insert(key("a"), "1".into());
        memo.insert(key("a"), "2".into());
        assert_eq!(memo.len(), 1);
        assert_eq!(memo.get(&key("a")).map(String::as_str), Some("2"));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut memo = ResponseMemo::new(0);
        memo.insert(key("a"), "1".into());
        assert_eq!(memo.len(), 0);
    }
}
