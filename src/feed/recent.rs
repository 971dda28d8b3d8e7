//! Bounded recent-items list

/// Default length of a recent-items list (e.g. the transaction ticker)
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// New list with `item` at the head and at most `max_len` entries
///
/// The input list is left untouched; the oldest entries fall off the end.
pub fn prepend_bounded<T: Clone>(list: &[T], item: T, max_len: usize) -> Vec<T> {
    if max_len == 0 {
        return Vec::new();
    }

    let mut next = Vec::with_capacity(max_len.min(list.len() + 1));
    next.push(item);
    next.extend(list.iter().take(max_len - 1).cloned());
    next
}
