use std::collections::HashSet;

use mintty::SlotItem;
use mintty::format::ITEM_ID;

/// A comment with the replies that target it.
#[derive(Debug)]
pub struct Thread<'a, X> {
    pub comment: &'a SlotItem<X>,
    pub replies: Vec<Thread<'a, X>>,
}

pub fn target_of<X>(comment: &SlotItem<X>) -> Option<&str> {
    comment.standoff.text("targetId", &ITEM_ID)
}

/// Comments aimed at `target`, each with its replies nested below it.
/// Slot order is kept at every level, and no comment appears twice, so
/// reply cycles terminate.
pub fn threads_for<'a, X>(target: &str, comments: &'a [SlotItem<X>]) -> Vec<Thread<'a, X>> {
    let mut visited = HashSet::new();
    collect(target, comments, &mut visited)
}

fn collect<'a, X>(
    target: &str,
    comments: &'a [SlotItem<X>],
    visited: &mut HashSet<&'a str>,
) -> Vec<Thread<'a, X>> {
    let mut threads = Vec::new();
    for comment in comments {
        if target_of(comment) != Some(target) || !visited.insert(comment.id.as_str()) {
            continue;
        }
        let replies = collect(&comment.id, comments, visited);
        threads.push(Thread { comment, replies });
    }
    threads
}
