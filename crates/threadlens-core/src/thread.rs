//! Reply-graph reconstruction and subthread extraction.
//!
//! Discourse exports are a flat list of posts where each reply optionally
//! names the post number it answers. This module groups posts into
//! topics, builds the parent → children adjacency for each topic, and
//! walks it depth-first to recover conversational units (subthreads).
//!
//! # Algorithm
//!
//! 1. Group posts by `topic_id` in first-appearance order.
//! 2. Sort each topic's posts by `post_number` (stable), so sibling order
//!    in the graph is chronological.
//! 3. Build the [`ReplyGraph`]: children keyed by declared parent, with
//!    `None` as the "no parent" sentinel, plus a post-number lookup.
//! 4. For every root (no parent), collect its subthread with an explicit
//!    stack in depth-first pre-order.
//! 5. Replies whose declared parent is absent from the topic are promoted
//!    to roots of their own subthreads after the true roots.
//!
//! Traversal shares one visited set per topic, so no post is emitted
//! twice even when the input contains cycles. Posts trapped in a cycle
//! with no root are reported as unreachable. A repeated post number keeps
//! its first occurrence; later copies are reported as duplicates.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::models::Post;

/// All posts belonging to one topic, sorted by post number.
#[derive(Debug, Clone)]
pub struct Topic {
    pub topic_id: u64,
    pub title: String,
    pub posts: Vec<Post>,
}

/// Group posts by topic, preserving the order in which topics first
/// appear and sorting posts inside each topic by `post_number`.
///
/// The topic title is taken from the first post that carries a
/// non-empty one.
pub fn group_topics(posts: Vec<Post>) -> Vec<Topic> {
    let mut order: HashMap<u64, usize> = HashMap::new();
    let mut topics: Vec<Topic> = Vec::new();

    for post in posts {
        let idx = *order.entry(post.topic_id).or_insert_with(|| {
            topics.push(Topic {
                topic_id: post.topic_id,
                title: String::new(),
                posts: Vec::new(),
            });
            topics.len() - 1
        });
        let topic = &mut topics[idx];
        if topic.title.is_empty() && !post.topic_title.is_empty() {
            topic.title = post.topic_title.clone();
        }
        topic.posts.push(post);
    }

    for topic in &mut topics {
        topic.posts.sort_by_key(|p| p.post_number);
    }

    topics
}

/// Parent → children adjacency for the posts of a single topic.
#[derive(Debug)]
pub struct ReplyGraph<'a> {
    posts: &'a [Post],
    children: HashMap<Option<u64>, Vec<&'a Post>>,
    by_number: HashMap<u64, &'a Post>,
    duplicates: Vec<u64>,
}

impl<'a> ReplyGraph<'a> {
    /// Build the graph in one pass over `posts`.
    ///
    /// `posts` should already be sorted by post number; children are
    /// stored in the order they are encountered. When a post number is
    /// duplicated, the graph keeps the first occurrence and records the
    /// number in [`ReplyGraph::duplicates`].
    pub fn build(posts: &'a [Post]) -> Self {
        let mut children: HashMap<Option<u64>, Vec<&'a Post>> = HashMap::new();
        let mut by_number: HashMap<u64, &'a Post> = HashMap::with_capacity(posts.len());
        let mut duplicates = Vec::new();

        for post in posts {
            match by_number.entry(post.post_number) {
                Entry::Vacant(slot) => {
                    slot.insert(post);
                }
                Entry::Occupied(_) => {
                    duplicates.push(post.post_number);
                    continue;
                }
            }
            children
                .entry(post.reply_to_post_number)
                .or_default()
                .push(post);
        }

        Self {
            posts,
            children,
            by_number,
            duplicates,
        }
    }

    /// Children of `parent` in chronological order. `None` yields the roots.
    pub fn children(&self, parent: Option<u64>) -> &[&'a Post] {
        self.children
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn post(&self, post_number: u64) -> Option<&'a Post> {
        self.by_number.get(&post_number).copied()
    }

    /// Posts with no declared parent.
    pub fn roots(&self) -> &[&'a Post] {
        self.children(None)
    }

    /// Replies whose declared parent does not exist in this topic.
    pub fn orphans(&self) -> Vec<&'a Post> {
        self.by_number_order()
            .filter(|p| match p.reply_to_post_number {
                Some(parent) => !self.by_number.contains_key(&parent),
                None => false,
            })
            .collect()
    }

    /// Post numbers that appeared more than once; only the first copy is
    /// part of the graph.
    pub fn duplicates(&self) -> &[u64] {
        &self.duplicates
    }

    /// Posts in input order, skipping later copies of a repeated number.
    fn by_number_order(&self) -> impl Iterator<Item = &'a Post> + '_ {
        self.posts.iter().filter(move |p| {
            self.by_number
                .get(&p.post_number)
                .is_some_and(|first| std::ptr::eq(*first, *p))
        })
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Collect the subthread rooted at `root_post_number`.
///
/// Returns posts root first in depth-first pre-order, visiting children in
/// the order stored in the graph. Returns an empty list if the root does
/// not exist. Terminates on cyclic input.
pub fn extract_subthread<'a>(root_post_number: u64, graph: &ReplyGraph<'a>) -> Vec<&'a Post> {
    let mut visited = HashSet::new();
    walk(root_post_number, graph, &mut visited)
}

fn walk<'a>(root: u64, graph: &ReplyGraph<'a>, visited: &mut HashSet<u64>) -> Vec<&'a Post> {
    let mut collected = Vec::new();
    let Some(root_post) = graph.post(root) else {
        return collected;
    };

    let mut stack: Vec<&'a Post> = vec![root_post];
    while let Some(post) = stack.pop() {
        if !visited.insert(post.post_number) {
            continue;
        }
        collected.push(post);
        // Reverse so the earliest child is popped first.
        for child in graph.children(Some(post.post_number)).iter().rev() {
            if !visited.contains(&child.post_number) {
                stack.push(*child);
            }
        }
    }

    collected
}

/// Every subthread of a topic plus the anomalies found while walking it.
#[derive(Debug, Default)]
pub struct TopicSubthreads<'a> {
    /// Subthreads in root order: declared roots first, then promoted orphans.
    pub subthreads: Vec<Vec<&'a Post>>,
    /// Post numbers of replies promoted to roots because their parent is missing.
    pub promoted_orphans: Vec<u64>,
    /// Post numbers not reachable from any root (reply cycles).
    pub unreachable: Vec<u64>,
    /// Post numbers repeated in the input; later copies were dropped.
    pub duplicates: Vec<u64>,
}

/// Partition a topic's posts into subthreads.
///
/// For a well-formed forest every post lands in exactly one subthread.
pub fn topic_subthreads<'a>(graph: &ReplyGraph<'a>) -> TopicSubthreads<'a> {
    let mut visited: HashSet<u64> = HashSet::with_capacity(graph.len());
    let mut out = TopicSubthreads::default();

    for root in graph.roots() {
        let sub = walk(root.post_number, graph, &mut visited);
        if !sub.is_empty() {
            out.subthreads.push(sub);
        }
    }

    for orphan in graph.orphans() {
        if visited.contains(&orphan.post_number) {
            continue;
        }
        let sub = walk(orphan.post_number, graph, &mut visited);
        if !sub.is_empty() {
            out.promoted_orphans.push(orphan.post_number);
            out.subthreads.push(sub);
        }
    }

    out.unreachable = graph
        .by_number_order()
        .map(|p| p.post_number)
        .filter(|n| !visited.contains(n))
        .collect();
    out.duplicates = graph.duplicates().to_vec();

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(topic: u64, number: u64, parent: Option<u64>) -> Post {
        Post {
            topic_id: topic,
            topic_title: format!("Topic {}", topic),
            post_number: number,
            content: format!("post {}", number),
            reply_to_post_number: parent,
            url: None,
        }
    }

    fn numbers(posts: &[&Post]) -> Vec<u64> {
        posts.iter().map(|p| p.post_number).collect()
    }

    #[test]
    fn test_root_and_single_reply() {
        let posts = vec![post(1, 1, None), post(1, 2, Some(1))];
        let graph = ReplyGraph::build(&posts);
        let all = topic_subthreads(&graph);
        assert_eq!(all.subthreads.len(), 1);
        assert_eq!(numbers(&all.subthreads[0]), vec![1, 2]);
        assert_eq!(numbers(&extract_subthread(1, &graph)), vec![1, 2]);
    }

    #[test]
    fn test_depth_first_preorder() {
        // 1
        // ├── 2
        // │   └── 4
        // └── 3
        //     └── 5
        let posts = vec![
            post(1, 1, None),
            post(1, 2, Some(1)),
            post(1, 3, Some(1)),
            post(1, 4, Some(2)),
            post(1, 5, Some(3)),
        ];
        let graph = ReplyGraph::build(&posts);
        assert_eq!(numbers(&extract_subthread(1, &graph)), vec![1, 2, 4, 3, 5]);
    }

    #[test]
    fn test_forest_partitions_posts() {
        let posts = vec![
            post(7, 1, None),
            post(7, 2, None),
            post(7, 3, Some(1)),
            post(7, 4, Some(2)),
            post(7, 5, Some(3)),
            post(7, 6, None),
            post(7, 7, Some(4)),
            post(7, 8, Some(1)),
        ];
        let graph = ReplyGraph::build(&posts);
        let all = topic_subthreads(&graph);

        let mut seen: Vec<u64> = all
            .subthreads
            .iter()
            .flat_map(|s| s.iter().map(|p| p.post_number))
            .collect();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(all.subthreads.len(), 3);
        assert!(all.promoted_orphans.is_empty());
        assert!(all.unreachable.is_empty());
    }

    #[test]
    fn test_arrival_order_does_not_matter_after_sort() {
        let ordered = vec![
            post(3, 1, None),
            post(3, 2, Some(1)),
            post(3, 3, Some(1)),
            post(3, 4, Some(2)),
        ];
        let mut shuffled = vec![
            ordered[3].clone(),
            ordered[1].clone(),
            ordered[0].clone(),
            ordered[2].clone(),
        ];
        shuffled.reverse();

        let a = group_topics(ordered);
        let b = group_topics(shuffled);
        let ga = ReplyGraph::build(&a[0].posts);
        let gb = ReplyGraph::build(&b[0].posts);
        let sa: Vec<Vec<u64>> = topic_subthreads(&ga)
            .subthreads
            .iter()
            .map(|s| numbers(s))
            .collect();
        let sb: Vec<Vec<u64>> = topic_subthreads(&gb)
            .subthreads
            .iter()
            .map(|s| numbers(s))
            .collect();
        assert_eq!(sa, sb);
        assert_eq!(sa, vec![vec![1, 2, 4, 3]]);
    }

    #[test]
    fn test_group_topics_first_appearance_order() {
        let posts = vec![
            post(9, 2, Some(1)),
            post(4, 1, None),
            post(9, 1, None),
        ];
        let topics = group_topics(posts);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].topic_id, 9);
        assert_eq!(topics[1].topic_id, 4);
        assert_eq!(
            topics[0].posts.iter().map(|p| p.post_number).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(topics[0].title, "Topic 9");
    }

    #[test]
    fn test_orphan_promoted_to_root() {
        let posts = vec![
            post(1, 1, None),
            post(1, 3, Some(2)), // parent 2 was deleted
            post(1, 4, Some(3)),
        ];
        let graph = ReplyGraph::build(&posts);
        assert_eq!(numbers(&graph.orphans()), vec![3]);

        let all = topic_subthreads(&graph);
        assert_eq!(all.subthreads.len(), 2);
        assert_eq!(numbers(&all.subthreads[1]), vec![3, 4]);
        assert_eq!(all.promoted_orphans, vec![3]);
    }

    #[test]
    fn test_cycle_terminates_and_is_reported() {
        let posts = vec![post(1, 1, None), post(1, 2, Some(3)), post(1, 3, Some(2))];
        let graph = ReplyGraph::build(&posts);
        let all = topic_subthreads(&graph);
        assert_eq!(all.subthreads.len(), 1);
        assert_eq!(numbers(&all.subthreads[0]), vec![1]);
        assert_eq!(all.unreachable, vec![2, 3]);

        // Walking from inside the cycle visits each post once.
        assert_eq!(numbers(&extract_subthread(2, &graph)), vec![2, 3]);
    }

    #[test]
    fn test_self_reply_terminates() {
        let posts = vec![post(1, 1, Some(1))];
        let graph = ReplyGraph::build(&posts);
        assert_eq!(numbers(&extract_subthread(1, &graph)), vec![1]);
        assert_eq!(topic_subthreads(&graph).unreachable, vec![1]);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let depth = 200_000u64;
        let posts: Vec<Post> = (1..=depth)
            .map(|n| post(1, n, if n == 1 { None } else { Some(n - 1) }))
            .collect();
        let graph = ReplyGraph::build(&posts);
        let sub = extract_subthread(1, &graph);
        assert_eq!(sub.len() as u64, depth);
        assert_eq!(sub.last().map(|p| p.post_number), Some(depth));
    }

    #[test]
    fn test_missing_root_yields_empty() {
        let posts = vec![post(1, 1, None)];
        let graph = ReplyGraph::build(&posts);
        assert!(extract_subthread(42, &graph).is_empty());
    }

    #[test]
    fn test_duplicate_post_numbers_reported() {
        let mut copy = post(1, 2, Some(1));
        copy.content = "edited copy".to_string();
        let posts = vec![post(1, 1, None), post(1, 2, Some(1)), copy];
        let graph = ReplyGraph::build(&posts);
        assert_eq!(graph.duplicates(), &[2]);

        let all = topic_subthreads(&graph);
        assert_eq!(all.subthreads.len(), 1);
        assert_eq!(numbers(&all.subthreads[0]), vec![1, 2]);
        assert_eq!(all.subthreads[0][1].content, "post 2");
        assert_eq!(all.duplicates, vec![2]);
        assert!(all.unreachable.is_empty());
    }

    #[test]
    fn test_duplicate_orphan_not_promoted_twice() {
        let posts = vec![post(1, 1, None), post(1, 5, Some(4)), post(1, 5, Some(4))];
        let graph = ReplyGraph::build(&posts);
        assert_eq!(numbers(&graph.orphans()), vec![5]);
        let all = topic_subthreads(&graph);
        assert_eq!(all.promoted_orphans, vec![5]);
        assert_eq!(all.duplicates, vec![5]);
    }
}
