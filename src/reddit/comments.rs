//! Comment extraction with account-age filtering
//!
//! A post's comment tree is fetched, every `more` placeholder is expanded,
//! and the result is flattened depth-first. Each author's account creation
//! time comes from the [`AuthorCache`] or, on a miss, from a user lookup
//! followed by a short pause. Comments by accounts younger than the
//! configured threshold are dropped; unknown ages are kept.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::cache::{AuthorCache, CachedAge};
use crate::models::{account_age_days, Comment, Post};
use crate::reddit::listing::{MoreChildren, Thing};
use crate::reddit::{RedditClient, MORE_CHILDREN_BATCH};
use crate::utils::error::RedditError;
use crate::utils::{decode_entities, extract_links, flatten_lines};

/// Maximum rounds of `more` expansion per post (safety limit)
pub const MAX_EXPANSION_ROUNDS: usize = 32;

/// Statistics about one extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentStats {
    /// Comments in the expanded tree
    pub total: usize,

    /// Comments kept after filtering
    pub kept: usize,

    /// Comments dropped for account age
    pub too_young: usize,

    /// Network lookups of account creation times
    pub author_lookups: usize,

    /// `more` expansion requests issued
    pub expansions: usize,
}

/// Comment as found in the tree, before author resolution
#[derive(Debug, Clone)]
struct Node {
    id: String,
    parent_id: String,
    author: String,
    body: String,
}

/// Accumulates comments and unresolved placeholders in discovery order
#[derive(Debug, Default)]
struct TreeCollector {
    nodes: Vec<Node>,
    seen: HashSet<String>,
    pending: Vec<MoreChildren>,
}

impl TreeCollector {
    fn collect(&mut self, things: Vec<Thing>) {
        for thing in things {
            match thing {
                Thing::Comment(raw) => {
                    if self.seen.insert(raw.id.clone()) {
                        self.nodes.push(Node {
                            id: raw.id,
                            parent_id: raw.parent_id,
                            author: raw.author,
                            body: raw.body,
                        });
                    }
                    // A continue-thread response repeats the known root; its replies are new
                    self.collect(raw.replies);
                }
                Thing::More(more) => self.pending.push(more),
            }
        }
    }
}

/// Order nodes parent-before-children with their depth
///
/// Replies keep discovery order under their parent. Comments whose parent is
/// the post, or is not in the tree, are top level.
fn flatten_depth_first(nodes: &[Node]) -> Vec<(usize, &Node)> {
    let known: HashSet<String> = nodes.iter().map(|n| format!("t1_{}", n.id)).collect();

    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (idx, node) in nodes.iter().enumerate() {
        if known.contains(&node.parent_id) {
            children.entry(node.parent_id.as_str()).or_default().push(idx);
        } else {
            roots.push(idx);
        }
    }

    fn visit<'n>(
        idx: usize,
        depth: usize,
        nodes: &'n [Node],
        children: &HashMap<&str, Vec<usize>>,
        out: &mut Vec<(usize, &'n Node)>,
    ) {
        let node = &nodes[idx];
        out.push((depth, node));

        let fullname = format!("t1_{}", node.id);
        if let Some(kids) = children.get(fullname.as_str()) {
            for &kid in kids {
                visit(kid, depth + 1, nodes, children, out);
            }
        }
    }

    let mut out = Vec::with_capacity(nodes.len());
    for idx in roots {
        visit(idx, 0, nodes, &children, &mut out);
    }
    out
}

/// Authors that cannot be looked up
fn is_deleted_author(author: &str) -> bool {
    author.is_empty() || author == "[deleted]" || author == "[removed]"
}

/// Comment extraction for posts of a single run
pub struct CommentExtractor<'a> {
    client: &'a RedditClient,
    cache: &'a mut AuthorCache,
    age_threshold_days: i64,
    lookup_delay: Duration,
    now: DateTime<Utc>,
    stats: CommentStats,
}

impl<'a> CommentExtractor<'a> {
    pub fn new(
        client: &'a RedditClient,
        cache: &'a mut AuthorCache,
        age_threshold_days: i64,
        lookup_delay: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            client,
            cache,
            age_threshold_days,
            lookup_delay,
            now,
            stats: CommentStats::default(),
        }
    }

    /// Statistics accumulated over every post extracted so far
    pub fn stats(&self) -> &CommentStats {
        &self.stats
    }

    /// Flatten, filter and annotate the comments of `post`
    ///
    /// # Errors
    ///
    /// Returns the first error from fetching the tree or expanding a
    /// placeholder. Author lookup failures are never errors; they are
    /// cached as unknown.
    pub async fn extract(&mut self, post: &Post) -> Result<Vec<Comment>, RedditError> {
        let mut collector = TreeCollector::default();
        collector.collect(self.client.comment_tree(&post.id).await?);
        self.expand(&post.id, &mut collector).await?;

        let flat = flatten_depth_first(&collector.nodes);
        self.stats.total += flat.len();

        let mut comments = Vec::with_capacity(flat.len());
        for (depth, node) in flat {
            let created = self.resolve_author(&node.author).await;

            if let Some(created) = created {
                if account_age_days(created, self.now) < self.age_threshold_days {
                    self.stats.too_young += 1;
                    continue;
                }
            }

            let body = flatten_lines(&decode_entities(&node.body));
            let links = extract_links(&body);
            comments.push(Comment {
                depth,
                author: node.author.clone(),
                author_created: created,
                body,
                links,
            });
        }

        self.stats.kept += comments.len();
        tracing::debug!(
            post = %post.id,
            kept = comments.len(),
            "Extracted comments"
        );
        Ok(comments)
    }

    /// Resolve every pending `more` placeholder
    async fn expand(
        &mut self,
        post_id: &str,
        collector: &mut TreeCollector,
    ) -> Result<(), RedditError> {
        for round in 0..MAX_EXPANSION_ROUNDS {
            if collector.pending.is_empty() {
                return Ok(());
            }

            let pending = std::mem::take(&mut collector.pending);
            let (threads, batches): (Vec<MoreChildren>, Vec<MoreChildren>) =
                pending.into_iter().partition(MoreChildren::is_continue_thread);

            let ids: Vec<String> = batches
                .into_iter()
                .flat_map(|more| more.children)
                .filter(|id| !collector.seen.contains(id))
                .collect();

            tracing::debug!(
                post = %post_id,
                round = round,
                ids = ids.len(),
                threads = threads.len(),
                "Expanding more comments"
            );

            for chunk in ids.chunks(MORE_CHILDREN_BATCH) {
                self.stats.expansions += 1;
                let things = self.client.more_children(post_id, chunk).await?;
                collector.collect(things);
            }

            for more in threads {
                let Some(parent) = more.parent_id.strip_prefix("t1_") else {
                    continue;
                };
                self.stats.expansions += 1;
                let things = self.client.comment_thread(post_id, parent).await?;
                collector.collect(things);
            }
        }

        if !collector.pending.is_empty() {
            tracing::warn!(
                post = %post_id,
                remaining = collector.pending.len(),
                "Stopped expanding comments at the round limit"
            );
        }
        Ok(())
    }

    /// Creation time of `author`'s account, consulting the cache first
    async fn resolve_author(&mut self, author: &str) -> Option<DateTime<Utc>> {
        if is_deleted_author(author) {
            return None;
        }

        match self.cache.lookup(author) {
            CachedAge::Created(created) => return Some(created),
            CachedAge::Unknown => return None,
            CachedAge::Miss => {}
        }

        self.stats.author_lookups += 1;
        match self.client.user_created(author).await {
            Ok(created) => {
                self.cache.record_created(author, created);
                if !self.lookup_delay.is_zero() {
                    tokio::time::sleep(self.lookup_delay).await;
                }
                Some(created)
            }
            Err(e) => {
                tracing::debug!(author = %author, error = %e, "Author lookup failed");
                self.cache.record_unknown(author);
                None
            }
        }
    }
}
