//! PageRank power iteration over the crawled link graph

use crate::storage::LinkRecord;
use std::collections::{HashMap, HashSet};

/// Scores produced by [`pagerank`]
#[derive(Debug, Clone, Default)]
pub struct PageRankResult {
    pub scores: HashMap<String, f64>,
    pub iterations: u32,
    pub converged: bool,
}

/// Computes PageRank for every URL in `links`
///
/// Nodes are every link record's URL and every outgoing target. Mass held by
/// pages without outgoing edges is spread uniformly over all nodes each
/// iteration, so scores always sum to one. Iteration stops when the L1
/// change drops below `nodes * tolerance` or after `max_iterations`.
///
/// # Arguments
///
/// * `links` - Link records; duplicate targets within a record count once
/// * `damping` - Probability of following a link, usually 0.85
/// * `max_iterations` - Iteration cap
/// * `tolerance` - Per-node convergence threshold
///
/// # Returns
///
/// A score per node and whether the iteration converged before the cap.
pub fn pagerank(
    links: &[LinkRecord],
    damping: f64,
    max_iterations: u32,
    tolerance: f64,
) -> PageRankResult {
    let mut ids: HashMap<&str, usize> = HashMap::new();
    let mut urls: Vec<&str> = Vec::new();

    let mut edges: Vec<(usize, usize)> = Vec::new();
    for record in links {
        let source = node_id(&mut ids, &mut urls, &record.url);
        let mut targets = HashSet::new();
        for target in &record.outgoing {
            if targets.insert(target.as_str()) {
                edges.push((source, node_id(&mut ids, &mut urls, target)));
            }
        }
    }

    let n = urls.len();
    if n == 0 {
        return PageRankResult {
            converged: true,
            ..Default::default()
        };
    }

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (source, target) in edges {
        outgoing[source].push(target);
    }

    let nf = n as f64;
    let mut rank = vec![1.0 / nf; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;

        let dangling: f64 = outgoing
            .iter()
            .zip(&rank)
            .filter(|(targets, _)| targets.is_empty())
            .map(|(_, r)| r)
            .sum();
        let base = (1.0 - damping) / nf + damping * dangling / nf;

        let mut next = vec![base; n];
        for (source, targets) in outgoing.iter().enumerate() {
            if targets.is_empty() {
                continue;
            }
            let share = damping * rank[source] / targets.len() as f64;
            for &target in targets {
                next[target] += share;
            }
        }

        let change: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if change < nf * tolerance {
            converged = true;
            break;
        }
    }

    PageRankResult {
        scores: urls
            .into_iter()
            .zip(rank)
            .map(|(url, score)| (url.to_string(), score))
            .collect(),
        iterations,
        converged,
    }
}

fn node_id<'a>(ids: &mut HashMap<&'a str, usize>, urls: &mut Vec<&'a str>, url: &'a str) -> usize {
    *ids.entry(url).or_insert_with(|| {
        urls.push(url);
        urls.len() - 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(url: &str, outgoing: &[&str]) -> LinkRecord {
        LinkRecord {
            url: url.to_string(),
            outgoing: outgoing.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn total(result: &PageRankResult) -> f64 {
        result.scores.values().sum()
    }

    #[test]
    fn test_two_page_cycle_splits_evenly() {
        let links = vec![
            link("https://a.com/", &["https://b.com/"]),
            link("https://b.com/", &["https://a.com/"]),
        ];
        let result = pagerank(&links, 0.85, 100, 1e-6);

        assert!(result.converged);
        assert!((result.scores["https://a.com/"] - 0.5).abs() < 1e-6);
        assert!((result.scores["https://b.com/"] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_dangling_mass_is_conserved() {
        let links = vec![
            link("https://a.com/", &["https://b.com/", "https://c.com/"]),
            link("https://b.com/", &["https://c.com/"]),
            // d.com has no outgoing edges and c.com has no link record
            link("https://d.com/", &[]),
        ];
        let result = pagerank(&links, 0.85, 100, 1e-8);

        assert_eq!(result.scores.len(), 4);
        assert!((total(&result) - 1.0).abs() < 1e-9);
        assert!(result.scores["https://c.com/"] > result.scores["https://b.com/"]);
        assert!(result.scores["https://b.com/"] > result.scores["https://a.com/"]);
    }

    #[test]
    fn test_duplicate_targets_count_once() {
        let once = pagerank(&[link("https://a.com/", &["https://b.com/"])], 0.85, 100, 1e-8);
        let twice = pagerank(
            &[link("https://a.com/", &["https://b.com/", "https://b.com/"])],
            0.85,
            100,
            1e-8,
        );
        assert!((once.scores["https://b.com/"] - twice.scores["https://b.com/"]).abs() < 1e-12);
    }

    #[test]
    fn test_empty_graph() {
        let result = pagerank(&[], 0.85, 100, 1e-6);
        assert!(result.scores.is_empty());
        assert!(result.converged);
    }

    #[test]
    fn test_iteration_cap() {
        let links = vec![
            link("https://a.com/", &["https://b.com/"]),
            link("https://b.com/", &["https://c.com/"]),
            link("https://c.com/", &["https://a.com/", "https://b.com/"]),
        ];
        let result = pagerank(&links, 0.85, 1, 1e-12);
        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
        assert!((total(&result) - 1.0).abs() < 1e-9);
    }
}
