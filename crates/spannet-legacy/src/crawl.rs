//! Chain discovery by crawling across nodes.
//!
//! A crawl starts on an edge and walks in both directions, leaving each
//! node through an interface that continues the incoming direction closely
//! enough. When several interfaces qualify, one is chosen at random.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spannet_core::{Error, Result};

use crate::topology::LegacyNetwork;

/// Outcome of walking in one direction.
struct Walk {
    edges: Vec<usize>,
    /// The walk came back to its starting edge.
    closed: bool,
}

impl LegacyNetwork {
    /// Walk from edge `start` in both directions and return the run of
    /// edges found.
    ///
    /// An interface continues the walk when its dot product with the
    /// incoming interface is below `-angle_limit`. A closed loop is
    /// returned once, starting at `start`.
    pub fn crawl_for_chain<R: Rng>(
        &self,
        start: usize,
        angle_limit: f64,
        rng: &mut R,
    ) -> Result<Vec<usize>> {
        let edge = self.edges.get(start).ok_or_else(|| {
            Error::invalid_input(format!(
                "edge {start} out of range ({} edges)",
                self.edges.len()
            ))
        })?;
        let (i, j) = edge.ends;

        let forward = self.walk(start, j, angle_limit, rng);
        if forward.closed {
            return Ok(forward.edges);
        }

        let backward = self.walk(start, i, angle_limit, rng);
        if backward.closed {
            let mut chain = vec![start];
            chain.extend(backward.edges[1..].iter().rev());
            return Ok(chain);
        }

        let mut chain: Vec<usize> = backward.edges[1..].iter().rev().copied().collect();
        chain.extend(forward.edges);
        Ok(chain)
    }

    /// [`crawl_for_chain`](Self::crawl_for_chain) with a seeded generator.
    pub fn crawl_for_chain_seeded(
        &self,
        start: usize,
        angle_limit: f64,
        seed: u64,
    ) -> Result<Vec<usize>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.crawl_for_chain(start, angle_limit, &mut rng)
    }

    /// Crawl from every edge not yet covered by a chain, registering each
    /// result. Returns the number of chains added.
    pub fn crawl_all_chains<R: Rng>(
        &mut self,
        angle_limit: f64,
        rng: &mut R,
    ) -> Result<usize> {
        let mut covered = vec![false; self.edges.len()];
        for chain in &self.chains {
            for &e in &chain.edges {
                if let Some(c) = covered.get_mut(e) {
                    *c = true;
                }
            }
        }

        let mut added = 0;
        for start in 0..self.edges.len() {
            if covered[start] {
                continue;
            }
            let chain = self.crawl_for_chain(start, angle_limit, rng)?;
            for &e in &chain {
                covered[e] = true;
            }
            self.add_chain(chain)?;
            added += 1;
        }

        debug!("Crawled {added} chains over {} edges", self.edges.len());
        Ok(added)
    }

    /// Pairs of chains `(i, j)`, `i < j`, sharing a run of at least
    /// `min_run` consecutive edges in either direction.
    pub fn find_overlapping_chains(&self, min_run: usize) -> Vec<(usize, usize)> {
        let n = min_run.max(1);
        let mut pairs = Vec::new();
        for (i, a) in self.chains.iter().enumerate() {
            let reversed: Vec<usize> = a.edges.iter().rev().copied().collect();
            for (j, b) in self.chains.iter().enumerate().skip(i + 1) {
                let overlaps = b
                    .edges
                    .windows(n)
                    .any(|run| contains_run(&a.edges, run) || contains_run(&reversed, run));
                if overlaps {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    fn walk<R: Rng>(&self, start: usize, from: usize, angle_limit: f64, rng: &mut R) -> Walk {
        let mut edges = Vec::new();
        let mut edge = start;
        let mut node = from;

        // The seed edge is always part of the walk.
        for _ in 0..self.settings.max_crawl_steps.max(1) {
            edges.push(edge);
            let Some(current) = self.nodes.get(node) else {
                break;
            };
            let Some(incoming) = current.interface_of(edge) else {
                break;
            };
            let dir = current.interfaces[incoming].direction;
            let routes: Vec<usize> = current
                .interfaces
                .iter()
                .enumerate()
                .filter(|(k, ni)| *k != incoming && dir.dot(ni.direction) < -angle_limit)
                .map(|(_, ni)| ni.edge)
                .collect();
            if routes.is_empty() {
                break;
            }

            edge = routes[rng.gen_range(0..routes.len())];
            let Some(next) = self.edges.get(edge).and_then(|e| e.other(node)) else {
                break;
            };
            node = next;
            if edge == start {
                return Walk {
                    edges,
                    closed: true,
                };
            }
        }
        Walk {
            edges,
            closed: false,
        }
    }
}

/// Whether `needle` occurs as a contiguous run in `haystack`.
pub fn contains_run(haystack: &[usize], needle: &[usize]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
