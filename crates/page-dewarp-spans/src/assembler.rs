//! Greedy assembly of contours into left-to-right chains ("spans").
//!
//! Contours live in a caller-owned slice and are addressed by index; links
//! are kept in a parallel arena of [`ContourLinks`]. Candidate edges are
//! enumerated for spatially close pairs only, sorted by score (stable, so ties
//! keep enumeration order) and accepted greedily while both endpoints are
//! still free.

use crate::contour::Contour;
use crate::edge::{ContourEdge, EdgeScorer};
use crate::params::{EdgeParams, SpanParams};
use kiddo::{KdTree, SquaredEuclidean};
use page_dewarp_core::BoundingBox;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Neighbour links of one contour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContourLinks {
    pub previous: Option<usize>,
    pub next: Option<usize>,
}

/// Ordered chain of contours assumed to share one text baseline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContourSpan {
    /// Contour indices, left to right.
    pub members: Vec<usize>,
    /// Sum of member bounding-box widths in pixels.
    pub width: f64,
    pub bounds: BoundingBox,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpanAssembly {
    /// One entry per input contour.
    pub links: Vec<ContourLinks>,
    /// Accepted spans, top to bottom by their head contour.
    pub spans: Vec<ContourSpan>,
    pub candidate_edges: usize,
    pub accepted_edges: usize,
    /// Chains that failed the member-count or width gate.
    pub dropped_spans: usize,
}

pub struct SpanAssembler {
    scorer: EdgeScorer,
    params: SpanParams,
}

impl SpanAssembler {
    pub fn new(edge_params: &EdgeParams, span_params: &SpanParams) -> Self {
        Self {
            scorer: EdgeScorer::new(edge_params),
            params: span_params.clone(),
        }
    }

    pub fn scorer(&self) -> &EdgeScorer {
        &self.scorer
    }

    /// All materialized edges between nearby contours, best first.
    ///
    /// Pairs are enumerated as `(i, j)` with `i < j` in ascending order; a
    /// pair is considered only if the centres are close enough for the
    /// anchor gap to pass `max_distance`.
    pub fn candidate_edges(&self, contours: &[Contour]) -> Vec<ContourEdge> {
        if contours.len() < 2 {
            return Vec::new();
        }
        let centers: Vec<[f64; 2]> = contours.iter().map(|c| [c.center.x, c.center.y]).collect();
        let tree: KdTree<f64, 2> = (&centers).into();
        let max_half = contours
            .iter()
            .map(Contour::half_length)
            .fold(0.0, f64::max);
        let max_distance = self.scorer.params().max_distance;

        let mut edges = Vec::new();
        for (i, contour) in contours.iter().enumerate() {
            let radius = max_distance + contour.half_length() + max_half;
            let mut neighbours: Vec<usize> = tree
                .within::<SquaredEuclidean>(&centers[i], radius * radius)
                .into_iter()
                .map(|nn| nn.item as usize)
                .filter(|&j| j > i)
                .collect();
            neighbours.sort_unstable();
            edges.extend(
                neighbours
                    .into_iter()
                    .filter_map(|j| self.scorer.score_edge(contours, i, j)),
            );
        }
        edges.sort_by(|a, b| a.score.total_cmp(&b.score));
        edges
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, contours), fields(contours = contours.len()))
    )]
    pub fn assemble(&self, contours: &[Contour]) -> SpanAssembly {
        let edges = self.candidate_edges(contours);
        let mut links = vec![ContourLinks::default(); contours.len()];

        let mut accepted = 0;
        for edge in &edges {
            if links[edge.from].next.is_some() || links[edge.to].previous.is_some() {
                continue;
            }
            if reaches(&links, edge.to, edge.from) {
                continue;
            }
            links[edge.from].next = Some(edge.to);
            links[edge.to].previous = Some(edge.from);
            accepted += 1;
        }

        let mut heads: Vec<usize> = (0..contours.len())
            .filter(|&i| links[i].previous.is_none())
            .collect();
        heads.sort_by(|&a, &b| {
            contours[a]
                .bounds
                .min
                .y
                .total_cmp(&contours[b].bounds.min.y)
                .then(a.cmp(&b))
        });

        let mut spans = Vec::new();
        let mut dropped = 0;
        for head in heads {
            let members = walk_chain(&links, head);
            let width: f64 = members.iter().map(|&i| contours[i].width()).sum();
            if members.len() < self.params.min_contours || width < self.params.min_width {
                dropped += 1;
                continue;
            }
            let corners: Vec<_> = members
                .iter()
                .flat_map(|&i| [contours[i].bounds.min, contours[i].bounds.max])
                .collect();
            let Some(bounds) = BoundingBox::from_points(&corners) else {
                continue;
            };
            spans.push(ContourSpan {
                members,
                width,
                bounds,
            });
        }

        log::debug!(
            "span assembly: {} contours, {} candidate edges, {} accepted, {} spans kept, {} dropped",
            contours.len(),
            edges.len(),
            accepted,
            spans.len(),
            dropped
        );

        SpanAssembly {
            links,
            spans,
            candidate_edges: edges.len(),
            accepted_edges: accepted,
            dropped_spans: dropped,
        }
    }
}

/// True when following `next` from `start` arrives at `target`.
fn reaches(links: &[ContourLinks], start: usize, target: usize) -> bool {
    let mut cur = Some(start);
    let mut steps = 0;
    while let Some(i) = cur {
        if i == target {
            return true;
        }
        steps += 1;
        if steps > links.len() {
            return true;
        }
        cur = links[i].next;
    }
    false
}

/// Members of the chain starting at `head`, in `next` order.
fn walk_chain(links: &[ContourLinks], head: usize) -> Vec<usize> {
    let mut members = vec![head];
    let mut cur = links[head].next;
    while let Some(i) = cur {
        if members.len() > links.len() {
            break;
        }
        members.push(i);
        cur = links[i].next;
    }
    members
}
