//! A* over the product, guided by the automata distance-to-accept estimate.
//!
//! Shares the bucket machinery of [`dijkstra`][super::dijkstra]; only the
//! bucket key changes to `(g + h, g)`. See [`Product::heuristic`] for the
//! estimate and why it never overestimates.

use log::debug;

use super::dijkstra::best_first;
use super::SearchOutcome;
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::product::Product;

pub fn search(product: &Product, cancel: &CancelToken) -> Result<SearchOutcome> {
    let ts = product.ts();
    let w_min = (0..ts.actions().len()).map(|a| ts.weight(a)).min().unwrap_or(0);
    let heuristic = product.heuristic(w_min);
    debug!("a*: minimum action weight {}", w_min);
    best_first(product, Some(heuristic), cancel)
}
