//! Bounded cyclic fragment source
//!
//! Fragments are drawn from a shuffled queue. When the queue runs dry it is
//! refilled with a fresh shuffle of the whole fragment set. Reclaimed
//! fragments are shuffled and put at the front so they are dealt next.

use crate::types::Fragment;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct FragmentPool {
    universe: Vec<Fragment>,
    queue: VecDeque<Fragment>,
    rng: StdRng,
}

impl FragmentPool {
    pub fn new(fragments: &[Fragment], rng: StdRng) -> Self {
        Self {
            universe: fragments.to_vec(),
            queue: VecDeque::with_capacity(fragments.len()),
            rng,
        }
    }

    /// Next fragment, reshuffling the full set when the queue is empty.
    /// Returns `None` only for an empty universe.
    pub fn draw(&mut self) -> Option<Fragment> {
        if self.queue.is_empty() {
            let mut fresh = self.universe.clone();
            fresh.shuffle(&mut self.rng);
            self.queue.extend(fresh);
        }
        self.queue.pop_front()
    }

    /// Return fragments to the front of the queue in random order.
    /// A fragment that is already queued moves to the front instead of
    /// appearing twice.
    pub fn recycle(&mut self, fragments: impl IntoIterator<Item = Fragment>) {
        let mut returned: Vec<Fragment> = Vec::new();
        for fragment in fragments {
            if !returned.contains(&fragment) {
                returned.push(fragment);
            }
        }
        self.queue.retain(|f| !returned.contains(f));
        returned.shuffle(&mut self.rng);
        for fragment in returned.into_iter().rev() {
            self.queue.push_front(fragment);
        }
    }

    /// Draw `count` distinct fragments for one hand.
    pub fn deal(&mut self, count: usize) -> Vec<Fragment> {
        let count = count.min(self.universe.len());
        let mut hand: Vec<Fragment> = Vec::with_capacity(count);
        let mut skipped: Vec<Fragment> = Vec::new();

        while hand.len() < count {
            let Some(fragment) = self.draw() else {
                break;
            };
            if hand.contains(&fragment) {
                skipped.push(fragment);
            } else {
                hand.push(fragment);
            }
        }

        if !skipped.is_empty() {
            self.recycle(skipped);
        }
        hand
    }

    /// Fragments waiting in the current cycle
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}
