//! # Fluid Simulation
//!
//! Water does not flow physically. Spreading is a delayed, breadth-expanding fill driven
//! by a time-ordered event queue: each event names a cell and a remaining spread
//! distance, and fires once its due time has passed.
//!
//! - At most one event is pending per cell, so repeated triggers cannot grow the queue.
//! - A tick processes a bounded number of due events.
//! - An event whose target is no longer empty is dropped along with its propagation;
//!   water never displaces blocks.
//!
//! Soaking is the opposite: an immediate breadth-first removal of water around a point.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};

use cgmath::Vector3;
use log::{debug, trace};

use super::block::{block_type::BlockType, BlockPos};
use super::world::BlockAccessMut;
use crate::engine_state::config::FluidConfig;

/// Offsets water spreads to: the four horizontal neighbours and the cell below.
pub const SPREAD_OFFSETS: [[i32; 3]; 5] = [
    [1, 0, 0],
    [-1, 0, 0],
    [0, 0, 1],
    [0, 0, -1],
    [0, -1, 0],
];

/// A pending water placement.
#[derive(Debug, Clone, Copy)]
pub struct PendingFluidEvent {
    pub position: BlockPos,
    /// How many more hops water may spread after filling this cell
    pub remaining: u32,
    /// Simulation time at which the event fires
    pub due: f64,
    seq: u64,
}

// Ordered so that the max-heap pops the earliest due event first, ties in insertion
// order.
impl Ord for PendingFluidEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .total_cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PendingFluidEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PendingFluidEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingFluidEvent {}

/// The water spread queue.
pub struct FluidSimulator {
    queue: BinaryHeap<PendingFluidEvent>,
    pending: HashSet<BlockPos>,
    now: f64,
    next_seq: u64,
    spread_delay: f64,
    max_events_per_tick: usize,
}

impl FluidSimulator {
    pub fn new(config: &FluidConfig) -> Self {
        FluidSimulator {
            queue: BinaryHeap::new(),
            pending: HashSet::new(),
            now: 0.0,
            next_seq: 0,
            spread_delay: config.spread_delay.max(0.0),
            max_events_per_tick: config.max_events_per_tick.max(1),
        }
    }

    /// Simulation time of the most recent tick.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Number of pending events.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether an event targets `pos`.
    pub fn is_pending(&self, pos: BlockPos) -> bool {
        self.pending.contains(&pos)
    }

    /// Whether no event is pending.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Due time of the earliest pending event.
    pub fn next_due(&self) -> Option<f64> {
        self.queue.peek().map(|event| event.due)
    }

    /// Queues water placement at `pos`, `delay` seconds from now.
    ///
    /// # Returns
    /// `false` if an event already targets `pos`, in which case nothing is queued
    pub fn schedule(&mut self, pos: BlockPos, remaining: u32, delay: f64) -> bool {
        if !self.pending.insert(pos) {
            return false;
        }
        self.queue.push(PendingFluidEvent {
            position: pos,
            remaining,
            due: self.now + delay.max(0.0),
            seq: self.next_seq,
        });
        self.next_seq += 1;
        true
    }

    /// Schedules the spread neighbours of `pos` with `distance - 1`. Does nothing when
    /// `distance` is zero.
    pub fn spread_from(&mut self, pos: BlockPos, distance: u32) {
        if distance == 0 {
            return;
        }
        for offset in SPREAD_OFFSETS {
            self.schedule(pos + Vector3::from(offset), distance - 1, self.spread_delay);
        }
    }

    /// Processes due events, up to the per-tick cap.
    ///
    /// # Arguments
    /// * `now` - Current simulation time in seconds; never moves the clock backwards
    /// * `world` - The world water is placed into
    ///
    /// # Returns
    /// The number of events processed
    pub fn tick(&mut self, now: f64, world: &mut impl BlockAccessMut) -> usize {
        self.now = self.now.max(now);
        let mut processed = 0;

        while processed < self.max_events_per_tick {
            match self.queue.peek() {
                Some(event) if event.due <= self.now => {}
                _ => break,
            }
            let Some(event) = self.queue.pop() else {
                break;
            };
            self.pending.remove(&event.position);
            processed += 1;

            if !world.set_block_if_empty(event.position, BlockType::Water.into()) {
                continue;
            }
            self.spread_from(event.position, event.remaining);
        }

        if processed > 0 {
            trace!(
                "Fluid tick at {:.2}s: {} event(s), {} pending",
                self.now,
                processed,
                self.pending.len()
            );
        }
        processed
    }

    /// Runs ticks until the queue is empty, advancing the clock to each due time.
    ///
    /// # Returns
    /// The total number of events processed
    pub fn drain(&mut self, world: &mut impl BlockAccessMut) -> usize {
        let mut processed = 0;
        while let Some(due) = self.next_due() {
            processed += self.tick(due, world);
        }
        processed
    }

    /// Immediately removes water around `center`.
    ///
    /// Explores breadth-first through all 26 neighbours, counting one hop per step, and
    /// visits each cell at most once. Every visited water cell within `radius` hops is
    /// cleared.
    ///
    /// # Returns
    /// The number of water blocks removed
    pub fn soak(&mut self, center: BlockPos, radius: u32, world: &mut impl BlockAccessMut) -> usize {
        let radius = radius as i32;
        let mut visited: HashSet<BlockPos> = HashSet::from([center]);
        let mut frontier: VecDeque<(BlockPos, i32)> = VecDeque::from([(center, 0)]);
        let mut removed = 0;

        while let Some((pos, hops)) = frontier.pop_front() {
            if world.block_type_at(pos) == Some(BlockType::Water) {
                world.set_block(pos, None);
                removed += 1;
            }
            if hops == radius {
                continue;
            }
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        if dx == 0 && dy == 0 && dz == 0 {
                            continue;
                        }
                        let next = pos + Vector3::new(dx, dy, dz);
                        if visited.insert(next) {
                            frontier.push_back((next, hops + 1));
                        }
                    }
                }
            }
        }

        debug!("Soaked {} water block(s) around {:?}", removed, center);
        removed
    }
}
