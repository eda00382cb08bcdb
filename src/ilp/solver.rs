use log::{debug, warn};
use std::time::{Duration, Instant};

use super::IlpModel;

// Objective tolerance: costs are rate * hours products, well above this
const COST_EPS: f64 = 1e-6;

/// Minimum day gap between two period starts of the same employee.
const MIN_SEPARATION_DAYS: i64 = 30;

/// Exact branch-and-bound over the 0-1 model.
///
/// Depth-first over period groups (staff in rate-descending order, periods
/// in index order), candidates per group in ascending cost order. The lower
/// bound at a node is the committed cost plus each remaining group's
/// cheapest candidate; because candidates ascend by cost the scan of a
/// group stops at the first candidate whose bound cannot beat the
/// incumbent.
///
/// Returns the chosen variable per group. `None` means the model is
/// infeasible or the wall-clock budget expired before the search finished,
/// i.e. optimality was not proven.
pub(crate) fn branch_and_bound(model: &IlpModel, timeout: Duration) -> Option<Vec<usize>> {
    let group_count = model.groups.len();

    // suffix_min[g] = sum of the cheapest candidate of every group >= g
    let mut suffix_min = vec![0.0; group_count + 1];
    for group_idx in (0..group_count).rev() {
        let cheapest = model.groups[group_idx]
            .vars
            .first()
            .map(|&var_idx| model.vars[var_idx].cost)
            .unwrap_or(0.0);
        suffix_min[group_idx] = suffix_min[group_idx + 1] + cheapest;
    }

    let mut search = Search {
        model,
        deadline: Instant::now() + timeout,
        timed_out: false,
        suffix_min,
        day_counts: vec![0; model.day_count],
        client_day_counts: vec![0; model.client_caps.len() * model.day_count],
        chosen: vec![usize::MAX; group_count],
        best: None,
        nodes: 0,
    };
    search.dfs(0, 0.0);

    if search.timed_out {
        warn!(
            "branch-and-bound stopped at the {:?} budget after {} nodes, optimality unproven",
            timeout, search.nodes
        );
        return None;
    }

    match search.best {
        Some((objective, chosen)) => {
            debug!(
                "branch-and-bound proved optimum {:.2} in {} nodes",
                objective, search.nodes
            );
            Some(chosen)
        }
        None => {
            warn!("model infeasible: no assignment satisfies every constraint");
            None
        }
    }
}

struct Search<'m, 'p> {
    model: &'m IlpModel<'p>,
    deadline: Instant,
    timed_out: bool,
    suffix_min: Vec<f64>,
    day_counts: Vec<u32>,
    client_day_counts: Vec<u32>, // client-major: client * day_count + offset
    chosen: Vec<usize>,
    best: Option<(f64, Vec<usize>)>,
    nodes: u64,
}

impl Search<'_, '_> {
    fn dfs(&mut self, group_idx: usize, cost_so_far: f64) {
        self.nodes += 1;
        if Instant::now() >= self.deadline {
            self.timed_out = true;
            return;
        }

        if group_idx == self.model.groups.len() {
            if self
                .best
                .as_ref()
                .map_or(true, |(best, _)| cost_so_far < best - COST_EPS)
            {
                self.best = Some((cost_so_far, self.chosen.clone()));
            }
            return;
        }

        for position in 0..self.model.groups[group_idx].vars.len() {
            let var_idx = self.model.groups[group_idx].vars[position];
            let cost = self.model.vars[var_idx].cost;
            if let Some((best, _)) = &self.best {
                // Candidates ascend by cost, so no later one can do better
                if cost_so_far + cost + self.suffix_min[group_idx + 1] >= best - COST_EPS {
                    break;
                }
            }
            if !self.feasible(group_idx, var_idx) {
                continue;
            }

            self.occupy(var_idx, 1);
            self.chosen[group_idx] = var_idx;
            self.dfs(group_idx + 1, cost_so_far + cost);
            self.occupy(var_idx, -1);

            if self.timed_out {
                return;
            }
        }
        self.chosen[group_idx] = usize::MAX;
    }

    /// Separation, symmetry, concurrency, and client-cap checks against the
    /// partial assignment.
    fn feasible(&self, group_idx: usize, var_idx: usize) -> bool {
        let model = self.model;
        let group = &model.groups[group_idx];
        let var = &model.vars[var_idx];

        for earlier_idx in 0..group_idx {
            let earlier = &model.groups[earlier_idx];
            if earlier.staff_idx != group.staff_idx {
                continue;
            }
            let earlier_var = &model.vars[self.chosen[earlier_idx]];

            // 30-day separation between starts of the same employee
            if (var.start - earlier_var.start).num_days().abs() < MIN_SEPARATION_DAYS {
                return false;
            }
            // Lexicographic ordering of equal-duration periods cuts the
            // symmetric half of the tree without moving the optimum
            if earlier.period_idx + 1 == group.period_idx
                && earlier.duration == group.duration
                && var.start <= earlier_var.start
            {
                return false;
            }
        }

        let start_offset = model.day_offset(var.start);
        let end_offset = model.day_offset(var.end);
        let client = model.client_of_staff[group.staff_idx];
        let client_cap = model.client_caps[client];
        let client_base = client * model.day_count;

        for offset in start_offset..=end_offset {
            if self.day_counts[offset] + 1 > model.prepared.max_simultaneous {
                return false;
            }
            if model.window_day[offset]
                && self.client_day_counts[client_base + offset] + 1 > client_cap
            {
                return false;
            }
        }

        true
    }

    fn occupy(&mut self, var_idx: usize, delta: i32) {
        let model = self.model;
        let var = &model.vars[var_idx];
        let group = &model.groups[var.group];
        let client_base = model.client_of_staff[group.staff_idx] * model.day_count;

        let start_offset = model.day_offset(var.start);
        let end_offset = model.day_offset(var.end);
        for offset in start_offset..=end_offset {
            self.day_counts[offset] = (self.day_counts[offset] as i32 + delta) as u32;
            if model.window_day[offset] {
                let slot = client_base + offset;
                self.client_day_counts[slot] = (self.client_day_counts[slot] as i32 + delta) as u32;
            }
        }
    }
}
