//! Flat-kernel mean-shift clustering over dense vectors.
//!
//! Every point seeds a candidate mode. Each mode repeatedly moves to the
//! mean of the points within `bandwidth` (euclidean) until it converges,
//! then modes within one bandwidth of a stronger mode are merged away.
//! Points are assigned the id of their nearest surviving mode.
//!
//! The contract is grouping, not numerics: inputs with near-identical
//! vectors land in the same cluster; exact cluster ids are arbitrary.

const MAX_ITERATIONS: usize = 300;
const CONVERGENCE_EPS: f64 = 1e-4;

/// Assign a cluster id to every input point. Returns one id per point,
/// numbered from zero in decreasing order of cluster support.
pub fn mean_shift(points: &[Vec<f64>], bandwidth: f64) -> Vec<usize> {
    if points.is_empty() {
        return Vec::new();
    }

    // Shift every seed to its local mode
    let mut modes: Vec<(Vec<f64>, usize)> = Vec::with_capacity(points.len());
    for seed in points {
        let (mode, support) = shift_to_mode(seed, points, bandwidth);
        modes.push((mode, support));
    }

    // Strongest modes first; ties broken by position for determinism
    let mut order: Vec<usize> = (0..modes.len()).collect();
    order.sort_by(|&a, &b| modes[b].1.cmp(&modes[a].1).then(a.cmp(&b)));

    // Merge each mode into the first stronger mode within one bandwidth
    let mut centers: Vec<Vec<f64>> = Vec::new();
    let mut mode_cluster = vec![0usize; modes.len()];
    for &i in &order {
        let mode = &modes[i].0;
        match centers
            .iter()
            .position(|c| euclidean(c, mode) <= bandwidth)
        {
            Some(existing) => mode_cluster[i] = existing,
            None => {
                centers.push(mode.clone());
                mode_cluster[i] = centers.len() - 1;
            }
        }
    }

    // Each point belongs to the cluster of its own converged mode
    (0..points.len()).map(|i| mode_cluster[i]).collect()
}

/// Run the shift iteration for one seed. Returns the converged mode and
/// the number of points inside its final window.
fn shift_to_mode(seed: &[f64], points: &[Vec<f64>], bandwidth: f64) -> (Vec<f64>, usize) {
    let mut current = seed.to_vec();
    let mut support = 1;

    for _ in 0..MAX_ITERATIONS {
        let mut mean = vec![0.0; current.len()];
        let mut count = 0usize;
        for point in points {
            if euclidean(&current, point) <= bandwidth {
                for (m, v) in mean.iter_mut().zip(point) {
                    *m += v;
                }
                count += 1;
            }
        }
        if count == 0 {
            // Isolated seed; it is its own mode
            return (current, 1);
        }
        for m in &mut mean {
            *m /= count as f64;
        }

        let moved = euclidean(&current, &mean);
        current = mean;
        support = count;
        if moved < CONVERGENCE_EPS {
            break;
        }
    }

    (current, support)
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
