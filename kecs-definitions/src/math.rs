//! Small numeric helpers shared across converters and the ECS API.
//!
//! Grounded on the same spirit as `shipcat_definitions::math`: pull
//! percentage/threshold arithmetic out of the bigger modules so it can be
//! unit tested in isolation.

/// Upper bound on `runningCount + pendingCount` for a desired count and a
/// `maxPercent`.
pub fn max_allowed_tasks(desired_count: u32, max_percent: u32) -> u32 {
    ((desired_count as u64 * max_percent as u64) + 99) as u32 / 100
}

/// Rolling deployment surge/unavailable counts derived from
/// `deploymentConfiguration`.
pub fn rolling_update_bounds(max_percent: u32, min_healthy_percent: u32) -> (i64, i64) {
    let max_surge = max_percent as i64 - 100;
    let max_unavailable = 100 - min_healthy_percent as i64;
    (max_surge.max(0), max_unavailable.max(0))
}

/// Derive a NodePort in the valid Kubernetes range for a given host port.
///
/// A naive host-port-to-NodePort offset collides/gaps for host ports near
/// 10000, so instead this derives any free NodePort in 30000-32767 as a
/// pure candidate generator; the caller (the cluster driver) is responsible
/// for probing candidates against already-allocated NodePorts and picking
/// the first free one.
pub fn node_port_candidates(host_port: u16) -> impl Iterator<Item = u16> {
    const RANGE_START: u32 = 30000;
    const RANGE_END: u32 = 32767;
    let span = RANGE_END - RANGE_START + 1;
    let seed = RANGE_START + (host_port as u32 % span);
    (0..span).map(move |offset| (RANGE_START + (seed - RANGE_START + offset) % span) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_allowed_tasks_rounds_up() {
        assert_eq!(max_allowed_tasks(2, 200), 4);
        assert_eq!(max_allowed_tasks(3, 150), 5); // 4.5 -> 5
        assert_eq!(max_allowed_tasks(0, 200), 0);
    }

    #[test]
    fn rolling_update_bounds_match_defaults() {
        assert_eq!(rolling_update_bounds(200, 100), (100, 0));
    }

    #[test]
    fn node_port_candidates_stay_in_range() {
        let first_ten: Vec<u16> = node_port_candidates(8080).take(10).collect();
        for p in first_ten {
            assert!((30000..=32767).contains(&p));
        }
    }
}
