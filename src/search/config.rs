//! Engine options and the search tuning tables derived from them.

use crate::errors::{ChessError, ChessResult};
use crate::search::score::Score;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub hash_mb: usize,
    pub threads: usize,
    pub multi_pv: usize,
    /// Largest piece count (kings included) at which tablebases are probed.
    pub tablebase_probe_limit: u32,
    pub move_overhead_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_mb: 16,
            threads: 1,
            multi_pv: 1,
            tablebase_probe_limit: 6,
            move_overhead_ms: 30,
        }
    }
}

fn parse_in_range<T>(name: &str, value: &str, min: T, max: T) -> ChessResult<T>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let parsed = value
        .trim()
        .parse::<T>()
        .map_err(|_| ChessError::malformed(format!("invalid {name} value '{value}'")))?;
    if parsed < min || parsed > max {
        return Err(ChessError::malformed(format!(
            "{name} value {parsed} outside {min}..={max}"
        )));
    }
    Ok(parsed)
}

impl EngineConfig {
    /// Sets an option by its textual name, ignoring case.
    pub fn set_option(&mut self, name: &str, value: &str) -> ChessResult<()> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("Hash") {
            self.hash_mb = parse_in_range("Hash", value, 1, 65_536)?;
        } else if name.eq_ignore_ascii_case("Threads") {
            self.threads = parse_in_range("Threads", value, 1, 256)?;
        } else if name.eq_ignore_ascii_case("MultiPV") {
            self.multi_pv = parse_in_range("MultiPV", value, 1, 500)?;
        } else if name.eq_ignore_ascii_case("SyzygyProbeLimit") {
            self.tablebase_probe_limit = parse_in_range("SyzygyProbeLimit", value, 0, 7)?;
        } else if name.eq_ignore_ascii_case("MoveOverhead") {
            self.move_overhead_ms = parse_in_range("MoveOverhead", value, 0, 5_000)?;
        } else {
            return Err(ChessError::malformed(format!("unknown option '{name}'")));
        }
        Ok(())
    }
}

const LMR_DEPTHS: usize = 32;
const LMR_MOVES: usize = 64;

/// Pruning margins and reduction tables used by the alpha-beta search.
#[derive(Debug, Clone)]
pub struct SearchParameters {
    /// Static margin per remaining depth below which a quiet move cannot
    /// raise alpha.
    pub futility_margin: [Score; 7],
    /// Quiet moves tried beyond this count at a given depth are skipped.
    pub futility_move_counts: [usize; 11],
    pub max_qsearch_depth: usize,
    pub aspiration_delta: i32,
    pub aspiration_min_depth: u32,
    pub multi_pv: usize,
    pub tablebase_probe_limit: u32,
    pv_reductions: Vec<[i32; LMR_MOVES]>,
    non_pv_reductions: Vec<[i32; LMR_MOVES]>,
}

impl SearchParameters {
    pub fn new(config: &EngineConfig) -> Self {
        let mut futility_margin = [Score::ZERO; 7];
        for (depth, margin) in futility_margin.iter_mut().enumerate() {
            *margin = Score(90 * depth as i32 + 60 * (depth > 0) as i32);
        }
        let mut futility_move_counts = [0usize; 11];
        for (depth, count) in futility_move_counts.iter_mut().enumerate() {
            *count = 3 + depth * depth;
        }

        Self {
            futility_margin,
            futility_move_counts,
            max_qsearch_depth: 16,
            aspiration_delta: 25,
            aspiration_min_depth: 5,
            multi_pv: config.multi_pv.max(1),
            tablebase_probe_limit: config.tablebase_probe_limit,
            pv_reductions: reduction_table(-1.5, 0.33),
            non_pv_reductions: reduction_table(-1.2, 0.4),
        }
    }

    /// Late move reduction in plies for the `move_count`-th move (1-based)
    /// searched at `depth`.
    #[inline]
    pub fn reduction(&self, pv_node: bool, depth: i32, move_count: usize) -> i32 {
        let d = (depth.max(0) as usize).min(LMR_DEPTHS - 1);
        let m = move_count.min(LMR_MOVES - 1);
        if pv_node {
            self.pv_reductions[d][m]
        } else {
            self.non_pv_reductions[d][m]
        }
    }
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

fn reduction_table(base: f64, scale: f64) -> Vec<[i32; LMR_MOVES]> {
    (0..LMR_DEPTHS)
        .map(|depth| {
            let mut row = [0; LMR_MOVES];
            for (moves, cell) in row.iter_mut().enumerate().skip(1) {
                if depth == 0 {
                    break;
                }
                let r = base + scale * (depth as f64).ln() * (moves as f64).ln();
                *cell = if r >= 1.0 { r.floor() as i32 } else { 0 };
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_option_parses_names_case_insensitively() {
        let mut config = EngineConfig::default();
        config.set_option("hash", "64").expect("valid");
        config.set_option("THREADS", " 4 ").expect("valid");
        config.set_option("MultiPV", "3").expect("valid");
        config.set_option("syzygyprobelimit", "5").expect("valid");
        config.set_option("MoveOverhead", "100").expect("valid");
        assert_eq!(
            config,
            EngineConfig {
                hash_mb: 64,
                threads: 4,
                multi_pv: 3,
                tablebase_probe_limit: 5,
                move_overhead_ms: 100,
            }
        );
    }

    #[test]
    fn set_option_rejects_unknown_and_out_of_range() {
        let mut config = EngineConfig::default();
        for (name, value) in [
            ("Ponder", "true"),
            ("Hash", "0"),
            ("Threads", "many"),
            ("MultiPV", "-1"),
            ("SyzygyProbeLimit", "9"),
        ] {
            assert!(matches!(
                config.set_option(name, value),
                Err(ChessError::MalformedInput(_))
            ));
        }
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn reductions_grow_with_depth_and_move_count() {
        let params = SearchParameters::default();
        assert_eq!(params.reduction(false, 1, 40), 0);
        assert_eq!(params.reduction(true, 3, 2), 0);
        assert!(params.reduction(false, 10, 20) >= 1);
        assert!(params.reduction(false, 20, 40) >= params.reduction(false, 10, 20));
        assert!(params.reduction(true, 20, 40) <= params.reduction(false, 20, 40));
        // Out-of-table arguments clamp.
        assert_eq!(params.reduction(false, 99, 500), params.reduction(false, 31, 63));
    }
}
