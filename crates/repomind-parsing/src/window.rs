//! Sliding-window line ranges for files without extractable symbols

use repomind_config::ChunkingConfig;

/// Compute 1-based inclusive line ranges covering `total_lines`
///
/// Windows are `window_lines` tall and overlap by `overlap_lines`. The
/// final window is at least `min_window_lines` tall, re-covering the
/// previous window if the tail would otherwise be too short. The union
/// of the returned ranges is exactly `1..=total_lines`.
pub fn sliding_windows(total_lines: usize, config: &ChunkingConfig) -> Vec<(usize, usize)> {
    if total_lines == 0 {
        return Vec::new();
    }

    let window = config.window_lines.max(1);
    let step = window.saturating_sub(config.overlap_lines).max(1);
    let min_window = config.min_window_lines.max(1);

    let mut ranges = Vec::new();
    let mut start = 1usize;
    loop {
        let end = start.saturating_add(window - 1).min(total_lines);
        let height = end - start + 1;

        if end == total_lines {
            // Tail window: widen back to min_window when the file allows it
            if height < min_window && total_lines >= min_window {
                ranges.push((total_lines - min_window + 1, total_lines));
            } else {
                ranges.push((start, end));
            }
            break;
        }

        ranges.push((start, end));
        start = start.saturating_add(step);
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChunkingConfig {
        ChunkingConfig::default()
    }

    fn covered(ranges: &[(usize, usize)]) -> Vec<bool> {
        let max = ranges.iter().map(|&(_, e)| e).max().unwrap_or(0);
        let mut seen = vec![false; max + 1];
        for &(s, e) in ranges {
            for line in s..=e {
                seen[line] = true;
            }
        }
        seen
    }

    #[test]
    fn empty_file_has_no_windows() {
        assert!(sliding_windows(0, &config()).is_empty());
    }

    #[test]
    fn single_line_file_has_one_window() {
        assert_eq!(sliding_windows(1, &config()), vec![(1, 1)]);
    }

    #[test]
    fn short_file_fits_one_window() {
        assert_eq!(sliding_windows(40, &config()), vec![(1, 40)]);
    }

    #[test]
    fn hundred_lines_overlap_by_eight() {
        let ranges = sliding_windows(100, &config());
        assert_eq!(ranges, vec![(1, 40), (33, 72), (65, 100)]);

        // Consecutive windows share exactly the overlap
        assert_eq!(ranges[0].1 - ranges[1].0 + 1, 8);
    }

    #[test]
    fn union_covers_every_line() {
        for total in [1, 7, 8, 39, 40, 41, 73, 100, 500] {
            let ranges = sliding_windows(total, &config());
            let seen = covered(&ranges);
            assert!(
                (1..=total).all(|line| seen[line]),
                "gap in coverage for {total} lines"
            );
            assert!(ranges.iter().all(|&(s, e)| s >= 1 && e <= total && s <= e));
        }
    }

    #[test]
    fn final_window_meets_minimum_height() {
        // Force a short tail: window 10, overlap 0, min 8, 23 lines
        let config = ChunkingConfig {
            window_lines: 10,
            overlap_lines: 0,
            min_window_lines: 8,
            max_chunk_chars: 8_000,
        };
        let ranges = sliding_windows(23, &config);
        let &(last_start, last_end) = ranges.last().unwrap();
        assert_eq!(last_end, 23);
        assert!(
            last_end - last_start + 1 >= 8,
            "tail window re-covers to reach the minimum"
        );
    }
}
