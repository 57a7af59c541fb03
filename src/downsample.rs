//! Per-second downsampling policies
//!
//! Two independently specified ways of averaging a per-frame series into one
//! value per second. They disagree on the trailing partial block and must stay
//! separate:
//!
//! - [`padded_reshape_mean`]: zero-pad the tail to a whole block, then average
//!   each block. Used by plotting views of features and scores.
//! - [`block_mean`]: average each block, the trailing partial block over the
//!   rows it actually has. Used by the interaction graph and ethogram views.

/// Zero-pad the series to a whole number of `rate`-sized blocks, then average
/// each block.
///
/// When the length is already a multiple of `rate`, a full block of zeros is
/// appended, yielding one extra 0.0 sample at the end.
pub fn padded_reshape_mean(series: &[f64], rate: usize) -> Vec<f64> {
    if rate == 0 {
        return Vec::new();
    }
    let pad = rate - (series.len() % rate);
    let padded_len = series.len() + pad;
    let mut out = Vec::with_capacity(padded_len / rate);
    for block in 0..padded_len / rate {
        let start = block * rate;
        let sum: f64 = series[start..series.len().min(start + rate)].iter().sum();
        out.push(sum / rate as f64);
    }
    out
}

/// Average every contiguous block of `rate` values; the trailing partial block
/// is averaged over whatever values remain, with no padding.
pub fn block_mean(series: &[f64], rate: usize) -> Vec<f64> {
    if rate == 0 {
        return Vec::new();
    }
    series
        .chunks(rate)
        .map(|chunk| chunk.iter().sum::<f64>() / chunk.len() as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn block_mean_averages_trailing_partial_block() {
        let series = [3.0, 3.0, 3.0, 9.0, 9.0, 9.0, 6.0];
        assert_eq!(block_mean(&series, 3), vec![3.0, 9.0, 6.0]);
    }

    #[test]
    fn padded_reshape_dilutes_trailing_partial_block() {
        let series = [3.0, 3.0, 3.0, 9.0, 9.0, 9.0, 6.0];
        // last block is [6, 0, 0]
        assert_eq!(padded_reshape_mean(&series, 3), vec![3.0, 9.0, 2.0]);
    }

    #[test]
    fn padded_reshape_appends_zero_block_on_exact_multiple() {
        let series = [3.0, 3.0, 3.0];
        assert_eq!(padded_reshape_mean(&series, 3), vec![3.0, 0.0]);
        assert_eq!(block_mean(&series, 3), vec![3.0]);
    }

    #[test]
    fn policies_agree_only_on_full_blocks() {
        let series = [1.0, 2.0, 3.0, 4.0, 5.0];
        let padded = padded_reshape_mean(&series, 2);
        let trailing = block_mean(&series, 2);
        assert_eq!(padded[..2], trailing[..2]);
        assert_eq!(padded[2], 2.5);
        assert_eq!(trailing[2], 5.0);
    }

    #[test]
    fn empty_series_and_zero_rate() {
        assert!(block_mean(&[], 3).is_empty());
        assert!(block_mean(&[1.0], 0).is_empty());
        // an empty series still pads to one whole zero block
        assert_eq!(padded_reshape_mean(&[], 3), vec![0.0]);
    }
}
