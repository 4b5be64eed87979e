//! Grouping of abnormal flags into alert segments

use vitals_core::{AlertSegment, ChannelId, VitalsError, VitalsResult};

/// Merges maximal runs of consecutive `true` flags
///
/// Adjacency is by buffer index only; gaps in the time axis between two
/// index-adjacent samples do not split a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSegmenter;

impl RunSegmenter {
    pub fn new() -> Self {
        Self
    }

    pub fn segment(&self, channel: ChannelId, flags: &[bool], times: &[f64]) -> VitalsResult<Vec<AlertSegment>> {
        if flags.len() != times.len() {
            return Err(VitalsError::InvalidInput {
                reason: format!(
                    "{} flags but {} timestamps for channel {}",
                    flags.len(),
                    times.len(),
                    channel
                ),
            });
        }

        let mut segments = Vec::new();
        let mut run_start: Option<usize> = None;

        for (i, &flag) in flags.iter().enumerate() {
            match (flag, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    segments.push(AlertSegment::new(channel, start, i - 1, times[start], times[i - 1]));
                    run_start = None;
                }
                _ => {}
            }
        }

        if let Some(start) = run_start {
            let end = flags.len() - 1;
            segments.push(AlertSegment::new(channel, start, end, times[start], times[end]));
        }

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_become_segments() {
        let segmenter = RunSegmenter::new();
        let flags = [false, true, true, false, true];
        let times = [0.0, 1.0, 2.0, 3.0, 4.0];

        let segments = segmenter.segment(ChannelId::Spo2, &flags, &times).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!((segments[0].start_index, segments[0].end_index), (1, 2));
        assert_eq!((segments[0].start_time, segments[0].end_time), (1.0, 2.0));
        assert_eq!((segments[1].start_index, segments[1].end_index), (4, 4));
        assert_eq!(segments[1].duration(), 0.0);
    }

    #[test]
    fn test_time_gaps_do_not_split() {
        let segmenter = RunSegmenter::new();
        let segments = segmenter
            .segment(ChannelId::HeartRate, &[true, true], &[0.0, 3600.0])
            .unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].end_time, 3600.0);
    }

    #[test]
    fn test_no_flags() {
        let segmenter = RunSegmenter::new();
        assert!(segmenter.segment(ChannelId::Eeg, &[], &[]).unwrap().is_empty());
        assert!(segmenter
            .segment(ChannelId::Eeg, &[false, false], &[0.0, 1.0])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_segments_disjoint_and_ordered() {
        let segmenter = RunSegmenter::new();
        let flags: Vec<bool> = (0..50).map(|i| i % 7 < 3).collect();
        let times: Vec<f64> = (0..50).map(|i| i as f64 * 0.5).collect();
        let segments = segmenter.segment(ChannelId::Spo2, &flags, &times).unwrap();

        for w in segments.windows(2) {
            assert!(w[0].end_index + 1 < w[1].start_index);
        }
        let covered: usize = segments.iter().map(|s| s.sample_count()).sum();
        assert_eq!(covered, flags.iter().filter(|f| **f).count());
    }

    #[test]
    fn test_length_mismatch() {
        let segmenter = RunSegmenter::new();
        let err = segmenter.segment(ChannelId::Spo2, &[true], &[]).unwrap_err();
        assert!(matches!(err, VitalsError::InvalidInput { .. }));
    }
}
