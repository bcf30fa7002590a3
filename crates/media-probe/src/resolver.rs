//! Concurrent batch resolution of segment durations.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use tilawa_project_model::{DurationState, Segment};

use crate::probe::DurationProbe;

/// Outcome of probing one segment's audio asset.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Resolved { seconds: f64 },
    Failed { reason: String },
}

impl ProbeOutcome {
    /// Duration this outcome contributes to the timeline. Failures
    /// contribute zero rather than blocking the build.
    pub fn seconds(&self) -> f64 {
        match self {
            ProbeOutcome::Resolved { seconds } => *seconds,
            ProbeOutcome::Failed { .. } => 0.0,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ProbeOutcome::Resolved { .. })
    }
}

/// Per-segment outcomes of one resolution batch, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationReport {
    outcomes: Vec<ProbeOutcome>,
}

impl DurationReport {
    pub fn outcomes(&self) -> &[ProbeOutcome] {
        &self.outcomes
    }

    pub fn resolved_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_resolved()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.resolved_count()
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.failed_count() == 0
    }

    /// Failed segments as (index, reason) pairs for diagnostics.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &str)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(i, o)| match o {
                ProbeOutcome::Failed { reason } => Some((i, reason.as_str())),
                ProbeOutcome::Resolved { .. } => None,
            })
    }

    /// Write durations and diagnostic states back onto a segment list.
    ///
    /// The list must be the one the batch was issued for; extra
    /// segments are left untouched.
    pub fn apply(&self, segments: &mut [Segment]) {
        for (segment, outcome) in segments.iter_mut().zip(&self.outcomes) {
            match outcome {
                ProbeOutcome::Resolved { seconds } => {
                    segment.duration_secs = *seconds;
                    segment.duration_state = DurationState::Resolved;
                }
                ProbeOutcome::Failed { .. } => {
                    segment.duration_secs = 0.0;
                    segment.duration_state = DurationState::Failed;
                }
            }
        }
    }
}

/// Progress callback for batch resolution: (completed, total).
pub type ProbeProgressCallback = Box<dyn Fn(usize, usize) + Send>;

/// Resolve the durations of all segments concurrently.
///
/// One probe task per segment is spawned up front and the whole batch is
/// awaited together, so wall-clock cost is bounded by the slowest single
/// probe (capped by `timeout`). Outcomes come back in input order.
/// Failures and timeouts degrade to zero-duration outcomes; this
/// function never fails as a whole.
pub async fn resolve_durations(
    segments: &[Segment],
    probe: Arc<dyn DurationProbe>,
    timeout: Duration,
    progress: Option<ProbeProgressCallback>,
) -> DurationReport {
    let total = segments.len();
    let mut outcomes: Vec<ProbeOutcome> = vec![
        ProbeOutcome::Failed {
            reason: "probe did not complete".to_string(),
        };
        total
    ];

    if total == 0 {
        return DurationReport { outcomes };
    }

    tracing::info!(segments = total, probe = probe.name(), "Resolving segment durations");

    let mut tasks = JoinSet::new();
    for (index, segment) in segments.iter().enumerate() {
        let audio = segment.audio.clone();
        let probe = probe.clone();
        tasks.spawn(async move {
            if audio.is_empty() {
                return (index, Err("segment has no audio reference".to_string()));
            }
            match tokio::time::timeout(timeout, probe.probe(&audio)).await {
                Ok(Ok(seconds)) if seconds.is_finite() && seconds >= 0.0 => (index, Ok(seconds)),
                Ok(Ok(seconds)) => (index, Err(format!("probe returned invalid duration {seconds}"))),
                Ok(Err(err)) => (index, Err(err.to_string())),
                Err(_) => (index, Err(format!("probe timed out after {timeout:?}"))),
            }
        });
    }

    let mut completed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(seconds))) => {
                outcomes[index] = ProbeOutcome::Resolved { seconds };
            }
            Ok((index, Err(reason))) => {
                tracing::warn!(segment = index, reason = %reason, "Duration probe failed");
                outcomes[index] = ProbeOutcome::Failed { reason };
            }
            Err(err) => {
                // The task index is lost on a panic; the placeholder
                // outcome already marks the segment as unresolved.
                tracing::warn!(error = %err, "Duration probe task aborted");
            }
        }
        completed += 1;
        if let Some(cb) = &progress {
            cb(completed, total);
        }
    }

    tracing::info!(
        resolved = outcomes.iter().filter(|o| o.is_resolved()).count(),
        failed = outcomes.iter().filter(|o| !o.is_resolved()).count(),
        "Duration resolution batch complete"
    );

    DurationReport { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use tilawa_common::error::{TilawaError, TilawaResult};
    use tilawa_project_model::{build_timeline, AudioRef};

    /// Probe that answers from a fixed table, optionally with a delay.
    struct TableProbe {
        durations: HashMap<String, f64>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl TableProbe {
        fn new(entries: &[(&str, f64)]) -> Self {
            Self {
                durations: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect(),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl DurationProbe for TableProbe {
        async fn probe(&self, audio: &AudioRef) -> TilawaResult<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.durations
                .get(audio.as_str())
                .copied()
                .ok_or_else(|| TilawaError::probe(format!("unknown asset {audio}")))
        }

        fn name(&self) -> &str {
            "table"
        }
    }

    fn segment(audio: &str) -> Segment {
        Segment::new(1, 1, 1, "text", audio)
    }

    #[tokio::test]
    async fn test_batch_resolves_in_input_order() {
        let probe = Arc::new(TableProbe::new(&[("a.mp3", 5.0), ("b.mp3", 3.0)]));
        let segments = vec![segment("a.mp3"), segment("b.mp3")];

        let report =
            resolve_durations(&segments, probe, Duration::from_secs(5), None).await;

        assert_eq!(
            report.outcomes(),
            &[
                ProbeOutcome::Resolved { seconds: 5.0 },
                ProbeOutcome::Resolved { seconds: 3.0 },
            ]
        );
        assert!(report.is_fully_resolved());
    }

    #[tokio::test]
    async fn test_failure_degrades_to_zero() {
        let probe = Arc::new(TableProbe::new(&[("a.mp3", 5.0)]));
        let segments = vec![segment("a.mp3"), segment("missing.mp3")];

        let report =
            resolve_durations(&segments, probe, Duration::from_secs(5), None).await;

        assert_eq!(report.resolved_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.outcomes()[1].seconds(), 0.0);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures[0].0, 1);
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_zero() {
        let probe = Arc::new(
            TableProbe::new(&[("slow.mp3", 9.0)]).with_delay(Duration::from_millis(200)),
        );
        let segments = vec![segment("slow.mp3")];

        let report =
            resolve_durations(&segments, probe, Duration::from_millis(10), None).await;

        assert_eq!(report.resolved_count(), 0);
        assert_eq!(report.outcomes()[0].seconds(), 0.0);
    }

    #[tokio::test]
    async fn test_empty_audio_reference_is_flagged() {
        let probe = Arc::new(TableProbe::new(&[]));
        let segments = vec![segment("")];

        let report =
            resolve_durations(&segments, probe.clone(), Duration::from_secs(1), None).await;

        assert_eq!(report.failed_count(), 1);
        // No probe call should have been made for an empty reference.
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_progress_reports_every_completion() {
        let probe = Arc::new(TableProbe::new(&[("a.mp3", 1.0), ("b.mp3", 2.0), ("c.mp3", 3.0)]));
        let segments = vec![segment("a.mp3"), segment("b.mp3"), segment("c.mp3")];

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let report = resolve_durations(
            &segments,
            probe,
            Duration::from_secs(5),
            Some(Box::new(move |done, total| {
                seen_cb.lock().unwrap().push((done, total));
            })),
        )
        .await;

        assert!(report.is_fully_resolved());
        assert_eq!(seen.lock().unwrap().as_slice(), &[(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_apply_and_rebuild_keeps_invariants() {
        let probe = Arc::new(TableProbe::new(&[("a.mp3", 5.0), ("c.mp3", 3.0)]));
        let mut segments = vec![segment("a.mp3"), segment("broken.mp3"), segment("c.mp3")];

        let report =
            resolve_durations(&segments, probe, Duration::from_secs(5), None).await;
        report.apply(&mut segments);

        assert_eq!(segments[0].duration_state, DurationState::Resolved);
        assert_eq!(segments[1].duration_state, DurationState::Failed);
        assert_eq!(segments[1].duration_secs, 0.0);

        let timeline = build_timeline(segments, 1.0);
        assert_eq!(timeline.segment(1).unwrap().start_secs, 6.0);
        assert_eq!(timeline.segment(2).unwrap().start_secs, 7.0);
        assert_eq!(timeline.total_duration(), 10.0);
    }

    #[tokio::test]
    async fn test_re_resolution_is_idempotent() {
        let probe = Arc::new(TableProbe::new(&[("a.mp3", 5.0), ("b.mp3", 3.0)]));
        let segments = vec![segment("a.mp3"), segment("b.mp3")];

        let first =
            resolve_durations(&segments, probe.clone(), Duration::from_secs(5), None).await;
        let second =
            resolve_durations(&segments, probe, Duration::from_secs(5), None).await;

        assert_eq!(first, second);
    }
}
