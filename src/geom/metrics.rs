//! Opt-in timing hooks for the fairing rebuild pipeline.
//!
//! Timing is only collected when the `mesh_engine_metrics` feature is enabled
//! and the target is not WASM (`std::time::Instant` is unavailable there).
//! Otherwise every call compiles down to running the closure.
//!
//! ```ignore
//! let mut metrics = PipelineMetrics::default();
//! metrics.begin();
//! let scan = metrics.time(TimingBucket::Scan, || scanner.scan(&arena));
//! if let Some(report) = metrics.end() {
//!     println!("scan: {} ns", report.scan_ns);
//! }
//! ```

/// One stage of a rebuild pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Payload traversal and profile folding.
    Scan,
    /// Envelope fitting.
    Solve,
    /// Contour sampling.
    Contour,
    /// Wedge meshes and collision volumes across all sides.
    Mesh,
}

/// Cumulative nanoseconds per stage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TimingReport {
    pub scan_ns: u64,
    pub solve_ns: u64,
    pub contour_ns: u64,
    pub mesh_ns: u64,
}

impl TimingReport {
    #[must_use]
    pub fn total_ns(&self) -> u64 {
        self.scan_ns
            .saturating_add(self.solve_ns)
            .saturating_add(self.contour_ns)
            .saturating_add(self.mesh_ns)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }
}

#[derive(Debug, Default)]
pub struct PipelineMetrics {
    #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))]
    report: TimingReport,
}

impl PipelineMetrics {
    pub fn begin(&mut self) {
        #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))]
        {
            self.report = TimingReport::default();
        }
    }

    /// The accumulated report, or `None` when metrics are compiled out.
    #[must_use]
    pub fn end(&self) -> Option<TimingReport> {
        #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))]
        {
            Some(self.report.clone())
        }
        #[cfg(not(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32"))))]
        {
            None
        }
    }

    pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
        #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))]
        {
            let start = std::time::Instant::now();
            let result = f();
            let nanos = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
            let slot = match bucket {
                TimingBucket::Scan => &mut self.report.scan_ns,
                TimingBucket::Solve => &mut self.report.solve_ns,
                TimingBucket::Contour => &mut self.report.contour_ns,
                TimingBucket::Mesh => &mut self.report.mesh_ns,
            };
            *slot = slot.saturating_add(nanos);
            result
        }

        #[cfg(not(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32"))))]
        {
            let _ = bucket;
            f()
        }
    }
}
