//! Server metrics: a small set of atomics covering connection, queue, match,
//! spectate, and signaling activity, exposed as Prometheus text.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters and gauges for the hub. Every field is a plain atomic; there is
/// no locking and no histogram machinery, unlike the much larger metrics
/// surface a full game-room server would carry.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    pub active_connections: AtomicU64,
    pub bound_sessions: AtomicU64,
    pub queue_depth: AtomicU64,
    pub matches_created: AtomicU64,
    pub matches_resolved_consistent: AtomicU64,
    pub matches_resolved_cancel: AtomicU64,
    pub matches_resolved_disputed: AtomicU64,
    pub spectate_rooms_active: AtomicU64,
    pub signaling_frames_relayed: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn session_bound(&self) {
        self.bound_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_unbound(&self) {
        self.bound_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn set_queue_depth(&self, depth: u64) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    pub fn match_created(&self) {
        self.matches_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn match_resolved(&self, outcome: crate::protocol::MatchOutcome) {
        use crate::protocol::MatchOutcome::{Cancel, Consistent, Disputed};
        match outcome {
            Consistent => self.matches_resolved_consistent.fetch_add(1, Ordering::Relaxed),
            Cancel => self.matches_resolved_cancel.fetch_add(1, Ordering::Relaxed),
            Disputed => self.matches_resolved_disputed.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn spectate_room_opened(&self) {
        self.spectate_rooms_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn spectate_room_closed(&self) {
        self.spectate_rooms_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn signal_relayed(&self) {
        self.signaling_frames_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_connections: self.active_connections.load(Ordering::Relaxed),
            bound_sessions: self.bound_sessions.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            matches_created: self.matches_created.load(Ordering::Relaxed),
            matches_resolved_consistent: self.matches_resolved_consistent.load(Ordering::Relaxed),
            matches_resolved_cancel: self.matches_resolved_cancel.load(Ordering::Relaxed),
            matches_resolved_disputed: self.matches_resolved_disputed.load(Ordering::Relaxed),
            spectate_rooms_active: self.spectate_rooms_active.load(Ordering::Relaxed),
            signaling_frames_relayed: self.signaling_frames_relayed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub active_connections: u64,
    pub bound_sessions: u64,
    pub queue_depth: u64,
    pub matches_created: u64,
    pub matches_resolved_consistent: u64,
    pub matches_resolved_cancel: u64,
    pub matches_resolved_disputed: u64,
    pub spectate_rooms_active: u64,
    pub signaling_frames_relayed: u64,
}

/// Render a snapshot into Prometheus text exposition format.
pub fn render_prometheus_metrics(snapshot: &MetricsSnapshot) -> String {
    use std::fmt::Write;

    fn gauge(buf: &mut String, name: &str, help: &str, value: u64) {
        let _ = writeln!(buf, "# HELP {name} {help}");
        let _ = writeln!(buf, "# TYPE {name} gauge");
        let _ = writeln!(buf, "{name} {value}");
    }

    fn counter(buf: &mut String, name: &str, help: &str, value: u64) {
        let _ = writeln!(buf, "# HELP {name} {help}");
        let _ = writeln!(buf, "# TYPE {name} counter");
        let _ = writeln!(buf, "{name} {value}");
    }

    let mut buf = String::new();
    gauge(&mut buf, "card_hub_active_connections", "Currently open WebSocket connections", snapshot.active_connections);
    gauge(&mut buf, "card_hub_bound_sessions", "Connections bound to an authenticated user", snapshot.bound_sessions);
    gauge(&mut buf, "card_hub_queue_depth", "Users currently waiting in the matchmaking queue", snapshot.queue_depth);
    counter(&mut buf, "card_hub_matches_created_total", "Matches created", snapshot.matches_created);
    counter(
        &mut buf,
        "card_hub_matches_resolved_consistent_total",
        "Matches resolved with a consistent win/lose report",
        snapshot.matches_resolved_consistent,
    );
    counter(
        &mut buf,
        "card_hub_matches_resolved_cancel_total",
        "Matches resolved by mutual cancel",
        snapshot.matches_resolved_cancel,
    );
    counter(
        &mut buf,
        "card_hub_matches_resolved_disputed_total",
        "Matches resolved as disputed",
        snapshot.matches_resolved_disputed,
    );
    gauge(&mut buf, "card_hub_spectate_rooms_active", "Currently active spectate rooms", snapshot.spectate_rooms_active);
    counter(
        &mut buf,
        "card_hub_signaling_frames_relayed_total",
        "WebRTC signaling frames relayed",
        snapshot.signaling_frames_relayed,
    );
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let metrics = ServerMetrics::new();
        metrics.connection_opened();
        metrics.connection_opened();
        metrics.connection_closed();
        metrics.match_created();
        metrics.match_resolved(crate::protocol::MatchOutcome::Consistent);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_connections, 1);
        assert_eq!(snapshot.matches_created, 1);
        assert_eq!(snapshot.matches_resolved_consistent, 1);
    }

    #[test]
    fn prometheus_rendering_includes_help_and_type_lines() {
        let metrics = ServerMetrics::new();
        metrics.connection_opened();
        let rendered = render_prometheus_metrics(&metrics.snapshot());
        assert!(rendered.contains("# HELP card_hub_active_connections"));
        assert!(rendered.contains("# TYPE card_hub_active_connections gauge"));
        assert!(rendered.contains("card_hub_active_connections 1"));
    }
}
