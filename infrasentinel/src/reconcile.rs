//! View-state reconciler: decides which pushes and pulls may change what is on screen.
//!
//! Pushes go through `on_push`, which may suppress a process snapshot when the user
//! picked a sort order the server does not push in. Pulls are tagged with a
//! per-control ticket; only the latest ticket issued for a control may apply.

use tracing::{debug, info};

use crate::history::{SampleWindow, DEFAULT_RANGE};
use crate::types::{
    Alert, DockerSnapshot, MetricsPayload, ProcessList, PushMessage, PushPayload, Sample, SortKey,
};

/// Order the server pushes process snapshots in when the payload does not say.
/// The backend only exposes this implicitly (its broadcast loop sorts by cpu).
pub const DEFAULT_PUSH_ORDER: SortKey = SortKey::Cpu;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    History,
    Processes,
    Alerts,
    Docker,
}

/// Identifies one pull request for one control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullTicket {
    pub control: Control,
    pub id: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct PullSeq {
    issued: u64,
}

impl PullSeq {
    fn next(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    fn is_latest(&self, id: u64) -> bool {
        id == self.issued
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Applied,
    /// Process snapshot dropped because the user holds a different sort.
    Suppressed,
    Informational,
    Ignored,
}

#[derive(Debug)]
pub struct ViewState {
    window: SampleWindow,
    current: Option<MetricsPayload>,
    table: Option<ProcessList>,
    alerts: Vec<Alert>,
    docker: Option<DockerSnapshot>,
    sort: SortKey,
    last_update: Option<String>,
    /// Range asked for by the newest range change, with its history ticket id.
    pending_range: Option<(u64, usize)>,
    history_seq: PullSeq,
    process_seq: PullSeq,
    alerts_seq: PullSeq,
    docker_seq: PullSeq,
}

impl ViewState {
    pub fn new(range: usize) -> Self {
        Self {
            window: SampleWindow::new(range),
            current: None,
            table: None,
            alerts: Vec::new(),
            docker: None,
            sort: DEFAULT_PUSH_ORDER,
            last_update: None,
            pending_range: None,
            history_seq: PullSeq::default(),
            process_seq: PullSeq::default(),
            alerts_seq: PullSeq::default(),
            docker_seq: PullSeq::default(),
        }
    }

    // ---- read side (for the UI adapter) ----

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    /// Range the window is currently bounded to.
    pub fn range(&self) -> usize {
        self.window.capacity()
    }

    /// Range the next history fetch should ask for.
    pub fn requested_range(&self) -> usize {
        self.pending_range
            .map(|(_, r)| r)
            .unwrap_or_else(|| self.window.capacity())
    }

    pub fn current_metrics(&self) -> Option<&MetricsPayload> {
        self.current.as_ref()
    }

    pub fn processes(&self) -> Option<&ProcessList> {
        self.table.as_ref()
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn docker(&self) -> Option<&DockerSnapshot> {
        self.docker.as_ref()
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn last_update(&self) -> Option<&str> {
        self.last_update.as_deref()
    }

    // ---- push side ----

    pub fn on_push(&mut self, msg: PushMessage) -> PushOutcome {
        if let Some(ts) = msg.timestamp.as_ref() {
            self.last_update = Some(ts.clone());
        }
        match msg.payload {
            PushPayload::Metrics(m) => {
                let at = msg.timestamp.unwrap_or_default();
                self.window.push_one(Sample {
                    at,
                    cpu: m.cpu,
                    memory: m.memory,
                    disk: m.disk,
                });
                self.current = Some(m);
                PushOutcome::Applied
            }
            PushPayload::Processes(list) => {
                let pushed_order = list.sort_by.unwrap_or(DEFAULT_PUSH_ORDER);
                if self.sort == pushed_order {
                    self.table = Some(list);
                    PushOutcome::Applied
                } else {
                    debug!(
                        "process push ({}) suppressed, table held at sort={}",
                        pushed_order.as_str(),
                        self.sort.as_str()
                    );
                    PushOutcome::Suppressed
                }
            }
            PushPayload::Connected(greeting) => {
                info!("channel handshake: {greeting}");
                PushOutcome::Informational
            }
            PushPayload::Unrecognized(kind) => {
                debug!("ignoring push of unknown type {kind:?}");
                PushOutcome::Ignored
            }
        }
    }

    // ---- pull side: issue ----

    /// Records the new preference; the caller fetches processes under it.
    pub fn on_manual_sort_change(&mut self, sort: SortKey) -> PullTicket {
        self.sort = sort;
        self.refresh_processes()
    }

    pub fn refresh_processes(&mut self) -> PullTicket {
        PullTicket {
            control: Control::Processes,
            id: self.process_seq.next(),
        }
    }

    /// The caller fetches `requested_range()` samples. The window keeps its current
    /// bound (and pushes keep landing under it) until that fetch is applied.
    pub fn on_manual_range_change(&mut self, range: usize) -> PullTicket {
        let ticket = self.refresh_history();
        self.pending_range = Some((ticket.id, range.max(1)));
        ticket
    }

    pub fn refresh_history(&mut self) -> PullTicket {
        PullTicket {
            control: Control::History,
            id: self.history_seq.next(),
        }
    }

    pub fn refresh_alerts(&mut self) -> PullTicket {
        PullTicket {
            control: Control::Alerts,
            id: self.alerts_seq.next(),
        }
    }

    pub fn refresh_docker(&mut self) -> PullTicket {
        PullTicket {
            control: Control::Docker,
            id: self.docker_seq.next(),
        }
    }

    // ---- pull side: apply ----

    fn is_latest(&self, ticket: PullTicket) -> bool {
        let seq = match ticket.control {
            Control::History => &self.history_seq,
            Control::Processes => &self.process_seq,
            Control::Alerts => &self.alerts_seq,
            Control::Docker => &self.docker_seq,
        };
        let latest = seq.is_latest(ticket.id);
        if !latest {
            debug!("discarding superseded {:?} pull #{}", ticket.control, ticket.id);
        }
        latest
    }

    /// Manual pulls win regardless of sort preference. Returns whether it applied.
    pub fn apply_processes(&mut self, ticket: PullTicket, list: ProcessList) -> bool {
        if ticket.control != Control::Processes || !self.is_latest(ticket) {
            return false;
        }
        self.table = Some(list);
        true
    }

    /// `samples` must already be oldest-first.
    pub fn apply_history(&mut self, ticket: PullTicket, samples: Vec<Sample>) -> bool {
        if ticket.control != Control::History || !self.is_latest(ticket) {
            return false;
        }
        if let Some((id, range)) = self.pending_range {
            if id == ticket.id {
                self.window.set_capacity(range);
                self.pending_range = None;
            }
        }
        self.window.replace(samples);
        true
    }

    pub fn apply_alerts(&mut self, ticket: PullTicket, alerts: Vec<Alert>) -> bool {
        if ticket.control != Control::Alerts || !self.is_latest(ticket) {
            return false;
        }
        self.alerts = alerts;
        true
    }

    pub fn apply_docker(&mut self, ticket: PullTicket, snap: DockerSnapshot) -> bool {
        if ticket.control != Control::Docker || !self.is_latest(ticket) {
            return false;
        }
        self.docker = Some(snap);
        true
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_RANGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProcessRow;

    fn row(pid: u32, name: &str) -> ProcessRow {
        ProcessRow {
            pid,
            name: name.into(),
            cpu_percent: 1.0,
            memory_percent: 2.0,
            status: "running".into(),
            username: Some("root".into()),
        }
    }

    fn list(names: &[(u32, &str)]) -> ProcessList {
        ProcessList {
            processes: names.iter().map(|(p, n)| row(*p, n)).collect(),
            total_count: names.len(),
            sort_by: None,
        }
    }

    fn push(payload: PushPayload) -> PushMessage {
        PushMessage {
            payload,
            timestamp: Some("2024-05-01T10:00:00".into()),
        }
    }

    fn sample(cpu: f64) -> Sample {
        Sample {
            at: "2024-05-01T09:00:00".into(),
            cpu,
            memory: 0.0,
            disk: 0.0,
        }
    }

    #[test]
    fn process_push_suppressed_under_manual_sort() {
        let mut v = ViewState::default();
        let t = v.on_manual_sort_change(SortKey::Memory);
        assert!(v.apply_processes(t, list(&[(10, "by-mem")])));

        let out = v.on_push(push(PushPayload::Processes(list(&[(20, "by-cpu")]))));
        assert_eq!(out, PushOutcome::Suppressed);
        assert_eq!(v.processes().unwrap().processes[0].name, "by-mem");
    }

    #[test]
    fn process_push_applied_under_default_sort() {
        let mut v = ViewState::default();
        let pushed = list(&[(20, "a"), (21, "b")]);
        let out = v.on_push(push(PushPayload::Processes(pushed.clone())));
        assert_eq!(out, PushOutcome::Applied);
        assert_eq!(v.processes(), Some(&pushed));
    }

    #[test]
    fn process_push_with_explicit_order_matches_preference() {
        let mut v = ViewState::default();
        v.on_manual_sort_change(SortKey::Memory);
        let mut pushed = list(&[(5, "mem-order")]);
        pushed.sort_by = Some(SortKey::Memory);
        assert_eq!(v.on_push(push(PushPayload::Processes(pushed))), PushOutcome::Applied);
    }

    #[test]
    fn metrics_push_always_applies() {
        let mut v = ViewState::new(2);
        v.on_manual_sort_change(SortKey::Memory);
        for cpu in [1.0, 2.0, 3.0] {
            let m = MetricsPayload { cpu, memory: 5.0, disk: 6.0 };
            assert_eq!(v.on_push(push(PushPayload::Metrics(m))), PushOutcome::Applied);
        }
        assert_eq!(v.window().as_series().cpu, vec![2.0, 3.0]);
        assert_eq!(v.current_metrics().map(|m| m.cpu), Some(3.0));
        assert_eq!(v.last_update(), Some("2024-05-01T10:00:00"));
    }

    #[test]
    fn informational_and_unknown_pushes_mutate_nothing_but_timestamp() {
        let mut v = ViewState::default();
        assert_eq!(
            v.on_push(push(PushPayload::Connected("hello".into()))),
            PushOutcome::Informational
        );
        assert_eq!(
            v.on_push(push(PushPayload::Unrecognized("gpu".into()))),
            PushOutcome::Ignored
        );
        assert!(v.window().is_empty());
        assert!(v.processes().is_none());
        assert!(v.last_update().is_some());
    }

    #[test]
    fn superseded_history_pull_is_discarded() {
        let mut v = ViewState::default();
        let slow = v.on_manual_range_change(100);
        let fast = v.on_manual_range_change(20);
        assert!(v.apply_history(fast, vec![sample(1.0), sample(2.0)]));
        assert!(!v.apply_history(slow, vec![sample(9.0); 100]));
        assert_eq!(v.window().as_series().cpu, vec![1.0, 2.0]);
        assert_eq!(v.range(), 20);
    }

    fn metrics_push(cpu: f64) -> PushMessage {
        push(PushPayload::Metrics(MetricsPayload { cpu, memory: 0.0, disk: 0.0 }))
    }

    fn assert_bounded(v: &ViewState) {
        assert!(
            v.window().len() <= v.range(),
            "len {} > cap {}",
            v.window().len(),
            v.range()
        );
        assert_eq!(v.window().as_series().len(), v.window().len());
    }

    #[test]
    fn shrinking_range_keeps_window_bounded_until_fetch_lands() {
        let mut v = ViewState::new(50);
        for i in 0..50 {
            v.on_push(metrics_push(i as f64));
        }
        assert_eq!(v.window().len(), 50);

        let older = v.on_manual_range_change(100);
        let newer = v.on_manual_range_change(20);
        assert_eq!(v.requested_range(), 20);
        assert_eq!(v.range(), 50);
        assert_bounded(&v);

        // Pushes in between stay under the old bound
        v.on_push(metrics_push(50.0));
        assert_bounded(&v);
        assert_eq!(v.window().len(), 50);

        // Superseded fetch changes nothing
        assert!(!v.apply_history(older, (0..100).map(|i| sample(i as f64)).collect()));
        assert_eq!(v.range(), 50);
        assert_bounded(&v);

        // Latest fetch brings capacity and contents together
        assert!(v.apply_history(newer, (0..20).map(|i| sample(i as f64)).collect()));
        assert_eq!(v.range(), 20);
        assert_eq!(v.window().len(), 20);
        assert_eq!(v.requested_range(), 20);
        assert_bounded(&v);
    }

    #[test]
    fn failed_range_fetch_keeps_old_range() {
        let mut v = ViewState::new(50);
        for i in 0..50 {
            v.on_push(metrics_push(i as f64));
        }
        // Fetch for this ticket never arrives (transport error)
        let _lost = v.on_manual_range_change(20);
        for i in 0..10 {
            v.on_push(metrics_push(100.0 + i as f64));
            assert_bounded(&v);
        }
        assert_eq!(v.range(), 50);
        assert_eq!(v.window().len(), 50);
        assert_eq!(v.window().as_series().cpu.last(), Some(&109.0));
    }

    #[test]
    fn superseded_process_pull_is_discarded() {
        let mut v = ViewState::default();
        let first = v.on_manual_sort_change(SortKey::Memory);
        let second = v.on_manual_sort_change(SortKey::Cpu);
        assert!(v.apply_processes(second, list(&[(1, "cpu")])));
        assert!(!v.apply_processes(first, list(&[(2, "mem")])));
        assert_eq!(v.processes().unwrap().processes[0].name, "cpu");
    }

    #[test]
    fn tickets_do_not_cross_controls() {
        let mut v = ViewState::default();
        let h = v.refresh_history();
        let _p = v.refresh_processes();
        assert!(!v.apply_processes(h, list(&[(1, "x")])));
        assert!(v.processes().is_none());

        let a = v.refresh_alerts();
        assert!(v.apply_alerts(a, vec![]));
        let d1 = v.refresh_docker();
        let d2 = v.refresh_docker();
        assert!(!v.apply_docker(d1, DockerSnapshot::default()));
        assert!(v.apply_docker(d2, DockerSnapshot::default()));
    }

    #[test]
    fn manual_pull_wins_over_held_preference() {
        let mut v = ViewState::default();
        let t = v.on_manual_sort_change(SortKey::Memory);
        v.on_push(push(PushPayload::Processes(list(&[(3, "pushed")]))));
        assert!(v.processes().is_none());
        assert!(v.apply_processes(t, list(&[(4, "pulled")])));
        assert_eq!(v.processes().unwrap().processes[0].pid, 4);
    }
}
