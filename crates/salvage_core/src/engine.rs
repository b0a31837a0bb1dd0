//! Extraction engine: the operation state machine.
//!
//! `Idle → Running → (Completed | Aborted)`, re-enterable through `start`.
//! The engine advances exactly one fixed tick per `run_step` call and never
//! schedules anything on its own; all randomness comes from the injected Rng.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::config::{ConfigError, ConfigOverrides, SimulationConfig};
use crate::hazard::{add_hazard, check_threshold_events, HazardEffect, HazardState};
use crate::math::clamp_condition;
use crate::stance::scaled_duration;
use crate::{
    ActiveExtraction, CargoFit, CargoState, EngineStatus, EventEnvelope, EventId, EventLevel,
    ExtractionEvent, LootNode, NodeId, OperationOptions, Site, SkipReason, ToolsState,
};

/// Read-only view of an operation for the driving layer.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OperationSnapshot<'a> {
    pub site: &'a Site,
    pub cargo: &'a CargoState,
    pub options: &'a OperationOptions,
    pub status: EngineStatus,
    pub running: bool,
    pub tick: u64,
    pub elapsed_sec: f32,
    /// Accumulated noise·seconds, for detection layers.
    pub total_noise: f32,
    pub active: Option<&'a ActiveExtraction>,
    pub queue: &'a [NodeId],
}

enum Selection {
    Started,
    /// Queue head is waiting for cargo space.
    Holding,
    QueueEmpty,
}

pub struct ExtractionEngine<R> {
    site: Site,
    cargo: CargoState,
    tools: ToolsState,
    options: OperationOptions,
    config: SimulationConfig,
    rng: R,
    hazard_state: HazardState,
    queue: Vec<NodeId>,
    active: Option<ActiveExtraction>,
    status: EngineStatus,
    tick: u64,
    total_noise: f32,
    resolved: usize,
    next_event_id: u64,
}

impl<R: Rng> ExtractionEngine<R> {
    /// Binds a fresh operation to a site. Fails only on an invalid config.
    pub fn new(
        site: Site,
        cargo: CargoState,
        tools: ToolsState,
        options: OperationOptions,
        config: SimulationConfig,
        rng: R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            site,
            cargo,
            tools,
            options,
            config,
            rng,
            hazard_state: HazardState::default(),
            queue: Vec::new(),
            active: None,
            status: EngineStatus::Idle,
            tick: 0,
            total_noise: 0.0,
            resolved: 0,
            next_event_id: 0,
        })
    }

    /// `new` with `overrides` merged over `SimulationConfig::default()`.
    pub fn with_overrides(
        site: Site,
        cargo: CargoState,
        tools: ToolsState,
        options: OperationOptions,
        overrides: &ConfigOverrides,
        rng: R,
    ) -> Result<Self, ConfigError> {
        let config = SimulationConfig::default().with_overrides(overrides);
        Self::new(site, cargo, tools, options, config, rng)
    }

    // -----------------------------------------------------------------------
    // Queue management
    // -----------------------------------------------------------------------

    /// Appends nodes still present at the site. Unknown or already-queued ids
    /// are ignored. Returns how many were appended.
    pub fn enqueue(&mut self, node_ids: &[NodeId]) -> usize {
        let before = self.queue.len();
        for id in node_ids {
            if self.site.contains(id) && !self.queue.contains(id) {
                self.queue.push(id.clone());
            }
        }
        self.queue.len() - before
    }

    /// Moves one entry; `to` is clamped into bounds. No-op if `from` is out of range.
    pub fn reorder_queue(&mut self, from: usize, to: usize) {
        if from >= self.queue.len() {
            return;
        }
        let id = self.queue.remove(from);
        let to = to.min(self.queue.len());
        self.queue.insert(to, id);
    }

    /// Empties the queue. Cargo and the active extraction are untouched.
    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn queue(&self) -> &[NodeId] {
        &self.queue
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Enters `Running`. The first start on an unstabilized site with
    /// `auto_stabilize_volatiles` set pays the stabilization cost up front.
    pub fn start(&mut self, emit: &mut impl FnMut(EventEnvelope)) {
        if self.status == EngineStatus::Running {
            return;
        }
        self.status = EngineStatus::Running;
        info!(
            site = %self.site.id,
            queued = self.queue.len(),
            stance = ?self.options.stance,
            "operation started"
        );

        if self.options.auto_stabilize_volatiles && !self.site.stabilized_volatiles {
            self.stabilize(emit);
        }
    }

    /// Advances the operation by one tick. No-op unless running.
    pub fn run_step(&mut self, emit: &mut impl FnMut(EventEnvelope)) {
        if self.status != EngineStatus::Running {
            return;
        }
        self.advance_clock(emit);
        self.drop_vanished_active();

        if self.active.is_none() {
            match self.select_next(emit) {
                Selection::Started => {}
                Selection::Holding => return,
                Selection::QueueEmpty => {
                    self.complete(emit);
                    return;
                }
            }
        }

        let Some((item_hazard, item_noise)) = self.active_node().map(|node| {
            let modifiers = self.options.stance.modifiers();
            (
                node.base_hazard * modifiers.hazard_mult,
                node.base_noise * modifiers.noise_mult,
            )
        }) else {
            return;
        };
        self.tick_hazard(item_hazard, 0.0, item_noise, emit);

        // A threshold effect may have destroyed the node mid-extraction.
        if self.drop_vanished_active() {
            return;
        }
        self.advance_progress(emit);
    }

    /// Stops a running operation. Committed work and partial progress are kept.
    pub fn abort(&mut self, emit: &mut impl FnMut(EventEnvelope)) {
        if self.status != EngineStatus::Running {
            return;
        }
        self.status = EngineStatus::Aborted;
        info!(site = %self.site.id, remaining = self.queue.len(), "operation aborted");
        self.emit(
            emit,
            ExtractionEvent::Aborted {
                message: format!("Operation aborted with {} item(s) queued", self.queue.len()),
            },
        );
    }

    // -----------------------------------------------------------------------
    // Snapshots and external mutation entry points
    // -----------------------------------------------------------------------

    pub fn state(&self) -> OperationSnapshot<'_> {
        OperationSnapshot {
            site: &self.site,
            cargo: &self.cargo,
            options: &self.options,
            status: self.status,
            running: self.is_running(),
            tick: self.tick,
            elapsed_sec: self.elapsed_sec(),
            total_noise: self.total_noise,
            active: self.active.as_ref(),
            queue: &self.queue,
        }
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == EngineStatus::Running
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn cargo(&self) -> &CargoState {
        &self.cargo
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn hazard_state(&self) -> &HazardState {
        &self.hazard_state
    }

    pub fn active(&self) -> Option<&ActiveExtraction> {
        self.active.as_ref()
    }

    pub fn elapsed_sec(&self) -> f32 {
        self.tick as f32 / self.config.tick_rate_hz
    }

    /// Frees hold space, e.g. after the session jettisons or sells cargo.
    pub fn unload_cargo(&mut self, mass_kg: f32, volume_m3: f32) {
        self.cargo.unload(mass_kg, volume_m3);
    }

    /// Takes up hold space from outside the operation, e.g. cargo bought at the site.
    pub fn load_cargo(&mut self, mass_kg: f32, volume_m3: f32) {
        self.cargo.load(mass_kg, volume_m3);
    }

    pub fn set_tools(&mut self, tools: ToolsState) {
        self.tools = tools;
    }

    /// Hands the site and cargo back to the session.
    pub fn into_parts(self) -> (Site, CargoState) {
        (self.site, self.cargo)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn emit(&mut self, sink: &mut impl FnMut(EventEnvelope), event: ExtractionEvent) {
        let id = EventId(format!("evt_{:06}", self.next_event_id));
        self.next_event_id += 1;
        sink(EventEnvelope {
            id,
            tick: self.tick,
            time_sec: self.elapsed_sec(),
            event,
        });
    }

    fn advance_clock(&mut self, emit: &mut impl FnMut(EventEnvelope)) {
        self.tick += 1;
        if self.options.event_level == EventLevel::Debug {
            let hazard = self.site.hazard;
            self.emit(emit, ExtractionEvent::Tick { hazard });
        }
    }

    fn stabilize(&mut self, emit: &mut impl FnMut(EventEnvelope)) {
        self.site.stabilized_volatiles = true;
        let ticks = self.config.ticks_for(self.config.stabilize_time_sec);
        debug!(site = %self.site.id, ticks, "stabilizing volatiles");
        self.emit(
            emit,
            ExtractionEvent::StabilizedVolatiles {
                message: format!(
                    "Volatiles stabilized ({:.1}s)",
                    self.config.stabilize_time_sec
                ),
            },
        );

        let noise = self.config.stabilize_noise_per_sec;
        for _ in 0..ticks {
            self.advance_clock(emit);
            self.tick_hazard(0.0, noise, 0.0, emit);
        }
    }

    /// One tick of hazard growth plus threshold resolution.
    ///
    /// Only ambient and stabilization noise feed hazard. Item noise is
    /// detection-facing and lands in `total_noise` alone.
    fn tick_hazard(
        &mut self,
        item_hazard: f32,
        stabilize_noise: f32,
        item_noise: f32,
        emit: &mut impl FnMut(EventEnvelope),
    ) {
        let dt = self.config.tick_dt();
        let site_noise = self.site.ambient_noise + stabilize_noise;
        self.total_noise += (site_noise + item_noise) * dt;
        let amount = dt * (item_hazard + site_noise * self.config.noise_hazard_factor);
        add_hazard(&mut self.site, amount, &self.config);
        trace!(
            tick = self.tick,
            hazard = self.site.hazard,
            site_noise,
            item_noise,
            "hazard tick"
        );

        let mut effects = Vec::new();
        check_threshold_events(
            &mut self.site,
            &mut self.hazard_state,
            &self.config,
            &mut self.rng,
            &mut effects,
        );
        for effect in effects {
            let event = match effect {
                HazardEffect::Threshold { threshold, hazard } => {
                    info!(threshold, hazard, "hazard threshold crossed");
                    ExtractionEvent::HazardThreshold { threshold, hazard }
                }
                HazardEffect::Damaged {
                    node,
                    amount,
                    message,
                } => ExtractionEvent::NodeDamaged {
                    node,
                    amount,
                    message,
                },
                HazardEffect::Destroyed { node, message } => {
                    debug!(node = %node.id, "node destroyed");
                    ExtractionEvent::NodeDestroyed { node, message }
                }
                HazardEffect::Stalled {
                    node_id,
                    added_sec,
                    message,
                } => ExtractionEvent::ItemStalled {
                    node_id,
                    added_sec,
                    message,
                },
            };
            self.emit(emit, event);
        }
    }

    fn active_node(&self) -> Option<&LootNode> {
        self.active
            .as_ref()
            .and_then(|active| self.site.node(&active.node_id))
    }

    /// Clears the active extraction if its node is gone from the site.
    /// The stale queue entry is dropped silently on the next selection.
    fn drop_vanished_active(&mut self) -> bool {
        let vanished = self
            .active
            .as_ref()
            .is_some_and(|active| !self.site.contains(&active.node_id));
        if vanished {
            self.active = None;
        }
        vanished
    }

    fn select_next(&mut self, emit: &mut impl FnMut(EventEnvelope)) -> Selection {
        loop {
            let Some(head) = self.queue.first().cloned() else {
                return Selection::QueueEmpty;
            };
            let Some(node) = self.site.node(&head).cloned() else {
                self.queue.remove(0);
                continue;
            };

            if let Some(tool) = node.requires_tool {
                if !self.tools.has(tool) {
                    self.skip(node, SkipReason::MissingTool(tool), emit);
                    continue;
                }
            }

            match self.cargo.fit(node.mass_kg, node.volume_m3) {
                CargoFit::Fits => {}
                CargoFit::NeedsSpace if self.options.wait_for_space => {
                    trace!(node = %node.id, "holding for cargo space");
                    return Selection::Holding;
                }
                CargoFit::NeedsSpace => {
                    self.skip(node, SkipReason::CargoFull, emit);
                    continue;
                }
                CargoFit::ExceedsCapacity => {
                    self.skip(node, SkipReason::ExceedsCapacity, emit);
                    continue;
                }
            }

            let total_sec =
                scaled_duration(node.extract_time_sec, self.options.stance, &self.config);
            let queue_index = self.resolved;
            debug!(node = %node.id, total_sec, "extraction started");
            self.active = Some(ActiveExtraction {
                node_id: node.id.clone(),
                queue_index,
                total_sec,
                ticks: 0,
                progress: 0.0,
                reported_bucket: 0,
            });
            self.emit(
                emit,
                ExtractionEvent::ItemStarted {
                    node,
                    queue_index,
                    total_sec,
                },
            );
            return Selection::Started;
        }
    }

    fn skip(&mut self, node: LootNode, reason: SkipReason, emit: &mut impl FnMut(EventEnvelope)) {
        self.remove_from_queue(&node.id);
        let queue_index = self.resolved;
        self.resolved += 1;
        debug!(node = %node.id, %reason, "item skipped");
        let message = format!("Skipped {}: {reason}", node.name);
        self.emit(
            emit,
            ExtractionEvent::ItemSkipped {
                node,
                queue_index,
                reason,
                message,
            },
        );
    }

    fn remove_from_queue(&mut self, id: &NodeId) {
        if let Some(position) = self.queue.iter().position(|queued| queued == id) {
            self.queue.remove(position);
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn advance_progress(&mut self, emit: &mut impl FnMut(EventEnvelope)) {
        let reports = self.config.progress_reports_per_item;
        let tick_rate = self.config.tick_rate_hz;
        let stance = self.options.stance;

        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(node) = self.site.node(&active.node_id) else {
            return;
        };
        active.total_sec = scaled_duration(node.extract_time_sec, stance, &self.config);
        active.ticks += 1;
        let elapsed = active.ticks as f32 / tick_rate;
        active.progress = (elapsed / active.total_sec).clamp(0.0, 1.0);

        let report = if reports == 0 {
            true
        } else {
            let bucket = (active.progress * reports as f32).floor() as u32;
            let crossed = bucket > active.reported_bucket;
            if crossed {
                active.reported_bucket = bucket;
            }
            crossed
        };
        let node_id = active.node_id.clone();
        let progress = active.progress;

        if report {
            self.emit(emit, ExtractionEvent::ItemProgress { node_id, progress });
        }
        if progress >= 1.0 {
            self.finish_active(emit);
        }
    }

    fn finish_active(&mut self, emit: &mut impl FnMut(EventEnvelope)) {
        let Some(active) = self.active.take() else {
            return;
        };
        let Some(node) = self.site.node(&active.node_id).cloned() else {
            return;
        };

        // Hold space can be taken through `load_cargo` while the item is worked.
        match self.cargo.fit(node.mass_kg, node.volume_m3) {
            CargoFit::Fits => {}
            CargoFit::NeedsSpace => {
                self.skip(node, SkipReason::CargoFull, emit);
                return;
            }
            CargoFit::ExceedsCapacity => {
                self.skip(node, SkipReason::ExceedsCapacity, emit);
                return;
            }
        }

        let Some(mut node) = self.site.remove_node(&active.node_id) else {
            return;
        };
        node.condition =
            clamp_condition(node.condition + self.options.stance.modifiers().condition_delta);
        self.cargo.load(node.mass_kg, node.volume_m3);
        self.remove_from_queue(&node.id);
        self.resolved += 1;
        info!(
            node = %node.id,
            mass_kg = node.mass_kg,
            used_mass_kg = self.cargo.used_mass_kg,
            "item transferred"
        );
        self.emit(
            emit,
            ExtractionEvent::ItemTransferred {
                node,
                queue_index: active.queue_index,
            },
        );
    }

    fn complete(&mut self, emit: &mut impl FnMut(EventEnvelope)) {
        self.status = EngineStatus::Completed;
        info!(
            site = %self.site.id,
            elapsed_sec = self.elapsed_sec(),
            exhausted = self.site.exhausted,
            "operation completed"
        );
        self.emit(
            emit,
            ExtractionEvent::Completed {
                message: format!("Queue exhausted after {:.1}s", self.elapsed_sec()),
            },
        );
    }
}
