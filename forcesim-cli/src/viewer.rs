//! Interactive layout window
//!
//! Steps the simulation once per frame, draws the latest observed frame and
//! turns pointer drags into drag sessions. The graph file is watched and
//! reloaded on change.

use eframe::egui::{self, Color32, Pos2, Sense, Stroke};
use forcesim_core::{
    invalidation, DragController, Frame, GraphData, GroupTag, Invalidation, LinkSegment, Phase,
    Simulation, SimulationConfig,
};
use glam::DVec2;
use notify::{Event, RecommendedWatcher, Watcher};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc;

/// d3 category10
const PALETTE: [Color32; 10] = [
    Color32::from_rgb(0x1f, 0x77, 0xb4),
    Color32::from_rgb(0xff, 0x7f, 0x0e),
    Color32::from_rgb(0x2c, 0xa0, 0x2c),
    Color32::from_rgb(0xd6, 0x27, 0x28),
    Color32::from_rgb(0x94, 0x67, 0xbd),
    Color32::from_rgb(0x8c, 0x56, 0x4b),
    Color32::from_rgb(0xe3, 0x77, 0xc2),
    Color32::from_rgb(0x7f, 0x7f, 0x7f),
    Color32::from_rgb(0xbc, 0xbd, 0x22),
    Color32::from_rgb(0x17, 0xbe, 0xcf),
];

const NODE_RADIUS: f32 = 5.0;
/// Screen distance within which a press grabs a node
const PICK_RADIUS: f32 = 12.0;

struct SceneNode {
    id: String,
    pos: DVec2,
    color: Color32,
    pinned: bool,
}

/// Last frame seen by the tick observer
#[derive(Default)]
struct Scene {
    step: u64,
    alpha: f64,
    nodes: Vec<SceneNode>,
    links: Vec<LinkSegment>,
    /// Groups in order of first appearance; the position picks the color
    groups: Vec<GroupTag>,
}

impl Scene {
    fn capture(&mut self, frame: &Frame<'_>) {
        self.step = frame.step;
        self.alpha = frame.alpha;
        self.links.clear();
        self.links.extend(frame.links());

        let mut nodes = std::mem::take(&mut self.nodes);
        nodes.clear();
        for node in frame.nodes() {
            nodes.push(SceneNode {
                id: node.id.to_string(),
                pos: node.pos,
                color: self.color_for(node.group),
                pinned: node.pinned,
            });
        }
        self.nodes = nodes;
    }

    fn color_for(&mut self, group: Option<&GroupTag>) -> Color32 {
        let Some(group) = group else {
            return PALETTE[0];
        };
        let slot = match self.groups.iter().position(|g| g == group) {
            Some(slot) => slot,
            None => {
                self.groups.push(group.clone());
                self.groups.len() - 1
            }
        };
        PALETTE[slot % PALETTE.len()]
    }
}

/// Maps world coordinates around the center force target onto the canvas
#[derive(Clone, Copy)]
struct Transform {
    origin: Pos2,
    center: DVec2,
}

impl Transform {
    fn to_screen(self, world: DVec2) -> Pos2 {
        let offset = world - self.center;
        self.origin + egui::vec2(offset.x as f32, offset.y as f32)
    }

    fn to_world(self, screen: Pos2) -> DVec2 {
        let offset = screen - self.origin;
        self.center + DVec2::new(offset.x as f64, offset.y as f64)
    }
}

pub struct ViewerApp {
    source_path: PathBuf,
    config: SimulationConfig,
    data: Option<GraphData>,
    sim: Option<Simulation>,
    invalidation: Option<Invalidation>,
    scene: Rc<RefCell<Scene>>,
    drag: DragController,
    dragged: Option<String>,
    last_load_error: Option<String>,
    playing: bool,
    #[allow(dead_code)] // Kept alive to maintain file watching
    file_watcher: Option<RecommendedWatcher>,
    file_receiver: mpsc::Receiver<notify::Result<Event>>,
}

impl ViewerApp {
    pub fn new(
        source_path: PathBuf,
        config: SimulationConfig,
        _cc: &eframe::CreationContext<'_>,
    ) -> Self {
        Self::open(source_path, config)
    }

    /// Watch and load `source_path`
    fn open(source_path: PathBuf, config: SimulationConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            // The receiver is gone during shutdown
            let _ = tx.send(res);
        })
        .ok();

        if let Some(w) = watcher.as_mut() {
            if let Err(e) = w.watch(&source_path, notify::RecursiveMode::NonRecursive) {
                tracing::warn!("not watching {}: {}", source_path.display(), e);
            }
        }

        let mut app = Self {
            source_path,
            config,
            data: None,
            sim: None,
            invalidation: None,
            scene: Rc::default(),
            drag: DragController::new(),
            dragged: None,
            last_load_error: None,
            playing: true,
            file_watcher: watcher,
            file_receiver: rx,
        };
        app.reload_file();
        app
    }

    fn reload_file(&mut self) {
        match GraphData::from_json_file(&self.source_path) {
            Ok(data) => {
                self.data = Some(data);
                self.reset();
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    /// Replace the running simulation with a fresh one over the loaded data
    fn reset(&mut self) {
        if let Some(handle) = self.invalidation.take() {
            handle.fire();
        }
        self.drag = DragController::new();
        self.dragged = None;

        let Some(data) = self.data.as_ref() else {
            return;
        };

        let (handle, signal) = invalidation();
        let scene = Rc::clone(&self.scene);
        match Simulation::new(data, self.config.clone()) {
            Ok(sim) => {
                let sim = sim
                    .with_invalidation(signal)
                    .on_tick(move |frame: &Frame<'_>| scene.borrow_mut().capture(frame));
                *self.scene.borrow_mut() = Scene::default();
                self.scene.borrow_mut().capture(&sim.frame());
                tracing::info!(
                    nodes = sim.graph().len(),
                    links = sim.graph().links.len(),
                    "graph loaded"
                );
                self.sim = Some(sim);
                self.invalidation = Some(handle);
                self.last_load_error = None;
                self.playing = true;
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn fail(&mut self, error: String) {
        tracing::warn!("load failed: {}", error);
        self.last_load_error = Some(error);
        self.sim = None;
        self.playing = false;
    }

    fn check_file_changes(&mut self) {
        let mut changed = false;
        while let Ok(event) = self.file_receiver.try_recv() {
            match event {
                Ok(Event {
                    kind: notify::EventKind::Modify(_),
                    paths,
                    ..
                }) => {
                    changed |= paths
                        .iter()
                        .any(|p| p.ends_with(&self.source_path) || self.source_path.ends_with(p));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("file watcher error: {}", e),
            }
        }
        if changed {
            tracing::debug!("{} changed, reloading", self.source_path.display());
            self.reload_file();
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button(if self.playing { "⏸ Pause" } else { "▶ Play" }).clicked() {
                self.playing = !self.playing;
            }

            if ui.button("⏭ Step").clicked() {
                if let Some(sim) = self.sim.as_mut() {
                    sim.tick();
                }
            }

            if ui.button("🔥 Reheat").clicked() {
                if let Some(sim) = self.sim.as_mut() {
                    sim.set_alpha(1.0);
                }
            }

            if ui.button("⏮ Reset").clicked() {
                self.reset();
            }

            ui.separator();

            let scene = self.scene.borrow();
            ui.label(format!("Step: {}", scene.step));
            ui.label(format!("Alpha: {:.4}", scene.alpha));
            if let Some(sim) = self.sim.as_ref() {
                ui.label(format!("{:?}", sim.phase()));
            }
        });
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::drag());
        let transform = Transform {
            origin: response.rect.center(),
            center: DVec2::new(self.config.center.x, self.config.center.y),
        };

        if let Some(sim) = self.sim.as_mut() {
            if response.drag_started() {
                if let Some(pointer) = response.interact_pointer_pos() {
                    let world = transform.to_world(pointer);
                    let hit = sim.find(world, Some(PICK_RADIUS as f64)).map(|n| n.id().to_string());
                    if let Some(id) = hit {
                        if self.drag.begin(sim, &id, world).is_ok() {
                            self.dragged = Some(id);
                        }
                    }
                }
            }

            if response.dragged() {
                let pointer = response.interact_pointer_pos();
                if let (Some(id), Some(pointer)) = (self.dragged.as_deref(), pointer) {
                    let _ = self.drag.drag(sim, id, transform.to_world(pointer));
                }
            }

            if response.drag_stopped() {
                if let Some(id) = self.dragged.take() {
                    let _ = self.drag.end(sim, &id);
                }
            }
        }

        let scene = self.scene.borrow();
        let link_color = Color32::from_rgba_unmultiplied(0x99, 0x99, 0x99, 0x99);
        for link in &scene.links {
            painter.line_segment(
                [transform.to_screen(link.source), transform.to_screen(link.target)],
                Stroke::new(link.value.max(0.0).sqrt() as f32, link_color),
            );
        }

        for node in scene.nodes.iter().filter(|n| n.pos.is_finite()) {
            let center = transform.to_screen(node.pos);
            painter.circle_filled(center, NODE_RADIUS, node.color);
            let outline = if node.pinned { Color32::BLACK } else { Color32::WHITE };
            painter.circle_stroke(center, NODE_RADIUS, Stroke::new(1.5, outline));
        }

        if let Some(pointer) = response.hover_pos() {
            let hovered = scene
                .nodes
                .iter()
                .filter(|n| n.pos.is_finite())
                .find(|n| transform.to_screen(n.pos).distance(pointer) <= PICK_RADIUS);
            if let Some(node) = hovered {
                painter.text(
                    transform.to_screen(node.pos) + egui::vec2(0.0, NODE_RADIUS + 4.0),
                    egui::Align2::CENTER_TOP,
                    &node.id,
                    egui::FontId::default(),
                    ui.visuals().text_color(),
                );
            }
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_file_changes();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.controls(ui));

        if let Some(error) = self.last_load_error.as_ref() {
            egui::TopBottomPanel::bottom("errors").show(ctx, |ui| {
                ui.set_max_height(100.0);
                ui.label(egui::RichText::new(format!("Error: {}", error)).color(Color32::RED));
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| self.canvas(ui));

        let mut animating = false;
        if let Some(sim) = self.sim.as_mut() {
            if self.playing && sim.tick() == Phase::Running {
                animating = true;
            }
            animating |= self.drag.active_sessions() > 0;
        }
        if animating {
            ctx.request_repaint();
        }
    }
}
