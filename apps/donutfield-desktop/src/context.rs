use anyhow::{Context as _, Result};
use donutfield_assets::{FsTextureSource, torus_mesh};
use donutfield_common::{CancellationToken, MatcapId, Viewport};
use donutfield_kernel::{FrameLoop, FrameTick, MaterialRole, Scene, SceneConfig, populate};
use donutfield_render_wgpu::{OrbitCamera, RenderStats};
use donutfield_stream::{
    BackgroundLoader, FrameTimer, MatcapSwapper, SwapOutcome, TextMeshLoader, Ticket,
};
use donutfield_tools::{Diagnostics, MatcapControl, RenderCounters, SceneInspector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;

/// Make egui lay out in logical points but rasterize at the capped surface
/// ratio, so the UI covers exactly the configured surface.
pub fn fit_ui_input(raw: &mut egui::RawInput, viewport: &Viewport) {
    let ratio = viewport.pixel_ratio() as f32;
    raw.viewports
        .entry(egui::ViewportId::ROOT)
        .or_default()
        .native_pixels_per_point = Some(ratio);
    raw.screen_rect = Some(egui::Rect::from_min_size(
        egui::Pos2::ZERO,
        egui::vec2(viewport.width as f32, viewport.height as f32),
    ));
}

/// Startup options taken from the command line.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub assets_dir: PathBuf,
    pub seed: Option<u64>,
    pub matcap: MatcapId,
    pub frames: Option<u64>,
}

/// Everything the app owns apart from the window and GPU handles.
pub struct AppContext {
    pub config: SceneConfig,
    pub scene: Scene,
    pub viewport: Viewport,
    pub camera: OrbitCamera,
    pub control: MatcapControl,
    pub swapper: MatcapSwapper<BackgroundLoader>,
    text: Option<TextMeshLoader>,
    frames: FrameLoop,
    timer: FrameTimer,
    cancel: CancellationToken,
    last_tick: Option<FrameTick>,
}

impl AppContext {
    /// Build the scene, scatter the donuts and start the matcap and text loads.
    pub fn init(options: &AppOptions, config: SceneConfig, viewport: Viewport) -> Result<Self> {
        let viewport = viewport.with_max_pixel_ratio(config.max_pixel_ratio);
        let mut scene = Scene::new(config.background);
        let torus = scene.add_geometry(torus_mesh(&config.torus))?;

        let seed = options.seed.or(config.seed);
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let instances = {
            let _span = tracing::info_span!("populate", count = config.donut_count, ?seed).entered();
            populate(config.donut_count, torus, MaterialRole::Donut, config.spread, &mut rng)
        };
        scene.add_instances(instances)?;

        let loader = BackgroundLoader::spawn(FsTextureSource::new(&options.assets_dir))
            .context("starting matcap loader")?;
        let mut swapper = MatcapSwapper::new(loader);
        swapper.select(options.matcap);

        let text = TextMeshLoader::spawn(
            options.assets_dir.join(&config.font_path),
            config.label.clone(),
            config.text,
        )
        .context("starting text loader")?;

        let mut camera = OrbitCamera::from_config(&config.camera);
        camera.set_aspect(viewport.aspect());

        let cancel = CancellationToken::new();
        let frames = FrameLoop::new(cancel.clone()).with_frame_limit(options.frames);

        tracing::info!(
            donuts = config.donut_count,
            matcap = %options.matcap,
            assets = %options.assets_dir.display(),
            "scene initialized"
        );

        Ok(Self {
            config,
            scene,
            viewport,
            camera,
            control: MatcapControl::new(options.matcap),
            swapper,
            text: Some(text),
            frames,
            timer: FrameTimer::new(120),
            cancel,
            last_tick: None,
        })
    }

    /// Forward a control change to the swapper.
    pub fn select_matcap(&mut self, matcap: MatcapId) -> Ticket {
        self.control.set(matcap);
        self.swapper.select(matcap)
    }

    /// Apply a window resize. Returns whether the surface must be reconfigured.
    pub fn resize(&mut self, physical_width: u32, physical_height: u32, scale_factor: f64) -> bool {
        let next = Viewport::from_physical(physical_width, physical_height, scale_factor);
        if !self
            .viewport
            .resize(next.width, next.height, next.device_pixel_ratio)
        {
            return false;
        }
        self.camera.set_aspect(self.viewport.aspect());
        tracing::debug!(
            width = self.viewport.width,
            height = self.viewport.height,
            ratio = self.viewport.pixel_ratio(),
            "viewport resized"
        );
        true
    }

    /// Run the per-frame bookkeeping ahead of rendering. `None` once the loop has stopped.
    pub fn tick(&mut self) -> Option<FrameTick> {
        let tick = self.frames.begin_frame()?;
        self.timer.record(tick.delta);

        for outcome in self.swapper.poll(self.scene.materials_mut()) {
            if let SwapOutcome::Applied { matcap, .. } = outcome {
                self.control.set(matcap);
            }
        }

        if let Some(text) = &mut self.text {
            if text.poll(&mut self.scene).is_some() || text.is_done() {
                self.text = None;
            }
        }

        for event in self.scene.drain_events() {
            tracing::trace!(?event, "scene event");
        }

        self.camera.update();
        tracing::trace!(frame = tick.index, "frame");
        self.last_tick = Some(tick);
        Some(tick)
    }

    pub fn is_running(&self) -> bool {
        self.frames.is_running()
    }

    pub fn diagnostics(&self, render: Option<RenderStats>) -> Diagnostics {
        let stats = self.timer.stats();
        Diagnostics {
            requested: self.swapper.requested(),
            pending: self.swapper.pending(),
            active: self.swapper.active(),
            last_error: self.swapper.last_error().map(str::to_string),
            text_loading: self.text.is_some(),
            frame_ms: stats.average.as_secs_f64() * 1000.0,
            fps: stats.fps(),
            elapsed_secs: self.last_tick.map_or(0.0, |t| t.elapsed.as_secs_f64()),
            scene: Some(SceneInspector::summary(&self.scene)),
            render: render.map(|r| RenderCounters {
                batches: r.batches,
                instances: r.instances,
                textures: r.textures,
            }),
        }
    }

    /// Cancel outstanding loads, stop the frame loop and release the scene.
    pub fn teardown(&mut self) {
        if self.scene.is_torn_down() {
            return;
        }
        self.cancel.cancel();
        self.swapper.cancel_pending();
        if let Some(text) = self.text.take() {
            text.cancel();
        }
        self.frames.stop();
        self.scene.teardown();
        tracing::info!(frames = self.frames.frames(), "app torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::{Duration, Instant};

    const FONT: &str = r#"{
        "familyName": "Block",
        "resolution": 1000,
        "boundingBox": { "yMin": 0, "xMin": 0, "yMax": 700, "xMax": 600 },
        "underlineThickness": 50,
        "glyphs": {
            "?": { "ha": 500, "o": "m 0 0 l 400 0 l 400 600 l 0 600 z" },
            " ": { "ha": 250 }
        }
    }"#;

    fn write_assets(root: &Path) {
        let matcaps = root.join("textures/matcaps");
        std::fs::create_dir_all(&matcaps).unwrap();
        for n in 1..=8u8 {
            image::RgbaImage::from_pixel(4, 4, image::Rgba([n * 20, 0, 0, 255]))
                .save(matcaps.join(format!("{n}.png")))
                .unwrap();
        }
        let fonts = root.join("fonts");
        std::fs::create_dir_all(&fonts).unwrap();
        std::fs::write(fonts.join("helvetiker_regular.typeface.json"), FONT).unwrap();
    }

    fn options(root: &Path) -> AppOptions {
        AppOptions {
            assets_dir: root.to_path_buf(),
            seed: Some(11),
            matcap: MatcapId::default(),
            frames: None,
        }
    }

    fn tick_until(app: &mut AppContext, mut done: impl FnMut(&AppContext) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !done(app) {
            assert!(Instant::now() < deadline, "condition not reached");
            app.tick();
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn init_builds_scene_and_loads_assets() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path());
        let mut app =
            AppContext::init(&options(dir.path()), SceneConfig::default(), Viewport::default()).unwrap();
        assert_eq!(app.scene.mesh_count(), 100);

        tick_until(&mut app, |a| {
            a.scene.text_mesh().is_some() && a.scene.materials().active_matcap().is_some()
        });
        assert_eq!(app.scene.mesh_count(), 101);
        assert_eq!(app.scene.materials().active_matcap(), Some(MatcapId::default()));
        assert!(app.scene.materials().is_consistent());
        assert!(app.scene.events().is_empty());
        assert!(!app.diagnostics(None).text_loading);
    }

    #[test]
    fn selection_swaps_both_materials() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path());
        let mut app =
            AppContext::init(&options(dir.path()), SceneConfig::default(), Viewport::default()).unwrap();
        let three = MatcapId::new(3).unwrap();
        app.select_matcap(three);

        tick_until(&mut app, |a| !a.swapper.is_pending());
        assert_eq!(app.scene.materials().active_matcap(), Some(three));
        assert_eq!(app.control.value(), three);
        let diagnostics = app.diagnostics(None);
        assert_eq!(diagnostics.active, Some(three));
        assert!(diagnostics.last_error.is_none());
    }

    #[test]
    fn missing_texture_keeps_running() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path());
        std::fs::remove_file(dir.path().join("textures/matcaps/5.png")).unwrap();
        let mut app =
            AppContext::init(&options(dir.path()), SceneConfig::default(), Viewport::default()).unwrap();
        tick_until(&mut app, |a| !a.swapper.is_pending());

        app.select_matcap(MatcapId::new(5).unwrap());
        tick_until(&mut app, |a| !a.swapper.is_pending());
        assert_eq!(app.scene.materials().active_matcap(), Some(MatcapId::default()));
        assert!(app.diagnostics(None).last_error.is_some());
        assert!(app.is_running());
    }

    #[test]
    fn resize_updates_camera_once() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path());
        let mut app =
            AppContext::init(&options(dir.path()), SceneConfig::default(), Viewport::default()).unwrap();
        assert!(app.resize(3000, 1000, 3.0));
        assert!(!app.resize(3000, 1000, 3.0));
        assert!((app.camera.aspect - 3.0).abs() < 1e-6);
        assert_eq!(app.viewport.pixel_ratio(), 2.0);
        assert_eq!(app.viewport.surface_size(), (2000, 667));
    }

    #[test]
    fn configured_pixel_ratio_cap_applies_on_resize() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path());
        let config = SceneConfig {
            max_pixel_ratio: 1.25,
            ..SceneConfig::default()
        };
        let mut app = AppContext::init(&options(dir.path()), config, Viewport::default()).unwrap();
        assert!(app.resize(3000, 1500, 3.0));
        assert_eq!(app.viewport.pixel_ratio(), 1.25);
        assert_eq!(app.viewport.surface_size(), (1250, 625));
    }

    #[test]
    fn ui_covers_capped_surface() {
        let viewport = Viewport::new(1280.0, 720.0, 3.0);
        let mut raw = egui::RawInput::default();
        raw.viewports
            .entry(egui::ViewportId::ROOT)
            .or_default()
            .native_pixels_per_point = Some(3.0);
        fit_ui_input(&mut raw, &viewport);

        let ctx = egui::Context::default();
        let output = ctx.run(raw, |_| {});
        let (width, height) = viewport.surface_size();
        assert_eq!(output.pixels_per_point, 2.0);
        assert_eq!(ctx.screen_rect().width() * output.pixels_per_point, width as f32);
        assert_eq!(ctx.screen_rect().height() * output.pixels_per_point, height as f32);
    }

    #[test]
    fn frame_limit_and_teardown_stop_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path());
        let opts = AppOptions {
            frames: Some(2),
            ..options(dir.path())
        };
        let mut app = AppContext::init(&opts, SceneConfig::default(), Viewport::default()).unwrap();
        assert!(app.tick().is_some());
        assert!(app.tick().is_some());
        assert!(app.tick().is_none());

        app.teardown();
        app.teardown();
        assert!(app.scene.is_torn_down());
        assert_eq!(app.scene.mesh_count(), 0);
        assert!(!app.is_running());
    }
}
