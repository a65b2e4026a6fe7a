mod context;

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use context::{AppContext, AppOptions, fit_ui_input};
use donutfield_common::{MatcapId, Viewport};
use donutfield_kernel::SceneConfig;
use donutfield_render_wgpu::MatcapRenderer;
use donutfield_tools::settings_panel;
use egui::Context as EguiContext;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "donutfield-desktop", about = "Matcap text and donut field viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding textures/ and fonts/
    #[arg(long, default_value = "./static")]
    assets_dir: PathBuf,

    /// Seed for donut placement
    #[arg(long)]
    seed: Option<u64>,

    /// Initial matcap (1-8)
    #[arg(long, default_value_t = MatcapId::default())]
    matcap: MatcapId,

    /// Exit after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Scene config JSON; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Window, surface, device and the renderers that draw into them.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: MatcapRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(event_loop: &ActiveEventLoop, app: &mut AppContext, egui_ctx: &EguiContext) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("donutfield")
            .with_inner_size(LogicalSize::new(app.viewport.width, app.viewport.height));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no suitable GPU adapter"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("donutfield_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        app.resize(size.width, size.height, window.scale_factor());
        let (width, height) = app.viewport.surface_size();

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface reports no formats"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = MatcapRenderer::new(&device, &queue, surface_format, width, height);

        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            width,
            height,
            "GPU initialized"
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn reconfigure(&mut self, viewport: &Viewport) {
        let (width, height) = viewport.surface_size();
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.renderer.resize(&self.device, width, height);
    }
}

#[derive(Default)]
struct Pointer {
    rotating: bool,
    panning: bool,
    last: Option<PhysicalPosition<f64>>,
}

struct GpuApp {
    app: AppContext,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
    pointer: Pointer,
}

impl GpuApp {
    fn new(app: AppContext) -> Self {
        Self {
            app,
            gpu: None,
            egui_ctx: EguiContext::default(),
            pointer: Pointer::default(),
        }
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.app.teardown();
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.tick().is_none() {
            self.exit(event_loop);
            return;
        }
        let Some(gpu) = &mut self.gpu else {
            return;
        };

        gpu.renderer.sync(&gpu.device, &gpu.queue, &mut self.app.scene);

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        gpu.renderer
            .render(&gpu.device, &gpu.queue, &view, &self.app.camera);

        let diagnostics = self.app.diagnostics(Some(gpu.renderer.stats()));
        let mut raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        fit_ui_input(&mut raw_input, &self.app.viewport);
        let mut picked = None;
        let control = &mut self.app.control;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if let Some(id) = settings_panel(ctx, control, &diagnostics) {
                picked = Some(id);
            }
        });
        if let Some(id) = picked {
            self.app.swapper.select(id);
        }

        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);
        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
        gpu.window.request_redraw();
    }

    fn pointer_moved(&mut self, position: PhysicalPosition<f64>) {
        let previous = self.pointer.last.replace(position);
        let Some(previous) = previous else {
            return;
        };
        let dx = (position.x - previous.x) as f32;
        let dy = (position.y - previous.y) as f32;
        let height = self
            .gpu
            .as_ref()
            .map_or(1.0, |gpu| gpu.window.inner_size().height as f32);
        if self.pointer.rotating {
            self.app.camera.rotate(dx, dy, height);
        } else if self.pointer.panning {
            self.app.camera.pan(dx, dy, height);
        }
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match Gpu::new(event_loop, &mut self.app, &self.egui_ctx) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => {
                tracing::error!("failed to initialize GPU: {e:#}");
                self.exit(event_loop);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => self.exit(event_loop),
            WindowEvent::Resized(size) => {
                let Some(gpu) = &mut self.gpu else {
                    return;
                };
                if self
                    .app
                    .resize(size.width, size.height, gpu.window.scale_factor())
                {
                    gpu.reconfigure(&self.app.viewport);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let Some(gpu) = &mut self.gpu else {
                    return;
                };
                let size = gpu.window.inner_size();
                if self.app.resize(size.width, size.height, scale_factor) {
                    gpu.reconfigure(&self.app.viewport);
                }
            }
            WindowEvent::MouseInput { button, state, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.pointer.rotating = pressed,
                    MouseButton::Right => self.pointer.panning = pressed,
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => self.pointer_moved(position),
            WindowEvent::CursorLeft { .. } => self.pointer.last = None,
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / 50.0) as f32,
                };
                self.app.camera.zoom(steps);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("donutfield-desktop starting");

    let options = AppOptions {
        assets_dir: cli.assets_dir,
        seed: cli.seed,
        matcap: cli.matcap,
        frames: cli.frames,
    };
    let config = SceneConfig::load(cli.config.as_deref()).context("loading scene config")?;
    let context = AppContext::init(&options, config, Viewport::default())?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut gpu_app = GpuApp::new(context);
    event_loop.run_app(&mut gpu_app)?;
    gpu_app.app.teardown();

    Ok(())
}
