use std::{sync::Arc, time::Instant};

use anyhow::Context;
use log::{error, info, warn};
use orrery::{
    draw_scene, pre_draw_scene,
    rendering::gpu::{depth_texture::DepthTexture, WgpuBackend},
    BackendError, DrawList, RenderFlags, Viewport,
};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::demo::DemoState;

const INITIAL_SIZE: (u32, u32) = (1280, 720);

struct GpuState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: DepthTexture,
    backend: WgpuBackend,
    draw_list: DrawList,
}

impl GpuState {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable graphics adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: adapter.features() & wgpu::Features::POLYGON_MODE_LINE,
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        let config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .context("Surface is not supported by the adapter")?;
        surface.configure(&device, &config);

        info!(
            "Using {} ({:?}), surface format {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            config.format
        );

        let depth_texture = DepthTexture::new(&device, &config, "Depth Texture");
        let backend = WgpuBackend::new(
            device,
            queue,
            config.format,
            Viewport::full(config.width, config.height),
        );

        Ok(Self {
            window,
            surface,
            config,
            depth_texture,
            backend,
            draw_list: DrawList::new(),
        })
    }

    fn viewport(&self) -> Viewport {
        Viewport::full(self.config.width, self.config.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(self.backend.device(), &self.config);
        self.depth_texture.resize(self.backend.device(), &self.config);
    }

    fn render(&mut self, demo: &DemoState) -> anyhow::Result<()> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.resize(self.config.width, self.config.height);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timeout");
                return Ok(());
            }
            Err(other) => return Err(BackendError::from(other).into()),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.backend.begin_frame();
        pre_draw_scene(&demo.scene, &demo.context, &mut self.draw_list)?;
        draw_scene(
            &demo.scene,
            &demo.context,
            &self.draw_list,
            &mut self.backend,
        )?;

        let [r, g, b, a] = demo.context.config.clear_color;
        let clear_color = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        };
        self.backend
            .finish_frame(&view, self.depth_texture.view(), clear_color)?;

        output.present();
        Ok(())
    }
}

struct App {
    gpu: Option<GpuState>,
    demo_state: DemoState,
    last_frame: Instant,
}

impl App {
    fn from_demo_state(demo_state: DemoState) -> Self {
        Self {
            gpu: None,
            demo_state,
            last_frame: Instant::now(),
        }
    }

    fn handle_key(&mut self, event: &KeyEvent, event_loop: &ActiveEventLoop) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }

        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => event_loop.exit(),
            PhysicalKey::Code(KeyCode::KeyW) => self.demo_state.toggle_flag(RenderFlags::WIREFRAME),
            PhysicalKey::Code(KeyCode::KeyL) => self.demo_state.toggle_flag(RenderFlags::UNLIT),
            PhysicalKey::Code(KeyCode::Space) => self.demo_state.toggle_engine(),
            _ => (),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title("orrery")
            .with_inner_size(winit::dpi::PhysicalSize::new(INITIAL_SIZE.0, INITIAL_SIZE.1));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                error!("Failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(GpuState::new(window)) {
            Ok(mut gpu) => {
                gpu.backend.upload_meshes(&self.demo_state.meshes);
                self.demo_state.resize(gpu.viewport());
                gpu.window.request_redraw();
                self.gpu = Some(gpu);
            }
            Err(err) => {
                error!("Failed to initialise graphics: {err:?}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                gpu.resize(new_size.width, new_size.height);
                self.demo_state.resize(gpu.viewport());
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(&event, event_loop);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(self.last_frame).as_secs_f32();
                self.last_frame = now;

                gpu.window.request_redraw();

                if let Err(err) = self.demo_state.update(dt) {
                    error!("{err:?}");
                    event_loop.exit();
                    return;
                }

                if let Err(err) = gpu.render(&self.demo_state) {
                    error!("Frame failed: {err:?}");
                    event_loop.exit();
                }
            }
            _ => (),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Err(err) = self.demo_state.shutdown() {
            error!("{err:?}");
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let demo_state = DemoState::new(Viewport::full(INITIAL_SIZE.0, INITIAL_SIZE.1))
        .context("Failed to create demo state")?;
    let mut app = App::from_demo_state(demo_state);
    event_loop.run_app(&mut app)?;

    Ok(())
}
