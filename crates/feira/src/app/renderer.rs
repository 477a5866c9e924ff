use egui_render_three_d::three_d::context::{COLOR_BUFFER_BIT, DEPTH_BUFFER_BIT, STENCIL_BUFFER_BIT};
use egui_render_three_d::three_d::{HasContext, ScissorBox, Viewport};
use egui_render_three_d::{ThreeDBackend, ThreeDConfig};
use egui_window_glfw_passthrough::GlfwBackend;

macro_rules! gl_error {
    ($gl:expr) => {{
        let e = $gl.get_error();
        if e != egui_render_three_d::three_d::context::NO_ERROR {
            tracing::error!("glerror {} at {} {} {}", e, file!(), line!(), column!());
        }
    }};
}

/// Only egui is drawn, the map is made of egui shapes.
pub struct FeiraRenderer {
    pub viewport: Viewport,
    pub gl: ThreeDBackend,
}

impl FeiraRenderer {
    pub fn new(glfw_backend: &mut GlfwBackend) -> Self {
        let glfw = glfw_backend.glfw.clone();
        let backend = ThreeDBackend::new(
            ThreeDConfig {
                glow_config: Default::default(),
            },
            |s| glfw.get_proc_address_raw(s),
            glfw_backend.framebuffer_size_physical,
        );
        let viewport = Viewport {
            x: 0,
            y: 0,
            width: glfw_backend.framebuffer_size_physical[0],
            height: glfw_backend.framebuffer_size_physical[1],
        };
        let gl = &backend.context;
        unsafe { gl_error!(gl) };
        Self {
            viewport,
            gl: backend,
        }
    }

    pub fn prepare_frame(&mut self, latest_framebuffer_size_getter: impl FnMut() -> [u32; 2]) {
        self.gl.prepare_frame(latest_framebuffer_size_getter);
        unsafe {
            let gl = self.gl.context.clone();
            gl_error!(gl);
            self.gl.context.set_scissor(ScissorBox::new_at_origo(
                self.viewport.width,
                self.viewport.height,
            ));
            self.gl.context.clear_color(0.1, 0.1, 0.1, 1.0);
            self.gl
                .context
                .clear(COLOR_BUFFER_BIT | DEPTH_BUFFER_BIT | STENCIL_BUFFER_BIT);
            gl_error!(gl);
        }
    }

    pub fn render_egui(
        &mut self,
        meshes: Vec<egui::ClippedPrimitive>,
        textures_delta: egui::TexturesDelta,
        logical_screen_size: [f32; 2],
    ) {
        self.gl
            .render_egui(meshes, textures_delta, logical_screen_size);
    }

    pub fn resize_framebuffer(&mut self, latest_size: [u32; 2]) {
        tracing::info!(?latest_size, "resizing framebuffer");

        self.viewport = Viewport {
            x: 0,
            y: 0,
            width: latest_size[0],
            height: latest_size[1],
        };
        self.gl.resize_framebuffer(latest_size);
    }
}
