//! Minimal obsidian application: negotiate a context and swapchain, then clear the
//! screen every frame, recreating the swapchain whenever it goes stale.

use anyhow::Result;
use obsidian::prelude::*;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

fn build_framebuffers(
    device: &Device,
    swapchain: &Swapchain,
    render_pass: &RenderPass,
) -> Result<Vec<Framebuffer>> {
    (0..swapchain.images_len())
        .map(|index| {
            Framebuffer::new(
                device.clone(),
                render_pass,
                &[swapchain.image_view(index), swapchain.depth_image().view()],
                swapchain.extent(),
            )
        })
        .collect()
}

struct Frame {
    image_available: Semaphore,
    render_finished: Semaphore,
    in_flight: Fence,
    cmd: CommandBuffer,
}

fn draw(
    device: &Device,
    swapchain: &mut Swapchain,
    render_pass: &RenderPass,
    framebuffers: &[Framebuffer],
    frame: &mut Frame,
) -> Result<()> {
    frame.in_flight.wait()?;

    let index =
        swapchain.acquire_next_image(unsafe { frame.image_available.handle() }, vk::Fence::null(), u64::MAX)?;
    frame.in_flight.reset()?;

    let clear_values = [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.1, 0.1, 0.12, 1.0],
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ];

    frame.cmd.begin()?;
    let begin_info = vk::RenderPassBeginInfo::builder()
        .render_pass(unsafe { render_pass.handle() })
        .framebuffer(unsafe { framebuffers[index as usize].handle() })
        .render_area(vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent: swapchain.extent(),
        })
        .clear_values(&clear_values)
        .build();
    unsafe {
        device.cmd_begin_render_pass(frame.cmd.handle(), &begin_info, vk::SubpassContents::INLINE);
        device.cmd_end_render_pass(frame.cmd.handle());
    }
    frame.cmd.end()?;

    frame.cmd.submit(
        &[unsafe { frame.image_available.handle() }],
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        &[unsafe { frame.render_finished.handle() }],
        unsafe { frame.in_flight.handle() },
        false,
    )?;

    swapchain.present(&[unsafe { frame.render_finished.handle() }])
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("obsidian basic")
        .with_inner_size(LogicalSize::new(800.0, 600.0))
        .build(&event_loop)?;

    let (instance, physical_device, surface, device, allocator, pools, swapchain, debug) = {
        let settings = AppBuilder::new()
            .name("obsidian basic")
            .version((0, 1, 0))
            .validation(true)
            .window(&window)
            .build();
        initialize(&settings)?
    };
    let _ = (&instance, &physical_device, &allocator, &debug);
    let surface = surface.expect("windowed context always has a surface");
    let mut swapchain = swapchain.expect("windowed context always has a swapchain");

    let render_pass = RenderPass::new_simple(
        device.clone(),
        swapchain.format().format,
        swapchain.depth_format(),
    )?;
    let mut framebuffers = build_framebuffers(&device, &swapchain, &render_pass)?;

    let graphics_family = device.queue_family(QueueRole::Graphics)?;
    let mut frame = Frame {
        image_available: Semaphore::new(device.clone())?,
        render_finished: Semaphore::new(device.clone())?,
        in_flight: Fence::new(device.clone(), true)?,
        cmd: pools.resettable_command_buffer(graphics_family)?,
    };

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                device.wait_idle().unwrap();
                *control_flow = ControlFlow::Exit;
            }
            Event::MainEventsCleared => {
                window.request_redraw();
            }
            Event::RedrawRequested(_) => {
                let result = draw(&device, &mut swapchain, &render_pass, &framebuffers, &mut frame);
                if let Err(err) = result {
                    match err.downcast_ref::<Error>() {
                        Some(Error::SwapchainStale) => {
                            swapchain.recreate(&surface, &window).unwrap();
                            framebuffers =
                                build_framebuffers(&device, &swapchain, &render_pass).unwrap();
                        }
                        _ => panic!("render error: {err}"),
                    }
                }
            }
            _ => {}
        }
    });
}
