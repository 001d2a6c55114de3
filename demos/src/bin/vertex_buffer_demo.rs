//! # Vertex Buffer Demo
//!
//! Builds a zig-zag strip in a logical vertex buffer, renders it against the
//! recording backend and logs the resulting graphics calls:
//! - How the buffer was split into segments
//! - Draw calls per segment, including restart runs
//! - Bridges emitted across segment boundaries
//!
//! ```bash
//! RUST_LOG=debug cargo run --bin vertex_buffer_demo -- --vertices 40 --segment-limit 16 --restart-every 10
//! ```

use std::sync::Arc;

use clap::Parser;
use gtl::backend::ApiCall;
use gtl::cell::C4ubV3f;
use gtl::component::{Color4ub, Vertex3f};
use gtl::{LogicalBuffer, PrimitiveMode, RecordingBackend, VertexBufferDescriptor};
use gtl_demos::CliMode;

/// Drive a segmented vertex buffer and report the graphics calls it issues.
#[derive(Parser, Debug)]
#[command(name = "vertex_buffer_demo", version = gtl_demos::VERSION)]
struct Args {
    /// Number of vertices to append.
    #[arg(long, default_value = "40")]
    vertices: usize,

    /// Maximum vertices per segment (defaults to the backend's suggestion).
    #[arg(long)]
    segment_limit: Option<usize>,

    /// Vertex count the backend suggests per buffer object.
    #[arg(long, default_value = "65536")]
    max_vertices: usize,

    /// Primitive mode to render with.
    #[arg(long, default_value = "triangle-strip", value_enum)]
    mode: CliMode,

    /// Insert a soft reset every N vertices.
    #[arg(long)]
    restart_every: Option<usize>,

    /// Hard reset halfway through and start a second strip.
    #[arg(long)]
    hard_reset: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .init();
}

fn zig_zag(i: usize) -> C4ubV3f {
    let shade = (i * 255 / 40).min(255) as u8;
    (
        Color4ub::new([shade, 128, 255 - shade, 255]),
        Vertex3f::new([(i / 2) as f32, (i % 2) as f32, 0.0]),
    )
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    gtl::init();

    let mode = PrimitiveMode::from(args.mode);
    let backend = Arc::new(RecordingBackend::new(args.max_vertices));
    let mut descriptor = VertexBufferDescriptor::new()
        .with_label("zig_zag")
        .with_default_mode(mode);
    if let Some(limit) = args.segment_limit {
        descriptor = descriptor.with_segment_limit(limit);
    }
    let mut buffer: LogicalBuffer<C4ubV3f> =
        LogicalBuffer::with_descriptor(backend.clone(), &descriptor);

    for i in 0..args.vertices {
        if args.hard_reset && i == args.vertices / 2 {
            buffer.hard_reset(None);
        }
        if let Some(every) = args.restart_every {
            if every > 0 && i > 0 && i % every == 0 {
                buffer.soft_reset();
            }
        }
        buffer.push_back(zig_zag(i));
    }
    log::info!(
        "Built {:?} with {} vertices in {} segment(s)",
        buffer.label(),
        buffer.len(),
        buffer.segment_count()
    );

    if let Err(e) = buffer.render_all() {
        log::error!("Render failed: {}", e);
        std::process::exit(1);
    }

    for segment in buffer.segments() {
        log::info!(
            "Segment at {:>5}: {:>5} vertices, buffer {:?}, restarts {:?}",
            segment.start,
            segment.cells.len(),
            segment.buffer,
            segment.restarts
        );
    }
    for draw in backend.draw_calls() {
        log::info!(
            "draw_arrays({}, first={}, count={}) from {:?}",
            draw.mode,
            draw.first,
            draw.count,
            draw.buffer
        );
    }
    for (i, block) in backend.immediate_blocks().iter().enumerate() {
        log::info!("bridge #{}: {} vertices in {}", i, block.vertices.len(), block.mode);
    }

    let uploads = backend.count_calls(|c| {
        matches!(c, ApiCall::BufferData { .. } | ApiCall::BufferSubData { .. })
    });
    log::info!(
        "{} draw call(s), {} bridge(s), {} upload(s), {} live buffer object(s)",
        backend.draw_calls().len(),
        backend.immediate_blocks().len(),
        uploads,
        backend.live_buffers().len()
    );
}
