use std::time::Duration;

use bytesize::ByteSize;
use clap::Parser;
use log::LevelFilter;
use mempool_config::schema::{all_fields, visible_for, Field};
use mempool_config::sweep::{resolve_all, HarnessCaps, SweepPlan};
use mempool_config::workload::WorkloadFigures;
use mempool_config::{
    resolve, HeapType, MempoolError, RawConfiguration, ResolvedConfiguration, SettingEnum,
    UniformLayout,
};

const DEFAULT_ELEMENT_WIDTH: u64 = 16; // one float4

#[derive(Parser, Debug)]
#[command(author, version, about = "Resolve GPU memory-pool benchmark settings", long_about = None)]
struct Args {
    /// Field override, e.g. --set HeapType=Default (repeatable)
    #[arg(short, long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Element width in bytes used to derive the element count
    #[arg(long, default_value_t = DEFAULT_ELEMENT_WIDTH)]
    element_width: u64,

    /// List visible fields and exit
    #[arg(long, default_value_t = false)]
    list_fields: bool,

    /// List every field, hidden ones included, and exit
    #[arg(long, default_value_t = false)]
    all_fields: bool,

    /// Expand and resolve the benchmark sweep
    #[arg(long, default_value_t = false)]
    sweep: bool,

    /// Device supports GPU-upload heaps (sweep only)
    #[arg(long, default_value_t = false)]
    gpu_upload_heap: bool,

    /// Device has a unified memory architecture (sweep only)
    #[arg(long, default_value_t = false)]
    uma: bool,

    /// Include custom heaps in the sweep
    #[arg(long, default_value_t = false)]
    include_custom: bool,

    #[arg(short, long, help = "Number of resolver threads for --sweep (default: CPU count)")]
    threads: Option<usize>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let layout = UniformLayout::new(args.element_width);

    if args.list_fields || args.all_fields {
        // Visibility depends on the heap type being edited.
        match resolve_overrides(&args.set, &layout) {
            Ok(config) => {
                print_fields(config.heap.heap_type, args.all_fields);
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    if args.sweep {
        run_sweep(&args, &layout);
        std::process::exit(0);
    }

    match resolve_overrides(&args.set, &layout) {
        Ok(config) => {
            print_config(&config);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn resolve_overrides(
    assignments: &[String],
    layout: &UniformLayout,
) -> Result<ResolvedConfiguration, MempoolError> {
    let raw = RawConfiguration::from_assignments(assignments)?;
    Ok(resolve(&raw, layout)?)
}

fn print_fields(heap_type: HeapType, include_hidden: bool) {
    let fields: Vec<&Field> = if include_hidden {
        all_fields().collect()
    } else {
        visible_for(heap_type).collect()
    };

    let mut group = None;
    for field in fields {
        if group != Some(field.group) {
            group = Some(field.group);
            println!();
            println!("{}", field.group.name());
            println!("{}", "=".repeat(field.group.name().len()));
        }
        let hidden = if field.is_visible_for(heap_type) {
            ""
        } else {
            " [hidden]"
        };
        println!("  {}{}", field, hidden);
        if !field.help.is_empty() {
            println!("      {}", field.help);
        }
    }
}

fn print_config(config: &ResolvedConfiguration) {
    let heap = &config.heap;
    let buffer = &config.buffer;
    let transfer = &config.transfer;
    let figures = WorkloadFigures::from_config(config);

    println!("Resolved Configuration");
    println!("======================");
    println!("Heap: {}", heap.heap_type.label());
    println!("CPU page property: {}", heap.cpu_page_property.label());
    println!("Memory pool: {}", heap.memory_pool.label());
    println!("Buffer type: {}", buffer.buffer_type.label());
    println!(
        "Input buffer size: {} ({} bytes)",
        ByteSize::b(buffer.buffer_size_bytes),
        buffer.buffer_size_bytes
    );
    println!("Input buffer elements: {}", buffer.num_elements);
    println!(
        "Geometry: {} groups, {} elems/thread, stride {}, group offset {}, thread offset {}",
        buffer.num_thread_groups,
        buffer.elems_per_thread,
        buffer.thread_elem_stride,
        buffer.group_elem_offset,
        buffer.thread_elem_offset
    );
    println!("Upload path: {}", transfer.buffer_upload_path.label());
    println!("Read from GPU memory: {}", transfer.read_from_gpu_mem);
    println!(
        "Background upload: {} every {}",
        ByteSize::b(transfer.background_upload_size_bytes),
        format_wait(transfer.background_upload_wait())
    );
    println!(
        "VSync: {} | Stable power state: {} | Driver background threads: {}",
        config.debug.enable_vsync,
        config.debug.stable_power_state,
        config.debug.enable_driver_background_threads
    );

    println!();
    println!("Total threads: {}", figures.total_threads);
    println!("CPU-writable heap: {}", if figures.cpu_writable { "Yes" } else { "No" });
    println!("Total bytes read: {}", ByteSize::b(figures.bytes_read));
    println!("Unique bytes read: {}", ByteSize::b(figures.unique_bytes_read));

    #[cfg(feature = "shader")]
    {
        use mempool_config::shader::{compile_defines, packed_field_names, CBUFFER_REGISTER};
        println!();
        println!(
            "Shader constants (b{}): {}",
            CBUFFER_REGISTER,
            packed_field_names().join(", ")
        );
        for (name, value) in compile_defines(config) {
            println!("  #define {} {}", name, value);
        }
    }

    if config.advisories.trailing_bytes > 0 {
        println!();
        println!(
            "Note: {} trailing bytes are not part of any element",
            config.advisories.trailing_bytes
        );
    }
    if config.advisories.exceeds_constant_buffer_limit {
        println!("Note: constant buffer exceeds the 64 KiB bindable limit");
    }
    if config.advisories.allocation_size_bytes != buffer.buffer_size_bytes {
        println!(
            "Note: harness allocates {} for the input buffer",
            ByteSize::b(config.advisories.allocation_size_bytes)
        );
    }
}

fn format_wait(wait: Duration) -> String {
    if wait.is_zero() {
        "frame".to_string()
    } else {
        humantime::format_duration(wait).to_string()
    }
}

fn run_sweep(args: &Args, layout: &UniformLayout) {
    let caps = HarnessCaps {
        gpu_upload_heap: args.gpu_upload_heap,
        uma: args.uma,
    };
    let mut plan = SweepPlan::default();
    if args.include_custom {
        plan.heap_types.push(HeapType::Custom);
    }

    let entries = plan.expand(&caps);
    let results = resolve_all(&entries, layout, args.threads);

    println!("HeapType, CPUPageProperty, MemoryPool, InputBufferType, NumThreadGroups, InputBufferSize, CPU-Writable Heap, Total Bytes Read, Unique Bytes Read");
    let mut failures = 0;
    for result in &results {
        match result {
            Ok(config) => {
                let figures = WorkloadFigures::from_config(config);
                println!(
                    "{}, {}, {}, {}, {}, {}, {}, {}, {}",
                    config.heap.heap_type.label(),
                    config.heap.cpu_page_property.label(),
                    config.heap.memory_pool.label(),
                    config.buffer.buffer_type.label(),
                    config.buffer.num_thread_groups,
                    config.buffer.buffer_size_bytes,
                    if figures.cpu_writable { "Yes" } else { "No" },
                    figures.bytes_read,
                    figures.unique_bytes_read
                );
            }
            Err(e) => {
                failures += 1;
                eprintln!("Error: {}", e);
            }
        }
    }

    eprintln!();
    eprintln!(
        "{} configurations resolved, {} failed",
        results.len() - failures,
        failures
    );
}
